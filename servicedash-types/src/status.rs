//! Status vocabulary and the mappings from external status vocabularies.

use core::fmt;

/// Health of a tracked service, ordered by severity.
///
/// The derived ordering follows declaration order, so `max()` over a set of
/// statuses is the worst of them. `Unknown` is deliberately the most severe:
/// a poll we could not interpret must never look healthy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Status {
    Operational,
    Degraded,
    Outage,
    #[default]
    Unknown,
}

impl Status {
    /// All statuses from least to most severe.
    pub const ALL: [Status; 4] = [
        Status::Operational,
        Status::Degraded,
        Status::Outage,
        Status::Unknown,
    ];

    /// Integer severity used for ordering and trend aggregation.
    pub const fn severity(self) -> u8 {
        match self {
            Status::Operational => 0,
            Status::Degraded => 1,
            Status::Outage => 2,
            Status::Unknown => 3,
        }
    }

    /// Stable key used in storage.
    pub const fn key(self) -> &'static str {
        match self {
            Status::Operational => "operational",
            Status::Degraded => "degraded",
            Status::Outage => "outage",
            Status::Unknown => "unknown",
        }
    }

    /// Short label for compact displays.
    pub const fn short_label(self) -> &'static str {
        match self {
            Status::Operational => "OK",
            Status::Degraded => "DEG",
            Status::Outage => "DOWN",
            Status::Unknown => "UNK",
        }
    }

    /// Parse a storage key back into a status.
    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.key() == key)
    }

    /// Look a status up by severity.
    pub fn from_severity(severity: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.severity() == severity)
    }

    pub fn is_operational(self) -> bool {
        self == Status::Operational
    }

    /// Map a statuspage.io overall indicator (`none`, `minor`, `major`, `critical`).
    pub fn from_statuspage_indicator(indicator: Option<&str>) -> Self {
        match normalize(indicator).as_str() {
            "none" => Status::Operational,
            "minor" => Status::Degraded,
            "major" | "critical" => Status::Outage,
            _ => Status::Unknown,
        }
    }

    /// Map a statuspage.io component status.
    pub fn from_statuspage_component(component_status: Option<&str>) -> Self {
        match normalize(component_status).as_str() {
            "operational" => Status::Operational,
            "degraded_performance" | "partial_outage" | "under_maintenance" => Status::Degraded,
            "major_outage" => Status::Outage,
            _ => Status::Unknown,
        }
    }

    /// Map a Slack status API `status` plus its active incident count.
    ///
    /// An `ok` status only counts as operational when there are no active
    /// incidents; an unrecognised status with active incidents is degraded.
    pub fn from_slack_status(status: Option<&str>, active_incidents: usize) -> Self {
        match normalize(status).as_str() {
            "ok" if active_incidents == 0 => Status::Operational,
            "incident" | "degraded" | "partial_outage" | "issue" => Status::Degraded,
            "outage" | "down" | "major_outage" => Status::Outage,
            _ if active_incidents > 0 => Status::Degraded,
            _ => Status::Unknown,
        }
    }

    /// Map a Google Cloud incident's impact and severity.
    ///
    /// Ended incidents are operational. Otherwise the impact wins over the
    /// severity field.
    pub fn from_gcp_incident(impact: Option<&str>, severity: Option<&str>, has_end: bool) -> Self {
        if has_end {
            return Status::Operational;
        }
        let impact = impact.unwrap_or_default().trim().to_uppercase();
        if impact.contains("OUTAGE") {
            return Status::Outage;
        }
        if impact.contains("DISRUPTION") {
            return Status::Degraded;
        }
        match normalize(severity).as_str() {
            "high" | "critical" => Status::Outage,
            "low" | "medium" => Status::Degraded,
            _ => Status::Unknown,
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Reduce several statuses to the most severe one.
///
/// Returns [`Status::Unknown`] for an empty input.
pub fn worst_of<I>(statuses: I) -> Status
where
    I: IntoIterator<Item = Status>,
{
    statuses.into_iter().max().unwrap_or(Status::Unknown)
}

fn normalize(value: Option<&str>) -> String {
    value.unwrap_or_default().trim().to_lowercase()
}
