//! statuspage.io summaries: overall indicator and per-component status.

use std::time::Instant;

use serde::Deserialize;

use servicedash_types::{worst_of, NormalizedStatus, Status};

use super::http::{elapsed_ms, HttpSource};
use super::service::{ComponentSettings, StatuspageSettings};
use super::AdapterError;

/// Components listed in a message before collapsing to `(+N more)`.
const LISTED_COMPONENTS: usize = 3;

pub(crate) async fn fetch_overall(
    source: &HttpSource,
    settings: &StatuspageSettings,
) -> Result<NormalizedStatus, AdapterError> {
    let started = Instant::now();
    let summary: Summary = source.get_json(&summary_url(&settings.base_url)).await?;
    Ok(overall_status(&summary).with_latency_ms(elapsed_ms(started)))
}

pub(crate) async fn fetch_components(
    source: &HttpSource,
    settings: &ComponentSettings,
) -> Result<NormalizedStatus, AdapterError> {
    let started = Instant::now();
    let summary: Summary = source.get_json(&summary_url(&settings.base_url)).await?;
    Ok(component_status(&summary, &settings.component_match).with_latency_ms(elapsed_ms(started)))
}

fn summary_url(base_url: &str) -> String {
    format!("{}/api/v2/summary.json", base_url.trim_end_matches('/'))
}

/// Map a summary to the page's overall status.
pub(crate) fn overall_status(summary: &Summary) -> NormalizedStatus {
    let indicator = summary.status.as_ref().and_then(|s| s.indicator.as_deref());
    let status = Status::from_statuspage_indicator(indicator);

    let active: Vec<&Incident> = summary.incidents.iter().filter(|i| i.is_active()).collect();
    let message = match active.first() {
        Some(top) => format!(
            "{} active: {}",
            active.len(),
            top.name.as_deref().unwrap_or("incident")
        ),
        None => summary
            .status
            .as_ref()
            .and_then(|s| s.description.as_deref())
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| status.key().to_string()),
    };
    NormalizedStatus::new(status, message)
}

/// Worst status among components whose name contains any of `patterns`.
pub(crate) fn component_status(summary: &Summary, patterns: &[String]) -> NormalizedStatus {
    let matched: Vec<&Component> = summary
        .components
        .iter()
        .filter(|c| matches_any(c.name.as_deref().unwrap_or_default(), patterns))
        .collect();

    if matched.is_empty() {
        let wanted: Vec<&str> = patterns.iter().map(String::as_str).filter(|p| !p.is_empty()).collect();
        let wanted = if wanted.is_empty() { "∅".to_string() } else { wanted.join(", ") };
        return NormalizedStatus::unknown(format!("No components matched: {wanted}"));
    }

    let status = worst_of(
        matched
            .iter()
            .map(|c| Status::from_statuspage_component(c.status.as_deref())),
    );

    let mut message = matched
        .iter()
        .take(LISTED_COMPONENTS)
        .map(|c| {
            format!(
                "{}: {}",
                c.name.as_deref().unwrap_or_default(),
                c.status.as_deref().unwrap_or_default()
            )
        })
        .collect::<Vec<_>>()
        .join("; ");
    if matched.len() > LISTED_COMPONENTS {
        message.push_str(&format!(" (+{} more)", matched.len() - LISTED_COMPONENTS));
    }
    NormalizedStatus::new(status, message)
}

fn matches_any(name: &str, patterns: &[String]) -> bool {
    let name = name.to_lowercase();
    patterns
        .iter()
        .filter(|p| !p.is_empty())
        .any(|p| name.contains(&p.to_lowercase()))
}

/// The parts of `/api/v2/summary.json` we read.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct Summary {
    #[serde(default)]
    status: Option<PageStatus>,
    #[serde(default)]
    incidents: Vec<Incident>,
    #[serde(default)]
    components: Vec<Component>,
}

#[derive(Debug, Deserialize)]
struct PageStatus {
    indicator: Option<String>,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Incident {
    name: Option<String>,
    status: Option<String>,
}

impl Incident {
    fn is_active(&self) -> bool {
        let status = self.status.as_deref().unwrap_or_default().to_lowercase();
        status != "resolved" && status != "postmortem"
    }
}

#[derive(Debug, Deserialize)]
struct Component {
    name: Option<String>,
    status: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary(json: &str) -> Summary {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_overall_without_incidents_uses_description() {
        let s = summary(
            r#"{"status": {"indicator": "none", "description": "All Systems Operational"},
                "incidents": []}"#,
        );
        let status = overall_status(&s);
        assert_eq!(status.status, Status::Operational);
        assert_eq!(status.message, "All Systems Operational");
    }

    #[test]
    fn test_overall_counts_unresolved_incidents() {
        let s = summary(
            r#"{"status": {"indicator": "minor", "description": "Minor Service Outage"},
                "incidents": [
                    {"name": "Elevated API errors", "status": "investigating"},
                    {"name": "Old thing", "status": "resolved"},
                    {"name": "Webhooks delayed", "status": "monitoring"}
                ]}"#,
        );
        let status = overall_status(&s);
        assert_eq!(status.status, Status::Degraded);
        assert_eq!(status.message, "2 active: Elevated API errors");
    }

    #[test]
    fn test_overall_missing_status_is_unknown() {
        let status = overall_status(&summary("{}"));
        assert_eq!(status.status, Status::Unknown);
        assert_eq!(status.message, "unknown");
    }

    #[test]
    fn test_components_worst_of_matches() {
        let s = summary(
            r#"{"components": [
                {"name": "API Requests", "status": "operational"},
                {"name": "Codex API", "status": "partial_outage"},
                {"name": "Billing", "status": "major_outage"}
            ]}"#,
        );
        let status = component_status(&s, &["api".to_string()]);
        assert_eq!(status.status, Status::Degraded);
        assert_eq!(
            status.message,
            "API Requests: operational; Codex API: partial_outage"
        );
    }

    #[test]
    fn test_components_message_truncates() {
        let s = summary(
            r#"{"components": [
                {"name": "a1", "status": "operational"},
                {"name": "a2", "status": "operational"},
                {"name": "a3", "status": "operational"},
                {"name": "a4", "status": "operational"},
                {"name": "a5", "status": "operational"}
            ]}"#,
        );
        let status = component_status(&s, &["A".to_string()]);
        assert_eq!(status.status, Status::Operational);
        assert!(status.message.ends_with(" (+2 more)"));
    }

    #[test]
    fn test_components_no_match_is_unknown() {
        let s = summary(r#"{"components": [{"name": "Billing", "status": "operational"}]}"#);
        let status = component_status(&s, &["search".to_string(), String::new()]);
        assert_eq!(status.status, Status::Unknown);
        assert_eq!(status.message, "No components matched: search");

        let status = component_status(&s, &[]);
        assert_eq!(status.message, "No components matched: ∅");
    }

    #[test]
    fn test_unrecognised_component_status_is_unknown() {
        let s = summary(r#"{"components": [{"name": "API", "status": "on_fire"}]}"#);
        assert_eq!(component_status(&s, &["api".to_string()]).status, Status::Unknown);
    }

    #[test]
    fn test_summary_url_trims_slash() {
        assert_eq!(
            summary_url("https://www.githubstatus.com/"),
            "https://www.githubstatus.com/api/v2/summary.json"
        );
    }
}
