//! Persisted poll records.

use crate::{NormalizedStatus, Status};

/// One persisted poll result for one service.
///
/// Every record written by the same round carries the same `timestamp`.
/// The service name is denormalized so displays need no join.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PollRecord {
    /// Round timestamp, UTC seconds since the epoch.
    pub timestamp: i64,
    pub service_id: String,
    pub service_name: String,
    pub status: Status,
    pub severity: u8,
    pub message: String,
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub latency_ms: Option<u64>,
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub value: Option<f64>,
}

impl PollRecord {
    /// Build a record from an adapter result.
    pub fn new(
        timestamp: i64,
        service_id: impl Into<String>,
        service_name: impl Into<String>,
        normalized: NormalizedStatus,
    ) -> Self {
        Self {
            timestamp,
            service_id: service_id.into(),
            service_name: service_name.into(),
            status: normalized.status,
            severity: normalized.status.severity(),
            message: normalized.message.replace('\n', " ").trim().to_string(),
            latency_ms: normalized.latency_ms,
            value: normalized.value,
        }
    }

    pub fn is_operational(&self) -> bool {
        self.status.is_operational()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_copies_status_and_severity() {
        let record = PollRecord::new(
            100,
            "gcp",
            "Google Cloud",
            NormalizedStatus::new(Status::Outage, "1 active: BigQuery").with_latency_ms(80),
        );
        assert_eq!(record.status, Status::Outage);
        assert_eq!(record.severity, 2);
        assert_eq!(record.latency_ms, Some(80));
        assert!(record.value.is_none());
        assert!(!record.is_operational());
    }

    #[test]
    fn message_is_single_line() {
        let record = PollRecord::new(
            0,
            "aws",
            "AWS",
            NormalizedStatus::new(Status::Degraded, "Active:\nEC2 latency \n"),
        );
        assert_eq!(record.message, "Active: EC2 latency");
    }
}
