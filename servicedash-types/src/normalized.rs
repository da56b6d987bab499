//! The common result shape every source adapter produces.

use crate::Status;

/// One adapter invocation's result, normalized across source kinds.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NormalizedStatus {
    /// Aggregate status of the source.
    pub status: Status,

    /// Human-readable, source-specific message.
    pub message: String,

    /// Round-trip time of the request(s) in milliseconds.
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub latency_ms: Option<u64>,

    /// Numeric reading (price, rate, timestamp estimate, ...).
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub value: Option<f64>,
}

impl NormalizedStatus {
    pub fn new(status: Status, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            latency_ms: None,
            value: None,
        }
    }

    pub fn operational(message: impl Into<String>) -> Self {
        Self::new(Status::Operational, message)
    }

    pub fn unknown(message: impl Into<String>) -> Self {
        Self::new(Status::Unknown, message)
    }

    pub fn with_latency_ms(mut self, latency_ms: u64) -> Self {
        self.latency_ms = Some(latency_ms);
        self
    }

    pub fn with_value(mut self, value: f64) -> Self {
        self.value = Some(value);
        self
    }
}
