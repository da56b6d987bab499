//! Everything derived for one service from a snapshot of its history.

use serde::Serialize;

use servicedash_types::PollRecord;

use super::{episodes, severity_buckets, uptime, value_buckets, value_change, value_range, Change, Range};

/// Per-service analytics over a history window.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Digest {
    pub latest: Option<PollRecord>,
    pub samples: usize,
    pub uptime: Option<f64>,
    pub episodes: usize,
    pub change: Option<Change>,
    pub range: Option<Range>,
    pub severity_trend: Vec<Option<u8>>,
    pub value_trend: Vec<Option<f64>>,
}

impl Digest {
    /// Derive the digest from the latest record and the ascending history
    /// of the last `hours`, bucketed into `buckets` trend slots.
    pub fn derive(
        latest: Option<PollRecord>,
        history: &[PollRecord],
        now: i64,
        hours: u32,
        buckets: usize,
    ) -> Self {
        Self {
            latest,
            samples: history.len(),
            uptime: uptime(history),
            episodes: episodes(history),
            change: value_change(history),
            range: value_range(history),
            severity_trend: severity_buckets(history, now, hours, buckets),
            value_trend: value_buckets(history, now, hours, buckets),
        }
    }

    /// Current reading, if the latest record has one.
    pub fn current_value(&self) -> Option<f64> {
        self.latest.as_ref().and_then(|r| r.value)
    }
}
