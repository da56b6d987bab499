//! Slack status API.

use std::time::Instant;

use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use serde_json::Value;

use servicedash_types::{NormalizedStatus, Status};

use super::http::{elapsed_ms, HttpSource};
use super::service::SlackSettings;
use super::AdapterError;
use crate::timeutil::parse_datetime;

pub(crate) async fn fetch(
    source: &HttpSource,
    settings: &SlackSettings,
) -> Result<NormalizedStatus, AdapterError> {
    let started = Instant::now();
    let current: Current = source.get_json(&settings.current_url).await?;
    let latency_ms = elapsed_ms(started);

    let mut status = current_status(&current);

    if let Some(url) = settings.history_url.as_deref().filter(|u| !u.trim().is_empty()) {
        let since = Utc::now() - Duration::hours(24);
        let part = match source.get_json::<Value>(url).await {
            Ok(history) => format!("{} in last 24h", count_since(&history, since)),
            Err(err) => {
                tracing::debug!(error = %err, "slack history fetch failed");
                "history: error".to_string()
            }
        };
        status.message = format!("{}; {}", status.message, part);
    }

    Ok(status.with_latency_ms(latency_ms))
}

/// Map the `current` payload to a status and its incident summary.
pub(crate) fn current_status(current: &Current) -> NormalizedStatus {
    let active = current.active_incidents.len();
    let status = Status::from_slack_status(current.status.as_deref(), active);
    let message = if active > 0 {
        format!("{active} active incident(s)")
    } else {
        "No active incidents".to_string()
    };
    NormalizedStatus::new(status, message)
}

/// Count history entries created at or after `since`.
///
/// Entries that are not objects or carry no parseable `date_created` are skipped.
pub(crate) fn count_since(history: &Value, since: DateTime<Utc>) -> usize {
    let Some(items) = history.as_array() else {
        return 0;
    };
    items
        .iter()
        .filter_map(|item| item.get("date_created").and_then(Value::as_str))
        .filter_map(parse_datetime)
        .filter(|created| *created >= since)
        .count()
}

#[derive(Debug, Deserialize)]
pub(crate) struct Current {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    active_incidents: Vec<Value>,
}
