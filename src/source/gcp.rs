//! Google Cloud status incidents feed.

use std::time::Instant;

use chrono::{DateTime, Duration, Utc};
use serde_json::Value;

use servicedash_types::{worst_of, NormalizedStatus, Status};

use super::http::{elapsed_ms, HttpSource};
use super::service::GcpSettings;
use super::AdapterError;
use crate::timeutil::parse_datetime;

pub(crate) async fn fetch(
    source: &HttpSource,
    settings: &GcpSettings,
) -> Result<NormalizedStatus, AdapterError> {
    let started = Instant::now();
    let incidents: Value = source.get_json(&settings.incidents_url).await?;
    let latency_ms = elapsed_ms(started);
    let since = Utc::now() - Duration::hours(24);
    Ok(interpret_incidents(&incidents, &settings.product_ids, since).with_latency_ms(latency_ms))
}

/// Map the incidents list to a status for the configured products.
///
/// Incidents without an `end` are active; `since` bounds the recent count.
pub(crate) fn interpret_incidents(
    incidents: &Value,
    product_ids: &[String],
    since: DateTime<Utc>,
) -> NormalizedStatus {
    let Some(incidents) = incidents.as_array() else {
        return NormalizedStatus::unknown("Unexpected incidents JSON shape");
    };

    let product_ids: Vec<&str> = product_ids
        .iter()
        .map(String::as_str)
        .filter(|p| !p.is_empty())
        .collect();
    if product_ids.is_empty() {
        return NormalizedStatus::unknown("No product_ids configured");
    }

    let matched: Vec<&Value> = incidents
        .iter()
        .filter(|incident| affects_any(incident, &product_ids))
        .collect();

    let recent = matched
        .iter()
        .filter_map(|incident| field_time(incident, "begin"))
        .filter(|begin| *begin >= since)
        .count();

    let active: Vec<&Value> = matched
        .into_iter()
        .filter(|incident| field_time(incident, "end").is_none())
        .collect();

    let Some(top) = active.first() else {
        return NormalizedStatus::operational(format!(
            "No active incidents; {recent} in last 24h"
        ));
    };

    let status = worst_of(active.iter().map(|incident| {
        Status::from_gcp_incident(
            incident.get("status_impact").and_then(Value::as_str),
            incident.get("severity").and_then(Value::as_str),
            false,
        )
    }));
    let desc = top
        .get("external_desc")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .unwrap_or("Active incident");
    NormalizedStatus::new(status, format!("{} active: {}", active.len(), desc))
}

fn affects_any(incident: &Value, product_ids: &[&str]) -> bool {
    incident
        .get("affected_products")
        .and_then(Value::as_array)
        .is_some_and(|products| {
            products
                .iter()
                .filter_map(|p| p.get("id").and_then(Value::as_str))
                .any(|id| product_ids.contains(&id))
        })
}

fn field_time(incident: &Value, field: &str) -> Option<DateTime<Utc>> {
    incident
        .get(field)
        .and_then(Value::as_str)
        .and_then(parse_datetime)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn since() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap()
    }

    fn products() -> Vec<String> {
        vec!["bq".to_string()]
    }

    #[test]
    fn test_no_active_incidents() {
        let incidents = json!([
            {"begin": "2024-05-01T02:00:00Z", "end": "2024-05-01T03:00:00Z",
             "affected_products": [{"id": "bq"}]},
            {"begin": "2024-04-01T02:00:00Z", "end": "2024-04-01T03:00:00Z",
             "affected_products": [{"id": "bq"}]},
            {"begin": "2024-05-01T02:00:00Z", "affected_products": [{"id": "gcs"}]}
        ]);
        let status = interpret_incidents(&incidents, &products(), since());
        assert_eq!(status.status, Status::Operational);
        assert_eq!(status.message, "No active incidents; 1 in last 24h");
    }

    #[test]
    fn test_active_incident_impact_wins() {
        let incidents = json!([
            {"begin": "2024-05-01T02:00:00Z", "status_impact": "SERVICE_DISRUPTION",
             "severity": "high", "external_desc": "BigQuery query failures",
             "affected_products": [{"id": "bq"}]},
            {"begin": "2024-05-01T04:00:00Z", "severity": "low",
             "affected_products": [{"id": "bq"}]}
        ]);
        let status = interpret_incidents(&incidents, &products(), since());
        assert_eq!(status.status, Status::Degraded);
        assert_eq!(status.message, "2 active: BigQuery query failures");
    }

    #[test]
    fn test_outage_impact() {
        let incidents = json!([
            {"status_impact": "SERVICE_OUTAGE", "affected_products": [{"id": "bq"}]}
        ]);
        let status = interpret_incidents(&incidents, &products(), since());
        assert_eq!(status.status, Status::Outage);
        assert_eq!(status.message, "1 active: Active incident");
    }

    #[test]
    fn test_shape_and_config_errors() {
        let status = interpret_incidents(&json!({"incidents": []}), &products(), since());
        assert_eq!(status.message, "Unexpected incidents JSON shape");

        let status = interpret_incidents(&json!([]), &[String::new()], since());
        assert_eq!(status.status, Status::Unknown);
        assert_eq!(status.message, "No product_ids configured");
    }
}
