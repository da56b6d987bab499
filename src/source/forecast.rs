//! Forecast clocks: Metaculus date questions and Manifold year markets.
//!
//! Both report an estimated date; the value is that date as a UTC
//! timestamp so the display can count down to it.

use std::time::Instant;

use serde_json::Value;

use servicedash_types::NormalizedStatus;

use super::http::{elapsed_ms, HttpSource};
use super::service::{ManifoldSettings, MetaculusSettings};
use super::AdapterError;
use crate::analytics::{expected_value, quantile, year_to_timestamp, CdfPoint, WeightedOption};
use crate::timeutil::{iso_date, parse_datetime};

/// Characters of a market question kept in the message.
const QUESTION_CHARS: usize = 40;

pub(crate) async fn fetch_metaculus(
    source: &HttpSource,
    settings: &MetaculusSettings,
) -> Result<NormalizedStatus, AdapterError> {
    if settings.question_id <= 0 {
        return Ok(NormalizedStatus::unknown("Metaculus: missing question_id"));
    }

    let url = format!(
        "https://www.metaculus.com/api2/questions/{}/",
        settings.question_id
    );
    let started = Instant::now();
    let data: Value = source.get_json(&url).await?;
    let latency_ms = elapsed_ms(started);

    Ok(metaculus_estimate(
        &data,
        settings.question_id,
        settings.aggregation(),
        settings.quantile(),
    )
    .with_latency_ms(latency_ms))
}

/// Read the aggregate CDF of a date question and invert it at `q`.
pub(crate) fn metaculus_estimate(
    data: &Value,
    question_id: i64,
    aggregation: &str,
    q: f64,
) -> NormalizedStatus {
    let Some(question) = data.get("question").filter(|v| v.is_object()) else {
        return NormalizedStatus::unknown("Metaculus: unexpected response");
    };

    let range = question
        .pointer("/scaling/continuous_range")
        .and_then(Value::as_array);
    let latest = question
        .get("aggregations")
        .and_then(|aggs| aggs.get(aggregation))
        .and_then(|agg| agg.get("latest"));
    let cdf = latest
        .and_then(|l| l.get("forecast_values"))
        .and_then(Value::as_array);

    let (Some(range), Some(cdf)) = (range, cdf) else {
        return NormalizedStatus::unknown("Metaculus: missing aggregate CDF");
    };
    if range.len() != cdf.len() || range.len() < 2 {
        return NormalizedStatus::unknown("Metaculus: missing aggregate CDF");
    }

    let points: Vec<CdfPoint> = range
        .iter()
        .zip(cdf)
        .filter_map(|(x, y)| Some(CdfPoint::new(range_timestamp(x)?, number(y)?)))
        .collect();
    if points.len() < 2 {
        return NormalizedStatus::unknown("Metaculus: parse error");
    }

    let Some(eta) = quantile(&points, q) else {
        return NormalizedStatus::unknown("Metaculus: quantile not found");
    };

    let forecasters = latest
        .and_then(|l| l.get("forecaster_count"))
        .and_then(Value::as_i64)
        .map(|n| format!(" n={n}"))
        .unwrap_or_default();
    NormalizedStatus::operational(format!(
        "Metaculus Q{question_id} q={q:.2}{forecasters} ETA {}",
        iso_date(eta.floor() as i64)
    ))
    .with_value(eta)
}

/// A point of the question's range: a date string or epoch seconds.
fn range_timestamp(x: &Value) -> Option<f64> {
    match x {
        Value::String(s) => parse_datetime(s).map(|dt| dt.timestamp() as f64),
        Value::Number(n) => n.as_f64(),
        _ => None,
    }
}

fn number(v: &Value) -> Option<f64> {
    match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

pub(crate) async fn fetch_manifold(
    source: &HttpSource,
    settings: &ManifoldSettings,
) -> Result<NormalizedStatus, AdapterError> {
    let market_id = settings.market_id.trim();
    if market_id.is_empty() {
        return Ok(NormalizedStatus::unknown("Manifold: missing market_id"));
    }

    let url = format!("https://api.manifold.markets/v0/market/{market_id}");
    let started = Instant::now();
    let data: Value = source.get_json(&url).await?;
    let latency_ms = elapsed_ms(started);

    Ok(manifold_estimate(&data, market_id).with_latency_ms(latency_ms))
}

/// Expected year implied by a multiple-choice market's answers.
pub(crate) fn manifold_estimate(data: &Value, market_id: &str) -> NormalizedStatus {
    let answers = match data.get("answers").and_then(Value::as_array) {
        Some(answers) if !answers.is_empty() => answers,
        _ => return NormalizedStatus::unknown("Manifold: missing answers"),
    };

    let options: Vec<WeightedOption> = answers
        .iter()
        .filter(|a| a.is_object())
        .map(|a| {
            WeightedOption::new(
                a.get("text").and_then(Value::as_str).unwrap_or_default(),
                a.get("probability").and_then(Value::as_f64),
            )
        })
        .collect();

    let Some(year) = expected_value(&options) else {
        return NormalizedStatus::unknown("Manifold: no parsable year probs");
    };
    let Some(eta) = year_to_timestamp(year) else {
        return NormalizedStatus::unknown("Manifold: no parsable year probs");
    };

    let question = data
        .get("question")
        .and_then(Value::as_str)
        .map(str::trim)
        .unwrap_or_default();
    let label = match shorten(question) {
        q if q.is_empty() => "Manifold".to_string(),
        q => q,
    };
    NormalizedStatus::operational(format!(
        "Manifold {market_id} E[year]={year:.1} ETA {} ({label})",
        iso_date(eta.floor() as i64)
    ))
    .with_value(eta)
}

fn shorten(question: &str) -> String {
    if question.chars().count() <= QUESTION_CHARS {
        return question.to_string();
    }
    let mut short: String = question.chars().take(QUESTION_CHARS - 1).collect();
    short.push('…');
    short
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use servicedash_types::Status;

    fn question(forecasts: Value) -> Value {
        json!({
            "id": 3479,
            "question": {
                "scaling": {
                    "continuous_range": [
                        "2030-01-01T00:00:00Z",
                        "2040-01-01T00:00:00Z",
                        "2050-01-01T00:00:00Z"
                    ]
                },
                "aggregations": {
                    "recency_weighted": {
                        "latest": {"forecast_values": forecasts, "forecaster_count": 1523}
                    }
                }
            }
        })
    }

    #[test]
    fn test_metaculus_median() {
        let data = question(json!([0.0, 0.5, 1.0]));
        let status = metaculus_estimate(&data, 3479, "recency_weighted", 0.5);
        assert_eq!(status.status, Status::Operational);
        assert_eq!(status.message, "Metaculus Q3479 q=0.50 n=1523 ETA 2040-01-01");
        // 2040-01-01T00:00:00Z
        assert_eq!(status.value, Some(2_208_988_800.0));
    }

    #[test]
    fn test_metaculus_missing_aggregation() {
        let data = question(json!([0.0, 0.5, 1.0]));
        let status = metaculus_estimate(&data, 1, "unweighted", 0.5);
        assert_eq!(status.status, Status::Unknown);
        assert_eq!(status.message, "Metaculus: missing aggregate CDF");

        let status = metaculus_estimate(&question(json!([0.0, 1.0])), 1, "recency_weighted", 0.5);
        assert_eq!(status.message, "Metaculus: missing aggregate CDF");
    }

    #[test]
    fn test_metaculus_bad_payloads() {
        assert_eq!(
            metaculus_estimate(&json!({"detail": "Not found."}), 1, "recency_weighted", 0.5).message,
            "Metaculus: unexpected response"
        );
        let status = metaculus_estimate(&question(json!(["x", null, "y"])), 1, "recency_weighted", 0.5);
        assert_eq!(status.message, "Metaculus: parse error");

        let status = metaculus_estimate(&question(json!([0.0, 0.2, 0.4])), 1, "recency_weighted", 0.9);
        assert_eq!(status.message, "Metaculus: quantile not found");
    }

    #[test]
    fn test_manifold_expected_year() {
        let data = json!({
            "question": "When will the first crewed Mars landing happen?",
            "answers": [
                {"text": "2030", "probability": 0.6},
                {"text": "2040", "probability": 0.4},
                {"text": "Never", "probability": 0.2}
            ]
        });
        let status = manifold_estimate(&data, "abc123");
        assert_eq!(status.status, Status::Operational);
        assert!(status.message.starts_with("Manifold abc123 E[year]=2034.0 ETA 2034-01-01 ("));
        assert!(status.message.ends_with("…)"));
        assert_eq!(status.value, year_to_timestamp(2034.0));
    }

    #[test]
    fn test_manifold_missing_data() {
        assert_eq!(
            manifold_estimate(&json!({"answers": []}), "m").message,
            "Manifold: missing answers"
        );
        let data = json!({"answers": [{"text": "Soon", "probability": 0.9}]});
        assert_eq!(manifold_estimate(&data, "m").message, "Manifold: no parsable year probs");
    }

    #[test]
    fn test_shorten_question() {
        assert_eq!(shorten("Short?"), "Short?");
        let long = "x".repeat(41);
        let short = shorten(&long);
        assert_eq!(short.chars().count(), 40);
        assert!(short.ends_with('…'));
    }
}
