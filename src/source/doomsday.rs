//! Bulletin of the Atomic Scientists Doomsday Clock statements.

use std::sync::LazyLock;
use std::time::Instant;

use chrono::{DateTime, Utc};
use regex::Regex;

use servicedash_types::NormalizedStatus;

use super::http::{elapsed_ms, HttpSource};
use super::service::DoomsdaySettings;
use super::AdapterError;
use crate::timeutil::parse_datetime;

const SECONDS_PER_YEAR: f64 = 365.25 * 24.0 * 3600.0;

static IT_IS_SECONDS: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"(?i)\bit\s+is\s+(?:still\s+)?(\d+)\s*seconds?\s+to\s+midnight\b").ok()
});
static SECONDS: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?i)\b(\d+)\s*seconds?\s+to\s+midnight\b").ok());
static MINUTES: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?i)\b(\d+)\s*minutes?\s+to\s+midnight\b").ok());
static STATEMENT_YEAR: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"/doomsday-clock/(\d{4})-statement/?").ok());
static HEADLINE_YEAR: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?i)\b(20\d{2})\s+Doomsday\s+Clock\b").ok());
static PUBLISHED: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r#""datePublished"\s*:\s*"([^"]+)""#).ok());

pub(crate) async fn fetch(
    source: &HttpSource,
    settings: &DoomsdaySettings,
) -> Result<NormalizedStatus, AdapterError> {
    let current_url = settings.current_url.trim();
    if current_url.is_empty() {
        return Ok(NormalizedStatus::unknown("Missing current_url"));
    }

    let started = Instant::now();
    let current = Statement::parse(&source.get_text(current_url).await?);

    let previous_url = settings
        .previous_url
        .as_deref()
        .map(str::trim)
        .filter(|u| !u.is_empty());
    let previous = match previous_url {
        Some(url) => match source.get_text(url).await {
            Ok(html) => Some(Statement::parse(&html)),
            Err(err) => {
                tracing::debug!(error = %err, "previous doomsday statement unavailable");
                None
            }
        },
        None => None,
    };
    let latency_ms = elapsed_ms(started);

    Ok(describe(&current, previous.as_ref()).with_latency_ms(latency_ms))
}

/// What a statement page tells us.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct Statement {
    pub seconds: Option<i64>,
    pub year: Option<i32>,
    pub published: Option<DateTime<Utc>>,
}

impl Statement {
    pub(crate) fn parse(html: &str) -> Self {
        Self {
            seconds: parse_seconds(html),
            year: first_capture(&STATEMENT_YEAR, html)
                .or_else(|| first_capture(&HEADLINE_YEAR, html))
                .and_then(|y| y.parse().ok()),
            published: first_capture(&PUBLISHED, html).and_then(parse_datetime),
        }
    }
}

fn parse_seconds(html: &str) -> Option<i64> {
    if let Some(seconds) = first_capture(&IT_IS_SECONDS, html).and_then(|s| s.parse().ok()) {
        return Some(seconds);
    }
    if let Some(seconds) = first_capture(&SECONDS, html).and_then(|s| s.parse().ok()) {
        return Some(seconds);
    }
    first_capture(&MINUTES, html)
        .and_then(|m| m.parse::<i64>().ok())
        .map(|minutes| minutes * 60)
}

fn first_capture<'h>(pattern: &LazyLock<Option<Regex>>, haystack: &'h str) -> Option<&'h str> {
    pattern
        .as_ref()?
        .captures(haystack)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
}

/// Describe the current setting, with its movement against the previous
/// statement when one is available. The value is the seconds to midnight.
pub(crate) fn describe(current: &Statement, previous: Option<&Statement>) -> NormalizedStatus {
    let Some(seconds) = current.seconds else {
        return NormalizedStatus::unknown("Doomsday parse error");
    };

    let mut base = format!("{seconds}s to midnight");
    if let Some(year) = current.year {
        base = format!("{base} ({year})");
    }

    let Some((prev_seconds, previous)) = previous.and_then(|p| p.seconds.map(|s| (s, p))) else {
        return NormalizedStatus::operational(base).with_value(seconds as f64);
    };

    let delta = seconds - prev_seconds;
    let direction = match delta {
        d if d < 0 => "toward midnight",
        d if d > 0 => "away from midnight",
        _ => "unchanged",
    };

    let years = match (current.published, previous.published) {
        (Some(now), Some(then)) if now > then => {
            (now - then).num_seconds() as f64 / SECONDS_PER_YEAR
        }
        _ => 1.0,
    };
    let rate = delta as f64 / years;

    let prev_label = previous
        .year
        .map(|y| y.to_string())
        .unwrap_or_else(|| "prev".to_string());
    NormalizedStatus::operational(format!(
        "{base}; Δ {delta:+}s vs {prev_label} ({direction}); ~{rate:+.2}s/yr"
    ))
    .with_value(seconds as f64)
}
