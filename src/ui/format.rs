//! Text formatting for board cells: readings, changes, gauges and sparklines.

use serde_json::Value;

use servicedash_types::Status;

use crate::analytics::{Change, Direction, Range};
use crate::source::{Service, SourceKind};

const SECONDS_PER_DAY: f64 = 86_400.0;
/// Upper bound on the configured `format.decimals`.
const MAX_DECIMALS: usize = 12;
const VALUE_BLOCKS: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];

/// Width of the uptime and range gauges.
pub const GAUGE_WIDTH: usize = 12;

/// Format a reading for the "now" column.
///
/// Date clocks count down to their estimate (`T-120d`, `T+3d` once
/// passed). Other readings honour the service's `format` setting.
pub fn format_value(service: &Service, value: f64, now: i64) -> String {
    if service.kind.is_date_clock() {
        let days = ((value - now as f64) / SECONDS_PER_DAY).floor() as i64;
        return if days >= 0 {
            format!("T-{days}d")
        } else {
            format!("T+{}d", days.unsigned_abs())
        };
    }

    let format = service.settings.get("format").and_then(Value::as_object);
    let text = |key: &str| {
        format
            .and_then(|f| f.get(key))
            .and_then(Value::as_str)
            .unwrap_or_default()
    };
    let thousands = format
        .and_then(|f| f.get("thousands"))
        .and_then(Value::as_bool)
        .unwrap_or(false);
    let decimals = format
        .and_then(|f| f.get("decimals"))
        .and_then(|d| match d {
            Value::Number(n) => n.as_u64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        })
        .map(|d| usize::try_from(d).unwrap_or(MAX_DECIMALS).min(MAX_DECIMALS))
        .unwrap_or_else(|| default_decimals(&service.kind, value));

    let number = format!("{value:.decimals$}");
    let number = if thousands { group_thousands(&number) } else { number };
    format!("{}{number}{}", text("prefix"), text("suffix"))
}

fn default_decimals(kind: &SourceKind, value: f64) -> usize {
    match kind {
        SourceKind::FxRate(_) => 5,
        SourceKind::CoingeckoPrice(_) if value.abs() >= 1000.0 => 0,
        _ => 2,
    }
}

/// Insert `,` separators into the integer part of a formatted number.
fn group_thousands(number: &str) -> String {
    let (sign, unsigned) = match number.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", number),
    };
    let (int, frac) = match unsigned.split_once('.') {
        Some((int, frac)) => (int, Some(frac)),
        None => (unsigned, None),
    };

    let mut grouped = String::with_capacity(int.len() + int.len() / 3);
    for (i, digit) in int.chars().enumerate() {
        if i > 0 && (int.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }
    match frac {
        Some(frac) => format!("{sign}{grouped}.{frac}"),
        None => format!("{sign}{grouped}"),
    }
}

/// The change column of a metric row and the direction it shows.
///
/// Date clocks move in days, readings with a non-zero start in percent,
/// anything else by absolute delta.
pub fn format_change(service: &Service, change: &Change) -> (String, Direction) {
    let (shown, text) = if service.kind.is_date_clock() {
        let days = change.delta() / SECONDS_PER_DAY;
        (days, format!("{days:+.1}d"))
    } else if let Some(percent) = change.percent {
        (percent, format!("{:+.1}%", percent * 100.0))
    } else {
        let delta = change.delta();
        (delta, format!("{delta:+.2}"))
    };

    let direction = if shown > 0.0 {
        Direction::Up
    } else if shown < 0.0 {
        Direction::Down
    } else {
        Direction::Flat
    };
    let arrow = match direction {
        Direction::Up => '▲',
        Direction::Down => '▼',
        Direction::Flat => '•',
    };
    (format!("{arrow}{text}"), direction)
}

/// Uptime ratio and outage episodes, e.g. ` 98%E2`.
pub fn format_uptime(uptime: Option<f64>, episodes: usize) -> String {
    let Some(ratio) = uptime else {
        return "—".to_string();
    };
    let percent = (ratio * 100.0).round() as u32;
    let episodes = if episodes > 9 {
        "9+".to_string()
    } else {
        episodes.to_string()
    };
    format!("{percent:>3}%E{episodes}")
}

/// Status chip for the "now" column, with latency when known.
pub fn status_chip(status: Status, latency_ms: Option<u64>) -> String {
    match latency_ms {
        Some(ms) => format!("● {} {ms}ms", status.short_label()),
        None => format!("● {}", status.short_label()),
    }
}

fn bar(filled: usize, width: usize) -> String {
    let filled = filled.min(width);
    format!("{}{}", "█".repeat(filled), "░".repeat(width - filled))
}

/// Uptime gauge; blank without history.
pub fn uptime_gauge(uptime: Option<f64>, width: usize) -> String {
    match uptime {
        Some(ratio) => bar((ratio * width as f64).round() as usize, width),
        None => " ".repeat(width),
    }
}

/// How an uptime ratio is colored.
pub fn uptime_level(uptime: Option<f64>) -> Status {
    match uptime {
        Some(r) if r >= 0.995 => Status::Operational,
        Some(r) if r >= 0.98 => Status::Degraded,
        Some(_) => Status::Outage,
        None => Status::Unknown,
    }
}

/// Where the current reading sits within the window's range.
pub fn range_gauge(current: f64, range: &Range, width: usize) -> String {
    bar((range.position(current) * width as f64).round() as usize, width)
}

/// One cell of the severity sparkline.
pub fn severity_cell(severity: Option<u8>) -> (char, Status) {
    match severity.and_then(Status::from_severity) {
        None if severity.is_none() => ('·', Status::Unknown),
        Some(Status::Operational) => ('▁', Status::Operational),
        Some(Status::Degraded) => ('▄', Status::Degraded),
        Some(Status::Outage) => ('█', Status::Outage),
        _ => ('░', Status::Unknown),
    }
}

/// Sparkline of bucketed readings scaled between their low and high.
/// Empty buckets show as `·`; a flat series sits mid-height.
pub fn value_sparkline(values: &[Option<f64>]) -> String {
    let readings = values.iter().flatten().copied();
    let low = readings.clone().fold(f64::INFINITY, f64::min);
    let high = readings.fold(f64::NEG_INFINITY, f64::max);

    if !low.is_finite() {
        return "·".repeat(values.len());
    }
    if high <= low {
        return VALUE_BLOCKS[3].to_string().repeat(values.len());
    }

    let top = (VALUE_BLOCKS.len() - 1) as f64;
    values
        .iter()
        .map(|v| match v {
            Some(v) => {
                let idx = ((v - low) / (high - low) * top).round() as usize;
                VALUE_BLOCKS[idx.min(VALUE_BLOCKS.len() - 1)]
            }
            None => '·',
        })
        .collect()
}

/// Single-line text cut to `width` characters, ending in `…` when cut.
pub fn truncate(text: &str, width: usize) -> String {
    let text = text.replace('\n', " ");
    let text = text.trim();
    if text.chars().count() <= width {
        return text.to_string();
    }
    let mut cut: String = text.chars().take(width.saturating_sub(1)).collect();
    cut.push('…');
    cut
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Map};

    fn service(kind: &str, settings: Value) -> Service {
        let settings = match settings {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        Service::new("svc", "Service", kind, settings).unwrap()
    }

    #[test]
    fn test_format_value_defaults() {
        let fx = service("fx_rate", json!({}));
        assert_eq!(format_value(&fx, 1.0834567, 0), "1.08346");

        let btc = service("coingecko_price", json!({"asset_id": "bitcoin"}));
        assert_eq!(format_value(&btc, 64123.7, 0), "64124");
        assert_eq!(format_value(&btc, 0.5, 0), "0.50");

        let quote = service("stooq_quote", json!({"symbol": "spy.us"}));
        assert_eq!(format_value(&quote, 512.346, 0), "512.35");
    }

    #[test]
    fn test_format_value_with_settings() {
        let btc = service(
            "coingecko_price",
            json!({"format": {"prefix": "$", "suffix": " USD", "thousands": true}}),
        );
        assert_eq!(format_value(&btc, 1234567.0, 0), "$1,234,567 USD");

        let gold = service("stooq_quote", json!({"format": {"decimals": "1", "thousands": true}}));
        assert_eq!(format_value(&gold, -2345.67, 0), "-2,345.7");
    }

    #[test]
    fn test_format_value_caps_decimals() {
        let fx = service("fx_rate", json!({"format": {"decimals": 70000}}));
        assert_eq!(format_value(&fx, 1.25, 0), "1.250000000000");

        let huge = service("fx_rate", json!({"format": {"decimals": "18446744073709551615"}}));
        assert_eq!(format_value(&huge, 1.25, 0), "1.250000000000");
    }

    #[test]
    fn test_format_date_clock() {
        let clock = service("metaculus_date", json!({"question_id": 1}));
        let now = 1_700_000_000;
        assert_eq!(format_value(&clock, (now + 10 * 86_400 + 5) as f64, now), "T-10d");
        assert_eq!(format_value(&clock, (now - 3 * 86_400) as f64, now), "T+3d");
        assert_eq!(format_value(&clock, (now - 60) as f64, now), "T+1d");
    }

    #[test]
    fn test_group_thousands() {
        assert_eq!(group_thousands("999"), "999");
        assert_eq!(group_thousands("1000.50"), "1,000.50");
        assert_eq!(group_thousands("-123456"), "-123,456");
    }

    #[test]
    fn test_format_change() {
        let fx = service("fx_rate", json!({}));
        let change = Change { first: 100.0, last: 105.0, percent: Some(0.05) };
        assert_eq!(format_change(&fx, &change), ("▲+5.0%".to_string(), Direction::Up));

        let zero = Change { first: 0.0, last: -1.5, percent: None };
        assert_eq!(format_change(&fx, &zero), ("▼-1.50".to_string(), Direction::Down));

        let clock = service("manifold_year_market", json!({"market_id": "m"}));
        let moved = Change { first: 0.0, last: 2.0 * 86_400.0, percent: None };
        assert_eq!(format_change(&clock, &moved).0, "▲+2.0d");

        let flat = Change { first: 3.0, last: 3.0, percent: Some(0.0) };
        assert_eq!(format_change(&fx, &flat), ("•+0.0%".to_string(), Direction::Flat));
    }

    #[test]
    fn test_uptime_cells() {
        assert_eq!(format_uptime(None, 0), "—");
        assert_eq!(format_uptime(Some(0.984), 2), " 98%E2");
        assert_eq!(format_uptime(Some(1.0), 12), "100%E9+");

        assert_eq!(uptime_gauge(Some(0.5), 4), "██░░");
        assert_eq!(uptime_gauge(None, 3), "   ");
        assert_eq!(uptime_level(Some(1.0)), Status::Operational);
        assert_eq!(uptime_level(Some(0.99)), Status::Degraded);
        assert_eq!(uptime_level(Some(0.5)), Status::Outage);
    }

    #[test]
    fn test_range_gauge() {
        let range = Range { low: 10.0, high: 20.0 };
        assert_eq!(range_gauge(20.0, &range, 4), "████");
        assert_eq!(range_gauge(10.0, &range, 4), "░░░░");
        let flat = Range { low: 5.0, high: 5.0 };
        assert_eq!(range_gauge(5.0, &flat, 4), "██░░");
    }

    #[test]
    fn test_sparklines() {
        let cells: String = [None, Some(0), Some(1), Some(2), Some(3)]
            .into_iter()
            .map(|s| severity_cell(s).0)
            .collect();
        assert_eq!(cells, "·▁▄█░");

        assert_eq!(value_sparkline(&[None, None]), "··");
        assert_eq!(value_sparkline(&[Some(2.0), None, Some(2.0)]), "▄▄▄");
        assert_eq!(value_sparkline(&[Some(0.0), None, Some(7.0)]), "▁·█");
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("  short\n", 10), "short");
        assert_eq!(truncate("abcdefghij", 5), "abcd…");
    }
}
