//! Numeric estimators used by the forecast sources.
//!
//! - [`quantile`]: inverse-CDF interpolation over a discretized cumulative
//!   distribution, used to turn a forecast curve into a single date.
//! - [`expected_value`]: probability-weighted mean over discrete options
//!   whose labels parse to years.

use chrono::{Duration, TimeZone, Utc};

const SECONDS_PER_DAY: f64 = 86_400.0;
const DAYS_PER_YEAR: f64 = 365.25;

/// One point of a cumulative distribution: `y` is `P(X <= x)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CdfPoint {
    pub x: f64,
    pub y: f64,
}

impl CdfPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Invert a cumulative distribution at probability `p`.
///
/// Points must be ascending in `x`. Non-finite points are ignored and at
/// least two must remain. A `p` at or below the first cumulative value
/// returns the first `x`; a bracket with no probability width returns its
/// right endpoint. Returns `None` when no point reaches `p`.
///
/// # Example
///
/// ```
/// use servicedash::analytics::{quantile, CdfPoint};
///
/// let cdf = [CdfPoint::new(0.0, 0.0), CdfPoint::new(100.0, 0.5), CdfPoint::new(200.0, 1.0)];
/// assert_eq!(quantile(&cdf, 0.25), Some(50.0));
/// ```
pub fn quantile(points: &[CdfPoint], p: f64) -> Option<f64> {
    let points: Vec<CdfPoint> = points
        .iter()
        .copied()
        .filter(|pt| pt.x.is_finite() && pt.y.is_finite())
        .collect();
    if points.len() < 2 || !p.is_finite() {
        return None;
    }

    let first = points[0];
    if p <= first.y {
        return Some(first.x);
    }

    let i = points.iter().position(|pt| pt.y >= p)?;
    let (lo, hi) = (points[i.checked_sub(1)?], points[i]);
    if hi.y <= lo.y {
        return Some(hi.x);
    }

    let frac = ((p - lo.y) / (hi.y - lo.y)).clamp(0.0, 1.0);
    if frac >= 1.0 {
        return Some(hi.x);
    }
    Some(lo.x + (hi.x - lo.x) * frac)
}

/// A discrete option with its market probability.
#[derive(Debug, Clone, PartialEq)]
pub struct WeightedOption {
    pub label: String,
    pub probability: Option<f64>,
}

impl WeightedOption {
    pub fn new(label: impl Into<String>, probability: Option<f64>) -> Self {
        Self {
            label: label.into(),
            probability,
        }
    }
}

/// Probability-weighted mean of the options' year-like labels.
///
/// Options whose label does not parse, or whose probability is missing,
/// count toward neither the sum nor the probability mass. Returns `None`
/// when the remaining mass is not positive.
pub fn expected_value(options: &[WeightedOption]) -> Option<f64> {
    let (weighted, mass) = options
        .iter()
        .filter_map(|opt| {
            let year = parse_yearish(&opt.label)?;
            let p = opt.probability.filter(|p| p.is_finite())?;
            Some((year, p))
        })
        .fold((0.0, 0.0), |(sum, mass), (year, p)| (sum + year * p, mass + p));

    (mass > 0.0).then(|| weighted / mass)
}

/// Read a year-like label.
///
/// Accepts a bare year (`2031`), a range averaged to its midpoint
/// (`2030-2034`, with `-`, `–` or `—`), and a decade mapped to its middle
/// (`2030s` is 2035). Only years in 1900..=2099 are recognised.
pub fn parse_yearish(text: &str) -> Option<f64> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    if let Some(year) = bare_year(text) {
        return Some(year);
    }
    if let Some((from, to)) = text.split_once(['-', '–', '—']) {
        let from = bare_year(from.trim_end())?;
        let to = bare_year(to.trim_start())?;
        return Some((from + to) / 2.0);
    }
    text.strip_suffix('s').and_then(bare_year).map(|decade| decade + 5.0)
}

fn bare_year(text: &str) -> Option<f64> {
    let is_year = text.len() == 4
        && text.bytes().all(|b| b.is_ascii_digit())
        && (text.starts_with("19") || text.starts_with("20"));
    if is_year {
        text.parse().ok()
    } else {
        None
    }
}

/// Convert a fractional year to a UTC timestamp: January 1st of the whole
/// year plus the fraction of 365.25 days.
pub fn year_to_timestamp(year: f64) -> Option<f64> {
    if !year.is_finite() {
        return None;
    }
    let whole = year.trunc();
    let frac = (year - whole).clamp(0.0, 1.0);
    let start = Utc.with_ymd_and_hms(whole as i32, 1, 1, 0, 0, 0).single()?;
    let offset = Duration::milliseconds((frac * DAYS_PER_YEAR * SECONDS_PER_DAY * 1000.0) as i64);
    let at = start + offset;
    Some(at.timestamp() as f64 + f64::from(at.timestamp_subsec_millis()) / 1000.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    const T0: f64 = 1_700_000_000.0;
    const T1: f64 = 1_800_000_000.0;
    const T2: f64 = 1_900_000_000.0;

    fn curve() -> Vec<CdfPoint> {
        vec![
            CdfPoint::new(T0, 0.0),
            CdfPoint::new(T1, 0.5),
            CdfPoint::new(T2, 1.0),
        ]
    }

    #[test]
    fn test_quantile_interpolates_within_bracket() {
        assert_eq!(quantile(&curve(), 0.25), Some((T0 + T1) / 2.0));
        assert_eq!(quantile(&curve(), 0.75), Some((T1 + T2) / 2.0));
    }

    #[test]
    fn test_quantile_endpoints_are_exact() {
        assert_eq!(quantile(&curve(), 0.0), Some(T0));
        assert_eq!(quantile(&curve(), 0.5), Some(T1));
        assert_eq!(quantile(&curve(), 1.0), Some(T2));
        assert_eq!(quantile(&curve(), -0.3), Some(T0));
    }

    #[test]
    fn test_quantile_unreached_probability() {
        let cdf = vec![
            CdfPoint::new(T0, 0.2),
            CdfPoint::new(T1, 0.2),
            CdfPoint::new(T2, 0.2),
        ];
        assert_eq!(quantile(&cdf, 0.5), None);

        let cdf = vec![CdfPoint::new(T0, 0.1), CdfPoint::new(T1, 0.6), CdfPoint::new(T2, 0.4)];
        assert_eq!(quantile(&cdf, 0.6), Some(T1));
    }

    #[test]
    fn test_quantile_needs_two_valid_points() {
        assert_eq!(quantile(&[], 0.5), None);
        assert_eq!(quantile(&[CdfPoint::new(T0, 0.0)], 0.5), None);
        let cdf = vec![CdfPoint::new(T0, 0.0), CdfPoint::new(f64::NAN, 1.0)];
        assert_eq!(quantile(&cdf, 0.5), None);
    }

    #[test]
    fn test_expected_value() {
        let options = vec![
            WeightedOption::new("2030", Some(0.6)),
            WeightedOption::new("2040", Some(0.4)),
        ];
        let value = expected_value(&options).unwrap();
        assert!((value - 2034.0).abs() < 1e-9);
    }

    #[test]
    fn test_expected_value_excludes_unparsable_options() {
        let options = vec![
            WeightedOption::new("2030", Some(0.3)),
            WeightedOption::new("Never", Some(0.5)),
            WeightedOption::new("2040", None),
            WeightedOption::new("2050", Some(0.1)),
        ];
        let value = expected_value(&options).unwrap();
        assert!((value - 2035.0).abs() < 1e-9);
    }

    #[test]
    fn test_expected_value_without_mass() {
        assert_eq!(expected_value(&[]), None);
        assert_eq!(expected_value(&[WeightedOption::new("2030", Some(0.0))]), None);
        assert_eq!(expected_value(&[WeightedOption::new("later", Some(1.0))]), None);
    }

    #[test]
    fn test_parse_yearish() {
        assert_eq!(parse_yearish(" 2031 "), Some(2031.0));
        assert_eq!(parse_yearish("2030-2034"), Some(2032.0));
        assert_eq!(parse_yearish("2030 – 2040"), Some(2035.0));
        assert_eq!(parse_yearish("1990s"), Some(1995.0));
        assert_eq!(parse_yearish("2130"), None);
        assert_eq!(parse_yearish("203"), None);
        assert_eq!(parse_yearish("before 2030"), None);
        assert_eq!(parse_yearish(""), None);
    }

    #[test]
    fn test_year_to_timestamp() {
        // 2024-01-01T00:00:00Z
        assert_eq!(year_to_timestamp(2024.0), Some(1_704_067_200.0));
        let half = year_to_timestamp(2024.5).unwrap();
        assert_eq!(half, 1_704_067_200.0 + 0.5 * 365.25 * 86_400.0);
        assert_eq!(year_to_timestamp(f64::INFINITY), None);
    }
}
