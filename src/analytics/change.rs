//! Change and range of a numeric series.

use serde::Serialize;

use servicedash_types::PollRecord;

/// Movement between the first and last reading of a window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Change {
    pub first: f64,
    pub last: f64,
    /// Relative change (`0.05` is +5%). `None` when `first` is zero.
    pub percent: Option<f64>,
}

impl Change {
    pub fn delta(&self) -> f64 {
        self.last - self.first
    }

    pub fn direction(&self) -> Direction {
        let delta = self.delta();
        if delta > 0.0 {
            Direction::Up
        } else if delta < 0.0 {
            Direction::Down
        } else {
            Direction::Flat
        }
    }
}

/// Sign of a change, used for the market tallies in the header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Up,
    Down,
    Flat,
}

/// Lowest and highest reading of a window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Range {
    pub low: f64,
    pub high: f64,
}

impl Range {
    /// Position of `value` within the range as a ratio in `[0, 1]`.
    /// A flat range places every value in the middle.
    pub fn position(&self, value: f64) -> f64 {
        if self.high <= self.low {
            return 0.5;
        }
        ((value - self.low) / (self.high - self.low)).clamp(0.0, 1.0)
    }
}

fn values(records: &[PollRecord]) -> impl Iterator<Item = f64> + '_ {
    records.iter().filter_map(|r| r.value)
}

/// Change across an ascending history; needs at least two readings.
pub fn value_change(records: &[PollRecord]) -> Option<Change> {
    let mut readings = values(records);
    let first = readings.next()?;
    let last = readings.last()?;
    let percent = (first != 0.0).then(|| (last - first) / first);
    Some(Change { first, last, percent })
}

/// Range of the readings in a history; `None` when there are none.
pub fn value_range(records: &[PollRecord]) -> Option<Range> {
    values(records).fold(None, |range, v| {
        Some(match range {
            None => Range { low: v, high: v },
            Some(Range { low, high }) => Range {
                low: low.min(v),
                high: high.max(v),
            },
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use servicedash_types::NormalizedStatus;

    fn series(values: &[Option<f64>]) -> Vec<PollRecord> {
        values
            .iter()
            .enumerate()
            .map(|(i, v)| {
                let mut status = NormalizedStatus::operational("");
                status.value = *v;
                PollRecord::new(i as i64, "m", "Metric", status)
            })
            .collect()
    }

    #[test]
    fn test_change_percent() {
        let change = value_change(&series(&[Some(100.0), None, Some(90.0), Some(110.0)])).unwrap();
        assert_eq!(change.first, 100.0);
        assert_eq!(change.last, 110.0);
        assert_eq!(change.delta(), 10.0);
        assert!((change.percent.unwrap() - 0.1).abs() < 1e-12);
        assert_eq!(change.direction(), Direction::Up);
    }

    #[test]
    fn test_change_from_zero_has_no_percent() {
        let change = value_change(&series(&[Some(0.0), Some(5.0)])).unwrap();
        assert_eq!(change.percent, None);
        assert_eq!(change.delta(), 5.0);
    }

    #[test]
    fn test_change_needs_two_readings() {
        assert_eq!(value_change(&series(&[])), None);
        assert_eq!(value_change(&series(&[Some(1.0), None])), None);
    }

    #[test]
    fn test_range() {
        assert_eq!(value_range(&series(&[None])), None);
        let range = value_range(&series(&[Some(3.0), Some(-1.0), None, Some(7.0)])).unwrap();
        assert_eq!(range, Range { low: -1.0, high: 7.0 });
        assert_eq!(range.position(3.0), 0.5);
        assert_eq!(range.position(100.0), 1.0);
        assert_eq!(Range { low: 2.0, high: 2.0 }.position(2.0), 0.5);
    }
}
