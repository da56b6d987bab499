//! Fixed-width time buckets for trend sparklines.

use servicedash_types::PollRecord;

/// Width in seconds of each of `count` buckets covering `hours`.
fn bucket_width(hours: u32, count: usize) -> i64 {
    let span = i64::from(hours) * 3600;
    (span / count as i64).max(1)
}

/// Slot of `ts` within the window starting at `start`, or `None` if it
/// falls before the window. Late records land in the last bucket.
fn slot(ts: i64, start: i64, width: i64, count: usize) -> Option<usize> {
    if ts < start {
        return None;
    }
    let idx = usize::try_from((ts - start) / width).unwrap_or(usize::MAX);
    Some(idx.min(count - 1))
}

/// Worst severity per bucket over `[now - hours, now]`.
///
/// Buckets without records are `None` (no data), never healthy.
pub fn severity_buckets(records: &[PollRecord], now: i64, hours: u32, count: usize) -> Vec<Option<u8>> {
    if count == 0 {
        return Vec::new();
    }
    let start = now - i64::from(hours) * 3600;
    let width = bucket_width(hours, count);

    let mut buckets = vec![None; count];
    for record in records {
        if let Some(idx) = slot(record.timestamp, start, width, count) {
            let worst = buckets[idx].map_or(record.severity, |s: u8| s.max(record.severity));
            buckets[idx] = Some(worst);
        }
    }
    buckets
}

/// Latest reading per bucket over `[now - hours, now]`.
///
/// Records are expected in ascending time order; within a bucket the last
/// one wins. Records without a value are skipped.
pub fn value_buckets(records: &[PollRecord], now: i64, hours: u32, count: usize) -> Vec<Option<f64>> {
    if count == 0 {
        return Vec::new();
    }
    let start = now - i64::from(hours) * 3600;
    let width = bucket_width(hours, count);

    let mut buckets = vec![None; count];
    for record in records {
        let Some(value) = record.value else {
            continue;
        };
        if let Some(idx) = slot(record.timestamp, start, width, count) {
            buckets[idx] = Some(value);
        }
    }
    buckets
}

#[cfg(test)]
mod tests {
    use super::*;
    use servicedash_types::{NormalizedStatus, Status};

    const NOW: i64 = 1_700_000_000;

    fn record(timestamp: i64, status: Status, value: Option<f64>) -> PollRecord {
        let mut normalized = NormalizedStatus::new(status, "");
        normalized.value = value;
        PollRecord::new(timestamp, "svc", "Service", normalized)
    }

    #[test]
    fn test_bucket_keeps_worst_severity() {
        // 24 one-hour buckets; all three land in the last one.
        let records = vec![
            record(NOW - 120, Status::Operational, None),
            record(NOW - 60, Status::Outage, None),
            record(NOW - 10, Status::Operational, None),
        ];
        let buckets = severity_buckets(&records, NOW, 24, 24);
        assert_eq!(buckets.len(), 24);
        assert_eq!(buckets[23], Some(2));
        assert!(buckets[..23].iter().all(Option::is_none));
    }

    #[test]
    fn test_bucket_placement_and_window() {
        let records = vec![
            record(NOW - 25 * 3600, Status::Outage, None),
            record(NOW - 24 * 3600, Status::Degraded, None),
            record(NOW - 12 * 3600, Status::Operational, None),
            record(NOW + 3600, Status::Unknown, None),
        ];
        let buckets = severity_buckets(&records, NOW, 24, 4);
        assert_eq!(buckets, vec![Some(1), None, Some(0), Some(3)]);
    }

    #[test]
    fn test_value_buckets_last_write_wins() {
        let records = vec![
            record(NOW - 300, Status::Operational, Some(10.0)),
            record(NOW - 200, Status::Operational, None),
            record(NOW - 100, Status::Operational, Some(12.5)),
            record(NOW - 23 * 3600, Status::Operational, Some(3.0)),
        ];
        let buckets = value_buckets(&records, NOW, 24, 2);
        assert_eq!(buckets, vec![Some(3.0), Some(12.5)]);
    }

    #[test]
    fn test_zero_buckets() {
        let records = vec![record(NOW, Status::Operational, Some(1.0))];
        assert!(severity_buckets(&records, NOW, 24, 0).is_empty());
        assert!(value_buckets(&records, NOW, 24, 0).is_empty());
    }

    #[test]
    fn test_tiny_window_has_minimum_width() {
        let records = vec![record(NOW, Status::Degraded, None)];
        let buckets = severity_buckets(&records, NOW, 0, 5);
        assert_eq!(buckets, vec![Some(1), None, None, None, None]);
    }
}
