//! Availability metrics over a service's history.

use servicedash_types::PollRecord;

/// Fraction of records that were operational.
///
/// `None` for an empty history: no signal is not the same as 0%.
pub fn uptime(records: &[PollRecord]) -> Option<f64> {
    if records.is_empty() {
        return None;
    }
    let ok = records.iter().filter(|r| r.is_operational()).count();
    Some(ok as f64 / records.len() as f64)
}

/// Number of outage onsets: transitions into a non-operational state.
///
/// The history is assumed healthy before its first record, so a history
/// that opens degraded counts one episode.
pub fn episodes(records: &[PollRecord]) -> usize {
    let mut count = 0;
    let mut prev_ok = true;
    for record in records {
        let ok = record.is_operational();
        if prev_ok && !ok {
            count += 1;
        }
        prev_ok = ok;
    }
    count
}
