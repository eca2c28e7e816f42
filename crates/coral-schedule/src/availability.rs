//! Filter generated slots down to the ones a caller can still book.
//!
//! Blocking intervals (booked calls, manual exceptions) are merged into a
//! sorted list of busy periods once; each occurrence is then checked against
//! it with a binary search instead of a pairwise scan.

use chrono::{DateTime, Utc};

use crate::interval::{ScheduleOccurrence, TimeInterval};

/// Merge overlapping or adjacent blocking intervals.
///
/// Returns a sorted, non-overlapping list of `(start, end)` busy periods.
/// Empty intervals are dropped.
pub fn merge_blocking<B: TimeInterval>(blocking: &[B]) -> Vec<(DateTime<Utc>, DateTime<Utc>)> {
    let mut intervals: Vec<(DateTime<Utc>, DateTime<Utc>)> = blocking
        .iter()
        .filter(|b| b.start() < b.end())
        .map(|b| (b.start(), b.end()))
        .collect();

    intervals.sort_by_key(|&(start, end)| (start, end));

    let mut merged: Vec<(DateTime<Utc>, DateTime<Utc>)> = Vec::with_capacity(intervals.len());
    for (start, end) in intervals {
        if let Some(last) = merged.last_mut() {
            if start <= last.1 {
                last.1 = last.1.max(end);
                continue;
            }
        }
        merged.push((start, end));
    }

    merged
}

/// Occurrences that overlap none of the blocking intervals, in input order.
pub fn available_occurrences<B: TimeInterval>(
    occurrences: &[ScheduleOccurrence],
    blocking: &[B],
) -> Vec<ScheduleOccurrence> {
    let busy = merge_blocking(blocking);

    occurrences
        .iter()
        .filter(|occurrence| !is_busy(&busy, occurrence.start, occurrence.end()))
        .cloned()
        .collect()
}

/// Whether `[start, end)` intersects any merged busy period.
fn is_busy(
    busy: &[(DateTime<Utc>, DateTime<Utc>)],
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> bool {
    // First period that is still running at `start`.
    let index = busy.partition_point(|&(_, busy_end)| busy_end <= start);
    busy.get(index)
        .is_some_and(|&(busy_start, _)| busy_start < end)
}
