//! Newest-first ordering of normalized records.

use pubsync_shared::PublicationRecord;

/// Sort by numeric year, newest first. Sentinel years count as 0 and land
/// last; equal years keep their fetch order.
pub fn rank(mut records: Vec<PublicationRecord>) -> Vec<PublicationRecord> {
    // `sort_by_key` is stable.
    records.sort_by_key(|r| std::cmp::Reverse(r.sort_year()));
    records
}
