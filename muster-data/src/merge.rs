//! Reconciling a remote member row with its cached copy.

use muster_types::Member;

/// Merges a freshly fetched member with the cached copy.
///
/// The remote row wins on scalar fields. Marks are unioned by date so a mark
/// recorded on either side is never dropped; on a date collision the cached
/// mark wins only while the member still has a queued write (the queue will
/// replay the local edit), otherwise the remote mark wins.
pub(crate) fn merge_member(remote: Member, local: &Member, local_pending: bool) -> Member {
    let mut merged = remote;
    for mark in &local.marks {
        match merged.marks.iter_mut().find(|m| m.date == mark.date) {
            Some(existing) => {
                if local_pending {
                    *existing = mark.clone();
                }
            }
            None => merged.marks.push(mark.clone()),
        }
    }
    merged.marks.sort_by(|a, b| a.date.cmp(&b.date));
    merged
}
