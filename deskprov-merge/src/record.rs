//! Keyed sub-resource record reconciliation.

use crate::access;
use crate::keyed::{self, MergeOutcome};
use deskprov_types::KeyedRecord;

/// Merges remote-observed records into the locally-held collection.
///
/// Remote-computed fields (`enabled`, `settings`) are overwritten from the
/// authoritative side and each record's user list is reconciled with
/// [`access::reconcile`]; caller-held `annotations` survive untouched.
/// Records the remote side no longer reports are dropped, new remote
/// records appended.
#[must_use]
pub fn reconcile_records(
    existing: Vec<KeyedRecord>,
    authoritative: Vec<KeyedRecord>,
) -> MergeOutcome<KeyedRecord> {
    keyed::reconcile(
        existing,
        authoritative,
        |local, remote| {
            local.enabled = remote.enabled;
            local.settings = remote.settings;
            local.users = access::reconcile(&local.users, &remote.users);
        },
        |remote| remote,
    )
}
