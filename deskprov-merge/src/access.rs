//! Flat string access-list reconciliation.
//!
//! The single canonical "drift-reconcile a flat string set while preserving
//! local ordering" primitive. Reused for allow-lists, block-lists,
//! per-desktop access lists, and associated-tenant sets.

use crate::keyed::fold_key;
use std::collections::HashSet;

/// Reconciles a locally displayed string list against the remote-confirmed
/// one, with case-insensitive set semantics.
///
/// An existing entry survives iff the remote side still confirms it, keeping
/// its original position among survivors and its local spelling. Remote
/// entries not present locally are appended in remote-reported order. An
/// empty `remote` yields an empty result.
#[must_use]
pub fn reconcile(existing: &[String], remote: &[String]) -> Vec<String> {
    let confirmed: HashSet<String> = remote.iter().map(|e| fold_key(e)).collect();

    let mut out = Vec::with_capacity(remote.len());
    let mut seen = HashSet::with_capacity(remote.len());

    for entry in existing {
        let folded = fold_key(entry);
        if confirmed.contains(&folded) && seen.insert(folded) {
            out.push(entry.clone());
        }
    }
    for entry in remote {
        let folded = fold_key(entry);
        if seen.insert(folded) {
            out.push(entry.clone());
        }
    }

    out
}
