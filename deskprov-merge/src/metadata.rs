//! Metadata tombstoning and the read-side effective view.
//!
//! Outbound requests carry the full desired metadata set plus explicit
//! delete markers (empty-value tombstones) for keys the previous state
//! tracked but the new desired set dropped. The provenance marker is always
//! present so the service can tell provider-managed resources apart.

use crate::keyed::fold_key;
use deskprov_types::MetadataItem;
use std::collections::HashSet;

/// Reserved metadata key marking a resource as provider-managed.
pub const PROVENANCE_KEY: &str = "Provisioned-By";

/// Value written under [`PROVENANCE_KEY`] when the caller did not supply one.
pub const PROVENANCE_VALUE: &str = "deskprov";

/// Builds the outbound metadata payload for a submit.
///
/// Starts from `desired`, de-duplicated case-insensitively (first occurrence
/// wins), ensures the provenance pair is present (a caller-supplied item
/// under the reserved key is left as-is), and appends a tombstone for every
/// key in `previous` that the de-duplicated desired set no longer names.
#[must_use]
pub fn build_outbound(desired: &[MetadataItem], previous: &[MetadataItem]) -> Vec<MetadataItem> {
    let mut out: Vec<MetadataItem> = Vec::with_capacity(desired.len() + previous.len() + 1);
    let mut seen: HashSet<String> = HashSet::with_capacity(desired.len() + 1);

    for item in desired {
        if seen.insert(fold_key(&item.name)) {
            out.push(item.clone());
        }
    }

    // Ensure provenance before tombstoning so a previously written marker is
    // re-asserted rather than deleted.
    if seen.insert(fold_key(PROVENANCE_KEY)) {
        out.push(MetadataItem::new(PROVENANCE_KEY, PROVENANCE_VALUE));
    }

    for item in previous {
        if seen.insert(fold_key(&item.name)) {
            out.push(MetadataItem::tombstone(item.name.clone()));
        }
    }

    out
}

/// Filters remote metadata down to the keys the local state tracks.
///
/// Returns the subset of `remote` whose keys case-insensitively match a key
/// in `state_filter`, in remote order, with tombstones dropped. An empty
/// filter yields an empty view, not the full remote set: the provider only
/// surfaces metadata it is itself tracking, deliberately ignoring keys added
/// out-of-band. That can hide legitimate remote changes; it is a
/// compatibility-preserving policy, not an oversight.
#[must_use]
pub fn effective_view(
    state_filter: &[MetadataItem],
    remote: &[MetadataItem],
) -> Vec<MetadataItem> {
    let tracked: HashSet<String> = state_filter.iter().map(|i| fold_key(&i.name)).collect();

    remote
        .iter()
        .filter(|item| !item.is_tombstone() && tracked.contains(&fold_key(&item.name)))
        .cloned()
        .collect()
}
