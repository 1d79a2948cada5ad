//! Remote resource data model.
//!
//! These types carry the collections the reconciliation core merges:
//! metadata key/value pairs, flat user lists, and keyed sub-resource records
//! (desktop assignments, power-time schedules). Which concrete wire fields
//! feed each collection is the transport layer's concern; the core only sees
//! field names declared by the schema registry.

use crate::ResourceId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A metadata key/value pair.
///
/// Keys are compared case-insensitively within one collection. An item with
/// an empty value is a tombstone: it requests deletion of the key on the
/// remote side and never appears in a merged view returned to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataItem {
    /// The key. Case-insensitive identity; an empty string is a valid key.
    pub name: String,
    /// The value. Empty marks the item as a tombstone.
    pub value: String,
}

impl MetadataItem {
    /// Creates a metadata item.
    #[must_use]
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }

    /// Creates a delete marker for the given key.
    #[must_use]
    pub fn tombstone(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: String::new(),
        }
    }

    /// Returns true if this item requests deletion of its key.
    #[must_use]
    pub fn is_tombstone(&self) -> bool {
        self.value.is_empty()
    }
}

/// The kinds of resource the core provisions or fetches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    /// A group of machines delivering desktops to users.
    DeliveryGroup,
    /// A hypervisor connection hosting provisioned machines.
    Hypervisor,
    /// An imported machine image version.
    ImageVersion,
    /// A published desktop within a delivery group.
    Desktop,
    /// A power-time scheme within a delivery group.
    PowerScheme,
    /// A provisioned machine within a delivery group.
    Machine,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::DeliveryGroup => "delivery group",
            Self::Hypervisor => "hypervisor",
            Self::ImageVersion => "image version",
            Self::Desktop => "desktop",
            Self::PowerScheme => "power scheme",
            Self::Machine => "machine",
        };
        write!(f, "{name}")
    }
}

/// A reference to a resource owned by the orchestration service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceRef {
    /// The service-assigned identifier.
    pub id: ResourceId,
    /// What kind of resource the identifier names.
    pub kind: ResourceKind,
}

impl ResourceRef {
    /// Creates a resource reference.
    #[must_use]
    pub fn new(id: ResourceId, kind: ResourceKind) -> Self {
        Self { id, kind }
    }
}

impl fmt::Display for ResourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind, self.id)
    }
}

/// Resource-level lifecycle state, as reported by a `fetch` of the resource.
///
/// Distinct from [`crate::OperationStatus`]: a creation job can report
/// `Succeeded` while the created resource itself still reports
/// `Initializing` — the two come from different remote subsystems.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceState {
    /// Created but not yet converged; reads may not reflect the final shape.
    Initializing,
    /// Converged and usable.
    Available,
    /// The service marked the resource as failed.
    Failed,
    /// Deletion in progress.
    Deleting,
}

impl ResourceState {
    /// Returns true while the resource has not yet converged.
    #[must_use]
    pub fn is_transitional(&self) -> bool {
        matches!(self, Self::Initializing)
    }
}

/// A keyed sub-resource record (a desktop assignment or a power-time
/// schedule), identified case-insensitively by `name` within its collection.
///
/// `enabled`, `settings`, and `users` are authoritative on the remote side
/// and are overwritten on merge. `annotations` are caller-held and survive
/// merges untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyedRecord {
    /// The record's key within its collection.
    pub name: String,
    /// Whether the record is active.
    pub enabled: bool,
    /// Remote-computed settings, overwritten from the authoritative side.
    pub settings: BTreeMap<String, String>,
    /// Per-record user access list, reconciled with set semantics.
    pub users: Vec<String>,
    /// Caller-attached data, preserved verbatim across merges.
    pub annotations: BTreeMap<String, String>,
}

impl KeyedRecord {
    /// Creates an enabled record with the given name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            enabled: true,
            ..Self::default()
        }
    }
}

/// A resource as observed remotely via `fetch`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteObject {
    /// The fetched resource.
    pub resource: ResourceRef,
    /// The service-side display name.
    pub name: String,
    /// Resource-level lifecycle state.
    pub state: ResourceState,
    /// Remote metadata, including keys set out-of-band.
    pub metadata: Vec<MetadataItem>,
    /// Flat string collections (allow/block lists, tenant sets) by field.
    pub lists: BTreeMap<String, Vec<String>>,
    /// Keyed sub-resource collections by field.
    pub records: BTreeMap<String, Vec<KeyedRecord>>,
}

impl RemoteObject {
    /// Creates an object with empty collections.
    #[must_use]
    pub fn new(resource: ResourceRef, name: impl Into<String>, state: ResourceState) -> Self {
        Self {
            resource,
            name: name.into(),
            state,
            metadata: Vec::new(),
            lists: BTreeMap::new(),
            records: BTreeMap::new(),
        }
    }

    /// The named flat list, empty if absent.
    #[must_use]
    pub fn list(&self, field: &str) -> &[String] {
        self.lists.get(field).map(Vec::as_slice).unwrap_or(&[])
    }

    /// The named record collection, empty if absent.
    #[must_use]
    pub fn records(&self, field: &str) -> &[KeyedRecord] {
        self.records.get(field).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// The reconciled view of a resource, as held by the schema/state layer.
///
/// This is what reconciliation returns: local intent merged with
/// remote-observed state. Tombstones never appear here.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceView {
    /// The provisioned resource, if one exists yet.
    pub resource: Option<ResourceRef>,
    /// The display name.
    pub name: String,
    /// Tracked metadata (state-filtered; out-of-band remote keys excluded).
    pub metadata: Vec<MetadataItem>,
    /// Flat string collections by field.
    pub lists: BTreeMap<String, Vec<String>>,
    /// Keyed sub-resource collections by field.
    pub records: BTreeMap<String, Vec<KeyedRecord>>,
}

impl ResourceView {
    /// The named flat list, empty if absent.
    #[must_use]
    pub fn list(&self, field: &str) -> &[String] {
        self.lists.get(field).map(Vec::as_slice).unwrap_or(&[])
    }

    /// The named record collection, empty if absent.
    #[must_use]
    pub fn records(&self, field: &str) -> &[KeyedRecord] {
        self.records.get(field).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// Locally declared intent for one resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DesiredConfig {
    /// What kind of resource to provision.
    pub kind: ResourceKind,
    /// The desired display name.
    pub name: String,
    /// Desired metadata. Duplicate keys resolve first-occurrence-wins.
    pub metadata: Vec<MetadataItem>,
    /// Desired flat string collections by field.
    pub lists: BTreeMap<String, Vec<String>>,
    /// Desired keyed sub-resource collections by field.
    pub records: BTreeMap<String, Vec<KeyedRecord>>,
}

impl DesiredConfig {
    /// Creates an intent with empty collections.
    #[must_use]
    pub fn new(kind: ResourceKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
            metadata: Vec::new(),
            lists: BTreeMap::new(),
            records: BTreeMap::new(),
        }
    }
}
