//! Per-kind collection-field registry.
//!
//! Built once at startup and passed by reference into the orchestrator;
//! there is no hidden global state. Each schema enumerates a resource's
//! nested-collection fields, the merge rule each follows, and — for fields
//! whose remote data lives on an auxiliary sub-resource — which kind to
//! fetch it from. Metadata is intrinsic to every resource and is not listed
//! here. Empty representations come from the view types' `Default` impls.

use deskprov_types::ResourceKind;
use std::collections::HashMap;

/// Well-known collection field names.
pub mod fields {
    /// Users allowed to access the resource.
    pub const ALLOWED_USERS: &str = "allowed_users";
    /// Users explicitly denied access.
    pub const BLOCKED_USERS: &str = "blocked_users";
    /// Tenants associated with the resource.
    pub const ASSOCIATED_TENANTS: &str = "associated_tenants";
    /// Published desktops within a delivery group.
    pub const DESKTOPS: &str = "desktops";
    /// Power-time schemes within a delivery group.
    pub const POWER_SCHEMES: &str = "power_schemes";
    /// Provisioned machine names within a delivery group.
    pub const MACHINES: &str = "machines";
}

/// How a collection field is merged against remote data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeRule {
    /// Flat string set with local-order preservation.
    AccessList,
    /// Keyed records with caller annotations preserved.
    KeyedRecords,
}

/// One nested-collection field of a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    /// The field's name in views and payloads.
    pub name: &'static str,
    /// How the field merges.
    pub rule: MergeRule,
    /// Auxiliary sub-resource carrying the field's remote data; `None` when
    /// the primary object carries it.
    pub source: Option<ResourceKind>,
}

impl FieldSpec {
    /// A field carried by the primary object.
    #[must_use]
    pub const fn primary(name: &'static str, rule: MergeRule) -> Self {
        Self {
            name,
            rule,
            source: None,
        }
    }

    /// A field fetched from an auxiliary sub-resource.
    #[must_use]
    pub const fn from_sub_resource(
        name: &'static str,
        rule: MergeRule,
        source: ResourceKind,
    ) -> Self {
        Self {
            name,
            rule,
            source: Some(source),
        }
    }
}

/// A resource kind's collection fields.
#[derive(Debug, Clone)]
pub struct ResourceSchema {
    /// The kind this schema describes.
    pub kind: ResourceKind,
    /// The kind's collection fields, in merge order.
    pub fields: Vec<FieldSpec>,
}

/// Registry of resource schemas, keyed by kind.
#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    schemas: HashMap<ResourceKind, ResourceSchema>,
}

impl SchemaRegistry {
    /// An empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The registry for the built-in resource kinds.
    #[must_use]
    pub fn builtin() -> Self {
        let mut registry = Self::new();

        registry.register(ResourceSchema {
            kind: ResourceKind::DeliveryGroup,
            fields: vec![
                FieldSpec::primary(fields::ALLOWED_USERS, MergeRule::AccessList),
                FieldSpec::primary(fields::BLOCKED_USERS, MergeRule::AccessList),
                FieldSpec::primary(fields::ASSOCIATED_TENANTS, MergeRule::AccessList),
                FieldSpec::from_sub_resource(
                    fields::DESKTOPS,
                    MergeRule::KeyedRecords,
                    ResourceKind::Desktop,
                ),
                FieldSpec::from_sub_resource(
                    fields::POWER_SCHEMES,
                    MergeRule::KeyedRecords,
                    ResourceKind::PowerScheme,
                ),
                FieldSpec::from_sub_resource(
                    fields::MACHINES,
                    MergeRule::AccessList,
                    ResourceKind::Machine,
                ),
            ],
        });

        // Hypervisors and image versions carry only metadata.
        registry.register(ResourceSchema {
            kind: ResourceKind::Hypervisor,
            fields: Vec::new(),
        });
        registry.register(ResourceSchema {
            kind: ResourceKind::ImageVersion,
            fields: Vec::new(),
        });

        registry
    }

    /// Registers (or replaces) a schema.
    pub fn register(&mut self, schema: ResourceSchema) {
        self.schemas.insert(schema.kind, schema);
    }

    /// Looks up the schema for a kind.
    #[must_use]
    pub fn schema(&self, kind: ResourceKind) -> Option<&ResourceSchema> {
        self.schemas.get(&kind)
    }
}
