//! Core type definitions for DeskProv.
//!
//! This crate defines the fundamental, transport-agnostic types used by the
//! reconciliation core:
//! - Operation and resource identifiers (UUID v7)
//! - Asynchronous operation handles and statuses
//! - Retry budgets for poll loops
//! - The remote resource data model (metadata, keyed records, views)
//!
//! Field mapping between these types and any concrete wire format belongs to
//! the transport and schema layers, not here.

mod budget;
mod ids;
mod op;
mod resource;

pub use budget::RetryBudget;
pub use ids::{OperationId, ResourceId};
pub use op::{OperationHandle, OperationStatus};
pub use resource::{
    DesiredConfig, KeyedRecord, MetadataItem, RemoteObject, ResourceKind, ResourceRef,
    ResourceState, ResourceView,
};
