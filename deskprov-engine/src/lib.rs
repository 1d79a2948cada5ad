//! Async operation tracking and reconciliation engine for DeskProv.
//!
//! This crate drives provisioning operations against a remote
//! desktop-orchestration service and merges the remotely observed result
//! back into locally declared intent.
//!
//! # Architecture
//!
//! The service executes creation, update, and deletion asynchronously, so
//! every write follows the same shape:
//!
//! 1. **Submit**: hand the outbound payload to the service, get an
//!    operation handle back
//! 2. **Track**: poll the handle until a terminal status, under a
//!    [`RetryBudget`](deskprov_types::RetryBudget)
//! 3. **Stabilize** (creates only): re-read the new resource until it
//!    leaves its transitional state
//! 4. **Fetch**: read the primary object and any auxiliary sub-resources
//! 5. **Merge**: run every collection through the `deskprov-merge`
//!    primitives into the new display view
//!
//! ## Components
//!
//! - **Client**: the `submit`/`poll`/`fetch` seam to the transport layer
//! - **Tracker**: the bounded poll-until-terminal loop
//! - **Stabilizer**: linear-backoff retry of post-create reads
//! - **Schema**: the per-kind collection-field registry
//! - **Orchestrator**: sequences the steps and assembles the view
//!
//! All sleeps are cancellable: the host framework's deadline propagates
//! through a [`CancelToken`] into every loop.

mod cancel;
mod client;
mod error;
mod orchestrator;
mod schema;
mod stabilize;
mod tracker;

pub use cancel::{sleep_cancellable, CancelSource, CancelToken};
pub use client::{
    mock, ProvisioningClient, SubmitAccepted, SubmitAction, SubmitRequest,
};
pub use error::{ProvisionError, ProvisionResult};
pub use orchestrator::{ReconcileConfig, ReconcileEvent, ReconcileOrchestrator};
pub use schema::{fields, FieldSpec, MergeRule, ResourceSchema, SchemaRegistry};
pub use stabilize::{CreateStabilizer, DEFAULT_BASE_DELAY, DEFAULT_MAX_ATTEMPTS};
pub use tracker::OperationTracker;
