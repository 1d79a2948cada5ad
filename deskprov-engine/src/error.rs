//! Error types for the reconciliation engine.

use deskprov_types::{OperationId, RemoteObject, ResourceKind, ResourceRef};
use std::time::Duration;
use thiserror::Error;

/// Result type for engine operations.
pub type ProvisionResult<T> = Result<T, ProvisionError>;

/// Errors that can occur while reconciling a resource.
///
/// Every variant is fatal to the current reconciliation: partial results are
/// never returned as if they were complete. Transient transport failures are
/// assumed already retried by the transport collaborator and surface here
/// unretried.
#[derive(Debug, Error)]
pub enum ProvisionError {
    /// A single `submit`/`poll`/`fetch` call failed (network, auth).
    #[error("transport error: {0}")]
    Transport(String),

    /// The remote job reported explicit failure.
    #[error("remote operation {operation} failed: {reason}")]
    OperationFailed {
        /// The failed operation.
        operation: OperationId,
        /// The service's reason, surfaced verbatim.
        reason: String,
    },

    /// The remote job did not reach a terminal state within budget. The
    /// operation may still complete later; delete the resource and retry.
    #[error("remote operation {operation} did not finish within {waited:?}; delete the resource and retry")]
    OperationTimedOut {
        /// The abandoned operation.
        operation: OperationId,
        /// How long the tracker waited.
        waited: Duration,
    },

    /// The created resource never left its transitional state. Carries the
    /// last-fetched object so the caller can inspect what the service
    /// reported.
    #[error("{resource} remained in a transitional state after {attempts} stabilization attempt(s); delete it and retry the creation")]
    StabilizationExhausted {
        /// The resource that never converged.
        resource: ResourceRef,
        /// How many reads were attempted.
        attempts: u32,
        /// The final fetched object.
        last: Box<RemoteObject>,
    },

    /// An auxiliary sub-resource fetch failed during view assembly.
    #[error("failed to fetch {kind} sub-resources: {source}")]
    SubResourceFetch {
        /// Which sub-resource fetch failed.
        kind: ResourceKind,
        /// The underlying failure.
        #[source]
        source: Box<ProvisionError>,
    },

    /// The view holds no provisioned resource to act on.
    #[error("no provisioned resource to {action}")]
    MissingResource {
        /// The attempted action.
        action: &'static str,
    },
}

impl ProvisionError {
    /// Returns true if the error is the tracker's timeout outcome.
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::OperationTimedOut { .. })
    }

    /// The last-fetched object, if this is a stabilization failure.
    #[must_use]
    pub fn last_known(&self) -> Option<&RemoteObject> {
        match self {
            Self::StabilizationExhausted { last, .. } => Some(last),
            _ => None,
        }
    }
}
