//! Asynchronous operation tracking types.
//!
//! The orchestration service executes creation, update, and deletion
//! asynchronously: `submit` returns a handle, and the operation's status is
//! observed by polling until it reaches a terminal state.

use crate::OperationId;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::SystemTime;

/// A handle to a single long-running remote operation.
///
/// Immutable once created; one handle tracks exactly one operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationHandle {
    id: OperationId,
    submitted_at: SystemTime,
}

impl OperationHandle {
    /// Creates a handle for an operation submitted now.
    #[must_use]
    pub fn new(id: OperationId) -> Self {
        Self {
            id,
            submitted_at: SystemTime::now(),
        }
    }

    /// Creates a handle with an explicit submission time (for replay/tests).
    #[must_use]
    pub fn with_submitted_at(id: OperationId, submitted_at: SystemTime) -> Self {
        Self { id, submitted_at }
    }

    /// The operation's identifier.
    #[must_use]
    pub fn id(&self) -> OperationId {
        self.id
    }

    /// When the operation was submitted.
    #[must_use]
    pub fn submitted_at(&self) -> SystemTime {
        self.submitted_at
    }
}

impl fmt::Display for OperationHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id)
    }
}

/// Status of a long-running remote operation.
///
/// `Pending` and `Running` are non-terminal and may be re-polled. Once a
/// terminal status is observed, polling stops — terminal states are sticky.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum OperationStatus {
    /// Accepted by the service but not yet started.
    Pending,
    /// Currently executing.
    Running,
    /// Completed successfully.
    Succeeded,
    /// Failed; carries the service's reason verbatim.
    Failed {
        /// Human-readable failure reason, surfaced to the user as-is.
        reason: String,
    },
    /// No terminal status was observed within the retry budget. The remote
    /// operation may still complete later; callers decide whether this is
    /// retryable or fatal.
    TimedOut,
}

impl OperationStatus {
    /// Returns true once no further polling should occur.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Succeeded | Self::Failed { .. } | Self::TimedOut
        )
    }

    /// The failure reason, if this is a `Failed` status.
    #[must_use]
    pub fn failure_reason(&self) -> Option<&str> {
        match self {
            Self::Failed { reason } => Some(reason),
            _ => None,
        }
    }
}

impl fmt::Display for OperationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Running => write!(f, "running"),
            Self::Succeeded => write!(f, "succeeded"),
            Self::Failed { reason } => write!(f, "failed: {reason}"),
            Self::TimedOut => write!(f, "timed out"),
        }
    }
}
