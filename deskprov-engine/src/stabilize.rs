//! Post-creation stabilization of eventually-consistent resources.
//!
//! A creation job can report `Succeeded` while an immediate read of the new
//! resource still reports a transitional state — the job tracker and the
//! resource read path are different remote subsystems with different
//! completion signals. This module retries the *read*, never the submit.

use crate::cancel::{sleep_cancellable, CancelToken};
use crate::client::ProvisioningClient;
use crate::error::{ProvisionError, ProvisionResult};
use deskprov_types::{RemoteObject, ResourceRef};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Default number of read attempts before giving up.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 6;

/// Default base delay; attempt `n` sleeps `n × base`.
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_secs(10);

/// Retries a fresh resource's read until it leaves its transitional state.
#[derive(Debug, Clone)]
pub struct CreateStabilizer {
    max_attempts: u32,
    base_delay: Duration,
}

impl CreateStabilizer {
    /// Creates a stabilizer. A zero attempt count is treated as one.
    #[must_use]
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
        }
    }

    /// Fetches via `fetch` until `is_transitional` clears.
    ///
    /// Fetch errors propagate unmasked. Between attempts the backoff grows
    /// linearly (`attempt × base_delay`). Exhaustion — and cancellation
    /// mid-backoff — returns [`ProvisionError::StabilizationExhausted`]
    /// carrying the last-fetched object, so the caller can still inspect
    /// what the service reported.
    pub async fn stabilize<F, Fut, P>(
        &self,
        mut fetch: F,
        is_transitional: P,
        cancel: &CancelToken,
    ) -> ProvisionResult<RemoteObject>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = ProvisionResult<RemoteObject>>,
        P: Fn(&RemoteObject) -> bool,
    {
        let mut last: Option<RemoteObject> = None;

        for attempt in 1..=self.max_attempts {
            let object = fetch().await?;

            if !is_transitional(&object) {
                info!(resource = %object.resource, attempt, "resource stabilized");
                return Ok(object);
            }

            debug!(
                resource = %object.resource,
                attempt,
                max_attempts = self.max_attempts,
                "resource still transitional"
            );
            last = Some(object);

            if attempt < self.max_attempts {
                let delay = self.base_delay.saturating_mul(attempt);
                if !sleep_cancellable(delay, cancel).await {
                    warn!("stabilization cancelled");
                    return Err(Self::exhausted(attempt, last));
                }
            }
        }

        Err(Self::exhausted(self.max_attempts, last))
    }

    /// [`stabilize`](Self::stabilize) against the client's resource read,
    /// using the resource's own lifecycle state as the transition signal.
    pub async fn stabilize_resource(
        &self,
        client: &dyn ProvisioningClient,
        resource: ResourceRef,
        cancel: &CancelToken,
    ) -> ProvisionResult<RemoteObject> {
        self.stabilize(
            || client.fetch(resource),
            |object| object.state.is_transitional(),
            cancel,
        )
        .await
    }

    fn exhausted(attempts: u32, last: Option<RemoteObject>) -> ProvisionError {
        // `last` is always set when this is reached: the first attempt
        // either returned, errored, or recorded its object.
        match last {
            Some(object) => ProvisionError::StabilizationExhausted {
                resource: object.resource,
                attempts,
                last: Box::new(object),
            },
            None => ProvisionError::Transport("stabilization saw no object".into()),
        }
    }
}

impl Default for CreateStabilizer {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ATTEMPTS, DEFAULT_BASE_DELAY)
    }
}
