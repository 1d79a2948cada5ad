//! Poll-until-terminal tracking of a single remote operation.

use crate::cancel::{sleep_cancellable, CancelToken};
use crate::client::ProvisioningClient;
use crate::error::ProvisionResult;
use deskprov_types::{OperationHandle, OperationStatus, RetryBudget};
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Drives one submitted operation to a terminal status.
///
/// One tracker instance is scoped to one operation; it holds no state across
/// invocations beyond its budget.
#[derive(Debug, Clone)]
pub struct OperationTracker {
    budget: RetryBudget,
}

impl OperationTracker {
    /// Creates a tracker with the given budget.
    #[must_use]
    pub fn new(budget: RetryBudget) -> Self {
        Self { budget }
    }

    /// The tracker's budget.
    #[must_use]
    pub fn budget(&self) -> &RetryBudget {
        &self.budget
    }

    /// Polls the operation until it reports a terminal status.
    ///
    /// Returns the first terminal status observed, or
    /// [`OperationStatus::TimedOut`] once the budget's wall-clock ceiling or
    /// attempt cap is reached without one. Cancellation during a sleep also
    /// yields `TimedOut` — the remote operation may still complete later,
    /// and the caller decides whether that is retryable or fatal. Poll
    /// transport errors propagate immediately.
    pub async fn await_terminal(
        &self,
        client: &dyn ProvisioningClient,
        handle: &OperationHandle,
        cancel: &CancelToken,
    ) -> ProvisionResult<OperationStatus> {
        let started = Instant::now();
        let mut attempt: u32 = 0;

        loop {
            if started.elapsed() >= self.budget.total_timeout {
                warn!(
                    operation = %handle,
                    waited = ?started.elapsed(),
                    "operation did not reach a terminal state within budget"
                );
                return Ok(OperationStatus::TimedOut);
            }

            let status = client.poll(handle).await?;
            attempt += 1;
            debug!(operation = %handle, attempt, %status, "polled operation");

            if status.is_terminal() {
                info!(operation = %handle, %status, "operation reached terminal state");
                return Ok(status);
            }

            if self.budget.attempts_exhausted(attempt) {
                warn!(
                    operation = %handle,
                    attempts = attempt,
                    "operation still not terminal after the attempt cap"
                );
                return Ok(OperationStatus::TimedOut);
            }

            let remaining = self.budget.total_timeout.saturating_sub(started.elapsed());
            if remaining.is_zero() {
                warn!(operation = %handle, "poll budget exhausted");
                return Ok(OperationStatus::TimedOut);
            }

            let delay = self.budget.delay_for(attempt).min(remaining);
            if !sleep_cancellable(delay, cancel).await {
                warn!(operation = %handle, "polling cancelled; reporting timeout");
                return Ok(OperationStatus::TimedOut);
            }
        }
    }
}
