//! Reconciliation orchestrator — coordinates one provisioning pass.
//!
//! The orchestrator owns all I/O sequencing: build the outbound payload,
//! submit, track the operation, stabilize freshly created resources, fetch
//! the primary and auxiliary remote objects, and run every collection
//! through the merge primitives. The mergers themselves are pure; the
//! schema registry decides which fields exist per resource kind.

use crate::cancel::CancelToken;
use crate::client::{ProvisioningClient, SubmitAccepted, SubmitAction, SubmitRequest};
use crate::error::{ProvisionError, ProvisionResult};
use crate::schema::{MergeRule, SchemaRegistry};
use crate::stabilize::{CreateStabilizer, DEFAULT_BASE_DELAY, DEFAULT_MAX_ATTEMPTS};
use crate::tracker::OperationTracker;
use deskprov_merge::{access, metadata, record};
use deskprov_types::{
    DesiredConfig, OperationId, OperationStatus, RemoteObject, ResourceKind, ResourceRef,
    ResourceView, RetryBudget,
};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Events emitted while a reconciliation runs, for progress reporting.
#[derive(Debug, Clone)]
pub enum ReconcileEvent {
    /// An operation was accepted by the service.
    OperationSubmitted {
        /// The requested action.
        action: SubmitAction,
        /// The resource kind acted on.
        kind: ResourceKind,
        /// The operation to track.
        operation: OperationId,
    },
    /// Tracking finished with a terminal status.
    OperationCompleted {
        /// The tracked operation.
        operation: OperationId,
        /// The terminal status observed.
        status: OperationStatus,
    },
    /// A freshly created resource left its transitional state.
    ResourceStabilized {
        /// The converged resource.
        resource: ResourceRef,
    },
}

/// Configuration for the orchestrator.
#[derive(Debug, Clone)]
pub struct ReconcileConfig {
    /// Budget for create/update/delete operation tracking.
    pub operation_budget: RetryBudget,
    /// Budget for image-import tracking. Imports move whole disk images and
    /// routinely outlive the regular budget.
    pub import_budget: RetryBudget,
    /// Read attempts while waiting for a created resource to converge.
    pub stabilize_max_attempts: u32,
    /// Base backoff between stabilization reads; attempt `n` waits `n × base`.
    pub stabilize_base_delay: Duration,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            operation_budget: RetryBudget::fixed(
                Duration::from_secs(5),
                Duration::from_secs(600),
            ),
            import_budget: RetryBudget::fixed(
                Duration::from_secs(30),
                Duration::from_secs(3600),
            ),
            stabilize_max_attempts: DEFAULT_MAX_ATTEMPTS,
            stabilize_base_delay: DEFAULT_BASE_DELAY,
        }
    }
}

/// The reconciliation orchestrator.
///
/// One instance serves any number of sequential reconciliations; no state is
/// retained across calls except via the caller re-supplying the previous
/// view. The host framework may run orchestrators for different resource
/// instances concurrently.
pub struct ReconcileOrchestrator {
    client: Arc<dyn ProvisioningClient>,
    registry: Arc<SchemaRegistry>,
    config: ReconcileConfig,
    event_tx: Option<mpsc::Sender<ReconcileEvent>>,
}

impl ReconcileOrchestrator {
    /// Creates an orchestrator over the given client and schema registry.
    pub fn new(
        client: Arc<dyn ProvisioningClient>,
        registry: Arc<SchemaRegistry>,
        config: ReconcileConfig,
    ) -> Self {
        Self {
            client,
            registry,
            config,
            event_tx: None,
        }
    }

    /// Wires a progress-event channel.
    #[must_use]
    pub fn with_events(mut self, event_tx: mpsc::Sender<ReconcileEvent>) -> Self {
        self.event_tx = Some(event_tx);
        self
    }

    /// Reconciles declared intent with remote state — the single entry point
    /// used by create and update handlers.
    ///
    /// Creates when `previous` holds no resource ref, updates otherwise.
    /// Any failure aborts the whole pass; a partial view is never returned.
    pub async fn reconcile(
        &self,
        previous: Option<&ResourceView>,
        desired: &DesiredConfig,
        cancel: &CancelToken,
    ) -> ProvisionResult<ResourceView> {
        let target = previous.and_then(|view| view.resource);
        let creating = target.is_none();
        let action = if creating {
            SubmitAction::Create
        } else {
            SubmitAction::Update
        };

        let request = self.build_request(action, target, previous, desired);
        let budget = self.config.operation_budget;
        let (accepted, status) = self.run_operation(request, budget, cancel).await?;
        self.require_success(status, accepted.operation.id(), budget.total_timeout)?;

        let primary = if creating {
            let stabilizer = CreateStabilizer::new(
                self.config.stabilize_max_attempts,
                self.config.stabilize_base_delay,
            );
            let object = stabilizer
                .stabilize_resource(self.client.as_ref(), accepted.resource, cancel)
                .await?;
            self.emit(ReconcileEvent::ResourceStabilized {
                resource: object.resource,
            })
            .await;
            object
        } else {
            self.client.fetch(accepted.resource).await?
        };

        self.assemble_view(previous, desired, &primary).await
    }

    /// Tears down the provisioned resource.
    pub async fn delete(
        &self,
        previous: &ResourceView,
        cancel: &CancelToken,
    ) -> ProvisionResult<()> {
        let Some(resource) = previous.resource else {
            return Err(ProvisionError::MissingResource { action: "delete" });
        };

        let request = SubmitRequest {
            action: SubmitAction::Delete,
            kind: resource.kind,
            resource: Some(resource),
            name: previous.name.clone(),
            metadata: Vec::new(),
            lists: Default::default(),
            records: Default::default(),
        };

        let budget = self.config.operation_budget;
        let (accepted, status) = self.run_operation(request, budget, cancel).await?;
        self.require_success(status, accepted.operation.id(), budget.total_timeout)?;
        info!(%resource, "resource deleted");
        Ok(())
    }

    /// Imports a new image version onto the provisioned resource.
    ///
    /// Unlike [`reconcile`](Self::reconcile), a timeout here is soft: the
    /// import keeps running remotely, so the last-known remote state is
    /// fetched and returned best-effort instead of failing the pass.
    pub async fn import(
        &self,
        previous: &ResourceView,
        desired: &DesiredConfig,
        cancel: &CancelToken,
    ) -> ProvisionResult<ResourceView> {
        let Some(resource) = previous.resource else {
            return Err(ProvisionError::MissingResource { action: "import" });
        };

        let request = self.build_request(
            SubmitAction::Import,
            Some(resource),
            Some(previous),
            desired,
        );
        let budget = self.config.import_budget;
        let (accepted, status) = self.run_operation(request, budget, cancel).await?;

        match status {
            OperationStatus::Succeeded => {}
            OperationStatus::Failed { reason } => {
                return Err(ProvisionError::OperationFailed {
                    operation: accepted.operation.id(),
                    reason,
                });
            }
            _ => {
                warn!(
                    operation = %accepted.operation,
                    %resource,
                    "import did not finish within budget; returning last-known state"
                );
            }
        }

        let primary = self.client.fetch(accepted.resource).await?;
        self.assemble_view(Some(previous), desired, &primary).await
    }

    fn build_request(
        &self,
        action: SubmitAction,
        target: Option<ResourceRef>,
        previous: Option<&ResourceView>,
        desired: &DesiredConfig,
    ) -> SubmitRequest {
        let previous_metadata = previous.map(|view| view.metadata.as_slice()).unwrap_or(&[]);
        SubmitRequest {
            action,
            kind: desired.kind,
            resource: target,
            name: desired.name.clone(),
            metadata: metadata::build_outbound(&desired.metadata, previous_metadata),
            lists: desired.lists.clone(),
            records: desired.records.clone(),
        }
    }

    async fn run_operation(
        &self,
        request: SubmitRequest,
        budget: RetryBudget,
        cancel: &CancelToken,
    ) -> ProvisionResult<(SubmitAccepted, OperationStatus)> {
        let action = request.action;
        let kind = request.kind;

        let accepted = self.client.submit(request).await?;
        info!(
            operation = %accepted.operation,
            resource = %accepted.resource,
            ?action,
            "operation submitted"
        );
        self.emit(ReconcileEvent::OperationSubmitted {
            action,
            kind,
            operation: accepted.operation.id(),
        })
        .await;

        let tracker = OperationTracker::new(budget);
        let status = tracker
            .await_terminal(self.client.as_ref(), &accepted.operation, cancel)
            .await?;
        self.emit(ReconcileEvent::OperationCompleted {
            operation: accepted.operation.id(),
            status: status.clone(),
        })
        .await;

        Ok((accepted, status))
    }

    fn require_success(
        &self,
        status: OperationStatus,
        operation: OperationId,
        waited: Duration,
    ) -> ProvisionResult<()> {
        match status {
            OperationStatus::Succeeded => Ok(()),
            OperationStatus::Failed { reason } => {
                Err(ProvisionError::OperationFailed { operation, reason })
            }
            _ => Err(ProvisionError::OperationTimedOut { operation, waited }),
        }
    }

    /// Builds the new display view from the converged primary object,
    /// fetching auxiliary sub-resources as the schema requires.
    async fn assemble_view(
        &self,
        previous: Option<&ResourceView>,
        desired: &DesiredConfig,
        primary: &RemoteObject,
    ) -> ProvisionResult<ResourceView> {
        let mut view = ResourceView {
            resource: Some(primary.resource),
            name: primary.name.clone(),
            ..ResourceView::default()
        };

        // Metadata is intrinsic: surface only the keys local state tracks.
        let mut filter = desired.metadata.clone();
        if let Some(previous) = previous {
            filter.extend(previous.metadata.iter().cloned());
        }
        view.metadata = metadata::effective_view(&filter, &primary.metadata);

        let Some(schema) = self.registry.schema(desired.kind) else {
            debug!(kind = %desired.kind, "no schema registered; metadata-only view");
            return Ok(view);
        };

        // Sub-resources are fetched once per kind, never before this point:
        // their identifiers only exist post-convergence.
        let mut aux: HashMap<ResourceKind, RemoteObject> = HashMap::new();
        for field in &schema.fields {
            let source = match field.source {
                None => primary,
                Some(kind) => {
                    if !aux.contains_key(&kind) {
                        let fetched = self
                            .client
                            .fetch(ResourceRef::new(primary.resource.id, kind))
                            .await
                            .map_err(|source| ProvisionError::SubResourceFetch {
                                kind,
                                source: Box::new(source),
                            })?;
                        aux.insert(kind, fetched);
                    }
                    &aux[&kind]
                }
            };

            match field.rule {
                MergeRule::AccessList => {
                    let existing = desired
                        .lists
                        .get(field.name)
                        .map(Vec::as_slice)
                        .or_else(|| previous.map(|prev| prev.list(field.name)))
                        .unwrap_or(&[]);
                    let merged = access::reconcile(existing, source.list(field.name));
                    view.lists.insert(field.name.to_string(), merged);
                }
                MergeRule::KeyedRecords => {
                    let existing = desired
                        .records
                        .get(field.name)
                        .cloned()
                        .or_else(|| previous.map(|prev| prev.records(field.name).to_vec()))
                        .unwrap_or_default();
                    let outcome =
                        record::reconcile_records(existing, source.records(field.name).to_vec());
                    if !outcome.removed_keys.is_empty() {
                        debug!(
                            field = field.name,
                            dropped = outcome.removed_keys.len(),
                            "remote no longer reports some records"
                        );
                    }
                    view.records.insert(field.name.to_string(), outcome.items);
                }
            }
        }

        Ok(view)
    }

    /// Re-reads remote state and re-assembles the view without submitting
    /// any operation — the path used by read handlers and data sources that
    /// only need list reconciliation.
    pub async fn refresh(
        &self,
        previous: &ResourceView,
        desired: &DesiredConfig,
    ) -> ProvisionResult<ResourceView> {
        let Some(resource) = previous.resource else {
            return Err(ProvisionError::MissingResource { action: "refresh" });
        };
        let primary = self.client.fetch(resource).await?;
        self.assemble_view(Some(previous), desired, &primary).await
    }

    async fn emit(&self, event: ReconcileEvent) {
        if let Some(tx) = &self.event_tx {
            let _ = tx.send(event).await;
        }
    }
}
