//! Provisioning client abstraction.
//!
//! Defines the three collaborator operations the core consumes — `submit`,
//! `poll`, `fetch` — so the engine can drive any transport backend. The
//! transport layer owns HTTP, wire formats, credential refresh, and
//! transient-error retry; nothing of that surfaces here.

use crate::error::{ProvisionError, ProvisionResult};
use async_trait::async_trait;
use deskprov_types::{
    KeyedRecord, MetadataItem, OperationHandle, OperationStatus, RemoteObject, ResourceKind,
    ResourceRef,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// What a submission asks the service to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmitAction {
    /// Provision a new resource.
    Create,
    /// Reshape an existing resource.
    Update,
    /// Tear down an existing resource.
    Delete,
    /// Import a new image version onto an existing resource.
    Import,
}

/// The outbound payload for one remote operation.
///
/// Metadata here is the full outbound set, tombstones included; the lists
/// and records carry desired state verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmitRequest {
    /// The requested action.
    pub action: SubmitAction,
    /// What kind of resource is being provisioned.
    pub kind: ResourceKind,
    /// Target resource for update/delete/import; `None` for create.
    pub resource: Option<ResourceRef>,
    /// The desired display name.
    pub name: String,
    /// Outbound metadata, including delete markers.
    pub metadata: Vec<MetadataItem>,
    /// Desired flat string collections by field.
    pub lists: BTreeMap<String, Vec<String>>,
    /// Desired keyed sub-resource collections by field.
    pub records: BTreeMap<String, Vec<KeyedRecord>>,
}

/// The service's acknowledgement of a submission: the async operation to
/// track plus the identifier of the resource it acts on (newly assigned for
/// creates).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmitAccepted {
    /// Handle for polling the operation.
    pub operation: OperationHandle,
    /// The resource the operation creates or mutates.
    pub resource: ResourceRef,
}

/// The transport collaborator's view of the orchestration service.
#[async_trait]
pub trait ProvisioningClient: Send + Sync {
    /// Submits an operation for asynchronous execution.
    async fn submit(&self, request: SubmitRequest) -> ProvisionResult<SubmitAccepted>;

    /// Polls the current status of a submitted operation.
    async fn poll(&self, handle: &OperationHandle) -> ProvisionResult<OperationStatus>;

    /// Reads a resource's current remote state.
    async fn fetch(&self, resource: ResourceRef) -> ProvisionResult<RemoteObject>;
}

/// A scripted client for testing.
pub mod mock {
    use super::*;
    use deskprov_types::OperationId;
    use std::collections::{HashMap, VecDeque};
    use std::sync::Mutex;

    /// A mock provisioning client driven by scripted responses.
    ///
    /// Poll statuses and fetch results are queued per call order; the last
    /// queued entry repeats once the queue would otherwise run dry, so a
    /// script of `[Running, Succeeded]` answers any number of polls.
    pub struct MockClient {
        created: ResourceRef,
        submissions: Mutex<Vec<SubmitRequest>>,
        statuses: Mutex<VecDeque<OperationStatus>>,
        polls: Mutex<usize>,
        objects: Mutex<HashMap<ResourceKind, VecDeque<Result<RemoteObject, String>>>>,
        fetched: Mutex<Vec<ResourceRef>>,
    }

    impl MockClient {
        /// Creates a mock whose submissions act on the given resource.
        pub fn new(created: ResourceRef) -> Self {
            Self {
                created,
                submissions: Mutex::new(Vec::new()),
                statuses: Mutex::new(VecDeque::new()),
                polls: Mutex::new(0),
                objects: Mutex::new(HashMap::new()),
                fetched: Mutex::new(Vec::new()),
            }
        }

        /// Queues the next poll response.
        pub fn queue_status(&self, status: OperationStatus) {
            self.statuses.lock().unwrap().push_back(status);
        }

        /// Queues several poll responses at once.
        pub fn queue_statuses(&self, statuses: impl IntoIterator<Item = OperationStatus>) {
            self.statuses.lock().unwrap().extend(statuses);
        }

        /// Queues the next fetch response for the object's resource kind.
        pub fn queue_object(&self, object: RemoteObject) {
            self.objects
                .lock()
                .unwrap()
                .entry(object.resource.kind)
                .or_default()
                .push_back(Ok(object));
        }

        /// Queues a fetch failure for the given resource kind.
        pub fn queue_fetch_error(&self, kind: ResourceKind, message: impl Into<String>) {
            self.objects
                .lock()
                .unwrap()
                .entry(kind)
                .or_default()
                .push_back(Err(message.into()));
        }

        /// How many times `poll` has been called.
        pub fn poll_count(&self) -> usize {
            *self.polls.lock().unwrap()
        }

        /// Every request passed to `submit`, in order.
        pub fn submissions(&self) -> Vec<SubmitRequest> {
            self.submissions.lock().unwrap().clone()
        }

        /// Every resource passed to `fetch`, in order.
        pub fn fetched(&self) -> Vec<ResourceRef> {
            self.fetched.lock().unwrap().clone()
        }

        fn next_scripted<T: Clone>(queue: &mut VecDeque<T>) -> Option<T> {
            if queue.len() > 1 {
                queue.pop_front()
            } else {
                queue.front().cloned()
            }
        }
    }

    #[async_trait]
    impl ProvisioningClient for MockClient {
        async fn submit(&self, request: SubmitRequest) -> ProvisionResult<SubmitAccepted> {
            let resource = request.resource.unwrap_or(self.created);
            self.submissions.lock().unwrap().push(request);
            Ok(SubmitAccepted {
                operation: OperationHandle::new(OperationId::new()),
                resource,
            })
        }

        async fn poll(&self, _handle: &OperationHandle) -> ProvisionResult<OperationStatus> {
            *self.polls.lock().unwrap() += 1;
            let mut statuses = self.statuses.lock().unwrap();
            Self::next_scripted(&mut statuses)
                .ok_or_else(|| ProvisionError::Transport("no scripted poll status".into()))
        }

        async fn fetch(&self, resource: ResourceRef) -> ProvisionResult<RemoteObject> {
            self.fetched.lock().unwrap().push(resource);
            let mut objects = self.objects.lock().unwrap();
            let queue = objects.entry(resource.kind).or_default();
            match Self::next_scripted(queue) {
                Some(Ok(object)) => Ok(object),
                Some(Err(message)) => Err(ProvisionError::Transport(message)),
                None => Err(ProvisionError::Transport(format!(
                    "no scripted object for {}",
                    resource.kind
                ))),
            }
        }
    }
}
