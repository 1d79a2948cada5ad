use deskprov_engine::mock::MockClient;
use deskprov_engine::{
    fields, CancelToken, ProvisionError, ReconcileConfig, ReconcileEvent, ReconcileOrchestrator,
    SchemaRegistry, SubmitAction,
};
use deskprov_merge::metadata::{PROVENANCE_KEY, PROVENANCE_VALUE};
use deskprov_types::{
    DesiredConfig, KeyedRecord, MetadataItem, OperationStatus, RemoteObject, ResourceId,
    ResourceKind, ResourceRef, ResourceState, ResourceView,
};
use pretty_assertions::assert_eq;
use std::sync::Arc;
use tokio::sync::mpsc;

fn group_ref() -> ResourceRef {
    ResourceRef::new(ResourceId::new(), ResourceKind::DeliveryGroup)
}

fn orchestrator(client: Arc<MockClient>) -> ReconcileOrchestrator {
    ReconcileOrchestrator::new(
        client,
        Arc::new(SchemaRegistry::builtin()),
        ReconcileConfig::default(),
    )
}

fn meta(pairs: &[(&str, &str)]) -> Vec<MetadataItem> {
    pairs
        .iter()
        .map(|(n, v)| MetadataItem::new(*n, *v))
        .collect()
}

/// Scripts the full set of fetches a delivery-group view assembly performs.
fn queue_group_remote(client: &MockClient, resource: ResourceRef, state: ResourceState) {
    let mut primary = RemoteObject::new(resource, "group-1", state);
    primary.metadata = meta(&[
        ("env", "prod"),
        (PROVENANCE_KEY, PROVENANCE_VALUE),
        ("unrelated", "x"),
    ]);
    primary.lists.insert(
        fields::ALLOWED_USERS.into(),
        vec!["domain\\alice".into(), "domain\\bob".into()],
    );
    client.queue_object(primary);

    let mut desktops = RemoteObject::new(
        ResourceRef::new(resource.id, ResourceKind::Desktop),
        "group-1 desktops",
        ResourceState::Available,
    );
    let mut desktop = KeyedRecord::new("desktop-1");
    desktop.users = vec!["domain\\alice".into()];
    desktops.records.insert(fields::DESKTOPS.into(), vec![desktop]);
    client.queue_object(desktops);

    let schemes = RemoteObject::new(
        ResourceRef::new(resource.id, ResourceKind::PowerScheme),
        "group-1 power schemes",
        ResourceState::Available,
    );
    client.queue_object(schemes);

    let mut machines = RemoteObject::new(
        ResourceRef::new(resource.id, ResourceKind::Machine),
        "group-1 machines",
        ResourceState::Available,
    );
    machines
        .lists
        .insert(fields::MACHINES.into(), vec!["machine-001".into()]);
    client.queue_object(machines);
}

fn group_desired() -> DesiredConfig {
    let mut desired = DesiredConfig::new(ResourceKind::DeliveryGroup, "group-1");
    desired.metadata = meta(&[("env", "prod")]);
    desired
        .lists
        .insert(fields::ALLOWED_USERS.into(), vec!["DOMAIN\\Alice".into()]);
    let mut desktop = KeyedRecord::new("desktop-1");
    desktop
        .annotations
        .insert("managed_by".into(), "platform-team".into());
    desired.records.insert(fields::DESKTOPS.into(), vec![desktop]);
    desired
}

// ── create ────────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn create_submits_tracks_and_merges() {
    let resource = group_ref();
    let client = Arc::new(MockClient::new(resource));
    client.queue_statuses([OperationStatus::Running, OperationStatus::Succeeded]);
    queue_group_remote(&client, resource, ResourceState::Available);

    let orch = orchestrator(client.clone());
    let view = orch
        .reconcile(None, &group_desired(), &CancelToken::never())
        .await
        .unwrap();

    assert_eq!(view.resource, Some(resource));
    assert_eq!(view.name, "group-1");
    assert_eq!(client.poll_count(), 2);

    // Only state-tracked metadata surfaces; the provenance marker and the
    // out-of-band key stay hidden.
    assert_eq!(view.metadata, meta(&[("env", "prod")]));

    // Local spelling survives, the remote-confirmed extra is appended.
    assert_eq!(
        view.list(fields::ALLOWED_USERS),
        vec!["DOMAIN\\Alice".to_string(), "domain\\bob".to_string()]
    );
    assert!(view.list(fields::BLOCKED_USERS).is_empty());
    assert_eq!(view.list(fields::MACHINES), vec!["machine-001".to_string()]);

    // Remote-owned desktop fields arrive; caller annotations survive.
    let desktops = view.records(fields::DESKTOPS);
    assert_eq!(desktops.len(), 1);
    assert_eq!(desktops[0].users, vec!["domain\\alice".to_string()]);
    assert_eq!(
        desktops[0].annotations.get("managed_by").map(String::as_str),
        Some("platform-team")
    );

    let submissions = client.submissions();
    assert_eq!(submissions.len(), 1);
    assert_eq!(submissions[0].action, SubmitAction::Create);
    assert_eq!(submissions[0].resource, None);
    // The outbound payload carries the provenance pair.
    assert!(submissions[0]
        .metadata
        .iter()
        .any(|i| i.name == PROVENANCE_KEY && i.value == PROVENANCE_VALUE));
}

#[tokio::test(start_paused = true)]
async fn create_waits_out_transitional_reads() {
    let resource = group_ref();
    let client = Arc::new(MockClient::new(resource));
    client.queue_status(OperationStatus::Succeeded);

    // Two transitional reads before the converged one.
    client.queue_object(RemoteObject::new(resource, "group-1", ResourceState::Initializing));
    client.queue_object(RemoteObject::new(resource, "group-1", ResourceState::Initializing));
    queue_group_remote(&client, resource, ResourceState::Available);

    let orch = orchestrator(client.clone());
    let view = orch
        .reconcile(None, &group_desired(), &CancelToken::never())
        .await
        .unwrap();

    assert_eq!(view.resource, Some(resource));
    let primary_fetches = client
        .fetched()
        .iter()
        .filter(|r| r.kind == ResourceKind::DeliveryGroup)
        .count();
    assert_eq!(primary_fetches, 3);
}

#[tokio::test(start_paused = true)]
async fn create_stuck_initializing_is_fatal() {
    let resource = group_ref();
    let client = Arc::new(MockClient::new(resource));
    client.queue_status(OperationStatus::Succeeded);
    client.queue_object(RemoteObject::new(resource, "group-1", ResourceState::Initializing));

    let orch = orchestrator(client.clone());
    let err = orch
        .reconcile(None, &group_desired(), &CancelToken::never())
        .await
        .unwrap_err();

    match err {
        ProvisionError::StabilizationExhausted { attempts, last, .. } => {
            assert_eq!(attempts, 6);
            assert_eq!(last.state, ResourceState::Initializing);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test(start_paused = true)]
async fn failed_operation_aborts_with_the_verbatim_reason() {
    let resource = group_ref();
    let client = Arc::new(MockClient::new(resource));
    client.queue_status(OperationStatus::Failed {
        reason: "insufficient capacity in zone".into(),
    });

    let orch = orchestrator(client.clone());
    let err = orch
        .reconcile(None, &group_desired(), &CancelToken::never())
        .await
        .unwrap_err();

    match err {
        ProvisionError::OperationFailed { reason, .. } => {
            assert_eq!(reason, "insufficient capacity in zone");
        }
        other => panic!("unexpected error: {other}"),
    }
    // No partial reconciliation: nothing was fetched.
    assert!(client.fetched().is_empty());
}

#[tokio::test(start_paused = true)]
async fn create_timeout_is_fatal() {
    let resource = group_ref();
    let client = Arc::new(MockClient::new(resource));
    client.queue_status(OperationStatus::Running);

    let orch = orchestrator(client.clone());
    let err = orch
        .reconcile(None, &group_desired(), &CancelToken::never())
        .await
        .unwrap_err();

    assert!(err.is_timeout());
    assert!(client.fetched().is_empty());
}

// ── update ────────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn update_reconciles_metadata_end_to_end() {
    let resource = ResourceRef::new(ResourceId::new(), ResourceKind::Hypervisor);
    let client = Arc::new(MockClient::new(resource));
    client.queue_status(OperationStatus::Succeeded);

    let mut remote = RemoteObject::new(resource, "hv-east", ResourceState::Available);
    remote.metadata = meta(&[("env", "prod"), ("owner", "team-a"), ("unrelated", "x")]);
    client.queue_object(remote);

    let previous = ResourceView {
        resource: Some(resource),
        name: "hv-east".into(),
        metadata: meta(&[("env", "dev"), ("owner", "team-a")]),
        ..ResourceView::default()
    };
    let mut desired = DesiredConfig::new(ResourceKind::Hypervisor, "hv-east");
    desired.metadata = meta(&[("env", "prod")]);

    let orch = orchestrator(client.clone());
    let view = orch
        .reconcile(Some(&previous), &desired, &CancelToken::never())
        .await
        .unwrap();

    // State-tracked keys only: `unrelated` is out-of-band and stays hidden.
    assert_eq!(view.metadata, meta(&[("env", "prod"), ("owner", "team-a")]));

    // The outbound payload tombstoned the dropped key.
    let submissions = client.submissions();
    assert_eq!(submissions[0].action, SubmitAction::Update);
    assert_eq!(submissions[0].resource, Some(resource));
    assert!(submissions[0]
        .metadata
        .iter()
        .any(|i| i.name == "owner" && i.is_tombstone()));
}

#[tokio::test(start_paused = true)]
async fn update_does_not_wait_for_transitional_state() {
    let resource = ResourceRef::new(ResourceId::new(), ResourceKind::Hypervisor);
    let client = Arc::new(MockClient::new(resource));
    client.queue_status(OperationStatus::Succeeded);
    client.queue_object(RemoteObject::new(resource, "hv-east", ResourceState::Initializing));

    let previous = ResourceView {
        resource: Some(resource),
        name: "hv-east".into(),
        ..ResourceView::default()
    };
    let desired = DesiredConfig::new(ResourceKind::Hypervisor, "hv-east");

    let orch = orchestrator(client.clone());
    orch.reconcile(Some(&previous), &desired, &CancelToken::never())
        .await
        .unwrap();

    // A single read, no stabilization retries.
    assert_eq!(client.fetched().len(), 1);
}

// ── sub-resource fetches ──────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn failing_sub_resource_fetch_names_the_kind() {
    let resource = group_ref();
    let client = Arc::new(MockClient::new(resource));
    client.queue_status(OperationStatus::Succeeded);

    let mut primary = RemoteObject::new(resource, "group-1", ResourceState::Available);
    primary
        .lists
        .insert(fields::ALLOWED_USERS.into(), vec!["domain\\alice".into()]);
    client.queue_object(primary);
    client.queue_fetch_error(ResourceKind::Desktop, "listing desktops failed");

    let orch = orchestrator(client.clone());
    let err = orch
        .reconcile(None, &group_desired(), &CancelToken::never())
        .await
        .unwrap_err();

    match err {
        ProvisionError::SubResourceFetch { kind, .. } => {
            assert_eq!(kind, ResourceKind::Desktop);
        }
        other => panic!("unexpected error: {other}"),
    }
}

// ── delete ────────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn delete_submits_and_awaits() {
    let resource = group_ref();
    let client = Arc::new(MockClient::new(resource));
    client.queue_statuses([OperationStatus::Running, OperationStatus::Succeeded]);

    let previous = ResourceView {
        resource: Some(resource),
        name: "group-1".into(),
        ..ResourceView::default()
    };

    let orch = orchestrator(client.clone());
    orch.delete(&previous, &CancelToken::never()).await.unwrap();

    let submissions = client.submissions();
    assert_eq!(submissions.len(), 1);
    assert_eq!(submissions[0].action, SubmitAction::Delete);
    assert_eq!(submissions[0].resource, Some(resource));
}

#[tokio::test(start_paused = true)]
async fn delete_without_a_resource_is_rejected() {
    let client = Arc::new(MockClient::new(group_ref()));
    let orch = orchestrator(client);

    let err = orch
        .delete(&ResourceView::default(), &CancelToken::never())
        .await
        .unwrap_err();
    assert!(matches!(err, ProvisionError::MissingResource { .. }));
}

#[tokio::test(start_paused = true)]
async fn delete_timeout_is_fatal() {
    let resource = group_ref();
    let client = Arc::new(MockClient::new(resource));
    client.queue_status(OperationStatus::Running);

    let previous = ResourceView {
        resource: Some(resource),
        name: "group-1".into(),
        ..ResourceView::default()
    };

    let orch = orchestrator(client);
    let err = orch
        .delete(&previous, &CancelToken::never())
        .await
        .unwrap_err();
    assert!(err.is_timeout());
}

// ── import ────────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn import_timeout_returns_the_last_known_view() {
    let resource = ResourceRef::new(ResourceId::new(), ResourceKind::ImageVersion);
    let client = Arc::new(MockClient::new(resource));
    client.queue_status(OperationStatus::Running);

    let mut remote = RemoteObject::new(resource, "image-v2", ResourceState::Available);
    remote.metadata = meta(&[("version", "2")]);
    client.queue_object(remote);

    let previous = ResourceView {
        resource: Some(resource),
        name: "image-v1".into(),
        ..ResourceView::default()
    };
    let mut desired = DesiredConfig::new(ResourceKind::ImageVersion, "image-v2");
    desired.metadata = meta(&[("version", "2")]);

    let orch = orchestrator(client.clone());
    let view = orch
        .import(&previous, &desired, &CancelToken::never())
        .await
        .unwrap();

    // Soft timeout: the pass still yields the best-effort remote state.
    assert_eq!(view.metadata, meta(&[("version", "2")]));
    assert_eq!(client.submissions()[0].action, SubmitAction::Import);
}

#[tokio::test(start_paused = true)]
async fn import_failure_is_still_fatal() {
    let resource = ResourceRef::new(ResourceId::new(), ResourceKind::ImageVersion);
    let client = Arc::new(MockClient::new(resource));
    client.queue_status(OperationStatus::Failed {
        reason: "image checksum mismatch".into(),
    });

    let previous = ResourceView {
        resource: Some(resource),
        name: "image-v1".into(),
        ..ResourceView::default()
    };
    let desired = DesiredConfig::new(ResourceKind::ImageVersion, "image-v2");

    let orch = orchestrator(client);
    let err = orch
        .import(&previous, &desired, &CancelToken::never())
        .await
        .unwrap_err();

    match err {
        ProvisionError::OperationFailed { reason, .. } => {
            assert_eq!(reason, "image checksum mismatch");
        }
        other => panic!("unexpected error: {other}"),
    }
}

// ── refresh ───────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn refresh_reads_without_submitting() {
    let resource = ResourceRef::new(ResourceId::new(), ResourceKind::Hypervisor);
    let client = Arc::new(MockClient::new(resource));

    let mut remote = RemoteObject::new(resource, "hv-east", ResourceState::Available);
    remote.metadata = meta(&[("env", "prod")]);
    client.queue_object(remote);

    let previous = ResourceView {
        resource: Some(resource),
        name: "hv-east".into(),
        metadata: meta(&[("env", "dev")]),
        ..ResourceView::default()
    };
    let mut desired = DesiredConfig::new(ResourceKind::Hypervisor, "hv-east");
    desired.metadata = meta(&[("env", "prod")]);

    let orch = orchestrator(client.clone());
    let view = orch.refresh(&previous, &desired).await.unwrap();

    assert_eq!(view.metadata, meta(&[("env", "prod")]));
    assert!(client.submissions().is_empty());
    assert_eq!(client.poll_count(), 0);
}

// ── events ────────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn event_channel_observes_the_create_sequence() {
    let resource = group_ref();
    let client = Arc::new(MockClient::new(resource));
    client.queue_statuses([OperationStatus::Running, OperationStatus::Succeeded]);
    queue_group_remote(&client, resource, ResourceState::Available);

    let (tx, mut rx) = mpsc::channel(16);
    let orch = orchestrator(client).with_events(tx);
    orch.reconcile(None, &group_desired(), &CancelToken::never())
        .await
        .unwrap();

    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }

    assert_eq!(events.len(), 3);
    assert!(matches!(
        events[0],
        ReconcileEvent::OperationSubmitted {
            action: SubmitAction::Create,
            kind: ResourceKind::DeliveryGroup,
            ..
        }
    ));
    assert!(matches!(
        &events[1],
        ReconcileEvent::OperationCompleted {
            status: OperationStatus::Succeeded,
            ..
        }
    ));
    assert!(matches!(
        events[2],
        ReconcileEvent::ResourceStabilized { resource: r } if r == resource
    ));
}
