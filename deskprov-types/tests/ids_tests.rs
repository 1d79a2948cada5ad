use deskprov_types::{OperationId, ResourceId};
use std::collections::HashSet;
use std::str::FromStr;

// ── OperationId ───────────────────────────────────────────────────

#[test]
fn operation_id_new_is_unique() {
    let a = OperationId::new();
    let b = OperationId::new();
    assert_ne!(a, b);
}

#[test]
fn operation_id_from_uuid_roundtrip() {
    let uuid = uuid::Uuid::now_v7();
    let id = OperationId::from_uuid(uuid);
    assert_eq!(id.as_uuid(), uuid);
}

#[test]
fn operation_id_display_and_parse() {
    let id = OperationId::new();
    let s = id.to_string();
    let parsed = OperationId::parse(&s).unwrap();
    assert_eq!(id, parsed);
}

#[test]
fn operation_id_from_str_invalid() {
    assert!(OperationId::from_str("not-a-uuid").is_err());
}

#[test]
fn operation_id_usable_in_hash_set() {
    let mut set = HashSet::new();
    let id = OperationId::new();
    set.insert(id);
    assert!(set.contains(&id));
}

#[test]
fn operation_id_serde_roundtrip() {
    let id = OperationId::new();
    let json = serde_json::to_string(&id).unwrap();
    let back: OperationId = serde_json::from_str(&json).unwrap();
    assert_eq!(id, back);
}

// ── ResourceId ────────────────────────────────────────────────────

#[test]
fn resource_id_new_is_unique() {
    let a = ResourceId::new();
    let b = ResourceId::new();
    assert_ne!(a, b);
}

#[test]
fn resource_id_display_and_parse() {
    let id = ResourceId::new();
    let parsed: ResourceId = id.to_string().parse().unwrap();
    assert_eq!(id, parsed);
}

#[test]
fn resource_id_parse_invalid() {
    assert!(ResourceId::parse("garbage").is_err());
}

#[test]
fn resource_id_serde_is_transparent() {
    let id = ResourceId::new();
    let json = serde_json::to_string(&id).unwrap();
    assert_eq!(json, format!("\"{id}\""));
}
