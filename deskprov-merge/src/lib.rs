//! List reconciliation primitives for DeskProv.
//!
//! This crate provides the pure merge functions the reconciliation core runs
//! remote-observed collections through:
//!
//! - [`keyed::reconcile`] — ordered keyed-list merge against an
//!   authoritative collection
//! - [`metadata`] — outbound metadata tombstoning and the read-side
//!   effective view
//! - [`access::reconcile`] — flat string access-list drift reconciliation
//! - [`record::reconcile_records`] — keyed sub-resource record merge
//!
//! All functions here are total: there are no invalid inputs and no I/O.
//! Apparent inconsistencies (duplicate keys, empty keys) are resolved by
//! documented precedence rules, never by returning an error. Key identity is
//! case-insensitive everywhere.

pub mod access;
pub mod keyed;
pub mod metadata;
pub mod record;

pub use keyed::{fold_key, Keyed, MergeOutcome};
