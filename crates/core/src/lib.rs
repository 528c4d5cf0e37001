//! Pure domain logic for the staged tabular import pipeline.
//!
//! This crate has zero I/O (no DB, no async, no network). It provides:
//!
//! - The per-stage rule engine and its typed check results ([`checks`]).
//! - The result classifier that buckets check results into blocking,
//!   advisory, and passing sets ([`classifier`]).
//! - The correction session state machine, including the explicit
//!   propagation-choice state ([`correction`]).
//! - The master-data reconciler that maps observed values onto
//!   canonical records section by section ([`reconcile`]).
//! - The per-session stage status tracker consulted by navigation
//!   gating ([`stage`]).
//! - Cell annotation parsing at the system boundary ([`annotation`]).
//! - Pagination range math and stale-response guards ([`pagination`]).

pub mod annotation;
pub mod checks;
pub mod classifier;
pub mod correction;
pub mod error;
pub mod pagination;
pub mod reconcile;
pub mod record;
pub mod stage;
pub mod types;
