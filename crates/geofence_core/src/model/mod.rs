//! Domain model for geofence definitions.
//!
//! # Responsibility
//! - Define the canonical record shared by store, manager and bridge layers.
//! - Keep the wire shape stable for the host bridge JSON contract.
//!
//! # Invariants
//! - Every record is identified by a caller-supplied stable `id`.
//! - Records are validated before persistence and after load.

pub mod geo_notification;
