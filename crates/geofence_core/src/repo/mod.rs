//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define the geofence store contract used by the manager.
//! - Isolate SQLite query details from orchestration code.
//!
//! # Invariants
//! - Repository writes must enforce `GeoNotification::validate()` before
//!   persistence.
//! - Repository APIs return semantic errors (`NotFound`) in addition to DB
//!   transport errors.

pub mod geo_notification_repo;
