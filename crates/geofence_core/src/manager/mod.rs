//! Transition orchestration between store, monitor and delivery backends.
//!
//! # Responsibility
//! - Bridge platform monitoring callbacks to stored geofence definitions.
//! - Keep bridge commands (add/remove/list/requirements) in one place.
//!
//! # Invariants
//! - All persistence goes through the repository contract.
//! - Transition delivery is best-effort: one failing backend never blocks
//!   the others.

pub mod debounce;
pub mod geo_notification_manager;
