//! Host-shell FFI crate for the geofence plugin.
//! The command surface lives in [`api`]; everything else is core logic in
//! `geofence_core`.

pub mod api;
