//! CLI smoke entry point.
//!
//! # Responsibility
//! - Provide a minimal executable to verify `geofence_core` linkage.
//! - Keep output deterministic for quick local sanity checks.

fn main() {
    // A tiny probe validates core crate wiring independently from the
    // host-shell FFI runtime setup.
    println!("geofence_core ping={}", geofence_core::ping());
    println!("geofence_core version={}", geofence_core::core_version());
}
