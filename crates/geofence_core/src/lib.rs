//! Core domain logic for the geofence plugin.
//! This crate is the single source of truth for geofencing invariants.

pub mod db;
pub mod logging;
pub mod manager;
pub mod model;
pub mod monitor;
pub mod notify;
pub mod repo;

pub use logging::{default_log_level, init_logging, logging_status};
pub use manager::debounce::{TransitionDebouncer, DEFAULT_DEBOUNCE_WINDOW};
pub use manager::geo_notification_manager::{
    GeoNotificationManager, ManagerError, ManagerResult, RequirementsReport, TransitionEvent,
    TransitionSink,
};
pub use model::geo_notification::{
    GeoNotification, GeoNotificationValidationError, NotificationPayload, TransitionKind,
};
pub use monitor::{
    AuthorizationStatus, InProcessRegionMonitor, MonitorError, MonitorResult, MonitorStatus,
    MonitoredRegion, RegionMonitor, DEFAULT_REGION_LIMIT,
};
pub use notify::local::{
    LocalNotificationRequest, LocalNotifier, LogLocalNotifier, NotificationPermissions,
    NotifyError, NotifyResult,
};
pub use notify::webhook::{WebhookDispatcher, WebhookRequest};
pub use repo::geo_notification_repo::{
    GeoNotificationRepository, RepoError, RepoResult, SqliteGeoNotificationRepository,
};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
