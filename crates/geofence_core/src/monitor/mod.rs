//! Region monitoring seam over the platform location engine.
//!
//! # Responsibility
//! - Define the contract the manager uses to start/stop region monitoring
//!   and to probe platform capability state.
//! - Provide an in-process implementation used as default wiring and as the
//!   test double; the native engine is a host-side collaborator.
//!
//! # Invariants
//! - `stop_monitoring` is idempotent: unknown region ids are not errors.
//! - Implementations enforce the platform ceiling on concurrently monitored
//!   regions.

use crate::model::geo_notification::GeoNotification;
use log::info;
use std::collections::HashMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Mutex;

/// Platform ceiling on concurrently monitored regions.
pub const DEFAULT_REGION_LIMIT: usize = 20;

pub type MonitorResult<T> = Result<T, MonitorError>;

/// Failure starting or stopping region monitoring.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MonitorError {
    /// The platform cannot monitor circular regions at all.
    MonitoringUnavailable,
    /// Adding the region would exceed the platform ceiling.
    RegionLimitExceeded { limit: usize },
    /// Opaque failure reported by the platform engine.
    Backend(String),
}

impl Display for MonitorError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MonitoringUnavailable => write!(f, "region monitoring is not available"),
            Self::RegionLimitExceeded { limit } => {
                write!(f, "cannot monitor more than {limit} regions")
            }
            Self::Backend(message) => write!(f, "region monitoring backend failed: {message}"),
        }
    }
}

impl Error for MonitorError {}

/// Location authorization state reported by the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthorizationStatus {
    /// User has not been asked yet.
    NotDetermined,
    /// Foreground-only grant; background transitions may be missed.
    WhenInUse,
    /// Full background grant required for reliable geofencing.
    Always,
    /// User denied or restricted location access.
    Denied,
}

/// Capability snapshot feeding requirements checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonitorStatus {
    pub region_monitoring_available: bool,
    pub location_services_enabled: bool,
    pub authorization: AuthorizationStatus,
}

/// One circular region registered with the monitoring engine.
#[derive(Debug, Clone, PartialEq)]
pub struct MonitoredRegion {
    pub id: String,
    pub latitude: f64,
    pub longitude: f64,
    pub radius: f64,
    pub notify_on_entry: bool,
    pub notify_on_exit: bool,
}

impl MonitoredRegion {
    /// Derives the region registration from a stored geofence record.
    pub fn from_record(geo: &GeoNotification) -> Self {
        Self {
            id: geo.id.clone(),
            latitude: geo.latitude,
            longitude: geo.longitude,
            radius: geo.radius,
            notify_on_entry: geo.notify_on_entry(),
            notify_on_exit: geo.notify_on_exit(),
        }
    }
}

/// Contract between the manager and the platform region engine.
pub trait RegionMonitor: Send + Sync {
    /// Registers (or re-registers) a region for boundary monitoring.
    fn start_monitoring(&self, region: &MonitoredRegion) -> MonitorResult<()>;
    /// Deregisters a region; unknown ids succeed silently.
    fn stop_monitoring(&self, region_id: &str) -> MonitorResult<()>;
    /// Ids of all currently monitored regions.
    fn monitored_region_ids(&self) -> Vec<String>;
    /// Current capability and authorization snapshot.
    fn status(&self) -> MonitorStatus;
}

/// In-process region registry standing in for the native engine.
///
/// Keeps registrations in memory and reports a fully authorized status, so
/// the plugin stays complete and testable without a device. Host shells with
/// a real engine swap in their own `RegionMonitor`.
pub struct InProcessRegionMonitor {
    regions: Mutex<HashMap<String, MonitoredRegion>>,
    limit: usize,
}

impl InProcessRegionMonitor {
    pub fn new() -> Self {
        Self::with_limit(DEFAULT_REGION_LIMIT)
    }

    pub fn with_limit(limit: usize) -> Self {
        Self {
            regions: Mutex::new(HashMap::new()),
            limit,
        }
    }

    /// Returns the registered region for inspection in tests.
    pub fn region(&self, region_id: &str) -> Option<MonitoredRegion> {
        self.regions
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(region_id)
            .cloned()
    }
}

impl Default for InProcessRegionMonitor {
    fn default() -> Self {
        Self::new()
    }
}

impl RegionMonitor for InProcessRegionMonitor {
    fn start_monitoring(&self, region: &MonitoredRegion) -> MonitorResult<()> {
        let mut regions = self
            .regions
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        if !regions.contains_key(&region.id) && regions.len() >= self.limit {
            return Err(MonitorError::RegionLimitExceeded { limit: self.limit });
        }

        info!(
            "event=region_monitor_start module=monitor status=ok region_id={} radius={} entry={} exit={}",
            region.id, region.radius, region.notify_on_entry, region.notify_on_exit
        );
        regions.insert(region.id.clone(), region.clone());
        Ok(())
    }

    fn stop_monitoring(&self, region_id: &str) -> MonitorResult<()> {
        let removed = self
            .regions
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .remove(region_id)
            .is_some();

        info!(
            "event=region_monitor_stop module=monitor status=ok region_id={region_id} was_monitored={removed}"
        );
        Ok(())
    }

    fn monitored_region_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .regions
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .keys()
            .cloned()
            .collect();
        ids.sort();
        ids
    }

    fn status(&self) -> MonitorStatus {
        MonitorStatus {
            region_monitoring_available: true,
            location_services_enabled: true,
            authorization: AuthorizationStatus::Always,
        }
    }
}
