//! Geofence transition manager.
//!
//! # Responsibility
//! - Bridge platform region callbacks to stored geofence definitions.
//! - Orchestrate store, region monitor, local notifier, webhook dispatcher
//!   and the bridge relay sink behind bridge commands.
//!
//! # Invariants
//! - A transition is delivered at most once per (region, kind) within the
//!   debounce window.
//! - Notification and webhook delivery are best-effort; their failures are
//!   logged and never abort the remaining delivery steps.
//! - Requirement problems are collected into warning/error lists, never
//!   raised as panics.

use crate::manager::debounce::TransitionDebouncer;
use crate::model::geo_notification::{GeoNotification, TransitionKind};
use crate::monitor::{AuthorizationStatus, MonitorError, MonitoredRegion, RegionMonitor};
use crate::notify::local::{LocalNotificationRequest, LocalNotifier};
use crate::notify::webhook::{WebhookDispatcher, WebhookRequest};
use crate::repo::geo_notification_repo::{GeoNotificationRepository, RepoError};
use log::{error, info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

pub type ManagerResult<T> = Result<T, ManagerError>;

/// Failure of a bridge-level manager operation.
#[derive(Debug)]
pub enum ManagerError {
    Repo(RepoError),
    Monitor(MonitorError),
}

impl Display for ManagerError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Repo(err) => write!(f, "{err}"),
            Self::Monitor(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ManagerError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            Self::Monitor(err) => Some(err),
        }
    }
}

impl From<RepoError> for ManagerError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

impl From<MonitorError> for ManagerError {
    fn from(value: MonitorError) -> Self {
        Self::Monitor(value)
    }
}

/// Requirement problems collected for a single bridge response.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequirementsReport {
    pub warnings: Vec<String>,
    pub errors: Vec<String>,
}

impl RequirementsReport {
    /// Whether geofencing can work at all in the current state.
    pub fn ok(&self) -> bool {
        self.errors.is_empty()
    }
}

/// One delivered transition, relayed to the host bridge.
#[derive(Debug, Clone, PartialEq)]
pub struct TransitionEvent {
    /// The stored record with `transition_type` set to the fired kind,
    /// matching the bridge relay contract.
    pub geo_notification: GeoNotification,
    pub transition: TransitionKind,
}

impl TransitionEvent {
    /// Serialized record payload handed to the bridge relay.
    pub fn bridge_payload(&self) -> serde_json::Result<String> {
        serde_json::to_string(&self.geo_notification)
    }
}

/// Bridge relay seam; the host shell forwards events to the application.
pub trait TransitionSink: Send + Sync {
    fn deliver(&self, event: &TransitionEvent);
}

/// Orchestrates geofence commands and platform transition callbacks.
///
/// Built cheaply per bridge call around a fresh repository; the shared
/// collaborators (monitor, notifier, webhook worker, debounce state, sink)
/// live for the process and are handed in as `Arc`s.
pub struct GeoNotificationManager<R: GeoNotificationRepository> {
    repo: R,
    monitor: Arc<dyn RegionMonitor>,
    notifier: Arc<dyn LocalNotifier>,
    sink: Arc<dyn TransitionSink>,
    webhooks: Arc<WebhookDispatcher>,
    debouncer: Arc<TransitionDebouncer>,
}

impl<R: GeoNotificationRepository> GeoNotificationManager<R> {
    pub fn new(
        repo: R,
        monitor: Arc<dyn RegionMonitor>,
        notifier: Arc<dyn LocalNotifier>,
        sink: Arc<dyn TransitionSink>,
        webhooks: Arc<WebhookDispatcher>,
        debouncer: Arc<TransitionDebouncer>,
    ) -> Self {
        Self {
            repo,
            monitor,
            notifier,
            sink,
            webhooks,
            debouncer,
        }
    }

    /// Stores a geofence definition and registers its region (last write
    /// wins on the identifier).
    ///
    /// Requirement problems are logged here and reported through
    /// `check_requirements`; they do not block the write, matching the
    /// bridge contract.
    pub fn add_or_update(&self, geo: &GeoNotification) -> ManagerResult<()> {
        let report = self.check_requirements();
        for warning in &report.warnings {
            warn!("event=requirements module=manager status=warning detail={warning}");
        }
        for problem in &report.errors {
            warn!("event=requirements module=manager status=error detail={problem}");
        }

        self.repo.add_or_update(geo)?;
        self.monitor
            .start_monitoring(&MonitoredRegion::from_record(geo))?;

        info!(
            "event=geofence_add_or_update module=manager status=ok geofence_id={} transition_mask={}",
            geo.id, geo.transition_type
        );
        Ok(())
    }

    /// Removes one geofence: stops monitoring, drops debounce state and
    /// deletes the stored record.
    ///
    /// `NotFound` is returned after monitoring has already been stopped, so
    /// an out-of-sync platform registration is cleaned up either way.
    pub fn remove(&self, id: &str) -> ManagerResult<()> {
        self.debouncer.forget(id);
        self.monitor.stop_monitoring(id)?;
        self.repo.remove(id)?;

        info!("event=geofence_remove module=manager status=ok geofence_id={id}");
        Ok(())
    }

    /// Removes every geofence and stops all region monitoring.
    pub fn remove_all(&self) -> ManagerResult<usize> {
        for region_id in self.monitor.monitored_region_ids() {
            self.monitor.stop_monitoring(&region_id)?;
        }
        self.debouncer.clear();
        let removed = self.repo.clear()?;

        info!("event=geofence_remove_all module=manager status=ok removed={removed}");
        Ok(removed)
    }

    /// All stored geofence definitions.
    pub fn watched(&self) -> ManagerResult<Vec<GeoNotification>> {
        Ok(self.repo.get_all()?)
    }

    /// Re-registers region monitoring for every stored record.
    ///
    /// Called on plugin initialize after a process restart. Registration
    /// failures are logged per record and skipped; the count of restored
    /// regions is returned.
    pub fn restore(&self) -> ManagerResult<usize> {
        let mut restored = 0;
        for geo in self.repo.get_all()? {
            match self
                .monitor
                .start_monitoring(&MonitoredRegion::from_record(&geo))
            {
                Ok(()) => restored += 1,
                Err(err) => {
                    error!(
                        "event=geofence_restore module=manager status=error geofence_id={} error={err}",
                        geo.id
                    );
                }
            }
        }

        info!("event=geofence_restore module=manager status=ok restored={restored}");
        Ok(restored)
    }

    /// Collects platform capability problems into a single report.
    pub fn check_requirements(&self) -> RequirementsReport {
        let mut report = RequirementsReport::default();

        let status = self.monitor.status();
        if !status.region_monitoring_available {
            report
                .errors
                .push("geofencing is not available on this device".to_string());
        }
        if !status.location_services_enabled {
            report
                .errors
                .push("location services are disabled".to_string());
        }
        match status.authorization {
            AuthorizationStatus::Always => {}
            AuthorizationStatus::WhenInUse => report.warnings.push(
                "background location permission not granted; transitions may be missed"
                    .to_string(),
            ),
            AuthorizationStatus::NotDetermined => report
                .warnings
                .push("location permission has not been requested yet".to_string()),
            AuthorizationStatus::Denied => report
                .errors
                .push("location permission denied".to_string()),
        }

        let permissions = self.notifier.permissions();
        if !permissions.granted {
            report
                .errors
                .push("notification permission missing".to_string());
        } else {
            if !permissions.alert {
                report
                    .warnings
                    .push("notification alert permission missing".to_string());
            }
            if !permissions.sound {
                report
                    .warnings
                    .push("notification sound permission missing".to_string());
            }
            if !permissions.badge {
                report
                    .warnings
                    .push("notification badge permission missing".to_string());
            }
        }

        report
    }

    /// Platform callback bridge: handles one region boundary crossing.
    ///
    /// Returns the delivered event, or `None` when the callback was
    /// debounced or no stored record matches the region id.
    pub fn handle_transition(
        &self,
        region_id: &str,
        kind: TransitionKind,
    ) -> ManagerResult<Option<TransitionEvent>> {
        if !self.debouncer.should_deliver(region_id, kind) {
            info!(
                "event=transition module=manager status=debounced region_id={region_id} transition={kind}"
            );
            return Ok(None);
        }

        let Some(mut geo) = self.repo.find_by_id(region_id)? else {
            warn!(
                "event=transition module=manager status=unknown_region region_id={region_id} transition={kind}"
            );
            return Ok(None);
        };

        geo.transition_type = kind.bit();

        if let Some(request) = LocalNotificationRequest::from_record(&geo, kind) {
            if let Err(err) = self.notifier.schedule(&request) {
                error!(
                    "event=transition module=manager status=notify_failed region_id={region_id} error={err}"
                );
            }
        }

        if let Some(url) = geo.url.clone() {
            self.webhooks.dispatch(WebhookRequest {
                geofence_id: geo.id.clone(),
                transition: kind,
                url,
                authorization: geo.authorization.clone(),
            });
        }

        let event = TransitionEvent {
            geo_notification: geo,
            transition: kind,
        };
        self.sink.deliver(&event);

        info!(
            "event=transition module=manager status=delivered region_id={region_id} transition={kind}"
        );
        Ok(Some(event))
    }
}
