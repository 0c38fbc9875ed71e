//! Local notification seam over the platform notification center.
//!
//! # Responsibility
//! - Define the scheduling contract the manager fires on region transitions.
//! - Report permission grants for requirements checks.
//!
//! # Invariants
//! - Scheduling failures are reported, never panic; the manager treats them
//!   as best-effort delivery.

use crate::model::geo_notification::{GeoNotification, TransitionKind};
use log::info;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type NotifyResult<T> = Result<T, NotifyError>;

/// Failure scheduling a local notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotifyError {
    /// Opaque failure reported by the notification backend.
    Backend(String),
}

impl Display for NotifyError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Backend(message) => write!(f, "notification backend failed: {message}"),
        }
    }
}

impl Error for NotifyError {}

/// Notification permission grants reported by the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NotificationPermissions {
    /// Notifications may be presented at all.
    pub granted: bool,
    pub alert: bool,
    pub sound: bool,
    pub badge: bool,
}

impl NotificationPermissions {
    pub fn all_granted() -> Self {
        Self {
            granted: true,
            alert: true,
            sound: true,
            badge: true,
        }
    }
}

/// One notification to present for a fired transition.
#[derive(Debug, Clone, PartialEq)]
pub struct LocalNotificationRequest {
    pub geofence_id: String,
    pub transition: TransitionKind,
    pub title: Option<String>,
    pub text: String,
    pub vibrate: bool,
    /// Arbitrary payload handed back to the application on click.
    pub data: Option<serde_json::Value>,
}

impl LocalNotificationRequest {
    /// Builds the request from a stored record, or `None` when the record
    /// carries no notification payload.
    pub fn from_record(geo: &GeoNotification, transition: TransitionKind) -> Option<Self> {
        let payload = geo.notification.as_ref()?;
        Some(Self {
            geofence_id: geo.id.clone(),
            transition,
            title: payload.title.clone(),
            text: payload.text.clone(),
            vibrate: payload.wants_vibration(),
            data: payload.data.clone(),
        })
    }
}

/// Contract between the manager and the platform notification center.
pub trait LocalNotifier: Send + Sync {
    /// Presents (or schedules) the notification immediately.
    fn schedule(&self, request: &LocalNotificationRequest) -> NotifyResult<()>;
    /// Current permission grants.
    fn permissions(&self) -> NotificationPermissions;
}

/// Log-only notifier standing in for the native notification center.
///
/// Host shells with a real notification backend swap in their own
/// `LocalNotifier`; this keeps headless runs and tests observable.
pub struct LogLocalNotifier;

impl LocalNotifier for LogLocalNotifier {
    fn schedule(&self, request: &LocalNotificationRequest) -> NotifyResult<()> {
        info!(
            "event=notification_scheduled module=notify status=ok geofence_id={} transition={} vibrate={}",
            request.geofence_id, request.transition, request.vibrate
        );
        Ok(())
    }

    fn permissions(&self) -> NotificationPermissions {
        NotificationPermissions::all_granted()
    }
}

#[cfg(test)]
mod tests {
    use super::LocalNotificationRequest;
    use crate::model::geo_notification::{
        GeoNotification, NotificationPayload, TransitionKind,
    };

    fn record_with_payload() -> GeoNotification {
        GeoNotification {
            id: "office".to_string(),
            latitude: 0.0,
            longitude: 0.0,
            radius: 100.0,
            transition_type: 1,
            notification: Some(NotificationPayload {
                title: Some("Back at work".to_string()),
                text: "Entered the office".to_string(),
                vibrate: vec![500],
                data: Some(serde_json::json!({"screen": "checkin"})),
            }),
            url: None,
            authorization: None,
        }
    }

    #[test]
    fn from_record_copies_payload_fields() {
        let request =
            LocalNotificationRequest::from_record(&record_with_payload(), TransitionKind::Enter)
                .unwrap();
        assert_eq!(request.geofence_id, "office");
        assert_eq!(request.transition, TransitionKind::Enter);
        assert_eq!(request.title.as_deref(), Some("Back at work"));
        assert_eq!(request.text, "Entered the office");
        assert!(request.vibrate);
        assert_eq!(request.data.unwrap()["screen"], "checkin");
    }

    #[test]
    fn from_record_is_none_without_payload() {
        let mut geo = record_with_payload();
        geo.notification = None;
        assert!(LocalNotificationRequest::from_record(&geo, TransitionKind::Exit).is_none());
    }
}
