//! Geofence record model.
//!
//! # Responsibility
//! - Define the canonical `GeoNotification` record and its wire shape.
//! - Validate geometry, transition mask and payload before use.
//!
//! # Invariants
//! - `id` is stable and never empty.
//! - `transition_type` is a bitmask over enter (1) and exit (2); zero and
//!   values above 3 are invalid.
//! - The serialized shape matches the host bridge JSON contract
//!   (`transitionType` camelCase, optional fields omitted when absent).

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Region transition fired by the platform monitoring engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransitionKind {
    /// Device crossed into the region.
    Enter,
    /// Device crossed out of the region.
    Exit,
}

impl TransitionKind {
    /// Bitmask bit used in `GeoNotification::transition_type`.
    pub fn bit(self) -> u8 {
        match self {
            Self::Enter => 1,
            Self::Exit => 2,
        }
    }

    /// Parses a single transition bit; `None` for combined or unknown values.
    pub fn from_bit(value: u8) -> Option<Self> {
        match value {
            1 => Some(Self::Enter),
            2 => Some(Self::Exit),
            _ => None,
        }
    }

    /// Wire label used in webhook payloads and bridge relay events.
    pub fn label(self) -> &'static str {
        match self {
            Self::Enter => "ENTER",
            Self::Exit => "EXIT",
        }
    }
}

impl Display for TransitionKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Local-notification payload attached to a geofence record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationPayload {
    /// Optional notification title.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Notification body text.
    pub text: String,
    /// Vibration pattern; a leading non-zero value requests vibration.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub vibrate: Vec<u32>,
    /// Arbitrary payload handed back to the application on click.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl NotificationPayload {
    /// Whether the payload requests device vibration.
    pub fn wants_vibration(&self) -> bool {
        self.vibrate.first().is_some_and(|value| *value > 0)
    }
}

/// Canonical geofence definition watched by the plugin.
///
/// One record describes a circular region, which boundary crossings to
/// monitor, and what to do when a crossing fires: schedule a local
/// notification, post a webhook, or both.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoNotification {
    /// Caller-supplied stable identifier; storage key.
    pub id: String,
    /// Region center latitude in degrees.
    pub latitude: f64,
    /// Region center longitude in degrees.
    pub longitude: f64,
    /// Region radius in meters.
    pub radius: f64,
    /// Transition bitmask: 1 = enter, 2 = exit, 3 = both.
    #[serde(rename = "transitionType")]
    pub transition_type: u8,
    /// Optional local notification fired on transition.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notification: Option<NotificationPayload>,
    /// Optional webhook URL posted to on transition.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Authorization header value sent with webhook posts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authorization: Option<String>,
}

impl GeoNotification {
    /// Checks record invariants; called on every write and load path.
    pub fn validate(&self) -> Result<(), GeoNotificationValidationError> {
        if self.id.trim().is_empty() {
            return Err(GeoNotificationValidationError::EmptyId);
        }
        if !(-90.0..=90.0).contains(&self.latitude) {
            return Err(GeoNotificationValidationError::InvalidLatitude(
                self.latitude,
            ));
        }
        if !(-180.0..=180.0).contains(&self.longitude) {
            return Err(GeoNotificationValidationError::InvalidLongitude(
                self.longitude,
            ));
        }
        if !(self.radius > 0.0) {
            return Err(GeoNotificationValidationError::InvalidRadius(self.radius));
        }
        if self.transition_type == 0 || self.transition_type > 3 {
            return Err(GeoNotificationValidationError::InvalidTransitionMask(
                self.transition_type,
            ));
        }
        Ok(())
    }

    /// Whether region-enter crossings are watched.
    pub fn notify_on_entry(&self) -> bool {
        self.transition_type & TransitionKind::Enter.bit() != 0
    }

    /// Whether region-exit crossings are watched.
    pub fn notify_on_exit(&self) -> bool {
        self.transition_type & TransitionKind::Exit.bit() != 0
    }

    /// Whether the given transition kind is covered by the mask.
    pub fn watches(&self, kind: TransitionKind) -> bool {
        self.transition_type & kind.bit() != 0
    }
}

/// Validation failure for a geofence record.
#[derive(Debug, Clone, PartialEq)]
pub enum GeoNotificationValidationError {
    /// `id` is empty or whitespace.
    EmptyId,
    /// Latitude outside [-90, 90].
    InvalidLatitude(f64),
    /// Longitude outside [-180, 180].
    InvalidLongitude(f64),
    /// Radius is zero, negative or not finite.
    InvalidRadius(f64),
    /// Transition mask is zero or has unknown bits set.
    InvalidTransitionMask(u8),
}

impl Display for GeoNotificationValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyId => write!(f, "geofence id must not be empty"),
            Self::InvalidLatitude(value) => {
                write!(f, "latitude {value} outside valid range [-90, 90]")
            }
            Self::InvalidLongitude(value) => {
                write!(f, "longitude {value} outside valid range [-180, 180]")
            }
            Self::InvalidRadius(value) => {
                write!(f, "radius {value} must be a positive number of meters")
            }
            Self::InvalidTransitionMask(value) => {
                write!(f, "transition type {value} must be 1 (enter), 2 (exit) or 3 (both)")
            }
        }
    }
}

impl Error for GeoNotificationValidationError {}

#[cfg(test)]
mod tests {
    use super::{GeoNotification, GeoNotificationValidationError, NotificationPayload, TransitionKind};

    fn record(id: &str, mask: u8) -> GeoNotification {
        GeoNotification {
            id: id.to_string(),
            latitude: 50.5,
            longitude: 3.1,
            radius: 200.0,
            transition_type: mask,
            notification: None,
            url: None,
            authorization: None,
        }
    }

    #[test]
    fn validate_accepts_minimal_record() {
        assert!(record("house", 1).validate().is_ok());
        assert!(record("work", 3).validate().is_ok());
    }

    #[test]
    fn validate_rejects_blank_id() {
        let err = record("  ", 1).validate().unwrap_err();
        assert_eq!(err, GeoNotificationValidationError::EmptyId);
    }

    #[test]
    fn validate_rejects_out_of_range_geometry() {
        let mut geo = record("a", 1);
        geo.latitude = 91.0;
        assert!(matches!(
            geo.validate(),
            Err(GeoNotificationValidationError::InvalidLatitude(_))
        ));

        let mut geo = record("b", 1);
        geo.longitude = -181.0;
        assert!(matches!(
            geo.validate(),
            Err(GeoNotificationValidationError::InvalidLongitude(_))
        ));

        let mut geo = record("c", 1);
        geo.radius = 0.0;
        assert!(matches!(
            geo.validate(),
            Err(GeoNotificationValidationError::InvalidRadius(_))
        ));

        let mut geo = record("d", 1);
        geo.radius = f64::NAN;
        assert!(matches!(
            geo.validate(),
            Err(GeoNotificationValidationError::InvalidRadius(_))
        ));
    }

    #[test]
    fn validate_rejects_bad_transition_mask() {
        for mask in [0u8, 4, 255] {
            assert!(matches!(
                record("x", mask).validate(),
                Err(GeoNotificationValidationError::InvalidTransitionMask(_))
            ));
        }
    }

    #[test]
    fn transition_mask_flags_match_bits() {
        let enter_only = record("a", 1);
        assert!(enter_only.notify_on_entry());
        assert!(!enter_only.notify_on_exit());
        assert!(enter_only.watches(TransitionKind::Enter));
        assert!(!enter_only.watches(TransitionKind::Exit));

        let both = record("b", 3);
        assert!(both.notify_on_entry());
        assert!(both.notify_on_exit());
    }

    #[test]
    fn wire_shape_uses_camel_case_mask_and_omits_absent_fields() {
        let geo = record("kiosk", 2);
        let json = serde_json::to_value(&geo).unwrap();
        assert_eq!(json["transitionType"], 2);
        assert!(json.get("notification").is_none());
        assert!(json.get("url").is_none());
        assert!(json.get("authorization").is_none());
    }

    #[test]
    fn wire_shape_round_trips_notification_payload() {
        let raw = r#"{
            "id": "shop",
            "latitude": 1.0,
            "longitude": 2.0,
            "radius": 50,
            "transitionType": 3,
            "notification": {
                "title": "Welcome",
                "text": "You arrived",
                "vibrate": [1000],
                "data": {"screen": "offers"}
            },
            "url": "https://example.test/hook",
            "authorization": "Bearer abc"
        }"#;

        let geo: GeoNotification = serde_json::from_str(raw).unwrap();
        geo.validate().unwrap();
        let payload = geo.notification.as_ref().unwrap();
        assert_eq!(payload.title.as_deref(), Some("Welcome"));
        assert!(payload.wants_vibration());
        assert_eq!(payload.data.as_ref().unwrap()["screen"], "offers");
        assert_eq!(geo.authorization.as_deref(), Some("Bearer abc"));
    }

    #[test]
    fn vibration_flag_requires_leading_non_zero_value() {
        let silent = NotificationPayload {
            title: None,
            text: "quiet".to_string(),
            vibrate: vec![0, 500],
            data: None,
        };
        assert!(!silent.wants_vibration());

        let no_pattern = NotificationPayload {
            title: None,
            text: "quiet".to_string(),
            vibrate: Vec::new(),
            data: None,
        };
        assert!(!no_pattern.wants_vibration());
    }

    #[test]
    fn transition_kind_bits_and_labels_are_stable() {
        assert_eq!(TransitionKind::Enter.bit(), 1);
        assert_eq!(TransitionKind::Exit.bit(), 2);
        assert_eq!(TransitionKind::from_bit(1), Some(TransitionKind::Enter));
        assert_eq!(TransitionKind::from_bit(2), Some(TransitionKind::Exit));
        assert_eq!(TransitionKind::from_bit(3), None);
        assert_eq!(TransitionKind::Enter.label(), "ENTER");
        assert_eq!(TransitionKind::Exit.label(), "EXIT");
    }
}
