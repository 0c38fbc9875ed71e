//! Time-window deduplication for region transition callbacks.
//!
//! # Responsibility
//! - Drop repeated (region, transition) callbacks arriving within the
//!   debounce window.
//!
//! # Invariants
//! - Keys are independent: an enter does not debounce an exit for the same
//!   region.
//! - State for removed geofences is forgotten eagerly.

use crate::model::geo_notification::TransitionKind;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Default window within which repeated transitions are dropped.
///
/// Platform engines re-fire boundary crossings when the device dwells on
/// the fence line; ten seconds absorbs that jitter without hiding real
/// re-entries.
pub const DEFAULT_DEBOUNCE_WINDOW: Duration = Duration::from_secs(10);

type DebounceKey = (String, TransitionKind);

/// Tracks the last delivered instant per (region, transition) pair.
pub struct TransitionDebouncer {
    window: Duration,
    last_delivered: Mutex<HashMap<DebounceKey, Instant>>,
}

impl TransitionDebouncer {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            last_delivered: Mutex::new(HashMap::new()),
        }
    }

    /// Decides whether a transition observed now should be delivered, and
    /// records it when it should.
    pub fn should_deliver(&self, region_id: &str, kind: TransitionKind) -> bool {
        self.should_deliver_at(region_id, kind, Instant::now())
    }

    /// Clock-injected variant of `should_deliver` for deterministic tests.
    pub fn should_deliver_at(&self, region_id: &str, kind: TransitionKind, now: Instant) -> bool {
        let mut last_delivered = self.lock();

        // Expired entries are dropped on every call to bound map growth.
        let window = self.window;
        last_delivered.retain(|_, instant| now.duration_since(*instant) < window);

        let key: DebounceKey = (region_id.to_string(), kind);
        if last_delivered.contains_key(&key) {
            return false;
        }

        last_delivered.insert(key, now);
        true
    }

    /// Forgets debounce state for one region, both transition kinds.
    pub fn forget(&self, region_id: &str) {
        self.lock().retain(|(id, _), _| id != region_id);
    }

    /// Forgets all debounce state.
    pub fn clear(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<DebounceKey, Instant>> {
        self.last_delivered
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for TransitionDebouncer {
    fn default() -> Self {
        Self::new(DEFAULT_DEBOUNCE_WINDOW)
    }
}
