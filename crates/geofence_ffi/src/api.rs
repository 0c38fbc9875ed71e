//! FFI use-case API for host-shell-facing calls.
//!
//! # Responsibility
//! - Expose the fixed geofence command surface to the host bridge via FRB.
//! - Collect per-command problems into a single response envelope.
//!
//! # Invariants
//! - Exported functions must not panic across the FFI boundary.
//! - The plugin database path is fixed on first use; reconfiguration
//!   attempts are rejected, never silently applied.

use geofence_core::db::open_db;
use geofence_core::{
    core_version as core_version_inner, init_logging as init_logging_inner, ping as ping_inner,
    GeoNotification, GeoNotificationManager, InProcessRegionMonitor, LogLocalNotifier,
    ManagerError, RepoError, SqliteGeoNotificationRepository, TransitionDebouncer,
    TransitionEvent, TransitionKind, TransitionSink, WebhookDispatcher,
};
use log::error;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, OnceLock};

const PLUGIN_DB_FILE_NAME: &str = "geofence_plugin.sqlite3";
const PLUGIN_DB_PATH_ENV: &str = "GEOFENCE_DB_PATH";

static PLUGIN_DB_PATH: OnceLock<PathBuf> = OnceLock::new();
static PLUGIN_RUNTIME: OnceLock<PluginRuntime> = OnceLock::new();

/// Process-wide collaborators shared across bridge calls.
///
/// The repository is rebuilt per call around a fresh connection; monitor
/// registrations, debounce state, the webhook worker and the relay buffer
/// must survive between calls.
struct PluginRuntime {
    monitor: Arc<InProcessRegionMonitor>,
    notifier: Arc<LogLocalNotifier>,
    sink: Arc<BufferingSink>,
    webhooks: Arc<WebhookDispatcher>,
    debouncer: Arc<TransitionDebouncer>,
}

fn runtime() -> &'static PluginRuntime {
    PLUGIN_RUNTIME.get_or_init(|| PluginRuntime {
        monitor: Arc::new(InProcessRegionMonitor::new()),
        notifier: Arc::new(LogLocalNotifier),
        sink: Arc::new(BufferingSink::default()),
        webhooks: Arc::new(WebhookDispatcher::new()),
        debouncer: Arc::new(TransitionDebouncer::default()),
    })
}

/// Buffers bridge relay payloads until the host shell drains them.
#[derive(Default)]
struct BufferingSink {
    payloads: Mutex<Vec<String>>,
}

impl BufferingSink {
    fn drain(&self) -> Vec<String> {
        std::mem::take(
            &mut *self
                .payloads
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner()),
        )
    }
}

impl TransitionSink for BufferingSink {
    fn deliver(&self, event: &TransitionEvent) {
        match event.bridge_payload() {
            Ok(payload) => self
                .payloads
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner())
                .push(payload),
            Err(err) => {
                error!(
                    "event=bridge_relay module=ffi status=error geofence_id={} error={err}",
                    event.geo_notification.id
                );
            }
        }
    }
}

/// Single bridge response envelope for geofence commands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginResponse {
    /// Whether the command succeeded.
    pub ok: bool,
    /// Non-fatal problems (degraded permissions, unknown ids).
    pub warnings: Vec<String>,
    /// Fatal problems; non-empty implies `ok == false`.
    pub errors: Vec<String>,
    /// Human-readable response message for diagnostics/UI.
    pub message: String,
}

impl PluginResponse {
    fn success(message: impl Into<String>) -> Self {
        Self {
            ok: true,
            warnings: Vec::new(),
            errors: Vec::new(),
            message: message.into(),
        }
    }

    fn failure(message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            ok: false,
            warnings: Vec::new(),
            errors: vec![message.clone()],
            message,
        }
    }
}

/// Response envelope for the watched-geofences query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchedResponse {
    /// Whether the query succeeded.
    pub ok: bool,
    /// All stored records as one JSON array string (bridge reply shape).
    pub geo_notifications_json: String,
    /// Human-readable response message for diagnostics/UI.
    pub message: String,
}

/// Minimal health-check API for bridge smoke integration.
///
/// # FFI contract
/// - Sync call, non-blocking.
/// - Never throws; always returns a UTF-8 string.
#[flutter_rust_bridge::frb(sync)]
pub fn ping() -> String {
    ping_inner().to_owned()
}

/// Expose core crate version through FFI.
///
/// # FFI contract
/// - Sync call, non-blocking.
/// - Never throws; always returns a UTF-8 string.
#[flutter_rust_bridge::frb(sync)]
pub fn core_version() -> String {
    core_version_inner().to_owned()
}

/// Initializes Rust core logging once per process.
///
/// Input semantics:
/// - `level`: one of `trace|debug|info|warn|error` (case-insensitive).
/// - `log_dir`: absolute directory path where rolling logs are written.
///
/// # FFI contract
/// - Sync call; may perform small file-system setup work.
/// - Safe to call repeatedly with the same `level + log_dir` (idempotent).
/// - Reconfiguration attempts with different level or directory return error.
/// - Never panics; returns empty string on success and error message on
///   failure.
#[flutter_rust_bridge::frb(sync)]
pub fn init_logging(level: String, log_dir: String) -> String {
    match init_logging_inner(level.as_str(), log_dir.as_str()) {
        Ok(()) => String::new(),
        Err(err) => err,
    }
}

/// Initializes the plugin: fixes the database path, applies migrations,
/// restores region monitoring for stored records and reports requirement
/// problems.
///
/// Path resolution order: explicit argument, `GEOFENCE_DB_PATH` env var,
/// temp-dir default. The first resolved path wins for the process lifetime.
///
/// # FFI contract
/// - Sync call, DB-backed execution.
/// - Never panics.
/// - `ok` is false when a requirement error or storage failure is present.
#[flutter_rust_bridge::frb(sync)]
pub fn initialize(db_path: Option<String>) -> PluginResponse {
    let resolved = match fix_plugin_db_path(db_path) {
        Ok(path) => path,
        Err(message) => return PluginResponse::failure(message),
    };

    match with_manager(|manager| {
        let restored = manager.restore().map_err(|err| err.to_string())?;
        Ok((restored, manager.check_requirements()))
    }) {
        Ok((restored, report)) => PluginResponse {
            ok: report.ok(),
            warnings: report.warnings,
            errors: report.errors,
            message: format!(
                "Initialized at {}; restored {restored} geofence(s).",
                resolved.display()
            ),
        },
        Err(message) => PluginResponse::failure(format!("initialize failed: {message}")),
    }
}

/// Stores one or more geofence definitions and starts monitoring them.
///
/// Accepts the bridge argument shape: a JSON array of records, or a single
/// record object.
///
/// # FFI contract
/// - Sync call, DB-backed execution.
/// - Never panics.
/// - Per-record problems are collected; `ok` is true only when every
///   record was stored.
#[flutter_rust_bridge::frb(sync)]
pub fn add_or_update(geo_notifications_json: String) -> PluginResponse {
    let records = match parse_records(&geo_notifications_json) {
        Ok(records) => records,
        Err(message) => return PluginResponse::failure(message),
    };
    if records.is_empty() {
        return PluginResponse::failure("no geofence records in request");
    }

    let outcome = with_manager(|manager| {
        let mut errors = Vec::new();
        let mut stored = 0usize;
        for geo in &records {
            match manager.add_or_update(geo) {
                Ok(()) => stored += 1,
                Err(err) => errors.push(format!("geofence `{}`: {err}", geo.id)),
            }
        }
        Ok((stored, errors, manager.check_requirements().warnings))
    });

    match outcome {
        Ok((stored, errors, warnings)) => PluginResponse {
            ok: errors.is_empty(),
            warnings,
            message: format!("Stored {stored} geofence(s)."),
            errors,
        },
        Err(message) => PluginResponse::failure(format!("add_or_update failed: {message}")),
    }
}

/// Removes geofences by identifier and stops monitoring their regions.
///
/// # FFI contract
/// - Sync call, DB-backed execution.
/// - Never panics.
/// - Unknown identifiers are warnings, not command failures.
#[flutter_rust_bridge::frb(sync)]
pub fn remove(ids: Vec<String>) -> PluginResponse {
    let outcome = with_manager(|manager| {
        let mut warnings = Vec::new();
        let mut errors = Vec::new();
        let mut removed = 0usize;
        for id in &ids {
            match manager.remove(id) {
                Ok(()) => removed += 1,
                Err(ManagerError::Repo(RepoError::NotFound(_))) => {
                    warnings.push(format!("no geofence with id `{id}`"));
                }
                Err(err) => errors.push(format!("geofence `{id}`: {err}")),
            }
        }
        Ok((removed, warnings, errors))
    });

    match outcome {
        Ok((removed, warnings, errors)) => PluginResponse {
            ok: errors.is_empty(),
            warnings,
            message: format!("Removed {removed} geofence(s)."),
            errors,
        },
        Err(message) => PluginResponse::failure(format!("remove failed: {message}")),
    }
}

/// Removes every geofence and stops all region monitoring.
///
/// # FFI contract
/// - Sync call, DB-backed execution.
/// - Never panics.
#[flutter_rust_bridge::frb(sync)]
pub fn remove_all() -> PluginResponse {
    match with_manager(|manager| manager.remove_all().map_err(|err| err.to_string())) {
        Ok(removed) => PluginResponse::success(format!("Removed {removed} geofence(s).")),
        Err(message) => PluginResponse::failure(format!("remove_all failed: {message}")),
    }
}

/// Returns all watched geofence definitions.
///
/// # FFI contract
/// - Sync call, DB-backed execution.
/// - Never panics.
/// - Returns one JSON array string, the original bridge reply shape.
#[flutter_rust_bridge::frb(sync)]
pub fn get_watched() -> WatchedResponse {
    let outcome = with_manager(|manager| {
        let watched = manager.watched().map_err(|err| err.to_string())?;
        serde_json::to_string(&watched).map_err(|err| err.to_string())
    });

    match outcome {
        Ok(json) => WatchedResponse {
            ok: true,
            geo_notifications_json: json,
            message: "OK".to_string(),
        },
        Err(message) => WatchedResponse {
            ok: false,
            geo_notifications_json: "[]".to_string(),
            message: format!("get_watched failed: {message}"),
        },
    }
}

/// Entry point for the native location callback: one region boundary
/// crossing.
///
/// `transition_type` is a single transition bit (1 = enter, 2 = exit).
///
/// # FFI contract
/// - Sync call; webhook I/O is handed off to the background worker.
/// - Never panics.
/// - Debounced and unknown-region callbacks succeed without delivering.
#[flutter_rust_bridge::frb(sync)]
pub fn handle_transition(region_id: String, transition_type: u8) -> PluginResponse {
    let Some(kind) = TransitionKind::from_bit(transition_type) else {
        return PluginResponse::failure(format!(
            "transition type {transition_type} must be 1 (enter) or 2 (exit)"
        ));
    };

    let outcome = with_manager(|manager| {
        manager
            .handle_transition(&region_id, kind)
            .map_err(|err| err.to_string())
    });

    match outcome {
        Ok(Some(_)) => PluginResponse::success("Transition delivered."),
        Ok(None) => PluginResponse::success("Transition ignored."),
        Err(message) => PluginResponse::failure(format!("handle_transition failed: {message}")),
    }
}

/// Drains buffered bridge relay payloads.
///
/// Each entry is one serialized geofence record with `transitionType` set
/// to the fired transition, ready for the application's
/// `onTransitionReceived` feed.
///
/// # FFI contract
/// - Sync call, non-blocking.
/// - Never panics; draining is destructive.
#[flutter_rust_bridge::frb(sync)]
pub fn drain_transition_events() -> Vec<String> {
    runtime().sink.drain()
}

fn parse_records(raw: &str) -> Result<Vec<GeoNotification>, String> {
    let value: serde_json::Value = serde_json::from_str(raw)
        .map_err(|err| format!("geofence request is not valid JSON: {err}"))?;

    let items = match value {
        serde_json::Value::Array(items) => items,
        object @ serde_json::Value::Object(_) => vec![object],
        _ => return Err("geofence request must be a JSON object or array".to_string()),
    };

    items
        .into_iter()
        .map(|item| {
            serde_json::from_value::<GeoNotification>(item)
                .map_err(|err| format!("invalid geofence record: {err}"))
        })
        .collect()
}

fn fix_plugin_db_path(requested: Option<String>) -> Result<PathBuf, String> {
    let candidate = match requested.map(|raw| raw.trim().to_string()) {
        Some(raw) if !raw.is_empty() => PathBuf::from(raw),
        _ => default_db_path(),
    };

    let fixed = PLUGIN_DB_PATH.get_or_init(|| candidate.clone());
    if *fixed != candidate {
        return Err(format!(
            "plugin database already initialized at `{}`; refusing to switch to `{}`",
            fixed.display(),
            candidate.display()
        ));
    }
    Ok(fixed.clone())
}

fn plugin_db_path() -> PathBuf {
    PLUGIN_DB_PATH.get_or_init(default_db_path).clone()
}

fn default_db_path() -> PathBuf {
    if let Ok(raw) = std::env::var(PLUGIN_DB_PATH_ENV) {
        let trimmed = raw.trim();
        if !trimmed.is_empty() {
            return PathBuf::from(trimmed);
        }
    }
    std::env::temp_dir().join(PLUGIN_DB_FILE_NAME)
}

fn with_manager<T>(
    f: impl FnOnce(
        &GeoNotificationManager<SqliteGeoNotificationRepository<'_>>,
    ) -> Result<T, String>,
) -> Result<T, String> {
    let db_path = plugin_db_path();
    let conn: rusqlite::Connection =
        open_db(&db_path).map_err(|err| format!("plugin DB open failed: {err}"))?;
    let repo = SqliteGeoNotificationRepository::try_new(&conn)
        .map_err(|err| format!("plugin repo init failed: {err}"))?;

    let runtime = runtime();
    let manager = GeoNotificationManager::new(
        repo,
        runtime.monitor.clone(),
        runtime.notifier.clone(),
        runtime.sink.clone(),
        runtime.webhooks.clone(),
        runtime.debouncer.clone(),
    );
    f(&manager)
}
