//! Geofence store contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provide stable CRUD APIs over the `geo_notifications` table.
//! - Keep SQL details inside the persistence boundary.
//!
//! # Invariants
//! - The table stores two columns: `id` (primary key) and `data` (the
//!   serialized record). Last write wins on `id`.
//! - Write paths must call `GeoNotification::validate()` before SQL
//!   mutations; read paths reject invalid persisted state instead of
//!   masking it.

use crate::db::DbError;
use crate::model::geo_notification::{GeoNotification, GeoNotificationValidationError};
use rusqlite::Connection;
use std::error::Error;
use std::fmt::{Display, Formatter};

const GEO_NOTIFICATIONS_TABLE: &str = "geo_notifications";
const REQUIRED_COLUMNS: &[&str] = &["id", "data"];

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for geofence persistence and query operations.
#[derive(Debug)]
pub enum RepoError {
    Validation(GeoNotificationValidationError),
    Db(DbError),
    NotFound(String),
    InvalidData(String),
    /// Connection has no applied schema; migrations were skipped.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    MissingRequiredTable(&'static str),
    MissingRequiredColumn {
        table: &'static str,
        column: &'static str,
    },
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "geofence not found: {id}"),
            Self::InvalidData(message) => {
                write!(f, "invalid persisted geofence data: {message}")
            }
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "connection schema version {actual_version} has not been migrated to {expected_version}"
            ),
            Self::MissingRequiredTable(table) => {
                write!(f, "required table `{table}` is missing")
            }
            Self::MissingRequiredColumn { table, column } => {
                write!(f, "required column `{table}.{column}` is missing")
            }
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<GeoNotificationValidationError> for RepoError {
    fn from(value: GeoNotificationValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Store interface for geofence CRUD operations.
pub trait GeoNotificationRepository {
    /// Inserts or replaces the record keyed by its `id` (last write wins).
    fn add_or_update(&self, geo: &GeoNotification) -> RepoResult<()>;
    /// Loads one record by identifier.
    fn find_by_id(&self, id: &str) -> RepoResult<Option<GeoNotification>>;
    /// Lists all stored records in deterministic `id` order.
    fn get_all(&self) -> RepoResult<Vec<GeoNotification>>;
    /// Removes one record; `NotFound` when the id is unknown.
    fn remove(&self, id: &str) -> RepoResult<()>;
    /// Removes every record and returns the removed count.
    fn clear(&self) -> RepoResult<usize>;
}

/// SQLite-backed geofence repository.
pub struct SqliteGeoNotificationRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteGeoNotificationRepository<'conn> {
    /// Wraps a migrated connection after verifying the expected schema.
    ///
    /// # Errors
    /// - `UninitializedConnection` when migrations were never applied.
    /// - `MissingRequiredTable` / `MissingRequiredColumn` when the schema
    ///   does not match what this binary expects.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        let expected_version = crate::db::migrations::latest_version();
        let actual_version: u32 =
            conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
        if actual_version == 0 {
            return Err(RepoError::UninitializedConnection {
                expected_version,
                actual_version,
            });
        }

        let table_exists: i64 = conn.query_row(
            "SELECT EXISTS(
                SELECT 1 FROM sqlite_master
                WHERE type = 'table' AND name = ?1
            );",
            [GEO_NOTIFICATIONS_TABLE],
            |row| row.get(0),
        )?;
        if table_exists == 0 {
            return Err(RepoError::MissingRequiredTable(GEO_NOTIFICATIONS_TABLE));
        }

        let mut stmt = conn.prepare(&format!(
            "SELECT name FROM pragma_table_info('{GEO_NOTIFICATIONS_TABLE}');"
        ))?;
        let mut present = Vec::new();
        let mut rows = stmt.query([])?;
        while let Some(row) = rows.next()? {
            present.push(row.get::<_, String>(0)?);
        }
        for column in REQUIRED_COLUMNS {
            if !present.iter().any(|name| name == column) {
                return Err(RepoError::MissingRequiredColumn {
                    table: GEO_NOTIFICATIONS_TABLE,
                    column,
                });
            }
        }

        Ok(Self { conn })
    }
}

impl GeoNotificationRepository for SqliteGeoNotificationRepository<'_> {
    fn add_or_update(&self, geo: &GeoNotification) -> RepoResult<()> {
        geo.validate()?;

        let data = serde_json::to_string(geo).map_err(|err| {
            RepoError::InvalidData(format!("failed to serialize geofence `{}`: {err}", geo.id))
        })?;

        self.conn.execute(
            "INSERT INTO geo_notifications (id, data)
             VALUES (?1, ?2)
             ON CONFLICT(id) DO UPDATE SET data = excluded.data;",
            [geo.id.as_str(), data.as_str()],
        )?;

        Ok(())
    }

    fn find_by_id(&self, id: &str) -> RepoResult<Option<GeoNotification>> {
        let mut stmt = self
            .conn
            .prepare("SELECT data FROM geo_notifications WHERE id = ?1;")?;
        let mut rows = stmt.query([id])?;

        if let Some(row) = rows.next()? {
            let data: String = row.get(0)?;
            return Ok(Some(parse_stored_record(id, &data)?));
        }

        Ok(None)
    }

    fn get_all(&self) -> RepoResult<Vec<GeoNotification>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, data FROM geo_notifications ORDER BY id ASC;")?;
        let mut rows = stmt.query([])?;
        let mut records = Vec::new();

        while let Some(row) = rows.next()? {
            let id: String = row.get(0)?;
            let data: String = row.get(1)?;
            records.push(parse_stored_record(&id, &data)?);
        }

        Ok(records)
    }

    fn remove(&self, id: &str) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM geo_notifications WHERE id = ?1;", [id])?;

        if changed == 0 {
            return Err(RepoError::NotFound(id.to_string()));
        }

        Ok(())
    }

    fn clear(&self) -> RepoResult<usize> {
        let removed = self.conn.execute("DELETE FROM geo_notifications;", [])?;
        Ok(removed)
    }
}

fn parse_stored_record(id: &str, data: &str) -> RepoResult<GeoNotification> {
    let geo: GeoNotification = serde_json::from_str(data).map_err(|err| {
        RepoError::InvalidData(format!("row `{id}` does not deserialize: {err}"))
    })?;

    if geo.id != id {
        return Err(RepoError::InvalidData(format!(
            "row `{id}` carries mismatched record id `{}`",
            geo.id
        )));
    }

    geo.validate()?;
    Ok(geo)
}
