//! SQLite-backed store for identifier records.
//!
//! This is the single source of truth for what should be true remotely.
//! Updates are compare-and-swap on the row `version`, which serialises
//! concurrent orchestrator runs against the same record.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use pidreg_id::{IdentifierValue, RecordId, ResourceId, Scheme};
use rusqlite::{params, Connection, OptionalExtension, Row};
use thiserror::Error;
use tracing::debug;

use crate::record::{IdentifierRecord, StoredRecord};
use crate::resource::ResourceType;
use crate::status::Status;

/// Errors from record store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("record {id} was modified concurrently (expected version {expected})")]
    VersionConflict { id: RecordId, expected: i64 },

    #[error("record not found: {0}")]
    NotFound(RecordId),

    #[error("identifier value already assigned: {0}")]
    DuplicateValue(String),

    #[error("resource {resource} already has a live {scheme} identifier")]
    LiveRecordExists { resource: ResourceId, scheme: Scheme },

    #[error("stored status '{0}' is not a known status")]
    CorruptStatus(String),

    #[error("corrupt record row: {0}")]
    CorruptRow(String),

    #[error("record store lock poisoned")]
    Poisoned,
}

const SELECT_COLUMNS: &str = "id, scheme, value, resource_id, resource_type, status, attention, \
     version, created_at, updated_at";

/// Raw column values before validation.
struct RecordRow {
    id: String,
    scheme: String,
    value: String,
    resource_id: Option<String>,
    resource_type: i64,
    status: String,
    attention: Option<String>,
    version: i64,
    created_at: i64,
    updated_at: i64,
}

impl RecordRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            scheme: row.get(1)?,
            value: row.get(2)?,
            resource_id: row.get(3)?,
            resource_type: row.get(4)?,
            status: row.get(5)?,
            attention: row.get(6)?,
            version: row.get(7)?,
            created_at: row.get(8)?,
            updated_at: row.get(9)?,
        })
    }

    fn into_record(self) -> Result<IdentifierRecord, StoreError> {
        let id = RecordId::parse(&self.id).map_err(|e| StoreError::CorruptRow(e.to_string()))?;
        let value = IdentifierValue::parse(&self.value)
            .map_err(|e| StoreError::CorruptRow(format!("{id}: {e}")))?;
        if Scheme::from_tag(&self.scheme) != Some(value.scheme()) {
            return Err(StoreError::CorruptRow(format!(
                "{id}: scheme '{}' does not match value {value}",
                self.scheme
            )));
        }
        let resource = self
            .resource_id
            .as_deref()
            .map(ResourceId::parse)
            .transpose()
            .map_err(|e| StoreError::CorruptRow(format!("{id}: {e}")))?;
        let resource_type = ResourceType::from_code(self.resource_type).ok_or_else(|| {
            StoreError::CorruptRow(format!("{id}: resource type {}", self.resource_type))
        })?;
        let status = Status::from_tag(&self.status).ok_or(StoreError::CorruptStatus(self.status))?;

        Ok(IdentifierRecord::from_stored(StoredRecord {
            id,
            value,
            resource,
            resource_type,
            status,
            attention: self.attention,
            version: self.version,
            created_at: timestamp(self.created_at)?,
            updated_at: timestamp(self.updated_at)?,
        }))
    }
}

fn timestamp(secs: i64) -> Result<DateTime<Utc>, StoreError> {
    DateTime::from_timestamp(secs, 0)
        .ok_or_else(|| StoreError::CorruptRow(format!("timestamp {secs} out of range")))
}

/// SQLite record store.
pub struct RecordStore {
    conn: Mutex<Connection>,
}

impl RecordStore {
    /// Open or create a store at the given path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;

        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;

        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;

        Ok(store)
    }

    /// Open an in-memory store (for testing).
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn.lock().map_err(|_| StoreError::Poisoned)
    }

    fn init_schema(&self) -> Result<(), StoreError> {
        self.conn()?.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS identifiers (
                id TEXT PRIMARY KEY,
                scheme TEXT NOT NULL,
                value TEXT NOT NULL UNIQUE,
                resource_id TEXT,
                resource_type INTEGER NOT NULL,
                status TEXT NOT NULL,
                attention TEXT,
                version INTEGER NOT NULL DEFAULT 0,
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_identifiers_resource ON identifiers(resource_id, scheme);
            CREATE INDEX IF NOT EXISTS idx_identifiers_status ON identifiers(status);

            -- At most one live identifier per resource and scheme.
            CREATE UNIQUE INDEX IF NOT EXISTS idx_identifiers_live
                ON identifiers(resource_id, scheme) WHERE status != 'deleted';
            "#,
        )?;

        debug!("Record store schema initialized");
        Ok(())
    }

    /// Insert a new record.
    pub fn insert(&self, record: &IdentifierRecord) -> Result<(), StoreError> {
        let result = self.conn()?.execute(
            r#"
            INSERT INTO identifiers (
                id, scheme, value, resource_id, resource_type, status, attention,
                version, created_at, updated_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
            params![
                record.id().to_string(),
                record.scheme().as_str(),
                record.value().as_str(),
                record.resource().map(|r| r.to_string()),
                record.resource_type().code(),
                record.status().as_str(),
                record.attention(),
                record.version(),
                record.created_at().timestamp(),
                record.updated_at().timestamp(),
            ],
        );

        match result {
            Ok(_) => Ok(()),
            Err(rusqlite::Error::SqliteFailure(err, Some(message)))
                if err.code == rusqlite::ErrorCode::ConstraintViolation
                    && message.contains("identifiers.value") =>
            {
                Err(StoreError::DuplicateValue(record.value().to_string()))
            }
            Err(rusqlite::Error::SqliteFailure(err, Some(message)))
                if err.code == rusqlite::ErrorCode::ConstraintViolation
                    && message.contains("identifiers.resource_id") =>
            {
                match record.resource() {
                    Some(resource) => Err(StoreError::LiveRecordExists {
                        resource,
                        scheme: record.scheme(),
                    }),
                    None => Err(rusqlite::Error::SqliteFailure(err, Some(message)).into()),
                }
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Persist a record's status and binding, compare-and-swap on version.
    ///
    /// Only `status`, the attention marker, a cleared `resource_id` and the
    /// timestamps are written; `value`, `scheme` and `created_at` are immutable. On success
    /// the record's version is bumped.
    pub fn update(&self, record: &mut IdentifierRecord) -> Result<(), StoreError> {
        let expected = record.version();
        let next = expected + 1;
        let changed = self.conn()?.execute(
            r#"
            UPDATE identifiers SET
                status = ?1,
                resource_id = CASE WHEN ?2 THEN NULL ELSE resource_id END,
                attention = ?7,
                version = ?3,
                updated_at = ?4
            WHERE id = ?5 AND version = ?6
            "#,
            params![
                record.status().as_str(),
                record.is_orphaned(),
                next,
                record.updated_at().timestamp(),
                record.id().to_string(),
                expected,
                record.attention(),
            ],
        )?;

        if changed == 0 {
            return match self.get(record.id())? {
                Some(_) => Err(StoreError::VersionConflict {
                    id: record.id(),
                    expected,
                }),
                None => Err(StoreError::NotFound(record.id())),
            };
        }

        record.set_version(next);
        Ok(())
    }

    /// Get a record by ID.
    pub fn get(&self, id: RecordId) -> Result<Option<IdentifierRecord>, StoreError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {SELECT_COLUMNS} FROM identifiers WHERE id = ?1"
        ))?;
        stmt.query_row(params![id.to_string()], RecordRow::from_row)
            .optional()?
            .map(RecordRow::into_record)
            .transpose()
    }

    /// Find a record by its identifier value.
    pub fn find_by_value(
        &self,
        value: &IdentifierValue,
    ) -> Result<Option<IdentifierRecord>, StoreError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {SELECT_COLUMNS} FROM identifiers WHERE value = ?1"
        ))?;
        stmt.query_row(params![value.as_str()], RecordRow::from_row)
            .optional()?
            .map(RecordRow::into_record)
            .transpose()
    }

    /// The newest non-deleted record of `scheme` bound to `resource`.
    pub fn find_live_by_resource(
        &self,
        resource: ResourceId,
        scheme: Scheme,
    ) -> Result<Option<IdentifierRecord>, StoreError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {SELECT_COLUMNS} FROM identifiers
             WHERE resource_id = ?1 AND scheme = ?2 AND status != ?3
             ORDER BY created_at DESC, id DESC LIMIT 1"
        ))?;
        stmt.query_row(
            params![resource.to_string(), scheme.as_str(), Status::Deleted.as_str()],
            RecordRow::from_row,
        )
        .optional()?
        .map(RecordRow::into_record)
        .transpose()
    }

    /// All records bound to `resource`, oldest first.
    pub fn list_by_resource(
        &self,
        resource: ResourceId,
    ) -> Result<Vec<IdentifierRecord>, StoreError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {SELECT_COLUMNS} FROM identifiers
             WHERE resource_id = ?1 ORDER BY created_at, id"
        ))?;
        let rows = stmt
            .query_map(params![resource.to_string()], RecordRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        rows.into_iter().map(RecordRow::into_record).collect()
    }

    /// All records currently in one of `statuses`, oldest update first.
    pub fn list_by_status(&self, statuses: &[Status]) -> Result<Vec<IdentifierRecord>, StoreError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {SELECT_COLUMNS} FROM identifiers WHERE status = ?1 ORDER BY updated_at, id"
        ))?;

        let mut rows = Vec::new();
        for status in statuses {
            let batch = stmt
                .query_map(params![status.as_str()], RecordRow::from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            rows.extend(batch);
        }
        drop(stmt);
        drop(conn);

        let mut records = rows
            .into_iter()
            .map(RecordRow::into_record)
            .collect::<Result<Vec<_>, _>>()?;
        records.sort_by_key(|r| (r.updated_at(), r.id()));
        Ok(records)
    }

    /// Records in one of `statuses` that are not parked for an operator.
    pub fn list_retryable(&self, statuses: &[Status]) -> Result<Vec<IdentifierRecord>, StoreError> {
        let mut records = self.list_by_status(statuses)?;
        records.retain(|record| record.attention().is_none());
        Ok(records)
    }

    /// Count records in a status.
    pub fn count_by_status(&self, status: Status) -> Result<i64, StoreError> {
        let count: i64 = self.conn()?.query_row(
            "SELECT COUNT(*) FROM identifiers WHERE status = ?1",
            params![status.as_str()],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}
