//! libSQL staging store — document staging with a processed marker.
//!
//! One row per natural key. The payload column holds the sampled row as a
//! JSON document; `processed` starts at 0 and is flipped by the sinker's
//! claim.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use libsql::{Connection, params};
use tracing::{debug, info};

use crate::error::DatabaseError;
use crate::store::traits::{StagedRecord, StagingStore};

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS staged_records (
        file TEXT PRIMARY KEY,
        idx INTEGER NOT NULL,
        payload TEXT NOT NULL,
        processed INTEGER NOT NULL DEFAULT 0,
        staged_at TEXT NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_staged_processed ON staged_records(processed);
"#;

/// libSQL-backed staging store.
pub struct LibSqlStagingStore {
    #[allow(dead_code)]
    db: Arc<libsql::Database>,
    conn: Connection,
}

impl LibSqlStagingStore {
    /// Open (or create) a local staging database file.
    pub async fn new_local(path: &Path) -> Result<Self, DatabaseError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                DatabaseError::Pool(format!("Failed to create database directory: {e}"))
            })?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| DatabaseError::Pool(format!("Failed to open staging database: {e}")))?;
        let conn = db
            .connect()
            .map_err(|e| DatabaseError::Pool(format!("Failed to create connection: {e}")))?;

        let store = Self {
            db: Arc::new(db),
            conn,
        };
        store.init_schema().await?;
        info!(path = %path.display(), "Staging store opened");
        Ok(store)
    }

    /// Create an in-memory staging store (for tests).
    pub async fn new_memory() -> Result<Self, DatabaseError> {
        let db = libsql::Builder::new_local(":memory:")
            .build()
            .await
            .map_err(|e| {
                DatabaseError::Pool(format!("Failed to create in-memory database: {e}"))
            })?;
        let conn = db
            .connect()
            .map_err(|e| DatabaseError::Pool(format!("Failed to create connection: {e}")))?;

        let store = Self {
            db: Arc::new(db),
            conn,
        };
        store.init_schema().await?;
        Ok(store)
    }

    async fn init_schema(&self) -> Result<(), DatabaseError> {
        self.conn
            .execute_batch(SCHEMA)
            .await
            .map_err(|e| DatabaseError::Query(format!("staging init_schema: {e}")))?;
        Ok(())
    }
}

#[async_trait]
impl StagingStore for LibSqlStagingStore {
    async fn stage(
        &self,
        file: &str,
        index: i64,
        payload: &serde_json::Value,
    ) -> Result<bool, DatabaseError> {
        let payload_json = serde_json::to_string(payload)
            .map_err(|e| DatabaseError::Serialization(format!("stage payload: {e}")))?;

        let inserted = self
            .conn
            .execute(
                "INSERT INTO staged_records (file, idx, payload, processed, staged_at)
                 VALUES (?1, ?2, ?3, 0, ?4)
                 ON CONFLICT(file) DO NOTHING",
                params![file, index, payload_json, Utc::now().to_rfc3339()],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("stage: {e}")))?;

        if inserted > 0 {
            debug!(file, index, "Record staged");
        }
        Ok(inserted > 0)
    }

    async fn get_by_file(&self, file: &str) -> Result<Option<StagedRecord>, DatabaseError> {
        let mut rows = self
            .conn
            .query(
                "SELECT file, idx, payload, processed, staged_at
                 FROM staged_records WHERE file = ?1",
                params![file],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("get_by_file: {e}")))?;

        match rows.next().await {
            Ok(Some(row)) => {
                let record = row_to_record(&row)
                    .map_err(|e| DatabaseError::Query(format!("get_by_file row parse: {e}")))?;
                Ok(Some(record))
            }
            Ok(None) => Ok(None),
            Err(e) => Err(DatabaseError::Query(format!("get_by_file: {e}"))),
        }
    }

    async fn fetch_unprocessed(&self) -> Result<Vec<StagedRecord>, DatabaseError> {
        let mut rows = self
            .conn
            .query(
                "SELECT file, idx, payload, processed, staged_at
                 FROM staged_records WHERE processed = 0 ORDER BY idx ASC",
                (),
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("fetch_unprocessed: {e}")))?;

        let mut records = Vec::new();
        while let Ok(Some(row)) = rows.next().await {
            let record = row_to_record(&row).map_err(|e| {
                DatabaseError::Query(format!("fetch_unprocessed row parse: {e}"))
            })?;
            records.push(record);
        }
        Ok(records)
    }

    async fn claim(&self, file: &str) -> Result<bool, DatabaseError> {
        let claimed = self
            .conn
            .execute(
                "UPDATE staged_records SET processed = 1 WHERE file = ?1 AND processed = 0",
                params![file],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("claim: {e}")))?;
        Ok(claimed > 0)
    }

    async fn release(&self, file: &str) -> Result<(), DatabaseError> {
        self.conn
            .execute(
                "UPDATE staged_records SET processed = 0 WHERE file = ?1",
                params![file],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("release: {e}")))?;
        debug!(file, "Claim released");
        Ok(())
    }
}

// ── Helpers ─────────────────────────────────────────────────────────

fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| DateTime::<Utc>::MIN_UTC)
}

fn row_to_record(row: &libsql::Row) -> Result<StagedRecord, libsql::Error> {
    let file: String = row.get(0)?;
    let index: i64 = row.get(1)?;
    let payload_str: String = row.get(2)?;
    let processed: i64 = row.get(3)?;
    let staged_str: String = row.get(4)?;

    Ok(StagedRecord {
        file,
        index,
        payload: serde_json::from_str(&payload_str).unwrap_or(serde_json::Value::Null),
        processed: processed != 0,
        staged_at: parse_datetime(&staged_str),
    })
}

// ── Tests ───────────────────────────────────────────────────────────
