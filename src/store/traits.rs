//! Storage contracts — staging store and relational warehouse.
//!
//! Both stores are handed to the pipeline as explicit trait objects so a
//! run can bracket open/close around its connections and tests can swap in
//! in-memory backends.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::DatabaseError;

// ── Staging store ───────────────────────────────────────────────────

/// A sampled row staged for normalization.
#[derive(Debug, Clone)]
pub struct StagedRecord {
    /// Natural key: the source file identifier of the sampled row.
    pub file: String,
    /// Position of the row within the sample that staged it.
    pub index: i64,
    /// The raw sampled row as a JSON document.
    pub payload: serde_json::Value,
    /// Flipped to true exactly once, by the sinker's claim.
    pub processed: bool,
    pub staged_at: DateTime<Utc>,
}

impl StagedRecord {
    /// Raw MIME text carried in the payload, if any.
    pub fn message(&self) -> Option<&str> {
        self.payload.get("message").and_then(|v| v.as_str())
    }
}

/// Document-style store for sampled-but-not-yet-normalized records.
#[async_trait]
pub trait StagingStore: Send + Sync {
    /// Stage a record unless its `file` was ever staged before.
    ///
    /// A single conditional insert: a pending or already-processed record
    /// with the same natural key is left untouched, so overlapping samples
    /// are absorbed and completed records are never resurrected. Returns
    /// true if a new pending record was created.
    async fn stage(
        &self,
        file: &str,
        index: i64,
        payload: &serde_json::Value,
    ) -> Result<bool, DatabaseError>;

    /// Look up a staged record by its natural key.
    async fn get_by_file(&self, file: &str) -> Result<Option<StagedRecord>, DatabaseError>;

    /// All records still awaiting normalization.
    async fn fetch_unprocessed(&self) -> Result<Vec<StagedRecord>, DatabaseError>;

    /// Atomically take ownership of a pending record by flipping its
    /// processed flag. Returns false if another worker got there first.
    async fn claim(&self, file: &str) -> Result<bool, DatabaseError>;

    /// Return a claimed record to pending after a failed sink.
    async fn release(&self, file: &str) -> Result<(), DatabaseError>;
}

// ── Relational warehouse ────────────────────────────────────────────

/// A normalized email row ready for insertion.
#[derive(Debug, Clone, Default)]
pub struct NewEmail {
    pub message_id: Option<String>,
    pub subject: Option<String>,
    pub body: String,
    pub mime_version: Option<String>,
    pub content_type: Option<String>,
    pub content_transfer: Option<String>,
    pub date: Option<DateTime<Utc>>,
}

/// Direction tag on an email-to-user link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecipientKind {
    To,
    Cc,
    Bcc,
}

impl RecipientKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecipientKind::To => "to",
            RecipientKind::Cc => "cc",
            RecipientKind::Bcc => "bcc",
        }
    }
}

/// A stored user row.
#[derive(Debug, Clone)]
pub struct UserRow {
    pub id: i64,
    pub email: String,
    pub name: Option<String>,
}

/// A stored email-to-user link.
#[derive(Debug, Clone)]
pub struct RecipientRow {
    pub email_id: i64,
    pub user_id: i64,
    pub recipient_type: String,
}

/// Relational store holding the normalized schema. Rows are immutable
/// history: only the sinker creates them, nothing mutates them.
#[async_trait]
pub trait Warehouse: Send + Sync {
    /// Run the idempotent schema DDL.
    async fn bootstrap(&self) -> Result<(), DatabaseError>;

    /// Insert an email row, returning its surrogate id.
    async fn insert_email(&self, email: &NewEmail) -> Result<i64, DatabaseError>;

    /// Insert a user unless the address exists; either way return the
    /// row's id. Uniqueness is enforced by the store's constraint, not a
    /// client-side check.
    async fn upsert_user(&self, email: &str, name: &str) -> Result<i64, DatabaseError>;

    /// Link an email to a user with a direction tag.
    async fn insert_recipient(
        &self,
        email_id: i64,
        user_id: i64,
        kind: RecipientKind,
    ) -> Result<(), DatabaseError>;

    async fn count_emails(&self) -> Result<i64, DatabaseError>;

    async fn find_user(&self, email: &str) -> Result<Option<UserRow>, DatabaseError>;

    async fn recipients_for(&self, email_id: i64) -> Result<Vec<RecipientRow>, DatabaseError>;
}
