//! libSQL warehouse — the normalized relational schema.
//!
//! Three tables: emails, users (unique per address), recipients (the
//! email-to-user join with a direction tag). The DDL is idempotent and run
//! by the pipeline's bootstrap operation, not on open.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use libsql::{Connection, params};
use tracing::{debug, info};

use crate::error::DatabaseError;
use crate::store::traits::{NewEmail, RecipientKind, RecipientRow, UserRow, Warehouse};

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS emails (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        message_id TEXT,
        subject TEXT,
        body TEXT,
        mime_version TEXT,
        content_type TEXT,
        content_transfer TEXT,
        date TEXT
    );

    CREATE TABLE IF NOT EXISTS users (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        email TEXT NOT NULL UNIQUE,
        name TEXT
    );

    CREATE TABLE IF NOT EXISTS recipients (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        email_id INTEGER NOT NULL REFERENCES emails(id),
        user_id INTEGER NOT NULL REFERENCES users(id),
        recipient_type TEXT NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_recipients_email ON recipients(email_id);
    CREATE INDEX IF NOT EXISTS idx_recipients_user ON recipients(user_id);
"#;

/// libSQL-backed warehouse.
pub struct LibSqlWarehouse {
    #[allow(dead_code)]
    db: Arc<libsql::Database>,
    conn: Connection,
}

impl LibSqlWarehouse {
    /// Open (or create) a local warehouse database file.
    pub async fn new_local(path: &Path) -> Result<Self, DatabaseError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                DatabaseError::Pool(format!("Failed to create database directory: {e}"))
            })?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| DatabaseError::Pool(format!("Failed to open warehouse database: {e}")))?;
        let conn = db
            .connect()
            .map_err(|e| DatabaseError::Pool(format!("Failed to create connection: {e}")))?;

        info!(path = %path.display(), "Warehouse opened");
        Ok(Self {
            db: Arc::new(db),
            conn,
        })
    }

    /// Create an in-memory warehouse (for tests).
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

        Ok(Self {
            db: Arc::new(db),
            conn,
        })
    }
}

/// Convert `Option<&str>` to a libsql Value.
fn opt_text(s: Option<&str>) -> libsql::Value {
    match s {
        Some(s) => libsql::Value::Text(s.to_string()),
        None => libsql::Value::Null,
    }
}

#[async_trait]
impl Warehouse for LibSqlWarehouse {
    async fn bootstrap(&self) -> Result<(), DatabaseError> {
        self.conn
            .execute_batch(SCHEMA)
            .await
            .map_err(|e| DatabaseError::Query(format!("bootstrap: {e}")))?;
        info!("Warehouse schema ready");
        Ok(())
    }

    async fn insert_email(&self, email: &NewEmail) -> Result<i64, DatabaseError> {
        self.conn
            .execute(
                "INSERT INTO emails (message_id, subject, body, mime_version,
                    content_type, content_transfer, date)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    opt_text(email.message_id.as_deref()),
                    opt_text(email.subject.as_deref()),
                    email.body.as_str(),
                    opt_text(email.mime_version.as_deref()),
                    opt_text(email.content_type.as_deref()),
                    opt_text(email.content_transfer.as_deref()),
                    opt_text(email.date.map(|d| d.to_rfc3339()).as_deref()),
                ],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("insert_email: {e}")))?;

        let id = self.conn.last_insert_rowid();
        debug!(email_id = id, message_id = ?email.message_id, "Email row inserted");
        Ok(id)
    }

    async fn upsert_user(&self, email: &str, name: &str) -> Result<i64, DatabaseError> {
        self.conn
            .execute(
                "INSERT INTO users (email, name) VALUES (?1, ?2)
                 ON CONFLICT(email) DO NOTHING",
                params![email, name],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("upsert_user: {e}")))?;

        let mut rows = self
            .conn
            .query("SELECT id FROM users WHERE email = ?1", params![email])
            .await
            .map_err(|e| DatabaseError::Query(format!("upsert_user select: {e}")))?;

        match rows.next().await {
            Ok(Some(row)) => row
                .get::<i64>(0)
                .map_err(|e| DatabaseError::Query(format!("upsert_user id: {e}"))),
            Ok(None) => Err(DatabaseError::Constraint(format!(
                "user row missing after upsert for {email}"
            ))),
            Err(e) => Err(DatabaseError::Query(format!("upsert_user select: {e}"))),
        }
    }

    async fn insert_recipient(
        &self,
        email_id: i64,
        user_id: i64,
        kind: RecipientKind,
    ) -> Result<(), DatabaseError> {
        self.conn
            .execute(
                "INSERT INTO recipients (email_id, user_id, recipient_type)
                 VALUES (?1, ?2, ?3)",
                params![email_id, user_id, kind.as_str()],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("insert_recipient: {e}")))?;
        Ok(())
    }

    async fn count_emails(&self) -> Result<i64, DatabaseError> {
        let mut rows = self
            .conn
            .query("SELECT COUNT(*) FROM emails", ())
            .await
            .map_err(|e| DatabaseError::Query(format!("count_emails: {e}")))?;

        match rows.next().await {
            Ok(Some(row)) => row
                .get::<i64>(0)
                .map_err(|e| DatabaseError::Query(format!("count_emails: {e}"))),
            Ok(None) => Ok(0),
            Err(e) => Err(DatabaseError::Query(format!("count_emails: {e}"))),
        }
    }

    async fn find_user(&self, email: &str) -> Result<Option<UserRow>, DatabaseError> {
        let mut rows = self
            .conn
            .query(
                "SELECT id, email, name FROM users WHERE email = ?1",
                params![email],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("find_user: {e}")))?;

        match rows.next().await {
            Ok(Some(row)) => {
                let id: i64 = row
                    .get(0)
                    .map_err(|e| DatabaseError::Query(format!("find_user id: {e}")))?;
                let email: String = row
                    .get(1)
                    .map_err(|e| DatabaseError::Query(format!("find_user email: {e}")))?;
                let name: Option<String> = row.get::<String>(2).ok();
                Ok(Some(UserRow { id, email, name }))
            }
            Ok(None) => Ok(None),
            Err(e) => Err(DatabaseError::Query(format!("find_user: {e}"))),
        }
    }

    async fn recipients_for(&self, email_id: i64) -> Result<Vec<RecipientRow>, DatabaseError> {
        let mut rows = self
            .conn
            .query(
                "SELECT email_id, user_id, recipient_type
                 FROM recipients WHERE email_id = ?1 ORDER BY id ASC",
                params![email_id],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("recipients_for: {e}")))?;

        let mut links = Vec::new();
        while let Ok(Some(row)) = rows.next().await {
            let email_id: i64 = row
                .get(0)
                .map_err(|e| DatabaseError::Query(format!("recipients_for: {e}")))?;
            let user_id: i64 = row
                .get(1)
                .map_err(|e| DatabaseError::Query(format!("recipients_for: {e}")))?;
            let recipient_type: String = row
                .get(2)
                .map_err(|e| DatabaseError::Query(format!("recipients_for: {e}")))?;
            links.push(RecipientRow {
                email_id,
                user_id,
                recipient_type,
            });
        }
        Ok(links)
    }
}

// ── Tests ───────────────────────────────────────────────────────────
