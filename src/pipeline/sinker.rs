//! Sinker — drains pending staged records into the relational schema.
//!
//! Per record: atomic claim, parse, normalized insert (email row, user
//! upserts, recipient links). Failures are isolated per record: the claim
//! is released and the drain moves on, leaving the record pending for the
//! next run.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::error::Result;
use crate::parser::{self, ParsedEmail};
use crate::store::traits::{NewEmail, RecipientKind, StagingStore, Warehouse};

/// Outcome counts for one drain pass.
#[derive(Debug, Clone, Copy, Default)]
pub struct DrainReport {
    /// Records parsed, written, and marked processed.
    pub sunk: usize,
    /// Records with no raw message text, left pending untouched.
    pub skipped: usize,
    /// Records whose sink failed and whose claim was released.
    pub failed: usize,
}

/// Drains unprocessed staged records: claim, parse, normalize, write.
pub struct Sinker {
    staging: Arc<dyn StagingStore>,
    warehouse: Arc<dyn Warehouse>,
}

impl Sinker {
    pub fn new(staging: Arc<dyn StagingStore>, warehouse: Arc<dyn Warehouse>) -> Self {
        Self { staging, warehouse }
    }

    /// One drain pass over everything currently pending.
    ///
    /// A record is marked processed exactly once, by the conditional claim
    /// that precedes its relational write; overlapping drains race on the
    /// claim, never on the write.
    pub async fn drain(&self) -> Result<DrainReport> {
        let pending = self.staging.fetch_unprocessed().await?;
        let mut report = DrainReport::default();

        for record in &pending {
            let raw = match record.message() {
                Some(raw) if !raw.is_empty() => raw,
                _ => {
                    debug!(file = %record.file, "No raw message text; leaving pending");
                    report.skipped += 1;
                    continue;
                }
            };

            if !self.staging.claim(&record.file).await? {
                debug!(file = %record.file, "Already claimed by another run");
                continue;
            }

            match self.sink_one(raw).await {
                Ok(email_id) => {
                    debug!(file = %record.file, email_id, "Record sunk");
                    report.sunk += 1;
                }
                Err(e) => {
                    warn!(file = %record.file, error = %e, "Sink failed; record returned to pending");
                    self.staging.release(&record.file).await?;
                    report.failed += 1;
                }
            }
        }

        info!(
            sunk = report.sunk,
            skipped = report.skipped,
            failed = report.failed,
            "Drain complete"
        );
        Ok(report)
    }

    /// Parse one raw message and write its normalized rows.
    async fn sink_one(&self, raw: &str) -> Result<i64> {
        let parsed = parser::parse_message(raw)?;

        let email_id = self
            .warehouse
            .insert_email(&NewEmail {
                message_id: parsed.message_id.clone(),
                subject: parsed.subject.clone(),
                body: parsed.content.clone(),
                mime_version: parsed.mime_version.clone(),
                content_type: parsed.content_type.clone(),
                content_transfer: parsed.content_transfer.clone(),
                date: parsed.date,
            })
            .await?;

        // The sender gets a users row; only To/Cc/Bcc addresses get links.
        self.upsert_address(&parsed.sender_email).await?;
        self.link_recipients(email_id, &parsed).await?;

        Ok(email_id)
    }

    async fn upsert_address(&self, address: &str) -> Result<i64> {
        let id = self
            .warehouse
            .upsert_user(address, parser::local_part(address))
            .await?;
        Ok(id)
    }

    async fn link_recipients(&self, email_id: i64, parsed: &ParsedEmail) -> Result<()> {
        let groups = [
            (RecipientKind::To, &parsed.to_emails),
            (RecipientKind::Cc, &parsed.cc_emails),
            (RecipientKind::Bcc, &parsed.bcc_emails),
        ];
        for (kind, addresses) in groups {
            for address in addresses {
                let user_id = self.upsert_address(address).await?;
                self.warehouse
                    .insert_recipient(email_id, user_id, kind)
                    .await?;
            }
        }
        Ok(())
    }
}
