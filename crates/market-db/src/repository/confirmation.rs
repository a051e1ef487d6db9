//! # Confirmation Outbox Repository
//!
//! Keeps track of confirmation mails that did not go out.
//!
//! ## Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  fulfill(): order committed, document written, delivery fails          │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  enqueue()        INSERT ... attempts = 1, last_error = <reason>       │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  market resend                                                          │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  get_pending()    WHERE delivered_at IS NULL ORDER BY created_at       │
//! │       │                                                                 │
//! │       ├── sent      → mark_delivered()  delivered_at = now             │
//! │       └── failed    → mark_failed()     attempts += 1, last_error      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Stock is never involved: resending a confirmation is safe to repeat.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbError, DbResult};
use market_core::{ConfirmationOutboxEntry, NewOutboxEntry};

const OUTBOX_COLUMNS: &str =
    "id, order_id, recipient, document_path, attempts, last_error, created_at, delivered_at";

/// Repository for the confirmation outbox.
#[derive(Debug, Clone)]
pub struct ConfirmationOutboxRepository {
    pool: SqlitePool,
}

impl ConfirmationOutboxRepository {
    pub fn new(pool: SqlitePool) -> Self {
        ConfirmationOutboxRepository { pool }
    }

    /// Records a confirmation whose first delivery attempt failed.
    pub async fn enqueue(&self, entry: &NewOutboxEntry) -> DbResult<ConfirmationOutboxEntry> {
        debug!(
            order_id = entry.order_id,
            recipient = %entry.recipient,
            "Queuing undelivered confirmation"
        );

        let stored = sqlx::query_as::<_, ConfirmationOutboxEntry>(&format!(
            r#"
            INSERT INTO confirmation_outbox (order_id, recipient, document_path, attempts, last_error, created_at)
            VALUES (?1, ?2, ?3, 1, ?4, ?5)
            RETURNING {OUTBOX_COLUMNS}
            "#
        ))
        .bind(entry.order_id)
        .bind(&entry.recipient)
        .bind(&entry.document_path)
        .bind(&entry.last_error)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        Ok(stored)
    }

    /// Pending entries, oldest first.
    pub async fn get_pending(&self, limit: u32) -> DbResult<Vec<ConfirmationOutboxEntry>> {
        let entries = sqlx::query_as::<_, ConfirmationOutboxEntry>(&format!(
            r#"
            SELECT {OUTBOX_COLUMNS}
            FROM confirmation_outbox
            WHERE delivered_at IS NULL
            ORDER BY created_at ASC, id ASC
            LIMIT ?1
            "#
        ))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(entries)
    }

    pub async fn get_by_id(&self, id: i64) -> DbResult<Option<ConfirmationOutboxEntry>> {
        let entry = sqlx::query_as::<_, ConfirmationOutboxEntry>(&format!(
            "SELECT {OUTBOX_COLUMNS} FROM confirmation_outbox WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(entry)
    }

    /// Marks an entry as delivered.
    pub async fn mark_delivered(&self, id: i64) -> DbResult<()> {
        debug!(id, "Confirmation delivered");

        let result = sqlx::query(
            "UPDATE confirmation_outbox SET delivered_at = ?2, attempts = attempts + 1 WHERE id = ?1",
        )
        .bind(id)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("ConfirmationOutboxEntry", id));
        }

        Ok(())
    }

    /// Records another failed attempt.
    pub async fn mark_failed(&self, id: i64, error: &str) -> DbResult<()> {
        debug!(id, error = %error, "Confirmation resend failed");

        let result = sqlx::query(
            "UPDATE confirmation_outbox SET attempts = attempts + 1, last_error = ?2 WHERE id = ?1",
        )
        .bind(id)
        .bind(error)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("ConfirmationOutboxEntry", id));
        }

        Ok(())
    }

    /// Number of entries still waiting.
    pub async fn count_pending(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM confirmation_outbox WHERE delivered_at IS NULL",
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }
}
