//! Message store.
//!
//! Messages are appended to a thread by one of its participants and may
//! only be edited or deleted by their original sender.
//!
//! Posting runs in one transaction: the message row, its attachments and
//! the thread's activity bump commit together. Each attachment is written
//! under its own savepoint, so a bad attachment is logged and dropped while
//! the message itself still goes through.

use std::collections::HashMap;

use sqlx::{Connection, SqliteConnection, SqlitePool};
use tracing::{info, warn};

use crate::auth::AccessGuard;
use crate::db::{MemberId, now_micros};
use crate::entities::{AttachmentRecord, MemberSummary, MessageRecord, MessageView, NewAttachment};
use crate::error::DmError;

/// Page size used when the caller asks for none, or for an out-of-range one.
pub const DEFAULT_PAGE_SIZE: i64 = 50;
/// Largest page a caller may request.
pub const MAX_PAGE_SIZE: i64 = 200;

const MESSAGE_VIEW_SELECT: &str = "\
    SELECT m.id, m.thread_id, m.sender_id, m.content, m.is_read, m.edited_at, m.created_at, \
           s.username AS sender_name \
    FROM dm_messages m \
    LEFT JOIN members s ON s.id = m.sender_id";

#[derive(sqlx::FromRow)]
struct MessageRow {
    #[sqlx(flatten)]
    message: MessageRecord,
    sender_name: Option<String>,
}

impl MessageRow {
    fn into_view(self, attachments: Vec<AttachmentRecord>) -> MessageView {
        MessageView {
            sender: MemberSummary {
                id: self.message.sender_id,
                username: self.sender_name.unwrap_or_default(),
            },
            message: self.message,
            attachments,
        }
    }
}

/// Clamp a requested page size into `(0, MAX_PAGE_SIZE]`.
pub fn page_size(limit: Option<i64>) -> i64 {
    match limit {
        Some(l) if l > 0 && l <= MAX_PAGE_SIZE => l,
        _ => DEFAULT_PAGE_SIZE,
    }
}

/// Insert the message row. A thread deleted after the participant check
/// trips its foreign key and surfaces as `NotFound`.
async fn insert_message(
    conn: &mut SqliteConnection,
    thread_id: i64,
    sender: MemberId,
    content: &str,
    now: i64,
) -> Result<MessageRecord, DmError> {
    sqlx::query_as(
        "INSERT INTO dm_messages (thread_id, sender_id, content, is_read, created_at) \
         VALUES (?1, ?2, ?3, 0, ?4) \
         RETURNING id, thread_id, sender_id, content, is_read, edited_at, created_at",
    )
    .bind(thread_id)
    .bind(sender)
    .bind(content)
    .bind(now)
    .fetch_one(conn)
    .await
    .map_err(|e| {
        if e.as_database_error().is_some_and(|d| d.is_foreign_key_violation()) {
            DmError::NotFound(format!("thread {thread_id} not found"))
        } else {
            e.into()
        }
    })
}

#[derive(Clone, Debug)]
pub struct MessageStore {
    pool: SqlitePool,
    guard: AccessGuard,
}

impl MessageStore {
    pub fn new(pool: SqlitePool, guard: AccessGuard) -> Self {
        Self { pool, guard }
    }

    /// A page of the thread's messages, oldest first.
    pub async fn list(
        &self,
        thread_id: i64,
        offset: Option<i64>,
        limit: Option<i64>,
    ) -> Result<Vec<MessageView>, DmError> {
        let offset = offset.unwrap_or(0).max(0);
        let limit = page_size(limit);

        let sql = format!(
            "{MESSAGE_VIEW_SELECT} WHERE m.thread_id = ?1 \
             ORDER BY m.created_at ASC, m.id ASC LIMIT ?2 OFFSET ?3"
        );
        let rows: Vec<MessageRow> = sqlx::query_as(&sql)
            .bind(thread_id)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let attachments: Vec<AttachmentRecord> = sqlx::query_as(
            "SELECT id, message_id, url, kind, created_at FROM dm_attachments \
             WHERE message_id IN (\
                 SELECT id FROM dm_messages WHERE thread_id = ?1 \
                 ORDER BY created_at ASC, id ASC LIMIT ?2 OFFSET ?3) \
             ORDER BY id ASC",
        )
        .bind(thread_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        let mut by_message: HashMap<i64, Vec<AttachmentRecord>> = HashMap::new();
        for a in attachments {
            by_message.entry(a.message_id).or_default().push(a);
        }
        Ok(rows
            .into_iter()
            .map(|row| {
                let files = by_message.remove(&row.message.id).unwrap_or_default();
                row.into_view(files)
            })
            .collect())
    }

    pub async fn get(&self, message_id: i64) -> Result<Option<MessageView>, DmError> {
        let sql = format!("{MESSAGE_VIEW_SELECT} WHERE m.id = ?1");
        let Some(row) = sqlx::query_as::<_, MessageRow>(&sql)
            .bind(message_id)
            .fetch_optional(&self.pool)
            .await?
        else {
            return Ok(None);
        };

        let attachments = sqlx::query_as(
            "SELECT id, message_id, url, kind, created_at FROM dm_attachments \
             WHERE message_id = ?1 ORDER BY id ASC",
        )
        .bind(message_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(Some(row.into_view(attachments)))
    }

    /// Append a message from `sender` to the thread.
    pub async fn post(
        &self,
        thread_id: i64,
        sender: MemberId,
        content: &str,
        attachments: Vec<NewAttachment>,
    ) -> Result<MessageView, DmError> {
        self.guard.require_participant(thread_id, sender).await?;
        if content.trim().is_empty() && attachments.is_empty() {
            return Err(DmError::Validation(
                "message needs content or at least one attachment".into(),
            ));
        }

        let now = now_micros();
        let mut tx = self.pool.begin().await?;

        let message = insert_message(&mut *tx, thread_id, sender, content, now).await?;

        let mut stored = 0usize;
        for attachment in &attachments {
            let mut savepoint = tx.begin().await?;
            let inserted = sqlx::query(
                "INSERT INTO dm_attachments (message_id, url, kind, created_at) \
                 VALUES (?1, ?2, ?3, ?4)",
            )
            .bind(message.id)
            .bind(&attachment.url)
            .bind(attachment.kind.as_ref())
            .bind(now)
            .execute(&mut *savepoint)
            .await;
            match inserted {
                Ok(_) => {
                    savepoint.commit().await?;
                    stored += 1;
                }
                Err(e) => {
                    warn!(
                        error = %e,
                        message_id = message.id,
                        url = %attachment.url,
                        "attachment write failed; skipping"
                    );
                    savepoint.rollback().await?;
                }
            }
        }

        // Strictly advance even if the clock has not moved since the last bump.
        sqlx::query(
            "UPDATE dm_threads \
             SET last_activity_at = MAX(?1, COALESCE(last_activity_at, 0) + 1), updated_at = ?1 \
             WHERE id = ?2",
        )
        .bind(now)
        .bind(thread_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        info!(
            message_id = message.id,
            thread_id,
            sender_id = sender,
            attachments = stored,
            "message posted"
        );
        self.get(message.id)
            .await?
            .ok_or_else(|| DmError::NotFound(format!("message {} not found", message.id)))
    }

    /// Replace the content of a message. Only its sender may do this.
    pub async fn edit(
        &self,
        message_id: i64,
        caller: MemberId,
        new_content: &str,
    ) -> Result<MessageView, DmError> {
        let message = self.load_owned(message_id, caller, "edit").await?;
        if new_content.trim().is_empty() {
            return Err(DmError::Validation("content must not be empty".into()));
        }

        sqlx::query("UPDATE dm_messages SET content = ?1, edited_at = ?2 WHERE id = ?3")
            .bind(new_content)
            .bind(now_micros())
            .bind(message.id)
            .execute(&self.pool)
            .await?;

        info!(message_id, sender_id = caller, "message edited");
        self.get(message_id)
            .await?
            .ok_or_else(|| DmError::NotFound(format!("message {message_id} not found")))
    }

    /// Delete a message and its attachments. Only its sender may do this.
    pub async fn delete(&self, message_id: i64, caller: MemberId) -> Result<(), DmError> {
        let message = self.load_owned(message_id, caller, "delete").await?;

        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM dm_attachments WHERE message_id = ?1")
            .bind(message.id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM dm_messages WHERE id = ?1")
            .bind(message.id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        info!(message_id, thread_id = message.thread_id, sender_id = caller, "message deleted");
        Ok(())
    }

    async fn load_owned(
        &self,
        message_id: i64,
        caller: MemberId,
        action: &str,
    ) -> Result<MessageRecord, DmError> {
        let message: MessageRecord = sqlx::query_as(
            "SELECT id, thread_id, sender_id, content, is_read, edited_at, created_at \
             FROM dm_messages WHERE id = ?1",
        )
        .bind(message_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DmError::NotFound(format!("message {message_id} not found")))?;

        if message.sender_id != caller {
            return Err(DmError::Forbidden(format!("only the sender can {action} this message")));
        }
        Ok(message)
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────
