//! Read-receipt tracker.

use sqlx::SqlitePool;
use tracing::debug;

use crate::auth::AccessGuard;
use crate::db::MemberId;
use crate::error::DmError;

#[derive(Clone, Debug)]
pub struct ReadReceiptTracker {
    pool: SqlitePool,
    guard: AccessGuard,
}

impl ReadReceiptTracker {
    pub fn new(pool: SqlitePool, guard: AccessGuard) -> Self {
        Self { pool, guard }
    }

    /// Mark every unread message `member_id` received in the thread as read.
    /// Returns the number of messages that changed state.
    pub async fn mark_read(&self, thread_id: i64, member_id: MemberId) -> Result<u64, DmError> {
        self.guard.require_participant(thread_id, member_id).await?;

        let updated = sqlx::query(
            "UPDATE dm_messages SET is_read = 1 \
             WHERE thread_id = ?1 AND sender_id <> ?2 AND is_read = 0",
        )
        .bind(thread_id)
        .bind(member_id)
        .execute(&self.pool)
        .await?
        .rows_affected();

        debug!(thread_id, member_id, updated, "messages marked read");
        Ok(updated)
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod test {
    use super::*;
    use crate::test_support;

    async fn seed_message(pool: &SqlitePool, thread_id: i64, sender: MemberId) {
        sqlx::query(
            "INSERT INTO dm_messages (thread_id, sender_id, content, created_at) \
             VALUES (?1, ?2, 'm', 1)",
        )
        .bind(thread_id)
        .bind(sender)
        .execute(pool)
        .await
        .unwrap();
    }

    async fn unread_from(pool: &SqlitePool, sender: MemberId) -> i64 {
        let (n,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM dm_messages WHERE sender_id = ?1 AND is_read = 0")
                .bind(sender)
                .fetch_one(pool)
                .await
                .unwrap();
        n
    }

    #[tokio::test]
    async fn marks_only_incoming_messages_once() {
        let pool = test_support::pool_with_members(&[(1, "a"), (2, "b")]).await;
        let thread_id = test_support::insert_thread(&pool, 1, 2, 1).await;
        for sender in [1, 2, 2, 1, 2] {
            seed_message(&pool, thread_id, sender).await;
        }
        let tracker = ReadReceiptTracker::new(pool.clone(), AccessGuard::new(pool.clone(), false));

        assert_eq!(tracker.mark_read(thread_id, 1).await.unwrap(), 3);
        assert_eq!(unread_from(&pool, 2).await, 0);
        assert_eq!(unread_from(&pool, 1).await, 2);

        assert_eq!(tracker.mark_read(thread_id, 1).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn outsiders_cannot_mark_read() {
        let pool = test_support::pool_with_members(&[(1, "a"), (2, "b"), (3, "c")]).await;
        let thread_id = test_support::insert_thread(&pool, 1, 2, 1).await;
        seed_message(&pool, thread_id, 1).await;
        let tracker = ReadReceiptTracker::new(pool.clone(), AccessGuard::new(pool.clone(), false));

        assert!(matches!(tracker.mark_read(thread_id, 3).await, Err(DmError::Forbidden(_))));
        assert!(matches!(tracker.mark_read(thread_id + 9, 1).await, Err(DmError::NotFound(_))));
        assert_eq!(unread_from(&pool, 1).await, 1);
    }
}
