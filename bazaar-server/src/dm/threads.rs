//! Thread directory.
//!
//! Exactly one thread exists per unordered member pair. Threads are created
//! lazily by [`ThreadDirectory::open_or_create`], which also records a
//! friend link the first time a pair talks.

use sqlx::SqlitePool;
use tracing::{debug, info, warn};

use crate::auth::AccessGuard;
use crate::db::{self, CanonicalPair, MemberId};
use crate::dm::FriendLinkLedger;
use crate::entities::{MemberSummary, ThreadRecord, ThreadView};
use crate::error::DmError;
use crate::members::{MemberDirectory, SqliteMembers};

const THREAD_VIEW_SELECT: &str = "\
    SELECT t.id, t.user_a_id, t.user_b_id, t.last_activity_at, t.created_at, t.updated_at, \
           ua.username AS user_a_name, ub.username AS user_b_name \
    FROM dm_threads t \
    LEFT JOIN members ua ON ua.id = t.user_a_id \
    LEFT JOIN members ub ON ub.id = t.user_b_id";

#[derive(sqlx::FromRow)]
struct ThreadRow {
    #[sqlx(flatten)]
    thread: ThreadRecord,
    user_a_name: Option<String>,
    user_b_name: Option<String>,
}

impl From<ThreadRow> for ThreadView {
    fn from(row: ThreadRow) -> Self {
        ThreadView {
            user_a: MemberSummary {
                id: row.thread.user_a_id,
                username: row.user_a_name.unwrap_or_default(),
            },
            user_b: MemberSummary {
                id: row.thread.user_b_id,
                username: row.user_b_name.unwrap_or_default(),
            },
            thread: row.thread,
        }
    }
}

#[derive(Clone, Debug)]
pub struct ThreadDirectory<M = SqliteMembers> {
    pool: SqlitePool,
    members: M,
    friends: FriendLinkLedger,
    guard: AccessGuard,
}

impl<M: MemberDirectory> ThreadDirectory<M> {
    pub fn new(pool: SqlitePool, members: M, friends: FriendLinkLedger, guard: AccessGuard) -> Self {
        Self {
            pool,
            members,
            friends,
            guard,
        }
    }

    /// Return the thread between `requester` and `counterpart`, creating it
    /// on first contact.
    ///
    /// `counterpart` is a member id or a username. A numeric literal is tried
    /// as an id first and then as a username, since usernames may be digits.
    pub async fn open_or_create(
        &self,
        requester: MemberId,
        counterpart: &str,
    ) -> Result<ThreadView, DmError> {
        let raw = counterpart
            .trim()
            .trim_matches(|c| c == '"' || c == '\'')
            .trim();
        if raw.is_empty() {
            return Err(DmError::Validation("counterpart is required".into()));
        }

        self.members
            .find_by_id(requester)
            .await?
            .ok_or_else(|| DmError::NotFound("current user not found".into()))?;

        let friend = self
            .resolve_counterpart(raw)
            .await?
            .ok_or_else(|| DmError::NotFound("friend username not found".into()))?;
        if friend.id == requester {
            return Err(DmError::SelfReference("cannot open thread with yourself".into()));
        }

        let pair = CanonicalPair::new(requester, friend.id)?;
        let (thread, created) = db::create_if_absent::<ThreadRecord>(&self.pool, pair).await?;
        if created {
            info!(thread_id = thread.id, user_a_id = pair.lo(), user_b_id = pair.hi(), "thread created");
            if let Err(e) = self.friends.upsert(pair.lo(), pair.hi()).await {
                warn!(error = %e, user_a_id = pair.lo(), user_b_id = pair.hi(), "friend link not recorded");
            }
        } else {
            debug!(thread_id = thread.id, "existing thread reused");
        }

        self.get(thread.id)
            .await?
            .ok_or_else(|| DmError::NotFound(format!("thread {} not found", thread.id)))
    }

    /// Threads `member_id` participates in, most recently active first.
    pub async fn list(&self, member_id: MemberId) -> Result<Vec<ThreadView>, DmError> {
        let sql = format!(
            "{THREAD_VIEW_SELECT} WHERE t.user_a_id = ?1 OR t.user_b_id = ?1 \
             ORDER BY COALESCE(t.last_activity_at, t.updated_at) DESC, t.id DESC"
        );
        let rows: Vec<ThreadRow> = sqlx::query_as(&sql)
            .bind(member_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(ThreadView::from).collect())
    }

    pub async fn get(&self, thread_id: i64) -> Result<Option<ThreadView>, DmError> {
        let sql = format!("{THREAD_VIEW_SELECT} WHERE t.id = ?1");
        let row: Option<ThreadRow> = sqlx::query_as(&sql)
            .bind(thread_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(ThreadView::from))
    }

    /// Delete a thread with all of its messages and attachments.
    pub async fn delete(&self, thread_id: i64, caller: MemberId) -> Result<(), DmError> {
        self.guard.require_participant(thread_id, caller).await?;

        let mut tx = self.pool.begin().await?;
        sqlx::query(
            "DELETE FROM dm_attachments WHERE message_id IN \
             (SELECT id FROM dm_messages WHERE thread_id = ?1)",
        )
        .bind(thread_id)
        .execute(&mut *tx)
        .await?;
        let messages = sqlx::query("DELETE FROM dm_messages WHERE thread_id = ?1")
            .bind(thread_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        sqlx::query("DELETE FROM dm_threads WHERE id = ?1")
            .bind(thread_id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        info!(thread_id, member_id = caller, messages, "thread deleted");
        Ok(())
    }

    async fn resolve_counterpart(&self, raw: &str) -> Result<Option<MemberSummary>, DmError> {
        if let Ok(id) = raw.parse::<MemberId>() {
            if let Some(member) = self.members.find_by_id(id).await? {
                return Ok(Some(member));
            }
        }
        Ok(self.members.find_by_username(raw).await?)
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod test {
    use super::*;
    use crate::test_support;

    async fn directory(members: &[(MemberId, &str)]) -> (ThreadDirectory, SqlitePool) {
        let pool = test_support::pool_with_members(members).await;
        let dir = ThreadDirectory::new(
            pool.clone(),
            SqliteMembers::new(pool.clone()),
            FriendLinkLedger::new(pool.clone()),
            AccessGuard::new(pool.clone(), false),
        );
        (dir, pool)
    }

    #[tokio::test]
    async fn open_is_symmetric_and_idempotent() {
        let (dir, pool) = directory(&[(10, "bob"), (20, "alice")]).await;

        let t1 = dir.open_or_create(10, "alice").await.unwrap();
        assert_eq!((t1.thread.user_a_id, t1.thread.user_b_id), (10, 20));
        assert_eq!(t1.user_a.username, "bob");
        assert_eq!(t1.user_b.username, "alice");

        let t2 = dir.open_or_create(20, "10").await.unwrap();
        assert_eq!(t1.thread, t2.thread);
        let t3 = dir.open_or_create(20, "bob").await.unwrap();
        assert_eq!(t1.thread.id, t3.thread.id);

        assert_eq!(test_support::count(&pool, "dm_threads").await, 1);
        assert_eq!(test_support::count(&pool, "friend_links").await, 1);
    }

    #[tokio::test]
    async fn numeric_literal_falls_back_to_username() {
        let (dir, _) = directory(&[(1, "me"), (2, "404")]).await;
        let t = dir.open_or_create(1, " \"404\" ").await.unwrap();
        assert_eq!(t.user_b.id, 2);
    }

    #[tokio::test]
    async fn self_thread_is_rejected() {
        let (dir, pool) = directory(&[(1, "me"), (2, "you")]).await;
        assert!(matches!(dir.open_or_create(1, "me").await, Err(DmError::SelfReference(_))));
        assert!(matches!(dir.open_or_create(1, "1").await, Err(DmError::SelfReference(_))));
        assert_eq!(test_support::count(&pool, "dm_threads").await, 0);
    }

    #[tokio::test]
    async fn unknown_members_are_not_found() {
        let (dir, _) = directory(&[(1, "me")]).await;
        assert!(matches!(dir.open_or_create(1, "ghost").await, Err(DmError::NotFound(_))));
        assert!(matches!(dir.open_or_create(99, "me").await, Err(DmError::NotFound(_))));
        assert!(matches!(dir.open_or_create(1, "  ").await, Err(DmError::Validation(_))));
    }

    #[tokio::test]
    async fn concurrent_opens_yield_one_thread() {
        let (dir, pool) = directory(&[(1, "a"), (2, "b")]).await;

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let dir = dir.clone();
                tokio::spawn(async move {
                    if i % 2 == 0 {
                        dir.open_or_create(1, "b").await
                    } else {
                        dir.open_or_create(2, "a").await
                    }
                })
            })
            .collect();

        let mut ids = Vec::new();
        for h in handles {
            ids.push(h.await.unwrap().unwrap().thread.id);
        }
        ids.dedup();
        assert_eq!(ids.len(), 1);
        assert_eq!(test_support::count(&pool, "dm_threads").await, 1);
        assert!(test_support::count(&pool, "friend_links").await <= 1);
    }

    #[tokio::test]
    async fn list_orders_by_latest_activity() {
        let (dir, _) = directory(&[(1, "m"), (2, "x"), (3, "y"), (4, "z")]).await;
        let pool = dir.pool.clone();
        let a = test_support::insert_thread(&pool, 1, 2, 1_000).await;
        let b = test_support::insert_thread(&pool, 3, 1, 2_000).await;
        test_support::insert_thread(&pool, 3, 4, 9_000).await;

        let ids: Vec<i64> = dir.list(1).await.unwrap().iter().map(|t| t.thread.id).collect();
        assert_eq!(ids, vec![b, a]);
    }

    #[tokio::test]
    async fn list_falls_back_to_update_time() {
        let (dir, _) = directory(&[(1, "m"), (2, "x"), (3, "y")]).await;
        let pool = dir.pool.clone();
        let quiet = test_support::insert_thread(&pool, 1, 2, 1_000).await;
        let busy = test_support::insert_thread(&pool, 1, 3, 2_000).await;
        sqlx::query("UPDATE dm_threads SET last_activity_at = NULL, updated_at = 5000 WHERE id = ?1")
            .bind(quiet)
            .execute(&pool)
            .await
            .unwrap();

        let ids: Vec<i64> = dir.list(1).await.unwrap().iter().map(|t| t.thread.id).collect();
        assert_eq!(ids, vec![quiet, busy]);
    }

    #[tokio::test]
    async fn delete_cascades_and_requires_membership() {
        let (dir, pool) = directory(&[(1, "a"), (2, "b"), (3, "c")]).await;
        let thread = dir.open_or_create(1, "b").await.unwrap().thread.id;
        let (message_id,): (i64,) = sqlx::query_as(
            "INSERT INTO dm_messages (thread_id, sender_id, content, created_at) \
             VALUES (?1, 1, 'hi', 1) RETURNING id",
        )
        .bind(thread)
        .fetch_one(&pool)
        .await
        .unwrap();
        sqlx::query("INSERT INTO dm_attachments (message_id, url, kind, created_at) VALUES (?1, '/u/a.png', 'image', 1)")
            .bind(message_id)
            .execute(&pool)
            .await
            .unwrap();

        assert!(matches!(dir.delete(thread, 3).await, Err(DmError::Forbidden(_))));
        assert_eq!(test_support::count(&pool, "dm_messages").await, 1);

        dir.delete(thread, 2).await.unwrap();
        assert_eq!(test_support::count(&pool, "dm_threads").await, 0);
        assert_eq!(test_support::count(&pool, "dm_messages").await, 0);
        assert_eq!(test_support::count(&pool, "dm_attachments").await, 0);
        // Friend links survive thread deletion.
        assert_eq!(test_support::count(&pool, "friend_links").await, 1);
        assert!(matches!(dir.delete(thread, 2).await, Err(DmError::NotFound(_))));
    }
}
