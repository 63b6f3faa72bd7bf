use sqlx::SqlitePool;

use crate::db::{CanonicalPair, MemberId, SymmetricRelation};
use crate::entities::MemberSummary;

/// A row in the `dm_threads` table. `user_a_id < user_b_id` always holds.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct ThreadRecord {
    pub id: i64,
    pub user_a_id: MemberId,
    pub user_b_id: MemberId,
    /// `None` only for rows written before activity tracking existed.
    pub last_activity_at: Option<i64>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl ThreadRecord {
    pub fn has_participant(&self, member_id: MemberId) -> bool {
        self.user_a_id == member_id || self.user_b_id == member_id
    }
}

impl SymmetricRelation for ThreadRecord {
    const TABLE: &'static str = "dm_threads";
    const LO_COLUMN: &'static str = "user_a_id";
    const HI_COLUMN: &'static str = "user_b_id";

    async fn insert(pool: &SqlitePool, pair: CanonicalPair, now: i64) -> Result<Self, sqlx::Error> {
        sqlx::query_as(
            "INSERT INTO dm_threads (user_a_id, user_b_id, last_activity_at, created_at, updated_at) \
             VALUES (?1, ?2, ?3, ?3, ?3) \
             RETURNING id, user_a_id, user_b_id, last_activity_at, created_at, updated_at",
        )
        .bind(pair.lo())
        .bind(pair.hi())
        .bind(now)
        .fetch_one(pool)
        .await
    }
}

/// A thread together with both participants' summaries.
#[derive(Debug, Clone)]
pub struct ThreadView {
    pub thread: ThreadRecord,
    pub user_a: MemberSummary,
    pub user_b: MemberSummary,
}
