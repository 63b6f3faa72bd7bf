use sqlx::SqlitePool;

use crate::db::{CanonicalPair, MemberId, SymmetricRelation};

/// A row in the `friend_links` table. `a_id < b_id` always holds.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct FriendLink {
    pub id: i64,
    pub a_id: MemberId,
    pub b_id: MemberId,
    pub created_at: i64,
}

impl SymmetricRelation for FriendLink {
    const TABLE: &'static str = "friend_links";
    const LO_COLUMN: &'static str = "a_id";
    const HI_COLUMN: &'static str = "b_id";

    async fn insert(pool: &SqlitePool, pair: CanonicalPair, now: i64) -> Result<Self, sqlx::Error> {
        sqlx::query_as(
            "INSERT INTO friend_links (a_id, b_id, created_at) VALUES (?1, ?2, ?3) \
             RETURNING id, a_id, b_id, created_at",
        )
        .bind(pair.lo())
        .bind(pair.hi())
        .bind(now)
        .fetch_one(pool)
        .await
    }
}
