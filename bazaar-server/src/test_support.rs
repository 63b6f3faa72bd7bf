//! Fixtures shared by the unit tests.

use sqlx::SqlitePool;

use crate::db::{self, MemberId};

/// Fresh in-memory database with the given `(id, username)` members.
pub async fn pool_with_members(members: &[(MemberId, &str)]) -> SqlitePool {
    let pool = db::connect("sqlite::memory:")
        .await
        .expect("in-memory database");
    for (id, username) in members {
        sqlx::query("INSERT INTO members (id, username) VALUES (?1, ?2)")
            .bind(id)
            .bind(username)
            .execute(&pool)
            .await
            .expect("seed member");
    }
    pool
}

/// Insert a thread directly, bypassing the directory.
pub async fn insert_thread(
    pool: &SqlitePool,
    a: MemberId,
    b: MemberId,
    last_activity_at: i64,
) -> i64 {
    let (lo, hi) = (a.min(b), a.max(b));
    let (id,): (i64,) = sqlx::query_as(
        "INSERT INTO dm_threads (user_a_id, user_b_id, last_activity_at, created_at, updated_at) \
         VALUES (?1, ?2, ?3, ?3, ?3) RETURNING id",
    )
    .bind(lo)
    .bind(hi)
    .bind(last_activity_at)
    .fetch_one(pool)
    .await
    .expect("seed thread");
    id
}

pub async fn count(pool: &SqlitePool, table: &str) -> i64 {
    let (n,): (i64,) = sqlx::query_as(&format!("SELECT COUNT(*) FROM {table}"))
        .fetch_one(pool)
        .await
        .expect("count rows");
    n
}
