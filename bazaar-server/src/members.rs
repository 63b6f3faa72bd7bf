//! Member directory.
//!
//! Members are owned by the account service; the DM subsystem only needs to
//! resolve ids and usernames. [`MemberDirectory`] is the narrow interface it
//! consumes, [`SqliteMembers`] reads the shared `members` table.

use std::future::Future;

use sqlx::SqlitePool;

use crate::db::MemberId;
use crate::entities::MemberSummary;

/// Upper bound on search results returned to the client.
pub const SEARCH_LIMIT: i64 = 10;

/// Read-only lookups over marketplace members.
pub trait MemberDirectory: Send + Sync + 'static {
    fn find_by_id(
        &self,
        id: MemberId,
    ) -> impl Future<Output = Result<Option<MemberSummary>, sqlx::Error>> + Send;

    /// Usernames are not unique in the account table; the oldest match wins.
    fn find_by_username(
        &self,
        username: &str,
    ) -> impl Future<Output = Result<Option<MemberSummary>, sqlx::Error>> + Send;

    /// Members whose username starts with `prefix`, matched literally.
    fn search_prefix(
        &self,
        prefix: &str,
        limit: i64,
    ) -> impl Future<Output = Result<Vec<MemberSummary>, sqlx::Error>> + Send;
}

/// SQLite-backed [`MemberDirectory`].
#[derive(Clone, Debug)]
pub struct SqliteMembers {
    pool: SqlitePool,
}

impl SqliteMembers {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

impl MemberDirectory for SqliteMembers {
    async fn find_by_id(&self, id: MemberId) -> Result<Option<MemberSummary>, sqlx::Error> {
        sqlx::query_as("SELECT id, username FROM members WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<MemberSummary>, sqlx::Error> {
        sqlx::query_as("SELECT id, username FROM members WHERE username = ?1 ORDER BY id LIMIT 1")
            .bind(username)
            .fetch_optional(&self.pool)
            .await
    }

    async fn search_prefix(&self, prefix: &str, limit: i64) -> Result<Vec<MemberSummary>, sqlx::Error> {
        let pattern = format!("{}%", escape_like(prefix));
        sqlx::query_as(
            "SELECT id, username FROM members WHERE username LIKE ?1 ESCAPE '\\' \
             ORDER BY username, id LIMIT ?2",
        )
        .bind(pattern)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
    }
}

fn escape_like(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

// ── Tests ──────────────────────────────────────────────────────────────────────
