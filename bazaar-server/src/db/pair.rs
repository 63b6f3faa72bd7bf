//! Symmetric relation store.
//!
//! Threads and friend links are both relations over an *unordered* pair of
//! members. Both are stored once, keyed by the [`CanonicalPair`] (smaller id
//! first) under a UNIQUE index, and created with the same
//! fetch → insert → refetch-on-conflict sequence. Concurrent creators for the
//! same pair therefore converge on a single row without any in-process lock.

use std::future::Future;

use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, SqlitePool};
use tracing::debug;

use crate::db::{is_unique_violation, now_micros};
use crate::error::DmError;

/// Marketplace member id.
pub type MemberId = i64;

/// An unordered member pair stored with the smaller id first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CanonicalPair {
    lo: MemberId,
    hi: MemberId,
}

impl CanonicalPair {
    /// Order `a` and `b`. A member paired with itself is rejected.
    pub fn new(a: MemberId, b: MemberId) -> Result<Self, DmError> {
        if a == b {
            return Err(DmError::SelfReference(format!(
                "member {a} cannot be paired with itself"
            )));
        }
        Ok(Self {
            lo: a.min(b),
            hi: a.max(b),
        })
    }

    pub fn lo(&self) -> MemberId {
        self.lo
    }

    pub fn hi(&self) -> MemberId {
        self.hi
    }
}

/// A table whose rows are keyed by a [`CanonicalPair`].
pub trait SymmetricRelation: for<'r> FromRow<'r, SqliteRow> + Send + Unpin + Sized {
    const TABLE: &'static str;
    const LO_COLUMN: &'static str;
    const HI_COLUMN: &'static str;

    /// Insert a fresh row for `pair` and return it.
    ///
    /// Must surface the backend's UNIQUE violation untouched so that
    /// [`create_if_absent`] can recognise a lost race.
    fn insert(
        pool: &SqlitePool,
        pair: CanonicalPair,
        now: i64,
    ) -> impl Future<Output = Result<Self, sqlx::Error>> + Send;
}

/// Fetch the row stored for `pair`, if any.
pub async fn find_pair<R: SymmetricRelation>(
    pool: &SqlitePool,
    pair: CanonicalPair,
) -> Result<Option<R>, sqlx::Error> {
    let sql = format!(
        "SELECT * FROM {} WHERE {} = ?1 AND {} = ?2",
        R::TABLE,
        R::LO_COLUMN,
        R::HI_COLUMN
    );
    sqlx::query_as::<_, R>(&sql)
        .bind(pair.lo())
        .bind(pair.hi())
        .fetch_optional(pool)
        .await
}

/// Return the row for `pair`, creating it when absent.
///
/// The boolean is `true` only for the caller whose insert actually created
/// the row. A UNIQUE violation means another writer got there first; the row
/// is re-read instead of reporting an error.
pub async fn create_if_absent<R: SymmetricRelation>(
    pool: &SqlitePool,
    pair: CanonicalPair,
) -> Result<(R, bool), sqlx::Error> {
    if let Some(existing) = find_pair::<R>(pool, pair).await? {
        return Ok((existing, false));
    }

    match R::insert(pool, pair, now_micros()).await {
        Ok(row) => Ok((row, true)),
        Err(e) if is_unique_violation(&e) => {
            debug!(
                table = R::TABLE,
                lo = pair.lo(),
                hi = pair.hi(),
                "pair created concurrently; refetching"
            );
            let row = find_pair::<R>(pool, pair)
                .await?
                .ok_or(sqlx::Error::RowNotFound)?;
            Ok((row, false))
        }
        Err(e) => Err(e),
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────
