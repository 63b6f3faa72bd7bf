//! Database connection and shared storage helpers.
//!
//! Every DM component receives a clone of the [`SqlitePool`] at
//! construction; nothing reaches for a process-wide handle.
//!
//! # Migrations path
//!
//! `sqlx::migrate!("./migrations")` resolves the path **at compile time**
//! relative to `CARGO_MANIFEST_DIR`, so the SQL files are embedded into the
//! binary. The database location comes from `BAZAAR_DATABASE_URL` at runtime.
//!
//! # Timestamps
//!
//! All `*_at` columns hold microseconds since the Unix epoch (`INTEGER`), so
//! `ORDER BY` is exact and activity bumps can be made strictly monotonic.

pub mod pair;

use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};

pub use pair::{CanonicalPair, MemberId, SymmetricRelation, create_if_absent, find_pair};

/// Open (or create) the SQLite database at `url` and run pending migrations.
///
/// `url` should be a sqlx-compatible SQLite URL, e.g. `"sqlite://bazaar.db"`
/// or `"sqlite::memory:"` for tests. In-memory databases are pinned to a
/// single long-lived connection, since each connection would otherwise see
/// its own empty database.
pub async fn connect(url: &str) -> Result<SqlitePool, sqlx::Error> {
    let in_memory = url.contains(":memory:");
    let mut options = SqliteConnectOptions::from_str(url)?
        .create_if_missing(true)
        .foreign_keys(true)
        .busy_timeout(Duration::from_secs(5));
    if !in_memory {
        options = options.journal_mode(SqliteJournalMode::Wal);
    }

    let pool_options = if in_memory {
        SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
    } else {
        SqlitePoolOptions::new().max_connections(8)
    };

    let pool = pool_options.connect_with(options).await?;
    // Path is resolved relative to CARGO_MANIFEST_DIR at compile time.
    sqlx::migrate!("./migrations").run(&pool).await?;
    Ok(pool)
}

/// Current time in storage representation.
pub fn now_micros() -> i64 {
    Utc::now().timestamp_micros()
}

/// Convert a stored microsecond timestamp back into a [`DateTime`].
pub fn to_datetime(micros: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_micros(micros).unwrap_or_else(|| {
        tracing::warn!(raw = micros, "timestamp out of range; using now");
        Utc::now()
    })
}

/// RFC 3339 rendering used in every API response.
pub fn to_rfc3339(micros: i64) -> String {
    to_datetime(micros).to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// `true` when `err` is a UNIQUE constraint violation reported by the backend.
pub fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .is_some_and(|db_err| db_err.is_unique_violation())
}

// ── Tests ──────────────────────────────────────────────────────────────────────
