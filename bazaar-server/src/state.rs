//! Shared application state injected into every Axum handler.

use std::sync::Arc;

use sqlx::SqlitePool;

use crate::auth::{AccessGuard, IdentityResolver};
use crate::config::Config;
use crate::dm::{FriendLinkLedger, MessageStore, ReadReceiptTracker, ThreadDirectory};
use crate::members::SqliteMembers;
use crate::middleware::auth::TokenVerifier;
use crate::uploads::LocalAttachmentStore;

/// State shared across all HTTP handlers.
#[derive(Clone, Debug)]
pub struct AppState {
    /// Server configuration (env-derived).
    pub config: Arc<Config>,
    /// Shared SQLite pool, also pinged by the health check.
    pub pool: SqlitePool,
    /// Ordered identity strategy chain.
    pub identity: IdentityResolver,
    /// Verifier for signed bearer tokens; `None` without a configured secret.
    pub tokens: Option<TokenVerifier>,
    pub guard: AccessGuard,
    pub members: SqliteMembers,
    pub threads: ThreadDirectory,
    pub messages: MessageStore,
    pub receipts: ReadReceiptTracker,
    pub attachments: LocalAttachmentStore,
}

impl AppState {
    /// Wire every DM service onto one pool.
    pub fn new(config: Config, pool: SqlitePool) -> Self {
        let guard = AccessGuard::new(pool.clone(), config.require_identity);
        let members = SqliteMembers::new(pool.clone());
        let threads = ThreadDirectory::new(
            pool.clone(),
            members.clone(),
            FriendLinkLedger::new(pool.clone()),
            guard.clone(),
        );

        Self {
            identity: IdentityResolver::from_config(&config),
            tokens: config.jwt_secret.as_deref().map(TokenVerifier::new),
            messages: MessageStore::new(pool.clone(), guard.clone()),
            receipts: ReadReceiptTracker::new(pool.clone(), guard.clone()),
            attachments: LocalAttachmentStore::new(&config.upload_dir),
            config: Arc::new(config),
            pool,
            guard,
            members,
            threads,
        }
    }
}
