//! Friend link ledger.
//!
//! A side registry recording that two members have talked. Links are only
//! ever created; there is no update or delete.

use sqlx::SqlitePool;
use tracing::info;

use crate::db::{self, CanonicalPair, MemberId};
use crate::entities::FriendLink;
use crate::error::DmError;

#[derive(Clone, Debug)]
pub struct FriendLinkLedger {
    pool: SqlitePool,
}

impl FriendLinkLedger {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create the link between `a` and `b` unless it already exists.
    pub async fn upsert(&self, a: MemberId, b: MemberId) -> Result<FriendLink, DmError> {
        let pair = CanonicalPair::new(a, b)?;
        let (link, created) = db::create_if_absent::<FriendLink>(&self.pool, pair).await?;
        if created {
            info!(link_id = link.id, a_id = link.a_id, b_id = link.b_id, "friend link created");
        }
        Ok(link)
    }

    pub async fn find(&self, a: MemberId, b: MemberId) -> Result<Option<FriendLink>, DmError> {
        let pair = CanonicalPair::new(a, b)?;
        Ok(db::find_pair::<FriendLink>(&self.pool, pair).await?)
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod test {
    use super::*;
    use crate::test_support;

    #[tokio::test]
    async fn upsert_is_order_independent() {
        let pool = test_support::pool_with_members(&[(3, "c"), (9, "i")]).await;
        let ledger = FriendLinkLedger::new(pool.clone());

        let first = ledger.upsert(9, 3).await.unwrap();
        assert_eq!((first.a_id, first.b_id), (3, 9));
        let second = ledger.upsert(3, 9).await.unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(test_support::count(&pool, "friend_links").await, 1);
        assert_eq!(ledger.find(9, 3).await.unwrap().unwrap().id, first.id);
    }

    #[tokio::test]
    async fn self_link_is_rejected() {
        let pool = test_support::pool_with_members(&[(3, "c")]).await;
        let ledger = FriendLinkLedger::new(pool.clone());
        assert!(matches!(ledger.upsert(3, 3).await, Err(DmError::SelfReference(_))));
        assert_eq!(test_support::count(&pool, "friend_links").await, 0);
    }
}
