//! Access guard: thread membership and actor consistency.

use sqlx::SqlitePool;

use crate::db::MemberId;
use crate::entities::ThreadRecord;
use crate::error::DmError;

#[derive(Clone, Debug)]
pub struct AccessGuard {
    pool: SqlitePool,
    require_identity: bool,
}

impl AccessGuard {
    pub fn new(pool: SqlitePool, require_identity: bool) -> Self {
        Self {
            pool,
            require_identity,
        }
    }

    /// `true` iff the thread exists and `member_id` is one of its two
    /// participants.
    pub async fn authorize_thread_access(
        &self,
        thread_id: i64,
        member_id: MemberId,
    ) -> Result<bool, DmError> {
        Ok(self
            .load_thread(thread_id)
            .await?
            .is_some_and(|t| t.has_participant(member_id)))
    }

    /// Load the thread, failing `NotFound` when it is absent and `Forbidden`
    /// when `member_id` does not participate in it.
    pub async fn require_participant(
        &self,
        thread_id: i64,
        member_id: MemberId,
    ) -> Result<ThreadRecord, DmError> {
        let thread = self
            .load_thread(thread_id)
            .await?
            .ok_or_else(|| DmError::NotFound(format!("thread {thread_id} not found")))?;
        if !thread.has_participant(member_id) {
            return Err(DmError::Forbidden("not a member of this thread".into()));
        }
        Ok(thread)
    }

    /// Decide who is acting on a request.
    ///
    /// A resolved identity always wins, and a declared id that disagrees with
    /// it is rejected. Without an identity the declared id is taken at face
    /// value unless the guard was built with `require_identity`.
    pub fn reconcile_actor(
        &self,
        declared: Option<MemberId>,
        resolved: Option<MemberId>,
    ) -> Result<MemberId, DmError> {
        let declared = declared.filter(|id| *id > 0);
        match (declared, resolved) {
            (Some(d), Some(r)) if d != r => Err(DmError::Forbidden("actor mismatch".into())),
            (_, Some(r)) => Ok(r),
            (Some(_), None) if self.require_identity => Err(DmError::Unauthenticated(
                "an authenticated identity is required".into(),
            )),
            (Some(d), None) => Ok(d),
            (None, None) => Err(DmError::Unauthenticated("missing acting member".into())),
        }
    }

    /// Gate for reading a thread's messages. Membership is only enforced
    /// when an identity was resolved; anonymous reads are allowed unless the
    /// guard requires identity.
    pub async fn authorize_reader(
        &self,
        thread_id: i64,
        resolved: Option<MemberId>,
    ) -> Result<(), DmError> {
        match resolved {
            Some(member_id) => self.require_participant(thread_id, member_id).await.map(|_| ()),
            None if self.require_identity => {
                Err(DmError::Unauthenticated("an authenticated identity is required".into()))
            }
            None => Ok(()),
        }
    }

    /// Operations that never fall back to a declared id.
    pub fn require_identity(&self, resolved: Option<MemberId>) -> Result<MemberId, DmError> {
        resolved.ok_or_else(|| DmError::Unauthenticated("unauthorized".into()))
    }

    async fn load_thread(&self, thread_id: i64) -> Result<Option<ThreadRecord>, sqlx::Error> {
        sqlx::query_as(
            "SELECT id, user_a_id, user_b_id, last_activity_at, created_at, updated_at \
             FROM dm_threads WHERE id = ?1",
        )
        .bind(thread_id)
        .fetch_optional(&self.pool)
        .await
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod test {
    use super::*;
    use crate::test_support;

    async fn guard(require_identity: bool) -> (AccessGuard, i64) {
        let pool = test_support::pool_with_members(&[(1, "a"), (2, "b"), (3, "c")]).await;
        let thread_id = test_support::insert_thread(&pool, 1, 2, 1_000).await;
        (AccessGuard::new(pool, require_identity), thread_id)
    }

    #[tokio::test]
    async fn participants_are_authorized() {
        let (guard, thread_id) = guard(false).await;
        assert!(guard.authorize_thread_access(thread_id, 1).await.unwrap());
        assert!(guard.authorize_thread_access(thread_id, 2).await.unwrap());
        assert!(!guard.authorize_thread_access(thread_id, 3).await.unwrap());
        assert!(!guard.authorize_thread_access(thread_id + 100, 1).await.unwrap());
    }

    #[tokio::test]
    async fn require_participant_distinguishes_missing_and_foreign() {
        let (guard, thread_id) = guard(false).await;
        assert_eq!(guard.require_participant(thread_id, 2).await.unwrap().id, thread_id);
        assert!(matches!(
            guard.require_participant(thread_id, 3).await,
            Err(DmError::Forbidden(_))
        ));
        assert!(matches!(
            guard.require_participant(thread_id + 100, 1).await,
            Err(DmError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn actor_reconciliation() {
        let (guard, _) = guard(false).await;
        assert_eq!(guard.reconcile_actor(Some(5), Some(5)).unwrap(), 5);
        assert_eq!(guard.reconcile_actor(None, Some(5)).unwrap(), 5);
        assert_eq!(guard.reconcile_actor(Some(0), Some(5)).unwrap(), 5);
        assert_eq!(guard.reconcile_actor(Some(6), None).unwrap(), 6);
        assert!(matches!(
            guard.reconcile_actor(Some(6), Some(5)),
            Err(DmError::Forbidden(_))
        ));
        assert!(matches!(
            guard.reconcile_actor(None, None),
            Err(DmError::Unauthenticated(_))
        ));
    }

    #[tokio::test]
    async fn readers_are_checked_only_when_identified() {
        let (strict, strict_thread) = guard(true).await;
        assert!(matches!(
            strict.authorize_reader(strict_thread, None).await,
            Err(DmError::Unauthenticated(_))
        ));

        let (guard, thread_id) = guard(false).await;
        assert!(guard.authorize_reader(thread_id, None).await.is_ok());
        assert!(guard.authorize_reader(thread_id, Some(1)).await.is_ok());
        assert!(matches!(
            guard.authorize_reader(thread_id, Some(3)).await,
            Err(DmError::Forbidden(_))
        ));
    }

    #[tokio::test]
    async fn strict_mode_rejects_declared_only_actor() {
        let (guard, _) = guard(true).await;
        assert!(matches!(
            guard.reconcile_actor(Some(6), None),
            Err(DmError::Unauthenticated(_))
        ));
        assert_eq!(guard.reconcile_actor(Some(6), Some(6)).unwrap(), 6);
    }
}
