use crate::db::MemberId;

/// The slice of a marketplace member the DM API exposes.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct MemberSummary {
    pub id: MemberId,
    pub username: String,
}
