use crate::db::MemberId;
use crate::entities::{AttachmentRecord, MemberSummary};

/// A row in the `dm_messages` table.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct MessageRecord {
    pub id: i64,
    pub thread_id: i64,
    pub sender_id: MemberId,
    pub content: String,
    pub is_read: bool,
    pub edited_at: Option<i64>,
    pub created_at: i64,
}

/// A message with its sender summary and attachments.
#[derive(Debug, Clone)]
pub struct MessageView {
    pub message: MessageRecord,
    pub sender: MemberSummary,
    pub attachments: Vec<AttachmentRecord>,
}
