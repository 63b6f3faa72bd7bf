//! Persistent DM records.
//!
//! Rows map 1:1 onto the tables created by `migrations/`; the `*View` types
//! bundle a row with the member summaries and attachments the API returns.

pub mod dao;

pub use dao::{
    AttachmentKind, AttachmentRecord, FriendLink, MemberSummary, MessageRecord, MessageView,
    NewAttachment, ThreadRecord, ThreadView,
};
