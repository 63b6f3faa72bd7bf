pub mod attachment;
pub mod friend_link;
pub mod member;
pub mod message;
pub mod thread;

pub use attachment::{AttachmentKind, AttachmentRecord, NewAttachment};
pub use friend_link::FriendLink;
pub use member::MemberSummary;
pub use message::{MessageRecord, MessageView};
pub use thread::{ThreadRecord, ThreadView};
