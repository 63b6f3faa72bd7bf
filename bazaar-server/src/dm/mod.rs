//! Direct-messaging services.
//!
//! Each service owns a pool handle and is cheap to clone; handlers reach
//! them through [`crate::state::AppState`].

pub mod friends;
pub mod messages;
pub mod receipts;
pub mod threads;

pub use friends::FriendLinkLedger;
pub use messages::MessageStore;
pub use receipts::ReadReceiptTracker;
pub use threads::ThreadDirectory;
