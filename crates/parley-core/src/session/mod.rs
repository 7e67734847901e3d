//! Persistent chats
//!
//! [`ConversationStore`] keeps one message history per chat id plus a pointer
//! to the last chat used. [`ChatSession`] is the completion layer that reads a
//! chat's history before a call and appends the new turn after it.

mod layer;
mod retention;
mod store;

pub use layer::ChatSession;
pub use retention::apply_retention;
pub use store::{ConversationStore, LAST_CHAT_FILE, validate_chat_id};
