pub mod classifier;
pub mod conversation;

pub use classifier::{KeywordResponder, Reply, Responder};
pub use conversation::{ConversationStore, PendingReply};
