//! Conversation Memory
//!
//! Bounded per-conversation history and the recency window sent to the model

pub mod store;
pub mod context_manager;

pub use store::{ConversationHistory, ConversationStore, InMemoryConversationStore, MAX_STORED_TURNS};
pub use context_manager::{ContextConfig, ContextManager};
