//! Conversation-scoped state.

mod counters;

pub use counters::ConversationCounters;
