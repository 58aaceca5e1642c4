//! Per-conversation message counters.

use std::collections::HashMap;

use parking_lot::Mutex;

/// In-memory message count per conversation.
#[derive(Debug, Default)]
pub struct ConversationCounters {
    counts: Mutex<HashMap<String, u64>>,
}

impl ConversationCounters {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one message and returns the new count.
    pub fn increment(&self, conversation_id: &str) -> u64 {
        let mut counts = self.counts.lock();
        let count = counts.entry(conversation_id.to_owned()).or_insert(0);
        *count += 1;
        *count
    }

    /// Returns the current count (0 for unknown conversations).
    #[must_use]
    pub fn get(&self, conversation_id: &str) -> u64 {
        self.counts.lock().get(conversation_id).copied().unwrap_or(0)
    }

    /// Starts the conversation's count over.
    pub fn reset(&self, conversation_id: &str) {
        self.counts.lock().remove(conversation_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_increment_per_conversation() {
        let counters = ConversationCounters::new();
        assert_eq!(counters.increment("a"), 1);
        assert_eq!(counters.increment("a"), 2);
        assert_eq!(counters.increment("b"), 1);
        assert_eq!(counters.get("a"), 2);
        assert_eq!(counters.get("missing"), 0);
    }

    #[test]
    fn test_reset() {
        let counters = ConversationCounters::new();
        counters.increment("a");
        counters.increment("a");
        counters.reset("a");
        assert_eq!(counters.get("a"), 0);
        assert_eq!(counters.increment("a"), 1);
    }
}
