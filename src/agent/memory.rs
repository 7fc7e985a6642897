//! Conversation memory keyed by caller-supplied conversation id.
//!
//! Live sessions keep a bounded buffer per conversation that is replayed to
//! the model on the next turn of that conversation. Mock sessions use
//! [`NoopMemory`] so replies stay independent of earlier calls.

use parking_lot::Mutex;
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryEntry {
    pub role: String,
    pub content: String,
}

pub trait ConversationMemory: Send + Sync {
    /// Append one user turn and the assistant reply to it as a unit.
    fn record_exchange(&self, conversation_id: &str, user: &str, assistant: &str);
    /// Most recent entries in chronological order, at most `limit` of them.
    /// Always starts on a user turn.
    fn history(&self, conversation_id: &str, limit: usize) -> Vec<MemoryEntry>;
    /// Forget a conversation. Returns whether anything was stored for it.
    fn clear(&self, conversation_id: &str) -> bool;
    fn name(&self) -> &str;
}

/// In-process buffer. Each conversation keeps at most `max_entries` turns,
/// rounded down to whole exchanges; the oldest exchanges are dropped first.
pub struct BufferMemory {
    conversations: Mutex<HashMap<String, Vec<MemoryEntry>>>,
    max_entries: usize,
}

impl BufferMemory {
    pub fn new(max_entries: usize) -> Self {
        Self {
            conversations: Mutex::new(HashMap::new()),
            max_entries: whole_exchanges(max_entries).max(2),
        }
    }
}

/// Largest even count not above `n`.
fn whole_exchanges(n: usize) -> usize {
    n - n % 2
}

impl ConversationMemory for BufferMemory {
    fn record_exchange(&self, conversation_id: &str, user: &str, assistant: &str) {
        let mut conversations = self.conversations.lock();
        let log = conversations.entry(conversation_id.to_string()).or_default();
        log.push(MemoryEntry {
            role: "user".into(),
            content: user.to_string(),
        });
        log.push(MemoryEntry {
            role: "assistant".into(),
            content: assistant.to_string(),
        });
        if log.len() > self.max_entries {
            let excess = log.len() - self.max_entries;
            log.drain(..excess);
        }
    }

    fn history(&self, conversation_id: &str, limit: usize) -> Vec<MemoryEntry> {
        let conversations = self.conversations.lock();
        match conversations.get(conversation_id) {
            Some(log) => {
                let start = log.len().saturating_sub(whole_exchanges(limit));
                log[start..].to_vec()
            }
            None => Vec::new(),
        }
    }

    fn clear(&self, conversation_id: &str) -> bool {
        self.conversations.lock().remove(conversation_id).is_some()
    }

    fn name(&self) -> &str {
        "buffer"
    }
}

/// Records nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopMemory;

impl ConversationMemory for NoopMemory {
    fn record_exchange(&self, _conversation_id: &str, _user: &str, _assistant: &str) {}

    fn history(&self, _conversation_id: &str, _limit: usize) -> Vec<MemoryEntry> {
        Vec::new()
    }

    fn clear(&self, _conversation_id: &str) -> bool {
        false
    }

    fn name(&self) -> &str {
        "none"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn contents(history: &[MemoryEntry]) -> Vec<&str> {
        history.iter().map(|e| e.content.as_str()).collect()
    }

    #[test]
    fn buffer_records_user_then_assistant() {
        let mem = BufferMemory::new(50);
        mem.record_exchange("c1", "hello", "hi");

        let history = mem.history("c1", 10);
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].role, "user");
        assert_eq!(history[1].role, "assistant");
        assert_eq!(contents(&history), ["hello", "hi"]);
    }

    #[test]
    fn buffer_history_returns_most_recent_exchanges() {
        let mem = BufferMemory::new(50);
        for i in 0..5 {
            mem.record_exchange("c1", &format!("q{i}"), &format!("a{i}"));
        }
        assert_eq!(contents(&mem.history("c1", 4)), ["q3", "a3", "q4", "a4"]);
        assert!(mem.history("c1", 0).is_empty());
    }

    #[test]
    fn odd_history_limit_never_starts_on_assistant_turn() {
        let mem = BufferMemory::new(50);
        for i in 0..3 {
            mem.record_exchange("c1", &format!("q{i}"), &format!("a{i}"));
        }
        let history = mem.history("c1", 3);
        assert_eq!(contents(&history), ["q2", "a2"]);
        assert!(mem.history("c1", 1).is_empty());
    }

    #[test]
    fn odd_capacity_trims_whole_exchanges() {
        let mem = BufferMemory::new(3);
        for i in 0..4 {
            mem.record_exchange("c1", &format!("q{i}"), &format!("a{i}"));
        }
        let history = mem.history("c1", 10);
        assert_eq!(contents(&history), ["q3", "a3"]);
        assert_eq!(history[0].role, "user");
    }

    #[test]
    fn capacity_below_one_exchange_still_keeps_last_exchange() {
        let mem = BufferMemory::new(0);
        mem.record_exchange("c1", "q0", "a0");
        mem.record_exchange("c1", "q1", "a1");
        assert_eq!(contents(&mem.history("c1", 10)), ["q1", "a1"]);
    }

    #[test]
    fn buffer_conversations_are_isolated() {
        let mem = BufferMemory::new(50);
        mem.record_exchange("a", "one", "1");
        mem.record_exchange("b", "two", "2");
        assert_eq!(contents(&mem.history("a", 10)), ["one", "1"]);
        assert_eq!(contents(&mem.history("b", 10)), ["two", "2"]);
        assert!(mem.history("missing", 10).is_empty());
    }

    #[test]
    fn buffer_clear_drops_conversation() {
        let mem = BufferMemory::new(50);
        mem.record_exchange("a", "one", "1");
        mem.record_exchange("b", "two", "2");
        assert!(mem.clear("a"));
        assert!(!mem.clear("a"));
        assert!(mem.history("a", 10).is_empty());
        assert_eq!(mem.history("b", 10).len(), 2);
    }

    #[test]
    fn concurrent_exchanges_stay_paired() {
        let mem = Arc::new(BufferMemory::new(1000));
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let mem = Arc::clone(&mem);
                std::thread::spawn(move || {
                    for i in 0..50 {
                        mem.record_exchange("shared", &format!("q{t}-{i}"), &format!("a{t}-{i}"));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let history = mem.history("shared", 1000);
        assert_eq!(history.len(), 800);
        for pair in history.chunks(2) {
            assert_eq!(pair[0].role, "user");
            assert_eq!(pair[1].role, "assistant");
            assert_eq!(pair[0].content[1..], pair[1].content[1..]);
        }
    }

    #[test]
    fn noop_records_nothing() {
        let mem = NoopMemory;
        mem.record_exchange("a", "one", "1");
        assert!(mem.history("a", 10).is_empty());
        assert!(!mem.clear("a"));
        assert_eq!(mem.name(), "none");
    }
}
