//! Per-session conversation storage.
//!
//! A conversation is created on first reference and lives only in process
//! memory. The first message, when it is a system message, is the one
//! position that may be rewritten; everything else is append-only.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::{Message, MessageRole};

/// Storage seam for conversations, keyed by session id.
pub trait ConversationStore: Send + Sync {
    /// Snapshot of the conversation for `session_id` (empty when unseen).
    fn get(&self, session_id: &str) -> Vec<Message>;

    /// Append a message, creating the conversation if needed.
    fn append(&self, session_id: &str, message: Message);

    /// Empty the conversation. The session id stays known.
    fn clear(&self, session_id: &str);

    /// Put `prompt` at index 0 as the system message.
    ///
    /// Replaces index 0 when it already holds a system message, otherwise
    /// inserts at the front.
    fn set_system_prompt(&self, session_id: &str, prompt: String);
}

type Conversation = Arc<Mutex<Vec<Message>>>;

/// [`ConversationStore`] backed by a map of individually locked
/// conversations.
///
/// The outer lock is held only to find or create an entry, so sessions do
/// not contend with each other.
#[derive(Default)]
pub struct InMemoryStore {
    sessions: Mutex<HashMap<String, Conversation>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of sessions seen so far.
    pub fn session_count(&self) -> usize {
        lock(&self.sessions).len()
    }

    fn conversation(&self, session_id: &str) -> Conversation {
        let mut sessions = lock(&self.sessions);
        Arc::clone(sessions.entry(session_id.to_string()).or_default())
    }
}

impl ConversationStore for InMemoryStore {
    fn get(&self, session_id: &str) -> Vec<Message> {
        let conv = self.conversation(session_id);
        let messages = lock(&conv);
        messages.clone()
    }

    fn append(&self, session_id: &str, message: Message) {
        let conv = self.conversation(session_id);
        lock(&conv).push(message);
    }

    fn clear(&self, session_id: &str) {
        let conv = self.conversation(session_id);
        lock(&conv).clear();
    }

    fn set_system_prompt(&self, session_id: &str, prompt: String) {
        let conv = self.conversation(session_id);
        let mut messages = lock(&conv);
        match messages.first_mut() {
            Some(first) if first.role == MessageRole::System => first.content = prompt,
            _ => messages.insert(0, Message::system(prompt)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unseen_session_is_empty_and_created() {
        let store = InMemoryStore::new();
        assert!(store.get("s1").is_empty());
        assert_eq!(store.session_count(), 1);
    }

    #[test]
    fn append_preserves_order() {
        let store = InMemoryStore::new();
        store.append("s", Message::user("one"));
        store.append("s", Message::assistant("two"));
        let conv = store.get("s");
        assert_eq!(conv, vec![Message::user("one"), Message::assistant("two")]);
    }

    #[test]
    fn system_prompt_replaced_in_place() {
        let store = InMemoryStore::new();
        store.set_system_prompt("s", "first".into());
        store.append("s", Message::user("hi"));
        store.set_system_prompt("s", "second".into());

        let conv = store.get("s");
        assert_eq!(conv.len(), 2);
        assert_eq!(conv[0], Message::system("second"));
        assert_eq!(conv[1], Message::user("hi"));
    }

    #[test]
    fn system_prompt_inserted_before_non_system_head() {
        let store = InMemoryStore::new();
        store.append("s", Message::user("hi"));
        store.set_system_prompt("s", "sys".into());
        let conv = store.get("s");
        assert_eq!(conv[0], Message::system("sys"));
        assert_eq!(conv[1], Message::user("hi"));
    }

    #[test]
    fn clear_empties_only_that_session() {
        let store = InMemoryStore::new();
        store.append("a", Message::user("x"));
        store.append("b", Message::user("y"));
        store.clear("a");
        assert!(store.get("a").is_empty());
        assert_eq!(store.get("b").len(), 1);
        assert_eq!(store.session_count(), 2);
    }

    #[test]
    fn usable_as_trait_object_across_threads() {
        let store: Arc<dyn ConversationStore> = Arc::new(InMemoryStore::new());
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    for j in 0..10 {
                        store.append(&format!("s{i}"), Message::user(format!("{j}")));
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        for i in 0..4 {
            assert_eq!(store.get(&format!("s{i}")).len(), 10);
        }
    }
}
