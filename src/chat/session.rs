//! Bounded in-memory chat session history

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::RwLock;

/// One completed question/answer exchange.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatTurn {
    pub question: String,
    pub answer: String,
}

#[derive(Debug, Clone)]
pub struct SessionStoreConfig {
    pub max_sessions: usize,
    pub max_turns_per_session: usize,
}

impl Default for SessionStoreConfig {
    fn default() -> Self {
        Self {
            max_sessions: 1024,
            max_turns_per_session: 40,
        }
    }
}

struct SessionEntry {
    turns: Vec<ChatTurn>,
    last_used: Instant,
}

/// Session-id → prior turns, bounded on both axes.
///
/// At capacity the least-recently-used session is evicted; within one
/// session the oldest turns fall off first. Lifetime is the process
/// lifetime, there is no TTL.
pub struct SessionStore {
    config: SessionStoreConfig,
    sessions: Arc<RwLock<HashMap<String, SessionEntry>>>,
}

impl SessionStore {
    pub fn new(config: SessionStoreConfig) -> Self {
        Self {
            config,
            sessions: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub async fn history(&self, session_id: &str) -> Vec<ChatTurn> {
        let mut sessions = self.sessions.write().await;
        match sessions.get_mut(session_id) {
            Some(entry) => {
                entry.last_used = Instant::now();
                entry.turns.clone()
            }
            None => Vec::new(),
        }
    }

    pub async fn record(&self, session_id: &str, turn: ChatTurn) {
        let mut sessions = self.sessions.write().await;

        if !sessions.contains_key(session_id) && sessions.len() >= self.config.max_sessions {
            let oldest = sessions
                .iter()
                .min_by_key(|(_, entry)| entry.last_used)
                .map(|(id, _)| id.clone());
            if let Some(id) = oldest {
                sessions.remove(&id);
            }
        }

        let entry = sessions.entry(session_id.to_string()).or_insert(SessionEntry {
            turns: Vec::new(),
            last_used: Instant::now(),
        });

        entry.last_used = Instant::now();
        entry.turns.push(turn);
        if entry.turns.len() > self.config.max_turns_per_session {
            let excess = entry.turns.len() - self.config.max_turns_per_session;
            entry.turns.drain(..excess);
        }
    }

    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn turn(n: usize) -> ChatTurn {
        ChatTurn {
            question: format!("q{}", n),
            answer: format!("a{}", n),
        }
    }

    #[tokio::test]
    async fn test_history_of_unknown_session_is_empty() {
        let store = SessionStore::new(SessionStoreConfig::default());
        assert!(store.history("nope").await.is_empty());
    }

    #[tokio::test]
    async fn test_turns_accumulate_in_order() {
        let store = SessionStore::new(SessionStoreConfig::default());
        store.record("s1", turn(1)).await;
        store.record("s1", turn(2)).await;

        let history = store.history("s1").await;
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].question, "q1");
    }

    #[tokio::test]
    async fn test_turn_cap_drops_oldest() {
        let store = SessionStore::new(SessionStoreConfig {
            max_sessions: 8,
            max_turns_per_session: 2,
        });
        for n in 1..=3 {
            store.record("s1", turn(n)).await;
        }

        let history = store.history("s1").await;
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].question, "q2");
    }

    #[tokio::test]
    async fn test_session_cap_evicts_least_recently_used() {
        let store = SessionStore::new(SessionStoreConfig {
            max_sessions: 2,
            max_turns_per_session: 8,
        });
        store.record("old", turn(1)).await;
        store.record("fresh", turn(2)).await;
        // Touch "old" so "fresh" becomes the eviction candidate.
        store.history("old").await;
        store.record("newest", turn(3)).await;

        assert_eq!(store.session_count().await, 2);
        assert!(!store.history("old").await.is_empty());
        assert!(store.history("fresh").await.is_empty());
    }
}
