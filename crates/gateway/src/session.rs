//! Per-page chat sessions.
//!
//! The browser client makes up a session id when the page loads and sends it
//! in the `x-session-id` header. Each id gets its own [`ChatController`], so
//! history and the one-turn-in-flight guard belong to a single page. A reload
//! starts a new id and therefore an empty conversation.
//!
//! All sessions share one [`ConversationOrchestrator`]. Sessions idle longer
//! than the TTL are dropped; when the store is full the least recently used
//! idle session is evicted.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use ragchat_chain::{ChatController, ChatState, ConversationOrchestrator};
use tracing::debug;

/// Header carrying the page's session id.
pub const SESSION_HEADER: &str = "x-session-id";

const MAX_SESSION_ID_LEN: usize = 128;

/// Ids are 1..=128 characters of ASCII letters, digits, `-` or `_`.
pub fn is_valid_session_id(id: &str) -> bool {
    !id.is_empty()
        && id.len() <= MAX_SESSION_ID_LEN
        && id.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
}

struct Session {
    controller: Arc<ChatController>,
    last_seen: Instant,
}

impl Session {
    fn is_pending(&self) -> bool {
        self.controller.state() == ChatState::AwaitingResponse
    }
}

/// Bounded map from session id to controller.
pub struct SessionStore {
    orchestrator: Arc<ConversationOrchestrator>,
    max_sessions: usize,
    idle_ttl: Duration,
    sessions: Mutex<HashMap<String, Session>>,
}

impl SessionStore {
    pub fn new(orchestrator: Arc<ConversationOrchestrator>, max_sessions: usize, idle_ttl: Duration) -> Self {
        Self {
            orchestrator,
            max_sessions: max_sessions.max(1),
            idle_ttl,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// The controller for `id`, created on first use.
    pub fn open(&self, id: &str) -> Arc<ChatController> {
        self.open_at(id, Instant::now())
    }

    /// The controller for `id` if the session exists. Never creates one.
    pub fn get(&self, id: &str) -> Option<Arc<ChatController>> {
        self.get_at(id, Instant::now())
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn orchestrator(&self) -> &Arc<ConversationOrchestrator> {
        &self.orchestrator
    }

    fn open_at(&self, id: &str, now: Instant) -> Arc<ChatController> {
        let mut sessions = self.lock();
        self.expire(&mut sessions, now);

        if let Some(session) = sessions.get_mut(id) {
            session.last_seen = now;
            return session.controller.clone();
        }

        if sessions.len() >= self.max_sessions {
            let oldest = sessions
                .iter()
                .filter(|(_, s)| !s.is_pending())
                .min_by_key(|(_, s)| s.last_seen)
                .map(|(key, _)| key.clone());
            if let Some(key) = oldest {
                debug!(session = %key, "Evicting least recently used session");
                sessions.remove(&key);
            }
        }

        let controller = Arc::new(ChatController::new(self.orchestrator.clone()));
        sessions.insert(
            id.to_string(),
            Session {
                controller: controller.clone(),
                last_seen: now,
            },
        );
        debug!(session = %id, sessions = sessions.len(), "Session opened");
        controller
    }

    fn get_at(&self, id: &str, now: Instant) -> Option<Arc<ChatController>> {
        let mut sessions = self.lock();
        self.expire(&mut sessions, now);
        sessions.get_mut(id).map(|session| {
            session.last_seen = now;
            session.controller.clone()
        })
    }

    /// Pending sessions never expire mid-turn.
    fn expire(&self, sessions: &mut HashMap<String, Session>, now: Instant) {
        sessions.retain(|_, s| now.saturating_duration_since(s.last_seen) < self.idle_ttl || s.is_pending());
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Session>> {
        self.sessions.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::*;
    use ragchat_core::document::Document;

    fn store(max_sessions: usize, ttl_secs: u64) -> SessionStore {
        SessionStore::new(
            test_orchestrator(vec![Document::new("Scrimba is an interactive coding platform.")]),
            max_sessions,
            Duration::from_secs(ttl_secs),
        )
    }

    #[test]
    fn session_id_validation() {
        assert!(is_valid_session_id("3f2a9c1e-7d4b-4e8a-9b1c-0a2b3c4d5e6f"));
        assert!(is_valid_session_id("page_1"));
        assert!(!is_valid_session_id(""));
        assert!(!is_valid_session_id("has space"));
        assert!(!is_valid_session_id(&"a".repeat(MAX_SESSION_ID_LEN + 1)));
    }

    #[tokio::test]
    async fn same_id_returns_same_controller() {
        let store = store(4, 60);
        let a = store.open("page-a");
        a.submit("What is Scrimba?").await.unwrap();

        assert!(Arc::ptr_eq(&a, &store.open("page-a")));
        assert_eq!(store.open("page-a").history_len(), 2);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn distinct_ids_have_distinct_histories() {
        let store = store(4, 60);
        store.open("page-a").submit("my secret is 42").await.unwrap();

        let b = store.open("page-b");
        assert!(b.history().is_empty());
        assert_eq!(store.get("page-a").unwrap().turns(), 1);
    }

    #[test]
    fn get_does_not_create() {
        let store = store(4, 60);
        assert!(store.get("nobody").is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn idle_sessions_expire() {
        let store = store(4, 60);
        let start = Instant::now();
        store.open_at("page-a", start);
        store.open_at("page-b", start + Duration::from_secs(50));

        assert!(store.get_at("page-a", start + Duration::from_secs(61)).is_none());
        assert!(store.get_at("page-b", start + Duration::from_secs(61)).is_some());
    }

    #[test]
    fn full_store_evicts_least_recently_used() {
        let store = store(2, 3600);
        let start = Instant::now();
        store.open_at("page-a", start);
        store.open_at("page-b", start + Duration::from_secs(1));
        store.get_at("page-a", start + Duration::from_secs(2));

        store.open_at("page-c", start + Duration::from_secs(3));

        assert_eq!(store.len(), 2);
        let later = start + Duration::from_secs(4);
        assert!(store.get_at("page-b", later).is_none());
        assert!(store.get_at("page-a", later).is_some());
        assert!(store.get_at("page-c", later).is_some());
    }
}
