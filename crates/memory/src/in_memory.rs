//! In-memory session store: conversation memory for the process lifetime.

use gitsage_core::error::SessionError;
use gitsage_core::message::{Session, SessionId};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::debug;

/// Keyed store of sessions, each behind its own lock.
///
/// A caller that holds a session's `Mutex` for the duration of a turn
/// serializes every other turn on the same id. Different ids never contend
/// beyond the brief map lookup.
#[derive(Clone, Default)]
pub struct InMemorySessionStore {
    sessions: Arc<RwLock<HashMap<String, Arc<Mutex<Session>>>>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the session for `id`, creating an empty one on first use.
    pub async fn session(&self, id: &str) -> Result<Arc<Mutex<Session>>, SessionError> {
        if id.trim().is_empty() {
            return Err(SessionError::EmptyId);
        }

        if let Some(existing) = self.sessions.read().await.get(id) {
            return Ok(Arc::clone(existing));
        }

        let mut sessions = self.sessions.write().await;
        let entry = sessions.entry(id.to_string()).or_insert_with(|| {
            debug!(session_id = id, "Creating session");
            Arc::new(Mutex::new(Session::new(SessionId::from(id))))
        });
        Ok(Arc::clone(entry))
    }

    /// A copy of the session's current state, waiting for any turn in
    /// progress to finish.
    pub async fn snapshot(&self, id: &str) -> Result<Session, SessionError> {
        let handle = self
            .sessions
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| SessionError::NotFound(id.to_string()))?;
        let session = handle.lock().await;
        Ok(session.clone())
    }

    pub async fn contains(&self, id: &str) -> bool {
        self.sessions.read().await.contains_key(id)
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gitsage_core::message::Role;
    use std::time::Duration;

    #[tokio::test]
    async fn first_use_creates_empty_session() {
        let store = InMemorySessionStore::new();
        let session = store.session("abc").await.unwrap();
        assert!(session.lock().await.is_empty());
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn same_id_returns_same_session() {
        let store = InMemorySessionStore::new();
        let a = store.session("abc").await.unwrap();
        let b = store.session("abc").await.unwrap();
        assert!(Arc::ptr_eq(&a, &b));

        a.lock().await.record_turn("q", "a");
        assert_eq!(b.lock().await.len(), 2);
    }

    #[tokio::test]
    async fn empty_id_is_rejected() {
        let store = InMemorySessionStore::new();
        assert!(matches!(store.session("").await, Err(SessionError::EmptyId)));
        assert!(matches!(store.session("   ").await, Err(SessionError::EmptyId)));
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn snapshot_of_unknown_session_is_not_found() {
        let store = InMemorySessionStore::new();
        assert!(matches!(
            store.snapshot("missing").await,
            Err(SessionError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn snapshot_preserves_order() {
        let store = InMemorySessionStore::new();
        let handle = store.session("s").await.unwrap();
        handle.lock().await.record_turn("first question", "first answer");
        handle.lock().await.record_turn("second question", "second answer");

        let snapshot = store.snapshot("s").await.unwrap();
        let roles: Vec<Role> = snapshot.history.iter().map(|m| m.role).collect();
        assert_eq!(
            roles,
            vec![Role::User, Role::Assistant, Role::User, Role::Assistant]
        );
        assert_eq!(snapshot.history[2].content, "second question");
    }

    #[tokio::test]
    async fn same_session_turns_are_serialized() {
        let store = InMemorySessionStore::new();
        let mut tasks = Vec::new();
        for i in 0..8 {
            let store = store.clone();
            tasks.push(tokio::spawn(async move {
                let handle = store.session("shared").await.unwrap();
                let mut session = handle.lock().await;
                let before = session.len();
                tokio::time::sleep(Duration::from_millis(2)).await;
                session.record_turn(&format!("q{i}"), &format!("a{i}"));
                assert_eq!(session.len(), before + 2);
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }

        let snapshot = store.snapshot("shared").await.unwrap();
        assert_eq!(snapshot.len(), 16);
        // Pairs are never interleaved.
        for pair in snapshot.history.chunks(2) {
            assert_eq!(pair[0].role, Role::User);
            assert_eq!(pair[1].role, Role::Assistant);
            assert_eq!(pair[0].content[1..], pair[1].content[1..]);
        }
    }
}
