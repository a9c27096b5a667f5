//! Session state storage: an explicit store interface injected into the
//! orchestrator. The core itself holds no global state; callers serialize
//! access per session identity.

use crate::shared::{ConversationHistory, MemoryNotes};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use sled::Db;
use std::path::Path;
use std::sync::Arc;

/// Everything the core keeps per session: bounded history, memory notes, and
/// the optional generated title.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionState {
    #[serde(default)]
    pub history: ConversationHistory,
    #[serde(default)]
    pub notes: MemoryNotes,
    #[serde(default)]
    pub title: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("session storage error: {0}")]
    Storage(String),
}

/// Get/put store for session state, keyed by session identifier.
pub trait SessionStore: Send + Sync {
    fn get(&self, session_id: &str) -> Result<Option<SessionState>, SessionError>;
    fn put(&self, session_id: &str, state: &SessionState) -> Result<(), SessionError>;
}

/// New opaque session identifier.
pub fn new_session_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Purely in-memory store for development and tests.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    sessions: DashMap<String, SessionState>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for MemorySessionStore {
    fn get(&self, session_id: &str) -> Result<Option<SessionState>, SessionError> {
        Ok(self.sessions.get(session_id).map(|s| s.clone()))
    }

    fn put(&self, session_id: &str, state: &SessionState) -> Result<(), SessionError> {
        self.sessions.insert(session_id.to_string(), state.clone());
        Ok(())
    }
}

/// Embedded persistent store: Sled DB with a DashMap hot cache checked first.
pub struct SledSessionStore {
    db: Db,
    cache: Arc<DashMap<String, SessionState>>,
}

impl SledSessionStore {
    /// Opens or creates a Sled database at the given path.
    pub fn open_path<P: AsRef<Path>>(path: P) -> Result<Self, SessionError> {
        let db = sled::open(path).map_err(|e| SessionError::Storage(e.to_string()))?;
        Ok(Self {
            db,
            cache: Arc::new(DashMap::new()),
        })
    }
}

impl SessionStore for SledSessionStore {
    fn get(&self, session_id: &str) -> Result<Option<SessionState>, SessionError> {
        if let Some(s) = self.cache.get(session_id) {
            return Ok(Some(s.clone()));
        }
        let raw = self
            .db
            .get(session_id.as_bytes())
            .map_err(|e| SessionError::Storage(e.to_string()))?;
        let state = raw.and_then(|iv| serde_json::from_slice::<SessionState>(&iv).ok());
        if let Some(ref s) = state {
            self.cache.insert(session_id.to_string(), s.clone());
        }
        Ok(state)
    }

    fn put(&self, session_id: &str, state: &SessionState) -> Result<(), SessionError> {
        let bytes =
            serde_json::to_vec(state).map_err(|e| SessionError::Storage(e.to_string()))?;
        self.db
            .insert(session_id.as_bytes(), bytes)
            .map_err(|e| SessionError::Storage(e.to_string()))?;
        self.cache.insert(session_id.to_string(), state.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::Message;

    #[test]
    fn memory_store_round_trip() {
        let store = MemorySessionStore::new();
        assert!(store.get("s1").unwrap().is_none());

        let mut state = SessionState::default();
        state.history.push(Message::user("hello"));
        state.notes.remember("exam on friday");
        store.put("s1", &state).unwrap();

        let loaded = store.get("s1").unwrap().unwrap();
        assert_eq!(loaded.history.len(), 1);
        assert_eq!(loaded.notes.len(), 1);
    }

    #[test]
    fn sled_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = SledSessionStore::open_path(dir.path().join("sessions")).unwrap();

        let mut state = SessionState::default();
        state.history.push(Message::user("namaste"));
        state.title = Some("Exam Stress Management".to_string());
        store.put("s2", &state).unwrap();

        let loaded = store.get("s2").unwrap().unwrap();
        assert_eq!(loaded.history.as_slice()[0].text, "namaste");
        assert_eq!(loaded.title.as_deref(), Some("Exam Stress Management"));
    }

    #[test]
    fn session_ids_are_unique() {
        assert_ne!(new_session_id(), new_session_id());
    }
}
