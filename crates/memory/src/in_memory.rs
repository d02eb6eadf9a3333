//! In-memory session store, useful for testing and single-process runs.

use async_trait::async_trait;
use conductor_core::error::SessionError;
use conductor_core::session::{SessionStore, SessionTurn};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// A session store that keeps every turn in a map keyed by session.
pub struct InMemorySessionStore {
    sessions: Arc<RwLock<HashMap<String, Vec<SessionTurn>>>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

impl Default for InMemorySessionStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn append(&self, turn: SessionTurn) -> Result<(), SessionError> {
        self.sessions
            .write()
            .await
            .entry(turn.session_key.clone())
            .or_default()
            .push(turn);
        Ok(())
    }

    async fn history(&self, session_key: &str, limit: usize) -> Result<Vec<SessionTurn>, SessionError> {
        let sessions = self.sessions.read().await;
        let turns = sessions.get(session_key).map(Vec::as_slice).unwrap_or_default();
        let skip = turns.len().saturating_sub(limit);
        Ok(turns[skip..].to_vec())
    }

    async fn clear(&self, session_key: &str) -> Result<bool, SessionError> {
        Ok(self.sessions.write().await.remove(session_key).is_some())
    }

    async fn session_count(&self) -> Result<usize, SessionError> {
        Ok(self.sessions.read().await.len())
    }
}
