//! Session store trait: explicit cross-call memory.
//!
//! Memory is never ambient: a caller supplies a session key, it travels in
//! the [`crate::InvokeRequest`], and a store keyed by that session holds the
//! turns recorded so far.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::SessionError;

/// One recorded exchange with an agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionTurn {
    /// Session this turn belongs to
    pub session_key: String,

    /// Which agent answered
    pub agent: String,

    /// What the agent was asked
    pub input: String,

    /// What it answered
    pub output: String,

    /// When the exchange completed
    pub recorded_at: DateTime<Utc>,
}

impl SessionTurn {
    pub fn new(
        session_key: impl Into<String>,
        agent: impl Into<String>,
        input: impl Into<String>,
        output: impl Into<String>,
    ) -> Self {
        Self {
            session_key: session_key.into(),
            agent: agent.into(),
            input: input.into(),
            output: output.into(),
            recorded_at: Utc::now(),
        }
    }
}

/// The core SessionStore trait.
///
/// Implementations: in-memory (tests, single process), JSONL file.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// The store name (e.g., "memory", "file").
    fn name(&self) -> &str;

    /// Append a turn to its session.
    async fn append(&self, turn: SessionTurn) -> std::result::Result<(), SessionError>;

    /// The most recent `limit` turns of a session, oldest first.
    async fn history(
        &self,
        session_key: &str,
        limit: usize,
    ) -> std::result::Result<Vec<SessionTurn>, SessionError>;

    /// Forget a session. Returns whether anything was removed.
    async fn clear(&self, session_key: &str) -> std::result::Result<bool, SessionError>;

    /// Number of distinct sessions held.
    async fn session_count(&self) -> std::result::Result<usize, SessionError>;
}
