//! Session-memory decorator for any invoker.
//!
//! Calls that carry a session key get the session's recent turns prefixed to
//! their input, and the completed exchange is recorded afterwards unless the
//! request opts out. Calls without a key pass straight through.

use async_trait::async_trait;
use conductor_core::error::InvocationError;
use conductor_core::invoker::{AgentInvoker, InvokeRequest};
use conductor_core::session::{SessionStore, SessionTurn};
use std::sync::Arc;
use tracing::{debug, warn};

/// Wraps an invoker with recall from, and recording to, a session store.
pub struct SessionMemoryInvoker {
    inner: Arc<dyn AgentInvoker>,
    store: Arc<dyn SessionStore>,
    recall_limit: usize,
}

impl SessionMemoryInvoker {
    pub fn new(inner: Arc<dyn AgentInvoker>, store: Arc<dyn SessionStore>) -> Self {
        Self {
            inner,
            store,
            recall_limit: 6,
        }
    }

    /// Maximum number of past turns prefixed to an input.
    pub fn with_recall_limit(mut self, recall_limit: usize) -> Self {
        self.recall_limit = recall_limit;
        self
    }

    pub fn store(&self) -> &Arc<dyn SessionStore> {
        &self.store
    }
}

/// Render recalled turns ahead of the current input.
fn with_history(turns: &[SessionTurn], input: &str) -> String {
    if turns.is_empty() {
        return input.to_string();
    }

    let mut text = String::from("Conversation so far:\n");
    for turn in turns {
        text.push_str(&format!(
            "- Asked: {}\n  {} answered: {}\n",
            turn.input, turn.agent, turn.output
        ));
    }
    text.push_str("\nCurrent request:\n");
    text.push_str(input);
    text
}

#[async_trait]
impl AgentInvoker for SessionMemoryInvoker {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn invoke(&self, request: InvokeRequest) -> Result<String, InvocationError> {
        let Some(session_key) = request.session_key.clone() else {
            return self.inner.invoke(request).await;
        };

        let history = match self.store.history(&session_key, self.recall_limit).await {
            Ok(turns) => turns,
            Err(e) => {
                warn!(session = %session_key, error = %e, "Session recall failed, continuing without history");
                Vec::new()
            }
        };

        debug!(
            session = %session_key,
            agent = %request.agent.name,
            recalled = history.len(),
            "Recalled session turns"
        );

        let original_input = request.input.clone();
        let agent = request.agent.name.clone();
        let record = request.record;
        let recalled = InvokeRequest {
            input: with_history(&history, &request.input),
            ..request
        };

        let output = self.inner.invoke(recalled).await?;

        if !record {
            debug!(session = %session_key, agent = %agent, "Turn held back from session memory");
            return Ok(output);
        }

        let turn = SessionTurn::new(&session_key, agent, original_input, output.clone());
        if let Err(e) = self.store.append(turn).await {
            warn!(session = %session_key, error = %e, "Failed to record session turn");
        }

        Ok(output)
    }

    async fn health_check(&self) -> Result<bool, InvocationError> {
        self.inner.health_check().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::InMemorySessionStore;
    use conductor_core::agent::AgentIdentity;
    use conductor_core::error::SessionError;
    use std::sync::Mutex;

    /// Records every input it receives and echoes a short answer.
    #[derive(Default)]
    struct Recorder {
        inputs: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl AgentInvoker for Recorder {
        fn name(&self) -> &str {
            "recorder"
        }

        async fn invoke(&self, request: InvokeRequest) -> Result<String, InvocationError> {
            let n = {
                let mut inputs = self.inputs.lock().unwrap();
                inputs.push(request.input.clone());
                inputs.len()
            };
            Ok(format!("answer {n}"))
        }
    }

    /// A store whose every operation fails.
    struct BrokenStore;

    #[async_trait]
    impl SessionStore for BrokenStore {
        fn name(&self) -> &str {
            "broken"
        }

        async fn append(&self, _turn: SessionTurn) -> Result<(), SessionError> {
            Err(SessionError::Storage("disk full".into()))
        }

        async fn history(&self, _key: &str, _limit: usize) -> Result<Vec<SessionTurn>, SessionError> {
            Err(SessionError::Storage("disk gone".into()))
        }

        async fn clear(&self, _key: &str) -> Result<bool, SessionError> {
            Ok(false)
        }

        async fn session_count(&self) -> Result<usize, SessionError> {
            Ok(0)
        }
    }

    fn request(input: &str, session: Option<&str>) -> InvokeRequest {
        let agent = Arc::new(AgentIdentity::new("Strategic_Memory_Agent", "Remember."));
        InvokeRequest::new(agent, input).with_session(session.map(String::from))
    }

    #[tokio::test]
    async fn recalls_prior_turns_for_same_session() {
        let inner = Arc::new(Recorder::default());
        let store = Arc::new(InMemorySessionStore::new());
        let invoker = SessionMemoryInvoker::new(inner.clone(), store.clone());

        invoker.invoke(request("We chose hybrid cloud", Some("cio"))).await.unwrap();
        invoker.invoke(request("What did we choose?", Some("cio"))).await.unwrap();

        let inputs = inner.inputs.lock().unwrap().clone();
        assert_eq!(inputs[0], "We chose hybrid cloud");
        assert!(inputs[1].contains("Asked: We chose hybrid cloud"));
        assert!(inputs[1].contains("answered: answer 1"));
        assert!(inputs[1].ends_with("What did we choose?"));

        // Recorded turns hold the caller's input, not the recalled prompt
        let history = store.history("cio", 10).await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[1].input, "What did we choose?");
    }

    #[tokio::test]
    async fn other_sessions_are_not_recalled() {
        let inner = Arc::new(Recorder::default());
        let store = Arc::new(InMemorySessionStore::new());
        let invoker = SessionMemoryInvoker::new(inner.clone(), store);

        invoker.invoke(request("secret plan", Some("a"))).await.unwrap();
        invoker.invoke(request("what plan?", Some("b"))).await.unwrap();

        let inputs = inner.inputs.lock().unwrap().clone();
        assert_eq!(inputs[1], "what plan?");
    }

    #[tokio::test]
    async fn no_session_key_passes_through() {
        let inner = Arc::new(Recorder::default());
        let store = Arc::new(InMemorySessionStore::new());
        let invoker = SessionMemoryInvoker::new(inner.clone(), store.clone());

        invoker.invoke(request("hello", None)).await.unwrap();
        invoker.invoke(request("again", None)).await.unwrap();

        assert_eq!(inner.inputs.lock().unwrap()[1], "again");
        assert_eq!(store.session_count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn recall_limit_bounds_history() {
        let inner = Arc::new(Recorder::default());
        let store = Arc::new(InMemorySessionStore::new());
        let invoker = SessionMemoryInvoker::new(inner.clone(), store).with_recall_limit(1);

        for q in ["first", "second", "third"] {
            invoker.invoke(request(q, Some("s"))).await.unwrap();
        }

        let last = inner.inputs.lock().unwrap()[2].clone();
        assert!(last.contains("Asked: second"));
        assert!(!last.contains("Asked: first"));
    }

    #[tokio::test]
    async fn unrecorded_calls_recall_but_leave_no_turn() {
        let inner = Arc::new(Recorder::default());
        let store = Arc::new(InMemorySessionStore::new());
        let invoker = SessionMemoryInvoker::new(inner.clone(), store.clone());

        invoker.invoke(request("kept", Some("cio"))).await.unwrap();
        invoker
            .invoke(request("draft under audit", Some("cio")).with_record(false))
            .await
            .unwrap();

        assert!(inner.inputs.lock().unwrap()[1].contains("Asked: kept"));
        let history = store.history("cio", 10).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].input, "kept");
    }

    #[tokio::test]
    async fn store_failures_do_not_fail_the_call() {
        let inner = Arc::new(Recorder::default());
        let invoker = SessionMemoryInvoker::new(inner, Arc::new(BrokenStore));
        let out = invoker.invoke(request("hi", Some("s"))).await.unwrap();
        assert_eq!(out, "answer 1");
    }
}
