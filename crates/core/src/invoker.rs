//! AgentInvoker trait: the abstraction over agent backends.
//!
//! An invoker knows how to hand one agent some input text and get its final
//! answer back. The engine calls `invoke()` without knowing which backend
//! serves a given identity.
//!
//! Implementations: OpenAI-compatible HTTP, backend router, fallback chain,
//! offline canned responses, session-memory decorator.

use async_trait::async_trait;
use std::sync::Arc;

use crate::agent::AgentIdentity;
use crate::error::InvocationError;

/// One call to one agent.
#[derive(Debug, Clone)]
pub struct InvokeRequest {
    /// The agent being called
    pub agent: Arc<AgentIdentity>,

    /// Input text (already rendered through any prompt template)
    pub input: String,

    /// Caller-supplied key for cross-call memory
    pub session_key: Option<String>,

    /// Whether session memory may keep this exchange. Cleared for calls
    /// under a `Guarded` node, whose text may yet be withheld.
    pub record: bool,
}

impl InvokeRequest {
    pub fn new(agent: Arc<AgentIdentity>, input: impl Into<String>) -> Self {
        Self {
            agent,
            input: input.into(),
            session_key: None,
            record: true,
        }
    }

    pub fn with_session(mut self, session_key: Option<String>) -> Self {
        self.session_key = session_key;
        self
    }

    pub fn with_record(mut self, record: bool) -> Self {
        self.record = record;
        self
    }
}

/// The core AgentInvoker trait.
///
/// Must be safe to call concurrently, for distinct agents and for the same
/// agent from several runs at once. Implementations enforce their own
/// timeouts and report them as [`InvocationError::Timeout`]; no retries
/// happen at this layer.
#[async_trait]
pub trait AgentInvoker: Send + Sync {
    /// A human-readable name for this invoker (e.g., "ollama", "router").
    fn name(&self) -> &str;

    /// Run the agent on the request input and return its final answer.
    async fn invoke(&self, request: InvokeRequest) -> std::result::Result<String, InvocationError>;

    /// Health check: can the backend be reached?
    async fn health_check(&self) -> std::result::Result<bool, InvocationError> {
        Ok(true)
    }
}

#[async_trait]
impl<T: AgentInvoker + ?Sized> AgentInvoker for Arc<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    async fn invoke(&self, request: InvokeRequest) -> std::result::Result<String, InvocationError> {
        (**self).invoke(request).await
    }

    async fn health_check(&self) -> std::result::Result<bool, InvocationError> {
        (**self).health_check().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Upper;

    #[async_trait]
    impl AgentInvoker for Upper {
        fn name(&self) -> &str {
            "upper"
        }

        async fn invoke(&self, request: InvokeRequest) -> Result<String, InvocationError> {
            Ok(format!("{}: {}", request.agent.name, request.input.to_uppercase()))
        }
    }

    #[tokio::test]
    async fn arc_invoker_delegates() {
        let invoker: Arc<dyn AgentInvoker> = Arc::new(Upper);
        let agent = Arc::new(AgentIdentity::new("Echo", "Repeat loudly."));
        let out = invoker
            .invoke(InvokeRequest::new(agent, "hello"))
            .await
            .unwrap();
        assert_eq!(out, "Echo: HELLO");
        assert_eq!(invoker.name(), "upper");
        assert!(invoker.health_check().await.unwrap());
    }

    #[test]
    fn request_carries_session_key() {
        let agent = Arc::new(AgentIdentity::new("Memo", "Remember."));
        let req = InvokeRequest::new(agent, "hi").with_session(Some("sess-1".into()));
        assert_eq!(req.session_key.as_deref(), Some("sess-1"));
        assert!(req.record);
        assert!(!req.with_record(false).record);
    }
}
