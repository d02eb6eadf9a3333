//! Offline invoker: deterministic canned answers, no network.
//!
//! Used by `conductor run --offline` and by the catalogue validator when no
//! backend is reachable. The same agent and input always produce the same
//! answer.

use async_trait::async_trait;
use conductor_core::error::InvocationError;
use conductor_core::invoker::{AgentInvoker, InvokeRequest};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Longest excerpt of the input quoted in a canned answer.
const EXCERPT_CHARS: usize = 80;

/// An invoker that answers every call locally.
#[derive(Default)]
pub struct OfflineInvoker {
    responses: HashMap<String, String>,
    calls: AtomicUsize,
}

impl OfflineInvoker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Always answer `text` for the named agent.
    pub fn with_response(mut self, agent: impl Into<String>, text: impl Into<String>) -> Self {
        self.responses.insert(agent.into(), text.into());
        self
    }

    /// Calls served so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::Relaxed)
    }
}

/// First non-empty line of the input, cut at a char boundary.
fn excerpt(input: &str) -> String {
    let line = input
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .unwrap_or_default();

    if line.chars().count() <= EXCERPT_CHARS {
        line.to_string()
    } else {
        let cut: String = line.chars().take(EXCERPT_CHARS).collect();
        format!("{cut}...")
    }
}

#[async_trait]
impl AgentInvoker for OfflineInvoker {
    fn name(&self) -> &str {
        "offline"
    }

    async fn invoke(&self, request: InvokeRequest) -> Result<String, InvocationError> {
        self.calls.fetch_add(1, Ordering::Relaxed);

        if let Some(text) = self.responses.get(&request.agent.name) {
            return Ok(text.clone());
        }

        Ok(format!(
            "[{}] Offline answer regarding: {}",
            request.agent.name,
            excerpt(&request.input)
        ))
    }
}
