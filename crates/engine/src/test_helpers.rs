//! Shared test helpers for engine tests.

use async_trait::async_trait;
use conductor_core::agent::AgentIdentity;
use conductor_core::error::InvocationError;
use conductor_core::invoker::{AgentInvoker, InvokeRequest};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// An agent with a throwaway instruction.
pub fn agent(name: &str) -> Arc<AgentIdentity> {
    Arc::new(AgentIdentity::new(name, format!("You are {name}.")))
}

/// One recorded call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    pub agent: String,
    pub input: String,
    pub session_key: Option<String>,
    pub record: bool,
}

/// A mock invoker with per-agent scripted replies.
///
/// Replies are consumed in order; the last one repeats. Agents with no
/// script answer `"{agent} output"`. Calls are logged when they start.
#[derive(Default)]
pub struct ScriptedInvoker {
    scripts: Mutex<HashMap<String, VecDeque<Result<String, InvocationError>>>>,
    delays: HashMap<String, Duration>,
    calls: Mutex<Vec<Call>>,
}

impl ScriptedInvoker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_response(self, agent: &str, text: &str) -> Self {
        self.push(agent, Ok(text.to_string()))
    }

    pub fn with_error(self, agent: &str, error: InvocationError) -> Self {
        self.push(agent, Err(error))
    }

    pub fn with_delay(mut self, agent: &str, delay: Duration) -> Self {
        self.delays.insert(agent.to_string(), delay);
        self
    }

    fn push(self, agent: &str, reply: Result<String, InvocationError>) -> Self {
        self.scripts
            .lock()
            .unwrap()
            .entry(agent.to_string())
            .or_default()
            .push_back(reply);
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    /// Agent names in call order.
    pub fn agents_called(&self) -> Vec<String> {
        self.calls().into_iter().map(|c| c.agent).collect()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl AgentInvoker for ScriptedInvoker {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn invoke(&self, request: InvokeRequest) -> Result<String, InvocationError> {
        let name = request.agent.name.clone();
        self.calls.lock().unwrap().push(Call {
            agent: name.clone(),
            input: request.input,
            session_key: request.session_key,
            record: request.record,
        });

        if let Some(delay) = self.delays.get(&name) {
            tokio::time::sleep(*delay).await;
        }

        let mut scripts = self.scripts.lock().unwrap();
        match scripts.get_mut(&name) {
            Some(queue) if queue.len() > 1 => queue.pop_front().unwrap(),
            Some(queue) => queue.front().cloned().unwrap(),
            None => Ok(format!("{name} output")),
        }
    }
}
