//! Fallback chain for the default backend.
//!
//! Links are tried in order, each under its own deadline. The first answer
//! wins; when every link fails the caller sees the last link's error.

use async_trait::async_trait;
use conductor_core::error::InvocationError;
use conductor_core::invoker::{AgentInvoker, InvokeRequest};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Backends chained behind one name, e.g. `ollama>premium`.
pub struct FallbackInvoker {
    name: String,
    links: Vec<Link>,
}

struct Link {
    backend: Arc<dyn AgentInvoker>,
    deadline: Duration,
}

impl FallbackInvoker {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            links: Vec::new(),
        }
    }

    /// Append `backend`, giving it at most `deadline` per call.
    pub fn then(mut self, backend: Arc<dyn AgentInvoker>, deadline: Duration) -> Self {
        self.links.push(Link { backend, deadline });
        self
    }

    /// Backend names in the order they are tried.
    pub fn backends(&self) -> Vec<&str> {
        self.links.iter().map(|link| link.backend.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }
}

impl Link {
    async fn call(&self, request: InvokeRequest) -> Result<String, InvocationError> {
        match tokio::time::timeout(self.deadline, self.backend.invoke(request)).await {
            Ok(outcome) => outcome,
            Err(_) => Err(InvocationError::Timeout(format!(
                "backend '{}' gave no answer within {}s",
                self.backend.name(),
                self.deadline.as_secs()
            ))),
        }
    }
}

#[async_trait]
impl AgentInvoker for FallbackInvoker {
    fn name(&self) -> &str {
        &self.name
    }

    async fn invoke(&self, request: InvokeRequest) -> Result<String, InvocationError> {
        let mut last_error = None;

        for (position, link) in self.links.iter().enumerate() {
            let backend = link.backend.name();
            debug!(chain = %self.name, backend, agent = %request.agent.name, position, "Calling backend");

            match link.call(request.clone()).await {
                Ok(output) => {
                    if position > 0 {
                        info!(chain = %self.name, backend, agent = %request.agent.name, "Fallback backend answered");
                    }
                    return Ok(output);
                }
                Err(error) => {
                    warn!(chain = %self.name, backend, error = %error, "Backend failed, moving down the chain");
                    last_error = Some(error);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| {
            InvocationError::NotConfigured(format!("fallback chain '{}' has no backends", self.name))
        }))
    }

    async fn health_check(&self) -> Result<bool, InvocationError> {
        for link in &self.links {
            if matches!(link.backend.health_check().await, Ok(true)) {
                return Ok(true);
            }
        }
        Ok(false)
    }
}
