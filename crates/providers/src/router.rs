//! Backend router: resolves an identity's backend selector to an invoker.
//!
//! Handles backend creation from config and routes each call to the right
//! backend. Unknown selectors fall back to the default backend.

use async_trait::async_trait;
use conductor_core::agent::Backend;
use conductor_core::error::InvocationError;
use conductor_core::invoker::{AgentInvoker, InvokeRequest};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::fallback::FallbackInvoker;
use crate::openai_compat::OpenAiCompatInvoker;

/// Routes agent calls to the backend named by the agent's identity.
pub struct BackendRouter {
    backends: HashMap<String, Arc<dyn AgentInvoker>>,
    default_backend: String,
}

impl BackendRouter {
    /// Create a new router with a default backend.
    pub fn new(default_backend: impl Into<String>) -> Self {
        Self {
            backends: HashMap::new(),
            default_backend: default_backend.into(),
        }
    }

    /// Register a backend.
    pub fn register(&mut self, name: impl Into<String>, backend: Arc<dyn AgentInvoker>) {
        self.backends.insert(name.into(), backend);
    }

    /// Get the default backend.
    pub fn default_backend(&self) -> Option<Arc<dyn AgentInvoker>> {
        self.backends.get(&self.default_backend).cloned()
    }

    /// Get a specific backend by name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn AgentInvoker>> {
        self.backends.get(name).cloned()
    }

    /// Resolve a selector, falling back to the default backend.
    pub fn resolve(&self, backend: &Backend) -> Option<Arc<dyn AgentInvoker>> {
        match backend {
            Backend::Default => self.default_backend(),
            Backend::Named(name) => self.get(name).or_else(|| {
                warn!(
                    backend = %name,
                    fallback = %self.default_backend,
                    "Unknown backend, using default"
                );
                self.default_backend()
            }),
        }
    }

    /// List all registered backend names, sorted.
    pub fn list(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.backends.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }
}

#[async_trait]
impl AgentInvoker for BackendRouter {
    fn name(&self) -> &str {
        "router"
    }

    async fn invoke(&self, request: InvokeRequest) -> Result<String, InvocationError> {
        let backend = self.resolve(&request.agent.backend).ok_or_else(|| {
            InvocationError::NotConfigured(format!(
                "no backend for '{}' and default '{}' is not registered",
                request.agent.backend, self.default_backend
            ))
        })?;
        backend.invoke(request).await
    }

    async fn health_check(&self) -> Result<bool, InvocationError> {
        match self.default_backend() {
            Some(backend) => backend.health_check().await,
            None => Ok(false),
        }
    }
}

/// Build backends from configuration.
///
/// Every `[backends.<name>]` entry becomes an OpenAI-compatible invoker.
/// The default backend is registered even if not explicitly configured.
pub fn build_from_config(config: &conductor_config::AppConfig) -> BackendRouter {
    let mut router = BackendRouter::new(&config.default_backend);

    for (name, backend_config) in &config.backends {
        let api_key = backend_config
            .api_key
            .clone()
            .or_else(|| config.api_key.clone())
            .unwrap_or_default();

        let Some(base_url) = backend_config
            .api_url
            .clone()
            .or_else(|| default_base_url(name))
        else {
            warn!(backend = %name, "Backend has no api_url and no known default, skipping");
            continue;
        };

        match OpenAiCompatInvoker::new(name, base_url, api_key) {
            Ok(invoker) => {
                let invoker = invoker
                    .with_model(
                        backend_config
                            .model
                            .clone()
                            .unwrap_or_else(|| config.default_model.clone()),
                    )
                    .with_temperature(config.default_temperature)
                    .with_max_tokens(config.default_max_tokens)
                    .with_timeout(Duration::from_secs(backend_config.timeout_secs));
                router.register(name.clone(), Arc::new(invoker));
            }
            Err(e) => warn!(backend = %name, error = %e, "Failed to build backend"),
        }
    }

    // Ensure the default backend exists (even if not explicitly configured)
    if router.get(&config.default_backend).is_none() {
        if let Some(base_url) = default_base_url(&config.default_backend) {
            let api_key = config.api_key.clone().unwrap_or_default();
            match OpenAiCompatInvoker::new(&config.default_backend, base_url, api_key) {
                Ok(invoker) => {
                    let invoker = invoker
                        .with_model(&config.default_model)
                        .with_temperature(config.default_temperature)
                        .with_max_tokens(config.default_max_tokens);
                    router.register(config.default_backend.clone(), Arc::new(invoker));
                }
                Err(e) => warn!(backend = %config.default_backend, error = %e, "Failed to build default backend"),
            }
        }
    }

    install_fallback(&mut router, config);
    router
}

/// Put the default backend at the head of a [`FallbackInvoker`] when
/// `[routing].fallback` names further backends.
fn install_fallback(router: &mut BackendRouter, config: &conductor_config::AppConfig) {
    if config.routing.fallback.is_empty() {
        return;
    }
    let Some(head) = router.default_backend() else {
        warn!(backend = %config.default_backend, "Default backend missing, fallback chain not installed");
        return;
    };

    let deadline = |name: &str| {
        Duration::from_secs(
            config
                .backends
                .get(name)
                .map(|b| b.timeout_secs)
                .unwrap_or(DEFAULT_DEADLINE_SECS),
        )
    };

    let mut names = vec![config.default_backend.as_str()];
    let mut links = vec![(head, deadline(&config.default_backend))];
    for name in &config.routing.fallback {
        if names.contains(&name.as_str()) {
            continue;
        }
        match router.get(name) {
            Some(backend) => {
                links.push((backend, deadline(name)));
                names.push(name);
            }
            None => warn!(backend = %name, "Fallback backend is not configured, skipping"),
        }
    }
    if links.len() < 2 {
        return;
    }

    let chain = links
        .into_iter()
        .fold(FallbackInvoker::new(names.join(">")), |chain, (backend, deadline)| {
            chain.then(backend, deadline)
        });
    debug!(chain = %chain.name(), "Fallback chain installed for the default backend");
    router.register(config.default_backend.clone(), Arc::new(chain));
}

const DEFAULT_DEADLINE_SECS: u64 = 120;

/// Get the default base URL for well-known backends.
fn default_base_url(backend_name: &str) -> Option<String> {
    let url = match backend_name {
        "ollama" => "http://localhost:11434/v1",
        "openai" => "https://api.openai.com/v1",
        "openrouter" => "https://openrouter.ai/api/v1",
        "gemini" => "https://generativelanguage.googleapis.com/v1beta/openai",
        "groq" => "https://api.groq.com/openai/v1",
        "deepseek" => "https://api.deepseek.com/v1",
        "vllm" => "http://localhost:8000/v1",
        "llamacpp" | "llama.cpp" => "http://localhost:8080/v1",
        _ => return None,
    };
    Some(url.into())
}
