//! Subcommand implementations.

pub mod doctor;
pub mod list;
pub mod onboard;
pub mod run;
pub mod validate;

use std::sync::Arc;

use conductor_config::AppConfig;
use conductor_core::invoker::AgentInvoker;
use conductor_core::session::SessionStore;
use conductor_engine::Engine;
use conductor_memory::{FileSessionStore, InMemorySessionStore, SessionMemoryInvoker};
use conductor_patterns::offline_invoker;
use conductor_providers::{BackendRouter, build_from_config};

pub(crate) fn load_config() -> Result<AppConfig, Box<dyn std::error::Error>> {
    AppConfig::load().map_err(|e| format!("Failed to load config: {e}").into())
}

/// The session store named by `[session].store`.
pub(crate) fn session_store(config: &AppConfig) -> Arc<dyn SessionStore> {
    match config.session.store.as_str() {
        "memory" => Arc::new(InMemorySessionStore::new()),
        _ => Arc::new(FileSessionStore::new(config.session_path())),
    }
}

/// Configured backends, with the fallback chain in front of the default.
pub(crate) fn backend_router(config: &AppConfig) -> BackendRouter {
    build_from_config(config)
}

/// Backend invoker (router or offline) wrapped with session recall.
pub(crate) fn build_invoker(config: &AppConfig, offline: bool) -> Arc<dyn AgentInvoker> {
    let backend: Arc<dyn AgentInvoker> = if offline {
        Arc::new(offline_invoker())
    } else {
        Arc::new(backend_router(config))
    };
    Arc::new(
        SessionMemoryInvoker::new(backend, session_store(config))
            .with_recall_limit(config.session.recall_limit),
    )
}

pub(crate) fn build_engine(config: &AppConfig, offline: bool) -> Engine {
    Engine::from_config(build_invoker(config, offline), &config.engine)
}
