//! `conductor doctor`: Diagnose configuration and backend health.

use conductor_config::AppConfig;
use conductor_core::invoker::AgentInvoker;
use conductor_patterns::Catalogue;

use super::backend_router;

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    println!("🩺 Conductor Doctor");
    println!("===================");
    println!();

    let config_path = AppConfig::config_dir().join("config.toml");
    if config_path.exists() {
        println!("  ✅ Config file: {}", config_path.display());
    } else {
        println!("  ⚠️  No config file (run `conductor onboard`); using defaults");
    }

    let config = match AppConfig::load() {
        Ok(config) => {
            println!("  ✅ Config is valid");
            config
        }
        Err(e) => {
            println!("  ❌ Config error: {e}");
            return Ok(());
        }
    };

    if config.has_api_key() {
        println!("  ✅ API key configured");
    } else {
        println!("  ⚠️  No API key (fine for a local Ollama backend)");
    }

    match Catalogue::build(&config) {
        Ok(catalogue) => println!("  ✅ Catalogue: {} patterns validated", catalogue.len()),
        Err(e) => println!("  ❌ Catalogue error: {e}"),
    }

    println!(
        "  ℹ️  Session store: {} ({})",
        config.session.store,
        config.session_path().display()
    );

    let router = backend_router(&config);
    for name in router.list() {
        let Some(backend) = router.get(name) else { continue };
        let marker = if name == config.default_backend { " (default)" } else { "" };
        match backend.health_check().await {
            Ok(true) => println!("  ✅ Backend {name}{marker}: reachable"),
            Ok(false) => println!("  ⚠️  Backend {name}{marker}: not responding"),
            Err(e) => println!("  ❌ Backend {name}{marker}: {e}"),
        }
    }
    match router.default_backend() {
        Some(backend) if !config.routing.fallback.is_empty() => {
            println!("  ℹ️  Fallback chain: {}", backend.name());
        }
        Some(_) => {}
        None => println!(
            "  ❌ Default backend '{}' is not configured",
            config.default_backend
        ),
    }

    println!();
    Ok(())
}
