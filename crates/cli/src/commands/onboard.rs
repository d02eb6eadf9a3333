//! `conductor onboard`: Initialize configuration and the session directory.

use conductor_config::AppConfig;

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config_dir = AppConfig::config_dir();
    let config_path = config_dir.join("config.toml");

    println!("🎼 Conductor Onboarding");
    println!("=======================");
    println!();

    std::fs::create_dir_all(&config_dir)?;
    println!("  ✅ Config directory: {}", config_dir.display());

    if config_path.exists() {
        println!("  ⏭️  Config file already exists: {}", config_path.display());
    } else {
        std::fs::write(&config_path, AppConfig::default_toml())?;
        println!("  ✅ Created config file: {}", config_path.display());
    }

    let config = AppConfig::load()?;
    if let Some(sessions_dir) = config.session_path().parent() {
        std::fs::create_dir_all(sessions_dir)?;
        println!("  ✅ Session directory: {}", sessions_dir.display());
    }

    println!();
    println!("  Next steps:");
    println!("  1. Start Ollama, or point [backends.*] at an OpenAI-compatible API");
    println!("  2. Set CONDUCTOR_API_KEY for backends that need a key");
    println!("  3. Run: conductor validate");
    println!("  4. Run: conductor run guardrails \"Should we adopt a new SaaS CRM?\"");
    println!();

    Ok(())
}
