//! `conductor list`: Show the pattern catalogue.

use conductor_patterns::Catalogue;

use super::load_config;

pub async fn run(json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config()?;
    let catalogue = Catalogue::build(&config)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&catalogue.summaries())?);
        return Ok(());
    }

    println!("🎼 Conductor Pattern Catalogue");
    println!("==============================");
    println!();
    for pattern in &catalogue {
        println!("  {:02}  {:<16} {}", pattern.number, pattern.key, pattern.title);
    }
    println!();
    println!("  Run one with: conductor run <number|key> \"<query>\"");

    Ok(())
}
