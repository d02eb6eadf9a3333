//! `conductor run`: Run one pattern and stream its progress.

use conductor_core::event::ProgressEvent;
use conductor_engine::RunOptions;
use conductor_patterns::Catalogue;
use tokio::io::AsyncWriteExt;

use super::{build_engine, load_config};

pub async fn run(
    selector: &str,
    query: &str,
    session: Option<String>,
    offline: bool,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config()?;
    if !offline && !config.has_api_key() && config.default_backend != "ollama" {
        eprintln!("  ⚠️  No API key configured; backends that need one will fail.");
        eprintln!("     Set CONDUCTOR_API_KEY or pass --offline for canned answers.");
    }

    let catalogue = Catalogue::build(&config)?;
    let pattern = catalogue
        .get(selector)
        .ok_or_else(|| format!("Unknown pattern '{selector}'. Try `conductor list`."))?;

    let engine = build_engine(&config, offline);
    let mut options = RunOptions::new();
    if let Some(key) = session.as_deref().or(pattern.session) {
        options = options.with_session(key);
    }

    tracing::info!(pattern = pattern.key, offline, "Starting run");
    if !json {
        println!();
        println!("  ▶ {:02} {}", pattern.number, pattern.title);
        println!();
    }

    let mut stream = engine.run_with(&pattern.orchestration, query, options);
    let cancel = stream.cancel_handle();
    let mut stdout = tokio::io::stdout();

    loop {
        let event = tokio::select! {
            event = stream.recv() => event,
            _ = tokio::signal::ctrl_c() => {
                eprintln!("  Cancelling...");
                cancel.cancel();
                continue;
            }
        };
        let Some(event) = event else { break };
        let line = if json {
            format!("{}\n", serde_json::to_string(&event)?)
        } else {
            render(&event)
        };
        stdout.write_all(line.as_bytes()).await?;
        stdout.flush().await?;
    }

    Ok(())
}

fn render(event: &ProgressEvent) -> String {
    match event {
        ProgressEvent::Status { text } => format!("  {text}\n"),
        ProgressEvent::Result { text } => format!("\n{text}\n"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_are_indented_results_are_not() {
        assert_eq!(render(&ProgressEvent::status("Working...")), "  Working...\n");
        assert_eq!(render(&ProgressEvent::result("# Report")), "\n# Report\n");
    }
}
