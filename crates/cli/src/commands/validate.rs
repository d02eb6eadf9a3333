//! `conductor validate`: Run every pattern and check its progress stream.

use conductor_patterns::{Catalogue, DEFAULT_QUERY, ValidationReport, validate};

use super::{build_engine, load_config};

pub async fn run(
    live: bool,
    query: Option<String>,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = load_config()?;
    // Validation never touches the user's session history
    config.session.store = "memory".into();

    let catalogue = Catalogue::build(&config)?;
    let engine = build_engine(&config, !live);
    let query = query.as_deref().unwrap_or(DEFAULT_QUERY);

    if !json {
        println!("🧪 Conductor Validator");
        println!("======================");
        println!();
        println!("  Mode:  {}", if live { "live backends" } else { "offline" });
        println!("  Query: {query}");
        println!();
    }

    let report = validate(&engine, &catalogue, query).await;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }

    if report.all_passed() {
        Ok(())
    } else {
        Err(format!("{} of {} patterns failed", report.failed(), report.checks.len()).into())
    }
}

fn print_report(report: &ValidationReport) {
    for check in &report.checks {
        match &check.reason {
            None => println!(
                "  ✅ {:02} {:<16} {} status events",
                check.number, check.key, check.statuses
            ),
            Some(reason) => println!("  ❌ {:02} {:<16} {reason}", check.number, check.key),
        }
    }
    println!();
    println!(
        "  {} passed, {} failed",
        report.passed(),
        report.failed()
    );
}
