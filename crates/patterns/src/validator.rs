//! Catalogue validator.
//!
//! Runs every pattern once and checks the stream contract: at least one
//! status, then exactly one result, and a result that is a report rather
//! than a failure or cancellation notice.

use conductor_core::event::ProgressEvent;
use conductor_engine::{CANCELLED_RESULT, Engine, FAILED_PREFIX, RunOptions};
use serde::Serialize;
use tracing::{info, warn};

use crate::catalogue::{Catalogue, Pattern};

/// Default query used when the caller has none.
pub const DEFAULT_QUERY: &str =
    "Assess the security risks and ROI of migrating our ERP platform to the cloud.";

/// Outcome for one pattern.
#[derive(Debug, Clone, Serialize)]
pub struct PatternCheck {
    pub number: u8,
    pub key: &'static str,
    pub passed: bool,
    pub statuses: usize,
    /// Why the check failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Outcome for the whole catalogue.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ValidationReport {
    pub checks: Vec<PatternCheck>,
}

impl ValidationReport {
    pub fn passed(&self) -> usize {
        self.checks.iter().filter(|c| c.passed).count()
    }

    pub fn failed(&self) -> usize {
        self.checks.len() - self.passed()
    }

    pub fn all_passed(&self) -> bool {
        self.failed() == 0
    }
}

/// Run every pattern in `catalogue` against `query`.
pub async fn validate(engine: &Engine, catalogue: &Catalogue, query: &str) -> ValidationReport {
    let mut report = ValidationReport::default();
    for pattern in catalogue {
        let check = check_pattern(engine, pattern, query).await;
        if check.passed {
            info!(pattern = pattern.key, "Pattern passed");
        } else {
            warn!(pattern = pattern.key, reason = ?check.reason, "Pattern failed");
        }
        report.checks.push(check);
    }
    report
}

async fn check_pattern(engine: &Engine, pattern: &Pattern, query: &str) -> PatternCheck {
    let mut options = RunOptions::new();
    if let Some(session) = pattern.session {
        options = options.with_session(session);
    }
    let events = engine
        .run_with(&pattern.orchestration, query, options)
        .collect_events()
        .await;

    let statuses = events.iter().filter(|e| !e.is_terminal()).count();
    let reason = inspect(&events).err();
    PatternCheck {
        number: pattern.number,
        key: pattern.key,
        passed: reason.is_none(),
        statuses,
        reason,
    }
}

/// Check one stream against the contract.
pub fn inspect(events: &[ProgressEvent]) -> Result<(), String> {
    let Some((last, rest)) = events.split_last() else {
        return Err("stream produced no events".into());
    };
    if !last.is_terminal() {
        return Err("stream did not end with a result".into());
    }
    if rest.iter().any(ProgressEvent::is_terminal) {
        return Err("stream produced more than one result".into());
    }
    if rest.is_empty() {
        return Err("no status preceded the result".into());
    }

    let text = last.text();
    if text.starts_with(FAILED_PREFIX) || text == CANCELLED_RESULT {
        return Err(text.to_string());
    }
    if text.trim().is_empty() {
        return Err("result was empty".into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::offline::offline_invoker;
    use async_trait::async_trait;
    use conductor_core::error::InvocationError;
    use conductor_core::invoker::{AgentInvoker, InvokeRequest};
    use std::sync::Arc;

    #[tokio::test]
    async fn every_pattern_passes_offline() {
        let catalogue = Catalogue::standard().unwrap();
        let engine = Engine::new(Arc::new(offline_invoker()));
        let report = validate(&engine, &catalogue, DEFAULT_QUERY).await;

        assert_eq!(report.checks.len(), 21);
        for check in &report.checks {
            assert!(check.passed, "{} failed: {:?}", check.key, check.reason);
            assert!(check.statuses >= 1);
        }
        assert!(report.all_passed());
    }

    struct Unreachable;

    #[async_trait]
    impl AgentInvoker for Unreachable {
        fn name(&self) -> &str {
            "unreachable"
        }

        async fn invoke(&self, _request: InvokeRequest) -> Result<String, InvocationError> {
            Err(InvocationError::NotConfigured("no backend".into()))
        }
    }

    #[tokio::test]
    async fn failures_are_reported_per_pattern() {
        let catalogue = Catalogue::standard().unwrap();
        let engine = Engine::new(Arc::new(Unreachable));
        let report = validate(&engine, &catalogue, "q").await;

        assert_eq!(report.failed(), 21);
        let reason = report.checks[0].reason.as_deref().unwrap();
        assert!(reason.contains("Reasoning_Strategist"));
        assert!(reason.contains("no backend"));
    }

    #[test]
    fn inspect_enforces_the_contract() {
        assert!(inspect(&[]).is_err());
        assert!(inspect(&[ProgressEvent::result("r")]).is_err());
        assert!(inspect(&[ProgressEvent::status("s")]).is_err());
        assert!(
            inspect(&[
                ProgressEvent::status("s"),
                ProgressEvent::result("a"),
                ProgressEvent::result("b")
            ])
            .is_err()
        );
        assert!(inspect(&[ProgressEvent::status("s"), ProgressEvent::result("report")]).is_ok());
    }

    #[test]
    fn report_serializes() {
        let report = ValidationReport {
            checks: vec![PatternCheck {
                number: 1,
                key: "chaining",
                passed: true,
                statuses: 3,
                reason: None,
            }],
        };
        let json = serde_json::to_string(&report).unwrap();
        assert!(json.contains(r#""passed":true"#));
        assert!(!json.contains("reason"));
    }
}
