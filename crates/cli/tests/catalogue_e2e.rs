//! End-to-end tests for the Conductor pattern catalogue.
//!
//! These tests drive real catalogue patterns through the engine, the session
//! memory decorator and the session stores, with a scripted invoker standing
//! in for the model backend.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use conductor_core::error::InvocationError;
use conductor_core::event::ProgressEvent;
use conductor_core::invoker::{AgentInvoker, InvokeRequest};
use conductor_core::session::SessionStore;
use conductor_engine::{Engine, RunOptions};
use conductor_memory::{FileSessionStore, InMemorySessionStore, SessionMemoryInvoker};
use conductor_patterns::{Catalogue, DEFAULT_QUERY, MEMORY_SESSION, inspect, offline_invoker, validate};

// ── Scripted Invoker ─────────────────────────────────────────────────────

/// Answers per agent name; unscripted agents answer "<agent> output".
#[derive(Default)]
struct ScriptedInvoker {
    replies: HashMap<String, String>,
    calls: Mutex<Vec<(String, String, Option<String>)>>,
}

impl ScriptedInvoker {
    fn new() -> Self {
        Self::default()
    }

    fn reply(mut self, agent: &str, text: &str) -> Self {
        self.replies.insert(agent.to_string(), text.to_string());
        self
    }

    fn agents_called(&self) -> Vec<String> {
        self.calls.lock().unwrap().iter().map(|c| c.0.clone()).collect()
    }

    fn inputs_for(&self, agent: &str) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.0 == agent)
            .map(|c| c.1.clone())
            .collect()
    }
}

#[async_trait::async_trait]
impl AgentInvoker for ScriptedInvoker {
    fn name(&self) -> &str {
        "e2e_scripted"
    }

    async fn invoke(&self, request: InvokeRequest) -> Result<String, InvocationError> {
        let agent = request.agent.name.clone();
        self.calls
            .lock()
            .unwrap()
            .push((agent.clone(), request.input, request.session_key));
        Ok(self
            .replies
            .get(&agent)
            .cloned()
            .unwrap_or_else(|| format!("{agent} output")))
    }
}

fn result_text(events: &[ProgressEvent]) -> &str {
    events.last().expect("stream produced no events").text()
}

// ── Catalogue ────────────────────────────────────────────────────────────

#[tokio::test]
async fn e2e_whole_catalogue_passes_offline_with_session_memory() {
    let catalogue = Catalogue::standard().unwrap();
    let invoker = SessionMemoryInvoker::new(
        Arc::new(offline_invoker()),
        Arc::new(InMemorySessionStore::new()),
    );
    let engine = Engine::new(Arc::new(invoker));

    let report = validate(&engine, &catalogue, DEFAULT_QUERY).await;

    assert_eq!(report.checks.len(), 21);
    assert!(report.all_passed(), "failures: {:?}", report.checks);
}

#[tokio::test]
async fn e2e_every_pattern_streams_statuses_then_one_result() {
    let catalogue = Catalogue::standard().unwrap();
    let invoker = Arc::new(
        ScriptedInvoker::new()
            .reply("ComplianceShield", "APPROVED")
            .reply("Compliance_Auditor", "PASSED"),
    );
    let engine = Engine::new(invoker.clone());

    for pattern in &catalogue {
        let events = engine
            .run(&pattern.orchestration, "Plan our data centre exit.")
            .collect_events()
            .await;
        assert!(inspect(&events).is_ok(), "{}: {events:?}", pattern.key);
    }
    assert!(!invoker.agents_called().is_empty());
}

// ── Routing ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn e2e_security_query_routes_to_security_specialist_only() {
    let catalogue = Catalogue::standard().unwrap();
    let invoker = Arc::new(ScriptedInvoker::new());
    let engine = Engine::new(invoker.clone());

    let pattern = catalogue.get("02").unwrap();
    let events = engine
        .run(&pattern.orchestration, "What are the security risks of outdated SSL certs?")
        .collect_events()
        .await;

    assert_eq!(invoker.agents_called(), vec!["Security_Specialist".to_string()]);
    let result = result_text(&events);
    assert!(result.contains("Cyber Security Division"));
    assert!(result.contains("Security_Specialist output"));
}

#[tokio::test]
async fn e2e_budget_query_routes_to_finance_specialist() {
    let catalogue = Catalogue::standard().unwrap();
    let invoker = Arc::new(ScriptedInvoker::new());
    let engine = Engine::new(invoker.clone());

    let pattern = catalogue.get("routing").unwrap();
    engine
        .run(&pattern.orchestration, "What is the TCO of the new ERP?")
        .collect_events()
        .await;

    assert_eq!(invoker.agents_called(), vec!["Finance_Specialist".to_string()]);
}

// ── Guardrails ───────────────────────────────────────────────────────────

#[tokio::test]
async fn e2e_guardrails_block_hides_the_draft() {
    let catalogue = Catalogue::standard().unwrap();
    let invoker = Arc::new(
        ScriptedInvoker::new()
            .reply("StrategyAnalyst", "Buy an unsanctioned SaaS tool today.")
            .reply("ComplianceShield", "REJECTED: shadow IT"),
    );
    let engine = Engine::new(invoker.clone());

    let pattern = catalogue.get("guardrails").unwrap();
    let events = engine
        .run(&pattern.orchestration, "Which CRM should we buy?")
        .collect_events()
        .await;

    let result = result_text(&events);
    assert!(result.contains("shadow IT"));
    assert!(result.contains("Security & Compliance Block"));
    assert!(!result.contains("unsanctioned SaaS"));
    assert!(
        events
            .iter()
            .any(|e| e.text().contains("Corporate Policy Violation Detected"))
    );
}

#[tokio::test]
async fn e2e_guardrails_approval_delivers_verified_brief() {
    let catalogue = Catalogue::standard().unwrap();
    let invoker = Arc::new(
        ScriptedInvoker::new()
            .reply("StrategyAnalyst", "Consolidate on the sanctioned CRM.")
            .reply("ComplianceShield", "APPROVED"),
    );
    let engine = Engine::new(invoker);

    let pattern = catalogue.get("18").unwrap();
    let events = engine
        .run(&pattern.orchestration, "Which CRM should we buy?")
        .collect_events()
        .await;

    let result = result_text(&events);
    assert!(result.contains("Strategy Brief (Verified)"));
    assert!(result.contains("Consolidate on the sanctioned CRM."));
}

// ── Memory ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn e2e_memory_pattern_recalls_previous_run() {
    let catalogue = Catalogue::standard().unwrap();
    let scripted = Arc::new(ScriptedInvoker::new());
    let store: Arc<dyn SessionStore> = Arc::new(InMemorySessionStore::new());
    let engine = Engine::new(Arc::new(SessionMemoryInvoker::new(scripted.clone(), store)));

    let pattern = catalogue.get("memory").unwrap();
    let options = || RunOptions::new().with_session(MEMORY_SESSION);

    engine
        .run_with(&pattern.orchestration, "Our cloud budget is $2M.", options())
        .collect_events()
        .await;
    engine
        .run_with(&pattern.orchestration, "What was our budget?", options())
        .collect_events()
        .await;

    let inputs = scripted.inputs_for("Strategic_Memory_Agent");
    assert_eq!(inputs.len(), 2);
    assert!(!inputs[0].contains("Conversation so far"));
    assert!(inputs[1].contains("Our cloud budget is $2M."));
    assert!(inputs[1].ends_with("What was our budget?"));
}

#[tokio::test]
async fn e2e_file_session_survives_a_new_engine() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("sessions").join("turns.jsonl");
    let catalogue = Catalogue::standard().unwrap();
    let pattern = catalogue.get("08").unwrap();

    let first = Arc::new(ScriptedInvoker::new());
    let engine = Engine::new(Arc::new(SessionMemoryInvoker::new(
        first.clone(),
        Arc::new(FileSessionStore::new(path.clone())),
    )));
    engine
        .run_with(
            &pattern.orchestration,
            "We standardised on Kubernetes.",
            RunOptions::new().with_session("cio-42"),
        )
        .collect_events()
        .await;

    let second = Arc::new(ScriptedInvoker::new());
    let engine = Engine::new(Arc::new(SessionMemoryInvoker::new(
        second.clone(),
        Arc::new(FileSessionStore::new(path)),
    )));
    engine
        .run_with(
            &pattern.orchestration,
            "Which platform did we pick?",
            RunOptions::new().with_session("cio-42"),
        )
        .collect_events()
        .await;

    let inputs = second.inputs_for("Strategic_Memory_Agent");
    assert_eq!(inputs.len(), 1);
    assert!(inputs[0].contains("We standardised on Kubernetes."));
}

#[tokio::test]
async fn e2e_blocked_draft_never_reaches_session_memory() {
    let catalogue = Catalogue::standard().unwrap();
    let scripted = Arc::new(
        ScriptedInvoker::new()
            .reply("StrategyAnalyst", "SECRET raw draft: buy unsanctioned SaaS")
            .reply("ComplianceShield", "REJECTED: shadow IT"),
    );
    let store = Arc::new(InMemorySessionStore::new());
    let engine = Engine::new(Arc::new(SessionMemoryInvoker::new(scripted.clone(), store.clone())));
    let options = || RunOptions::new().with_session(MEMORY_SESSION);

    let blocked = engine
        .run_with(&catalogue.get("guardrails").unwrap().orchestration, "Which CRM?", options())
        .collect_events()
        .await;
    assert!(result_text(&blocked).contains("shadow IT"));
    assert!(!result_text(&blocked).contains("SECRET"));
    assert!(store.history(MEMORY_SESSION, 50).await.unwrap().is_empty());

    engine
        .run_with(&catalogue.get("memory").unwrap().orchestration, "Recap our last decision.", options())
        .collect_events()
        .await;

    let recalled = scripted.inputs_for("Strategic_Memory_Agent");
    assert_eq!(recalled.len(), 1);
    assert!(!recalled[0].contains("SECRET"));
    let turns = store.history(MEMORY_SESSION, 50).await.unwrap();
    assert!(turns.iter().all(|t| !t.input.contains("SECRET") && !t.output.contains("SECRET")));
}

#[tokio::test]
async fn e2e_sessions_do_not_leak_between_keys() {
    let catalogue = Catalogue::standard().unwrap();
    let scripted = Arc::new(ScriptedInvoker::new());
    let engine = Engine::new(Arc::new(SessionMemoryInvoker::new(
        scripted.clone(),
        Arc::new(InMemorySessionStore::new()),
    )));
    let pattern = catalogue.get("memory").unwrap();

    engine
        .run_with(&pattern.orchestration, "Secret plan A.", RunOptions::new().with_session("a"))
        .collect_events()
        .await;
    engine
        .run_with(&pattern.orchestration, "Anything?", RunOptions::new().with_session("b"))
        .collect_events()
        .await;

    let inputs = scripted.inputs_for("Strategic_Memory_Agent");
    assert!(!inputs[1].contains("Secret plan A."));
}
