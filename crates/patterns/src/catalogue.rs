//! Pattern catalogue with lookup by number or key.

use conductor_config::AppConfig;
use conductor_core::error::ConfigurationError;
use conductor_engine::Orchestration;
use serde::Serialize;

use crate::definitions;

/// One runnable pattern.
#[derive(Debug, Clone)]
pub struct Pattern {
    /// Position in the catalogue, 1-based
    pub number: u8,
    /// Stable lookup key, e.g. "guardrails"
    pub key: &'static str,
    /// Display title
    pub title: &'static str,
    pub orchestration: Orchestration,
    /// Session key used when the caller doesn't supply one
    pub session: Option<&'static str>,
}

impl Pattern {
    pub fn summary(&self) -> PatternSummary {
        PatternSummary {
            number: self.number,
            key: self.key,
            title: self.title,
        }
    }
}

/// Serializable listing entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PatternSummary {
    pub number: u8,
    pub key: &'static str,
    pub title: &'static str,
}

/// All patterns, in order.
#[derive(Debug, Clone)]
pub struct Catalogue {
    patterns: Vec<Pattern>,
}

impl Catalogue {
    /// Build the catalogue with routing keywords, premium backend and depth
    /// limit taken from `config`.
    pub fn build(config: &AppConfig) -> Result<Self, ConfigurationError> {
        let patterns = definitions::all(config)?;
        tracing::debug!(patterns = patterns.len(), "Catalogue built");
        Ok(Self { patterns })
    }

    /// The catalogue with default configuration.
    pub fn standard() -> Result<Self, ConfigurationError> {
        Self::build(&AppConfig::default())
    }

    /// Find a pattern by number (`2`, `02`) or key (`routing`,
    /// `resource-aware`, `pattern_16`).
    pub fn get(&self, selector: &str) -> Option<&Pattern> {
        let selector = selector.trim().to_lowercase().replace('-', "_");
        let bare = selector.strip_prefix("pattern_").unwrap_or(&selector);

        if let Ok(number) = bare.parse::<u8>() {
            return self.patterns.iter().find(|p| p.number == number);
        }
        self.patterns.iter().find(|p| p.key == bare)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Pattern> {
        self.patterns.iter()
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    pub fn summaries(&self) -> Vec<PatternSummary> {
        self.patterns.iter().map(Pattern::summary).collect()
    }
}

impl<'a> IntoIterator for &'a Catalogue {
    type Item = &'a Pattern;
    type IntoIter = std::slice::Iter<'a, Pattern>;

    fn into_iter(self) -> Self::IntoIter {
        self.patterns.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use conductor_core::agent::Backend;
    use conductor_core::error::InvocationError;
    use conductor_core::invoker::{AgentInvoker, InvokeRequest};
    use conductor_engine::Engine;
    use conductor_providers::OfflineInvoker;
    use std::collections::HashSet;
    use std::sync::Arc;

    #[test]
    fn has_all_twenty_one_patterns_in_order() {
        let catalogue = Catalogue::standard().unwrap();
        assert_eq!(catalogue.len(), 21);
        let numbers: Vec<u8> = catalogue.iter().map(|p| p.number).collect();
        assert_eq!(numbers, (1..=21).collect::<Vec<u8>>());

        let keys: HashSet<&str> = catalogue.iter().map(|p| p.key).collect();
        assert_eq!(keys.len(), 21);
    }

    #[test]
    fn lookup_by_number_and_key() {
        let catalogue = Catalogue::standard().unwrap();
        assert_eq!(catalogue.get("2").unwrap().key, "routing");
        assert_eq!(catalogue.get("02").unwrap().key, "routing");
        assert_eq!(catalogue.get("pattern_18").unwrap().key, "guardrails");
        assert_eq!(catalogue.get("Resource-Aware").unwrap().number, 16);
        assert_eq!(catalogue.get(" hitl ").unwrap().number, 13);
        assert!(catalogue.get("22").is_none());
        assert!(catalogue.get("teleport").is_none());
    }

    #[test]
    fn memory_pattern_has_default_session() {
        let catalogue = Catalogue::standard().unwrap();
        assert_eq!(
            catalogue.get("memory").unwrap().session,
            Some(definitions::MEMORY_SESSION)
        );
        assert!(catalogue.get("routing").unwrap().session.is_none());
    }

    #[test]
    fn node_shapes_match_their_patterns() {
        let catalogue = Catalogue::standard().unwrap();
        let kind = |key: &str| catalogue.get(key).unwrap().orchestration.root().kind().name();
        assert_eq!(kind("routing"), "route");
        assert_eq!(kind("parallel"), "parallel");
        assert_eq!(kind("multi_agent"), "sequence");
        assert_eq!(kind("exception"), "retry");
        assert_eq!(kind("guardrails"), "guarded");
        assert_eq!(kind("a2a"), "guarded");
        assert_eq!(kind("resource_aware"), "route");
        assert_eq!(kind("planning"), "leaf");
    }

    /// Records which backend each call asked for.
    #[derive(Default)]
    struct BackendRecorder {
        seen: std::sync::Mutex<Vec<(String, Backend)>>,
    }

    #[async_trait::async_trait]
    impl AgentInvoker for BackendRecorder {
        fn name(&self) -> &str {
            "recorder"
        }

        async fn invoke(&self, request: InvokeRequest) -> Result<String, InvocationError> {
            self.seen
                .lock()
                .unwrap()
                .push((request.agent.name.clone(), request.agent.backend.clone()));
            Ok("ok".into())
        }
    }

    #[tokio::test]
    async fn premium_agent_uses_configured_backend() {
        let mut config = AppConfig::default();
        config.routing.premium_backend = "gemini".into();
        let catalogue = Catalogue::build(&config).unwrap();
        let recorder = Arc::new(BackendRecorder::default());
        let engine = Engine::new(recorder.clone());

        let pattern = catalogue.get("resource_aware").unwrap();
        engine
            .run(&pattern.orchestration, "Analyze our security budget")
            .collect_events()
            .await;
        engine
            .run(&pattern.orchestration, "Reset my password")
            .collect_events()
            .await;

        let seen = recorder.seen.lock().unwrap().clone();
        assert_eq!(
            seen,
            vec![
                ("DeepReasoningEngine".to_string(), Backend::named("gemini")),
                ("FastResponder".to_string(), Backend::Default),
            ]
        );
    }

    #[test]
    fn summaries_serialize() {
        let catalogue = Catalogue::standard().unwrap();
        let json = serde_json::to_string(&catalogue.summaries()[0]).unwrap();
        assert!(json.contains(r#""key":"chaining""#));
    }

    #[tokio::test]
    async fn routing_pattern_picks_security_division() {
        let catalogue = Catalogue::standard().unwrap();
        let engine = Engine::new(Arc::new(OfflineInvoker::new()));
        let pattern = catalogue.get("routing").unwrap();

        let events = engine
            .run(&pattern.orchestration, "What are the risks of outdated SSL certs?")
            .collect_events()
            .await;
        let result = events.last().unwrap().text();
        assert!(result.starts_with("### 🗺️ Routed Specialist Response (Cyber Security Division)"));
        assert!(result.contains("[Security_Specialist]"));
    }

    #[tokio::test]
    async fn resource_aware_pattern_tiers_queries() {
        let catalogue = Catalogue::standard().unwrap();
        let engine = Engine::new(Arc::new(OfflineInvoker::new()));
        let pattern = catalogue.get("resource_aware").unwrap();

        let events = engine
            .run(&pattern.orchestration, "What is the current time?")
            .collect_events()
            .await;
        assert!(events.last().unwrap().text().contains("LOCAL EDGE"));

        let events = engine
            .run(&pattern.orchestration, "Draft a 3-year cloud roadmap")
            .collect_events()
            .await;
        let result = events.last().unwrap().text();
        assert!(result.contains("PREMIUM CLOUD"));
        assert!(result.contains("[DeepReasoningEngine]"));
    }
}
