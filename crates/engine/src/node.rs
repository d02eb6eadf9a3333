//! Orchestration nodes.
//!
//! A tree of [`Node`]s describes one pattern: which agents run, in what
//! order, and how their outputs combine. Trees are plain owned data built
//! once and never mutated; [`crate::Orchestration`] validates and shares them.
//!
//! ```text
//! Sequence ─┬─ Leaf (System_Architect)
//!           └─ Leaf (Security_Officer)
//!
//! Guarded ──┬─ primary: Leaf (StrategyAnalyst)
//!           └─ auditor: Leaf (ComplianceShield)
//! ```

use conductor_core::agent::AgentIdentity;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::predicate::Predicate;
use crate::template::{ERROR, Template};
use crate::verdict::Verdict;

/// One unit of work in an orchestration tree.
pub struct Node {
    pub(crate) kind: NodeKind,
    pub(crate) label: Option<String>,
    pub(crate) announce: Vec<String>,
    pub(crate) conclude: Vec<String>,
}

/// The node variants.
pub enum NodeKind {
    Leaf(Leaf),
    Sequence(Sequence),
    Parallel(Parallel),
    Route(Route),
    Guarded(Guarded),
    Retry(Retry),
}

impl NodeKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Leaf(_) => "leaf",
            Self::Sequence(_) => "sequence",
            Self::Parallel(_) => "parallel",
            Self::Route(_) => "route",
            Self::Guarded(_) => "guarded",
            Self::Retry(_) => "retry",
        }
    }
}

impl Node {
    fn from_kind(kind: NodeKind) -> Self {
        Self {
            kind,
            label: None,
            announce: Vec::new(),
            conclude: Vec::new(),
        }
    }

    /// A single agent call with the node input as its prompt.
    pub fn leaf(agent: Arc<AgentIdentity>) -> Self {
        Leaf::new(agent).into()
    }

    /// A single agent call whose prompt is rendered from `prompt`.
    pub fn prompted(agent: Arc<AgentIdentity>, prompt: impl Into<Template>) -> Self {
        Leaf::new(agent).with_prompt(prompt).into()
    }

    pub fn sequence(children: Vec<Node>) -> Self {
        Sequence::new(children).into()
    }

    pub fn parallel(children: Vec<Node>, merge: Merge) -> Self {
        Parallel::new(children, merge).into()
    }

    pub fn route(predicate: impl Predicate + 'static, children: Vec<Node>) -> Self {
        Route::new(predicate, children).into()
    }

    pub fn guarded(
        primary: Node,
        auditor: Node,
        verdict: impl Verdict + 'static,
        block_notice: impl Into<Template>,
    ) -> Self {
        Guarded::new(primary, auditor, verdict, block_notice).into()
    }

    pub fn retry(child: Node, attempts: u32, backoff: Duration) -> Self {
        Retry::new(child, attempts).with_backoff(backoff).into()
    }

    /// Name this node's output for templates and the execution context.
    pub fn labeled(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Emit a status when this node starts. May be called repeatedly.
    pub fn announce(mut self, text: impl Into<String>) -> Self {
        self.announce.push(text.into());
        self
    }

    /// Emit a status when this node succeeds. May be called repeatedly.
    pub fn conclude(mut self, text: impl Into<String>) -> Self {
        self.conclude.push(text.into());
        self
    }

    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("Node");
        s.field("kind", &self.kind.name());
        if let Some(label) = &self.label {
            s.field("label", label);
        }
        match &self.kind {
            NodeKind::Leaf(leaf) => s.field("agent", &leaf.agent.name),
            NodeKind::Sequence(seq) => s.field("children", &seq.children),
            NodeKind::Parallel(par) => s.field("children", &par.children),
            NodeKind::Route(route) => s.field("children", &route.children),
            NodeKind::Guarded(g) => s.field("primary", &g.primary).field("auditor", &g.auditor),
            NodeKind::Retry(r) => s.field("attempts", &r.attempts).field("child", &r.child),
        };
        s.finish()
    }
}

// --- Variants ---

pub struct Leaf {
    pub(crate) agent: Arc<AgentIdentity>,
    pub(crate) prompt: Option<Template>,
}

impl Leaf {
    pub fn new(agent: Arc<AgentIdentity>) -> Self {
        Self {
            agent,
            prompt: None,
        }
    }

    pub fn with_prompt(mut self, prompt: impl Into<Template>) -> Self {
        self.prompt = Some(prompt.into());
        self
    }

    pub fn agent(&self) -> &Arc<AgentIdentity> {
        &self.agent
    }
}

pub struct Sequence {
    pub(crate) children: Vec<Node>,
    pub(crate) transform: Transform,
    pub(crate) policy: Option<FailurePolicy>,
    pub(crate) collect: Option<Merge>,
}

impl Sequence {
    pub fn new(children: Vec<Node>) -> Self {
        Self {
            children,
            transform: Transform::Identity,
            policy: None,
            collect: None,
        }
    }

    /// How each child's output becomes the next child's input.
    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.transform = transform;
        self
    }

    /// Override the engine's default failure policy.
    pub fn with_policy(mut self, policy: FailurePolicy) -> Self {
        self.policy = Some(policy);
        self
    }

    /// Merge every child's output instead of returning the last one.
    pub fn with_collect(mut self, merge: Merge) -> Self {
        self.collect = Some(merge);
        self
    }
}

pub struct Parallel {
    pub(crate) children: Vec<Node>,
    pub(crate) merge: Merge,
    pub(crate) policy: Option<FailurePolicy>,
}

impl Parallel {
    pub fn new(children: Vec<Node>, merge: Merge) -> Self {
        Self {
            children,
            merge,
            policy: None,
        }
    }

    /// Override the engine's default failure policy.
    pub fn with_policy(mut self, policy: FailurePolicy) -> Self {
        self.policy = Some(policy);
        self
    }
}

pub struct Route {
    pub(crate) predicate: Box<dyn Predicate>,
    pub(crate) children: Vec<Node>,
}

impl Route {
    pub fn new(predicate: impl Predicate + 'static, children: Vec<Node>) -> Self {
        Self {
            predicate: Box::new(predicate),
            children,
        }
    }
}

pub struct Guarded {
    pub(crate) primary: Box<Node>,
    pub(crate) auditor: Box<Node>,
    pub(crate) verdict: Box<dyn Verdict>,
    pub(crate) block_notice: Template,
    pub(crate) on_approved: Vec<String>,
    pub(crate) on_blocked: Vec<String>,
}

impl Guarded {
    /// `auditor` receives the primary's output as its input. `block_notice`
    /// may reference only `{reason}` and `{query}`.
    pub fn new(
        primary: Node,
        auditor: Node,
        verdict: impl Verdict + 'static,
        block_notice: impl Into<Template>,
    ) -> Self {
        Self {
            primary: Box::new(primary),
            auditor: Box::new(auditor),
            verdict: Box::new(verdict),
            block_notice: block_notice.into(),
            on_approved: Vec::new(),
            on_blocked: Vec::new(),
        }
    }

    /// Status emitted when the audit approves.
    pub fn on_approved(mut self, text: impl Into<String>) -> Self {
        self.on_approved.push(text.into());
        self
    }

    /// Status emitted when the audit rejects.
    pub fn on_blocked(mut self, text: impl Into<String>) -> Self {
        self.on_blocked.push(text.into());
        self
    }
}

pub struct Retry {
    pub(crate) child: Box<Node>,
    pub(crate) attempts: u32,
    pub(crate) backoff: Duration,
}

impl Retry {
    pub fn new(child: Node, attempts: u32) -> Self {
        Self {
            child: Box::new(child),
            attempts,
            backoff: Duration::ZERO,
        }
    }

    /// Pause between attempts.
    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }
}

macro_rules! into_node {
    ($($variant:ident),*) => {
        $(
            impl From<$variant> for Node {
                fn from(value: $variant) -> Self {
                    Node::from_kind(NodeKind::$variant(value))
                }
            }
        )*
    };
}

into_node!(Leaf, Sequence, Parallel, Route, Guarded, Retry);

// --- Combinators ---

/// Maps one Sequence child's output to the next child's input.
#[derive(Clone, Default)]
pub enum Transform {
    /// Pass the output through unchanged.
    #[default]
    Identity,
    /// Render a template; `{input}` is the previous output.
    Template(Template),
    /// Arbitrary pure function.
    Custom(Arc<dyn Fn(&str) -> String + Send + Sync>),
}

impl Transform {
    pub fn template(template: impl Into<Template>) -> Self {
        Self::Template(template.into())
    }

    pub fn custom(f: impl Fn(&str) -> String + Send + Sync + 'static) -> Self {
        Self::Custom(Arc::new(f))
    }
}

impl fmt::Debug for Transform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Identity => f.write_str("Identity"),
            Self::Template(t) => f.debug_tuple("Template").field(t).finish(),
            Self::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

/// Combines several outputs, in declared order, into one.
#[derive(Clone)]
pub enum Merge {
    /// Join with a separator.
    Concat { separator: String },
    /// One heading per output, each followed by that output.
    Sections { headings: Vec<String> },
    /// Arbitrary pure function.
    Custom(Arc<dyn Fn(&[String]) -> String + Send + Sync>),
}

impl Merge {
    pub fn concat(separator: impl Into<String>) -> Self {
        Self::Concat {
            separator: separator.into(),
        }
    }

    pub fn sections<I, S>(headings: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Sections {
            headings: headings.into_iter().map(Into::into).collect(),
        }
    }

    pub fn custom(f: impl Fn(&[String]) -> String + Send + Sync + 'static) -> Self {
        Self::Custom(Arc::new(f))
    }

    pub fn apply(&self, outputs: &[String]) -> String {
        match self {
            Self::Concat { separator } => outputs.join(separator),
            Self::Sections { headings } => headings
                .iter()
                .zip(outputs)
                .map(|(heading, output)| format!("{heading}\n{output}"))
                .collect::<Vec<_>>()
                .join("\n\n"),
            Self::Custom(f) => f(outputs),
        }
    }
}

impl Default for Merge {
    fn default() -> Self {
        Self::concat("\n\n")
    }
}

impl fmt::Debug for Merge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Concat { separator } => f.debug_struct("Concat").field("separator", separator).finish(),
            Self::Sections { headings } => f.debug_struct("Sections").field("headings", headings).finish(),
            Self::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

/// What a Sequence or Parallel does when a child fails.
#[derive(Debug, Clone, Default)]
pub enum FailurePolicy {
    /// Abort the node.
    #[default]
    FailFast,
    /// Substitute the placeholder (`{error}` is the failure) and keep going.
    Continue { placeholder: Template },
}

impl FailurePolicy {
    pub fn continue_with(placeholder: impl Into<Template>) -> Self {
        Self::Continue {
            placeholder: placeholder.into(),
        }
    }

    pub(crate) fn from_config(config: &conductor_config::EngineConfig) -> Self {
        match config.failure_policy {
            conductor_config::FailurePolicyKind::FailFast => Self::FailFast,
            conductor_config::FailurePolicyKind::Continue => {
                Self::continue_with(config.continue_placeholder.as_str())
            }
        }
    }

    pub(crate) fn placeholder_for(placeholder: &Template, error: &str) -> String {
        placeholder.render(|name| (name == ERROR).then(|| error.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::predicate::KeywordRouter;
    use crate::verdict::KeywordVerdict;

    fn agent(name: &str) -> Arc<AgentIdentity> {
        Arc::new(AgentIdentity::new(name, "instruction"))
    }

    #[test]
    fn builders_set_metadata() {
        let node = Node::leaf(agent("Planner"))
            .labeled("plan")
            .announce("Step 1")
            .announce("Step 2")
            .conclude("Done");
        assert_eq!(node.label(), Some("plan"));
        assert_eq!(node.announce, vec!["Step 1", "Step 2"]);
        assert_eq!(node.conclude, vec!["Done"]);
        assert_eq!(node.kind().name(), "leaf");
    }

    #[test]
    fn typed_builders_convert_into_nodes() {
        let seq: Node = Sequence::new(vec![Node::leaf(agent("A")), Node::leaf(agent("B"))])
            .with_transform(Transform::template("Review: {input}"))
            .with_policy(FailurePolicy::continue_with("[skipped: {error}]"))
            .into();
        assert_eq!(seq.kind().name(), "sequence");

        let route = Node::route(
            KeywordRouter::new(1).rule(["security"], 0),
            vec![Node::leaf(agent("Sec")), Node::leaf(agent("Fin"))],
        );
        assert_eq!(route.kind().name(), "route");

        let guarded = Node::guarded(
            Node::leaf(agent("Analyst")),
            Node::leaf(agent("Auditor")),
            KeywordVerdict::default(),
            "Blocked: {reason}",
        );
        let debug = format!("{guarded:?}");
        assert!(debug.contains("Analyst"));
        assert!(debug.contains("Auditor"));
    }

    #[test]
    fn concat_and_sections_merge_in_order() {
        let outputs = vec!["R".to_string(), "G".to_string()];
        assert_eq!(Merge::concat(" | ").apply(&outputs), "R | G");
        assert_eq!(
            Merge::sections(["### Risk", "### Growth"]).apply(&outputs),
            "### Risk\nR\n\n### Growth\nG"
        );
        assert_eq!(Merge::default().apply(&outputs), "R\n\nG");
        let counted = Merge::custom(|outs| format!("{} outputs", outs.len()));
        assert_eq!(counted.apply(&outputs), "2 outputs");
    }

    #[test]
    fn placeholder_renders_error() {
        let FailurePolicy::Continue { placeholder } = FailurePolicy::continue_with("[unavailable: {error}]")
        else {
            panic!("expected continue policy");
        };
        assert_eq!(
            FailurePolicy::placeholder_for(&placeholder, "timed out"),
            "[unavailable: timed out]"
        );
    }

    #[test]
    fn policy_from_config() {
        let mut config = conductor_config::EngineConfig::default();
        assert!(matches!(FailurePolicy::from_config(&config), FailurePolicy::FailFast));
        config.failure_policy = conductor_config::FailurePolicyKind::Continue;
        assert!(matches!(
            FailurePolicy::from_config(&config),
            FailurePolicy::Continue { .. }
        ));
    }
}
