//! Validated, shareable orchestration trees.
//!
//! [`Orchestration::build`] walks the tree once and rejects anything the
//! engine could not run cleanly: empty fan-outs, unreachable routes, bad
//! labels, templates that reference slots out of scope. After a successful
//! build the tree is frozen behind an `Arc`.

use conductor_core::error::ConfigurationError;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::node::{Merge, Node, NodeKind, Transform};
use crate::template::{self, Template};

/// Default depth limit when none is configured.
pub const DEFAULT_MAX_DEPTH: usize = 16;

pub(crate) const ROOT_PATH: &str = "0";

pub(crate) fn child_path(parent: &str, index: usize) -> String {
    format!("{parent}.{index}")
}

/// True when `path` lies strictly below `ancestor`.
pub(crate) fn is_within(path: &str, ancestor: &str) -> bool {
    path.strip_prefix(ancestor)
        .is_some_and(|rest| rest.starts_with('.'))
}

fn common_ancestor(a: &str, b: &str) -> String {
    a.split('.')
        .zip(b.split('.'))
        .take_while(|(x, y)| x == y)
        .map(|(x, _)| x)
        .collect::<Vec<_>>()
        .join(".")
}

/// A named, validated tree plus its report template.
#[derive(Debug, Clone)]
pub struct Orchestration {
    name: String,
    root: Arc<Node>,
    report: Option<Template>,
    labels: Arc<HashMap<String, String>>,
    gates: Arc<Vec<String>>,
}

impl Orchestration {
    /// Validate `root` with default limits and no report template.
    pub fn build(name: impl Into<String>, root: Node) -> Result<Self, ConfigurationError> {
        Self::builder(name, root).build()
    }

    pub fn builder(name: impl Into<String>, root: Node) -> OrchestrationBuilder {
        OrchestrationBuilder {
            name: name.into(),
            root,
            report: None,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn root(&self) -> &Node {
        &self.root
    }

    pub fn report(&self) -> Option<&Template> {
        self.report.as_ref()
    }

    /// Label → tree path.
    pub fn labels(&self) -> &Arc<HashMap<String, String>> {
        &self.labels
    }

    /// Paths of every `Guarded` node.
    pub(crate) fn gates(&self) -> &Arc<Vec<String>> {
        &self.gates
    }
}

pub struct OrchestrationBuilder {
    name: String,
    root: Node,
    report: Option<Template>,
    max_depth: usize,
}

impl OrchestrationBuilder {
    /// Final formatting; may use `{output}`, `{query}` and labels.
    pub fn with_report(mut self, report: impl Into<Template>) -> Self {
        self.report = Some(report.into());
        self
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn build(self) -> Result<Orchestration, ConfigurationError> {
        let mut labels = HashMap::new();
        collect_labels(&self.root, ROOT_PATH, 1, self.max_depth, &mut labels)?;

        let mut gates = Vec::new();
        let mut fan_outs = HashSet::new();
        collect_gates(&self.root, ROOT_PATH, &mut gates, &mut fan_outs);

        let checker = Checker {
            labels: &labels,
            gates: &gates,
            fan_outs: &fan_outs,
        };
        checker.node(&self.root, ROOT_PATH)?;
        if let Some(report) = &self.report {
            checker.template(report, "report", Scope::Report)?;
        }

        tracing::debug!(
            orchestration = %self.name,
            labels = labels.len(),
            "Orchestration validated"
        );

        Ok(Orchestration {
            name: self.name,
            root: Arc::new(self.root),
            report: self.report,
            labels: Arc::new(labels),
            gates: Arc::new(gates),
        })
    }
}

/// Direct children in path order.
pub(crate) fn children(node: &Node) -> Vec<&Node> {
    match &node.kind {
        NodeKind::Leaf(_) => Vec::new(),
        NodeKind::Sequence(seq) => seq.children.iter().collect(),
        NodeKind::Parallel(par) => par.children.iter().collect(),
        NodeKind::Route(route) => route.children.iter().collect(),
        NodeKind::Guarded(g) => vec![g.primary.as_ref(), g.auditor.as_ref()],
        NodeKind::Retry(r) => vec![r.child.as_ref()],
    }
}

fn collect_labels(
    node: &Node,
    path: &str,
    depth: usize,
    max_depth: usize,
    labels: &mut HashMap<String, String>,
) -> Result<(), ConfigurationError> {
    if depth > max_depth {
        return Err(ConfigurationError::TooDeep {
            path: path.to_string(),
            max_depth,
        });
    }

    if let Some(label) = &node.label {
        if !template::is_identifier(label) || template::RESERVED.contains(&label.as_str()) {
            return Err(ConfigurationError::InvalidLabel {
                path: path.to_string(),
                label: label.clone(),
            });
        }
        if let Some(first) = labels.get(label) {
            return Err(ConfigurationError::DuplicateLabel {
                label: label.clone(),
                first: first.clone(),
                second: path.to_string(),
            });
        }
        labels.insert(label.clone(), path.to_string());
    }

    for (i, child) in children(node).into_iter().enumerate() {
        collect_labels(child, &child_path(path, i), depth + 1, max_depth, labels)?;
    }
    Ok(())
}

/// Record the paths of `Guarded` and `Parallel` nodes.
fn collect_gates(node: &Node, path: &str, gates: &mut Vec<String>, fan_outs: &mut HashSet<String>) {
    match &node.kind {
        NodeKind::Guarded(_) => gates.push(path.to_string()),
        NodeKind::Parallel(_) => {
            fan_outs.insert(path.to_string());
        }
        _ => {}
    }
    for (i, child) in children(node).into_iter().enumerate() {
        collect_gates(child, &child_path(path, i), gates, fan_outs);
    }
}

/// Which slots a template may use.
#[derive(Debug, Clone, Copy)]
enum Scope {
    /// Leaf prompts and sequence transforms: input, query, labels.
    Node,
    /// Guarded block notices: reason, query.
    Notice,
    /// Orchestration report: output, query, labels.
    Report,
    /// Failure placeholders: error.
    Placeholder,
}

impl Scope {
    fn allows(self, slot: &str) -> bool {
        match self {
            Self::Node => slot == template::INPUT || slot == template::QUERY,
            Self::Notice => slot == template::REASON || slot == template::QUERY,
            Self::Report => slot == template::OUTPUT || slot == template::QUERY,
            Self::Placeholder => slot == template::ERROR,
        }
    }

    fn allows_labels(self) -> bool {
        matches!(self, Self::Node | Self::Report)
    }
}

struct Checker<'a> {
    labels: &'a HashMap<String, String>,
    gates: &'a [String],
    fan_outs: &'a HashSet<String>,
}

impl Checker<'_> {
    fn node(&self, node: &Node, path: &str) -> Result<(), ConfigurationError> {
        match &node.kind {
            NodeKind::Leaf(leaf) => {
                if let Some(prompt) = &leaf.prompt {
                    self.template(prompt, path, Scope::Node)?;
                }
            }
            NodeKind::Sequence(seq) => {
                self.non_empty("sequence", seq.children.len(), path)?;
                if let Transform::Template(t) = &seq.transform {
                    self.template(t, path, Scope::Node)?;
                }
                if let Some(policy) = &seq.policy {
                    self.policy(policy, path)?;
                }
                if let Some(merge) = &seq.collect {
                    self.merge(merge, seq.children.len(), path)?;
                }
            }
            NodeKind::Parallel(par) => {
                self.non_empty("parallel", par.children.len(), path)?;
                if let Some(policy) = &par.policy {
                    self.policy(policy, path)?;
                }
                self.merge(&par.merge, par.children.len(), path)?;
            }
            NodeKind::Route(route) => {
                self.non_empty("route", route.children.len(), path)?;
                let targets = route.predicate.targets();
                if targets > route.children.len() {
                    return Err(ConfigurationError::RouteOutOfRange {
                        path: path.to_string(),
                        max_index: targets - 1,
                        children: route.children.len(),
                    });
                }
            }
            NodeKind::Guarded(g) => {
                self.template(&g.block_notice, path, Scope::Notice)?;
            }
            NodeKind::Retry(r) => {
                if r.attempts == 0 {
                    return Err(ConfigurationError::ZeroAttempts {
                        path: path.to_string(),
                    });
                }
            }
        }

        for (i, child) in children(node).into_iter().enumerate() {
            self.node(child, &child_path(path, i))?;
        }
        Ok(())
    }

    /// Output under a `Guarded` node is unreleased until its audit passes.
    /// A reader in a concurrent `Parallel` branch could see it before the
    /// verdict, so only readers inside the gate or ordered after it may use it.
    fn released(&self, label_path: &str, reader: &str) -> bool {
        self.gates.iter().all(|gate| {
            let gated = label_path == gate || is_within(label_path, gate);
            !gated || is_within(reader, gate) || !self.fan_outs.contains(&common_ancestor(reader, gate))
        })
    }

    fn non_empty(&self, node: &'static str, len: usize, path: &str) -> Result<(), ConfigurationError> {
        if len == 0 {
            return Err(ConfigurationError::EmptyChildren {
                node,
                path: path.to_string(),
            });
        }
        Ok(())
    }

    fn merge(&self, merge: &Merge, children: usize, path: &str) -> Result<(), ConfigurationError> {
        match merge {
            Merge::Sections { headings } if headings.len() != children => {
                Err(ConfigurationError::MergeArity {
                    path: path.to_string(),
                    headings: headings.len(),
                    children,
                })
            }
            _ => Ok(()),
        }
    }

    fn policy(&self, policy: &crate::node::FailurePolicy, path: &str) -> Result<(), ConfigurationError> {
        if let crate::node::FailurePolicy::Continue { placeholder } = policy {
            self.template(placeholder, path, Scope::Placeholder)?;
        }
        Ok(())
    }

    fn template(&self, template: &Template, path: &str, scope: Scope) -> Result<(), ConfigurationError> {
        for slot in template.placeholders() {
            if scope.allows(slot) {
                continue;
            }
            if let Some(label_path) = self.labels.get(slot) {
                if scope.allows_labels() && self.released(label_path, path) {
                    continue;
                }
                return Err(ConfigurationError::RestrictedPlaceholder {
                    path: path.to_string(),
                    placeholder: slot.to_string(),
                });
            }
            if template::RESERVED.contains(&slot) {
                return Err(ConfigurationError::RestrictedPlaceholder {
                    path: path.to_string(),
                    placeholder: slot.to_string(),
                });
            }
            return Err(ConfigurationError::UnknownPlaceholder {
                path: path.to_string(),
                placeholder: slot.to_string(),
            });
        }
        Ok(())
    }
}
