//! Agent identity types.
//!
//! An [`AgentIdentity`] is configuration: built once, wrapped in an `Arc`,
//! and shared by every orchestration node that calls the same agent.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Which backend should serve an agent's calls.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "name")]
pub enum Backend {
    /// Whatever the invoker treats as its default backend
    #[default]
    Default,
    /// A backend registered under this name (e.g. "premium")
    Named(String),
}

impl Backend {
    pub fn named(name: impl Into<String>) -> Self {
        Self::Named(name.into())
    }

    /// The registered name, if any.
    pub fn name(&self) -> Option<&str> {
        match self {
            Self::Default => None,
            Self::Named(name) => Some(name),
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Default => f.write_str("default"),
            Self::Named(name) => f.write_str(name),
        }
    }
}

/// A tool the backend may expose to the model on this agent's behalf.
///
/// The orchestration core never executes capabilities.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capability {
    pub name: String,
    pub description: String,
}

impl Capability {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
        }
    }
}

/// An opaque reference to one agent: who it is and how it should behave.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentIdentity {
    /// Agent name, e.g. "Security_Specialist"
    pub name: String,

    /// System instruction handed to the backend
    pub instruction: String,

    /// Backend selector
    #[serde(default)]
    pub backend: Backend,

    /// Tools the backend may expose
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub capabilities: Vec<Capability>,
}

impl AgentIdentity {
    pub fn new(name: impl Into<String>, instruction: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            instruction: instruction.into(),
            backend: Backend::Default,
            capabilities: Vec::new(),
        }
    }

    /// Route this agent's calls to a named backend.
    pub fn with_backend(mut self, backend: impl Into<String>) -> Self {
        self.backend = Backend::Named(backend.into());
        self
    }

    /// Attach a capability.
    pub fn with_capability(
        mut self,
        name: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        self.capabilities.push(Capability::new(name, description));
        self
    }
}
