//! # Conductor Engine
//!
//! Orchestration trees and the engine that runs them.
//!
//! A pattern is a tree of [`Node`]s (`Leaf`, `Sequence`, `Parallel`,
//! `Route`, `Guarded`, `Retry`) validated once into an [`Orchestration`].
//! [`Engine::run`] interprets it against an
//! [`AgentInvoker`](conductor_core::AgentInvoker) and returns a
//! [`ProgressStream`]: status events, then exactly one result.

pub mod context;
pub mod engine;
pub mod node;
pub mod orchestration;
pub mod predicate;
pub mod stream;
pub mod template;
pub mod verdict;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use context::{CancelHandle, ExecutionContext};
pub use engine::{CANCELLED_RESULT, Engine, FAILED_PREFIX, RunOptions, run_pattern};
pub use node::{FailurePolicy, Guarded, Leaf, Merge, Node, NodeKind, Parallel, Retry, Route, Sequence, Transform};
pub use orchestration::{Orchestration, OrchestrationBuilder};
pub use predicate::{FnPredicate, KeywordRouter, Predicate, Tier, TierSelector};
pub use stream::ProgressStream;
pub use template::Template;
pub use verdict::{Decision, KeywordVerdict, Verdict};
