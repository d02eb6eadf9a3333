//! # Conductor Core
//!
//! Domain types, traits, and error definitions for the Conductor agent
//! orchestration engine. This crate has **no runtime dependencies**: it
//! defines the vocabulary every other crate implements against.
//!
//! ## Design Philosophy
//!
//! Every external collaborator is a trait here:
//! - [`AgentInvoker`]: turns an agent identity plus input text into output text
//! - [`SessionStore`]: keeps cross-call memory keyed by a caller session key
//!
//! Implementations live in `conductor-providers` and `conductor-memory`, which
//! keeps the orchestration engine testable with scripted mocks.

pub mod agent;
pub mod error;
pub mod event;
pub mod invoker;
pub mod session;

// Re-export key types at crate root for ergonomics
pub use agent::{AgentIdentity, Backend, Capability};
pub use error::{ConfigurationError, Error, InvocationError, Result, SessionError};
pub use event::ProgressEvent;
pub use invoker::{AgentInvoker, InvokeRequest};
pub use session::{SessionStore, SessionTurn};
