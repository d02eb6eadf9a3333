//! # Conductor Patterns
//!
//! The catalogue of 21 CIO advisory patterns, each expressed as a validated
//! [`Orchestration`](conductor_engine::Orchestration), plus a validator
//! that runs the whole catalogue and checks every progress stream.

pub mod catalogue;
pub mod definitions;
pub mod offline;
pub mod validator;

pub use catalogue::{Catalogue, Pattern, PatternSummary};
pub use definitions::MEMORY_SESSION;
pub use offline::offline_invoker;
pub use validator::{DEFAULT_QUERY, PatternCheck, ValidationReport, inspect, validate};
