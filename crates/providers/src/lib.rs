//! Agent backend implementations for Conductor.
//!
//! All backends implement the `conductor_core::AgentInvoker` trait.
//! The router selects the correct backend based on each agent's identity.

pub mod fallback;
pub mod offline;
pub mod openai_compat;
pub mod router;

pub use fallback::FallbackInvoker;
pub use offline::OfflineInvoker;
pub use openai_compat::OpenAiCompatInvoker;
pub use router::{BackendRouter, build_from_config};
