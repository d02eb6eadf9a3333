//! Session memory implementations for Conductor.

pub mod file_backend;
pub mod in_memory;
pub mod recall;

pub use file_backend::FileSessionStore;
pub use in_memory::InMemorySessionStore;
pub use recall::SessionMemoryInvoker;
