//! Error types for the Conductor domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error enum; [`Error`] aggregates them.

use thiserror::Error;

/// The top-level error type for all Conductor operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Agent backend errors ---
    #[error("Invocation error: {0}")]
    Invocation(#[from] InvocationError),

    // --- Tree construction errors ---
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    // --- Session memory errors ---
    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // --- Generic ---
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

/// A call to an agent backend failed.
///
/// Raised by [`crate::AgentInvoker`] implementations. The engine never lets
/// one of these escape a run: it is converted into an explanatory result.
#[derive(Debug, Clone, Error)]
pub enum InvocationError {
    #[error("API request failed: {message} (status: {status_code})")]
    Api { status_code: u16, message: String },

    #[error("Rate limited by backend, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Backend not configured: {0}")]
    NotConfigured(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),
}

impl InvocationError {
    /// Whether retrying the same call could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::RateLimited { .. } | Self::Timeout(_) | Self::Network(_)
        ) || matches!(self, Self::Api { status_code, .. } if *status_code >= 500)
    }
}

/// An orchestration tree is invalid.
///
/// Always raised while building an orchestration, before any run starts.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    #[error("{node} at '{path}' has no children")]
    EmptyChildren { node: &'static str, path: String },

    #[error("route at '{path}' can select index {max_index} but only has {children} children")]
    RouteOutOfRange {
        path: String,
        max_index: usize,
        children: usize,
    },

    #[error("merge at '{path}' declares {headings} headings for {children} children")]
    MergeArity {
        path: String,
        headings: usize,
        children: usize,
    },

    #[error("retry at '{path}' must allow at least one attempt")]
    ZeroAttempts { path: String },

    #[error("tree exceeds the maximum depth of {max_depth} at '{path}'")]
    TooDeep { path: String, max_depth: usize },

    #[error("template at '{path}' references unknown placeholder '{{{placeholder}}}'")]
    UnknownPlaceholder { path: String, placeholder: String },

    #[error("template at '{path}' may not reference '{{{placeholder}}}'")]
    RestrictedPlaceholder { path: String, placeholder: String },

    #[error("label '{label}' at '{path}' must be an identifier and not a reserved placeholder")]
    InvalidLabel { path: String, label: String },

    #[error("label '{label}' is used more than once (at '{first}' and '{second}')")]
    DuplicateLabel {
        label: String,
        first: String,
        second: String,
    },
}

/// Session memory could not be read or written.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Serialization failed: {0}")]
    Serialization(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invocation_error_displays_correctly() {
        let err = Error::Invocation(InvocationError::Api {
            status_code: 429,
            message: "Too many requests".into(),
        });
        assert!(err.to_string().contains("429"));
        assert!(err.to_string().contains("Too many requests"));
    }

    #[test]
    fn configuration_error_names_the_path() {
        let err = ConfigurationError::RouteOutOfRange {
            path: "0.2".into(),
            max_index: 3,
            children: 2,
        };
        let text = err.to_string();
        assert!(text.contains("'0.2'"));
        assert!(text.contains("index 3"));
    }

    #[test]
    fn placeholder_error_renders_braces() {
        let err = ConfigurationError::UnknownPlaceholder {
            path: "root".into(),
            placeholder: "draft".into(),
        };
        assert!(err.to_string().contains("'{draft}'"));
    }

    #[test]
    fn transient_classification() {
        assert!(InvocationError::Timeout("slow".into()).is_transient());
        assert!(InvocationError::Network("reset".into()).is_transient());
        assert!(
            InvocationError::Api {
                status_code: 503,
                message: "unavailable".into()
            }
            .is_transient()
        );
        assert!(!InvocationError::AuthenticationFailed("bad key".into()).is_transient());
        assert!(
            !InvocationError::Api {
                status_code: 400,
                message: "bad request".into()
            }
            .is_transient()
        );
    }
}
