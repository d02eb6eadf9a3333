//! Progress events: the observable output of a run.
//!
//! A run yields any number of `Status` events followed by exactly one
//! `Result`. Consumers (the CLI, the validator, a dashboard) use arrival
//! order as their only coordination signal.

use serde::{Deserialize, Serialize};

/// A unit of the progress stream.
///
/// Serialises with a `type` tag so it can be forwarded as JSON lines:
/// - `status`: transient, human-readable progress
/// - `result`: the terminal report, always last
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProgressEvent {
    /// Non-terminal progress notification.
    Status { text: String },

    /// Terminal report. Exactly one per run.
    Result { text: String },
}

impl ProgressEvent {
    pub fn status(text: impl Into<String>) -> Self {
        Self::Status { text: text.into() }
    }

    pub fn result(text: impl Into<String>) -> Self {
        Self::Result { text: text.into() }
    }

    /// Event name for this event type.
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Status { .. } => "status",
            Self::Result { .. } => "result",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Result { .. })
    }

    pub fn text(&self) -> &str {
        match self {
            Self::Status { text } | Self::Result { text } => text,
        }
    }
}
