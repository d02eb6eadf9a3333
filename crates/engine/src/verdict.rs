//! Verdicts turn an auditor's text into approve or reject.

/// Outcome of an audit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Approved,
    Rejected { reason: String },
}

impl Decision {
    pub fn rejected(reason: impl Into<String>) -> Self {
        Self::Rejected {
            reason: reason.into(),
        }
    }

    pub fn is_approved(&self) -> bool {
        matches!(self, Self::Approved)
    }
}

/// Judges an auditor's output.
pub trait Verdict: Send + Sync {
    fn judge(&self, audit: &str) -> Decision;
}

impl<F> Verdict for F
where
    F: Fn(&str) -> Decision + Send + Sync,
{
    fn judge(&self, audit: &str) -> Decision {
        self(audit)
    }
}

/// Rejects when the audit contains a marker word (case-insensitive).
///
/// The reason is whatever follows `MARKER:`; without a colon it is the whole
/// trimmed audit text.
#[derive(Debug, Clone)]
pub struct KeywordVerdict {
    marker: String,
}

const DEFAULT_MARKER: &str = "REJECTED";

impl KeywordVerdict {
    /// A blank marker would match every audit, so it falls back to `REJECTED`.
    pub fn new(marker: impl Into<String>) -> Self {
        let marker = marker.into();
        let marker = match marker.trim() {
            "" => DEFAULT_MARKER,
            trimmed => trimmed,
        };
        Self {
            marker: marker.to_ascii_uppercase(),
        }
    }
}

impl Default for KeywordVerdict {
    fn default() -> Self {
        Self::new(DEFAULT_MARKER)
    }
}

impl Verdict for KeywordVerdict {
    fn judge(&self, audit: &str) -> Decision {
        // ASCII upper-casing keeps byte offsets aligned with `audit`
        let upper = audit.to_ascii_uppercase();
        let Some(at) = upper.find(&self.marker) else {
            return Decision::Approved;
        };

        let after = &audit[at + self.marker.len()..];
        let reason = match after.trim_start().strip_prefix(':') {
            Some(reason) if !reason.trim().is_empty() => reason.trim(),
            _ => audit.trim(),
        };
        Decision::rejected(reason)
    }
}
