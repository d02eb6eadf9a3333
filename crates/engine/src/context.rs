//! Per-run execution state.
//!
//! One [`ExecutionContext`] is created by each run and dropped when the run
//! ends. Node outputs are keyed by tree path (`0`, `0.1`, `0.1.0`, ...);
//! labels resolve to paths through the orchestration's label table.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

/// Cooperative cancellation flag shared between a run and its caller.
#[derive(Debug, Clone, Default)]
pub struct CancelHandle(Arc<AtomicBool>);

impl CancelHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask the run to stop at its next checkpoint.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// State owned by a single run.
#[derive(Debug)]
pub struct ExecutionContext {
    run_id: Uuid,
    query: String,
    session_key: Option<String>,
    outputs: Mutex<HashMap<String, String>>,
    labels: Arc<HashMap<String, String>>,
    cancel: CancelHandle,
}

impl ExecutionContext {
    pub fn new(
        query: impl Into<String>,
        session_key: Option<String>,
        labels: Arc<HashMap<String, String>>,
        cancel: CancelHandle,
    ) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            query: query.into(),
            session_key,
            outputs: Mutex::new(HashMap::new()),
            labels,
            cancel,
        }
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn session_key(&self) -> Option<&str> {
        self.session_key.as_deref()
    }

    pub fn cancel_handle(&self) -> &CancelHandle {
        &self.cancel
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Store the latest output of the node at `path`.
    pub fn record(&self, path: &str, output: &str) {
        // A poisoned map only means another branch panicked mid-insert.
        let mut outputs = self.outputs.lock().unwrap_or_else(|e| e.into_inner());
        outputs.insert(path.to_string(), output.to_string());
    }

    pub fn output_of(&self, path: &str) -> Option<String> {
        let outputs = self.outputs.lock().unwrap_or_else(|e| e.into_inner());
        outputs.get(path).cloned()
    }

    pub fn output_labeled(&self, label: &str) -> Option<String> {
        self.labels.get(label).and_then(|path| self.output_of(path))
    }

    /// Forget every output at `prefix` or below it.
    pub fn redact(&self, prefix: &str) {
        let nested = format!("{prefix}.");
        let mut outputs = self.outputs.lock().unwrap_or_else(|e| e.into_inner());
        outputs.retain(|path, _| path != prefix && !path.starts_with(&nested));
    }

    /// Number of outputs currently recorded.
    pub fn recorded(&self) -> usize {
        let outputs = self.outputs.lock().unwrap_or_else(|e| e.into_inner());
        outputs.len()
    }
}
