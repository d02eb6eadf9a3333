//! The execution engine: walks an orchestration tree and streams progress.
//!
//! Each run is a spawned task that interprets the tree against one
//! [`ExecutionContext`] and sends [`ProgressEvent`]s through a bounded
//! channel. Failures never escape as faults: every run ends with exactly
//! one `Result` event describing the report, the block notice, the failure
//! or the cancellation.

use conductor_config::EngineConfig;
use conductor_core::error::InvocationError;
use conductor_core::event::ProgressEvent;
use conductor_core::invoker::{AgentInvoker, InvokeRequest};
use futures::future::{BoxFuture, join_all};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::context::{CancelHandle, ExecutionContext};
use crate::node::{FailurePolicy, Guarded, Leaf, Node, NodeKind, Parallel, Retry, Route, Sequence, Transform};
use crate::orchestration::{Orchestration, ROOT_PATH, child_path, is_within};
use crate::stream::ProgressStream;
use crate::template::{OUTPUT, QUERY, REASON, INPUT, Template};
use crate::verdict::Decision;

/// Default capacity of the progress channel.
pub const DEFAULT_EVENT_BUFFER: usize = 64;

/// Runs orchestrations against an agent invoker.
///
/// Cheap to clone; every run gets its own context and channel.
#[derive(Clone)]
pub struct Engine {
    invoker: Arc<dyn AgentInvoker>,
    default_policy: FailurePolicy,
    event_buffer: usize,
}

impl Engine {
    pub fn new(invoker: Arc<dyn AgentInvoker>) -> Self {
        Self {
            invoker,
            default_policy: FailurePolicy::FailFast,
            event_buffer: DEFAULT_EVENT_BUFFER,
        }
    }

    /// Build an engine with the policy and buffer size from `[engine]`.
    pub fn from_config(invoker: Arc<dyn AgentInvoker>, config: &EngineConfig) -> Self {
        Self::new(invoker)
            .with_failure_policy(FailurePolicy::from_config(config))
            .with_event_buffer(config.event_buffer)
    }

    /// Policy for Sequence and Parallel nodes that don't set their own.
    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.default_policy = policy;
        self
    }

    pub fn with_event_buffer(mut self, event_buffer: usize) -> Self {
        self.event_buffer = event_buffer.max(1);
        self
    }

    pub fn invoker(&self) -> &Arc<dyn AgentInvoker> {
        &self.invoker
    }

    /// Start a run. Must be called inside a Tokio runtime.
    pub fn run(&self, orchestration: &Orchestration, query: impl Into<String>) -> ProgressStream {
        self.run_with(orchestration, query, RunOptions::default())
    }

    pub fn run_with(
        &self,
        orchestration: &Orchestration,
        query: impl Into<String>,
        options: RunOptions,
    ) -> ProgressStream {
        let (tx, rx) = mpsc::channel(self.event_buffer);
        let cancel = options.cancel.unwrap_or_default();
        let ctx = ExecutionContext::new(
            query,
            options.session_key,
            Arc::clone(orchestration.labels()),
            cancel.clone(),
        );
        let run_id = ctx.run_id();

        let runner = Runner {
            invoker: Arc::clone(&self.invoker),
            default_policy: self.default_policy.clone(),
            gates: Arc::clone(orchestration.gates()),
            ctx,
            tx,
            sent_status: AtomicBool::new(false),
        };
        let orchestration = orchestration.clone();
        tokio::spawn(async move {
            runner.drive(&orchestration).await;
        });

        ProgressStream::new(rx, cancel, run_id)
    }
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("invoker", &self.invoker.name())
            .field("default_policy", &self.default_policy)
            .field("event_buffer", &self.event_buffer)
            .finish()
    }
}

/// Run the orchestration with default options.
pub fn run_pattern(engine: &Engine, orchestration: &Orchestration, query: impl Into<String>) -> ProgressStream {
    engine.run(orchestration, query)
}

/// Per-run options.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    session_key: Option<String>,
    cancel: Option<CancelHandle>,
}

impl RunOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Key for cross-call memory, forwarded with every invocation.
    pub fn with_session(mut self, session_key: impl Into<String>) -> Self {
        self.session_key = Some(session_key.into());
        self
    }

    /// Share an existing cancellation handle with the run.
    pub fn with_cancel(mut self, cancel: CancelHandle) -> Self {
        self.cancel = Some(cancel);
        self
    }
}

// --- Interpretation ---

/// What a node produced.
#[derive(Debug, Clone)]
struct Output {
    text: String,
    /// A governance block notice that must reach the caller verbatim.
    blocked: bool,
}

impl Output {
    fn plain(text: String) -> Self {
        Self {
            text,
            blocked: false,
        }
    }
}

/// Why a node stopped without output.
#[derive(Debug, Clone)]
enum Halt {
    Invocation { agent: String, error: InvocationError },
    Cancelled,
    BadRoute { path: String, index: usize, children: usize },
}

impl fmt::Display for Halt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Invocation { agent, error } => {
                write!(f, "agent '{agent}' could not complete the request: {error}")
            }
            Self::Cancelled => f.write_str("the run was cancelled"),
            Self::BadRoute {
                path,
                index,
                children,
            } => write!(
                f,
                "route at '{path}' selected child {index} but only {children} exist"
            ),
        }
    }
}

type Outcome = Result<Output, Halt>;

/// Result text of a cancelled run.
pub const CANCELLED_RESULT: &str = "Run cancelled before completion. No report was produced.";
/// Result text of a failed run starts with this.
pub const FAILED_PREFIX: &str = "The run could not be completed";
const CANCELLED_STATUS: &str = "Run cancelled.";
const FINISHED_STATUS: &str = "Run complete.";
const FAILED_STATUS: &str = "Run failed.";

struct Runner {
    invoker: Arc<dyn AgentInvoker>,
    default_policy: FailurePolicy,
    gates: Arc<Vec<String>>,
    ctx: ExecutionContext,
    tx: mpsc::Sender<ProgressEvent>,
    sent_status: AtomicBool,
}

impl Runner {
    async fn drive(&self, orchestration: &Orchestration) {
        let run_id = self.ctx.run_id();
        info!(%run_id, orchestration = orchestration.name(), "Run started");

        let outcome = self
            .execute(orchestration.root(), ROOT_PATH.to_string(), self.ctx.query().to_string())
            .await;

        let (status, report) = match outcome {
            Ok(output) if output.blocked => {
                info!(%run_id, "Run finished with a governance block");
                (FINISHED_STATUS, output.text)
            }
            Ok(output) => {
                info!(%run_id, "Run finished");
                let report = match orchestration.report() {
                    Some(template) => self.render_report(template, &output.text),
                    None => output.text,
                };
                (FINISHED_STATUS, report)
            }
            Err(Halt::Cancelled) => {
                info!(%run_id, "Run cancelled");
                (CANCELLED_STATUS, CANCELLED_RESULT.to_string())
            }
            Err(halt) => {
                warn!(%run_id, error = %halt, "Run failed");
                (FAILED_STATUS, format!("{FAILED_PREFIX}: {halt}."))
            }
        };

        if !self.sent_status.load(Ordering::SeqCst) {
            self.emit(status).await;
        }
        if self.tx.send(ProgressEvent::result(report)).await.is_err() {
            debug!(%run_id, "Result dropped; stream already closed");
        }
    }

    async fn emit(&self, text: &str) {
        self.sent_status.store(true, Ordering::SeqCst);
        if self.tx.send(ProgressEvent::status(text)).await.is_err() {
            // Nobody is listening any more.
            self.ctx.cancel_handle().cancel();
        }
    }

    async fn emit_all(&self, texts: &[String]) {
        for text in texts {
            self.emit(text).await;
        }
    }

    fn execute<'a>(&'a self, node: &'a Node, path: String, input: String) -> BoxFuture<'a, Outcome> {
        Box::pin(async move {
            if self.ctx.is_cancelled() {
                return Err(Halt::Cancelled);
            }
            debug!(run_id = %self.ctx.run_id(), node = %path, kind = node.kind.name(), "Entering node");

            if !node.announce.is_empty() {
                self.emit_all(&node.announce).await;
            } else if let NodeKind::Leaf(leaf) = &node.kind {
                self.emit(&format!("Consulting {}...", leaf.agent.name)).await;
            }

            let outcome = match &node.kind {
                NodeKind::Leaf(leaf) => self.leaf(leaf, &path, input).await,
                NodeKind::Sequence(seq) => self.sequence(seq, &path, input).await,
                NodeKind::Parallel(par) => self.parallel(par, &path, input).await,
                NodeKind::Route(route) => self.route(route, &path, input).await,
                NodeKind::Guarded(guarded) => self.guarded(guarded, &path, input).await,
                NodeKind::Retry(retry) => self.retry(retry, &path, input).await,
            };

            let output = outcome?;
            self.ctx.record(&path, &output.text);
            if !output.blocked {
                if !node.conclude.is_empty() {
                    self.emit_all(&node.conclude).await;
                } else if let NodeKind::Leaf(leaf) = &node.kind {
                    self.emit(&format!("{} responded.", leaf.agent.name)).await;
                }
            }
            Ok(output)
        })
    }

    async fn leaf(&self, leaf: &Leaf, path: &str, input: String) -> Outcome {
        let prompt = match &leaf.prompt {
            Some(template) => self.render_node(template, &input),
            None => input,
        };
        if self.ctx.is_cancelled() {
            return Err(Halt::Cancelled);
        }

        let agent = leaf.agent.name.clone();
        debug!(run_id = %self.ctx.run_id(), node = path, agent = %agent, "Invoking agent");
        // Exchanges under a gate may still be withheld, so memory must not keep them.
        let gated = self.gates.iter().any(|gate| is_within(path, gate));
        let request = InvokeRequest::new(Arc::clone(&leaf.agent), prompt)
            .with_session(self.ctx.session_key().map(str::to_string))
            .with_record(!gated);

        match self.invoker.invoke(request).await {
            Ok(text) => Ok(Output::plain(text)),
            Err(error) => {
                warn!(run_id = %self.ctx.run_id(), node = path, agent = %agent, error = %error, "Agent invocation failed");
                Err(Halt::Invocation { agent, error })
            }
        }
    }

    async fn sequence(&self, seq: &Sequence, path: &str, input: String) -> Outcome {
        let policy = seq.policy.as_ref().unwrap_or(&self.default_policy);
        let mut outputs = Vec::with_capacity(seq.children.len());
        let mut next_input = input;

        for (i, child) in seq.children.iter().enumerate() {
            let text = match self
                .execute(child, child_path(path, i), std::mem::take(&mut next_input))
                .await
            {
                // A block notice ends the chain.
                Ok(output) if output.blocked => return Ok(output),
                Ok(output) => output.text,
                Err(halt) => self.substitute(policy, halt, path)?,
            };
            next_input = self.transform(&seq.transform, &text);
            outputs.push(text);
        }

        match &seq.collect {
            Some(merge) => Ok(Output::plain(merge.apply(&outputs))),
            None => Ok(Output::plain(outputs.pop().unwrap_or_default())),
        }
    }

    async fn parallel(&self, par: &Parallel, path: &str, input: String) -> Outcome {
        let policy = par.policy.as_ref().unwrap_or(&self.default_policy);
        let branches = par
            .children
            .iter()
            .enumerate()
            .map(|(i, child)| self.execute(child, child_path(path, i), input.clone()));
        let results = join_all(branches).await;

        let mut outputs = Vec::with_capacity(results.len());
        let mut blocked = false;
        for result in results {
            match result {
                Ok(output) => {
                    blocked |= output.blocked;
                    outputs.push(output.text);
                }
                Err(halt) => outputs.push(self.substitute(policy, halt, path)?),
            }
        }

        Ok(Output {
            text: par.merge.apply(&outputs),
            blocked,
        })
    }

    async fn route(&self, route: &Route, path: &str, input: String) -> Outcome {
        let index = route.predicate.select(self.ctx.query());
        debug!(run_id = %self.ctx.run_id(), node = path, index, "Route selected");

        let Some(child) = route.children.get(index) else {
            return Err(Halt::BadRoute {
                path: path.to_string(),
                index,
                children: route.children.len(),
            });
        };
        self.execute(child, child_path(path, index), input).await
    }

    async fn guarded(&self, guarded: &Guarded, path: &str, input: String) -> Outcome {
        let primary = self.execute(&guarded.primary, child_path(path, 0), input).await?;
        if primary.blocked {
            return Ok(primary);
        }

        let audit = match self
            .execute(&guarded.auditor, child_path(path, 1), primary.text.clone())
            .await
        {
            Ok(audit) => audit,
            Err(halt) => {
                // Fail closed: the unaudited output is never released.
                self.ctx.redact(path);
                return Err(halt);
            }
        };

        match guarded.verdict.judge(&audit.text) {
            Decision::Approved => {
                debug!(run_id = %self.ctx.run_id(), node = path, "Audit approved");
                self.emit_all(&guarded.on_approved).await;
                Ok(primary)
            }
            Decision::Rejected { reason } => {
                warn!(run_id = %self.ctx.run_id(), node = path, reason = %reason, "Audit rejected output");
                self.ctx.redact(path);
                self.emit_all(&guarded.on_blocked).await;
                let query = self.ctx.query();
                let notice = guarded.block_notice.render(|slot| match slot {
                    REASON => Some(reason.clone()),
                    QUERY => Some(query.to_string()),
                    _ => None,
                });
                Ok(Output {
                    text: notice,
                    blocked: true,
                })
            }
        }
    }

    async fn retry(&self, retry: &Retry, path: &str, input: String) -> Outcome {
        let child = child_path(path, 0);
        let mut attempt = 1;
        loop {
            match self.execute(&retry.child, child.clone(), input.clone()).await {
                Ok(output) => return Ok(output),
                Err(Halt::Invocation { agent, error }) => {
                    self.emit(&format!(
                        "Attempt {attempt} of {} for {agent} failed: {error}",
                        retry.attempts
                    ))
                    .await;
                    if !error.is_transient() || attempt >= retry.attempts {
                        return Err(Halt::Invocation { agent, error });
                    }
                    warn!(run_id = %self.ctx.run_id(), node = path, attempt, agent = %agent, "Retrying after transient failure");
                    if !retry.backoff.is_zero() {
                        tokio::time::sleep(retry.backoff).await;
                    }
                    if self.ctx.is_cancelled() {
                        return Err(Halt::Cancelled);
                    }
                    attempt += 1;
                }
                Err(halt) => return Err(halt),
            }
        }
    }

    /// Apply the failure policy to a halted child.
    fn substitute(&self, policy: &FailurePolicy, halt: Halt, path: &str) -> Result<String, Halt> {
        match (policy, halt) {
            (_, Halt::Cancelled) => Err(Halt::Cancelled),
            (FailurePolicy::FailFast, halt) => Err(halt),
            (FailurePolicy::Continue { placeholder }, halt) => {
                warn!(run_id = %self.ctx.run_id(), node = path, error = %halt, "Child failed; continuing with placeholder");
                Ok(FailurePolicy::placeholder_for(placeholder, &halt.to_string()))
            }
        }
    }

    fn transform(&self, transform: &Transform, previous: &str) -> String {
        match transform {
            Transform::Identity => previous.to_string(),
            Transform::Template(template) => self.render_node(template, previous),
            Transform::Custom(f) => f(previous),
        }
    }

    fn render_node(&self, template: &Template, input: &str) -> String {
        template.render(|slot| match slot {
            INPUT => Some(input.to_string()),
            QUERY => Some(self.ctx.query().to_string()),
            label => self.ctx.output_labeled(label),
        })
    }

    fn render_report(&self, template: &Template, output: &str) -> String {
        template.render(|slot| match slot {
            OUTPUT => Some(output.to_string()),
            QUERY => Some(self.ctx.query().to_string()),
            label => self.ctx.output_labeled(label),
        })
    }
}
