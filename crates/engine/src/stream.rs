//! The progress stream returned by a run.
//!
//! Any number of `Status` events followed by exactly one `Result`. If the
//! producing task ends without a `Result` (a panic, or a dropped sender),
//! the stream synthesises one. Dropping the stream cancels the run.

use conductor_core::event::ProgressEvent;
use futures::{Stream, StreamExt};
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use uuid::Uuid;

use crate::context::CancelHandle;

pub(crate) const INTERRUPTED_STATUS: &str = "Run interrupted.";
pub(crate) const INTERRUPTED_RESULT: &str =
    "The run ended unexpectedly before producing a report.";

/// Single-pass stream of progress events.
pub struct ProgressStream {
    inner: ReceiverStream<ProgressEvent>,
    cancel: CancelHandle,
    run_id: Uuid,
    finished: bool,
    saw_status: bool,
    queued: Option<ProgressEvent>,
}

impl ProgressStream {
    pub(crate) fn new(rx: mpsc::Receiver<ProgressEvent>, cancel: CancelHandle, run_id: Uuid) -> Self {
        Self {
            inner: ReceiverStream::new(rx),
            cancel,
            run_id,
            finished: false,
            saw_status: false,
            queued: None,
        }
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Handle that stops the run at its next checkpoint.
    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    /// Next event, or `None` once the `Result` has been delivered.
    pub async fn recv(&mut self) -> Option<ProgressEvent> {
        self.next().await
    }

    /// Drain the stream.
    pub async fn collect_events(self) -> Vec<ProgressEvent> {
        self.collect().await
    }
}

impl Stream for ProgressStream {
    type Item = ProgressEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        if let Some(event) = self.queued.take() {
            return Poll::Ready(Some(event));
        }
        if self.finished {
            return Poll::Ready(None);
        }

        match Pin::new(&mut self.inner).poll_next(cx) {
            Poll::Ready(Some(event)) => {
                if event.is_terminal() {
                    self.finished = true;
                } else {
                    self.saw_status = true;
                }
                Poll::Ready(Some(event))
            }
            Poll::Ready(None) => {
                tracing::warn!(run_id = %self.run_id, "Run ended without a result");
                self.finished = true;
                let result = ProgressEvent::result(INTERRUPTED_RESULT);
                if self.saw_status {
                    Poll::Ready(Some(result))
                } else {
                    self.queued = Some(result);
                    Poll::Ready(Some(ProgressEvent::status(INTERRUPTED_STATUS)))
                }
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

impl Drop for ProgressStream {
    fn drop(&mut self) {
        if !self.finished {
            self.cancel.cancel();
        }
    }
}
