//! Async driver of the validation pipeline.
//!
//! One worker task per editable document. It owns the [`ValidationPipeline`],
//! sleeps until the debounce deadline and runs the remote call in a
//! `JoinSet`. Dispatching a newer request aborts the one still in flight, so
//! at most one call per document is outstanding.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::Instant;

use strategy_editor_core::{
    parser_error_diagnostic, DiagnosticOrigin, EditorView, Error, RemoteValidator, Result,
    ValidationOutcome,
};

use crate::aggregator::DiagnosticAggregator;
use crate::pipeline::{ContentDecision, Dispatch, ValidationPipeline, Verdict};

#[derive(Debug)]
enum Command {
    Content { text: String, local_error: bool },
    Flush(oneshot::Sender<()>),
}

// =============================================================================
// Handle
// =============================================================================

/// Session-side handle to a running worker.
#[derive(Debug)]
pub struct ValidationHandle {
    commands: mpsc::UnboundedSender<Command>,
    task: JoinHandle<()>,
}

impl ValidationHandle {
    /// Feed the content of a finished analysis pass.
    pub fn submit(&self, text: impl Into<String>, local_error: bool) -> Result<()> {
        self.commands
            .send(Command::Content {
                text: text.into(),
                local_error,
            })
            .map_err(|_| Error::PipelineClosed)
    }

    /// Send any pending content now and wait until the latest request settled.
    pub async fn flush(&self) -> Result<()> {
        let (tx, rx) = oneshot::channel();
        self.commands
            .send(Command::Flush(tx))
            .map_err(|_| Error::PipelineClosed)?;
        rx.await.map_err(|_| Error::PipelineClosed)
    }

    /// Stop the worker. Outstanding requests are dropped unapplied.
    pub async fn shutdown(self) {
        drop(self.commands);
        if let Err(e) = self.task.await {
            tracing::error!(error = %e, "Validation worker terminated abnormally");
        }
    }
}

// =============================================================================
// Worker
// =============================================================================

type CallResult = (u64, Result<ValidationOutcome>);

pub struct ValidationWorker {
    pipeline: ValidationPipeline,
    validator: Arc<dyn RemoteValidator>,
    view: Arc<dyn EditorView>,
    aggregator: Arc<DiagnosticAggregator>,
    failures: mpsc::UnboundedSender<Error>,
    commands: mpsc::UnboundedReceiver<Command>,
    in_flight: JoinSet<CallResult>,
    waiters: Vec<oneshot::Sender<()>>,
}

impl ValidationWorker {
    /// Spawn a worker on the current runtime.
    ///
    /// Transport failures are sent on `failures` for the host to present.
    pub fn spawn(
        debounce: Duration,
        validator: Arc<dyn RemoteValidator>,
        view: Arc<dyn EditorView>,
        aggregator: Arc<DiagnosticAggregator>,
        failures: mpsc::UnboundedSender<Error>,
    ) -> ValidationHandle {
        let (tx, rx) = mpsc::unbounded_channel();
        let worker = Self {
            pipeline: ValidationPipeline::new(debounce),
            validator,
            view,
            aggregator,
            failures,
            commands: rx,
            in_flight: JoinSet::new(),
            waiters: Vec::new(),
        };
        ValidationHandle {
            commands: tx,
            task: tokio::spawn(worker.run()),
        }
    }

    async fn run(mut self) {
        tracing::debug!(debounce_ms = self.pipeline.debounce().as_millis() as u64, "Validation worker started");
        loop {
            let deadline = self.pipeline.deadline();
            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(command) => self.handle(command),
                    None => break,
                },
                _ = tokio::time::sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                    if let Some(dispatch) = self.pipeline.poll_due(Instant::now()) {
                        self.dispatch(dispatch);
                    }
                }
                Some(joined) = self.in_flight.join_next(), if !self.in_flight.is_empty() => {
                    match joined {
                        Ok((seq, result)) => self.settle(seq, result),
                        Err(e) if e.is_cancelled() => {
                            tracing::trace!("Superseded validation request aborted");
                        }
                        Err(e) => {
                            tracing::error!(error = %e, "Validation request task failed");
                            if self.in_flight.is_empty() {
                                self.pipeline.abandon();
                            }
                            self.report(Error::internal(format!("validation task failed: {}", e)));
                        }
                    }
                }
            }
            self.notify_waiters();
        }
        tracing::debug!(dropped = self.in_flight.len(), "Validation worker stopped");
    }

    fn handle(&mut self, command: Command) {
        match command {
            Command::Content { text, local_error } => {
                let decision = self.pipeline.on_content(&text, local_error, Instant::now());
                match decision {
                    ContentDecision::Scheduled => {
                        tracing::trace!(chars = text.chars().count(), "Validation scheduled")
                    }
                    ContentDecision::AlreadyPending => {}
                    ContentDecision::Skipped(reason) => {
                        tracing::trace!(?reason, "Validation skipped")
                    }
                }
                self.aggregator.set_remote(self.pipeline.gate());
            }
            Command::Flush(waiter) => {
                if let Some(dispatch) = self.pipeline.fire_now() {
                    self.dispatch(dispatch);
                }
                self.waiters.push(waiter);
            }
        }
    }

    fn dispatch(&mut self, dispatch: Dispatch) {
        let Dispatch { seq, content } = dispatch;
        tracing::debug!(seq, chars = content.chars().count(), "Dispatching remote validation");

        if !self.in_flight.is_empty() {
            tracing::debug!(seq, aborted = self.in_flight.len(), "Aborting superseded validation request");
            self.in_flight.abort_all();
        }
        let validator = self.validator.clone();
        self.in_flight.spawn(async move {
            let result = validator.parse(&content).await;
            (seq, result)
        });
    }

    fn settle(&mut self, seq: u64, result: Result<ValidationOutcome>) {
        let verdict = match &result {
            Ok(outcome) => Verdict::from(outcome),
            Err(_) => Verdict::Failed,
        };
        if !self.pipeline.settle(seq, verdict) {
            tracing::debug!(seq, latest = ?self.pipeline.last_issued_seq(), "Discarding stale validation outcome");
            return;
        }

        match result {
            Ok(ValidationOutcome::Success) => {
                tracing::debug!(seq, "Remote validation passed");
                self.view.publish_diagnostics(DiagnosticOrigin::Remote, Vec::new());
            }
            Ok(ValidationOutcome::StructuredFailure(error)) => {
                let doc = self.view.snapshot();
                let diagnostic = parser_error_diagnostic(&doc, &error);
                tracing::debug!(seq, index = error.index, from = diagnostic.from, "Remote validation rejected content");
                self.view
                    .publish_diagnostics(DiagnosticOrigin::Remote, vec![diagnostic]);
            }
            Ok(ValidationOutcome::TransportFailure { status }) => {
                tracing::warn!(seq, status, "Remote validation failed");
                self.report(Error::unexpected_status(status, "validation request failed"));
            }
            Err(e) => {
                tracing::warn!(seq, error = %e, "Remote validation failed");
                self.report(e);
            }
        }
        self.aggregator.set_remote(self.pipeline.gate());
    }

    fn report(&self, error: Error) {
        if self.failures.send(error).is_err() {
            tracing::debug!("Failure receiver dropped");
        }
    }

    fn notify_waiters(&mut self) {
        if self.waiters.is_empty() || !self.pipeline.is_idle() {
            return;
        }
        for waiter in self.waiters.drain(..) {
            let _ = waiter.send(());
        }
    }
}
