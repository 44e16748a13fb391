//! Remote validation state machine.
//!
//! The pipeline decides *when* a document is sent to the remote validator
//! and *whether* an outcome may still be applied. It performs no I/O and
//! reads no clock: every transition takes the current [`Instant`] from the
//! caller, which keeps it testable without a runtime.
//!
//! ```text
//!            qualifying change              deadline reached
//!   Idle ──────────────────────▶ Pending ──────────────────▶ InFlight(seq)
//!    ▲         (window reset        │                             │
//!    │          on each change)     │ non-qualifying change       │ outcome(seq)
//!    └──────────────────────────────┴─────────────────────────────┘
//! ```
//!
//! Every dispatch gets the next sequence number. Only the outcome of the
//! highest issued sequence number is applied; anything older is stale.

use std::time::Duration;
use tokio::time::Instant;

use strategy_editor_core::ValidationOutcome;

/// A request the worker must send now.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dispatch {
    pub seq: u64,
    pub content: String,
}

/// Why a content change did not (re)arm the debounce window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    Empty,
    LocalErrors,
    SameAsIssued,
}

/// What the pipeline did with a content change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentDecision {
    /// Debounce window (re)started for this content.
    Scheduled,
    /// Same content as the pending one; the window keeps running.
    AlreadyPending,
    /// Not sent; any pending window was cancelled.
    Skipped(SkipReason),
}

/// Coarse result of a settled request, as far as the error gate cares.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Valid,
    Rejected,
    /// Transport failure: reported to the host, gate left untouched.
    Failed,
}

impl From<&ValidationOutcome> for Verdict {
    fn from(outcome: &ValidationOutcome) -> Self {
        match outcome {
            ValidationOutcome::Success => Verdict::Valid,
            ValidationOutcome::StructuredFailure(_) => Verdict::Rejected,
            ValidationOutcome::TransportFailure { .. } => Verdict::Failed,
        }
    }
}

#[derive(Debug, Clone)]
struct Pending {
    content: String,
    deadline: Instant,
}

#[derive(Debug, Clone)]
struct Issued {
    seq: u64,
    content: String,
    /// `None` while in flight.
    verdict: Option<Verdict>,
}

/// Per-document debounce, dedup and staleness tracking.
#[derive(Debug)]
pub struct ValidationPipeline {
    debounce: Duration,
    pending: Option<Pending>,
    last_issued: Option<Issued>,
    next_seq: u64,
    gate: bool,
}

impl ValidationPipeline {
    pub fn new(debounce: Duration) -> Self {
        Self {
            debounce,
            pending: None,
            last_issued: None,
            next_seq: 1,
            gate: false,
        }
    }

    /// The remote error flag as the pipeline currently sees it.
    ///
    /// Raised as soon as content is pending, since the document is unverified
    /// until the validator says otherwise. A valid outcome lowers it only when
    /// nothing newer is pending: a success for content the user has already
    /// edited does not clear the flag, which deliberately departs from
    /// clearing it on every success. The flag drops once the pending content
    /// itself validates. Transport failures leave it where it was.
    pub fn gate(&self) -> bool {
        self.gate
    }

    pub fn debounce(&self) -> Duration {
        self.debounce
    }

    /// When the pending window expires, if one is running.
    pub fn deadline(&self) -> Option<Instant> {
        self.pending.as_ref().map(|p| p.deadline)
    }

    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Whether the most recently issued request is still unresolved.
    pub fn is_in_flight(&self) -> bool {
        self.last_issued
            .as_ref()
            .is_some_and(|issued| issued.verdict.is_none())
    }

    /// Nothing pending and the latest request settled.
    pub fn is_idle(&self) -> bool {
        !self.has_pending() && !self.is_in_flight()
    }

    pub fn last_issued_seq(&self) -> Option<u64> {
        self.last_issued.as_ref().map(|issued| issued.seq)
    }

    /// Feed the document content after an analysis pass.
    pub fn on_content(&mut self, content: &str, local_error: bool, now: Instant) -> ContentDecision {
        let skip = if content.is_empty() {
            Some(SkipReason::Empty)
        } else if local_error {
            Some(SkipReason::LocalErrors)
        } else if self
            .last_issued
            .as_ref()
            .is_some_and(|issued| issued.content == content)
        {
            Some(SkipReason::SameAsIssued)
        } else {
            None
        };

        if let Some(reason) = skip {
            self.pending = None;
            if reason == SkipReason::SameAsIssued {
                self.restore_issued_verdict();
            }
            return ContentDecision::Skipped(reason);
        }

        if let Some(pending) = &self.pending {
            if pending.content == content {
                return ContentDecision::AlreadyPending;
            }
        }

        self.pending = Some(Pending {
            content: content.to_string(),
            deadline: now + self.debounce,
        });
        self.gate = true;
        ContentDecision::Scheduled
    }

    /// Issue the pending request if its window has elapsed.
    pub fn poll_due(&mut self, now: Instant) -> Option<Dispatch> {
        match &self.pending {
            Some(pending) if pending.deadline <= now => self.issue(),
            _ => None,
        }
    }

    /// Issue the pending request immediately, ignoring its window.
    pub fn fire_now(&mut self) -> Option<Dispatch> {
        self.issue()
    }

    /// Record the verdict of request `seq`. Returns `false` when the request
    /// has been superseded and its outcome must be dropped.
    pub fn settle(&mut self, seq: u64, verdict: Verdict) -> bool {
        let Some(issued) = self.last_issued.as_mut() else {
            return false;
        };
        if issued.seq != seq || issued.verdict.is_some() {
            return false;
        }
        issued.verdict = Some(verdict);

        match verdict {
            Verdict::Valid if self.pending.is_none() => self.gate = false,
            Verdict::Valid => {}
            Verdict::Rejected => self.gate = true,
            Verdict::Failed => {}
        }
        true
    }

    /// Treat the latest request as failed when its task vanished without
    /// producing an outcome.
    pub fn abandon(&mut self) {
        if let Some(seq) = self.last_issued.as_ref().filter(|i| i.verdict.is_none()).map(|i| i.seq) {
            self.settle(seq, Verdict::Failed);
        }
    }

    fn issue(&mut self) -> Option<Dispatch> {
        let pending = self.pending.take()?;
        let seq = self.next_seq;
        self.next_seq += 1;
        self.last_issued = Some(Issued {
            seq,
            content: pending.content.clone(),
            verdict: None,
        });
        Some(Dispatch {
            seq,
            content: pending.content,
        })
    }

    fn restore_issued_verdict(&mut self) {
        match self.last_issued.as_ref().and_then(|issued| issued.verdict) {
            Some(Verdict::Valid) => self.gate = false,
            Some(Verdict::Rejected) => self.gate = true,
            Some(Verdict::Failed) | None => {}
        }
    }
}
