//! Mock implementations of the remote collaborators for testing.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use crate::{
    traits::{RemoteValidator, UniverseProvider},
    types::{Instrument, ParserError, ValidationOutcome},
    Error, Result,
};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

// =============================================================================
// Mock Remote Validator
// =============================================================================

#[derive(Debug, Clone)]
enum Reply {
    Outcome(ValidationOutcome),
    Network(String),
}

#[derive(Debug, Clone)]
struct Script {
    reply: Reply,
    delay: Duration,
}

/// Scripted validator keyed by document content.
///
/// Unscripted content validates successfully without delay. Delays use
/// `tokio::time::sleep`, so paused-clock tests control them precisely.
pub struct MockValidator {
    scripts: Mutex<HashMap<String, Script>>,
    calls: Mutex<Vec<String>>,
    in_flight: AtomicUsize,
}

/// Counts a running `parse` call until it returns or is dropped.
struct InFlight<'a>(&'a AtomicUsize);

impl<'a> InFlight<'a> {
    fn enter(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl Default for MockValidator {
    fn default() -> Self {
        Self::new()
    }
}

impl MockValidator {
    pub fn new() -> Self {
        Self {
            scripts: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
            in_flight: AtomicUsize::new(0),
        }
    }

    /// Reply to `content` with `outcome` immediately.
    pub fn respond(self, content: &str, outcome: ValidationOutcome) -> Self {
        self.respond_after(content, outcome, Duration::ZERO)
    }

    /// Reply to `content` with `outcome` after `delay`.
    pub fn respond_after(self, content: &str, outcome: ValidationOutcome, delay: Duration) -> Self {
        self.script(content, Reply::Outcome(outcome), delay)
    }

    /// Reply to `content` with a 422 parser error.
    pub fn reject(self, content: &str, message: &str, index: i64) -> Self {
        self.respond(
            content,
            ValidationOutcome::StructuredFailure(ParserError {
                message: message.to_string(),
                line: 1,
                column: 1,
                index,
            }),
        )
    }

    /// Fail `content` without any HTTP status (connection refused and the like).
    pub fn fail_network(self, content: &str, message: &str) -> Self {
        self.script(content, Reply::Network(message.to_string()), Duration::ZERO)
    }

    /// Contents received so far, in call order.
    pub fn calls(&self) -> Vec<String> {
        lock(&self.calls).clone()
    }

    pub fn call_count(&self) -> usize {
        lock(&self.calls).len()
    }

    /// Calls started but neither finished nor aborted.
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    fn script(self, content: &str, reply: Reply, delay: Duration) -> Self {
        lock(&self.scripts).insert(content.to_string(), Script { reply, delay });
        self
    }
}

#[async_trait]
impl RemoteValidator for MockValidator {
    async fn parse(&self, content: &str) -> Result<ValidationOutcome> {
        let _guard = InFlight::enter(&self.in_flight);
        lock(&self.calls).push(content.to_string());
        let script = lock(&self.scripts).get(content).cloned();

        let Some(script) = script else {
            return Ok(ValidationOutcome::Success);
        };
        if !script.delay.is_zero() {
            tokio::time::sleep(script.delay).await;
        }
        match script.reply {
            Reply::Outcome(outcome) => Ok(outcome),
            Reply::Network(message) => Err(Error::transport(message)),
        }
    }
}

// =============================================================================
// Static Universe
// =============================================================================

/// Universe provider returning a fixed list, or a fixed failure.
pub struct StaticUniverse {
    instruments: Vec<Instrument>,
    failure_status: Option<u16>,
    calls: Mutex<usize>,
}

impl StaticUniverse {
    pub fn new(tickers: &[&str]) -> Self {
        Self {
            instruments: tickers.iter().map(|t| Instrument::new(*t)).collect(),
            failure_status: None,
            calls: Mutex::new(0),
        }
    }

    /// Provider whose every call fails with the given HTTP status.
    pub fn failing(status: u16) -> Self {
        Self {
            instruments: Vec::new(),
            failure_status: Some(status),
            calls: Mutex::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        *lock(&self.calls)
    }
}

#[async_trait]
impl UniverseProvider for StaticUniverse {
    async fn get_universe(&self) -> Result<Vec<Instrument>> {
        *lock(&self.calls) += 1;
        match self.failure_status {
            Some(status) => Err(Error::unexpected_status(status, "universe unavailable")),
            None => Ok(self.instruments.clone()),
        }
    }
}
