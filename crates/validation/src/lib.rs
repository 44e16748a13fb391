#![deny(unused)]
//! Validation and session layer of the strategy editor.
//!
//! This crate provides:
//! - The debounced remote validation pipeline and its async worker
//! - The diagnostic aggregator behind the `has_errors` signal
//! - `EditorSession`, which ties a view, a sandbox and a worker together
//! - The HTTP client for the backtest API
//! - Installation of the strategy libraries into a session

pub mod aggregator;
pub mod http;
pub mod libraries;
pub mod pipeline;
pub mod session;
pub mod worker;

pub use aggregator::{DiagnosticAggregator, ErrorSignals};
pub use http::BacktestClient;
pub use libraries::install_strategy_libraries;
pub use pipeline::{ContentDecision, Dispatch, SkipReason, ValidationPipeline, Verdict};
pub use session::{EditOutcome, EditorSession, SessionDeps, SessionOptions, SessionSettings};
pub use worker::{ValidationHandle, ValidationWorker};
