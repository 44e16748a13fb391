use serde::{Deserialize, Serialize};
use std::ops::Range;

// =============================================================================
// Diagnostic Types
// =============================================================================

/// Severity shown by the editor for a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

/// Which producer computed a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticOrigin {
    /// In-memory compilation sandbox.
    Local,
    /// Remote strategy validator.
    Remote,
}

/// A located, severity-tagged message describing a code defect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub from: usize,
    pub to: usize,
    pub severity: Severity,
    pub message: String,
    pub origin: DiagnosticOrigin,
    /// Label shown next to the message in the lint panel.
    pub source: String,
}

impl Diagnostic {
    /// Create an error diagnostic from the remote validator.
    pub fn remote_error(span: Range<usize>, message: impl Into<String>) -> Self {
        Self {
            from: span.start,
            to: span.end,
            severity: Severity::Error,
            message: message.into(),
            origin: DiagnosticOrigin::Remote,
            source: "static analysis".to_string(),
        }
    }

    /// Create a diagnostic from the local sandbox.
    pub fn local(span: Range<usize>, severity: Severity, message: impl Into<String>) -> Self {
        Self {
            from: span.start,
            to: span.end,
            severity,
            message: message.into(),
            origin: DiagnosticOrigin::Local,
            source: "sandbox".to_string(),
        }
    }

    pub fn span(&self) -> Range<usize> {
        self.from..self.to
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}
