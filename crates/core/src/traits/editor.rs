use std::sync::Arc;

use crate::document::{TextChange, TextDocument};
use crate::error::Result;
use crate::protected::ProtectedRegionPolicy;
use crate::types::{Diagnostic, DiagnosticOrigin};

// =============================================================================
// Editor View Types
// =============================================================================

/// A state change dispatched to the view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transaction {
    /// Replace a span of the document.
    Change(TextChange),
    /// Reload the view configuration without touching the document.
    Reconfigure,
}

/// What a dispatched transaction did; handed to the update listener.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ViewUpdate {
    pub doc_changed: bool,
    pub reconfigured: bool,
}

impl ViewUpdate {
    pub fn doc_changed() -> Self {
        Self {
            doc_changed: true,
            reconfigured: false,
        }
    }

    pub fn reconfigured() -> Self {
        Self {
            doc_changed: false,
            reconfigured: true,
        }
    }

    /// Whether the update listener has anything to react to.
    pub fn is_relevant(&self) -> bool {
        self.doc_changed || self.reconfigured
    }
}

/// Behaviour extensions a view is constructed with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extensions {
    pub read_only: bool,
    pub lint_gutter: bool,
    pub autocompletion: bool,
    pub hover: bool,
    /// Header the view must refuse user edits in.
    pub protected: Option<ProtectedRegionPolicy>,
    /// Lines rendered with the boilerplate background.
    pub styled_lines: Vec<usize>,
}

impl Extensions {
    /// Degraded mode: no sandbox, no diagnostics, no completion or hover.
    pub fn read_only() -> Self {
        Self {
            read_only: true,
            lint_gutter: false,
            autocompletion: false,
            hover: false,
            protected: None,
            styled_lines: Vec::new(),
        }
    }

    pub fn editable(protected: ProtectedRegionPolicy, styled_lines: Vec<usize>) -> Self {
        Self {
            read_only: false,
            lint_gutter: true,
            autocompletion: true,
            hover: true,
            protected: Some(protected),
            styled_lines,
        }
    }
}

// =============================================================================
// Editor View Traits
// =============================================================================

/// Handle to the text view that owns the document.
///
/// Methods take `&self`: adapters are handles onto a UI component and
/// synchronize internally.
pub trait EditorView: Send + Sync {
    /// Current document state.
    fn snapshot(&self) -> TextDocument;

    /// Apply a transaction and report what changed.
    fn dispatch(&self, transaction: Transaction) -> Result<ViewUpdate>;

    /// Replace the displayed diagnostics of one origin in a single step.
    fn publish_diagnostics(&self, origin: DiagnosticOrigin, diagnostics: Vec<Diagnostic>);

    /// Release view resources.
    fn destroy(&self);
}

/// Constructs views bound to a host-chosen container.
pub trait EditorViewFactory: Send + Sync {
    fn create(&self, doc: &str, extensions: Extensions) -> Result<Arc<dyn EditorView>>;
}
