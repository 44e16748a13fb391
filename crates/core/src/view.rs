//! In-memory editor view.
//!
//! Backs the headless checker and the test suites. It keeps the document and
//! the published diagnostic sets but renders nothing.

use std::collections::HashMap;
use std::ops::Range;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::decorations::{decorate_lines, LineDecoration};
use crate::document::TextDocument;
use crate::error::{Error, Result};
use crate::traits::{EditorView, EditorViewFactory, Extensions, Transaction, ViewUpdate};
use crate::types::{Diagnostic, DiagnosticOrigin};

#[derive(Debug)]
struct ViewState {
    doc: TextDocument,
    diagnostics: HashMap<DiagnosticOrigin, Vec<Diagnostic>>,
    publish_count: usize,
    destroyed: bool,
}

/// View that holds its document in memory.
#[derive(Debug)]
pub struct HeadlessView {
    extensions: Extensions,
    state: Mutex<ViewState>,
}

impl HeadlessView {
    pub fn new(doc: &str, extensions: Extensions) -> Self {
        Self {
            extensions,
            state: Mutex::new(ViewState {
                doc: TextDocument::new(doc),
                diagnostics: HashMap::new(),
                publish_count: 0,
                destroyed: false,
            }),
        }
    }

    pub fn extensions(&self) -> &Extensions {
        &self.extensions
    }

    /// Diagnostics currently displayed for one origin.
    pub fn diagnostics(&self, origin: DiagnosticOrigin) -> Vec<Diagnostic> {
        self.state()
            .diagnostics
            .get(&origin)
            .cloned()
            .unwrap_or_default()
    }

    /// Styled header lines for the given visible ranges.
    pub fn line_decorations(&self, visible: &[Range<usize>]) -> Vec<LineDecoration> {
        decorate_lines(&self.state().doc, visible, &self.extensions.styled_lines)
    }

    /// All displayed diagnostics, local first.
    pub fn all_diagnostics(&self) -> Vec<Diagnostic> {
        let mut all = self.diagnostics(DiagnosticOrigin::Local);
        all.extend(self.diagnostics(DiagnosticOrigin::Remote));
        all
    }

    /// Number of diagnostic replacements received so far.
    pub fn publish_count(&self) -> usize {
        self.state().publish_count
    }

    pub fn is_destroyed(&self) -> bool {
        self.state().destroyed
    }

    fn state(&self) -> MutexGuard<'_, ViewState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl EditorView for HeadlessView {
    fn snapshot(&self) -> TextDocument {
        self.state().doc.clone()
    }

    fn dispatch(&self, transaction: Transaction) -> Result<ViewUpdate> {
        let mut state = self.state();
        if state.destroyed {
            return Err(Error::internal("dispatch to a destroyed view"));
        }
        match transaction {
            Transaction::Change(change) => {
                if change.from == change.to && change.insert.is_empty() {
                    return Ok(ViewUpdate::default());
                }
                let before = state.doc.text().to_string();
                state.doc.apply(&change)?;
                Ok(ViewUpdate {
                    doc_changed: state.doc.text() != before,
                    reconfigured: false,
                })
            }
            Transaction::Reconfigure => Ok(ViewUpdate::reconfigured()),
        }
    }

    fn publish_diagnostics(&self, origin: DiagnosticOrigin, diagnostics: Vec<Diagnostic>) {
        let mut state = self.state();
        if state.destroyed {
            return;
        }
        state.diagnostics.insert(origin, diagnostics);
        state.publish_count += 1;
    }

    fn destroy(&self) {
        let mut state = self.state();
        state.destroyed = true;
        state.diagnostics.clear();
    }
}

/// Factory producing [`HeadlessView`]s and remembering the last one built.
#[derive(Debug, Default)]
pub struct HeadlessViewFactory {
    last: Mutex<Option<Arc<HeadlessView>>>,
}

impl HeadlessViewFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// The most recently created view, for inspection.
    pub fn last_view(&self) -> Option<Arc<HeadlessView>> {
        self.last
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

impl EditorViewFactory for HeadlessViewFactory {
    fn create(&self, doc: &str, extensions: Extensions) -> Result<Arc<dyn EditorView>> {
        let view = Arc::new(HeadlessView::new(doc, extensions));
        *self
            .last
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(view.clone());
        Ok(view)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::TextChange;

    #[test]
    fn test_dispatch_reports_document_changes() {
        let view = HeadlessView::new("abc", Extensions::read_only());
        let update = view
            .dispatch(Transaction::Change(TextChange::insert(3, "d")))
            .unwrap();
        assert!(update.doc_changed);
        assert_eq!(view.snapshot().text(), "abcd");

        let noop = view
            .dispatch(Transaction::Change(TextChange::new(0, 1, "a")))
            .unwrap();
        assert!(!noop.doc_changed);

        assert_eq!(view.dispatch(Transaction::Reconfigure).unwrap(), ViewUpdate::reconfigured());
    }

    #[test]
    fn test_publish_replaces_per_origin() {
        let view = HeadlessView::new("x\ny", Extensions::read_only());
        view.publish_diagnostics(
            DiagnosticOrigin::Remote,
            vec![Diagnostic::remote_error(0..1, "first")],
        );
        view.publish_diagnostics(
            DiagnosticOrigin::Remote,
            vec![Diagnostic::remote_error(2..3, "second")],
        );
        let remote = view.diagnostics(DiagnosticOrigin::Remote);
        assert_eq!(remote.len(), 1);
        assert_eq!(remote[0].message, "second");
        assert!(view.diagnostics(DiagnosticOrigin::Local).is_empty());
        assert_eq!(view.publish_count(), 2);
    }

    #[test]
    fn test_destroyed_view_refuses_dispatch() {
        let factory = HeadlessViewFactory::new();
        let view = factory.create("x", Extensions::read_only()).unwrap();
        view.destroy();
        assert!(view.dispatch(Transaction::Reconfigure).is_err());
        assert!(factory.last_view().unwrap().is_destroyed());
    }

    #[test]
    fn test_header_lines_styled_only_when_editable() {
        let doc = "import a\nimport b\n\nbody";
        let editable = HeadlessView::new(
            doc,
            Extensions::editable(crate::ProtectedRegionPolicy::default(), vec![1, 2]),
        );
        let lines: Vec<usize> = editable
            .line_decorations(&[0..doc.len()])
            .iter()
            .map(|d| d.line)
            .collect();
        assert_eq!(lines, vec![1, 2]);

        let read_only = HeadlessView::new(doc, Extensions::read_only());
        assert!(read_only.line_decorations(&[0..doc.len()]).is_empty());
    }
}
