//! Editor session: one document, its view, sandbox and validation worker.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};

use strategy_editor_core::config::EditorConfig;
use strategy_editor_core::{
    Diagnostic, DiagnosticOrigin, EditOrigin, EditorView, EditorViewFactory, Error, Extensions,
    ProtectedRegionPolicy, RemoteValidator, Result, Severity, TextChange, TextDocument,
    Transaction, ViewUpdate,
};
use strategy_editor_sandbox::{
    render_hover, upsert_file, CompletionEntry, DiagnosticCategory, FileChange, HoverContent,
    RawDiagnostic, SandboxEnvironment, SandboxManager,
};

use crate::aggregator::DiagnosticAggregator;
use crate::worker::{ValidationHandle, ValidationWorker};

// =============================================================================
// Session Configuration
// =============================================================================

/// Per-session knobs, usually taken from [`EditorConfig`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSettings {
    /// Path the document is mirrored to inside the sandbox.
    pub document_path: String,
    pub debounce: Duration,
    pub protected_lines: usize,
    pub styled_lines: Vec<usize>,
}

impl SessionSettings {
    pub fn from_config(config: &EditorConfig) -> Self {
        Self {
            document_path: config.editor.document_path.clone(),
            debounce: config.validation.debounce(),
            protected_lines: config.editor.protected_lines,
            styled_lines: config.editor.styled_lines.clone(),
        }
    }
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self::from_config(&EditorConfig::default())
    }
}

/// What the host opens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionOptions {
    pub code: String,
    pub read_only: bool,
}

impl SessionOptions {
    pub fn editable(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            read_only: false,
        }
    }

    pub fn read_only(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            read_only: true,
        }
    }
}

/// Collaborators shared by every session of a host.
#[derive(Clone)]
pub struct SessionDeps {
    pub sandboxes: Arc<SandboxManager>,
    pub validator: Arc<dyn RemoteValidator>,
    pub views: Arc<dyn EditorViewFactory>,
    pub settings: SessionSettings,
}

/// Whether a user edit reached the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditOutcome {
    Applied,
    Rejected,
}

// =============================================================================
// Editor Session
// =============================================================================

/// A live editor document.
///
/// Editable sessions own a sandbox environment and a validation worker;
/// read-only sessions own neither and never report errors. All methods are
/// meant to be driven from one host task.
pub struct EditorSession {
    view: Arc<dyn EditorView>,
    sandboxes: Arc<SandboxManager>,
    sandbox: Option<SandboxEnvironment>,
    policy: Option<ProtectedRegionPolicy>,
    settings: SessionSettings,
    aggregator: Arc<DiagnosticAggregator>,
    validation: Option<ValidationHandle>,
    failures: mpsc::UnboundedReceiver<Error>,
    ready: watch::Sender<bool>,
}

impl EditorSession {
    /// Create the view and, for editable documents, the sandbox and worker.
    ///
    /// Resolves once the session is ready: immediately for read-only
    /// documents, after the declaration snapshot is available otherwise.
    pub async fn open(options: SessionOptions, deps: SessionDeps) -> Result<Self> {
        let SessionDeps {
            sandboxes,
            validator,
            views,
            settings,
        } = deps;
        let aggregator = Arc::new(DiagnosticAggregator::new());
        let (ready, _) = watch::channel(false);
        let (failure_tx, failures) = mpsc::unbounded_channel();

        if options.read_only {
            let view = views.create(&options.code, Extensions::read_only())?;
            let session = Self {
                view,
                sandboxes,
                sandbox: None,
                policy: None,
                settings,
                aggregator,
                validation: None,
                failures,
                ready,
            };
            session.ready.send_replace(true);
            tracing::info!(read_only = true, "Editor session opened");
            return Ok(session);
        }

        let sandbox = sandboxes.acquire().await?;
        let policy = ProtectedRegionPolicy::new(settings.protected_lines);
        let view = views.create(
            &options.code,
            Extensions::editable(policy, settings.styled_lines.clone()),
        )?;
        let validation = ValidationWorker::spawn(
            settings.debounce,
            validator,
            view.clone(),
            aggregator.clone(),
            failure_tx,
        );

        let mut session = Self {
            view,
            sandboxes,
            sandbox: Some(sandbox),
            policy: Some(policy),
            settings,
            aggregator,
            validation: Some(validation),
            failures,
            ready,
        };
        session.analyze()?;
        session.ready.send_replace(true);
        tracing::info!(
            read_only = false,
            sandbox_id = ?session.sandbox.as_ref().map(|s| s.id().to_string()),
            "Editor session opened"
        );
        Ok(session)
    }

    pub fn is_read_only(&self) -> bool {
        self.sandbox.is_none()
    }

    pub fn text(&self) -> String {
        self.view.snapshot().text().to_string()
    }

    pub fn view(&self) -> &Arc<dyn EditorView> {
        &self.view
    }

    /// Host-side replacement of the whole document. Not subject to the
    /// protected region.
    pub fn set_code(&mut self, code: &str) -> Result<()> {
        let doc = self.view.snapshot();
        let update = self
            .view
            .dispatch(Transaction::Change(TextChange::replace_all(&doc, code)))?;
        self.on_update(update)
    }

    /// A user edit; refused in read-only sessions and inside the header.
    pub fn apply_edit(&mut self, change: TextChange) -> Result<EditOutcome> {
        let Some(policy) = &self.policy else {
            return Ok(EditOutcome::Rejected);
        };
        let doc = self.view.snapshot();
        if !policy.permits(&doc, &change, EditOrigin::User) {
            tracing::debug!(from = change.from, to = change.to, "Edit in protected region rejected");
            return Ok(EditOutcome::Rejected);
        }
        let update = self.view.dispatch(Transaction::Change(change))?;
        self.on_update(update)?;
        Ok(EditOutcome::Applied)
    }

    /// Inject a library file into the sandbox and re-lint.
    pub fn add_extra_lib(&mut self, path: &str, content: &str) -> Result<FileChange> {
        let change = upsert_file(self.sandbox.as_mut(), path, content)?;
        self.lint()?;
        Ok(change)
    }

    /// Reload the view configuration, which triggers a fresh analysis pass.
    pub fn lint(&mut self) -> Result<()> {
        let update = self.view.dispatch(Transaction::Reconfigure)?;
        self.on_update(update)
    }

    pub fn has_errors(&self) -> watch::Receiver<bool> {
        self.aggregator.subscribe()
    }

    pub fn ready(&self) -> watch::Receiver<bool> {
        self.ready.subscribe()
    }

    pub fn aggregator(&self) -> &Arc<DiagnosticAggregator> {
        &self.aggregator
    }

    /// Transport failures reported since the last call.
    pub fn take_failures(&mut self) -> Vec<Error> {
        let mut failures = Vec::new();
        while let Ok(error) = self.failures.try_recv() {
            failures.push(error);
        }
        failures
    }

    pub fn completions(&self, pos: usize) -> Vec<CompletionEntry> {
        match &self.sandbox {
            Some(env) => env.completions(&self.settings.document_path, pos),
            None => Vec::new(),
        }
    }

    pub fn hover(&self, pos: usize) -> Option<HoverContent> {
        let env = self.sandbox.as_ref()?;
        env.quick_info(&self.settings.document_path, pos)
            .map(|info| render_hover(&info))
    }

    /// Send pending content now and wait for the latest outcome.
    pub async fn flush_validation(&self) -> Result<()> {
        match &self.validation {
            Some(validation) => validation.flush().await,
            None => Ok(()),
        }
    }

    /// Stop validation, destroy the view and release the sandbox.
    pub async fn close(mut self) {
        if let Some(validation) = self.validation.take() {
            validation.shutdown().await;
        }
        self.view.destroy();
        if let Some(env) = self.sandbox.take() {
            self.sandboxes.release(env);
        }
        tracing::info!("Editor session closed");
    }

    fn on_update(&mut self, update: ViewUpdate) -> Result<()> {
        if !update.is_relevant() {
            return Ok(());
        }
        self.analyze()
    }

    /// Local analysis pass: mirror, diagnose, publish, hand off to the worker.
    fn analyze(&mut self) -> Result<()> {
        let Some(env) = self.sandbox.as_mut() else {
            return Ok(());
        };
        let path = &self.settings.document_path;
        let doc = self.view.snapshot();
        env.sync_document(path, doc.text())?;

        let raw = env.diagnostics(path);
        let local_error = raw.iter().any(RawDiagnostic::is_error);
        let diagnostics: Vec<Diagnostic> = raw
            .iter()
            .filter_map(|d| local_diagnostic(&doc, d))
            .collect();
        tracing::trace!(diagnostics = diagnostics.len(), local_error, "Local analysis pass");

        self.view
            .publish_diagnostics(DiagnosticOrigin::Local, diagnostics);
        self.aggregator.set_local(local_error);

        if let Some(validation) = &self.validation {
            validation.submit(doc.text(), local_error)?;
        }
        Ok(())
    }
}

/// Sandbox diagnostic as displayed; suggestions and messages are dropped.
fn local_diagnostic(doc: &TextDocument, raw: &RawDiagnostic) -> Option<Diagnostic> {
    let severity = match raw.category {
        DiagnosticCategory::Error => Severity::Error,
        DiagnosticCategory::Warning => Severity::Warning,
        DiagnosticCategory::Suggestion | DiagnosticCategory::Message => return None,
    };
    let from = raw.start.min(doc.len());
    let to = (raw.start + raw.length).clamp(from, doc.len());
    Some(Diagnostic::local(from..to, severity, raw.message.clone()))
}
