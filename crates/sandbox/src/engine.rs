//! Compilation sandbox types.
//!
//! This module provides the virtual filesystem, the boundary traits of the
//! external analysis capability (`LanguageService`, `AnalysisBackend`,
//! `DeclarationSource`) and `SandboxEnvironment`, which binds one language
//! service to one virtual filesystem layered over a shared declaration
//! snapshot.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::str::FromStr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use strategy_editor_core::{Error, Result};

// =============================================================================
// Sandbox Types
// =============================================================================

/// Unique identifier for a sandbox instance.
#[derive(Debug, Clone, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub struct SandboxId(pub String);

impl std::fmt::Display for SandboxId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Language level the sandbox checks against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScriptTarget {
    Es5,
    Es2015,
    Es2017,
    EsNext,
}

impl FromStr for ScriptTarget {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "es5" => Ok(Self::Es5),
            "es2015" | "es6" => Ok(Self::Es2015),
            "es2017" => Ok(Self::Es2017),
            "esnext" => Ok(Self::EsNext),
            other => Err(Error::sandbox(format!("unknown script target '{}'", other))),
        }
    }
}

/// Options shared by every sandbox built from one manager.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompilerOptions {
    pub target: ScriptTarget,
}

impl Default for CompilerOptions {
    fn default() -> Self {
        Self {
            target: ScriptTarget::Es2015,
        }
    }
}

// =============================================================================
// Virtual Filesystem
// =============================================================================

/// Standard declaration files, read-only once built.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeclarationSnapshot {
    files: HashMap<String, String>,
}

impl DeclarationSnapshot {
    pub fn new(files: HashMap<String, String>) -> Self {
        Self { files }
    }

    pub fn get(&self, path: &str) -> Option<&str> {
        self.files.get(path).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.files.iter().map(|(p, c)| (p.as_str(), c.as_str()))
    }
}

/// A named in-memory source file visible only to the sandbox.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VirtualFile {
    pub path: String,
    pub content: String,
    /// Bumped on every in-place update.
    pub version: u32,
}

/// Whether an upsert created a file or replaced one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileChange {
    Created,
    Updated,
}

/// Per-sandbox files layered over the shared declaration snapshot.
#[derive(Debug, Clone)]
pub struct VirtualFileSystem {
    snapshot: Arc<DeclarationSnapshot>,
    files: BTreeMap<String, VirtualFile>,
}

impl VirtualFileSystem {
    pub fn new(snapshot: Arc<DeclarationSnapshot>) -> Self {
        Self {
            snapshot,
            files: BTreeMap::new(),
        }
    }

    /// Content at `path`; sandbox files shadow snapshot files.
    pub fn read(&self, path: &str) -> Option<&str> {
        self.files
            .get(path)
            .map(|f| f.content.as_str())
            .or_else(|| self.snapshot.get(path))
    }

    pub fn exists(&self, path: &str) -> bool {
        self.read(path).is_some()
    }

    /// Sandbox-owned file at `path`, excluding snapshot files.
    pub fn file(&self, path: &str) -> Option<&VirtualFile> {
        self.files.get(path)
    }

    /// Create `path` or replace its content in place.
    pub fn upsert(&mut self, path: &str, content: &str) -> FileChange {
        match self.files.get_mut(path) {
            Some(file) => {
                file.content = content.to_string();
                file.version += 1;
                FileChange::Updated
            }
            None => {
                self.files.insert(
                    path.to_string(),
                    VirtualFile {
                        path: path.to_string(),
                        content: content.to_string(),
                        version: 1,
                    },
                );
                FileChange::Created
            }
        }
    }

    /// Sandbox-owned files, sorted by path.
    pub fn files(&self) -> impl Iterator<Item = &VirtualFile> {
        self.files.values()
    }

    /// Every readable file: sandbox files first, then unshadowed snapshot files.
    pub fn all_sources(&self) -> Vec<(&str, &str)> {
        let mut sources: Vec<(&str, &str)> = self
            .files
            .values()
            .map(|f| (f.path.as_str(), f.content.as_str()))
            .collect();
        sources.extend(
            self.snapshot
                .iter()
                .filter(|(path, _)| !self.files.contains_key(*path)),
        );
        sources
    }

    pub fn snapshot(&self) -> &Arc<DeclarationSnapshot> {
        &self.snapshot
    }
}

// =============================================================================
// Analysis Boundary
// =============================================================================

/// Category reported by the analysis service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DiagnosticCategory {
    Error,
    Warning,
    Suggestion,
    Message,
}

/// Diagnostic as produced by the analysis service, in character offsets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawDiagnostic {
    pub start: usize,
    pub length: usize,
    pub category: DiagnosticCategory,
    pub code: u32,
    pub message: String,
}

impl RawDiagnostic {
    pub fn error(start: usize, length: usize, code: u32, message: impl Into<String>) -> Self {
        Self {
            start,
            length,
            category: DiagnosticCategory::Error,
            code,
            message: message.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.category == DiagnosticCategory::Error
    }
}

/// One autocompletion candidate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionEntry {
    pub name: String,
    pub kind: String,
}

/// A fragment of a rendered signature, e.g. `keyword` or `methodName`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayPart {
    pub text: String,
    pub kind: String,
}

impl DisplayPart {
    pub fn new(text: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            kind: kind.into(),
        }
    }
}

/// A JSDoc tag attached to a declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocTag {
    pub name: String,
    pub text: Vec<DisplayPart>,
}

/// Hover information for the symbol under the cursor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuickInfo {
    pub start: usize,
    pub length: usize,
    pub display_parts: Vec<DisplayPart>,
    pub tags: Vec<DocTag>,
}

/// Per-document analysis service supplied by the external type checker.
pub trait LanguageService: Send + Sync {
    fn syntactic_diagnostics(&self, fs: &VirtualFileSystem, path: &str) -> Vec<RawDiagnostic>;

    fn semantic_diagnostics(&self, fs: &VirtualFileSystem, path: &str) -> Vec<RawDiagnostic>;

    fn completions(&self, fs: &VirtualFileSystem, path: &str, offset: usize)
        -> Vec<CompletionEntry>;

    fn quick_info(&self, fs: &VirtualFileSystem, path: &str, offset: usize) -> Option<QuickInfo>;

    /// Release any resources held by the service.
    fn dispose(&self);
}

/// Builds language services; one service per sandbox.
pub trait AnalysisBackend: Send + Sync {
    fn create_service(&self, options: &CompilerOptions) -> Result<Box<dyn LanguageService>>;
}

/// Supplier of the standard declaration files (expensive, loaded once).
#[async_trait]
pub trait DeclarationSource: Send + Sync {
    async fn load(&self, options: &CompilerOptions) -> Result<DeclarationSnapshot>;
}

/// In-memory declaration source that counts how often it is loaded.
#[derive(Debug, Default)]
pub struct StaticDeclarationSource {
    files: HashMap<String, String>,
    loads: AtomicUsize,
}

impl StaticDeclarationSource {
    pub fn new(files: HashMap<String, String>) -> Self {
        Self {
            files,
            loads: AtomicUsize::new(0),
        }
    }

    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DeclarationSource for StaticDeclarationSource {
    async fn load(&self, _options: &CompilerOptions) -> Result<DeclarationSnapshot> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        Ok(DeclarationSnapshot::new(self.files.clone()))
    }
}

// =============================================================================
// Sandbox Environment
// =============================================================================

/// One document's compilation sandbox.
pub struct SandboxEnvironment {
    id: SandboxId,
    fs: VirtualFileSystem,
    service: Box<dyn LanguageService>,
    disposed: bool,
}

impl std::fmt::Debug for SandboxEnvironment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SandboxEnvironment")
            .field("id", &self.id)
            .field("files", &self.fs.files().count())
            .field("disposed", &self.disposed)
            .finish()
    }
}

impl SandboxEnvironment {
    pub fn new(id: SandboxId, fs: VirtualFileSystem, service: Box<dyn LanguageService>) -> Self {
        Self {
            id,
            fs,
            service,
            disposed: false,
        }
    }

    pub fn id(&self) -> &SandboxId {
        &self.id
    }

    pub fn fs(&self) -> &VirtualFileSystem {
        &self.fs
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    /// Create or update a file in place.
    pub fn upsert_file(&mut self, path: &str, content: &str) -> Result<FileChange> {
        if self.disposed {
            return Err(Error::sandbox(format!(
                "sandbox {} is disposed; cannot write '{}'",
                self.id, path
            )));
        }
        Ok(self.fs.upsert(path, content))
    }

    /// Mirror the edited document into the virtual filesystem.
    pub fn sync_document(&mut self, path: &str, text: &str) -> Result<()> {
        if self.fs.read(path) == Some(text) {
            return Ok(());
        }
        self.upsert_file(path, text).map(|_| ())
    }

    /// Syntactic and semantic diagnostics of `path`, in that order.
    pub fn diagnostics(&self, path: &str) -> Vec<RawDiagnostic> {
        if self.disposed {
            return Vec::new();
        }
        let mut diagnostics = self.service.syntactic_diagnostics(&self.fs, path);
        diagnostics.extend(self.service.semantic_diagnostics(&self.fs, path));
        diagnostics
    }

    /// Number of error-category diagnostics of `path`.
    pub fn error_count(&self, path: &str) -> usize {
        self.diagnostics(path).iter().filter(|d| d.is_error()).count()
    }

    pub fn completions(&self, path: &str, offset: usize) -> Vec<CompletionEntry> {
        if self.disposed {
            return Vec::new();
        }
        self.service.completions(&self.fs, path, offset)
    }

    pub fn quick_info(&self, path: &str, offset: usize) -> Option<QuickInfo> {
        if self.disposed {
            return None;
        }
        self.service.quick_info(&self.fs, path, offset)
    }

    /// Dispose the language service. Idempotent.
    pub fn dispose(&mut self) {
        if !self.disposed {
            self.service.dispose();
            self.disposed = true;
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
