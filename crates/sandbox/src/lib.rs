#![deny(unused)]
//! Compilation sandbox for the strategy editor.
//!
//! Each editable document gets its own `SandboxEnvironment`: a virtual
//! filesystem layered over a shared, lazily downloaded snapshot of standard
//! declaration files, plus one language service answering diagnostics,
//! completions and hover queries for that filesystem.
//!
//! Language services come from an [`AnalysisBackend`]. The bundled
//! [`StructuralAnalysisBackend`] is a shallow headless fallback (brackets,
//! module imports, enum members) for `strategy-check` and the tests, not a
//! type checker.
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────────────────────────────┐
//! │  EditorSession (validation crate)      │
//! │    ↓ acquire / upsert_file / query     │
//! ├────────────────────────────────────────┤
//! │  SandboxManager                        │
//! │    ↓ snapshot cached once              │
//! ├────────────────────────────────────────┤
//! │  DeclarationSource (CDN / static)      │
//! │  AnalysisBackend → LanguageService     │
//! ├────────────────────────────────────────┤
//! │  SandboxEnvironment                    │
//! │    /index.ts, /helper-methods.ts,      │
//! │    /universe.ts over lib.*.d.ts        │
//! └────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use strategy_editor_sandbox::{CdnDeclarationSource, SandboxManager, StructuralAnalysisBackend};
//!
//! let source = Arc::new(CdnDeclarationSource::new(prefix, "3.7.3", vec![], timeout));
//! let manager = SandboxManager::new(source, Arc::new(StructuralAnalysisBackend::new()), options);
//!
//! let mut env = manager.acquire().await?;
//! upsert_file(Some(&mut env), HELPER_METHODS_PATH, helper_methods_module())?;
//! ```

pub mod analysis;
pub mod cdn;
pub mod engine;
pub mod hover;
pub mod library;
pub mod manager;
mod scan;

pub use analysis::{StructuralAnalysisBackend, StructuralService};
pub use cdn::{default_lib_files, CdnDeclarationSource};
pub use engine::{
    AnalysisBackend, CompilerOptions, CompletionEntry, DeclarationSnapshot, DeclarationSource,
    DiagnosticCategory, DisplayPart, DocTag, FileChange, LanguageService, QuickInfo,
    RawDiagnostic, SandboxEnvironment, SandboxId, ScriptTarget, StaticDeclarationSource,
    VirtualFile, VirtualFileSystem,
};
pub use hover::{render_hover, HoverContent, HoverSection};
pub use library::{
    helper_methods_module, universe_module, upsert_file, DEFAULT_STRATEGY, HELPER_METHODS_PATH,
    UNIVERSE_PATH,
};
pub use manager::SandboxManager;
