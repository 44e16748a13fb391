//! Collaborator contracts for the strategy editor.
//!
//! Traits are organized by the collaborator they describe:
//! - `remote`: backend services (RemoteValidator, UniverseProvider)
//! - `editor`: the editor-view adapter (EditorView, EditorViewFactory)

pub mod editor;
pub mod remote;

pub use editor::*;
pub use remote::*;
