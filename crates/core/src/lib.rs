#![deny(unused)]
//! Core types, traits, and error definitions for the strategy editor.
//!
//! This crate holds the pieces shared by the sandbox and validation layers:
//! the line-indexed document, the pure editor policies (error location
//! mapping, protected header, line decorations), and the contracts of the
//! external collaborators.

pub mod config;
pub mod decorations;
pub mod document;
pub mod error;
pub mod location;
pub mod mocks;
pub mod protected;
pub mod traits;
pub mod types;
pub mod view;

pub use decorations::{decorate_lines, LineDecoration};
pub use document::{Line, TextChange, TextDocument};
pub use error::{Error, Result};
pub use location::{map_offset_to_line, parser_error_diagnostic, LineRange};
pub use protected::{EditOrigin, ProtectedRegionPolicy};
pub use traits::*;
pub use types::*;
pub use view::{HeadlessView, HeadlessViewFactory};
