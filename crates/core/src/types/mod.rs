//! Core type definitions for the strategy editor.
//!
//! Broken down into submodules by the collaborator that produces them.

pub mod diagnostic;
pub mod universe;
pub mod validation;

pub use diagnostic::*;
pub use universe::*;
pub use validation::*;
