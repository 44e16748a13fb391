//! Error types for the strategy editor.

use thiserror::Error;

/// Result type alias using the editor's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for the strategy editor.
///
/// Local and remote validation findings are *not* errors: they are terminal
/// states of their producers and surface as diagnostics. Only transport
/// anomalies and ordering violations are raised through this type.
#[derive(Error, Debug)]
pub enum Error {
    // =========================================================================
    // Document Errors
    // =========================================================================
    #[error("Edit range {from}..{to} is outside the document (length {len})")]
    InvalidRange { from: usize, to: usize, len: usize },

    #[error("Line {0} does not exist")]
    LineOutOfRange(usize),

    // =========================================================================
    // Sandbox Errors
    // =========================================================================
    #[error("Sandbox is not initialized; cannot write '{path}'")]
    SandboxUninitialized { path: String },

    #[error("Sandbox error: {0}")]
    Sandbox(String),

    #[error("Failed to load declaration files: {0}")]
    DeclarationLoad(String),

    // =========================================================================
    // Validation Errors
    // =========================================================================
    #[error("Transport error (status {status:?}): {message}")]
    Transport {
        status: Option<u16>,
        message: String,
    },

    #[error("Validation pipeline closed")]
    PipelineClosed,

    // =========================================================================
    // Configuration Errors
    // =========================================================================
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    // =========================================================================
    // Generic Errors
    // =========================================================================
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl Error {
    /// Create a sandbox error.
    pub fn sandbox(msg: impl Into<String>) -> Self {
        Self::Sandbox(msg.into())
    }

    /// Create a declaration loading error.
    pub fn declaration_load(msg: impl Into<String>) -> Self {
        Self::DeclarationLoad(msg.into())
    }

    /// Create a transport error without an HTTP status (connection, decoding).
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport {
            status: None,
            message: msg.into(),
        }
    }

    /// Create a transport error for an unexpected HTTP status.
    pub fn unexpected_status(status: u16, msg: impl Into<String>) -> Self {
        Self::Transport {
            status: Some(status),
            message: msg.into(),
        }
    }

    /// Create an ordering error for a library written before the sandbox exists.
    pub fn sandbox_uninitialized(path: impl Into<String>) -> Self {
        Self::SandboxUninitialized { path: path.into() }
    }

    /// Create an internal error.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Whether this error is fatal for the caller and must not be retried.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::SandboxUninitialized { .. } | Self::Transport { .. } | Self::PipelineClosed
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_error_display() {
        let err = Error::unexpected_status(500, "Internal Server Error");
        assert_eq!(
            err.to_string(),
            "Transport error (status Some(500)): Internal Server Error"
        );
        assert!(err.is_fatal());
    }

    #[test]
    fn test_uninitialized_names_path() {
        let err = Error::sandbox_uninitialized("/universe.ts");
        assert!(err.to_string().contains("/universe.ts"));
        assert!(err.is_fatal());
        assert!(!Error::internal("x").is_fatal());
    }
}
