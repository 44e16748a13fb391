use async_trait::async_trait;

use crate::error::Result;
use crate::types::{Instrument, ValidationOutcome};

// =============================================================================
// Remote Service Traits
// =============================================================================

/// Remote service that understands strategy semantics.
#[async_trait]
pub trait RemoteValidator: Send + Sync {
    /// Validate a strategy document.
    ///
    /// Rejections and unexpected statuses are reported through the outcome;
    /// `Err` is reserved for failures that produced no status at all.
    async fn parse(&self, content: &str) -> Result<ValidationOutcome>;
}

/// Source of the selectable instrument universe.
#[async_trait]
pub trait UniverseProvider: Send + Sync {
    async fn get_universe(&self) -> Result<Vec<Instrument>>;
}
