//! Error types for polyload

use thiserror::Error;

use crate::engine::EngineError;
use crate::locator::ResolveError;

/// Main error type for asset loading
///
/// `Clone` so a single failure can be delivered to every request that was
/// waiting on the same URL.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LoadError {
    #[error("Invalid url: {0}")]
    Resolve(#[from] ResolveError),

    #[error("File extension -{extension}- not recognized, {name} did not load")]
    UnsupportedFormat { name: String, extension: String },

    #[error("Failed to load {url}: {source}")]
    Engine {
        url: String,
        #[source]
        source: EngineError,
    },

    #[error("Load of {0} was cancelled before it completed")]
    Cancelled(String),

    #[error("Invalid transform for {name}: {reason}")]
    Transform { name: String, reason: String },
}

impl LoadError {
    /// True for failures that no retry can fix (bad locator, unknown format).
    pub fn is_permanent(&self) -> bool {
        matches!(
            self,
            LoadError::Resolve(_) | LoadError::UnsupportedFormat { .. } | LoadError::Transform { .. }
        )
    }
}

/// Result type alias for asset loading
pub type Result<T> = std::result::Result<T, LoadError>;
