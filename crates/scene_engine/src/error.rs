//! Error types shared across the engine
//!
//! Structural misuse (cycles, foreign nodes, missing pickers) is reported as
//! [`EngineError::InvalidOperation`] synchronously at the call site. A missing
//! graphics context is [`EngineError::ResourceUnavailable`]. A pick that hits
//! nothing is not an error at all.

use thiserror::Error;

use crate::config::ConfigError;
use crate::render::api::GraphicsError;

/// Boxed error returned by host-provided listeners
pub type ListenerError = Box<dyn std::error::Error + Send + Sync>;

/// Engine errors
#[derive(Error, Debug)]
pub enum EngineError {
    /// Structural misuse of the scene graph or an engine
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    /// No graphics context is bound
    #[error("Resource unavailable: {0}")]
    ResourceUnavailable(String),

    /// The graphics context rejected a request
    #[error("Graphics error: {0}")]
    Graphics(#[from] GraphicsError),

    /// A pick or scene listener failed
    #[error("Listener {index} failed: {source}")]
    Listener {
        /// Registration order of the failing listener
        index: usize,
        /// Error reported by the listener
        source: ListenerError,
    },

    /// Configuration could not be loaded or is invalid
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl EngineError {
    /// Shorthand for [`EngineError::InvalidOperation`]
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidOperation(message.into())
    }

    /// Whether this is a structural misuse error
    pub const fn is_invalid_operation(&self) -> bool {
        matches!(self, Self::InvalidOperation(_))
    }

    /// Whether this reports a missing graphics context
    pub const fn is_resource_unavailable(&self) -> bool {
        matches!(self, Self::ResourceUnavailable(_))
    }
}

/// Result type for engine operations
pub type EngineResult<T> = Result<T, EngineError>;
