//! Error types for the engine

use std::path::PathBuf;

use lumen_core::{DataType, HandleError, TypeError};
use thiserror::Error;

/// Engine errors
#[derive(Debug, Error)]
pub enum EngineError {
    /// No constructor registered for the type name
    #[error("Unknown {kind} type '{name}'")]
    UnknownType {
        /// Object family, e.g. "geometry"
        kind: &'static str,
        /// Requested type name
        name: String,
    },

    /// Object is not of the kind the operation needs
    #[error("Expected a {expected} object, found {found}")]
    WrongKind {
        expected: &'static str,
        found: &'static str,
    },

    /// Element type cannot back a data array
    #[error("Unsupported data type: {0}")]
    UnsupportedDataType(DataType),

    /// A supplied region is shorter than the declared contents
    #[error("Buffer too small: need {needed} bytes, have {available}")]
    BufferTooSmall { needed: usize, available: usize },

    /// Byte range outside of a region
    #[error("Range {begin}..{end} out of bounds for {len} bytes")]
    OutOfRange { begin: usize, end: usize, len: usize },

    /// Object slots have been resolved, raw writes are no longer allowed
    #[error("Data array is sealed after object resolution")]
    DataSealed,

    /// Parameter present but unusable
    #[error("Invalid parameter '{name}': {reason}")]
    InvalidParam { name: String, reason: String },

    /// Buffer was unmapped by the transport
    #[error("Buffer is no longer mapped")]
    BufferUnmapped,

    #[error(transparent)]
    Handle(#[from] HandleError),

    #[error(transparent)]
    Type(#[from] TypeError),

    /// Volume file could not be read
    #[error("Failed to read volume file '{path}': {source}")]
    VolumeFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A render thread panicked
    #[error("Render worker panicked")]
    RenderWorker,
}

impl EngineError {
    /// Shorthand for [`EngineError::InvalidParam`]
    pub fn invalid_param(name: &str, reason: impl Into<String>) -> Self {
        Self::InvalidParam {
            name: name.to_string(),
            reason: reason.into(),
        }
    }
}

/// Result type for engine operations
pub type EngineResult<T> = std::result::Result<T, EngineError>;
