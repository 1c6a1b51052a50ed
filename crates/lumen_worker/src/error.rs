//! Dispatch errors
//!
//! Apart from the unknown-material case, which travels back through the
//! return slot, and `set_value` on an unbound handle, which is dropped, every
//! error here ends the worker.

use lumen_core::{Handle, HandleError};
use lumen_engine::EngineError;
use thiserror::Error;

/// Errors raised while executing a command
#[derive(Debug, Error)]
pub enum DispatchError {
    /// A bulk buffer could not be retained
    #[error("Transport error: {0}")]
    Transport(String),

    /// The type tag is not accepted by this verb
    #[error("Unsupported type tag {type_tag} for {verb}")]
    UnsupportedType { verb: &'static str, type_tag: u32 },

    /// Neither the renderer nor the global catalogue knows the light type
    #[error("Unknown light type '{0}'")]
    UnknownLightType(String),

    /// A required handle has no binding
    #[error("Unknown handle {0:?}")]
    UnknownHandle(Handle),

    /// The argument blob ended early
    #[error("Argument stream truncated: wanted {wanted} bytes, {remaining} left")]
    Truncated { wanted: usize, remaining: usize },

    #[error("String argument is not valid UTF-8: {0}")]
    InvalidUtf8(#[from] std::str::Utf8Error),

    #[error("Unknown verb id {0}")]
    UnknownVerb(u32),

    /// The command carried fewer bulk buffers than the verb needs
    #[error("{verb} needs bulk buffer #{index}")]
    MissingBuffer { verb: &'static str, index: usize },

    /// `upload_data_chunk` arrived before any `pin_upload_buffer`
    #[error("No upload buffer is pinned")]
    NoUploadBuffer,

    #[error("Upload chunk at {begin} of {size} bytes does not fit (staging buffer holds {available})")]
    UploadOutOfRange { begin: i64, size: i64, available: usize },

    /// The handle is bound to an object of another kind
    #[error("Expected a {expected} object, found {found}")]
    WrongKind {
        expected: &'static str,
        found: &'static str,
    },

    #[error(transparent)]
    Engine(EngineError),

    #[error(transparent)]
    Handle(HandleError),
}

impl From<HandleError> for DispatchError {
    fn from(e: HandleError) -> Self {
        match e {
            HandleError::Unbound(handle) => Self::UnknownHandle(handle),
            other => Self::Handle(other),
        }
    }
}

impl From<EngineError> for DispatchError {
    fn from(e: EngineError) -> Self {
        match e {
            EngineError::WrongKind { expected, found } => Self::WrongKind { expected, found },
            EngineError::BufferUnmapped => Self::Transport("buffer is no longer mapped".to_string()),
            EngineError::Handle(e) => e.into(),
            other => Self::Engine(other),
        }
    }
}

/// Result type for dispatch
pub type DispatchResult<T> = std::result::Result<T, DispatchError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_error_mapping() {
        let e: DispatchError = EngineError::WrongKind {
            expected: "model",
            found: "camera",
        }
        .into();
        assert!(matches!(e, DispatchError::WrongKind { expected: "model", found: "camera" }));

        let e: DispatchError = EngineError::BufferUnmapped.into();
        assert!(matches!(e, DispatchError::Transport(_)));

        let h = Handle::new(3, 0);
        let e: DispatchError = EngineError::Handle(HandleError::Unbound(h)).into();
        assert!(matches!(e, DispatchError::UnknownHandle(u) if u == h));

        let e: DispatchError = HandleError::AlreadyBound(h).into();
        assert!(matches!(e, DispatchError::Handle(HandleError::AlreadyBound(_))));

        let e: DispatchError = EngineError::DataSealed.into();
        assert!(matches!(e, DispatchError::Engine(EngineError::DataSealed)));
    }
}
