//! Error types for the core library

use core::fmt;

use crate::handle::Handle;

/// The core error type
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Handle error
    Handle(HandleError),
    /// Type catalogue error
    Type(TypeError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Handle(e) => write!(f, "Handle error: {}", e),
            Error::Type(e) => write!(f, "Type error: {}", e),
        }
    }
}

impl std::error::Error for Error {}

/// Result type alias
pub type Result<T> = core::result::Result<T, Error>;

/// Handle registry errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleError {
    /// Handle is null where an object is required
    Null,
    /// No object is bound to the handle
    Unbound(Handle),
    /// The handle is already bound to an object
    AlreadyBound(Handle),
}

impl fmt::Display for HandleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HandleError::Null => write!(f, "Handle is null"),
            HandleError::Unbound(h) => write!(f, "No object bound to handle {:?}", h),
            HandleError::AlreadyBound(h) => write!(f, "Handle {:?} is already bound", h),
        }
    }
}

impl std::error::Error for HandleError {}

impl From<HandleError> for Error {
    fn from(e: HandleError) -> Self {
        Error::Handle(e)
    }
}

/// Type catalogue errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeError {
    /// Raw data type tag not in the catalogue
    UnknownDataType(u32),
    /// Raw texture format tag not in the catalogue
    UnknownTextureFormat(u32),
    /// Type name not in the catalogue
    UnknownTypeName(Box<str>),
}

impl fmt::Display for TypeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeError::UnknownDataType(raw) => write!(f, "Unknown data type tag {}", raw),
            TypeError::UnknownTextureFormat(raw) => write!(f, "Unknown texture format {}", raw),
            TypeError::UnknownTypeName(name) => write!(f, "Unknown type name '{}'", name),
        }
    }
}

impl std::error::Error for TypeError {}

impl From<TypeError> for Error {
    fn from(e: TypeError) -> Self {
        Error::Type(e)
    }
}
