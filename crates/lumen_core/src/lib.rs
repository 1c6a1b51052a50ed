//! # lumen_core - Lumen Core
//!
//! Zero-dependency primitives shared by the engine and the command worker:
//! - **Handles**: host-minted 64-bit identities and the registry binding them
//!   to worker-side objects
//! - **Type catalogue**: element widths and canonical names for every data
//!   type tag and texture format understood on the wire
//! - **Errors**: the small error vocabulary of the above

pub mod handle;
pub mod types;
pub mod error;

pub use handle::*;
pub use types::*;
pub use error::*;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::handle::{Handle, HandleMinter, HandleRegistry, NULL_HANDLE};
    pub use crate::types::{DataType, TextureFormat, POINTER_WIDTH};
    pub use crate::error::{Error, HandleError, Result, TypeError};
}
