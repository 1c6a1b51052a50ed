//! # Lumen Worker
//!
//! Serves a stream of commands from a host process and drives the Lumen
//! engine with them. The host names every object with a [`Handle`] it mints
//! itself; the worker binds those handles to engine objects, decodes each
//! verb's packed arguments, applies graph edits and parameter writes, and
//! renders on request.
//!
//! ## Architecture
//!
//! ```text
//! transport ──► CommandFrame { verb, buffers, args, ret }
//!                    │
//!                    ▼
//!               Dispatcher ──► ArgStream (decode) ──► verb handler
//!                    │                                    │
//!                    ├── ObjectRegistry (handle table) ◄──┤
//!                    ├── BufferManager (retain, pinned upload)
//!                    └── Engine (factories, commit, render_frame)
//! ```
//!
//! [`Handle`]: lumen_core::Handle

pub mod error;
pub mod stream;
pub mod verb;
pub mod frame;
pub mod buffers;
pub mod logging;
pub mod dispatch;
pub mod config;
pub mod cpu;
pub mod transport;

pub use error::{DispatchError, DispatchResult};
pub use stream::{ArgStream, ArgWriter, WireValue};
pub use verb::Verb;
pub use frame::CommandFrame;
pub use buffers::BufferManager;
pub use logging::Diagnostics;
pub use dispatch::Dispatcher;
pub use config::{ConfigError, WorkerConfig};
pub use transport::{HostMessage, PipeTransport, TransportError, WorkerReply, MAX_FRAME_SIZE};
