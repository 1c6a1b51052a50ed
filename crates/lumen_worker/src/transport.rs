//! Pipe transport
//!
//! A minimal stand-in for the offload transport: frames are a `u32`
//! little-endian length followed by a bincode body. The host maps buffers by
//! id, then sends commands that name the buffers they carry. The worker
//! answers every command with [`WorkerReply::Done`] and stops at
//! [`HostMessage::Shutdown`] or end of input.

use std::collections::HashMap;
use std::io::{self, Read, Write};

use lumen_engine::MappedBuffer;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::dispatch::Dispatcher;
use crate::error::DispatchError;
use crate::frame::CommandFrame;

/// Maximum frame size (256 MB)
pub const MAX_FRAME_SIZE: usize = 256 * 1024 * 1024;

/// Host to worker messages
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum HostMessage {
    /// Make a buffer available under `id`
    MapBuffer { id: u64, bytes: Vec<u8> },
    /// Withdraw a buffer
    UnmapBuffer { id: u64 },
    /// Run one verb
    Command {
        verb: u32,
        buffers: Vec<u64>,
        args: Vec<u8>,
        ret_len: u32,
    },
    /// Ask for the current contents of a buffer
    ReadBuffer { id: u64 },
    Shutdown,
}

/// Worker to host replies
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum WorkerReply {
    /// The command finished; `ret` is the return slot
    Done { ret: Vec<u8> },
    Buffer { id: u64, bytes: Vec<u8> },
    /// The worker is about to exit
    Fatal { message: String },
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Frame codec error: {0}")]
    Codec(#[from] bincode::Error),

    #[error("Frame too large: {size} bytes (max: {max})")]
    FrameTooLarge { size: usize, max: usize },

    #[error("Unknown buffer id {0}")]
    UnknownBuffer(u64),

    #[error(transparent)]
    Dispatch(#[from] DispatchError),
}

/// Write one length-prefixed frame
pub fn write_frame<W: Write, T: Serialize>(writer: &mut W, message: &T) -> Result<(), TransportError> {
    let body = bincode::serialize(message)?;
    if body.len() > MAX_FRAME_SIZE {
        return Err(TransportError::FrameTooLarge {
            size: body.len(),
            max: MAX_FRAME_SIZE,
        });
    }

    writer.write_all(&(body.len() as u32).to_le_bytes())?;
    writer.write_all(&body)?;
    writer.flush()?;
    Ok(())
}

/// Read one length-prefixed frame; `None` on a clean end of input
pub fn read_frame<R: Read, T: DeserializeOwned>(reader: &mut R) -> Result<Option<T>, TransportError> {
    let mut header = [0u8; 4];
    match reader.read_exact(&mut header) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e.into()),
    }

    let len = u32::from_le_bytes(header) as usize;
    if len > MAX_FRAME_SIZE {
        return Err(TransportError::FrameTooLarge {
            size: len,
            max: MAX_FRAME_SIZE,
        });
    }

    let mut body = vec![0u8; len];
    reader.read_exact(&mut body)?;
    Ok(Some(bincode::deserialize(&body)?))
}

/// Serves host messages from a reader, replying on a writer
pub struct PipeTransport<R, W> {
    reader: R,
    writer: W,
    mapped: HashMap<u64, MappedBuffer>,
}

impl<R: Read, W: Write> PipeTransport<R, W> {
    pub fn new(reader: R, writer: W) -> Self {
        Self {
            reader,
            writer,
            mapped: HashMap::new(),
        }
    }

    /// Buffers currently mapped, by id
    pub fn mapped(&self) -> &HashMap<u64, MappedBuffer> {
        &self.mapped
    }

    /// Serve until `Shutdown` or end of input
    ///
    /// A failing command is reported to the host as [`WorkerReply::Fatal`]
    /// and ends the loop with the error.
    pub fn serve(&mut self, dispatcher: &mut Dispatcher) -> Result<(), TransportError> {
        while let Some(message) = read_frame::<_, HostMessage>(&mut self.reader)? {
            match self.handle(dispatcher, message) {
                Ok(true) => {}
                Ok(false) => {
                    log::info!("Shutdown requested");
                    return Ok(());
                }
                Err(e) => {
                    let fatal = WorkerReply::Fatal {
                        message: e.to_string(),
                    };
                    if let Err(send) = write_frame(&mut self.writer, &fatal) {
                        log::warn!("Could not report fatal error to host: {}", send);
                    }
                    return Err(e);
                }
            }
        }
        log::info!("Host closed the pipe");
        Ok(())
    }

    /// Handle one message; `false` asks the loop to stop
    fn handle(&mut self, dispatcher: &mut Dispatcher, message: HostMessage) -> Result<bool, TransportError> {
        match message {
            HostMessage::MapBuffer { id, bytes } => {
                log::debug!("Mapped buffer {} ({} bytes)", id, bytes.len());
                if let Some(previous) = self.mapped.insert(id, MappedBuffer::new(bytes)) {
                    previous.unmap();
                }
            }
            HostMessage::UnmapBuffer { id } => {
                let buffer = self.mapped.remove(&id).ok_or(TransportError::UnknownBuffer(id))?;
                if buffer.retain_count() > 0 {
                    log::warn!("Unmapping buffer {} with {} live retain(s)", id, buffer.retain_count());
                }
                buffer.unmap();
            }
            HostMessage::Command {
                verb,
                buffers,
                args,
                ret_len,
            } => {
                let buffers = buffers
                    .into_iter()
                    .map(|id| self.mapped.get(&id).cloned().ok_or(TransportError::UnknownBuffer(id)))
                    .collect::<Result<Vec<_>, _>>()?;
                let mut frame = CommandFrame {
                    verb,
                    buffers,
                    args,
                    ret: Vec::new(),
                };
                dispatcher.dispatch(&mut frame)?;

                let mut ret = frame.ret;
                ret.resize(ret_len as usize, 0);
                write_frame(&mut self.writer, &WorkerReply::Done { ret })?;
            }
            HostMessage::ReadBuffer { id } => {
                let bytes = self.mapped.get(&id).ok_or(TransportError::UnknownBuffer(id))?.to_vec();
                write_frame(&mut self.writer, &WorkerReply::Buffer { id, bytes })?;
            }
            HostMessage::Shutdown => return Ok(false),
        }
        Ok(true)
    }

    pub fn into_inner(self) -> (R, W) {
        (self.reader, self.writer)
    }
}
