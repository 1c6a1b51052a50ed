//! Externally mapped bulk buffers
//!
//! The transport owns every bulk buffer that arrives with a command. Engine
//! objects that alias one (shared data arrays, textures, framebuffer pixels)
//! hold a [`RetainedBuffer`], which keeps the mapping alive and bumps the
//! retention count the transport tracks. Dropping the retain never frees
//! anything on the engine side.

use std::fmt;
use std::ops::Deref;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::error::{EngineError, EngineResult};

/// Shared read view of buffer bytes
pub type BytesRef<'a> = RwLockReadGuard<'a, Box<[u8]>>;
/// Exclusive write view of buffer bytes
pub type BytesMut<'a> = RwLockWriteGuard<'a, Box<[u8]>>;

struct BufferInner {
    bytes: RwLock<Box<[u8]>>,
    retains: AtomicU32,
    mapped: AtomicBool,
}

/// A bulk buffer mapped into the worker by the transport
#[derive(Clone)]
pub struct MappedBuffer {
    inner: Arc<BufferInner>,
}

impl MappedBuffer {
    /// Map a buffer holding `bytes`
    pub fn new(bytes: Vec<u8>) -> Self {
        Self {
            inner: Arc::new(BufferInner {
                bytes: RwLock::new(bytes.into_boxed_slice()),
                retains: AtomicU32::new(0),
                mapped: AtomicBool::new(true),
            }),
        }
    }

    /// Map a zero-filled buffer of `len` bytes
    pub fn zeroed(len: usize) -> Self {
        Self::new(vec![0; len])
    }

    pub fn len(&self) -> usize {
        self.inner.bytes.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Borrow the bytes for reading
    pub fn read(&self) -> BytesRef<'_> {
        self.inner.bytes.read()
    }

    /// Borrow the bytes for writing
    pub fn write(&self) -> BytesMut<'_> {
        self.inner.bytes.write()
    }

    /// Copy the current contents out
    pub fn to_vec(&self) -> Vec<u8> {
        self.read().to_vec()
    }

    /// Retain the buffer so it stays mapped while an engine object aliases it
    pub fn retain(&self) -> EngineResult<RetainedBuffer> {
        if !self.is_mapped() {
            return Err(EngineError::BufferUnmapped);
        }
        self.inner.retains.fetch_add(1, Ordering::AcqRel);
        Ok(RetainedBuffer {
            buffer: self.clone(),
        })
    }

    /// Number of outstanding retains
    pub fn retain_count(&self) -> u32 {
        self.inner.retains.load(Ordering::Acquire)
    }

    /// Mark the buffer as unmapped by the transport
    ///
    /// Outstanding retains keep the memory reachable; new retains fail.
    pub fn unmap(&self) {
        self.inner.mapped.store(false, Ordering::Release);
    }

    pub fn is_mapped(&self) -> bool {
        self.inner.mapped.load(Ordering::Acquire)
    }

    /// Whether both values refer to the same mapping
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for MappedBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MappedBuffer")
            .field("len", &self.len())
            .field("retains", &self.retain_count())
            .field("mapped", &self.is_mapped())
            .finish()
    }
}

/// A retain on a [`MappedBuffer`], released on drop
pub struct RetainedBuffer {
    buffer: MappedBuffer,
}

impl RetainedBuffer {
    /// The underlying mapping
    pub fn buffer(&self) -> &MappedBuffer {
        &self.buffer
    }
}

impl Deref for RetainedBuffer {
    type Target = MappedBuffer;

    fn deref(&self) -> &MappedBuffer {
        &self.buffer
    }
}

impl Clone for RetainedBuffer {
    fn clone(&self) -> Self {
        self.buffer.inner.retains.fetch_add(1, Ordering::AcqRel);
        Self {
            buffer: self.buffer.clone(),
        }
    }
}

impl Drop for RetainedBuffer {
    fn drop(&mut self) {
        self.buffer.inner.retains.fetch_sub(1, Ordering::AcqRel);
    }
}

impl fmt::Debug for RetainedBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("RetainedBuffer").field(&self.buffer).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retain_release() {
        let buffer = MappedBuffer::new(vec![1, 2, 3]);
        assert_eq!(buffer.retain_count(), 0);

        let retained = buffer.retain().unwrap();
        let second = retained.clone();
        assert_eq!(buffer.retain_count(), 2);

        drop(retained);
        assert_eq!(buffer.retain_count(), 1);
        drop(second);
        assert_eq!(buffer.retain_count(), 0);

        // Releasing never frees the transport's memory
        assert_eq!(buffer.to_vec(), vec![1, 2, 3]);
    }

    #[test]
    fn test_retain_after_unmap_fails() {
        let buffer = MappedBuffer::zeroed(4);
        let retained = buffer.retain().unwrap();
        buffer.unmap();

        assert!(matches!(buffer.retain(), Err(EngineError::BufferUnmapped)));
        assert_eq!(retained.len(), 4);
    }

    #[test]
    fn test_shared_writes_visible() {
        let buffer = MappedBuffer::zeroed(2);
        let alias = buffer.retain().unwrap();
        alias.write()[1] = 7;
        assert_eq!(buffer.read()[1], 7);
        assert!(alias.buffer().ptr_eq(&buffer));
    }
}
