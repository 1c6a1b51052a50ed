//! Argument stream
//!
//! Arguments are packed back to back in little-endian order with no tags in
//! between; the schema is fixed per verb. Strings are a `u32` byte length
//! followed by UTF-8 bytes without a terminator. Handles travel as `u64`.
//!
//! [`ArgStream`] is the worker-side cursor. [`ArgWriter`] produces the same
//! layout on the host side and in tests.

use lumen_core::Handle;

use crate::error::{DispatchError, DispatchResult};

/// A fixed-width value that can travel in an argument blob
pub trait WireValue: Sized + Copy {
    /// Encoded width in bytes
    const SIZE: usize;

    /// Decode from exactly `SIZE` little-endian bytes
    fn read_le(bytes: &[u8]) -> Self;

    /// Append the little-endian encoding to `out`
    fn write_le(self, out: &mut Vec<u8>);
}

macro_rules! impl_wire_value {
    ($($ty:ty),*) => {
        $(
            impl WireValue for $ty {
                const SIZE: usize = std::mem::size_of::<$ty>();

                #[inline]
                fn read_le(bytes: &[u8]) -> Self {
                    let mut raw = [0u8; std::mem::size_of::<$ty>()];
                    raw.copy_from_slice(&bytes[..Self::SIZE]);
                    <$ty>::from_le_bytes(raw)
                }

                #[inline]
                fn write_le(self, out: &mut Vec<u8>) {
                    out.extend_from_slice(&self.to_le_bytes());
                }
            }
        )*
    };
}

impl_wire_value!(u8, i8, u16, i16, u32, i32, u64, i64, f32, f64);

impl<T: WireValue, const N: usize> WireValue for [T; N] {
    const SIZE: usize = T::SIZE * N;

    fn read_le(bytes: &[u8]) -> Self {
        std::array::from_fn(|i| T::read_le(&bytes[i * T::SIZE..]))
    }

    fn write_le(self, out: &mut Vec<u8>) {
        for value in self {
            value.write_le(out);
        }
    }
}

impl WireValue for Handle {
    const SIZE: usize = 8;

    fn read_le(bytes: &[u8]) -> Self {
        Handle::from_bits(u64::read_le(bytes))
    }

    fn write_le(self, out: &mut Vec<u8>) {
        self.to_bits().write_le(out);
    }
}

/// Forward-only cursor over an argument blob
#[derive(Debug, Clone)]
pub struct ArgStream<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> ArgStream<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    /// Consume the next `len` raw bytes
    pub fn take(&mut self, len: usize) -> DispatchResult<&'a [u8]> {
        let remaining = self.remaining();
        if len > remaining {
            return Err(DispatchError::Truncated {
                wanted: len,
                remaining,
            });
        }
        let slice = &self.bytes[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    /// Consume one fixed-width value
    pub fn get<T: WireValue>(&mut self) -> DispatchResult<T> {
        self.take(T::SIZE).map(T::read_le)
    }

    pub fn get_handle(&mut self) -> DispatchResult<Handle> {
        self.get()
    }

    /// Consume a length-prefixed string
    pub fn get_string(&mut self) -> DispatchResult<String> {
        let len = self.get::<u32>()? as usize;
        let bytes = self.take(len)?;
        Ok(std::str::from_utf8(bytes)?.to_owned())
    }

    /// Bytes consumed so far
    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.bytes.len() - self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }
}

/// Packs arguments in the layout [`ArgStream`] reads
#[derive(Debug, Clone, Default)]
pub struct ArgWriter {
    bytes: Vec<u8>,
}

impl ArgWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put<T: WireValue>(&mut self, value: T) -> &mut Self {
        value.write_le(&mut self.bytes);
        self
    }

    pub fn put_handle(&mut self, handle: Handle) -> &mut Self {
        self.put(handle)
    }

    /// Append a length-prefixed string
    pub fn put_string(&mut self, value: &str) -> &mut Self {
        self.put(value.len() as u32);
        self.bytes.extend_from_slice(value.as_bytes());
        self
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn finish(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.bytes)
    }
}
