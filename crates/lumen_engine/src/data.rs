//! Typed data arrays
//!
//! A [`Data`] is a contiguous byte region described by an element count and
//! an element type. The region either aliases a retained transport buffer
//! (shared data) or is a local allocation filled by chunked uploads.
//!
//! Object arrays arrive as packed 64-bit handles. Resolving them takes an
//! owning reference to every named object and overwrites each slot in place
//! with the local object address. Resolution happens at most once per array.

use std::fmt;

use bytemuck::Pod;
use lumen_core::{DataType, Handle, POINTER_WIDTH};
use lumen_math::{Vec3, Vec4};

use crate::buffer::RetainedBuffer;
use crate::error::{EngineError, EngineResult};
use crate::object::{ObjectRef, ObjectRegistry};

/// Memory is owned by the transport and must never be freed locally
pub const DATA_SHARED_BUFFER: u32 = 1 << 0;

enum Region {
    Owned(Vec<u8>),
    Shared(RetainedBuffer),
}

/// A typed contiguous memory region
pub struct Data {
    count: usize,
    element_type: DataType,
    flags: u32,
    region: Region,
    objects: Option<Vec<Option<ObjectRef>>>,
}

impl Data {
    /// Alias a retained transport buffer
    pub fn shared(
        count: usize,
        element_type: DataType,
        flags: u32,
        buffer: RetainedBuffer,
    ) -> EngineResult<Self> {
        check_element_type(element_type)?;
        let needed = element_type.byte_len(count);
        if buffer.len() < needed {
            return Err(EngineError::BufferTooSmall {
                needed,
                available: buffer.len(),
            });
        }
        Ok(Self {
            count,
            element_type,
            flags: flags | DATA_SHARED_BUFFER,
            region: Region::Shared(buffer),
            objects: None,
        })
    }

    /// Allocate a zero-filled local region
    pub fn zeroed(count: usize, element_type: DataType, flags: u32) -> EngineResult<Self> {
        check_element_type(element_type)?;
        Self::from_bytes(count, element_type, flags, vec![0; element_type.byte_len(count)])
    }

    /// Take ownership of a local byte region
    pub fn from_bytes(
        count: usize,
        element_type: DataType,
        flags: u32,
        bytes: Vec<u8>,
    ) -> EngineResult<Self> {
        check_element_type(element_type)?;
        let needed = element_type.byte_len(count);
        if bytes.len() != needed {
            return Err(EngineError::BufferTooSmall {
                needed,
                available: bytes.len(),
            });
        }
        Ok(Self {
            count,
            element_type,
            flags: flags & !DATA_SHARED_BUFFER,
            region: Region::Owned(bytes),
            objects: None,
        })
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn element_type(&self) -> DataType {
        self.element_type
    }

    pub fn flags(&self) -> u32 {
        self.flags
    }

    /// Size of the described region in bytes
    pub fn byte_len(&self) -> usize {
        self.element_type.byte_len(self.count)
    }

    /// Whether the region aliases transport memory
    pub fn is_shared(&self) -> bool {
        self.flags & DATA_SHARED_BUFFER != 0
    }

    /// The transport buffer backing a shared region
    pub fn shared_buffer(&self) -> Option<&RetainedBuffer> {
        match &self.region {
            Region::Shared(buffer) => Some(buffer),
            Region::Owned(_) => None,
        }
    }

    /// Run `f` over the region's bytes
    pub fn with_bytes<R>(&self, f: impl FnOnce(&[u8]) -> R) -> R {
        let len = self.byte_len();
        match &self.region {
            Region::Owned(bytes) => f(bytes),
            Region::Shared(buffer) => f(&buffer.read()[..len]),
        }
    }

    /// Copy the region out
    pub fn to_vec(&self) -> Vec<u8> {
        self.with_bytes(<[u8]>::to_vec)
    }

    /// Copy `src` into the region at byte offset `begin`
    pub fn write_bytes(&mut self, begin: usize, src: &[u8]) -> EngineResult<()> {
        if self.objects.is_some() {
            return Err(EngineError::DataSealed);
        }
        let len = self.byte_len();
        let end = begin
            .checked_add(src.len())
            .filter(|end| *end <= len)
            .ok_or(EngineError::OutOfRange {
                begin,
                end: begin.saturating_add(src.len()),
                len,
            })?;
        match &mut self.region {
            Region::Owned(bytes) => bytes[begin..end].copy_from_slice(src),
            Region::Shared(buffer) => buffer.write()[begin..end].copy_from_slice(src),
        }
        Ok(())
    }

    /// Whether the handle slots have been rewritten to object references
    pub fn is_resolved(&self) -> bool {
        self.objects.is_some()
    }

    /// Resolved object references, one per element
    pub fn objects(&self) -> Option<&[Option<ObjectRef>]> {
        self.objects.as_deref()
    }

    /// Non-null resolved objects, in element order
    pub fn object_iter(&self) -> impl Iterator<Item = &ObjectRef> {
        self.objects.iter().flatten().flatten()
    }

    /// Rewrite packed handles into object references
    ///
    /// Returns `Ok(false)` without touching anything when the array does not
    /// hold objects or was already resolved. Every non-null handle must be
    /// bound; nothing is rewritten if one is not.
    pub fn resolve_objects(&mut self, registry: &ObjectRegistry) -> EngineResult<bool> {
        if !self.element_type.is_object() || self.objects.is_some() {
            return Ok(false);
        }

        let handles = self.with_bytes(|bytes| {
            bytes
                .chunks_exact(POINTER_WIDTH)
                .map(|slot| Handle::from_bits(u64::from_le(bytemuck::pod_read_unaligned(slot))))
                .collect::<Vec<_>>()
        });

        let mut objects = Vec::with_capacity(handles.len());
        for handle in handles {
            objects.push(registry.lookup(handle)?.cloned());
        }

        let mut rewritten = Vec::with_capacity(self.byte_len());
        for obj in &objects {
            let addr = obj.as_ref().map_or(0, ObjectRef::addr);
            rewritten.extend_from_slice(&addr.to_le_bytes());
        }
        match &mut self.region {
            Region::Owned(bytes) => bytes.copy_from_slice(&rewritten),
            Region::Shared(buffer) => {
                let len = rewritten.len();
                buffer.write()[..len].copy_from_slice(&rewritten);
            }
        }

        self.objects = Some(objects);
        Ok(true)
    }

    /// Positions from a float3, float3a or float4 array
    pub fn vec3s(&self) -> EngineResult<Vec<Vec3>> {
        let stride = match self.element_type {
            DataType::Float3 => 12,
            DataType::Float3A | DataType::Float4 => 16,
            other => return Err(EngineError::UnsupportedDataType(other)),
        };
        Ok(self.with_bytes(|bytes| {
            bytes
                .chunks_exact(stride)
                .map(|chunk| bytemuck::pod_read_unaligned::<Vec3>(&chunk[..12]))
                .collect()
        }))
    }

    /// RGBA values from a float4 array, or opaque colors from float3
    pub fn vec4s(&self) -> EngineResult<Vec<Vec4>> {
        match self.element_type {
            DataType::Float4 => Ok(self.read_pod::<Vec4>()),
            DataType::Float3 | DataType::Float3A => {
                Ok(self.vec3s()?.into_iter().map(|v| v.extend(1.0)).collect())
            }
            other => Err(EngineError::UnsupportedDataType(other)),
        }
    }

    /// Pairs from a float2 array
    pub fn vec2s(&self) -> EngineResult<Vec<[f32; 2]>> {
        match self.element_type {
            DataType::Float2 => Ok(self.read_pod::<[f32; 2]>()),
            other => Err(EngineError::UnsupportedDataType(other)),
        }
    }

    /// Scalars from a float array
    pub fn floats(&self) -> EngineResult<Vec<f32>> {
        match self.element_type {
            DataType::Float => Ok(self.read_pod::<f32>()),
            other => Err(EngineError::UnsupportedDataType(other)),
        }
    }

    /// Flattened components of an int or uint array of any width
    pub fn ints(&self) -> EngineResult<Vec<i32>> {
        match self.element_type {
            DataType::Int
            | DataType::Int2
            | DataType::Int3
            | DataType::Int4
            | DataType::UInt
            | DataType::UInt2
            | DataType::UInt3
            | DataType::UInt4 => Ok(self.read_pod::<i32>()),
            other => Err(EngineError::UnsupportedDataType(other)),
        }
    }

    /// Scalar elements widened to f32
    pub fn scalars(&self) -> EngineResult<Vec<f32>> {
        self.with_bytes(|bytes| decode_scalars(bytes, self.element_type))
    }

    fn read_pod<T: Pod>(&self) -> Vec<T> {
        let size = std::mem::size_of::<T>();
        self.with_bytes(|bytes| {
            bytes
                .chunks_exact(size)
                .map(bytemuck::pod_read_unaligned::<T>)
                .collect()
        })
    }
}

impl fmt::Debug for Data {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Data")
            .field("count", &self.count)
            .field("element_type", &self.element_type)
            .field("flags", &self.flags)
            .field("resolved", &self.is_resolved())
            .finish()
    }
}

fn check_element_type(element_type: DataType) -> EngineResult<()> {
    match element_type {
        DataType::String => Err(EngineError::UnsupportedDataType(element_type)),
        _ => Ok(()),
    }
}

/// Decode packed little-endian scalars of type `ty` into f32
pub fn decode_scalars(bytes: &[u8], ty: DataType) -> EngineResult<Vec<f32>> {
    fn widen<T: Pod>(bytes: &[u8], f: impl Fn(T) -> f32) -> Vec<f32> {
        bytes
            .chunks_exact(std::mem::size_of::<T>())
            .map(|chunk| f(bytemuck::pod_read_unaligned::<T>(chunk)))
            .collect()
    }

    Ok(match ty {
        DataType::UChar => bytes.iter().map(|b| *b as f32).collect(),
        DataType::Char => bytes.iter().map(|b| *b as i8 as f32).collect(),
        DataType::UShort => widen::<u16>(bytes, |v| v as f32),
        DataType::Int => widen::<i32>(bytes, |v| v as f32),
        DataType::UInt => widen::<u32>(bytes, |v| v as f32),
        DataType::Float => widen::<f32>(bytes, |v| v),
        DataType::Double => widen::<f64>(bytes, |v| v as f32),
        other => return Err(EngineError::UnsupportedDataType(other)),
    })
}
