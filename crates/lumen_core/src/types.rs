//! Type catalogue for data arrays, parameters and textures
//!
//! Every element type that can travel over the wire has a numeric tag, a
//! byte width and a canonical lowercase name. Object-reference kinds all
//! occupy a pointer-width slot.

use core::fmt;

use crate::error::TypeError;

/// Width of an object-reference slot
///
/// Object arrays arrive as packed 64-bit handles and are rewritten in place
/// to local object addresses, so a slot is always eight bytes wide.
pub const POINTER_WIDTH: usize = 8;

/// Element type tag
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u32)]
pub enum DataType {
    Device = 100,
    VoidPtr = 200,

    // Object references
    Object = 1000,
    Camera,
    Data,
    FrameBuffer,
    Geometry,
    Light,
    Material,
    Model,
    Renderer,
    Texture,
    TransferFunction,
    Volume,
    PixelOp,

    String = 1500,

    Char = 2000,

    UChar = 2500,
    UChar2,
    UChar3,
    UChar4,

    UShort = 3000,

    Int = 4000,
    Int2,
    Int3,
    Int4,

    UInt = 4500,
    UInt2,
    UInt3,
    UInt4,

    Long = 5000,
    Long2,
    Long3,
    Long4,

    ULong = 5550,
    ULong2,
    ULong3,
    ULong4,

    Float = 6000,
    Float2,
    Float3,
    Float4,
    /// float3 padded to 16 bytes
    Float3A,

    Double = 7000,
}

impl DataType {
    /// Every tag in the catalogue
    pub const ALL: [DataType; 44] = [
        DataType::Device,
        DataType::VoidPtr,
        DataType::Object,
        DataType::Camera,
        DataType::Data,
        DataType::FrameBuffer,
        DataType::Geometry,
        DataType::Light,
        DataType::Material,
        DataType::Model,
        DataType::Renderer,
        DataType::Texture,
        DataType::TransferFunction,
        DataType::Volume,
        DataType::PixelOp,
        DataType::String,
        DataType::Char,
        DataType::UChar,
        DataType::UChar2,
        DataType::UChar3,
        DataType::UChar4,
        DataType::UShort,
        DataType::Int,
        DataType::Int2,
        DataType::Int3,
        DataType::Int4,
        DataType::UInt,
        DataType::UInt2,
        DataType::UInt3,
        DataType::UInt4,
        DataType::Long,
        DataType::Long2,
        DataType::Long3,
        DataType::Long4,
        DataType::ULong,
        DataType::ULong2,
        DataType::ULong3,
        DataType::ULong4,
        DataType::Float,
        DataType::Float2,
        DataType::Float3,
        DataType::Float4,
        DataType::Float3A,
        DataType::Double,
    ];

    /// Decode a raw wire tag
    pub fn from_raw(raw: u32) -> Result<Self, TypeError> {
        Self::ALL
            .iter()
            .copied()
            .find(|ty| ty.raw() == raw)
            .ok_or(TypeError::UnknownDataType(raw))
    }

    /// The raw wire tag
    #[inline]
    pub const fn raw(self) -> u32 {
        self as u32
    }

    /// Byte width of one element
    pub const fn size(self) -> usize {
        match self {
            DataType::Device
            | DataType::VoidPtr
            | DataType::Object
            | DataType::Camera
            | DataType::Data
            | DataType::FrameBuffer
            | DataType::Geometry
            | DataType::Light
            | DataType::Material
            | DataType::Model
            | DataType::Renderer
            | DataType::Texture
            | DataType::TransferFunction
            | DataType::Volume
            | DataType::PixelOp
            | DataType::String => POINTER_WIDTH,
            DataType::Char | DataType::UChar => 1,
            DataType::UChar2 | DataType::UShort => 2,
            DataType::UChar3 => 3,
            DataType::UChar4 => 4,
            DataType::Int | DataType::UInt | DataType::Float => 4,
            DataType::Int2 | DataType::UInt2 | DataType::Float2 => 8,
            DataType::Int3 | DataType::UInt3 | DataType::Float3 => 12,
            DataType::Int4 | DataType::UInt4 | DataType::Float4 | DataType::Float3A => 16,
            DataType::Long | DataType::ULong | DataType::Double => 8,
            DataType::Long2 | DataType::ULong2 => 16,
            DataType::Long3 | DataType::ULong3 => 24,
            DataType::Long4 | DataType::ULong4 => 32,
        }
    }

    /// Canonical lowercase name
    pub const fn name(self) -> &'static str {
        match self {
            DataType::Device => "device",
            DataType::VoidPtr => "void_ptr",
            DataType::Object => "object",
            DataType::Camera => "camera",
            DataType::Data => "data",
            DataType::FrameBuffer => "framebuffer",
            DataType::Geometry => "geometry",
            DataType::Light => "light",
            DataType::Material => "material",
            DataType::Model => "model",
            DataType::Renderer => "renderer",
            DataType::Texture => "texture",
            DataType::TransferFunction => "transfer_function",
            DataType::Volume => "volume",
            DataType::PixelOp => "pixel_op",
            DataType::String => "string",
            DataType::Char => "char",
            DataType::UChar => "uchar",
            DataType::UChar2 => "uchar2",
            DataType::UChar3 => "uchar3",
            DataType::UChar4 => "uchar4",
            DataType::UShort => "ushort",
            DataType::Int => "int",
            DataType::Int2 => "int2",
            DataType::Int3 => "int3",
            DataType::Int4 => "int4",
            DataType::UInt => "uint",
            DataType::UInt2 => "uint2",
            DataType::UInt3 => "uint3",
            DataType::UInt4 => "uint4",
            DataType::Long => "long",
            DataType::Long2 => "long2",
            DataType::Long3 => "long3",
            DataType::Long4 => "long4",
            DataType::ULong => "ulong",
            DataType::ULong2 => "ulong2",
            DataType::ULong3 => "ulong3",
            DataType::ULong4 => "ulong4",
            DataType::Float => "float",
            DataType::Float2 => "float2",
            DataType::Float3 => "float3",
            DataType::Float4 => "float4",
            DataType::Float3A => "float3a",
            DataType::Double => "double",
        }
    }

    /// Look a tag up by its canonical name
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|ty| ty.name() == name)
    }

    /// Whether elements of this type are object references
    pub const fn is_object(self) -> bool {
        matches!(
            self,
            DataType::Object
                | DataType::Camera
                | DataType::Data
                | DataType::FrameBuffer
                | DataType::Geometry
                | DataType::Light
                | DataType::Material
                | DataType::Model
                | DataType::Renderer
                | DataType::Texture
                | DataType::TransferFunction
                | DataType::Volume
                | DataType::PixelOp
        )
    }

    /// Byte length of `count` elements
    #[inline]
    pub const fn byte_len(self, count: usize) -> usize {
        self.size() * count
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Texel format of a 2D texture
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum TextureFormat {
    Rgba8 = 0,
    Srgba,
    Rgba32F,
    Rgb8,
    Srgb,
    Rgb32F,
    R8,
    R32F,
}

impl TextureFormat {
    /// Every texture format
    pub const ALL: [TextureFormat; 8] = [
        TextureFormat::Rgba8,
        TextureFormat::Srgba,
        TextureFormat::Rgba32F,
        TextureFormat::Rgb8,
        TextureFormat::Srgb,
        TextureFormat::Rgb32F,
        TextureFormat::R8,
        TextureFormat::R32F,
    ];

    /// Decode a raw wire tag
    pub fn from_raw(raw: u32) -> Result<Self, TypeError> {
        Self::ALL
            .get(raw as usize)
            .copied()
            .ok_or(TypeError::UnknownTextureFormat(raw))
    }

    /// Byte width of one texel
    pub const fn size(self) -> usize {
        match self {
            TextureFormat::Rgba8 | TextureFormat::Srgba => 4,
            TextureFormat::Rgba32F => 16,
            TextureFormat::Rgb8 | TextureFormat::Srgb => 3,
            TextureFormat::Rgb32F => 12,
            TextureFormat::R8 => 1,
            TextureFormat::R32F => 4,
        }
    }

    /// Number of channels per texel
    pub const fn channels(self) -> usize {
        match self {
            TextureFormat::Rgba8 | TextureFormat::Srgba | TextureFormat::Rgba32F => 4,
            TextureFormat::Rgb8 | TextureFormat::Srgb | TextureFormat::Rgb32F => 3,
            TextureFormat::R8 | TextureFormat::R32F => 1,
        }
    }

    /// Whether texels are stored as 32-bit floats
    pub const fn is_float(self) -> bool {
        matches!(
            self,
            TextureFormat::Rgba32F | TextureFormat::Rgb32F | TextureFormat::R32F
        )
    }

    /// Whether 8-bit texels are sRGB encoded
    pub const fn is_srgb(self) -> bool {
        matches!(self, TextureFormat::Srgba | TextureFormat::Srgb)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_tags_roundtrip() {
        for ty in DataType::ALL {
            assert_eq!(DataType::from_raw(ty.raw()).unwrap(), ty);
        }
        assert!(DataType::from_raw(42).is_err());
        assert_eq!(DataType::Float3.raw(), 6002);
        assert_eq!(DataType::Object.raw(), 1000);
    }

    #[test]
    fn test_sizes() {
        assert_eq!(DataType::Float3.size(), 12);
        assert_eq!(DataType::Float3A.size(), 16);
        assert_eq!(DataType::UChar3.size(), 3);
        assert_eq!(DataType::ULong4.size(), 32);
        assert_eq!(DataType::Geometry.size(), POINTER_WIDTH);
        assert_eq!(DataType::Int3.byte_len(10), 120);
    }

    #[test]
    fn test_names() {
        for ty in DataType::ALL {
            assert_eq!(ty.name(), ty.name().to_lowercase());
            assert_eq!(DataType::from_name(ty.name()), Some(ty));
        }
        assert_eq!(DataType::from_name("float3"), Some(DataType::Float3));
        assert_eq!(DataType::from_name("uint4"), Some(DataType::UInt4));
        assert_eq!(DataType::from_name("vec3f"), None);
    }

    #[test]
    fn test_object_kinds() {
        assert!(DataType::Object.is_object());
        assert!(DataType::Volume.is_object());
        assert!(!DataType::String.is_object());
        assert!(!DataType::Float.is_object());
    }

    #[test]
    fn test_texture_formats() {
        let expected = [4, 4, 16, 3, 3, 12, 1, 4];
        for (format, size) in TextureFormat::ALL.iter().zip(expected) {
            assert_eq!(format.size(), size);
        }
        assert_eq!(TextureFormat::from_raw(5).unwrap(), TextureFormat::Rgb32F);
        assert!(TextureFormat::from_raw(8).is_err());
        assert!(TextureFormat::R32F.is_float());
        assert!(!TextureFormat::Srgba.is_float());
        assert!(TextureFormat::Srgb.is_srgb());
    }
}
