//! 2D textures aliasing transport memory

use std::fmt;

use lumen_core::TextureFormat;
use lumen_math::{Vec3, Vec4};

use crate::buffer::RetainedBuffer;
use crate::error::{EngineError, EngineResult};

/// Sample the nearest texel instead of filtering
pub const TEXTURE_FILTER_NEAREST: u32 = 1 << 2;

/// A texture whose texels live in a retained bulk buffer
#[derive(Clone)]
pub struct Texture2D {
    width: u32,
    height: u32,
    format: TextureFormat,
    flags: u32,
    buffer: RetainedBuffer,
}

impl Texture2D {
    /// Create a texture over `buffer`, which must hold every texel
    pub fn new(
        width: i32,
        height: i32,
        format: TextureFormat,
        flags: u32,
        buffer: RetainedBuffer,
    ) -> EngineResult<Self> {
        let (w, h) = match (u32::try_from(width), u32::try_from(height)) {
            (Ok(w), Ok(h)) if w > 0 && h > 0 => (w, h),
            _ => {
                return Err(EngineError::invalid_param(
                    "size",
                    format!("texture size {}x{} is not positive", width, height),
                ))
            }
        };
        let needed = w as usize * h as usize * format.size();
        if buffer.len() < needed {
            return Err(EngineError::BufferTooSmall {
                needed,
                available: buffer.len(),
            });
        }
        Ok(Self {
            width: w,
            height: h,
            format,
            flags,
            buffer,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn format(&self) -> TextureFormat {
        self.format
    }

    pub fn flags(&self) -> u32 {
        self.flags
    }

    pub fn buffer(&self) -> &RetainedBuffer {
        &self.buffer
    }

    /// Decode one texel to linear RGBA
    pub fn texel(&self, x: u32, y: u32) -> Vec4 {
        let size = self.format.size();
        let offset = (y.min(self.height - 1) as usize * self.width as usize
            + x.min(self.width - 1) as usize)
            * size;
        let bytes = self.buffer.read();
        let texel = &bytes[offset..offset + size];

        let unorm = |b: u8| {
            let v = b as f32 / 255.0;
            if self.format.is_srgb() { srgb_to_linear(v) } else { v }
        };
        let float = |i: usize| bytemuck::pod_read_unaligned::<f32>(&texel[i * 4..i * 4 + 4]);

        match self.format {
            TextureFormat::Rgba8 | TextureFormat::Srgba => Vec4::new(
                unorm(texel[0]),
                unorm(texel[1]),
                unorm(texel[2]),
                texel[3] as f32 / 255.0,
            ),
            TextureFormat::Rgb8 | TextureFormat::Srgb => {
                Vec4::new(unorm(texel[0]), unorm(texel[1]), unorm(texel[2]), 1.0)
            }
            TextureFormat::R8 => Vec3::splat(unorm(texel[0])).extend(1.0),
            TextureFormat::Rgba32F => Vec4::new(float(0), float(1), float(2), float(3)),
            TextureFormat::Rgb32F => Vec4::new(float(0), float(1), float(2), 1.0),
            TextureFormat::R32F => Vec3::splat(float(0)).extend(1.0),
        }
    }

    /// Sample at texture coordinates with repeat wrapping
    pub fn sample(&self, u: f32, v: f32) -> Vec4 {
        let u = u - u.floor();
        let v = v - v.floor();
        let fx = u * self.width as f32 - 0.5;
        let fy = v * self.height as f32 - 0.5;

        if self.flags & TEXTURE_FILTER_NEAREST != 0 {
            return self.texel(
                wrap(fx.round() as i64, self.width),
                wrap(fy.round() as i64, self.height),
            );
        }

        let x0 = fx.floor();
        let y0 = fy.floor();
        let (tx, ty) = (fx - x0, fy - y0);
        let (x0, y0) = (x0 as i64, y0 as i64);
        let (xa, xb) = (wrap(x0, self.width), wrap(x0 + 1, self.width));
        let (ya, yb) = (wrap(y0, self.height), wrap(y0 + 1, self.height));

        let top = self.texel(xa, ya) * (1.0 - tx) + self.texel(xb, ya) * tx;
        let bottom = self.texel(xa, yb) * (1.0 - tx) + self.texel(xb, yb) * tx;
        top * (1.0 - ty) + bottom * ty
    }
}

impl fmt::Debug for Texture2D {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Texture2D")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("format", &self.format)
            .field("flags", &self.flags)
            .finish()
    }
}

fn wrap(i: i64, n: u32) -> u32 {
    i.rem_euclid(n as i64) as u32
}

fn srgb_to_linear(v: f32) -> f32 {
    if v <= 0.04045 {
        v / 12.92
    } else {
        ((v + 0.055) / 1.055).powf(2.4)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::MappedBuffer;

    #[test]
    fn test_size_checked() {
        let buffer = MappedBuffer::zeroed(2 * 2 * 3);
        assert!(Texture2D::new(2, 2, TextureFormat::Rgb8, 0, buffer.retain().unwrap()).is_ok());
        assert!(matches!(
            Texture2D::new(2, 2, TextureFormat::Rgba8, 0, buffer.retain().unwrap()),
            Err(EngineError::BufferTooSmall { needed: 16, available: 12 })
        ));
        assert!(Texture2D::new(0, 2, TextureFormat::R8, 0, buffer.retain().unwrap()).is_err());
    }

    #[test]
    fn test_texture_retains_buffer() {
        let buffer = MappedBuffer::zeroed(4);
        let texture = Texture2D::new(1, 1, TextureFormat::Rgba8, 0, buffer.retain().unwrap()).unwrap();
        assert_eq!(buffer.retain_count(), 1);
        drop(texture);
        assert_eq!(buffer.retain_count(), 0);
    }

    #[test]
    fn test_nearest_sampling() {
        // 2x1: red, green
        let buffer = MappedBuffer::new(vec![255, 0, 0, 255, 0, 255, 0, 255]);
        let texture = Texture2D::new(
            2,
            1,
            TextureFormat::Rgba8,
            TEXTURE_FILTER_NEAREST,
            buffer.retain().unwrap(),
        )
        .unwrap();

        assert_eq!(texture.sample(0.25, 0.5), Vec4::new(1.0, 0.0, 0.0, 1.0));
        assert_eq!(texture.sample(0.75, 0.5), Vec4::new(0.0, 1.0, 0.0, 1.0));
        // Repeat wrapping
        assert_eq!(texture.sample(1.25, 0.5), Vec4::new(1.0, 0.0, 0.0, 1.0));
    }

    #[test]
    fn test_float_texel() {
        let bytes: Vec<u8> = [0.5f32].iter().flat_map(|v| v.to_le_bytes()).collect();
        let buffer = MappedBuffer::new(bytes);
        let texture = Texture2D::new(1, 1, TextureFormat::R32F, 0, buffer.retain().unwrap()).unwrap();
        assert_eq!(texture.texel(0, 0), Vec4::new(0.5, 0.5, 0.5, 1.0));
        let filtered = texture.sample(0.3, 0.9);
        assert!((filtered.x - 0.5).abs() < 1e-5);
        assert!((filtered.w - 1.0).abs() < 1e-5);
    }
}
