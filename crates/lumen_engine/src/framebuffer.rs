//! Framebuffers
//!
//! Color pixels live in a buffer mapped by the transport so the host sees
//! them without a copy. Depth and accumulation channels are local.

use std::fmt;
use std::ops::BitOr;

use lumen_math::Vec4;

use crate::buffer::MappedBuffer;
use crate::error::{EngineError, EngineResult};
use crate::render::TileOutput;

/// Pixel format of the color channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum ColorFormat {
    /// No color channel
    None = 0,
    Rgba8 = 1,
    Rgb8 = 2,
    Rgba32F = 3,
}

impl ColorFormat {
    pub fn from_raw(raw: u32) -> EngineResult<Self> {
        match raw {
            0 => Ok(ColorFormat::None),
            1 => Ok(ColorFormat::Rgba8),
            2 => Ok(ColorFormat::Rgb8),
            3 => Ok(ColorFormat::Rgba32F),
            other => Err(EngineError::invalid_param(
                "format",
                format!("unknown framebuffer color format {}", other),
            )),
        }
    }

    /// Bytes per pixel
    pub const fn pixel_size(self) -> usize {
        match self {
            ColorFormat::None => 0,
            ColorFormat::Rgba8 => 4,
            ColorFormat::Rgb8 => 3,
            ColorFormat::Rgba32F => 16,
        }
    }
}

/// Bit mask over framebuffer channels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Channels(u32);

impl Channels {
    pub const NONE: Self = Self(0);
    pub const COLOR: Self = Self(1 << 0);
    pub const DEPTH: Self = Self(1 << 1);
    pub const ACCUM: Self = Self(1 << 2);

    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    pub const fn bits(self) -> u32 {
        self.0
    }

    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for Channels {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// Realized framebuffer state
pub struct FrameBuffer {
    width: u32,
    height: u32,
    format: ColorFormat,
    color: Option<MappedBuffer>,
    depth: Option<Vec<f32>>,
    accum: Option<Vec<Vec4>>,
    accum_frames: u32,
}

impl FrameBuffer {
    /// Create a new framebuffer writing color into `pixels`
    ///
    /// `pixels` must hold `width * height` pixels of `format` unless the
    /// format is [`ColorFormat::None`].
    pub fn new(
        width: i32,
        height: i32,
        format: ColorFormat,
        channels: Channels,
        pixels: Option<MappedBuffer>,
    ) -> EngineResult<Self> {
        let (width, height) = match (u32::try_from(width), u32::try_from(height)) {
            (Ok(w), Ok(h)) if w > 0 && h > 0 => (w, h),
            _ => {
                return Err(EngineError::invalid_param(
                    "size",
                    format!("framebuffer size {}x{} is not positive", width, height),
                ))
            }
        };
        let pixel_count = width as usize * height as usize;

        let color = match format {
            ColorFormat::None => None,
            _ => {
                let needed = pixel_count * format.pixel_size();
                let available = pixels.as_ref().map_or(0, MappedBuffer::len);
                match pixels {
                    Some(buffer) if available >= needed => Some(buffer),
                    _ => return Err(EngineError::BufferTooSmall { needed, available }),
                }
            }
        };

        Ok(Self {
            width,
            height,
            format,
            color,
            depth: channels
                .contains(Channels::DEPTH)
                .then(|| vec![f32::INFINITY; pixel_count]),
            accum: channels
                .contains(Channels::ACCUM)
                .then(|| vec![Vec4::ZERO; pixel_count]),
            accum_frames: 0,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn format(&self) -> ColorFormat {
        self.format
    }

    /// The host-visible color buffer
    pub fn color_buffer(&self) -> Option<&MappedBuffer> {
        self.color.as_ref()
    }

    pub fn depth(&self) -> Option<&[f32]> {
        self.depth.as_deref()
    }

    pub fn has_accum(&self) -> bool {
        self.accum.is_some()
    }

    /// Frames accumulated since the last accumulation clear
    pub fn accum_frames(&self) -> u32 {
        self.accum_frames
    }

    /// Reset the selected channels
    pub fn clear(&mut self, channels: Channels) {
        if channels.contains(Channels::COLOR) {
            if let Some(color) = &self.color {
                color.write().fill(0);
            }
        }
        if channels.contains(Channels::DEPTH) {
            if let Some(depth) = &mut self.depth {
                depth.fill(f32::INFINITY);
            }
        }
        if channels.contains(Channels::ACCUM) {
            if let Some(accum) = &mut self.accum {
                accum.fill(Vec4::ZERO);
            }
            self.accum_frames = 0;
        }
    }

    /// Start a frame; returns the frame's index within the accumulation
    pub(crate) fn begin_frame(&mut self, channels: Channels) -> u32 {
        if self.accum.is_some() && channels.contains(Channels::ACCUM) {
            self.accum_frames += 1;
        }
        self.accum_frames
    }

    /// Store one rendered tile in the selected channels
    pub(crate) fn write_tile(&mut self, tile: &TileOutput, channels: Channels) {
        let rect = tile.rect;
        let accumulate = channels.contains(Channels::ACCUM) && self.accum_frames > 0;
        let mut pixels = match (&self.color, channels.contains(Channels::COLOR)) {
            (Some(buffer), true) => Some(buffer.write()),
            _ => None,
        };
        let pixel_size = self.format.pixel_size();

        let mut j = 0;
        for y in rect.y0..rect.y1 {
            for x in rect.x0..rect.x1 {
                let index = y as usize * self.width as usize + x as usize;
                let mut color = tile.color[j];

                if accumulate {
                    if let Some(accum) = &mut self.accum {
                        accum[index] += color;
                        color = accum[index] / self.accum_frames as f32;
                    }
                }
                if channels.contains(Channels::DEPTH) {
                    if let Some(depth) = &mut self.depth {
                        depth[index] = tile.depth[j];
                    }
                }
                if let Some(bytes) = pixels.as_mut() {
                    let offset = index * pixel_size;
                    encode_pixel(self.format, color, &mut bytes[offset..offset + pixel_size]);
                }
                j += 1;
            }
        }
    }

    /// Decode the color of one pixel
    pub fn read_pixel(&self, x: u32, y: u32) -> Option<Vec4> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let buffer = self.color.as_ref()?;
        let size = self.format.pixel_size();
        let offset = (y as usize * self.width as usize + x as usize) * size;
        let bytes = buffer.read();
        let px = &bytes[offset..offset + size];
        let unorm = |b: u8| b as f32 / 255.0;
        match self.format {
            ColorFormat::None => None,
            ColorFormat::Rgba8 => Some(Vec4::new(unorm(px[0]), unorm(px[1]), unorm(px[2]), unorm(px[3]))),
            ColorFormat::Rgb8 => Some(Vec4::new(unorm(px[0]), unorm(px[1]), unorm(px[2]), 1.0)),
            ColorFormat::Rgba32F => Some(bytemuck::pod_read_unaligned::<Vec4>(px)),
        }
    }
}

fn encode_pixel(format: ColorFormat, color: Vec4, out: &mut [u8]) {
    let unorm = |v: f32| (v.clamp(0.0, 1.0) * 255.0 + 0.5) as u8;
    match format {
        ColorFormat::None => {}
        ColorFormat::Rgba8 => {
            out.copy_from_slice(&[unorm(color.x), unorm(color.y), unorm(color.z), unorm(color.w)]);
        }
        ColorFormat::Rgb8 => {
            out.copy_from_slice(&[unorm(color.x), unorm(color.y), unorm(color.z)]);
        }
        ColorFormat::Rgba32F => out.copy_from_slice(bytemuck::bytes_of(&color)),
    }
}

impl fmt::Debug for FrameBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FrameBuffer")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("format", &self.format)
            .field("depth", &self.depth.is_some())
            .field("accum", &self.accum.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tile::TileGrid;

    fn solid_tile(grid: &TileGrid, index: usize, color: Vec4, depth: f32) -> TileOutput {
        let rect = grid.tile(index).unwrap();
        TileOutput {
            rect,
            color: vec![color; rect.pixel_count()],
            depth: vec![depth; rect.pixel_count()],
        }
    }

    #[test]
    fn test_pixels_required() {
        let err = FrameBuffer::new(4, 4, ColorFormat::Rgba8, Channels::COLOR, None).unwrap_err();
        assert!(matches!(err, EngineError::BufferTooSmall { needed: 64, available: 0 }));
        assert!(FrameBuffer::new(4, 4, ColorFormat::None, Channels::DEPTH, None).is_ok());
        assert!(FrameBuffer::new(0, 4, ColorFormat::None, Channels::NONE, None).is_err());
    }

    #[test]
    fn test_clear_channels() {
        let pixels = MappedBuffer::new(vec![9; 4 * 4 * 4]);
        let mut fb = FrameBuffer::new(
            4,
            4,
            ColorFormat::Rgba8,
            Channels::COLOR | Channels::DEPTH,
            Some(pixels.clone()),
        )
        .unwrap();

        fb.clear(Channels::DEPTH);
        assert_eq!(pixels.read()[0], 9);
        assert!(fb.depth().unwrap().iter().all(|d| d.is_infinite()));

        fb.clear(Channels::COLOR);
        assert!(pixels.read().iter().all(|b| *b == 0));
    }

    #[test]
    fn test_write_tile_encodes_into_host_buffer() {
        let pixels = MappedBuffer::zeroed(2 * 2 * 4);
        let mut fb = FrameBuffer::new(2, 2, ColorFormat::Rgba8, Channels::COLOR, Some(pixels.clone())).unwrap();
        let grid = TileGrid::new(2, 2, 64);

        fb.write_tile(&solid_tile(&grid, 0, Vec4::new(1.0, 0.5, 0.0, 1.0), 1.0), Channels::COLOR);
        assert_eq!(&pixels.read()[..4], &[255, 128, 0, 255]);
        assert_eq!(fb.read_pixel(1, 1), Some(Vec4::new(1.0, 128.0 / 255.0, 0.0, 1.0)));
    }

    #[test]
    fn test_accumulation_averages() {
        let pixels = MappedBuffer::zeroed(16);
        let channels = Channels::COLOR | Channels::ACCUM;
        let mut fb = FrameBuffer::new(1, 1, ColorFormat::Rgba32F, channels, Some(pixels)).unwrap();
        let grid = TileGrid::new(1, 1, 64);

        assert_eq!(fb.begin_frame(channels), 1);
        fb.write_tile(&solid_tile(&grid, 0, Vec4::ONE, 1.0), channels);
        assert_eq!(fb.begin_frame(channels), 2);
        fb.write_tile(&solid_tile(&grid, 0, Vec4::ZERO, 1.0), channels);
        assert_eq!(fb.read_pixel(0, 0), Some(Vec4::new(0.5, 0.5, 0.5, 0.5)));

        fb.clear(Channels::ACCUM);
        assert_eq!(fb.accum_frames(), 0);
    }
}
