//! Framebuffer tiling
//!
//! Tiles are square blocks of `tile_size` pixels, indexed in row-major order
//! starting at pixel row 0 of the color buffer. Edge tiles are clipped.

/// Default tile edge length in pixels
pub const TILE_SIZE: u32 = 64;

/// Pixel rectangle covered by one tile, `[x0, x1) x [y0, y1)`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileRect {
    pub index: usize,
    pub x0: u32,
    pub y0: u32,
    pub x1: u32,
    pub y1: u32,
}

impl TileRect {
    pub fn width(&self) -> u32 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> u32 {
        self.y1 - self.y0
    }

    pub fn pixel_count(&self) -> usize {
        self.width() as usize * self.height() as usize
    }
}

/// Partition of a framebuffer into tiles
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileGrid {
    width: u32,
    height: u32,
    tile_size: u32,
    tiles_x: u32,
    tiles_y: u32,
}

impl TileGrid {
    /// Create a new grid covering a `width` x `height` image
    pub fn new(width: u32, height: u32, tile_size: u32) -> Self {
        let tile_size = tile_size.max(1);
        Self {
            width,
            height,
            tile_size,
            tiles_x: width.div_ceil(tile_size),
            tiles_y: height.div_ceil(tile_size),
        }
    }

    pub fn tile_size(&self) -> u32 {
        self.tile_size
    }

    pub fn tiles_x(&self) -> u32 {
        self.tiles_x
    }

    pub fn tiles_y(&self) -> u32 {
        self.tiles_y
    }

    /// Total number of tiles
    pub fn count(&self) -> usize {
        self.tiles_x as usize * self.tiles_y as usize
    }

    /// Rectangle of tile `index`
    pub fn tile(&self, index: usize) -> Option<TileRect> {
        if index >= self.count() {
            return None;
        }
        let tx = (index % self.tiles_x as usize) as u32;
        let ty = (index / self.tiles_x as usize) as u32;
        let x0 = tx * self.tile_size;
        let y0 = ty * self.tile_size;
        Some(TileRect {
            index,
            x0,
            y0,
            x1: (x0 + self.tile_size).min(self.width),
            y1: (y0 + self.tile_size).min(self.height),
        })
    }

    /// All tiles in index order
    pub fn iter(&self) -> impl Iterator<Item = TileRect> + '_ {
        (0..self.count()).filter_map(|i| self.tile(i))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grid_counts() {
        let grid = TileGrid::new(130, 64, 64);
        assert_eq!(grid.tiles_x(), 3);
        assert_eq!(grid.tiles_y(), 1);
        assert_eq!(grid.count(), 3);
        assert_eq!(TileGrid::new(4, 4, TILE_SIZE).count(), 1);
        assert_eq!(TileGrid::new(0, 4, TILE_SIZE).count(), 0);
    }

    #[test]
    fn test_row_major_and_clipped() {
        let grid = TileGrid::new(100, 100, 64);
        let t0 = grid.tile(0).unwrap();
        assert_eq!((t0.x0, t0.y0, t0.x1, t0.y1), (0, 0, 64, 64));
        let t1 = grid.tile(1).unwrap();
        assert_eq!((t1.x0, t1.y0, t1.x1, t1.y1), (64, 0, 100, 64));
        let t2 = grid.tile(2).unwrap();
        assert_eq!((t2.x0, t2.y0), (0, 64));
        assert!(grid.tile(4).is_none());
    }

    #[test]
    fn test_tiles_cover_every_pixel_once() {
        let grid = TileGrid::new(70, 33, 16);
        let total: usize = grid.iter().map(|t| t.pixel_count()).sum();
        assert_eq!(total, 70 * 33);
    }
}
