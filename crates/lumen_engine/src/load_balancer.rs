//! Interleaved tiled load balancing across worker processes
//!
//! Device `d` of `N` renders exactly the tiles whose index `i` satisfies
//! `i mod N == d`. This is the only coordination between peer workers.

use crate::error::{EngineError, EngineResult};
use crate::tile::{TileGrid, TileRect};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InterleavedTiledLoadBalancer {
    device_id: usize,
    device_count: usize,
}

impl InterleavedTiledLoadBalancer {
    /// Create a new balancer for device `device_id` of `device_count`
    pub fn new(device_id: usize, device_count: usize) -> EngineResult<Self> {
        if device_count == 0 || device_id >= device_count {
            return Err(EngineError::invalid_param(
                "device",
                format!("device {} of {} is out of range", device_id, device_count),
            ));
        }
        Ok(Self {
            device_id,
            device_count,
        })
    }

    /// Balancer for a lone worker that renders every tile
    pub fn single() -> Self {
        Self {
            device_id: 0,
            device_count: 1,
        }
    }

    pub fn device_id(&self) -> usize {
        self.device_id
    }

    pub fn device_count(&self) -> usize {
        self.device_count
    }

    /// Whether this device renders tile `index`
    pub fn owns(&self, index: usize) -> bool {
        index % self.device_count == self.device_id
    }

    /// Indices of the tiles this device renders, out of `total`
    pub fn tile_indices(&self, total: usize) -> impl Iterator<Item = usize> {
        (self.device_id..total).step_by(self.device_count)
    }

    /// Rectangles of the tiles this device renders
    pub fn tiles(&self, grid: &TileGrid) -> Vec<TileRect> {
        self.tile_indices(grid.count())
            .filter_map(|i| grid.tile(i))
            .collect()
    }
}

impl Default for InterleavedTiledLoadBalancer {
    fn default() -> Self {
        Self::single()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_bad_device() {
        assert!(InterleavedTiledLoadBalancer::new(0, 0).is_err());
        assert!(InterleavedTiledLoadBalancer::new(3, 3).is_err());
        assert!(InterleavedTiledLoadBalancer::new(2, 3).is_ok());
    }

    #[test]
    fn test_interleaving() {
        let balancer = InterleavedTiledLoadBalancer::new(1, 3).unwrap();
        let tiles: Vec<usize> = balancer.tile_indices(10).collect();
        assert_eq!(tiles, vec![1, 4, 7]);
        assert!(tiles.iter().all(|i| balancer.owns(*i)));
        assert!(!balancer.owns(3));
    }

    #[test]
    fn test_single_owns_everything() {
        let grid = TileGrid::new(200, 200, 64);
        let tiles = InterleavedTiledLoadBalancer::single().tiles(&grid);
        assert_eq!(tiles.len(), grid.count());
    }
}
