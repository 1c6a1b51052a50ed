//! Structured scalar volumes
//!
//! Voxels are stored in x-fastest order on a regular grid. Both layouts are
//! sampled the same way; the layout name is kept for the host's benefit.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use lumen_core::{DataType, TypeError};
use lumen_math::{lerp, Vec3, Vec4, AABB};

use crate::data::decode_scalars;
use crate::error::{EngineError, EngineResult};
use crate::param::Params;
use crate::transfer_function::TransferFunction;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VolumeLayout {
    SharedStructured,
    BlockBricked,
}

/// Immutable snapshot used while rendering
pub struct VolumeSampler {
    dims: [usize; 3],
    voxels: Vec<f32>,
    origin: Vec3,
    spacing: Vec3,
    transfer_function: TransferFunction,
    sampling_rate: f32,
    bounds: AABB,
}

impl VolumeSampler {
    pub fn bounds(&self) -> AABB {
        self.bounds
    }

    pub fn dimensions(&self) -> [usize; 3] {
        self.dims
    }

    /// World-space distance between samples along a ray
    pub fn step(&self) -> f32 {
        let cell = self.spacing.x.min(self.spacing.y).min(self.spacing.z);
        cell / self.sampling_rate.max(1e-3)
    }

    fn voxel(&self, x: usize, y: usize, z: usize) -> f32 {
        self.voxels[(z * self.dims[1] + y) * self.dims[0] + x]
    }

    /// Trilinearly interpolated value at a world position
    pub fn value(&self, point: Vec3) -> f32 {
        let local = point - self.origin;
        let mut base = [0usize; 3];
        let mut frac = [0.0f32; 3];
        for axis in 0..3 {
            let max = (self.dims[axis] - 1) as f32;
            let coord = (local[axis] / self.spacing[axis]).clamp(0.0, max);
            let cell = (coord.floor() as usize).min(self.dims[axis].saturating_sub(2));
            base[axis] = cell;
            frac[axis] = coord - cell as f32;
        }
        let next = |axis: usize| (base[axis] + 1).min(self.dims[axis] - 1);
        let (x0, y0, z0) = (base[0], base[1], base[2]);
        let (x1, y1, z1) = (next(0), next(1), next(2));

        let c00 = lerp(self.voxel(x0, y0, z0), self.voxel(x1, y0, z0), frac[0]);
        let c10 = lerp(self.voxel(x0, y1, z0), self.voxel(x1, y1, z0), frac[0]);
        let c01 = lerp(self.voxel(x0, y0, z1), self.voxel(x1, y0, z1), frac[0]);
        let c11 = lerp(self.voxel(x0, y1, z1), self.voxel(x1, y1, z1), frac[0]);
        let c0 = lerp(c00, c10, frac[1]);
        let c1 = lerp(c01, c11, frac[1]);
        lerp(c0, c1, frac[2])
    }

    /// Classified color and opacity at a world position
    pub fn sample(&self, point: Vec3) -> Vec4 {
        self.transfer_function.sample(self.value(point))
    }
}

impl fmt::Debug for VolumeSampler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VolumeSampler")
            .field("dims", &self.dims)
            .field("sampling_rate", &self.sampling_rate)
            .field("bounds", &self.bounds)
            .finish()
    }
}

/// Realized volume state
pub struct Volume {
    layout: VolumeLayout,
    source_path: Option<PathBuf>,
    file_bytes: Option<Vec<u8>>,
    sampler: Option<Arc<VolumeSampler>>,
}

impl Volume {
    /// Create a new volume with no voxels
    pub fn new(layout: VolumeLayout) -> Self {
        Self {
            layout,
            source_path: None,
            file_bytes: None,
            sampler: None,
        }
    }

    /// Create a volume whose voxels are the raw contents of `path`
    pub fn from_file(layout: VolumeLayout, path: &Path) -> EngineResult<Self> {
        let bytes = std::fs::read(path).map_err(|source| EngineError::VolumeFile {
            path: path.to_path_buf(),
            source,
        })?;
        log::info!("Loaded {} voxel bytes from {}", bytes.len(), path.display());
        Ok(Self {
            layout,
            source_path: Some(path.to_path_buf()),
            file_bytes: Some(bytes),
            sampler: None,
        })
    }

    pub(crate) fn commit(&mut self, params: &Params) -> EngineResult<()> {
        let dims = match params.int3("dimensions") {
            Some([x, y, z]) if x > 0 && y > 0 && z > 0 => [x as usize, y as usize, z as usize],
            Some(_) => return Err(EngineError::invalid_param("dimensions", "dimensions must be positive")),
            None => return Err(EngineError::invalid_param("dimensions", "missing")),
        };
        let voxel_count = dims[0]
            .checked_mul(dims[1])
            .and_then(|n| n.checked_mul(dims[2]))
            .ok_or_else(|| EngineError::invalid_param("dimensions", "voxel count overflows"))?;

        let voxels = if let Some(data) = params.object("voxelData") {
            data.read().data()?.scalars()?
        } else if let Some(bytes) = &self.file_bytes {
            let name = params.string("voxelType").unwrap_or("uchar");
            let ty = DataType::from_name(name).ok_or_else(|| TypeError::UnknownTypeName(name.into()))?;
            decode_scalars(bytes, ty)?
        } else {
            return Err(EngineError::invalid_param("voxelData", "volume has no voxel source"));
        };
        if voxels.len() < voxel_count {
            return Err(EngineError::invalid_param(
                "voxelData",
                format!("{} voxels supplied, {} required", voxels.len(), voxel_count),
            ));
        }

        let transfer_function = match params.object("transferFunction") {
            Some(tf) => tf.read().transfer_function()?.clone(),
            None => TransferFunction::new(),
        };

        let origin = params.vec3("gridOrigin", Vec3::ZERO);
        let spacing = params.vec3("gridSpacing", Vec3::ONE);
        if spacing.x <= 0.0 || spacing.y <= 0.0 || spacing.z <= 0.0 {
            return Err(EngineError::invalid_param("gridSpacing", "spacing must be positive"));
        }
        let extent = Vec3::new(
            (dims[0] - 1) as f32,
            (dims[1] - 1) as f32,
            (dims[2] - 1) as f32,
        )
        .mul_elem(spacing);

        self.sampler = Some(Arc::new(VolumeSampler {
            dims,
            voxels: voxels[..voxel_count].to_vec(),
            origin,
            spacing,
            transfer_function,
            sampling_rate: params.float("samplingRate", 0.125),
            bounds: AABB::new(origin, origin + extent),
        }));
        Ok(())
    }

    pub fn layout(&self) -> VolumeLayout {
        self.layout
    }

    pub fn source_path(&self) -> Option<&Path> {
        self.source_path.as_deref()
    }

    /// Sampler from the last commit
    pub fn sampler(&self) -> Option<&Arc<VolumeSampler>> {
        self.sampler.as_ref()
    }
}

impl fmt::Debug for Volume {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Volume")
            .field("layout", &self.layout)
            .field("source_path", &self.source_path)
            .field("sampler", &self.sampler)
            .finish()
    }
}
