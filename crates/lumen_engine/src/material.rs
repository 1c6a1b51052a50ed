//! Surface materials
//!
//! Materials follow the OBJ/MTL parameter names: `Kd`, `Ks`, `Ns`, `d` and
//! an optional `map_Kd` texture. The plain `color` parameter is accepted as
//! a diffuse alias.

use lumen_math::{Vec3, Vec4};

use crate::error::EngineResult;
use crate::param::Params;
use crate::texture::Texture2D;

const DEFAULT_DIFFUSE: Vec3 = Vec3::splat(0.8);

/// Realized material state
#[derive(Debug, Clone)]
pub struct Material {
    diffuse: Vec3,
    specular: Vec3,
    shininess: f32,
    opacity: f32,
    diffuse_map: Option<Texture2D>,
}

impl Material {
    /// Create a new material with default parameters
    pub fn new() -> Self {
        Self {
            diffuse: DEFAULT_DIFFUSE,
            specular: Vec3::ZERO,
            shininess: 10.0,
            opacity: 1.0,
            diffuse_map: None,
        }
    }

    pub(crate) fn commit(&mut self, params: &Params) -> EngineResult<()> {
        let color = params.vec3("color", DEFAULT_DIFFUSE);
        self.diffuse = params.vec3("Kd", color);
        self.specular = params.vec3("Ks", Vec3::ZERO);
        self.shininess = params.float("Ns", 10.0);
        self.opacity = params.float("d", 1.0).clamp(0.0, 1.0);
        self.diffuse_map = match params.object("map_Kd") {
            Some(texture) => Some(texture.read().texture()?.clone()),
            None => None,
        };
        Ok(())
    }

    pub fn diffuse(&self) -> Vec3 {
        self.diffuse
    }

    pub fn specular(&self) -> Vec3 {
        self.specular
    }

    pub fn shininess(&self) -> f32 {
        self.shininess
    }

    pub fn opacity(&self) -> f32 {
        self.opacity
    }

    pub fn diffuse_map(&self) -> Option<&Texture2D> {
        self.diffuse_map.as_ref()
    }

    /// Diffuse color and coverage at a surface point
    pub fn albedo(&self, texcoord: Option<[f32; 2]>) -> Vec4 {
        let base = self.diffuse.extend(self.opacity);
        match (&self.diffuse_map, texcoord) {
            (Some(map), Some([u, v])) => {
                let texel = map.sample(u, v);
                Vec4::new(
                    base.x * texel.x,
                    base.y * texel.y,
                    base.z * texel.z,
                    base.w * texel.w,
                )
            }
            _ => base,
        }
    }
}

impl Default for Material {
    fn default() -> Self {
        Self::new()
    }
}
