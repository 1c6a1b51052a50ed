//! Flattened, immutable scene built by model finalization
//!
//! Rendering never touches managed objects: a [`Scene`] owns copies of every
//! primitive and material it needs, so render threads can share it freely.

use std::sync::Arc;

use lumen_math::{ray_aabb_interval, ray_sphere, ray_triangle, Ray, Vec3, Vec4, AABB};

use crate::bvh::Bvh;
use crate::material::Material;
use crate::volume::VolumeSampler;

/// A single traceable primitive
#[derive(Debug, Clone, PartialEq)]
pub enum Primitive {
    Triangle {
        vertices: [Vec3; 3],
        colors: Option<[Vec4; 3]>,
        texcoords: Option<[[f32; 2]; 3]>,
        material: u32,
    },
    Sphere {
        center: Vec3,
        radius: f32,
        color: Option<Vec4>,
        material: u32,
    },
}

impl Primitive {
    pub fn bounds(&self) -> AABB {
        match self {
            Primitive::Triangle { vertices, .. } => AABB::from_points(vertices),
            Primitive::Sphere { center, radius, .. } => {
                AABB::new(*center - Vec3::splat(*radius), *center + Vec3::splat(*radius))
            }
        }
    }

    fn distance(&self, ray: &Ray) -> Option<f32> {
        match self {
            Primitive::Triangle { vertices: [a, b, c], .. } => {
                ray_triangle(ray, *a, *b, *c).map(|hit| hit.distance)
            }
            Primitive::Sphere { center, radius, .. } => ray_sphere(ray, *center, *radius),
        }
    }
}

/// Surface interaction at the nearest hit
#[derive(Debug, Clone, Copy)]
pub struct SurfaceHit {
    pub distance: f32,
    pub point: Vec3,
    /// Unit normal facing back toward the ray origin
    pub normal: Vec3,
    /// Diffuse color with coverage in alpha
    pub albedo: Vec4,
    pub primitive: u32,
}

/// Immutable render snapshot of a model
#[derive(Debug)]
pub struct Scene {
    primitives: Vec<Primitive>,
    materials: Vec<Material>,
    volumes: Vec<Arc<VolumeSampler>>,
    bvh: Bvh,
}

impl Scene {
    /// A scene with nothing in it
    pub fn empty() -> Self {
        Self::new(Vec::new(), vec![Material::default()], Vec::new())
    }

    /// Build a scene and its acceleration structure
    ///
    /// `materials[0]` is used by primitives with no material of their own.
    pub fn new(
        primitives: Vec<Primitive>,
        mut materials: Vec<Material>,
        volumes: Vec<Arc<VolumeSampler>>,
    ) -> Self {
        if materials.is_empty() {
            materials.push(Material::default());
        }
        let bounds: Vec<AABB> = primitives.iter().map(Primitive::bounds).collect();
        Self {
            bvh: Bvh::build(&bounds),
            primitives,
            materials,
            volumes,
        }
    }

    pub fn primitives(&self) -> &[Primitive] {
        &self.primitives
    }

    pub fn volumes(&self) -> &[Arc<VolumeSampler>] {
        &self.volumes
    }

    pub fn bvh(&self) -> &Bvh {
        &self.bvh
    }

    /// World bounds of surfaces and volumes
    pub fn bounds(&self) -> AABB {
        self.volumes
            .iter()
            .fold(self.bvh.bounds(), |acc, v| acc.union(&v.bounds()))
    }

    /// Nearest surface hit closer than `t_max`
    pub fn intersect(&self, ray: &Ray, t_max: f32) -> Option<SurfaceHit> {
        let (index, distance) = self
            .bvh
            .closest_hit(ray, 0.0, t_max, |i| self.primitives[i as usize].distance(ray))?;
        Some(self.shade_hit(ray, index, distance))
    }

    /// Whether any surface lies between the ray origin and `t_max`
    pub fn occluded(&self, ray: &Ray, t_max: f32) -> bool {
        self.bvh
            .any_hit(ray, 0.0, t_max, |i| self.primitives[i as usize].distance(ray))
    }

    /// Entry and exit distances of a volume along a ray
    pub fn volume_interval(&self, volume: &VolumeSampler, ray: &Ray, t_max: f32) -> Option<(f32, f32)> {
        ray_aabb_interval(ray, &volume.bounds(), 0.0, t_max)
    }

    fn shade_hit(&self, ray: &Ray, index: u32, distance: f32) -> SurfaceHit {
        let point = ray.at(distance);
        let (normal, albedo) = match &self.primitives[index as usize] {
            Primitive::Triangle {
                vertices: [a, b, c],
                colors,
                texcoords,
                material,
            } => {
                let normal = (*b - *a).cross(*c - *a).normalize();
                let bary = ray_triangle(ray, *a, *b, *c)
                    .map_or([1.0, 0.0, 0.0], |hit| hit.barycentric);
                let uv = texcoords.map(|[t0, t1, t2]| {
                    [
                        t0[0] * bary[0] + t1[0] * bary[1] + t2[0] * bary[2],
                        t0[1] * bary[0] + t1[1] * bary[1] + t2[1] * bary[2],
                    ]
                });
                let mut albedo = self.material(*material).albedo(uv);
                if let Some([c0, c1, c2]) = colors {
                    let color = *c0 * bary[0] + *c1 * bary[1] + *c2 * bary[2];
                    albedo = modulate(albedo, color);
                }
                (normal, albedo)
            }
            Primitive::Sphere {
                center,
                radius,
                color,
                material,
            } => {
                let normal = (point - *center) / *radius;
                let mut albedo = self.material(*material).albedo(None);
                if let Some(color) = color {
                    albedo = modulate(albedo, *color);
                }
                (normal.normalize(), albedo)
            }
        };

        let normal = if normal.dot(ray.direction) > 0.0 { -normal } else { normal };
        SurfaceHit {
            distance,
            point,
            normal,
            albedo,
            primitive: index,
        }
    }

    fn material(&self, index: u32) -> &Material {
        self.materials.get(index as usize).unwrap_or(&self.materials[0])
    }
}

impl Default for Scene {
    fn default() -> Self {
        Self::empty()
    }
}

fn modulate(a: Vec4, b: Vec4) -> Vec4 {
    Vec4::new(a.x * b.x, a.y * b.y, a.z * b.z, a.w * b.w)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quad_scene() -> Scene {
        let (a, b, c, d) = (
            Vec3::new(-1.0, -1.0, 0.0),
            Vec3::new(1.0, -1.0, 0.0),
            Vec3::new(1.0, 1.0, 0.0),
            Vec3::new(-1.0, 1.0, 0.0),
        );
        let tri = |vertices| Primitive::Triangle {
            vertices,
            colors: None,
            texcoords: None,
            material: 0,
        };
        Scene::new(vec![tri([a, b, c]), tri([a, c, d])], Vec::new(), Vec::new())
    }

    #[test]
    fn test_intersect_front_facing_normal() {
        let scene = quad_scene();
        let ray = Ray::new(Vec3::new(0.2, 0.3, -4.0), Vec3::Z);
        let hit = scene.intersect(&ray, f32::INFINITY).unwrap();

        assert!((hit.distance - 4.0).abs() < 1e-5);
        assert!((hit.normal - (-Vec3::Z)).length() < 1e-5);
        assert_eq!(hit.albedo, Material::default().albedo(None));
    }

    #[test]
    fn test_occluded_range() {
        let scene = quad_scene();
        let ray = Ray::new(Vec3::new(0.0, 0.5, -4.0), Vec3::Z);
        assert!(scene.occluded(&ray, 10.0));
        assert!(!scene.occluded(&ray, 3.0));
        let miss = Ray::new(Vec3::new(5.0, 0.0, -4.0), Vec3::Z);
        assert!(!scene.occluded(&miss, 10.0));
    }

    #[test]
    fn test_sphere_color() {
        let scene = Scene::new(
            vec![Primitive::Sphere {
                center: Vec3::ZERO,
                radius: 1.0,
                color: Some(Vec4::new(1.0, 0.0, 0.0, 1.0)),
                material: 3,
            }],
            Vec::new(),
            Vec::new(),
        );
        let hit = scene.intersect(&Ray::new(Vec3::new(0.0, 0.0, -3.0), Vec3::Z), f32::INFINITY).unwrap();
        assert!((hit.distance - 2.0).abs() < 1e-5);
        assert!(hit.albedo.y.abs() < 1e-6);
        assert!(hit.albedo.x > 0.0);
        assert!(scene.bounds().contains_point(Vec3::splat(0.9)));
    }

    #[test]
    fn test_empty_scene() {
        let scene = Scene::empty();
        assert!(scene.intersect(&Ray::new(Vec3::ZERO, Vec3::Z), f32::INFINITY).is_none());
        assert!(scene.bounds().is_empty());
    }
}
