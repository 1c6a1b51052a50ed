//! Ray intersection tests against the primitives the engine traces
//!
//! - AABB (slab method, returns the entry/exit interval)
//! - Sphere
//! - Triangle (Möller-Trumbore)

use crate::bounds::AABB;
use crate::ray::Ray;
use crate::vector::Vec3;

/// Result of a ray-triangle intersection
#[derive(Clone, Copy, Debug)]
pub struct TriangleHit {
    /// Distance along ray to hit point
    pub distance: f32,
    /// Barycentric coordinates [w, u, v] where w = 1 - u - v
    pub barycentric: [f32; 3],
}

/// Ray-AABB slab test
///
/// Returns the parametric interval `(t_enter, t_exit)` clipped to
/// `[t_min, t_max]`, or `None` if the ray misses the box in that range.
pub fn ray_aabb_interval(ray: &Ray, aabb: &AABB, t_min: f32, t_max: f32) -> Option<(f32, f32)> {
    let inv_dir = ray.inverse_direction();
    let mut t0 = t_min;
    let mut t1 = t_max;

    for axis in 0..3 {
        let near = (aabb.min[axis] - ray.origin[axis]) * inv_dir[axis];
        let far = (aabb.max[axis] - ray.origin[axis]) * inv_dir[axis];
        let (near, far) = if near <= far { (near, far) } else { (far, near) };
        // NaN from 0 * inf leaves the interval untouched
        if near > t0 {
            t0 = near;
        }
        if far < t1 {
            t1 = far;
        }
        if t0 > t1 {
            return None;
        }
    }

    Some((t0, t1))
}

/// Ray-sphere intersection, nearest positive distance
pub fn ray_sphere(ray: &Ray, center: Vec3, radius: f32) -> Option<f32> {
    let oc = ray.origin - center;
    let b = oc.dot(ray.direction);
    let c = oc.dot(oc) - radius * radius;
    let discriminant = b * b - c;

    if discriminant < 0.0 {
        return None;
    }

    let sqrt_d = discriminant.sqrt();
    let t1 = -b - sqrt_d;
    let t2 = -b + sqrt_d;
    if t1 > 0.0 {
        Some(t1)
    } else if t2 > 0.0 {
        Some(t2)
    } else {
        None
    }
}

/// Ray-triangle intersection using the Möller-Trumbore algorithm
///
/// Both faces are hit; the engine shades two-sided.
pub fn ray_triangle(ray: &Ray, v0: Vec3, v1: Vec3, v2: Vec3) -> Option<TriangleHit> {
    const EPSILON: f32 = 1e-7;

    let edge1 = v1 - v0;
    let edge2 = v2 - v0;
    let h = ray.direction.cross(edge2);
    let a = edge1.dot(h);

    if a.abs() < EPSILON {
        return None;
    }

    let f = 1.0 / a;
    let s = ray.origin - v0;
    let u = f * s.dot(h);
    if !(0.0..=1.0).contains(&u) {
        return None;
    }

    let q = s.cross(edge1);
    let v = f * ray.direction.dot(q);
    if v < 0.0 || u + v > 1.0 {
        return None;
    }

    let t = f * edge2.dot(q);
    if t > EPSILON {
        Some(TriangleHit {
            distance: t,
            barycentric: [1.0 - u - v, u, v],
        })
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ray_aabb_interval() {
        let ray = Ray::new(Vec3::new(0.5, 0.5, -5.0), Vec3::Z);
        let aabb = AABB::new(Vec3::ZERO, Vec3::ONE);
        let (t0, t1) = ray_aabb_interval(&ray, &aabb, 0.0, f32::INFINITY).unwrap();
        assert!((t0 - 5.0).abs() < 1e-5);
        assert!((t1 - 6.0).abs() < 1e-5);

        let miss = Ray::new(Vec3::new(5.0, 5.0, -5.0), Vec3::Z);
        assert!(ray_aabb_interval(&miss, &aabb, 0.0, f32::INFINITY).is_none());
    }

    #[test]
    fn test_ray_sphere() {
        let ray = Ray::new(Vec3::new(0.0, 0.0, -5.0), Vec3::Z);
        let t = ray_sphere(&ray, Vec3::ZERO, 1.0).unwrap();
        assert!((t - 4.0).abs() < 1e-5);
        assert!(ray_sphere(&ray, Vec3::new(3.0, 0.0, 0.0), 1.0).is_none());
    }

    #[test]
    fn test_ray_triangle() {
        let ray = Ray::new(Vec3::new(0.25, 0.25, -1.0), Vec3::Z);
        let hit = ray_triangle(&ray, Vec3::ZERO, Vec3::X, Vec3::Y).unwrap();
        assert!((hit.distance - 1.0).abs() < 1e-5);
        let sum: f32 = hit.barycentric.iter().sum();
        assert!((sum - 1.0).abs() < 1e-5);

        let miss = Ray::new(Vec3::new(2.0, 2.0, -1.0), Vec3::Z);
        assert!(ray_triangle(&miss, Vec3::ZERO, Vec3::X, Vec3::Y).is_none());
    }
}
