//! # lumen_math - Math for the Lumen Engine
//!
//! Small, plain-old-data math primitives used by the ray tracing core:
//! vectors with the exact memory layout of the wire's `float3`/`float4`
//! elements, axis-aligned bounds, rays and primitive intersection tests.

pub mod vector;
pub mod bounds;
pub mod ray;
pub mod intersect;

pub use vector::*;
pub use bounds::*;
pub use ray::*;
pub use intersect::*;

/// Common math constants
pub mod consts {
    pub const PI: f32 = core::f32::consts::PI;
    pub const DEG_TO_RAD: f32 = PI / 180.0;
}

/// Convert degrees to radians
#[inline]
pub fn radians(degrees: f32) -> f32 {
    degrees * consts::DEG_TO_RAD
}

/// Linear interpolation
#[inline]
pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_radians() {
        assert_eq!(radians(0.0), 0.0);
        assert!((radians(180.0) - consts::PI).abs() < 1e-6);
        assert!((radians(60.0).tan() - 3.0f32.sqrt()).abs() < 1e-5);
    }

    #[test]
    fn test_lerp() {
        assert_eq!(lerp(2.0, 4.0, 0.5), 3.0);
        assert_eq!(lerp(2.0, 4.0, 0.0), 2.0);
    }
}
