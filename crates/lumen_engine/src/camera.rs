//! Cameras
//!
//! Screen coordinates run from (0, 0) at the bottom-left of the image to
//! (1, 1) at the top-right.

use lumen_math::{radians, Ray, Vec3};

use crate::error::{EngineError, EngineResult};
use crate::param::Params;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CameraKind {
    Perspective,
    Orthographic,
}

/// Realized camera basis used to generate primary rays
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraFrame {
    kind: CameraKind,
    pos: Vec3,
    dir: Vec3,
    du: Vec3,
    dv: Vec3,
    /// Image plane size at unit distance (perspective) or in world units
    plane: [f32; 2],
}

impl CameraFrame {
    fn build(kind: CameraKind, pos: Vec3, dir: Vec3, up: Vec3, extent: f32, aspect: f32) -> Self {
        let dir = dir.normalize();
        let mut du = dir.cross(up).normalize();
        if du == Vec3::ZERO {
            // up parallel to dir, pick any perpendicular axis
            let helper = if dir.x.abs() < 0.9 { Vec3::X } else { Vec3::Y };
            du = dir.cross(helper).normalize();
        }
        let dv = du.cross(dir);

        let height = match kind {
            CameraKind::Perspective => 2.0 * (radians(extent) * 0.5).tan(),
            CameraKind::Orthographic => extent,
        };
        Self {
            kind,
            pos,
            dir,
            du,
            dv,
            plane: [height * aspect, height],
        }
    }

    /// Primary ray through screen position `(s, t)`
    pub fn generate_ray(&self, s: f32, t: f32) -> Ray {
        let offset = self.du * ((s - 0.5) * self.plane[0]) + self.dv * ((t - 0.5) * self.plane[1]);
        match self.kind {
            CameraKind::Perspective => Ray::new(self.pos, self.dir + offset),
            CameraKind::Orthographic => Ray::new(self.pos + offset, self.dir),
        }
    }

    pub fn position(&self) -> Vec3 {
        self.pos
    }

    pub fn direction(&self) -> Vec3 {
        self.dir
    }
}

/// Realized camera state
#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    kind: CameraKind,
    up: Vec3,
    fovy: f32,
    height: f32,
    aspect: f32,
    frame: CameraFrame,
}

impl Camera {
    /// Create a new camera at the origin looking down -Z
    pub fn new(kind: CameraKind) -> Self {
        let extent = match kind {
            CameraKind::Perspective => 60.0,
            CameraKind::Orthographic => 1.0,
        };
        Self {
            kind,
            up: Vec3::Y,
            fovy: 60.0,
            height: 1.0,
            aspect: 1.0,
            frame: CameraFrame::build(kind, Vec3::ZERO, -Vec3::Z, Vec3::Y, extent, 1.0),
        }
    }

    pub(crate) fn commit(&mut self, params: &Params) -> EngineResult<()> {
        let pos = params.vec3("pos", Vec3::ZERO);
        let dir = params.vec3("dir", -Vec3::Z);
        if dir.length() == 0.0 {
            return Err(EngineError::invalid_param("dir", "camera direction is zero"));
        }
        self.up = params.vec3("up", Vec3::Y);
        self.fovy = params.float("fovy", 60.0);
        self.height = params.float("height", 1.0);
        self.aspect = params.float("aspect", 1.0);
        if self.aspect <= 0.0 {
            return Err(EngineError::invalid_param("aspect", "aspect ratio must be positive"));
        }
        self.frame = self.build_frame(pos, dir);
        Ok(())
    }

    fn build_frame(&self, pos: Vec3, dir: Vec3) -> CameraFrame {
        let extent = match self.kind {
            CameraKind::Perspective => self.fovy,
            CameraKind::Orthographic => self.height,
        };
        CameraFrame::build(self.kind, pos, dir, self.up, extent, self.aspect)
    }

    pub fn kind(&self) -> CameraKind {
        self.kind
    }

    /// Committed eye position
    pub fn position(&self) -> Vec3 {
        self.frame.position()
    }

    pub fn aspect(&self) -> f32 {
        self.aspect
    }

    /// Basis snapshot for rendering
    pub fn frame(&self) -> CameraFrame {
        self.frame
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::param::Param;

    fn close(a: Vec3, b: Vec3) -> bool {
        (a - b).length() < 1e-5
    }

    #[test]
    fn test_perspective_center_ray() {
        let mut camera = Camera::new(CameraKind::Perspective);
        let mut params = Params::new();
        params.set("pos", Param::Float3([0.0, 0.0, -5.0]));
        params.set("dir", Param::Float3([0.0, 0.0, 2.0]));
        camera.commit(&params).unwrap();

        let ray = camera.frame().generate_ray(0.5, 0.5);
        assert!(close(ray.origin, Vec3::new(0.0, 0.0, -5.0)));
        assert!(close(ray.direction, Vec3::Z));

        // Top of the image tilts toward +up
        let top = camera.frame().generate_ray(0.5, 1.0);
        assert!(top.direction.y > 0.0);
    }

    #[test]
    fn test_orthographic_offsets_origin() {
        let mut camera = Camera::new(CameraKind::Orthographic);
        let mut params = Params::new();
        params.set("dir", Param::Float3([0.0, 0.0, 1.0]));
        params.set("height", Param::Float(2.0));
        camera.commit(&params).unwrap();

        let ray = camera.frame().generate_ray(0.5, 1.0);
        assert!(close(ray.origin, Vec3::new(0.0, 1.0, 0.0)));
        assert!(close(ray.direction, Vec3::Z));
    }

    #[test]
    fn test_commit_is_repeatable() {
        let mut camera = Camera::new(CameraKind::Perspective);
        let mut params = Params::new();
        params.set("pos", Param::Float3([1.0, 2.0, 3.0]));
        camera.commit(&params).unwrap();
        let first = camera.clone();
        camera.commit(&params).unwrap();
        assert_eq!(camera, first);
        assert_eq!(camera.position(), Vec3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn test_degenerate_up() {
        let mut camera = Camera::new(CameraKind::Perspective);
        let mut params = Params::new();
        params.set("dir", Param::Float3([0.0, 1.0, 0.0]));
        camera.commit(&params).unwrap();
        let ray = camera.frame().generate_ray(0.25, 0.75);
        assert!(ray.direction.length() > 0.99);
    }
}
