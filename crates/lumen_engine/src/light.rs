//! Light sources

use lumen_math::Vec3;

use crate::error::EngineResult;
use crate::param::Params;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LightKind {
    /// Infinitely distant light shining along `direction`
    Directional,
    /// Omnidirectional light at `position`
    Point,
    /// Uniform light from every direction
    Ambient,
}

/// Realized light state
#[derive(Debug, Clone, PartialEq)]
pub struct Light {
    kind: LightKind,
    color: Vec3,
    intensity: f32,
    direction: Vec3,
    position: Vec3,
}

impl Light {
    /// Create a new light of the given kind
    pub fn new(kind: LightKind) -> Self {
        Self {
            kind,
            color: Vec3::ONE,
            intensity: 1.0,
            direction: Vec3::Z,
            position: Vec3::ZERO,
        }
    }

    pub(crate) fn commit(&mut self, params: &Params) -> EngineResult<()> {
        self.color = params.vec3("color", Vec3::ONE);
        self.intensity = params.float("intensity", 1.0);
        self.direction = params.vec3("direction", Vec3::Z).normalize();
        self.position = params.vec3("position", Vec3::ZERO);
        Ok(())
    }

    pub fn kind(&self) -> LightKind {
        self.kind
    }

    pub fn direction(&self) -> Vec3 {
        self.direction
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    /// Emitted color scaled by intensity
    pub fn radiance(&self) -> Vec3 {
        self.color * self.intensity
    }

    /// Unit direction from `point` toward the light and the distance to it
    ///
    /// Ambient lights have no direction.
    pub fn incident(&self, point: Vec3) -> Option<(Vec3, f32)> {
        match self.kind {
            LightKind::Directional => Some((-self.direction, f32::INFINITY)),
            LightKind::Point => {
                let to_light = self.position - point;
                let distance = to_light.length();
                (distance > 0.0).then(|| (to_light / distance, distance))
            }
            LightKind::Ambient => None,
        }
    }
}
