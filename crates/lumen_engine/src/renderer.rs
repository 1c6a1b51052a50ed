//! Renderers
//!
//! A renderer names the model, camera and lights it draws. It also acts as
//! the first material and light catalogue consulted when the host asks for
//! a new material or light through it.

use lumen_math::Vec4;

use crate::error::{EngineError, EngineResult};
use crate::light::{Light, LightKind};
use crate::material::Material;
use crate::object::ObjectRef;
use crate::param::Params;
use crate::render::{FrameSetup, Shading};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RendererKind {
    /// Direct lighting with volume compositing
    SciVis,
    /// Ambient occlusion
    Ao,
}

/// Realized renderer state
#[derive(Debug)]
pub struct Renderer {
    kind: RendererKind,
    background: Vec4,
    model: Option<ObjectRef>,
    camera: Option<ObjectRef>,
    lights: Vec<ObjectRef>,
    shadows: bool,
    ao_samples: u32,
    ao_distance: f32,
}

impl Renderer {
    /// Create a new renderer with a white background
    pub fn new(kind: RendererKind) -> Self {
        Self {
            kind,
            background: Vec4::ONE,
            model: None,
            camera: None,
            lights: Vec::new(),
            shadows: false,
            ao_samples: 1,
            ao_distance: 1e20,
        }
    }

    pub(crate) fn commit(&mut self, params: &Params) -> EngineResult<()> {
        let model = params.object("model").cloned();
        if let Some(model) = &model {
            model.read().model()?;
        }
        let camera = params.object("camera").cloned();
        if let Some(camera) = &camera {
            camera.read().camera()?;
        }
        let lights = match params.object("lights") {
            Some(data) => {
                let state = data.read();
                let data = state.data()?;
                if !data.is_resolved() && data.count() > 0 {
                    return Err(EngineError::invalid_param("lights", "light array holds no objects"));
                }
                let lights: Vec<ObjectRef> = data.object_iter().cloned().collect();
                for light in &lights {
                    light.read().light()?;
                }
                lights
            }
            None => Vec::new(),
        };

        self.background = params.color("bgColor", Vec4::ONE);
        self.model = model;
        self.camera = camera;
        self.lights = lights;
        self.shadows = params.int("shadowsEnabled", 0) != 0;
        self.ao_samples = params.int("aoSamples", 1).max(0) as u32;
        self.ao_distance = params.float("aoDistance", 1e20);
        Ok(())
    }

    pub fn kind(&self) -> RendererKind {
        self.kind
    }

    pub fn background(&self) -> Vec4 {
        self.background
    }

    pub fn model(&self) -> Option<&ObjectRef> {
        self.model.as_ref()
    }

    pub fn camera(&self) -> Option<&ObjectRef> {
        self.camera.as_ref()
    }

    pub fn lights(&self) -> &[ObjectRef] {
        &self.lights
    }

    /// Material types this renderer understands
    pub fn create_material(&self, type_name: &str) -> Option<Material> {
        match type_name {
            "OBJMaterial" | "default" => Some(Material::new()),
            _ => None,
        }
    }

    /// Light types this renderer understands
    pub fn create_light(&self, type_name: &str) -> Option<Light> {
        match type_name {
            "DirectionalLight" => Some(Light::new(LightKind::Directional)),
            "PointLight" => Some(Light::new(LightKind::Point)),
            "AmbientLight" => Some(Light::new(LightKind::Ambient)),
            _ => None,
        }
    }

    /// Snapshot everything a frame needs
    pub(crate) fn frame_setup(&self) -> EngineResult<FrameSetup> {
        let scene = match &self.model {
            Some(model) => Some(model.read().model()?.scene().clone()),
            None => None,
        };
        let camera = match &self.camera {
            Some(camera) => Some(camera.read().camera()?.frame()),
            None => None,
        };
        let mut lights = Vec::with_capacity(self.lights.len());
        for light in &self.lights {
            lights.push(light.read().light()?.clone());
        }

        let shading = match self.kind {
            RendererKind::SciVis => Shading::SciVis {
                shadows: self.shadows,
            },
            RendererKind::Ao => Shading::Ao {
                samples: self.ao_samples.max(1),
                distance: self.ao_distance,
            },
        };

        Ok(FrameSetup {
            scene,
            camera,
            lights,
            background: self.background,
            shading,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::{Camera, CameraKind};
    use crate::object::ObjectKind;
    use crate::param::Param;

    #[test]
    fn test_default_background_is_white() {
        let mut renderer = Renderer::new(RendererKind::SciVis);
        renderer.commit(&Params::new()).unwrap();
        assert_eq!(renderer.background(), Vec4::ONE);
    }

    #[test]
    fn test_catalogues() {
        let renderer = Renderer::new(RendererKind::Ao);
        assert!(renderer.create_material("OBJMaterial").is_some());
        assert!(renderer.create_material("NoSuchMaterial").is_none());
        assert_eq!(
            renderer.create_light("PointLight").map(|l| l.kind()),
            Some(LightKind::Point)
        );
        assert!(renderer.create_light("point").is_none());
    }

    #[test]
    fn test_model_param_kind_checked() {
        let camera = ObjectRef::new("perspective", ObjectKind::Camera(Camera::new(CameraKind::Perspective)));
        let mut params = Params::new();
        params.set("model", Param::Object(Some(camera.clone())));

        let mut renderer = Renderer::new(RendererKind::SciVis);
        assert!(matches!(renderer.commit(&params), Err(EngineError::WrongKind { .. })));

        params.set("model", Param::Object(None));
        params.set("camera", Param::Object(Some(camera.clone())));
        params.set("bgColor", Param::Float3([0.0, 0.0, 0.0]));
        renderer.commit(&params).unwrap();
        assert!(renderer.camera().unwrap().ptr_eq(&camera));
        assert_eq!(renderer.background(), Vec4::new(0.0, 0.0, 0.0, 1.0));
    }
}
