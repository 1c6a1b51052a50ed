//! Name-keyed object factories
//!
//! One registry per object family maps a type name to a constructor. The
//! built-in set covers every type the engine implements; embedders can
//! register aliases or replacements before the dispatcher starts.

use std::collections::BTreeMap;
use std::fmt;

use crate::camera::{Camera, CameraKind};
use crate::error::{EngineError, EngineResult};
use crate::geometry::{Geometry, GeometryKind};
use crate::light::{Light, LightKind};
use crate::material::Material;
use crate::renderer::{Renderer, RendererKind};
use crate::transfer_function::TransferFunction;
use crate::volume::VolumeLayout;

/// Registered constructor
pub type Constructor<T> = Box<dyn Fn() -> T + Send + Sync>;

/// Constructors for one object family
pub struct Factory<T> {
    family: &'static str,
    constructors: BTreeMap<String, Constructor<T>>,
}

impl<T> Factory<T> {
    /// Create a new empty factory for `family`
    pub fn new(family: &'static str) -> Self {
        Self {
            family,
            constructors: BTreeMap::new(),
        }
    }

    /// Register a constructor, replacing any previous one under `name`
    pub fn register<F>(&mut self, name: impl Into<String>, constructor: F)
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        self.constructors.insert(name.into(), Box::new(constructor));
    }

    /// Construct `name`, or fail with [`EngineError::UnknownType`]
    pub fn create(&self, name: &str) -> EngineResult<T> {
        self.try_create(name).ok_or_else(|| EngineError::UnknownType {
            kind: self.family,
            name: name.to_string(),
        })
    }

    /// Construct `name` if it is registered
    pub fn try_create(&self, name: &str) -> Option<T> {
        self.constructors.get(name).map(|ctor| ctor())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.constructors.contains_key(name)
    }

    pub fn family(&self) -> &'static str {
        self.family
    }

    /// Registered names in sorted order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.constructors.keys().map(String::as_str)
    }
}

impl<T> fmt::Debug for Factory<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Factory")
            .field("family", &self.family)
            .field("names", &self.names().collect::<Vec<_>>())
            .finish()
    }
}

/// Every per-family factory
#[derive(Debug)]
pub struct Factories {
    pub geometry: Factory<Geometry>,
    pub camera: Factory<Camera>,
    pub renderer: Factory<Renderer>,
    pub volume: Factory<VolumeLayout>,
    pub transfer_function: Factory<TransferFunction>,
    /// Global material catalogue, consulted after the renderer's
    pub material: Factory<Material>,
    /// Global light catalogue, consulted after the renderer's
    pub light: Factory<Light>,
}

impl Factories {
    /// Factories with nothing registered
    pub fn empty() -> Self {
        Self {
            geometry: Factory::new("geometry"),
            camera: Factory::new("camera"),
            renderer: Factory::new("renderer"),
            volume: Factory::new("volume"),
            transfer_function: Factory::new("transfer_function"),
            material: Factory::new("material"),
            light: Factory::new("light"),
        }
    }

    /// Factories for every built-in type
    pub fn builtin() -> Self {
        let mut f = Self::empty();

        f.geometry.register("triangles", || Geometry::new(GeometryKind::Triangles));
        f.geometry.register("trianglemesh", || Geometry::new(GeometryKind::Triangles));
        f.geometry.register("spheres", || Geometry::new(GeometryKind::Spheres));

        f.camera.register("perspective", || Camera::new(CameraKind::Perspective));
        f.camera.register("orthographic", || Camera::new(CameraKind::Orthographic));

        for name in ["scivis", "raycast", "obj"] {
            f.renderer.register(name, || Renderer::new(RendererKind::SciVis));
        }
        f.renderer.register("ao", || Renderer::new(RendererKind::Ao));

        f.volume.register("shared_structured_volume", || VolumeLayout::SharedStructured);
        f.volume.register("block_bricked_volume", || VolumeLayout::BlockBricked);

        f.transfer_function.register("piecewise_linear", TransferFunction::new);

        f.material.register("Default", Material::new);

        f.light.register("directional", || Light::new(LightKind::Directional));
        f.light.register("point", || Light::new(LightKind::Point));
        f.light.register("ambient", || Light::new(LightKind::Ambient));

        f
    }
}

impl Default for Factories {
    fn default() -> Self {
        Self::builtin()
    }
}
