//! Managed objects
//!
//! Every engine object lives behind an [`ObjectRef`]: an owning reference
//! that carries an explicit reference count. The count starts at one when
//! the object is constructed, rises by one for every additional owner (a
//! registry binding, a parameter slot, a model's geometry list, a resolved
//! object array) and falls when an owner lets go. Parents own children and
//! the graph is acyclic, so the last owner dropping a reference tears down
//! the subgraph below it.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;

use lumen_core::HandleRegistry;
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::camera::Camera;
use crate::data::Data;
use crate::error::{EngineError, EngineResult};
use crate::framebuffer::FrameBuffer;
use crate::geometry::Geometry;
use crate::light::Light;
use crate::material::Material;
use crate::model::Model;
use crate::param::{Param, Params};
use crate::renderer::Renderer;
use crate::texture::Texture2D;
use crate::transfer_function::TransferFunction;
use crate::volume::Volume;

/// Registry from host handles to managed objects
pub type ObjectRegistry = HandleRegistry<ObjectRef>;

/// Kind-specific realized state
#[derive(Debug)]
pub enum ObjectKind {
    Data(Data),
    Model(Model),
    Geometry(Geometry),
    Camera(Camera),
    Renderer(Renderer),
    Light(Light),
    Material(Material),
    Volume(Volume),
    Texture(Texture2D),
    TransferFunction(TransferFunction),
    FrameBuffer(FrameBuffer),
}

impl ObjectKind {
    /// Family name, used in diagnostics
    pub fn name(&self) -> &'static str {
        match self {
            ObjectKind::Data(_) => "data",
            ObjectKind::Model(_) => "model",
            ObjectKind::Geometry(_) => "geometry",
            ObjectKind::Camera(_) => "camera",
            ObjectKind::Renderer(_) => "renderer",
            ObjectKind::Light(_) => "light",
            ObjectKind::Material(_) => "material",
            ObjectKind::Volume(_) => "volume",
            ObjectKind::Texture(_) => "texture",
            ObjectKind::TransferFunction(_) => "transfer_function",
            ObjectKind::FrameBuffer(_) => "framebuffer",
        }
    }

    /// Realize staged parameters; a model finalizes as part of its commit
    fn commit(&mut self, params: &Params) -> EngineResult<()> {
        match self {
            ObjectKind::Model(model) => model.commit(params),
            ObjectKind::Geometry(geometry) => geometry.commit(params),
            ObjectKind::Camera(camera) => camera.commit(params),
            ObjectKind::Renderer(renderer) => renderer.commit(params),
            ObjectKind::Light(light) => light.commit(params),
            ObjectKind::Material(material) => material.commit(params),
            ObjectKind::Volume(volume) => volume.commit(params),
            ObjectKind::TransferFunction(tf) => tf.commit(params),
            ObjectKind::Data(_) | ObjectKind::Texture(_) | ObjectKind::FrameBuffer(_) => Ok(()),
        }
    }
}

macro_rules! kind_accessors {
    ($($variant:ident => $ty:ty, $name:literal, $get:ident, $get_mut:ident;)*) => {
        impl ObjectState {
            $(
                pub fn $get(&self) -> EngineResult<&$ty> {
                    match &self.kind {
                        ObjectKind::$variant(inner) => Ok(inner),
                        other => Err(EngineError::WrongKind { expected: $name, found: other.name() }),
                    }
                }

                pub fn $get_mut(&mut self) -> EngineResult<&mut $ty> {
                    match &mut self.kind {
                        ObjectKind::$variant(inner) => Ok(inner),
                        other => Err(EngineError::WrongKind { expected: $name, found: other.name() }),
                    }
                }
            )*
        }
    };
}

/// Parameter bag plus kind-specific state, guarded together
#[derive(Debug)]
pub struct ObjectState {
    pub params: Params,
    pub kind: ObjectKind,
}

kind_accessors! {
    Data => Data, "data", data, data_mut;
    Model => Model, "model", model, model_mut;
    Geometry => Geometry, "geometry", geometry, geometry_mut;
    Camera => Camera, "camera", camera, camera_mut;
    Renderer => Renderer, "renderer", renderer, renderer_mut;
    Light => Light, "light", light, light_mut;
    Material => Material, "material", material, material_mut;
    Volume => Volume, "volume", volume, volume_mut;
    Texture => Texture2D, "texture", texture, texture_mut;
    TransferFunction => TransferFunction, "transfer_function", transfer_function, transfer_function_mut;
    FrameBuffer => FrameBuffer, "framebuffer", framebuffer, framebuffer_mut;
}

/// An engine object shared by everything that references it
pub struct ManagedObject {
    type_name: String,
    refcount: AtomicU32,
    committed: AtomicBool,
    state: RwLock<ObjectState>,
}

/// Owning reference to a [`ManagedObject`]
///
/// Cloning is the reference increment, dropping the decrement.
pub struct ObjectRef(Arc<ManagedObject>);

impl ObjectRef {
    /// Construct a new object with a reference count of one
    pub fn new(type_name: impl Into<String>, kind: ObjectKind) -> Self {
        Self(Arc::new(ManagedObject {
            type_name: type_name.into(),
            refcount: AtomicU32::new(1),
            committed: AtomicBool::new(false),
            state: RwLock::new(ObjectState {
                params: Params::new(),
                kind,
            }),
        }))
    }

    /// The type name the object was created with
    pub fn type_name(&self) -> &str {
        &self.0.type_name
    }

    /// Current number of owners
    pub fn ref_count(&self) -> u32 {
        self.0.refcount.load(Ordering::Acquire)
    }

    /// Identity comparison
    pub fn ptr_eq(&self, other: &ObjectRef) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// Local address of the object, as written into resolved object arrays
    pub fn addr(&self) -> u64 {
        Arc::as_ptr(&self.0) as usize as u64
    }

    pub fn read(&self) -> RwLockReadGuard<'_, ObjectState> {
        self.0.state.read()
    }

    pub fn write(&self) -> RwLockWriteGuard<'_, ObjectState> {
        self.0.state.write()
    }

    /// Family name of the object
    pub fn kind_name(&self) -> &'static str {
        self.read().kind.name()
    }

    /// Stage a parameter; takes effect on the next commit
    pub fn set_param(&self, name: impl Into<String>, value: Param) {
        self.write().params.set(name, value);
        self.0.committed.store(false, Ordering::Release);
    }

    /// Whether staged parameters have been realized
    pub fn is_committed(&self) -> bool {
        self.0.committed.load(Ordering::Acquire)
    }

    /// Mark the object as carrying unrealized edits
    pub fn mark_dirty(&self) {
        self.0.committed.store(false, Ordering::Release);
    }

    /// Realize staged parameters into engine state
    pub fn commit(&self) -> EngineResult<()> {
        let mut guard = self.write();
        let ObjectState { params, kind } = &mut *guard;
        kind.commit(params)?;
        self.0.committed.store(true, Ordering::Release);
        Ok(())
    }
}

impl Clone for ObjectRef {
    fn clone(&self) -> Self {
        self.0.refcount.fetch_add(1, Ordering::AcqRel);
        Self(Arc::clone(&self.0))
    }
}

impl Drop for ObjectRef {
    fn drop(&mut self) {
        self.0.refcount.fetch_sub(1, Ordering::AcqRel);
    }
}

impl PartialEq for ObjectRef {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for ObjectRef {}

impl fmt::Debug for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ObjectRef({}@{:#x}, refs={})",
            self.type_name(),
            self.addr(),
            self.ref_count()
        )
    }
}
