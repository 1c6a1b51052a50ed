//! # Lumen Engine
//!
//! The in-process rendering engine driven by the command worker. The worker
//! never renders directly: it builds a graph of reference-counted managed
//! objects, mutates their parameter bags, commits them and asks the engine
//! for frames.
//!
//! ## Architecture
//!
//! ```text
//! set_value ──► Params (staged) ──► commit ──► realized state ──► Model::finalize ──► Scene + BVH
//!                                                                                       │
//! render_frame ──► balancer picks tiles ──► scoped worker pool traces tiles ◄───────────┘
//!                                                   │
//!                                                   ▼
//!                                      FrameBuffer (host-mapped pixels)
//! ```
//!
//! ## Key Concepts
//!
//! - **ObjectRef**: owning reference to a [`ManagedObject`], carrying an
//!   explicit reference count
//! - **Params**: the staged, string-keyed property bag of every object
//! - **Commit**: realizes staged parameters into engine state; committing a
//!   model also finalizes it
//! - **MappedBuffer**: memory owned by the transport, retained while engine
//!   objects alias it

pub mod error;
pub mod buffer;
pub mod param;
pub mod object;
pub mod data;
pub mod geometry;
pub mod material;
pub mod light;
pub mod camera;
pub mod transfer_function;
pub mod volume;
pub mod texture;
pub mod model;
pub mod scene;
pub mod bvh;
pub mod renderer;
pub mod framebuffer;
pub mod tile;
pub mod load_balancer;
pub mod factory;
pub mod engine;
mod render;

pub use error::{EngineError, EngineResult};
pub use buffer::{BytesMut, BytesRef, MappedBuffer, RetainedBuffer};
pub use param::{Param, Params};
pub use object::{ManagedObject, ObjectKind, ObjectRef, ObjectRegistry, ObjectState};
pub use data::{Data, DATA_SHARED_BUFFER};
pub use geometry::{Geometry, GeometryKind};
pub use material::Material;
pub use light::{Light, LightKind};
pub use camera::{Camera, CameraFrame, CameraKind};
pub use transfer_function::TransferFunction;
pub use volume::{Volume, VolumeLayout};
pub use texture::Texture2D;
pub use model::Model;
pub use scene::{Primitive, Scene, SurfaceHit};
pub use bvh::Bvh;
pub use renderer::{Renderer, RendererKind};
pub use framebuffer::{Channels, ColorFormat, FrameBuffer};
pub use tile::{TileGrid, TileRect, TILE_SIZE};
pub use load_balancer::InterleavedTiledLoadBalancer;
pub use factory::{Constructor, Factories, Factory};
pub use engine::{Engine, EngineConfig};
