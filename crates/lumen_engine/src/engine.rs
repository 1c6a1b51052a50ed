//! Engine entry point
//!
//! [`Engine::init`] has to run after configuration is parsed and before any
//! object is created. It fixes the render thread count and tile size for the
//! life of the process and owns the object factories.

use std::path::Path;

use lumen_core::{DataType, TextureFormat};

use crate::buffer::{MappedBuffer, RetainedBuffer};
use crate::data::Data;
use crate::error::{EngineError, EngineResult};
use crate::factory::Factories;
use crate::framebuffer::{Channels, ColorFormat, FrameBuffer};
use crate::geometry::{Geometry, GeometryKind};
use crate::load_balancer::InterleavedTiledLoadBalancer;
use crate::model::Model;
use crate::object::{ObjectKind, ObjectRef};
use crate::render;
use crate::texture::Texture2D;
use crate::tile::{TileGrid, TILE_SIZE};
use crate::volume::Volume;

/// Engine start-up options
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Render threads; `None` uses every available core
    pub num_threads: Option<usize>,
    /// Tile edge length in pixels
    pub tile_size: u32,
    /// Debug mode renders on a single thread
    pub debug: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            num_threads: None,
            tile_size: TILE_SIZE,
            debug: false,
        }
    }
}

/// The initialised engine
#[derive(Debug)]
pub struct Engine {
    threads: usize,
    tile_size: u32,
    factories: Factories,
}

impl Engine {
    /// Initialise the engine with the built-in factories
    pub fn init(config: EngineConfig) -> EngineResult<Self> {
        if config.tile_size == 0 {
            return Err(EngineError::invalid_param("tile_size", "tile size must be positive"));
        }
        let threads = if config.debug {
            1
        } else {
            match config.num_threads {
                Some(0) => {
                    return Err(EngineError::invalid_param("num_threads", "thread count must be positive"))
                }
                Some(n) => n,
                None => std::thread::available_parallelism().map_or(1, |n| n.get()),
            }
        };

        log::info!(
            "Engine initialised: {} render thread(s), {}px tiles{}",
            threads,
            config.tile_size,
            if config.debug { ", debug" } else { "" }
        );

        Ok(Self {
            threads,
            tile_size: config.tile_size,
            factories: Factories::builtin(),
        })
    }

    pub fn threads(&self) -> usize {
        self.threads
    }

    pub fn tile_size(&self) -> u32 {
        self.tile_size
    }

    pub fn factories(&self) -> &Factories {
        &self.factories
    }

    pub fn factories_mut(&mut self) -> &mut Factories {
        &mut self.factories
    }

    pub fn new_model(&self) -> ObjectRef {
        ObjectRef::new("model", ObjectKind::Model(Model::new()))
    }

    pub fn new_triangle_mesh(&self) -> ObjectRef {
        ObjectRef::new(
            "trianglemesh",
            ObjectKind::Geometry(Geometry::new(GeometryKind::Triangles)),
        )
    }

    pub fn new_geometry(&self, type_name: &str) -> EngineResult<ObjectRef> {
        let geometry = self.factories.geometry.create(type_name)?;
        Ok(ObjectRef::new(type_name, ObjectKind::Geometry(geometry)))
    }

    pub fn new_camera(&self, type_name: &str) -> EngineResult<ObjectRef> {
        let camera = self.factories.camera.create(type_name)?;
        Ok(ObjectRef::new(type_name, ObjectKind::Camera(camera)))
    }

    pub fn new_renderer(&self, type_name: &str) -> EngineResult<ObjectRef> {
        let renderer = self.factories.renderer.create(type_name)?;
        Ok(ObjectRef::new(type_name, ObjectKind::Renderer(renderer)))
    }

    pub fn new_volume(&self, type_name: &str) -> EngineResult<ObjectRef> {
        let layout = self.factories.volume.create(type_name)?;
        Ok(ObjectRef::new(type_name, ObjectKind::Volume(Volume::new(layout))))
    }

    /// Create a volume whose voxel storage is the raw contents of `path`
    pub fn new_volume_from_file(&self, path: &Path, type_name: &str) -> EngineResult<ObjectRef> {
        let layout = self.factories.volume.create(type_name)?;
        let volume = Volume::from_file(layout, path)?;
        Ok(ObjectRef::new(type_name, ObjectKind::Volume(volume)))
    }

    pub fn new_transfer_function(&self, type_name: &str) -> EngineResult<ObjectRef> {
        let tf = self.factories.transfer_function.create(type_name)?;
        Ok(ObjectRef::new(type_name, ObjectKind::TransferFunction(tf)))
    }

    /// Create a material, asking `renderer` first and the global catalogue
    /// second. `Ok(None)` means neither recognises `type_name`.
    pub fn new_material(&self, renderer: Option<&ObjectRef>, type_name: &str) -> EngineResult<Option<ObjectRef>> {
        let from_renderer = match renderer {
            Some(renderer) => renderer.read().renderer()?.create_material(type_name),
            None => None,
        };
        Ok(from_renderer
            .or_else(|| self.factories.material.try_create(type_name))
            .map(|material| ObjectRef::new(type_name, ObjectKind::Material(material))))
    }

    /// Create a light, asking `renderer` first and the global catalogue
    /// second. `Ok(None)` means neither recognises `type_name`.
    pub fn new_light(&self, renderer: Option<&ObjectRef>, type_name: &str) -> EngineResult<Option<ObjectRef>> {
        let from_renderer = match renderer {
            Some(renderer) => renderer.read().renderer()?.create_light(type_name),
            None => None,
        };
        Ok(from_renderer
            .or_else(|| self.factories.light.try_create(type_name))
            .map(|light| ObjectRef::new(type_name, ObjectKind::Light(light))))
    }

    /// Data array aliasing a retained transport buffer
    pub fn new_shared_data(
        &self,
        count: usize,
        element_type: DataType,
        flags: u32,
        buffer: RetainedBuffer,
    ) -> EngineResult<ObjectRef> {
        let data = Data::shared(count, element_type, flags, buffer)?;
        Ok(ObjectRef::new("data", ObjectKind::Data(data)))
    }

    /// Zero-filled, locally owned data array
    pub fn new_empty_data(&self, count: usize, element_type: DataType, flags: u32) -> EngineResult<ObjectRef> {
        let data = Data::zeroed(count, element_type, flags)?;
        Ok(ObjectRef::new("data", ObjectKind::Data(data)))
    }

    pub fn new_texture2d(
        &self,
        width: i32,
        height: i32,
        format: TextureFormat,
        flags: u32,
        buffer: RetainedBuffer,
    ) -> EngineResult<ObjectRef> {
        let texture = Texture2D::new(width, height, format, flags, buffer)?;
        Ok(ObjectRef::new("texture2d", ObjectKind::Texture(texture)))
    }

    pub fn new_framebuffer(
        &self,
        width: i32,
        height: i32,
        format: ColorFormat,
        channels: Channels,
        pixels: Option<MappedBuffer>,
    ) -> EngineResult<ObjectRef> {
        let fb = FrameBuffer::new(width, height, format, channels, pixels)?;
        Ok(ObjectRef::new("framebuffer", ObjectKind::FrameBuffer(fb)))
    }

    /// Render one frame synchronously
    ///
    /// Only the tiles `balancer` assigns to this device are traced. The
    /// render pool is joined before this returns.
    pub fn render_frame(
        &self,
        framebuffer: &ObjectRef,
        renderer: &ObjectRef,
        channels: Channels,
        balancer: &InterleavedTiledLoadBalancer,
    ) -> EngineResult<()> {
        let setup = renderer.read().renderer()?.frame_setup()?;

        let mut state = framebuffer.write();
        let fb = state.framebuffer_mut()?;
        let size = (fb.width(), fb.height());
        let grid = TileGrid::new(size.0, size.1, self.tile_size);
        let tiles = balancer.tiles(&grid);

        let frame = fb.begin_frame(channels);
        let outputs = render::render_tiles(&setup, size, &tiles, self.threads, frame)?;
        for tile in &outputs {
            fb.write_tile(tile, channels);
        }

        log::trace!(
            "Rendered {}/{} tiles of a {}x{} frame",
            tiles.len(),
            grid.count(),
            size.0,
            size.1
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::param::Param;
    use crate::renderer::RendererKind;
    use lumen_math::Vec3;

    fn engine() -> Engine {
        Engine::init(EngineConfig {
            num_threads: Some(2),
            tile_size: 2,
            debug: false,
        })
        .unwrap()
    }

    fn float3_data(engine: &Engine, values: &[[f32; 3]]) -> ObjectRef {
        let bytes: Vec<u8> = values.iter().flatten().flat_map(|f| f.to_le_bytes()).collect();
        let buffer = MappedBuffer::new(bytes);
        engine
            .new_shared_data(values.len(), DataType::Float3, 0, buffer.retain().unwrap())
            .unwrap()
    }

    #[test]
    fn test_init_threads() {
        let debug = Engine::init(EngineConfig {
            num_threads: Some(8),
            debug: true,
            ..EngineConfig::default()
        })
        .unwrap();
        assert_eq!(debug.threads(), 1);
        assert_eq!(debug.tile_size(), TILE_SIZE);

        assert!(Engine::init(EngineConfig {
            tile_size: 0,
            ..EngineConfig::default()
        })
        .is_err());
        assert!(Engine::init(EngineConfig::default()).unwrap().threads() >= 1);
    }

    #[test]
    fn test_unknown_types() {
        let engine = engine();
        assert!(matches!(
            engine.new_geometry("nurbs"),
            Err(EngineError::UnknownType { kind: "geometry", .. })
        ));
        assert!(engine.new_renderer("pathtracer").is_err());
        assert!(engine.new_volume("amr_volume").is_err());
    }

    #[test]
    fn test_registered_type_is_constructible() {
        let mut engine = engine();
        engine
            .factories_mut()
            .geometry
            .register("quads", || Geometry::new(GeometryKind::Triangles));
        let quads = engine.new_geometry("quads").unwrap();
        assert_eq!(quads.type_name(), "quads");
        assert!(quads.read().geometry().is_ok());
    }

    #[test]
    fn test_material_renderer_then_global() {
        let engine = engine();
        let renderer = engine.new_renderer("ao").unwrap();

        let obj = engine.new_material(Some(&renderer), "OBJMaterial").unwrap();
        assert!(obj.is_some());
        let global = engine.new_material(Some(&renderer), "Default").unwrap();
        assert!(global.is_some());
        assert!(engine.new_material(Some(&renderer), "NoSuchMaterial").unwrap().is_none());
        assert!(engine.new_material(None, "OBJMaterial").unwrap().is_none());

        let model = engine.new_model();
        assert!(matches!(
            engine.new_material(Some(&model), "Default"),
            Err(EngineError::WrongKind { expected: "renderer", .. })
        ));
    }

    #[test]
    fn test_light_renderer_then_global() {
        let engine = engine();
        let renderer = engine.new_renderer("scivis").unwrap();
        assert!(engine.new_light(Some(&renderer), "PointLight").unwrap().is_some());
        assert!(engine.new_light(Some(&renderer), "ambient").unwrap().is_some());
        assert!(engine.new_light(Some(&renderer), "AreaLight").unwrap().is_none());
    }

    #[test]
    fn test_volume_from_missing_file() {
        let engine = engine();
        let dir = tempfile::tempdir().unwrap();
        let err = engine
            .new_volume_from_file(&dir.path().join("missing.raw"), "shared_structured_volume")
            .unwrap_err();
        assert!(matches!(err, EngineError::VolumeFile { .. }));
    }

    #[test]
    fn test_render_background() {
        let engine = engine();
        let pixels = MappedBuffer::zeroed(4 * 4 * 4);
        let fb = engine
            .new_framebuffer(4, 4, ColorFormat::Rgba8, Channels::COLOR, Some(pixels.clone()))
            .unwrap();
        let renderer = engine.new_renderer("scivis").unwrap();
        renderer.commit().unwrap();

        engine
            .render_frame(&fb, &renderer, Channels::COLOR, &InterleavedTiledLoadBalancer::single())
            .unwrap();
        assert!(pixels.to_vec().iter().all(|&b| b == 255));
    }

    #[test]
    fn test_render_only_owned_tiles() {
        let engine = engine();
        let pixels = MappedBuffer::zeroed(4 * 4 * 4);
        let fb = engine
            .new_framebuffer(4, 4, ColorFormat::Rgba8, Channels::COLOR, Some(pixels.clone()))
            .unwrap();
        let renderer = engine.new_renderer("scivis").unwrap();
        renderer.commit().unwrap();

        // 2x2 tiles, device 1 of 2 owns tiles 1 and 3 (the right column)
        let balancer = InterleavedTiledLoadBalancer::new(1, 2).unwrap();
        engine.render_frame(&fb, &renderer, Channels::COLOR, &balancer).unwrap();

        let state = fb.read();
        let fb = state.framebuffer().unwrap();
        for y in 0..4 {
            for x in 0..4 {
                let expected = if x >= 2 { 1.0 } else { 0.0 };
                assert_eq!(fb.read_pixel(x, y).unwrap().x, expected, "pixel {},{}", x, y);
            }
        }
    }

    #[test]
    fn test_render_sphere() {
        let engine = engine();
        let spheres = engine.new_geometry("spheres").unwrap();
        spheres.set_param("spheres", Param::Object(Some(float3_data(&engine, &[[0.0, 0.0, 0.0]]))));
        spheres.set_param("radius", Param::Float(1.0));
        spheres.commit().unwrap();

        let model = engine.new_model();
        model.write().model_mut().unwrap().add_geometry(spheres.clone());
        model.commit().unwrap();

        let camera = engine.new_camera("perspective").unwrap();
        camera.set_param("pos", Param::Float3([0.0, 0.0, 5.0]));
        camera.set_param("dir", Param::Float3([0.0, 0.0, -1.0]));
        camera.commit().unwrap();

        let renderer = engine.new_renderer("scivis").unwrap();
        renderer.set_param("model", Param::Object(Some(model.clone())));
        renderer.set_param("camera", Param::Object(Some(camera.clone())));
        renderer.commit().unwrap();
        assert_eq!(renderer.read().renderer().unwrap().kind(), RendererKind::SciVis);

        let fb = engine
            .new_framebuffer(8, 8, ColorFormat::Rgba32F, Channels::COLOR | Channels::DEPTH, Some(MappedBuffer::zeroed(8 * 8 * 16)))
            .unwrap();
        engine
            .render_frame(&fb, &renderer, Channels::COLOR | Channels::DEPTH, &InterleavedTiledLoadBalancer::single())
            .unwrap();

        let state = fb.read();
        let fb = state.framebuffer().unwrap();
        let center = fb.read_pixel(4, 4).unwrap();
        assert!(center.xyz() != Vec3::ONE);
        let corner = fb.read_pixel(0, 0).unwrap();
        assert_eq!(corner, lumen_math::Vec4::ONE);

        let depth = fb.depth().unwrap();
        assert!(depth[4 * 8 + 4] < 5.0);
        assert!(depth[0].is_infinite());
    }
}
