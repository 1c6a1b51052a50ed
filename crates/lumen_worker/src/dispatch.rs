//! Command dispatch
//!
//! The [`Dispatcher`] is the single context every verb handler runs
//! against: the handle table, the buffer manager, the installed load
//! balancer and the diagnostic flags. Verbs run one at a time, in the order
//! the transport delivers them, and each runs to completion.

use std::path::Path;

use lumen_core::{DataType, Handle, TextureFormat};
use lumen_engine::{
    Channels, ColorFormat, Engine, EngineError, EngineResult, InterleavedTiledLoadBalancer, MappedBuffer,
    ObjectRef, ObjectRegistry, Param,
};

use crate::buffers::BufferManager;
use crate::error::{DispatchError, DispatchResult};
use crate::frame::CommandFrame;
use crate::logging::Diagnostics;
use crate::stream::ArgStream;
use crate::verb::Verb;

type Constructor = fn(&Engine, &str) -> EngineResult<ObjectRef>;

/// Executes command frames against the engine
#[derive(Debug)]
pub struct Dispatcher {
    engine: Engine,
    objects: ObjectRegistry,
    buffers: BufferManager,
    balancer: Option<InterleavedTiledLoadBalancer>,
    diagnostics: Diagnostics,
}

impl Dispatcher {
    /// Create a dispatcher over an initialised engine
    pub fn new(engine: Engine) -> Self {
        Self::with_diagnostics(engine, Diagnostics::default())
    }

    pub fn with_diagnostics(engine: Engine, diagnostics: Diagnostics) -> Self {
        Self {
            engine,
            objects: ObjectRegistry::new(),
            buffers: BufferManager::new(),
            balancer: None,
            diagnostics,
        }
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    pub fn objects(&self) -> &ObjectRegistry {
        &self.objects
    }

    pub fn buffers(&self) -> &BufferManager {
        &self.buffers
    }

    /// Balancer installed by `initialize`, if it ran
    pub fn balancer(&self) -> Option<&InterleavedTiledLoadBalancer> {
        self.balancer.as_ref()
    }

    pub fn diagnostics(&self) -> Diagnostics {
        self.diagnostics
    }

    /// The object bound to `handle`
    pub fn object(&self, handle: Handle) -> DispatchResult<&ObjectRef> {
        self.objects.get(handle).ok_or(DispatchError::UnknownHandle(handle))
    }

    /// Execute one command
    pub fn dispatch(&mut self, frame: &mut CommandFrame) -> DispatchResult<()> {
        let verb = Verb::from_raw(frame.verb)?;
        log::trace!("{} ({} arg bytes, {} buffers)", verb, frame.args.len(), frame.buffers.len());

        let mut args = ArgStream::new(&frame.args);
        let buffers = frame.buffers.as_slice();

        match verb {
            Verb::Initialize => self.initialize(&mut args),
            Verb::NewModel => {
                let handle = args.get_handle()?;
                let model = self.engine.new_model();
                self.bind(handle, model)
            }
            Verb::NewTriangleMesh => {
                let handle = args.get_handle()?;
                let mesh = self.engine.new_triangle_mesh();
                self.bind(handle, mesh)
            }
            Verb::NewData => self.new_data(&mut args, buffers),
            Verb::CreateNewEmptyData => self.create_new_empty_data(&mut args),
            Verb::UploadDataChunk => self.upload_data_chunk(&mut args),
            Verb::UploadDataDone => self.upload_data_done(&mut args),
            Verb::NewGeometry => self.new_named(verb, &mut args, Engine::new_geometry),
            Verb::NewCamera => self.new_named(verb, &mut args, Engine::new_camera),
            Verb::NewVolume => self.new_named(verb, &mut args, Engine::new_volume),
            Verb::NewRenderer => self.new_named(verb, &mut args, Engine::new_renderer),
            Verb::NewTransferFunction => self.new_named(verb, &mut args, Engine::new_transfer_function),
            Verb::NewVolumeFromFile => self.new_volume_from_file(&mut args),
            Verb::NewFrameBuffer => self.new_framebuffer(&mut args, buffers),
            Verb::FrameBufferClear => {
                let handle = args.get_handle()?;
                let channels = Channels::from_bits(args.get()?);
                self.object(handle)?.write().framebuffer_mut()?.clear(channels);
                Ok(())
            }
            Verb::PinUploadBuffer => {
                let buffer = required_buffer(buffers, verb, 0)?;
                self.buffers.pin_upload(buffer.clone());
                Ok(())
            }
            Verb::NewMaterial => {
                let recognized = self.new_material(&mut args)?;
                frame.ret = vec![recognized as u8];
                Ok(())
            }
            Verb::NewLight => self.new_light(&mut args),
            Verb::NewTexture2D => self.new_texture2d(&mut args, buffers),
            Verb::AddGeometry => self.add_geometry(&mut args),
            Verb::RemoveGeometry => self.remove_geometry(&mut args),
            Verb::SetMaterial => self.set_material(&mut args),
            Verb::AddVolume => self.add_volume(&mut args),
            Verb::Commit => self.commit(&mut args),
            Verb::RenderFrame => self.render_frame(&mut args),
            // Rendering already completes inside render_frame
            Verb::RenderFrameSync => Ok(()),
            Verb::SetValue => self.set_value(&mut args),
            Verb::Release => self.release(&mut args),
        }
    }

    fn bind(&mut self, handle: Handle, object: ObjectRef) -> DispatchResult<()> {
        self.objects.assign(handle, object)?;
        Ok(())
    }

    fn initialize(&mut self, args: &mut ArgStream<'_>) -> DispatchResult<()> {
        let device_id = args.get::<i32>()?;
        let device_count = args.get::<i32>()?;
        let debug = args.get::<i32>()? != 0;
        let log_level = args.get::<i32>()?;

        let balancer = match (usize::try_from(device_id), usize::try_from(device_count)) {
            (Ok(id), Ok(count)) => InterleavedTiledLoadBalancer::new(id, count)?,
            _ => {
                return Err(EngineError::invalid_param(
                    "device",
                    format!("device {} of {} is out of range", device_id, device_count),
                )
                .into())
            }
        };

        self.diagnostics = Diagnostics::new(debug, log_level.max(0) as u32);
        self.diagnostics.apply();
        self.balancer = Some(balancer);
        log::info!(
            "Initialized device {} of {} (debug: {}, log level: {})",
            device_id,
            device_count,
            debug,
            log_level
        );
        Ok(())
    }

    fn new_data(&mut self, args: &mut ArgStream<'_>, buffers: &[MappedBuffer]) -> DispatchResult<()> {
        let handle = args.get_handle()?;
        let count = element_count(args.get()?)?;
        let element_type = data_type(Verb::NewData, args.get()?)?;
        let flags = args.get::<i32>()? as u32;

        let buffer = required_buffer(buffers, Verb::NewData, 0)?;
        let retained = self.buffers.retain(buffer)?;
        let data = self.engine.new_shared_data(count, element_type, flags, retained)?;
        if element_type.is_object() {
            data.write().data_mut()?.resolve_objects(&self.objects)?;
        }

        log::debug!("new_data {}: {} x {} (shared)", handle, count, element_type);
        self.bind(handle, data)
    }

    fn create_new_empty_data(&mut self, args: &mut ArgStream<'_>) -> DispatchResult<()> {
        let handle = args.get_handle()?;
        let count = element_count(args.get()?)?;
        let element_type = data_type(Verb::CreateNewEmptyData, args.get()?)?;
        let flags = args.get::<i32>()? as u32;

        let data = self.engine.new_empty_data(count, element_type, flags)?;
        log::debug!("create_new_empty_data {}: {} x {}", handle, count, element_type);
        self.bind(handle, data)
    }

    fn upload_data_chunk(&mut self, args: &mut ArgStream<'_>) -> DispatchResult<()> {
        let handle = args.get_handle()?;
        let begin = args.get::<i64>()?;
        let size = args.get::<i64>()?;

        let object = self.object(handle)?;
        let mut state = object.write();
        let data = state.data_mut()?;
        self.buffers
            .copy_upload(begin, size, |offset, bytes| Ok(data.write_bytes(offset, bytes)?))?;
        log::debug!("upload_data_chunk {}: {} bytes at {}", handle, size, begin);
        Ok(())
    }

    fn upload_data_done(&mut self, args: &mut ArgStream<'_>) -> DispatchResult<()> {
        let handle = args.get_handle()?;
        let _count = args.get::<i32>()?;
        let element_type = data_type(Verb::UploadDataDone, args.get()?)?;
        let _flags = args.get::<i32>()?;

        if element_type.is_object() {
            let object = self.object(handle)?;
            let resolved = object.write().data_mut()?.resolve_objects(&self.objects)?;
            if !resolved {
                log::debug!("upload_data_done {}: object array already resolved", handle);
            }
        }
        log::debug!("upload_data_done {}", handle);
        Ok(())
    }

    fn new_named(&mut self, verb: Verb, args: &mut ArgStream<'_>, create: Constructor) -> DispatchResult<()> {
        let handle = args.get_handle()?;
        let type_name = args.get_string()?;
        let object = create(&self.engine, &type_name)?;

        match verb {
            Verb::NewVolume | Verb::NewTransferFunction => {
                log::info!("{} {}: '{}'", verb, handle, type_name)
            }
            _ => log::debug!("{} {}: '{}'", verb, handle, type_name),
        }
        self.bind(handle, object)
    }

    fn new_volume_from_file(&mut self, args: &mut ArgStream<'_>) -> DispatchResult<()> {
        let handle = args.get_handle()?;
        let filename = args.get_string()?;
        let type_name = args.get_string()?;

        let volume = self.engine.new_volume_from_file(Path::new(&filename), &type_name)?;
        log::info!("new_volume_from_file {}: '{}' from {}", handle, type_name, filename);
        self.bind(handle, volume)
    }

    fn new_framebuffer(&mut self, args: &mut ArgStream<'_>, buffers: &[MappedBuffer]) -> DispatchResult<()> {
        let handle = args.get_handle()?;
        let width = args.get::<i32>()?;
        let height = args.get::<i32>()?;
        let format = ColorFormat::from_raw(args.get()?)?;
        let channels = Channels::from_bits(args.get()?);

        let pixels = match format {
            ColorFormat::None => buffers.first().cloned(),
            _ => Some(required_buffer(buffers, Verb::NewFrameBuffer, 0)?.clone()),
        };
        let framebuffer = self.engine.new_framebuffer(width, height, format, channels, pixels)?;
        log::debug!("new_framebuffer {}: {}x{} {:?}", handle, width, height, format);
        self.bind(handle, framebuffer)
    }

    /// Returns whether the material type was recognized
    fn new_material(&mut self, args: &mut ArgStream<'_>) -> DispatchResult<bool> {
        let handle = args.get_handle()?;
        let renderer = args.get_handle()?;
        let type_name = args.get_string()?;

        let renderer = self.objects.lookup(renderer)?;
        match self.engine.new_material(renderer, &type_name)? {
            Some(material) => {
                self.bind(handle, material)?;
                Ok(true)
            }
            None => {
                log::debug!("new_material {}: unknown material type '{}'", handle, type_name);
                Ok(false)
            }
        }
    }

    fn new_light(&mut self, args: &mut ArgStream<'_>) -> DispatchResult<()> {
        let handle = args.get_handle()?;
        let renderer = args.get_handle()?;
        let type_name = args.get_string()?;

        let renderer = self.objects.lookup(renderer)?;
        let light = self
            .engine
            .new_light(renderer, &type_name)?
            .ok_or(DispatchError::UnknownLightType(type_name))?;
        self.bind(handle, light)
    }

    fn new_texture2d(&mut self, args: &mut ArgStream<'_>, buffers: &[MappedBuffer]) -> DispatchResult<()> {
        let handle = args.get_handle()?;
        let width = args.get::<i32>()?;
        let height = args.get::<i32>()?;
        let format = TextureFormat::from_raw(args.get::<i32>()? as u32).map_err(EngineError::from)?;
        let flags = args.get::<i32>()? as u32;

        let buffer = required_buffer(buffers, Verb::NewTexture2D, 0)?;
        let retained = self.buffers.retain(buffer)?;
        let texture = self.engine.new_texture2d(width, height, format, flags, retained)?;
        log::debug!("new_texture2d {}: {}x{} {:?}", handle, width, height, format);
        self.bind(handle, texture)
    }

    fn add_geometry(&mut self, args: &mut ArgStream<'_>) -> DispatchResult<()> {
        let model = self.object(args.get_handle()?)?;
        let geometry = self.object(args.get_handle()?)?;
        geometry.read().geometry()?;

        model.write().model_mut()?.add_geometry(geometry.clone());
        model.mark_dirty();
        Ok(())
    }

    fn remove_geometry(&mut self, args: &mut ArgStream<'_>) -> DispatchResult<()> {
        let model_handle = args.get_handle()?;
        let model = self.object(model_handle)?;
        let geometry = self.object(args.get_handle()?)?;

        if model.write().model_mut()?.remove_geometry(geometry) {
            model.mark_dirty();
        } else {
            log::debug!("remove_geometry {}: geometry not in model", model_handle);
        }
        Ok(())
    }

    fn set_material(&mut self, args: &mut ArgStream<'_>) -> DispatchResult<()> {
        let geometry = self.object(args.get_handle()?)?;
        let material = self.objects.lookup(args.get_handle()?)?;
        if let Some(material) = material {
            material.read().material()?;
        }

        geometry.write().geometry_mut()?.set_material(material.cloned());
        geometry.mark_dirty();
        Ok(())
    }

    fn add_volume(&mut self, args: &mut ArgStream<'_>) -> DispatchResult<()> {
        let model = self.object(args.get_handle()?)?;
        let volume = self.object(args.get_handle()?)?;
        volume.read().volume()?;

        model.write().model_mut()?.add_volume(volume.clone());
        model.mark_dirty();
        Ok(())
    }

    fn commit(&mut self, args: &mut ArgStream<'_>) -> DispatchResult<()> {
        let handle = args.get_handle()?;
        let object = self.object(handle)?;
        object.commit()?;
        log::info!("Committed {} {} ('{}')", object.kind_name(), handle, object.type_name());
        Ok(())
    }

    fn render_frame(&mut self, args: &mut ArgStream<'_>) -> DispatchResult<()> {
        let framebuffer = self.object(args.get_handle()?)?;
        let renderer = self.object(args.get_handle()?)?;
        let channels = Channels::from_bits(args.get()?);

        let balancer = self.balancer.unwrap_or_default();
        self.engine.render_frame(framebuffer, renderer, channels, &balancer)?;
        Ok(())
    }

    fn set_value(&mut self, args: &mut ArgStream<'_>) -> DispatchResult<()> {
        let handle = args.get_handle()?;
        let name = args.get_string()?;
        let Some(target) = self.objects.get(handle) else {
            log::debug!("set_value '{}' on unbound handle {}, dropped", name, handle);
            return Ok(());
        };

        let type_tag = args.get::<u32>()?;
        let unsupported = DispatchError::UnsupportedType {
            verb: Verb::SetValue.name(),
            type_tag,
        };
        let Ok(value_type) = DataType::from_raw(type_tag) else {
            return Err(unsupported);
        };
        let value = match value_type {
            DataType::Int => Param::Int(args.get()?),
            DataType::Int2 => Param::Int2(args.get()?),
            DataType::Int3 => Param::Int3(args.get()?),
            DataType::Int4 => Param::Int4(args.get()?),
            DataType::UInt => Param::UInt(args.get()?),
            DataType::UInt2 => Param::UInt2(args.get()?),
            DataType::UInt3 => Param::UInt3(args.get()?),
            DataType::UInt4 => Param::UInt4(args.get()?),
            DataType::Float => Param::Float(args.get()?),
            DataType::Float2 => Param::Float2(args.get()?),
            DataType::Float3 => Param::Float3(args.get()?),
            DataType::Float4 => Param::Float4(args.get()?),
            DataType::String => Param::String(args.get_string()?),
            ty if ty.is_object() => Param::Object(self.objects.lookup(args.get_handle()?)?.cloned()),
            _ => return Err(unsupported),
        };

        target.set_param(name, value);
        Ok(())
    }

    fn release(&mut self, args: &mut ArgStream<'_>) -> DispatchResult<()> {
        let handle = args.get_handle()?;
        let object = self.objects.release(handle)?;
        log::debug!(
            "Released {} {}, {} other reference(s)",
            object.kind_name(),
            handle,
            object.ref_count().saturating_sub(1)
        );
        Ok(())
    }
}

fn required_buffer(buffers: &[MappedBuffer], verb: Verb, index: usize) -> DispatchResult<&MappedBuffer> {
    buffers.get(index).ok_or(DispatchError::MissingBuffer {
        verb: verb.name(),
        index,
    })
}

fn element_count(raw: i32) -> DispatchResult<usize> {
    usize::try_from(raw)
        .map_err(|_| EngineError::invalid_param("count", format!("negative element count {}", raw)).into())
}

/// Element type of a data array; strings are never accepted
fn data_type(verb: Verb, raw: i32) -> DispatchResult<DataType> {
    let unsupported = || DispatchError::UnsupportedType {
        verb: verb.name(),
        type_tag: raw as u32,
    };
    match u32::try_from(raw).ok().map(DataType::from_raw) {
        Some(Ok(DataType::String)) | Some(Err(_)) | None => Err(unsupported()),
        Some(Ok(ty)) => Ok(ty),
    }
}
