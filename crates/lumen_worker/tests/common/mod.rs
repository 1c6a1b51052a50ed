//! Host-side helpers shared by the integration tests

#![allow(dead_code)]

use lumen_core::{Handle, HandleMinter};
use lumen_engine::{Engine, EngineConfig, MappedBuffer, ObjectRef};
use lumen_worker::{ArgWriter, CommandFrame, DispatchResult, Dispatcher, Verb};

/// Plays the host: mints handles and packs commands
pub struct Host {
    pub worker: Dispatcher,
    minter: HandleMinter,
}

impl Host {
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    pub fn with_config(config: EngineConfig) -> Self {
        Self {
            worker: Dispatcher::new(Engine::init(config).unwrap()),
            minter: HandleMinter::new(1),
        }
    }

    pub fn handle(&mut self) -> Handle {
        self.minter.mint()
    }

    pub fn try_send(&mut self, verb: Verb, args: &mut ArgWriter, buffers: &[MappedBuffer]) -> DispatchResult<Vec<u8>> {
        let mut frame = CommandFrame::with_args(verb, args);
        frame.buffers = buffers.to_vec();
        self.worker.dispatch(&mut frame)?;
        Ok(frame.ret)
    }

    pub fn send(&mut self, verb: Verb, args: &mut ArgWriter, buffers: &[MappedBuffer]) -> Vec<u8> {
        self.try_send(verb, args, buffers)
            .unwrap_or_else(|e| panic!("{} failed: {}", verb, e))
    }

    pub fn object(&self, handle: Handle) -> ObjectRef {
        self.worker.object(handle).unwrap().clone()
    }

    /// Create an object through a verb that takes `handle, string type`
    pub fn new_named(&mut self, verb: Verb, type_name: &str) -> Handle {
        let h = self.handle();
        self.send(verb, ArgWriter::new().put_handle(h).put_string(type_name), &[]);
        h
    }

    pub fn new_model(&mut self) -> Handle {
        let h = self.handle();
        self.send(Verb::NewModel, ArgWriter::new().put_handle(h), &[]);
        h
    }

    pub fn commit(&mut self, handle: Handle) {
        self.send(Verb::Commit, ArgWriter::new().put_handle(handle), &[]);
    }

    /// `set_value` with a pre-encoded value
    pub fn set_value(&mut self, target: Handle, name: &str, type_tag: u32, value: &mut ArgWriter) {
        let mut args = ArgWriter::new();
        args.put_handle(target).put_string(name).put(type_tag);
        let mut bytes = args.finish();
        bytes.extend_from_slice(value.as_bytes());
        let mut frame = CommandFrame::new(Verb::SetValue, bytes);
        self.worker.dispatch(&mut frame).unwrap();
    }

    /// Shared data array over `bytes`
    pub fn new_data(&mut self, count: i32, type_tag: u32, bytes: Vec<u8>) -> (Handle, MappedBuffer) {
        let h = self.handle();
        let buffer = MappedBuffer::new(bytes);
        self.send(
            Verb::NewData,
            ArgWriter::new().put_handle(h).put(count).put(type_tag as i32).put(0i32),
            &[buffer.clone()],
        );
        (h, buffer)
    }
}

pub fn handle_bytes(handles: &[Handle]) -> Vec<u8> {
    handles.iter().flat_map(|h| h.to_bits().to_le_bytes()).collect()
}

pub fn f32_bytes(values: &[f32]) -> Vec<u8> {
    values.iter().flat_map(|v| v.to_le_bytes()).collect()
}

pub fn i32_bytes(values: &[i32]) -> Vec<u8> {
    values.iter().flat_map(|v| v.to_le_bytes()).collect()
}
