//! Command frames

use lumen_engine::MappedBuffer;

use crate::stream::ArgWriter;
use crate::verb::Verb;

/// One command as delivered by the transport
#[derive(Debug, Clone, Default)]
pub struct CommandFrame {
    /// Raw verb id
    pub verb: u32,
    /// Bulk buffers, addressed by position
    pub buffers: Vec<MappedBuffer>,
    /// Argument blob
    pub args: Vec<u8>,
    /// Return slot, filled by the verbs that answer
    pub ret: Vec<u8>,
}

impl CommandFrame {
    pub fn new(verb: Verb, args: Vec<u8>) -> Self {
        Self {
            verb: verb.raw(),
            buffers: Vec::new(),
            args,
            ret: Vec::new(),
        }
    }

    /// Build a frame from an argument writer
    pub fn with_args(verb: Verb, args: &mut ArgWriter) -> Self {
        Self::new(verb, args.finish())
    }
}
