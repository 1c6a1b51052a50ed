//! Verb table

use std::fmt;

use crate::error::DispatchError;

/// A command selector, numbered in table order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum Verb {
    Initialize = 0,
    NewModel,
    NewTriangleMesh,
    NewData,
    UploadDataDone,
    UploadDataChunk,
    CreateNewEmptyData,
    NewGeometry,
    NewFrameBuffer,
    FrameBufferClear,
    NewCamera,
    NewVolume,
    NewVolumeFromFile,
    NewTransferFunction,
    NewRenderer,
    PinUploadBuffer,
    NewMaterial,
    NewLight,
    NewTexture2D,
    AddGeometry,
    SetMaterial,
    Commit,
    RemoveGeometry,
    RenderFrame,
    RenderFrameSync,
    SetValue,
    Release,
    AddVolume,
}

impl Verb {
    pub const ALL: [Verb; 28] = [
        Verb::Initialize,
        Verb::NewModel,
        Verb::NewTriangleMesh,
        Verb::NewData,
        Verb::UploadDataDone,
        Verb::UploadDataChunk,
        Verb::CreateNewEmptyData,
        Verb::NewGeometry,
        Verb::NewFrameBuffer,
        Verb::FrameBufferClear,
        Verb::NewCamera,
        Verb::NewVolume,
        Verb::NewVolumeFromFile,
        Verb::NewTransferFunction,
        Verb::NewRenderer,
        Verb::PinUploadBuffer,
        Verb::NewMaterial,
        Verb::NewLight,
        Verb::NewTexture2D,
        Verb::AddGeometry,
        Verb::SetMaterial,
        Verb::Commit,
        Verb::RemoveGeometry,
        Verb::RenderFrame,
        Verb::RenderFrameSync,
        Verb::SetValue,
        Verb::Release,
        Verb::AddVolume,
    ];

    /// Decode a raw verb id
    pub fn from_raw(raw: u32) -> Result<Self, DispatchError> {
        Self::ALL
            .get(raw as usize)
            .copied()
            .ok_or(DispatchError::UnknownVerb(raw))
    }

    #[inline]
    pub const fn raw(self) -> u32 {
        self as u32
    }

    /// Wire name of the verb
    pub const fn name(self) -> &'static str {
        match self {
            Verb::Initialize => "initialize",
            Verb::NewModel => "new_model",
            Verb::NewTriangleMesh => "new_trianglemesh",
            Verb::NewData => "new_data",
            Verb::UploadDataDone => "upload_data_done",
            Verb::UploadDataChunk => "upload_data_chunk",
            Verb::CreateNewEmptyData => "create_new_empty_data",
            Verb::NewGeometry => "new_geometry",
            Verb::NewFrameBuffer => "new_framebuffer",
            Verb::FrameBufferClear => "framebuffer_clear",
            Verb::NewCamera => "new_camera",
            Verb::NewVolume => "new_volume",
            Verb::NewVolumeFromFile => "new_volume_from_file",
            Verb::NewTransferFunction => "new_transfer_function",
            Verb::NewRenderer => "new_renderer",
            Verb::PinUploadBuffer => "pin_upload_buffer",
            Verb::NewMaterial => "new_material",
            Verb::NewLight => "new_light",
            Verb::NewTexture2D => "new_texture2d",
            Verb::AddGeometry => "add_geometry",
            Verb::SetMaterial => "set_material",
            Verb::Commit => "commit",
            Verb::RemoveGeometry => "remove_geometry",
            Verb::RenderFrame => "render_frame",
            Verb::RenderFrameSync => "render_frame_sync",
            Verb::SetValue => "set_value",
            Verb::Release => "release",
            Verb::AddVolume => "add_volume",
        }
    }

    /// Bytes the verb writes to the return slot
    pub const fn return_len(self) -> usize {
        match self {
            Verb::NewMaterial => 1,
            _ => 0,
        }
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
