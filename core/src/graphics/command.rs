//! Render commands
//!
//! A [`Command`] is one immutable render-state mutation or draw request. It
//! is built on the logic thread, carries only owned values and
//! [`ResourceId`]s, and is consumed exactly once by the render context.

use super::desc::{
    BlendStateDesc, BufferDesc, ClearDesc, DrawDesc, SamplerDesc, ShaderDesc, TextureDesc,
    TextureLevel,
};
use super::handle::ResourceId;
use crate::types::Size2;

/// Sequence number of a flush sentinel.
pub type FenceId = u64;

/// One operation for the render device.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    InitBuffer {
        id: ResourceId,
        desc: BufferDesc,
    },
    SetBufferData {
        id: ResourceId,
        data: Vec<u8>,
    },
    InitTexture {
        id: ResourceId,
        desc: TextureDesc,
    },
    SetTextureData {
        id: ResourceId,
        levels: Vec<TextureLevel>,
    },
    SetTextureSampler {
        id: ResourceId,
        sampler: SamplerDesc,
    },
    InitShader {
        id: ResourceId,
        desc: ShaderDesc,
    },
    InitBlendState {
        id: ResourceId,
        desc: BlendStateDesc,
    },
    InitRenderTarget {
        id: ResourceId,
    },
    AddRenderTargetColorTexture {
        id: ResourceId,
        texture: ResourceId,
    },
    RemoveRenderTargetColorTexture {
        id: ResourceId,
        texture: ResourceId,
    },
    SetRenderTargetDepthTexture {
        id: ResourceId,
        texture: Option<ResourceId>,
    },
    /// Releases any kind of resource
    DeleteResource {
        id: ResourceId,
    },
    /// `None` selects the back buffer
    SetRenderTarget {
        id: Option<ResourceId>,
    },
    Clear(ClearDesc),
    Draw(Box<DrawDesc>),
    Present,
    Resize {
        size: Size2,
    },
    /// Flush sentinel, signalled back to the waiting logic thread
    Fence(FenceId),
}

impl Command {
    /// Short name for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Command::InitBuffer { .. } => "init_buffer",
            Command::SetBufferData { .. } => "set_buffer_data",
            Command::InitTexture { .. } => "init_texture",
            Command::SetTextureData { .. } => "set_texture_data",
            Command::SetTextureSampler { .. } => "set_texture_sampler",
            Command::InitShader { .. } => "init_shader",
            Command::InitBlendState { .. } => "init_blend_state",
            Command::InitRenderTarget { .. } => "init_render_target",
            Command::AddRenderTargetColorTexture { .. } => "add_render_target_color_texture",
            Command::RemoveRenderTargetColorTexture { .. } => "remove_render_target_color_texture",
            Command::SetRenderTargetDepthTexture { .. } => "set_render_target_depth_texture",
            Command::DeleteResource { .. } => "delete_resource",
            Command::SetRenderTarget { .. } => "set_render_target",
            Command::Clear(_) => "clear",
            Command::Draw(_) => "draw",
            Command::Present => "present",
            Command::Resize { .. } => "resize",
            Command::Fence(_) => "fence",
        }
    }

    /// Resource the command primarily targets, if any.
    pub fn target(&self) -> Option<ResourceId> {
        match self {
            Command::InitBuffer { id, .. }
            | Command::SetBufferData { id, .. }
            | Command::InitTexture { id, .. }
            | Command::SetTextureData { id, .. }
            | Command::SetTextureSampler { id, .. }
            | Command::InitShader { id, .. }
            | Command::InitBlendState { id, .. }
            | Command::InitRenderTarget { id }
            | Command::AddRenderTargetColorTexture { id, .. }
            | Command::RemoveRenderTargetColorTexture { id, .. }
            | Command::SetRenderTargetDepthTexture { id, .. }
            | Command::DeleteResource { id } => Some(*id),
            Command::SetRenderTarget { id } => *id,
            Command::Clear(_)
            | Command::Draw(_)
            | Command::Present
            | Command::Resize { .. }
            | Command::Fence(_) => None,
        }
    }
}

/// Commands recorded together and submitted as one contiguous batch.
///
/// Submitting a buffer takes the queue lock once, so commands from other
/// producers never interleave with the batch.
#[derive(Debug, Default)]
pub struct CommandBuffer {
    commands: Vec<Command>,
}

impl CommandBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            commands: Vec::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, command: Command) {
        self.commands.push(command);
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn into_commands(self) -> Vec<Command> {
        self.commands
    }
}
