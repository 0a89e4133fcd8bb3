//! Logic-thread renderer API
//!
//! [`Renderer`] turns resource creation and draw calls into commands.
//! Every created resource is returned as an owning wrapper holding its
//! handle; dropping the wrapper queues the matching delete. Handles are
//! allocated immediately, so wrappers are usable before the render context
//! has created the native object.

use std::sync::Arc;

use bytemuck::Pod;

use super::command::{Command, CommandBuffer};
use super::desc::{
    BlendStateDesc, BufferDesc, ClearDesc, DrawDesc, SamplerDesc, ShaderDesc, TextureDesc,
    TextureLevel,
};
use super::device::{DeviceShared, DeviceStats, RenderDevice};
use super::handle::ResourceId;
use super::state::BufferKind;
use super::GraphicsDriver;
use crate::types::{Image, PixelFormat, Size2};

/// Owned handle that queues a delete when dropped.
#[derive(Debug)]
struct OwnedHandle {
    id: ResourceId,
    shared: Arc<DeviceShared>,
}

impl OwnedHandle {
    fn push(&self, command: Command) {
        self.shared.push(command);
    }
}

impl Drop for OwnedHandle {
    fn drop(&mut self) {
        self.shared.push(Command::DeleteResource { id: self.id });
    }
}

/// GPU buffer owned by the logic side.
#[derive(Debug)]
pub struct Buffer {
    handle: OwnedHandle,
    kind: BufferKind,
    dynamic: bool,
}

impl Buffer {
    pub fn id(&self) -> ResourceId {
        self.handle.id
    }

    pub fn kind(&self) -> BufferKind {
        self.kind
    }

    pub fn is_dynamic(&self) -> bool {
        self.dynamic
    }

    /// Replaces the contents; the backend grows the buffer if needed.
    pub fn set_data(&self, data: Vec<u8>) {
        self.handle.push(Command::SetBufferData { id: self.id(), data });
    }

    pub fn set_data_from_slice<T: Pod>(&self, data: &[T]) {
        self.set_data(bytemuck::cast_slice(data).to_vec());
    }
}

/// Texture owned by the logic side.
#[derive(Debug)]
pub struct Texture {
    handle: OwnedHandle,
    size: Size2,
    pixel_format: PixelFormat,
}

impl Texture {
    pub fn id(&self) -> ResourceId {
        self.handle.id
    }

    pub fn size(&self) -> Size2 {
        self.size
    }

    pub fn pixel_format(&self) -> PixelFormat {
        self.pixel_format
    }

    pub fn set_data(&self, levels: Vec<TextureLevel>) {
        self.handle.push(Command::SetTextureData { id: self.id(), levels });
    }

    pub fn set_sampler(&self, sampler: SamplerDesc) {
        self.handle.push(Command::SetTextureSampler { id: self.id(), sampler });
    }
}

/// Shader program owned by the logic side.
#[derive(Debug)]
pub struct Shader {
    handle: OwnedHandle,
}

impl Shader {
    pub fn id(&self) -> ResourceId {
        self.handle.id
    }
}

/// Blend state owned by the logic side.
#[derive(Debug)]
pub struct BlendState {
    handle: OwnedHandle,
    desc: BlendStateDesc,
}

impl BlendState {
    pub fn id(&self) -> ResourceId {
        self.handle.id
    }

    pub fn desc(&self) -> &BlendStateDesc {
        &self.desc
    }
}

/// Render target owned by the logic side.
///
/// Tracks its attachments so repeated adds or removes of the same texture
/// don't reach the queue.
#[derive(Debug)]
pub struct RenderTarget {
    handle: OwnedHandle,
    color: Vec<ResourceId>,
    depth: Option<ResourceId>,
}

impl RenderTarget {
    pub fn id(&self) -> ResourceId {
        self.handle.id
    }

    pub fn color_textures(&self) -> &[ResourceId] {
        &self.color
    }

    pub fn depth_texture(&self) -> Option<ResourceId> {
        self.depth
    }

    /// Attaches a color texture. Returns `false` if already attached.
    pub fn add_color_texture(&mut self, texture: &Texture) -> bool {
        if self.color.contains(&texture.id()) {
            return false;
        }
        self.color.push(texture.id());
        self.handle.push(Command::AddRenderTargetColorTexture {
            id: self.id(),
            texture: texture.id(),
        });
        true
    }

    /// Detaches a color texture. Returns `false` if it wasn't attached.
    pub fn remove_color_texture(&mut self, texture: &Texture) -> bool {
        let Some(index) = self.color.iter().position(|&c| c == texture.id()) else {
            return false;
        };
        self.color.remove(index);
        self.handle.push(Command::RemoveRenderTargetColorTexture {
            id: self.id(),
            texture: texture.id(),
        });
        true
    }

    pub fn set_depth_texture(&mut self, texture: Option<&Texture>) {
        let texture = texture.map(Texture::id);
        if self.depth == texture {
            return;
        }
        self.depth = texture;
        self.handle.push(Command::SetRenderTargetDepthTexture { id: self.id(), texture });
    }
}

/// Command-producing front end of a [`RenderDevice`].
pub struct Renderer {
    device: RenderDevice,
}

impl Renderer {
    pub fn new(device: RenderDevice) -> Self {
        Self { device }
    }

    pub fn device(&self) -> &RenderDevice {
        &self.device
    }

    pub fn device_mut(&mut self) -> &mut RenderDevice {
        &mut self.device
    }

    pub fn driver(&self) -> GraphicsDriver {
        self.device.driver()
    }

    pub fn size(&self) -> Size2 {
        self.device.options().size
    }

    pub fn stats(&self) -> DeviceStats {
        self.device.stats()
    }

    fn own(&self) -> OwnedHandle {
        OwnedHandle {
            id: self.device.allocate(),
            shared: Arc::clone(self.device.shared()),
        }
    }

    pub fn create_buffer(&self, desc: BufferDesc) -> Buffer {
        let handle = self.own();
        let buffer = Buffer {
            kind: desc.kind,
            dynamic: desc.dynamic,
            handle,
        };
        self.device.push(Command::InitBuffer { id: buffer.id(), desc });
        buffer
    }

    pub fn create_index_buffer<T: Pod>(&self, indices: &[T], dynamic: bool) -> Buffer {
        self.create_buffer(BufferDesc::new(
            BufferKind::Index,
            dynamic,
            bytemuck::cast_slice(indices).to_vec(),
        ))
    }

    pub fn create_vertex_buffer<T: Pod>(&self, vertices: &[T], dynamic: bool) -> Buffer {
        self.create_buffer(BufferDesc::new(
            BufferKind::Vertex,
            dynamic,
            bytemuck::cast_slice(vertices).to_vec(),
        ))
    }

    pub fn create_texture(&self, desc: TextureDesc) -> Texture {
        let texture = Texture {
            handle: self.own(),
            size: desc.size,
            pixel_format: desc.pixel_format,
        };
        self.device.push(Command::InitTexture { id: texture.id(), desc });
        texture
    }

    pub fn create_texture_from_image(&self, image: &Image, mipmaps: bool) -> Texture {
        let mut desc = TextureDesc::from_image(image, mipmaps);
        let options = self.device.options();
        desc.sampler.filter = options.texture_filter;
        desc.sampler.max_anisotropy = options.max_anisotropy;
        self.create_texture(desc)
    }

    pub fn create_shader(&self, desc: ShaderDesc) -> Shader {
        let shader = Shader { handle: self.own() };
        self.device.push(Command::InitShader { id: shader.id(), desc });
        shader
    }

    pub fn create_blend_state(&self, desc: BlendStateDesc) -> BlendState {
        let blend_state = BlendState {
            handle: self.own(),
            desc,
        };
        self.device.push(Command::InitBlendState {
            id: blend_state.id(),
            desc,
        });
        blend_state
    }

    pub fn create_render_target(&self) -> RenderTarget {
        let target = RenderTarget {
            handle: self.own(),
            color: Vec::new(),
            depth: None,
        };
        self.device.push(Command::InitRenderTarget { id: target.id() });
        target
    }

    /// `None` renders to the back buffer.
    pub fn set_render_target(&self, target: Option<&RenderTarget>) {
        self.device.push(Command::SetRenderTarget {
            id: target.map(RenderTarget::id),
        });
    }

    pub fn clear(&self, desc: ClearDesc) {
        self.device.push(Command::Clear(desc));
    }

    pub fn add_draw_command(&self, draw: DrawDesc) {
        self.device.push(Command::Draw(Box::new(draw)));
    }

    /// Submits a recorded batch contiguously.
    pub fn submit(&self, buffer: CommandBuffer) {
        self.device.queue().submit(buffer);
    }

    pub fn present(&self) {
        self.device.present();
    }

    pub fn flush(&self) {
        self.device.flush();
    }

    pub fn resize(&mut self, size: Size2) {
        self.device.resize(size);
    }

    pub fn shutdown(&mut self) {
        self.device.shutdown();
    }
}

#[cfg(test)]
mod tests;
