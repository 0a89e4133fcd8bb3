//! Backend capability set and platform collaborators
//!
//! Every graphics API implements [`RenderBackend`]. Native objects are
//! associated types owned by the device's handle table; the backend only
//! borrows them while executing a command and receives them back by value
//! when they are released.

use std::ffi::c_void;

use raw_window_handle::{HasDisplayHandle, HasWindowHandle};

use super::desc::{
    BlendStateDesc, BufferDesc, ClearDesc, DrawDesc, MAX_TEXTURES, SamplerDesc, ShaderDesc,
    TextureDesc, TextureLevel,
};
use super::handle::ResourceId;
use super::GraphicsDriver;
use crate::error::{EngineError, Result};
use crate::types::Size2;

/// Resolved native objects for one draw.
pub struct DrawCall<'a, B: RenderBackend + ?Sized> {
    pub desc: &'a DrawDesc,
    pub shader: &'a B::Shader,
    pub index_buffer: &'a B::Buffer,
    pub vertex_buffer: &'a B::Buffer,
    pub blend_state: Option<&'a B::BlendState>,
    pub textures: [Option<&'a B::Texture>; MAX_TEXTURES],
}

/// Operations every graphics backend provides.
///
/// All methods run on the render context. Errors are per command: the
/// device logs them and moves on to the next command.
pub trait RenderBackend: Send + 'static {
    type Buffer: Send;
    type Texture: Send;
    type Shader: Send;
    type BlendState: Send;
    type RenderTarget: Send;

    fn driver(&self) -> GraphicsDriver;

    fn create_buffer(&mut self, desc: &BufferDesc) -> Result<Self::Buffer>;
    fn update_buffer(&mut self, buffer: &mut Self::Buffer, data: &[u8]) -> Result<()>;
    fn destroy_buffer(&mut self, buffer: Self::Buffer);

    fn create_texture(&mut self, desc: &TextureDesc) -> Result<Self::Texture>;
    fn update_texture(&mut self, texture: &mut Self::Texture, levels: &[TextureLevel]) -> Result<()>;
    fn set_texture_sampler(&mut self, texture: &mut Self::Texture, sampler: &SamplerDesc) -> Result<()>;
    fn destroy_texture(&mut self, texture: Self::Texture);

    fn create_shader(&mut self, desc: &ShaderDesc) -> Result<Self::Shader>;
    fn destroy_shader(&mut self, shader: Self::Shader);

    fn create_blend_state(&mut self, desc: &BlendStateDesc) -> Result<Self::BlendState>;
    fn destroy_blend_state(&mut self, blend_state: Self::BlendState);

    fn create_render_target(&mut self) -> Result<Self::RenderTarget>;
    fn add_color_texture(
        &mut self,
        target: &mut Self::RenderTarget,
        id: ResourceId,
        texture: &Self::Texture,
    ) -> Result<()>;
    fn remove_color_texture(&mut self, target: &mut Self::RenderTarget, id: ResourceId) -> Result<()>;
    fn set_depth_texture(
        &mut self,
        target: &mut Self::RenderTarget,
        texture: Option<(ResourceId, &Self::Texture)>,
    ) -> Result<()>;
    fn destroy_render_target(&mut self, target: Self::RenderTarget);

    /// `None` selects the back buffer.
    fn set_render_target(&mut self, target: Option<&Self::RenderTarget>) -> Result<()>;
    fn clear(&mut self, desc: &ClearDesc) -> Result<()>;
    fn draw(&mut self, call: &DrawCall<'_, Self>) -> Result<()>;
    fn present(&mut self) -> Result<()>;
    fn resize(&mut self, size: Size2) -> Result<()>;
}

/// OpenGL context version requested from the window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GlVersion {
    /// 3.2 core profile
    Core3_2,
    /// 2.x compatibility context
    Legacy2_0,
}

/// An OpenGL context created by the windowing collaborator.
///
/// Created on the logic thread, then moved to the render context which
/// makes it current before issuing any GL call.
pub trait GlContext: Send {
    fn version(&self) -> GlVersion;
    fn get_proc_address(&self, name: &str) -> *const c_void;
    fn make_current(&self) -> Result<()>;
    fn swap_buffers(&self) -> Result<()>;
    /// 0 disables vsync, 1 waits for every vertical blank.
    fn set_swap_interval(&self, interval: u32) -> Result<()>;
    fn resize(&self, _size: Size2) {}
}

/// The window the device renders into.
pub trait NativeWindow: HasWindowHandle + HasDisplayHandle + Send + Sync {
    /// Drawable size in pixels.
    fn size(&self) -> Size2;

    fn title(&self) -> String {
        String::new()
    }

    /// Creates a GL context for this window.
    fn create_gl_context(&self, version: GlVersion) -> Result<Box<dyn GlContext>> {
        Err(EngineError::system(format!(
            "window does not provide an OpenGL {:?} context",
            version
        )))
    }
}
