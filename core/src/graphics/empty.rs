//! Headless backend
//!
//! Keeps just enough bookkeeping to validate commands the way a real driver
//! would (index ranges, texture level sizes, attachment lists) without
//! touching a GPU. Used for servers, tests and as the last automatic
//! fallback.

use tracing::trace;

use super::backend::{DrawCall, RenderBackend};
use super::desc::{
    BlendStateDesc, BufferDesc, ClearDesc, SamplerDesc, ShaderDesc, TextureDesc, TextureLevel,
};
use super::device::DeviceOptions;
use super::handle::ResourceId;
use super::state::BufferKind;
use super::GraphicsDriver;
use crate::error::{EngineError, Result};
use crate::types::{PixelFormat, Size2};

#[derive(Debug)]
pub struct EmptyBuffer {
    kind: BufferKind,
    size: u32,
}

#[derive(Debug)]
pub struct EmptyTexture {
    size: Size2,
    pixel_format: PixelFormat,
    render_target: bool,
}

#[derive(Debug)]
pub struct EmptyShader {
    vertex_constants: usize,
    fragment_constants: usize,
}

#[derive(Debug, Default)]
pub struct EmptyRenderTarget {
    color: Vec<ResourceId>,
    depth: Option<ResourceId>,
}

#[derive(Debug)]
pub struct EmptyBackend {
    size: Size2,
    frames: u64,
    draws: u64,
}

impl EmptyBackend {
    pub fn new(options: &DeviceOptions) -> Self {
        Self {
            size: options.size,
            frames: 0,
            draws: 0,
        }
    }

    pub fn size(&self) -> Size2 {
        self.size
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn draws(&self) -> u64 {
        self.draws
    }
}

impl RenderBackend for EmptyBackend {
    type Buffer = EmptyBuffer;
    type Texture = EmptyTexture;
    type Shader = EmptyShader;
    type BlendState = BlendStateDesc;
    type RenderTarget = EmptyRenderTarget;

    fn driver(&self) -> GraphicsDriver {
        GraphicsDriver::Empty
    }

    fn create_buffer(&mut self, desc: &BufferDesc) -> Result<Self::Buffer> {
        Ok(EmptyBuffer {
            kind: desc.kind,
            size: desc.allocation_size(),
        })
    }

    fn update_buffer(&mut self, buffer: &mut Self::Buffer, data: &[u8]) -> Result<()> {
        // Growing mirrors drivers that reallocate on larger uploads
        buffer.size = buffer.size.max(data.len() as u32);
        Ok(())
    }

    fn destroy_buffer(&mut self, _buffer: Self::Buffer) {}

    fn create_texture(&mut self, desc: &TextureDesc) -> Result<Self::Texture> {
        if desc.render_target && desc.pixel_format == PixelFormat::Depth && desc.bind_shader {
            return Err(EngineError::data("depth textures cannot be sampled"));
        }
        Ok(EmptyTexture {
            size: desc.size,
            pixel_format: desc.pixel_format,
            render_target: desc.render_target,
        })
    }

    fn update_texture(&mut self, texture: &mut Self::Texture, levels: &[TextureLevel]) -> Result<()> {
        let Some(base) = levels.first() else {
            return Ok(());
        };
        if base.size != texture.size {
            return Err(EngineError::data(format!(
                "texture data is {}x{}, texture is {}x{}",
                base.size.width, base.size.height, texture.size.width, texture.size.height
            )));
        }
        if base.data.len() != base.size.area() * texture.pixel_format.bytes_per_pixel() {
            return Err(EngineError::data("texture data length does not match its size"));
        }
        Ok(())
    }

    fn set_texture_sampler(&mut self, _texture: &mut Self::Texture, _sampler: &SamplerDesc) -> Result<()> {
        Ok(())
    }

    fn destroy_texture(&mut self, _texture: Self::Texture) {}

    fn create_shader(&mut self, desc: &ShaderDesc) -> Result<Self::Shader> {
        if desc.vertex_shader.is_empty() || desc.fragment_shader.is_empty() {
            return Err(EngineError::data("shader stage without code"));
        }
        Ok(EmptyShader {
            vertex_constants: desc.vertex_constants.len(),
            fragment_constants: desc.fragment_constants.len(),
        })
    }

    fn destroy_shader(&mut self, _shader: Self::Shader) {}

    fn create_blend_state(&mut self, desc: &BlendStateDesc) -> Result<Self::BlendState> {
        Ok(*desc)
    }

    fn destroy_blend_state(&mut self, _blend_state: Self::BlendState) {}

    fn create_render_target(&mut self) -> Result<Self::RenderTarget> {
        Ok(EmptyRenderTarget::default())
    }

    fn add_color_texture(
        &mut self,
        target: &mut Self::RenderTarget,
        id: ResourceId,
        texture: &Self::Texture,
    ) -> Result<()> {
        if !texture.render_target {
            return Err(EngineError::data(format!("texture {} is not a render target", id)));
        }
        if !target.color.contains(&id) {
            target.color.push(id);
        }
        Ok(())
    }

    fn remove_color_texture(&mut self, target: &mut Self::RenderTarget, id: ResourceId) -> Result<()> {
        target.color.retain(|&c| c != id);
        Ok(())
    }

    fn set_depth_texture(
        &mut self,
        target: &mut Self::RenderTarget,
        texture: Option<(ResourceId, &Self::Texture)>,
    ) -> Result<()> {
        target.depth = match texture {
            Some((id, texture)) if texture.pixel_format == PixelFormat::Depth => Some(id),
            Some((id, _)) => {
                return Err(EngineError::data(format!("texture {} is not a depth texture", id)));
            }
            None => None,
        };
        Ok(())
    }

    fn destroy_render_target(&mut self, _target: Self::RenderTarget) {}

    fn set_render_target(&mut self, _target: Option<&Self::RenderTarget>) -> Result<()> {
        Ok(())
    }

    fn clear(&mut self, _desc: &ClearDesc) -> Result<()> {
        Ok(())
    }

    fn draw(&mut self, call: &DrawCall<'_, Self>) -> Result<()> {
        let desc = call.desc;
        if call.index_buffer.kind != BufferKind::Index {
            return Err(EngineError::data("index buffer is not an index buffer"));
        }
        if call.vertex_buffer.kind != BufferKind::Vertex {
            return Err(EngineError::data("vertex buffer is not a vertex buffer"));
        }
        let end = (desc.start_index as u64 + desc.index_count as u64) * desc.index_size as u64;
        if end > call.index_buffer.size as u64 {
            return Err(EngineError::data(format!(
                "indices {}..{} exceed index buffer of {} bytes",
                desc.start_index,
                desc.start_index + desc.index_count,
                call.index_buffer.size
            )));
        }
        if desc.vertex_constants.len() > call.shader.vertex_constants
            || desc.fragment_constants.len() > call.shader.fragment_constants
        {
            return Err(EngineError::data("more shader constants than the shader declares"));
        }
        self.draws += 1;
        trace!("Empty draw of {} indices", desc.index_count);
        Ok(())
    }

    fn present(&mut self) -> Result<()> {
        self.frames += 1;
        Ok(())
    }

    fn resize(&mut self, size: Size2) -> Result<()> {
        if size.is_empty() {
            return Err(EngineError::data("cannot resize to an empty back buffer"));
        }
        self.size = size;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graphics::{DrawDesc, MAX_TEXTURES};

    fn backend() -> EmptyBackend {
        EmptyBackend::new(&DeviceOptions {
            size: Size2::new(64, 32),
            ..Default::default()
        })
    }

    fn id(raw: u64) -> ResourceId {
        ResourceId::from_raw(raw).unwrap()
    }

    #[test]
    fn test_draw_checks_index_range() {
        let mut backend = backend();
        let shader = backend
            .create_shader(&ShaderDesc {
                vertex_shader: vec![1],
                fragment_shader: vec![1],
                ..Default::default()
            })
            .unwrap();
        let indices = backend
            .create_buffer(&BufferDesc::new(BufferKind::Index, false, vec![0; 12]))
            .unwrap();
        let vertices = backend
            .create_buffer(&BufferDesc::new(BufferKind::Vertex, false, vec![0; 48]))
            .unwrap();

        let mut desc = DrawDesc::new(id(1), id(2), id(3), 6);
        assert!(backend.draw(&call(&desc, &shader, &indices, &vertices)).is_ok());

        desc.start_index = 1;
        assert!(backend.draw(&call(&desc, &shader, &indices, &vertices)).is_err());
        assert_eq!(backend.draws(), 1);
    }

    fn call<'a>(
        desc: &'a DrawDesc,
        shader: &'a EmptyShader,
        index_buffer: &'a EmptyBuffer,
        vertex_buffer: &'a EmptyBuffer,
    ) -> DrawCall<'a, EmptyBackend> {
        DrawCall {
            desc,
            shader,
            index_buffer,
            vertex_buffer,
            blend_state: None,
            textures: [None; MAX_TEXTURES],
        }
    }

    #[test]
    fn test_update_buffer_grows() {
        let mut backend = backend();
        let mut buffer = backend
            .create_buffer(&BufferDesc::new(BufferKind::Vertex, true, vec![0; 8]))
            .unwrap();
        backend.update_buffer(&mut buffer, &[0; 32]).unwrap();
        assert_eq!(buffer.size, 32);
        backend.update_buffer(&mut buffer, &[0; 4]).unwrap();
        assert_eq!(buffer.size, 32);
    }

    #[test]
    fn test_depth_attachment_requires_depth_format() {
        let mut backend = backend();
        let color = backend
            .create_texture(&TextureDesc::render_target(Size2::new(8, 8), PixelFormat::Rgba8UnsignedNorm, 1))
            .unwrap();
        let depth = backend
            .create_texture(&TextureDesc::render_target(Size2::new(8, 8), PixelFormat::Depth, 1))
            .unwrap();
        let mut target = backend.create_render_target().unwrap();

        assert!(backend.set_depth_texture(&mut target, Some((id(1), &color))).is_err());
        backend.set_depth_texture(&mut target, Some((id(2), &depth))).unwrap();
        assert_eq!(target.depth, Some(id(2)));

        backend.add_color_texture(&mut target, id(1), &color).unwrap();
        backend.add_color_texture(&mut target, id(1), &color).unwrap();
        assert_eq!(target.color, vec![id(1)]);
        backend.remove_color_texture(&mut target, id(1)).unwrap();
        assert!(target.color.is_empty());
    }

    #[test]
    fn test_present_and_resize() {
        let mut backend = backend();
        backend.present().unwrap();
        backend.present().unwrap();
        assert_eq!(backend.frames(), 2);

        assert!(backend.resize(Size2::new(0, 10)).is_err());
        backend.resize(Size2::new(10, 10)).unwrap();
        assert_eq!(backend.size(), Size2::new(10, 10));
    }
}
