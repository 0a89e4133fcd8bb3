//! [`RenderBackend`] over a `glow` context

use glow::HasContext;
use tracing::{debug, info, trace, warn};
use vesper_core::graphics::{
    BlendStateDesc, BufferDesc, BufferKind, ClearDesc, DeviceOptions, DrawCall, FillMode,
    GlContext, GlVersion, GraphicsDriver, RenderBackend, ResourceId, SamplerDesc, ShaderDesc,
    TextureDesc, TextureLevel,
};
use vesper_core::types::{PixelFormat, Rect, Size2};
use vesper_core::{EngineError, Result};

use crate::convert;
use crate::program::{self, GlShader};

#[derive(Debug)]
pub struct GlBuffer {
    raw: glow::NativeBuffer,
    kind: BufferKind,
    usage: u32,
    size: u32,
}

#[derive(Debug)]
pub struct GlTexture {
    raw: glow::NativeTexture,
    /// `TEXTURE_2D` or `TEXTURE_2D_MULTISAMPLE`
    target: u32,
    size: Size2,
    pixel_format: PixelFormat,
    levels: u32,
    render_target: bool,
}

#[derive(Debug)]
pub struct GlRenderTarget {
    framebuffer: glow::NativeFramebuffer,
    colors: Vec<(ResourceId, u32)>,
    depth: Option<ResourceId>,
    size: Option<Size2>,
}

/// OpenGL implementation of [`RenderBackend`].
pub struct GlBackend {
    gl: glow::Context,
    context: Box<dyn GlContext>,
    version: GlVersion,
    /// Core profiles need a bound vertex array object
    vertex_array: Option<glow::NativeVertexArray>,
    size: Size2,
    sampler: SamplerDesc,
    anisotropy: bool,
    framebuffers: bool,
    /// Framebuffer and size of the current render target, `None` for the back buffer
    current: Option<(glow::NativeFramebuffer, Size2)>,
}

impl GlBackend {
    /// Makes `context` current and loads GL.
    pub fn new(context: Box<dyn GlContext>, options: &DeviceOptions) -> Result<Self> {
        context.make_current()?;
        let version = context.version();

        let mut gl = unsafe { glow::Context::from_loader_function(|name| context.get_proc_address(name)) };

        let (major, minor) = {
            let v = gl.version();
            (v.major, v.minor)
        };
        let required = match version {
            GlVersion::Core3_2 => (3, 2),
            GlVersion::Legacy2_0 => (2, 0),
        };
        if (major, minor) < required {
            return Err(EngineError::system(format!(
                "context reports OpenGL {}.{}, need {}.{}",
                major, minor, required.0, required.1
            )));
        }

        let extensions = gl.supported_extensions();
        let anisotropy = extensions.contains("GL_EXT_texture_filter_anisotropic")
            || extensions.contains("GL_ARB_texture_filter_anisotropic");
        let framebuffers = major >= 3 || extensions.contains("GL_ARB_framebuffer_object");

        unsafe {
            info!(
                "OpenGL {}.{} ({}, {})",
                major,
                minor,
                gl.get_parameter_string(glow::RENDERER),
                gl.get_parameter_string(glow::VENDOR)
            );
        }

        if options.debug_renderer && gl.supports_debug() {
            unsafe {
                gl.enable(glow::DEBUG_OUTPUT);
                gl.debug_message_callback(|_source, ty, id, severity, message| {
                    if ty == glow::DEBUG_TYPE_ERROR || severity == glow::DEBUG_SEVERITY_HIGH {
                        warn!("GL debug [{}]: {}", id, message);
                    } else {
                        trace!("GL debug [{}]: {}", id, message);
                    }
                });
            }
            debug!("GL debug output enabled");
        }

        let vertex_array = if version == GlVersion::Core3_2 {
            unsafe {
                let vao = gl
                    .create_vertex_array()
                    .map_err(|e| EngineError::system(format!("create_vertex_array failed: {}", e)))?;
                gl.bind_vertex_array(Some(vao));
                Some(vao)
            }
        } else {
            None
        };

        if let Err(e) = context.set_swap_interval(u32::from(options.vsync)) {
            warn!("Failed to set swap interval: {}", e);
        }

        unsafe {
            if options.sample_count > 1 {
                gl.enable(glow::MULTISAMPLE);
            }
            gl.viewport(0, 0, options.size.width as i32, options.size.height as i32);
        }

        Ok(Self {
            gl,
            context,
            version,
            vertex_array,
            size: options.size,
            sampler: SamplerDesc {
                filter: options.texture_filter,
                max_anisotropy: options.max_anisotropy,
                ..Default::default()
            },
            anisotropy,
            framebuffers,
            current: None,
        })
    }

    pub fn version(&self) -> GlVersion {
        self.version
    }

    /// Size of whatever is currently bound for drawing.
    fn target_size(&self) -> Size2 {
        self.current.map(|(_, size)| size).unwrap_or(self.size)
    }

    fn rebind_current(&self) {
        unsafe {
            self.gl
                .bind_framebuffer(glow::FRAMEBUFFER, self.current.map(|(fb, _)| fb));
        }
    }

    unsafe fn apply_sampler(&self, texture: &GlTexture, sampler: &SamplerDesc) {
        if texture.target != glow::TEXTURE_2D {
            return;
        }
        let gl = &self.gl;
        let (min, mag) = convert::filters(sampler.filter, texture.levels > 1);
        unsafe {
            gl.tex_parameter_i32(texture.target, glow::TEXTURE_MIN_FILTER, min);
            gl.tex_parameter_i32(texture.target, glow::TEXTURE_MAG_FILTER, mag);
            gl.tex_parameter_i32(
                texture.target,
                glow::TEXTURE_WRAP_S,
                convert::address_mode(sampler.address_x),
            );
            gl.tex_parameter_i32(
                texture.target,
                glow::TEXTURE_WRAP_T,
                convert::address_mode(sampler.address_y),
            );
            if self.anisotropy && sampler.max_anisotropy > 1 {
                gl.tex_parameter_f32(
                    texture.target,
                    convert::TEXTURE_MAX_ANISOTROPY,
                    sampler.max_anisotropy as f32,
                );
            }
        }
    }

    unsafe fn upload_levels(&self, texture: &GlTexture, levels: &[TextureLevel]) {
        let format = convert::texture_format(texture.pixel_format);
        for (level, data) in levels.iter().enumerate() {
            unsafe {
                self.gl.tex_image_2d(
                    glow::TEXTURE_2D,
                    level as i32,
                    format.internal,
                    data.size.width as i32,
                    data.size.height as i32,
                    0,
                    format.format,
                    format.ty,
                    Some(data.data.as_slice()),
                );
            }
        }
    }

    fn attachment_status(&self, target: &GlRenderTarget) -> Result<()> {
        let status = unsafe { self.gl.check_framebuffer_status(glow::FRAMEBUFFER) };
        if status != glow::FRAMEBUFFER_COMPLETE && (!target.colors.is_empty() || target.depth.is_some()) {
            return Err(EngineError::system(format!("framebuffer incomplete (0x{:x})", status)));
        }
        Ok(())
    }

    /// Binds `target`'s framebuffer, runs `f`, checks completeness and
    /// restores the previous binding.
    fn with_framebuffer<T>(
        &self,
        target: &mut GlRenderTarget,
        f: impl FnOnce(&glow::Context, &mut GlRenderTarget) -> T,
    ) -> Result<T> {
        unsafe {
            self.gl.bind_framebuffer(glow::FRAMEBUFFER, Some(target.framebuffer));
        }
        let value = f(&self.gl, target);
        let status = self.attachment_status(target);
        self.rebind_current();
        status.map(|()| value)
    }
}

impl Drop for GlBackend {
    fn drop(&mut self) {
        if let Some(vao) = self.vertex_array.take() {
            unsafe {
                self.gl.bind_vertex_array(None);
                self.gl.delete_vertex_array(vao);
            }
        }
    }
}

fn check_size(name: &str, size: Size2) -> Result<()> {
    if size.is_empty() {
        return Err(EngineError::data(format!("{} size must be non-zero", name)));
    }
    Ok(())
}

impl RenderBackend for GlBackend {
    type Buffer = GlBuffer;
    type Texture = GlTexture;
    type Shader = GlShader;
    type BlendState = BlendStateDesc;
    type RenderTarget = GlRenderTarget;

    fn driver(&self) -> GraphicsDriver {
        GraphicsDriver::OpenGL
    }

    fn create_buffer(&mut self, desc: &BufferDesc) -> Result<Self::Buffer> {
        let target = convert::buffer_target(desc.kind);
        let usage = convert::buffer_usage(desc.dynamic);
        let size = desc.allocation_size();
        unsafe {
            let raw = self
                .gl
                .create_buffer()
                .map_err(|e| EngineError::system(format!("create_buffer failed: {}", e)))?;
            self.gl.bind_buffer(target, Some(raw));
            if desc.data.len() as u32 == size {
                self.gl.buffer_data_u8_slice(target, &desc.data, usage);
            } else {
                self.gl.buffer_data_size(target, size as i32, usage);
                if !desc.data.is_empty() {
                    self.gl.buffer_sub_data_u8_slice(target, 0, &desc.data);
                }
            }
            self.gl.bind_buffer(target, None);
            Ok(GlBuffer {
                raw,
                kind: desc.kind,
                usage,
                size,
            })
        }
    }

    fn update_buffer(&mut self, buffer: &mut Self::Buffer, data: &[u8]) -> Result<()> {
        let target = convert::buffer_target(buffer.kind);
        unsafe {
            self.gl.bind_buffer(target, Some(buffer.raw));
            if data.len() as u32 > buffer.size {
                self.gl.buffer_data_u8_slice(target, data, buffer.usage);
                buffer.size = data.len() as u32;
            } else {
                self.gl.buffer_sub_data_u8_slice(target, 0, data);
            }
            self.gl.bind_buffer(target, None);
        }
        Ok(())
    }

    fn destroy_buffer(&mut self, buffer: Self::Buffer) {
        unsafe { self.gl.delete_buffer(buffer.raw) };
    }

    fn create_texture(&mut self, desc: &TextureDesc) -> Result<Self::Texture> {
        check_size("texture", desc.size)?;
        let multisampled = desc.sample_count > 1;
        if multisampled && (self.version == GlVersion::Legacy2_0 || !desc.levels.is_empty()) {
            return Err(EngineError::data(
                "multisampled textures need GL 3.2 and can't have initial data",
            ));
        }
        let target = if multisampled {
            glow::TEXTURE_2D_MULTISAMPLE
        } else {
            glow::TEXTURE_2D
        };
        let format = convert::texture_format(desc.pixel_format);

        let texture = unsafe {
            let raw = self
                .gl
                .create_texture()
                .map_err(|e| EngineError::system(format!("create_texture failed: {}", e)))?;
            GlTexture {
                raw,
                target,
                size: desc.size,
                pixel_format: desc.pixel_format,
                levels: desc.levels.len().max(1) as u32,
                render_target: desc.render_target,
            }
        };

        unsafe {
            self.gl.bind_texture(target, Some(texture.raw));
            if multisampled {
                self.gl.tex_image_2d_multisample(
                    target,
                    desc.sample_count as i32,
                    format.internal,
                    desc.size.width as i32,
                    desc.size.height as i32,
                    true,
                );
            } else if desc.levels.is_empty() {
                self.gl.tex_image_2d(
                    target,
                    0,
                    format.internal,
                    desc.size.width as i32,
                    desc.size.height as i32,
                    0,
                    format.format,
                    format.ty,
                    None,
                );
            } else {
                self.upload_levels(&texture, &desc.levels);
            }
            if !multisampled {
                self.gl
                    .tex_parameter_i32(target, glow::TEXTURE_MAX_LEVEL, texture.levels as i32 - 1);
                let sampler = if desc.sampler == SamplerDesc::default() {
                    self.sampler
                } else {
                    desc.sampler
                };
                self.apply_sampler(&texture, &sampler);
            }
            self.gl.bind_texture(target, None);
        }
        Ok(texture)
    }

    fn update_texture(&mut self, texture: &mut Self::Texture, levels: &[TextureLevel]) -> Result<()> {
        if texture.target != glow::TEXTURE_2D {
            return Err(EngineError::data("multisampled textures can't be updated"));
        }
        if let Some(base) = levels.first() {
            if base.size != texture.size {
                return Err(EngineError::data(format!(
                    "texture data is {}x{}, texture is {}x{}",
                    base.size.width, base.size.height, texture.size.width, texture.size.height
                )));
            }
        }
        unsafe {
            self.gl.bind_texture(glow::TEXTURE_2D, Some(texture.raw));
            self.upload_levels(texture, levels);
            if levels.len() as u32 != texture.levels && !levels.is_empty() {
                texture.levels = levels.len() as u32;
                self.gl
                    .tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_MAX_LEVEL, texture.levels as i32 - 1);
            }
            self.gl.bind_texture(glow::TEXTURE_2D, None);
        }
        Ok(())
    }

    fn set_texture_sampler(&mut self, texture: &mut Self::Texture, sampler: &SamplerDesc) -> Result<()> {
        unsafe {
            self.gl.bind_texture(texture.target, Some(texture.raw));
            self.apply_sampler(texture, sampler);
            self.gl.bind_texture(texture.target, None);
        }
        Ok(())
    }

    fn destroy_texture(&mut self, texture: Self::Texture) {
        unsafe { self.gl.delete_texture(texture.raw) };
    }

    fn create_shader(&mut self, desc: &ShaderDesc) -> Result<Self::Shader> {
        unsafe { program::create_shader(&self.gl, desc) }
    }

    fn destroy_shader(&mut self, shader: Self::Shader) {
        unsafe { self.gl.delete_program(shader.program) };
    }

    fn create_blend_state(&mut self, desc: &BlendStateDesc) -> Result<Self::BlendState> {
        Ok(*desc)
    }

    fn destroy_blend_state(&mut self, _blend_state: Self::BlendState) {}

    fn create_render_target(&mut self) -> Result<Self::RenderTarget> {
        if !self.framebuffers {
            return Err(EngineError::system("render targets need framebuffer object support"));
        }
        let framebuffer = unsafe {
            self.gl
                .create_framebuffer()
                .map_err(|e| EngineError::system(format!("create_framebuffer failed: {}", e)))?
        };
        Ok(GlRenderTarget {
            framebuffer,
            colors: Vec::new(),
            depth: None,
            size: None,
        })
    }

    fn add_color_texture(
        &mut self,
        target: &mut Self::RenderTarget,
        id: ResourceId,
        texture: &Self::Texture,
    ) -> Result<()> {
        if !texture.render_target || texture.pixel_format == PixelFormat::Depth {
            return Err(EngineError::data(format!("texture {} is not a color render target", id)));
        }
        if target.colors.iter().any(|(c, _)| *c == id) {
            return Ok(());
        }
        let (raw, tex_target, size) = (texture.raw, texture.target, texture.size);
        self.with_framebuffer(target, |gl, target| unsafe {
            let attachment = glow::COLOR_ATTACHMENT0 + target.colors.len() as u32;
            gl.framebuffer_texture_2d(glow::FRAMEBUFFER, attachment, tex_target, Some(raw), 0);
            target.colors.push((id, attachment));
            let buffers: Vec<u32> = target.colors.iter().map(|(_, a)| *a).collect();
            gl.draw_buffers(&buffers);
            target.size.get_or_insert(size);
        })
    }

    fn remove_color_texture(&mut self, target: &mut Self::RenderTarget, id: ResourceId) -> Result<()> {
        let Some(index) = target.colors.iter().position(|(c, _)| *c == id) else {
            return Ok(());
        };
        self.with_framebuffer(target, |gl, target| unsafe {
            let (_, attachment) = target.colors.remove(index);
            gl.framebuffer_texture_2d(glow::FRAMEBUFFER, attachment, glow::TEXTURE_2D, None, 0);
            let buffers: Vec<u32> = target.colors.iter().map(|(_, a)| *a).collect();
            if buffers.is_empty() {
                gl.draw_buffers(&[glow::NONE]);
            } else {
                gl.draw_buffers(&buffers);
            }
        })
    }

    fn set_depth_texture(
        &mut self,
        target: &mut Self::RenderTarget,
        texture: Option<(ResourceId, &Self::Texture)>,
    ) -> Result<()> {
        let native = match texture {
            Some((id, texture)) if texture.pixel_format == PixelFormat::Depth => {
                Some((id, texture.raw, texture.target, texture.size))
            }
            Some((id, _)) => {
                return Err(EngineError::data(format!("texture {} is not a depth texture", id)));
            }
            None => None,
        };
        self.with_framebuffer(target, |gl, target| unsafe {
            match native {
                Some((id, raw, tex_target, size)) => {
                    gl.framebuffer_texture_2d(
                        glow::FRAMEBUFFER,
                        glow::DEPTH_ATTACHMENT,
                        tex_target,
                        Some(raw),
                        0,
                    );
                    target.depth = Some(id);
                    target.size.get_or_insert(size);
                }
                None => {
                    gl.framebuffer_texture_2d(glow::FRAMEBUFFER, glow::DEPTH_ATTACHMENT, glow::TEXTURE_2D, None, 0);
                    target.depth = None;
                }
            }
        })
    }

    fn destroy_render_target(&mut self, target: Self::RenderTarget) {
        if self.current.map(|(fb, _)| fb) == Some(target.framebuffer) {
            self.current = None;
            self.rebind_current();
        }
        unsafe { self.gl.delete_framebuffer(target.framebuffer) };
    }

    fn set_render_target(&mut self, target: Option<&Self::RenderTarget>) -> Result<()> {
        self.current = match target {
            Some(target) => {
                let size = target
                    .size
                    .ok_or_else(|| EngineError::data("render target has no attachments"))?;
                Some((target.framebuffer, size))
            }
            None => None,
        };
        self.rebind_current();
        let size = self.target_size();
        unsafe {
            self.gl.viewport(0, 0, size.width as i32, size.height as i32);
        }
        Ok(())
    }

    fn clear(&mut self, desc: &ClearDesc) -> Result<()> {
        let mut mask = 0;
        unsafe {
            self.gl.disable(glow::SCISSOR_TEST);
            if let Some(color) = desc.color {
                let [r, g, b, a] = color.normalized();
                self.gl.color_mask(true, true, true, true);
                self.gl.clear_color(r, g, b, a);
                mask |= glow::COLOR_BUFFER_BIT;
            }
            if let Some(depth) = desc.depth {
                self.gl.depth_mask(true);
                self.gl.clear_depth_f32(depth);
                mask |= glow::DEPTH_BUFFER_BIT;
            }
            if mask != 0 {
                self.gl.clear(mask);
            }
        }
        Ok(())
    }

    fn draw(&mut self, call: &DrawCall<'_, Self>) -> Result<()> {
        let desc = call.desc;
        let shader = call.shader;
        let end = (desc.start_index as u64 + desc.index_count as u64) * desc.index_size as u64;
        if end > call.index_buffer.size as u64 {
            return Err(EngineError::data(format!(
                "indices {}..{} exceed index buffer of {} bytes",
                desc.start_index,
                desc.start_index + desc.index_count,
                call.index_buffer.size
            )));
        }
        let gl = &self.gl;
        let target_size = self.target_size();

        unsafe {
            gl.use_program(Some(shader.program));
            program::upload_constants(gl, &shader.vertex_uniforms, &desc.vertex_constants)?;
            program::upload_constants(gl, &shader.fragment_uniforms, &desc.fragment_constants)?;

            for (unit, texture) in call.textures.iter().enumerate() {
                gl.active_texture(glow::TEXTURE0 + unit as u32);
                match texture {
                    Some(texture) => gl.bind_texture(texture.target, Some(texture.raw)),
                    None => gl.bind_texture(glow::TEXTURE_2D, None),
                }
            }
            gl.active_texture(glow::TEXTURE0);

            match call.blend_state {
                Some(blend) if blend.enabled => {
                    gl.enable(glow::BLEND);
                    gl.blend_func_separate(
                        convert::blend_factor(blend.color_src),
                        convert::blend_factor(blend.color_dst),
                        convert::blend_factor(blend.alpha_src),
                        convert::blend_factor(blend.alpha_dst),
                    );
                    gl.blend_equation_separate(
                        convert::blend_operation(blend.color_op),
                        convert::blend_operation(blend.alpha_op),
                    );
                }
                _ => gl.disable(glow::BLEND),
            }
            let mask = call.blend_state.map(|b| b.mask).unwrap_or_default();
            gl.color_mask(mask.red, mask.green, mask.blue, mask.alpha);

            if desc.depth_test {
                gl.enable(glow::DEPTH_TEST);
                gl.depth_func(glow::LEQUAL);
            } else {
                gl.disable(glow::DEPTH_TEST);
            }
            gl.depth_mask(desc.depth_write);

            match convert::cull_face(desc.cull_mode) {
                Some(face) => {
                    gl.enable(glow::CULL_FACE);
                    gl.cull_face(face);
                }
                None => gl.disable(glow::CULL_FACE),
            }
            gl.front_face(convert::front_face(desc.front_face));
            let polygon = match desc.fill_mode {
                FillMode::Solid => glow::FILL,
                FillMode::Wireframe => glow::LINE,
            };
            gl.polygon_mode(glow::FRONT_AND_BACK, polygon);

            let viewport = desc.viewport.unwrap_or(Rect::from_size(target_size));
            let (x, y, w, h) = convert::flip_rect(viewport, target_size.height);
            gl.viewport(x, y, w, h);
            match desc.scissor {
                Some(scissor) => {
                    let (x, y, w, h) = convert::flip_rect(scissor, target_size.height);
                    gl.enable(glow::SCISSOR_TEST);
                    gl.scissor(x, y, w, h);
                }
                None => gl.disable(glow::SCISSOR_TEST),
            }

            gl.bind_buffer(glow::ARRAY_BUFFER, Some(call.vertex_buffer.raw));
            for attribute in &shader.attributes {
                gl.enable_vertex_attrib_array(attribute.location);
                gl.vertex_attrib_pointer_f32(
                    attribute.location,
                    attribute.components,
                    attribute.ty,
                    attribute.normalized,
                    shader.stride,
                    attribute.offset,
                );
            }
            gl.bind_buffer(glow::ELEMENT_ARRAY_BUFFER, Some(call.index_buffer.raw));
            gl.draw_elements(
                convert::draw_mode(desc.mode),
                desc.index_count as i32,
                convert::index_type(desc.index_size),
                (desc.start_index * desc.index_size) as i32,
            );
            for attribute in &shader.attributes {
                gl.disable_vertex_attrib_array(attribute.location);
            }
        }
        Ok(())
    }

    fn present(&mut self) -> Result<()> {
        self.context.swap_buffers()
    }

    fn resize(&mut self, size: Size2) -> Result<()> {
        check_size("back buffer", size)?;
        self.context.resize(size);
        self.size = size;
        if self.current.is_none() {
            unsafe {
                self.gl.viewport(0, 0, size.width as i32, size.height as i32);
            }
        }
        Ok(())
    }
}
