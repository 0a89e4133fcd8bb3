//! Resource and draw descriptions
//!
//! Everything a command carries besides handles: buffer contents, texture
//! levels, shader bytecode with its constant layout, blend settings and the
//! full state of a single draw. All of it is plain owned data so a command
//! never points back into logic-thread memory.

use super::handle::ResourceId;
use super::state::{
    BlendFactor, BlendOperation, BufferKind, ColorMask, CullMode, DataType, DrawMode, FillMode,
    FrontFace, SamplerAddressMode, SamplerFilter,
};
use crate::error::{EngineError, Result};
use crate::types::{Color, Image, PixelFormat, Rect, Size2};

/// Texture units addressable by one draw.
pub const MAX_TEXTURES: usize = 4;

/// GPU buffer contents and usage.
#[derive(Debug, Clone, PartialEq)]
pub struct BufferDesc {
    pub kind: BufferKind,
    /// Buffer is updated after creation
    pub dynamic: bool,
    /// Allocated size in bytes, at least `data.len()`
    pub size: u32,
    pub data: Vec<u8>,
}

impl BufferDesc {
    pub fn new(kind: BufferKind, dynamic: bool, data: Vec<u8>) -> Self {
        Self {
            kind,
            dynamic,
            size: data.len() as u32,
            data,
        }
    }

    /// Empty buffer with `size` bytes reserved.
    pub fn reserved(kind: BufferKind, size: u32) -> Self {
        Self {
            kind,
            dynamic: true,
            size,
            data: Vec::new(),
        }
    }

    /// Bytes the backend must allocate.
    pub fn allocation_size(&self) -> u32 {
        self.size.max(self.data.len() as u32)
    }
}

/// Sampling state of a texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SamplerDesc {
    pub filter: SamplerFilter,
    pub address_x: SamplerAddressMode,
    pub address_y: SamplerAddressMode,
    pub max_anisotropy: u32,
}

impl Default for SamplerDesc {
    fn default() -> Self {
        Self {
            filter: SamplerFilter::default(),
            address_x: SamplerAddressMode::default(),
            address_y: SamplerAddressMode::default(),
            max_anisotropy: 1,
        }
    }
}

/// One mip level of texture data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextureLevel {
    pub size: Size2,
    pub data: Vec<u8>,
}

/// Texture creation parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct TextureDesc {
    pub size: Size2,
    pub pixel_format: PixelFormat,
    /// Usable as a render target attachment
    pub render_target: bool,
    /// Sampled by shaders (render targets may opt out)
    pub bind_shader: bool,
    pub dynamic: bool,
    pub sample_count: u32,
    pub sampler: SamplerDesc,
    /// Mip levels, largest first; empty for uninitialized storage
    pub levels: Vec<TextureLevel>,
}

impl TextureDesc {
    /// Sampled texture from decoded pixels, optionally with a mip chain.
    pub fn from_image(image: &Image, mipmaps: bool) -> Self {
        let levels = if mipmaps {
            mip_chain(image)
        } else {
            vec![TextureLevel {
                size: image.size(),
                data: image.data().to_vec(),
            }]
        };
        Self {
            size: image.size(),
            pixel_format: image.pixel_format(),
            render_target: false,
            bind_shader: true,
            dynamic: false,
            sample_count: 1,
            sampler: SamplerDesc::default(),
            levels,
        }
    }

    /// Render target attachment without initial data.
    pub fn render_target(size: Size2, pixel_format: PixelFormat, sample_count: u32) -> Self {
        Self {
            size,
            pixel_format,
            render_target: true,
            bind_shader: pixel_format != PixelFormat::Depth,
            dynamic: false,
            sample_count,
            sampler: SamplerDesc::default(),
            levels: Vec::new(),
        }
    }

    /// Checks that every level matches its expected dimensions.
    pub fn validate(&self) -> Result<()> {
        if self.size.is_empty() {
            return Err(EngineError::data("texture size must be non-zero"));
        }
        let bpp = self.pixel_format.bytes_per_pixel();
        let mut expected = self.size;
        for (i, level) in self.levels.iter().enumerate() {
            if level.size != expected {
                return Err(EngineError::data(format!(
                    "texture level {} is {}x{}, expected {}x{}",
                    i, level.size.width, level.size.height, expected.width, expected.height
                )));
            }
            if level.data.len() != level.size.area() * bpp {
                return Err(EngineError::data(format!(
                    "texture level {} has {} bytes, expected {}",
                    i,
                    level.data.len(),
                    level.size.area() * bpp
                )));
            }
            expected = Size2::new((expected.width / 2).max(1), (expected.height / 2).max(1));
        }
        Ok(())
    }
}

/// Builds a full mip chain with a 2x2 box filter.
///
/// Only 8-bit formats are filtered; other formats get the base level only.
pub fn mip_chain(image: &Image) -> Vec<TextureLevel> {
    let base = TextureLevel {
        size: image.size(),
        data: image.data().to_vec(),
    };
    let bpp = match image.pixel_format() {
        PixelFormat::R8UnsignedNorm => 1,
        PixelFormat::Rg8UnsignedNorm => 2,
        PixelFormat::Rgba8UnsignedNorm | PixelFormat::Rgba8Srgb => 4,
        _ => return vec![base],
    };

    let mut levels = vec![base];
    loop {
        let Some(prev) = levels.last() else { break };
        if prev.size.width == 1 && prev.size.height == 1 {
            break;
        }
        let size = Size2::new((prev.size.width / 2).max(1), (prev.size.height / 2).max(1));
        let mut data = vec![0u8; size.area() * bpp];
        let pw = prev.size.width as usize;
        let ph = prev.size.height as usize;
        for y in 0..size.height as usize {
            for x in 0..size.width as usize {
                let x0 = (x * 2).min(pw - 1);
                let x1 = (x * 2 + 1).min(pw - 1);
                let y0 = (y * 2).min(ph - 1);
                let y1 = (y * 2 + 1).min(ph - 1);
                for c in 0..bpp {
                    let sum = prev.data[(y0 * pw + x0) * bpp + c] as u32
                        + prev.data[(y0 * pw + x1) * bpp + c] as u32
                        + prev.data[(y1 * pw + x0) * bpp + c] as u32
                        + prev.data[(y1 * pw + x1) * bpp + c] as u32;
                    data[(y * size.width as usize + x) * bpp + c] = (sum / 4) as u8;
                }
            }
        }
        levels.push(TextureLevel { size, data });
    }
    levels
}

/// Vertex attribute meaning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VertexSemantic {
    Position,
    Color,
    Normal,
    TexCoord,
    BlendIndices,
    BlendWeight,
}

/// One attribute of the interleaved vertex layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VertexAttribute {
    pub semantic: VertexSemantic,
    /// Semantic index, e.g. the 1 in TEXCOORD1
    pub index: u32,
    pub data_type: DataType,
}

impl VertexAttribute {
    pub const fn new(semantic: VertexSemantic, index: u32, data_type: DataType) -> Self {
        Self {
            semantic,
            index,
            data_type,
        }
    }
}

/// Named shader constant (uniform) and its type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ShaderConstant {
    pub name: String,
    pub data_type: DataType,
}

impl ShaderConstant {
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
        }
    }
}

/// Compiled or source shader stages plus their interface.
///
/// The bytes are whatever the backend consumes (GLSL source for OpenGL,
/// DXBC for Direct3D 11); the engine never inspects them.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ShaderDesc {
    pub fragment_shader: Vec<u8>,
    pub vertex_shader: Vec<u8>,
    pub vertex_attributes: Vec<VertexAttribute>,
    pub fragment_constants: Vec<ShaderConstant>,
    pub vertex_constants: Vec<ShaderConstant>,
    pub fragment_entry: String,
    pub vertex_entry: String,
}

impl ShaderDesc {
    /// Byte stride of one interleaved vertex.
    pub fn vertex_stride(&self) -> u32 {
        self.vertex_attributes
            .iter()
            .map(|a| a.data_type.size())
            .sum()
    }
}

/// Blend stage configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlendStateDesc {
    pub enabled: bool,
    pub color_src: BlendFactor,
    pub color_dst: BlendFactor,
    pub color_op: BlendOperation,
    pub alpha_src: BlendFactor,
    pub alpha_dst: BlendFactor,
    pub alpha_op: BlendOperation,
    pub mask: ColorMask,
}

impl BlendStateDesc {
    pub const fn opaque() -> Self {
        Self {
            enabled: false,
            color_src: BlendFactor::One,
            color_dst: BlendFactor::Zero,
            color_op: BlendOperation::Add,
            alpha_src: BlendFactor::One,
            alpha_dst: BlendFactor::Zero,
            alpha_op: BlendOperation::Add,
            mask: ColorMask::ALL,
        }
    }

    pub const fn alpha() -> Self {
        Self {
            enabled: true,
            color_src: BlendFactor::SrcAlpha,
            color_dst: BlendFactor::InvSrcAlpha,
            color_op: BlendOperation::Add,
            alpha_src: BlendFactor::One,
            alpha_dst: BlendFactor::Zero,
            alpha_op: BlendOperation::Add,
            mask: ColorMask::ALL,
        }
    }

    pub const fn additive() -> Self {
        Self {
            enabled: true,
            color_src: BlendFactor::One,
            color_dst: BlendFactor::One,
            color_op: BlendOperation::Add,
            alpha_src: BlendFactor::One,
            alpha_dst: BlendFactor::One,
            alpha_op: BlendOperation::Add,
            mask: ColorMask::ALL,
        }
    }
}

impl Default for BlendStateDesc {
    fn default() -> Self {
        Self::opaque()
    }
}

/// What to clear on the current render target.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ClearDesc {
    pub color: Option<Color>,
    pub depth: Option<f32>,
}

impl ClearDesc {
    pub fn color(color: Color) -> Self {
        Self {
            color: Some(color),
            depth: None,
        }
    }

    pub fn with_depth(mut self, depth: f32) -> Self {
        self.depth = Some(depth);
        self
    }
}

/// Complete state of one indexed draw.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawDesc {
    pub shader: ResourceId,
    pub index_buffer: ResourceId,
    pub vertex_buffer: ResourceId,
    pub index_count: u32,
    /// Bytes per index: 2 or 4
    pub index_size: u32,
    pub start_index: u32,
    pub mode: DrawMode,
    pub textures: [Option<ResourceId>; MAX_TEXTURES],
    pub blend_state: Option<ResourceId>,
    /// One entry per vertex shader constant, in declaration order
    pub vertex_constants: Vec<Vec<f32>>,
    /// One entry per fragment shader constant, in declaration order
    pub fragment_constants: Vec<Vec<f32>>,
    /// `None` covers the whole current target
    pub viewport: Option<Rect>,
    pub scissor: Option<Rect>,
    pub depth_write: bool,
    pub depth_test: bool,
    pub cull_mode: CullMode,
    pub fill_mode: FillMode,
    pub front_face: FrontFace,
}

impl DrawDesc {
    pub fn new(
        shader: ResourceId,
        index_buffer: ResourceId,
        vertex_buffer: ResourceId,
        index_count: u32,
    ) -> Self {
        Self {
            shader,
            index_buffer,
            vertex_buffer,
            index_count,
            index_size: 2,
            start_index: 0,
            mode: DrawMode::TriangleList,
            textures: [None; MAX_TEXTURES],
            blend_state: None,
            vertex_constants: Vec::new(),
            fragment_constants: Vec::new(),
            viewport: None,
            scissor: None,
            depth_write: false,
            depth_test: false,
            cull_mode: CullMode::None,
            fill_mode: FillMode::Solid,
            front_face: FrontFace::CounterClockwise,
        }
    }

    pub fn mode(mut self, mode: DrawMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn index_size(mut self, index_size: u32) -> Self {
        self.index_size = index_size;
        self
    }

    pub fn start_index(mut self, start_index: u32) -> Self {
        self.start_index = start_index;
        self
    }

    pub fn texture(mut self, unit: usize, texture: ResourceId) -> Self {
        if let Some(slot) = self.textures.get_mut(unit) {
            *slot = Some(texture);
        }
        self
    }

    pub fn blend_state(mut self, blend_state: ResourceId) -> Self {
        self.blend_state = Some(blend_state);
        self
    }

    pub fn vertex_constants(mut self, constants: Vec<Vec<f32>>) -> Self {
        self.vertex_constants = constants;
        self
    }

    pub fn fragment_constants(mut self, constants: Vec<Vec<f32>>) -> Self {
        self.fragment_constants = constants;
        self
    }

    pub fn viewport(mut self, viewport: Rect) -> Self {
        self.viewport = Some(viewport);
        self
    }

    pub fn scissor(mut self, scissor: Rect) -> Self {
        self.scissor = Some(scissor);
        self
    }

    pub fn depth(mut self, write: bool, test: bool) -> Self {
        self.depth_write = write;
        self.depth_test = test;
        self
    }

    pub fn cull_mode(mut self, cull_mode: CullMode) -> Self {
        self.cull_mode = cull_mode;
        self
    }

    pub fn wireframe(mut self, wireframe: bool) -> Self {
        self.fill_mode = if wireframe {
            FillMode::Wireframe
        } else {
            FillMode::Solid
        };
        self
    }

    /// Rejects draws no backend could execute.
    pub fn validate(&self) -> Result<()> {
        if self.index_size != 2 && self.index_size != 4 {
            return Err(EngineError::data(format!(
                "invalid index size {} (must be 2 or 4)",
                self.index_size
            )));
        }
        Ok(())
    }
}
