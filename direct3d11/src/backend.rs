//! [`RenderBackend`] over a D3D11 device and DXGI swap chain

use std::ffi::c_void;

use hashbrown::HashMap;
use raw_window_handle::RawWindowHandle;
use tracing::{debug, info, warn};
use windows::Win32::Foundation::{FALSE, HMODULE, HWND, RECT, TRUE};
use windows::Win32::Graphics::Direct3D::*;
use windows::Win32::Graphics::Direct3D11::*;
use windows::Win32::Graphics::Dxgi::Common::*;
use windows::Win32::Graphics::Dxgi::*;

use vesper_core::graphics::{
    BlendStateDesc, BufferDesc, BufferKind, ClearDesc, CullMode, DeviceOptions, DrawCall,
    FillMode, FrontFace, GraphicsDriver, MAX_TEXTURES, NativeWindow, RenderBackend, ResourceId,
    SamplerDesc, ShaderDesc, TextureDesc, TextureLevel,
};
use vesper_core::types::{PixelFormat, Rect, Size2};
use vesper_core::{EngineError, Result};

use crate::constants::ConstantLayout;
use crate::convert;
use crate::growth::buffer_capacity;

fn system(what: &'static str) -> impl FnOnce(windows::core::Error) -> EngineError {
    move |e| EngineError::system(format!("{} failed: {}", what, e))
}

/// Raw `HWND` value of a Win32 window.
pub fn window_hwnd(window: &dyn NativeWindow) -> Result<isize> {
    let handle = window
        .window_handle()
        .map_err(|e| EngineError::system(format!("window handle unavailable: {}", e)))?;
    match handle.as_raw() {
        RawWindowHandle::Win32(handle) => Ok(handle.hwnd.get()),
        other => Err(EngineError::system(format!("not a Win32 window: {:?}", other))),
    }
}

pub struct D3dBuffer {
    raw: ID3D11Buffer,
    kind: BufferKind,
    dynamic: bool,
    size: u32,
}

pub struct D3dTexture {
    raw: ID3D11Texture2D,
    srv: Option<ID3D11ShaderResourceView>,
    rtv: Option<ID3D11RenderTargetView>,
    dsv: Option<ID3D11DepthStencilView>,
    sampler: ID3D11SamplerState,
    size: Size2,
    pixel_format: PixelFormat,
    levels: u32,
    multisampled: bool,
}

pub struct D3dShader {
    vertex: ID3D11VertexShader,
    pixel: ID3D11PixelShader,
    layout: Option<ID3D11InputLayout>,
    stride: u32,
    vertex_constants: ConstantLayout,
    pixel_constants: ConstantLayout,
    vertex_buffer: Option<ID3D11Buffer>,
    pixel_buffer: Option<ID3D11Buffer>,
}

pub struct D3dBlendState {
    raw: ID3D11BlendState,
}

#[derive(Default)]
pub struct D3dRenderTarget {
    colors: Vec<(ResourceId, ID3D11RenderTargetView)>,
    depth: Option<(ResourceId, ID3D11DepthStencilView)>,
    size: Option<Size2>,
}

// SAFETY: D3D11 objects are created on the render context and only touched
// from there afterwards. The device moves them between threads once, when
// the backend is created inside the render thread's factory, never
// concurrently.
unsafe impl Send for D3dBuffer {}
unsafe impl Send for D3dTexture {}
unsafe impl Send for D3dShader {}
unsafe impl Send for D3dBlendState {}
unsafe impl Send for D3dRenderTarget {}
unsafe impl Send for D3d11Backend {}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct RasterizerKey {
    cull: CullMode,
    fill: FillMode,
    front: FrontFace,
    scissor: bool,
}

/// Views the output merger currently writes to.
struct Bound {
    colors: Vec<Option<ID3D11RenderTargetView>>,
    depth: Option<ID3D11DepthStencilView>,
    size: Size2,
}

/// Direct3D 11 implementation of [`RenderBackend`].
pub struct D3d11Backend {
    device: ID3D11Device,
    context: ID3D11DeviceContext,
    swap_chain: IDXGISwapChain,
    back_buffer: Option<ID3D11RenderTargetView>,
    depth_buffer: Option<ID3D11DepthStencilView>,
    options: DeviceOptions,
    default_sampler: SamplerDesc,
    rasterizer_states: HashMap<RasterizerKey, ID3D11RasterizerState>,
    depth_states: HashMap<(bool, bool), ID3D11DepthStencilState>,
    /// Scratch for constant packing
    constants: Vec<f32>,
    /// `None` while the back buffer is bound
    current: Option<Bound>,
}

impl D3d11Backend {
    pub fn new(hwnd: isize, options: &DeviceOptions) -> Result<Self> {
        let hwnd = HWND(hwnd as *mut c_void);
        let swap_desc = DXGI_SWAP_CHAIN_DESC {
            BufferDesc: DXGI_MODE_DESC {
                Width: options.size.width,
                Height: options.size.height,
                RefreshRate: DXGI_RATIONAL {
                    Numerator: 0,
                    Denominator: 1,
                },
                Format: DXGI_FORMAT_R8G8B8A8_UNORM,
                ..Default::default()
            },
            SampleDesc: DXGI_SAMPLE_DESC {
                Count: options.sample_count,
                Quality: 0,
            },
            BufferUsage: DXGI_USAGE_RENDER_TARGET_OUTPUT,
            BufferCount: 1,
            OutputWindow: hwnd,
            Windowed: TRUE,
            SwapEffect: DXGI_SWAP_EFFECT_DISCARD,
            Flags: 0,
        };

        let mut flags = D3D11_CREATE_DEVICE_BGRA_SUPPORT;
        if options.debug_renderer {
            flags |= D3D11_CREATE_DEVICE_DEBUG;
        }

        let mut swap_chain = None;
        let mut device = None;
        let mut context = None;
        let mut feature_level = D3D_FEATURE_LEVEL_11_0;
        unsafe {
            D3D11CreateDeviceAndSwapChain(
                None::<&IDXGIAdapter>,
                D3D_DRIVER_TYPE_HARDWARE,
                HMODULE::default(),
                flags,
                Some(&[D3D_FEATURE_LEVEL_11_0, D3D_FEATURE_LEVEL_10_1, D3D_FEATURE_LEVEL_10_0]),
                D3D11_SDK_VERSION,
                Some(&swap_desc),
                Some(&mut swap_chain),
                Some(&mut device),
                Some(&mut feature_level),
                Some(&mut context),
            )
            .map_err(system("D3D11CreateDeviceAndSwapChain"))?;
        }
        let (Some(swap_chain), Some(device), Some(context)) = (swap_chain, device, context) else {
            return Err(EngineError::system("D3D11 device creation returned no objects"));
        };
        info!("Direct3D 11 device created (feature level 0x{:x})", feature_level.0);

        let mut backend = Self {
            device,
            context,
            swap_chain,
            back_buffer: None,
            depth_buffer: None,
            options: *options,
            default_sampler: SamplerDesc {
                filter: options.texture_filter,
                max_anisotropy: options.max_anisotropy,
                ..Default::default()
            },
            rasterizer_states: HashMap::new(),
            depth_states: HashMap::new(),
            constants: Vec::new(),
            current: None,
        };
        backend.create_back_buffer_views()?;
        backend.bind_back_buffer();
        Ok(backend)
    }

    fn create_back_buffer_views(&mut self) -> Result<()> {
        unsafe {
            let buffer: ID3D11Texture2D = self.swap_chain.GetBuffer(0).map_err(system("GetBuffer"))?;
            let mut rtv = None;
            self.device
                .CreateRenderTargetView(&buffer, None, Some(&mut rtv))
                .map_err(system("CreateRenderTargetView"))?;
            self.back_buffer = rtv;

            self.depth_buffer = if self.options.depth {
                let desc = D3D11_TEXTURE2D_DESC {
                    Width: self.options.size.width,
                    Height: self.options.size.height,
                    MipLevels: 1,
                    ArraySize: 1,
                    Format: DXGI_FORMAT_D32_FLOAT,
                    SampleDesc: DXGI_SAMPLE_DESC {
                        Count: self.options.sample_count,
                        Quality: 0,
                    },
                    Usage: D3D11_USAGE_DEFAULT,
                    BindFlags: D3D11_BIND_DEPTH_STENCIL.0 as u32,
                    CPUAccessFlags: 0,
                    MiscFlags: 0,
                };
                let mut texture = None;
                self.device
                    .CreateTexture2D(&desc, None, Some(&mut texture))
                    .map_err(system("CreateTexture2D(depth)"))?;
                let texture = texture.ok_or_else(|| EngineError::system("no depth texture"))?;
                let mut dsv = None;
                self.device
                    .CreateDepthStencilView(&texture, None, Some(&mut dsv))
                    .map_err(system("CreateDepthStencilView"))?;
                dsv
            } else {
                None
            };
        }
        Ok(())
    }

    fn bind_back_buffer(&mut self) {
        self.current = None;
        unsafe {
            self.context
                .OMSetRenderTargets(Some(&[self.back_buffer.clone()]), self.depth_buffer.as_ref());
        }
    }

    fn target_size(&self) -> Size2 {
        self.current.as_ref().map(|b| b.size).unwrap_or(self.options.size)
    }

    fn create_raw_buffer(&self, kind: BufferKind, dynamic: bool, size: u32, data: &[u8]) -> Result<ID3D11Buffer> {
        if size == 0 {
            return Err(EngineError::data("buffers must have a non-zero size"));
        }
        let bind = match kind {
            BufferKind::Index => D3D11_BIND_INDEX_BUFFER,
            BufferKind::Vertex => D3D11_BIND_VERTEX_BUFFER,
        };
        let desc = D3D11_BUFFER_DESC {
            ByteWidth: size,
            Usage: if dynamic { D3D11_USAGE_DYNAMIC } else { D3D11_USAGE_DEFAULT },
            BindFlags: bind.0 as u32,
            CPUAccessFlags: if dynamic { D3D11_CPU_ACCESS_WRITE.0 as u32 } else { 0 },
            MiscFlags: 0,
            StructureByteStride: 0,
        };
        // Initial data must cover the whole buffer
        let initial = (data.len() as u32 == size).then(|| D3D11_SUBRESOURCE_DATA {
            pSysMem: data.as_ptr() as *const c_void,
            SysMemPitch: 0,
            SysMemSlicePitch: 0,
        });
        let mut buffer = None;
        unsafe {
            self.device
                .CreateBuffer(&desc, initial.as_ref().map(|d| d as *const _), Some(&mut buffer))
                .map_err(system("CreateBuffer"))?;
        }
        let buffer = buffer.ok_or_else(|| EngineError::system("CreateBuffer returned no buffer"))?;
        if initial.is_none() && !data.is_empty() {
            self.write_buffer(&buffer, dynamic, data)?;
        }
        Ok(buffer)
    }

    fn write_buffer(&self, buffer: &ID3D11Buffer, dynamic: bool, data: &[u8]) -> Result<()> {
        unsafe {
            if dynamic {
                let mut mapped = D3D11_MAPPED_SUBRESOURCE::default();
                self.context
                    .Map(buffer, 0, D3D11_MAP_WRITE_DISCARD, 0, Some(&mut mapped))
                    .map_err(system("Map"))?;
                std::ptr::copy_nonoverlapping(data.as_ptr(), mapped.pData as *mut u8, data.len());
                self.context.Unmap(buffer, 0);
            } else {
                let region = D3D11_BOX {
                    left: 0,
                    top: 0,
                    front: 0,
                    right: data.len() as u32,
                    bottom: 1,
                    back: 1,
                };
                self.context
                    .UpdateSubresource(buffer, 0, Some(&region), data.as_ptr() as *const c_void, 0, 0);
            }
        }
        Ok(())
    }

    fn create_constant_buffer(&self, layout: &ConstantLayout) -> Result<Option<ID3D11Buffer>> {
        if layout.is_empty() {
            return Ok(None);
        }
        let desc = D3D11_BUFFER_DESC {
            ByteWidth: layout.byte_size(),
            Usage: D3D11_USAGE_DYNAMIC,
            BindFlags: D3D11_BIND_CONSTANT_BUFFER.0 as u32,
            CPUAccessFlags: D3D11_CPU_ACCESS_WRITE.0 as u32,
            MiscFlags: 0,
            StructureByteStride: 0,
        };
        let mut buffer = None;
        unsafe {
            self.device
                .CreateBuffer(&desc, None, Some(&mut buffer))
                .map_err(system("CreateBuffer(constants)"))?;
        }
        Ok(buffer)
    }

    fn create_sampler(&self, sampler: &SamplerDesc) -> Result<ID3D11SamplerState> {
        let desc = convert::sampler_desc(sampler);
        let mut state = None;
        unsafe {
            self.device
                .CreateSamplerState(&desc, Some(&mut state))
                .map_err(system("CreateSamplerState"))?;
        }
        state.ok_or_else(|| EngineError::system("CreateSamplerState returned no sampler"))
    }

    fn rasterizer_state(&mut self, key: RasterizerKey) -> Result<ID3D11RasterizerState> {
        if let Some(state) = self.rasterizer_states.get(&key) {
            return Ok(state.clone());
        }
        let desc = D3D11_RASTERIZER_DESC {
            FillMode: convert::fill_mode(key.fill),
            CullMode: convert::cull_mode(key.cull),
            FrontCounterClockwise: convert::bool(key.front == FrontFace::CounterClockwise),
            DepthBias: 0,
            DepthBiasClamp: 0.0,
            SlopeScaledDepthBias: 0.0,
            DepthClipEnable: TRUE,
            ScissorEnable: convert::bool(key.scissor),
            MultisampleEnable: convert::bool(self.options.sample_count > 1),
            AntialiasedLineEnable: FALSE,
        };
        let mut state = None;
        unsafe {
            self.device
                .CreateRasterizerState(&desc, Some(&mut state))
                .map_err(system("CreateRasterizerState"))?;
        }
        let state = state.ok_or_else(|| EngineError::system("CreateRasterizerState returned nothing"))?;
        self.rasterizer_states.insert(key, state.clone());
        Ok(state)
    }

    fn depth_state(&mut self, test: bool, write: bool) -> Result<ID3D11DepthStencilState> {
        if let Some(state) = self.depth_states.get(&(test, write)) {
            return Ok(state.clone());
        }
        let desc = D3D11_DEPTH_STENCIL_DESC {
            DepthEnable: convert::bool(test),
            DepthWriteMask: if write {
                D3D11_DEPTH_WRITE_MASK_ALL
            } else {
                D3D11_DEPTH_WRITE_MASK_ZERO
            },
            DepthFunc: D3D11_COMPARISON_LESS_EQUAL,
            StencilEnable: FALSE,
            ..Default::default()
        };
        let mut state = None;
        unsafe {
            self.device
                .CreateDepthStencilState(&desc, Some(&mut state))
                .map_err(system("CreateDepthStencilState"))?;
        }
        let state = state.ok_or_else(|| EngineError::system("CreateDepthStencilState returned nothing"))?;
        self.depth_states.insert((test, write), state.clone());
        Ok(state)
    }

    fn upload_constants(
        &mut self,
        layout: &ConstantLayout,
        buffer: Option<&ID3D11Buffer>,
        values: &[Vec<f32>],
    ) -> Result<()> {
        let Some(buffer) = buffer else {
            if values.is_empty() {
                return Ok(());
            }
            return Err(EngineError::data("constants for a shader stage that declares none"));
        };
        let mut packed = std::mem::take(&mut self.constants);
        let result = layout.pack(values, &mut packed).and_then(|()| {
            let bytes = unsafe {
                std::slice::from_raw_parts(packed.as_ptr() as *const u8, packed.len() * 4)
            };
            self.write_buffer(buffer, true, bytes)
        });
        self.constants = packed;
        result
    }

    fn to_rect(rect: Rect) -> RECT {
        RECT {
            left: rect.x,
            top: rect.y,
            right: rect.x + rect.width as i32,
            bottom: rect.y + rect.height as i32,
        }
    }
}

impl RenderBackend for D3d11Backend {
    type Buffer = D3dBuffer;
    type Texture = D3dTexture;
    type Shader = D3dShader;
    type BlendState = D3dBlendState;
    type RenderTarget = D3dRenderTarget;

    fn driver(&self) -> GraphicsDriver {
        GraphicsDriver::Direct3D11
    }

    fn create_buffer(&mut self, desc: &BufferDesc) -> Result<Self::Buffer> {
        let size = desc.allocation_size();
        let raw = self.create_raw_buffer(desc.kind, desc.dynamic, size, &desc.data)?;
        Ok(D3dBuffer {
            raw,
            kind: desc.kind,
            dynamic: desc.dynamic,
            size,
        })
    }

    fn update_buffer(&mut self, buffer: &mut Self::Buffer, data: &[u8]) -> Result<()> {
        match buffer_capacity(buffer.size, data.len() as u32) {
            Some(size) => {
                debug!("Growing {:?} buffer from {} to {} bytes", buffer.kind, buffer.size, size);
                buffer.raw = self.create_raw_buffer(buffer.kind, buffer.dynamic, size, data)?;
                buffer.size = size;
                Ok(())
            }
            None if data.is_empty() => Ok(()),
            None => self.write_buffer(&buffer.raw, buffer.dynamic, data),
        }
    }

    fn destroy_buffer(&mut self, _buffer: Self::Buffer) {}

    fn create_texture(&mut self, desc: &TextureDesc) -> Result<Self::Texture> {
        let depth = desc.pixel_format == PixelFormat::Depth;
        if depth && desc.bind_shader {
            return Err(EngineError::data("depth textures cannot be sampled"));
        }
        let mut bind = 0;
        if desc.bind_shader {
            bind |= D3D11_BIND_SHADER_RESOURCE.0 as u32;
        }
        if desc.render_target {
            bind |= if depth {
                D3D11_BIND_DEPTH_STENCIL.0 as u32
            } else {
                D3D11_BIND_RENDER_TARGET.0 as u32
            };
        }
        let levels = desc.levels.len().max(1) as u32;
        let tex_desc = D3D11_TEXTURE2D_DESC {
            Width: desc.size.width,
            Height: desc.size.height,
            MipLevels: levels,
            ArraySize: 1,
            Format: convert::texture_format(desc.pixel_format),
            SampleDesc: DXGI_SAMPLE_DESC {
                Count: desc.sample_count.max(1),
                Quality: 0,
            },
            Usage: D3D11_USAGE_DEFAULT,
            BindFlags: bind,
            CPUAccessFlags: 0,
            MiscFlags: 0,
        };
        let bpp = desc.pixel_format.bytes_per_pixel() as u32;
        let initial: Vec<D3D11_SUBRESOURCE_DATA> = desc
            .levels
            .iter()
            .map(|level| D3D11_SUBRESOURCE_DATA {
                pSysMem: level.data.as_ptr() as *const c_void,
                SysMemPitch: level.size.width * bpp,
                SysMemSlicePitch: 0,
            })
            .collect();

        let mut raw = None;
        unsafe {
            self.device
                .CreateTexture2D(
                    &tex_desc,
                    (!initial.is_empty()).then(|| initial.as_ptr()),
                    Some(&mut raw),
                )
                .map_err(system("CreateTexture2D"))?;
        }
        let raw = raw.ok_or_else(|| EngineError::system("CreateTexture2D returned no texture"))?;

        let mut srv = None;
        let mut rtv = None;
        let mut dsv = None;
        unsafe {
            if desc.bind_shader {
                self.device
                    .CreateShaderResourceView(&raw, None, Some(&mut srv))
                    .map_err(system("CreateShaderResourceView"))?;
            }
            if desc.render_target && depth {
                self.device
                    .CreateDepthStencilView(&raw, None, Some(&mut dsv))
                    .map_err(system("CreateDepthStencilView"))?;
            } else if desc.render_target {
                self.device
                    .CreateRenderTargetView(&raw, None, Some(&mut rtv))
                    .map_err(system("CreateRenderTargetView"))?;
            }
        }
        let sampler = if desc.sampler == SamplerDesc::default() {
            self.default_sampler
        } else {
            desc.sampler
        };
        Ok(D3dTexture {
            raw,
            srv,
            rtv,
            dsv,
            sampler: self.create_sampler(&sampler)?,
            size: desc.size,
            pixel_format: desc.pixel_format,
            levels,
            multisampled: desc.sample_count > 1,
        })
    }

    fn update_texture(&mut self, texture: &mut Self::Texture, levels: &[TextureLevel]) -> Result<()> {
        if texture.multisampled {
            return Err(EngineError::data("multisampled textures can't be updated"));
        }
        if levels.len() as u32 > texture.levels {
            return Err(EngineError::data(format!(
                "{} levels for a texture with {}",
                levels.len(),
                texture.levels
            )));
        }
        if let Some(base) = levels.first() {
            if base.size != texture.size {
                return Err(EngineError::data(format!(
                    "texture data is {}x{}, texture is {}x{}",
                    base.size.width, base.size.height, texture.size.width, texture.size.height
                )));
            }
        }
        let bpp = texture.pixel_format.bytes_per_pixel() as u32;
        for (index, level) in levels.iter().enumerate() {
            unsafe {
                self.context.UpdateSubresource(
                    &texture.raw,
                    index as u32,
                    None,
                    level.data.as_ptr() as *const c_void,
                    level.size.width * bpp,
                    0,
                );
            }
        }
        Ok(())
    }

    fn set_texture_sampler(&mut self, texture: &mut Self::Texture, sampler: &SamplerDesc) -> Result<()> {
        texture.sampler = self.create_sampler(sampler)?;
        Ok(())
    }

    fn destroy_texture(&mut self, _texture: Self::Texture) {}

    fn create_shader(&mut self, desc: &ShaderDesc) -> Result<Self::Shader> {
        if desc.vertex_shader.is_empty() || desc.fragment_shader.is_empty() {
            return Err(EngineError::data("shader stage without bytecode"));
        }
        let mut elements = Vec::with_capacity(desc.vertex_attributes.len());
        let mut offset = 0;
        for attribute in &desc.vertex_attributes {
            let format = convert::vertex_format(attribute.data_type).ok_or_else(|| {
                EngineError::data(format!("{:?} can't be a vertex attribute", attribute.data_type))
            })?;
            elements.push(D3D11_INPUT_ELEMENT_DESC {
                SemanticName: convert::semantic_name(attribute.semantic),
                SemanticIndex: attribute.index,
                Format: format,
                InputSlot: 0,
                AlignedByteOffset: offset,
                InputSlotClass: D3D11_INPUT_PER_VERTEX_DATA,
                InstanceDataStepRate: 0,
            });
            offset += attribute.data_type.size();
        }

        let mut vertex = None;
        let mut pixel = None;
        let mut layout = None;
        unsafe {
            self.device
                .CreateVertexShader(&desc.vertex_shader, None::<&ID3D11ClassLinkage>, Some(&mut vertex))
                .map_err(|e| EngineError::parse(format!("invalid vertex shader: {}", e)))?;
            self.device
                .CreatePixelShader(&desc.fragment_shader, None::<&ID3D11ClassLinkage>, Some(&mut pixel))
                .map_err(|e| EngineError::parse(format!("invalid pixel shader: {}", e)))?;
            if !elements.is_empty() {
                self.device
                    .CreateInputLayout(&elements, &desc.vertex_shader, Some(&mut layout))
                    .map_err(system("CreateInputLayout"))?;
            }
        }
        let (Some(vertex), Some(pixel)) = (vertex, pixel) else {
            return Err(EngineError::system("shader creation returned no objects"));
        };

        let vertex_constants = ConstantLayout::new(&desc.vertex_constants);
        let pixel_constants = ConstantLayout::new(&desc.fragment_constants);
        Ok(D3dShader {
            vertex,
            pixel,
            layout,
            stride: desc.vertex_stride(),
            vertex_buffer: self.create_constant_buffer(&vertex_constants)?,
            pixel_buffer: self.create_constant_buffer(&pixel_constants)?,
            vertex_constants,
            pixel_constants,
        })
    }

    fn destroy_shader(&mut self, _shader: Self::Shader) {}

    fn create_blend_state(&mut self, desc: &BlendStateDesc) -> Result<Self::BlendState> {
        let mask = (desc.mask.red as u8 * D3D11_COLOR_WRITE_ENABLE_RED.0 as u8)
            | (desc.mask.green as u8 * D3D11_COLOR_WRITE_ENABLE_GREEN.0 as u8)
            | (desc.mask.blue as u8 * D3D11_COLOR_WRITE_ENABLE_BLUE.0 as u8)
            | (desc.mask.alpha as u8 * D3D11_COLOR_WRITE_ENABLE_ALPHA.0 as u8);
        let target = D3D11_RENDER_TARGET_BLEND_DESC {
            BlendEnable: convert::bool(desc.enabled),
            SrcBlend: convert::blend_factor(desc.color_src),
            DestBlend: convert::blend_factor(desc.color_dst),
            BlendOp: convert::blend_operation(desc.color_op),
            SrcBlendAlpha: convert::blend_factor(desc.alpha_src),
            DestBlendAlpha: convert::blend_factor(desc.alpha_dst),
            BlendOpAlpha: convert::blend_operation(desc.alpha_op),
            RenderTargetWriteMask: mask,
        };
        let blend_desc = D3D11_BLEND_DESC {
            AlphaToCoverageEnable: FALSE,
            IndependentBlendEnable: FALSE,
            RenderTarget: [target; 8],
        };
        let mut raw = None;
        unsafe {
            self.device
                .CreateBlendState(&blend_desc, Some(&mut raw))
                .map_err(system("CreateBlendState"))?;
        }
        let raw = raw.ok_or_else(|| EngineError::system("CreateBlendState returned nothing"))?;
        Ok(D3dBlendState { raw })
    }

    fn destroy_blend_state(&mut self, _blend_state: Self::BlendState) {}

    fn create_render_target(&mut self) -> Result<Self::RenderTarget> {
        Ok(D3dRenderTarget::default())
    }

    fn add_color_texture(
        &mut self,
        target: &mut Self::RenderTarget,
        id: ResourceId,
        texture: &Self::Texture,
    ) -> Result<()> {
        let rtv = texture
            .rtv
            .clone()
            .ok_or_else(|| EngineError::data(format!("texture {} is not a color render target", id)))?;
        if !target.colors.iter().any(|(c, _)| *c == id) {
            target.colors.push((id, rtv));
            target.size.get_or_insert(texture.size);
        }
        Ok(())
    }

    fn remove_color_texture(&mut self, target: &mut Self::RenderTarget, id: ResourceId) -> Result<()> {
        target.colors.retain(|(c, _)| *c != id);
        Ok(())
    }

    fn set_depth_texture(
        &mut self,
        target: &mut Self::RenderTarget,
        texture: Option<(ResourceId, &Self::Texture)>,
    ) -> Result<()> {
        target.depth = match texture {
            Some((id, texture)) => {
                let dsv = texture
                    .dsv
                    .clone()
                    .ok_or_else(|| EngineError::data(format!("texture {} is not a depth texture", id)))?;
                target.size.get_or_insert(texture.size);
                Some((id, dsv))
            }
            None => None,
        };
        Ok(())
    }

    fn destroy_render_target(&mut self, _target: Self::RenderTarget) {}

    fn set_render_target(&mut self, target: Option<&Self::RenderTarget>) -> Result<()> {
        let Some(target) = target else {
            self.bind_back_buffer();
            return Ok(());
        };
        let size = target
            .size
            .ok_or_else(|| EngineError::data("render target has no attachments"))?;
        let bound = Bound {
            colors: target.colors.iter().map(|(_, rtv)| Some(rtv.clone())).collect(),
            depth: target.depth.as_ref().map(|(_, dsv)| dsv.clone()),
            size,
        };
        unsafe {
            // Unbind shader resources that may alias the new outputs
            self.context.PSSetShaderResources(0, Some(&[None, None, None, None]));
            self.context
                .OMSetRenderTargets(Some(&bound.colors), bound.depth.as_ref());
        }
        self.current = Some(bound);
        Ok(())
    }

    fn clear(&mut self, desc: &ClearDesc) -> Result<()> {
        let (colors, depth) = match &self.current {
            Some(bound) => (bound.colors.clone(), bound.depth.clone()),
            None => (vec![self.back_buffer.clone()], self.depth_buffer.clone()),
        };
        unsafe {
            if let Some(color) = desc.color {
                let rgba = color.normalized();
                for rtv in colors.iter().flatten() {
                    self.context.ClearRenderTargetView(rtv, &rgba);
                }
            }
            if let (Some(value), Some(dsv)) = (desc.depth, depth.as_ref()) {
                self.context
                    .ClearDepthStencilView(dsv, D3D11_CLEAR_DEPTH.0 as u32, value, 0);
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

        self.upload_constants(
            &shader.vertex_constants,
            shader.vertex_buffer.as_ref(),
            &desc.vertex_constants,
        )?;
        self.upload_constants(
            &shader.pixel_constants,
            shader.pixel_buffer.as_ref(),
            &desc.fragment_constants,
        )?;
        let rasterizer = self.rasterizer_state(RasterizerKey {
            cull: desc.cull_mode,
            fill: desc.fill_mode,
            front: desc.front_face,
            scissor: desc.scissor.is_some(),
        })?;
        let depth = self.depth_state(desc.depth_test, desc.depth_write)?;
        let target_size = self.target_size();

        let mut views: [Option<ID3D11ShaderResourceView>; MAX_TEXTURES] = Default::default();
        let mut samplers: [Option<ID3D11SamplerState>; MAX_TEXTURES] = Default::default();
        for (unit, texture) in call.textures.iter().enumerate() {
            if let Some(texture) = texture {
                views[unit] = texture.srv.clone();
                samplers[unit] = Some(texture.sampler.clone());
            }
        }

        let viewport = desc.viewport.unwrap_or(Rect::from_size(target_size));
        let context = &self.context;
        unsafe {
            context.IASetInputLayout(shader.layout.as_ref());
            context.IASetPrimitiveTopology(convert::topology(desc.mode));
            let vertex_buffer = Some(call.vertex_buffer.raw.clone());
            let offset = 0u32;
            context.IASetVertexBuffers(0, 1, Some(&vertex_buffer), Some(&shader.stride), Some(&offset));
            context.IASetIndexBuffer(&call.index_buffer.raw, convert::index_format(desc.index_size), 0);

            context.VSSetShader(&shader.vertex, None);
            context.PSSetShader(&shader.pixel, None);
            if let Some(buffer) = &shader.vertex_buffer {
                context.VSSetConstantBuffers(0, Some(&[Some(buffer.clone())]));
            }
            if let Some(buffer) = &shader.pixel_buffer {
                context.PSSetConstantBuffers(0, Some(&[Some(buffer.clone())]));
            }
            context.PSSetShaderResources(0, Some(&views));
            context.PSSetSamplers(0, Some(&samplers));

            context.RSSetState(&rasterizer);
            context.RSSetViewports(Some(&[D3D11_VIEWPORT {
                TopLeftX: viewport.x as f32,
                TopLeftY: viewport.y as f32,
                Width: viewport.width as f32,
                Height: viewport.height as f32,
                MinDepth: 0.0,
                MaxDepth: 1.0,
            }]));
            if let Some(scissor) = desc.scissor {
                context.RSSetScissorRects(Some(&[Self::to_rect(scissor)]));
            }
            context.OMSetDepthStencilState(&depth, 0);
            match call.blend_state {
                Some(blend) => context.OMSetBlendState(&blend.raw, Some(&[0.0; 4]), 0xffff_ffff),
                None => context.OMSetBlendState(None::<&ID3D11BlendState>, Some(&[0.0; 4]), 0xffff_ffff),
            }

            context.DrawIndexed(desc.index_count, desc.start_index, 0);
        }
        Ok(())
    }

    fn present(&mut self) -> Result<()> {
        unsafe {
            self.swap_chain
                .Present(u32::from(self.options.vsync), DXGI_PRESENT(0))
                .ok()
                .map_err(system("Present"))
        }
    }

    fn resize(&mut self, size: Size2) -> Result<()> {
        if size.is_empty() {
            return Err(EngineError::data("back buffer size must be non-zero"));
        }
        let rebind = self.current.is_none();
        unsafe {
            self.context.OMSetRenderTargets(None, None::<&ID3D11DepthStencilView>);
        }
        self.back_buffer = None;
        self.depth_buffer = None;
        unsafe {
            self.swap_chain
                .ResizeBuffers(0, size.width, size.height, DXGI_FORMAT_UNKNOWN, DXGI_SWAP_CHAIN_FLAG(0))
                .map_err(system("ResizeBuffers"))?;
        }
        self.options.size = size;
        self.create_back_buffer_views()?;
        if rebind {
            self.bind_back_buffer();
        } else {
            warn!("Resized while a render target is bound; back buffer rebinds on the next switch");
        }
        Ok(())
    }
}
