//! Engine state enums to D3D11/DXGI values

use windows::Win32::Foundation::{BOOL, FALSE, TRUE};
use windows::Win32::Graphics::Direct3D::*;
use windows::Win32::Graphics::Direct3D11::*;
use windows::Win32::Graphics::Dxgi::Common::*;
use windows::core::{PCSTR, s};

use vesper_core::graphics::{
    BlendFactor, BlendOperation, CullMode, DataType, DrawMode, FillMode, SamplerAddressMode,
    SamplerDesc, SamplerFilter, VertexSemantic,
};
use vesper_core::types::PixelFormat;

pub fn bool(value: bool) -> BOOL {
    if value { TRUE } else { FALSE }
}

pub fn topology(mode: DrawMode) -> D3D_PRIMITIVE_TOPOLOGY {
    match mode {
        DrawMode::PointList => D3D_PRIMITIVE_TOPOLOGY_POINTLIST,
        DrawMode::LineList => D3D_PRIMITIVE_TOPOLOGY_LINELIST,
        DrawMode::LineStrip => D3D_PRIMITIVE_TOPOLOGY_LINESTRIP,
        DrawMode::TriangleList => D3D_PRIMITIVE_TOPOLOGY_TRIANGLELIST,
        DrawMode::TriangleStrip => D3D_PRIMITIVE_TOPOLOGY_TRIANGLESTRIP,
    }
}

pub fn index_format(index_size: u32) -> DXGI_FORMAT {
    if index_size == 4 {
        DXGI_FORMAT_R32_UINT
    } else {
        DXGI_FORMAT_R16_UINT
    }
}

pub fn blend_factor(factor: BlendFactor) -> D3D11_BLEND {
    match factor {
        BlendFactor::Zero => D3D11_BLEND_ZERO,
        BlendFactor::One => D3D11_BLEND_ONE,
        BlendFactor::SrcColor => D3D11_BLEND_SRC_COLOR,
        BlendFactor::InvSrcColor => D3D11_BLEND_INV_SRC_COLOR,
        BlendFactor::SrcAlpha => D3D11_BLEND_SRC_ALPHA,
        BlendFactor::InvSrcAlpha => D3D11_BLEND_INV_SRC_ALPHA,
        BlendFactor::DestAlpha => D3D11_BLEND_DEST_ALPHA,
        BlendFactor::InvDestAlpha => D3D11_BLEND_INV_DEST_ALPHA,
        BlendFactor::DestColor => D3D11_BLEND_DEST_COLOR,
        BlendFactor::InvDestColor => D3D11_BLEND_INV_DEST_COLOR,
        BlendFactor::SrcAlphaSat => D3D11_BLEND_SRC_ALPHA_SAT,
        BlendFactor::BlendFactor => D3D11_BLEND_BLEND_FACTOR,
        BlendFactor::InvBlendFactor => D3D11_BLEND_INV_BLEND_FACTOR,
    }
}

pub fn blend_operation(op: BlendOperation) -> D3D11_BLEND_OP {
    match op {
        BlendOperation::Add => D3D11_BLEND_OP_ADD,
        BlendOperation::Subtract => D3D11_BLEND_OP_SUBTRACT,
        BlendOperation::RevSubtract => D3D11_BLEND_OP_REV_SUBTRACT,
        BlendOperation::Min => D3D11_BLEND_OP_MIN,
        BlendOperation::Max => D3D11_BLEND_OP_MAX,
    }
}

pub fn cull_mode(mode: CullMode) -> D3D11_CULL_MODE {
    match mode {
        CullMode::None => D3D11_CULL_NONE,
        CullMode::Front => D3D11_CULL_FRONT,
        CullMode::Back => D3D11_CULL_BACK,
    }
}

pub fn fill_mode(mode: FillMode) -> D3D11_FILL_MODE {
    match mode {
        FillMode::Solid => D3D11_FILL_SOLID,
        FillMode::Wireframe => D3D11_FILL_WIREFRAME,
    }
}

fn address_mode(mode: SamplerAddressMode) -> D3D11_TEXTURE_ADDRESS_MODE {
    match mode {
        SamplerAddressMode::Clamp => D3D11_TEXTURE_ADDRESS_CLAMP,
        SamplerAddressMode::Repeat => D3D11_TEXTURE_ADDRESS_WRAP,
        SamplerAddressMode::MirrorRepeat => D3D11_TEXTURE_ADDRESS_MIRROR,
    }
}

pub fn sampler_desc(sampler: &SamplerDesc) -> D3D11_SAMPLER_DESC {
    let filter = if sampler.max_anisotropy > 1 {
        D3D11_FILTER_ANISOTROPIC
    } else {
        match sampler.filter {
            SamplerFilter::Point => D3D11_FILTER_MIN_MAG_MIP_POINT,
            SamplerFilter::Linear | SamplerFilter::Bilinear => D3D11_FILTER_MIN_MAG_LINEAR_MIP_POINT,
            SamplerFilter::Trilinear => D3D11_FILTER_MIN_MAG_MIP_LINEAR,
        }
    };
    D3D11_SAMPLER_DESC {
        Filter: filter,
        AddressU: address_mode(sampler.address_x),
        AddressV: address_mode(sampler.address_y),
        AddressW: D3D11_TEXTURE_ADDRESS_CLAMP,
        MipLODBias: 0.0,
        MaxAnisotropy: sampler.max_anisotropy.clamp(1, 16),
        ComparisonFunc: D3D11_COMPARISON_NEVER,
        BorderColor: [0.0; 4],
        MinLOD: 0.0,
        MaxLOD: f32::MAX,
    }
}

pub fn texture_format(format: PixelFormat) -> DXGI_FORMAT {
    match format {
        PixelFormat::R8UnsignedNorm => DXGI_FORMAT_R8_UNORM,
        PixelFormat::Rg8UnsignedNorm => DXGI_FORMAT_R8G8_UNORM,
        PixelFormat::Rgba8UnsignedNorm => DXGI_FORMAT_R8G8B8A8_UNORM,
        PixelFormat::Rgba8Srgb => DXGI_FORMAT_R8G8B8A8_UNORM_SRGB,
        PixelFormat::Rgba16Float => DXGI_FORMAT_R16G16B16A16_FLOAT,
        PixelFormat::Rgba32Float => DXGI_FORMAT_R32G32B32A32_FLOAT,
        PixelFormat::Depth => DXGI_FORMAT_D32_FLOAT,
    }
}

pub fn semantic_name(semantic: VertexSemantic) -> PCSTR {
    match semantic {
        VertexSemantic::Position => s!("POSITION"),
        VertexSemantic::Color => s!("COLOR"),
        VertexSemantic::Normal => s!("NORMAL"),
        VertexSemantic::TexCoord => s!("TEXCOORD"),
        VertexSemantic::BlendIndices => s!("BLENDINDICES"),
        VertexSemantic::BlendWeight => s!("BLENDWEIGHT"),
    }
}

/// Vertex element format, `None` for matrices.
pub fn vertex_format(data_type: DataType) -> Option<DXGI_FORMAT> {
    match data_type {
        DataType::Float => Some(DXGI_FORMAT_R32_FLOAT),
        DataType::FloatVector2 => Some(DXGI_FORMAT_R32G32_FLOAT),
        DataType::FloatVector3 => Some(DXGI_FORMAT_R32G32B32_FLOAT),
        DataType::FloatVector4 => Some(DXGI_FORMAT_R32G32B32A32_FLOAT),
        DataType::UnsignedByteVector4Norm => Some(DXGI_FORMAT_R8G8B8A8_UNORM),
        DataType::Integer => Some(DXGI_FORMAT_R32_SINT),
        DataType::IntegerVector4 => Some(DXGI_FORMAT_R32G32B32A32_SINT),
        DataType::FloatMatrix3 | DataType::FloatMatrix4 => None,
    }
}
