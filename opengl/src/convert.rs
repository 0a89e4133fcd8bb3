//! Engine state enums to GL constants

use vesper_core::graphics::{
    BlendFactor, BlendOperation, BufferKind, CullMode, DataType, DrawMode, FrontFace,
    SamplerAddressMode, SamplerFilter,
};
use vesper_core::types::{PixelFormat, Rect};

/// `GL_TEXTURE_MAX_ANISOTROPY(_EXT)`, same value for the extension and 4.6 core.
pub const TEXTURE_MAX_ANISOTROPY: u32 = 0x84FE;

pub fn draw_mode(mode: DrawMode) -> u32 {
    match mode {
        DrawMode::PointList => glow::POINTS,
        DrawMode::LineList => glow::LINES,
        DrawMode::LineStrip => glow::LINE_STRIP,
        DrawMode::TriangleList => glow::TRIANGLES,
        DrawMode::TriangleStrip => glow::TRIANGLE_STRIP,
    }
}

pub fn buffer_target(kind: BufferKind) -> u32 {
    match kind {
        BufferKind::Index => glow::ELEMENT_ARRAY_BUFFER,
        BufferKind::Vertex => glow::ARRAY_BUFFER,
    }
}

pub fn buffer_usage(dynamic: bool) -> u32 {
    if dynamic {
        glow::DYNAMIC_DRAW
    } else {
        glow::STATIC_DRAW
    }
}

pub fn index_type(index_size: u32) -> u32 {
    if index_size == 4 {
        glow::UNSIGNED_INT
    } else {
        glow::UNSIGNED_SHORT
    }
}

pub fn blend_factor(factor: BlendFactor) -> u32 {
    match factor {
        BlendFactor::Zero => glow::ZERO,
        BlendFactor::One => glow::ONE,
        BlendFactor::SrcColor => glow::SRC_COLOR,
        BlendFactor::InvSrcColor => glow::ONE_MINUS_SRC_COLOR,
        BlendFactor::SrcAlpha => glow::SRC_ALPHA,
        BlendFactor::InvSrcAlpha => glow::ONE_MINUS_SRC_ALPHA,
        BlendFactor::DestAlpha => glow::DST_ALPHA,
        BlendFactor::InvDestAlpha => glow::ONE_MINUS_DST_ALPHA,
        BlendFactor::DestColor => glow::DST_COLOR,
        BlendFactor::InvDestColor => glow::ONE_MINUS_DST_COLOR,
        BlendFactor::SrcAlphaSat => glow::SRC_ALPHA_SATURATE,
        BlendFactor::BlendFactor => glow::CONSTANT_COLOR,
        BlendFactor::InvBlendFactor => glow::ONE_MINUS_CONSTANT_COLOR,
    }
}

pub fn blend_operation(op: BlendOperation) -> u32 {
    match op {
        BlendOperation::Add => glow::FUNC_ADD,
        BlendOperation::Subtract => glow::FUNC_SUBTRACT,
        BlendOperation::RevSubtract => glow::FUNC_REVERSE_SUBTRACT,
        BlendOperation::Min => glow::MIN,
        BlendOperation::Max => glow::MAX,
    }
}

/// Face to cull, `None` when culling is off.
pub fn cull_face(mode: CullMode) -> Option<u32> {
    match mode {
        CullMode::None => None,
        CullMode::Front => Some(glow::FRONT),
        CullMode::Back => Some(glow::BACK),
    }
}

pub fn front_face(face: FrontFace) -> u32 {
    match face {
        FrontFace::Clockwise => glow::CW,
        FrontFace::CounterClockwise => glow::CCW,
    }
}

pub fn address_mode(mode: SamplerAddressMode) -> i32 {
    (match mode {
        SamplerAddressMode::Clamp => glow::CLAMP_TO_EDGE,
        SamplerAddressMode::Repeat => glow::REPEAT,
        SamplerAddressMode::MirrorRepeat => glow::MIRRORED_REPEAT,
    }) as i32
}

/// `(min, mag)` filters. Mipmapped minification only applies when the
/// texture has more than one level.
pub fn filters(filter: SamplerFilter, mipmapped: bool) -> (i32, i32) {
    let (min, mag) = match (filter, mipmapped) {
        (SamplerFilter::Point, false) => (glow::NEAREST, glow::NEAREST),
        (SamplerFilter::Point, true) => (glow::NEAREST_MIPMAP_NEAREST, glow::NEAREST),
        (SamplerFilter::Linear, _) | (SamplerFilter::Bilinear, false) | (SamplerFilter::Trilinear, false) => {
            (glow::LINEAR, glow::LINEAR)
        }
        (SamplerFilter::Bilinear, true) => (glow::LINEAR_MIPMAP_NEAREST, glow::LINEAR),
        (SamplerFilter::Trilinear, true) => (glow::LINEAR_MIPMAP_LINEAR, glow::LINEAR),
    };
    (min as i32, mag as i32)
}

/// Internal format, pixel format and component type for `tex_image_2d`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextureFormat {
    pub internal: i32,
    pub format: u32,
    pub ty: u32,
}

pub fn texture_format(format: PixelFormat) -> TextureFormat {
    let (internal, format, ty) = match format {
        PixelFormat::R8UnsignedNorm => (glow::R8, glow::RED, glow::UNSIGNED_BYTE),
        PixelFormat::Rg8UnsignedNorm => (glow::RG8, glow::RG, glow::UNSIGNED_BYTE),
        PixelFormat::Rgba8UnsignedNorm => (glow::RGBA8, glow::RGBA, glow::UNSIGNED_BYTE),
        PixelFormat::Rgba8Srgb => (glow::SRGB8_ALPHA8, glow::RGBA, glow::UNSIGNED_BYTE),
        PixelFormat::Rgba16Float => (glow::RGBA16F, glow::RGBA, glow::HALF_FLOAT),
        PixelFormat::Rgba32Float => (glow::RGBA32F, glow::RGBA, glow::FLOAT),
        PixelFormat::Depth => (glow::DEPTH_COMPONENT24, glow::DEPTH_COMPONENT, glow::UNSIGNED_INT),
    };
    TextureFormat {
        internal: internal as i32,
        format,
        ty,
    }
}

/// Component count, component type and normalization of a vertex attribute.
/// Matrices can't be vertex attributes.
pub fn vertex_format(data_type: DataType) -> Option<(i32, u32, bool)> {
    match data_type {
        DataType::Float => Some((1, glow::FLOAT, false)),
        DataType::FloatVector2 => Some((2, glow::FLOAT, false)),
        DataType::FloatVector3 => Some((3, glow::FLOAT, false)),
        DataType::FloatVector4 => Some((4, glow::FLOAT, false)),
        DataType::UnsignedByteVector4Norm => Some((4, glow::UNSIGNED_BYTE, true)),
        DataType::Integer => Some((1, glow::INT, false)),
        DataType::IntegerVector4 => Some((4, glow::INT, false)),
        DataType::FloatMatrix3 | DataType::FloatMatrix4 => None,
    }
}

/// Flips a top-left rectangle into GL's bottom-left window coordinates.
pub fn flip_rect(rect: Rect, target_height: u32) -> (i32, i32, i32, i32) {
    let y = target_height as i32 - rect.y - rect.height as i32;
    (rect.x, y, rect.width as i32, rect.height as i32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filters_without_mips_never_sample_levels() {
        for filter in [
            SamplerFilter::Point,
            SamplerFilter::Linear,
            SamplerFilter::Bilinear,
            SamplerFilter::Trilinear,
        ] {
            let (min, _) = filters(filter, false);
            assert!(min == glow::NEAREST as i32 || min == glow::LINEAR as i32);
        }
    }

    #[test]
    fn test_trilinear_with_mips() {
        assert_eq!(
            filters(SamplerFilter::Trilinear, true),
            (glow::LINEAR_MIPMAP_LINEAR as i32, glow::LINEAR as i32)
        );
        assert_eq!(
            filters(SamplerFilter::Point, true),
            (glow::NEAREST_MIPMAP_NEAREST as i32, glow::NEAREST as i32)
        );
    }

    #[test]
    fn test_matrix_attributes_rejected() {
        assert_eq!(vertex_format(DataType::FloatMatrix4), None);
        assert_eq!(
            vertex_format(DataType::UnsignedByteVector4Norm),
            Some((4, glow::UNSIGNED_BYTE, true))
        );
    }

    #[test]
    fn test_flip_rect() {
        // 10px tall rect 5px from the top of a 100px target
        assert_eq!(flip_rect(Rect::new(2, 5, 20, 10), 100), (2, 85, 20, 10));
        assert_eq!(flip_rect(Rect::new(0, 0, 64, 100), 100), (0, 0, 64, 100));
    }

    #[test]
    fn test_index_type() {
        assert_eq!(index_type(2), glow::UNSIGNED_SHORT);
        assert_eq!(index_type(4), glow::UNSIGNED_INT);
    }
}
