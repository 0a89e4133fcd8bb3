//! Fixed-function state enumerations
//!
//! Small value enums carried inside commands. Backends translate them to
//! their native constants.

use serde::{Deserialize, Serialize};

/// Primitive topology of a draw.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum DrawMode {
    PointList,
    LineList,
    LineStrip,
    #[default]
    TriangleList,
    TriangleStrip,
}

/// Which faces are culled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum CullMode {
    #[default]
    None,
    Front,
    Back,
}

/// Polygon rasterization.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum FillMode {
    #[default]
    Solid,
    Wireframe,
}

/// Winding order of front faces.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum FrontFace {
    Clockwise,
    #[default]
    CounterClockwise,
}

/// Texture sampling filter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SamplerFilter {
    #[default]
    Point,
    Linear,
    Bilinear,
    Trilinear,
}

/// Texture coordinate addressing outside `[0, 1]`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum SamplerAddressMode {
    #[default]
    Clamp,
    Repeat,
    MirrorRepeat,
}

/// Usage of a GPU buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferKind {
    Index,
    Vertex,
}

/// Source/destination blend factor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlendFactor {
    Zero,
    One,
    SrcColor,
    InvSrcColor,
    SrcAlpha,
    InvSrcAlpha,
    DestAlpha,
    InvDestAlpha,
    DestColor,
    InvDestColor,
    SrcAlphaSat,
    BlendFactor,
    InvBlendFactor,
}

/// Blend equation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum BlendOperation {
    #[default]
    Add,
    Subtract,
    RevSubtract,
    Min,
    Max,
}

/// Channels written by the blend stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ColorMask {
    pub red: bool,
    pub green: bool,
    pub blue: bool,
    pub alpha: bool,
}

impl ColorMask {
    pub const ALL: ColorMask = ColorMask {
        red: true,
        green: true,
        blue: true,
        alpha: true,
    };
}

impl Default for ColorMask {
    fn default() -> Self {
        Self::ALL
    }
}

/// Scalar/vector/matrix type of a vertex attribute or shader constant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    Float,
    FloatVector2,
    FloatVector3,
    FloatVector4,
    FloatMatrix3,
    FloatMatrix4,
    UnsignedByteVector4Norm,
    Integer,
    IntegerVector4,
}

impl DataType {
    /// Number of 32-bit (or 8-bit for normalized bytes) components.
    pub const fn components(self) -> u32 {
        match self {
            DataType::Float | DataType::Integer => 1,
            DataType::FloatVector2 => 2,
            DataType::FloatVector3 => 3,
            DataType::FloatVector4
            | DataType::UnsignedByteVector4Norm
            | DataType::IntegerVector4 => 4,
            DataType::FloatMatrix3 => 9,
            DataType::FloatMatrix4 => 16,
        }
    }

    pub const fn size(self) -> u32 {
        match self {
            DataType::UnsignedByteVector4Norm => 4,
            other => other.components() * 4,
        }
    }
}
