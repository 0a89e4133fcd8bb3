//! Plain value types shared by the render and audio sides
//!
//! These are the structures asset collaborators hand to the engine once they
//! have parsed a file: sizes, rectangles, colors and pixel buffers.

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};

/// Width and height in pixels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Size2 {
    pub width: u32,
    pub height: u32,
}

impl Size2 {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn area(&self) -> usize {
        self.width as usize * self.height as usize
    }
}

/// Axis-aligned rectangle in pixels, origin at the top left.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub const fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Rectangle covering a whole surface.
    pub const fn from_size(size: Size2) -> Self {
        Self::new(0, 0, size.width, size.height)
    }
}

/// 8-bit RGBA color.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const BLACK: Color = Color::rgba(0, 0, 0, 255);
    pub const WHITE: Color = Color::rgba(255, 255, 255, 255);
    pub const TRANSPARENT: Color = Color::rgba(0, 0, 0, 0);

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Unpack from 0xRRGGBBAA.
    pub const fn from_u32(value: u32) -> Self {
        Self::rgba(
            (value >> 24) as u8,
            (value >> 16) as u8,
            (value >> 8) as u8,
            value as u8,
        )
    }

    /// Components normalized to `[0, 1]`.
    pub fn normalized(&self) -> [f32; 4] {
        [
            self.r as f32 / 255.0,
            self.g as f32 / 255.0,
            self.b as f32 / 255.0,
            self.a as f32 / 255.0,
        ]
    }
}

/// Texel layout of image and texture data.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PixelFormat {
    R8UnsignedNorm,
    Rg8UnsignedNorm,
    #[default]
    Rgba8UnsignedNorm,
    Rgba8Srgb,
    Rgba16Float,
    Rgba32Float,
    /// 32-bit depth, only valid for render target depth attachments
    Depth,
}

impl PixelFormat {
    pub const fn bytes_per_pixel(self) -> usize {
        match self {
            PixelFormat::R8UnsignedNorm => 1,
            PixelFormat::Rg8UnsignedNorm => 2,
            PixelFormat::Rgba8UnsignedNorm | PixelFormat::Rgba8Srgb | PixelFormat::Depth => 4,
            PixelFormat::Rgba16Float => 8,
            PixelFormat::Rgba32Float => 16,
        }
    }
}

/// Decoded pixel buffer handed over by an image loader.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Image {
    pixel_format: PixelFormat,
    size: Size2,
    data: Vec<u8>,
}

impl Image {
    /// Wraps decoded pixels, rejecting buffers whose length doesn't match
    /// `width * height * bytes_per_pixel`.
    pub fn new(pixel_format: PixelFormat, size: Size2, data: Vec<u8>) -> Result<Self> {
        let expected = size.area() * pixel_format.bytes_per_pixel();
        if data.len() != expected {
            return Err(EngineError::data(format!(
                "image data is {} bytes, {}x{} {:?} needs {}",
                data.len(),
                size.width,
                size.height,
                pixel_format,
                expected
            )));
        }
        Ok(Self {
            pixel_format,
            size,
            data,
        })
    }

    pub fn pixel_format(&self) -> PixelFormat {
        self.pixel_format
    }

    pub fn size(&self) -> Size2 {
        self.size
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn into_data(self) -> Vec<u8> {
        self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_rejects_mismatched_length() {
        let err = Image::new(PixelFormat::Rgba8UnsignedNorm, Size2::new(2, 2), vec![0; 15])
            .unwrap_err();
        assert!(matches!(err, EngineError::Data(_)));
    }

    #[test]
    fn test_image_accepts_exact_length() {
        let image = Image::new(PixelFormat::Rg8UnsignedNorm, Size2::new(3, 2), vec![7; 12]).unwrap();
        assert_eq!(image.size(), Size2::new(3, 2));
        assert_eq!(image.data().len(), 12);
    }

    #[test]
    fn test_default_pixel_format_is_rgba8() {
        assert_eq!(PixelFormat::default(), PixelFormat::Rgba8UnsignedNorm);
        assert_eq!(Image::default().pixel_format(), PixelFormat::Rgba8UnsignedNorm);
    }

    #[test]
    fn test_color_from_u32() {
        let color = Color::from_u32(0xFF80_0040);
        assert_eq!(color, Color::rgba(255, 128, 0, 64));
        let n = color.normalized();
        assert!((n[0] - 1.0).abs() < f32::EPSILON);
        assert!(n[2].abs() < f32::EPSILON);
    }
}
