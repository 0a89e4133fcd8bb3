//! Vesper Core - engine runtime
//!
//! Command-driven rendering and pull-based audio mixing for a small game
//! engine, with pluggable graphics backends.
//!
//! # Architecture
//!
//! - [`graphics`] - resource handles, the command queue, the render device
//!   and the [`RenderBackend`](graphics::RenderBackend) trait backends implement
//! - [`audio`] - the stream graph, the mixer and output drivers
//! - [`Engine`] - the explicit context owning settings, renderer, audio and
//!   the resource [`Cache`]
//! - [`Settings`] - TOML configuration

pub mod audio;
pub mod cache;
pub mod config;
pub mod engine;
pub mod error;
pub mod graphics;
#[cfg(test)]
mod integration;
#[cfg(test)]
pub mod test_utils;
pub mod types;

pub use audio::{Audio, AudioDriver, Sound, SoundData, SoundState, Stream};
pub use cache::Cache;
pub use config::{AudioSettings, GraphicsSettings, Settings};
pub use engine::Engine;
pub use error::{EngineError, Result};
pub use graphics::{
    BackendRegistry, CommandQueue, GraphicsDriver, NativeWindow, RenderBackend, RenderDevice,
    Renderer, ResourceId,
};
pub use types::{Color, Image, PixelFormat, Rect, Size2};
