//! Vesper OpenGL backend
//!
//! Implements [`RenderBackend`](vesper_core::RenderBackend) on top of `glow`.
//! The window collaborator provides the context; a 3.2 core profile is
//! preferred and a 2.x context is accepted when the core profile is not
//! available.
//!
//! Shaders are GLSL source. Vertex attributes are bound by name, in layout
//! order, using [`attribute_name`]: `position0`, `texcoord0`, `color0` and so
//! on. Sampler uniforms named `texture0`..`texture3` are bound to the
//! matching texture units.

mod backend;
mod context;
mod convert;
mod program;

pub use backend::GlBackend;
pub use context::create_context;
pub use program::attribute_name;

use std::sync::Arc;

use vesper_core::graphics::{BackendRegistry, DeviceOptions, GraphicsDriver, NativeWindow, RenderDevice};
use vesper_core::Result;

/// Creates an OpenGL render device for `window`.
///
/// The context is created here, on the caller's thread, and handed to the
/// render context which makes it current before loading any GL function.
pub fn create_device(window: &Arc<dyn NativeWindow>, options: DeviceOptions) -> Result<RenderDevice> {
    let context = create_context(window.as_ref())?;
    let mut device = RenderDevice::new(GraphicsDriver::OpenGL);
    device.init(options, move |options| GlBackend::new(context, options))?;
    Ok(device)
}

/// Registers the OpenGL driver.
pub fn register(registry: &mut BackendRegistry) {
    registry.register(GraphicsDriver::OpenGL, create_device);
}
