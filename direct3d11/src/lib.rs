//! Vesper Direct3D 11 backend
//!
//! Implements [`RenderBackend`](vesper_core::RenderBackend) with a D3D11
//! device, immediate context and DXGI swap chain bound to the window's
//! `HWND`. Shaders are compiled DXBC; constants are packed into one constant
//! buffer per stage following HLSL register packing.
//!
//! The backend only exists on Windows. Elsewhere [`register`] leaves the
//! registry untouched, so automatic driver selection never sees it.

mod constants;
mod growth;

#[cfg(windows)]
mod backend;
#[cfg(windows)]
mod convert;

pub use constants::ConstantLayout;
pub use growth::buffer_capacity;

#[cfg(windows)]
pub use backend::D3d11Backend;

use vesper_core::graphics::BackendRegistry;

/// Creates a Direct3D 11 render device for `window`.
#[cfg(windows)]
pub fn create_device(
    window: &std::sync::Arc<dyn vesper_core::graphics::NativeWindow>,
    options: vesper_core::graphics::DeviceOptions,
) -> vesper_core::Result<vesper_core::graphics::RenderDevice> {
    use vesper_core::graphics::{GraphicsDriver, RenderDevice};

    let hwnd = backend::window_hwnd(window.as_ref())?;
    let mut device = RenderDevice::new(GraphicsDriver::Direct3D11);
    device.init(options, move |options| D3d11Backend::new(hwnd, options))?;
    Ok(device)
}

/// Registers the Direct3D 11 driver on Windows.
pub fn register(registry: &mut BackendRegistry) {
    #[cfg(windows)]
    registry.register(vesper_core::graphics::GraphicsDriver::Direct3D11, create_device);

    #[cfg(not(windows))]
    {
        let _ = registry;
        tracing::debug!("Direct3D 11 is only available on Windows");
    }
}

#[cfg(test)]
mod tests {
    use vesper_core::graphics::GraphicsDriver;

    use super::*;

    #[test]
    fn test_register_matches_platform() {
        let mut registry = BackendRegistry::new();
        register(&mut registry);
        assert_eq!(registry.is_available(GraphicsDriver::Direct3D11), cfg!(windows));
        if cfg!(windows) {
            assert_eq!(registry.available_drivers()[0], GraphicsDriver::Direct3D11);
        }
    }
}
