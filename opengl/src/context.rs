//! Context selection: 3.2 core first, 2.x as fallback.

use tracing::{debug, warn};
use vesper_core::graphics::{GlContext, GlVersion, NativeWindow};
use vesper_core::{EngineError, Result};

/// Asks the window for a 3.2 core context, then for a 2.x one.
pub fn create_context(window: &dyn NativeWindow) -> Result<Box<dyn GlContext>> {
    let core_err = match window.create_gl_context(GlVersion::Core3_2) {
        Ok(context) => {
            debug!("Created OpenGL 3.2 core context");
            return Ok(context);
        }
        Err(e) => e,
    };
    warn!("OpenGL 3.2 core context unavailable ({}), trying 2.x", core_err);

    match window.create_gl_context(GlVersion::Legacy2_0) {
        Ok(context) => {
            debug!("Created OpenGL 2.x context");
            Ok(context)
        }
        Err(legacy_err) => Err(EngineError::system(format!(
            "no OpenGL context available (3.2 core: {}; 2.x: {})",
            core_err, legacy_err
        ))),
    }
}

#[cfg(test)]
mod tests {
    use std::ffi::c_void;
    use std::sync::Mutex;

    use raw_window_handle::{
        DisplayHandle, HandleError, HasDisplayHandle, HasWindowHandle, WindowHandle,
    };
    use vesper_core::types::Size2;

    use super::*;

    struct FakeContext(GlVersion);

    impl GlContext for FakeContext {
        fn version(&self) -> GlVersion {
            self.0
        }
        fn get_proc_address(&self, _name: &str) -> *const c_void {
            std::ptr::null()
        }
        fn make_current(&self) -> Result<()> {
            Ok(())
        }
        fn swap_buffers(&self) -> Result<()> {
            Ok(())
        }
        fn set_swap_interval(&self, _interval: u32) -> Result<()> {
            Ok(())
        }
    }

    /// Window that supports a fixed set of context versions.
    struct FakeWindow {
        supported: Vec<GlVersion>,
        requested: Mutex<Vec<GlVersion>>,
    }

    impl FakeWindow {
        fn new(supported: Vec<GlVersion>) -> Self {
            Self {
                supported,
                requested: Mutex::new(Vec::new()),
            }
        }
    }

    impl HasWindowHandle for FakeWindow {
        fn window_handle(&self) -> std::result::Result<WindowHandle<'_>, HandleError> {
            Err(HandleError::Unavailable)
        }
    }

    impl HasDisplayHandle for FakeWindow {
        fn display_handle(&self) -> std::result::Result<DisplayHandle<'_>, HandleError> {
            Err(HandleError::Unavailable)
        }
    }

    impl NativeWindow for FakeWindow {
        fn size(&self) -> Size2 {
            Size2::new(64, 64)
        }

        fn create_gl_context(&self, version: GlVersion) -> Result<Box<dyn GlContext>> {
            self.requested.lock().unwrap().push(version);
            if self.supported.contains(&version) {
                Ok(Box::new(FakeContext(version)))
            } else {
                Err(EngineError::system(format!("{:?} not supported", version)))
            }
        }
    }

    #[test]
    fn test_prefers_core_profile() {
        let window = FakeWindow::new(vec![GlVersion::Core3_2, GlVersion::Legacy2_0]);
        let context = create_context(&window).unwrap();
        assert_eq!(context.version(), GlVersion::Core3_2);
        assert_eq!(*window.requested.lock().unwrap(), vec![GlVersion::Core3_2]);
    }

    #[test]
    fn test_falls_back_to_legacy() {
        let window = FakeWindow::new(vec![GlVersion::Legacy2_0]);
        let context = create_context(&window).unwrap();
        assert_eq!(context.version(), GlVersion::Legacy2_0);
        assert_eq!(
            *window.requested.lock().unwrap(),
            vec![GlVersion::Core3_2, GlVersion::Legacy2_0]
        );
    }

    #[test]
    fn test_no_context_reports_both_attempts() {
        let window = FakeWindow::new(Vec::new());
        let err = create_context(&window).err().unwrap();
        let msg = err.to_string();
        assert!(matches!(err, EngineError::System(_)));
        assert!(msg.contains("3.2 core") && msg.contains("2.x"), "{msg}");
    }
}
