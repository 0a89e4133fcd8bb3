//! Window without a native surface, for headless devices.

use raw_window_handle::{
    DisplayHandle, HandleError, HasDisplayHandle, HasWindowHandle, WindowHandle,
};

use super::backend::NativeWindow;
use crate::types::Size2;

/// A window that exists only as a size and a title.
///
/// Native handles are unavailable, so only the `Empty` driver can render
/// into it.
#[derive(Debug, Clone)]
pub struct HeadlessWindow {
    size: Size2,
    title: String,
}

impl HeadlessWindow {
    pub fn new(size: Size2, title: impl Into<String>) -> Self {
        Self {
            size,
            title: title.into(),
        }
    }
}

impl HasWindowHandle for HeadlessWindow {
    fn window_handle(&self) -> Result<WindowHandle<'_>, HandleError> {
        Err(HandleError::Unavailable)
    }
}

impl HasDisplayHandle for HeadlessWindow {
    fn display_handle(&self) -> Result<DisplayHandle<'_>, HandleError> {
        Err(HandleError::Unavailable)
    }
}

impl NativeWindow for HeadlessWindow {
    fn size(&self) -> Size2 {
        self.size
    }

    fn title(&self) -> String {
        self.title.clone()
    }
}
