//! Graphics driver selection
//!
//! Backend crates register a factory per [`GraphicsDriver`] in a
//! [`BackendRegistry`] owned by the application. The engine asks the
//! registry for a device exactly once at startup; the chosen backend is
//! fixed for the lifetime of that device.
//!
//! [`GraphicsDriver::Default`] walks [`GraphicsDriver::preference_order`]
//! and takes the first registered driver that initializes.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::backend::NativeWindow;
use super::device::{DeviceOptions, RenderDevice};
use super::empty::EmptyBackend;
use crate::error::{EngineError, Result};

/// Graphics API preference.
///
/// Serialized as its lowercase name; parsing accepts any case and aliases.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum GraphicsDriver {
    /// Pick the best available driver for the platform
    #[default]
    Default,
    /// Headless, no GPU
    Empty,
    /// OpenGL 3.2 core, falling back to 2.x
    OpenGL,
    Direct3D11,
}

impl GraphicsDriver {
    pub fn as_str(&self) -> &'static str {
        match self {
            GraphicsDriver::Default => "default",
            GraphicsDriver::Empty => "empty",
            GraphicsDriver::OpenGL => "opengl",
            GraphicsDriver::Direct3D11 => "direct3d11",
        }
    }

    /// Concrete drivers in the order automatic selection tries them.
    pub fn preference_order() -> &'static [GraphicsDriver] {
        if cfg!(windows) {
            &[GraphicsDriver::Direct3D11, GraphicsDriver::OpenGL, GraphicsDriver::Empty]
        } else {
            &[GraphicsDriver::OpenGL, GraphicsDriver::Empty]
        }
    }

    pub fn all() -> &'static [GraphicsDriver] {
        &[
            GraphicsDriver::Default,
            GraphicsDriver::Empty,
            GraphicsDriver::OpenGL,
            GraphicsDriver::Direct3D11,
        ]
    }
}

impl fmt::Display for GraphicsDriver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GraphicsDriver {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "default" | "auto" | "automatic" => Ok(GraphicsDriver::Default),
            "empty" | "null" => Ok(GraphicsDriver::Empty),
            "opengl" | "gl" => Ok(GraphicsDriver::OpenGL),
            "direct3d11" | "d3d11" => Ok(GraphicsDriver::Direct3D11),
            other => Err(EngineError::config(format!("unknown graphics driver '{}'", other))),
        }
    }
}

impl TryFrom<String> for GraphicsDriver {
    type Error = EngineError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<GraphicsDriver> for String {
    fn from(driver: GraphicsDriver) -> Self {
        driver.as_str().to_owned()
    }
}

/// Creates and initializes a device for one driver.
pub type DeviceFactory = fn(&Arc<dyn NativeWindow>, DeviceOptions) -> Result<RenderDevice>;

fn create_empty_device(_window: &Arc<dyn NativeWindow>, options: DeviceOptions) -> Result<RenderDevice> {
    let mut device = RenderDevice::new(GraphicsDriver::Empty);
    device.init(options, |options| Ok(EmptyBackend::new(options)))?;
    Ok(device)
}

/// Drivers available to this process.
pub struct BackendRegistry {
    factories: Vec<(GraphicsDriver, DeviceFactory)>,
}

impl BackendRegistry {
    /// Registry with only the headless driver.
    pub fn new() -> Self {
        Self {
            factories: vec![(GraphicsDriver::Empty, create_empty_device as DeviceFactory)],
        }
    }

    /// Registers (or replaces) the factory for `driver`.
    pub fn register(&mut self, driver: GraphicsDriver, factory: DeviceFactory) {
        if driver == GraphicsDriver::Default {
            warn!("Ignoring factory registered for the default driver");
            return;
        }
        match self.factories.iter_mut().find(|(d, _)| *d == driver) {
            Some(entry) => entry.1 = factory,
            None => self.factories.push((driver, factory)),
        }
    }

    pub fn is_available(&self, driver: GraphicsDriver) -> bool {
        self.factories.iter().any(|(d, _)| *d == driver)
    }

    /// Registered drivers in preference order.
    pub fn available_drivers(&self) -> Vec<GraphicsDriver> {
        GraphicsDriver::preference_order()
            .iter()
            .copied()
            .filter(|d| self.is_available(*d))
            .collect()
    }

    fn factory(&self, driver: GraphicsDriver) -> Option<DeviceFactory> {
        self.factories
            .iter()
            .find(|(d, _)| *d == driver)
            .map(|(_, factory)| *factory)
    }

    /// Creates the device for `preference`.
    ///
    /// An explicit driver that isn't registered or fails to initialize is a
    /// [`EngineError::System`]. The default driver falls through the
    /// preference order and only fails if every candidate does.
    pub fn create_device(
        &self,
        preference: GraphicsDriver,
        window: &Arc<dyn NativeWindow>,
        options: DeviceOptions,
    ) -> Result<RenderDevice> {
        if preference != GraphicsDriver::Default {
            let factory = self.factory(preference).ok_or_else(|| {
                EngineError::system(format!("graphics driver {} is not supported", preference))
            })?;
            let device = factory(window, options)?;
            info!("Using {} graphics driver", preference);
            return Ok(device);
        }

        let mut attempted = Vec::new();
        for driver in self.available_drivers() {
            let Some(factory) = self.factory(driver) else { continue };
            match factory(window, options) {
                Ok(device) => {
                    info!("Using {} graphics driver (automatic)", driver);
                    return Ok(device);
                }
                Err(e) => {
                    warn!("Graphics driver {} unavailable: {}", driver, e);
                    attempted.push(driver.as_str());
                }
            }
        }
        Err(EngineError::system(format!(
            "no graphics driver could be initialized (tried: {})",
            attempted.join(", ")
        )))
    }
}

impl Default for BackendRegistry {
    fn default() -> Self {
        Self::new()
    }
}
