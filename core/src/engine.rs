//! Engine context
//!
//! [`Engine`] owns everything a running application needs: settings, the
//! renderer front end, audio and the resource cache. It is created once and
//! passed by reference to whatever needs it.

use std::sync::Arc;

use tracing::{debug, info};

use crate::audio::Audio;
use crate::cache::Cache;
use crate::config::Settings;
use crate::error::Result;
use crate::graphics::{BackendRegistry, NativeWindow, Renderer};
use crate::types::Size2;

pub struct Engine {
    settings: Settings,
    window: Arc<dyn NativeWindow>,
    renderer: Renderer,
    audio: Audio,
    cache: Cache,
    frame: u64,
}

impl Engine {
    /// Validates `settings`, then opens the render device through `registry`
    /// and the audio output.
    pub fn new(settings: Settings, registry: &BackendRegistry, window: Arc<dyn NativeWindow>) -> Result<Self> {
        settings.validate()?;

        let device = registry.create_device(settings.graphics.driver, &window, settings.graphics.device_options())?;
        let renderer = Renderer::new(device);
        let audio = Audio::new(&settings.audio)?;

        info!(
            "Engine started: {} graphics, {} audio, window '{}'",
            renderer.driver(),
            audio.driver(),
            window.title()
        );

        Ok(Self {
            settings,
            window,
            renderer,
            audio,
            cache: Cache::new(),
            frame: 0,
        })
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn window(&self) -> &Arc<dyn NativeWindow> {
        &self.window
    }

    pub fn renderer(&self) -> &Renderer {
        &self.renderer
    }

    pub fn renderer_mut(&mut self) -> &mut Renderer {
        &mut self.renderer
    }

    pub fn audio(&self) -> &Audio {
        &self.audio
    }

    pub fn audio_mut(&mut self) -> &mut Audio {
        &mut self.audio
    }

    pub fn cache(&self) -> &Cache {
        &self.cache
    }

    pub fn cache_mut(&mut self) -> &mut Cache {
        &mut self.cache
    }

    /// Frames ended so far.
    pub fn frame(&self) -> u64 {
        self.frame
    }

    /// Presents the frame and runs per-frame housekeeping.
    pub fn end_frame(&mut self) {
        self.renderer.present();
        self.audio.update();
        self.frame += 1;
    }

    /// Resizes the back buffer; returns once the render context has applied it.
    pub fn resize(&mut self, size: Size2) {
        self.settings.graphics.width = size.width;
        self.settings.graphics.height = size.height;
        self.renderer.resize(size);
    }

    /// Releases cached resources and stops the render device.
    pub fn shutdown(&mut self) {
        debug!("Engine shutting down after {} frames", self.frame);
        self.cache.release_all();
        self.audio.update();
        self.renderer.shutdown();
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        self.shutdown();
    }
}
