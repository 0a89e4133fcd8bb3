//! Named resource cache
//!
//! Scene and asset code look resources up by name instead of threading
//! handles around. Entries are shared with `Arc`; a resource is deleted on
//! the render context once its cache entry is released and every other
//! holder has dropped it.

use std::sync::Arc;

use hashbrown::HashMap;
use tracing::debug;

use crate::audio::SoundData;
use crate::graphics::{BlendState, Shader, Texture};

/// Textures, shaders, blend states and sound data keyed by name.
#[derive(Default)]
pub struct Cache {
    textures: HashMap<String, Arc<Texture>>,
    shaders: HashMap<String, Arc<Shader>>,
    blend_states: HashMap<String, Arc<BlendState>>,
    sound_data: HashMap<String, Arc<dyn SoundData>>,
}

impl Cache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `texture` under `name`, replacing any previous entry.
    pub fn set_texture(&mut self, name: impl Into<String>, texture: Texture) -> Arc<Texture> {
        let texture = Arc::new(texture);
        self.textures.insert(name.into(), Arc::clone(&texture));
        texture
    }

    pub fn texture(&self, name: &str) -> Option<Arc<Texture>> {
        self.textures.get(name).cloned()
    }

    pub fn release_texture(&mut self, name: &str) -> bool {
        self.textures.remove(name).is_some()
    }

    pub fn set_shader(&mut self, name: impl Into<String>, shader: Shader) -> Arc<Shader> {
        let shader = Arc::new(shader);
        self.shaders.insert(name.into(), Arc::clone(&shader));
        shader
    }

    pub fn shader(&self, name: &str) -> Option<Arc<Shader>> {
        self.shaders.get(name).cloned()
    }

    pub fn release_shader(&mut self, name: &str) -> bool {
        self.shaders.remove(name).is_some()
    }

    pub fn set_blend_state(&mut self, name: impl Into<String>, blend_state: BlendState) -> Arc<BlendState> {
        let blend_state = Arc::new(blend_state);
        self.blend_states.insert(name.into(), Arc::clone(&blend_state));
        blend_state
    }

    pub fn blend_state(&self, name: &str) -> Option<Arc<BlendState>> {
        self.blend_states.get(name).cloned()
    }

    pub fn release_blend_state(&mut self, name: &str) -> bool {
        self.blend_states.remove(name).is_some()
    }

    pub fn set_sound_data(&mut self, name: impl Into<String>, data: Arc<dyn SoundData>) {
        self.sound_data.insert(name.into(), data);
    }

    pub fn sound_data(&self, name: &str) -> Option<Arc<dyn SoundData>> {
        self.sound_data.get(name).cloned()
    }

    pub fn release_sound_data(&mut self, name: &str) -> bool {
        self.sound_data.remove(name).is_some()
    }

    pub fn release_textures(&mut self) {
        self.textures.clear();
    }

    pub fn release_shaders(&mut self) {
        self.shaders.clear();
    }

    pub fn release_blend_states(&mut self) {
        self.blend_states.clear();
    }

    pub fn release_sound_data_all(&mut self) {
        self.sound_data.clear();
    }

    /// Drops every entry.
    pub fn release_all(&mut self) {
        debug!(
            "Releasing cache ({} textures, {} shaders, {} blend states, {} sounds)",
            self.textures.len(),
            self.shaders.len(),
            self.blend_states.len(),
            self.sound_data.len()
        );
        self.release_textures();
        self.release_shaders();
        self.release_blend_states();
        self.release_sound_data_all();
    }

    pub fn len(&self) -> usize {
        self.textures.len() + self.shaders.len() + self.blend_states.len() + self.sound_data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::{OscillatorData, Waveform};
    use crate::graphics::{
        BlendStateDesc, DeviceOptions, ExecutionMode, GraphicsDriver, RenderDevice, Renderer,
        ShaderDesc,
    };
    use crate::test_utils::{Event, Recorder, RecordingBackend};

    fn renderer(recorder: &Recorder) -> Renderer {
        let mut device = RenderDevice::new(GraphicsDriver::Empty);
        let recorder = recorder.clone();
        let options = DeviceOptions {
            execution_mode: ExecutionMode::External,
            ..Default::default()
        };
        device
            .init(options, move |_| Ok(RecordingBackend::new(recorder)))
            .unwrap();
        Renderer::new(device)
    }

    #[test]
    fn test_lookup_and_release() {
        let recorder = Recorder::default();
        let renderer = renderer(&recorder);
        let mut cache = Cache::new();

        let shader = cache.set_shader("sprite", renderer.create_shader(ShaderDesc::default()));
        cache.set_blend_state("alpha", renderer.create_blend_state(BlendStateDesc::alpha()));
        cache.set_sound_data("beep", Arc::new(OscillatorData::new(Waveform::Square, 880.0)));

        assert_eq!(cache.len(), 3);
        assert_eq!(cache.shader("sprite").map(|s| s.id()), Some(shader.id()));
        assert!(cache.texture("sprite").is_none());
        assert!(cache.sound_data("beep").is_some());

        assert!(cache.release_sound_data("beep"));
        assert!(!cache.release_sound_data("beep"));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_release_deletes_once_unreferenced() {
        let recorder = Recorder::default();
        let renderer = renderer(&recorder);
        let mut cache = Cache::new();

        let held = cache.set_shader("lit", renderer.create_shader(ShaderDesc::default()));
        cache.release_all();
        renderer.device().process_frame();
        assert_eq!(recorder.count(|e| *e == Event::DestroyShader), 0);

        drop(held);
        renderer.device().process_frame();
        assert_eq!(recorder.count(|e| *e == Event::DestroyShader), 1);
        assert!(cache.is_empty());
    }
}
