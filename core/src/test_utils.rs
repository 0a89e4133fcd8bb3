//! Shared test utilities for integration and unit tests

use std::sync::{Arc, Mutex};

use crate::error::{EngineError, Result};
use crate::graphics::{
    BlendStateDesc, BufferDesc, ClearDesc, DrawCall, GraphicsDriver, RenderBackend, ResourceId,
    SamplerDesc, ShaderDesc, TextureDesc, TextureLevel,
};
use crate::types::Size2;

// ============================================================================
// Recording Backend
// ============================================================================

/// Backend call observed by [`RecordingBackend`].
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    CreateBuffer(Vec<u8>),
    UpdateBuffer(Vec<u8>),
    DestroyBuffer(Vec<u8>),
    CreateTexture(Size2),
    UpdateTexture(usize),
    SetSampler,
    DestroyTexture(Size2),
    CreateShader,
    DestroyShader,
    CreateBlendState,
    DestroyBlendState,
    CreateRenderTarget,
    AddColorTexture(ResourceId),
    RemoveColorTexture(ResourceId),
    SetDepthTexture(Option<ResourceId>),
    DestroyRenderTarget(Vec<ResourceId>),
    SetRenderTarget(bool),
    Clear,
    Draw(u32),
    Present,
    Resize(Size2),
}

/// Shared event log, cloneable into the render thread.
#[derive(Debug, Clone, Default)]
pub struct Recorder {
    events: Arc<Mutex<Vec<Event>>>,
}

impl Recorder {
    pub fn record(&self, event: Event) {
        self.events.lock().unwrap().push(event);
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }

    pub fn count(&self, pred: impl Fn(&Event) -> bool) -> usize {
        self.events.lock().unwrap().iter().filter(|e| pred(e)).count()
    }
}

/// Backend that records every call and can be told to fail draws.
pub struct RecordingBackend {
    pub recorder: Recorder,
    pub fail_draws: bool,
}

impl RecordingBackend {
    pub fn new(recorder: Recorder) -> Self {
        Self {
            recorder,
            fail_draws: false,
        }
    }

    pub fn failing_draws(recorder: Recorder) -> Self {
        Self {
            recorder,
            fail_draws: true,
        }
    }
}

impl RenderBackend for RecordingBackend {
    type Buffer = Vec<u8>;
    type Texture = Size2;
    type Shader = ();
    type BlendState = ();
    type RenderTarget = Vec<ResourceId>;

    fn driver(&self) -> GraphicsDriver {
        GraphicsDriver::Empty
    }

    fn create_buffer(&mut self, desc: &BufferDesc) -> Result<Self::Buffer> {
        self.recorder.record(Event::CreateBuffer(desc.data.clone()));
        Ok(desc.data.clone())
    }

    fn update_buffer(&mut self, buffer: &mut Self::Buffer, data: &[u8]) -> Result<()> {
        self.recorder.record(Event::UpdateBuffer(data.to_vec()));
        *buffer = data.to_vec();
        Ok(())
    }

    fn destroy_buffer(&mut self, buffer: Self::Buffer) {
        self.recorder.record(Event::DestroyBuffer(buffer));
    }

    fn create_texture(&mut self, desc: &TextureDesc) -> Result<Self::Texture> {
        self.recorder.record(Event::CreateTexture(desc.size));
        Ok(desc.size)
    }

    fn update_texture(&mut self, _texture: &mut Self::Texture, levels: &[TextureLevel]) -> Result<()> {
        self.recorder.record(Event::UpdateTexture(levels.len()));
        Ok(())
    }

    fn set_texture_sampler(&mut self, _texture: &mut Self::Texture, _sampler: &SamplerDesc) -> Result<()> {
        self.recorder.record(Event::SetSampler);
        Ok(())
    }

    fn destroy_texture(&mut self, texture: Self::Texture) {
        self.recorder.record(Event::DestroyTexture(texture));
    }

    fn create_shader(&mut self, _desc: &ShaderDesc) -> Result<Self::Shader> {
        self.recorder.record(Event::CreateShader);
        Ok(())
    }

    fn destroy_shader(&mut self, _shader: Self::Shader) {
        self.recorder.record(Event::DestroyShader);
    }

    fn create_blend_state(&mut self, _desc: &BlendStateDesc) -> Result<Self::BlendState> {
        self.recorder.record(Event::CreateBlendState);
        Ok(())
    }

    fn destroy_blend_state(&mut self, _blend_state: Self::BlendState) {
        self.recorder.record(Event::DestroyBlendState);
    }

    fn create_render_target(&mut self) -> Result<Self::RenderTarget> {
        self.recorder.record(Event::CreateRenderTarget);
        Ok(Vec::new())
    }

    fn add_color_texture(
        &mut self,
        target: &mut Self::RenderTarget,
        id: ResourceId,
        _texture: &Self::Texture,
    ) -> Result<()> {
        self.recorder.record(Event::AddColorTexture(id));
        target.push(id);
        Ok(())
    }

    fn remove_color_texture(&mut self, target: &mut Self::RenderTarget, id: ResourceId) -> Result<()> {
        self.recorder.record(Event::RemoveColorTexture(id));
        target.retain(|&t| t != id);
        Ok(())
    }

    fn set_depth_texture(
        &mut self,
        _target: &mut Self::RenderTarget,
        texture: Option<(ResourceId, &Self::Texture)>,
    ) -> Result<()> {
        self.recorder.record(Event::SetDepthTexture(texture.map(|(id, _)| id)));
        Ok(())
    }

    fn destroy_render_target(&mut self, target: Self::RenderTarget) {
        self.recorder.record(Event::DestroyRenderTarget(target));
    }

    fn set_render_target(&mut self, target: Option<&Self::RenderTarget>) -> Result<()> {
        self.recorder.record(Event::SetRenderTarget(target.is_some()));
        Ok(())
    }

    fn clear(&mut self, _desc: &ClearDesc) -> Result<()> {
        self.recorder.record(Event::Clear);
        Ok(())
    }

    fn draw(&mut self, call: &DrawCall<'_, Self>) -> Result<()> {
        if self.fail_draws {
            return Err(EngineError::system("injected draw failure"));
        }
        self.recorder.record(Event::Draw(call.desc.index_count));
        Ok(())
    }

    fn present(&mut self) -> Result<()> {
        self.recorder.record(Event::Present);
        Ok(())
    }

    fn resize(&mut self, size: Size2) -> Result<()> {
        self.recorder.record(Event::Resize(size));
        Ok(())
    }
}

/// Shorthand for a handle in tests.
pub fn rid(raw: u64) -> ResourceId {
    ResourceId::from_raw(raw).unwrap()
}
