//! Handle table: ResourceId -> native backend object
//!
//! Lives on the render context only. Entries own their native objects;
//! removing an entry hands the object back to the backend for release.

use hashbrown::HashMap;

use super::backend::RenderBackend;
use super::handle::ResourceId;

/// Kind of resource stored under a handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    Buffer,
    Texture,
    Shader,
    BlendState,
    RenderTarget,
}

/// Native objects of one device, keyed by handle.
pub struct ResourceTable<B: RenderBackend> {
    pub(crate) buffers: HashMap<ResourceId, B::Buffer>,
    pub(crate) textures: HashMap<ResourceId, B::Texture>,
    pub(crate) shaders: HashMap<ResourceId, B::Shader>,
    pub(crate) blend_states: HashMap<ResourceId, B::BlendState>,
    pub(crate) render_targets: HashMap<ResourceId, B::RenderTarget>,
}

impl<B: RenderBackend> ResourceTable<B> {
    pub fn new() -> Self {
        Self {
            buffers: HashMap::new(),
            textures: HashMap::new(),
            shaders: HashMap::new(),
            blend_states: HashMap::new(),
            render_targets: HashMap::new(),
        }
    }

    pub fn kind_of(&self, id: ResourceId) -> Option<ResourceKind> {
        if self.buffers.contains_key(&id) {
            Some(ResourceKind::Buffer)
        } else if self.textures.contains_key(&id) {
            Some(ResourceKind::Texture)
        } else if self.shaders.contains_key(&id) {
            Some(ResourceKind::Shader)
        } else if self.blend_states.contains_key(&id) {
            Some(ResourceKind::BlendState)
        } else if self.render_targets.contains_key(&id) {
            Some(ResourceKind::RenderTarget)
        } else {
            None
        }
    }

    pub fn contains(&self, id: ResourceId) -> bool {
        self.kind_of(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.buffers.len()
            + self.textures.len()
            + self.shaders.len()
            + self.blend_states.len()
            + self.render_targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Removes `id` and releases its object. Returns the kind removed.
    pub fn release(&mut self, backend: &mut B, id: ResourceId) -> Option<ResourceKind> {
        if let Some(buffer) = self.buffers.remove(&id) {
            backend.destroy_buffer(buffer);
            Some(ResourceKind::Buffer)
        } else if let Some(texture) = self.textures.remove(&id) {
            backend.destroy_texture(texture);
            Some(ResourceKind::Texture)
        } else if let Some(shader) = self.shaders.remove(&id) {
            backend.destroy_shader(shader);
            Some(ResourceKind::Shader)
        } else if let Some(blend_state) = self.blend_states.remove(&id) {
            backend.destroy_blend_state(blend_state);
            Some(ResourceKind::BlendState)
        } else if let Some(target) = self.render_targets.remove(&id) {
            backend.destroy_render_target(target);
            Some(ResourceKind::RenderTarget)
        } else {
            None
        }
    }

    /// Releases everything. Render targets go first since they may refer to
    /// textures.
    pub fn release_all(&mut self, backend: &mut B) {
        for (_, target) in self.render_targets.drain() {
            backend.destroy_render_target(target);
        }
        for (_, texture) in self.textures.drain() {
            backend.destroy_texture(texture);
        }
        for (_, buffer) in self.buffers.drain() {
            backend.destroy_buffer(buffer);
        }
        for (_, shader) in self.shaders.drain() {
            backend.destroy_shader(shader);
        }
        for (_, blend_state) in self.blend_states.drain() {
            backend.destroy_blend_state(blend_state);
        }
    }
}

impl<B: RenderBackend> Default for ResourceTable<B> {
    fn default() -> Self {
        Self::new()
    }
}
