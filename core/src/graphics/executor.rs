//! Command execution on the render context
//!
//! [`Executor`] pairs a backend with its handle table and applies drained
//! commands one at a time, in order. A command that fails is logged and
//! skipped; the rest of the batch still runs.

use std::sync::Arc;

use tracing::{trace, warn};

use super::backend::{DrawCall, RenderBackend};
use super::command::Command;
use super::device::DeviceShared;
use super::handle::ResourceId;
use super::table::ResourceTable;
use super::GraphicsDriver;
use crate::error::{EngineError, Result};

/// Type-erased executor, the owned polymorphic backend of a device.
pub trait CommandExecutor: Send {
    fn driver(&self) -> GraphicsDriver;

    /// Executes a drained batch in order.
    fn process(&mut self, commands: Vec<Command>);

    /// Releases every native object still in the handle table.
    fn teardown(&mut self);
}

fn missing(kind: &str, id: ResourceId) -> EngineError {
    EngineError::data(format!("{} {} does not exist", kind, id))
}

/// Backend plus the handle table it owns.
pub struct Executor<B: RenderBackend> {
    backend: B,
    table: ResourceTable<B>,
    shared: Arc<DeviceShared>,
    current_target: Option<ResourceId>,
}

impl<B: RenderBackend> Executor<B> {
    pub(crate) fn new(backend: B, shared: Arc<DeviceShared>) -> Self {
        Self {
            backend,
            table: ResourceTable::new(),
            shared,
            current_target: None,
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn table(&self) -> &ResourceTable<B> {
        &self.table
    }

    fn ensure_free(&self, id: ResourceId) -> Result<()> {
        if self.table.contains(id) {
            return Err(EngineError::data(format!("handle {} is already in use", id)));
        }
        Ok(())
    }

    /// Executes a single command against the backend.
    pub fn execute(&mut self, command: Command) -> Result<()> {
        match command {
            Command::InitBuffer { id, desc } => {
                self.ensure_free(id)?;
                let buffer = self.backend.create_buffer(&desc)?;
                self.table.buffers.insert(id, buffer);
                self.shared.mark_live(id);
            }
            Command::SetBufferData { id, data } => {
                let buffer = self.table.buffers.get_mut(&id).ok_or_else(|| missing("buffer", id))?;
                self.backend.update_buffer(buffer, &data)?;
            }
            Command::InitTexture { id, desc } => {
                self.ensure_free(id)?;
                desc.validate()?;
                let texture = self.backend.create_texture(&desc)?;
                self.table.textures.insert(id, texture);
                self.shared.mark_live(id);
            }
            Command::SetTextureData { id, levels } => {
                let texture = self.table.textures.get_mut(&id).ok_or_else(|| missing("texture", id))?;
                self.backend.update_texture(texture, &levels)?;
            }
            Command::SetTextureSampler { id, sampler } => {
                let texture = self.table.textures.get_mut(&id).ok_or_else(|| missing("texture", id))?;
                self.backend.set_texture_sampler(texture, &sampler)?;
            }
            Command::InitShader { id, desc } => {
                self.ensure_free(id)?;
                let shader = self.backend.create_shader(&desc)?;
                self.table.shaders.insert(id, shader);
                self.shared.mark_live(id);
            }
            Command::InitBlendState { id, desc } => {
                self.ensure_free(id)?;
                let blend_state = self.backend.create_blend_state(&desc)?;
                self.table.blend_states.insert(id, blend_state);
                self.shared.mark_live(id);
            }
            Command::InitRenderTarget { id } => {
                self.ensure_free(id)?;
                let target = self.backend.create_render_target()?;
                self.table.render_targets.insert(id, target);
                self.shared.mark_live(id);
            }
            Command::AddRenderTargetColorTexture { id, texture } => {
                let native = self.table.textures.get(&texture).ok_or_else(|| missing("texture", texture))?;
                let target = self
                    .table
                    .render_targets
                    .get_mut(&id)
                    .ok_or_else(|| missing("render target", id))?;
                self.backend.add_color_texture(target, texture, native)?;
            }
            Command::RemoveRenderTargetColorTexture { id, texture } => {
                let target = self
                    .table
                    .render_targets
                    .get_mut(&id)
                    .ok_or_else(|| missing("render target", id))?;
                self.backend.remove_color_texture(target, texture)?;
            }
            Command::SetRenderTargetDepthTexture { id, texture } => {
                let native = match texture {
                    Some(texture) => Some((
                        texture,
                        self.table.textures.get(&texture).ok_or_else(|| missing("texture", texture))?,
                    )),
                    None => None,
                };
                let target = self
                    .table
                    .render_targets
                    .get_mut(&id)
                    .ok_or_else(|| missing("render target", id))?;
                self.backend.set_depth_texture(target, native)?;
            }
            Command::DeleteResource { id } => {
                if self.current_target == Some(id) {
                    self.current_target = None;
                    if let Err(e) = self.backend.set_render_target(None) {
                        warn!("Failed to unbind deleted render target {}: {}", id, e);
                    }
                }
                self.table
                    .release(&mut self.backend, id)
                    .ok_or_else(|| missing("resource", id))?;
                self.shared.mark_released(id);
            }
            Command::SetRenderTarget { id } => {
                let target = match id {
                    Some(id) => Some(
                        self.table
                            .render_targets
                            .get(&id)
                            .ok_or_else(|| missing("render target", id))?,
                    ),
                    None => None,
                };
                self.backend.set_render_target(target)?;
                self.current_target = id;
            }
            Command::Clear(desc) => self.backend.clear(&desc)?,
            Command::Draw(desc) => {
                desc.validate()?;
                let table = &self.table;
                let mut textures = [None; super::desc::MAX_TEXTURES];
                for (slot, texture) in textures.iter_mut().zip(desc.textures.iter()) {
                    if let Some(texture) = texture {
                        *slot = Some(
                            table
                                .textures
                                .get(texture)
                                .ok_or_else(|| missing("texture", *texture))?,
                        );
                    }
                }
                let blend_state = match desc.blend_state {
                    Some(id) => Some(
                        table
                            .blend_states
                            .get(&id)
                            .ok_or_else(|| missing("blend state", id))?,
                    ),
                    None => None,
                };
                let call = DrawCall {
                    desc: &desc,
                    shader: table.shaders.get(&desc.shader).ok_or_else(|| missing("shader", desc.shader))?,
                    index_buffer: table
                        .buffers
                        .get(&desc.index_buffer)
                        .ok_or_else(|| missing("index buffer", desc.index_buffer))?,
                    vertex_buffer: table
                        .buffers
                        .get(&desc.vertex_buffer)
                        .ok_or_else(|| missing("vertex buffer", desc.vertex_buffer))?,
                    blend_state,
                    textures,
                };
                self.backend.draw(&call)?;
            }
            Command::Present => {
                self.backend.present()?;
                self.shared.count_frame();
            }
            Command::Resize { size } => self.backend.resize(size)?,
            Command::Fence(fence) => {
                trace!("Fence {} reached", fence);
                self.shared.queue.signal_fence(fence);
            }
        }
        Ok(())
    }
}

impl<B: RenderBackend> CommandExecutor for Executor<B> {
    fn driver(&self) -> GraphicsDriver {
        self.backend.driver()
    }

    fn process(&mut self, commands: Vec<Command>) {
        for command in commands {
            // Counted before the waiter wakes so stats read after a flush
            // include the fence itself
            if let Command::Fence(fence) = command {
                self.shared.count_executed();
                trace!("Fence {} reached", fence);
                self.shared.queue.signal_fence(fence);
                continue;
            }
            let kind = command.kind();
            let target = command.target();
            match self.execute(command) {
                Ok(()) => self.shared.count_executed(),
                Err(e) => {
                    self.shared.count_failed();
                    match target {
                        Some(id) => warn!("Skipping {} for {}: {}", kind, id, e),
                        None => warn!("Skipping {}: {}", kind, e),
                    }
                }
            }
        }
    }

    fn teardown(&mut self) {
        let released = self.table.len();
        self.table.release_all(&mut self.backend);
        self.shared.clear_live();
        self.current_target = None;
        trace!("Released {} resources on teardown", released);
    }
}

#[cfg(test)]
mod tests;
