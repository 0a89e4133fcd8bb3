//! Render command pipeline
//!
//! The logic thread records [`Command`]s through the [`Renderer`] into a
//! [`CommandQueue`]; the [`RenderDevice`] drains that queue on its render
//! context and executes each command against a [`RenderBackend`].
//!
//! - [`handle`] - resource handle allocation
//! - [`command`] - the closed set of render commands
//! - [`queue`] - FIFO with flush barrier
//! - [`device`] - lifecycle, render thread, live handle tracking
//! - [`executor`] - command dispatch and the handle table
//! - [`registry`] - driver selection at startup

pub mod backend;
pub mod command;
pub mod desc;
pub mod device;
pub mod empty;
pub mod executor;
pub mod handle;
pub mod queue;
pub mod registry;
pub mod renderer;
pub mod state;
pub mod table;
pub mod window;

pub use backend::{DrawCall, GlContext, GlVersion, NativeWindow, RenderBackend};
pub use command::{Command, CommandBuffer, FenceId};
pub use desc::{
    BlendStateDesc, BufferDesc, ClearDesc, DrawDesc, MAX_TEXTURES, SamplerDesc, ShaderConstant,
    ShaderDesc, TextureDesc, TextureLevel, VertexAttribute, VertexSemantic,
};
pub use device::{DeviceOptions, DeviceState, DeviceStats, ExecutionMode, RenderDevice};
pub use empty::EmptyBackend;
pub use executor::{CommandExecutor, Executor};
pub use handle::{HandleAllocator, ResourceId};
pub use queue::CommandQueue;
pub use registry::{BackendRegistry, DeviceFactory, GraphicsDriver};
pub use renderer::{BlendState, Buffer, RenderTarget, Renderer, Shader, Texture};
pub use state::{
    BlendFactor, BlendOperation, BufferKind, ColorMask, CullMode, DataType, DrawMode, FillMode,
    FrontFace, SamplerAddressMode, SamplerFilter,
};
pub use table::{ResourceKind, ResourceTable};
pub use window::HeadlessWindow;
