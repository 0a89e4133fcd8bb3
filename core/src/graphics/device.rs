//! Render device: lifecycle and execution loop
//!
//! State machine: `Uninitialized -> Running -> ShuttingDown -> Stopped`.
//!
//! [`RenderDevice::init`] creates the backend on the render context and
//! starts executing commands there. In [`ExecutionMode::Threaded`] that
//! context is a dedicated `render` thread; in [`ExecutionMode::External`]
//! a platform display-sync callback calls [`RenderDevice::process_frame`].
//!
//! Shutdown is cooperative: flush, clear the running flag, close the queue,
//! join the thread. The loop notices the flag after its current drain.

use std::sync::atomic::{AtomicBool, AtomicU8, AtomicU64, Ordering};
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use hashbrown::HashSet;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use super::backend::RenderBackend;
use super::command::Command;
use super::executor::{CommandExecutor, Executor};
use super::handle::{HandleAllocator, ResourceId};
use super::queue::CommandQueue;
use super::state::SamplerFilter;
use super::GraphicsDriver;
use crate::error::{EngineError, Result};
use crate::types::Size2;

/// How long the render thread sleeps on an empty queue before re-checking
/// the running flag.
const IDLE_WAIT: Duration = Duration::from_millis(16);

/// Lifecycle state of a [`RenderDevice`].
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceState {
    Uninitialized = 0,
    Running = 1,
    ShuttingDown = 2,
    Stopped = 3,
}

impl DeviceState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => DeviceState::Uninitialized,
            1 => DeviceState::Running,
            2 => DeviceState::ShuttingDown,
            _ => DeviceState::Stopped,
        }
    }
}

/// Who drives command execution.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExecutionMode {
    /// Dedicated render thread owned by the device
    #[default]
    Threaded,
    /// Platform display-sync callback calls `process_frame`
    External,
}

/// Backend-independent device options.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DeviceOptions {
    pub size: Size2,
    pub sample_count: u32,
    pub texture_filter: SamplerFilter,
    pub max_anisotropy: u32,
    pub vsync: bool,
    pub depth: bool,
    pub debug_renderer: bool,
    pub execution_mode: ExecutionMode,
}

impl Default for DeviceOptions {
    fn default() -> Self {
        Self {
            size: Size2::new(1280, 720),
            sample_count: 1,
            texture_filter: SamplerFilter::Point,
            max_anisotropy: 1,
            vsync: true,
            depth: false,
            debug_renderer: false,
            execution_mode: ExecutionMode::Threaded,
        }
    }
}

/// Counters published by the render context.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeviceStats {
    pub frames: u64,
    pub commands_executed: u64,
    pub commands_failed: u64,
}

/// State shared between the logic side and the render context.
#[derive(Debug)]
pub(crate) struct DeviceShared {
    pub(crate) queue: CommandQueue,
    running: AtomicBool,
    state: AtomicU8,
    /// Mirror of the handle table's keys, written by the render context
    live: Mutex<HashSet<ResourceId>>,
    pub(crate) frames: AtomicU64,
    pub(crate) executed: AtomicU64,
    pub(crate) failed: AtomicU64,
}

impl DeviceShared {
    pub(crate) fn new() -> Self {
        Self {
            queue: CommandQueue::new(),
            running: AtomicBool::new(false),
            state: AtomicU8::new(DeviceState::Uninitialized as u8),
            live: Mutex::new(HashSet::new()),
            frames: AtomicU64::new(0),
            executed: AtomicU64::new(0),
            failed: AtomicU64::new(0),
        }
    }

    fn set_state(&self, state: DeviceState) {
        self.state.store(state as u8, Ordering::Release);
    }

    fn state(&self) -> DeviceState {
        DeviceState::from_u8(self.state.load(Ordering::Acquire))
    }

    fn live(&self) -> std::sync::MutexGuard<'_, HashSet<ResourceId>> {
        self.live.lock().unwrap_or_else(|e| {
            warn!("Live handle set mutex poisoned; continuing");
            e.into_inner()
        })
    }

    pub(crate) fn mark_live(&self, id: ResourceId) {
        self.live().insert(id);
    }

    pub(crate) fn mark_released(&self, id: ResourceId) {
        self.live().remove(&id);
    }

    pub(crate) fn clear_live(&self) {
        self.live().clear();
    }

    pub(crate) fn is_live(&self, id: ResourceId) -> bool {
        self.live().contains(&id)
    }

    pub(crate) fn count_frame(&self) {
        self.frames.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn count_executed(&self) {
        self.executed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn count_failed(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    /// Pushes a command unless the device has stopped accepting them.
    pub(crate) fn push(&self, command: Command) {
        self.queue.push(command);
    }
}

/// A render device bound to one backend.
///
/// Created [`Uninitialized`](DeviceState::Uninitialized); [`init`](Self::init)
/// fixes the backend for the lifetime of the device.
pub struct RenderDevice {
    driver: GraphicsDriver,
    options: DeviceOptions,
    shared: Arc<DeviceShared>,
    allocator: HandleAllocator,
    /// Render thread in threaded mode
    thread: Option<JoinHandle<()>>,
    /// Executor driven by the platform callback in external mode
    external: Option<Mutex<Box<dyn CommandExecutor>>>,
}

impl RenderDevice {
    pub fn new(driver: GraphicsDriver) -> Self {
        Self {
            driver,
            options: DeviceOptions::default(),
            shared: Arc::new(DeviceShared::new()),
            allocator: HandleAllocator::new(),
            thread: None,
            external: None,
        }
    }

    /// Creates the backend on the render context and starts executing.
    ///
    /// `factory` runs on the render thread in threaded mode so thread-affine
    /// contexts are created where they are used. A factory failure is
    /// returned as [`EngineError::System`] naming the driver, and the device
    /// ends up [`Stopped`](DeviceState::Stopped).
    pub fn init<B, F>(&mut self, options: DeviceOptions, factory: F) -> Result<()>
    where
        B: RenderBackend,
        F: FnOnce(&DeviceOptions) -> Result<B> + Send + 'static,
    {
        if self.state() != DeviceState::Uninitialized {
            return Err(EngineError::data(format!(
                "{} render device already initialized",
                self.driver
            )));
        }
        self.options = options;
        self.shared.running.store(true, Ordering::Release);

        let result = match options.execution_mode {
            ExecutionMode::Threaded => self.spawn_render_thread(options, factory),
            ExecutionMode::External => factory(&options).map(|backend| {
                let executor: Box<dyn CommandExecutor> =
                    Box::new(Executor::new(backend, Arc::clone(&self.shared)));
                self.external = Some(Mutex::new(executor));
            }),
        };

        match result {
            Ok(()) => {
                self.shared.set_state(DeviceState::Running);
                info!(
                    "{} render device running ({:?}, {}x{})",
                    self.driver, options.execution_mode, options.size.width, options.size.height
                );
                Ok(())
            }
            Err(e) => {
                self.shared.running.store(false, Ordering::Release);
                self.shared.queue.close();
                self.shared.set_state(DeviceState::Stopped);
                error!("Failed to initialize {} render device: {}", self.driver, e);
                Err(match e {
                    EngineError::System(msg) => EngineError::System(format!("{}: {}", self.driver, msg)),
                    other => EngineError::system(format!("{}: {}", self.driver, other)),
                })
            }
        }
    }

    fn spawn_render_thread<B, F>(&mut self, options: DeviceOptions, factory: F) -> Result<()>
    where
        B: RenderBackend,
        F: FnOnce(&DeviceOptions) -> Result<B> + Send + 'static,
    {
        let (ready_tx, ready_rx) = mpsc::sync_channel::<Result<()>>(1);
        let shared = Arc::clone(&self.shared);

        let handle = thread::Builder::new()
            .name("render".into())
            .spawn(move || {
                let backend = match factory(&options) {
                    Ok(backend) => backend,
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };
                let mut executor = Executor::new(backend, Arc::clone(&shared));
                let _ = ready_tx.send(Ok(()));
                drop(ready_tx);
                run_loop(&shared, &mut executor);
            })
            .map_err(|e| EngineError::system(format!("failed to spawn render thread: {}", e)))?;

        let ready = ready_rx
            .recv()
            .unwrap_or_else(|_| Err(EngineError::system("render thread exited during init")));
        if ready.is_err() {
            let _ = handle.join();
            return ready;
        }
        self.thread = Some(handle);
        Ok(())
    }

    pub fn driver(&self) -> GraphicsDriver {
        self.driver
    }

    pub fn options(&self) -> &DeviceOptions {
        &self.options
    }

    pub fn state(&self) -> DeviceState {
        self.shared.state()
    }

    /// Allocates a handle for a resource the caller is about to create.
    pub fn allocate(&self) -> ResourceId {
        self.allocator.allocate()
    }

    pub fn queue(&self) -> &CommandQueue {
        &self.shared.queue
    }

    pub(crate) fn shared(&self) -> &Arc<DeviceShared> {
        &self.shared
    }

    pub fn push(&self, command: Command) {
        self.shared.push(command);
    }

    /// Queues a present of the back buffer.
    pub fn present(&self) {
        self.shared.push(Command::Present);
    }

    /// Blocks until everything queued so far has executed.
    ///
    /// In external mode this relies on the platform callback still running.
    pub fn flush(&self) {
        if self.state() != DeviceState::Running && self.state() != DeviceState::ShuttingDown {
            return;
        }
        self.shared.queue.flush();
    }

    /// Resizes the back buffer synchronously on the render context.
    pub fn resize(&mut self, size: Size2) {
        self.options.size = size;
        self.shared.push(Command::Resize { size });
        self.flush();
    }

    /// Runs one iteration in external mode. Returns `false` when the device
    /// isn't running in that mode.
    pub fn process_frame(&self) -> bool {
        let Some(external) = &self.external else {
            return false;
        };
        if !self.shared.running.load(Ordering::Acquire) {
            return false;
        }
        let commands = self.shared.queue.drain();
        let mut executor = external.lock().unwrap_or_else(|e| {
            warn!("External executor mutex poisoned; continuing");
            e.into_inner()
        });
        executor.process(commands);
        true
    }

    /// Whether the render context currently holds `id`.
    pub fn is_live(&self, id: ResourceId) -> bool {
        self.shared.is_live(id)
    }

    pub fn live_count(&self) -> usize {
        self.shared.live().len()
    }

    pub fn stats(&self) -> DeviceStats {
        DeviceStats {
            frames: self.shared.frames.load(Ordering::Relaxed),
            commands_executed: self.shared.executed.load(Ordering::Relaxed),
            commands_failed: self.shared.failed.load(Ordering::Relaxed),
        }
    }

    /// Stops the device and releases every native object.
    pub fn shutdown(&mut self) {
        if self.state() != DeviceState::Running {
            return;
        }
        debug!("Shutting down {} render device", self.driver);
        self.shared.set_state(DeviceState::ShuttingDown);

        if let Some(handle) = self.thread.take() {
            self.shared.queue.flush();
            self.shared.running.store(false, Ordering::Release);
            self.shared.queue.close();
            if handle.join().is_err() {
                error!("{} render thread panicked", self.driver);
            }
        } else if let Some(external) = self.external.take() {
            // The platform callback must be stopped before shutdown
            self.shared.running.store(false, Ordering::Release);
            self.shared.queue.close();
            let mut executor = external.into_inner().unwrap_or_else(|e| e.into_inner());
            executor.process(self.shared.queue.drain());
            executor.teardown();
        }

        self.shared.set_state(DeviceState::Stopped);
        debug!("{} render device stopped", self.driver);
    }
}

impl Drop for RenderDevice {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn run_loop(shared: &DeviceShared, executor: &mut dyn CommandExecutor) {
    debug!("Render thread started ({})", executor.driver());
    while shared.running.load(Ordering::Acquire) {
        let commands = shared.queue.wait_and_drain(IDLE_WAIT);
        if !commands.is_empty() {
            executor.process(commands);
        }
    }
    // Commands that raced the close still reach the backend before teardown
    executor.process(shared.queue.drain());
    executor.teardown();
    debug!("Render thread finished");
}
