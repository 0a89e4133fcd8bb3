//! Command queue between the logic thread and the render context
//!
//! Strict FIFO. Any number of producers may push; exactly one consumer
//! drains. A single mutex guards the pending commands, so a drain always
//! takes a complete snapshot and a racing push lands either in that snapshot
//! or in the next one.
//!
//! Flush is a barrier built from a sentinel: the caller pushes
//! [`Command::Fence`] and sleeps until the render context reports that fence
//! as executed. Fence bookkeeping has its own lock so the render context
//! signalling a fence never contends with producers.

use std::sync::{Condvar, Mutex, MutexGuard};
use std::time::Duration;

use tracing::{trace, warn};

use super::command::{Command, CommandBuffer, FenceId};

#[derive(Debug, Default)]
struct Pending {
    commands: Vec<Command>,
    next_fence: FenceId,
    closed: bool,
}

#[derive(Debug, Default)]
struct Fences {
    completed: FenceId,
    closed: bool,
}

/// Thread-safe FIFO of [`Command`]s.
#[derive(Debug, Default)]
pub struct CommandQueue {
    pending: Mutex<Pending>,
    /// Signalled when commands arrive or the queue closes
    available: Condvar,
    fences: Mutex<Fences>,
    /// Signalled when a fence completes or the queue closes
    fence_done: Condvar,
}

fn lock_or_recover<'a, T>(mutex: &'a Mutex<T>, what: &str) -> MutexGuard<'a, T> {
    mutex.lock().unwrap_or_else(|e| {
        warn!("Command queue {} mutex poisoned; continuing", what);
        e.into_inner()
    })
}

impl CommandQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a command and wakes the render context.
    ///
    /// Commands pushed after [`close`](Self::close) are dropped.
    pub fn push(&self, command: Command) {
        let mut pending = lock_or_recover(&self.pending, "pending");
        if pending.closed {
            trace!("Dropping {} pushed after queue close", command.kind());
            return;
        }
        pending.commands.push(command);
        drop(pending);
        self.available.notify_one();
    }

    /// Appends a whole batch under one lock, preserving its order.
    pub fn submit(&self, buffer: CommandBuffer) {
        if buffer.is_empty() {
            return;
        }
        let mut pending = lock_or_recover(&self.pending, "pending");
        if pending.closed {
            trace!("Dropping batch of {} pushed after queue close", buffer.len());
            return;
        }
        pending.commands.extend(buffer.into_commands());
        drop(pending);
        self.available.notify_one();
    }

    /// Takes every queued command in push order.
    pub fn drain(&self) -> Vec<Command> {
        std::mem::take(&mut lock_or_recover(&self.pending, "pending").commands)
    }

    /// Waits up to `timeout` for commands, then drains.
    ///
    /// Returns early with whatever is queued once the queue closes.
    pub fn wait_and_drain(&self, timeout: Duration) -> Vec<Command> {
        let pending = lock_or_recover(&self.pending, "pending");
        let (mut pending, _) = self
            .available
            .wait_timeout_while(pending, timeout, |p| p.commands.is_empty() && !p.closed)
            .unwrap_or_else(|e| {
                warn!("Command queue wait mutex poisoned; continuing");
                e.into_inner()
            });
        std::mem::take(&mut pending.commands)
    }

    /// Pushes a flush sentinel and returns its id, or `None` once closed.
    pub fn insert_fence(&self) -> Option<FenceId> {
        let mut pending = lock_or_recover(&self.pending, "pending");
        if pending.closed {
            return None;
        }
        pending.next_fence += 1;
        let fence = pending.next_fence;
        pending.commands.push(Command::Fence(fence));
        drop(pending);
        self.available.notify_one();
        Some(fence)
    }

    /// Blocks until `fence` has executed or the queue closes.
    pub fn wait_fence(&self, fence: FenceId) {
        let fences = lock_or_recover(&self.fences, "fence");
        let _fences = self
            .fence_done
            .wait_while(fences, |f| f.completed < fence && !f.closed)
            .unwrap_or_else(|e| {
                warn!("Command queue fence wait mutex poisoned; continuing");
                e.into_inner()
            });
    }

    /// Blocks until every command pushed before this call has executed.
    ///
    /// Returns immediately if the queue is closed. Commands pushed by other
    /// producers after the sentinel are not waited on.
    pub fn flush(&self) {
        match self.insert_fence() {
            Some(fence) => {
                trace!("Waiting for fence {}", fence);
                self.wait_fence(fence);
            }
            None => warn!("flush() on a closed command queue"),
        }
    }

    /// Reports a fence as executed. Called by the render context only.
    pub(crate) fn signal_fence(&self, fence: FenceId) {
        let mut fences = lock_or_recover(&self.fences, "fence");
        if fence > fences.completed {
            fences.completed = fence;
        }
        drop(fences);
        self.fence_done.notify_all();
    }

    /// Highest fence the render context has executed.
    pub fn completed_fence(&self) -> FenceId {
        lock_or_recover(&self.fences, "fence").completed
    }

    /// Stops accepting commands and releases every waiter.
    pub fn close(&self) {
        lock_or_recover(&self.pending, "pending").closed = true;
        self.available.notify_all();
        lock_or_recover(&self.fences, "fence").closed = true;
        self.fence_done.notify_all();
    }

    pub fn is_closed(&self) -> bool {
        lock_or_recover(&self.pending, "pending").closed
    }

    pub fn len(&self) -> usize {
        lock_or_recover(&self.pending, "pending").commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests;
