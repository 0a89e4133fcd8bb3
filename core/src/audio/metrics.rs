//! Mixer health counters
//!
//! The audio context bumps the counters every pull; the logic thread reads
//! snapshots through [`MixerHandle::metrics`](super::MixerHandle::metrics).
//! Per-interval deltas are logged at `debug` about once a second.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use tracing::debug;

const LOG_INTERVAL: Duration = Duration::from_secs(1);

/// Snapshot of the mixer counters since startup.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MixerMetrics {
    /// Output callbacks served
    pub pulls: u64,
    /// Output frames produced
    pub frames: u64,
    /// Voices playing during the last pull
    pub playing: usize,
    /// Registered voices during the last pull
    pub voices: usize,
    pub intents_applied: u64,
    /// Intents deferred to the logic-side backlog because the ring was full
    pub intent_overflows: u64,
    /// Removed voices dropped on the audio context because the return queue was full
    pub retired_overflows: u64,
    /// Output samples pushed through the soft clipper
    pub clipped_samples: u64,
}

#[derive(Debug, Default)]
pub(crate) struct MetricsCounters {
    pulls: AtomicU64,
    frames: AtomicU64,
    playing: AtomicUsize,
    voices: AtomicUsize,
    intents_applied: AtomicU64,
    intent_overflows: AtomicU64,
    retired_overflows: AtomicU64,
    clipped_samples: AtomicU64,
}

impl MetricsCounters {
    pub fn record_pull(&self, frames: usize, playing: usize, voices: usize, clipped: u64) {
        self.pulls.fetch_add(1, Ordering::Relaxed);
        self.frames.fetch_add(frames as u64, Ordering::Relaxed);
        self.playing.store(playing, Ordering::Relaxed);
        self.voices.store(voices, Ordering::Relaxed);
        self.clipped_samples.fetch_add(clipped, Ordering::Relaxed);
    }

    pub fn record_intents(&self, count: u64) {
        self.intents_applied.fetch_add(count, Ordering::Relaxed);
    }

    pub fn record_intent_overflow(&self) {
        self.intent_overflows.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_retired_overflow(&self) {
        self.retired_overflows.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MixerMetrics {
        MixerMetrics {
            pulls: self.pulls.load(Ordering::Relaxed),
            frames: self.frames.load(Ordering::Relaxed),
            playing: self.playing.load(Ordering::Relaxed),
            voices: self.voices.load(Ordering::Relaxed),
            intents_applied: self.intents_applied.load(Ordering::Relaxed),
            intent_overflows: self.intent_overflows.load(Ordering::Relaxed),
            retired_overflows: self.retired_overflows.load(Ordering::Relaxed),
            clipped_samples: self.clipped_samples.load(Ordering::Relaxed),
        }
    }
}

/// Periodic logger living on the audio context.
#[derive(Debug)]
pub(crate) struct MetricsLog {
    last: MixerMetrics,
    last_log: Instant,
}

impl MetricsLog {
    pub fn new() -> Self {
        Self {
            last: MixerMetrics::default(),
            last_log: Instant::now(),
        }
    }

    /// Logs per-interval deltas if a second has passed since the last log.
    pub fn maybe_log(&mut self, counters: &MetricsCounters) {
        if self.last_log.elapsed() < LOG_INTERVAL {
            return;
        }
        let now = counters.snapshot();
        debug!(
            "MIXER METRICS [tid={:?}]: pulls={}, frames={}, playing={}/{}, intents={}, \
             intent_overflows={}, retired_overflows={}, clipped={}",
            std::thread::current().id(),
            now.pulls - self.last.pulls,
            now.frames - self.last.frames,
            now.playing,
            now.voices,
            now.intents_applied - self.last.intents_applied,
            now.intent_overflows - self.last.intent_overflows,
            now.retired_overflows - self.last.retired_overflows,
            now.clipped_samples - self.last.clipped_samples,
        );
        self.last = now;
        self.last_log = Instant::now();
    }
}
