//! Voice mixer
//!
//! [`Mixer`] runs on the audio callback context and [`MixerHandle`] on the
//! logic thread. They share two lock-free SPSC rings:
//!
//! - intents (logic -> audio): voices to add, play/pause/stop, parameter
//!   and listener changes. Applied at the start of each pull.
//! - retired voices (audio -> logic): removed voices go back so their
//!   buffers are freed off the callback.
//!
//! The intent producer sits behind a logic-side mutex because every
//! [`Sound`] holds a sender; the audio side never touches that mutex.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU8, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use glam::Mat4;
use ringbuf::HeapRb;
use ringbuf::traits::{Consumer, Producer, Split};
use tracing::{debug, warn};

use super::metrics::{MetricsCounters, MetricsLog, MixerMetrics};
use super::mixing::{apply_pan, convert_frame, distance_gain, pan_from_relative, soft_clip};
use super::sound::{Listener, MAX_PITCH, Sound, SoundId, SoundParams, SoundState};
use super::stream::{SoundData, Stream};
use crate::config::AudioSettings;

/// Intent ring capacity.
const INTENT_CAPACITY: usize = 1024;

/// Output format and limits.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MixerConfig {
    pub sample_rate: u32,
    pub channels: u16,
    pub max_voices: usize,
    pub master_gain: f32,
    /// Typical frames per pull, used to size voice buffers up front
    pub buffer_frames: usize,
}

impl Default for MixerConfig {
    fn default() -> Self {
        Self {
            sample_rate: 44_100,
            channels: 2,
            max_voices: 64,
            master_gain: 1.0,
            buffer_frames: 512,
        }
    }
}

impl From<&AudioSettings> for MixerConfig {
    fn from(settings: &AudioSettings) -> Self {
        Self {
            sample_rate: settings.sample_rate,
            channels: settings.channels,
            max_voices: settings.max_voices,
            master_gain: settings.master_gain,
            buffer_frames: settings.buffer_frames as usize,
        }
    }
}

pub(crate) enum Intent {
    Add(Box<Voice>),
    Play { id: SoundId, repeat: bool },
    Pause { id: SoundId },
    Stop { id: SoundId },
    Remove { id: SoundId },
    Params { id: SoundId, params: SoundParams },
    Listener(Listener),
    MasterGain(f32),
}

/// Logic-side intent sender shared by every [`Sound`].
///
/// Intents that don't fit in the ring wait in a logic-side backlog and are
/// retried, in order, on the next send or
/// [`MixerHandle::retry_intents`]. Nothing
/// is dropped, so transport state on the logic side never diverges from
/// what the mixer eventually applies.
pub(crate) struct IntentQueue {
    sender: Mutex<IntentSender>,
    counters: Arc<MetricsCounters>,
}

struct IntentSender {
    producer: ringbuf::HeapProd<Intent>,
    backlog: VecDeque<Intent>,
}

impl IntentSender {
    /// Moves as much of the backlog into the ring as fits.
    fn drain_backlog(&mut self) {
        while let Some(intent) = self.backlog.pop_front() {
            if let Err(intent) = self.producer.try_push(intent) {
                self.backlog.push_front(intent);
                break;
            }
        }
    }

    fn defer(&mut self, intent: Intent) {
        // Only the latest parameters of a sound matter
        if let Intent::Params { id, params } = &intent {
            let pending = self.backlog.iter_mut().rev().find_map(|queued| match queued {
                Intent::Params {
                    id: queued_id,
                    params: queued_params,
                } if *queued_id == *id => Some(queued_params),
                _ => None,
            });
            if let Some(pending) = pending {
                *pending = *params;
                return;
            }
        }
        self.backlog.push_back(intent);
    }
}

impl IntentQueue {
    fn sender(&self) -> std::sync::MutexGuard<'_, IntentSender> {
        self.sender.lock().unwrap_or_else(|e| {
            warn!("Audio intent mutex poisoned; continuing");
            e.into_inner()
        })
    }

    /// Queues an intent for the mixer. Returns `false` if the ring was
    /// full and the intent went to the backlog instead.
    pub fn send(&self, intent: Intent) -> bool {
        let mut sender = self.sender();
        sender.drain_backlog();
        if sender.backlog.is_empty() {
            match sender.producer.try_push(intent) {
                Ok(()) => return true,
                Err(intent) => sender.defer(intent),
            }
        } else {
            sender.defer(intent);
        }
        self.counters.record_intent_overflow();
        debug!("Audio intent queue full; {} intents deferred", sender.backlog.len());
        false
    }

    /// Retries deferred intents. Returns how many are still waiting.
    pub fn retry(&self) -> usize {
        let mut sender = self.sender();
        sender.drain_backlog();
        sender.backlog.len()
    }
}

/// One registered sound on the audio context.
pub(crate) struct Voice {
    id: SoundId,
    stream: Box<dyn Stream>,
    /// Mirrors `status` for the owning [`Sound`]
    shared_state: Arc<AtomicU8>,
    status: SoundState,
    repeat: bool,
    params: SoundParams,
    /// Interleaved source frames not yet consumed
    source: Vec<f32>,
    /// Fractional read position into `source`, in frames
    cursor: f64,
    pull: Vec<f32>,
    src_frame: Vec<f32>,
    dst_frame: Vec<f32>,
}

impl Voice {
    fn new(id: SoundId, stream: Box<dyn Stream>, shared_state: Arc<AtomicU8>, config: &MixerConfig) -> Self {
        let src_channels = stream.channels().max(1) as usize;
        // Room for one chunk at the fastest read rate, plus interpolation slack
        let max_step = MAX_PITCH as f64 * stream.sample_rate().max(1) as f64 / config.sample_rate.max(1) as f64;
        let reserve = ((config.buffer_frames.max(1) as f64 * max_step).ceil() as usize + 4) * src_channels;
        Self {
            id,
            stream,
            shared_state,
            status: SoundState::Stopped,
            repeat: false,
            params: SoundParams::default(),
            source: Vec::with_capacity(reserve),
            cursor: 0.0,
            pull: Vec::with_capacity(reserve),
            src_frame: vec![0.0; src_channels],
            dst_frame: vec![0.0; config.channels.max(1) as usize],
        }
    }

    fn publish(&self) {
        self.shared_state.store(self.status as u8, Ordering::Release);
    }

    fn rewind(&mut self) {
        self.stream.reset();
        self.source.clear();
        self.cursor = 0.0;
    }

    /// Mixes `frames` output frames into `out`. Returns `true` if the
    /// stream finished and the voice stopped.
    fn render(&mut self, out: &mut [f32], out_channels: usize, out_rate: u32, view: &Mat4) -> bool {
        let frames = out.len() / out_channels;
        let src_channels = self.src_frame.len();
        let pitch = self.params.pitch.min(MAX_PITCH);
        let step = pitch as f64 * self.stream.sample_rate() as f64 / out_rate as f64;
        if frames == 0 || step <= 0.0 || !step.is_finite() {
            return false;
        }

        // Drop frames behind the cursor
        let have = self.source.len() / src_channels;
        let consumed = (self.cursor.floor() as usize).min(have);
        self.source.drain(..consumed * src_channels);
        self.cursor -= consumed as f64;

        // Interpolation reads one frame past the last position, plus one
        // frame of slack for the cursor's accumulated rounding
        let last = self.cursor + step * (frames - 1) as f64;
        let needed = last.floor() as usize + 3;
        let have = self.source.len() / src_channels;
        let mut ended = false;
        if needed > have {
            self.stream.get_samples(needed - have, &mut self.pull);
            self.source.extend_from_slice(&self.pull);
            ended = self.stream.is_finished();
        }

        let positional = self.params.position.map(|p| {
            let relative = (*view * p.extend(1.0)).truncate();
            let gain = self.params.gain
                * distance_gain(
                    relative.length(),
                    self.params.min_distance,
                    self.params.max_distance,
                    self.params.rolloff,
                );
            (pan_from_relative(relative), gain)
        });

        for frame in out.chunks_exact_mut(out_channels) {
            let i0 = self.cursor.floor() as usize;
            let frac = (self.cursor - i0 as f64) as f32;
            let a = &self.source[i0 * src_channels..(i0 + 1) * src_channels];
            let b = &self.source[(i0 + 1) * src_channels..(i0 + 2) * src_channels];
            for ((s, x), y) in self.src_frame.iter_mut().zip(a).zip(b) {
                *s = x + (y - x) * frac;
            }

            match positional {
                Some((pan, gain)) if out_channels >= 2 => {
                    let mono = self.src_frame.iter().sum::<f32>() / src_channels as f32;
                    let (left, right) = apply_pan(mono, pan, gain);
                    frame[0] += left;
                    frame[1] += right;
                }
                Some((_, gain)) => {
                    let mono = self.src_frame.iter().sum::<f32>() / src_channels as f32;
                    frame[0] += mono * gain;
                }
                None => {
                    convert_frame(&self.src_frame, &mut self.dst_frame);
                    for (o, s) in frame.iter_mut().zip(&self.dst_frame) {
                        *o += s * self.params.gain;
                    }
                }
            }
            self.cursor += step;
        }

        if !ended {
            return false;
        }
        if self.repeat {
            self.stream.reset();
            return false;
        }
        self.status = SoundState::Stopped;
        self.rewind();
        self.publish();
        true
    }
}

/// Audio-context half of the mixer.
pub struct Mixer {
    config: MixerConfig,
    voices: Vec<Box<Voice>>,
    intents: ringbuf::HeapCons<Intent>,
    retired: ringbuf::HeapProd<Box<Voice>>,
    view: Mat4,
    master_gain: f32,
    counters: Arc<MetricsCounters>,
    log: MetricsLog,
}

/// Logic-thread half of the mixer.
pub struct MixerHandle {
    config: MixerConfig,
    queue: Arc<IntentQueue>,
    retired: ringbuf::HeapCons<Box<Voice>>,
    next_id: AtomicU64,
    counters: Arc<MetricsCounters>,
}

impl Mixer {
    /// Creates both halves of a mixer.
    pub fn new(config: MixerConfig) -> (Mixer, MixerHandle) {
        let config = MixerConfig {
            channels: config.channels.max(1),
            sample_rate: config.sample_rate.max(1),
            ..config
        };
        let (intent_tx, intent_rx) = HeapRb::<Intent>::new(INTENT_CAPACITY).split();
        // Every voice can be retired between two updates
        let (retired_tx, retired_rx) = HeapRb::<Box<Voice>>::new(config.max_voices.max(1) * 2).split();
        let counters = Arc::new(MetricsCounters::default());

        let mixer = Mixer {
            config,
            voices: Vec::with_capacity(config.max_voices),
            intents: intent_rx,
            retired: retired_tx,
            view: Mat4::IDENTITY,
            master_gain: config.master_gain,
            counters: Arc::clone(&counters),
            log: MetricsLog::new(),
        };
        let handle = MixerHandle {
            config,
            queue: Arc::new(IntentQueue {
                sender: Mutex::new(IntentSender {
                    producer: intent_tx,
                    backlog: VecDeque::new(),
                }),
                counters: Arc::clone(&counters),
            }),
            retired: retired_rx,
            next_id: AtomicU64::new(1),
            counters,
        };
        (mixer, handle)
    }

    pub fn config(&self) -> &MixerConfig {
        &self.config
    }

    pub fn channels(&self) -> u16 {
        self.config.channels
    }

    pub fn sample_rate(&self) -> u32 {
        self.config.sample_rate
    }

    pub fn voice_count(&self) -> usize {
        self.voices.len()
    }

    fn voice_mut(&mut self, id: SoundId) -> Option<&mut Box<Voice>> {
        self.voices.iter_mut().find(|v| v.id == id)
    }

    fn retire(&mut self, voice: Box<Voice>) {
        if self.retired.try_push(voice).is_err() {
            self.counters.record_retired_overflow();
        }
    }

    fn apply_intents(&mut self) {
        let mut applied = 0;
        while let Some(intent) = self.intents.try_pop() {
            applied += 1;
            match intent {
                Intent::Add(mut voice) => {
                    if self.voices.len() >= self.config.max_voices {
                        warn!("Voice limit {} reached; rejecting {}", self.config.max_voices, voice.id);
                        // The handle may already read Playing
                        voice.status = SoundState::Stopped;
                        voice.publish();
                        self.retire(voice);
                    } else {
                        self.voices.push(voice);
                    }
                }
                Intent::Play { id, repeat } => {
                    if let Some(voice) = self.voice_mut(id) {
                        voice.repeat = repeat;
                        voice.status = SoundState::Playing;
                        voice.publish();
                    }
                }
                Intent::Pause { id } => {
                    if let Some(voice) = self.voice_mut(id) {
                        if voice.status == SoundState::Playing {
                            voice.status = SoundState::Paused;
                        }
                        voice.publish();
                    }
                }
                Intent::Stop { id } => {
                    if let Some(voice) = self.voice_mut(id) {
                        voice.status = SoundState::Stopped;
                        voice.rewind();
                        voice.publish();
                    }
                }
                Intent::Remove { id } => {
                    if let Some(index) = self.voices.iter().position(|v| v.id == id) {
                        let voice = self.voices.swap_remove(index);
                        self.retire(voice);
                    }
                }
                Intent::Params { id, params } => {
                    if let Some(voice) = self.voice_mut(id) {
                        voice.params = SoundParams {
                            pitch: params.pitch.clamp(0.0, MAX_PITCH),
                            ..params
                        };
                    }
                }
                Intent::Listener(listener) => self.view = listener.view_matrix(),
                Intent::MasterGain(gain) => self.master_gain = gain,
            }
        }
        if applied > 0 {
            self.counters.record_intents(applied);
        }
    }

    /// Fills `out` with interleaved samples in the mixer's channel layout.
    ///
    /// Never blocks and never allocates once voice buffers are warm.
    pub fn render(&mut self, out: &mut [f32]) {
        self.apply_intents();
        out.fill(0.0);

        let channels = self.config.channels as usize;
        let usable = out.len() - out.len() % channels;
        let out = &mut out[..usable];

        // Oversized pulls are mixed in buffer-sized chunks so voice buffers
        // never outgrow their reservation
        let chunk = self.config.buffer_frames.max(1) * channels;
        let mut playing = 0;
        for voice in self.voices.iter_mut() {
            if voice.status != SoundState::Playing {
                continue;
            }
            playing += 1;
            for part in out.chunks_mut(chunk) {
                if voice.render(part, channels, self.config.sample_rate, &self.view) {
                    break;
                }
            }
        }

        let mut clipped = 0;
        for sample in out.iter_mut() {
            let scaled = *sample * self.master_gain;
            if scaled.abs() > 1.0 {
                clipped += 1;
            }
            *sample = soft_clip(scaled);
        }

        self.counters
            .record_pull(usable / channels, playing, self.voices.len(), clipped);
        self.log.maybe_log(&self.counters);
    }
}

impl MixerHandle {
    pub fn config(&self) -> &MixerConfig {
        &self.config
    }

    /// Registers a voice for `data` and returns its stopped handle.
    pub fn create_sound(&self, data: &dyn SoundData) -> Sound {
        let id = SoundId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let state = Arc::new(AtomicU8::new(SoundState::Stopped as u8));
        let voice = Voice::new(id, data.create_stream(), Arc::clone(&state), &self.config);
        self.queue.send(Intent::Add(Box::new(voice)));
        debug!("Created {} ({}ch, {}Hz)", id, data.channels(), data.sample_rate());
        Sound::new(id, state, Arc::clone(&self.queue))
    }

    pub fn set_listener(&self, listener: Listener) {
        self.queue.send(Intent::Listener(listener));
    }

    pub fn set_master_gain(&self, gain: f32) {
        self.queue.send(Intent::MasterGain(gain.max(0.0)));
    }

    /// Pushes intents deferred by a full ring. Returns how many still wait.
    pub fn retry_intents(&self) -> usize {
        self.queue.retry()
    }

    /// Frees voices the mixer has removed. Returns how many were freed.
    pub fn collect_retired(&mut self) -> usize {
        let mut freed = 0;
        while let Some(voice) = self.retired.try_pop() {
            drop(voice);
            freed += 1;
        }
        freed
    }

    pub fn metrics(&self) -> MixerMetrics {
        self.counters.snapshot()
    }
}
