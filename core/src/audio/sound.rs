//! Logic-side sound handles

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};

use glam::{Mat4, Quat, Vec3};

use super::mixer::{Intent, IntentQueue};

/// Fastest playback rate a sound can be set to.
pub const MAX_PITCH: f32 = 4.0;

/// Identifies a voice inside one mixer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SoundId(pub(crate) u64);

impl SoundId {
    pub fn get(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for SoundId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sound#{}", self.0)
    }
}

/// Playback state shared between a [`Sound`] and its voice.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SoundState {
    #[default]
    Stopped = 0,
    Playing = 1,
    Paused = 2,
}

impl SoundState {
    pub(crate) fn from_u8(value: u8) -> Self {
        match value {
            1 => SoundState::Playing,
            2 => SoundState::Paused,
            _ => SoundState::Stopped,
        }
    }
}

/// Per-sound mix parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SoundParams {
    /// World position; `None` plays unattenuated and unpanned
    pub position: Option<Vec3>,
    pub gain: f32,
    pub pitch: f32,
    pub rolloff: f32,
    pub min_distance: f32,
    pub max_distance: f32,
}

impl Default for SoundParams {
    fn default() -> Self {
        Self {
            position: None,
            gain: 1.0,
            pitch: 1.0,
            rolloff: 1.0,
            min_distance: 1.0,
            max_distance: f32::MAX,
        }
    }
}

/// Listener pose. Faces -Z with +X to the right when unrotated.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Listener {
    pub position: Vec3,
    pub orientation: Quat,
}

impl Default for Listener {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            orientation: Quat::IDENTITY,
        }
    }
}

impl Listener {
    pub fn new(position: Vec3, orientation: Quat) -> Self {
        Self {
            position,
            orientation,
        }
    }

    /// World to listener space.
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::from_rotation_translation(self.orientation, self.position).inverse()
    }

    /// `point` in listener space.
    pub fn relative(&self, point: Vec3) -> Vec3 {
        self.orientation.inverse() * (point - self.position)
    }
}

/// A sound registered with the mixer.
///
/// Dropping it removes the voice; the voice's memory comes back to the
/// logic thread on the next [`Audio::update`](super::Audio::update).
pub struct Sound {
    id: SoundId,
    state: Arc<AtomicU8>,
    params: SoundParams,
    repeat: bool,
    queue: Arc<IntentQueue>,
}

impl Sound {
    pub(crate) fn new(id: SoundId, state: Arc<AtomicU8>, queue: Arc<IntentQueue>) -> Self {
        Self {
            id,
            state,
            params: SoundParams::default(),
            repeat: false,
            queue,
        }
    }

    pub fn id(&self) -> SoundId {
        self.id
    }

    pub fn state(&self) -> SoundState {
        SoundState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub fn is_playing(&self) -> bool {
        self.state() == SoundState::Playing
    }

    pub fn is_repeating(&self) -> bool {
        self.repeat
    }

    /// Starts or resumes playback. Returns `false` if already playing.
    pub fn play(&mut self, repeat: bool) -> bool {
        if self.state() == SoundState::Playing {
            return false;
        }
        self.repeat = repeat;
        self.state.store(SoundState::Playing as u8, Ordering::Release);
        self.queue.send(Intent::Play { id: self.id, repeat });
        true
    }

    /// Pauses playback. Returns `false` unless the sound was playing.
    pub fn pause(&mut self) -> bool {
        if self.state() != SoundState::Playing {
            return false;
        }
        self.state.store(SoundState::Paused as u8, Ordering::Release);
        self.queue.send(Intent::Pause { id: self.id });
        true
    }

    /// Stops playback and rewinds to the start.
    pub fn stop(&mut self) {
        self.state.store(SoundState::Stopped as u8, Ordering::Release);
        self.queue.send(Intent::Stop { id: self.id });
    }

    pub fn params(&self) -> &SoundParams {
        &self.params
    }

    pub fn set_params(&mut self, params: SoundParams) {
        if self.params != params {
            self.params = params;
            self.queue.send(Intent::Params { id: self.id, params });
        }
    }

    pub fn set_position(&mut self, position: Option<Vec3>) {
        self.set_params(SoundParams { position, ..self.params });
    }

    pub fn set_gain(&mut self, gain: f32) {
        self.set_params(SoundParams {
            gain: gain.max(0.0),
            ..self.params
        });
    }

    /// Clamped to `0.0..=MAX_PITCH`.
    pub fn set_pitch(&mut self, pitch: f32) {
        self.set_params(SoundParams {
            pitch: pitch.clamp(0.0, MAX_PITCH),
            ..self.params
        });
    }

    pub fn set_rolloff(&mut self, rolloff: f32) {
        self.set_params(SoundParams {
            rolloff: rolloff.max(0.0),
            ..self.params
        });
    }

    pub fn set_distance_range(&mut self, min_distance: f32, max_distance: f32) {
        self.set_params(SoundParams {
            min_distance,
            max_distance: max_distance.max(min_distance),
            ..self.params
        });
    }
}

impl Drop for Sound {
    fn drop(&mut self) {
        self.queue.send(Intent::Remove { id: self.id });
    }
}

impl fmt::Debug for Sound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sound")
            .field("id", &self.id)
            .field("state", &self.state())
            .field("params", &self.params)
            .finish()
    }
}
