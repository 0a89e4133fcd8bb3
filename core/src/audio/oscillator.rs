//! Waveform generator

use std::f64::consts::TAU;
use std::fmt;
use std::str::FromStr;

use super::stream::{SoundData, Stream, zeroed};
use crate::error::{EngineError, Result};

pub const DEFAULT_SAMPLE_RATE: u32 = 44_100;
pub const DEFAULT_AMPLITUDE: f32 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Waveform {
    #[default]
    Sine,
    Square,
    Sawtooth,
    Triangle,
}

impl Waveform {
    pub fn as_str(&self) -> &'static str {
        match self {
            Waveform::Sine => "sine",
            Waveform::Square => "square",
            Waveform::Sawtooth => "sawtooth",
            Waveform::Triangle => "triangle",
        }
    }

    /// Value in [-1, 1] at phase `t`, measured in periods.
    pub fn sample(&self, t: f64) -> f64 {
        match self {
            Waveform::Sine => (t * TAU).sin(),
            Waveform::Square => ((t * 2.0 + 0.5).round() % 2.0) * 2.0 - 1.0,
            Waveform::Sawtooth => ((t + 0.5) % 1.0) * 2.0 - 1.0,
            Waveform::Triangle => (((t + 0.75) % 1.0) * 2.0 - 1.0).abs() * 2.0 - 1.0,
        }
    }
}

impl fmt::Display for Waveform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Waveform {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "sine" | "sin" => Ok(Waveform::Sine),
            "square" => Ok(Waveform::Square),
            "sawtooth" | "saw" => Ok(Waveform::Sawtooth),
            "triangle" | "tri" => Ok(Waveform::Triangle),
            other => Err(EngineError::config(format!("unknown waveform '{}'", other))),
        }
    }
}

/// Oscillator parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OscillatorData {
    pub waveform: Waveform,
    /// Hz
    pub frequency: f32,
    pub amplitude: f32,
    pub channels: u16,
    pub sample_rate: u32,
    /// Seconds; 0 plays forever
    pub length: f32,
}

impl OscillatorData {
    pub fn new(waveform: Waveform, frequency: f32) -> Self {
        Self {
            waveform,
            frequency,
            amplitude: DEFAULT_AMPLITUDE,
            channels: 1,
            sample_rate: DEFAULT_SAMPLE_RATE,
            length: 0.0,
        }
    }

    pub fn with_amplitude(mut self, amplitude: f32) -> Self {
        self.amplitude = amplitude;
        self
    }

    pub fn with_length(mut self, seconds: f32) -> Self {
        self.length = seconds.max(0.0);
        self
    }

    pub fn with_channels(mut self, channels: u16) -> Self {
        self.channels = channels.max(1);
        self
    }

    pub fn with_sample_rate(mut self, sample_rate: u32) -> Self {
        self.sample_rate = sample_rate.max(1);
        self
    }

    /// Frame count of a finite oscillator.
    pub fn frame_limit(&self) -> Option<u64> {
        (self.length > 0.0).then(|| (self.length as f64 * self.sample_rate as f64) as u64)
    }
}

impl SoundData for OscillatorData {
    fn channels(&self) -> u16 {
        self.channels.max(1)
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate.max(1)
    }

    fn create_stream(&self) -> Box<dyn Stream> {
        Box::new(OscillatorStream::new(*self))
    }
}

#[derive(Debug, Clone)]
pub struct OscillatorStream {
    data: OscillatorData,
    limit: Option<u64>,
    /// Frames produced since the last reset
    position: u64,
    finished: bool,
}

impl OscillatorStream {
    /// Out-of-range fields are clamped: at least one channel and 1 Hz.
    pub fn new(data: OscillatorData) -> Self {
        let data = OscillatorData {
            channels: data.channels.max(1),
            sample_rate: data.sample_rate.max(1),
            length: if data.length.is_finite() { data.length.max(0.0) } else { 0.0 },
            ..data
        };
        Self {
            limit: data.frame_limit(),
            data,
            position: 0,
            finished: false,
        }
    }

    pub fn position(&self) -> u64 {
        self.position
    }

    fn value(&self) -> f32 {
        let t = self.position as f64 * self.data.frequency as f64 / self.data.sample_rate as f64;
        (self.data.waveform.sample(t) * self.data.amplitude as f64) as f32
    }
}

impl Stream for OscillatorStream {
    fn channels(&self) -> u16 {
        self.data.channels
    }

    fn sample_rate(&self) -> u32 {
        self.data.sample_rate
    }

    fn get_samples(&mut self, frames: usize, out: &mut Vec<f32>) {
        let channels = self.data.channels as usize;
        zeroed(out, frames * channels);

        let available = match self.limit {
            Some(limit) => (limit.saturating_sub(self.position) as usize).min(frames),
            None => frames,
        };
        for frame in out.chunks_exact_mut(channels).take(available) {
            frame.fill(self.value());
            self.position += 1;
        }

        if self.limit.is_some_and(|limit| self.position >= limit) {
            // Tail is already zero; rewind so a repeat starts from the top
            self.finished = true;
            self.position = 0;
        }
    }

    fn reset(&mut self) {
        self.position = 0;
        self.finished = false;
    }

    fn is_finished(&self) -> bool {
        self.finished
    }
}
