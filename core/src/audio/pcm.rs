//! Pre-decoded sample buffers

use std::sync::Arc;

use super::stream::{SoundData, Stream, zeroed};
use crate::error::{EngineError, Result};

/// Interleaved `f32` samples handed in by an asset loader.
#[derive(Debug, Clone)]
pub struct PcmData {
    channels: u16,
    sample_rate: u32,
    samples: Arc<[f32]>,
}

impl PcmData {
    pub fn new(channels: u16, sample_rate: u32, samples: Vec<f32>) -> Result<Self> {
        if channels == 0 {
            return Err(EngineError::data("PCM data must have at least one channel"));
        }
        if sample_rate == 0 {
            return Err(EngineError::data("PCM sample rate must be non-zero"));
        }
        if samples.len() % channels as usize != 0 {
            return Err(EngineError::data(format!(
                "{} samples is not a whole number of {}-channel frames",
                samples.len(),
                channels
            )));
        }
        Ok(Self {
            channels,
            sample_rate,
            samples: samples.into(),
        })
    }

    /// Converts signed 16-bit samples to `f32`.
    pub fn from_i16(channels: u16, sample_rate: u32, samples: &[i16]) -> Result<Self> {
        Self::new(
            channels,
            sample_rate,
            samples.iter().map(|&s| s as f32 / 32768.0).collect(),
        )
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn frames(&self) -> usize {
        self.samples.len() / self.channels as usize
    }

    pub fn duration_secs(&self) -> f32 {
        self.frames() as f32 / self.sample_rate as f32
    }
}

impl SoundData for PcmData {
    fn channels(&self) -> u16 {
        self.channels
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn create_stream(&self) -> Box<dyn Stream> {
        Box::new(PcmStream::new(self.clone()))
    }
}

/// Plays a [`PcmData`] once per reset.
#[derive(Debug, Clone)]
pub struct PcmStream {
    data: PcmData,
    /// Next frame to read
    position: usize,
    finished: bool,
}

impl PcmStream {
    pub fn new(data: PcmData) -> Self {
        Self {
            data,
            position: 0,
            finished: false,
        }
    }
}

impl Stream for PcmStream {
    fn channels(&self) -> u16 {
        self.data.channels
    }

    fn sample_rate(&self) -> u32 {
        self.data.sample_rate
    }

    fn get_samples(&mut self, frames: usize, out: &mut Vec<f32>) {
        let channels = self.data.channels as usize;
        zeroed(out, frames * channels);

        let total = self.data.frames();
        let count = total.saturating_sub(self.position).min(frames);
        let start = self.position * channels;
        let end = start + count * channels;
        out[..count * channels].copy_from_slice(&self.data.samples[start..end]);
        self.position += count;

        if self.position >= total {
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
