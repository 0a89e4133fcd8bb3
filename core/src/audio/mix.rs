//! Summing node over several inputs of one format

use std::sync::Arc;

use super::stream::{SoundData, Stream, zeroed};
use crate::error::{EngineError, Result};

/// Several sounds played as one.
#[derive(Clone)]
pub struct MixData {
    inputs: Vec<Arc<dyn SoundData>>,
    channels: u16,
    sample_rate: u32,
}

impl MixData {
    /// All inputs must share channel count and sample rate.
    pub fn new(inputs: Vec<Arc<dyn SoundData>>) -> Result<Self> {
        let Some(first) = inputs.first() else {
            return Err(EngineError::data("mix needs at least one input"));
        };
        let (channels, sample_rate) = (first.channels(), first.sample_rate());
        if let Some(bad) = inputs
            .iter()
            .position(|i| i.channels() != channels || i.sample_rate() != sample_rate)
        {
            return Err(EngineError::data(format!(
                "mix input {} is {}ch/{}Hz, expected {}ch/{}Hz",
                bad,
                inputs[bad].channels(),
                inputs[bad].sample_rate(),
                channels,
                sample_rate
            )));
        }
        Ok(Self {
            inputs,
            channels,
            sample_rate,
        })
    }

    pub fn len(&self) -> usize {
        self.inputs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inputs.is_empty()
    }
}

impl SoundData for MixData {
    fn channels(&self) -> u16 {
        self.channels
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn create_stream(&self) -> Box<dyn Stream> {
        Box::new(MixStream::new(
            self.inputs.iter().map(|i| i.create_stream()).collect(),
            self.channels,
            self.sample_rate,
        ))
    }
}

/// Sums its inputs. Finished once every input has finished since the last
/// reset.
pub struct MixStream {
    inputs: Vec<Box<dyn Stream>>,
    /// Inputs that finished, rewound and are now silent until reset
    done: Vec<bool>,
    channels: u16,
    sample_rate: u32,
    scratch: Vec<f32>,
}

impl MixStream {
    pub fn new(inputs: Vec<Box<dyn Stream>>, channels: u16, sample_rate: u32) -> Self {
        Self {
            done: vec![false; inputs.len()],
            inputs,
            channels,
            sample_rate,
            scratch: Vec::new(),
        }
    }
}

impl Stream for MixStream {
    fn channels(&self) -> u16 {
        self.channels
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn get_samples(&mut self, frames: usize, out: &mut Vec<f32>) {
        zeroed(out, frames * self.channels as usize);
        for (input, done) in self.inputs.iter_mut().zip(self.done.iter_mut()) {
            if *done {
                continue;
            }
            input.get_samples(frames, &mut self.scratch);
            for (acc, s) in out.iter_mut().zip(&self.scratch) {
                *acc += s;
            }
            *done = input.is_finished();
        }
    }

    fn reset(&mut self) {
        self.inputs.iter_mut().for_each(|i| i.reset());
        self.done.fill(false);
    }

    fn is_finished(&self) -> bool {
        self.done.iter().all(|d| *d)
    }
}
