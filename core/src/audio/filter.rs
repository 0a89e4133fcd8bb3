//! In-place effects over an owned upstream stream

use std::f32::consts::TAU;
use std::sync::Arc;

use super::stream::{SoundData, Stream};

/// Effect applied by a [`FilterStream`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Effect {
    /// Linear gain
    Gain(f32),
    /// One-pole low-pass at `cutoff` Hz
    LowPass { cutoff: f32 },
    /// Feedback echo
    Delay { seconds: f32, feedback: f32, mix: f32 },
}

/// Per-stream effect memory, sized when the stream is created.
#[derive(Debug, Clone)]
enum EffectState {
    Stateless,
    LowPass { alpha: f32, last: Vec<f32> },
    Delay { line: Vec<f32>, cursor: usize },
}

impl EffectState {
    fn new(effect: &Effect, channels: usize, sample_rate: u32) -> Self {
        match *effect {
            Effect::Gain(_) => EffectState::Stateless,
            Effect::LowPass { cutoff } => EffectState::LowPass {
                alpha: 1.0 - (-TAU * cutoff.max(0.0) / sample_rate as f32).exp(),
                last: vec![0.0; channels],
            },
            Effect::Delay { seconds, .. } => {
                let frames = ((seconds.max(0.0) * sample_rate as f32).round() as usize).max(1);
                EffectState::Delay {
                    line: vec![0.0; frames * channels],
                    cursor: 0,
                }
            }
        }
    }

    fn clear(&mut self) {
        match self {
            EffectState::Stateless => {}
            EffectState::LowPass { last, .. } => last.fill(0.0),
            EffectState::Delay { line, cursor } => {
                line.fill(0.0);
                *cursor = 0;
            }
        }
    }
}

/// Filter description over another sound.
#[derive(Clone)]
pub struct FilterData {
    input: Arc<dyn SoundData>,
    effect: Effect,
}

impl FilterData {
    pub fn new(input: Arc<dyn SoundData>, effect: Effect) -> Self {
        Self { input, effect }
    }

    pub fn effect(&self) -> Effect {
        self.effect
    }
}

impl SoundData for FilterData {
    fn channels(&self) -> u16 {
        self.input.channels()
    }

    fn sample_rate(&self) -> u32 {
        self.input.sample_rate()
    }

    fn create_stream(&self) -> Box<dyn Stream> {
        Box::new(FilterStream::new(self.input.create_stream(), self.effect))
    }
}

/// Pulls its upstream, then transforms the block in place.
pub struct FilterStream {
    upstream: Box<dyn Stream>,
    effect: Effect,
    state: EffectState,
}

impl FilterStream {
    pub fn new(upstream: Box<dyn Stream>, effect: Effect) -> Self {
        let state = EffectState::new(&effect, upstream.channels() as usize, upstream.sample_rate());
        Self {
            upstream,
            effect,
            state,
        }
    }

    pub fn effect(&self) -> Effect {
        self.effect
    }
}

impl Stream for FilterStream {
    fn channels(&self) -> u16 {
        self.upstream.channels()
    }

    fn sample_rate(&self) -> u32 {
        self.upstream.sample_rate()
    }

    fn get_samples(&mut self, frames: usize, out: &mut Vec<f32>) {
        self.upstream.get_samples(frames, out);
        let channels = self.upstream.channels().max(1) as usize;

        match (&self.effect, &mut self.state) {
            (Effect::Gain(gain), _) => out.iter_mut().for_each(|s| *s *= gain),
            (Effect::LowPass { .. }, EffectState::LowPass { alpha, last }) => {
                for frame in out.chunks_exact_mut(channels) {
                    for (sample, y) in frame.iter_mut().zip(last.iter_mut()) {
                        *y += *alpha * (*sample - *y);
                        *sample = *y;
                    }
                }
            }
            (Effect::Delay { feedback, mix, .. }, EffectState::Delay { line, cursor }) => {
                for sample in out.iter_mut() {
                    let delayed = line[*cursor];
                    line[*cursor] = *sample + delayed * feedback;
                    *sample += delayed * mix;
                    *cursor = (*cursor + 1) % line.len();
                }
            }
            _ => {}
        }
    }

    fn reset(&mut self) {
        self.upstream.reset();
        self.state.clear();
    }

    fn is_finished(&self) -> bool {
        self.upstream.is_finished()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::pcm::PcmData;

    fn impulse(len: usize) -> Arc<dyn SoundData> {
        let mut samples = vec![0.0; len];
        samples[0] = 1.0;
        Arc::new(PcmData::new(1, 1000, samples).unwrap())
    }

    #[test]
    fn test_gain_scales() {
        let data = PcmData::new(1, 1000, vec![0.5, -0.25]).unwrap();
        let filter = FilterData::new(Arc::new(data), Effect::Gain(2.0));
        let mut stream = filter.create_stream();
        let mut out = Vec::new();
        stream.get_samples(3, &mut out);
        assert_eq!(out, vec![1.0, -0.5, 0.0]);
        assert!(stream.is_finished());
    }

    #[test]
    fn test_low_pass_smooths_step() {
        let data = PcmData::new(1, 1000, vec![1.0; 64]).unwrap();
        let filter = FilterData::new(Arc::new(data), Effect::LowPass { cutoff: 50.0 });
        let mut stream = filter.create_stream();
        let mut out = Vec::new();
        stream.get_samples(64, &mut out);

        assert!(out[0] > 0.0 && out[0] < 1.0);
        assert!(out.windows(2).all(|w| w[1] >= w[0]));
        assert!(out[63] > 0.9);
    }

    #[test]
    fn test_delay_echoes_after_its_time() {
        let filter = FilterData::new(
            impulse(32),
            Effect::Delay {
                seconds: 0.01,
                feedback: 0.5,
                mix: 1.0,
            },
        );
        let mut stream = filter.create_stream();
        let mut out = Vec::new();
        stream.get_samples(32, &mut out);

        assert_eq!(out[0], 1.0);
        assert_eq!(out[10], 1.0);
        assert_eq!(out[20], 0.5);
        assert_eq!(out[5], 0.0);
    }

    #[test]
    fn test_reset_clears_effect_memory() {
        let filter = FilterData::new(
            impulse(4),
            Effect::Delay {
                seconds: 0.002,
                feedback: 0.0,
                mix: 1.0,
            },
        );
        let mut stream = filter.create_stream();
        let mut first = Vec::new();
        stream.get_samples(4, &mut first);
        stream.reset();
        let mut second = Vec::new();
        stream.get_samples(4, &mut second);
        assert_eq!(first, second);
    }
}
