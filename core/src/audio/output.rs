//! Audio output drivers
//!
//! Each driver owns the [`Mixer`] and pulls from it on its own context:
//! the cpal data callback, or a headless `audio` thread that pulls one
//! buffer per buffer-duration so time advances as it would on hardware.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use tracing::{debug, error, info};

use super::AudioDriver;
use super::mixer::Mixer;
use crate::error::{EngineError, Result};

/// An open output pulling from a mixer until dropped.
pub struct AudioOutput {
    driver: AudioDriver,
    sample_rate: u32,
    channels: u16,
    inner: Inner,
}

enum Inner {
    Empty(EmptyOutput),
    Cpal(CpalOutput),
}

impl AudioOutput {
    /// Opens `driver`, which must be concrete, and hands it the mixer.
    pub fn open(driver: AudioDriver, mixer: Mixer, buffer_frames: usize) -> Result<Self> {
        let sample_rate = mixer.sample_rate();
        let channels = mixer.channels();
        let inner = match driver {
            AudioDriver::Empty => Inner::Empty(EmptyOutput::spawn(mixer, buffer_frames)?),
            AudioDriver::Cpal => Inner::Cpal(
                CpalOutput::open(mixer)
                    .map_err(|e| EngineError::system(format!("{}: {}", driver, e)))?,
            ),
            AudioDriver::Default => {
                return Err(EngineError::config("default audio driver must be resolved before opening"));
            }
        };
        info!("{} audio output open ({}Hz, {}ch)", driver, sample_rate, channels);
        Ok(Self {
            driver,
            sample_rate,
            channels,
            inner,
        })
    }

    pub fn driver(&self) -> AudioDriver {
        self.driver
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    /// Whether the output is still pulling.
    pub fn is_alive(&self) -> bool {
        match &self.inner {
            Inner::Empty(output) => output.is_alive(),
            Inner::Cpal(_) => true,
        }
    }
}

/// Headless output: a thread pulling at real-time pace into a scratch buffer.
struct EmptyOutput {
    running: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl EmptyOutput {
    fn spawn(mut mixer: Mixer, buffer_frames: usize) -> Result<Self> {
        let buffer_frames = buffer_frames.max(1);
        let period = Duration::from_secs_f64(buffer_frames as f64 / mixer.sample_rate() as f64);
        let running = Arc::new(AtomicBool::new(true));
        let flag = Arc::clone(&running);

        let thread = thread::Builder::new()
            .name("audio".into())
            .spawn(move || {
                debug!("Headless audio thread started ({:?} per pull)", period);
                let mut buffer = vec![0.0f32; buffer_frames * mixer.channels() as usize];
                let mut deadline = Instant::now();
                while flag.load(Ordering::Acquire) {
                    mixer.render(&mut buffer);
                    deadline += period;
                    let now = Instant::now();
                    if deadline > now {
                        thread::sleep(deadline - now);
                    } else {
                        // Fell behind; don't try to catch up in a burst
                        deadline = now;
                    }
                }
                debug!("Headless audio thread finished");
            })
            .map_err(|e| EngineError::system(format!("failed to spawn audio thread: {}", e)))?;

        Ok(Self {
            running,
            thread: Some(thread),
        })
    }

    fn is_alive(&self) -> bool {
        self.thread.as_ref().is_some_and(|t| !t.is_finished())
    }
}

impl Drop for EmptyOutput {
    fn drop(&mut self) {
        self.running.store(false, Ordering::Release);
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                error!("Headless audio thread panicked");
            }
        }
    }
}

/// Platform output through the default cpal host.
struct CpalOutput {
    /// Kept alive for the duration
    _stream: cpal::Stream,
}

impl CpalOutput {
    fn open(mixer: Mixer) -> std::result::Result<Self, String> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| "no audio output device available".to_string())?;
        let default = device
            .default_output_config()
            .map_err(|e| format!("failed to get default output config: {}", e))?;

        let config = cpal::StreamConfig {
            channels: mixer.channels(),
            sample_rate: cpal::SampleRate(mixer.sample_rate()),
            buffer_size: cpal::BufferSize::Default,
        };

        let stream = match default.sample_format() {
            cpal::SampleFormat::F32 => {
                let mut mixer = mixer;
                device
                    .build_output_stream(
                        &config,
                        move |data: &mut [f32], _: &cpal::OutputCallbackInfo| mixer.render(data),
                        |err| error!("Audio stream error: {}", err),
                        None,
                    )
                    .map_err(|e| format!("failed to build audio stream: {}", e))?
            }
            cpal::SampleFormat::I16 => build_converting::<i16>(&device, &config, mixer)?,
            cpal::SampleFormat::U16 => build_converting::<u16>(&device, &config, mixer)?,
            other => return Err(format!("unsupported sample format: {:?}", other)),
        };

        stream
            .play()
            .map_err(|e| format!("failed to play audio stream: {}", e))?;
        debug!("cpal audio stream started at {}Hz", config.sample_rate.0);

        Ok(Self { _stream: stream })
    }
}

/// Stream for integer device formats, mixing into an `f32` scratch buffer.
fn build_converting<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    mut mixer: Mixer,
) -> std::result::Result<cpal::Stream, String>
where
    T: cpal::SizedSample + cpal::FromSample<f32>,
{
    // Grows at most once per larger callback size
    let mut scratch: Vec<f32> = vec![0.0; 4096];
    device
        .build_output_stream(
            config,
            move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                if scratch.len() < data.len() {
                    scratch.resize(data.len(), 0.0);
                }
                let scratch = &mut scratch[..data.len()];
                mixer.render(scratch);
                for (out, &sample) in data.iter_mut().zip(scratch.iter()) {
                    *out = T::from_sample(sample);
                }
            },
            |err| error!("Audio stream error: {}", err),
            None,
        )
        .map_err(|e| format!("failed to build audio stream: {}", e))
}
