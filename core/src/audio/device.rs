//! Audio front end owned by the engine

use tracing::{debug, warn};

use super::AudioDriver;
use super::metrics::MixerMetrics;
use super::mixer::{Mixer, MixerConfig, MixerHandle};
use super::output::AudioOutput;
use super::sound::{Listener, Sound};
use super::stream::SoundData;
use crate::config::AudioSettings;
use crate::error::Result;

/// Open audio output plus the logic-side mixer handle.
pub struct Audio {
    handle: MixerHandle,
    output: AudioOutput,
    listener: Listener,
    master_gain: f32,
}

impl Audio {
    /// Opens the driver named in `settings`.
    ///
    /// [`AudioDriver::Default`] tries cpal and falls back to the headless
    /// driver. An explicitly requested driver that fails to open is an
    /// error naming it.
    pub fn new(settings: &AudioSettings) -> Result<Self> {
        let config = MixerConfig::from(settings);
        let buffer_frames = settings.buffer_frames as usize;

        let (handle, output) = match settings.driver {
            AudioDriver::Default => match open(AudioDriver::Cpal, config, buffer_frames) {
                Ok(opened) => opened,
                Err(e) => {
                    warn!("{}; falling back to the headless audio driver", e);
                    open(AudioDriver::Empty, config, buffer_frames)?
                }
            },
            driver => open(driver, config, buffer_frames)?,
        };

        Ok(Self {
            handle,
            output,
            listener: Listener::default(),
            master_gain: config.master_gain,
        })
    }

    pub fn driver(&self) -> AudioDriver {
        self.output.driver()
    }

    pub fn sample_rate(&self) -> u32 {
        self.output.sample_rate()
    }

    pub fn channels(&self) -> u16 {
        self.output.channels()
    }

    pub fn is_alive(&self) -> bool {
        self.output.is_alive()
    }

    /// Registers a new stopped sound playing `data`.
    pub fn create_sound(&self, data: &dyn SoundData) -> Sound {
        self.handle.create_sound(data)
    }

    pub fn listener(&self) -> &Listener {
        &self.listener
    }

    pub fn set_listener(&mut self, listener: Listener) {
        if self.listener != listener {
            self.listener = listener;
            self.handle.set_listener(listener);
        }
    }

    pub fn master_gain(&self) -> f32 {
        self.master_gain
    }

    pub fn set_master_gain(&mut self, gain: f32) {
        self.master_gain = gain.max(0.0);
        self.handle.set_master_gain(self.master_gain);
    }

    /// Per-frame housekeeping: frees voices the mixer has let go of.
    pub fn update(&mut self) -> usize {
        let waiting = self.handle.retry_intents();
        if waiting > 0 {
            debug!("{} audio intents still deferred", waiting);
        }
        self.handle.collect_retired()
    }

    pub fn metrics(&self) -> MixerMetrics {
        self.handle.metrics()
    }
}

fn open(driver: AudioDriver, config: MixerConfig, buffer_frames: usize) -> Result<(MixerHandle, AudioOutput)> {
    let (mixer, handle) = Mixer::new(config);
    let output = AudioOutput::open(driver, mixer, buffer_frames)?;
    Ok((handle, output))
}
