//! Audio: stream graph, mixer and output drivers
//!
//! Sound data ([`SoundData`]) creates pull-based [`Stream`]s. The [`Mixer`]
//! owns one stream per registered sound and runs on the audio callback
//! context; the logic thread drives it through [`Sound`] handles that
//! enqueue intents on a lock-free ring buffer.
//!
//! - [`stream`] - the pull contract every node implements
//! - [`oscillator`], [`pcm`] - sources
//! - [`filter`], [`mix`] - nodes that own their inputs
//! - [`mixer`] - voices, spatialization, master gain
//! - [`output`] - headless and cpal drivers
//! - [`device`] - the [`Audio`] front end owned by the engine

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};

pub mod device;
pub mod filter;
pub mod metrics;
pub mod mix;
pub mod mixer;
pub mod mixing;
pub mod oscillator;
pub mod output;
pub mod pcm;
pub mod sound;
pub mod stream;

pub use device::Audio;
pub use filter::{Effect, FilterData, FilterStream};
pub use metrics::MixerMetrics;
pub use mix::{MixData, MixStream};
pub use mixer::{Mixer, MixerConfig, MixerHandle};
pub use oscillator::{OscillatorData, OscillatorStream, Waveform};
pub use output::AudioOutput;
pub use pcm::{PcmData, PcmStream};
pub use sound::{Listener, MAX_PITCH, Sound, SoundId, SoundParams, SoundState};
pub use stream::{SoundData, Stream};

/// Audio output preference.
///
/// Serialized as its lowercase name; parsing accepts any case and aliases.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum AudioDriver {
    /// Cpal if an output device opens, otherwise headless
    #[default]
    Default,
    /// Headless thread pulling at real-time pace
    Empty,
    /// Platform default host through cpal
    Cpal,
}

impl AudioDriver {
    pub fn as_str(&self) -> &'static str {
        match self {
            AudioDriver::Default => "default",
            AudioDriver::Empty => "empty",
            AudioDriver::Cpal => "cpal",
        }
    }

    pub fn all() -> &'static [AudioDriver] {
        &[AudioDriver::Default, AudioDriver::Empty, AudioDriver::Cpal]
    }
}

impl fmt::Display for AudioDriver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AudioDriver {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "default" | "auto" | "automatic" => Ok(AudioDriver::Default),
            "empty" | "null" => Ok(AudioDriver::Empty),
            "cpal" => Ok(AudioDriver::Cpal),
            other => Err(EngineError::config(format!("unknown audio driver '{}'", other))),
        }
    }
}

impl TryFrom<String> for AudioDriver {
    type Error = EngineError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<AudioDriver> for String {
    fn from(driver: AudioDriver) -> Self {
        driver.as_str().to_owned()
    }
}
