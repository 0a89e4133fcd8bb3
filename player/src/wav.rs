//! WAVE loading through `hound`

use std::path::Path;

use anyhow::{Context, Result, bail};

use vesper_core::audio::PcmData;

/// Decodes a WAVE file to normalized `f32` PCM.
///
/// Integer files of 8 to 32 bits and 32-bit float files are accepted.
pub fn load(path: &Path) -> Result<PcmData> {
    let mut reader =
        hound::WavReader::open(path).with_context(|| format!("Failed to open WAV: {}", path.display()))?;
    let spec = reader.spec();

    let samples: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => {
            if spec.bits_per_sample != 32 {
                bail!("unsupported float WAV with {} bits", spec.bits_per_sample);
            }
            reader
                .samples::<f32>()
                .collect::<std::result::Result<_, _>>()
                .context("Failed to decode WAV samples")?
        }
        hound::SampleFormat::Int => {
            if !(8..=32).contains(&spec.bits_per_sample) {
                bail!("unsupported integer WAV with {} bits", spec.bits_per_sample);
            }
            let scale = 1.0 / (1i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|s| s as f32 * scale))
                .collect::<std::result::Result<_, _>>()
                .context("Failed to decode WAV samples")?
        }
    };

    let data = PcmData::new(spec.channels, spec.sample_rate, samples)
        .with_context(|| format!("Invalid PCM in {}", path.display()))?;
    tracing::info!(
        "Loaded {} ({} ch, {} Hz, {:.2}s)",
        path.display(),
        spec.channels,
        spec.sample_rate,
        data.duration_secs()
    );
    Ok(data)
}
