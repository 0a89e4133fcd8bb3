//! Frame loop driven by the command line

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use tracing::{debug, info};

use vesper_core::audio::{OscillatorData, SoundData};
use vesper_core::graphics::{BackendRegistry, ClearDesc, HeadlessWindow, NativeWindow};
use vesper_core::{Color, Engine, Settings, Size2};

use crate::Cli;
use crate::wav;

/// Frames between metric log lines.
const METRICS_INTERVAL: u64 = 60;

/// Resolves settings: `--config`, then the default location, then defaults.
pub fn load_settings(cli: &Cli) -> Result<Settings> {
    let mut settings = match cli.config.clone().or_else(Settings::default_path) {
        Some(path) => Settings::load(&path)
            .with_context(|| format!("Failed to load settings from {}", path.display()))?,
        None => Settings::default(),
    };

    if let Some(driver) = cli.graphics {
        settings.graphics.driver = driver;
    }
    if let Some(driver) = cli.audio {
        settings.audio.driver = driver;
    }
    settings.validate().context("Invalid settings")?;
    Ok(settings)
}

/// Every backend compiled into the player.
pub fn registry() -> BackendRegistry {
    let mut registry = BackendRegistry::new();
    vesper_opengl::register(&mut registry);
    vesper_d3d11::register(&mut registry);
    debug!("Available graphics drivers: {:?}", registry.available_drivers());
    registry
}

fn sound_data(cli: &Cli, settings: &Settings) -> Result<Arc<dyn SoundData>> {
    if let Some(path) = &cli.wav {
        return Ok(Arc::new(wav::load(path)?));
    }
    let seconds = cli.frames as f32 / cli.fps.max(1) as f32;
    let oscillator = OscillatorData::new(cli.waveform, cli.frequency)
        .with_amplitude(cli.amplitude.clamp(0.0, 1.0))
        .with_sample_rate(settings.audio.sample_rate)
        .with_channels(settings.audio.channels)
        .with_length(seconds);
    Ok(Arc::new(oscillator))
}

pub fn run(cli: &Cli) -> Result<()> {
    let settings = load_settings(cli)?;
    let size = Size2::new(settings.graphics.width, settings.graphics.height);
    let window: Arc<dyn NativeWindow> = Arc::new(HeadlessWindow::new(size, "Vesper"));

    let mut engine = Engine::new(settings.clone(), &registry(), window).context("Failed to start engine")?;
    info!(
        "Running {} frames at {} fps ({} graphics, {} audio)",
        cli.frames,
        cli.fps,
        engine.renderer().driver(),
        engine.audio().driver()
    );

    let data = sound_data(cli, &settings)?;
    engine.cache_mut().set_sound_data("player", data.clone());
    let mut sound = engine.audio().create_sound(data.as_ref());
    if !sound.play(cli.repeat) {
        tracing::warn!("Sound {} was not started", sound.id());
    }

    let frame_time = Duration::from_secs_f64(1.0 / cli.fps.max(1) as f64);
    let started = Instant::now();
    for frame in 0..cli.frames {
        let frame_start = Instant::now();

        let phase = (frame * 255 / cli.frames.max(1)) as u8;
        engine
            .renderer()
            .clear(ClearDesc::color(Color::rgba(phase, 24, 255 - phase, 255)));
        engine.end_frame();

        if (frame + 1) % METRICS_INTERVAL == 0 {
            let metrics = engine.audio().metrics();
            let stats = engine.renderer().stats();
            debug!(
                "frame {}: {} commands ({} failed), {} pulls, {} voices playing",
                frame + 1,
                stats.commands_executed,
                stats.commands_failed,
                metrics.pulls,
                metrics.playing
            );
        }

        if let Some(remaining) = frame_time.checked_sub(frame_start.elapsed()) {
            std::thread::sleep(remaining);
        }
    }

    sound.stop();
    engine.renderer().flush();
    let stats = engine.renderer().stats();
    info!(
        "Finished {} frames in {:.2}s ({} presented, {} commands failed)",
        engine.frame(),
        started.elapsed().as_secs_f32(),
        stats.frames,
        stats.commands_failed
    );
    engine.shutdown();
    Ok(())
}
