//! Vesper player - runs the engine without a native window
//!
//! # Usage
//!
//! ```bash
//! # One second of a 440 Hz sine on the best available drivers
//! vesper-player
//!
//! # Square wave, headless everything, 300 frames
//! vesper-player --graphics empty --audio empty --waveform square --frames 300
//!
//! # Play a WAVE file instead of the oscillator
//! vesper-player --wav assets/hit.wav
//! ```
//!
//! Settings come from `--config`, else `settings.toml` in the platform
//! config directory, else the defaults; command-line flags override them.

mod run;
mod wav;

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;

use vesper_core::audio::{AudioDriver, Waveform};
use vesper_core::graphics::GraphicsDriver;

/// Headless player for the Vesper runtime
#[derive(Parser, Debug)]
#[command(name = "vesper-player")]
#[command(about = "Runs a headless Vesper frame loop with audio")]
#[command(version)]
pub struct Cli {
    /// Settings file (default: settings.toml in the config directory)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Graphics driver: default, empty, opengl, direct3d11
    #[arg(short, long)]
    pub graphics: Option<GraphicsDriver>,

    /// Audio driver: default, empty, cpal
    #[arg(short, long)]
    pub audio: Option<AudioDriver>,

    /// Frames to run before exiting
    #[arg(short, long, default_value_t = 60)]
    pub frames: u64,

    /// Target frame rate
    #[arg(long, default_value_t = 60)]
    pub fps: u32,

    /// Oscillator waveform: sine, square, sawtooth, triangle
    #[arg(short, long, default_value = "sine")]
    pub waveform: Waveform,

    /// Oscillator frequency in Hz
    #[arg(long, default_value_t = 440.0)]
    pub frequency: f32,

    /// Oscillator amplitude (0.0-1.0)
    #[arg(long, default_value_t = 0.25)]
    pub amplitude: f32,

    /// WAVE file to play instead of the oscillator
    #[arg(long)]
    pub wav: Option<PathBuf>,

    /// Loop the sound until the last frame
    #[arg(long)]
    pub repeat: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    run::run(&cli)
}
