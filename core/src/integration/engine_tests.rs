//! Engine context built from settings

use std::sync::Arc;

use crate::audio::{AudioDriver, OscillatorData, SoundData, Waveform};
use crate::config::Settings;
use crate::engine::Engine;
use crate::error::EngineError;
use crate::graphics::{BackendRegistry, BlendStateDesc, GraphicsDriver, HeadlessWindow, NativeWindow};
use crate::types::Size2;

fn headless_settings() -> Settings {
    let mut settings = Settings::default();
    settings.graphics.driver = GraphicsDriver::Empty;
    settings.graphics.width = 320;
    settings.graphics.height = 200;
    settings.audio.driver = AudioDriver::Empty;
    settings
}

fn window() -> Arc<dyn NativeWindow> {
    Arc::new(HeadlessWindow::new(Size2::new(320, 200), "engine test"))
}

#[test]
fn test_engine_runs_frames_headless() {
    let registry = BackendRegistry::new();
    let mut engine = Engine::new(headless_settings(), &registry, window()).unwrap();
    assert_eq!(engine.renderer().driver(), GraphicsDriver::Empty);
    assert_eq!(engine.audio().driver(), AudioDriver::Empty);
    assert_eq!(engine.renderer().size(), Size2::new(320, 200));

    for _ in 0..5 {
        engine.end_frame();
    }
    engine.renderer().flush();

    assert_eq!(engine.frame(), 5);
    assert_eq!(engine.renderer().stats().frames, 5);
}

#[test]
fn test_default_graphics_driver_falls_back_to_empty() {
    let mut settings = headless_settings();
    settings.graphics.driver = GraphicsDriver::Default;
    let engine = Engine::new(settings, &BackendRegistry::new(), window()).unwrap();
    assert_eq!(engine.renderer().driver(), GraphicsDriver::Empty);
}

#[test]
fn test_invalid_settings_rejected_before_devices_open() {
    let mut settings = headless_settings();
    settings.audio.channels = 0;
    let err = Engine::new(settings, &BackendRegistry::new(), window()).err().unwrap();
    assert!(matches!(err, EngineError::Config(_)));
}

#[test]
fn test_unavailable_driver_named_in_error() {
    let mut settings = headless_settings();
    settings.graphics.driver = GraphicsDriver::OpenGL;
    match Engine::new(settings, &BackendRegistry::new(), window()) {
        Err(EngineError::System(msg)) => assert!(msg.contains("opengl"), "{msg}"),
        Err(other) => panic!("expected system error, got {other:?}"),
        Ok(_) => panic!("opengl is not registered"),
    }
}

#[test]
fn test_cache_and_sounds_through_engine() {
    let mut engine = Engine::new(headless_settings(), &BackendRegistry::new(), window()).unwrap();

    let blend = engine.renderer().create_blend_state(BlendStateDesc::additive());
    let blend_id = engine.cache_mut().set_blend_state("add", blend).id();
    let beep: Arc<dyn SoundData> = Arc::new(OscillatorData::new(Waveform::Sine, 660.0).with_length(0.05));
    engine.cache_mut().set_sound_data("beep", beep);

    let data = engine.cache().sound_data("beep").unwrap();
    let mut sound = engine.audio().create_sound(data.as_ref());
    assert!(sound.play(false));

    engine.renderer().flush();
    assert!(engine.renderer().device().is_live(blend_id));

    engine.cache_mut().release_all();
    engine.renderer().flush();
    assert!(!engine.renderer().device().is_live(blend_id));
}

#[test]
fn test_resize_updates_settings() {
    let mut engine = Engine::new(headless_settings(), &BackendRegistry::new(), window()).unwrap();
    engine.resize(Size2::new(800, 600));
    assert_eq!(engine.settings().graphics.width, 800);
    assert_eq!(engine.renderer().size(), Size2::new(800, 600));
}
