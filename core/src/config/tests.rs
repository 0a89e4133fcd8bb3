use super::*;

#[test]
fn test_defaults() {
    let settings = Settings::default();
    assert_eq!(settings.graphics.driver, GraphicsDriver::Default);
    assert_eq!(settings.graphics.width, 1280);
    assert_eq!(settings.graphics.height, 720);
    assert!(settings.graphics.vsync);
    assert_eq!(settings.audio.driver, AudioDriver::Default);
    assert_eq!(settings.audio.sample_rate, 44_100);
    assert_eq!(settings.audio.channels, 2);
    assert!(settings.validate().is_ok());
}

#[test]
fn test_partial_file_fills_defaults() {
    let settings = Settings::from_toml(
        r#"
        [graphics]
        driver = "OpenGL"
        vsync = false

        [audio]
        channels = 1
        "#,
    )
    .unwrap();

    assert_eq!(settings.graphics.driver, GraphicsDriver::OpenGL);
    assert!(!settings.graphics.vsync);
    assert_eq!(settings.graphics.width, 1280);
    assert_eq!(settings.audio.channels, 1);
    assert_eq!(settings.audio.sample_rate, 44_100);
}

#[test]
fn test_driver_names_match_command_line() {
    let settings = Settings::from_toml(
        r#"
        [graphics]
        driver = "direct3d11"

        [audio]
        driver = "cpal"
        "#,
    )
    .unwrap();
    assert_eq!(settings.graphics.driver, GraphicsDriver::Direct3D11);
    assert_eq!(settings.audio.driver, AudioDriver::Cpal);

    let settings = Settings::from_toml("[graphics]\ndriver = \"gl\"\n[audio]\ndriver = \"auto\"").unwrap();
    assert_eq!(settings.graphics.driver, GraphicsDriver::OpenGL);
    assert_eq!(settings.audio.driver, AudioDriver::Default);

    let mut settings = Settings::default();
    settings.graphics.driver = GraphicsDriver::OpenGL;
    let text = toml::to_string(&settings).unwrap();
    assert!(text.contains("driver = \"opengl\""), "{text}");

    let err = Settings::from_toml("[graphics]\ndriver = \"vulkan\"").unwrap_err();
    assert!(matches!(err, EngineError::Parse(_)));
}

#[test]
fn test_malformed_toml_is_parse_error() {
    let err = Settings::from_toml("[graphics\nwidth = ").unwrap_err();
    assert!(matches!(err, EngineError::Parse(_)));
}

#[test]
fn test_out_of_range_is_config_error() {
    let err = Settings::from_toml("[graphics]\nsample_count = 3").unwrap_err();
    assert!(matches!(err, EngineError::Config(_)));

    let err = Settings::from_toml("[audio]\nchannels = 0").unwrap_err();
    assert!(matches!(err, EngineError::Config(_)));

    let err = Settings::from_toml("[audio]\nmaster_gain = 9.0").unwrap_err();
    assert!(matches!(err, EngineError::Config(_)));
}

#[test]
fn test_missing_file_loads_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let settings = Settings::load(&dir.path().join("absent.toml")).unwrap();
    assert_eq!(settings, Settings::default());
}

#[test]
fn test_save_then_load() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join(SETTINGS_FILE);

    let mut settings = Settings::default();
    settings.graphics.driver = GraphicsDriver::Empty;
    settings.graphics.sample_count = 4;
    settings.audio.master_gain = 0.5;
    settings.save(&path).unwrap();

    let loaded = Settings::load(&path).unwrap();
    assert_eq!(loaded, settings);
}

#[test]
fn test_device_options_follow_settings() {
    let mut settings = GraphicsSettings::default();
    settings.width = 640;
    settings.height = 480;
    settings.depth = true;
    let options = settings.device_options();
    assert_eq!(options.size, Size2::new(640, 480));
    assert!(options.depth);
    assert_eq!(options.execution_mode, ExecutionMode::Threaded);
}
