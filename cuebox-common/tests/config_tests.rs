//! Integration tests for configuration loading and graceful degradation
//!
//! - Missing config files SHALL NOT cause failure (defaults + warning)
//! - Malformed config files are reported
//! - Resolution priority: explicit path, environment variable, platform default
//!
//! Tests that manipulate CUEBOX_CONFIG are marked #[serial] so they do not
//! race each other.

use cuebox_common::config::{resolve_config_path, PlayState, TomlConfig, CONFIG_ENV_VAR};
use cuebox_common::transition::TransitionKind;
use cuebox_common::Error;
use serial_test::serial;
use std::env;
use std::io::Write;
use std::path::PathBuf;

fn write_config(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

#[test]
fn test_missing_file_uses_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("does-not-exist.toml");

    let config = TomlConfig::load_from(&path).unwrap();
    assert_eq!(config, TomlConfig::default());
}

#[test]
fn test_full_document() {
    let file = write_config(
        r#"
        [logging]
        level = "debug"

        [audio]
        audio_state = "disabled"
        music_state = "mute"
        recycle_on_complete = false
        default_output = "sfx"
        rng_seed = 42

        [audio.global_variance]
        enabled = true
        volume = 0.1
        pitch = 0.2

        [audio.pool]
        prewarm = 3

        [audio.music]
        volume = 0.6

        [audio.music.default_transition]
        kind = "cross_fade"
        duration = 3.0
        "#,
    );

    let config = TomlConfig::load_from(file.path()).unwrap();
    assert_eq!(config.logging.level, "debug");
    assert_eq!(config.audio.audio_state, PlayState::Disabled);
    assert_eq!(config.audio.music_state, PlayState::Mute);
    assert!(!config.audio.recycle_on_complete);
    assert_eq!(config.audio.default_output.as_deref(), Some("sfx"));
    assert_eq!(config.audio.rng_seed, Some(42));
    assert!(config.audio.global_variance.enabled);
    assert_eq!(config.audio.pool.prewarm, 3);
    assert!((config.audio.music.volume - 0.6).abs() < f32::EPSILON);
    assert_eq!(
        config.audio.music.default_transition.kind,
        TransitionKind::CrossFade
    );
}

#[test]
fn test_malformed_file_is_reported() {
    let file = write_config("[audio]\naudio_state = \"loud\"\n");
    let err = TomlConfig::load_from(file.path()).unwrap_err();
    assert!(matches!(err, Error::Config(_)), "got {:?}", err);
}

#[test]
#[serial]
fn test_cli_path_beats_environment() {
    env::set_var(CONFIG_ENV_VAR, "/tmp/cuebox-from-env.toml");
    let cli = PathBuf::from("/tmp/cuebox-from-cli.toml");

    let resolved = resolve_config_path(Some(&cli));
    assert_eq!(resolved, Some(cli));

    env::remove_var(CONFIG_ENV_VAR);
}

#[test]
#[serial]
fn test_environment_variable_used_without_cli() {
    env::set_var(CONFIG_ENV_VAR, "/tmp/cuebox-from-env.toml");

    let resolved = resolve_config_path(None);
    assert_eq!(resolved, Some(PathBuf::from("/tmp/cuebox-from-env.toml")));

    env::remove_var(CONFIG_ENV_VAR);
}

#[test]
#[serial]
fn test_load_through_environment_variable() {
    let file = write_config("[audio]\nmusic_state = \"disabled\"\n");
    env::set_var(CONFIG_ENV_VAR, file.path());

    let config = TomlConfig::load(None).unwrap();
    assert_eq!(config.audio.music_state, PlayState::Disabled);

    env::remove_var(CONFIG_ENV_VAR);
}
