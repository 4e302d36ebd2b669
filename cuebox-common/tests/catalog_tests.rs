//! Integration tests for catalog loading and validation

use cuebox_common::catalog::{Catalog, GroupPlayMode};
use cuebox_common::transition::TransitionKind;
use cuebox_common::Error;
use std::io::Write;

const CATALOG: &str = r#"
[[clips]]
id = "step_1"
asset = "sfx/step_1.wav"
length = 0.4

[[clips]]
id = "step_2"
asset = "sfx/step_2.wav"
length = 0.45
volume = 0.8

[[clips]]
id = "theme"
key = "MainTheme"
asset = "music/theme.ogg"
length = 120.0
dynamic_start = { threshold = 0.02, detected = 1.5 }

[[clips]]
id = "battle"
asset = "music/battle.ogg"
length = 95.0

[[groups]]
id = "footsteps"
name = "Footsteps"
clips = ["step_1", "step_2"]
mode = "sequential"

[[playlists]]
id = "level_1"
loop = true
shuffle = false
transition = { kind = "cross_fade", duration = 2.0 }

[[playlists.tracks]]
clip = "theme"
start_time = 1.5
end_time = 90.0

[[playlists.tracks]]
clip = "battle"
"#;

#[test]
fn test_load_catalog_from_disk() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(CATALOG.as_bytes()).unwrap();

    let catalog = Catalog::load(file.path()).unwrap();
    assert_eq!(catalog.clip_count(), 4);
    assert_eq!(catalog.group_count(), 1);
    assert_eq!(catalog.playlist_count(), 1);

    let step = catalog.try_get_clip("step_2").unwrap();
    assert!((step.volume - 0.8).abs() < f32::EPSILON);
    assert!((step.pitch - 1.0).abs() < f32::EPSILON);

    let theme = catalog.try_get_clip("MainTheme").unwrap();
    assert_eq!(theme.id, "theme");
    assert!((theme.dynamic_start_offset() - 1.5).abs() < f32::EPSILON);

    let group = catalog.get_group("footsteps").unwrap();
    assert_eq!(group.mode, GroupPlayMode::Sequential);
    assert!(catalog.is_group_name_valid("footsteps"));

    let playlist = catalog.get_track_list("level_1").unwrap();
    assert!(playlist.looping);
    assert_eq!(playlist.tracks.len(), 2);
    assert_eq!(playlist.tracks[1].end_time, None);
    assert_eq!(
        playlist.transition.map(|t| t.kind),
        Some(TransitionKind::CrossFade)
    );
}

#[test]
fn test_duplicate_group_names_rejected_on_load() {
    let doc = CATALOG.replace(
        "[[playlists]]",
        "[[groups]]\nid = \"steps_again\"\nname = \"Footsteps\"\nclips = [\"step_1\"]\n\n[[playlists]]",
    );
    let err = Catalog::from_toml_str(&doc).unwrap_err();
    match err {
        Error::InvalidInput(msg) => assert!(msg.contains("duplicate name")),
        other => panic!("unexpected error {:?}", other),
    }
}

#[test]
fn test_dangling_clip_reference_rejected() {
    let doc = r#"
[[groups]]
id = "ghosts"
name = "Ghosts"
clips = ["boo"]
"#;
    assert!(matches!(
        Catalog::from_toml_str(doc),
        Err(Error::InvalidInput(_))
    ));
}

#[test]
fn test_missing_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = Catalog::load(&dir.path().join("none.toml")).unwrap_err();
    assert!(matches!(err, Error::Io(_)));
}

#[test]
fn test_syntax_error_is_toml_error() {
    let err = Catalog::from_toml_str("[[clips]\nid = ").unwrap_err();
    assert!(matches!(err, Error::Toml(_)));
}
