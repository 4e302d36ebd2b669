//! Audio library catalog
//!
//! Read-only lookup tables of clips, groups and playlists consumed by the
//! player. Descriptors are immutable once loaded and are handed out behind
//! `Arc` so playback entities reference them without owning them.
//!
//! The on-disk format is TOML:
//!
//! ```toml
//! [[clips]]
//! id = "ui_click"
//! asset = "sfx/ui/click.wav"
//! length = 0.25
//!
//! [[groups]]
//! id = "footsteps"
//! name = "Footsteps"
//! clips = ["step_1", "step_2"]
//! mode = "random"
//!
//! [[playlists]]
//! id = "level_1"
//! loop = true
//! [[playlists.tracks]]
//! clip = "theme"
//! start_time = 0.0
//! end_time = 90.0
//! ```

use crate::transition::TransitionSpec;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, warn};

/// Tolerance when comparing track bounds against clip lengths
const TIME_EPSILON: f32 = 1e-4;

/// Automatic lead-in skip for a clip
///
/// `detected` comes from silence analysis against `threshold`; `manual`
/// overrides it when set.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DynamicStartTime {
    #[serde(default)]
    pub threshold: f32,
    #[serde(default)]
    pub detected: f32,
    #[serde(default)]
    pub manual: Option<f32>,
}

impl DynamicStartTime {
    /// Seconds skipped at the head of the clip
    pub fn offset(&self) -> f32 {
        self.manual.unwrap_or(self.detected).max(0.0)
    }
}

/// A single playable sound asset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClipDescriptor {
    /// Unique identity
    pub id: String,

    /// Display key; falls back to `id` when empty
    #[serde(default)]
    pub key: String,

    /// Backend asset handle (path, bank entry, ...)
    pub asset: String,

    /// Clip length in seconds
    pub length: f32,

    /// Default volume (0.0-1.0)
    #[serde(default = "default_volume")]
    pub volume: f32,

    /// Default pitch (-3.0-3.0)
    #[serde(default = "default_pitch")]
    pub pitch: f32,

    #[serde(default)]
    pub dynamic_start: Option<DynamicStartTime>,

    #[serde(default)]
    pub category: Option<String>,

    #[serde(default)]
    pub tags: Vec<String>,
}

fn default_volume() -> f32 {
    1.0
}

fn default_pitch() -> f32 {
    1.0
}

/// Clamp a loaded clip field into `[min, max]`; NaN falls back to `fallback`
fn clamp_field(clip: &str, field: &str, value: f32, min: f32, max: f32, fallback: f32) -> f32 {
    let clamped = if value.is_nan() {
        fallback
    } else {
        value.clamp(min, max)
    };
    if clamped != value {
        warn!(
            "Clip '{}' {} {} out of range, using {}",
            clip, field, value, clamped
        );
    }
    clamped
}

impl ClipDescriptor {
    pub fn new(id: impl Into<String>, asset: impl Into<String>, length: f32) -> Self {
        let id = id.into();
        Self {
            key: id.clone(),
            id,
            asset: asset.into(),
            length: length.max(0.0),
            volume: default_volume(),
            pitch: default_pitch(),
            dynamic_start: None,
            category: None,
            tags: Vec::new(),
        }
    }

    pub fn with_volume(mut self, volume: f32) -> Self {
        self.volume = volume.clamp(0.0, 1.0);
        self
    }

    pub fn with_pitch(mut self, pitch: f32) -> Self {
        self.pitch = pitch.clamp(-3.0, 3.0);
        self
    }

    pub fn with_dynamic_start(mut self, detected: f32) -> Self {
        self.dynamic_start = Some(DynamicStartTime {
            threshold: 0.0,
            detected,
            manual: None,
        });
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    /// Lead-in skip in seconds, 0.0 when the clip has none
    pub fn dynamic_start_offset(&self) -> f32 {
        self.dynamic_start
            .map(|d| d.offset().min(self.length))
            .unwrap_or(0.0)
    }

    /// Display key, never empty
    pub fn display_key(&self) -> &str {
        if self.key.is_empty() {
            &self.id
        } else {
            &self.key
        }
    }
}

/// Selection policy for a group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum GroupPlayMode {
    /// One member chosen uniformly at random per turn
    #[default]
    Random,
    /// Members in order, one per turn, wrapping
    Sequential,
    /// Every member at once
    Combined,
}

impl std::fmt::Display for GroupPlayMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GroupPlayMode::Random => write!(f, "random"),
            GroupPlayMode::Sequential => write!(f, "sequential"),
            GroupPlayMode::Combined => write!(f, "combined"),
        }
    }
}

/// A named set of clips with a selection policy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupDescriptor {
    pub id: String,
    pub name: String,
    /// Member clip ids, in play order for `Sequential`
    pub clips: Vec<String>,
    #[serde(default)]
    pub mode: GroupPlayMode,
    /// Random mode never repeats the previous pick
    #[serde(default)]
    pub avoid_repeat: bool,
}

impl GroupDescriptor {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        clips: Vec<String>,
        mode: GroupPlayMode,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            clips,
            mode,
            avoid_repeat: false,
        }
    }

    pub fn with_avoid_repeat(mut self, avoid_repeat: bool) -> Self {
        self.avoid_repeat = avoid_repeat;
        self
    }
}

/// One entry of a playlist
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackEntry {
    pub clip: String,
    #[serde(default)]
    pub start_time: f32,
    /// End of the track in clip time; the clip length when absent
    #[serde(default)]
    pub end_time: Option<f32>,
}

impl TrackEntry {
    pub fn new(clip: impl Into<String>, start_time: f32, end_time: Option<f32>) -> Self {
        Self {
            clip: clip.into(),
            start_time,
            end_time,
        }
    }

    /// End time resolved against the clip length
    pub fn effective_end(&self, clip_length: f32) -> f32 {
        self.end_time.unwrap_or(clip_length).min(clip_length)
    }
}

/// An ordered set of music tracks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaylistDescriptor {
    pub id: String,
    #[serde(default)]
    pub key: String,
    pub tracks: Vec<TrackEntry>,
    #[serde(default, rename = "loop")]
    pub looping: bool,
    #[serde(default)]
    pub shuffle: bool,
    /// Overrides the configured default transition between tracks
    #[serde(default)]
    pub transition: Option<TransitionSpec>,
}

impl PlaylistDescriptor {
    pub fn new(id: impl Into<String>, tracks: Vec<TrackEntry>) -> Self {
        let id = id.into();
        Self {
            key: id.clone(),
            id,
            tracks,
            looping: false,
            shuffle: false,
            transition: None,
        }
    }
}

/// Serialized catalog document
#[derive(Debug, Default, Deserialize)]
struct CatalogFile {
    #[serde(default)]
    clips: Vec<ClipDescriptor>,
    #[serde(default)]
    groups: Vec<GroupDescriptor>,
    #[serde(default)]
    playlists: Vec<PlaylistDescriptor>,
}

/// Lookup tables for clips, groups and playlists
#[derive(Debug, Default, Clone)]
pub struct Catalog {
    clips: HashMap<String, Arc<ClipDescriptor>>,
    clip_keys: HashMap<String, String>,
    groups: HashMap<String, Arc<GroupDescriptor>>,
    playlists: HashMap<String, Arc<PlaylistDescriptor>>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse and validate a TOML catalog document
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let file: CatalogFile = toml::from_str(content)?;
        let mut catalog = Catalog::new();
        for clip in file.clips {
            catalog.insert_clip(clip);
        }
        for group in file.groups {
            catalog.insert_group(group);
        }
        for playlist in file.playlists {
            catalog.insert_playlist(playlist);
        }

        let problems = catalog.validate();
        if !problems.is_empty() {
            return Err(Error::InvalidInput(problems.join("; ")));
        }

        debug!(
            "Catalog loaded: {} clips, {} groups, {} playlists",
            catalog.clips.len(),
            catalog.groups.len(),
            catalog.playlists.len()
        );
        Ok(catalog)
    }

    /// Load a catalog file from disk
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Insert or replace a clip, returning the previous descriptor
    ///
    /// Out of range length, volume and pitch are clamped the same way the
    /// builder methods clamp them.
    pub fn insert_clip(&mut self, mut clip: ClipDescriptor) -> Option<Arc<ClipDescriptor>> {
        clip.length = clamp_field(&clip.id, "length", clip.length, 0.0, f32::MAX, 0.0);
        clip.volume = clamp_field(&clip.id, "volume", clip.volume, 0.0, 1.0, default_volume());
        clip.pitch = clamp_field(&clip.id, "pitch", clip.pitch, -3.0, 3.0, default_pitch());
        if clip.key.is_empty() {
            clip.key = clip.id.clone();
        }
        if clip.key != clip.id {
            self.clip_keys.insert(clip.key.clone(), clip.id.clone());
        }
        self.clips.insert(clip.id.clone(), Arc::new(clip))
    }

    /// Insert or replace a group; duplicate names are allowed here and
    /// reported by [`Catalog::validate`] / [`Catalog::is_group_name_valid`]
    pub fn insert_group(&mut self, group: GroupDescriptor) -> Option<Arc<GroupDescriptor>> {
        self.groups.insert(group.id.clone(), Arc::new(group))
    }

    pub fn insert_playlist(
        &mut self,
        mut playlist: PlaylistDescriptor,
    ) -> Option<Arc<PlaylistDescriptor>> {
        if playlist.key.is_empty() {
            playlist.key = playlist.id.clone();
        }
        self.playlists.insert(playlist.id.clone(), Arc::new(playlist))
    }

    /// Look up a clip by id, falling back to its display key
    pub fn try_get_clip(&self, id: &str) -> Option<Arc<ClipDescriptor>> {
        self.clips.get(id).cloned().or_else(|| {
            self.clip_keys
                .get(id)
                .and_then(|real_id| self.clips.get(real_id))
                .cloned()
        })
    }

    pub fn get_group(&self, id: &str) -> Option<Arc<GroupDescriptor>> {
        self.groups.get(id).cloned()
    }

    pub fn get_track_list(&self, id: &str) -> Option<Arc<PlaylistDescriptor>> {
        self.playlists.get(id).cloned()
    }

    pub fn clip_count(&self) -> usize {
        self.clips.len()
    }

    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    pub fn playlist_count(&self) -> usize {
        self.playlists.len()
    }

    /// A group's name is valid when it is non-empty and no sibling group
    /// shares it
    pub fn is_group_name_valid(&self, group_id: &str) -> bool {
        let Some(group) = self.groups.get(group_id) else {
            return false;
        };
        let name = group.name.trim();
        if name.is_empty() {
            return false;
        }
        self.groups.values().filter(|g| g.name.trim() == name).count() == 1
    }

    /// Collect every invariant violation, sorted for stable reporting
    pub fn validate(&self) -> Vec<String> {
        let mut problems = Vec::new();

        for group in self.groups.values() {
            if !self.is_group_name_valid(&group.id) {
                problems.push(format!(
                    "group '{}' has an empty or duplicate name '{}'",
                    group.id, group.name
                ));
            }
            if group.clips.is_empty() {
                problems.push(format!("group '{}' has no clips", group.id));
            }
            for clip_id in &group.clips {
                if self.try_get_clip(clip_id).is_none() {
                    problems.push(format!(
                        "group '{}' references unknown clip '{}'",
                        group.id, clip_id
                    ));
                }
            }
        }

        for playlist in self.playlists.values() {
            if playlist.tracks.is_empty() {
                problems.push(format!("playlist '{}' has no tracks", playlist.id));
            }
            for (index, track) in playlist.tracks.iter().enumerate() {
                let Some(clip) = self.try_get_clip(&track.clip) else {
                    problems.push(format!(
                        "playlist '{}' track {} references unknown clip '{}'",
                        playlist.id, index, track.clip
                    ));
                    continue;
                };
                let end = track.end_time.unwrap_or(clip.length);
                if track.start_time < 0.0
                    || track.start_time > end + TIME_EPSILON
                    || end > clip.length + TIME_EPSILON
                {
                    problems.push(format!(
                        "playlist '{}' track {} has invalid bounds {}..{} for clip length {}",
                        playlist.id, index, track.start_time, end, clip.length
                    ));
                }
            }
        }

        if !problems.is_empty() {
            warn!("Catalog validation found {} problem(s)", problems.len());
        }
        problems.sort();
        problems
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_catalog() -> Catalog {
        let mut catalog = Catalog::new();
        catalog.insert_clip(ClipDescriptor::new("step_1", "sfx/step_1.wav", 0.4));
        catalog.insert_clip(ClipDescriptor::new("step_2", "sfx/step_2.wav", 0.5));
        catalog.insert_clip(ClipDescriptor::new("theme", "music/theme.ogg", 120.0));
        catalog.insert_group(GroupDescriptor::new(
            "footsteps",
            "Footsteps",
            vec!["step_1".into(), "step_2".into()],
            GroupPlayMode::Random,
        ));
        catalog
    }

    #[test]
    fn test_lookup_by_id_and_key() {
        let mut catalog = sample_catalog();
        let mut clip = ClipDescriptor::new("door_open_01", "sfx/door.wav", 1.2);
        clip.key = "DoorOpen".to_string();
        catalog.insert_clip(clip);

        assert!(catalog.try_get_clip("door_open_01").is_some());
        assert_eq!(catalog.try_get_clip("DoorOpen").unwrap().id, "door_open_01");
        assert!(catalog.try_get_clip("missing").is_none());
        assert!(catalog.get_group("footsteps").is_some());
        assert!(catalog.get_track_list("nothing").is_none());
    }

    #[test]
    fn test_loaded_clip_fields_are_clamped() {
        let catalog = Catalog::from_toml_str(
            r#"
[[clips]]
id = "loud"
asset = "sfx/loud.wav"
length = -1.0
volume = 2.5
pitch = -7.0

[[clips]]
id = "quiet"
asset = "sfx/quiet.wav"
length = 1.0
volume = 0.3
pitch = 9.0
"#,
        )
        .unwrap();

        let loud = catalog.try_get_clip("loud").unwrap();
        assert_eq!(loud.length, 0.0);
        assert_eq!(loud.volume, 1.0);
        assert_eq!(loud.pitch, -3.0);

        let quiet = catalog.try_get_clip("quiet").unwrap();
        assert_eq!(quiet.volume, 0.3);
        assert_eq!(quiet.pitch, 3.0);

        let mut direct = Catalog::new();
        let mut clip = ClipDescriptor::new("odd", "sfx/odd.wav", 1.0);
        clip.volume = f32::NAN;
        direct.insert_clip(clip);
        assert_eq!(direct.try_get_clip("odd").unwrap().volume, 1.0);
    }

    #[test]
    fn test_group_repeat_policy_from_toml() {
        let catalog = Catalog::from_toml_str(
            r#"
[[clips]]
id = "a"
asset = "a.wav"
length = 1.0

[[clips]]
id = "b"
asset = "b.wav"
length = 1.0

[[groups]]
id = "ab"
name = "AB"
clips = ["a", "b"]
mode = "random"
avoid_repeat = true

[[groups]]
id = "plain"
name = "Plain"
clips = ["a", "b"]
"#,
        )
        .unwrap();
        assert!(catalog.get_group("ab").unwrap().avoid_repeat);
        assert!(!catalog.get_group("plain").unwrap().avoid_repeat);
    }

    #[test]
    fn test_group_name_validity_requires_unique_name() {
        let mut catalog = sample_catalog();
        assert!(catalog.is_group_name_valid("footsteps"));

        catalog.insert_group(GroupDescriptor::new(
            "footsteps_copy",
            "Footsteps",
            vec!["step_1".into()],
            GroupPlayMode::Sequential,
        ));
        assert!(!catalog.is_group_name_valid("footsteps"));
        assert!(!catalog.is_group_name_valid("footsteps_copy"));

        catalog.insert_group(GroupDescriptor::new(
            "footsteps_copy",
            "Footsteps Copy",
            vec!["step_1".into()],
            GroupPlayMode::Sequential,
        ));
        assert!(catalog.is_group_name_valid("footsteps"));
        assert!(catalog.is_group_name_valid("footsteps_copy"));
    }

    #[test]
    fn test_empty_group_name_invalid() {
        let mut catalog = sample_catalog();
        catalog.insert_group(GroupDescriptor::new(
            "blank",
            "  ",
            vec!["step_1".into()],
            GroupPlayMode::Random,
        ));
        assert!(!catalog.is_group_name_valid("blank"));
        assert!(!catalog.is_group_name_valid("unknown_group"));
    }

    #[test]
    fn test_validate_playlist_bounds() {
        let mut catalog = sample_catalog();
        catalog.insert_playlist(PlaylistDescriptor::new(
            "ok",
            vec![TrackEntry::new("theme", 0.0, Some(120.0))],
        ));
        assert!(catalog.validate().is_empty());

        catalog.insert_playlist(PlaylistDescriptor::new(
            "too_long",
            vec![TrackEntry::new("theme", 10.0, Some(130.0))],
        ));
        catalog.insert_playlist(PlaylistDescriptor::new(
            "reversed",
            vec![TrackEntry::new("theme", 50.0, Some(40.0))],
        ));
        catalog.insert_playlist(PlaylistDescriptor::new("empty", Vec::new()));

        let problems = catalog.validate();
        assert_eq!(problems.len(), 3, "{:?}", problems);
    }

    #[test]
    fn test_dynamic_start_offset_prefers_manual() {
        let mut clip = ClipDescriptor::new("hit", "sfx/hit.wav", 3.0).with_dynamic_start(0.5);
        assert!((clip.dynamic_start_offset() - 0.5).abs() < f32::EPSILON);

        clip.dynamic_start = Some(DynamicStartTime {
            threshold: 0.01,
            detected: 0.5,
            manual: Some(0.2),
        });
        assert!((clip.dynamic_start_offset() - 0.2).abs() < f32::EPSILON);

        clip.dynamic_start = Some(DynamicStartTime {
            threshold: 0.01,
            detected: 9.0,
            manual: None,
        });
        assert!((clip.dynamic_start_offset() - 3.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_track_effective_end() {
        let open = TrackEntry::new("theme", 0.0, None);
        assert_eq!(open.effective_end(120.0), 120.0);
        let bounded = TrackEntry::new("theme", 0.0, Some(60.0));
        assert_eq!(bounded.effective_end(120.0), 60.0);
    }
}
