//! Request resolution
//!
//! Maps a symbolic request onto concrete clip descriptors and a play strategy.
//! Pure lookup: no instances are touched here.
//!
//! | Request                  | Strategy                                  |
//! |--------------------------|-------------------------------------------|
//! | single clip id           | [`PlayStrategy::SingleClip`]              |
//! | group (Random)           | [`PlayStrategy::RandomFromSet`]           |
//! | group (Sequential)       | [`PlayStrategy::PlayInOrder`]             |
//! | group (Combined)         | [`PlayStrategy::PlayAllSimultaneously`]   |
//! | explicit list + mode     | same as the group mode                    |

use std::sync::Arc;

use cuebox_common::catalog::{Catalog, ClipDescriptor, GroupPlayMode};
use cuebox_common::config::PlayState;
use cuebox_common::{Error, Result};
use tracing::{debug, warn};

/// A play request before resolution
#[derive(Debug, Clone, PartialEq)]
pub enum AudioRequest {
    /// Clip id or display key
    Clip(String),
    /// Group id, optionally overriding the group's own play mode
    Group {
        id: String,
        mode: Option<GroupPlayMode>,
    },
    /// Ad-hoc list of clip ids
    Clips {
        ids: Vec<String>,
        mode: GroupPlayMode,
    },
}

impl AudioRequest {
    pub fn clip(id: impl Into<String>) -> Self {
        AudioRequest::Clip(id.into())
    }

    pub fn group(id: impl Into<String>) -> Self {
        AudioRequest::Group {
            id: id.into(),
            mode: None,
        }
    }

    pub fn clips<I, S>(ids: I, mode: GroupPlayMode) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        AudioRequest::Clips {
            ids: ids.into_iter().map(Into::into).collect(),
            mode,
        }
    }

    /// Human-readable label used in events and logs
    pub fn label(&self) -> String {
        match self {
            AudioRequest::Clip(id) => id.clone(),
            AudioRequest::Group { id, .. } => id.clone(),
            AudioRequest::Clips { ids, .. } => format!("[{}]", ids.join(", ")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayStrategy {
    SingleClip,
    RandomFromSet,
    PlayInOrder,
    PlayAllSimultaneously,
}

impl From<GroupPlayMode> for PlayStrategy {
    fn from(mode: GroupPlayMode) -> Self {
        match mode {
            GroupPlayMode::Random => PlayStrategy::RandomFromSet,
            GroupPlayMode::Sequential => PlayStrategy::PlayInOrder,
            GroupPlayMode::Combined => PlayStrategy::PlayAllSimultaneously,
        }
    }
}

/// Outcome of a successful resolution; `clips` is never empty
#[derive(Debug, Clone)]
pub struct ResolvedRequest {
    pub strategy: PlayStrategy,
    pub clips: Vec<Arc<ClipDescriptor>>,
    pub label: String,
    /// Random selection never picks the same clip twice in a row
    pub avoid_repeat: bool,
}

pub struct RequestResolver<'a> {
    catalog: &'a Catalog,
    gate: PlayState,
}

impl<'a> RequestResolver<'a> {
    pub fn new(catalog: &'a Catalog, gate: PlayState) -> Self {
        Self { catalog, gate }
    }

    /// Resolve a request
    ///
    /// Fails with [`Error::PlaybackDisabled`] when the gate is closed and
    /// [`Error::NotFound`] when nothing playable matches. Unknown members of a
    /// group or explicit list are skipped as long as one member resolves.
    pub fn resolve(&self, request: &AudioRequest) -> Result<ResolvedRequest> {
        if !self.gate.can_play() {
            return Err(Error::PlaybackDisabled(format!(
                "audio disabled, refusing '{}'",
                request.label()
            )));
        }

        let resolved = match request {
            AudioRequest::Clip(id) => {
                let clip = self
                    .catalog
                    .try_get_clip(id)
                    .ok_or_else(|| Error::NotFound(format!("clip '{}'", id)))?;
                ResolvedRequest {
                    strategy: PlayStrategy::SingleClip,
                    clips: vec![clip],
                    label: id.clone(),
                    avoid_repeat: false,
                }
            }
            AudioRequest::Group { id, mode } => {
                let group = self
                    .catalog
                    .get_group(id)
                    .ok_or_else(|| Error::NotFound(format!("group '{}'", id)))?;
                let clips = self.collect(&group.clips, id)?;
                ResolvedRequest {
                    strategy: mode.unwrap_or(group.mode).into(),
                    clips,
                    label: id.clone(),
                    avoid_repeat: group.avoid_repeat,
                }
            }
            AudioRequest::Clips { ids, mode } => {
                let label = request.label();
                let clips = self.collect(ids, &label)?;
                ResolvedRequest {
                    strategy: (*mode).into(),
                    clips,
                    label,
                    avoid_repeat: false,
                }
            }
        };

        debug!(
            "Resolved '{}' to {:?} over {} clip(s)",
            resolved.label,
            resolved.strategy,
            resolved.clips.len()
        );
        Ok(resolved)
    }

    fn collect(&self, ids: &[String], label: &str) -> Result<Vec<Arc<ClipDescriptor>>> {
        let mut clips = Vec::with_capacity(ids.len());
        for id in ids {
            match self.catalog.try_get_clip(id) {
                Some(clip) => clips.push(clip),
                None => warn!("'{}' skips unknown clip '{}'", label, id),
            }
        }
        if clips.is_empty() {
            return Err(Error::NotFound(format!("no playable clips in '{}'", label)));
        }
        Ok(clips)
    }
}
