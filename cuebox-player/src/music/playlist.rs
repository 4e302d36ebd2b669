//! Playlist driver
//!
//! Plays a playlist track by track on a [`MusicPlayer`]. Each update polls the
//! current track's play head and starts the next track once the head reaches
//! the track end, shifted earlier by the transition's outgoing ramp so the
//! ramp ends with the track. Nothing advances while a transition is in
//! progress.

use std::sync::Arc;

use cuebox_common::catalog::{Catalog, ClipDescriptor, PlaylistDescriptor};
use cuebox_common::events::{AudioEvent, EventBus};
use cuebox_common::transition::TransitionSpec;
use cuebox_common::{Error, Result};
use rand::seq::SliceRandom;
use rand::Rng;
use tracing::{debug, info};

use super::player::MusicPlayer;
use super::transition::Transition;

const END_EPSILON: f32 = 1e-4;

#[derive(Debug, Clone)]
struct ResolvedTrack {
    clip: Arc<ClipDescriptor>,
    start: f32,
    end: f32,
}

pub struct PlaylistPlayer {
    playlist: Arc<PlaylistDescriptor>,
    tracks: Vec<ResolvedTrack>,
    order: Vec<usize>,
    position: usize,
    transition: TransitionSpec,
    active: bool,
    events: EventBus,
}

impl PlaylistPlayer {
    /// Resolve every track against the catalog
    ///
    /// The playlist's own transition wins over `default_transition`.
    pub fn new(
        playlist: Arc<PlaylistDescriptor>,
        catalog: &Catalog,
        default_transition: TransitionSpec,
        events: EventBus,
    ) -> Result<Self> {
        if playlist.tracks.is_empty() {
            return Err(Error::InvalidInput(format!(
                "playlist '{}' has no tracks",
                playlist.id
            )));
        }

        let mut tracks = Vec::with_capacity(playlist.tracks.len());
        for entry in &playlist.tracks {
            let clip = catalog.try_get_clip(&entry.clip).ok_or_else(|| {
                Error::NotFound(format!(
                    "clip '{}' in playlist '{}'",
                    entry.clip, playlist.id
                ))
            })?;
            let end = entry.effective_end(clip.length);
            let start = entry.start_time.clamp(0.0, end);
            tracks.push(ResolvedTrack { clip, start, end });
        }

        Ok(Self {
            transition: playlist.transition.unwrap_or(default_transition),
            order: (0..tracks.len()).collect(),
            tracks,
            playlist,
            position: 0,
            active: false,
            events,
        })
    }

    pub fn playlist(&self) -> &Arc<PlaylistDescriptor> {
        &self.playlist
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Transition used between tracks
    pub fn transition(&self) -> &TransitionSpec {
        &self.transition
    }

    /// Play order as indices into the playlist's tracks
    pub fn order(&self) -> &[usize] {
        &self.order
    }

    /// Playlist index of the track currently playing
    pub fn current_index(&self) -> Option<usize> {
        if self.active {
            self.order.get(self.position).copied()
        } else {
            None
        }
    }

    /// Start from the first track (of a fresh shuffle, if shuffling)
    pub fn start<R: Rng + ?Sized>(&mut self, music: &mut MusicPlayer, rng: &mut R) -> Result<()> {
        self.order = (0..self.tracks.len()).collect();
        if self.playlist.shuffle {
            self.order.shuffle(rng);
        }
        self.position = 0;
        self.play_current(music)?;
        self.active = true;
        info!(
            "Playlist '{}' started ({} tracks, loop={}, shuffle={})",
            self.playlist.id,
            self.tracks.len(),
            self.playlist.looping,
            self.playlist.shuffle
        );
        Ok(())
    }

    /// Stop driving the music player; the current track keeps playing
    pub fn stop(&mut self) {
        self.active = false;
    }

    /// Poll the current track and advance when it is due
    pub fn update<R: Rng + ?Sized>(&mut self, music: &mut MusicPlayer, rng: &mut R) -> Result<()> {
        if !self.active || music.is_transitioning() || music.is_paused() {
            return Ok(());
        }
        let Some(&index) = self.order.get(self.position) else {
            self.active = false;
            return Ok(());
        };
        let track = &self.tracks[index];

        let primary = music.primary();
        let on_track = primary
            .clip()
            .map(|c| c.id == track.clip.id)
            .unwrap_or(false);
        if !on_track {
            debug!(
                "Playlist '{}' lost the music deck, detaching",
                self.playlist.id
            );
            self.active = false;
            return Ok(());
        }

        let lead = Transition::lead_time(&self.transition);
        let switch_at = (track.end - lead).max(track.start);
        if primary.time() + END_EPSILON >= switch_at || !primary.is_playing() {
            self.advance(music, rng)?;
        }
        Ok(())
    }

    fn advance<R: Rng + ?Sized>(&mut self, music: &mut MusicPlayer, rng: &mut R) -> Result<()> {
        self.position += 1;
        if self.position >= self.order.len() {
            if !self.playlist.looping {
                self.active = false;
                self.events.emit_lossy(AudioEvent::PlaylistCompleted {
                    playlist_id: self.playlist.id.clone(),
                    at: music.clock(),
                });
                info!("Playlist '{}' completed", self.playlist.id);
                return music.stop(self.transition);
            }
            self.position = 0;
            if self.playlist.shuffle {
                self.order.shuffle(rng);
            }
            debug!("Playlist '{}' wrapped", self.playlist.id);
        }
        self.play_current(music)
    }

    fn play_current(&mut self, music: &mut MusicPlayer) -> Result<()> {
        let index = self.order[self.position];
        let track = &self.tracks[index];
        music.play(Arc::clone(&track.clip), track.start, self.transition)?;
        self.events.emit_lossy(AudioEvent::PlaylistAdvanced {
            playlist_id: self.playlist.id.clone(),
            index,
            at: music.clock(),
        });
        debug!(
            "Playlist '{}' now on track {} ('{}')",
            self.playlist.id, index, track.clip.id
        );
        Ok(())
    }
}

impl std::fmt::Debug for PlaylistPlayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlaylistPlayer")
            .field("playlist", &self.playlist.id)
            .field("order", &self.order)
            .field("position", &self.position)
            .field("active", &self.active)
            .finish()
    }
}
