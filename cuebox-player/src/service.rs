//! Audio service
//!
//! Single entry point for gameplay code. Owns the catalog handle, settings,
//! channel pool, timer queue, active sequences, music player and event bus,
//! and is driven by one `tick(dt)` call per frame.
//!
//! Play requests never fail loudly: an unknown id or a closed gate is logged
//! and the call returns `None` / `false`.

use std::collections::HashMap;
use std::sync::Arc;

use cuebox_common::catalog::Catalog;
use cuebox_common::config::{AudioSettings, PlayState};
use cuebox_common::events::{AudioEvent, EventBus, SequenceId};
use cuebox_common::transition::TransitionSpec;
use cuebox_common::Error;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

use crate::channel::ChannelFactory;
use crate::edits::EditSet;
use crate::music::{MusicPlayer, PlaylistPlayer};
use crate::playback::{
    AudioRequest, ChannelPool, CycleOutcome, PlayMethod, PlaybackContext, PlaybackSequence,
    RequestResolver, SequenceState, TimerTarget,
};
use crate::scheduler::TimerQueue;

/// Default per-subscriber event buffer
const EVENT_CAPACITY: usize = 256;

pub struct AudioService {
    catalog: Arc<Catalog>,
    settings: AudioSettings,
    pool: ChannelPool,
    active: HashMap<SequenceId, PlaybackSequence>,
    /// Last selection state per request label, so a sequential group resumes
    /// where the previous call left off
    selections: HashMap<String, PlayMethod>,
    timers: TimerQueue<TimerTarget>,
    music: MusicPlayer,
    playlist: Option<PlaylistPlayer>,
    events: EventBus,
    rng: StdRng,
    clock: f64,
    initialized: bool,
}

impl AudioService {
    pub fn new(catalog: Arc<Catalog>, settings: AudioSettings, factory: ChannelFactory) -> Self {
        let rng = match settings.rng_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let events = EventBus::new(EVENT_CAPACITY);
        let music = MusicPlayer::new(&factory, events.clone(), settings.music.volume);

        Self {
            catalog,
            settings,
            pool: ChannelPool::new(factory),
            active: HashMap::new(),
            selections: HashMap::new(),
            timers: TimerQueue::new(),
            music,
            playlist: None,
            events,
            rng,
            clock: 0.0,
            initialized: false,
        }
    }

    /// Pre-warm the pool and apply the music gate
    pub fn init(&mut self) {
        if self.initialized {
            warn!("AudioService already initialized");
            return;
        }
        self.pool.prewarm(self.settings.pool.prewarm);
        self.music.set_muted(self.settings.music_state.is_muted());
        self.initialized = true;
        info!(
            "AudioService initialized: {} clips, {} groups, {} playlists, {} pooled instances",
            self.catalog.clip_count(),
            self.catalog.group_count(),
            self.catalog.playlist_count(),
            self.pool.stats().free_instances
        );
    }

    /// Stop everything and return all sequences to the pool
    ///
    /// Safe to call more than once.
    pub fn shutdown(&mut self) {
        if !self.initialized {
            return;
        }
        self.stop_all();
        let ids: Vec<SequenceId> = self.active.keys().copied().collect();
        for id in ids {
            if let Some(seq) = self.active.remove(&id) {
                self.pool.release_sequence(seq);
            }
        }
        self.timers.clear();
        self.selections.clear();
        self.playlist = None;
        self.music.halt();
        self.initialized = false;
        info!("AudioService shut down");
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AudioEvent> {
        self.events.subscribe()
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    pub fn settings(&self) -> &AudioSettings {
        &self.settings
    }

    /// Game clock in seconds
    pub fn clock(&self) -> f64 {
        self.clock
    }

    pub fn pool(&self) -> &ChannelPool {
        &self.pool
    }

    pub fn music(&self) -> &MusicPlayer {
        &self.music
    }

    pub fn playlist(&self) -> Option<&PlaylistPlayer> {
        self.playlist.as_ref()
    }

    pub fn sequence(&self, id: SequenceId) -> Option<&PlaybackSequence> {
        self.active.get(&id)
    }

    pub fn sequence_ids(&self) -> Vec<SequenceId> {
        self.active.keys().copied().collect()
    }

    /// Sequences currently playing or paused
    pub fn active_count(&self) -> usize {
        self.active.values().filter(|s| s.is_active()).count()
    }

    /// Change the one-shot gate; already playing sequences are unaffected
    pub fn set_audio_state(&mut self, state: PlayState) {
        self.settings.audio_state = state;
    }

    /// Change the music gate; Disabled halts the music at once
    pub fn set_music_state(&mut self, state: PlayState) {
        self.settings.music_state = state;
        match state {
            PlayState::Disabled => {
                self.playlist = None;
                self.music.halt();
            }
            _ => self.music.set_muted(state.is_muted()),
        }
    }

    // ----- one-shot clips -----

    pub fn play(&mut self, clip_id: &str, edits: impl Into<EditSet>) -> Option<SequenceId> {
        self.play_request(AudioRequest::clip(clip_id), edits.into())
    }

    pub fn prepare(&mut self, clip_id: &str, edits: impl Into<EditSet>) -> Option<SequenceId> {
        self.prepare_request(AudioRequest::clip(clip_id), edits.into())
    }

    pub fn play_group(&mut self, group_id: &str, edits: impl Into<EditSet>) -> Option<SequenceId> {
        self.play_request(AudioRequest::group(group_id), edits.into())
    }

    pub fn prepare_group(
        &mut self,
        group_id: &str,
        edits: impl Into<EditSet>,
    ) -> Option<SequenceId> {
        self.prepare_request(AudioRequest::group(group_id), edits.into())
    }

    pub fn play_request(&mut self, request: AudioRequest, edits: EditSet) -> Option<SequenceId> {
        let id = self.prepare_request(request, edits)?;
        if self.play_prepared(id) {
            Some(id)
        } else {
            None
        }
    }

    /// Resolve and bind a request without starting it
    pub fn prepare_request(&mut self, request: AudioRequest, edits: EditSet) -> Option<SequenceId> {
        if !self.initialized {
            error!("AudioService not initialized, dropping '{}'", request.label());
            return None;
        }

        let resolver = RequestResolver::new(&self.catalog, self.settings.audio_state);
        let resolved = match resolver.resolve(&request) {
            Ok(resolved) => resolved,
            Err(e @ Error::PlaybackDisabled(_)) => {
                info!("{}", e);
                return None;
            }
            Err(e) => {
                warn!("Audio request '{}' not played: {}", request.label(), e);
                return None;
            }
        };

        let mut seq = self.pool.acquire_sequence();
        let previous = self.selections.get(&resolved.label);
        if let Err(e) = seq.prepare(
            resolved,
            previous,
            edits,
            &mut self.pool,
            &self.settings,
            &mut self.rng,
        ) {
            error!("Failed to prepare '{}': {}", request.label(), e);
            self.pool.release_sequence(seq);
            return None;
        }

        remember_selection(&mut self.selections, &seq);
        let id = seq.id();
        self.active.insert(id, seq);
        Some(id)
    }

    /// Start (or restart) a prepared sequence
    pub fn play_prepared(&mut self, id: SequenceId) -> bool {
        let Self {
            active,
            selections,
            timers,
            events,
            settings,
            rng,
            clock,
            ..
        } = self;
        let Some(seq) = active.get_mut(&id) else {
            warn!("play_prepared: unknown sequence {}", id);
            return false;
        };
        let mut ctx = PlaybackContext {
            timers,
            events,
            settings,
            rng,
            clock: *clock,
        };
        let started = seq.play(&mut ctx);
        if started {
            remember_selection(selections, seq);
        }
        started
    }

    pub fn pause(&mut self, id: SequenceId) -> bool {
        self.with_sequence(id, |seq, ctx| seq.pause(ctx))
    }

    pub fn resume(&mut self, id: SequenceId) -> bool {
        self.with_sequence(id, |seq, ctx| seq.resume(ctx))
    }

    /// Stop a sequence; it returns to the pool unless recycling is off
    pub fn stop(&mut self, id: SequenceId) -> bool {
        let stopped = self.with_sequence(id, |seq, ctx| seq.stop(ctx));
        if stopped {
            self.recycle_finished();
        }
        stopped
    }

    pub fn stop_all(&mut self) {
        let ids: Vec<SequenceId> = self.active.keys().copied().collect();
        for id in ids {
            self.with_sequence(id, |seq, ctx| seq.stop(ctx));
        }
        self.recycle_finished();
    }

    fn with_sequence<F>(&mut self, id: SequenceId, f: F) -> bool
    where
        F: FnOnce(&mut PlaybackSequence, &mut PlaybackContext<'_>) -> bool,
    {
        let Self {
            active,
            timers,
            events,
            settings,
            rng,
            clock,
            ..
        } = self;
        let Some(seq) = active.get_mut(&id) else {
            debug!("Unknown sequence {}", id);
            return false;
        };
        let mut ctx = PlaybackContext {
            timers,
            events,
            settings,
            rng,
            clock: *clock,
        };
        f(seq, &mut ctx)
    }

    fn recycle_finished(&mut self) {
        let finished: Vec<SequenceId> = self
            .active
            .iter()
            .filter(|(_, seq)| {
                matches!(
                    seq.state(),
                    SequenceState::Completed | SequenceState::Stopped
                ) && seq.should_recycle()
            })
            .map(|(id, _)| *id)
            .collect();

        for id in finished {
            if let Some(seq) = self.active.remove(&id) {
                debug!("Recycling sequence {} '{}'", id, seq.label());
                self.pool.release_sequence(seq);
            }
        }
    }

    // ----- music -----

    fn music_gate_open(&self, what: &str) -> bool {
        if !self.initialized {
            error!("AudioService not initialized, dropping music '{}'", what);
            return false;
        }
        if !self.settings.music_state.can_play() {
            debug!("Music disabled, refusing '{}'", what);
            return false;
        }
        true
    }

    /// Play a single music clip, detaching any running playlist
    pub fn play_music(&mut self, clip_id: &str, transition: Option<TransitionSpec>) -> bool {
        if !self.music_gate_open(clip_id) {
            return false;
        }
        let Some(clip) = self.catalog.try_get_clip(clip_id) else {
            warn!("Music clip '{}' not found", clip_id);
            return false;
        };
        let spec = transition.unwrap_or(self.settings.music.default_transition);
        match self.music.play(clip, 0.0, spec) {
            Ok(()) => {
                self.playlist = None;
                true
            }
            Err(e) => {
                warn!("Music '{}' not played: {}", clip_id, e);
                false
            }
        }
    }

    /// Start driving a playlist from its first track
    pub fn play_playlist(&mut self, playlist_id: &str) -> bool {
        if !self.music_gate_open(playlist_id) {
            return false;
        }
        let Some(descriptor) = self.catalog.get_track_list(playlist_id) else {
            warn!("Playlist '{}' not found", playlist_id);
            return false;
        };

        let mut playlist = match PlaylistPlayer::new(
            descriptor,
            &self.catalog,
            self.settings.music.default_transition,
            self.events.clone(),
        ) {
            Ok(playlist) => playlist,
            Err(e) => {
                warn!("Playlist '{}' not played: {}", playlist_id, e);
                return false;
            }
        };

        if let Err(e) = playlist.start(&mut self.music, &mut self.rng) {
            warn!("Playlist '{}' not played: {}", playlist_id, e);
            return false;
        }
        self.playlist = Some(playlist);
        true
    }

    pub fn stop_music(&mut self, transition: Option<TransitionSpec>) -> bool {
        if let Some(playlist) = self.playlist.as_mut() {
            playlist.stop();
        }
        let spec = transition.unwrap_or(self.settings.music.default_transition);
        match self.music.stop(spec) {
            Ok(()) => {
                self.playlist = None;
                true
            }
            Err(e) => {
                warn!("Music stop refused: {}", e);
                false
            }
        }
    }

    pub fn pause_music(&mut self) -> bool {
        self.music.pause()
    }

    pub fn resume_music(&mut self) -> bool {
        self.music.resume()
    }

    pub fn set_music_volume(&mut self, volume: f32) {
        self.settings.music.volume = volume.clamp(0.0, 1.0);
        self.music.set_volume(volume);
    }

    // ----- frame update -----

    /// Advance the game clock by `dt` seconds
    ///
    /// Channels tick first, then fired completion timers are routed to their
    /// sequences, finished sequences are recycled, and finally the music
    /// player and playlist advance.
    pub fn tick(&mut self, dt: f32) {
        if !self.initialized || dt <= 0.0 {
            return;
        }
        self.clock += dt as f64;

        for seq in self.active.values_mut() {
            seq.tick_channels(dt);
        }

        let fired = self.timers.advance(dt);
        if !fired.is_empty() {
            let Self {
                active,
                selections,
                timers,
                events,
                settings,
                rng,
                clock,
                ..
            } = self;
            let mut ctx = PlaybackContext {
                timers,
                events,
                settings,
                rng,
                clock: *clock,
            };
            for (timer, target) in fired {
                let Some(seq) = active.get_mut(&target.sequence) else {
                    continue;
                };
                match seq.on_timer(target.slot, timer, &mut ctx) {
                    CycleOutcome::Looped => remember_selection(selections, seq),
                    CycleOutcome::Completed => {
                        debug!("Sequence {} finished its last cycle", target.sequence);
                    }
                    CycleOutcome::Pending => {}
                }
            }
        }
        self.recycle_finished();

        self.music.tick(dt);
        if let Some(playlist) = self.playlist.as_mut() {
            if let Err(e) = playlist.update(&mut self.music, &mut self.rng) {
                warn!("Playlist '{}' stopped: {}", playlist.playlist().id, e);
                playlist.stop();
            }
            if !playlist.is_active() {
                self.playlist = None;
            }
        }
    }
}

fn remember_selection(selections: &mut HashMap<String, PlayMethod>, seq: &PlaybackSequence) {
    if seq.method().picks_per_turn() {
        selections.insert(seq.label().to_string(), seq.method().clone());
    }
}

impl Drop for AudioService {
    fn drop(&mut self) {
        self.shutdown();
    }
}
