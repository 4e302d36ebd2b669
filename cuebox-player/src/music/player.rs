//! Music player
//!
//! Owns the two-channel music deck and at most one running transition. A new
//! `play` or `stop` while a transition is in progress is refused with
//! [`Error::TransitionConflict`].

use std::sync::Arc;

use cuebox_common::catalog::ClipDescriptor;
use cuebox_common::events::{AudioEvent, EventBus};
use cuebox_common::transition::TransitionSpec;
use cuebox_common::{Error, Result};
use tracing::{debug, info};

use super::transition::{IncomingTrack, MusicDeck, Transition, TransitionStep};
use crate::channel::{AudioChannel, ChannelFactory};

pub struct MusicPlayer {
    deck: MusicDeck,
    transition: Transition,
    events: EventBus,
    volume: f32,
    muted: bool,
    paused: bool,
    clock: f64,
}

impl MusicPlayer {
    pub fn new(factory: &ChannelFactory, events: EventBus, volume: f32) -> Self {
        Self {
            deck: MusicDeck::new(factory),
            transition: Transition::new(),
            events,
            volume: volume.clamp(0.0, 1.0),
            muted: false,
            paused: false,
            clock: 0.0,
        }
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    /// Target volume for music; applied at once unless a transition is
    /// ramping
    pub fn set_volume(&mut self, volume: f32) {
        self.volume = volume.clamp(0.0, 1.0);
        if !self.transition.in_progress() && self.deck.primary.clip().is_some() {
            self.deck.primary.set_volume(self.volume);
        }
    }

    pub fn set_muted(&mut self, muted: bool) {
        self.muted = muted;
        self.deck.set_muted(muted);
    }

    pub fn is_muted(&self) -> bool {
        self.muted
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn is_transitioning(&self) -> bool {
        self.transition.in_progress()
    }

    pub fn transition(&self) -> &Transition {
        &self.transition
    }

    /// Channel holding the current track
    pub fn primary(&self) -> &dyn AudioChannel {
        self.deck.primary.as_ref()
    }

    /// Incoming channel during a cross-fade
    pub fn secondary(&self) -> &dyn AudioChannel {
        self.deck.secondary.as_ref()
    }

    pub fn current_clip(&self) -> Option<&Arc<ClipDescriptor>> {
        self.deck.primary.clip()
    }

    /// Playing or ramping, and not paused
    pub fn is_playing(&self) -> bool {
        !self.paused && (self.deck.primary.is_playing() || self.deck.secondary.is_playing())
    }

    /// Sum of all ticks, used to stamp events
    pub fn clock(&self) -> f64 {
        self.clock
    }

    /// Switch to `clip`, starting its play head at `start_time`
    pub fn play(
        &mut self,
        clip: Arc<ClipDescriptor>,
        start_time: f32,
        spec: TransitionSpec,
    ) -> Result<()> {
        self.ensure_idle()?;
        if self.paused {
            self.unpause_channels();
        }
        info!("Music switching to '{}' ({:?})", clip.id, spec.kind);
        let incoming = IncomingTrack::new(clip, start_time);
        let step = self
            .transition
            .begin(spec, &mut self.deck, Some(incoming), self.volume);
        self.deck.set_muted(self.muted);
        self.emit(AudioEvent::TransitionStarted {
            kind: self.transition.spec().kind,
            at: self.clock,
        });
        self.report(step);
        Ok(())
    }

    /// Switch to silence
    pub fn stop(&mut self, spec: TransitionSpec) -> Result<()> {
        self.ensure_idle()?;
        if self.deck.primary.clip().is_none() {
            debug!("stop requested with no music playing");
            return Ok(());
        }
        if self.paused {
            self.unpause_channels();
        }
        let step = self.transition.begin(spec, &mut self.deck, None, self.volume);
        self.emit(AudioEvent::TransitionStarted {
            kind: self.transition.spec().kind,
            at: self.clock,
        });
        self.report(step);
        Ok(())
    }

    /// Stop both channels at once, abandoning any transition
    pub fn halt(&mut self) {
        let was_playing = self.deck.primary.clip().is_some();
        self.deck.primary.stop();
        self.deck.primary.set_clip(None);
        self.deck.secondary.stop();
        self.deck.secondary.set_clip(None);
        self.transition = Transition::new();
        self.paused = false;
        if was_playing {
            self.emit(AudioEvent::MusicStopped { at: self.clock });
        }
    }

    pub fn pause(&mut self) -> bool {
        if self.paused || self.deck.primary.clip().is_none() {
            return false;
        }
        self.deck.primary.pause();
        self.deck.secondary.pause();
        self.paused = true;
        self.emit(AudioEvent::MusicPaused { at: self.clock });
        true
    }

    pub fn resume(&mut self) -> bool {
        if !self.paused {
            return false;
        }
        self.unpause_channels();
        self.emit(AudioEvent::MusicResumed { at: self.clock });
        true
    }

    fn unpause_channels(&mut self) {
        self.deck.primary.unpause();
        self.deck.secondary.unpause();
        self.paused = false;
    }

    /// Advance channels and the running transition by `dt` seconds
    pub fn tick(&mut self, dt: f32) {
        self.clock += dt as f64;
        if self.paused {
            return;
        }
        self.deck.tick(dt);
        let step = self.transition.advance(dt, &mut self.deck);
        self.report(step);
    }

    fn ensure_idle(&self) -> Result<()> {
        if self.transition.in_progress() {
            return Err(Error::TransitionConflict(format!(
                "{:?} transition still running ({:.2}s elapsed)",
                self.transition.spec().kind,
                self.transition.elapsed()
            )));
        }
        Ok(())
    }

    fn report(&mut self, step: TransitionStep) {
        if let Some(clip_id) = step.started {
            self.emit(AudioEvent::MusicStarted {
                clip_id,
                at: self.clock,
            });
        }
        if step.completed {
            debug!("Music transition completed");
            self.emit(AudioEvent::TransitionCompleted {
                kind: self.transition.spec().kind,
                at: self.clock,
            });
            if self.deck.primary.clip().is_none() {
                self.emit(AudioEvent::MusicStopped { at: self.clock });
            }
        }
    }

    fn emit(&self, event: AudioEvent) {
        self.events.emit_lossy(event);
    }
}
