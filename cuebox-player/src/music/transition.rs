//! Music transitions
//!
//! A [`Transition`] switches the music deck from its current track to an
//! incoming one (or to silence) over time:
//!
//! - **Cut**: swap and restore the target volume in a single step
//! - **Fade**: ramp `0 → target` (In), `start → 0` (Out), or ramp down over the
//!   first half, swap at the midpoint and ramp up over the second half
//!   (InAndOut)
//! - **CrossFade**: start the incoming track on the secondary channel at once,
//!   ramp both channels in parallel over the full duration, then swap the
//!   channel roles. In or Out mode behaves as the matching Fade.
//!
//! Ramps use the transition's [`FadeCurve`] scaled by the volume they start from and
//! never leave `[0, start]`.
//!
//! State: `Idle → InProgress → Completed`, re-entered by the next `begin`.

use std::sync::Arc;

use cuebox_common::catalog::ClipDescriptor;
use cuebox_common::transition::{TransitionKind, TransitionMode, TransitionSpec};
use cuebox_common::FadeCurve;
use tracing::debug;

use crate::channel::{AudioChannel, ChannelFactory};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionPhase {
    Idle,
    InProgress,
    Completed,
}

/// Track about to become the primary music
#[derive(Debug, Clone)]
pub struct IncomingTrack {
    pub clip: Arc<ClipDescriptor>,
    /// Play head position the track starts from
    pub start_time: f32,
}

impl IncomingTrack {
    pub fn new(clip: Arc<ClipDescriptor>, start_time: f32) -> Self {
        Self { clip, start_time }
    }
}

/// Primary and secondary music channels
pub struct MusicDeck {
    pub primary: Box<dyn AudioChannel>,
    pub secondary: Box<dyn AudioChannel>,
}

impl MusicDeck {
    pub fn new(factory: &ChannelFactory) -> Self {
        Self {
            primary: factory(),
            secondary: factory(),
        }
    }

    /// Exchange channel roles
    pub fn swap(&mut self) {
        std::mem::swap(&mut self.primary, &mut self.secondary);
    }

    pub fn tick(&mut self, dt: f32) {
        self.primary.tick(dt);
        self.secondary.tick(dt);
    }

    pub fn set_muted(&mut self, muted: bool) {
        self.primary.set_muted(muted);
        self.secondary.set_muted(muted);
    }

    fn load(channel: &mut dyn AudioChannel, track: &IncomingTrack, volume: f32) {
        channel.stop();
        channel.set_clip(Some(Arc::clone(&track.clip)));
        channel.set_time(track.start_time);
        channel.set_pitch(1.0);
        channel.set_volume(volume);
        channel.play(0.0);
    }
}

/// Work done by one `begin` or `advance` call
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransitionStep {
    /// Clip id of the incoming track, if it was loaded onto a channel
    pub started: Option<String>,
    /// The outgoing track was silenced and stopped
    pub track_stopped: bool,
    /// The transition finished
    pub completed: bool,
}

#[derive(Debug, Clone)]
pub struct Transition {
    spec: TransitionSpec,
    phase: TransitionPhase,
    elapsed: f32,
    start_volume: f32,
    target_volume: f32,
    incoming: Option<IncomingTrack>,
    swapped: bool,
}

impl Transition {
    pub fn new() -> Self {
        Self {
            spec: TransitionSpec::cut(),
            phase: TransitionPhase::Idle,
            elapsed: 0.0,
            start_volume: 0.0,
            target_volume: 0.0,
            incoming: None,
            swapped: false,
        }
    }

    pub fn phase(&self) -> TransitionPhase {
        self.phase
    }

    pub fn in_progress(&self) -> bool {
        self.phase == TransitionPhase::InProgress
    }

    /// The transition actually running (after normalization)
    pub fn spec(&self) -> &TransitionSpec {
        &self.spec
    }

    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }

    /// Map a requested spec onto the behaviour that will run
    ///
    /// Zero-length ramps become cuts, one-sided cross-fades become fades, and
    /// a switch to silence never fades in.
    pub fn normalize(spec: TransitionSpec, to_silence: bool) -> TransitionSpec {
        let mut spec = spec;
        if spec.kind != TransitionKind::Cut && spec.duration <= 0.0 {
            spec.kind = TransitionKind::Cut;
        }
        if spec.kind == TransitionKind::CrossFade && spec.mode != TransitionMode::InAndOut {
            spec.kind = TransitionKind::Fade;
        }
        if to_silence && spec.kind != TransitionKind::Cut {
            match spec.mode {
                TransitionMode::In => spec.kind = TransitionKind::Cut,
                TransitionMode::InAndOut => {
                    spec.kind = TransitionKind::Fade;
                    spec.mode = TransitionMode::Out;
                }
                TransitionMode::Out => spec.kind = TransitionKind::Fade,
            }
        }
        if spec.kind == TransitionKind::Cut {
            spec.duration = 0.0;
        }
        spec
    }

    /// Seconds before a track's end at which a switch should begin so the
    /// outgoing ramp finishes with the track
    pub fn lead_time(spec: &TransitionSpec) -> f32 {
        let spec = Self::normalize(*spec, false);
        match (spec.kind, spec.mode) {
            (TransitionKind::Cut, _) => 0.0,
            (TransitionKind::Fade, TransitionMode::In) => 0.0,
            (TransitionKind::Fade, TransitionMode::Out) => spec.duration,
            (TransitionKind::Fade, TransitionMode::InAndOut) => spec.duration / 2.0,
            (TransitionKind::CrossFade, _) => spec.duration,
        }
    }

    /// Start switching to `incoming` (or to silence when `None`)
    pub fn begin(
        &mut self,
        spec: TransitionSpec,
        deck: &mut MusicDeck,
        incoming: Option<IncomingTrack>,
        target_volume: f32,
    ) -> TransitionStep {
        self.spec = Self::normalize(spec, incoming.is_none());
        self.phase = TransitionPhase::InProgress;
        self.elapsed = 0.0;
        self.swapped = false;
        self.start_volume = if deck.primary.is_playing() || deck.primary.clip().is_some() {
            deck.primary.volume()
        } else {
            0.0
        };
        self.target_volume = target_volume.clamp(0.0, 1.0);
        self.incoming = incoming;

        debug!(
            "Transition {:?}/{:?} over {:.2}s (from {:.2} to {:.2})",
            self.spec.kind, self.spec.mode, self.spec.duration, self.start_volume, self.target_volume
        );

        let mut step = TransitionStep::default();
        match (self.spec.kind, self.spec.mode) {
            (TransitionKind::Cut, _) => {
                self.swap_in(deck, &mut step, self.target_volume);
                self.finish(&mut step);
            }
            (TransitionKind::Fade, TransitionMode::In) => {
                self.swap_in(deck, &mut step, 0.0);
            }
            (TransitionKind::CrossFade, _) => {
                deck.secondary.stop();
                if let Some(track) = &self.incoming {
                    MusicDeck::load(deck.secondary.as_mut(), track, 0.0);
                    step.started = Some(track.clip.id.clone());
                }
            }
            _ => {}
        }
        step
    }

    /// Move the ramps forward by `dt` seconds
    pub fn advance(&mut self, dt: f32, deck: &mut MusicDeck) -> TransitionStep {
        let mut step = TransitionStep::default();
        if self.phase != TransitionPhase::InProgress {
            return step;
        }

        self.elapsed += dt.max(0.0);
        let duration = self.spec.duration.max(f32::EPSILON);
        let t = (self.elapsed / duration).min(1.0);
        let curve: FadeCurve = self.spec.curve;

        match (self.spec.kind, self.spec.mode) {
            (TransitionKind::Cut, _) => self.finish(&mut step),
            (TransitionKind::Fade, TransitionMode::In) => {
                deck.primary
                    .set_volume(curve.ramp(t, self.target_volume, true));
            }
            (TransitionKind::Fade, TransitionMode::Out) => {
                deck.primary
                    .set_volume(curve.ramp(t, self.start_volume, false));
                if t >= 1.0 {
                    self.swap_in(deck, &mut step, self.target_volume);
                }
            }
            (TransitionKind::Fade, TransitionMode::InAndOut) => {
                let half = duration / 2.0;
                if self.elapsed < half {
                    deck.primary
                        .set_volume(curve.ramp(self.elapsed / half, self.start_volume, false));
                } else {
                    if !self.swapped {
                        self.swap_in(deck, &mut step, 0.0);
                    }
                    let t2 = ((self.elapsed - half) / half).min(1.0);
                    deck.primary
                        .set_volume(curve.ramp(t2, self.target_volume, true));
                }
            }
            (TransitionKind::CrossFade, _) => {
                deck.primary
                    .set_volume(curve.ramp(t, self.start_volume, false));
                deck.secondary
                    .set_volume(curve.ramp(t, self.target_volume, true));
                if t >= 1.0 {
                    deck.primary.stop();
                    deck.primary.set_clip(None);
                    step.track_stopped = true;
                    deck.swap();
                    self.swapped = true;
                }
            }
        }

        if t >= 1.0 && self.phase == TransitionPhase::InProgress {
            self.finish(&mut step);
        }
        step
    }

    /// Stop the outgoing track on the primary channel and load the incoming
    /// one there at `volume`
    fn swap_in(&mut self, deck: &mut MusicDeck, step: &mut TransitionStep, volume: f32) {
        if deck.primary.clip().is_some() {
            deck.primary.stop();
            step.track_stopped = true;
        }
        match &self.incoming {
            Some(track) => {
                MusicDeck::load(deck.primary.as_mut(), track, volume);
                step.started = Some(track.clip.id.clone());
            }
            None => deck.primary.set_clip(None),
        }
        self.swapped = true;
    }

    fn finish(&mut self, step: &mut TransitionStep) {
        self.phase = TransitionPhase::Completed;
        self.incoming = None;
        step.completed = true;
    }
}

impl Default for Transition {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::SimulatedChannel;

    fn deck_playing(volume: f32) -> MusicDeck {
        let factory = SimulatedChannel::factory();
        let mut deck = MusicDeck::new(&factory);
        let old = IncomingTrack::new(Arc::new(ClipDescriptor::new("old", "old.ogg", 60.0)), 0.0);
        MusicDeck::load(deck.primary.as_mut(), &old, volume);
        deck
    }

    fn incoming() -> Option<IncomingTrack> {
        Some(IncomingTrack::new(
            Arc::new(ClipDescriptor::new("new", "new.ogg", 60.0)),
            5.0,
        ))
    }

    #[test]
    fn test_normalize() {
        let one_sided = TransitionSpec {
            mode: TransitionMode::Out,
            ..TransitionSpec::cross_fade(2.0)
        };
        assert_eq!(Transition::normalize(one_sided, false).kind, TransitionKind::Fade);

        let zero = TransitionSpec::fade(TransitionMode::InAndOut, 0.0);
        assert_eq!(Transition::normalize(zero, false).kind, TransitionKind::Cut);

        let stop = Transition::normalize(TransitionSpec::cross_fade(2.0), true);
        assert_eq!((stop.kind, stop.mode), (TransitionKind::Fade, TransitionMode::Out));
    }

    #[test]
    fn test_cut_is_single_step() {
        let mut deck = deck_playing(0.8);
        let mut transition = Transition::new();
        let step = transition.begin(TransitionSpec::cut(), &mut deck, incoming(), 0.8);

        assert!(step.completed && step.track_stopped);
        assert_eq!(step.started.as_deref(), Some("new"));
        assert_eq!(transition.phase(), TransitionPhase::Completed);
        assert_eq!(deck.primary.clip().unwrap().id, "new");
        assert!((deck.primary.time() - 5.0).abs() < 1e-6);
        assert!((deck.primary.volume() - 0.8).abs() < 1e-6);
    }

    #[test]
    fn test_fade_in_and_out_swaps_at_midpoint() {
        let mut deck = deck_playing(1.0);
        let mut transition = Transition::new();
        transition.begin(
            TransitionSpec::fade(TransitionMode::InAndOut, 2.0),
            &mut deck,
            incoming(),
            1.0,
        );

        transition.advance(0.5, &mut deck);
        assert_eq!(deck.primary.clip().unwrap().id, "old");
        assert!((deck.primary.volume() - 0.5).abs() < 1e-5);

        let step = transition.advance(0.5, &mut deck);
        assert_eq!(step.started.as_deref(), Some("new"));
        assert_eq!(deck.primary.clip().unwrap().id, "new");
        assert!(deck.primary.volume() < 1e-5);

        transition.advance(0.5, &mut deck);
        assert!((deck.primary.volume() - 0.5).abs() < 1e-5);

        let step = transition.advance(0.5, &mut deck);
        assert!(step.completed);
        assert!((deck.primary.volume() - 1.0).abs() < 1e-5);
        assert!(!transition.in_progress());
    }

    #[test]
    fn test_fade_out_to_silence() {
        let mut deck = deck_playing(0.6);
        let mut transition = Transition::new();
        transition.begin(
            TransitionSpec::fade(TransitionMode::InAndOut, 1.0),
            &mut deck,
            None,
            0.6,
        );
        transition.advance(0.5, &mut deck);
        assert!((deck.primary.volume() - 0.3).abs() < 1e-5);

        let step = transition.advance(0.5, &mut deck);
        assert!(step.completed && step.track_stopped);
        assert!(deck.primary.clip().is_none());
        assert!(!deck.primary.is_playing());
    }

    #[test]
    fn test_lead_time() {
        assert_eq!(Transition::lead_time(&TransitionSpec::cut()), 0.0);
        assert_eq!(Transition::lead_time(&TransitionSpec::cross_fade(3.0)), 3.0);
        assert_eq!(
            Transition::lead_time(&TransitionSpec::fade(TransitionMode::InAndOut, 3.0)),
            1.5
        );
        assert_eq!(
            Transition::lead_time(&TransitionSpec::fade(TransitionMode::In, 3.0)),
            0.0
        );
    }
}
