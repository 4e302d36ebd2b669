//! Playback instance
//!
//! Wraps one [`AudioChannel`] and tracks its lifecycle:
//!
//! ```text
//! Unassigned → Ready → Playing ⇄ Paused
//!                        ↓
//!               Stopped / Completed → (replay) Playing
//! ```
//!
//! Completion is timer driven. `play` schedules a timer for the effective
//! duration of the clip; when it fires the instance completes only if the
//! timer is still its current one and it is still playing. `stop` leaves the
//! timer in the queue and lets the stale fire be ignored.

use std::sync::Arc;

use cuebox_common::catalog::ClipDescriptor;
use cuebox_common::config::AudioSettings;
use rand::Rng;
use tracing::{debug, trace, warn};

use super::{PlaybackContext, TimerTarget};
use crate::channel::AudioChannel;
use crate::edits::params::{self, ParamValue};
use crate::edits::{EditKind, EditParameters, EditSet, EditTarget, PITCH_RANGE, VOLUME_RANGE};
use crate::scheduler::{TimerId, TimerQueue};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstanceState {
    /// Pooled, no clip bound
    Unassigned,
    /// Clip bound and edits applied
    Ready,
    Playing,
    Paused,
    Stopped,
    Completed,
}

impl std::fmt::Display for InstanceState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            InstanceState::Unassigned => "Unassigned",
            InstanceState::Ready => "Ready",
            InstanceState::Playing => "Playing",
            InstanceState::Paused => "Paused",
            InstanceState::Stopped => "Stopped",
            InstanceState::Completed => "Completed",
        };
        write!(f, "{}", s)
    }
}

pub struct PlaybackInstance {
    channel: Box<dyn AudioChannel>,
    clip: Option<Arc<ClipDescriptor>>,
    edits: EditSet,
    params: EditParameters,
    state: InstanceState,
    prepared: bool,
    has_played: bool,
    timer: Option<TimerId>,
}

impl PlaybackInstance {
    pub fn new(channel: Box<dyn AudioChannel>) -> Self {
        Self {
            channel,
            clip: None,
            edits: EditSet::new(),
            params: EditParameters::new(),
            state: InstanceState::Unassigned,
            prepared: false,
            has_played: false,
            timer: None,
        }
    }

    pub fn state(&self) -> InstanceState {
        self.state
    }

    pub fn clip(&self) -> Option<&Arc<ClipDescriptor>> {
        self.clip.as_ref()
    }

    pub fn channel(&self) -> &dyn AudioChannel {
        self.channel.as_ref()
    }

    pub fn channel_mut(&mut self) -> &mut dyn AudioChannel {
        self.channel.as_mut()
    }

    pub fn params(&self) -> &EditParameters {
        &self.params
    }

    pub fn edits(&self) -> &EditSet {
        &self.edits
    }

    pub fn timer(&self) -> Option<TimerId> {
        self.timer
    }

    pub fn is_prepared(&self) -> bool {
        self.prepared
    }

    /// Bind a clip, apply its default volume and pitch, then the edits
    pub fn initialize<R: Rng + ?Sized>(
        &mut self,
        clip: Arc<ClipDescriptor>,
        edits: EditSet,
        rng: &mut R,
    ) {
        self.edits = edits;
        self.bind(clip, rng);
        self.has_played = false;
        self.state = InstanceState::Ready;
    }

    /// Treat the next play as the first of a new run, so a delay that is
    /// skipped on loops applies again
    pub(crate) fn rearm_first_play(&mut self) {
        self.has_played = false;
    }

    /// Swap in a different clip for the next turn, keeping edits and loop
    /// bookkeeping
    pub fn rebind<R: Rng + ?Sized>(&mut self, clip: Arc<ClipDescriptor>, rng: &mut R) {
        if self.state == InstanceState::Unassigned {
            warn!("rebind on an unassigned instance ignored");
            return;
        }
        self.channel.stop();
        self.bind(clip, rng);
    }

    fn bind<R: Rng + ?Sized>(&mut self, clip: Arc<ClipDescriptor>, rng: &mut R) {
        self.channel.set_clip(Some(Arc::clone(&clip)));
        self.channel.set_volume(clip.volume);
        self.channel.set_pitch(clip.pitch);
        {
            let mut target = EditTarget {
                channel: self.channel.as_mut(),
                params: &mut self.params,
                clip: &clip,
            };
            self.edits.apply(&mut target, rng);
        }
        self.clip = Some(clip);
        self.prepared = false;
    }

    /// Routing, muting and global variance
    ///
    /// Idempotent until the clip changes.
    pub fn prepare<R: Rng + ?Sized>(&mut self, settings: &AudioSettings, rng: &mut R) {
        if self.prepared || self.clip.is_none() {
            return;
        }

        if !self.edits.contains(EditKind::Output) {
            if let Some(output) = &settings.default_output {
                self.channel.set_output(Some(output.clone()));
            }
        }
        self.channel.set_muted(settings.audio_state.is_muted());
        self.refresh_global_variance(settings, rng);
        self.seek_to_start();
        self.prepared = true;
    }

    /// Randomize volume and pitch around the clip defaults
    ///
    /// Explicit volume or pitch edits win over global variance.
    pub fn refresh_global_variance<R: Rng + ?Sized>(
        &mut self,
        settings: &AudioSettings,
        rng: &mut R,
    ) {
        let variance = &settings.global_variance;
        let Some(clip) = &self.clip else { return };
        if !variance.enabled {
            return;
        }

        if !self.edits.contains(EditKind::Volume) && variance.volume > 0.0 {
            let v = clip.volume + rng.gen_range(-variance.volume..=variance.volume);
            self.channel.set_volume(v.clamp(VOLUME_RANGE.0, VOLUME_RANGE.1));
        }
        if !self.edits.contains(EditKind::Pitch) && variance.pitch > 0.0 {
            let p = clip.pitch + rng.gen_range(-variance.pitch..=variance.pitch);
            self.channel.set_pitch(p.clamp(PITCH_RANGE.0, PITCH_RANGE.1));
        }
    }

    fn dynamic_time(&self) -> bool {
        self.params.get_bool(params::DYNAMIC_TIME).unwrap_or(true)
    }

    fn seek_to_start(&mut self) {
        let offset = match &self.clip {
            Some(clip) if self.dynamic_time() => clip.dynamic_start_offset(),
            _ => 0.0,
        };
        self.channel.set_time(offset);
    }

    /// Seconds from `play` until the completion timer fires
    ///
    /// Clip length, minus the dynamic start offset when `dynamicTime` is set.
    /// With a loop edit the delay is added when delays repeat on loops and
    /// subtracted otherwise; a delay without a loop edit is added.
    pub fn effective_duration(&self) -> f32 {
        let Some(clip) = &self.clip else { return 0.0 };

        let mut duration = clip.length;
        if self.dynamic_time() {
            duration -= clip.dynamic_start_offset();
        }

        let delay = self.params.get_float(params::DELAY).unwrap_or(0.0);
        if self.edits.contains(EditKind::Loop) {
            if self.loop_with_delays() {
                duration += delay;
            } else {
                duration -= delay;
            }
        } else if self.edits.contains(EditKind::Delay) {
            duration += delay;
        }

        duration.max(0.0)
    }

    fn loop_with_delays(&self) -> bool {
        self.params.get_bool(params::LOOP_WITH_DELAYS).unwrap_or(false)
    }

    /// Start the channel and schedule completion
    ///
    /// Prepares first if needed. The delay edit applies on the first play and
    /// on later plays only when delays repeat on loops.
    pub fn play(&mut self, ctx: &mut PlaybackContext<'_>, target: TimerTarget) -> bool {
        match self.state {
            InstanceState::Unassigned => {
                warn!("play on an unassigned instance ignored");
                return false;
            }
            InstanceState::Playing | InstanceState::Paused => {
                debug!("Instance already {}, restarting", self.state);
                self.channel.stop();
            }
            _ => {}
        }

        if !self.prepared {
            self.prepare(ctx.settings, &mut *ctx.rng);
        } else {
            self.seek_to_start();
        }

        let delay = if !self.has_played || self.loop_with_delays() {
            self.params.get_float(params::DELAY).unwrap_or(0.0)
        } else {
            0.0
        };

        let duration = self.effective_duration();
        self.channel.play(delay);
        self.timer = Some(ctx.timers.schedule(duration, target));
        self.has_played = true;
        self.state = InstanceState::Playing;

        trace!(
            "Instance playing clip={:?} delay={:.3}s completes in {:.3}s",
            self.clip.as_ref().map(|c| c.id.as_str()),
            delay,
            duration
        );
        true
    }

    pub fn pause(&mut self, timers: &mut TimerQueue<TimerTarget>) -> bool {
        if self.state != InstanceState::Playing {
            return false;
        }
        self.channel.pause();
        if let Some(id) = self.timer {
            timers.pause(id);
        }
        self.state = InstanceState::Paused;
        true
    }

    pub fn resume(&mut self, timers: &mut TimerQueue<TimerTarget>) -> bool {
        if self.state != InstanceState::Paused {
            return false;
        }
        self.channel.unpause();
        if let Some(id) = self.timer {
            timers.resume(id);
        }
        self.state = InstanceState::Playing;
        true
    }

    /// Halt immediately; valid while playing or paused
    ///
    /// A paused timer would never fire, so it is removed; a running one is
    /// left for soft cancellation.
    pub fn stop(&mut self, timers: &mut TimerQueue<TimerTarget>) -> bool {
        match self.state {
            InstanceState::Playing => {}
            InstanceState::Paused => {
                if let Some(id) = self.timer {
                    timers.cancel(id);
                }
            }
            _ => return false,
        }
        self.channel.stop();
        self.timer = None;
        self.state = InstanceState::Stopped;
        true
    }

    /// Handle a fired completion timer; returns true if this instance completed
    pub fn on_timer(&mut self, id: TimerId) -> bool {
        if self.timer != Some(id) || self.state != InstanceState::Playing {
            trace!("Stale {} ignored (state {})", id, self.state);
            return false;
        }
        self.timer = None;
        self.channel.stop();
        self.state = InstanceState::Completed;
        true
    }

    /// Re-run loop-eligible edits and global variance before a replay
    pub fn reapply_loop_edits<R: Rng + ?Sized>(&mut self, settings: &AudioSettings, rng: &mut R) {
        let Some(clip) = self.clip.clone() else { return };
        {
            let mut target = EditTarget {
                channel: self.channel.as_mut(),
                params: &mut self.params,
                clip: &clip,
            };
            self.edits.apply_on_loop(&mut target, rng);
        }
        self.refresh_global_variance(settings, rng);
    }

    /// Return to Unassigned, optionally reverting edits first
    pub fn reset(&mut self, revert_edits: bool) {
        self.channel.stop();
        if revert_edits {
            if let Some(clip) = self.clip.clone() {
                let mut target = EditTarget {
                    channel: self.channel.as_mut(),
                    params: &mut self.params,
                    clip: &clip,
                };
                self.edits.revert(&mut target);
            }
        }
        self.edits.clear();
        self.params.reset();
        self.channel.set_clip(None);
        self.channel.set_muted(false);
        self.clip = None;
        self.timer = None;
        self.prepared = false;
        self.has_played = false;
        self.state = InstanceState::Unassigned;
    }

    /// Direct parameter access for custom coordination between edits
    pub fn set_param(&mut self, key: &str, value: ParamValue) {
        self.params.set(key, value);
    }
}

impl std::fmt::Debug for PlaybackInstance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlaybackInstance")
            .field("state", &self.state)
            .field("clip", &self.clip.as_ref().map(|c| c.id.as_str()))
            .field("prepared", &self.prepared)
            .field("timer", &self.timer)
            .finish()
    }
}
