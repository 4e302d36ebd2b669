//! Playback sequence
//!
//! One logical play request. A sequence owns the instances the request needs
//! (one per clip for combined playback, otherwise a single instance reused
//! across turns) and a [`PlayMethod`] deciding which clip plays on each turn.
//!
//! A cycle completes only when every owned instance has reported completion
//! since the last start. On cycle completion the sequence either loops (loop
//! edit not yet exhausted) or completes.

use std::sync::Arc;

use cuebox_common::catalog::ClipDescriptor;
use cuebox_common::config::AudioSettings;
use cuebox_common::events::{AudioEvent, SequenceId};
use cuebox_common::{Error, Result};
use rand::Rng;
use tracing::{debug, error, info, warn};

use super::instance::PlaybackInstance;
use super::pool::ChannelPool;
use super::resolver::{PlayStrategy, ResolvedRequest};
use super::{PlaybackContext, TimerTarget};
use crate::edits::{EditSet, LoopCount};
use crate::scheduler::{TimerId, TimerQueue};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequenceState {
    /// Pooled or never prepared
    Idle,
    Prepared,
    Playing,
    Paused,
    Stopped,
    Completed,
}

/// Result of routing one completion timer into a sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Stale timer, or other instances still playing
    Pending,
    /// Cycle finished and another loop started
    Looped,
    /// Cycle finished with no loop remaining
    Completed,
}

/// Per-strategy turn logic
#[derive(Debug, Clone, PartialEq)]
pub enum PlayMethod {
    Single,
    /// One member per turn, uniformly at random
    Random {
        avoid_repeat: bool,
        last: Option<usize>,
    },
    /// Members in order, one per turn, wrapping
    Sequential { cursor: usize },
    /// Every member at once
    Combined,
}

impl PlayMethod {
    pub fn for_strategy(strategy: PlayStrategy) -> Self {
        match strategy {
            PlayStrategy::SingleClip => PlayMethod::Single,
            PlayStrategy::RandomFromSet => PlayMethod::Random {
                avoid_repeat: false,
                last: None,
            },
            PlayStrategy::PlayInOrder => PlayMethod::Sequential { cursor: 0 },
            PlayStrategy::PlayAllSimultaneously => PlayMethod::Combined,
        }
    }

    /// Method for a resolved request, honouring the group's repeat policy
    pub fn for_request(resolved: &ResolvedRequest) -> Self {
        match Self::for_strategy(resolved.strategy) {
            PlayMethod::Random { last, .. } => PlayMethod::Random {
                avoid_repeat: resolved.avoid_repeat,
                last,
            },
            method => method,
        }
    }

    /// Carry selection state over from an earlier play of the same request
    ///
    /// Keeps this method's configuration; a method of another kind leaves
    /// `self` untouched.
    pub fn resume_from(self, previous: &PlayMethod) -> Self {
        match (self, previous) {
            (PlayMethod::Sequential { .. }, PlayMethod::Sequential { cursor }) => {
                PlayMethod::Sequential { cursor: *cursor }
            }
            (PlayMethod::Random { avoid_repeat, .. }, PlayMethod::Random { last, .. }) => {
                PlayMethod::Random {
                    avoid_repeat,
                    last: *last,
                }
            }
            (method, _) => method,
        }
    }

    /// Instances needed to play `clip_count` clips with this method
    pub fn instance_count(&self, clip_count: usize) -> usize {
        match self {
            PlayMethod::Combined => clip_count,
            _ => clip_count.min(1),
        }
    }

    /// True if each turn selects a new clip
    pub fn picks_per_turn(&self) -> bool {
        matches!(self, PlayMethod::Random { .. } | PlayMethod::Sequential { .. })
    }

    /// Select the clip index for the next turn
    pub fn pick<R: Rng + ?Sized>(&mut self, clip_count: usize, rng: &mut R) -> usize {
        if clip_count == 0 {
            return 0;
        }
        match self {
            PlayMethod::Single | PlayMethod::Combined => 0,
            PlayMethod::Random { avoid_repeat, last } => {
                let index = match *last {
                    Some(prev) if *avoid_repeat && clip_count > 1 => {
                        let i = rng.gen_range(0..clip_count - 1);
                        if i >= prev {
                            i + 1
                        } else {
                            i
                        }
                    }
                    _ => rng.gen_range(0..clip_count),
                };
                *last = Some(index);
                index
            }
            PlayMethod::Sequential { cursor } => {
                let index = *cursor % clip_count;
                *cursor = (index + 1) % clip_count;
                index
            }
        }
    }

    /// Start every instance; all are started in this one call
    fn play(
        &self,
        id: SequenceId,
        instances: &mut [PlaybackInstance],
        ctx: &mut PlaybackContext<'_>,
    ) -> usize {
        instances
            .iter_mut()
            .enumerate()
            .map(|(slot, inst)| inst.play(ctx, TimerTarget { sequence: id, slot }))
            .filter(|started| *started)
            .count()
    }

    fn pause(&self, instances: &mut [PlaybackInstance], timers: &mut TimerQueue<TimerTarget>) {
        for inst in instances {
            inst.pause(timers);
        }
    }

    fn resume(&self, instances: &mut [PlaybackInstance], timers: &mut TimerQueue<TimerTarget>) {
        for inst in instances {
            inst.resume(timers);
        }
    }

    fn stop(&self, instances: &mut [PlaybackInstance], timers: &mut TimerQueue<TimerTarget>) {
        for inst in instances {
            inst.stop(timers);
        }
    }
}

#[derive(Debug)]
pub struct PlaybackSequence {
    id: SequenceId,
    label: String,
    state: SequenceState,
    method: PlayMethod,
    clips: Vec<Arc<ClipDescriptor>>,
    instances: Vec<PlaybackInstance>,
    loop_count: Option<LoopCount>,
    current_loop: u32,
    completed_count: usize,
    recycle: bool,
    pending_turn: bool,
}

impl PlaybackSequence {
    pub fn new() -> Self {
        Self {
            id: SequenceId::new(),
            label: String::new(),
            state: SequenceState::Idle,
            method: PlayMethod::Single,
            clips: Vec::new(),
            instances: Vec::new(),
            loop_count: None,
            current_loop: 0,
            completed_count: 0,
            recycle: true,
            pending_turn: false,
        }
    }

    pub fn id(&self) -> SequenceId {
        self.id
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn state(&self) -> SequenceState {
        self.state
    }

    pub fn method(&self) -> &PlayMethod {
        &self.method
    }

    pub fn method_mut(&mut self) -> &mut PlayMethod {
        &mut self.method
    }

    pub fn instances(&self) -> &[PlaybackInstance] {
        &self.instances
    }

    pub fn clips(&self) -> &[Arc<ClipDescriptor>] {
        &self.clips
    }

    pub fn loop_count(&self) -> Option<LoopCount> {
        self.loop_count
    }

    /// Cycles finished since the last `play`
    pub fn current_loop(&self) -> u32 {
        self.current_loop
    }

    /// Instances that completed in the running cycle
    pub fn completed_count(&self) -> usize {
        self.completed_count
    }

    pub fn should_recycle(&self) -> bool {
        self.recycle
    }

    pub fn is_prepared(&self) -> bool {
        self.state != SequenceState::Idle
    }

    /// Playing or paused
    pub fn is_active(&self) -> bool {
        matches!(self.state, SequenceState::Playing | SequenceState::Paused)
    }

    /// Bind a resolved request: pick the play method, pull instances from the
    /// pool and initialize them with the request's edits
    ///
    /// `previous` is the selection state left by the last play of the same
    /// request, so sequential groups keep advancing across calls.
    pub fn prepare<R: Rng + ?Sized>(
        &mut self,
        resolved: ResolvedRequest,
        previous: Option<&PlayMethod>,
        edits: EditSet,
        pool: &mut ChannelPool,
        settings: &AudioSettings,
        rng: &mut R,
    ) -> Result<()> {
        if self.state != SequenceState::Idle {
            return Err(Error::InvalidState(format!(
                "sequence {} is already prepared",
                self.id
            )));
        }
        if resolved.clips.is_empty() {
            return Err(Error::InvalidInput(format!(
                "'{}' resolved to no clips",
                resolved.label
            )));
        }

        let method = PlayMethod::for_request(&resolved);
        self.method = match previous {
            Some(previous) => method.resume_from(previous),
            None => method,
        };
        self.id = SequenceId::new();
        self.label = resolved.label;
        self.clips = resolved.clips;
        self.loop_count = edits.loop_count();
        self.recycle = edits.recycle().unwrap_or(settings.recycle_on_complete);

        let needed = self.method.instance_count(self.clips.len());
        for slot in 0..needed {
            let index = if matches!(self.method, PlayMethod::Combined) {
                slot
            } else {
                self.method.pick(self.clips.len(), rng)
            };
            let mut inst = pool.acquire_instance();
            inst.initialize(Arc::clone(&self.clips[index]), edits.clone(), rng);
            inst.prepare(settings, rng);
            self.instances.push(inst);
        }

        self.pending_turn = true;
        self.current_loop = 0;
        self.completed_count = 0;
        self.state = SequenceState::Prepared;
        debug!(
            "Prepared sequence {} '{}' ({:?}, {} instance(s))",
            self.id,
            self.label,
            self.method,
            self.instances.len()
        );
        Ok(())
    }

    /// Start a fresh play of the request
    ///
    /// On an unprepared sequence this only logs an error.
    pub fn play(&mut self, ctx: &mut PlaybackContext<'_>) -> bool {
        match self.state {
            SequenceState::Idle => {
                error!("play on an unprepared sequence ignored");
                return false;
            }
            SequenceState::Playing | SequenceState::Paused => {
                warn!("Sequence {} '{}' already playing", self.id, self.label);
                return false;
            }
            _ => {}
        }

        ctx.emit(AudioEvent::SequenceStarted {
            sequence_id: self.id,
            request: self.label.clone(),
            at: ctx.clock,
        });
        self.state = SequenceState::Playing;
        self.completed_count = 0;
        self.current_loop = 0;
        for inst in &mut self.instances {
            inst.rearm_first_play();
        }
        self.start_turn(ctx);
        info!("Sequence {} '{}' started", self.id, self.label);
        true
    }

    fn start_turn(&mut self, ctx: &mut PlaybackContext<'_>) {
        if self.method.picks_per_turn() && !self.pending_turn {
            let index = self.method.pick(self.clips.len(), &mut *ctx.rng);
            if let Some(inst) = self.instances.first_mut() {
                inst.rebind(Arc::clone(&self.clips[index]), &mut *ctx.rng);
            }
        }
        self.pending_turn = false;

        let started = self.method.play(self.id, &mut self.instances, ctx);
        if started < self.instances.len() {
            warn!(
                "Sequence {} started {}/{} instances",
                self.id,
                started,
                self.instances.len()
            );
        }
    }

    /// Route a fired completion timer to the owning instance
    pub fn on_timer(
        &mut self,
        slot: usize,
        timer: TimerId,
        ctx: &mut PlaybackContext<'_>,
    ) -> CycleOutcome {
        if self.state != SequenceState::Playing {
            return CycleOutcome::Pending;
        }
        let Some(inst) = self.instances.get_mut(slot) else {
            return CycleOutcome::Pending;
        };
        if !inst.on_timer(timer) {
            return CycleOutcome::Pending;
        }

        self.completed_count += 1;
        if self.completed_count < self.instances.len() {
            return CycleOutcome::Pending;
        }

        self.current_loop += 1;
        let replay = match self.loop_count {
            Some(LoopCount::Infinite) => true,
            Some(LoopCount::Times(n)) => self.current_loop < n,
            None => false,
        };

        if replay {
            self.completed_count = 0;
            for inst in &mut self.instances {
                inst.reapply_loop_edits(ctx.settings, &mut *ctx.rng);
            }
            ctx.emit(AudioEvent::SequenceLooped {
                sequence_id: self.id,
                loop_count: self.current_loop,
                at: ctx.clock,
            });
            debug!("Sequence {} loop {}", self.id, self.current_loop);
            self.start_turn(ctx);
            CycleOutcome::Looped
        } else {
            self.state = SequenceState::Completed;
            ctx.emit(AudioEvent::SequenceCompleted {
                sequence_id: self.id,
                at: ctx.clock,
            });
            info!("Sequence {} '{}' completed", self.id, self.label);
            CycleOutcome::Completed
        }
    }

    pub fn pause(&mut self, ctx: &mut PlaybackContext<'_>) -> bool {
        if self.state != SequenceState::Playing {
            return false;
        }
        self.method.pause(&mut self.instances, ctx.timers);
        self.state = SequenceState::Paused;
        ctx.emit(AudioEvent::SequencePaused {
            sequence_id: self.id,
            at: ctx.clock,
        });
        true
    }

    pub fn resume(&mut self, ctx: &mut PlaybackContext<'_>) -> bool {
        if self.state != SequenceState::Paused {
            return false;
        }
        self.method.resume(&mut self.instances, ctx.timers);
        self.state = SequenceState::Playing;
        ctx.emit(AudioEvent::SequenceResumed {
            sequence_id: self.id,
            at: ctx.clock,
        });
        true
    }

    /// Halt every instance; pending completion timers become stale
    pub fn stop(&mut self, ctx: &mut PlaybackContext<'_>) -> bool {
        if !self.is_active() {
            return false;
        }
        self.method.stop(&mut self.instances, ctx.timers);
        self.state = SequenceState::Stopped;
        ctx.emit(AudioEvent::SequenceStopped {
            sequence_id: self.id,
            at: ctx.clock,
        });
        info!("Sequence {} '{}' stopped", self.id, self.label);
        true
    }

    /// Advance backend time on every owned channel
    pub fn tick_channels(&mut self, dt: f32) {
        for inst in &mut self.instances {
            inst.channel_mut().tick(dt);
        }
    }

    /// Hand the owned instances back, e.g. to return them to the pool
    pub fn take_instances(&mut self) -> Vec<PlaybackInstance> {
        std::mem::take(&mut self.instances)
    }

    /// Forget the request and return to Idle
    pub fn reset(&mut self) {
        self.label.clear();
        self.state = SequenceState::Idle;
        self.method = PlayMethod::Single;
        self.clips.clear();
        self.instances.clear();
        self.loop_count = None;
        self.current_loop = 0;
        self.completed_count = 0;
        self.recycle = true;
        self.pending_turn = false;
    }
}

impl Default for PlaybackSequence {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_sequential_wraps() {
        let mut method = PlayMethod::for_strategy(PlayStrategy::PlayInOrder);
        let mut rng = StdRng::seed_from_u64(0);
        let picks: Vec<_> = (0..5).map(|_| method.pick(3, &mut rng)).collect();
        assert_eq!(picks, vec![0, 1, 2, 0, 1]);
    }

    #[test]
    fn test_random_avoid_repeat() {
        let mut method = PlayMethod::Random {
            avoid_repeat: true,
            last: None,
        };
        let mut rng = StdRng::seed_from_u64(42);
        let mut prev = method.pick(2, &mut rng);
        for _ in 0..50 {
            let next = method.pick(2, &mut rng);
            assert_ne!(next, prev);
            prev = next;
        }
    }

    #[test]
    fn test_random_covers_members() {
        let mut method = PlayMethod::for_strategy(PlayStrategy::RandomFromSet);
        let mut rng = StdRng::seed_from_u64(7);
        let mut seen = [false; 4];
        for _ in 0..200 {
            seen[method.pick(4, &mut rng)] = true;
        }
        assert!(seen.iter().all(|s| *s));
    }

    #[test]
    fn test_resume_keeps_selection_state() {
        let mut rng = StdRng::seed_from_u64(0);
        let mut first = PlayMethod::for_strategy(PlayStrategy::PlayInOrder);
        first.pick(3, &mut rng);
        first.pick(3, &mut rng);

        let mut next = PlayMethod::for_strategy(PlayStrategy::PlayInOrder).resume_from(&first);
        assert_eq!(next.pick(3, &mut rng), 2);

        let random = PlayMethod::Random {
            avoid_repeat: true,
            last: None,
        }
        .resume_from(&PlayMethod::Random {
            avoid_repeat: false,
            last: Some(1),
        });
        assert_eq!(
            random,
            PlayMethod::Random {
                avoid_repeat: true,
                last: Some(1)
            }
        );

        // Kind changed, e.g. a mode override on the same group
        let combined = PlayMethod::Combined.resume_from(&first);
        assert_eq!(combined, PlayMethod::Combined);
    }

    #[test]
    fn test_instance_counts() {
        assert_eq!(PlayMethod::Combined.instance_count(3), 3);
        assert_eq!(PlayMethod::Single.instance_count(1), 1);
        assert_eq!(PlayMethod::Sequential { cursor: 0 }.instance_count(4), 1);
    }
}
