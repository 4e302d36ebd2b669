//! Edit modules
//!
//! An edit is a small mutation bound to one play request: volume, pitch,
//! delay, loop count, placement, routing, pooling. Edits are applied to a
//! playback instance when it is initialized, reverted when it returns to the
//! pool, and the ones flagged [`EditModule::process_on_loop`] run again after
//! every loop.
//!
//! An [`EditSet`] holds at most one edit of each [`EditKind`]. Adding a second
//! edit of the same kind replaces the first in place, so application order is
//! the order in which each kind was first registered.

pub mod params;
pub mod value;

use cuebox_common::catalog::ClipDescriptor;
use rand::Rng;

use crate::channel::AudioChannel;
pub use params::{EditParameters, ParamValue};
pub use value::{EditValue, PITCH_RANGE, VOLUME_RANGE};

/// Number of times a looped request plays
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopCount {
    Infinite,
    Times(u32),
}

impl LoopCount {
    /// Negative counts mean infinite
    pub fn from_count(count: i64) -> Self {
        if count < 0 {
            LoopCount::Infinite
        } else {
            LoopCount::Times(count.min(u32::MAX as i64) as u32)
        }
    }

    pub fn as_count(&self) -> i64 {
        match self {
            LoopCount::Infinite => -1,
            LoopCount::Times(n) => *n as i64,
        }
    }
}

/// Discriminant used to key an [`EditSet`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EditKind {
    Volume,
    Pitch,
    Delay,
    Loop,
    Position,
    Output,
    Parent,
    Pool,
    DynamicTime,
}

#[derive(Debug, Clone, PartialEq)]
pub enum EditModule {
    Volume(EditValue),
    Pitch(EditValue),
    /// Silence before playback starts; `ignore_after_first` drops it on loops
    Delay {
        delay: f32,
        ignore_after_first: bool,
    },
    Loop(LoopCount),
    Position([f32; 3]),
    /// Output (mixer) group
    Output(String),
    /// Scene anchor
    Parent(String),
    /// Overrides the configured recycle-on-complete behaviour
    Pool {
        recycle: bool,
    },
    /// Whether the clip's dynamic start offset is skipped
    DynamicTime(bool),
}

/// What an edit operates on: the channel, the parameter bag and the bound clip
pub struct EditTarget<'a> {
    pub channel: &'a mut dyn AudioChannel,
    pub params: &'a mut EditParameters,
    pub clip: &'a ClipDescriptor,
}

impl EditModule {
    pub fn volume(value: EditValue) -> Self {
        EditModule::Volume(value.clamped(VOLUME_RANGE))
    }

    pub fn pitch(value: EditValue) -> Self {
        EditModule::Pitch(value.clamped(PITCH_RANGE))
    }

    pub fn delay(delay: f32, ignore_after_first: bool) -> Self {
        EditModule::Delay {
            delay: if delay.is_finite() { delay.max(0.0) } else { 0.0 },
            ignore_after_first,
        }
    }

    /// `count < 0` loops forever
    pub fn looped(count: i64) -> Self {
        EditModule::Loop(LoopCount::from_count(count))
    }

    pub fn kind(&self) -> EditKind {
        match self {
            EditModule::Volume(_) => EditKind::Volume,
            EditModule::Pitch(_) => EditKind::Pitch,
            EditModule::Delay { .. } => EditKind::Delay,
            EditModule::Loop(_) => EditKind::Loop,
            EditModule::Position(_) => EditKind::Position,
            EditModule::Output(_) => EditKind::Output,
            EditModule::Parent(_) => EditKind::Parent,
            EditModule::Pool { .. } => EditKind::Pool,
            EditModule::DynamicTime(_) => EditKind::DynamicTime,
        }
    }

    /// Runs again after every loop iteration
    pub fn process_on_loop(&self) -> bool {
        matches!(self, EditModule::Volume(_) | EditModule::Pitch(_))
    }

    pub fn process<R: Rng + ?Sized>(&self, target: &mut EditTarget<'_>, rng: &mut R) {
        match self {
            EditModule::Volume(value) => {
                let v = value.sample(rng, VOLUME_RANGE);
                target.channel.set_volume(v);
            }
            EditModule::Pitch(value) => {
                let p = value.sample(rng, PITCH_RANGE);
                target.channel.set_pitch(p);
            }
            EditModule::Delay {
                delay,
                ignore_after_first,
            } => {
                target.params.set(params::DELAY, ParamValue::Float(*delay));
                target
                    .params
                    .set(params::LOOP_WITH_DELAYS, ParamValue::Bool(!ignore_after_first));
            }
            EditModule::Loop(count) => {
                target
                    .params
                    .set(params::LOOP_COUNT, ParamValue::Int(count.as_count()));
            }
            EditModule::Position(position) => target.channel.set_position(*position),
            EditModule::Output(group) => target.channel.set_output(Some(group.clone())),
            EditModule::Parent(anchor) => target.channel.set_parent(Some(anchor.clone())),
            EditModule::Pool { recycle } => {
                target.params.set(params::RECYCLE, ParamValue::Bool(*recycle));
            }
            EditModule::DynamicTime(enabled) => {
                target
                    .params
                    .set(params::DYNAMIC_TIME, ParamValue::Bool(*enabled));
            }
        }
    }

    /// Undo this edit, restoring clip or channel defaults
    pub fn revert(&self, target: &mut EditTarget<'_>) {
        match self {
            EditModule::Volume(_) => target.channel.set_volume(target.clip.volume),
            EditModule::Pitch(_) => target.channel.set_pitch(target.clip.pitch),
            EditModule::Delay { .. } => {
                target.params.remove(params::DELAY);
                target.params.remove(params::LOOP_WITH_DELAYS);
            }
            EditModule::Loop(_) => {
                target.params.remove(params::LOOP_COUNT);
            }
            EditModule::Position(_) => target.channel.set_position([0.0; 3]),
            EditModule::Output(_) => target.channel.set_output(None),
            EditModule::Parent(_) => target.channel.set_parent(None),
            EditModule::Pool { .. } => {
                target.params.remove(params::RECYCLE);
            }
            EditModule::DynamicTime(_) => {
                target
                    .params
                    .set(params::DYNAMIC_TIME, ParamValue::Bool(true));
            }
        }
    }
}

/// Ordered edits for one request, at most one per kind
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EditSet {
    modules: Vec<EditModule>,
}

impl EditSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an edit, replacing an existing edit of the same kind in place
    pub fn insert(&mut self, module: EditModule) {
        let kind = module.kind();
        match self.modules.iter_mut().find(|m| m.kind() == kind) {
            Some(existing) => *existing = module,
            None => self.modules.push(module),
        }
    }

    pub fn with(mut self, module: EditModule) -> Self {
        self.insert(module);
        self
    }

    pub fn get(&self, kind: EditKind) -> Option<&EditModule> {
        self.modules.iter().find(|m| m.kind() == kind)
    }

    pub fn contains(&self, kind: EditKind) -> bool {
        self.get(kind).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = &EditModule> {
        self.modules.iter()
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    pub fn clear(&mut self) {
        self.modules.clear();
    }

    pub fn loop_count(&self) -> Option<LoopCount> {
        match self.get(EditKind::Loop) {
            Some(EditModule::Loop(count)) => Some(*count),
            _ => None,
        }
    }

    pub fn recycle(&self) -> Option<bool> {
        match self.get(EditKind::Pool) {
            Some(EditModule::Pool { recycle }) => Some(*recycle),
            _ => None,
        }
    }

    /// Process every edit in registration order
    pub fn apply<R: Rng + ?Sized>(&self, target: &mut EditTarget<'_>, rng: &mut R) {
        for module in &self.modules {
            module.process(target, rng);
        }
    }

    /// Process only the loop-eligible edits
    pub fn apply_on_loop<R: Rng + ?Sized>(&self, target: &mut EditTarget<'_>, rng: &mut R) {
        for module in self.modules.iter().filter(|m| m.process_on_loop()) {
            module.process(target, rng);
        }
    }

    /// Revert every edit in registration order
    pub fn revert(&self, target: &mut EditTarget<'_>) {
        for module in &self.modules {
            module.revert(target);
        }
    }
}

impl FromIterator<EditModule> for EditSet {
    fn from_iter<I: IntoIterator<Item = EditModule>>(iter: I) -> Self {
        let mut set = EditSet::new();
        for module in iter {
            set.insert(module);
        }
        set
    }
}

impl From<Vec<EditModule>> for EditSet {
    fn from(modules: Vec<EditModule>) -> Self {
        modules.into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::SimulatedChannel;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_constructors_clamp() {
        assert_eq!(
            EditModule::volume(EditValue::Fixed(3.0)),
            EditModule::Volume(EditValue::Fixed(1.0))
        );
        assert_eq!(
            EditModule::pitch(EditValue::Fixed(-7.5)),
            EditModule::Pitch(EditValue::Fixed(-3.0))
        );
        assert_eq!(
            EditModule::delay(-2.0, false),
            EditModule::Delay {
                delay: 0.0,
                ignore_after_first: false
            }
        );
        assert_eq!(EditModule::looped(-4), EditModule::Loop(LoopCount::Infinite));
    }

    #[test]
    fn test_duplicate_kind_overwrites_in_place() {
        let set: EditSet = vec![
            EditModule::volume(EditValue::Fixed(0.2)),
            EditModule::looped(2),
            EditModule::volume(EditValue::Fixed(0.7)),
        ]
        .into();

        assert_eq!(set.len(), 2);
        let kinds: Vec<_> = set.iter().map(|m| m.kind()).collect();
        assert_eq!(kinds, vec![EditKind::Volume, EditKind::Loop]);
        assert_eq!(
            set.get(EditKind::Volume),
            Some(&EditModule::Volume(EditValue::Fixed(0.7)))
        );
    }

    #[test]
    fn test_apply_then_revert() {
        let clip = ClipDescriptor::new("hit", "hit.wav", 1.0).with_volume(0.6);
        let mut channel = SimulatedChannel::new();
        let mut params = EditParameters::new();
        let mut rng = StdRng::seed_from_u64(3);

        let set: EditSet = vec![
            EditModule::volume(EditValue::Fixed(0.3)),
            EditModule::delay(0.5, true),
            EditModule::Position([1.0, 2.0, 3.0]),
            EditModule::Output("sfx".into()),
            EditModule::DynamicTime(false),
        ]
        .into();

        {
            let mut target = EditTarget {
                channel: &mut channel,
                params: &mut params,
                clip: &clip,
            };
            set.apply(&mut target, &mut rng);
        }
        assert!((channel.volume() - 0.3).abs() < 1e-6);
        assert_eq!(channel.position(), [1.0, 2.0, 3.0]);
        assert_eq!(channel.output(), Some("sfx"));
        assert_eq!(params.get_float(params::DELAY), Some(0.5));
        assert_eq!(params.get_bool(params::LOOP_WITH_DELAYS), Some(false));
        assert_eq!(params.get_bool(params::DYNAMIC_TIME), Some(false));

        {
            let mut target = EditTarget {
                channel: &mut channel,
                params: &mut params,
                clip: &clip,
            };
            set.revert(&mut target);
        }
        assert!((channel.volume() - 0.6).abs() < 1e-6);
        assert_eq!(channel.position(), [0.0; 3]);
        assert_eq!(channel.output(), None);
        assert!(params.is_seed_only());
    }

    #[test]
    fn test_only_volume_and_pitch_rerun_on_loop() {
        let set: EditSet = vec![
            EditModule::volume(EditValue::Fixed(0.5)),
            EditModule::pitch(EditValue::Fixed(1.5)),
            EditModule::delay(1.0, false),
            EditModule::looped(3),
            EditModule::Position([0.0, 1.0, 0.0]),
        ]
        .into();
        let on_loop: Vec<_> = set
            .iter()
            .filter(|m| m.process_on_loop())
            .map(|m| m.kind())
            .collect();
        assert_eq!(on_loop, vec![EditKind::Volume, EditKind::Pitch]);
    }
}
