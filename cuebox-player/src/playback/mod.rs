//! One-shot clip playback
//!
//! Requests are resolved against the catalog ([`resolver`]), turned into a
//! [`PlaybackSequence`] owning one or more [`PlaybackInstance`]s, and driven by
//! the service's timer queue. Finished sequences go back to the
//! [`ChannelPool`].

pub mod instance;
pub mod pool;
pub mod resolver;
pub mod sequence;

use cuebox_common::config::AudioSettings;
use cuebox_common::events::{AudioEvent, EventBus, SequenceId};
use rand::rngs::StdRng;

use crate::scheduler::TimerQueue;

pub use instance::{InstanceState, PlaybackInstance};
pub use pool::{ChannelPool, PoolStats};
pub use resolver::{AudioRequest, PlayStrategy, RequestResolver, ResolvedRequest};
pub use sequence::{CycleOutcome, PlayMethod, PlaybackSequence, SequenceState};

/// Completion timer payload: which instance of which sequence finished
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerTarget {
    pub sequence: SequenceId,
    pub slot: usize,
}

/// Borrowed service state handed down to sequences and instances
pub struct PlaybackContext<'a> {
    pub timers: &'a mut TimerQueue<TimerTarget>,
    pub events: &'a EventBus,
    pub settings: &'a AudioSettings,
    pub rng: &'a mut StdRng,
    /// Game clock in seconds
    pub clock: f64,
}

impl PlaybackContext<'_> {
    pub(crate) fn emit(&self, event: AudioEvent) {
        self.events.emit_lossy(event);
    }
}
