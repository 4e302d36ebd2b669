//! Channel pool
//!
//! Free lists of idle instances and sequences. Acquiring from an empty list
//! creates a new object through the channel factory, so the pool never
//! refuses a request. Releasing resets the object before it is stored.
//!
//! Only the game-loop thread touches the pool, so there is no locking.

use tracing::debug;

use super::instance::{InstanceState, PlaybackInstance};
use super::sequence::PlaybackSequence;
use crate::channel::ChannelFactory;

/// Pool counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PoolStats {
    pub free_instances: usize,
    pub free_sequences: usize,
    pub instances_created: usize,
    pub sequences_created: usize,
    /// Acquisitions served from a free list
    pub reuses: usize,
}

pub struct ChannelPool {
    factory: ChannelFactory,
    free_instances: Vec<PlaybackInstance>,
    free_sequences: Vec<PlaybackSequence>,
    instances_created: usize,
    sequences_created: usize,
    reuses: usize,
}

impl ChannelPool {
    pub fn new(factory: ChannelFactory) -> Self {
        Self {
            factory,
            free_instances: Vec::new(),
            free_sequences: Vec::new(),
            instances_created: 0,
            sequences_created: 0,
            reuses: 0,
        }
    }

    /// Top the instance free list up to `count`
    pub fn prewarm(&mut self, count: usize) {
        while self.free_instances.len() < count {
            let inst = self.create_instance();
            self.free_instances.push(inst);
        }
        debug!("Pool prewarmed with {} instance(s)", self.free_instances.len());
    }

    fn create_instance(&mut self) -> PlaybackInstance {
        self.instances_created += 1;
        PlaybackInstance::new((self.factory)())
    }

    /// Take an Unassigned instance, creating one when the pool is empty
    pub fn acquire_instance(&mut self) -> PlaybackInstance {
        match self.free_instances.pop() {
            Some(inst) => {
                self.reuses += 1;
                inst
            }
            None => {
                debug!(
                    "Instance pool empty, creating instance #{}",
                    self.instances_created + 1
                );
                self.create_instance()
            }
        }
    }

    /// Reset (reverting edits) and store an instance
    pub fn release_instance(&mut self, mut inst: PlaybackInstance) {
        inst.reset(true);
        debug_assert_eq!(inst.state(), InstanceState::Unassigned);
        self.free_instances.push(inst);
    }

    pub fn acquire_sequence(&mut self) -> PlaybackSequence {
        match self.free_sequences.pop() {
            Some(seq) => {
                self.reuses += 1;
                seq
            }
            None => {
                self.sequences_created += 1;
                PlaybackSequence::new()
            }
        }
    }

    /// Release a sequence together with every instance it owns
    pub fn release_sequence(&mut self, mut seq: PlaybackSequence) {
        for inst in seq.take_instances() {
            self.release_instance(inst);
        }
        seq.reset();
        self.free_sequences.push(seq);
    }

    pub fn idle_instances(&self) -> &[PlaybackInstance] {
        &self.free_instances
    }

    pub fn stats(&self) -> PoolStats {
        PoolStats {
            free_instances: self.free_instances.len(),
            free_sequences: self.free_sequences.len(),
            instances_created: self.instances_created,
            sequences_created: self.sequences_created,
            reuses: self.reuses,
        }
    }
}

impl std::fmt::Debug for ChannelPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChannelPool")
            .field("stats", &self.stats())
            .finish()
    }
}
