//! Lifecycle events and the EventBus
//!
//! Playback sequences and the music player announce their lifecycle through
//! [`AudioEvent`]. Gameplay and UI code subscribe through the [`EventBus`];
//! dropping a receiver unsubscribes it.
//!
//! The bus is a `tokio::sync::broadcast` channel. Sending never blocks and
//! receivers can drain with `try_recv()`, so a single-threaded game loop can
//! use it without an async runtime.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::transition::TransitionKind;

/// Identity of one logical play request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SequenceId(pub Uuid);

impl SequenceId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SequenceId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SequenceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Audio lifecycle events
///
/// `at` is the game clock in seconds (sum of all ticks since service init).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum AudioEvent {
    /// A sequence started a play cycle
    SequenceStarted {
        sequence_id: SequenceId,
        /// Request label (clip id, group id, or ad-hoc list)
        request: String,
        at: f64,
    },

    /// Every instance finished and a further loop was started
    SequenceLooped {
        sequence_id: SequenceId,
        /// Loops completed so far
        loop_count: u32,
        at: f64,
    },

    /// Every instance finished and no loop remains
    SequenceCompleted { sequence_id: SequenceId, at: f64 },

    /// Stopped explicitly before completing
    SequenceStopped { sequence_id: SequenceId, at: f64 },

    SequencePaused { sequence_id: SequenceId, at: f64 },

    SequenceResumed { sequence_id: SequenceId, at: f64 },

    /// A music track became the primary track
    MusicStarted { clip_id: String, at: f64 },

    MusicStopped { at: f64 },

    MusicPaused { at: f64 },

    MusicResumed { at: f64 },

    TransitionStarted { kind: TransitionKind, at: f64 },

    TransitionCompleted { kind: TransitionKind, at: f64 },

    /// The playlist moved on to track `index`
    PlaylistAdvanced {
        playlist_id: String,
        index: usize,
        at: f64,
    },

    /// A non-looping playlist ran out of tracks
    PlaylistCompleted { playlist_id: String, at: f64 },
}

impl AudioEvent {
    /// Sequence this event belongs to, if any
    pub fn sequence_id(&self) -> Option<SequenceId> {
        match self {
            AudioEvent::SequenceStarted { sequence_id, .. }
            | AudioEvent::SequenceLooped { sequence_id, .. }
            | AudioEvent::SequenceCompleted { sequence_id, .. }
            | AudioEvent::SequenceStopped { sequence_id, .. }
            | AudioEvent::SequencePaused { sequence_id, .. }
            | AudioEvent::SequenceResumed { sequence_id, .. } => Some(*sequence_id),
            _ => None,
        }
    }

    /// Short event name for log lines
    pub fn name(&self) -> &'static str {
        match self {
            AudioEvent::SequenceStarted { .. } => "SequenceStarted",
            AudioEvent::SequenceLooped { .. } => "SequenceLooped",
            AudioEvent::SequenceCompleted { .. } => "SequenceCompleted",
            AudioEvent::SequenceStopped { .. } => "SequenceStopped",
            AudioEvent::SequencePaused { .. } => "SequencePaused",
            AudioEvent::SequenceResumed { .. } => "SequenceResumed",
            AudioEvent::MusicStarted { .. } => "MusicStarted",
            AudioEvent::MusicStopped { .. } => "MusicStopped",
            AudioEvent::MusicPaused { .. } => "MusicPaused",
            AudioEvent::MusicResumed { .. } => "MusicResumed",
            AudioEvent::TransitionStarted { .. } => "TransitionStarted",
            AudioEvent::TransitionCompleted { .. } => "TransitionCompleted",
            AudioEvent::PlaylistAdvanced { .. } => "PlaylistAdvanced",
            AudioEvent::PlaylistCompleted { .. } => "PlaylistCompleted",
        }
    }

    /// JSON line representation
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// Central event distribution bus
///
/// - Non-blocking publish (slow subscribers lag instead of stalling playback)
/// - Multiple subscribers
/// - Automatic unsubscribe when a receiver is dropped
///
/// # Examples
///
/// ```
/// use cuebox_common::events::{AudioEvent, EventBus};
///
/// let bus = EventBus::new(64);
/// let mut rx = bus.subscribe();
///
/// bus.emit_lossy(AudioEvent::MusicStopped { at: 1.5 });
///
/// match rx.try_recv() {
///     Ok(AudioEvent::MusicStopped { at }) => assert_eq!(at, 1.5),
///     other => panic!("unexpected {:?}", other),
/// }
/// ```
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<AudioEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus buffering up to `capacity` events per receiver
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self {
            tx,
            capacity: capacity.max(1),
        }
    }

    /// Subscribe to all future events
    pub fn subscribe(&self) -> broadcast::Receiver<AudioEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Ok(subscriber_count)` if at least one subscriber exists.
    #[allow(clippy::result_large_err)]
    pub fn emit(
        &self,
        event: AudioEvent,
    ) -> Result<usize, broadcast::error::SendError<AudioEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: AudioEvent) {
        let _ = self.tx.send(event);
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}
