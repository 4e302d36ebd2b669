//! Music playback: transitions, the two-channel music player and the
//! playlist driver. Runs beside the one-shot clip pipeline and shares only
//! the channel factory and the event bus with it.

pub mod player;
pub mod playlist;
pub mod transition;

pub use player::MusicPlayer;
pub use playlist::PlaylistPlayer;
pub use transition::{IncomingTrack, MusicDeck, Transition, TransitionPhase, TransitionStep};
