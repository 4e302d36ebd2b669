//! # cuebox player library
//!
//! Request-driven sound scheduling on top of an abstract sound channel.
//!
//! **Purpose:** Resolve clip and group requests against the catalog, run them
//! as pooled playback sequences with composable edits, and switch music tracks
//! and playlists with cut, fade and cross-fade transitions.
//!
//! **Architecture:** Single-threaded and tick driven. [`service::AudioService`]
//! owns every moving part and advances them from one `tick(dt)` per frame;
//! waiting is expressed through [`scheduler::TimerQueue`] rather than threads.

pub mod channel;
pub mod edits;
pub mod music;
pub mod playback;
pub mod scheduler;
pub mod service;

pub use cuebox_common::{Error, Result};
pub use service::AudioService;
