//! # cuebox common library
//!
//! Shared code for the cuebox crates:
//! - Catalog descriptors (clips, groups, playlists) and lookup
//! - Lifecycle event types and the EventBus
//! - Configuration loading and audio settings
//! - Transition descriptors and fade curves

pub mod catalog;
pub mod config;
pub mod error;
pub mod events;
pub mod fade_curves;
pub mod transition;

pub use error::{Error, Result};
pub use fade_curves::FadeCurve;
