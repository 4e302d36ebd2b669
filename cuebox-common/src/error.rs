//! Common error types for cuebox

use thiserror::Error;

/// Common result type for cuebox operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across the cuebox crates
#[derive(Error, Debug)]
pub enum Error {
    /// Requested clip, group or playlist id is not in the catalog
    #[error("Not found: {0}")]
    NotFound(String),

    /// The global playback gate forbids this kind of audio
    #[error("Playback disabled: {0}")]
    PlaybackDisabled(String),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML document could not be parsed
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid catalog entry or request parameter
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Operation not valid in the current lifecycle state
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// A music transition was requested while another one is running
    #[error("Transition conflict: {0}")]
    TransitionConflict(String),
}
