//! Music transition descriptors
//!
//! Shared between playlist descriptors (custom per-playlist transitions) and
//! configuration (the default transition). The transition engine itself lives
//! in the player crate.

use crate::fade_curves::FadeCurve;
use serde::{Deserialize, Serialize};

/// How the outgoing and incoming music are joined
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TransitionKind {
    /// Immediate swap, zero duration
    Cut,
    /// Volume ramp on a single channel
    #[default]
    Fade,
    /// Parallel ramps on two channels
    CrossFade,
}

/// Which side(s) of the switch are ramped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TransitionMode {
    /// Ramp 0 → target
    In,
    /// Ramp target → 0
    Out,
    /// Ramp down, swap, ramp up
    #[default]
    InAndOut,
}

/// Complete description of one transition
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TransitionSpec {
    #[serde(default)]
    pub kind: TransitionKind,
    #[serde(default)]
    pub mode: TransitionMode,
    /// Seconds; ignored for `Cut`
    #[serde(default = "default_duration")]
    pub duration: f32,
    #[serde(default)]
    pub curve: FadeCurve,
}

fn default_duration() -> f32 {
    1.0
}

impl Default for TransitionSpec {
    fn default() -> Self {
        Self {
            kind: TransitionKind::default(),
            mode: TransitionMode::default(),
            duration: default_duration(),
            curve: FadeCurve::default(),
        }
    }
}

impl TransitionSpec {
    pub fn cut() -> Self {
        Self {
            kind: TransitionKind::Cut,
            mode: TransitionMode::InAndOut,
            duration: 0.0,
            curve: FadeCurve::Linear,
        }
    }

    pub fn fade(mode: TransitionMode, duration: f32) -> Self {
        Self {
            kind: TransitionKind::Fade,
            mode,
            duration: duration.max(0.0),
            curve: FadeCurve::Linear,
        }
    }

    pub fn cross_fade(duration: f32) -> Self {
        Self {
            kind: TransitionKind::CrossFade,
            mode: TransitionMode::InAndOut,
            duration: duration.max(0.0),
            curve: FadeCurve::Linear,
        }
    }

    pub fn with_curve(mut self, curve: FadeCurve) -> Self {
        self.curve = curve;
        self
    }

    /// Duration actually spent ramping (always 0 for a cut)
    pub fn effective_duration(&self) -> f32 {
        match self.kind {
            TransitionKind::Cut => 0.0,
            _ => self.duration.max(0.0),
        }
    }
}
