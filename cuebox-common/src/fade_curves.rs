//! Fade curves for music transitions
//!
//! Volume ramps in music transitions are shaped by one
//! of five curves. A curve maps normalized progress `t` (0.0 at the start of
//! the ramp, 1.0 at the end) to a gain multiplier in `[0.0, 1.0]`.
//!
//! Callers scale the multiplier by the volume the ramp starts from, so a
//! linear cross-fade from 0.8 sits at 0.4/0.4 halfway through.

use serde::{Deserialize, Serialize};
use std::f32::consts::FRAC_PI_2;
use std::str::FromStr;

/// Fade curve types for transitions
///
/// - Linear: Constant rate of change (the default, predictable mid-points)
/// - Exponential: Slow start, fast finish
/// - Logarithmic: Fast start, slow finish
/// - SCurve: Smooth acceleration and deceleration
/// - EqualPower: Constant perceived loudness across a cross-fade
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum FadeCurve {
    /// v(t) = t
    #[default]
    Linear,

    /// v(t) = t²
    Exponential,

    /// v(t) = (1-t)² when fading out
    Logarithmic,

    /// v(t) = 0.5 × (1 - cos(π × t))
    #[serde(alias = "cosine")]
    SCurve,

    /// v(t) = sin(t × π/2)
    EqualPower,
}

impl FadeCurve {
    /// Fade-in multiplier at normalized `position` (0.0 = silent, 1.0 = full)
    pub fn calculate_fade_in(&self, position: f32) -> f32 {
        let t = position.clamp(0.0, 1.0);

        match self {
            FadeCurve::Linear => t,
            FadeCurve::Exponential => t * t,
            // Inverse of the quadratic fade-out
            FadeCurve::Logarithmic => t.sqrt(),
            FadeCurve::SCurve => 0.5 * (1.0 - (std::f32::consts::PI * t).cos()),
            FadeCurve::EqualPower => (t * FRAC_PI_2).sin(),
        }
    }

    /// Fade-out multiplier at normalized `position` (1.0 at start, 0.0 at end)
    pub fn calculate_fade_out(&self, position: f32) -> f32 {
        let t = position.clamp(0.0, 1.0);

        match self {
            FadeCurve::Linear => 1.0 - t,
            FadeCurve::Exponential | FadeCurve::Logarithmic => {
                let inv = 1.0 - t;
                inv * inv
            }
            FadeCurve::SCurve => 0.5 * (1.0 + (std::f32::consts::PI * t).cos()),
            FadeCurve::EqualPower => (t * FRAC_PI_2).cos(),
        }
    }

    /// Gain for a ramp that starts at `from_volume`, clamped to `[0, from_volume]`
    pub fn ramp(&self, position: f32, from_volume: f32, fading_in: bool) -> f32 {
        let multiplier = if fading_in {
            self.calculate_fade_in(position)
        } else {
            self.calculate_fade_out(position)
        };
        let ceiling = from_volume.max(0.0);
        (multiplier * ceiling).clamp(0.0, ceiling)
    }

    /// Canonical config-file spelling
    pub fn to_config_string(&self) -> &'static str {
        match self {
            FadeCurve::Linear => "linear",
            FadeCurve::Exponential => "exponential",
            FadeCurve::Logarithmic => "logarithmic",
            FadeCurve::SCurve => "s_curve",
            FadeCurve::EqualPower => "equal_power",
        }
    }

    /// Human-readable display name
    pub fn display_name(&self) -> &'static str {
        match self {
            FadeCurve::Linear => "Linear",
            FadeCurve::Exponential => "Exponential",
            FadeCurve::Logarithmic => "Logarithmic",
            FadeCurve::SCurve => "S-Curve",
            FadeCurve::EqualPower => "Equal Power",
        }
    }

    /// All curve variants
    pub fn all_variants() -> &'static [FadeCurve] {
        &[
            FadeCurve::Linear,
            FadeCurve::Exponential,
            FadeCurve::Logarithmic,
            FadeCurve::SCurve,
            FadeCurve::EqualPower,
        ]
    }
}

impl FromStr for FadeCurve {
    type Err = crate::Error;

    /// Accepts the config spelling plus the usual aliases, case-insensitive
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "linear" => Ok(FadeCurve::Linear),
            "exponential" => Ok(FadeCurve::Exponential),
            "logarithmic" => Ok(FadeCurve::Logarithmic),
            "cosine" | "scurve" | "s-curve" | "s_curve" => Ok(FadeCurve::SCurve),
            "equal_power" | "equalpower" => Ok(FadeCurve::EqualPower),
            other => Err(crate::Error::InvalidInput(format!(
                "unknown fade curve '{}'",
                other
            ))),
        }
    }
}

impl std::fmt::Display for FadeCurve {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fade_in_bounds() {
        for curve in FadeCurve::all_variants() {
            let start_val = curve.calculate_fade_in(0.0);
            let end_val = curve.calculate_fade_in(1.0);
            assert!(
                start_val.abs() < 0.01,
                "{:?} fade-in at 0.0 should be ~0.0, got {}",
                curve,
                start_val
            );
            assert!(
                (end_val - 1.0).abs() < 0.01,
                "{:?} fade-in at 1.0 should be ~1.0, got {}",
                curve,
                end_val
            );
        }
    }

    #[test]
    fn test_fade_out_bounds() {
        for curve in FadeCurve::all_variants() {
            let start_val = curve.calculate_fade_out(0.0);
            let end_val = curve.calculate_fade_out(1.0);
            assert!((start_val - 1.0).abs() < 0.01, "{:?} start {}", curve, start_val);
            assert!(end_val.abs() < 0.01, "{:?} end {}", curve, end_val);
        }
    }

    #[test]
    fn test_linear_ramp_scaled_by_start_volume() {
        let out = FadeCurve::Linear.ramp(0.5, 0.8, false);
        let inc = FadeCurve::Linear.ramp(0.5, 0.8, true);
        assert!((out - 0.4).abs() < 1e-6);
        assert!((inc - 0.4).abs() < 1e-6);
    }

    #[test]
    fn test_ramp_clamps_out_of_range_progress() {
        assert_eq!(FadeCurve::Linear.ramp(-1.0, 0.5, true), 0.0);
        assert_eq!(FadeCurve::Linear.ramp(3.0, 0.5, true), 0.5);
        assert_eq!(FadeCurve::SCurve.ramp(0.5, -2.0, true), 0.0);
    }

    #[test]
    fn test_config_round_trip() {
        for curve in FadeCurve::all_variants() {
            let parsed: FadeCurve = curve.to_config_string().parse().unwrap();
            assert_eq!(*curve, parsed, "Round-trip failed for {:?}", curve);
        }
    }

    #[test]
    fn test_parse_aliases_and_invalid() {
        assert_eq!("cosine".parse::<FadeCurve>().unwrap(), FadeCurve::SCurve);
        assert_eq!("S-Curve".parse::<FadeCurve>().unwrap(), FadeCurve::SCurve);
        assert_eq!("EqualPower".parse::<FadeCurve>().unwrap(), FadeCurve::EqualPower);
        assert!("wobble".parse::<FadeCurve>().is_err());
        assert!("".parse::<FadeCurve>().is_err());
    }

    #[test]
    fn test_default_is_linear() {
        assert_eq!(FadeCurve::default(), FadeCurve::Linear);
        assert_eq!(format!("{}", FadeCurve::EqualPower), "Equal Power");
    }
}
