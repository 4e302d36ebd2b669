//! Numeric edit values
//!
//! A value is either fixed, a random draw around a base, or a uniform draw
//! between two bounds. Out-of-domain arguments are clamped when the value is
//! built, and every draw is clamped again so variance can never escape the
//! domain.

use rand::Rng;

/// Volume domain
pub const VOLUME_RANGE: (f32, f32) = (0.0, 1.0);

/// Pitch domain
pub const PITCH_RANGE: (f32, f32) = (-3.0, 3.0);

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EditValue {
    Fixed(f32),
    /// `base` plus a uniform offset in `[-spread, spread]`
    Variance { base: f32, spread: f32 },
    /// Uniform in `[min, max]`
    Range { min: f32, max: f32 },
}

impl EditValue {
    /// Clamp the value's arguments into `(lo, hi)`
    pub fn clamped(self, (lo, hi): (f32, f32)) -> Self {
        match self {
            EditValue::Fixed(v) => EditValue::Fixed(clamp_finite(v, lo, hi)),
            EditValue::Variance { base, spread } => EditValue::Variance {
                base: clamp_finite(base, lo, hi),
                spread: if spread.is_finite() { spread.abs() } else { 0.0 },
            },
            EditValue::Range { min, max } => {
                let a = clamp_finite(min, lo, hi);
                let b = clamp_finite(max, lo, hi);
                EditValue::Range {
                    min: a.min(b),
                    max: a.max(b),
                }
            }
        }
    }

    /// Draw a concrete value, clamped into `(lo, hi)`
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R, (lo, hi): (f32, f32)) -> f32 {
        let raw = match *self {
            EditValue::Fixed(v) => v,
            EditValue::Variance { base, spread } => {
                if spread > 0.0 {
                    base + rng.gen_range(-spread..=spread)
                } else {
                    base
                }
            }
            EditValue::Range { min, max } => {
                if max > min {
                    rng.gen_range(min..=max)
                } else {
                    min
                }
            }
        };
        clamp_finite(raw, lo, hi)
    }

    pub fn is_random(&self) -> bool {
        !matches!(self, EditValue::Fixed(_))
    }
}

fn clamp_finite(v: f32, lo: f32, hi: f32) -> f32 {
    if v.is_nan() {
        lo
    } else {
        v.clamp(lo, hi)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_fixed_clamped_at_construction() {
        assert_eq!(EditValue::Fixed(1.7).clamped(VOLUME_RANGE), EditValue::Fixed(1.0));
        assert_eq!(EditValue::Fixed(-5.0).clamped(PITCH_RANGE), EditValue::Fixed(-3.0));
        assert_eq!(EditValue::Fixed(f32::NAN).clamped(VOLUME_RANGE), EditValue::Fixed(0.0));
    }

    #[test]
    fn test_range_bounds_swapped() {
        let v = EditValue::Range { min: 0.9, max: 0.2 }.clamped(VOLUME_RANGE);
        assert_eq!(v, EditValue::Range { min: 0.2, max: 0.9 });
    }

    #[test]
    fn test_draws_stay_in_domain() {
        let mut rng = StdRng::seed_from_u64(11);
        let volume = EditValue::Variance {
            base: 0.95,
            spread: 0.5,
        }
        .clamped(VOLUME_RANGE);
        let pitch = EditValue::Range {
            min: -10.0,
            max: 10.0,
        }
        .clamped(PITCH_RANGE);

        for _ in 0..500 {
            let v = volume.sample(&mut rng, VOLUME_RANGE);
            assert!((0.0..=1.0).contains(&v));
            let p = pitch.sample(&mut rng, PITCH_RANGE);
            assert!((-3.0..=3.0).contains(&p));
        }
    }

    #[test]
    fn test_zero_spread_is_base() {
        let mut rng = StdRng::seed_from_u64(1);
        let v = EditValue::Variance {
            base: 0.4,
            spread: 0.0,
        };
        assert_eq!(v.sample(&mut rng, VOLUME_RANGE), 0.4);
        assert!(v.is_random());
    }
}
