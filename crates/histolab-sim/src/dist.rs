//! Distribution suite.
//!
//! Continuous distributions for task durations and inter-arrival times,
//! plus the discretised three-point distributions used for block and slide
//! counts. All sampling draws from a caller-supplied stream so that one
//! shared stream per replication keeps execution deterministic.
//!
//! The PERT distribution is the Beta-rescaled three-point distribution:
//! α = 1 + shape·(mode−low)/(high−low), β = 1 + shape·(high−mode)/(high−low),
//! sample = low + Beta(α, β)·(high−low), mean = (low + shape·mode + high)/(shape + 2),
//! with shape fixed at 4.
//!
//! The integer variants sample the continuous distribution re-centred so the
//! mode sits at 0 with support (low−mode−0.5, high−mode+0.5), truncate
//! toward zero, and add the mode back.

use rand::Rng;
use rand::rngs::SmallRng;
use rand_distr::{Beta, Distribution as _, Exp, Triangular};
use thiserror::Error;

/// PERT shape parameter.
const PERT_SHAPE: f64 = 4.0;

/// Parameter errors, detected at construction time.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DistError {
    #[error("non-monotone distribution triple (low={low}, mode={mode}, high={high})")]
    NonMonotone { low: f64, mode: f64, high: f64 },

    #[error("rate must be positive (got {0})")]
    NonPositiveRate(f64),

    #[error("bounds must satisfy low <= high (low={low}, high={high})")]
    BadBounds { low: f64, high: f64 },
}

/// A continuous sampler.
#[derive(Debug, Clone)]
pub enum Dist {
    /// Always the same value.
    Constant(f64),
    /// Uniform on [low, high).
    Uniform { low: f64, high: f64 },
    /// Standard continuous triangular on [low, high] with the given mode.
    Triangular {
        tri: Triangular<f64>,
        low: f64,
        mode: f64,
        high: f64,
    },
    /// Three-point PERT (Beta-rescaled), shape = 4.
    Pert {
        beta: Beta<f64>,
        low: f64,
        mode: f64,
        high: f64,
    },
    /// Exponential with `rate` events per unit time.
    Exponential { exp: Exp<f64>, rate: f64 },
}

impl Dist {
    pub fn constant(v: f64) -> Self {
        Self::Constant(v)
    }

    pub fn uniform(low: f64, high: f64) -> Result<Self, DistError> {
        if low > high {
            return Err(DistError::BadBounds { low, high });
        }
        Ok(Self::Uniform { low, high })
    }

    pub fn triangular(low: f64, mode: f64, high: f64) -> Result<Self, DistError> {
        check_triple(low, mode, high)?;
        if high <= low {
            return Ok(Self::Constant(mode));
        }
        let tri = Triangular::new(low, high, mode)
            .map_err(|_| DistError::NonMonotone { low, mode, high })?;
        Ok(Self::Triangular {
            tri,
            low,
            mode,
            high,
        })
    }

    pub fn pert(low: f64, mode: f64, high: f64) -> Result<Self, DistError> {
        check_triple(low, mode, high)?;
        if high <= low {
            return Ok(Self::Constant(mode));
        }
        let range = high - low;
        let alpha = 1.0 + PERT_SHAPE * (mode - low) / range;
        let b = 1.0 + PERT_SHAPE * (high - mode) / range;
        let beta = Beta::new(alpha, b).map_err(|_| DistError::NonMonotone { low, mode, high })?;
        Ok(Self::Pert {
            beta,
            low,
            mode,
            high,
        })
    }

    pub fn exponential(rate: f64) -> Result<Self, DistError> {
        if rate <= 0.0 || !rate.is_finite() {
            return Err(DistError::NonPositiveRate(rate));
        }
        let exp = Exp::new(rate).map_err(|_| DistError::NonPositiveRate(rate))?;
        Ok(Self::Exponential { exp, rate })
    }

    /// Draws one sample.
    pub fn sample(&self, rng: &mut SmallRng) -> f64 {
        match self {
            Self::Constant(v) => *v,
            Self::Uniform { low, high } => low + (high - low) * rng.r#gen::<f64>(),
            Self::Triangular { tri, .. } => tri.sample(rng),
            Self::Pert {
                beta, low, high, ..
            } => low + beta.sample(rng) * (high - low),
            Self::Exponential { exp, .. } => exp.sample(rng),
        }
    }

    /// Theoretical mean.
    pub fn mean(&self) -> f64 {
        match self {
            Self::Constant(v) => *v,
            Self::Uniform { low, high } => (low + high) / 2.0,
            Self::Triangular {
                low, mode, high, ..
            } => (low + mode + high) / 3.0,
            Self::Pert {
                low, mode, high, ..
            } => (low + PERT_SHAPE * mode + high) / (PERT_SHAPE + 2.0),
            Self::Exponential { rate, .. } => 1.0 / rate,
        }
    }

    /// Rescales all parameters by a constant factor (time-unit conversion).
    pub fn scaled(&self, factor: f64) -> Result<Self, DistError> {
        match self {
            Self::Constant(v) => Ok(Self::Constant(v * factor)),
            Self::Uniform { low, high } => Self::uniform(low * factor, high * factor),
            Self::Triangular {
                low, mode, high, ..
            } => Self::triangular(low * factor, mode * factor, high * factor),
            Self::Pert {
                low, mode, high, ..
            } => Self::pert(low * factor, mode * factor, high * factor),
            Self::Exponential { rate, .. } => Self::exponential(rate / factor),
        }
    }
}

fn check_triple(low: f64, mode: f64, high: f64) -> Result<(), DistError> {
    if !(low <= mode && mode <= high) || !low.is_finite() || !high.is_finite() {
        return Err(DistError::NonMonotone { low, mode, high });
    }
    Ok(())
}

/// A discrete sampler for entity counts.
#[derive(Debug, Clone)]
pub enum IntDist {
    Constant(u32),
    /// Discretised triangular.
    Triangular { mode: u32, inner: Dist },
    /// Discretised PERT.
    Pert { mode: u32, inner: Dist },
}

impl IntDist {
    pub fn constant(v: u32) -> Self {
        Self::Constant(v)
    }

    pub fn triangular(low: u32, mode: u32, high: u32) -> Result<Self, DistError> {
        let inner = Dist::triangular(centred_low(low, mode), 0.0, centred_high(high, mode))?;
        Ok(Self::Triangular { mode, inner })
    }

    pub fn pert(low: u32, mode: u32, high: u32) -> Result<Self, DistError> {
        let inner = Dist::pert(centred_low(low, mode), 0.0, centred_high(high, mode))?;
        Ok(Self::Pert { mode, inner })
    }

    /// Draws one sample; truncation toward zero keeps the result in
    /// [low, high].
    pub fn sample(&self, rng: &mut SmallRng) -> u32 {
        match self {
            Self::Constant(v) => *v,
            Self::Triangular { mode, inner } | Self::Pert { mode, inner } => {
                let x = inner.sample(rng);
                (x as i64 + i64::from(*mode)).max(0) as u32
            }
        }
    }
}

fn centred_low(low: u32, mode: u32) -> f64 {
    f64::from(low) - f64::from(mode) - 0.5
}

fn centred_high(high: u32, mode: u32) -> f64 {
    f64::from(high) - f64::from(mode) + 0.5
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    const N: usize = 10_000;

    fn sample_stats(d: &Dist, seed: u64) -> (f64, f64) {
        let mut rng = SmallRng::seed_from_u64(seed);
        let samples: Vec<f64> = (0..N).map(|_| d.sample(&mut rng)).collect();
        let mean = samples.iter().sum::<f64>() / N as f64;
        let var = samples.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (N - 1) as f64;
        (mean, var.sqrt())
    }

    fn assert_mean(d: &Dist, expected: f64, seed: u64) {
        let (mean, sd) = sample_stats(d, seed);
        let tol = 3.0 * sd / (N as f64).sqrt();
        assert!(
            (mean - expected).abs() <= tol,
            "mean {mean} not within {tol} of {expected}"
        );
    }

    #[test]
    fn constant_is_constant() {
        let d = Dist::constant(2.5);
        let mut rng = SmallRng::seed_from_u64(0);
        for _ in 0..10 {
            assert_eq!(d.sample(&mut rng), 2.5);
        }
    }

    #[test]
    fn triangular_mean_matches_theory() {
        let d = Dist::triangular(1.0, 3.0, 8.0).unwrap();
        assert_eq!(d.mean(), 4.0);
        assert_mean(&d, 4.0, 11);
    }

    #[test]
    fn pert_mean_matches_theory() {
        let d = Dist::pert(2.0, 5.0, 14.0).unwrap();
        assert_eq!(d.mean(), (2.0 + 4.0 * 5.0 + 14.0) / 6.0);
        assert_mean(&d, d.mean(), 12);
    }

    #[test]
    fn exponential_mean_matches_theory() {
        let d = Dist::exponential(4.0).unwrap();
        assert_mean(&d, 0.25, 13);
    }

    #[test]
    fn pert_samples_stay_in_support() {
        let d = Dist::pert(1.0, 2.0, 4.0).unwrap();
        let mut rng = SmallRng::seed_from_u64(14);
        for _ in 0..1000 {
            let x = d.sample(&mut rng);
            assert!((1.0..=4.0).contains(&x));
        }
    }

    #[test]
    fn degenerate_triple_collapses_to_constant() {
        let d = Dist::pert(3.0, 3.0, 3.0).unwrap();
        assert!(matches!(d, Dist::Constant(v) if v == 3.0));
        let d = Dist::triangular(1.0, 1.0, 1.0).unwrap();
        assert!(matches!(d, Dist::Constant(v) if v == 1.0));
    }

    #[test]
    fn non_monotone_triple_rejected() {
        assert!(Dist::triangular(5.0, 3.0, 8.0).is_err());
        assert!(Dist::pert(0.0, 9.0, 4.0).is_err());
        assert!(Dist::exponential(0.0).is_err());
    }

    #[test]
    fn int_triangular_stays_in_bounds() {
        let d = IntDist::triangular(2, 4, 9).unwrap();
        let mut rng = SmallRng::seed_from_u64(15);
        for _ in 0..2000 {
            let x = d.sample(&mut rng);
            assert!((2..=9).contains(&x));
        }
    }

    #[test]
    fn int_pert_stays_in_bounds_and_hits_mode() {
        let d = IntDist::pert(1, 3, 6).unwrap();
        let mut rng = SmallRng::seed_from_u64(16);
        let mut hit_mode = false;
        for _ in 0..2000 {
            let x = d.sample(&mut rng);
            assert!((1..=6).contains(&x));
            hit_mode |= x == 3;
        }
        assert!(hit_mode);
    }

    #[test]
    fn int_constant_and_degenerate() {
        let mut rng = SmallRng::seed_from_u64(17);
        assert_eq!(IntDist::constant(3).sample(&mut rng), 3);
        let d = IntDist::triangular(2, 2, 2).unwrap();
        for _ in 0..100 {
            assert_eq!(d.sample(&mut rng), 2);
        }
    }

    #[test]
    fn scaled_preserves_shape() {
        let d = Dist::pert(60.0, 120.0, 300.0).unwrap().scaled(1.0 / 60.0).unwrap();
        assert!((d.mean() - (1.0 + 4.0 * 2.0 + 5.0) / 6.0).abs() < 1e-12);
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn int_dists_stay_within_bounds(
                low in 0u32..5,
                spread_a in 0u32..5,
                spread_b in 0u32..5,
                seed in proptest::num::u64::ANY,
            ) {
                let mode = low + spread_a;
                let high = mode + spread_b;
                let mut rng = SmallRng::seed_from_u64(seed);
                for d in [
                    IntDist::triangular(low, mode, high).unwrap(),
                    IntDist::pert(low, mode, high).unwrap(),
                ] {
                    for _ in 0..64 {
                        let x = d.sample(&mut rng);
                        prop_assert!((low..=high).contains(&x), "{x} outside [{low}, {high}]");
                    }
                }
            }
        }
    }
}
