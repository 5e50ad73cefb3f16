// this_file: crates/textsynth-core/src/sampler.rs

//! Bounded parameter sampling over six named distributions.
//!
//! Every tunable in a batch specification is a `(min, max, distribution)`
//! triple; this module turns triples into concrete values. All variants
//! respect the hard bounds, and `min == max` always short-circuits to
//! `min` without consuming randomness beyond a single state check.

use rand::Rng;
use rand_distr::Distribution as _;
use serde::{Deserialize, Serialize};

/// The recognized distribution shapes.
///
/// Unknown names fail configuration deserialization, so generation code
/// never sees an unrecognized variant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Distribution {
    #[default]
    Uniform,
    Normal,
    TruncatedNormal,
    Exponential,
    Lognormal,
    Beta,
}

impl Distribution {
    pub fn as_str(self) -> &'static str {
        match self {
            Distribution::Uniform => "uniform",
            Distribution::Normal => "normal",
            Distribution::TruncatedNormal => "truncated_normal",
            Distribution::Exponential => "exponential",
            Distribution::Lognormal => "lognormal",
            Distribution::Beta => "beta",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "uniform" => Some(Distribution::Uniform),
            "normal" => Some(Distribution::Normal),
            "truncated_normal" => Some(Distribution::TruncatedNormal),
            "exponential" => Some(Distribution::Exponential),
            "lognormal" => Some(Distribution::Lognormal),
            "beta" => Some(Distribution::Beta),
            _ => None,
        }
    }
}

// Beta defaults: left-biased mass, mode at 0.2 of the range.
const BETA_ALPHA: f64 = 2.0;
const BETA_BETA: f64 = 5.0;

// Exponential rate is scaled so the distribution decays well inside the
// range instead of spilling most of its mass past max.
const EXP_RATE_SCALE: f64 = 30.0;

// Lognormal underlying parameters; the sample is shifted so the mode
// lands at min.
const LOGNORMAL_SIGMA: f64 = 0.8;

/// Draw one value in `[min, max]` under the given distribution.
pub fn sample<R: Rng + ?Sized>(rng: &mut R, min: f64, max: f64, dist: Distribution) -> f64 {
    if !(min < max) {
        return min;
    }
    let range = max - min;
    match dist {
        Distribution::Uniform => rng.gen_range(min..=max),
        Distribution::Normal => {
            let mean = (min + max) / 2.0;
            let sigma = range / 6.0;
            match rand_distr::Normal::new(mean, sigma) {
                Ok(normal) => normal.sample(rng).clamp(min, max),
                Err(_) => mean,
            }
        }
        Distribution::TruncatedNormal => {
            let mean = (min + max) / 2.0;
            let sigma = range / 6.0;
            let normal = match rand_distr::Normal::new(mean, sigma) {
                Ok(normal) => normal,
                Err(_) => return mean,
            };
            // Rejection keeps the tails truncated instead of piling mass
            // on the bounds. Acceptance is ~99.7% per draw at 3 sigma, so
            // the loop terminates fast; the cap is a safety valve.
            for _ in 0..64 {
                let v = normal.sample(rng);
                if (min..=max).contains(&v) {
                    return v;
                }
            }
            mean
        }
        Distribution::Exponential => {
            let rate = EXP_RATE_SCALE / range;
            match rand_distr::Exp::new(rate) {
                Ok(exp) => (min + exp.sample(rng)).min(max),
                Err(_) => min,
            }
        }
        Distribution::Lognormal => {
            match rand_distr::LogNormal::new(0.0, LOGNORMAL_SIGMA) {
                Ok(lognormal) => {
                    let mode = (-LOGNORMAL_SIGMA * LOGNORMAL_SIGMA).exp();
                    (min + lognormal.sample(rng) - mode).clamp(min, max)
                }
                Err(_) => min,
            }
        }
        Distribution::Beta => match rand_distr::Beta::new(BETA_ALPHA, BETA_BETA) {
            Ok(beta) => min + beta.sample(rng) * range,
            Err(_) => min,
        },
    }
}

/// Vectorized form of [`sample`].
pub fn sample_batch<R: Rng + ?Sized>(
    rng: &mut R,
    min: f64,
    max: f64,
    dist: Distribution,
    n: usize,
) -> Vec<f64> {
    (0..n).map(|_| sample(rng, min, max, dist)).collect()
}

/// Integer draw: sample continuously, round, clamp back into bounds.
pub fn sample_int<R: Rng + ?Sized>(rng: &mut R, min: i64, max: i64, dist: Distribution) -> i64 {
    if min >= max {
        return min;
    }
    let v = sample(rng, min as f64, max as f64, dist).round() as i64;
    v.clamp(min, max)
}
