//! Rate functions, Poisson thinning, and the prep-time/customer-placement
//! distributions used by generators.

use rand::Rng;
use rand_distr::{Beta, Distribution, Normal};

use crate::map::{Coordinate, Map};
use crate::rng::SimRng;

/// Named rate-function shapes for non-homogeneous Poisson order arrivals.
/// A registry of shapes, not a host-language expression evaluator: scenario
/// files are untrusted input and must not be able to run arbitrary code.
#[derive(Debug, Clone, PartialEq)]
pub enum RateFunction {
    /// `λ(t) = rate`, for all `t`. The homogeneous-Poisson special case is
    /// `Constant(total_orders / time_window)`.
    Constant(f64),
    /// `λ(t)` linearly interpolated between `start` at `t=0` and `end` at `t=window`.
    Linear { start: f64, end: f64 },
    /// `λ(t) = a*t^2 + b*t + c`, clamped to `>= 0`.
    Parabolic { a: f64, b: f64, c: f64 },
    /// Piecewise-constant: `(t_end, rate)` pairs in ascending `t_end` order;
    /// the rate applies on `(previous t_end, t_end]`. Times after the last
    /// breakpoint use the last rate.
    Piecewise(Vec<(f64, f64)>),
}

impl RateFunction {
    /// Linear/homogeneous helper: rate `total / window` for the whole window.
    pub fn homogeneous(total_orders: u64, time_window: f64) -> Self {
        RateFunction::Constant(total_orders as f64 / time_window.max(1e-9))
    }

    /// Evaluate `λ(t)`, always `>= 0`.
    pub fn rate_at(&self, t: f64, time_window: f64) -> f64 {
        let raw = match self {
            RateFunction::Constant(rate) => *rate,
            RateFunction::Linear { start, end } => {
                let frac = (t / time_window.max(1e-9)).clamp(0.0, 1.0);
                start + (end - start) * frac
            }
            RateFunction::Parabolic { a, b, c } => a * t * t + b * t + c,
            RateFunction::Piecewise(segments) => segments
                .iter()
                .find(|(t_end, _)| t <= *t_end)
                .map(|(_, rate)| *rate)
                .unwrap_or_else(|| segments.last().map(|(_, rate)| *rate).unwrap_or(0.0)),
        };
        raw.max(0.0)
    }

    /// Estimate `λ_max` by sampling the window on 1000 points and taking the max.
    pub fn estimate_lambda_max(&self, time_window: f64) -> f64 {
        const SAMPLES: usize = 1000;
        let mut max_rate: f64 = 0.0;
        for i in 0..SAMPLES {
            let t = time_window * (i as f64) / (SAMPLES as f64 - 1.0).max(1.0);
            max_rate = max_rate.max(self.rate_at(t, time_window));
        }
        1.1 * max_rate
    }
}

/// Draw an exponential(lambda_max) inter-arrival delta from the shared RNG.
pub fn sample_exponential(rng: &mut SimRng, lambda_max: f64) -> f64 {
    if lambda_max <= 0.0 {
        return f64::INFINITY;
    }
    let u: f64 = rng.gen::<f64>().max(1e-12);
    -u.ln() / lambda_max
}

/// Non-homogeneous Poisson thinning: advance `t` by `Exp(lambda_max)` and
/// accept with probability `rate_fn(t) / lambda_max`. Returns the accepted
/// arrival time, or `None` if `t` exceeded `time_window` before an
/// acceptance was drawn.
pub fn next_poisson_arrival(
    rng: &mut SimRng,
    rate_fn: &RateFunction,
    lambda_max: f64,
    time_window: f64,
    mut t: f64,
) -> Option<f64> {
    loop {
        let delta = sample_exponential(rng, lambda_max);
        t += delta;
        if t > time_window || !t.is_finite() {
            return None;
        }
        let accept_prob = rate_fn.rate_at(t, time_window) / lambda_max;
        if rng.gen::<f64>() < accept_prob {
            return Some(t);
        }
    }
}

/// Beta-distributed preparation time on `[min_prep, max_prep]`, centred near
/// `target_rate` (clamped into the range). Shape parameters are chosen so the
/// distribution mode sits at `target_rate`'s fractional position in the
/// range (alpha=2, beta>=2 skews the Beta distribution toward that point).
pub fn sample_prep_time(rng: &mut SimRng, min_prep: f64, max_prep: f64, target_rate: f64) -> f64 {
    if max_prep <= min_prep {
        return min_prep.max(0.0);
    }
    let target = target_rate.clamp(min_prep, max_prep);
    let frac = ((target - min_prep) / (max_prep - min_prep)).clamp(1e-3, 1.0 - 1e-3);
    // Mode of Beta(alpha, beta) for alpha, beta > 1 is (alpha-1)/(alpha+beta-2).
    // Fix alpha = 2 and solve for beta so the mode lands at `frac`.
    let alpha = 2.0_f32;
    let beta = (1.0 - frac as f32) / frac as f32 + 1.0;
    let dist = Beta::new(alpha, beta.max(1.01)).expect("valid beta parameters");
    let sample = dist.sample(&mut rng.0) as f64;
    min_prep + sample * (max_prep - min_prep)
}

/// Sample a customer position inside a Gaussian-in-disk around an
/// establishment: draw a Normal-distributed offset with std-dev
/// `radius / 3` on each axis, truncated (by resampling) to the disk of the
/// given radius, then clamp to the grid bounds.
pub fn sample_customer_position(
    rng: &mut SimRng,
    map: &Map,
    center: Coordinate,
    radius: f64,
) -> Coordinate {
    if radius <= 0.0 {
        return map.clamp(center);
    }
    let std_dev = (radius / 3.0).max(1e-6);
    let normal = Normal::new(0.0, std_dev).expect("valid normal parameters");
    for _ in 0..32 {
        let dx = normal.sample(&mut rng.0);
        let dy = normal.sample(&mut rng.0);
        if (dx * dx + dy * dy).sqrt() <= radius {
            let point = Coordinate::new(
                (center.x as f64 + dx).round() as i32,
                (center.y as f64 + dy).round() as i32,
            );
            return map.clamp(point);
        }
    }
    // Fallback after repeated rejection: clamp the center itself.
    map.clamp(center)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constant_rate_is_flat() {
        let rf = RateFunction::Constant(5.0);
        assert_eq!(rf.rate_at(0.0, 100.0), 5.0);
        assert_eq!(rf.rate_at(99.0, 100.0), 5.0);
    }

    #[test]
    fn linear_rate_interpolates() {
        let rf = RateFunction::Linear {
            start: 0.0,
            end: 10.0,
        };
        assert_eq!(rf.rate_at(0.0, 100.0), 0.0);
        assert!((rf.rate_at(50.0, 100.0) - 5.0).abs() < 1e-9);
        assert_eq!(rf.rate_at(100.0, 100.0), 10.0);
    }

    #[test]
    fn piecewise_rate_picks_segment() {
        let rf = RateFunction::Piecewise(vec![(10.0, 1.0), (20.0, 5.0)]);
        assert_eq!(rf.rate_at(5.0, 20.0), 1.0);
        assert_eq!(rf.rate_at(15.0, 20.0), 5.0);
        assert_eq!(rf.rate_at(25.0, 20.0), 5.0);
    }

    #[test]
    fn homogeneous_matches_constant_rate() {
        let rf = RateFunction::homogeneous(100, 50.0);
        assert_eq!(rf.rate_at(10.0, 50.0), 2.0);
    }

    #[test]
    fn lambda_max_bounds_a_rising_rate() {
        let rf = RateFunction::Linear {
            start: 0.0,
            end: 10.0,
        };
        let lambda_max = rf.estimate_lambda_max(100.0);
        assert!(lambda_max >= 10.0);
        assert!(lambda_max < 12.0);
    }

    #[test]
    fn prep_time_stays_in_range() {
        let mut rng = SimRng::new(Some(3));
        for _ in 0..200 {
            let t = sample_prep_time(&mut rng, 10.0, 30.0, 15.0);
            assert!((10.0..=30.0).contains(&t), "t={t}");
        }
    }

    #[test]
    fn customer_position_stays_within_radius_and_grid() {
        let map = Map::new(50);
        let mut rng = SimRng::new(Some(9));
        let center = Coordinate::new(25, 25);
        for _ in 0..200 {
            let p = sample_customer_position(&mut rng, &map, center, 5.0);
            assert!(p.x >= 0 && p.x < 50);
            assert!(p.y >= 0 && p.y < 50);
        }
    }
}
