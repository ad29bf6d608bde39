//! Injectable randomness for simulated delays and fault injection.

use mockall::automock;
use rand::Rng as _;

/// Random source behind a seam so tests can force outcomes
/// deterministically instead of relying on wall-clock entropy.
#[automock]
pub(crate) trait RandomSource: Send + Sync {
    /// Returns true with the given probability.
    fn chance(&self, probability: f64) -> bool;

    /// Samples a processing delay, in seconds, uniformly from `[lo, hi]`.
    fn sample_delay(&self, lo: f64, hi: f64) -> f64;

    /// Picks a uniformly random index in `[0, upper)`.
    fn choose(&self, upper: usize) -> usize;
}

/// Thread-local RNG backed source used by the running service.
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct ThreadRngSource;

impl RandomSource for ThreadRngSource {
    fn chance(&self, probability: f64) -> bool {
        rand::thread_rng().gen_bool(probability)
    }

    fn sample_delay(&self, lo: f64, hi: f64) -> f64 {
        rand::thread_rng().gen_range(lo..=hi)
    }

    fn choose(&self, upper: usize) -> usize {
        rand::thread_rng().gen_range(0..upper)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chance_extremes_are_deterministic() {
        let source = ThreadRngSource;

        for _ in 0..64 {
            assert!(!source.chance(0.0), "zero probability must never trigger");
            assert!(source.chance(1.0), "unit probability must always trigger");
        }
    }

    #[test]
    fn sampled_delay_stays_in_bounds() {
        let source = ThreadRngSource;

        for _ in 0..64 {
            let delay = source.sample_delay(0.1, 0.5);
            assert!(
                (0.1..=0.5).contains(&delay),
                "sampled delay {delay} escaped its bounds"
            );
        }
    }

    #[test]
    fn chosen_index_stays_below_upper_bound() {
        let source = ThreadRngSource;

        for _ in 0..64 {
            assert!(source.choose(3) < 3, "chosen index must stay in range");
        }
    }
}
