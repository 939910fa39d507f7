//! Running-return reward normalization.
//!
//! Scales raw environment rewards by the standard deviation of the
//! discounted return, which keeps value targets in a consistent range
//! across environments with very different reward scales. The mean is
//! never subtracted; only the scale changes, so reward signs survive
//! normalization.

use serde::{Deserialize, Serialize};

use crate::core::running_stats::RunningMeanStd;

const VARIANCE_EPSILON: f64 = 1e-8;

/// Normalizes rewards by the running standard deviation of returns.
///
/// Maintains one discounted return accumulator per environment. Each
/// step the accumulators advance by `R = R * gamma + raw`, feed the
/// running statistics, and the raw rewards are divided by the current
/// return standard deviation and clipped. Accumulators reset to zero
/// for environments whose episode ended this step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RewardNormalizer {
    stats: RunningMeanStd,
    /// Discounted return accumulator per environment
    returns: Vec<f32>,
    gamma: f32,
    clip: f32,
}

impl RewardNormalizer {
    /// Create a normalizer for `num_envs` environments.
    pub fn new(num_envs: usize, gamma: f32, clip: f32) -> Self {
        Self {
            stats: RunningMeanStd::new(1),
            returns: vec![0.0; num_envs],
            gamma,
            clip,
        }
    }

    /// Normalize one step of raw rewards across all environments.
    ///
    /// Statistics update before the division, so the very first batch is
    /// already scaled by its own spread. Done flags zero the return
    /// accumulators after the statistics update; the normalized reward
    /// for a terminal step still reflects the episode it closed.
    ///
    /// # Panics
    ///
    /// Panics if `raw_rewards` and `dones` differ from the configured
    /// environment count.
    pub fn normalize_batch(&mut self, raw_rewards: &[f32], dones: &[bool]) -> Vec<f32> {
        assert_eq!(raw_rewards.len(), self.returns.len(), "reward batch size");
        assert_eq!(dones.len(), self.returns.len(), "done batch size");

        for (ret, &raw) in self.returns.iter_mut().zip(raw_rewards) {
            *ret = *ret * self.gamma + raw;
        }
        self.stats.update(&self.returns);

        let std = (self.stats.variance()[0] + VARIANCE_EPSILON).sqrt() as f32;
        let normalized = raw_rewards
            .iter()
            .map(|&raw| (raw / std).clamp(-self.clip, self.clip))
            .collect();

        for (ret, &done) in self.returns.iter_mut().zip(dones) {
            if done {
                *ret = 0.0;
            }
        }
        normalized
    }

    /// Current per-environment discounted return accumulators.
    pub fn returns(&self) -> &[f32] {
        &self.returns
    }

    /// Running return statistics.
    pub fn stats(&self) -> &RunningMeanStd {
        &self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accumulators_discount_and_add() {
        let mut normalizer = RewardNormalizer::new(2, 0.5, 10.0);
        normalizer.normalize_batch(&[1.0, 2.0], &[false, false]);
        normalizer.normalize_batch(&[1.0, 2.0], &[false, false]);

        // R = (1 * 0.5 + 1, 2 * 0.5 + 2)
        assert_eq!(normalizer.returns(), &[1.5, 3.0]);
    }

    #[test]
    fn test_done_resets_accumulator_after_stats() {
        let mut normalizer = RewardNormalizer::new(2, 0.5, 10.0);
        normalizer.normalize_batch(&[1.0, 2.0], &[true, false]);

        assert_eq!(normalizer.returns(), &[0.0, 2.0]);
        // The terminal step's return still reached the statistics.
        assert_eq!(normalizer.stats().count(), 2.0);
    }

    #[test]
    fn test_normalization_divides_by_return_std() {
        let mut normalizer = RewardNormalizer::new(2, 0.99, 100.0);
        let normalized = normalizer.normalize_batch(&[2.0, 4.0], &[false, false]);

        // Returns are [2, 4]: mean 3, population variance 1, std ~1.
        let std = (1.0f64 + 1e-8).sqrt() as f32;
        assert!((normalized[0] - 2.0 / std).abs() < 1e-5);
        assert!((normalized[1] - 4.0 / std).abs() < 1e-5);
    }

    #[test]
    fn test_clipping() {
        let mut normalizer = RewardNormalizer::new(2, 0.99, 1.5);
        let normalized = normalizer.normalize_batch(&[2.0, -4.0], &[false, false]);

        assert_eq!(normalized[0], 1.5);
        assert_eq!(normalized[1], -1.5);
    }

    #[test]
    fn test_identical_rewards_blow_up_without_epsilon() {
        // All returns equal: variance is zero, epsilon keeps the result finite.
        let mut normalizer = RewardNormalizer::new(3, 0.99, 100.0);
        let normalized = normalizer.normalize_batch(&[1.0, 1.0, 1.0], &[false, false, false]);

        assert!(normalized.iter().all(|r| r.is_finite()));
        // 1 / sqrt(1e-8) = 1e4, clipped to 100.
        assert!(normalized.iter().all(|&r| r == 100.0));
    }
}
