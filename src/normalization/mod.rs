//! Reward normalization for stable value targets.

pub mod reward_normalizer;

pub use reward_normalizer::RewardNormalizer;
