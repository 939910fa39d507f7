//! Trajectory storage for on-policy rollouts.

pub mod rollout_buffer;

pub use rollout_buffer::{BufferError, RolloutBuffer};
