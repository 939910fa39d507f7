//! # On-policy RL training core
//!
//! Synchronous training core for on-policy reinforcement learning:
//! fixed-horizon trajectory collection over vectorized environments,
//! bootstrapped return / GAE estimation, reward normalization, episode
//! tracking, and the update-cycle orchestration.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                        Trainer                           │
//! │                                                          │
//! │   Policy ──act──► actions ──step──► Environment          │
//! │     ▲                                   │                │
//! │     │ frontier slot         obs/reward/done              │
//! │     │                                   ▼                │
//! │   RolloutBuffer ◄──insert── RewardNormalizer             │
//! │     │                       EpisodeRewardTracker         │
//! │     │ compute_returns (bootstrap from Policy)            │
//! │     ▼                                                    │
//! │   UpdateAlgorithm ──metrics──► MetricsLogger             │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! The policy/value network, the loss/update rule, and the environment
//! transport are external collaborators behind the [`Policy`],
//! [`UpdateAlgorithm`], and [`Environment`] traits. Everything inside
//! this crate is exclusively owned and driven by one control thread.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use onpolicy_rl::{ConsoleLogger, Trainer, TrainerConfig};
//!
//! let config = TrainerConfig::default()
//!     .with_env_name("LunarLander-v2")
//!     .with_num_envs(8)
//!     .with_num_steps(40)
//!     .with_gamma(0.99);
//!
//! let mut trainer = Trainer::new(config, env, policy, algorithm)?;
//! trainer.run(&mut ConsoleLogger::new())?;
//! ```

pub mod buffers;
pub mod config;
pub mod core;
pub mod environment;
pub mod metrics;
pub mod normalization;
pub mod runners;
pub mod scheduling;

// Re-export commonly used types
pub use buffers::rollout_buffer::{BufferError, RolloutBuffer};
pub use config::{ConfigError, TrainerConfig};
pub use crate::core::action_space::{ActionBatch, ActionSpace, ActionSpaceKind};
pub use crate::core::running_stats::RunningMeanStd;
pub use environment::{EnvError, EnvInfo, EnvStep, Environment};
pub use metrics::episode_tracker::EpisodeRewardTracker;
pub use metrics::logger::{ConsoleLogger, CycleReport, MetricsLogger};
pub use normalization::reward_normalizer::RewardNormalizer;
pub use runners::trainer::{
    Policy, PolicyStep, TrainError, Trainer, UpdateAlgorithm, UpdateMetric,
};
pub use scheduling::{ConstantLR, LRScheduler, LinearDecay};
