//! Training run configuration.
//!
//! Builder-style configuration with validation. Defaults target small
//! control tasks; callers override per run with the `with_*` methods and
//! call [`TrainerConfig::validate`] before construction.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Configuration validation error.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// A count field that must be at least 1 is zero.
    InvalidCount { field: &'static str, value: usize },
    /// A float field is outside its allowed range.
    OutOfRange {
        field: &'static str,
        value: f32,
        min: f32,
        max: f32,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidCount { field, value } => {
                write!(f, "{} must be at least 1, got {}", field, value)
            }
            ConfigError::OutOfRange {
                field,
                value,
                min,
                max,
            } => {
                write!(f, "{} must be in [{}, {}], got {}", field, min, max, value)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Configuration for one training run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainerConfig {
    /// Environment identifier passed to the environment backend
    pub env_name: String,
    /// Rollout horizon T, steps collected per update cycle
    pub num_steps: usize,
    /// Number of parallel environments N
    pub num_envs: usize,
    /// Recurrent hidden state size H
    pub hidden_size: usize,
    /// Discount factor
    pub gamma: f32,
    /// Use generalized advantage estimation for returns
    pub use_gae: bool,
    /// GAE smoothing parameter
    pub gae_lambda: f32,
    /// Symmetric clip applied to normalized rewards
    pub reward_clip: f32,
    /// Report metrics every this many updates
    pub log_interval: usize,
    /// Total environment frames to train for
    pub max_frames: usize,
    /// Window size for the episode reward average
    pub reward_window_size: usize,
    /// Average episode reward at which rendering turns on
    pub render_reward_threshold: f32,
    /// Linearly decay the learning rate over the run
    pub use_lr_decay: bool,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            env_name: "CartPole-v1".to_string(),
            num_steps: 40,
            num_envs: 8,
            hidden_size: 64,
            gamma: 0.99,
            use_gae: true,
            gae_lambda: 0.9,
            reward_clip: 100.0,
            log_interval: 10,
            max_frames: 100_000_000,
            reward_window_size: 10,
            render_reward_threshold: 160.0,
            use_lr_decay: false,
        }
    }
}

impl TrainerConfig {
    pub fn with_env_name(mut self, env_name: impl Into<String>) -> Self {
        self.env_name = env_name.into();
        self
    }

    pub fn with_num_steps(mut self, num_steps: usize) -> Self {
        self.num_steps = num_steps;
        self
    }

    pub fn with_num_envs(mut self, num_envs: usize) -> Self {
        self.num_envs = num_envs;
        self
    }

    pub fn with_hidden_size(mut self, hidden_size: usize) -> Self {
        self.hidden_size = hidden_size;
        self
    }

    pub fn with_gamma(mut self, gamma: f32) -> Self {
        self.gamma = gamma;
        self
    }

    pub fn with_gae(mut self, use_gae: bool, gae_lambda: f32) -> Self {
        self.use_gae = use_gae;
        self.gae_lambda = gae_lambda;
        self
    }

    pub fn with_reward_clip(mut self, reward_clip: f32) -> Self {
        self.reward_clip = reward_clip;
        self
    }

    pub fn with_log_interval(mut self, log_interval: usize) -> Self {
        self.log_interval = log_interval;
        self
    }

    pub fn with_max_frames(mut self, max_frames: usize) -> Self {
        self.max_frames = max_frames;
        self
    }

    pub fn with_reward_window_size(mut self, reward_window_size: usize) -> Self {
        self.reward_window_size = reward_window_size;
        self
    }

    pub fn with_render_reward_threshold(mut self, threshold: f32) -> Self {
        self.render_reward_threshold = threshold;
        self
    }

    pub fn with_lr_decay(mut self, use_lr_decay: bool) -> Self {
        self.use_lr_decay = use_lr_decay;
        self
    }

    /// Number of update cycles the run will execute.
    pub fn num_updates(&self) -> usize {
        self.max_frames / (self.num_steps * self.num_envs)
    }

    /// Environment frames consumed per update cycle.
    pub fn frames_per_update(&self) -> usize {
        self.num_steps * self.num_envs
    }

    /// Validate all fields, reporting the first violation found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let counts = [
            ("num_steps", self.num_steps),
            ("num_envs", self.num_envs),
            ("hidden_size", self.hidden_size),
            ("log_interval", self.log_interval),
            ("max_frames", self.max_frames),
            ("reward_window_size", self.reward_window_size),
        ];
        for (field, value) in counts {
            if value == 0 {
                return Err(ConfigError::InvalidCount { field, value });
            }
        }

        if !(0.0..=1.0).contains(&self.gamma) {
            return Err(ConfigError::OutOfRange {
                field: "gamma",
                value: self.gamma,
                min: 0.0,
                max: 1.0,
            });
        }
        if !(0.0..=1.0).contains(&self.gae_lambda) {
            return Err(ConfigError::OutOfRange {
                field: "gae_lambda",
                value: self.gae_lambda,
                min: 0.0,
                max: 1.0,
            });
        }
        if self.reward_clip <= 0.0 || !self.reward_clip.is_finite() {
            return Err(ConfigError::OutOfRange {
                field: "reward_clip",
                value: self.reward_clip,
                min: f32::EPSILON,
                max: f32::MAX,
            });
        }
        Ok(())
    }
}
