//! Environment backend abstraction.
//!
//! The trainer drives a vectorized environment backend through this
//! trait. Backends typically talk to an out-of-process simulator, so
//! every call can fail; errors here are fatal to the training run.

use std::fmt;

use crate::core::action_space::ActionSpace;

/// Environment backend error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnvError {
    /// The backend connection failed or dropped.
    Transport(String),
    /// The backend replied with data the trainer cannot use.
    MalformedResponse(String),
}

impl fmt::Display for EnvError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EnvError::Transport(msg) => write!(f, "environment transport error: {}", msg),
            EnvError::MalformedResponse(msg) => {
                write!(f, "malformed environment response: {}", msg)
            }
        }
    }
}

impl std::error::Error for EnvError {}

/// Static environment description from the `info` handshake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvInfo {
    pub action_space: ActionSpace,
    /// Per-environment observation shape
    pub observation_shape: Vec<usize>,
}

/// One vectorized environment step.
#[derive(Debug, Clone, PartialEq)]
pub struct EnvStep {
    /// Next observations, flat `[N * obs_size]`
    pub observations: Vec<f32>,
    /// Rewards as the backend reports them, possibly pre-scaled, `[N]`
    pub rewards: Vec<f32>,
    /// Unscaled episode rewards for progress tracking, `[N]`
    pub real_rewards: Vec<f32>,
    /// Episode-termination flags, `[N]`
    pub dones: Vec<bool>,
}

/// Vectorized environment backend.
///
/// Environments that finish an episode reset themselves and return the
/// fresh observation in the same step.
pub trait Environment {
    /// Instantiate `num_envs` copies of the named environment.
    fn make(&mut self, env_name: &str, num_envs: usize) -> Result<(), EnvError>;

    /// Query the action space and observation shape.
    fn info(&mut self) -> Result<EnvInfo, EnvError>;

    /// Reset all environments, returning initial observations,
    /// flat `[N * obs_size]`.
    fn reset(&mut self) -> Result<Vec<f32>, EnvError>;

    /// Advance all environments by one action each.
    fn step(&mut self, actions: &[Vec<f32>], render: bool) -> Result<EnvStep, EnvError>;
}
