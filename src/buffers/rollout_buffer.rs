//! Fixed-horizon rollout buffer for on-policy training.
//!
//! Stores `num_steps` transitions for `num_envs` parallel environments
//! and computes bootstrapped returns in place. All arrays are flat
//! `Vec`s with logical shapes:
//!
//! - observations `[T+1, N, obs]`, hidden states `[T+1, N, H]`,
//!   masks `[T+1, N]`, returns `[T+1, N]`
//! - actions `[T, N, A]`, log probs / rewards / values `[T, N]`
//!
//! # Indexing Convention
//!
//! Slot 0 of the `T+1`-indexed arrays holds the carry-over state from
//! the previous cycle (seeded by [`RolloutBuffer::set_first_observation`]
//! on the very first cycle, and by [`RolloutBuffer::after_update`]
//! afterwards). `actions[t]`, `rewards[t]`, `value_predictions[t]`, and
//! `action_log_probs[t]` describe the transition from time `t` to
//! `t + 1`; `masks[t + 1] = 1 - done_t` marks episode boundaries.
//!
//! The buffer is allocated once per training run and reused across
//! update cycles via [`RolloutBuffer::after_update`].

use std::fmt;

use crate::core::action_space::{ActionBatch, ActionSpace, ActionSpaceKind};

/// Error type for buffer operations.
///
/// Shape invariants are a programming contract; every variant is fatal
/// to the training run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BufferError {
    /// An argument's length disagrees with the configured shapes.
    ShapeMismatch {
        field: &'static str,
        expected: usize,
        actual: usize,
    },
    /// The configured action-space kind does not match the batch.
    ActionKindMismatch { expected: ActionSpaceKind },
    /// All `num_steps` slots are filled; `after_update` must run first.
    Full { num_steps: usize },
}

impl fmt::Display for BufferError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BufferError::ShapeMismatch {
                field,
                expected,
                actual,
            } => {
                write!(f, "{} has {} elements, expected {}", field, actual, expected)
            }
            BufferError::ActionKindMismatch { expected } => {
                write!(f, "action batch does not match {:?} action space", expected)
            }
            BufferError::Full { num_steps } => {
                write!(f, "buffer already holds {} steps", num_steps)
            }
        }
    }
}

impl std::error::Error for BufferError {}

/// Fixed-horizon, multi-environment trajectory buffer.
///
/// Owns all trajectory arrays for the lifetime of one training run;
/// horizon and environment count are fixed at construction.
pub struct RolloutBuffer {
    /// Observations `[(T+1) * N * obs_size]`
    observations: Vec<f32>,
    /// Recurrent hidden states `[(T+1) * N * H]`
    hidden_states: Vec<f32>,
    /// Alive masks `[(T+1) * N]`, 1 = alive, 0 = episode boundary
    masks: Vec<f32>,
    /// Actions `[T * N * A]`, integral for discrete spaces
    actions: ActionBatch,
    /// Log probabilities of taken actions `[T * N]`
    action_log_probs: Vec<f32>,
    /// Normalized rewards `[T * N]`
    rewards: Vec<f32>,
    /// Value estimates `[T * N]`
    value_predictions: Vec<f32>,
    /// Bootstrapped returns `[(T+1) * N]`; slot T is the bootstrap value
    returns: Vec<f32>,

    /// Next write position for the T-indexed arrays
    step: usize,
    num_steps: usize,
    num_envs: usize,
    obs_shape: Vec<usize>,
    obs_size: usize,
    hidden_size: usize,
    action_space: ActionSpace,
    action_dim: usize,
}

impl RolloutBuffer {
    /// Create a buffer for `num_steps` transitions over `num_envs`
    /// environments.
    ///
    /// Masks initialize to 1 (all environments alive); everything else
    /// to zero. Discrete action spaces get integral zero actions,
    /// continuous spaces floating zero.
    pub fn new(
        num_steps: usize,
        num_envs: usize,
        obs_shape: &[usize],
        action_space: ActionSpace,
        hidden_size: usize,
    ) -> Self {
        let obs_size: usize = obs_shape.iter().product();
        let action_dim = action_space.action_dim();
        let actions = match action_space.kind {
            ActionSpaceKind::Discrete => {
                ActionBatch::Discrete(vec![0i64; num_steps * num_envs * action_dim])
            }
            ActionSpaceKind::Continuous => {
                ActionBatch::Continuous(vec![0.0f32; num_steps * num_envs * action_dim])
            }
        };

        Self {
            observations: vec![0.0; (num_steps + 1) * num_envs * obs_size],
            hidden_states: vec![0.0; (num_steps + 1) * num_envs * hidden_size],
            masks: vec![1.0; (num_steps + 1) * num_envs],
            actions,
            action_log_probs: vec![0.0; num_steps * num_envs],
            rewards: vec![0.0; num_steps * num_envs],
            value_predictions: vec![0.0; num_steps * num_envs],
            returns: vec![0.0; (num_steps + 1) * num_envs],
            step: 0,
            num_steps,
            num_envs,
            obs_shape: obs_shape.to_vec(),
            obs_size,
            hidden_size,
            action_space,
            action_dim,
        }
    }

    /// Seed slot 0 with the initial observation from the environment
    /// reset. Called once before the first collection phase.
    pub fn set_first_observation(&mut self, observation: &[f32]) -> Result<(), BufferError> {
        let expected = self.num_envs * self.obs_size;
        if observation.len() != expected {
            return Err(BufferError::ShapeMismatch {
                field: "observation",
                expected,
                actual: observation.len(),
            });
        }
        self.observations[..expected].copy_from_slice(observation);
        Ok(())
    }

    /// Insert one step of transitions for all environments.
    ///
    /// The observation, hidden state, and mask describe time `step + 1`;
    /// the action, log prob, value prediction, and reward describe the
    /// transition from `step` to `step + 1`. Advances the cursor.
    #[allow(clippy::too_many_arguments)]
    pub fn insert(
        &mut self,
        observation: &[f32],
        hidden_state: &[f32],
        action: &ActionBatch,
        action_log_prob: &[f32],
        value_prediction: &[f32],
        reward: &[f32],
        mask: &[f32],
    ) -> Result<(), BufferError> {
        if self.step == self.num_steps {
            return Err(BufferError::Full {
                num_steps: self.num_steps,
            });
        }

        let n = self.num_envs;
        self.check_len("observation", observation, n * self.obs_size)?;
        self.check_len("hidden_state", hidden_state, n * self.hidden_size)?;
        self.check_len("action_log_prob", action_log_prob, n)?;
        self.check_len("value_prediction", value_prediction, n)?;
        self.check_len("reward", reward, n)?;
        self.check_len("mask", mask, n)?;
        if !action.matches(self.action_space.kind) {
            return Err(BufferError::ActionKindMismatch {
                expected: self.action_space.kind,
            });
        }
        if action.len() != n * self.action_dim {
            return Err(BufferError::ShapeMismatch {
                field: "action",
                expected: n * self.action_dim,
                actual: action.len(),
            });
        }

        let t = self.step;
        let next = t + 1;

        let obs_start = next * n * self.obs_size;
        self.observations[obs_start..obs_start + n * self.obs_size].copy_from_slice(observation);

        let hid_start = next * n * self.hidden_size;
        self.hidden_states[hid_start..hid_start + n * self.hidden_size]
            .copy_from_slice(hidden_state);

        self.masks[next * n..(next + 1) * n].copy_from_slice(mask);

        let a_start = t * n * self.action_dim;
        let a_len = n * self.action_dim;
        match (&mut self.actions, action) {
            (ActionBatch::Discrete(store), ActionBatch::Discrete(batch)) => {
                store[a_start..a_start + a_len].copy_from_slice(batch);
            }
            (ActionBatch::Continuous(store), ActionBatch::Continuous(batch)) => {
                store[a_start..a_start + a_len].copy_from_slice(batch);
            }
            // Kind mismatch is rejected above.
            _ => unreachable!(),
        }

        self.action_log_probs[t * n..(t + 1) * n].copy_from_slice(action_log_prob);
        self.value_predictions[t * n..(t + 1) * n].copy_from_slice(value_prediction);
        self.rewards[t * n..(t + 1) * n].copy_from_slice(reward);

        self.step += 1;
        Ok(())
    }

    /// Compute bootstrapped returns in place.
    ///
    /// Sets `returns[T]` to `bootstrap_value`, then runs the backward
    /// recursion over `t = T-1 .. 0`:
    ///
    /// - without GAE: `returns[t] = r[t] + gamma * masks[t+1] * returns[t+1]`
    /// - with GAE: `delta = r[t] + gamma * masks[t+1] * V[t+1] - V[t]`,
    ///   `gae = delta + gamma * lambda * masks[t+1] * gae`,
    ///   `returns[t] = gae + V[t]`, where `V[T]` is the bootstrap value.
    ///
    /// `gamma` and `lambda` are passed through unclamped; out-of-range
    /// values are the caller's responsibility.
    pub fn compute_returns(
        &mut self,
        bootstrap_value: &[f32],
        use_gae: bool,
        gamma: f32,
        lambda: f32,
    ) -> Result<(), BufferError> {
        let n = self.num_envs;
        self.check_len("bootstrap_value", bootstrap_value, n)?;

        let t_max = self.num_steps;
        self.returns[t_max * n..(t_max + 1) * n].copy_from_slice(bootstrap_value);

        if use_gae {
            let mut gae = vec![0.0f32; n];
            for t in (0..t_max).rev() {
                for i in 0..n {
                    let next_value = if t == t_max - 1 {
                        bootstrap_value[i]
                    } else {
                        self.value_predictions[(t + 1) * n + i]
                    };
                    let mask = self.masks[(t + 1) * n + i];
                    let delta = self.rewards[t * n + i] + gamma * mask * next_value
                        - self.value_predictions[t * n + i];
                    gae[i] = delta + gamma * lambda * mask * gae[i];
                    self.returns[t * n + i] = gae[i] + self.value_predictions[t * n + i];
                }
            }
        } else {
            for t in (0..t_max).rev() {
                for i in 0..n {
                    self.returns[t * n + i] = self.rewards[t * n + i]
                        + gamma * self.masks[(t + 1) * n + i] * self.returns[(t + 1) * n + i];
                }
            }
        }
        Ok(())
    }

    /// Rotate the final slot into the first slot and reset the cursor.
    ///
    /// The next rollout continues seamlessly from the terminal state of
    /// this one without re-querying the environment.
    pub fn after_update(&mut self) {
        let n = self.num_envs;
        let t_max = self.num_steps;

        let obs = n * self.obs_size;
        self.observations.copy_within(t_max * obs..(t_max + 1) * obs, 0);
        let hid = n * self.hidden_size;
        self.hidden_states.copy_within(t_max * hid..(t_max + 1) * hid, 0);
        self.masks.copy_within(t_max * n..(t_max + 1) * n, 0);

        self.step = 0;
    }

    fn check_len(
        &self,
        field: &'static str,
        values: &[f32],
        expected: usize,
    ) -> Result<(), BufferError> {
        if values.len() != expected {
            return Err(BufferError::ShapeMismatch {
                field,
                expected,
                actual: values.len(),
            });
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    /// Observations at time slot `t` (`0..=T`), shape `[N * obs_size]`.
    pub fn observations_at(&self, t: usize) -> &[f32] {
        let n = self.num_envs * self.obs_size;
        &self.observations[t * n..(t + 1) * n]
    }

    /// Hidden states at time slot `t` (`0..=T`), shape `[N * H]`.
    pub fn hidden_states_at(&self, t: usize) -> &[f32] {
        let n = self.num_envs * self.hidden_size;
        &self.hidden_states[t * n..(t + 1) * n]
    }

    /// Masks at time slot `t` (`0..=T`), shape `[N]`.
    pub fn masks_at(&self, t: usize) -> &[f32] {
        let n = self.num_envs;
        &self.masks[t * n..(t + 1) * n]
    }

    /// Returns at time slot `t` (`0..=T`), shape `[N]`.
    pub fn returns_at(&self, t: usize) -> &[f32] {
        let n = self.num_envs;
        &self.returns[t * n..(t + 1) * n]
    }

    /// All observations, flat `[(T+1) * N * obs_size]`.
    pub fn observations(&self) -> &[f32] {
        &self.observations
    }

    /// All hidden states, flat `[(T+1) * N * H]`.
    pub fn hidden_states(&self) -> &[f32] {
        &self.hidden_states
    }

    /// All masks, flat `[(T+1) * N]`.
    pub fn masks(&self) -> &[f32] {
        &self.masks
    }

    /// All actions, flat `[T * N * A]`.
    pub fn actions(&self) -> &ActionBatch {
        &self.actions
    }

    /// All action log probs, flat `[T * N]`.
    pub fn action_log_probs(&self) -> &[f32] {
        &self.action_log_probs
    }

    /// All rewards, flat `[T * N]`.
    pub fn rewards(&self) -> &[f32] {
        &self.rewards
    }

    /// All value predictions, flat `[T * N]`.
    pub fn value_predictions(&self) -> &[f32] {
        &self.value_predictions
    }

    /// All returns, flat `[(T+1) * N]`.
    pub fn returns(&self) -> &[f32] {
        &self.returns
    }

    /// Returns as nested `[T+1][N]`.
    pub fn returns_by_step(&self) -> Vec<Vec<f32>> {
        (0..=self.num_steps)
            .map(|t| self.returns_at(t).to_vec())
            .collect()
    }

    /// Rewards as nested `[T][N]`.
    pub fn rewards_by_step(&self) -> Vec<Vec<f32>> {
        let n = self.num_envs;
        (0..self.num_steps)
            .map(|t| self.rewards[t * n..(t + 1) * n].to_vec())
            .collect()
    }

    /// Next write position, in `[0, T]`.
    pub fn step(&self) -> usize {
        self.step
    }

    /// Configured horizon T.
    pub fn num_steps(&self) -> usize {
        self.num_steps
    }

    /// Number of parallel environments N.
    pub fn num_envs(&self) -> usize {
        self.num_envs
    }

    /// Per-environment observation shape.
    pub fn obs_shape(&self) -> &[usize] {
        &self.obs_shape
    }

    /// Flattened per-environment observation size.
    pub fn obs_size(&self) -> usize {
        self.obs_size
    }

    /// Recurrent hidden state size H.
    pub fn hidden_size(&self) -> usize {
        self.hidden_size
    }

    /// Configured action space.
    pub fn action_space(&self) -> &ActionSpace {
        &self.action_space
    }

    /// Whether all T slots are filled.
    pub fn is_full(&self) -> bool {
        self.step == self.num_steps
    }
}
