//! On-policy training loop.
//!
//! The [`Trainer`] owns the rollout buffer, reward normalizer, and
//! episode tracker, and drives the policy, environment backend, and
//! update algorithm through repeated collect / estimate / update
//! cycles. Collaborators plug in through the [`Policy`],
//! [`Environment`](crate::environment::Environment), and
//! [`UpdateAlgorithm`] traits.

use std::fmt;
use std::time::Instant;

use crate::buffers::rollout_buffer::{BufferError, RolloutBuffer};
use crate::config::{ConfigError, TrainerConfig};
use crate::core::action_space::ActionBatch;
use crate::environment::{EnvError, Environment};
use crate::metrics::episode_tracker::EpisodeRewardTracker;
use crate::metrics::logger::{CycleReport, MetricsLogger};
pub use crate::metrics::logger::UpdateMetric;
use crate::normalization::reward_normalizer::RewardNormalizer;
use crate::scheduling::{ConstantLR, LRScheduler, LinearDecay};

/// Fatal training error. The loop never retries; any failure from a
/// collaborator ends the run.
#[derive(Debug)]
pub enum TrainError {
    Config(ConfigError),
    Buffer(BufferError),
    Env(EnvError),
    Policy(String),
    Update(String),
}

impl fmt::Display for TrainError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrainError::Config(e) => write!(f, "invalid configuration: {}", e),
            TrainError::Buffer(e) => write!(f, "buffer error: {}", e),
            TrainError::Env(e) => write!(f, "environment error: {}", e),
            TrainError::Policy(msg) => write!(f, "policy error: {}", msg),
            TrainError::Update(msg) => write!(f, "update error: {}", msg),
        }
    }
}

impl std::error::Error for TrainError {}

impl From<ConfigError> for TrainError {
    fn from(e: ConfigError) -> Self {
        TrainError::Config(e)
    }
}

impl From<BufferError> for TrainError {
    fn from(e: BufferError) -> Self {
        TrainError::Buffer(e)
    }
}

impl From<EnvError> for TrainError {
    fn from(e: EnvError) -> Self {
        TrainError::Env(e)
    }
}

/// Policy output for one step across all environments.
#[derive(Debug, Clone)]
pub struct PolicyStep {
    /// Value estimates, `[N]`
    pub values: Vec<f32>,
    /// Sampled actions, `[N * A]`
    pub actions: ActionBatch,
    /// Log probabilities of the sampled actions, `[N]`
    pub log_probs: Vec<f32>,
    /// Updated recurrent state, `[N * H]`
    pub hidden_states: Vec<f32>,
}

/// Acting policy.
///
/// Both methods run in inference mode; gradients flow only inside the
/// update algorithm's own recomputation.
pub trait Policy {
    /// Sample actions for the given observations.
    ///
    /// `masks` carries episode boundaries so recurrent policies can
    /// reset their state mid-batch.
    fn act(
        &mut self,
        observations: &[f32],
        hidden_states: &[f32],
        masks: &[f32],
    ) -> Result<PolicyStep, String>;

    /// Estimate state values only, `[N]`. Used for the bootstrap at the
    /// end of a rollout.
    fn get_value(
        &mut self,
        observations: &[f32],
        hidden_states: &[f32],
        masks: &[f32],
    ) -> Result<Vec<f32>, String>;
}

/// Learner consuming a completed rollout.
pub trait UpdateAlgorithm {
    /// Run one update over the buffer's trajectories.
    ///
    /// `lr_decay` scales the learner's base learning rate; 1.0 means no
    /// decay. Returns named scalars for reporting.
    fn update(
        &mut self,
        buffer: &RolloutBuffer,
        lr_decay: f32,
    ) -> Result<Vec<UpdateMetric>, String>;
}

/// On-policy training loop orchestrator.
///
/// Construction performs the full environment handshake (make, info,
/// reset) and allocates all per-run state; [`Trainer::run`] then
/// executes every update cycle until the frame budget is exhausted.
impl<E, P, U> fmt::Debug for Trainer<E, P, U>
where
    E: Environment,
    P: Policy,
    U: UpdateAlgorithm,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Trainer").finish_non_exhaustive()
    }
}

pub struct Trainer<E, P, U>
where
    E: Environment,
    P: Policy,
    U: UpdateAlgorithm,
{
    config: TrainerConfig,
    env: E,
    policy: P,
    algorithm: U,
    buffer: RolloutBuffer,
    normalizer: RewardNormalizer,
    tracker: EpisodeRewardTracker,
    scheduler: Box<dyn LRScheduler>,
    /// Rendering turns on once the reward average crosses the threshold
    render: bool,
}

impl<E, P, U> Trainer<E, P, U>
where
    E: Environment,
    P: Policy,
    U: UpdateAlgorithm,
{
    /// Validate the configuration, perform the environment handshake,
    /// and allocate the rollout buffer.
    pub fn new(
        config: TrainerConfig,
        mut env: E,
        policy: P,
        algorithm: U,
    ) -> Result<Self, TrainError> {
        config.validate()?;

        env.make(&config.env_name, config.num_envs)?;
        let info = env.info()?;
        log::info!(
            "environment '{}': {} copies, observation shape {:?}, action space {:?}",
            config.env_name,
            config.num_envs,
            info.observation_shape,
            info.action_space
        );

        let initial = env.reset()?;
        let mut buffer = RolloutBuffer::new(
            config.num_steps,
            config.num_envs,
            &info.observation_shape,
            info.action_space,
            config.hidden_size,
        );
        buffer.set_first_observation(&initial)?;

        let normalizer = RewardNormalizer::new(config.num_envs, config.gamma, config.reward_clip);
        let tracker = EpisodeRewardTracker::new(config.num_envs, config.reward_window_size);
        let scheduler: Box<dyn LRScheduler> = if config.use_lr_decay {
            Box::new(LinearDecay::new(1.0, 0.0, config.num_updates()))
        } else {
            Box::new(ConstantLR::new(1.0))
        };

        Ok(Self {
            config,
            env,
            policy,
            algorithm,
            buffer,
            normalizer,
            tracker,
            scheduler,
            render: false,
        })
    }

    /// Run all update cycles.
    ///
    /// A cycle collects `num_steps` transitions, bootstraps the value of
    /// the final state, computes returns, hands the buffer to the
    /// learner, and rotates the buffer for the next cycle. Progress is
    /// reported every `log_interval` cycles (skipping the first).
    pub fn run(&mut self, logger: &mut dyn MetricsLogger) -> Result<(), TrainError> {
        let num_updates = self.config.num_updates();
        let frames_per_update = self.config.frames_per_update();
        log::info!(
            "training for {} updates ({} frames per update)",
            num_updates,
            frames_per_update
        );

        let start = Instant::now();
        for update in 0..num_updates {
            self.collect_rollout()?;

            let bootstrap = self.bootstrap_value()?;
            self.buffer.compute_returns(
                &bootstrap,
                self.config.use_gae,
                self.config.gamma,
                self.config.gae_lambda,
            )?;

            let decay = self.scheduler.get_lr(update) as f32;
            let metrics = self
                .algorithm
                .update(&self.buffer, decay)
                .map_err(TrainError::Update)?;

            self.buffer.after_update();

            if update % self.config.log_interval == 0 && update > 0 {
                let total_frames = (update + 1) * frames_per_update;
                let fps = total_frames as f64 / (start.elapsed().as_secs_f64() + 1e-9);
                let avg_reward = self.tracker.average();
                logger.log(&CycleReport {
                    update: update + 1,
                    num_updates,
                    total_frames,
                    fps,
                    metrics,
                    avg_reward,
                });
                if let Some(avg) = avg_reward {
                    self.render = avg >= self.config.render_reward_threshold;
                }
            }
        }
        log::info!("training complete after {} updates", num_updates);
        Ok(())
    }

    /// Collect one rollout of `num_steps` transitions.
    fn collect_rollout(&mut self) -> Result<(), TrainError> {
        let n = self.config.num_envs;
        let action_dim = self.buffer.action_space().action_dim();

        for _ in 0..self.config.num_steps {
            let t = self.buffer.step();
            let step_out = self
                .policy
                .act(
                    self.buffer.observations_at(t),
                    self.buffer.hidden_states_at(t),
                    self.buffer.masks_at(t),
                )
                .map_err(TrainError::Policy)?;
            self.check_policy_step(&step_out, n, action_dim)?;

            let env_actions = step_out.actions.to_env_actions(action_dim);
            let env_step = self.env.step(&env_actions, self.render)?;
            if env_step.observations.len() != n * self.buffer.obs_size()
                || env_step.rewards.len() != n
                || env_step.real_rewards.len() != n
                || env_step.dones.len() != n
            {
                return Err(TrainError::Env(EnvError::MalformedResponse(format!(
                    "step response sized for {} observations, {} rewards, {} dones; expected {} environments",
                    env_step.observations.len(),
                    env_step.rewards.len(),
                    env_step.dones.len(),
                    n
                ))));
            }

            let normalized = self
                .normalizer
                .normalize_batch(&env_step.rewards, &env_step.dones);
            self.tracker
                .update_batch(&env_step.real_rewards, &env_step.dones);

            let masks: Vec<f32> = env_step
                .dones
                .iter()
                .map(|&done| if done { 0.0 } else { 1.0 })
                .collect();

            self.buffer.insert(
                &env_step.observations,
                &step_out.hidden_states,
                &step_out.actions,
                &step_out.log_probs,
                &step_out.values,
                &normalized,
                &masks,
            )?;
        }
        Ok(())
    }

    /// Value estimate for the state after the final transition.
    fn bootstrap_value(&mut self) -> Result<Vec<f32>, TrainError> {
        let t = self.buffer.num_steps();
        let values = self
            .policy
            .get_value(
                self.buffer.observations_at(t),
                self.buffer.hidden_states_at(t),
                self.buffer.masks_at(t),
            )
            .map_err(TrainError::Policy)?;
        if values.len() != self.config.num_envs {
            return Err(TrainError::Policy(format!(
                "get_value returned {} values for {} environments",
                values.len(),
                self.config.num_envs
            )));
        }
        Ok(values)
    }

    fn check_policy_step(
        &self,
        step: &PolicyStep,
        n: usize,
        action_dim: usize,
    ) -> Result<(), TrainError> {
        if step.values.len() != n {
            return Err(TrainError::Policy(format!(
                "act returned {} values for {} environments",
                step.values.len(),
                n
            )));
        }
        if step.log_probs.len() != n {
            return Err(TrainError::Policy(format!(
                "act returned {} log probs for {} environments",
                step.log_probs.len(),
                n
            )));
        }
        if step.hidden_states.len() != n * self.config.hidden_size {
            return Err(TrainError::Policy(format!(
                "act returned {} hidden values, expected {}",
                step.hidden_states.len(),
                n * self.config.hidden_size
            )));
        }
        if !step.actions.matches(self.buffer.action_space().kind)
            || step.actions.len() != n * action_dim
        {
            return Err(TrainError::Policy(format!(
                "act returned {} action scalars, expected {}",
                step.actions.len(),
                n * action_dim
            )));
        }
        Ok(())
    }

    /// Run configuration.
    pub fn config(&self) -> &TrainerConfig {
        &self.config
    }

    /// The rollout buffer.
    pub fn buffer(&self) -> &RolloutBuffer {
        &self.buffer
    }

    /// The episode reward tracker.
    pub fn tracker(&self) -> &EpisodeRewardTracker {
        &self.tracker
    }

    /// Whether rendering is currently requested from the backend.
    pub fn is_rendering(&self) -> bool {
        self.render
    }
}
