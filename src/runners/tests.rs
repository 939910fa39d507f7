//! Trainer integration tests against mock collaborators.

use std::cell::RefCell;
use std::rc::Rc;

use crate::config::TrainerConfig;
use crate::core::action_space::{ActionBatch, ActionSpace};
use crate::environment::{EnvError, EnvInfo, EnvStep, Environment};
use crate::metrics::logger::{RecordingLogger, UpdateMetric};
use crate::runners::trainer::{Policy, PolicyStep, TrainError, Trainer, UpdateAlgorithm};

const OBS_SIZE: usize = 3;
const HIDDEN: usize = 4;

#[derive(Default)]
struct EnvLog {
    made: Option<(String, usize)>,
    steps: usize,
    render_flags: Vec<bool>,
    last_actions: Vec<Vec<f32>>,
}

/// Scripted environment: observations broadcast the step counter, every
/// reward is 1, and env 0 finishes an episode every `done_every` steps.
struct MockEnv {
    num_envs: usize,
    done_every: Option<usize>,
    broken_rewards: bool,
    log: Rc<RefCell<EnvLog>>,
}

impl MockEnv {
    fn new(num_envs: usize) -> (Self, Rc<RefCell<EnvLog>>) {
        let log = Rc::new(RefCell::new(EnvLog::default()));
        (
            Self {
                num_envs,
                done_every: None,
                broken_rewards: false,
                log: log.clone(),
            },
            log,
        )
    }

    fn with_done_every(mut self, interval: usize) -> Self {
        self.done_every = Some(interval);
        self
    }

    fn with_broken_rewards(mut self) -> Self {
        self.broken_rewards = true;
        self
    }
}

impl Environment for MockEnv {
    fn make(&mut self, env_name: &str, num_envs: usize) -> Result<(), EnvError> {
        self.log.borrow_mut().made = Some((env_name.to_string(), num_envs));
        Ok(())
    }

    fn info(&mut self) -> Result<EnvInfo, EnvError> {
        Ok(EnvInfo {
            action_space: ActionSpace::discrete(2),
            observation_shape: vec![OBS_SIZE],
        })
    }

    fn reset(&mut self) -> Result<Vec<f32>, EnvError> {
        Ok(vec![0.0; self.num_envs * OBS_SIZE])
    }

    fn step(&mut self, actions: &[Vec<f32>], render: bool) -> Result<EnvStep, EnvError> {
        let mut log = self.log.borrow_mut();
        log.steps += 1;
        log.render_flags.push(render);
        log.last_actions = actions.to_vec();
        let counter = log.steps;

        let mut dones = vec![false; self.num_envs];
        if let Some(interval) = self.done_every {
            if counter % interval == 0 {
                dones[0] = true;
            }
        }

        let reward_len = if self.broken_rewards {
            self.num_envs + 1
        } else {
            self.num_envs
        };
        Ok(EnvStep {
            observations: vec![counter as f32; self.num_envs * OBS_SIZE],
            rewards: vec![1.0; reward_len],
            real_rewards: vec![1.0; self.num_envs],
            dones,
        })
    }
}

#[derive(Default)]
struct PolicyLog {
    act_calls: usize,
    value_calls: usize,
    last_value_obs: Vec<f32>,
}

struct MockPolicy {
    num_envs: usize,
    fail_on_act: Option<usize>,
    log: Rc<RefCell<PolicyLog>>,
}

impl MockPolicy {
    fn new(num_envs: usize) -> (Self, Rc<RefCell<PolicyLog>>) {
        let log = Rc::new(RefCell::new(PolicyLog::default()));
        (
            Self {
                num_envs,
                fail_on_act: None,
                log: log.clone(),
            },
            log,
        )
    }

    fn failing_on_act(mut self, call: usize) -> Self {
        self.fail_on_act = Some(call);
        self
    }
}

impl Policy for MockPolicy {
    fn act(
        &mut self,
        _observations: &[f32],
        _hidden_states: &[f32],
        _masks: &[f32],
    ) -> Result<PolicyStep, String> {
        let mut log = self.log.borrow_mut();
        log.act_calls += 1;
        if self.fail_on_act == Some(log.act_calls) {
            return Err("scripted failure".to_string());
        }
        Ok(PolicyStep {
            values: vec![0.5; self.num_envs],
            actions: ActionBatch::Discrete(vec![1; self.num_envs]),
            log_probs: vec![-0.1; self.num_envs],
            hidden_states: vec![0.0; self.num_envs * HIDDEN],
        })
    }

    fn get_value(
        &mut self,
        observations: &[f32],
        _hidden_states: &[f32],
        _masks: &[f32],
    ) -> Result<Vec<f32>, String> {
        let mut log = self.log.borrow_mut();
        log.value_calls += 1;
        log.last_value_obs = observations.to_vec();
        Ok(vec![0.25; self.num_envs])
    }
}

#[derive(Default)]
struct AlgoLog {
    calls: usize,
    decays: Vec<f32>,
    last_returns: Vec<Vec<f32>>,
    last_masks: Vec<f32>,
}

struct MockAlgo {
    log: Rc<RefCell<AlgoLog>>,
}

impl MockAlgo {
    fn new() -> (Self, Rc<RefCell<AlgoLog>>) {
        let log = Rc::new(RefCell::new(AlgoLog::default()));
        (Self { log: log.clone() }, log)
    }
}

impl UpdateAlgorithm for MockAlgo {
    fn update(
        &mut self,
        buffer: &crate::buffers::rollout_buffer::RolloutBuffer,
        lr_decay: f32,
    ) -> Result<Vec<UpdateMetric>, String> {
        let mut log = self.log.borrow_mut();
        log.calls += 1;
        log.decays.push(lr_decay);
        log.last_returns = buffer.returns_by_step();
        log.last_masks = buffer.masks().to_vec();
        Ok(vec![UpdateMetric::new("loss", 0.5)])
    }
}

fn test_config(num_steps: usize, num_envs: usize, num_updates: usize) -> TrainerConfig {
    TrainerConfig::default()
        .with_env_name("MockEnv-v0")
        .with_num_steps(num_steps)
        .with_num_envs(num_envs)
        .with_hidden_size(HIDDEN)
        .with_max_frames(num_steps * num_envs * num_updates)
        .with_log_interval(2)
}

#[test]
fn test_handshake_on_construction() {
    let (env, env_log) = MockEnv::new(2);
    let (policy, _) = MockPolicy::new(2);
    let (algo, _) = MockAlgo::new();

    let trainer = Trainer::new(test_config(4, 2, 3), env, policy, algo).unwrap();

    assert_eq!(
        env_log.borrow().made,
        Some(("MockEnv-v0".to_string(), 2))
    );
    // Reset observation lands in slot 0.
    assert_eq!(trainer.buffer().observations_at(0), &[0.0; 2 * OBS_SIZE]);
    assert_eq!(trainer.buffer().num_steps(), 4);
}

#[test]
fn test_run_executes_all_cycles() {
    let (env, env_log) = MockEnv::new(2);
    let (policy, policy_log) = MockPolicy::new(2);
    let (algo, algo_log) = MockAlgo::new();
    let mut trainer = Trainer::new(test_config(4, 2, 3), env, policy, algo).unwrap();

    trainer.run(&mut RecordingLogger::new()).unwrap();

    assert_eq!(algo_log.borrow().calls, 3);
    assert_eq!(policy_log.borrow().act_calls, 12);
    assert_eq!(policy_log.borrow().value_calls, 3);
    assert_eq!(env_log.borrow().steps, 12);
}

#[test]
fn test_bootstrap_queries_final_observation() {
    let (env, _) = MockEnv::new(2);
    let (policy, policy_log) = MockPolicy::new(2);
    let (algo, algo_log) = MockAlgo::new();
    let mut trainer = Trainer::new(test_config(3, 2, 1), env, policy, algo).unwrap();

    trainer.run(&mut RecordingLogger::new()).unwrap();

    // The final env step broadcast counter value 3.
    assert_eq!(
        policy_log.borrow().last_value_obs,
        vec![3.0; 2 * OBS_SIZE]
    );
    // Bootstrap value 0.25 sits in the final returns slot.
    assert_eq!(algo_log.borrow().last_returns[3], vec![0.25, 0.25]);
}

#[test]
fn test_buffer_rotates_between_cycles() {
    let (env, _) = MockEnv::new(2);
    let (policy, _) = MockPolicy::new(2);
    let (algo, _) = MockAlgo::new();
    let mut trainer = Trainer::new(test_config(3, 2, 2), env, policy, algo).unwrap();

    trainer.run(&mut RecordingLogger::new()).unwrap();

    // 6 env steps total; the final observation carried into slot 0.
    assert_eq!(
        trainer.buffer().observations_at(0),
        &[6.0; 2 * OBS_SIZE][..]
    );
    assert_eq!(trainer.buffer().step(), 0);
}

#[test]
fn test_dones_become_zero_masks() {
    let (env, _) = MockEnv::new(2);
    let env = env.with_done_every(2);
    let (policy, _) = MockPolicy::new(2);
    let (algo, algo_log) = MockAlgo::new();
    let mut trainer = Trainer::new(test_config(4, 2, 1), env, policy, algo).unwrap();

    trainer.run(&mut RecordingLogger::new()).unwrap();

    // Env 0 finished at steps 2 and 4; masks live at slots t+1.
    let masks = algo_log.borrow().last_masks.clone();
    assert_eq!(&masks[..], &[1.0, 1.0, 1.0, 1.0, 0.0, 1.0, 1.0, 1.0, 0.0, 1.0]);
}

#[test]
fn test_reports_emitted_at_interval() {
    let (env, _) = MockEnv::new(2);
    let (policy, _) = MockPolicy::new(2);
    let (algo, _) = MockAlgo::new();
    let mut trainer = Trainer::new(test_config(4, 2, 5), env, policy, algo).unwrap();

    let mut logger = RecordingLogger::new();
    trainer.run(&mut logger).unwrap();

    // log_interval 2 over updates 0..5: reports at update indices 2 and 4.
    assert_eq!(logger.reports.len(), 2);
    assert_eq!(logger.reports[0].update, 3);
    assert_eq!(logger.reports[1].update, 5);
    assert_eq!(logger.reports[0].total_frames, 3 * 4 * 2);
    assert_eq!(logger.reports[0].metrics, vec![UpdateMetric::new("loss", 0.5)]);
    assert!(logger.reports[0].fps > 0.0);
}

#[test]
fn test_render_activates_once_reward_crosses_threshold() {
    let (env, env_log) = MockEnv::new(2);
    // Episodes of length 2 with reward 1 per step: average total is 2.
    let env = env.with_done_every(2);
    let (policy, _) = MockPolicy::new(2);
    let (algo, _) = MockAlgo::new();
    let config = test_config(4, 2, 5).with_render_reward_threshold(1.5);
    let mut trainer = Trainer::new(config, env, policy, algo).unwrap();

    trainer.run(&mut RecordingLogger::new()).unwrap();

    assert!(trainer.is_rendering());
    let flags = env_log.borrow().render_flags.clone();
    // Steps before the first report ran unrendered; later steps rendered.
    assert!(!flags[0]);
    assert!(flags[flags.len() - 1]);
}

#[test]
fn test_policy_failure_aborts_run() {
    let (env, _) = MockEnv::new(2);
    let (policy, _) = MockPolicy::new(2);
    let policy = policy.failing_on_act(5);
    let (algo, algo_log) = MockAlgo::new();
    let mut trainer = Trainer::new(test_config(4, 2, 3), env, policy, algo).unwrap();

    let err = trainer.run(&mut RecordingLogger::new()).unwrap_err();
    assert!(matches!(err, TrainError::Policy(_)));
    // The failure hit during the second cycle; only one update ran.
    assert_eq!(algo_log.borrow().calls, 1);
}

#[test]
fn test_malformed_env_response_aborts_run() {
    let (env, _) = MockEnv::new(2);
    let env = env.with_broken_rewards();
    let (policy, _) = MockPolicy::new(2);
    let (algo, _) = MockAlgo::new();
    let mut trainer = Trainer::new(test_config(4, 2, 3), env, policy, algo).unwrap();

    let err = trainer.run(&mut RecordingLogger::new()).unwrap_err();
    assert!(matches!(
        err,
        TrainError::Env(EnvError::MalformedResponse(_))
    ));
}

#[test]
fn test_invalid_config_rejected_at_construction() {
    let (env, _) = MockEnv::new(2);
    let (policy, _) = MockPolicy::new(2);
    let (algo, _) = MockAlgo::new();
    let config = test_config(4, 2, 3).with_gamma(2.0);

    let err = Trainer::new(config, env, policy, algo).unwrap_err();
    assert!(matches!(err, TrainError::Config(_)));
}

#[test]
fn test_lr_decay_factors_fall_linearly() {
    let (env, _) = MockEnv::new(2);
    let (policy, _) = MockPolicy::new(2);
    let (algo, algo_log) = MockAlgo::new();
    let config = test_config(4, 2, 4).with_lr_decay(true);
    let mut trainer = Trainer::new(config, env, policy, algo).unwrap();

    trainer.run(&mut RecordingLogger::new()).unwrap();

    let decays = algo_log.borrow().decays.clone();
    assert_eq!(decays, vec![1.0, 0.75, 0.5, 0.25]);
}

#[test]
fn test_actions_reach_environment_encoded() {
    let (env, env_log) = MockEnv::new(3);
    let (policy, _) = MockPolicy::new(3);
    let (algo, _) = MockAlgo::new();
    let mut trainer = Trainer::new(test_config(2, 3, 1), env, policy, algo).unwrap();

    trainer.run(&mut RecordingLogger::new()).unwrap();

    // Discrete action 1 per env, encoded as one float per env.
    assert_eq!(
        env_log.borrow().last_actions,
        vec![vec![1.0], vec![1.0], vec![1.0]]
    );
}
