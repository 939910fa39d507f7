//! Windowed episode reward statistics.

use serde::{Deserialize, Serialize};

/// Tracks completed-episode rewards over a sliding window.
///
/// Accumulates the raw (unnormalized) reward of each in-flight episode
/// per environment. When an episode finishes, its total enters a
/// fixed-size circular window and the oldest entry falls out once the
/// window is full. The reported average always covers the most recent
/// completed episodes across all environments.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EpisodeRewardTracker {
    /// Circular window of completed-episode totals
    window: Vec<f32>,
    /// Total episodes completed since construction
    completed: usize,
    /// Running reward total per in-flight episode
    running: Vec<f32>,
}

impl EpisodeRewardTracker {
    /// Create a tracker for `num_envs` environments with a window of
    /// `window_size` completed episodes.
    pub fn new(num_envs: usize, window_size: usize) -> Self {
        Self {
            window: vec![0.0; window_size],
            completed: 0,
            running: vec![0.0; num_envs],
        }
    }

    /// Fold in one step of raw rewards and done flags.
    ///
    /// Rewards here are the real environment rewards, not the normalized
    /// ones fed to the learner.
    ///
    /// # Panics
    ///
    /// Panics if the batch lengths differ from the environment count.
    pub fn update_batch(&mut self, rewards: &[f32], dones: &[bool]) {
        assert_eq!(rewards.len(), self.running.len(), "reward batch size");
        assert_eq!(dones.len(), self.running.len(), "done batch size");

        for (i, (&reward, &done)) in rewards.iter().zip(dones).enumerate() {
            self.running[i] += reward;
            if done {
                let slot = self.completed % self.window.len();
                self.window[slot] = self.running[i];
                self.completed += 1;
                self.running[i] = 0.0;
            }
        }
    }

    /// Average reward over the most recent completed episodes.
    ///
    /// `None` until at least one episode has completed.
    pub fn average(&self) -> Option<f32> {
        if self.completed == 0 {
            return None;
        }
        let filled = self.completed.min(self.window.len());
        Some(self.window[..filled].iter().sum::<f32>() / filled as f32)
    }

    /// Total episodes completed since construction.
    pub fn episodes_completed(&self) -> usize {
        self.completed
    }
}
