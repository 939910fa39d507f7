//! Action space description and per-step action batches.
//!
//! The action space is fixed for the lifetime of a training run and is
//! reported by the environment during the `info` handshake. Discrete
//! actions are a single index per environment (stored as `i64`);
//! continuous actions are `shape[0]` floats per environment.

use serde::{Deserialize, Serialize};

/// Kind of action space exposed by the environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActionSpaceKind {
    /// One action index per environment.
    Discrete,
    /// A fixed-size vector of floats per environment.
    Continuous,
}

/// Action space description: kind plus dimension sizes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionSpace {
    /// Discrete or continuous.
    pub kind: ActionSpaceKind,
    /// Dimension sizes. For discrete spaces, `shape[0]` is the number of
    /// available actions; for continuous spaces, the action vector length.
    pub shape: Vec<usize>,
}

impl ActionSpace {
    /// Create a discrete action space with `n` choices.
    pub fn discrete(n: usize) -> Self {
        Self {
            kind: ActionSpaceKind::Discrete,
            shape: vec![n],
        }
    }

    /// Create a continuous action space with `dim` components.
    pub fn continuous(dim: usize) -> Self {
        Self {
            kind: ActionSpaceKind::Continuous,
            shape: vec![dim],
        }
    }

    /// Number of scalars stored per environment per step.
    ///
    /// 1 for discrete spaces (the action index), `shape[0]` for
    /// continuous spaces.
    pub fn action_dim(&self) -> usize {
        match self.kind {
            ActionSpaceKind::Discrete => 1,
            ActionSpaceKind::Continuous => self.shape[0],
        }
    }
}

/// One step's worth of actions across all environments.
///
/// Flat layout `[n_envs * action_dim]`. Discrete actions keep an
/// integral element type; continuous actions are floats.
#[derive(Debug, Clone, PartialEq)]
pub enum ActionBatch {
    /// Action indices, one per environment.
    Discrete(Vec<i64>),
    /// Flattened action vectors, `action_dim` floats per environment.
    Continuous(Vec<f32>),
}

impl ActionBatch {
    /// Total number of scalars in the batch.
    pub fn len(&self) -> usize {
        match self {
            ActionBatch::Discrete(a) => a.len(),
            ActionBatch::Continuous(a) => a.len(),
        }
    }

    /// Check if the batch is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether this batch matches the given action space kind.
    pub fn matches(&self, kind: ActionSpaceKind) -> bool {
        matches!(
            (self, kind),
            (ActionBatch::Discrete(_), ActionSpaceKind::Discrete)
                | (ActionBatch::Continuous(_), ActionSpaceKind::Continuous)
        )
    }

    /// Convert to the environment's wire encoding: one vector of floats
    /// per environment.
    ///
    /// The result is freshly allocated and owns its data; it never
    /// aliases buffer storage.
    pub fn to_env_actions(&self, action_dim: usize) -> Vec<Vec<f32>> {
        match self {
            ActionBatch::Discrete(indices) => {
                indices.iter().map(|&a| vec![a as f32]).collect()
            }
            ActionBatch::Continuous(values) => values
                .chunks(action_dim)
                .map(|chunk| chunk.to_vec())
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_dim() {
        assert_eq!(ActionSpace::discrete(4).action_dim(), 1);
        assert_eq!(ActionSpace::continuous(3).action_dim(), 3);
    }

    #[test]
    fn test_discrete_env_encoding() {
        let batch = ActionBatch::Discrete(vec![0, 2, 1]);
        let encoded = batch.to_env_actions(1);
        assert_eq!(encoded, vec![vec![0.0], vec![2.0], vec![1.0]]);
    }

    #[test]
    fn test_continuous_env_encoding() {
        let batch = ActionBatch::Continuous(vec![0.1, 0.2, 0.3, 0.4]);
        let encoded = batch.to_env_actions(2);
        assert_eq!(encoded, vec![vec![0.1, 0.2], vec![0.3, 0.4]]);
    }

    #[test]
    fn test_matches_kind() {
        let discrete = ActionBatch::Discrete(vec![1]);
        assert!(discrete.matches(ActionSpaceKind::Discrete));
        assert!(!discrete.matches(ActionSpaceKind::Continuous));
    }
}
