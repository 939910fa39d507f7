//! Core types shared across the training stack.

pub mod action_space;
pub mod running_stats;

pub use action_space::{ActionBatch, ActionSpace, ActionSpaceKind};
pub use running_stats::RunningMeanStd;
