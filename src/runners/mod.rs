//! Training loop orchestration.

pub mod trainer;

pub use trainer::{Policy, PolicyStep, TrainError, Trainer, UpdateAlgorithm};

#[cfg(test)]
mod tests;
