//! Episode reward tracking and progress reporting.

pub mod episode_tracker;
pub mod logger;

pub use episode_tracker::EpisodeRewardTracker;
pub use logger::{ConsoleLogger, CycleReport, MetricsLogger};
