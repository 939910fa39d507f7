//! Progress reporting for training runs.

use std::fmt;

use serde::{Deserialize, Serialize};

/// One named scalar produced by a learner update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateMetric {
    pub name: String,
    pub value: f32,
}

impl UpdateMetric {
    pub fn new(name: impl Into<String>, value: f32) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }
}

impl fmt::Display for UpdateMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name, self.value)
    }
}

/// Snapshot of one update cycle's progress.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CycleReport {
    /// Update index, 1-based in reports
    pub update: usize,
    /// Total updates planned for the run
    pub num_updates: usize,
    /// Environment frames consumed so far
    pub total_frames: usize,
    /// Environment frames per wall-clock second since the run started
    pub fps: f64,
    /// Scalars from the learner's latest update
    pub metrics: Vec<UpdateMetric>,
    /// Windowed average episode reward, if any episode has completed
    pub avg_reward: Option<f32>,
}

/// Sink for cycle reports.
///
/// The trainer emits one report per logging interval; implementations
/// decide where it goes.
pub trait MetricsLogger {
    fn log(&mut self, report: &CycleReport);
}

/// Logs cycle reports through the `log` facade.
#[derive(Debug, Default)]
pub struct ConsoleLogger;

impl ConsoleLogger {
    pub fn new() -> Self {
        Self
    }
}

impl MetricsLogger for ConsoleLogger {
    fn log(&mut self, report: &CycleReport) {
        log::info!("---");
        log::info!("Update: {}/{}", report.update, report.num_updates);
        log::info!("Total frames: {}", report.total_frames);
        log::info!("FPS: {:.0}", report.fps);
        for metric in &report.metrics {
            log::info!("{}", metric);
        }
        match report.avg_reward {
            Some(avg) => log::info!("Reward: {:.2}", avg),
            None => log::info!("Reward: no episodes completed yet"),
        }
    }
}

/// Collects cycle reports in memory. Intended for tests.
#[derive(Debug, Default)]
pub struct RecordingLogger {
    pub reports: Vec<CycleReport>,
}

impl RecordingLogger {
    pub fn new() -> Self {
        Self::default()
    }
}

impl MetricsLogger for RecordingLogger {
    fn log(&mut self, report: &CycleReport) {
        self.reports.push(report.clone());
    }
}
