//! Learning-rate schedules for the update loop.
//!
//! The trainer passes the scheduled value to the learner as a decay
//! factor each update; the learner applies it to its own base rate.

/// Schedule over update steps.
pub trait LRScheduler {
    /// Value at the given update step.
    fn get_lr(&self, step: usize) -> f64;
}

/// Fixed value at every step.
#[derive(Debug, Clone)]
pub struct ConstantLR {
    value: f64,
}

impl ConstantLR {
    pub fn new(value: f64) -> Self {
        debug_assert!(value.is_finite(), "schedule value must be finite");
        Self { value }
    }
}

impl LRScheduler for ConstantLR {
    fn get_lr(&self, _step: usize) -> f64 {
        self.value
    }
}

/// Linear interpolation from `start` to `end` over `total_steps`.
///
/// Steps at or beyond `total_steps` hold the end value.
#[derive(Debug, Clone)]
pub struct LinearDecay {
    start: f64,
    end: f64,
    total_steps: usize,
}

impl LinearDecay {
    pub fn new(start: f64, end: f64, total_steps: usize) -> Self {
        debug_assert!(total_steps > 0, "total_steps must be positive");
        Self {
            start,
            end,
            total_steps,
        }
    }
}

impl LRScheduler for LinearDecay {
    fn get_lr(&self, step: usize) -> f64 {
        if step >= self.total_steps {
            return self.end;
        }
        let progress = step as f64 / self.total_steps as f64;
        self.start + (self.end - self.start) * progress
    }
}
