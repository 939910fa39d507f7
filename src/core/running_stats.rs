//! Running statistics over batches of samples.
//!
//! Provides numerically stable running mean and variance for reward
//! normalization. Each `update` folds in one batch of samples using the
//! parallel combination rule (Chan et al.), so long runs do not suffer
//! the catastrophic cancellation of naive sum-of-squares accumulation.

use serde::{Deserialize, Serialize};

/// Running mean and variance using batched moment combination.
///
/// Maintains per-dimension statistics. Batches are combined with the
/// existing moments in a single pass: the batch's own mean and M2 are
/// computed first, then merged with the running state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunningMeanStd {
    /// Running mean per dimension
    mean: Vec<f64>,
    /// Sum of squared deviations per dimension (variance = m2 / count)
    m2: Vec<f64>,
    /// Number of samples seen
    count: f64,
}

impl RunningMeanStd {
    /// Create a new tracker for the given dimensionality.
    pub fn new(dim: usize) -> Self {
        Self {
            mean: vec![0.0; dim],
            m2: vec![0.0; dim],
            count: 0.0,
        }
    }

    /// Update statistics with a batch of samples.
    ///
    /// `batch` is flattened `[n_samples * dim]`. The batch's moments are
    /// combined with the running moments via the parallel rule:
    ///
    /// ```text
    /// delta = mean_b - mean_a
    /// mean  = mean_a + delta * n_b / (n_a + n_b)
    /// M2    = M2_a + M2_b + delta^2 * n_a * n_b / (n_a + n_b)
    /// ```
    ///
    /// # Panics
    ///
    /// Panics if the batch length is not a multiple of the dimensionality
    /// or the batch is empty.
    pub fn update(&mut self, batch: &[f32]) {
        let dim = self.mean.len();
        assert!(!batch.is_empty(), "empty batch");
        assert_eq!(batch.len() % dim, 0, "batch length must be a multiple of dim");

        let n = (batch.len() / dim) as f64;

        // Batch mean and M2 per dimension (Welford within the batch).
        let mut batch_mean = vec![0.0f64; dim];
        let mut batch_m2 = vec![0.0f64; dim];
        let mut seen = 0.0f64;
        for sample in batch.chunks_exact(dim) {
            seen += 1.0;
            for (i, &x) in sample.iter().enumerate() {
                let x = x as f64;
                let delta = x - batch_mean[i];
                batch_mean[i] += delta / seen;
                batch_m2[i] += delta * (x - batch_mean[i]);
            }
        }

        let total = self.count + n;
        for i in 0..dim {
            let delta = batch_mean[i] - self.mean[i];
            self.mean[i] += delta * n / total;
            self.m2[i] += batch_m2[i] + delta * delta * self.count * n / total;
        }
        self.count = total;
    }

    /// Get the mean vector.
    pub fn mean(&self) -> &[f64] {
        &self.mean
    }

    /// Get the population variance vector.
    ///
    /// Reports 0 before any update; callers guard division with their
    /// own epsilon.
    pub fn variance(&self) -> Vec<f64> {
        if self.count == 0.0 {
            vec![0.0; self.mean.len()]
        } else {
            self.m2.iter().map(|&v| v / self.count).collect()
        }
    }

    /// Get the sample count.
    pub fn count(&self) -> f64 {
        self.count
    }

    /// Get the dimensionality.
    pub fn dim(&self) -> usize {
        self.mean.len()
    }

    /// Reset statistics to the initial state.
    pub fn reset(&mut self) {
        self.mean.fill(0.0);
        self.m2.fill(0.0);
        self.count = 0.0;
    }
}
