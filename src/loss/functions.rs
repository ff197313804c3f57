use ndarray::{Array1, ArrayView1};
use serde::{Serialize, Deserialize};

/// Loss between a batch of predicted action values and their TD targets.
///
/// Both inputs hold one entry per sample; losses are averaged over the batch.
pub trait Loss: Send + Sync {
    /// Mean loss over the batch
    fn compute(&self, predictions: ArrayView1<f32>, targets: ArrayView1<f32>) -> f32;

    /// Gradient of the mean loss with respect to each prediction
    fn gradient(&self, predictions: ArrayView1<f32>, targets: ArrayView1<f32>) -> Array1<f32>;
}

/// Huber loss (smooth L1)
///
/// Quadratic within `delta` of the target, linear outside it.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct HuberLoss {
    pub delta: f32,
}

impl HuberLoss {
    pub fn new(delta: f32) -> Self {
        HuberLoss { delta }
    }
}

impl Default for HuberLoss {
    fn default() -> Self {
        Self::new(1.0)
    }
}

impl Loss for HuberLoss {
    fn compute(&self, predictions: ArrayView1<f32>, targets: ArrayView1<f32>) -> f32 {
        let diff = &predictions - &targets;
        diff.mapv(|x| {
            let abs_x = x.abs();
            if abs_x <= self.delta {
                0.5 * x * x
            } else {
                self.delta * abs_x - 0.5 * self.delta * self.delta
            }
        }).sum() / predictions.len().max(1) as f32
    }

    fn gradient(&self, predictions: ArrayView1<f32>, targets: ArrayView1<f32>) -> Array1<f32> {
        let diff = &predictions - &targets;
        diff.mapv(|x| x.clamp(-self.delta, self.delta)) / predictions.len().max(1) as f32
    }
}
