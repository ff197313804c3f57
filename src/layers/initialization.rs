use ndarray::{Array1, Array2};
use ndarray_rand::RandomExt;
use rand_distr::{Normal, Uniform};
use rand::Rng;
use serde::{Serialize, Deserialize};

use crate::activations::Activation;
use crate::error::{DuelnetError, Result};

/// Weight initialization strategies
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum WeightInit {
    /// Xavier/Glorot normal initialization
    XavierNormal,

    /// He/Kaiming normal initialization (fan-in mode, for ReLU)
    HeNormal,

    /// Uniform distribution with custom range
    Uniform { min: f32, max: f32 },

    /// All zeros
    Zeros,
}

impl WeightInit {
    /// Initialize a weight matrix of `shape` whose layer sees `fan_in` inputs
    /// and produces `fan_out` outputs per position.
    pub fn initialize_weights<R: Rng + ?Sized>(
        &self,
        shape: (usize, usize),
        fan_in: usize,
        fan_out: usize,
        rng: &mut R,
    ) -> Result<Array2<f32>> {
        if fan_in == 0 || fan_out == 0 {
            return Err(DuelnetError::invalid_parameter(
                "fan_in/fan_out",
                "layer dimensions must be non-zero",
            ));
        }

        let weights = match self {
            WeightInit::XavierNormal => {
                let std = (2.0 / (fan_in + fan_out) as f32).sqrt();
                Array2::random_using(shape, normal(std)?, rng)
            }
            WeightInit::HeNormal => {
                let std = (2.0 / fan_in as f32).sqrt();
                Array2::random_using(shape, normal(std)?, rng)
            }
            WeightInit::Uniform { min, max } => {
                if !(min < max) {
                    return Err(DuelnetError::invalid_parameter(
                        "uniform range",
                        "min must be smaller than max",
                    ));
                }
                Array2::random_using(shape, Uniform::new(*min, *max), rng)
            }
            WeightInit::Zeros => Array2::zeros(shape),
        };
        Ok(weights)
    }

    /// Biases always start at zero.
    pub fn initialize_biases(&self, size: usize) -> Array1<f32> {
        Array1::zeros(size)
    }

    /// Get the recommended initialization for an activation function
    pub fn for_activation(activation: &Activation) -> Self {
        match activation {
            Activation::Relu => WeightInit::HeNormal,
            Activation::Linear => WeightInit::XavierNormal,
        }
    }
}

fn normal(std: f32) -> Result<Normal<f32>> {
    Normal::new(0.0, std).map_err(|e| DuelnetError::InvalidParameter {
        name: "std".to_string(),
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_he_normal_scale() {
        let mut rng = StdRng::seed_from_u64(3);
        let weights = WeightInit::HeNormal
            .initialize_weights((64, 256), 256, 64, &mut rng)
            .unwrap();
        let var = weights.mapv(|w| w * w).mean().unwrap();
        let expected = 2.0 / 256.0;
        assert!((var - expected).abs() < expected * 0.2, "variance {} vs {}", var, expected);
    }

    #[test]
    fn test_zero_fan_in_is_rejected() {
        let mut rng = StdRng::seed_from_u64(0);
        assert!(WeightInit::HeNormal.initialize_weights((0, 4), 0, 4, &mut rng).is_err());
    }

    #[test]
    fn test_biases_start_at_zero() {
        assert!(WeightInit::HeNormal.initialize_biases(5).iter().all(|&b| b == 0.0));
    }
}
