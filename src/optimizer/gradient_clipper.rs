use ndarray::{Array, Array1, Array2, Dimension};
use serde::{Serialize, Deserialize};

/// Gradient clipping methods
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum GradientClipper {
    /// Clamp every gradient element into `[min, max]`
    ClipByValue { min: f32, max: f32 },

    /// Rescale each tensor whose L2 norm exceeds `max_norm`
    ClipByNorm { max_norm: f32 },

    /// Rescale all gradients together when their joint L2 norm exceeds `max_norm`
    ClipByGlobalNorm { max_norm: f32 },

    /// No clipping
    None,
}

impl Default for GradientClipper {
    fn default() -> Self {
        GradientClipper::ClipByValue { min: -1.0, max: 1.0 }
    }
}

impl GradientClipper {
    /// Clip the `(weights, biases)` gradient groups of one backward pass in place.
    pub fn clip(&self, gradients: &mut [(Array2<f32>, Array1<f32>)]) {
        match self {
            GradientClipper::ClipByValue { min, max } => {
                for (weight_grads, bias_grads) in gradients.iter_mut() {
                    weight_grads.mapv_inplace(|g| g.max(*min).min(*max));
                    bias_grads.mapv_inplace(|g| g.max(*min).min(*max));
                }
            }

            GradientClipper::ClipByNorm { max_norm } => {
                for (weight_grads, bias_grads) in gradients.iter_mut() {
                    scale_to_norm(weight_grads, *max_norm);
                    scale_to_norm(bias_grads, *max_norm);
                }
            }

            GradientClipper::ClipByGlobalNorm { max_norm } => {
                let global_norm = Self::compute_global_norm(gradients);
                if global_norm > *max_norm {
                    let scale = max_norm / global_norm;
                    for (weight_grads, bias_grads) in gradients.iter_mut() {
                        weight_grads.mapv_inplace(|g| g * scale);
                        bias_grads.mapv_inplace(|g| g * scale);
                    }
                }
            }

            GradientClipper::None => {}
        }
    }

    /// Compute global norm of all gradients
    pub fn compute_global_norm(gradients: &[(Array2<f32>, Array1<f32>)]) -> f32 {
        gradients
            .iter()
            .map(|(w, b)| w.iter().chain(b.iter()).map(|&x| x * x).sum::<f32>())
            .sum::<f32>()
            .sqrt()
    }
}

fn scale_to_norm<D: Dimension>(gradients: &mut Array<f32, D>, max_norm: f32) {
    let norm = gradients.iter().map(|&g| g * g).sum::<f32>().sqrt();
    if norm > max_norm {
        let scale = max_norm / norm;
        gradients.mapv_inplace(|g| g * scale);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_clip_by_value_bounds_every_element() {
        let mut gradients = vec![(array![[3.0, -0.5], [-7.0, 0.25]], array![2.0, -2.0])];
        GradientClipper::default().clip(&mut gradients);

        assert_eq!(gradients[0].0, array![[1.0, -0.5], [-1.0, 0.25]]);
        assert_eq!(gradients[0].1, array![1.0, -1.0]);
    }

    #[test]
    fn test_clip_by_global_norm() {
        let mut gradients = vec![
            (array![[3.0]], array![0.0]),
            (array![[0.0]], array![4.0]),
        ];
        GradientClipper::ClipByGlobalNorm { max_norm: 1.0 }.clip(&mut gradients);

        let norm = GradientClipper::compute_global_norm(&gradients);
        assert!((norm - 1.0).abs() < 1e-6);
        assert!((gradients[0].0[[0, 0]] - 0.6).abs() < 1e-6);
    }
}
