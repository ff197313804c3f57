use ndarray::{Array1, Array2, ArrayView2, ArrayView4};

use crate::error::Result;

/// Maps a batch of stacked states to per-action values.
///
/// The trainer holds two instances of the same estimator type: the online
/// network it trains and the target network it only reads.
pub trait ValueEstimator {
    /// Number of discrete actions scored per state
    fn num_actions(&self) -> usize;

    /// `(K, H, W)` of a single stacked state
    fn input_shape(&self) -> (usize, usize, usize);

    /// Evaluate `(B, K, H, W)` raw pixel states into `(B, A)` action values.
    ///
    /// Takes `&self`: evaluation never records state for backpropagation.
    fn evaluate(&self, states: ArrayView4<f32>) -> Result<Array2<f32>>;

    /// Overwrite every parameter with the corresponding one of `other`.
    fn load_state_from(&mut self, other: &Self) -> Result<()>;
}

/// Training-side capabilities of an estimator.
pub trait TrainableEstimator: ValueEstimator {
    /// Forward pass that records what `backward` needs.
    fn forward_train(&mut self, states: ArrayView4<f32>) -> Result<Array2<f32>>;

    /// Backpropagate `dLoss/dQ` of shape `(B, A)` through the last recorded
    /// forward pass, returning one `(weights, biases)` gradient per parameter
    /// group in `parameters_mut` order.
    fn backward(&mut self, output_gradients: ArrayView2<f32>) -> Result<Vec<(Array2<f32>, Array1<f32>)>>;

    /// Mutable access to every parameter group, in a fixed order.
    fn parameters_mut(&mut self) -> Vec<(&mut Array2<f32>, &mut Array1<f32>)>;
}
