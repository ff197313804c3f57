use ndarray::{Array1, Array2};

/// A layer that owns one weight matrix and one bias vector.
///
/// Optimizers, gradient clippers and target synchronization all address a
/// network as an ordered list of these groups, so every trainable layer
/// exposes its parameters through this trait.
pub trait ParameterGroup {
    /// Get reference to weights
    fn weights(&self) -> &Array2<f32>;

    /// Get reference to biases
    fn biases(&self) -> &Array1<f32>;

    /// Mutable access to both parameter tensors at once
    fn parameters_mut(&mut self) -> (&mut Array2<f32>, &mut Array1<f32>);

    /// Total number of scalar parameters
    fn num_parameters(&self) -> usize {
        self.weights().len() + self.biases().len()
    }

    /// Overwrite this group's parameters with `other`'s.
    ///
    /// Shapes must already agree; cached activations are left untouched.
    fn copy_parameters_from(&mut self, other: &dyn ParameterGroup) -> crate::error::Result<()> {
        if self.weights().dim() != other.weights().dim() || self.biases().dim() != other.biases().dim() {
            return Err(crate::error::DuelnetError::dimension_mismatch(
                format!("{:?}/{:?}", self.weights().dim(), self.biases().dim()),
                format!("{:?}/{:?}", other.weights().dim(), other.biases().dim()),
            ));
        }
        let (weights, biases) = self.parameters_mut();
        weights.assign(other.weights());
        biases.assign(other.biases());
        Ok(())
    }
}
