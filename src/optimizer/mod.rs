pub mod gradient_clipper;

use ndarray::{Array1, Array2, Dimension};
use serde::{Serialize, Deserialize};

use crate::error::{DuelnetError, Result};

pub use gradient_clipper::GradientClipper;

/// Parameter update rule applied to a network's parameter groups.
///
/// Groups are addressed by index so stateful optimizers keep one set of
/// moments per group across steps.
pub trait Optimizer {
    fn update_weights(&mut self, index: usize, weights: &mut Array2<f32>, gradients: &Array2<f32>, learning_rate: f32) -> Result<()>;
    fn update_biases(&mut self, index: usize, biases: &mut Array1<f32>, gradients: &Array1<f32>, learning_rate: f32) -> Result<()>;

    /// Called once before the groups of a step are updated.
    fn begin_step(&mut self) {}

    /// Apply one update to every `(weights, biases)` group.
    fn step(
        &mut self,
        parameters: Vec<(&mut Array2<f32>, &mut Array1<f32>)>,
        gradients: &[(Array2<f32>, Array1<f32>)],
        learning_rate: f32,
    ) -> Result<()> {
        if parameters.len() != gradients.len() {
            return Err(DuelnetError::dimension_mismatch(
                format!("{} gradient groups", parameters.len()),
                format!("{}", gradients.len()),
            ));
        }

        self.begin_step();
        for (index, ((weights, biases), (weight_grads, bias_grads))) in parameters.into_iter().zip(gradients).enumerate() {
            self.update_weights(index, weights, weight_grads, learning_rate)?;
            self.update_biases(index, biases, bias_grads, learning_rate)?;
        }
        Ok(())
    }
}

fn check_shapes<D: Dimension>(parameters: &D, gradients: &D) -> Result<()> {
    if parameters != gradients {
        return Err(DuelnetError::dimension_mismatch(
            format!("{:?}", parameters.slice()),
            format!("{:?}", gradients.slice()),
        ));
    }
    Ok(())
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub enum OptimizerWrapper {
    SGD(SGD),
    Adam(Adam),
}

impl Optimizer for OptimizerWrapper {
    fn update_weights(&mut self, index: usize, weights: &mut Array2<f32>, gradients: &Array2<f32>, learning_rate: f32) -> Result<()> {
        match self {
            OptimizerWrapper::SGD(optimizer) => optimizer.update_weights(index, weights, gradients, learning_rate),
            OptimizerWrapper::Adam(optimizer) => optimizer.update_weights(index, weights, gradients, learning_rate),
        }
    }

    fn update_biases(&mut self, index: usize, biases: &mut Array1<f32>, gradients: &Array1<f32>, learning_rate: f32) -> Result<()> {
        match self {
            OptimizerWrapper::SGD(optimizer) => optimizer.update_biases(index, biases, gradients, learning_rate),
            OptimizerWrapper::Adam(optimizer) => optimizer.update_biases(index, biases, gradients, learning_rate),
        }
    }

    fn begin_step(&mut self) {
        match self {
            OptimizerWrapper::SGD(optimizer) => optimizer.begin_step(),
            OptimizerWrapper::Adam(optimizer) => optimizer.begin_step(),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct SGD;

impl SGD {
    pub fn new() -> SGD {
        SGD
    }
}

impl Default for SGD {
    fn default() -> Self {
        Self::new()
    }
}

impl Optimizer for SGD {
    fn update_weights(&mut self, _index: usize, weights: &mut Array2<f32>, gradients: &Array2<f32>, learning_rate: f32) -> Result<()> {
        check_shapes(&weights.raw_dim(), &gradients.raw_dim())?;
        weights.zip_mut_with(gradients, |w, &g| *w -= learning_rate * g);
        Ok(())
    }

    fn update_biases(&mut self, _index: usize, biases: &mut Array1<f32>, gradients: &Array1<f32>, learning_rate: f32) -> Result<()> {
        check_shapes(&biases.raw_dim(), &gradients.raw_dim())?;
        biases.zip_mut_with(gradients, |b, &g| *b -= learning_rate * g);
        Ok(())
    }
}

/// Adam with bias-corrected moments.
///
/// Moment buffers are created on first use of each group index, so the
/// optimizer does not need to see the network at construction.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Adam {
    pub beta1: f32,
    pub beta2: f32,
    pub epsilon: f32,
    m_weights: Vec<Array2<f32>>,
    v_weights: Vec<Array2<f32>>,
    m_biases: Vec<Array1<f32>>,
    v_biases: Vec<Array1<f32>>,
    /// Completed steps, including the one in progress
    pub t: u64,
}

impl Adam {
    pub fn new(beta1: f32, beta2: f32, epsilon: f32) -> Self {
        Adam {
            beta1,
            beta2,
            epsilon,
            m_weights: Vec::new(),
            v_weights: Vec::new(),
            m_biases: Vec::new(),
            v_biases: Vec::new(),
            t: 0,
        }
    }

    fn corrections(&self) -> (f32, f32) {
        let t = self.t.max(1) as i32;
        (1.0 - self.beta1.powi(t), 1.0 - self.beta2.powi(t))
    }
}

impl Default for Adam {
    fn default() -> Self {
        Self::new(0.9, 0.999, 1e-8)
    }
}

fn moment_slot<D: Dimension>(slots: &mut Vec<ndarray::Array<f32, D>>, index: usize, dim: D) -> &mut ndarray::Array<f32, D> {
    while slots.len() <= index {
        slots.push(ndarray::Array::zeros(dim.clone()));
    }
    if slots[index].raw_dim() != dim {
        slots[index] = ndarray::Array::zeros(dim);
    }
    &mut slots[index]
}

impl Optimizer for Adam {
    fn update_weights(&mut self, index: usize, weights: &mut Array2<f32>, gradients: &Array2<f32>, learning_rate: f32) -> Result<()> {
        check_shapes(&weights.raw_dim(), &gradients.raw_dim())?;
        let (beta1, beta2, epsilon) = (self.beta1, self.beta2, self.epsilon);
        let (correction1, correction2) = self.corrections();

        let m = moment_slot(&mut self.m_weights, index, weights.raw_dim());
        m.zip_mut_with(gradients, |m, &g| *m = beta1 * *m + (1.0 - beta1) * g);
        let v = moment_slot(&mut self.v_weights, index, weights.raw_dim());
        v.zip_mut_with(gradients, |v, &g| *v = beta2 * *v + (1.0 - beta2) * g * g);

        let m = &self.m_weights[index];
        let v = &self.v_weights[index];
        ndarray::Zip::from(weights).and(m).and(v).for_each(|w, &m, &v| {
            let m_hat = m / correction1;
            let v_hat = v / correction2;
            *w -= learning_rate * m_hat / (v_hat.sqrt() + epsilon);
        });
        Ok(())
    }

    fn update_biases(&mut self, index: usize, biases: &mut Array1<f32>, gradients: &Array1<f32>, learning_rate: f32) -> Result<()> {
        check_shapes(&biases.raw_dim(), &gradients.raw_dim())?;
        let (beta1, beta2, epsilon) = (self.beta1, self.beta2, self.epsilon);
        let (correction1, correction2) = self.corrections();

        let m = moment_slot(&mut self.m_biases, index, biases.raw_dim());
        m.zip_mut_with(gradients, |m, &g| *m = beta1 * *m + (1.0 - beta1) * g);
        let v = moment_slot(&mut self.v_biases, index, biases.raw_dim());
        v.zip_mut_with(gradients, |v, &g| *v = beta2 * *v + (1.0 - beta2) * g * g);

        let m = &self.m_biases[index];
        let v = &self.v_biases[index];
        ndarray::Zip::from(biases).and(m).and(v).for_each(|b, &m, &v| {
            let m_hat = m / correction1;
            let v_hat = v / correction2;
            *b -= learning_rate * m_hat / (v_hat.sqrt() + epsilon);
        });
        Ok(())
    }

    fn begin_step(&mut self) {
        self.t += 1;
    }
}
