//! Dueling convolutional Q-network.
//!
//! A stack of ReLU convolutions produces a feature map whose channels are
//! split in two halves. The first half feeds a linear value head `V(s)`, the
//! second a linear advantage head `A(s, a)`, combined as
//! `Q(s, a) = V(s) + A(s, a) - mean_a A(s, a)`.

use ndarray::{s, Array1, Array2, Array4, ArrayView2, ArrayView4, Axis};
use rand::Rng;
use serde::{Serialize, Deserialize};
use std::fs;
use std::path::Path;

use crate::activations::Activation;
use crate::agent::traits::{TrainableEstimator, ValueEstimator};
use crate::error::{DuelnetError, Result};
use crate::layers::{Conv2DLayer, DenseLayer, ParameterGroup, WeightInit};

/// One convolution of the feature stack (square kernel and stride).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConvSpec {
    pub out_channels: usize,
    pub kernel: usize,
    pub stride: usize,
}

impl ConvSpec {
    pub fn new(out_channels: usize, kernel: usize, stride: usize) -> Self {
        ConvSpec { out_channels, kernel, stride }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    pub conv_layers: Vec<ConvSpec>,
    /// Factor applied to raw pixel values before the first convolution
    pub input_scale: f32,
}

impl Default for NetworkConfig {
    /// The 84x84 Atari stack: 20x20, 9x9, 7x7, then a 7x7 kernel down to 1x1.
    fn default() -> Self {
        NetworkConfig {
            conv_layers: vec![
                ConvSpec::new(32, 8, 4),
                ConvSpec::new(64, 4, 2),
                ConvSpec::new(64, 3, 1),
                ConvSpec::new(1024, 7, 1),
            ],
            input_scale: 1.0 / 255.0,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct DuelingNetwork {
    pub conv_layers: Vec<Conv2DLayer>,
    pub value_head: DenseLayer,
    pub advantage_head: DenseLayer,
    input_shape: (usize, usize, usize),
    feature_shape: (usize, usize, usize),
    input_scale: f32,
}

impl DuelingNetwork {
    /// Build a network for `(K, H, W)` inputs with He-normal weights and zero biases.
    pub fn new(input_shape: (usize, usize, usize), num_actions: usize, config: &NetworkConfig) -> Result<Self> {
        Self::new_with_rng(input_shape, num_actions, config, &mut rand::thread_rng())
    }

    pub fn new_with_rng<R: Rng + ?Sized>(
        input_shape: (usize, usize, usize),
        num_actions: usize,
        config: &NetworkConfig,
        rng: &mut R,
    ) -> Result<Self> {
        if num_actions == 0 {
            return Err(DuelnetError::invalid_parameter("num_actions", "at least one action is required"));
        }
        if config.conv_layers.is_empty() {
            return Err(DuelnetError::invalid_parameter("conv_layers", "at least one convolution is required"));
        }

        let (mut channels, mut height, mut width) = input_shape;
        let mut conv_layers = Vec::with_capacity(config.conv_layers.len());
        for spec in &config.conv_layers {
            let layer = Conv2DLayer::with_init(
                channels,
                spec.out_channels,
                (spec.kernel, spec.kernel),
                (spec.stride, spec.stride),
                Activation::Relu,
                WeightInit::HeNormal,
                rng,
            )?;
            let (out_h, out_w) = layer.output_size(height, width)?;
            channels = spec.out_channels;
            height = out_h;
            width = out_w;
            conv_layers.push(layer);
        }

        if channels % 2 != 0 {
            return Err(DuelnetError::invalid_parameter(
                "conv_layers",
                "the last convolution needs an even channel count to split into value and advantage streams",
            ));
        }
        let stream_size = channels / 2 * height * width;

        let value_head = DenseLayer::with_init(stream_size, 1, Activation::Linear, WeightInit::HeNormal, rng)?;
        let advantage_head =
            DenseLayer::with_init(stream_size, num_actions, Activation::Linear, WeightInit::HeNormal, rng)?;

        Ok(DuelingNetwork {
            conv_layers,
            value_head,
            advantage_head,
            input_shape,
            feature_shape: (channels, height, width),
            input_scale: config.input_scale,
        })
    }

    /// `(channels, height, width)` of the last convolution's output
    pub fn feature_shape(&self) -> (usize, usize, usize) {
        self.feature_shape
    }

    pub fn num_parameters(&self) -> usize {
        self.conv_layers.iter().map(|l| l.num_parameters()).sum::<usize>()
            + self.value_head.num_parameters()
            + self.advantage_head.num_parameters()
    }

    fn scaled_input(&self, states: ArrayView4<f32>) -> Result<Array4<f32>> {
        let (_, k, h, w) = states.dim();
        if (k, h, w) != self.input_shape {
            return Err(DuelnetError::dimension_mismatch(
                format!("{:?}", self.input_shape),
                format!("{:?}", (k, h, w)),
            ));
        }
        let scale = self.input_scale;
        Ok(states.mapv(|v| v * scale))
    }

    /// Split features `(B, C, h, w)` into value and advantage stream inputs.
    fn split_streams(&self, features: &Array4<f32>) -> Result<(Array2<f32>, Array2<f32>)> {
        let batch_size = features.dim().0;
        let half = self.feature_shape.0 / 2;
        let value = flatten(features.slice(s![.., ..half, .., ..]), batch_size)?;
        let advantage = flatten(features.slice(s![.., half.., .., ..]), batch_size)?;
        Ok((value, advantage))
    }

    /// Save the network to a bincode file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let encoded = bincode::serialize(self)?;
        fs::write(path, encoded)?;
        Ok(())
    }

    /// Load a network saved with [`DuelingNetwork::save`]
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let bytes = fs::read(path)?;
        Ok(bincode::deserialize(&bytes)?)
    }
}

fn flatten(view: ArrayView4<f32>, batch_size: usize) -> Result<Array2<f32>> {
    let per_sample = if batch_size == 0 { 0 } else { view.len() / batch_size };
    Ok(Array2::from_shape_vec((batch_size, per_sample), view.iter().copied().collect())?)
}

/// `Q = V + A - mean_a(A)`
fn combine_streams(values: &Array2<f32>, advantages: &Array2<f32>) -> Array2<f32> {
    let num_actions = advantages.ncols().max(1) as f32;
    let mean_advantage = advantages.sum_axis(Axis(1)).insert_axis(Axis(1)) / num_actions;
    advantages - &mean_advantage + values
}

impl ValueEstimator for DuelingNetwork {
    fn num_actions(&self) -> usize {
        self.advantage_head.output_size()
    }

    fn input_shape(&self) -> (usize, usize, usize) {
        self.input_shape
    }

    fn evaluate(&self, states: ArrayView4<f32>) -> Result<Array2<f32>> {
        let mut x = self.scaled_input(states)?;
        for layer in &self.conv_layers {
            x = layer.forward(x.view())?;
        }
        let (value_in, advantage_in) = self.split_streams(&x)?;
        let values = self.value_head.forward(value_in.view())?;
        let advantages = self.advantage_head.forward(advantage_in.view())?;
        Ok(combine_streams(&values, &advantages))
    }

    fn load_state_from(&mut self, other: &Self) -> Result<()> {
        if self.conv_layers.len() != other.conv_layers.len() {
            return Err(DuelnetError::dimension_mismatch(
                format!("{} convolutions", self.conv_layers.len()),
                format!("{}", other.conv_layers.len()),
            ));
        }
        for (mine, theirs) in self.conv_layers.iter_mut().zip(&other.conv_layers) {
            mine.copy_parameters_from(theirs)?;
        }
        self.value_head.copy_parameters_from(&other.value_head)?;
        self.advantage_head.copy_parameters_from(&other.advantage_head)?;
        Ok(())
    }
}

impl TrainableEstimator for DuelingNetwork {
    fn forward_train(&mut self, states: ArrayView4<f32>) -> Result<Array2<f32>> {
        let mut x = self.scaled_input(states)?;
        for layer in self.conv_layers.iter_mut() {
            x = layer.forward_batch(x.view())?;
        }
        let (value_in, advantage_in) = self.split_streams(&x)?;
        let values = self.value_head.forward_batch(value_in.view())?;
        let advantages = self.advantage_head.forward_batch(advantage_in.view())?;
        Ok(combine_streams(&values, &advantages))
    }

    fn backward(&mut self, output_gradients: ArrayView2<f32>) -> Result<Vec<(Array2<f32>, Array1<f32>)>> {
        let (batch_size, num_actions) = output_gradients.dim();
        if num_actions != self.num_actions() {
            return Err(DuelnetError::dimension_mismatch(
                format!("{} action gradients", self.num_actions()),
                format!("{}", num_actions),
            ));
        }

        // dQ/dV = 1 for every action; dQ/dA_j = [a == j] - 1/A
        let value_errors = output_gradients.sum_axis(Axis(1)).insert_axis(Axis(1));
        let mean_errors = value_errors.clone() / num_actions as f32;
        let advantage_errors = &output_gradients - &mean_errors;

        let (value_in_errors, value_w, value_b) = self.value_head.backward_batch(value_errors.view())?;
        let (advantage_in_errors, advantage_w, advantage_b) =
            self.advantage_head.backward_batch(advantage_errors.view())?;

        let (channels, height, width) = self.feature_shape;
        let half = channels / 2;
        let mut errors = Array4::zeros((batch_size, channels, height, width));
        errors
            .slice_mut(s![.., ..half, .., ..])
            .assign(&value_in_errors.into_shape((batch_size, half, height, width))?);
        errors
            .slice_mut(s![.., half.., .., ..])
            .assign(&advantage_in_errors.into_shape((batch_size, half, height, width))?);

        let mut conv_gradients = Vec::with_capacity(self.conv_layers.len());
        for (index, layer) in self.conv_layers.iter().enumerate().rev() {
            let (input_errors, weight_grads, bias_grads) = layer.backward_batch(errors.view(), index > 0)?;
            conv_gradients.push((weight_grads, bias_grads));
            if let Some(input_errors) = input_errors {
                errors = input_errors;
            }
        }
        conv_gradients.reverse();

        conv_gradients.push((value_w, value_b));
        conv_gradients.push((advantage_w, advantage_b));
        Ok(conv_gradients)
    }

    fn parameters_mut(&mut self) -> Vec<(&mut Array2<f32>, &mut Array1<f32>)> {
        let mut groups: Vec<(&mut Array2<f32>, &mut Array1<f32>)> =
            self.conv_layers.iter_mut().map(|l| l.parameters_mut()).collect();
        groups.push(self.value_head.parameters_mut());
        groups.push(self.advantage_head.parameters_mut());
        groups
    }
}
