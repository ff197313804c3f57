//! 2D convolution for stacked game frames.
//!
//! The layer lowers each sample to a column matrix (im2col) so both the
//! forward pass and the weight gradient become a single matrix product.
//! Samples of a batch are lowered in parallel.

use ndarray::parallel::prelude::{IntoParallelIterator, ParallelIterator};
use ndarray::{s, Array1, Array2, Array4, ArrayView2, ArrayView3, ArrayView4, ArrayViewMut3, Axis};
use rand::Rng;
use serde::{Serialize, Deserialize};

use crate::activations::Activation;
use crate::error::{DuelnetError, Result};
use super::initialization::WeightInit;
use super::traits::ParameterGroup;

/// 2D Convolutional Layer without padding.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Conv2DLayer {
    /// Kernels flattened to `[out_channels, in_channels * kernel_height * kernel_width]`
    pub weights: Array2<f32>,

    /// Bias terms for each output channel
    pub biases: Array1<f32>,

    pub activation: Activation,
    pub stride: (usize, usize),
    pub in_channels: usize,
    pub out_channels: usize,
    pub kernel_size: (usize, usize),

    /// Per-sample column matrices from the last recorded forward pass
    #[serde(skip)]
    cached_columns: Option<Vec<Array2<f32>>>,

    #[serde(skip)]
    cached_pre_activation: Option<Array4<f32>>,

    #[serde(skip)]
    cached_input_dim: Option<(usize, usize, usize, usize)>,
}

impl Conv2DLayer {
    /// Create a new 2D convolutional layer initialized for its activation.
    pub fn new(
        in_channels: usize,
        out_channels: usize,
        kernel_size: (usize, usize),
        stride: (usize, usize),
        activation: Activation,
    ) -> Result<Self> {
        let init = WeightInit::for_activation(&activation);
        Self::with_init(in_channels, out_channels, kernel_size, stride, activation, init, &mut rand::thread_rng())
    }

    pub fn with_init<R: Rng + ?Sized>(
        in_channels: usize,
        out_channels: usize,
        kernel_size: (usize, usize),
        stride: (usize, usize),
        activation: Activation,
        init: WeightInit,
        rng: &mut R,
    ) -> Result<Self> {
        if stride.0 == 0 || stride.1 == 0 {
            return Err(DuelnetError::invalid_parameter("stride", "stride must be at least 1"));
        }
        let fan_in = in_channels * kernel_size.0 * kernel_size.1;
        let fan_out = out_channels * kernel_size.0 * kernel_size.1;
        let weights = init.initialize_weights((out_channels, fan_in), fan_in, fan_out, rng)?;
        let biases = init.initialize_biases(out_channels);

        Ok(Conv2DLayer {
            weights,
            biases,
            activation,
            stride,
            in_channels,
            out_channels,
            kernel_size,
            cached_columns: None,
            cached_pre_activation: None,
            cached_input_dim: None,
        })
    }

    /// Spatial output size for an input of `height x width`.
    pub fn output_size(&self, height: usize, width: usize) -> Result<(usize, usize)> {
        let (kh, kw) = self.kernel_size;
        if height < kh || width < kw {
            return Err(DuelnetError::dimension_mismatch(
                format!("input of at least {}x{}", kh, kw),
                format!("{}x{}", height, width),
            ));
        }
        Ok(((height - kh) / self.stride.0 + 1, (width - kw) / self.stride.1 + 1))
    }

    /// Lower one `[channels, height, width]` sample to `[C*kh*kw, out_h*out_w]`.
    fn im2col(&self, sample: ArrayView3<f32>, out_h: usize, out_w: usize) -> Array2<f32> {
        let (kh, kw) = self.kernel_size;
        let (sh, sw) = self.stride;
        let mut columns = Array2::zeros((self.in_channels * kh * kw, out_h * out_w));

        for ic in 0..self.in_channels {
            for ki in 0..kh {
                for kj in 0..kw {
                    let row = (ic * kh + ki) * kw + kj;
                    let window = sample.slice(s![
                        ic,
                        ki..ki + sh * (out_h - 1) + 1;sh,
                        kj..kj + sw * (out_w - 1) + 1;sw
                    ]);
                    for (dst, &src) in columns.row_mut(row).iter_mut().zip(window.iter()) {
                        *dst = src;
                    }
                }
            }
        }

        columns
    }

    /// Scatter-add column errors back onto one input sample.
    fn col2im(&self, column_errors: ArrayView2<f32>, mut target: ArrayViewMut3<f32>, out_h: usize, out_w: usize) {
        let (kh, kw) = self.kernel_size;
        let (sh, sw) = self.stride;

        for ic in 0..self.in_channels {
            for ki in 0..kh {
                for kj in 0..kw {
                    let row = (ic * kh + ki) * kw + kj;
                    let mut window = target.slice_mut(s![
                        ic,
                        ki..ki + sh * (out_h - 1) + 1;sh,
                        kj..kj + sw * (out_w - 1) + 1;sw
                    ]);
                    for (dst, &src) in window.iter_mut().zip(column_errors.row(row).iter()) {
                        *dst += src;
                    }
                }
            }
        }
    }

    fn convolve(&self, input: ArrayView4<f32>, keep_columns: bool) -> Result<(Vec<Array2<f32>>, Array4<f32>)> {
        let (batch_size, channels, height, width) = input.dim();
        if channels != self.in_channels {
            return Err(DuelnetError::dimension_mismatch(
                format!("{} input channels", self.in_channels),
                format!("{}", channels),
            ));
        }
        let (out_h, out_w) = self.output_size(height, width)?;

        let per_sample: Vec<(Array2<f32>, Array2<f32>)> = (0..batch_size)
            .into_par_iter()
            .map(|b| {
                let columns = self.im2col(input.index_axis(Axis(0), b), out_h, out_w);
                let pre = self.weights.dot(&columns) + &self.biases.view().insert_axis(Axis(1));
                (columns, pre)
            })
            .collect();

        let mut pre_activation = Array4::zeros((batch_size, self.out_channels, out_h, out_w));
        let mut kept = Vec::with_capacity(if keep_columns { batch_size } else { 0 });
        for (b, (columns, pre)) in per_sample.into_iter().enumerate() {
            for (dst, &src) in pre_activation.index_axis_mut(Axis(0), b).iter_mut().zip(pre.iter()) {
                *dst = src;
            }
            if keep_columns {
                kept.push(columns);
            }
        }

        Ok((kept, pre_activation))
    }

    /// Forward pass for a batch `[batch, channels, height, width]` without
    /// recording anything.
    pub fn forward(&self, input: ArrayView4<f32>) -> Result<Array4<f32>> {
        let (_, mut output) = self.convolve(input, false)?;
        self.activation.apply(&mut output);
        Ok(output)
    }

    /// Forward pass that caches what `backward_batch` needs.
    pub fn forward_batch(&mut self, input: ArrayView4<f32>) -> Result<Array4<f32>> {
        let (columns, pre_activation) = self.convolve(input, true)?;
        let mut output = pre_activation.clone();
        self.activation.apply(&mut output);

        self.cached_columns = Some(columns);
        self.cached_pre_activation = Some(pre_activation);
        self.cached_input_dim = Some(input.dim());
        Ok(output)
    }

    /// Backward pass.
    ///
    /// Returns `(input_errors, weight_gradients, bias_gradients)`; input errors
    /// are only computed when `propagate` is set (the first layer of a
    /// network has nothing to propagate to).
    pub fn backward_batch(
        &self,
        output_errors: ArrayView4<f32>,
        propagate: bool,
    ) -> Result<(Option<Array4<f32>>, Array2<f32>, Array1<f32>)> {
        let (columns, pre_activation, input_dim) =
            match (&self.cached_columns, &self.cached_pre_activation, self.cached_input_dim) {
                (Some(columns), Some(pre), Some(dim)) => (columns, pre, dim),
                _ => {
                    return Err(DuelnetError::invalid_parameter(
                        "backward_batch",
                        "forward_batch() must be called before backward_batch()",
                    ))
                }
            };
        if output_errors.dim() != pre_activation.dim() {
            return Err(DuelnetError::dimension_mismatch(
                format!("{:?}", pre_activation.dim()),
                format!("{:?}", output_errors.dim()),
            ));
        }

        let delta = &output_errors * &self.activation.derivative(pre_activation.view());
        let (batch_size, _, out_h, out_w) = delta.dim();

        let mut weight_gradients = Array2::zeros(self.weights.raw_dim());
        let mut bias_gradients = Array1::zeros(self.out_channels);
        let mut input_errors = if propagate { Some(Array4::zeros(input_dim)) } else { None };

        for b in 0..batch_size {
            let sample_delta = delta
                .index_axis(Axis(0), b)
                .to_owned()
                .into_shape((self.out_channels, out_h * out_w))?;

            weight_gradients += &sample_delta.dot(&columns[b].t());
            bias_gradients += &sample_delta.sum_axis(Axis(1));

            if let Some(errors) = input_errors.as_mut() {
                let column_errors = self.weights.t().dot(&sample_delta);
                self.col2im(column_errors.view(), errors.index_axis_mut(Axis(0), b), out_h, out_w);
            }
        }

        Ok((input_errors, weight_gradients, bias_gradients))
    }
}

impl ParameterGroup for Conv2DLayer {
    fn weights(&self) -> &Array2<f32> {
        &self.weights
    }

    fn biases(&self) -> &Array1<f32> {
        &self.biases
    }

    fn parameters_mut(&mut self) -> (&mut Array2<f32>, &mut Array1<f32>) {
        (&mut self.weights, &mut self.biases)
    }
}
