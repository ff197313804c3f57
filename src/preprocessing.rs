//! Conversion of raw RGB screens into small luminance frames.

use ndarray::{Array2, ArrayView2, ArrayView3, Axis};
use serde::{Serialize, Deserialize};

use crate::error::{DuelnetError, Result};
use crate::types::Frame;

/// Deterministic, stateless screen-to-frame conversion.
pub trait Preprocessor {
    fn process(&self, raw: ArrayView3<u8>) -> Result<Frame>;

    /// `(height, width)` of every produced frame
    fn output_shape(&self) -> (usize, usize);
}

/// Luminance, optional row crop, bilinear resize.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FramePreprocessor {
    /// Half-open row range `[top, bottom)` kept before resizing
    pub crop: Option<(usize, usize)>,
    pub height: usize,
    pub width: usize,
}

impl FramePreprocessor {
    pub fn new(crop: Option<(usize, usize)>, height: usize, width: usize) -> Result<Self> {
        let preprocessor = FramePreprocessor { crop, height, width };
        preprocessor.validate()?;
        Ok(preprocessor)
    }

    /// Check settings that may have bypassed [`FramePreprocessor::new`], e.g. via serde.
    pub fn validate(&self) -> Result<()> {
        if self.height == 0 || self.width == 0 {
            return Err(DuelnetError::invalid_parameter("size", "output frame must be at least 1x1"));
        }
        if let Some((top, bottom)) = self.crop {
            if top >= bottom {
                return Err(DuelnetError::invalid_parameter("crop", "crop top must be above crop bottom"));
            }
        }
        Ok(())
    }

    /// Rows 30..195 of a 210x160 Atari screen, resized to 84x84.
    pub fn atari() -> Self {
        FramePreprocessor { crop: Some((30, 195)), height: 84, width: 84 }
    }
}

impl Default for FramePreprocessor {
    fn default() -> Self {
        Self::atari()
    }
}

impl Preprocessor for FramePreprocessor {
    fn process(&self, raw: ArrayView3<u8>) -> Result<Frame> {
        let (rows, _, _) = raw.dim();
        let luminance = luminance(raw)?;

        let cropped = match self.crop {
            Some((top, bottom)) => {
                if top >= bottom {
                    return Err(DuelnetError::dimension_mismatch(
                        "a non-empty crop".to_string(),
                        format!("rows {}..{}", top, bottom),
                    ));
                }
                if bottom > rows {
                    return Err(DuelnetError::dimension_mismatch(
                        format!("at least {} rows", bottom),
                        format!("{}", rows),
                    ));
                }
                luminance.slice_axis(Axis(0), (top..bottom).into())
            }
            None => luminance.view(),
        };

        if self.height == 0 || self.width == 0 {
            return Err(DuelnetError::dimension_mismatch(
                "an output frame of at least 1x1".to_string(),
                format!("{}x{}", self.height, self.width),
            ));
        }
        Ok(resize_bilinear(cropped, self.height, self.width))
    }

    fn output_shape(&self) -> (usize, usize) {
        (self.height, self.width)
    }
}

/// ITU-R 601 luma, truncated to `u8`. Single-channel input passes through.
fn luminance(raw: ArrayView3<u8>) -> Result<Array2<u8>> {
    let (rows, columns, channels) = raw.dim();
    if rows == 0 || columns == 0 {
        return Err(DuelnetError::dimension_mismatch(
            "a non-empty screen".to_string(),
            format!("{}x{}", rows, columns),
        ));
    }
    match channels {
        1 => Ok(raw.index_axis(Axis(2), 0).to_owned()),
        c if c >= 3 => Ok(Array2::from_shape_fn((rows, columns), |(r, c)| {
            let red = f32::from(raw[[r, c, 0]]);
            let green = f32::from(raw[[r, c, 1]]);
            let blue = f32::from(raw[[r, c, 2]]);
            (0.299 * red + 0.587 * green + 0.114 * blue) as u8
        })),
        _ => Err(DuelnetError::dimension_mismatch(
            "1 or at least 3 channels".to_string(),
            format!("{} channels", channels),
        )),
    }
}

/// Bilinear resampling with pixel centers at half-integer coordinates.
fn resize_bilinear(source: ArrayView2<u8>, height: usize, width: usize) -> Array2<u8> {
    let (src_h, src_w) = source.dim();
    let scale_y = src_h as f32 / height as f32;
    let scale_x = src_w as f32 / width as f32;

    let sample_points = |size: usize, scale: f32, limit: usize| -> Vec<(usize, usize, f32)> {
        (0..size)
            .map(|i| {
                let pos = ((i as f32 + 0.5) * scale - 0.5).clamp(0.0, (limit - 1) as f32);
                let low = pos.floor() as usize;
                let high = (low + 1).min(limit - 1);
                (low, high, pos - low as f32)
            })
            .collect()
    };
    let ys = sample_points(height, scale_y, src_h);
    let xs = sample_points(width, scale_x, src_w);

    Array2::from_shape_fn((height, width), |(y, x)| {
        let (y0, y1, fy) = ys[y];
        let (x0, x1, fx) = xs[x];
        let top = f32::from(source[[y0, x0]]) * (1.0 - fx) + f32::from(source[[y0, x1]]) * fx;
        let bottom = f32::from(source[[y1, x0]]) * (1.0 - fx) + f32::from(source[[y1, x1]]) * fx;
        (top * (1.0 - fy) + bottom * fy).round().clamp(0.0, 255.0) as u8
    })
}
