//! Dense `samples × steps × width` tensor used for windows and predictions.

use crate::error::{ForecastError, Result};
use ndarray::{s, Array3, ArrayView1, ArrayView2, Axis};
use serde::{Deserialize, Serialize};

/// 3-D tensor of `f64` in standard (row-major) layout.
///
/// Axis 0 indexes windows (samples), axis 1 time steps inside a window and
/// axis 2 the columns of one observation.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Tensor3 {
    data: Array3<f64>,
}

impl Tensor3 {
    /// Wrap a flat row-major buffer, checking it matches `shape`.
    pub fn new(shape: [usize; 3], data: Vec<f64>) -> Result<Self> {
        let expected = shape.iter().product::<usize>();
        let got = data.len();
        let data = Array3::from_shape_vec((shape[0], shape[1], shape[2]), data)
            .map_err(|_| ForecastError::DimensionMismatch { expected, got })?;
        Ok(Self { data })
    }

    pub fn zeros(shape: [usize; 3]) -> Self {
        Self {
            data: Array3::zeros((shape[0], shape[1], shape[2])),
        }
    }

    /// An empty tensor whose samples will each hold `steps × width` values.
    pub fn with_sample_shape(steps: usize, width: usize) -> Self {
        Self::zeros([0, steps, width])
    }

    pub fn shape(&self) -> [usize; 3] {
        let (n, steps, width) = self.data.dim();
        [n, steps, width]
    }

    pub fn n_samples(&self) -> usize {
        self.data.len_of(Axis(0))
    }

    pub fn steps(&self) -> usize {
        self.data.len_of(Axis(1))
    }

    pub fn width(&self) -> usize {
        self.data.len_of(Axis(2))
    }

    pub fn is_empty(&self) -> bool {
        self.n_samples() == 0
    }

    pub fn data(&self) -> &Array3<f64> {
        &self.data
    }

    pub fn get(&self, sample: usize, step: usize, col: usize) -> f64 {
        self.data[[sample, step, col]]
    }

    pub fn set(&mut self, sample: usize, step: usize, col: usize, value: f64) {
        self.data[[sample, step, col]] = value;
    }

    /// One sample as a `steps × width` view.
    pub fn sample(&self, index: usize) -> ArrayView2<'_, f64> {
        self.data.index_axis(Axis(0), index)
    }

    /// Append one `steps × width` sample.
    pub fn push_sample(&mut self, values: ArrayView2<'_, f64>) -> Result<()> {
        let expected = (self.steps(), self.width());
        if values.dim() != expected {
            return Err(ForecastError::DimensionMismatch {
                expected: expected.0 * expected.1,
                got: values.len(),
            });
        }
        self.data
            .push(Axis(0), values)
            .map_err(|e| ForecastError::ComputationError(e.to_string()))
    }

    /// Values at a fixed `(step, col)` across all samples.
    pub fn lane(&self, step: usize, col: usize) -> Vec<f64> {
        self.data.slice(s![.., step, col]).to_vec()
    }

    /// Overwrite the `(step, col)` lane across all samples.
    pub fn set_lane(&mut self, step: usize, col: usize, values: &[f64]) -> Result<()> {
        if values.len() != self.n_samples() {
            return Err(ForecastError::DimensionMismatch {
                expected: self.n_samples(),
                got: values.len(),
            });
        }
        self.data
            .slice_mut(s![.., step, col])
            .assign(&ArrayView1::from(values));
        Ok(())
    }

    /// Split off the trailing `n` samples, keeping order in both halves.
    pub fn split_tail(&self, n: usize) -> (Tensor3, Tensor3) {
        let cut = self.n_samples() - n.min(self.n_samples());
        (
            Tensor3 {
                data: self.data.slice(s![..cut, .., ..]).to_owned(),
            },
            Tensor3 {
                data: self.data.slice(s![cut.., .., ..]).to_owned(),
            },
        )
    }
}

impl From<Array3<f64>> for Tensor3 {
    fn from(data: Array3<f64>) -> Self {
        Self { data }
    }
}
