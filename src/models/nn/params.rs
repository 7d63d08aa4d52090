//! Trainable parameter storage and initialisation.

use ndarray::Array2;
use rand::distributions::{Distribution, Uniform};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Handle to a tensor in a [`Parameters`] store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ParamId(usize);

impl ParamId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// A named `rows × cols` parameter matrix. Biases are stored as one column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Param {
    pub name: String,
    pub values: Array2<f64>,
}

impl Param {
    pub fn rows(&self) -> usize {
        self.values.nrows()
    }

    pub fn cols(&self) -> usize {
        self.values.ncols()
    }
}

/// All trainable tensors of one network.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Parameters {
    params: Vec<Param>,
}

impl Parameters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tensor with explicit values.
    pub fn add(&mut self, name: &str, values: Array2<f64>) -> ParamId {
        self.params.push(Param {
            name: name.to_string(),
            values,
        });
        ParamId(self.params.len() - 1)
    }

    /// Register a weight matrix with Glorot-uniform values.
    pub fn glorot<R: Rng>(&mut self, name: &str, rows: usize, cols: usize, rng: &mut R) -> ParamId {
        let limit = (6.0 / (rows + cols) as f64).sqrt();
        let dist = Uniform::new_inclusive(-limit, limit);
        let values = Array2::from_shape_simple_fn((rows, cols), || dist.sample(rng));
        self.add(name, values)
    }

    /// Register a bias vector filled with `value`.
    pub fn constant(&mut self, name: &str, len: usize, value: f64) -> ParamId {
        self.add(name, Array2::from_elem((len, 1), value))
    }

    pub fn get(&self, id: ParamId) -> &Param {
        &self.params[id.0]
    }

    pub fn get_mut(&mut self, id: ParamId) -> &mut Param {
        &mut self.params[id.0]
    }

    pub fn iter(&self) -> impl Iterator<Item = &Param> {
        self.params.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Param> {
        self.params.iter_mut()
    }

    /// Number of tensors.
    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Total number of scalar weights.
    pub fn n_values(&self) -> usize {
        self.params.iter().map(|p| p.values.len()).sum()
    }
}
