//! Reverse-mode differentiation over vector-valued nodes.
//!
//! A [`Graph`] records the forward computation of one training window against
//! a borrowed [`Parameters`] store. Calling [`Graph::backward`] on a scalar
//! node accumulates parameter gradients into a [`Gradients`] buffer.

use crate::models::nn::activation::Activation;
use crate::models::nn::params::{ParamId, Parameters};
use ndarray::linalg::general_mat_mul;
use ndarray::{array, s, Array1, Array2, Axis, Zip};

/// Handle to a node of a [`Graph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeId(usize);

/// Gradient buffers shaped like a [`Parameters`] store.
#[derive(Debug, Clone)]
pub struct Gradients {
    values: Vec<Array2<f64>>,
}

impl Gradients {
    pub fn zeros_like(params: &Parameters) -> Self {
        Self {
            values: params
                .iter()
                .map(|p| Array2::zeros(p.values.raw_dim()))
                .collect(),
        }
    }

    pub fn get(&self, id: ParamId) -> &Array2<f64> {
        &self.values[id.index()]
    }

    pub fn iter(&self) -> impl Iterator<Item = &Array2<f64>> {
        self.values.iter()
    }

    pub fn reset(&mut self) {
        for g in &mut self.values {
            g.fill(0.0);
        }
    }

    fn slot(&mut self, id: ParamId) -> &mut Array2<f64> {
        &mut self.values[id.index()]
    }
}

#[derive(Debug, Clone)]
enum Op {
    Input,
    Param(ParamId),
    MatVec { weight: ParamId, input: NodeId },
    Add(NodeId, NodeId),
    Mul(NodeId, NodeId),
    Activate(NodeId, Activation),
    Slice { input: NodeId, start: usize },
    Concat(Vec<NodeId>),
    Dot(NodeId, NodeId),
    Softmax(NodeId),
    WeightedSum { weights: NodeId, items: Vec<NodeId> },
    MeanSquaredError { prediction: NodeId, target: Array1<f64> },
}

#[derive(Debug, Clone)]
struct Node {
    value: Array1<f64>,
    op: Op,
}

/// Computation graph for one forward pass.
pub struct Graph<'p> {
    params: &'p Parameters,
    nodes: Vec<Node>,
}

impl<'p> Graph<'p> {
    pub fn new(params: &'p Parameters) -> Self {
        Self {
            params,
            nodes: Vec::new(),
        }
    }

    fn push(&mut self, value: Array1<f64>, op: Op) -> NodeId {
        self.nodes.push(Node { value, op });
        NodeId(self.nodes.len() - 1)
    }

    pub fn value(&self, id: NodeId) -> &Array1<f64> {
        &self.nodes[id.0].value
    }

    pub fn len(&self, id: NodeId) -> usize {
        self.nodes[id.0].value.len()
    }

    /// A constant input vector.
    pub fn input(&mut self, values: Array1<f64>) -> NodeId {
        self.push(values, Op::Input)
    }

    pub fn zeros(&mut self, len: usize) -> NodeId {
        self.input(Array1::zeros(len))
    }

    /// A single-column parameter used directly as a vector (biases).
    pub fn param(&mut self, id: ParamId) -> NodeId {
        let p = self.params.get(id);
        debug_assert_eq!(p.cols(), 1);
        let value = p.values.column(0).to_owned();
        self.push(value, Op::Param(id))
    }

    /// `W · x` for a `rows × cols` parameter matrix.
    pub fn matvec(&mut self, weight: ParamId, input: NodeId) -> NodeId {
        let value = self.params.get(weight).values.dot(&self.nodes[input.0].value);
        self.push(value, Op::MatVec { weight, input })
    }

    pub fn add(&mut self, a: NodeId, b: NodeId) -> NodeId {
        let value = &self.nodes[a.0].value + &self.nodes[b.0].value;
        self.push(value, Op::Add(a, b))
    }

    /// Element-wise product.
    pub fn mul(&mut self, a: NodeId, b: NodeId) -> NodeId {
        let value = &self.nodes[a.0].value * &self.nodes[b.0].value;
        self.push(value, Op::Mul(a, b))
    }

    pub fn activate(&mut self, input: NodeId, activation: Activation) -> NodeId {
        let value = self.nodes[input.0].value.mapv(|x| activation.apply(x));
        self.push(value, Op::Activate(input, activation))
    }

    /// Elements `start..start + len` of `input`.
    pub fn slice(&mut self, input: NodeId, start: usize, len: usize) -> NodeId {
        let value = self.nodes[input.0]
            .value
            .slice(s![start..start + len])
            .to_owned();
        self.push(value, Op::Slice { input, start })
    }

    pub fn concat(&mut self, parts: &[NodeId]) -> NodeId {
        let value = parts
            .iter()
            .flat_map(|p| self.nodes[p.0].value.iter().copied())
            .collect::<Array1<f64>>();
        self.push(value, Op::Concat(parts.to_vec()))
    }

    /// Scalar dot product as a length-1 node.
    pub fn dot(&mut self, a: NodeId, b: NodeId) -> NodeId {
        let value = self.nodes[a.0].value.dot(&self.nodes[b.0].value);
        self.push(array![value], Op::Dot(a, b))
    }

    pub fn softmax(&mut self, input: NodeId) -> NodeId {
        let x = &self.nodes[input.0].value;
        let max = x.fold(f64::NEG_INFINITY, |m, &v| m.max(v));
        let exps = x.mapv(|v| (v - max).exp());
        let total = exps.sum();
        self.push(exps / total, Op::Softmax(input))
    }

    /// `Σ weights[i] · items[i]` over equally sized item vectors.
    pub fn weighted_sum(&mut self, weights: NodeId, items: &[NodeId]) -> NodeId {
        let w = &self.nodes[weights.0].value;
        debug_assert_eq!(w.len(), items.len());
        let width = items.first().map(|i| self.nodes[i.0].value.len()).unwrap_or(0);
        let mut value = Array1::<f64>::zeros(width);
        for (&wi, item) in w.iter().zip(items) {
            value.scaled_add(wi, &self.nodes[item.0].value);
        }
        self.push(
            value,
            Op::WeightedSum {
                weights,
                items: items.to_vec(),
            },
        )
    }

    /// Mean squared error between `prediction` and a constant target.
    pub fn mse(&mut self, prediction: NodeId, target: Array1<f64>) -> NodeId {
        let diff = &self.nodes[prediction.0].value - &target;
        let n = diff.len().max(1) as f64;
        let value = diff.dot(&diff) / n;
        self.push(array![value], Op::MeanSquaredError { prediction, target })
    }

    /// Back-propagate from a scalar node, adding `seed · ∂output/∂θ` into `grads`.
    pub fn backward(&self, output: NodeId, seed: f64, grads: &mut Gradients) {
        let mut adj: Vec<Array1<f64>> = self.nodes[..=output.0]
            .iter()
            .map(|node| Array1::zeros(node.value.len()))
            .collect();
        adj[output.0][0] = seed;

        for idx in (0..=output.0).rev() {
            let g = std::mem::take(&mut adj[idx]);
            if g.iter().all(|&v| v == 0.0) {
                continue;
            }
            let node = &self.nodes[idx];
            match &node.op {
                Op::Input => {}
                Op::Param(id) => {
                    let mut column = grads.slot(*id).column_mut(0);
                    column += &g;
                }
                Op::MatVec { weight, input } => {
                    let w = &self.params.get(*weight).values;
                    let x = &self.nodes[input.0].value;
                    general_mat_mul(
                        1.0,
                        &g.view().insert_axis(Axis(1)),
                        &x.view().insert_axis(Axis(0)),
                        1.0,
                        grads.slot(*weight),
                    );
                    adj[input.0] += &w.t().dot(&g);
                }
                Op::Add(a, b) => {
                    adj[a.0] += &g;
                    adj[b.0] += &g;
                }
                Op::Mul(a, b) => {
                    adj[a.0] += &(&g * &self.nodes[b.0].value);
                    adj[b.0] += &(&g * &self.nodes[a.0].value);
                }
                Op::Activate(input, activation) => {
                    Zip::from(&mut adj[input.0])
                        .and(&g)
                        .and(&self.nodes[input.0].value)
                        .and(&node.value)
                        .for_each(|acc, &gi, &x, &y| *acc += gi * activation.derivative(x, y));
                }
                Op::Slice { input, start } => {
                    let mut window = adj[input.0].slice_mut(s![*start..*start + g.len()]);
                    window += &g;
                }
                Op::Concat(parts) => {
                    let mut offset = 0;
                    for part in parts {
                        let len = self.nodes[part.0].value.len();
                        adj[part.0] += &g.slice(s![offset..offset + len]);
                        offset += len;
                    }
                }
                Op::Dot(a, b) => {
                    adj[a.0].scaled_add(g[0], &self.nodes[b.0].value);
                    adj[b.0].scaled_add(g[0], &self.nodes[a.0].value);
                }
                Op::Softmax(input) => {
                    let y = &node.value;
                    let inner = g.dot(y);
                    adj[input.0] += &(y * &(&g - inner));
                }
                Op::WeightedSum { weights, items } => {
                    let w = &self.nodes[weights.0].value;
                    let mut gw = Array1::<f64>::zeros(w.len());
                    for (i, item) in items.iter().enumerate() {
                        gw[i] = g.dot(&self.nodes[item.0].value);
                        adj[item.0].scaled_add(w[i], &g);
                    }
                    adj[weights.0] += &gw;
                }
                Op::MeanSquaredError { prediction, target } => {
                    let p = &self.nodes[prediction.0].value;
                    let n = p.len().max(1) as f64;
                    adj[prediction.0].scaled_add(2.0 * g[0] / n, &(p - target));
                }
            }
        }
    }
}
