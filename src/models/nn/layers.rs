//! Dense and recurrent building blocks recorded onto a [`Graph`].

use crate::models::nn::activation::Activation;
use crate::models::nn::graph::{Graph, NodeId};
use crate::models::nn::params::{ParamId, Parameters};
use ndarray::{Array2, ArrayView2};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// One input node per time step (row) of a `steps × width` window.
pub fn sequence_inputs(g: &mut Graph<'_>, window: ArrayView2<'_, f64>) -> Vec<NodeId> {
    window
        .rows()
        .into_iter()
        .map(|step| g.input(step.to_owned()))
        .collect()
}

/// Fully connected layer `act(W x + b)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dense {
    weight: ParamId,
    bias: ParamId,
    activation: Activation,
    output_size: usize,
}

impl Dense {
    pub fn new<R: Rng>(
        params: &mut Parameters,
        rng: &mut R,
        name: &str,
        input_size: usize,
        output_size: usize,
        activation: Activation,
    ) -> Self {
        Self {
            weight: params.glorot(&format!("{name}.kernel"), output_size, input_size, rng),
            bias: params.constant(&format!("{name}.bias"), output_size, 0.0),
            activation,
            output_size,
        }
    }

    pub fn output_size(&self) -> usize {
        self.output_size
    }

    pub fn forward(&self, g: &mut Graph<'_>, x: NodeId) -> NodeId {
        let wx = g.matvec(self.weight, x);
        let b = g.param(self.bias);
        let z = g.add(wx, b);
        match self.activation {
            Activation::Linear => z,
            act => g.activate(z, act),
        }
    }
}

/// Elman cell `h' = act(W_x x + W_h h + b)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimpleRnnCell {
    w_x: ParamId,
    w_h: ParamId,
    bias: ParamId,
    hidden_size: usize,
    activation: Activation,
}

impl SimpleRnnCell {
    pub fn new<R: Rng>(
        params: &mut Parameters,
        rng: &mut R,
        name: &str,
        input_size: usize,
        hidden_size: usize,
        activation: Activation,
    ) -> Self {
        Self {
            w_x: params.glorot(&format!("{name}.kernel"), hidden_size, input_size, rng),
            w_h: params.glorot(&format!("{name}.recurrent"), hidden_size, hidden_size, rng),
            bias: params.constant(&format!("{name}.bias"), hidden_size, 0.0),
            hidden_size,
            activation,
        }
    }

    pub fn hidden_size(&self) -> usize {
        self.hidden_size
    }

    pub fn step(&self, g: &mut Graph<'_>, x: NodeId, h: NodeId) -> NodeId {
        let wx = g.matvec(self.w_x, x);
        let wh = g.matvec(self.w_h, h);
        let b = g.param(self.bias);
        let z = g.add(wx, wh);
        let z = g.add(z, b);
        g.activate(z, self.activation)
    }

    /// Run over `inputs` from a zero state and return the final hidden state.
    pub fn run(&self, g: &mut Graph<'_>, inputs: &[NodeId]) -> NodeId {
        let mut h = g.zeros(self.hidden_size);
        for &x in inputs {
            h = self.step(g, x, h);
        }
        h
    }
}

/// Hidden and cell state of an [`LstmCell`].
#[derive(Debug, Clone, Copy)]
pub struct LstmState {
    pub h: NodeId,
    pub c: NodeId,
}

/// Long short-term memory cell with gate order input, forget, candidate, output.
///
/// `activation` drives the candidate and the cell output; the gates always
/// use the sigmoid.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LstmCell {
    w_x: ParamId,
    w_h: ParamId,
    bias: ParamId,
    hidden_size: usize,
    activation: Activation,
}

impl LstmCell {
    pub fn new<R: Rng>(
        params: &mut Parameters,
        rng: &mut R,
        name: &str,
        input_size: usize,
        hidden_size: usize,
        activation: Activation,
    ) -> Self {
        let w_x = params.glorot(&format!("{name}.kernel"), 4 * hidden_size, input_size, rng);
        let w_h = params.glorot(
            &format!("{name}.recurrent"),
            4 * hidden_size,
            hidden_size,
            rng,
        );
        let bias = Array2::from_shape_fn((4 * hidden_size, 1), |(r, _)| {
            if (hidden_size..2 * hidden_size).contains(&r) {
                1.0
            } else {
                0.0
            }
        });
        let bias = params.add(&format!("{name}.bias"), bias);

        Self {
            w_x,
            w_h,
            bias,
            hidden_size,
            activation,
        }
    }

    pub fn hidden_size(&self) -> usize {
        self.hidden_size
    }

    pub fn zero_state(&self, g: &mut Graph<'_>) -> LstmState {
        LstmState {
            h: g.zeros(self.hidden_size),
            c: g.zeros(self.hidden_size),
        }
    }

    pub fn step(&self, g: &mut Graph<'_>, x: NodeId, state: LstmState) -> LstmState {
        let n = self.hidden_size;
        let wx = g.matvec(self.w_x, x);
        let wh = g.matvec(self.w_h, state.h);
        let b = g.param(self.bias);
        let z = g.add(wx, wh);
        let z = g.add(z, b);

        let i = g.slice(z, 0, n);
        let f = g.slice(z, n, n);
        let cand = g.slice(z, 2 * n, n);
        let o = g.slice(z, 3 * n, n);

        let i = g.activate(i, Activation::Sigmoid);
        let f = g.activate(f, Activation::Sigmoid);
        let cand = g.activate(cand, self.activation);
        let o = g.activate(o, Activation::Sigmoid);

        let keep = g.mul(f, state.c);
        let write = g.mul(i, cand);
        let c = g.add(keep, write);
        let c_act = g.activate(c, self.activation);
        let h = g.mul(o, c_act);

        LstmState { h, c }
    }

    /// Run over `inputs` from `initial` and return every hidden state plus the
    /// final state.
    pub fn run(
        &self,
        g: &mut Graph<'_>,
        inputs: &[NodeId],
        initial: LstmState,
    ) -> (Vec<NodeId>, LstmState) {
        let mut state = initial;
        let mut hidden = Vec::with_capacity(inputs.len());
        for &x in inputs {
            state = self.step(g, x, state);
            hidden.push(state.h);
        }
        (hidden, state)
    }
}
