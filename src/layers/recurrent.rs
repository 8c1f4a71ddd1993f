use rand::Rng;
use serde::{Serialize, Deserialize};

use crate::{activation::activation::ActivationFunction, math::matrix::Matrix};

/// A single fixed-size recurrent cell.
///
/// Computes `s_t = act([x_t, s_{t-1}] · W + b)` where `W` has shape
/// `(input_size + state_size, state_size)` and `b` is a `(1, state_size)` row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RnnCell {
    pub input_size: usize,
    pub state_size: usize,
    pub weights: Matrix,
    pub biases: Matrix,
    pub activator: ActivationFunction,
}

/// What one `step` has to remember for the backward pass.
#[derive(Debug, Clone)]
pub struct StepCache {
    /// `[x_t, s_{t-1}]`, shape `(batch, input_size + state_size)`.
    concat: Matrix,
    /// `z_t = concat · W + b`, needed for `act'(z_t)`.
    pre_activation: Matrix,
}

/// Gradients of one window with respect to the cell.
#[derive(Debug, Clone)]
pub struct CellGradients {
    pub weights: Matrix,
    pub biases: Matrix,
    /// Gradient reaching the window's initial state. Truncated backprop drops it.
    pub initial_state: Matrix,
}

impl RnnCell {
    /// Uniform `U(-k, k)` initialization with `k = sqrt(1 / state_size)`.
    pub fn new<R: Rng + ?Sized>(
        input_size: usize,
        state_size: usize,
        activation: ActivationFunction,
        rng: &mut R,
    ) -> RnnCell {
        let k = (1.0 / state_size as f64).sqrt();
        RnnCell {
            input_size,
            state_size,
            weights: Matrix::uniform(input_size + state_size, state_size, k, rng),
            biases: Matrix::uniform(1, state_size, k, rng),
            activator: activation,
        }
    }

    pub fn zero_state(&self, batch_size: usize) -> Matrix {
        Matrix::zeros(batch_size, self.state_size)
    }

    /// Advances every row of the batch by one time step.
    pub fn step(&self, input: &Matrix, state: &Matrix) -> (Matrix, StepCache) {
        assert_eq!(input.cols, self.input_size, "cell input has wrong width");
        assert_eq!(state.cols, self.state_size, "cell state has wrong width");

        let concat = input.hstack(state);
        let z = (&concat * &self.weights).add_row_broadcast(&self.biases);
        let next_state = z.map(|x| self.activator.function(x));

        (next_state, StepCache { concat, pre_activation: z })
    }

    /// Backpropagation through time over one window.
    ///
    /// `state_grads[t]` is ∂L/∂s_t coming from the readout at step `t`; the
    /// recurrent contribution from step `t + 1` is added here.
    pub fn backward(&self, state_grads: &[Matrix], caches: &[StepCache]) -> CellGradients {
        assert_eq!(state_grads.len(), caches.len(), "one state gradient per cached step");

        let batch = caches.first().map_or(0, |c| c.concat.rows);
        let mut w_grad = Matrix::zeros(self.weights.rows, self.weights.cols);
        let mut b_grad = Matrix::zeros(1, self.state_size);
        let mut carried = Matrix::zeros(batch, self.state_size);
        let weights_t = self.weights.transpose();

        for (ds, cache) in state_grads.iter().zip(caches.iter()).rev() {
            let total = ds.clone() + carried;
            let act_derivative = cache.pre_activation.map(|x| self.activator.derivative(x));
            let dz = total.hadamard(&act_derivative);

            w_grad = w_grad + &cache.concat.transpose() * &dz;
            b_grad = b_grad + dz.sum_rows();

            let d_concat = &dz * &weights_t;
            carried = d_concat.split_cols(self.input_size).1;
        }

        CellGradients { weights: w_grad, biases: b_grad, initial_state: carried }
    }
}
