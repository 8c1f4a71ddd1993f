use rand::Rng;
use serde::{Serialize, Deserialize};

use crate::math::matrix::Matrix;

/// Fully connected softmax layer mapping hidden states to class probabilities.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Readout {
    pub weights: Matrix,
    pub biases: Matrix,
}

impl Readout {
    pub fn new<R: Rng + ?Sized>(input_size: usize, num_classes: usize, rng: &mut R) -> Readout {
        let k = (1.0 / input_size as f64).sqrt();
        Readout {
            weights: Matrix::uniform(input_size, num_classes, k, rng),
            biases: Matrix::zeros(1, num_classes),
        }
    }

    pub fn num_classes(&self) -> usize {
        self.weights.cols
    }

    pub fn logits(&self, states: &Matrix) -> Matrix {
        (states * &self.weights).add_row_broadcast(&self.biases)
    }

    /// Row-wise softmax of the logits.
    pub fn feed_from(&self, states: &Matrix) -> Matrix {
        softmax_rows(&self.logits(states))
    }

    /// Returns (weights_grad, biases_grad, states_grad).
    /// `logits_grad` is ∂L/∂z for this layer, i.e. already through the softmax.
    pub fn compute_gradients(&self, logits_grad: &Matrix, states: &Matrix) -> (Matrix, Matrix, Matrix) {
        let weights_grad = &states.transpose() * logits_grad;
        let biases_grad = logits_grad.sum_rows();
        let states_grad = logits_grad * &self.weights.transpose();
        (weights_grad, biases_grad, states_grad)
    }
}

/// Numerically stable softmax over each row.
pub fn softmax_rows(logits: &Matrix) -> Matrix {
    let data = logits.data.iter()
        .map(|row| {
            let max = row.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
            let exps: Vec<f64> = row.iter().map(|x| (x - max).exp()).collect();
            let sum: f64 = exps.iter().sum();
            exps.into_iter().map(|e| e / sum).collect()
        })
        .collect();
    Matrix::from_data(data)
}
