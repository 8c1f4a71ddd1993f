use crate::math::matrix::Matrix;
use crate::optim::Optimizer;

/// Starting value of every squared-gradient accumulator.
pub const INITIAL_ACCUMULATOR: f64 = 0.1;

/// Adagrad: per-coordinate step sizes that shrink with the gradient history.
///
/// `acc += g²; θ ← θ − lr·g / sqrt(acc)`
pub struct Adagrad {
    pub learning_rate: f64,
    pub initial_accumulator: f64,
    accumulators: Vec<Matrix>,
}

impl Adagrad {
    pub fn new(learning_rate: f64) -> Adagrad {
        Adagrad {
            learning_rate,
            initial_accumulator: INITIAL_ACCUMULATOR,
            accumulators: Vec::new(),
        }
    }

    /// Squared-gradient history, one matrix per parameter slot.
    pub fn accumulators(&self) -> &[Matrix] {
        &self.accumulators
    }
}

impl Optimizer for Adagrad {
    fn step(&mut self, params: &mut [&mut Matrix], grads: &[&Matrix]) {
        assert_eq!(params.len(), grads.len(), "one gradient per parameter");

        // Slots are created on first use, shaped like the parameter they track.
        while self.accumulators.len() < params.len() {
            let p = &params[self.accumulators.len()];
            let init = self.initial_accumulator;
            self.accumulators.push(Matrix::zeros(p.rows, p.cols).map(|_| init));
        }

        for ((param, grad), acc) in params.iter_mut().zip(grads.iter()).zip(self.accumulators.iter_mut()) {
            assert_eq!(param.shape(), grad.shape(), "gradient shape differs from parameter");
            for i in 0..param.rows {
                for j in 0..param.cols {
                    let g = grad.data[i][j];
                    acc.data[i][j] += g * g;
                    param.data[i][j] -= self.learning_rate * g / acc.data[i][j].sqrt();
                }
            }
        }
    }

    fn learning_rate(&self) -> f64 {
        self.learning_rate
    }
}
