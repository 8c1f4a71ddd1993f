use crate::math::matrix::Matrix;
use crate::optim::Optimizer;

pub struct Sgd {
    pub learning_rate: f64,
}

impl Sgd {
    pub fn new(learning_rate: f64) -> Sgd {
        Sgd { learning_rate }
    }
}

impl Optimizer for Sgd {
    /// Plain gradient descent: `θ ← θ − lr·g`.
    fn step(&mut self, params: &mut [&mut Matrix], grads: &[&Matrix]) {
        assert_eq!(params.len(), grads.len(), "one gradient per parameter");
        for (param, grad) in params.iter_mut().zip(grads.iter()) {
            let updated = (**param).clone() - grad.scale(self.learning_rate);
            **param = updated;
        }
    }

    fn learning_rate(&self) -> f64 {
        self.learning_rate
    }
}
