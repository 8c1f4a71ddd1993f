pub mod sgd;
pub mod adagrad;

use serde::{Serialize, Deserialize};

use crate::math::matrix::Matrix;

pub use sgd::Sgd;
pub use adagrad::Adagrad;

/// An update rule applied to a fixed, ordered list of parameters.
pub trait Optimizer {
    /// `params[i]` is updated with `grads[i]`; the order must be stable across calls.
    fn step(&mut self, params: &mut [&mut Matrix], grads: &[&Matrix]);

    fn learning_rate(&self) -> f64;
}

/// Selects the update rule from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OptimizerKind {
    Sgd,
    #[default]
    Adagrad,
}

impl OptimizerKind {
    pub fn build(self, learning_rate: f64) -> Box<dyn Optimizer> {
        match self {
            OptimizerKind::Sgd => Box::new(Sgd::new(learning_rate)),
            OptimizerKind::Adagrad => Box::new(Adagrad::new(learning_rate)),
        }
    }
}

impl std::str::FromStr for OptimizerKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sgd" => Ok(OptimizerKind::Sgd),
            "adagrad" => Ok(OptimizerKind::Adagrad),
            other => Err(format!("unknown optimizer '{other}' (expected sgd or adagrad)")),
        }
    }
}
