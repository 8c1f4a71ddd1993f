pub mod error;
pub mod math;
pub mod activation;
pub mod data;
pub mod layers;
pub mod network;
pub mod loss;
pub mod optim;
pub mod train;

// Convenience re-exports
pub use error::{Error, Result};
pub use math::matrix::Matrix;
pub use activation::activation::ActivationFunction;
pub use data::{generate, gen_batch, gen_epochs, expected_cross_entropy, Batch, SequenceData};
pub use layers::{readout::Readout, recurrent::RnnCell};
pub use network::model::{ModelConfig, SequenceModel};
pub use loss::cross_entropy::CrossEntropyLoss;
pub use optim::{Adagrad, Optimizer, OptimizerKind, Sgd};
pub use train::{evaluate, train_loop, StepStats, TrainConfig, TrainHooks, TrainReport};
