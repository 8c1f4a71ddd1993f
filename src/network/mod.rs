pub mod model;

pub use model::{ModelConfig, SequenceModel, ForwardPass, Gradients};
