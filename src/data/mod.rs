pub mod generator;
pub mod batcher;

pub use generator::{generate, label_probability, expected_cross_entropy, ReferenceEntropies, SequenceData};
pub use batcher::{gen_batch, gen_epochs, Batch, BatchIter, Partition};
