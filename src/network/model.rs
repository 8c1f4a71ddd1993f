use rand::Rng;
use serde::{Serialize, Deserialize};

use crate::activation::activation::ActivationFunction;
use crate::error::{Error, Result};
use crate::layers::{readout::Readout, recurrent::{RnnCell, StepCache}};
use crate::loss::cross_entropy::CrossEntropyLoss;
use crate::math::matrix::Matrix;

/// Architecture of a `SequenceModel`; stored alongside the weights.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    pub state_size: usize,
    pub num_classes: usize,
    #[serde(default)]
    pub activation: ActivationFunction,
}

impl Default for ModelConfig {
    fn default() -> Self {
        ModelConfig { state_size: 4, num_classes: 2, activation: ActivationFunction::Tanh }
    }
}

/// Recurrent cell over one-hot inputs followed by a softmax readout at every step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SequenceModel {
    pub config: ModelConfig,
    pub cell: RnnCell,
    pub readout: Readout,
}

/// Everything the forward pass over one window produced.
#[derive(Debug, Clone)]
pub struct ForwardPass {
    /// Class probabilities per step, each `(batch, num_classes)`.
    pub predictions: Vec<Matrix>,
    /// Hidden state after each step, each `(batch, state_size)`.
    pub states: Vec<Matrix>,
    pub final_state: Matrix,
    caches: Vec<StepCache>,
}

/// Parameter gradients, in the same order as `SequenceModel::parameters_mut`.
#[derive(Debug, Clone)]
pub struct Gradients {
    pub cell_weights: Matrix,
    pub cell_biases: Matrix,
    pub readout_weights: Matrix,
    pub readout_biases: Matrix,
    /// ∂L/∂(initial state) of the window. Not a parameter; truncated
    /// training drops it instead of passing it to the previous window.
    pub initial_state: Matrix,
}

impl Gradients {
    /// Parameter gradients only; `initial_state` is left out.
    pub fn as_array(&self) -> [&Matrix; 4] {
        [&self.cell_weights, &self.cell_biases, &self.readout_weights, &self.readout_biases]
    }
}

/// One-hot encodes a column of class indices into a `(len, num_classes)` matrix.
pub fn one_hot(classes: &[u8], num_classes: usize) -> Matrix {
    let mut res = Matrix::zeros(classes.len(), num_classes);
    for (row, &c) in res.data.iter_mut().zip(classes.iter()) {
        row[c as usize] = 1.0;
    }
    res
}

/// Extracts step `t` of every row of a `[batch][num_steps]` window.
pub fn column(rows: &[Vec<u8>], t: usize) -> Vec<u8> {
    rows.iter().map(|r| r[t]).collect()
}

fn check_window(rows: &[Vec<u8>], num_classes: usize) -> Result<usize> {
    let num_steps = rows.first().map_or(0, |r| r.len());
    if let Some(bad) = rows.iter().find(|r| r.len() != num_steps) {
        return Err(Error::ShapeMismatch {
            expected: (rows.len(), num_steps),
            got: (rows.len(), bad.len()),
        });
    }
    if rows.iter().flatten().any(|&c| c as usize >= num_classes) {
        return Err(Error::invalid(format!("window holds a class outside 0..{num_classes}")));
    }
    Ok(num_steps)
}

impl SequenceModel {
    pub fn new<R: Rng + ?Sized>(config: ModelConfig, rng: &mut R) -> SequenceModel {
        let cell = RnnCell::new(config.num_classes, config.state_size, config.activation, rng);
        let readout = Readout::new(config.state_size, config.num_classes, rng);
        SequenceModel { config, cell, readout }
    }

    pub fn zero_state(&self, batch_size: usize) -> Matrix {
        self.cell.zero_state(batch_size)
    }

    /// Unrolls the cell over a `[batch][num_steps]` window starting from `init_state`.
    pub fn forward(&self, x: &[Vec<u8>], init_state: &Matrix) -> Result<ForwardPass> {
        let num_steps = check_window(x, self.config.num_classes)?;
        if init_state.shape() != (x.len(), self.config.state_size) {
            return Err(Error::ShapeMismatch {
                expected: (x.len(), self.config.state_size),
                got: init_state.shape(),
            });
        }

        let mut state = init_state.clone();
        let mut predictions = Vec::with_capacity(num_steps);
        let mut states = Vec::with_capacity(num_steps);
        let mut caches = Vec::with_capacity(num_steps);

        for t in 0..num_steps {
            let input = one_hot(&column(x, t), self.config.num_classes);
            let (next, cache) = self.cell.step(&input, &state);
            predictions.push(self.readout.feed_from(&next));
            states.push(next.clone());
            caches.push(cache);
            state = next;
        }

        Ok(ForwardPass { predictions, states, final_state: state, caches })
    }

    /// Mean cross-entropy of a forward pass against the window's labels.
    pub fn loss(&self, pass: &ForwardPass, y: &[Vec<u8>]) -> Result<f64> {
        let num_steps = check_window(y, self.config.num_classes)?;
        if num_steps != pass.predictions.len() || y.len() != pass.final_state.rows {
            return Err(Error::ShapeMismatch {
                expected: (pass.final_state.rows, pass.predictions.len()),
                got: (y.len(), num_steps),
            });
        }
        let labels: Vec<Vec<u8>> = (0..num_steps).map(|t| column(y, t)).collect();
        Ok(CrossEntropyLoss::loss(&pass.predictions, &labels))
    }

    /// Gradients of the mean loss over the window. Nothing flows past its first step.
    pub fn backward(&self, pass: &ForwardPass, y: &[Vec<u8>]) -> Result<Gradients> {
        let num_steps = check_window(y, self.config.num_classes)?;
        if num_steps != pass.predictions.len() || y.len() != pass.final_state.rows {
            return Err(Error::ShapeMismatch {
                expected: (pass.final_state.rows, pass.predictions.len()),
                got: (y.len(), num_steps),
            });
        }

        let normalizer = (y.len() * num_steps) as f64;
        let mut readout_weights = Matrix::zeros(self.readout.weights.rows, self.readout.weights.cols);
        let mut readout_biases = Matrix::zeros(1, self.readout.num_classes());
        let mut state_grads = Vec::with_capacity(num_steps);

        for t in 0..num_steps {
            let dlogits = CrossEntropyLoss::derivative(&pass.predictions[t], &column(y, t), normalizer);
            let (w_grad, b_grad, s_grad) = self.readout.compute_gradients(&dlogits, &pass.states[t]);
            readout_weights = readout_weights + w_grad;
            readout_biases = readout_biases + b_grad;
            state_grads.push(s_grad);
        }

        let cell = self.cell.backward(&state_grads, &pass.caches);

        Ok(Gradients {
            cell_weights: cell.weights,
            cell_biases: cell.biases,
            readout_weights,
            readout_biases,
            initial_state: cell.initial_state,
        })
    }

    /// Trainable parameters, in the same order as `Gradients::as_array`.
    pub fn parameters_mut(&mut self) -> [&mut Matrix; 4] {
        [
            &mut self.cell.weights,
            &mut self.cell.biases,
            &mut self.readout.weights,
            &mut self.readout.biases,
        ]
    }

    /// Serializes the model weights to a pretty-printed JSON file.
    pub fn save_json(&self, path: &str) -> Result<()> {
        let file = std::fs::File::create(path)?;
        let writer = std::io::BufWriter::new(file);
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }

    /// Deserializes a model from a JSON file previously written by `save_json`.
    pub fn load_json(path: &str) -> Result<SequenceModel> {
        let file = std::fs::File::open(path)?;
        let reader = std::io::BufReader::new(file);
        Ok(serde_json::from_reader(reader)?)
    }
}
