use std::sync::mpsc;
use std::sync::{Arc, atomic::AtomicBool};

use rand::{rngs::StdRng, SeedableRng};
use serde::{Serialize, Deserialize};

use crate::error::{Error, Result};
use crate::optim::OptimizerKind;
use crate::train::step_stats::StepStats;

/// Hyperparameters for a `train_loop` run.
///
/// Every field has a default, so a JSON file only needs the values it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainConfig {
    /// Number of epochs; each one draws a fresh sequence.
    pub num_epochs: usize,
    /// Length of the generated sequence per epoch.
    pub data_size: usize,
    /// Number of parallel rows the sequence is split into.
    pub batch_size: usize,
    /// Truncated-backprop window length.
    pub num_steps: usize,
    /// Width of the recurrent state.
    pub state_size: usize,
    pub learning_rate: f64,
    pub optimizer: OptimizerKind,
    /// Steps between loss reports.
    pub log_every: usize,
    /// Seed for data generation and initialization; `None` seeds from entropy.
    pub seed: Option<u64>,
}

impl Default for TrainConfig {
    fn default() -> Self {
        TrainConfig {
            num_epochs: 1,
            data_size: 1_000_000,
            batch_size: 200,
            num_steps: 5,
            state_size: 4,
            learning_rate: 0.1,
            optimizer: OptimizerKind::Adagrad,
            log_every: 100,
            seed: None,
        }
    }
}

impl TrainConfig {
    /// Rejects settings that cannot produce a single training step.
    pub fn validate(&self) -> Result<()> {
        if self.num_epochs == 0 {
            return Err(Error::invalid("num_epochs must be at least 1"));
        }
        if self.batch_size == 0 || self.num_steps == 0 || self.state_size == 0 {
            return Err(Error::invalid("batch_size, num_steps and state_size must be at least 1"));
        }
        if self.log_every == 0 {
            return Err(Error::invalid("log_every must be at least 1"));
        }
        if !(self.learning_rate > 0.0 && self.learning_rate.is_finite()) {
            return Err(Error::invalid(format!(
                "learning_rate must be positive and finite, got {}",
                self.learning_rate
            )));
        }
        let too_short = self
            .batch_size
            .checked_mul(self.num_steps)
            .map_or(true, |window| self.data_size < window);
        if too_short {
            return Err(Error::invalid(format!(
                "data_size {} is smaller than one window ({} x {})",
                self.data_size, self.batch_size, self.num_steps
            )));
        }
        Ok(())
    }

    pub fn rng(&self) -> StdRng {
        match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        }
    }

    /// Serializes the config to a pretty-printed JSON file.
    pub fn save_json(&self, path: &str) -> Result<()> {
        let file = std::fs::File::create(path)?;
        let writer = std::io::BufWriter::new(file);
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }

    /// Deserializes a `TrainConfig` from a JSON file; missing fields take defaults.
    pub fn load_json(path: &str) -> Result<TrainConfig> {
        let file = std::fs::File::open(path)?;
        let reader = std::io::BufReader::new(file);
        Ok(serde_json::from_reader(reader)?)
    }
}

/// Optional side channels for a training run.
///
/// - `progress_tx` — one `StepStats` is sent per report. If the receiver is
///                   dropped the loop terminates early.
/// - `stop_flag`   — when set to `true` from another thread the loop stops
///                   before the next window.
#[derive(Default)]
pub struct TrainHooks {
    pub progress_tx: Option<mpsc::Sender<StepStats>>,
    pub stop_flag: Option<Arc<AtomicBool>>,
}
