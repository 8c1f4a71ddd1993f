use std::sync::atomic::Ordering;
use std::time::Instant;

use rand::Rng;
use tracing::{debug, info};

use crate::data::batcher::{gen_batch, gen_epochs, Batch, BatchIter};
use crate::data::generator::SequenceData;
use crate::error::{Error, Result};
use crate::math::matrix::Matrix;
use crate::network::model::SequenceModel;
use crate::optim::Optimizer;
use crate::train::step_stats::StepStats;
use crate::train::train_config::{TrainConfig, TrainHooks};

/// Outcome of a `train_loop` run.
#[derive(Debug, Clone, Default)]
pub struct TrainReport {
    /// Average window loss at every report, in order.
    pub losses: Vec<f64>,
    /// Mean window loss of each completed epoch.
    pub epoch_losses: Vec<f64>,
    /// Total optimizer steps taken.
    pub steps: usize,
    /// True when a stop flag or a dropped receiver ended the run early.
    pub stopped_early: bool,
}

impl TrainReport {
    /// Mean loss of the last epoch that finished.
    pub fn final_loss(&self) -> Option<f64> {
        self.epoch_losses.last().copied()
    }
}

// ---------------------------------------------------------------------------
// Public entry point
// ---------------------------------------------------------------------------

/// Trains `model` with truncated backpropagation over `config.num_epochs`
/// freshly generated sequences.
///
/// The hidden state starts at zero at every epoch and is carried from one
/// window to the next; gradients never cross a window boundary.
///
/// # Early termination
/// The loop breaks early if the `progress_tx` receiver has been dropped, or
/// `hooks.stop_flag` is set to `true`.
pub fn train_loop<R: Rng + ?Sized>(
    model: &mut SequenceModel,
    optimizer: &mut dyn Optimizer,
    config: &TrainConfig,
    hooks: &TrainHooks,
    rng: &mut R,
) -> Result<TrainReport> {
    config.validate()?;
    if model.config.state_size != config.state_size {
        return Err(Error::invalid(format!(
            "model state_size {} does not match config state_size {}",
            model.config.state_size, config.state_size
        )));
    }
    debug!(?config, "starting training");

    let mut report = TrainReport::default();
    let epochs = gen_epochs(config.num_epochs, config.data_size, config.batch_size, config.num_steps, rng)?;

    'epochs: for (idx, epoch) in epochs.enumerate() {
        let epoch_num = idx + 1;
        let t_start = Instant::now();
        info!(
            epoch = epoch_num,
            windows = epoch.len(),
            elements = BatchIter::partition(&epoch).elements_per_epoch(),
            "epoch start"
        );

        let mut state = model.zero_state(config.batch_size);
        let mut running_loss = 0.0;
        let mut running_count = 0usize;
        let mut epoch_loss = 0.0;
        let mut epoch_count = 0usize;

        for (step, batch) in epoch.enumerate() {
            if stop_requested(hooks) {
                report.stopped_early = true;
                break 'epochs;
            }

            let (loss, next_state) = train_step(model, optimizer, &batch, &state)?;
            state = next_state;
            report.steps += 1;

            running_loss += loss;
            running_count += 1;
            epoch_loss += loss;
            epoch_count += 1;

            if step > 0 && step % config.log_every == 0 {
                let average_loss = running_loss / running_count as f64;
                info!(
                    "Average loss at step {} for last {} steps: {:.6}",
                    step, running_count, average_loss
                );
                report.losses.push(average_loss);

                let stats = StepStats {
                    epoch: epoch_num,
                    step,
                    average_loss,
                    window_count: running_count,
                    elapsed_ms: t_start.elapsed().as_millis() as u64,
                };
                running_loss = 0.0;
                running_count = 0;

                if let Some(ref tx) = hooks.progress_tx {
                    // If the receiver has been dropped, stop training.
                    if tx.send(stats).is_err() {
                        report.stopped_early = true;
                        break 'epochs;
                    }
                }
            }
        }

        let mean = epoch_loss / epoch_count.max(1) as f64;
        report.epoch_losses.push(mean);
        info!(
            epoch = epoch_num,
            mean_loss = mean,
            elapsed_ms = t_start.elapsed().as_millis() as u64,
            "epoch done"
        );
    }

    Ok(report)
}

/// Runs one window: forward from `state`, backward within the window, one
/// optimizer update. Returns the window loss and the state to carry forward.
pub fn train_step(
    model: &mut SequenceModel,
    optimizer: &mut dyn Optimizer,
    batch: &Batch,
    state: &Matrix,
) -> Result<(f64, Matrix)> {
    let pass = model.forward(&batch.x, state)?;
    let loss = model.loss(&pass, &batch.y)?;
    let grads = model.backward(&pass, &batch.y)?;

    // `grads.initial_state` is dropped here: the window boundary truncates backprop.
    let mut params = model.parameters_mut();
    optimizer.step(&mut params, &grads.as_array());

    Ok((loss, pass.final_state))
}

/// Mean cross-entropy of `model` over `data`, carrying state across windows
/// exactly as training does. No parameters change.
pub fn evaluate(
    model: &SequenceModel,
    data: &SequenceData,
    batch_size: usize,
    num_steps: usize,
) -> Result<f64> {
    let batches = gen_batch(data, batch_size, num_steps)?;
    let mut state = model.zero_state(batch_size);
    let mut total = 0.0;
    let mut count = 0usize;

    for batch in batches {
        let pass = model.forward(&batch.x, &state)?;
        total += model.loss(&pass, &batch.y)?;
        count += 1;
        state = pass.final_state;
    }

    Ok(total / count.max(1) as f64)
}

fn stop_requested(hooks: &TrainHooks) -> bool {
    hooks
        .stop_flag
        .as_ref()
        .is_some_and(|flag| flag.load(Ordering::Relaxed))
}
