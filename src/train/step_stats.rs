use serde::{Serialize, Deserialize};

/// Periodic training statistics emitted by `train_loop`.
///
/// When a `progress_tx` channel is configured in `TrainHooks`, the training
/// loop sends one `StepStats` every `log_every` steps. Receivers use it to
/// follow the loss curve while training runs on another thread.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepStats {
    /// 1-based epoch number.
    pub epoch: usize,
    /// Step index within the epoch.
    pub step: usize,
    /// Mean window loss over the steps since the previous report.
    pub average_loss: f64,
    /// Number of windows the average covers.
    pub window_count: usize,
    /// Wall-clock time since the start of the epoch in milliseconds.
    pub elapsed_ms: u64,
}
