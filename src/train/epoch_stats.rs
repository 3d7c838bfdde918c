use serde::{Deserialize, Serialize};

/// Per-epoch results emitted by `train`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpochStats {
    /// 1-based epoch number.
    pub epoch: usize,
    /// Configured upper bound on epochs for this run.
    pub total_epochs: usize,
    /// Sample-weighted mean training loss.
    pub train_loss: f64,
    /// Training accuracy as a fraction in [0, 1].
    pub train_accuracy: f64,
    pub val_loss: f64,
    pub val_accuracy: f64,
    /// Learning rate after the scheduler stepped at the end of this epoch.
    pub learning_rate: f64,
    /// Whether this epoch set a new best validation loss (and was saved).
    pub improved: bool,
    /// Wall-clock duration of the epoch in milliseconds.
    pub elapsed_ms: u64,
}

impl EpochStats {
    /// The console line printed after each epoch.
    pub fn summary_line(&self) -> String {
        format!(
            "Epoch {:02} | Train Loss: {:.4} | Train Acc: {:.4} || Val Loss: {:.4} | Val Acc: {:.4}",
            self.epoch, self.train_loss, self.train_accuracy, self.val_loss, self.val_accuracy
        )
    }
}

/// Outcome of a whole run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainSummary {
    pub epochs_run: usize,
    /// Lowest validation loss seen; `+inf` if no epoch completed.
    pub best_val_loss: f64,
    /// 1-based epoch that produced `best_val_loss`, if any.
    pub best_epoch: Option<usize>,
    pub stopped_early: bool,
    pub history: Vec<EpochStats>,
}
