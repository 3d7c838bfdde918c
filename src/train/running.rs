use crate::error::{FitError, Result};

/// Per-phase accumulators, reset every epoch.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RunningTotals {
    pub loss_sum: f64,
    pub correct: usize,
    pub total: usize,
}

impl RunningTotals {
    /// Folds in one batch. `batch_loss` is the batch mean, so it is weighted
    /// by `batch_size` to keep the epoch average per-sample.
    pub fn update(&mut self, batch_loss: f64, batch_correct: usize, batch_size: usize) {
        self.loss_sum += batch_loss * batch_size as f64;
        self.correct += batch_correct;
        self.total += batch_size;
    }

    /// `(mean loss, accuracy)`; fails for a phase that saw no samples.
    pub fn finish(&self, phase: &'static str) -> Result<(f64, f64)> {
        if self.total == 0 {
            return Err(FitError::EmptySource { phase });
        }
        let n = self.total as f64;
        Ok((self.loss_sum / n, self.correct as f64 / n))
    }
}

/// Rows whose predicted class equals the label.
pub fn count_correct(predictions: &[usize], labels: &[usize]) -> usize {
    predictions.iter().zip(labels).filter(|(p, l)| p == l).count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn means_are_weighted_by_batch_size() {
        let mut totals = RunningTotals::default();
        totals.update(1.0, 3, 4);
        totals.update(4.0, 0, 1);
        let (loss, acc) = totals.finish("train").unwrap();
        // (1.0·4 + 4.0·1) / 5, not the unweighted (1 + 4) / 2
        assert!((loss - 1.6).abs() < 1e-12);
        assert!((acc - 0.6).abs() < 1e-12);
    }

    #[test]
    fn empty_phase_is_an_error() {
        let err = RunningTotals::default().finish("validation").unwrap_err();
        assert!(matches!(err, FitError::EmptySource { phase: "validation" }));
    }

    #[test]
    fn counts_matching_predictions() {
        assert_eq!(count_correct(&[0, 2, 1, 1], &[0, 1, 1, 3]), 2);
    }
}
