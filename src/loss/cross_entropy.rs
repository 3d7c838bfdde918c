use crate::error::Result;
use crate::loss::{check_labels, Criterion};
use crate::math::matrix::Matrix;

/// Categorical cross-entropy computed from raw logits.
///
/// Softmax is folded in: per row, `L = logsumexp(z) - z[label]`, and the
/// gradient w.r.t. the logits simplifies to `softmax(z) - onehot(label)`.
/// Both are averaged over the batch.
#[derive(Debug, Clone, Copy, Default)]
pub struct CrossEntropyLoss;

/// Numerically stable log-softmax of one row.
fn log_softmax(row: &[f64]) -> Vec<f64> {
    let max = row.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let log_sum = row.iter().map(|&z| (z - max).exp()).sum::<f64>().ln() + max;
    row.iter().map(|&z| z - log_sum).collect()
}

impl CrossEntropyLoss {
    pub fn new() -> Self {
        CrossEntropyLoss
    }
}

impl Criterion for CrossEntropyLoss {
    fn loss(&self, outputs: &Matrix, labels: &[usize]) -> Result<f64> {
        check_labels(outputs, labels)?;
        if labels.is_empty() {
            return Ok(0.0);
        }
        let total: f64 = outputs
            .iter_rows()
            .zip(labels)
            .map(|(row, &label)| -log_softmax(row)[label])
            .sum();
        Ok(total / labels.len() as f64)
    }

    fn loss_and_grad(&self, outputs: &Matrix, labels: &[usize]) -> Result<(f64, Matrix)> {
        check_labels(outputs, labels)?;
        let n = labels.len().max(1) as f64;
        let mut grad = Matrix::zeros(outputs.rows, outputs.cols);
        let mut total = 0.0;
        for (r, (row, &label)) in outputs.iter_rows().zip(labels).enumerate() {
            let log_probs = log_softmax(row);
            total -= log_probs[label];
            for (c, lp) in log_probs.iter().enumerate() {
                let target = if c == label { 1.0 } else { 0.0 };
                grad.set(r, c, (lp.exp() - target) / n);
            }
        }
        Ok((total / n, grad))
    }
}
