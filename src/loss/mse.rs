use crate::error::Result;
use crate::loss::{check_labels, Criterion};
use crate::math::matrix::Matrix;

/// Mean-squared error between outputs and one-hot targets.
///
/// Averaged over both batch and class dimensions, so the gradient is
/// `2 (p - y) / (n · k)`.
#[derive(Debug, Clone, Copy, Default)]
pub struct MseLoss;

impl MseLoss {
    pub fn new() -> Self {
        MseLoss
    }
}

fn residual(outputs: &Matrix, labels: &[usize]) -> Matrix {
    let mut diff = outputs.clone();
    for (r, &label) in labels.iter().enumerate() {
        diff.set(r, label, diff.get(r, label) - 1.0);
    }
    diff
}

impl Criterion for MseLoss {
    fn loss(&self, outputs: &Matrix, labels: &[usize]) -> Result<f64> {
        check_labels(outputs, labels)?;
        let count = (outputs.rows * outputs.cols).max(1) as f64;
        let diff = residual(outputs, labels);
        Ok(diff.as_slice().iter().map(|d| d * d).sum::<f64>() / count)
    }

    fn loss_and_grad(&self, outputs: &Matrix, labels: &[usize]) -> Result<(f64, Matrix)> {
        check_labels(outputs, labels)?;
        let count = (outputs.rows * outputs.cols).max(1) as f64;
        let diff = residual(outputs, labels);
        let loss = diff.as_slice().iter().map(|d| d * d).sum::<f64>() / count;
        Ok((loss, diff.map(|d| 2.0 * d / count)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn perfect_one_hot_has_zero_loss() {
        let out = Matrix::from_rows(&[vec![0.0, 1.0], vec![1.0, 0.0]]);
        let (loss, grad) = MseLoss.loss_and_grad(&out, &[1, 0]).unwrap();
        assert_eq!(loss, 0.0);
        assert!(grad.as_slice().iter().all(|&g| g == 0.0));
    }

    #[test]
    fn averages_over_every_element() {
        let out = Matrix::zeros(1, 4);
        // one target entry is off by 1 out of four elements
        assert!((MseLoss.loss(&out, &[2]).unwrap() - 0.25).abs() < 1e-12);
    }
}
