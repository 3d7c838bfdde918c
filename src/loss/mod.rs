pub mod cross_entropy;
pub mod loss_type;
pub mod mse;

pub use cross_entropy::CrossEntropyLoss;
pub use loss_type::LossType;
pub use mse::MseLoss;

use crate::error::{FitError, Result};
use crate::math::matrix::Matrix;

/// A loss over a batch of model outputs and integer class labels.
///
/// Both methods reduce by the mean over the batch, so `loss * batch_size`
/// recovers the summed per-sample loss.
pub trait Criterion {
    fn loss(&self, outputs: &Matrix, labels: &[usize]) -> Result<f64>;

    /// Mean loss together with ∂loss/∂outputs.
    fn loss_and_grad(&self, outputs: &Matrix, labels: &[usize]) -> Result<(f64, Matrix)>;
}

impl<C: Criterion + ?Sized> Criterion for Box<C> {
    fn loss(&self, outputs: &Matrix, labels: &[usize]) -> Result<f64> {
        (**self).loss(outputs, labels)
    }

    fn loss_and_grad(&self, outputs: &Matrix, labels: &[usize]) -> Result<(f64, Matrix)> {
        (**self).loss_and_grad(outputs, labels)
    }
}

fn check_labels(outputs: &Matrix, labels: &[usize]) -> Result<()> {
    if outputs.rows != labels.len() {
        return Err(FitError::ShapeMismatch {
            context: "criterion labels",
            expected: format!("{} labels", outputs.rows),
            got: format!("{} labels", labels.len()),
        });
    }
    if let Some(&label) = labels.iter().find(|&&l| l >= outputs.cols) {
        return Err(FitError::LabelOutOfRange { label, classes: outputs.cols });
    }
    Ok(())
}
