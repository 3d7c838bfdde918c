use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::device::Device;
use crate::error::{FitError, Result};
use crate::math::matrix::Matrix;

/// A trainable tensor and the gradient accumulated for it by the last
/// backward pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Parameter {
    pub value: Matrix,
    #[serde(skip)]
    pub grad: Matrix,
}

impl Parameter {
    pub fn new(value: Matrix) -> Parameter {
        let grad = Matrix::zeros(value.rows, value.cols);
        Parameter { value, grad }
    }

    pub fn zero_grad(&mut self) {
        if self.grad.shape() != self.value.shape() {
            self.grad = Matrix::zeros(self.value.rows, self.value.cols);
        } else {
            self.grad.fill(0.0);
        }
    }

    /// Adds `delta` into the stored gradient.
    pub fn accumulate(&mut self, delta: &Matrix) -> Result<()> {
        if delta.shape() != self.value.shape() {
            return Err(FitError::ShapeMismatch {
                context: "gradient accumulation",
                expected: format!("{:?}", self.value.shape()),
                got: format!("{:?}", delta.shape()),
            });
        }
        if self.grad.shape() != self.value.shape() {
            self.grad = delta.clone();
        } else {
            self.grad = &self.grad + delta;
        }
        Ok(())
    }
}

/// Named snapshot of every parameter value in a model.
pub type StateDict = BTreeMap<String, Matrix>;

/// Whether the model caches activations for backprop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Train,
    Eval,
}

/// The surface the training loop drives.
///
/// `forward` takes a `batch × features` matrix and returns
/// `batch × classes` outputs. In `Mode::Train` it caches what `backward` needs;
/// in `Mode::Eval` nothing is cached and `backward` fails.
pub trait Model {
    fn forward(&mut self, input: &Matrix) -> Result<Matrix>;

    /// Accumulates parameter gradients given ∂L/∂output.
    fn backward(&mut self, grad_output: &Matrix) -> Result<()>;

    fn set_mode(&mut self, mode: Mode);

    fn mode(&self) -> Mode;

    /// Parameters in a stable order; optimizers key their state on it.
    fn parameters_mut(&mut self) -> Vec<&mut Parameter>;

    fn state_dict(&self) -> StateDict;

    fn load_state_dict(&mut self, state: &StateDict) -> Result<()>;

    /// Places parameters on `device`.
    fn to_device(&mut self, device: Device) -> Result<()>;

    fn train(&mut self) {
        self.set_mode(Mode::Train);
    }

    fn eval(&mut self) {
        self.set_mode(Mode::Eval);
    }
}
