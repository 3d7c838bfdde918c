use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::activation::activation::ActivationFunction;
use crate::error::{FitError, Result};
use crate::math::matrix::Matrix;
use crate::model::Parameter;

/// Values kept from the last training-mode forward pass.
#[derive(Debug, Clone)]
struct ForwardCache {
    input: Matrix,
    // pre-activation z = xW + b, needed for σ'(z)
    pre_activation: Matrix,
}

/// Fully connected layer: `a = σ(x · W + b)` with `W` shaped
/// `(input_size, size)` and `b` shaped `(1, size)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dense {
    pub size: usize,
    pub input_size: usize,
    pub weights: Parameter,
    pub biases: Parameter,
    pub activator: ActivationFunction,
    #[serde(skip)]
    cache: Option<ForwardCache>,
}

impl Dense {
    pub fn new<R: Rng + ?Sized>(
        size: usize,
        input_size: usize,
        activation: ActivationFunction,
        rng: &mut R,
    ) -> Dense {
        let weights = if activation.prefers_he_init() {
            Matrix::he(input_size, size, rng)
        } else {
            Matrix::xavier(input_size, size, rng)
        };
        Dense {
            size,
            input_size,
            weights: Parameter::new(weights),
            biases: Parameter::new(Matrix::zeros(1, size)),
            activator: activation,
            cache: None,
        }
    }

    /// Forward pass over a batch. With `keep_cache` the input and
    /// pre-activation are stored for `backward`.
    pub fn forward(&mut self, input: &Matrix, keep_cache: bool) -> Result<Matrix> {
        if input.cols != self.input_size {
            return Err(FitError::ShapeMismatch {
                context: "dense layer input",
                expected: format!("{} features", self.input_size),
                got: format!("{} features", input.cols),
            });
        }
        let z = input.matmul(&self.weights.value).add_row_broadcast(&self.biases.value);
        let a = self.activator.apply(&z);
        self.cache = keep_cache.then(|| ForwardCache { input: input.clone(), pre_activation: z });
        Ok(a)
    }

    /// Accumulates `∂L/∂W` and `∂L/∂b` and returns `∂L/∂x` for the layer below.
    ///
    /// `grad_output` is ∂L/∂a for this layer, one row per sample.
    pub fn backward(&mut self, grad_output: &Matrix) -> Result<Matrix> {
        let cache = self.cache.as_ref().ok_or(FitError::NoForwardCache)?;
        if grad_output.shape() != cache.pre_activation.shape() {
            return Err(FitError::ShapeMismatch {
                context: "dense layer backward",
                expected: format!("{:?}", cache.pre_activation.shape()),
                got: format!("{:?}", grad_output.shape()),
            });
        }
        let delta = self.activator.backward(&cache.pre_activation, grad_output);
        let weights_grad = cache.input.transpose().matmul(&delta);
        let biases_grad = delta.sum_rows();
        let grad_input = delta.matmul(&self.weights.value.transpose());

        self.weights.accumulate(&weights_grad)?;
        self.biases.accumulate(&biases_grad)?;
        Ok(grad_input)
    }

    pub fn clear_cache(&mut self) {
        self.cache = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn layer(activation: ActivationFunction) -> Dense {
        let mut rng = StdRng::seed_from_u64(7);
        Dense::new(3, 2, activation, &mut rng)
    }

    #[test]
    fn forward_rejects_wrong_width() {
        let mut l = layer(ActivationFunction::ReLU);
        let err = l.forward(&Matrix::zeros(4, 5), true).unwrap_err();
        assert!(matches!(err, FitError::ShapeMismatch { .. }));
    }

    #[test]
    fn backward_without_cache_fails() {
        let mut l = layer(ActivationFunction::Tanh);
        l.forward(&Matrix::zeros(1, 2), false).unwrap();
        assert!(matches!(l.backward(&Matrix::zeros(1, 3)), Err(FitError::NoForwardCache)));
    }

    #[test]
    fn weight_gradient_matches_finite_difference() {
        // L = sum(a) so ∂L/∂a is all ones.
        let mut l = layer(ActivationFunction::Tanh);
        let x = Matrix::from_rows(&[vec![0.3, -0.7], vec![1.1, 0.2]]);
        let out = l.forward(&x, true).unwrap();
        l.backward(&Matrix::from_vec(out.rows, out.cols, vec![1.0; out.rows * out.cols]))
            .unwrap();
        let analytic = l.weights.grad.get(1, 2);

        let h = 1e-6;
        let loss_at = |l: &mut Dense, w: f64| {
            l.weights.value.set(1, 2, w);
            l.forward(&x, false).unwrap().as_slice().iter().sum::<f64>()
        };
        let w0 = l.weights.value.get(1, 2);
        let numeric = (loss_at(&mut l, w0 + h) - loss_at(&mut l, w0 - h)) / (2.0 * h);
        assert!((numeric - analytic).abs() < 1e-5);
    }
}
