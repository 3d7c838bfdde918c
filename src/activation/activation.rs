use serde::{Deserialize, Serialize};
use std::f64::consts::E;

use crate::math::matrix::Matrix;

/// Element-wise activation applied after a dense layer's affine transform.
///
/// Classifier heads use `Identity` and leave the softmax to the criterion,
/// which works on raw logits.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum ActivationFunction {
    Sigmoid,
    #[serde(rename = "relu")]
    ReLU,
    Identity,
    Tanh,
    #[serde(rename = "leaky_relu")]
    LeakyReLU { alpha: f64 },
}

impl ActivationFunction {
    pub fn function(&self, x: f64) -> f64 {
        match self {
            ActivationFunction::Sigmoid => 1.0 / (1.0 + E.powf(-x)),
            ActivationFunction::ReLU => if x > 0.0 { x } else { 0.0 },
            ActivationFunction::Identity => x,
            ActivationFunction::Tanh => x.tanh(),
            ActivationFunction::LeakyReLU { alpha } => if x > 0.0 { x } else { alpha * x },
        }
    }

    /// Derivative evaluated at the pre-activation `x`.
    pub fn derivative(&self, x: f64) -> f64 {
        match self {
            ActivationFunction::Sigmoid => {
                let fx = self.function(x);
                fx * (1.0 - fx)
            }
            ActivationFunction::ReLU => if x > 0.0 { 1.0 } else { 0.0 },
            ActivationFunction::Identity => 1.0,
            ActivationFunction::Tanh => {
                let t = x.tanh();
                1.0 - t * t
            }
            ActivationFunction::LeakyReLU { alpha } => if x > 0.0 { 1.0 } else { *alpha },
        }
    }

    pub fn apply(&self, z: &Matrix) -> Matrix {
        z.map(|x| self.function(x))
    }

    /// Chains `grad` (∂L/∂a) through the activation: δ = grad ⊙ σ'(z).
    pub fn backward(&self, z: &Matrix, grad: &Matrix) -> Matrix {
        if *self == ActivationFunction::Identity {
            return grad.clone();
        }
        grad.zip_map(z, |g, x| g * self.derivative(x))
    }

    /// ReLU-family layers get He initialization, everything else Xavier.
    pub fn prefers_he_init(&self) -> bool {
        matches!(self, ActivationFunction::ReLU | ActivationFunction::LeakyReLU { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derivatives_match_finite_differences() {
        let h = 1e-6;
        for act in [
            ActivationFunction::Sigmoid,
            ActivationFunction::Tanh,
            ActivationFunction::LeakyReLU { alpha: 0.1 },
        ] {
            for &x in &[-1.3, -0.2, 0.4, 2.0] {
                let numeric = (act.function(x + h) - act.function(x - h)) / (2.0 * h);
                assert!((numeric - act.derivative(x)).abs() < 1e-5, "{act:?} at {x}");
            }
        }
    }

    #[test]
    fn relu_gates_gradient() {
        let z = Matrix::from_rows(&[vec![-1.0, 2.0]]);
        let g = Matrix::from_rows(&[vec![5.0, 5.0]]);
        let d = ActivationFunction::ReLU.backward(&z, &g);
        assert_eq!(d.as_slice(), &[0.0, 5.0]);
    }

    #[test]
    fn serde_names_are_snake_case() {
        let json = serde_json::to_string(&ActivationFunction::ReLU).unwrap();
        assert_eq!(json, r#"{"kind":"relu"}"#);
        let back: ActivationFunction =
            serde_json::from_str(r#"{"kind":"leaky_relu","alpha":0.01}"#).unwrap();
        assert_eq!(back, ActivationFunction::LeakyReLU { alpha: 0.01 });
    }
}
