use crate::math::matrix::Matrix;
use crate::model::Parameter;
use crate::optim::Optimizer;

/// First/second moment buffers for one parameter.
#[derive(Debug, Clone)]
struct Moments {
    m: Matrix,
    v: Matrix,
}

/// Adam (Kingma & Ba, 2015) with bias correction and L2 weight decay
/// folded into the gradient.
#[derive(Debug, Clone)]
pub struct Adam {
    pub learning_rate: f64,
    pub beta1: f64,
    pub beta2: f64,
    pub epsilon: f64,
    pub weight_decay: f64,
    step: u32,
    moments: Vec<Option<Moments>>,
}

impl Adam {
    pub fn new(learning_rate: f64) -> Adam {
        Adam {
            learning_rate,
            beta1: 0.9,
            beta2: 0.999,
            epsilon: 1e-8,
            weight_decay: 0.0,
            step: 0,
            moments: Vec::new(),
        }
    }

    pub fn with_weight_decay(mut self, weight_decay: f64) -> Adam {
        self.weight_decay = weight_decay;
        self
    }
}

impl Optimizer for Adam {
    fn step(&mut self, params: Vec<&mut Parameter>) {
        if self.moments.len() < params.len() {
            self.moments.resize(params.len(), None);
        }
        self.step += 1;
        let t = self.step as i32;
        let (b1, b2) = (self.beta1, self.beta2);
        let bias1 = 1.0 - b1.powi(t);
        let bias2 = 1.0 - b2.powi(t);

        for (i, p) in params.into_iter().enumerate() {
            if p.grad.shape() != p.value.shape() {
                continue;
            }
            let g = if self.weight_decay != 0.0 {
                p.grad.zip_map(&p.value, |g, w| g + self.weight_decay * w)
            } else {
                p.grad.clone()
            };
            let state = self.moments[i].get_or_insert_with(|| Moments {
                m: Matrix::zeros(g.rows, g.cols),
                v: Matrix::zeros(g.rows, g.cols),
            });
            // m = β1·m + (1-β1)·g ; v = β2·v + (1-β2)·g²
            state.m = state.m.zip_map(&g, |m, g| b1 * m + (1.0 - b1) * g);
            state.v = state.v.zip_map(&g, |v, g| b2 * v + (1.0 - b2) * g * g);

            let step_size = self.learning_rate / bias1;
            let eps = self.epsilon;
            let denom = state.v.map(|v| (v / bias2).sqrt() + eps);
            let update = state.m.zip_map(&denom, |m, d| step_size * m / d);
            p.value = &p.value - &update;
        }
    }

    fn learning_rate(&self) -> f64 {
        self.learning_rate
    }

    fn set_learning_rate(&mut self, lr: f64) {
        self.learning_rate = lr;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_step_moves_by_learning_rate() {
        // With bias correction the first update is lr · sign(g).
        let mut p = Parameter::new(Matrix::from_vec(1, 2, vec![1.0, 1.0]));
        p.grad = Matrix::from_vec(1, 2, vec![3.0, -0.01]);
        Adam::new(0.1).step(vec![&mut p]);
        assert!((p.value.get(0, 0) - 0.9).abs() < 1e-6);
        assert!((p.value.get(0, 1) - 1.1).abs() < 1e-4);
    }

    #[test]
    fn minimises_a_quadratic() {
        let mut p = Parameter::new(Matrix::from_vec(1, 1, vec![5.0]));
        let mut opt = Adam::new(0.1);
        for _ in 0..500 {
            let w = p.value.get(0, 0);
            p.grad = Matrix::from_vec(1, 1, vec![2.0 * w]);
            opt.step(vec![&mut p]);
        }
        assert!(p.value.get(0, 0).abs() < 0.1);
    }
}
