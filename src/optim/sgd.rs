use crate::math::matrix::Matrix;
use crate::model::Parameter;
use crate::optim::Optimizer;

/// Stochastic gradient descent with optional momentum and L2 weight decay.
///
/// Per parameter: `g = ∇ + λ·θ`, `v = μ·v + g` (the first step seeds `v = g`),
/// `θ -= lr · v`. With `μ = 0` this is plain SGD.
#[derive(Debug, Clone)]
pub struct Sgd {
    pub learning_rate: f64,
    pub momentum: f64,
    pub weight_decay: f64,
    velocity: Vec<Option<Matrix>>,
}

impl Sgd {
    pub fn new(learning_rate: f64) -> Sgd {
        Sgd { learning_rate, momentum: 0.0, weight_decay: 0.0, velocity: Vec::new() }
    }

    pub fn with_momentum(mut self, momentum: f64) -> Sgd {
        self.momentum = momentum;
        self
    }

    pub fn with_weight_decay(mut self, weight_decay: f64) -> Sgd {
        self.weight_decay = weight_decay;
        self
    }
}

impl Optimizer for Sgd {
    fn step(&mut self, params: Vec<&mut Parameter>) {
        if self.velocity.len() < params.len() {
            self.velocity.resize(params.len(), None);
        }
        for (i, p) in params.into_iter().enumerate() {
            if p.grad.shape() != p.value.shape() {
                // no gradient recorded for this parameter yet
                continue;
            }
            let mut g = if self.weight_decay != 0.0 {
                p.grad.zip_map(&p.value, |g, w| g + self.weight_decay * w)
            } else {
                p.grad.clone()
            };
            if self.momentum != 0.0 {
                let v = match self.velocity[i].take() {
                    Some(prev) if prev.shape() == g.shape() => {
                        prev.zip_map(&g, |v, g| self.momentum * v + g)
                    }
                    _ => g,
                };
                g = v.clone();
                self.velocity[i] = Some(v);
            }
            let lr = self.learning_rate;
            p.value = p.value.zip_map(&g, |w, g| w - lr * g);
        }
    }

    fn learning_rate(&self) -> f64 {
        self.learning_rate
    }

    fn set_learning_rate(&mut self, lr: f64) {
        self.learning_rate = lr;
    }
}
