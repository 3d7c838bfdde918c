pub mod adam;
pub mod scheduler;
pub mod sgd;

pub use adam::Adam;
pub use scheduler::{ConstantLr, LrScheduler, ReduceLrOnPlateau, SchedulerKind, StepLr};
pub use sgd::Sgd;

use serde::{Deserialize, Serialize};

use crate::model::Parameter;

/// Updates parameters from the gradients left by the last backward pass.
///
/// `params` must come from `Model::parameters_mut`, whose order is stable;
/// stateful optimizers key their per-parameter buffers on that position.
pub trait Optimizer {
    fn step(&mut self, params: Vec<&mut Parameter>);

    fn zero_grad(&mut self, params: Vec<&mut Parameter>) {
        for p in params {
            p.zero_grad();
        }
    }

    fn learning_rate(&self) -> f64;

    fn set_learning_rate(&mut self, lr: f64);
}

impl<O: Optimizer + ?Sized> Optimizer for Box<O> {
    fn step(&mut self, params: Vec<&mut Parameter>) {
        (**self).step(params)
    }

    fn zero_grad(&mut self, params: Vec<&mut Parameter>) {
        (**self).zero_grad(params)
    }

    fn learning_rate(&self) -> f64 {
        (**self).learning_rate()
    }

    fn set_learning_rate(&mut self, lr: f64) {
        (**self).set_learning_rate(lr)
    }
}

/// Optimizer selection for configs and the CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum OptimizerKind {
    #[default]
    Sgd,
    Adam,
}

impl OptimizerKind {
    /// SGD gets momentum 0.9; Adam uses its usual betas.
    pub fn build(self, learning_rate: f64, weight_decay: f64) -> Box<dyn Optimizer> {
        match self {
            OptimizerKind::Sgd => Box::new(
                Sgd::new(learning_rate).with_momentum(0.9).with_weight_decay(weight_decay),
            ),
            OptimizerKind::Adam => Box::new(Adam::new(learning_rate).with_weight_decay(weight_decay)),
        }
    }
}
