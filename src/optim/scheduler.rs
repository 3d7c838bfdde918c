use serde::{Deserialize, Serialize};

use crate::optim::Optimizer;

/// Adjusts an optimizer's learning rate once per epoch.
///
/// `metric` is the epoch's validation loss. Schedules that only count
/// epochs ignore it.
pub trait LrScheduler {
    fn step(&mut self, metric: f64, optimizer: &mut dyn Optimizer);
}

impl<S: LrScheduler + ?Sized> LrScheduler for Box<S> {
    fn step(&mut self, metric: f64, optimizer: &mut dyn Optimizer) {
        (**self).step(metric, optimizer)
    }
}

/// Leaves the learning rate untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConstantLr;

impl LrScheduler for ConstantLr {
    fn step(&mut self, _metric: f64, _optimizer: &mut dyn Optimizer) {}
}

/// Multiplies the learning rate by `gamma` every `step_size` epochs.
#[derive(Debug, Clone)]
pub struct StepLr {
    pub step_size: usize,
    pub gamma: f64,
    epoch: usize,
}

impl StepLr {
    pub fn new(step_size: usize, gamma: f64) -> StepLr {
        StepLr { step_size: step_size.max(1), gamma, epoch: 0 }
    }
}

impl LrScheduler for StepLr {
    fn step(&mut self, _metric: f64, optimizer: &mut dyn Optimizer) {
        self.epoch += 1;
        if self.epoch % self.step_size == 0 {
            let lr = optimizer.learning_rate() * self.gamma;
            optimizer.set_learning_rate(lr);
        }
    }
}

pub const DEFAULT_PLATEAU_FACTOR: f64 = 0.1;
pub const DEFAULT_PLATEAU_PATIENCE: usize = 3;

/// Cuts the learning rate when a minimised metric stops improving.
///
/// A metric counts as better when it is below `best · (1 - threshold)`.
/// After more than `patience` consecutive epochs without improvement the
/// rate is multiplied by `factor` (never below `min_lr`), then `cooldown`
/// epochs pass before bad epochs are counted again. Non-finite metrics count
/// as bad epochs.
#[derive(Debug, Clone)]
pub struct ReduceLrOnPlateau {
    pub factor: f64,
    pub patience: usize,
    pub threshold: f64,
    pub cooldown: usize,
    pub min_lr: f64,
    pub eps: f64,
    best: f64,
    bad_epochs: usize,
    cooldown_counter: usize,
}

impl Default for ReduceLrOnPlateau {
    fn default() -> Self {
        ReduceLrOnPlateau::new(DEFAULT_PLATEAU_FACTOR, DEFAULT_PLATEAU_PATIENCE)
    }
}

impl ReduceLrOnPlateau {
    pub fn new(factor: f64, patience: usize) -> ReduceLrOnPlateau {
        ReduceLrOnPlateau {
            factor,
            patience,
            threshold: 1e-4,
            cooldown: 0,
            min_lr: 0.0,
            eps: 1e-8,
            best: f64::INFINITY,
            bad_epochs: 0,
            cooldown_counter: 0,
        }
    }

    pub fn with_cooldown(mut self, cooldown: usize) -> Self {
        self.cooldown = cooldown;
        self
    }

    pub fn with_min_lr(mut self, min_lr: f64) -> Self {
        self.min_lr = min_lr;
        self
    }

    pub fn best(&self) -> f64 {
        self.best
    }

    pub fn bad_epochs(&self) -> usize {
        self.bad_epochs
    }

    fn is_better(&self, metric: f64) -> bool {
        metric < self.best * (1.0 - self.threshold)
    }
}

impl LrScheduler for ReduceLrOnPlateau {
    fn step(&mut self, metric: f64, optimizer: &mut dyn Optimizer) {
        if self.is_better(metric) {
            self.best = metric;
            self.bad_epochs = 0;
        } else {
            self.bad_epochs += 1;
        }

        if self.cooldown_counter > 0 {
            self.cooldown_counter -= 1;
            self.bad_epochs = 0;
        }

        if self.bad_epochs > self.patience {
            let old = optimizer.learning_rate();
            let new = (old * self.factor).max(self.min_lr);
            if old - new > self.eps {
                optimizer.set_learning_rate(new);
                tracing::info!(old_lr = old, new_lr = new, "reducing learning rate on plateau");
            }
            self.cooldown_counter = self.cooldown;
            self.bad_epochs = 0;
        }
    }
}

/// Scheduler selection for configs and the CLI.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum SchedulerKind {
    Constant,
    Plateau { factor: f64, patience: usize },
    Step { step_size: usize, gamma: f64 },
}

impl Default for SchedulerKind {
    fn default() -> Self {
        SchedulerKind::Plateau {
            factor: DEFAULT_PLATEAU_FACTOR,
            patience: DEFAULT_PLATEAU_PATIENCE,
        }
    }
}

impl SchedulerKind {
    pub fn build(self) -> Box<dyn LrScheduler> {
        match self {
            SchedulerKind::Constant => Box::new(ConstantLr),
            SchedulerKind::Plateau { factor, patience } => {
                Box::new(ReduceLrOnPlateau::new(factor, patience))
            }
            SchedulerKind::Step { step_size, gamma } => Box::new(StepLr::new(step_size, gamma)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::optim::sgd::Sgd;

    #[test]
    fn plateau_defaults_agree() {
        let direct = ReduceLrOnPlateau::default();
        let SchedulerKind::Plateau { factor, patience } = SchedulerKind::default() else {
            panic!("default scheduler kind is not a plateau");
        };
        assert_eq!((direct.factor, direct.patience), (factor, patience));
        assert_eq!(direct.patience, 3);
    }

    #[test]
    fn plateau_waits_past_patience_before_cutting() {
        let mut opt = Sgd::new(1.0);
        let mut sched = ReduceLrOnPlateau::new(0.5, 2);
        sched.step(1.0, &mut opt);
        sched.step(1.0, &mut opt);
        sched.step(1.0, &mut opt);
        assert_eq!(opt.learning_rate(), 1.0);
        sched.step(1.0, &mut opt);
        assert_eq!(opt.learning_rate(), 0.5);
        assert_eq!(sched.bad_epochs(), 0);
    }

    #[test]
    fn plateau_resets_on_relative_improvement() {
        let mut opt = Sgd::new(1.0);
        let mut sched = ReduceLrOnPlateau::new(0.5, 1);
        sched.step(1.0, &mut opt);
        sched.step(1.0, &mut opt);
        // within the 1e-4 relative threshold: still bad
        sched.step(0.99995, &mut opt);
        assert_eq!(opt.learning_rate(), 0.5);
        sched.step(0.5, &mut opt);
        assert_eq!(sched.best(), 0.5);
        assert_eq!(sched.bad_epochs(), 0);
    }

    #[test]
    fn plateau_respects_min_lr_and_cooldown() {
        let mut opt = Sgd::new(1.0);
        let mut sched = ReduceLrOnPlateau::new(0.1, 0).with_min_lr(0.05).with_cooldown(1);
        sched.step(1.0, &mut opt); // improvement
        sched.step(1.0, &mut opt); // bad → cut to 0.1
        assert!((opt.learning_rate() - 0.1).abs() < 1e-12);
        sched.step(1.0, &mut opt); // cooldown swallows this one
        assert!((opt.learning_rate() - 0.1).abs() < 1e-12);
        sched.step(1.0, &mut opt); // cut, clamped at min_lr
        assert!((opt.learning_rate() - 0.05).abs() < 1e-12);
    }

    #[test]
    fn step_lr_decays_on_schedule() {
        let mut opt = Sgd::new(1.0);
        let mut sched = StepLr::new(2, 0.5);
        for _ in 0..4 {
            sched.step(f64::NAN, &mut opt);
        }
        assert!((opt.learning_rate() - 0.25).abs() < 1e-12);
    }
}
