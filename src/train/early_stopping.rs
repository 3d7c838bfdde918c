/// Tracks the best validation loss and the run of epochs since it last
/// improved.
#[derive(Debug, Clone, PartialEq)]
pub struct EarlyStopping {
    best: f64,
    stale_epochs: usize,
    patience: usize,
}

impl EarlyStopping {
    pub fn new(patience: usize) -> Self {
        EarlyStopping { best: f64::INFINITY, stale_epochs: 0, patience }
    }

    /// Returns `true` if `val_loss` is strictly below the best so far, in
    /// which case it becomes the new best and the stale counter resets.
    /// Otherwise the stale counter grows by one. NaN never improves.
    pub fn update(&mut self, val_loss: f64) -> bool {
        if val_loss < self.best {
            self.best = val_loss;
            self.stale_epochs = 0;
            true
        } else {
            self.stale_epochs += 1;
            false
        }
    }

    pub fn should_stop(&self) -> bool {
        self.stale_epochs >= self.patience
    }

    pub fn best(&self) -> f64 {
        self.best
    }

    pub fn stale_epochs(&self) -> usize {
        self.stale_epochs
    }

    pub fn patience(&self) -> usize {
        self.patience
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn improvement_must_be_strict() {
        let mut es = EarlyStopping::new(5);
        assert!(es.update(1.0));
        assert!(!es.update(1.0));
        assert_eq!(es.stale_epochs(), 1);
        assert!(es.update(0.9));
        assert_eq!(es.stale_epochs(), 0);
        assert_eq!(es.best(), 0.9);
    }

    #[test]
    fn stops_once_stale_count_reaches_patience() {
        let mut es = EarlyStopping::new(2);
        es.update(1.0);
        es.update(2.0);
        assert!(!es.should_stop());
        es.update(2.0);
        assert!(es.should_stop());
    }

    #[test]
    fn nan_counts_as_stale() {
        let mut es = EarlyStopping::new(5);
        assert!(!es.update(f64::NAN));
        assert_eq!(es.stale_epochs(), 1);
        assert!(es.best().is_infinite());
    }
}
