use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{FitError, Result};

/// Configuration for a `train` run.
///
/// # Fields
/// - `num_epochs` : upper bound on full passes over the training source
/// - `patience`   : consecutive epochs without a new best validation loss
///                  after which training stops early
/// - `save_path`  : where the best model's state dict is written
/// - `log_dir`    : directory receiving the metrics event file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainConfig {
    pub num_epochs: usize,
    pub patience: usize,
    pub save_path: PathBuf,
    pub log_dir: PathBuf,
}

impl Default for TrainConfig {
    fn default() -> Self {
        TrainConfig {
            num_epochs: 50,
            patience: 5,
            save_path: PathBuf::from("outputs/best_model.json"),
            log_dir: PathBuf::from("logs"),
        }
    }
}

impl TrainConfig {
    pub fn validate(&self) -> Result<()> {
        if self.patience == 0 {
            return Err(FitError::InvalidConfig("patience must be at least 1".into()));
        }
        Ok(())
    }

    /// Loads a config from JSON; missing fields keep their defaults.
    pub fn load_json(path: impl AsRef<Path>) -> Result<TrainConfig> {
        let file = std::fs::File::open(path)?;
        let config: TrainConfig = serde_json::from_reader(std::io::BufReader::new(file))?;
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let c = TrainConfig::default();
        assert_eq!(c.num_epochs, 50);
        assert_eq!(c.patience, 5);
        assert_eq!(c.save_path, PathBuf::from("outputs/best_model.json"));
    }

    #[test]
    fn partial_json_fills_defaults() {
        let c: TrainConfig = serde_json::from_str(r#"{"num_epochs": 3}"#).unwrap();
        assert_eq!(c.num_epochs, 3);
        assert_eq!(c.patience, 5);
        assert_eq!(c.log_dir, PathBuf::from("logs"));
    }

    #[test]
    fn zero_patience_is_invalid() {
        let c = TrainConfig { patience: 0, ..Default::default() };
        assert!(c.validate().is_err());
    }
}
