use serde::{Deserialize, Serialize};

use crate::loss::cross_entropy::CrossEntropyLoss;
use crate::loss::mse::MseLoss;
use crate::loss::Criterion;

/// Selects which criterion a run uses.
///
/// - `CrossEntropy` : categorical cross-entropy over logits; the usual choice.
/// - `Mse`          : squared error against one-hot targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum LossType {
    #[default]
    CrossEntropy,
    Mse,
}

impl LossType {
    pub fn build(self) -> Box<dyn Criterion> {
        match self {
            LossType::CrossEntropy => Box::new(CrossEntropyLoss),
            LossType::Mse => Box::new(MseLoss),
        }
    }
}
