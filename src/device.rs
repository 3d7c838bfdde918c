use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::FitError;

/// Compute device selector.
///
/// Only the host CPU backs tensors in this build. Accelerator names parse
/// so configs stay portable, but moving anything onto them fails with
/// `FitError::UnsupportedDevice`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Device {
    #[default]
    Cpu,
    Cuda(usize),
}

impl Device {
    /// Picks the best available device; always the CPU here.
    pub fn auto() -> Device {
        Device::Cpu
    }

    pub fn ensure_available(&self) -> Result<(), FitError> {
        match self {
            Device::Cpu => Ok(()),
            other => Err(FitError::UnsupportedDevice(other.to_string())),
        }
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Device::Cpu => write!(f, "cpu"),
            Device::Cuda(idx) => write!(f, "cuda:{idx}"),
        }
    }
}

impl FromStr for Device {
    type Err = FitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_ascii_lowercase();
        match s.as_str() {
            "cpu" => Ok(Device::Cpu),
            "auto" => Ok(Device::auto()),
            "cuda" => Ok(Device::Cuda(0)),
            _ => match s.strip_prefix("cuda:").map(str::parse::<usize>) {
                Some(Ok(idx)) => Ok(Device::Cuda(idx)),
                _ => Err(FitError::UnsupportedDevice(s)),
            },
        }
    }
}
