use thiserror::Error;

/// Every fallible operation in the crate returns this error.
#[derive(Debug, Error)]
pub enum FitError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("{phase} phase produced no samples; cannot average over an empty source")]
    EmptySource { phase: &'static str },

    #[error("shape mismatch in {context}: expected {expected}, got {got}")]
    ShapeMismatch {
        context: &'static str,
        expected: String,
        got: String,
    },

    #[error("label {label} is out of range for a model with {classes} outputs")]
    LabelOutOfRange { label: usize, classes: usize },

    #[error("state dict has no parameter named '{0}'")]
    MissingParameter(String),

    #[error("state dict contains unknown parameter '{0}'")]
    UnknownParameter(String),

    #[error("device '{0}' is not available in this build")]
    UnsupportedDevice(String),

    #[error("backward called without a training-mode forward pass")]
    NoForwardCache,

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, FitError>;
