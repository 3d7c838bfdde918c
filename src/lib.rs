pub mod activation;
pub mod checkpoint;
pub mod data;
pub mod device;
pub mod error;
pub mod layers;
pub mod loss;
pub mod math;
pub mod metrics;
pub mod model;
pub mod network;
pub mod optim;
pub mod train;
pub mod viz;

// Convenience re-exports
pub use activation::activation::ActivationFunction;
pub use checkpoint::{load_model, save_model};
pub use data::{Batch, BatchSource, DataLoader, ImageDataset, ImageShape};
pub use device::Device;
pub use error::{FitError, Result};
pub use loss::{Criterion, CrossEntropyLoss, LossType, MseLoss};
pub use math::matrix::Matrix;
pub use metrics::{MemorySink, ScalarSink, SummaryWriter};
pub use model::{Mode, Model, Parameter, StateDict};
pub use network::{Network, NetworkSpec};
pub use optim::{Adam, LrScheduler, Optimizer, ReduceLrOnPlateau, Sgd, StepLr};
pub use train::{train, train_with_sink, EpochStats, TrainConfig, TrainSummary};
pub use viz::{class_names_from_map, show_batch_images};
