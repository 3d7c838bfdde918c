pub mod early_stopping;
pub mod epoch_stats;
pub mod loop_fn;
pub mod running;
pub mod train_config;

pub use early_stopping::EarlyStopping;
pub use epoch_stats::{EpochStats, TrainSummary};
pub use loop_fn::{evaluate, train, train_with_sink};
pub use running::RunningTotals;
pub use train_config::TrainConfig;
