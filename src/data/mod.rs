pub mod batch;
pub mod dataset;
pub mod loader;
pub mod synthetic;

pub use batch::{Batch, ImageShape};
pub use dataset::ImageDataset;
pub use loader::{BatchSource, DataLoader};
