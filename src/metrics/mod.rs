pub mod memory;
pub mod summary_writer;

pub use memory::MemorySink;
pub use summary_writer::{ScalarEvent, SummaryWriter};

use crate::error::Result;

/// Destination for `(tag, value, step)` metric records.
pub trait ScalarSink {
    fn add_scalar(&mut self, tag: &str, value: f64, step: u64) -> Result<()>;

    /// Flushes and releases the sink. Writing after `close` is an error for
    /// sinks backed by files.
    fn close(&mut self) -> Result<()>;
}
