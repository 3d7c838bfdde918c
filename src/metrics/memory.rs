use crate::error::Result;
use crate::metrics::ScalarSink;

/// Keeps every scalar in memory; handy for tests and for callers that want
/// the history without touching disk.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    pub records: Vec<(String, f64, u64)>,
    pub closed: usize,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Values recorded under `tag`, in step order of arrival.
    pub fn series(&self, tag: &str) -> Vec<(u64, f64)> {
        self.records
            .iter()
            .filter(|(t, _, _)| t == tag)
            .map(|(_, v, s)| (*s, *v))
            .collect()
    }
}

impl ScalarSink for MemorySink {
    fn add_scalar(&mut self, tag: &str, value: f64, step: u64) -> Result<()> {
        self.records.push((tag.to_owned(), value, step));
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.closed += 1;
        Ok(())
    }
}
