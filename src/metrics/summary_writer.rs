use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{FitError, Result};
use crate::metrics::ScalarSink;

/// One line of an event file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScalarEvent {
    /// Seconds since the Unix epoch, fractional.
    pub wall_time: f64,
    pub step: u64,
    pub tag: String,
    pub value: f64,
}

/// Appends scalar events to `events.<unix_secs><nanos>.<pid>.jsonl` inside a log
/// directory, one JSON object per line, for an external dashboard to tail.
#[derive(Debug)]
pub struct SummaryWriter {
    path: PathBuf,
    writer: Option<BufWriter<File>>,
}

impl SummaryWriter {
    /// Creates `log_dir` if needed and opens a fresh event file in it.
    pub fn new(log_dir: impl AsRef<Path>) -> Result<SummaryWriter> {
        let log_dir = log_dir.as_ref();
        fs::create_dir_all(log_dir)?;
        let now = chrono::Utc::now();
        let file_name = format!(
            "events.{}{:09}.{}.jsonl",
            now.timestamp(),
            now.timestamp_subsec_nanos(),
            std::process::id()
        );
        let path = log_dir.join(file_name);
        let file = File::create(&path)?;
        tracing::debug!(path = %path.display(), "opened metrics event file");
        Ok(SummaryWriter { path, writer: Some(BufWriter::new(file)) })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads back every event in a file written by a `SummaryWriter`.
    pub fn read_events(path: impl AsRef<Path>) -> Result<Vec<ScalarEvent>> {
        let text = fs::read_to_string(path)?;
        text.lines()
            .filter(|l| !l.trim().is_empty())
            .map(|l| serde_json::from_str(l).map_err(FitError::from))
            .collect()
    }
}

impl ScalarSink for SummaryWriter {
    fn add_scalar(&mut self, tag: &str, value: f64, step: u64) -> Result<()> {
        let writer = self.writer.as_mut().ok_or_else(|| {
            FitError::Io(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "summary writer is closed",
            ))
        })?;
        let now = chrono::Utc::now();
        let event = ScalarEvent {
            wall_time: now.timestamp() as f64 + f64::from(now.timestamp_subsec_micros()) * 1e-6,
            step,
            tag: tag.to_owned(),
            value,
        };
        serde_json::to_writer(&mut *writer, &event)?;
        writer.write_all(b"\n")?;
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        if let Some(mut writer) = self.writer.take() {
            writer.flush()?;
            tracing::debug!(path = %self.path.display(), "closed metrics event file");
        }
        Ok(())
    }
}

impl Drop for SummaryWriter {
    fn drop(&mut self) {
        if let Some(writer) = self.writer.as_mut() {
            let _ = writer.flush();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_one_json_line_per_scalar() {
        let dir = tempfile::tempdir().unwrap();
        let mut w = SummaryWriter::new(dir.path().join("logs")).unwrap();
        w.add_scalar("Loss/train", 0.5, 1).unwrap();
        w.add_scalar("Accuracy/val", 0.75, 1).unwrap();
        w.close().unwrap();

        let events = SummaryWriter::read_events(w.path()).unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].tag, "Loss/train");
        assert_eq!(events[1].value, 0.75);
        assert!(events.iter().all(|e| e.step == 1 && e.wall_time > 0.0));
    }

    #[test]
    fn values_read_back_bit_for_bit() {
        let dir = tempfile::tempdir().unwrap();
        let mut w = SummaryWriter::new(dir.path()).unwrap();
        let values = [1.3972330872280339, 0.1 + 0.2, 2.0_f64.sqrt(), 1e-300, 1.0 / 3.0];
        for (step, v) in values.iter().enumerate() {
            w.add_scalar("Loss/val", *v, step as u64).unwrap();
        }
        w.close().unwrap();

        let read: Vec<u64> = SummaryWriter::read_events(w.path())
            .unwrap()
            .iter()
            .map(|e| e.value.to_bits())
            .collect();
        assert_eq!(read, values.iter().map(|v| v.to_bits()).collect::<Vec<_>>());
    }

    #[test]
    fn writing_after_close_fails_and_close_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let mut w = SummaryWriter::new(dir.path()).unwrap();
        w.close().unwrap();
        w.close().unwrap();
        assert!(w.add_scalar("x", 1.0, 0).is_err());
    }
}
