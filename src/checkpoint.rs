use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{FitError, Result};
use crate::model::{Model, StateDict};

const FORMAT_VERSION: u32 = 1;

/// On-disk layout of a saved state dict.
#[derive(Debug, Serialize, Deserialize)]
struct CheckpointFile {
    version: u32,
    parameters: StateDict,
}

/// Serializes `model`'s parameters to `path` as pretty-printed JSON,
/// creating missing parent directories.
///
/// The file is written next to `path` with a `.tmp` extension and renamed
/// over it, so an existing checkpoint survives a failed write.
pub fn save_model<M: Model + ?Sized>(model: &M, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let checkpoint = CheckpointFile { version: FORMAT_VERSION, parameters: model.state_dict() };
    let tmp = path.with_extension("tmp");
    let mut writer = BufWriter::new(File::create(&tmp)?);
    serde_json::to_writer_pretty(&mut writer, &checkpoint)?;
    writer.flush()?;
    writer.get_ref().sync_all()?;
    drop(writer);
    fs::rename(&tmp, path)?;
    tracing::debug!(path = %path.display(), "saved model parameters");
    Ok(())
}

/// Restores parameters written by `save_model` into `model`.
///
/// The model must already have the saved architecture; names and shapes are
/// checked by `Model::load_state_dict`.
pub fn load_model<M: Model + ?Sized>(model: &mut M, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let checkpoint: CheckpointFile = serde_json::from_reader(BufReader::new(File::open(path)?))?;
    if checkpoint.version != FORMAT_VERSION {
        return Err(FitError::InvalidConfig(format!(
            "checkpoint '{}' has format version {}, expected {}",
            path.display(),
            checkpoint.version,
            FORMAT_VERSION
        )));
    }
    model.load_state_dict(&checkpoint.parameters)
}
