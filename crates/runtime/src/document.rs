//! The training document: one JSON file carrying the body description,
//! the hyperparameters and the latest checkpoint. Results are written
//! next to the input so the source document is never clobbered.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use coach::TrainConfig;
use serde::{Deserialize, Serialize};

/// Opaque serialized network weights with the wall-clock millisecond they
/// were taken.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Checkpoint {
    pub data: String,
    pub time: u64,
}

/// On-disk training state.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    /// Body description in the line-oriented spec format.
    pub shape_data: String,
    #[serde(default)]
    pub config: TrainConfig,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checkpoint: Option<Checkpoint>,
}

impl Document {
    /// # Errors
    ///
    /// Fails when the file cannot be read or is not a valid document.
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading training document {}", path.display()))?;
        serde_json::from_str(&text)
            .with_context(|| format!("parsing training document {}", path.display()))
    }

    /// # Errors
    ///
    /// Fails when the file cannot be written.
    pub fn save(&self, path: &Path) -> Result<()> {
        let text = serde_json::to_string_pretty(self).context("serializing training document")?;
        fs::write(path, text)
            .with_context(|| format!("writing training document {}", path.display()))
    }

    /// `body.json` becomes `body_out.json`; an extensionless input gets a
    /// plain `_out` suffix.
    #[must_use]
    pub fn output_path(input: &Path) -> PathBuf {
        let stem = input
            .file_stem()
            .map_or_else(|| "training".to_owned(), |s| s.to_string_lossy().into_owned());
        let name = match input.extension() {
            Some(ext) => format!("{stem}_out.{}", ext.to_string_lossy()),
            None => format!("{stem}_out"),
        };
        input.with_file_name(name)
    }
}
