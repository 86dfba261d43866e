//! Chart persistence: pretty-printed JSON, rewritten atomically.

use crate::chart::record::ChartRecord;
use crate::error::{PerioError, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Saves and loads the chart document at a fixed path.
///
/// Every save rewrites the whole file via a temp-file rename so a crash
/// mid-write never leaves a truncated chart on disk.
pub struct ChartStore {
    path: PathBuf,
}

impl ChartStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Writes the chart as pretty-printed JSON.
    pub fn save(&self, chart: &ChartRecord) -> Result<()> {
        let json = serde_json::to_string_pretty(chart).map_err(|e| {
            PerioError::ChartPersist {
                message: format!("failed to serialize chart: {e}"),
            }
        })?;

        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }

        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    /// Reads the chart back from disk.
    pub fn load(&self) -> Result<ChartRecord> {
        let json = fs::read_to_string(&self.path)?;
        serde_json::from_str(&json).map_err(|e| PerioError::ChartPersist {
            message: format!(
                "failed to parse chart at {}: {e}",
                self.path.display()
            ),
        })
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }
}
