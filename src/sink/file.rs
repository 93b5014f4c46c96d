//! Flat JSON snapshot files.

use crate::config::Config;
use crate::error::Result;
use crate::pipeline::CanonicalRecord;
use crate::utils::{clean_json, json_output_path};
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::path::{Path, PathBuf};

/// Writes records as `<data_root>/<prefix>_<YYYYMMDD_HHMM>Z.json`
///
/// Records are cleaned with [`clean_json`] and pretty-printed. Two writes within the
/// same minute land on the same path; the later one replaces the earlier.
#[derive(Clone, Debug)]
pub struct JsonFileSink {
    data_root: PathBuf,
    prefix: String,
}

impl JsonFileSink {
    /// Sink writing `prefix` snapshots under `data_root`
    pub fn new(data_root: impl Into<PathBuf>, prefix: impl Into<String>) -> Self {
        Self {
            data_root: data_root.into(),
            prefix: prefix.into(),
        }
    }

    /// Sink rooted at the configured data root
    pub fn from_config(config: &Config, prefix: impl Into<String>) -> Self {
        Self::new(config.data_root.clone(), prefix)
    }

    /// Directory snapshots are written to
    pub fn data_root(&self) -> &Path {
        &self.data_root
    }

    /// File name prefix
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Path a snapshot taken at `time` is written to
    pub fn path_for(&self, time: DateTime<Utc>) -> PathBuf {
        json_output_path(&self.data_root, &self.prefix, time)
    }

    /// Write `record` stamped with the current time
    pub async fn write(&self, record: &CanonicalRecord) -> Result<PathBuf> {
        self.write_at(record, Utc::now()).await
    }

    /// Write `record` stamped with `time`, creating the data root if needed
    pub async fn write_at(&self, record: &CanonicalRecord, time: DateTime<Utc>) -> Result<PathBuf> {
        let path = self.path_for(time);

        let mut value = Value::Object(record.clone());
        clean_json(&mut value);
        let body = serde_json::to_vec_pretty(&value)?;

        tokio::fs::create_dir_all(&self.data_root).await?;
        tokio::fs::write(&path, body).await?;

        tracing::info!(path = %path.display(), keys = record.len(), "exported snapshot");
        Ok(path)
    }
}
