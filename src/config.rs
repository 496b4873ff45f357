//! Run configuration.
//!
//! The core takes an already-validated [`IngestConfig`]; the JSON loader
//! here is the thin glue between an operator's config file plus CLI flags
//! and that value.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::store::Durability;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file {path}: {source}")]
    Io {
        path: PathBuf,
        source: io::Error,
    },

    #[error("malformed config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// On-disk configuration document.
#[derive(Debug, Deserialize)]
struct ConfigFile {
    dataset_name: String,
    dataset_root_path: PathBuf,
    output_store_dir: PathBuf,
}

/// Validated configuration for one ingestion run. Immutable once built.
#[derive(Debug, Clone)]
pub struct IngestConfig {
    /// Dataset identifier; the first path segment of every key.
    pub dataset_name: String,
    /// Directory containing the `<dataset_name>` tree.
    pub dataset_root: PathBuf,
    /// Directory the store is created under (created if absent).
    pub output_dir: PathBuf,
    /// Hard upper bound on the store's total size.
    pub map_size_bytes: usize,
    /// Commit durability mode.
    pub durability: Durability,
}

impl IngestConfig {
    /// Load the JSON config document and combine it with the CLI-supplied
    /// size budget. Fails before any store is touched.
    pub fn from_file(
        path: &Path,
        size_gb: u64,
        durability: Durability,
    ) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let file: ConfigFile =
            serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        Ok(Self {
            dataset_name: file.dataset_name,
            dataset_root: file.dataset_root_path,
            output_dir: file.output_store_dir,
            map_size_bytes: gigabytes(size_gb),
            durability,
        })
    }

    /// The tree that gets ingested: `<dataset_root>/<dataset_name>`.
    pub fn dataset_dir(&self) -> PathBuf {
        self.dataset_root.join(&self.dataset_name)
    }

    /// Where the store lives: `<output_dir>/<dataset_name>_store`.
    pub fn store_path(&self) -> PathBuf {
        self.output_dir.join(format!("{}_store", self.dataset_name))
    }
}

/// Convert a gigabyte budget to bytes.
pub fn gigabytes(gb: u64) -> usize {
    (gb as usize) * 1024 * 1024 * 1024
}
