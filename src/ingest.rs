//! Batched directory-to-store ingestion.
//!
//! The full file list is materialized before any record is written so the
//! total count can drive progress reporting; for the target workloads the
//! list is bounded by local storage, not an unbounded stream.

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::IngestConfig;
use crate::encode::{self, EncodeError};
use crate::key;
use crate::store::{Store, StoreError};
use crate::walk;

/// Number of successfully staged records between commits.
///
/// Larger batches amortize commit overhead but widen the window of
/// uncommitted work lost on abrupt termination.
pub const COMMIT_EVERY: usize = 500;

/// Progress notifications emitted during a run.
#[derive(Debug)]
pub enum IngestEvent<'a> {
    /// Enumeration finished; `total` files are queued.
    Discovered { total: usize },
    /// A record was staged in the open transaction.
    Stored {
        key: &'a str,
        processed: usize,
        total: usize,
    },
    /// A file was skipped; the error is also collected in the report.
    Skipped {
        path: &'a Path,
        error: &'a EncodeError,
    },
    /// A batch was committed; `records` is the running ingested count.
    Committed { records: usize },
}

/// One file that could not be ingested.
#[derive(Debug)]
pub struct FileError {
    pub path: PathBuf,
    pub error: EncodeError,
}

/// Outcome of an ingestion run.
#[derive(Debug)]
pub struct IngestReport {
    /// Files found under the dataset root.
    pub discovered: usize,
    /// Records successfully written and committed.
    pub ingested: usize,
    /// Transaction commits, including the final partial one.
    pub commits: usize,
    /// Per-file failures, in enumeration order.
    pub errors: Vec<FileError>,
}

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("failed to enumerate {path}: {source}")]
    Walk {
        path: PathBuf,
        source: io::Error,
    },

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Ingest the configured dataset tree into its store.
///
/// Walks `<dataset_root>/<dataset_name>`, encodes every file, and writes
/// records in commit batches of [`COMMIT_EVERY`]. A file that fails to read
/// or decode is reported and skipped; the run only aborts on store-level
/// failures (open, write, commit, capacity). The store is closed exactly
/// once, on both the success and the failure path, and `on_progress` is
/// invoked synchronously from the ingestion thread.
pub fn ingest_tree<F>(
    config: &IngestConfig,
    mut on_progress: F,
) -> Result<IngestReport, IngestError>
where
    F: FnMut(IngestEvent<'_>),
{
    let source_root = config.dataset_dir();
    let files = walk::enumerate_files(&source_root).map_err(|source| IngestError::Walk {
        path: source_root.clone(),
        source,
    })?;
    info!(total = files.len(), root = %source_root.display(), "enumerated dataset");
    on_progress(IngestEvent::Discovered { total: files.len() });

    let store = Store::create(
        &config.store_path(),
        config.map_size_bytes,
        config.durability,
    )?;
    let result = ingest_files(&store, config, &source_root, &files, &mut on_progress);
    store.close();
    result
}

fn ingest_files<F>(
    store: &Store,
    config: &IngestConfig,
    source_root: &Path,
    files: &[PathBuf],
    on_progress: &mut F,
) -> Result<IngestReport, IngestError>
where
    F: FnMut(IngestEvent<'_>),
{
    let total = files.len();
    let mut txn = store.begin_write()?;
    let mut ingested = 0usize;
    let mut commits = 0usize;
    let mut errors = Vec::new();

    for path in files {
        let key = key::derive_key(&config.dataset_name, source_root, path);
        match encode::encode_file(path) {
            Ok(value) => {
                txn.put(key.as_bytes(), &value)?;
                ingested += 1;
                debug!(%key, bytes = value.len(), "adding");
                on_progress(IngestEvent::Stored {
                    key: &key,
                    processed: ingested,
                    total,
                });

                if ingested % COMMIT_EVERY == 0 {
                    txn.commit()?;
                    commits += 1;
                    on_progress(IngestEvent::Committed { records: ingested });
                    txn = store.begin_write()?;
                }
            }
            Err(error) => {
                warn!(path = %path.display(), %error, "skipping file");
                on_progress(IngestEvent::Skipped {
                    path: path.as_path(),
                    error: &error,
                });
                errors.push(FileError {
                    path: path.clone(),
                    error,
                });
            }
        }
    }

    // Final, possibly partial (or empty) batch.
    txn.commit()?;
    commits += 1;
    on_progress(IngestEvent::Committed { records: ingested });

    if errors.is_empty() {
        info!(ingested, commits, "ingestion complete");
    } else {
        warn!(
            ingested,
            skipped = errors.len(),
            commits,
            "ingestion complete with skipped files"
        );
    }

    Ok(IngestReport {
        discovered: total,
        ingested,
        commits,
        errors,
    })
}
