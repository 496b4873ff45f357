//! Cairn - Dataset-to-LMDB bulk loader
//!
//! This library packs a directory tree of media files (images, NumPy arrays)
//! into an LMDB store keyed by normalized relative path, for fast
//! random-access reads during training and inference workloads.

pub mod config;
pub mod encode;
pub mod ingest;
pub mod key;
pub mod store;
pub mod walk;

pub use config::{ConfigError, IngestConfig, gigabytes};
pub use encode::{EncodeError, FileKind, classify, encode_file};
pub use ingest::{
    COMMIT_EVERY, FileError, IngestError, IngestEvent, IngestReport, ingest_tree,
};
pub use key::derive_key;
pub use store::{Durability, Store, StoreError, WriteTxn};
pub use walk::enumerate_files;
