//! Candidate file enumeration.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::warn;
use walkdir::WalkDir;

/// Enumerate every ingestible file under `root`.
///
/// Recurses into subdirectories and follows symbolic links that point into
/// other subtrees. Files whose base name starts with `.` are excluded;
/// hidden *directories* are still descended into, so only the file name
/// itself decides visibility. The full list is materialized up front so the
/// caller knows the total count before processing begins.
///
/// Fails if `root` is missing, unreadable, or not a directory. Individual
/// unreadable entries (including symlink loops) are logged and skipped.
pub fn enumerate_files(root: &Path) -> io::Result<Vec<PathBuf>> {
    let metadata = fs::metadata(root)?;
    if !metadata.is_dir() {
        return Err(io::Error::new(
            io::ErrorKind::NotADirectory,
            format!("{} is not a directory", root.display()),
        ));
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(root).follow_links(true) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                warn!(%err, "skipping unreadable entry");
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        if entry.file_name().to_string_lossy().starts_with('.') {
            continue;
        }
        files.push(entry.into_path());
    }
    Ok(files)
}
