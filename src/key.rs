//! Record key derivation.

use std::path::Path;

/// Compute the store key for a file discovered under the dataset root.
///
/// The key is `<dataset_name>/<path relative to root>` with every path
/// separator normalized to a forward slash, so keys are identical across
/// host platforms. Pure; performs no I/O.
///
/// If `path` is not actually under `root` (a caller error), the full path is
/// used as the relative part rather than panicking. Two distinct files whose
/// normalized paths coincide (e.g. a unix filename containing a literal
/// backslash) derive the same key; the later write shadows the earlier one.
pub fn derive_key(dataset_name: &str, root: &Path, path: &Path) -> String {
    let relative = path
        .strip_prefix(root)
        .unwrap_or(path)
        .to_string_lossy()
        .replace('\\', "/");
    format!("{dataset_name}/{relative}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn joins_name_and_relative_path() {
        let root = PathBuf::from("/data/celeb");
        let path = root.join("real").join("frame_0001.png");
        assert_eq!(
            derive_key("celeb", &root, &path),
            "celeb/real/frame_0001.png"
        );
    }

    #[test]
    fn top_level_file() {
        let root = PathBuf::from("/data/celeb");
        assert_eq!(
            derive_key("celeb", &root, &root.join("list.txt")),
            "celeb/list.txt"
        );
    }

    #[cfg(unix)]
    #[test]
    fn backslashes_normalize_to_forward_slashes() {
        // On unix a backslash is a legal filename byte; normalization folds
        // it into the separator, which is where duplicate keys come from.
        let root = PathBuf::from("/data/celeb");
        assert_eq!(
            derive_key("celeb", &root, &root.join("real\\frame.png")),
            "celeb/real/frame.png"
        );
    }

    #[test]
    fn path_outside_root_falls_back_to_full_path() {
        let root = PathBuf::from("/data/celeb");
        let stray = PathBuf::from("/elsewhere/file.bin");
        assert_eq!(
            derive_key("celeb", &root, &stray),
            "celeb//elsewhere/file.bin"
        );
    }
}
