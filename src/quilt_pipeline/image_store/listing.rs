use std::path::{Path, PathBuf};

use tracing::debug;

use crate::quilt_pipeline::common::error::Result;

/// Lists the regular files of `dir` in lexical path order.
///
/// Directory enumeration order is filesystem dependent, so views are always
/// sorted before tiles are assigned. Sub-directories are skipped.
pub fn list_ordered_directory(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            debug!("Skipping sub-directory {}", entry.path().display());
            continue;
        }
        files.push(entry.path());
    }
    files.sort();
    Ok(files)
}
