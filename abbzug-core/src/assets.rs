//! Static asset copying.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;
use walkdir::WalkDir;

#[derive(Debug, Error)]
pub enum AssetError {
    #[error("IO error copying {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("could not walk {path}: {source}")]
    Walk {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },
}

/// Mirror `source_dir` into `dest_dir`, overwriting files that already exist.
///
/// Returns the number of files copied. A missing source directory copies
/// nothing.
pub fn copy_tree(source_dir: &Path, dest_dir: &Path) -> Result<usize, AssetError> {
    if !source_dir.is_dir() {
        debug!(dir = %source_dir.display(), "static directory missing, nothing to copy");
        return Ok(0);
    }

    let mut copied = 0;
    for entry in WalkDir::new(source_dir).sort_by_file_name() {
        let entry = entry.map_err(|source| AssetError::Walk {
            path: source_dir.to_path_buf(),
            source,
        })?;
        let Ok(relative) = entry.path().strip_prefix(source_dir) else {
            continue;
        };
        let target = dest_dir.join(relative);

        let io_error = |source| AssetError::Io {
            path: entry.path().to_path_buf(),
            source,
        };

        if entry.file_type().is_dir() {
            fs::create_dir_all(&target).map_err(io_error)?;
        } else if entry.file_type().is_file() {
            fs::copy(entry.path(), &target).map_err(io_error)?;
            debug!(from = %entry.path().display(), to = %target.display(), "copied");
            copied += 1;
        }
    }

    Ok(copied)
}
