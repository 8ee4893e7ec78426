// entry.rs
//!
//! The result record yielded to the caller: a `(path, file)` pair whose
//! split follows `Path::parent`/`Path::file_name` rather than manual
//! string-length arithmetic over a combined buffer.

use std::path::{Path, PathBuf};

/// Entry yielded by [`crate::walker::Walker::read`].
///
/// In path+filename mode, `path` is the directory containing the match
/// and `file` is its basename. In filepath mode, or in path-only mode
/// where the directory itself is the target, `path` is the full matching
/// path and `file` is `None`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryRecord {
    pub path: PathBuf,
    pub file: Option<String>,
}

impl EntryRecord {
    pub fn directory_target(path: PathBuf) -> Self {
        Self { path, file: None }
    }

    pub fn with_file(path: PathBuf, file: impl Into<String>) -> Self {
        Self {
            path,
            file: Some(file.into()),
        }
    }

    /// Reconstructs the full path the driver produced for this entry:
    /// `path` alone when there's no `file`, otherwise `path.join(file)`.
    pub fn full_path(&self) -> PathBuf {
        match &self.file {
            Some(f) => self.path.join(f),
            None => self.path.clone(),
        }
    }
}

/// Splits a full candidate path into its directory portion and basename,
/// matching the invariant that a root-level match does not produce an
/// empty directory portion.
pub fn split_path_and_name(full: &Path) -> (PathBuf, Option<String>) {
    let name = full.file_name().map(|n| n.to_string_lossy().into_owned());
    let dir = match (full.parent(), &name) {
        (Some(parent), Some(_)) if parent.as_os_str().is_empty() => PathBuf::from("."),
        (Some(parent), Some(_)) => parent.to_path_buf(),
        _ => full.to_path_buf(),
    };
    (dir, name)
}
