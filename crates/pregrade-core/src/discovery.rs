//! Submission discovery and anonymization.
//!
//! Each top-level file or folder of the homework root is one submission.
//! Submissions are aliased `001`, `002`, ... in case-insensitive name order
//! and copied into a private working directory per alias.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::extraction::FileKind;
use crate::{RESERVED_NAMES, SubmissionUnit};

pub const NOTE_SINGLE_FILE: &str = "single file";
pub const NOTE_FOLDER: &str = "multi-file folder";

#[derive(Error, Debug)]
pub enum DiscoveryError {
    #[error("cannot read submissions folder {path}: {source}")]
    ReadRoot {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("cannot create working directory {path}: {source}")]
    WorkDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Hidden entries start with `.` or `__`.
pub fn is_hidden(name: &str) -> bool {
    name.starts_with('.') || name.starts_with("__")
}

/// Whether `name` matches one of [`RESERVED_NAMES`], ignoring case.
pub fn is_reserved(name: &str) -> bool {
    RESERVED_NAMES
        .iter()
        .any(|reserved| name.eq_ignore_ascii_case(reserved))
}

/// Alias for the `n`-th (1-based) discovered submission.
pub fn alias_for(n: usize) -> String {
    format!("{:03}", n)
}

/// Outcome of scanning a homework root.
#[derive(Debug, Default)]
pub struct Discovery {
    pub units: Vec<SubmissionUnit>,
    /// One message per entry that exists but could not be used.
    pub skipped: Vec<String>,
}

/// Scan `root`, assign aliases and copy each submission under
/// `students_root/<alias>/`.
///
/// Entries that are neither files nor directories (e.g. broken links),
/// symlinks to folders, and entries that fail to copy are skipped without
/// consuming an alias and reported in [`Discovery::skipped`]. Only an
/// unreadable root is an error.
pub fn discover_submissions(
    root: &Path,
    students_root: &Path,
) -> Result<Discovery, DiscoveryError> {
    let read_dir = fs::read_dir(root).map_err(|source| DiscoveryError::ReadRoot {
        path: root.to_path_buf(),
        source,
    })?;

    let mut discovery = Discovery::default();
    let mut entries: Vec<(String, PathBuf)> = Vec::new();
    for entry in read_dir {
        match entry {
            Ok(e) => entries.push((e.file_name().to_string_lossy().to_string(), e.path())),
            Err(e) => {
                tracing::warn!(root = %root.display(), error = %e, "skipping unreadable entry");
                discovery.skipped.push(format!(
                    "Skipped an unreadable entry in {}: {}.",
                    root.display(),
                    e
                ));
            }
        }
    }
    entries.retain(|(name, _)| !is_hidden(name) && !is_reserved(name));
    entries.sort_by_key(|(name, _)| name.to_lowercase());

    fs::create_dir_all(students_root).map_err(|source| DiscoveryError::WorkDir {
        path: students_root.to_path_buf(),
        source,
    })?;

    for (name, path) in entries {
        let mut skip = |reason: String| {
            tracing::warn!(path = %path.display(), reason = %reason, "skipping submission");
            discovery
                .skipped
                .push(format!("Skipped submission {}: {}.", name, reason));
        };

        let is_link = fs::symlink_metadata(&path)
            .map(|m| m.file_type().is_symlink())
            .unwrap_or(false);
        let metadata = match fs::metadata(&path) {
            Ok(m) => m,
            Err(e) => {
                skip(e.to_string());
                continue;
            }
        };
        if is_link && metadata.is_dir() {
            skip("symbolic link to a folder".to_string());
            continue;
        }
        if !metadata.is_dir() && !metadata.is_file() {
            skip("neither a file nor a folder".to_string());
            continue;
        }

        let alias_id = alias_for(discovery.units.len() + 1);
        let normalized_dir = students_root.join(&alias_id);
        let copied = fs::create_dir_all(&normalized_dir).and_then(|_| {
            let dst = normalized_dir.join(&name);
            if metadata.is_dir() {
                copy_dir_recursive(&path, &dst)
            } else {
                fs::copy(&path, &dst).map(|_| ())
            }
        });
        if let Err(e) = copied {
            skip(format!("copy failed ({})", e));
            let _ = fs::remove_dir_all(&normalized_dir);
            continue;
        }

        let notes = if metadata.is_dir() {
            NOTE_FOLDER
        } else {
            NOTE_SINGLE_FILE
        };
        tracing::debug!(alias = %alias_id, name = %name, notes, "discovered submission");

        discovery.units.push(SubmissionUnit {
            alias_id,
            original_name: name,
            original_path: fs::canonicalize(&path).unwrap_or(path),
            normalized_dir: fs::canonicalize(&normalized_dir).unwrap_or(normalized_dir),
            notes: notes.to_string(),
        });
    }

    Ok(discovery)
}

/// Recursively copy `src` into `dst`. Symlinked files are copied as
/// regular files; symlinked folders are not followed.
pub fn copy_dir_recursive(src: &Path, dst: &Path) -> io::Result<()> {
    fs::create_dir_all(dst)?;
    for entry in fs::read_dir(src)? {
        let entry = entry?;
        let from = entry.path();
        let to = dst.join(entry.file_name());
        let file_type = entry.file_type()?;
        if file_type.is_dir() {
            copy_dir_recursive(&from, &to)?;
        } else if file_type.is_file() {
            fs::copy(&from, &to)?;
        } else if file_type.is_symlink() {
            match fs::metadata(&from) {
                Ok(m) if m.is_file() => {
                    fs::copy(&from, &to)?;
                }
                Ok(_) => {
                    tracing::debug!(path = %from.display(), "not following folder link");
                }
                Err(e) => {
                    tracing::debug!(path = %from.display(), error = %e, "skipping broken link");
                }
            }
        }
    }
    Ok(())
}

/// Collect the PDF/PNG/JPG files of an alias directory, pruning reserved
/// subdirectories, sorted case-insensitively by file name.
pub fn gather_submission_files(dir: &Path) -> io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    walk(dir, &mut files)?;
    files.sort_by_key(|p| {
        p.file_name()
            .map(|n| n.to_string_lossy().to_lowercase())
            .unwrap_or_default()
    });
    Ok(files)
}

fn walk(dir: &Path, files: &mut Vec<PathBuf>) -> io::Result<()> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        let name = entry.file_name().to_string_lossy().to_string();
        if entry.file_type()?.is_dir() {
            if !is_reserved(&name) {
                walk(&path, files)?;
            }
        } else if path.is_file() && FileKind::from_path(&path).is_some() {
            files.push(path);
        }
    }
    Ok(())
}
