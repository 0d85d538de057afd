//! Bring a directory in line with a desired set of files.

use crate::{Error, FileFailure, FileOp, FileState, Pattern, Result};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::io::{self, Write};
use std::os::unix::fs::{DirBuilderExt, PermissionsExt};
use std::path::Path;
use tracing::{debug, warn};

const DIR_MODE: u32 = 0o755;

/// What a synchronization pass did.
#[derive(Debug, Default)]
pub struct Outcome {
    /// Files written because they were new or different.
    pub changed: Vec<String>,

    /// Files deleted because they are no longer desired.
    pub removed: Vec<String>,

    /// Files that could not be written or removed.
    pub failures: Vec<FileFailure>,
}

impl Outcome {
    /// Whether anything on disk was modified.
    pub fn has_changes(&self) -> bool {
        !self.changed.is_empty() || !self.removed.is_empty()
    }

    /// Fail if any file could not be brought to its desired state.
    pub fn into_result(self) -> Result<Changes> {
        if !self.failures.is_empty() {
            return Err(Error::Incomplete(self.failures));
        }
        Ok(Changes {
            changed: self.changed,
            removed: self.removed,
        })
    }
}

/// A fully successful synchronization pass.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Changes {
    pub changed: Vec<String>,
    pub removed: Vec<String>,
}

/// Make the files in `dir` matching `pattern` equal to `desired`.
///
/// Desired files whose content or mode differ from disk are rewritten
/// atomically; matching files not in `desired` are deleted; everything else
/// is left alone. The directory is created if missing.
///
/// A failure on one file does not stop work on the others; per-file
/// failures are collected in [`Outcome::failures`]. Only problems that
/// prevent the pass from starting are returned as errors.
pub fn ensure_dir_state(dir: &Path, pattern: &str, desired: &BTreeMap<String, FileState>) -> Result<Outcome> {
    let pattern = Pattern::new(pattern)?;
    for name in desired.keys() {
        if name.contains('/') || !pattern.matches(name) {
            return Err(Error::NameMismatch {
                name: name.clone(),
                pattern: pattern.as_str().to_string(),
            });
        }
    }

    fs::DirBuilder::new()
        .recursive(true)
        .mode(DIR_MODE)
        .create(dir)
        .map_err(|source| Error::CreateDir {
            path: dir.to_path_buf(),
            source,
        })?;

    let existing = matching_files(dir, &pattern)?;
    let mut outcome = Outcome::default();

    for (name, state) in desired {
        let path = dir.join(name);
        if existing.contains(name) && is_current(&path, state) {
            continue;
        }
        match write_atomic(dir, &path, state) {
            Ok(()) => {
                debug!(file = %path.display(), "wrote file");
                outcome.changed.push(name.clone());
            }
            Err(source) => {
                warn!(file = %path.display(), error = %source, "cannot write file");
                outcome.failures.push(FileFailure {
                    name: name.clone(),
                    op: FileOp::Write,
                    source,
                });
            }
        }
    }

    for name in existing.iter().filter(|name| !desired.contains_key(*name)) {
        let path = dir.join(name);
        match fs::remove_file(&path) {
            Ok(()) => {
                debug!(file = %path.display(), "removed file");
                outcome.removed.push(name.clone());
            }
            // already gone, which is the desired state
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(source) => {
                warn!(file = %path.display(), error = %source, "cannot remove file");
                outcome.failures.push(FileFailure {
                    name: name.clone(),
                    op: FileOp::Remove,
                    source,
                });
            }
        }
    }

    Ok(outcome)
}

fn matching_files(dir: &Path, pattern: &Pattern) -> Result<BTreeSet<String>> {
    let read_dir_err = |source| Error::ReadDir {
        path: dir.to_path_buf(),
        source,
    };
    let mut names = BTreeSet::new();
    for entry in fs::read_dir(dir).map_err(read_dir_err)? {
        let entry = entry.map_err(read_dir_err)?;
        let Ok(name) = entry.file_name().into_string() else {
            continue;
        };
        if !pattern.matches(&name) {
            continue;
        }
        if entry.file_type().map(|t| t.is_dir()).unwrap_or(false) {
            continue;
        }
        names.insert(name);
    }
    Ok(names)
}

fn is_current(path: &Path, state: &FileState) -> bool {
    let Ok(meta) = fs::symlink_metadata(path) else {
        return false;
    };
    if !meta.is_file() || meta.permissions().mode() & 0o7777 != state.mode {
        return false;
    }
    fs::read(path).map(|content| content == state.content).unwrap_or(false)
}

/// Write to a hidden temp file in `dir`, then rename over `path`.
///
/// Readers see either the old file or the complete new one.
fn write_atomic(dir: &Path, path: &Path, state: &FileState) -> io::Result<()> {
    let mut temp = tempfile::Builder::new().prefix(".").tempfile_in(dir)?;
    temp.write_all(&state.content)?;
    temp.as_file()
        .set_permissions(fs::Permissions::from_mode(state.mode))?;
    temp.as_file().sync_all()?;
    temp.persist(path).map_err(|e| e.error)?;
    Ok(())
}
