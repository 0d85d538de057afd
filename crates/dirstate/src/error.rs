use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// What was being done to a file when it failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileOp {
    Write,
    Remove,
}

impl fmt::Display for FileOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileOp::Write => f.write_str("write"),
            FileOp::Remove => f.write_str("remove"),
        }
    }
}

/// A single file that could not be brought to its desired state.
#[derive(Debug)]
pub struct FileFailure {
    pub name: String,
    pub op: FileOp,
    pub source: std::io::Error,
}

impl fmt::Display for FileFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cannot {} {:?}: {}", self.op, self.name, self.source)
    }
}

/// Directory state errors.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// The glob pattern is malformed.
    #[error("invalid pattern {pattern:?}: {reason}")]
    InvalidPattern { pattern: String, reason: String },

    /// A desired file name does not match the pattern it is managed under.
    #[error("expected files must match pattern: {name:?} (pattern: {pattern:?})")]
    NameMismatch { name: String, pattern: String },

    /// The target directory could not be created.
    #[error("cannot create directory {}: {source}", path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The target directory could not be listed.
    #[error("cannot list directory {}: {source}", path.display())]
    ReadDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Some files could not be written or removed.
    #[error("{}", join_failures(.0))]
    Incomplete(Vec<FileFailure>),
}

fn join_failures(failures: &[FileFailure]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

pub type Result<T> = std::result::Result<T, Error>;
