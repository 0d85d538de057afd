//! CLI error types.

use std::path::PathBuf;
use thiserror::Error;

/// CLI errors.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// The configuration could not be loaded.
    #[error(transparent)]
    Config(#[from] crate::config::ConfigError),

    /// A command needs the state document but none is configured.
    #[error("no state document configured; set `state` in sandboxctl.toml or pass --state")]
    NoState,

    #[error("cannot read state document {path}: {source}")]
    StateRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot parse state document {path}: {message}")]
    StateParse { path: PathBuf, message: String },

    /// A connection endpoint is not of the form `snap:name`.
    #[error("invalid connection endpoint {0:?}, expected \"snap:name\"")]
    InvalidRef(String),

    #[error("cannot read hooks of snap {snap:?}: {source}")]
    Hooks {
        snap: String,
        #[source]
        source: std::io::Error,
    },

    /// The named snap is not in the state document.
    #[error("snap {0:?} is not installed")]
    SnapNotFound(String),

    #[error(transparent)]
    Interfaces(#[from] interfaces::Error),

    #[error(transparent)]
    Udev(#[from] udev::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
