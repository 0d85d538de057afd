//! udev backend error types.

use thiserror::Error;

/// Failure of the reload trigger.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ReloadError {
    /// The reload command could not be started.
    #[error("cannot run {command:?}: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// The reload command ran and failed.
    #[error("{command:?} failed with {status}: {stderr}")]
    Failed {
        command: String,
        status: std::process::ExitStatus,
        stderr: String,
    },

    /// No reload command is configured.
    #[error("no reload command configured")]
    NotConfigured,
}

/// udev backend errors. Each carries the snap and the stage that failed.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// The snap name cannot be turned into a rule file pattern.
    #[error("cannot manage udev rules for snap {snap:?}: {source}")]
    InvalidName {
        snap: String,
        #[source]
        source: interfaces::Error,
    },

    #[error("cannot obtain udev security snippets for snap {snap:?}: {source}")]
    Snippets {
        snap: String,
        #[source]
        source: interfaces::Error,
    },

    #[error("cannot synchronize udev rules for snap {snap:?}: {source}")]
    Sync {
        snap: String,
        #[source]
        source: dirstate::Error,
    },

    #[error("cannot reload udev rules for snap {snap:?}: {source}")]
    Reload {
        snap: String,
        #[source]
        source: ReloadError,
    },
}

pub type Result<T> = std::result::Result<T, Error>;
