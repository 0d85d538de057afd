//! Telling udev to pick up changed rules.

use crate::ReloadError;
use std::process::Command;
use tracing::debug;

/// Refreshes live udev state from the rules on disk.
///
/// Implementations must be idempotent; they are called after every
/// synchronization pass that changed or removed a rule file.
pub trait Reloader {
    fn reload(&self) -> Result<(), ReloadError>;
}

/// Runs a fixed sequence of commands, stopping at the first failure.
#[derive(Debug, Clone)]
pub struct CommandReloader {
    commands: Vec<Vec<String>>,
}

impl CommandReloader {
    pub fn new(commands: Vec<Vec<String>>) -> Self {
        Self { commands }
    }

    /// `udevadm control --reload-rules` followed by `udevadm trigger`.
    pub fn udevadm() -> Self {
        Self::new(default_reload_commands())
    }
}

impl Default for CommandReloader {
    fn default() -> Self {
        Self::udevadm()
    }
}

pub fn default_reload_commands() -> Vec<Vec<String>> {
    vec![
        vec!["udevadm".into(), "control".into(), "--reload-rules".into()],
        vec!["udevadm".into(), "trigger".into()],
    ]
}

impl Reloader for CommandReloader {
    fn reload(&self) -> Result<(), ReloadError> {
        if self.commands.is_empty() {
            return Err(ReloadError::NotConfigured);
        }
        for argv in &self.commands {
            let Some((program, args)) = argv.split_first() else {
                return Err(ReloadError::NotConfigured);
            };
            let command = argv.join(" ");
            debug!(%command, "running reload command");
            let output = Command::new(program)
                .args(args)
                .output()
                .map_err(|source| ReloadError::Spawn {
                    command: command.clone(),
                    source,
                })?;
            if !output.status.success() {
                return Err(ReloadError::Failed {
                    command,
                    status: output.status,
                    stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
                });
            }
        }
        Ok(())
    }
}
