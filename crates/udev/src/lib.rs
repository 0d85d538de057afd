//! udev integration: tag the device nodes each snap app may access.
//!
//! Interfaces contribute udev snippets for the apps and hooks of a snap.
//! The [`Backend`] combines them into rule files under the udev rules
//! directory, one shared by all apps of the snap and one per hook, and
//! reloads udev whenever a file actually changed.
//!
//! If a call fails it should be retried by the caller with a sensible
//! strategy. A failed reload leaves the rules on disk current; the next
//! successful reload picks them up.

mod backend;
mod combine;
mod error;
mod reload;

pub use backend::{Backend, DEFAULT_RULES_DIR};
pub use combine::{RULES_HEADER, RULES_MODE, combine_snippets, rules_file_name, snap_rules_glob};
pub use error::{Error, ReloadError, Result};
pub use reload::{CommandReloader, Reloader, default_reload_commands};
