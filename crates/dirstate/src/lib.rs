//! Synchronize a directory with a desired set of generated files.
//!
//! The security backends own a shared directory in which each snap's files
//! are identified by a name pattern. [`ensure_dir_state`] compares what is on
//! disk against what should be there and touches only what differs,
//! reporting which files changed so callers can decide whether a reload is
//! needed.
//!
//! # Example
//!
//! ```no_run
//! use dirstate::{FileState, ensure_dir_state};
//! use std::collections::BTreeMap;
//! use std::path::Path;
//!
//! let mut desired = BTreeMap::new();
//! desired.insert("70-snap.foo.rules".to_string(), FileState::new("# rules\n", 0o644));
//!
//! let outcome = ensure_dir_state(Path::new("/etc/udev/rules.d"), "70-snap.foo.*rules", &desired)?;
//! if outcome.has_changes() {
//!     println!("changed: {:?}, removed: {:?}", outcome.changed, outcome.removed);
//! }
//! outcome.into_result()?;
//! # Ok::<(), dirstate::Error>(())
//! ```

mod ensure;
mod error;
mod file_state;
mod pattern;

pub use ensure::{Changes, Outcome, ensure_dir_state};
pub use error::{Error, FileFailure, FileOp, Result};
pub use file_state::FileState;
pub use pattern::Pattern;
