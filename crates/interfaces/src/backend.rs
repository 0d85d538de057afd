//! Security backend trait.

use crate::{SecuritySystem, SnapInfo, SnippetSource};

/// A component that keeps one security system in sync with the snippets
/// affecting each snap.
///
/// Backends commit independently of each other. A failed call should be
/// retried by the caller; backends never retry internally.
pub trait SecurityBackend {
    type Error: std::error::Error;

    /// The security system this backend maintains.
    fn name(&self) -> SecuritySystem;

    /// Install or refresh the rules for a snap.
    fn setup(&self, snap: &SnapInfo, dev_mode: bool, source: &dyn SnippetSource) -> Result<(), Self::Error>;

    /// Delete every rule belonging to a snap.
    fn remove(&self, snap_name: &str) -> Result<(), Self::Error>;
}
