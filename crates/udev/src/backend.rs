//! The udev security backend.

use crate::combine::{combine_snippets, snap_rules_glob};
use crate::{Error, Reloader, Result};
use dirstate::{Changes, FileState};
use interfaces::{SecurityBackend, SecuritySystem, SnapInfo, SnippetSource, validate_snap_name};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

pub const DEFAULT_RULES_DIR: &str = "/etc/udev/rules.d";

/// Maintains the udev rules that tag device nodes for snap apps.
///
/// One pass per call: collect snippets, combine, synchronize the rules
/// directory and reload udev only if a file changed. Calls for different
/// snaps may run concurrently; calls for the same snap must not.
#[derive(Debug)]
pub struct Backend<R> {
    rules_dir: PathBuf,
    reloader: R,
}

impl<R: Reloader> Backend<R> {
    pub fn new(rules_dir: impl Into<PathBuf>, reloader: R) -> Self {
        Self {
            rules_dir: rules_dir.into(),
            reloader,
        }
    }

    pub fn rules_dir(&self) -> &Path {
        &self.rules_dir
    }

    /// Install or refresh rules for `snap`, returning what changed on disk.
    ///
    /// udev has no complain mode, so there is no dev-mode variant.
    pub fn setup_snap(&self, snap: &SnapInfo, source: &dyn SnippetSource) -> Result<Changes> {
        check_name(&snap.name)?;
        let snippets = source
            .security_snippets_for_snap(&snap.name, SecuritySystem::UDev)
            .map_err(|source| Error::Snippets {
                snap: snap.name.clone(),
                source,
            })?;
        debug!(snap = %snap.name, tags = snippets.len(), "collected udev snippets");
        let content = combine_snippets(snap, &snippets);
        self.ensure_rules(&snap.name, &content)
    }

    /// Delete every rule file of `snap_name`, returning what was removed.
    pub fn remove_snap(&self, snap_name: &str) -> Result<Changes> {
        check_name(snap_name)?;
        self.ensure_rules(snap_name, &BTreeMap::new())
    }

    fn ensure_rules(&self, snap_name: &str, content: &BTreeMap<String, FileState>) -> Result<Changes> {
        let sync_err = |source| Error::Sync {
            snap: snap_name.to_string(),
            source,
        };
        let outcome = dirstate::ensure_dir_state(&self.rules_dir, &snap_rules_glob(snap_name), content)
            .map_err(sync_err)?;

        // Reload even if some files failed; the ones that did change must
        // become visible.
        let reloaded = if outcome.has_changes() {
            info!(
                snap = snap_name,
                changed = ?outcome.changed,
                removed = ?outcome.removed,
                "udev rules changed, reloading"
            );
            self.reloader.reload().map_err(|source| Error::Reload {
                snap: snap_name.to_string(),
                source,
            })
        } else {
            Ok(())
        };
        if let Err(e) = &reloaded {
            warn!(snap = snap_name, error = %e, "udev reload failed; rules on disk are current");
        }

        let changes = outcome.into_result().map_err(sync_err)?;
        reloaded?;
        Ok(changes)
    }
}

// Each snap must own a disjoint set of file names in the rules directory.
fn check_name(snap_name: &str) -> Result<()> {
    validate_snap_name(snap_name).map_err(|source| Error::InvalidName {
        snap: snap_name.to_string(),
        source,
    })
}

impl<R: Reloader> SecurityBackend for Backend<R> {
    type Error = Error;

    fn name(&self) -> SecuritySystem {
        SecuritySystem::UDev
    }

    fn setup(&self, snap: &SnapInfo, _dev_mode: bool, source: &dyn SnippetSource) -> Result<()> {
        self.setup_snap(snap, source).map(|_| ())
    }

    fn remove(&self, snap_name: &str) -> Result<()> {
        self.remove_snap(snap_name).map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ReloadError;
    use interfaces::{SecuritySnippets, SnapType};
    use std::cell::{Cell, RefCell};
    use std::fs;
    use tempfile::tempdir;

    #[derive(Default)]
    struct CountingReloader {
        calls: Cell<usize>,
        fail: bool,
    }

    impl Reloader for &CountingReloader {
        fn reload(&self) -> std::result::Result<(), ReloadError> {
            self.calls.set(self.calls.get() + 1);
            if self.fail {
                return Err(ReloadError::NotConfigured);
            }
            Ok(())
        }
    }

    /// Snippet source returning a fixed map that tests can swap.
    #[derive(Default)]
    struct FixedSource(RefCell<SecuritySnippets>);

    impl FixedSource {
        fn set(&self, entries: &[(&str, &str)]) {
            let mut map = SecuritySnippets::new();
            for (tag, snippet) in entries {
                map.entry(tag.to_string()).or_default().push(snippet.as_bytes().to_vec());
            }
            *self.0.borrow_mut() = map;
        }
    }

    impl SnippetSource for FixedSource {
        fn security_snippets_for_snap(&self, _snap: &str, system: SecuritySystem) -> interfaces::Result<SecuritySnippets> {
            assert_eq!(system, SecuritySystem::UDev);
            Ok(self.0.borrow().clone())
        }
    }

    struct FailingSource;

    impl SnippetSource for FailingSource {
        fn security_snippets_for_snap(&self, snap: &str, _system: SecuritySystem) -> interfaces::Result<SecuritySnippets> {
            Err(interfaces::Error::UnknownSnap(snap.to_string()))
        }
    }

    fn snap() -> SnapInfo {
        SnapInfo::new("foo", SnapType::App)
            .with_app("app", &[])
            .with_hook("configure", &[])
            .with_hook("install", &[])
    }

    #[test]
    fn test_setup_writes_rules_and_reloads() {
        let dir = tempdir().unwrap();
        let reloader = CountingReloader::default();
        let backend = Backend::new(dir.path(), &reloader);
        let source = FixedSource::default();
        source.set(&[("snap.foo.app", "TAG+=\"snap_foo_app\"")]);

        let changes = backend.setup_snap(&snap(), &source).unwrap();

        assert_eq!(changes.changed, vec!["70-snap.foo.rules"]);
        assert_eq!(reloader.calls.get(), 1);
        assert_eq!(
            fs::read_to_string(dir.path().join("70-snap.foo.rules")).unwrap(),
            "# This file is automatically generated.\nTAG+=\"snap_foo_app\"\n"
        );
    }

    #[test]
    fn test_unchanged_setup_does_not_reload() {
        let dir = tempdir().unwrap();
        let reloader = CountingReloader::default();
        let backend = Backend::new(dir.path(), &reloader);
        let source = FixedSource::default();
        source.set(&[("snap.foo.app", "x")]);

        backend.setup(&snap(), false, &source).unwrap();
        backend.setup(&snap(), false, &source).unwrap();
        let changes = backend.setup_snap(&snap(), &source).unwrap();

        assert!(changes.changed.is_empty() && changes.removed.is_empty());
        assert_eq!(reloader.calls.get(), 1);
    }

    #[test]
    fn test_setup_without_snippets_and_nothing_on_disk_is_silent() {
        let dir = tempdir().unwrap();
        let reloader = CountingReloader::default();
        let backend = Backend::new(dir.path().join("rules.d"), &reloader);

        backend.setup(&snap(), false, &FixedSource::default()).unwrap();

        assert_eq!(reloader.calls.get(), 0);
        assert!(dir.path().join("rules.d").is_dir());
    }

    #[test]
    fn test_setup_drops_stale_hook_file() {
        let dir = tempdir().unwrap();
        let reloader = CountingReloader::default();
        let backend = Backend::new(dir.path(), &reloader);
        let source = FixedSource::default();
        source.set(&[("snap.foo.app", "a"), ("snap.foo.hook.configure", "c")]);
        backend.setup(&snap(), false, &source).unwrap();

        source.set(&[("snap.foo.app", "a")]);
        let changes = backend.setup_snap(&snap(), &source).unwrap();

        assert!(changes.changed.is_empty());
        assert_eq!(changes.removed, vec!["70-snap.foo.hook.configure.rules"]);
        assert_eq!(reloader.calls.get(), 2);
    }

    #[test]
    fn test_remove_deletes_every_file_and_reloads_once() {
        let dir = tempdir().unwrap();
        let reloader = CountingReloader::default();
        let backend = Backend::new(dir.path(), &reloader);
        for name in [
            "70-snap.foo.rules",
            "70-snap.foo.hook.configure.rules",
            "70-snap.foo.hook.install.rules",
        ] {
            fs::write(dir.path().join(name), "stale").unwrap();
        }
        fs::write(dir.path().join("70-snap.bar.rules"), "keep").unwrap();

        let changes = backend.remove_snap("foo").unwrap();

        assert_eq!(changes.removed.len(), 3);
        assert_eq!(reloader.calls.get(), 1);
        assert!(dir.path().join("70-snap.bar.rules").exists());

        backend.remove("foo").unwrap();
        assert_eq!(reloader.calls.get(), 1);
    }

    #[test]
    fn test_reload_failure_keeps_written_rules() {
        let dir = tempdir().unwrap();
        let reloader = CountingReloader {
            fail: true,
            ..Default::default()
        };
        let backend = Backend::new(dir.path(), &reloader);
        let source = FixedSource::default();
        source.set(&[("snap.foo.app", "x")]);

        let err = backend.setup(&snap(), false, &source).unwrap_err();
        assert!(matches!(err, Error::Reload { ref snap, .. } if snap == "foo"));
        assert!(dir.path().join("70-snap.foo.rules").exists());

        // the next pass sees current files and does not retry the reload
        backend.setup(&snap(), false, &source).unwrap();
        assert_eq!(reloader.calls.get(), 1);
    }

    #[test]
    fn test_snippet_failure_writes_nothing() {
        let dir = tempdir().unwrap();
        let reloader = CountingReloader::default();
        let backend = Backend::new(dir.path(), &reloader);

        let err = backend.setup(&snap(), false, &FailingSource).unwrap_err();
        assert_eq!(
            err.to_string(),
            r#"cannot obtain udev security snippets for snap "foo": unknown snap "foo""#
        );
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
        assert_eq!(reloader.calls.get(), 0);
    }

    #[test]
    fn test_partial_failure_still_reloads() {
        let dir = tempdir().unwrap();
        fs::create_dir(dir.path().join("70-snap.foo.hook.install.rules")).unwrap();
        fs::write(dir.path().join("70-snap.foo.hook.install.rules").join("x"), "").unwrap();
        let reloader = CountingReloader::default();
        let backend = Backend::new(dir.path(), &reloader);
        let source = FixedSource::default();
        source.set(&[("snap.foo.app", "a"), ("snap.foo.hook.install", "i")]);

        let err = backend.setup(&snap(), false, &source).unwrap_err();

        assert!(matches!(err, Error::Sync { .. }));
        assert!(dir.path().join("70-snap.foo.rules").is_file());
        assert_eq!(reloader.calls.get(), 1);
    }

    #[test]
    fn test_remove_rejects_glob_in_snap_name() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("70-snap.bar.rules"), "bar").unwrap();
        fs::write(dir.path().join("70-snap.baz.hook.install.rules"), "baz").unwrap();
        let reloader = CountingReloader::default();
        let backend = Backend::new(dir.path(), &reloader);

        for name in ["*", "ba*", "b?r", "../bar"] {
            let err = backend.remove(name).unwrap_err();
            assert!(matches!(err, Error::InvalidName { .. }), "{name}");
        }

        assert!(dir.path().join("70-snap.bar.rules").exists());
        assert!(dir.path().join("70-snap.baz.hook.install.rules").exists());
        assert_eq!(reloader.calls.get(), 0);
    }

    #[test]
    fn test_setup_rejects_invalid_snap_name() {
        let dir = tempdir().unwrap();
        let reloader = CountingReloader::default();
        let backend = Backend::new(dir.path(), &reloader);
        // constructed directly, without binding
        let snap = SnapInfo::new("*", SnapType::App).with_app("app", &[]);

        let err = backend.setup(&snap, false, &FixedSource::default()).unwrap_err();
        assert_eq!(
            err.to_string(),
            r#"cannot manage udev rules for snap "*": invalid snap name: "*""#
        );
    }

    #[test]
    fn test_backend_name() {
        let reloader = CountingReloader::default();
        assert_eq!(Backend::new("/tmp", &reloader).name(), SecuritySystem::UDev);
    }
}
