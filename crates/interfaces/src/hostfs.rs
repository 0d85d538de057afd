//! Host filesystem inspection.
//!
//! Some interfaces render rules from live host state (resolved sysfs links,
//! discovered device nodes). They reach the host only through [`HostFs`] so
//! the rendering logic stays independent of any particular filesystem API.

use std::collections::BTreeMap;
use std::fmt::Debug;
use std::io;
use std::path::{Path, PathBuf};

/// An entry returned by [`HostFs::read_dir`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    pub name: String,
    pub is_symlink: bool,
}

/// Read-only view of the host filesystem.
pub trait HostFs: Send + Sync + Debug {
    /// Resolve every symbolic link in `path`. Fails on broken or cyclic links.
    fn eval_symlinks(&self, path: &Path) -> io::Result<PathBuf>;

    /// List a directory, sorted by name.
    fn read_dir(&self, dir: &Path) -> io::Result<Vec<DirEntry>>;

    fn read_to_string(&self, path: &Path) -> io::Result<String>;
}

/// The real host filesystem.
#[derive(Debug, Default, Clone, Copy)]
pub struct RealFs;

impl HostFs for RealFs {
    fn eval_symlinks(&self, path: &Path) -> io::Result<PathBuf> {
        std::fs::canonicalize(path)
    }

    fn read_dir(&self, dir: &Path) -> io::Result<Vec<DirEntry>> {
        let mut entries = Vec::new();
        for entry in std::fs::read_dir(dir)? {
            let entry = entry?;
            entries.push(DirEntry {
                name: entry.file_name().to_string_lossy().into_owned(),
                is_symlink: entry.file_type()?.is_symlink(),
            });
        }
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }

    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        std::fs::read_to_string(path)
    }
}

/// In-memory filesystem for tests and dry runs.
///
/// Files and symlinks are registered by absolute path; directories exist
/// implicitly as parents of registered entries.
#[derive(Debug, Default, Clone)]
pub struct MemFs {
    files: BTreeMap<PathBuf, String>,
    links: BTreeMap<PathBuf, PathBuf>,
}

impl MemFs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(mut self, path: impl Into<PathBuf>, content: impl Into<String>) -> Self {
        self.files.insert(path.into(), content.into());
        self
    }

    pub fn with_symlink(mut self, path: impl Into<PathBuf>, target: impl Into<PathBuf>) -> Self {
        self.links.insert(path.into(), target.into());
        self
    }

    fn not_found(path: &Path) -> io::Error {
        io::Error::new(
            io::ErrorKind::NotFound,
            format!("{} does not exist", path.display()),
        )
    }
}

impl HostFs for MemFs {
    fn eval_symlinks(&self, path: &Path) -> io::Result<PathBuf> {
        let mut hops = 0;
        let mut resolved = PathBuf::new();
        for component in path.components() {
            resolved.push(component);
            while let Some(target) = self.links.get(&resolved) {
                // Bounded like the kernel's link following.
                hops += 1;
                if hops > 40 {
                    return Err(io::Error::other(format!(
                        "too many levels of symbolic links: {}",
                        path.display()
                    )));
                }
                resolved = target.clone();
            }
        }
        if self.files.contains_key(&resolved) || self.has_children(&resolved) {
            Ok(resolved)
        } else {
            Err(Self::not_found(path))
        }
    }

    fn read_dir(&self, dir: &Path) -> io::Result<Vec<DirEntry>> {
        let mut entries: BTreeMap<String, bool> = BTreeMap::new();
        let files = self.files.keys().map(|p| (p, false));
        let links = self.links.keys().map(|p| (p, true));
        for (path, is_symlink) in files.chain(links) {
            let Ok(rest) = path.strip_prefix(dir) else {
                continue;
            };
            let Some(first) = rest.components().next() else {
                continue;
            };
            let name = first.as_os_str().to_string_lossy().into_owned();
            let direct = rest.components().count() == 1;
            let entry = entries.entry(name).or_insert(false);
            *entry |= direct && is_symlink;
        }
        if entries.is_empty() {
            return Err(Self::not_found(dir));
        }
        Ok(entries
            .into_iter()
            .map(|(name, is_symlink)| DirEntry { name, is_symlink })
            .collect())
    }

    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        let resolved = self.eval_symlinks(path)?;
        self.files
            .get(&resolved)
            .cloned()
            .ok_or_else(|| Self::not_found(path))
    }
}

impl MemFs {
    fn has_children(&self, dir: &Path) -> bool {
        self.files
            .keys()
            .chain(self.links.keys())
            .any(|p| p != dir && p.starts_with(dir))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memfs_follows_links() {
        let fs = MemFs::new()
            .with_file("/sys/devices/gpio/gpio5/value", "0")
            .with_symlink("/sys/class/gpio/gpio5", "/sys/devices/gpio/gpio5");

        let resolved = fs.eval_symlinks(Path::new("/sys/class/gpio/gpio5")).unwrap();
        assert_eq!(resolved, PathBuf::from("/sys/devices/gpio/gpio5"));
    }

    #[test]
    fn test_memfs_broken_and_cyclic_links_fail() {
        let fs = MemFs::new()
            .with_symlink("/dev/broken", "/dev/nowhere")
            .with_symlink("/dev/a", "/dev/b")
            .with_symlink("/dev/b", "/dev/a");

        assert!(fs.eval_symlinks(Path::new("/dev/broken")).is_err());
        assert!(fs.eval_symlinks(Path::new("/dev/a")).is_err());
    }

    #[test]
    fn test_memfs_read_dir() {
        let fs = MemFs::new()
            .with_symlink("/sys/class/gpio/gpiochip0", "/sys/devices/chip0")
            .with_file("/sys/class/gpio/export", "");

        let entries = fs.read_dir(Path::new("/sys/class/gpio")).unwrap();
        assert_eq!(
            entries,
            vec![
                DirEntry { name: "export".into(), is_symlink: false },
                DirEntry { name: "gpiochip0".into(), is_symlink: true },
            ]
        );
        assert!(fs.read_dir(Path::new("/nope")).is_err());
    }

    #[test]
    fn test_real_fs_resolves_symlink() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("target");
        std::fs::create_dir(&target).unwrap();
        let link = dir.path().join("link");
        std::os::unix::fs::symlink(&target, &link).unwrap();

        let resolved = RealFs.eval_symlinks(&link).unwrap();
        assert_eq!(resolved, target.canonicalize().unwrap());

        let entries = RealFs.read_dir(dir.path()).unwrap();
        assert_eq!(entries[0], DirEntry { name: "link".into(), is_symlink: true });
        assert_eq!(entries[1], DirEntry { name: "target".into(), is_symlink: false });
    }
}
