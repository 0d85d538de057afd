//! The state document: installed snaps and their connections.
//!
//! ```toml
//! [[snaps]]
//! name = "core"
//! type = "os"
//!
//! [[snaps]]
//! name = "hub"
//! apps.daemon = {}
//! plugs.radio = { interface = "zigbee-dongle" }
//!
//! [hook_dirs]
//! hub = "/snap/hub/current/meta/hooks"
//!
//! [[connections]]
//! plug = "hub:radio"
//! slot = "core:zigbee-dongle"
//! ```

use crate::config::Config;
use crate::error::{Error, Result};
use interfaces::implicit::{add_implicit_hooks, add_implicit_slots};
use interfaces::{HostFs, PlugRef, Repository, SlotRef, SnapInfo};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct State {
    pub snaps: Vec<SnapInfo>,

    /// Directories scanned for hooks a snap does not declare.
    pub hook_dirs: BTreeMap<String, PathBuf>,

    pub connections: Vec<Connection>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Connection {
    pub plug: String,
    pub slot: String,
}

impl State {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| Error::StateRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content).map_err(|e| match e {
            Error::StateParse { message, .. } => Error::StateParse {
                path: path.to_path_buf(),
                message,
            },
            other => other,
        })
    }

    pub fn parse(toml: &str) -> Result<Self> {
        toml::from_str(toml).map_err(|e| Error::StateParse {
            path: PathBuf::new(),
            message: e.to_string(),
        })
    }

    /// Build a repository holding every snap and connection.
    ///
    /// OS snaps receive their implicit slots before being added, so
    /// connections may name them.
    pub fn into_repository(self, config: &Config, fs: Arc<dyn HostFs>) -> Result<Repository> {
        let mut repo = Repository::with_builtins(&config.builtin_config(), Arc::clone(&fs))?;
        let implicit = config.implicit_config();

        for mut snap in self.snaps {
            add_implicit_slots(&mut snap, &implicit, &*fs);
            if let Some(dir) = self.hook_dirs.get(&snap.name) {
                add_implicit_hooks(&mut snap, dir, &*fs).map_err(|source| Error::Hooks {
                    snap: snap.name.clone(),
                    source,
                })?;
            }
            repo.add_snap(snap)?;
        }

        for conn in self.connections {
            let (plug_snap, plug) = parse_ref(&conn.plug)?;
            let (slot_snap, slot) = parse_ref(&conn.slot)?;
            repo.connect(PlugRef::new(plug_snap, plug), SlotRef::new(slot_snap, slot))?;
        }
        debug!(snaps = repo.snaps().count(), "loaded state");
        Ok(repo)
    }
}

fn parse_ref(s: &str) -> Result<(&str, &str)> {
    match s.split_once(':') {
        Some((snap, name)) if !snap.is_empty() && !name.is_empty() => Ok((snap, name)),
        _ => Err(Error::InvalidRef(s.to_string())),
    }
}
