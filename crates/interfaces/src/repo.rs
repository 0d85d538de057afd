//! In-memory store of interfaces, snaps and connections.

use crate::builtin::{self, BuiltinConfig, BuiltinInterface};
use crate::{Error, HostFs, Interface, Result, SecuritySystem, SnapInfo, Snippet};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// Snippets for one snap and one security system, keyed by security tag.
pub type SecuritySnippets = BTreeMap<String, Vec<Snippet>>;

/// Anything that can produce the snippets affecting a snap.
pub trait SnippetSource {
    fn security_snippets_for_snap(&self, snap: &str, system: SecuritySystem) -> Result<SecuritySnippets>;
}

/// Identifies a plug by snap and plug name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PlugRef {
    pub snap: String,
    pub name: String,
}

/// Identifies a slot by snap and slot name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SlotRef {
    pub snap: String,
    pub name: String,
}

impl PlugRef {
    pub fn new(snap: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            snap: snap.into(),
            name: name.into(),
        }
    }
}

impl SlotRef {
    pub fn new(snap: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            snap: snap.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for PlugRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.snap, self.name)
    }
}

impl fmt::Display for SlotRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.snap, self.name)
    }
}

/// A plug connected to a slot.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ConnRef {
    pub plug: PlugRef,
    pub slot: SlotRef,
}

/// Interfaces, snaps and the connections between them.
///
/// Deciding which plugs connect to which slots is up to the caller; the
/// repository records connections and renders their snippets.
#[derive(Debug, Default)]
pub struct Repository {
    interfaces: BTreeMap<&'static str, BuiltinInterface>,
    snaps: BTreeMap<String, SnapInfo>,
    connections: BTreeSet<ConnRef>,
}

impl Repository {
    pub fn new() -> Self {
        Self::default()
    }

    /// A repository with every builtin interface registered.
    pub fn with_builtins(config: &BuiltinConfig, fs: Arc<dyn HostFs>) -> Result<Self> {
        let mut repo = Self::new();
        for iface in builtin::interfaces(config, fs) {
            repo.add_interface(iface)?;
        }
        Ok(repo)
    }

    pub fn add_interface(&mut self, iface: BuiltinInterface) -> Result<()> {
        let name = iface.name();
        if self.interfaces.contains_key(name) {
            return Err(Error::InterfaceInUse(name.to_string()));
        }
        self.interfaces.insert(name, iface);
        Ok(())
    }

    pub fn interface(&self, name: &str) -> Option<&BuiltinInterface> {
        self.interfaces.get(name)
    }

    pub fn interfaces(&self) -> impl Iterator<Item = &BuiltinInterface> {
        self.interfaces.values()
    }

    /// Add a snap, binding and validating its plugs and slots.
    ///
    /// Plugs and slots of interfaces this repository does not know are kept
    /// but contribute nothing.
    pub fn add_snap(&mut self, mut snap: SnapInfo) -> Result<()> {
        if self.snaps.contains_key(&snap.name) {
            return Err(Error::SnapInUse(snap.name));
        }
        snap.bind()?;

        for plug in snap.all_plugs() {
            match self.interfaces.get(plug.interface()) {
                Some(iface) => iface.sanitize_plug(&plug)?,
                None => warn!(snap = %snap.name, plug = plug.name, interface = plug.interface(), "plug of unknown interface"),
            }
        }
        for slot in snap.all_slots() {
            match self.interfaces.get(slot.interface()) {
                Some(iface) => iface.sanitize_slot(&slot)?,
                None => warn!(snap = %snap.name, slot = slot.name, interface = slot.interface(), "slot of unknown interface"),
            }
        }

        debug!(snap = %snap.name, plugs = snap.plugs.len(), slots = snap.slots.len(), "added snap");
        self.snaps.insert(snap.name.clone(), snap);
        Ok(())
    }

    /// Remove a snap that has no remaining connections.
    pub fn remove_snap(&mut self, name: &str) -> Result<SnapInfo> {
        if !self.snaps.contains_key(name) {
            return Err(Error::UnknownSnap(name.to_string()));
        }
        if self
            .connections
            .iter()
            .any(|c| c.plug.snap == name || c.slot.snap == name)
        {
            return Err(Error::SnapConnected(name.to_string()));
        }
        self.snaps
            .remove(name)
            .ok_or_else(|| Error::UnknownSnap(name.to_string()))
    }

    pub fn snap(&self, name: &str) -> Option<&SnapInfo> {
        self.snaps.get(name)
    }

    pub fn snaps(&self) -> impl Iterator<Item = &SnapInfo> {
        self.snaps.values()
    }

    /// Connect a plug to a slot of the same interface.
    pub fn connect(&mut self, plug: PlugRef, slot: SlotRef) -> Result<()> {
        let plug_snap = self
            .snaps
            .get(&plug.snap)
            .ok_or_else(|| Error::UnknownSnap(plug.snap.clone()))?;
        let plug_info = plug_snap.plug(&plug.name).ok_or_else(|| Error::UnknownPlug {
            snap: plug.snap.clone(),
            plug: plug.name.clone(),
        })?;
        let slot_snap = self
            .snaps
            .get(&slot.snap)
            .ok_or_else(|| Error::UnknownSnap(slot.snap.clone()))?;
        let slot_info = slot_snap.slot(&slot.name).ok_or_else(|| Error::UnknownSlot {
            snap: slot.snap.clone(),
            slot: slot.name.clone(),
        })?;

        if plug_info.interface() != slot_info.interface() {
            return Err(Error::InterfaceMismatch {
                plug: plug.to_string(),
                plug_interface: plug_info.interface().to_string(),
                slot: slot.to_string(),
                slot_interface: slot_info.interface().to_string(),
            });
        }
        if !self.interfaces.contains_key(plug_info.interface()) {
            return Err(Error::UnknownInterface(plug_info.interface().to_string()));
        }

        debug!(%plug, %slot, "connected");
        self.connections.insert(ConnRef { plug, slot });
        Ok(())
    }

    /// Disconnect a plug from a slot. Returns whether they were connected.
    pub fn disconnect(&mut self, plug: PlugRef, slot: SlotRef) -> bool {
        self.connections.remove(&ConnRef { plug, slot })
    }

    /// Connections touching the given snap on either side.
    pub fn connections_of<'a>(&'a self, snap: &'a str) -> impl Iterator<Item = &'a ConnRef> + 'a {
        self.connections
            .iter()
            .filter(move |c| c.plug.snap == snap || c.slot.snap == snap)
    }

    fn lookup_slot(&self, slot: &SlotRef) -> Result<&SnapInfo> {
        self.snaps
            .get(&slot.snap)
            .ok_or_else(|| Error::UnknownSnap(slot.snap.clone()))
    }

    fn lookup_plug(&self, plug: &PlugRef) -> Result<&SnapInfo> {
        self.snaps
            .get(&plug.snap)
            .ok_or_else(|| Error::UnknownSnap(plug.snap.clone()))
    }
}

fn add_snippet(snippets: &mut SecuritySnippets, tags: &[String], snippet: Snippet) {
    for tag in tags {
        snippets.entry(tag.clone()).or_default().push(snippet.clone());
    }
}

impl SnippetSource for Repository {
    /// Collect every snippet affecting the apps and hooks of `snap`.
    ///
    /// Plug snippets go to the tags bound to the plug, slot snippets to the
    /// tags bound to the slot. Order is deterministic for a fixed repository.
    fn security_snippets_for_snap(&self, snap_name: &str, system: SecuritySystem) -> Result<SecuritySnippets> {
        let snap = self
            .snaps
            .get(snap_name)
            .ok_or_else(|| Error::UnknownSnap(snap_name.to_string()))?;
        let mut snippets = SecuritySnippets::new();

        for plug in snap.all_plugs() {
            let Some(iface) = self.interfaces.get(plug.interface()) else {
                continue;
            };
            let tags = plug.security_tags();
            if let Some(snippet) = iface.permanent_plug_snippet(&plug, system)? {
                add_snippet(&mut snippets, &tags, snippet);
            }
            for conn in self.connections.iter().filter(|c| c.plug.snap == snap_name && c.plug.name == plug.name) {
                let slot_snap = self.lookup_slot(&conn.slot)?;
                let slot = slot_snap.slot(&conn.slot.name).ok_or_else(|| Error::UnknownSlot {
                    snap: conn.slot.snap.clone(),
                    slot: conn.slot.name.clone(),
                })?;
                if let Some(snippet) = iface.connected_plug_snippet(&plug, &slot, system)? {
                    add_snippet(&mut snippets, &tags, snippet);
                }
            }
        }

        for slot in snap.all_slots() {
            let Some(iface) = self.interfaces.get(slot.interface()) else {
                continue;
            };
            let tags = slot.security_tags();
            if let Some(snippet) = iface.permanent_slot_snippet(&slot, system)? {
                add_snippet(&mut snippets, &tags, snippet);
            }
            for conn in self.connections.iter().filter(|c| c.slot.snap == snap_name && c.slot.name == slot.name) {
                let plug_snap = self.lookup_plug(&conn.plug)?;
                let plug = plug_snap.plug(&conn.plug.name).ok_or_else(|| Error::UnknownPlug {
                    snap: conn.plug.snap.clone(),
                    plug: conn.plug.name.clone(),
                })?;
                if let Some(snippet) = iface.connected_slot_snippet(&plug, &slot, system)? {
                    add_snippet(&mut snippets, &tags, snippet);
                }
            }
        }

        debug!(snap = snap_name, %system, tags = snippets.len(), "collected security snippets");
        Ok(snippets)
    }
}
