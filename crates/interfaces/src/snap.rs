//! Snap, app, hook, plug and slot model.

use crate::{Attrs, Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Kind of snap. Only OS snaps may offer base-system capabilities.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SnapType {
    #[default]
    App,
    Os,
    Kernel,
    Gadget,
}

/// A snap as far as the security layer is concerned.
///
/// Call [`SnapInfo::bind`] after construction (the [`Repository`] does)
/// so every plug and slot knows which apps and hooks it applies to.
///
/// [`Repository`]: crate::Repository
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SnapInfo {
    pub name: String,

    #[serde(rename = "type", default)]
    pub snap_type: SnapType,

    #[serde(default)]
    pub apps: BTreeMap<String, AppInfo>,

    #[serde(default)]
    pub hooks: BTreeMap<String, HookInfo>,

    #[serde(default)]
    pub plugs: BTreeMap<String, PlugInfo>,

    #[serde(default)]
    pub slots: BTreeMap<String, SlotInfo>,
}

/// An ordinary runnable command.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppInfo {
    #[serde(default)]
    pub plugs: BTreeSet<String>,

    #[serde(default)]
    pub slots: BTreeSet<String>,
}

/// A lifecycle hook.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HookInfo {
    #[serde(default)]
    pub plugs: BTreeSet<String>,
}

/// A declared need for a capability.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlugInfo {
    pub interface: String,

    #[serde(default)]
    pub attrs: Attrs,

    /// Apps using this plug, filled by [`SnapInfo::bind`].
    #[serde(skip)]
    pub apps: BTreeSet<String>,

    /// Hooks using this plug, filled by [`SnapInfo::bind`].
    #[serde(skip)]
    pub hooks: BTreeSet<String>,
}

/// A declared offer of a capability.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SlotInfo {
    pub interface: String,

    #[serde(default)]
    pub attrs: Attrs,

    /// Apps providing this slot, filled by [`SnapInfo::bind`].
    #[serde(skip)]
    pub apps: BTreeSet<String>,
}

impl PlugInfo {
    pub fn new(interface: impl Into<String>, attrs: Attrs) -> Self {
        Self {
            interface: interface.into(),
            attrs,
            ..Default::default()
        }
    }
}

impl SlotInfo {
    pub fn new(interface: impl Into<String>, attrs: Attrs) -> Self {
        Self {
            interface: interface.into(),
            attrs,
            ..Default::default()
        }
    }
}

const MAX_SNAP_NAME_LEN: usize = 40;

/// Check that `name` is a valid snap name.
///
/// Valid names use lower case letters, digits and single dashes, contain
/// at least one letter and neither start nor end with a dash. Such names
/// never carry glob or path syntax into rule file patterns.
pub fn validate_snap_name(name: &str) -> Result<()> {
    let valid = !name.is_empty()
        && name.len() <= MAX_SNAP_NAME_LEN
        && name.bytes().all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-')
        && name.bytes().any(|b| b.is_ascii_lowercase())
        && !name.starts_with('-')
        && !name.ends_with('-')
        && !name.contains("--");
    if !valid {
        return Err(Error::Validation(format!("invalid snap name: {name:?}")));
    }
    Ok(())
}

/// Security tag shared by all ordinary commands of a snap.
pub fn snap_security_tag(snap: &str) -> String {
    format!("snap.{snap}")
}

/// Security tag of one app.
pub fn app_security_tag(snap: &str, app: &str) -> String {
    format!("snap.{snap}.{app}")
}

/// Security tag of one hook.
pub fn hook_security_tag(snap: &str, hook: &str) -> String {
    format!("snap.{snap}.hook.{hook}")
}

impl SnapInfo {
    pub fn new(name: impl Into<String>, snap_type: SnapType) -> Self {
        Self {
            name: name.into(),
            snap_type,
            ..Default::default()
        }
    }

    pub fn with_app(mut self, name: &str, plugs: &[&str]) -> Self {
        let app = AppInfo {
            plugs: plugs.iter().map(|p| p.to_string()).collect(),
            slots: BTreeSet::new(),
        };
        self.apps.insert(name.to_string(), app);
        self
    }

    pub fn with_hook(mut self, name: &str, plugs: &[&str]) -> Self {
        let hook = HookInfo {
            plugs: plugs.iter().map(|p| p.to_string()).collect(),
        };
        self.hooks.insert(name.to_string(), hook);
        self
    }

    pub fn with_plug(mut self, name: &str, interface: &str, attrs: Attrs) -> Self {
        self.plugs.insert(name.to_string(), PlugInfo::new(interface, attrs));
        self
    }

    pub fn with_slot(mut self, name: &str, interface: &str, attrs: Attrs) -> Self {
        self.slots.insert(name.to_string(), SlotInfo::new(interface, attrs));
        self
    }

    /// Resolve which apps and hooks each plug and slot applies to.
    ///
    /// Plugs and slots not named by any app are bound to every app. Hooks
    /// only get the plugs they list.
    pub fn bind(&mut self) -> Result<()> {
        validate_snap_name(&self.name)?;
        for plug in self.plugs.values_mut() {
            plug.apps.clear();
            plug.hooks.clear();
        }
        for slot in self.slots.values_mut() {
            slot.apps.clear();
        }

        for (app_name, app) in &self.apps {
            for plug_name in &app.plugs {
                let plug = self.plugs.get_mut(plug_name).ok_or_else(|| Error::UnknownPlug {
                    snap: self.name.clone(),
                    plug: plug_name.clone(),
                })?;
                plug.apps.insert(app_name.clone());
            }
            for slot_name in &app.slots {
                let slot = self.slots.get_mut(slot_name).ok_or_else(|| Error::UnknownSlot {
                    snap: self.name.clone(),
                    slot: slot_name.clone(),
                })?;
                slot.apps.insert(app_name.clone());
            }
        }

        for (hook_name, hook) in &self.hooks {
            for plug_name in &hook.plugs {
                let plug = self.plugs.get_mut(plug_name).ok_or_else(|| Error::UnknownPlug {
                    snap: self.name.clone(),
                    plug: plug_name.clone(),
                })?;
                plug.hooks.insert(hook_name.clone());
            }
        }

        let all_apps: BTreeSet<String> = self.apps.keys().cloned().collect();
        for plug in self.plugs.values_mut() {
            if plug.apps.is_empty() {
                plug.apps = all_apps.clone();
            }
        }
        for slot in self.slots.values_mut() {
            if slot.apps.is_empty() {
                slot.apps = all_apps.clone();
            }
        }
        Ok(())
    }

    pub fn plug(&self, name: &str) -> Option<Plug<'_>> {
        self.plugs
            .get_key_value(name)
            .map(|(name, info)| Plug { snap: self, name, info })
    }

    pub fn slot(&self, name: &str) -> Option<Slot<'_>> {
        self.slots
            .get_key_value(name)
            .map(|(name, info)| Slot { snap: self, name, info })
    }

    pub fn all_plugs(&self) -> impl Iterator<Item = Plug<'_>> {
        self.plugs.iter().map(move |(name, info)| Plug { snap: self, name, info })
    }

    pub fn all_slots(&self) -> impl Iterator<Item = Slot<'_>> {
        self.slots.iter().map(move |(name, info)| Slot { snap: self, name, info })
    }
}

/// A plug together with the snap declaring it.
#[derive(Debug, Clone, Copy)]
pub struct Plug<'a> {
    pub snap: &'a SnapInfo,
    pub name: &'a str,
    pub info: &'a PlugInfo,
}

impl<'a> Plug<'a> {
    pub fn interface(&self) -> &'a str {
        &self.info.interface
    }

    pub fn attrs(&self) -> &'a Attrs {
        &self.info.attrs
    }

    /// Security tags of every app and hook bound to this plug, apps first.
    pub fn security_tags(&self) -> Vec<String> {
        let snap = &self.snap.name;
        self.info
            .apps
            .iter()
            .map(|app| app_security_tag(snap, app))
            .chain(self.info.hooks.iter().map(|hook| hook_security_tag(snap, hook)))
            .collect()
    }
}

/// A slot together with the snap offering it.
#[derive(Debug, Clone, Copy)]
pub struct Slot<'a> {
    pub snap: &'a SnapInfo,
    pub name: &'a str,
    pub info: &'a SlotInfo,
}

impl<'a> Slot<'a> {
    pub fn interface(&self) -> &'a str {
        &self.info.interface
    }

    pub fn attrs(&self) -> &'a Attrs {
        &self.info.attrs
    }

    pub fn security_tags(&self) -> Vec<String> {
        let snap = &self.snap.name;
        self.info
            .apps
            .iter()
            .map(|app| app_security_tag(snap, app))
            .collect()
    }
}
