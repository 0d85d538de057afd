//! The closed set of builtin interface types.

mod common;
mod dbus_access;
mod dbus_name;
mod gpio;
mod zigbee_dongle;

pub use common::CommonInterface;
pub use dbus_access::DBusAccessInterface;
pub use dbus_name::DBusNameInterface;
pub use gpio::{DEFAULT_SYSFS_BASE, GpioInterface};
pub use zigbee_dongle::{UsbId, ZigbeeDongleInterface, default_known_devices};

use crate::{HostFs, Interface, Plug, Result, SecuritySystem, Slot, Snippet};
use std::path::PathBuf;
use std::sync::Arc;

/// Static data the builtin interfaces are built from.
#[derive(Debug, Clone)]
pub struct BuiltinConfig {
    /// Base of the sysfs GPIO class directory.
    pub gpio_sysfs_base: PathBuf,

    /// Dongles granted to zigbee plugs that name no device.
    pub zigbee_known_devices: Vec<UsbId>,
}

impl Default for BuiltinConfig {
    fn default() -> Self {
        Self {
            gpio_sysfs_base: PathBuf::from(DEFAULT_SYSFS_BASE),
            zigbee_known_devices: default_known_devices(),
        }
    }
}

/// One builtin interface type.
#[derive(Debug, Clone)]
pub enum BuiltinInterface {
    Common(CommonInterface),
    Gpio(GpioInterface),
    DBusName(DBusNameInterface),
    DBusAccess(DBusAccessInterface),
    ZigbeeDongle(ZigbeeDongleInterface),
}

impl BuiltinInterface {
    fn inner(&self) -> &dyn Interface {
        match self {
            BuiltinInterface::Common(iface) => iface,
            BuiltinInterface::Gpio(iface) => iface,
            BuiltinInterface::DBusName(iface) => iface,
            BuiltinInterface::DBusAccess(iface) => iface,
            BuiltinInterface::ZigbeeDongle(iface) => iface,
        }
    }
}

impl Interface for BuiltinInterface {
    fn name(&self) -> &'static str {
        self.inner().name()
    }

    fn sanitize_plug(&self, plug: &Plug<'_>) -> Result<()> {
        self.inner().sanitize_plug(plug)
    }

    fn sanitize_slot(&self, slot: &Slot<'_>) -> Result<()> {
        self.inner().sanitize_slot(slot)
    }

    fn permanent_plug_snippet(&self, plug: &Plug<'_>, system: SecuritySystem) -> Result<Option<Snippet>> {
        self.inner().permanent_plug_snippet(plug, system)
    }

    fn connected_plug_snippet(
        &self,
        plug: &Plug<'_>,
        slot: &Slot<'_>,
        system: SecuritySystem,
    ) -> Result<Option<Snippet>> {
        self.inner().connected_plug_snippet(plug, slot, system)
    }

    fn permanent_slot_snippet(&self, slot: &Slot<'_>, system: SecuritySystem) -> Result<Option<Snippet>> {
        self.inner().permanent_slot_snippet(slot, system)
    }

    fn connected_slot_snippet(
        &self,
        plug: &Plug<'_>,
        slot: &Slot<'_>,
        system: SecuritySystem,
    ) -> Result<Option<Snippet>> {
        self.inner().connected_slot_snippet(plug, slot, system)
    }

    fn auto_connect(&self) -> bool {
        self.inner().auto_connect()
    }
}

/// Every builtin interface, ready to register.
pub fn interfaces(config: &BuiltinConfig, fs: Arc<dyn HostFs>) -> Vec<BuiltinInterface> {
    vec![
        BuiltinInterface::Common(CommonInterface::adb_control()),
        BuiltinInterface::Common(CommonInterface::netplan_control()),
        BuiltinInterface::Common(CommonInterface::ssh_control()),
        BuiltinInterface::DBusAccess(DBusAccessInterface),
        BuiltinInterface::DBusName(DBusNameInterface),
        BuiltinInterface::Gpio(GpioInterface::new(fs.clone(), config.gpio_sysfs_base.clone())),
        BuiltinInterface::ZigbeeDongle(ZigbeeDongleInterface::new(
            fs,
            config.zigbee_known_devices.clone(),
        )),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Attrs, Error, MemFs, SnapInfo, SnapType, SnippetRequest, render_snippet};
    use std::collections::HashSet;

    fn all() -> Vec<BuiltinInterface> {
        let fs = MemFs::new()
            .with_file("/sys/devices/gpio5/value", "0")
            .with_symlink("/sys/class/gpio/gpio5", "/sys/devices/gpio5");
        interfaces(&BuiltinConfig::default(), Arc::new(fs))
    }

    /// A plug and a slot of `iface` that pass sanitization.
    fn pair(iface: &str) -> (SnapInfo, SnapInfo) {
        let plug_attrs = match iface {
            "dbus-name" => Attrs::new().with("name", "org.example.Svc"),
            _ => Attrs::new(),
        };
        let slot_attrs = match iface {
            "gpio" => Attrs::new().with("number", 5),
            "dbus-access" => Attrs::new().with("path", "/org/example"),
            _ => Attrs::new(),
        };
        // dbus-access only connects within one snap
        let mut slot_snap = SnapInfo::new("core", SnapType::Os)
            .with_app("svc", &[])
            .with_slot("slot", iface, slot_attrs)
            .with_plug("plug", iface, plug_attrs.clone());
        slot_snap.bind().unwrap();
        let mut plug_snap = SnapInfo::new("consumer", SnapType::App)
            .with_app("app", &[])
            .with_plug("plug", iface, plug_attrs);
        plug_snap.bind().unwrap();
        if iface == "dbus-access" {
            (slot_snap.clone(), slot_snap)
        } else {
            (plug_snap, slot_snap)
        }
    }

    #[test]
    fn test_names_are_unique() {
        let names: HashSet<_> = all().iter().map(|i| i.name()).collect();
        assert_eq!(names.len(), all().len());
    }

    #[test]
    fn test_every_interface_handles_every_system() {
        for iface in all() {
            let (plug_snap, slot_snap) = pair(iface.name());
            let plug = plug_snap.plug("plug").unwrap();
            let slot = slot_snap.slot("slot").unwrap();
            iface.sanitize_plug(&plug).unwrap();
            iface.sanitize_slot(&slot).unwrap();

            for system in SecuritySystem::ALL {
                let requests = [
                    SnippetRequest::PermanentPlug(plug),
                    SnippetRequest::ConnectedPlug(plug, slot),
                    SnippetRequest::PermanentSlot(slot),
                    SnippetRequest::ConnectedSlot(plug, slot),
                ];
                for request in requests {
                    let result = render_snippet(&iface, system.as_str(), request);
                    assert!(
                        !matches!(result, Err(Error::UnknownSecurity(_))),
                        "{} rejected {system}",
                        iface.name()
                    );
                }
            }
        }
    }

    #[test]
    fn test_every_interface_rejects_unknown_system() {
        for iface in all() {
            let (plug_snap, slot_snap) = pair(iface.name());
            let plug = plug_snap.plug("plug").unwrap();
            let slot = slot_snap.slot("slot").unwrap();
            let requests = [
                SnippetRequest::PermanentPlug(plug),
                SnippetRequest::ConnectedPlug(plug, slot),
                SnippetRequest::PermanentSlot(slot),
                SnippetRequest::ConnectedSlot(plug, slot),
            ];
            for request in requests {
                let err = render_snippet(&iface, "foo", request).unwrap_err();
                assert!(matches!(err, Error::UnknownSecurity(_)), "{}", iface.name());
            }
        }
    }

    #[test]
    fn test_reserved_interfaces() {
        let mut app = SnapInfo::new("app", SnapType::App);
        for iface in all() {
            app = app.with_slot(iface.name(), iface.name(), Attrs::new());
        }
        app.bind().unwrap();

        let reserved: Vec<&str> = all()
            .iter()
            .filter(|iface| {
                let slot = app.slot(iface.name()).unwrap();
                matches!(iface.sanitize_slot(&slot), Err(Error::Validation(msg)) if msg.contains("reserved"))
            })
            .map(|iface| iface.name())
            .collect();
        assert_eq!(reserved, vec!["adb-control", "netplan-control", "ssh-control", "dbus-name"]);
    }
}
