//! Table-driven interfaces that only grant static rules.

use crate::interface::{assert_plug_interface, assert_slot_interface, reserved_for_os};
use crate::{Interface, Plug, Result, SecuritySystem, Slot, Snippet};

const ADB_CONTROL_CONNECTED_PLUG_APPARMOR: &str = r#"
# Description: Allow managing the kernel side adb stack. Reserved
#  because this gives privileged access to the system.
# Usage: reserved

/dev/adb rw,
"#;

const NETPLAN_CONTROL_CONNECTED_PLUG_APPARMOR: &str = r#"
# Description: Can create and modify netplan configuration files
# Usage: reserved

/etc/netplan/ r,
/etc/netplan/** rw,
"#;

const SSH_CONTROL_CONNECTED_PLUG_APPARMOR: &str = r#"
# Description: Allow modifying the system SSH configuration
# Usage: reserved

/etc/ssh/sshd_not_to_be_run rw,
"#;

/// An interface whose only effect is static text on the plug side.
#[derive(Debug, Clone)]
pub struct CommonInterface {
    name: &'static str,
    connected_plug_apparmor: Option<&'static str>,
    connected_plug_seccomp: Option<&'static str>,
    reserved_for_os: bool,
    auto_connect: bool,
}

impl CommonInterface {
    /// Reserved access to the kernel adb stack.
    pub fn adb_control() -> Self {
        Self {
            name: "adb-control",
            connected_plug_apparmor: Some(ADB_CONTROL_CONNECTED_PLUG_APPARMOR),
            connected_plug_seccomp: None,
            reserved_for_os: true,
            auto_connect: false,
        }
    }

    /// Reserved write access to netplan configuration.
    pub fn netplan_control() -> Self {
        Self {
            name: "netplan-control",
            connected_plug_apparmor: Some(NETPLAN_CONTROL_CONNECTED_PLUG_APPARMOR),
            connected_plug_seccomp: None,
            reserved_for_os: true,
            auto_connect: false,
        }
    }

    /// Reserved control over the system SSH daemon.
    pub fn ssh_control() -> Self {
        Self {
            name: "ssh-control",
            connected_plug_apparmor: Some(SSH_CONTROL_CONNECTED_PLUG_APPARMOR),
            connected_plug_seccomp: None,
            reserved_for_os: true,
            auto_connect: false,
        }
    }
}

impl Interface for CommonInterface {
    fn name(&self) -> &'static str {
        self.name
    }

    fn sanitize_plug(&self, plug: &Plug<'_>) -> Result<()> {
        assert_plug_interface(self.name, plug);
        Ok(())
    }

    fn sanitize_slot(&self, slot: &Slot<'_>) -> Result<()> {
        assert_slot_interface(self.name, slot);
        if self.reserved_for_os {
            reserved_for_os(self.name, slot)?;
        }
        Ok(())
    }

    fn permanent_plug_snippet(&self, _plug: &Plug<'_>, system: SecuritySystem) -> Result<Option<Snippet>> {
        match system {
            SecuritySystem::AppArmor
            | SecuritySystem::SecComp
            | SecuritySystem::DBus
            | SecuritySystem::UDev
            | SecuritySystem::Mount => Ok(None),
        }
    }

    fn connected_plug_snippet(
        &self,
        _plug: &Plug<'_>,
        _slot: &Slot<'_>,
        system: SecuritySystem,
    ) -> Result<Option<Snippet>> {
        match system {
            SecuritySystem::AppArmor => Ok(self.connected_plug_apparmor.map(|s| s.as_bytes().to_vec())),
            SecuritySystem::SecComp => Ok(self.connected_plug_seccomp.map(|s| s.as_bytes().to_vec())),
            SecuritySystem::DBus | SecuritySystem::UDev | SecuritySystem::Mount => Ok(None),
        }
    }

    fn permanent_slot_snippet(&self, _slot: &Slot<'_>, system: SecuritySystem) -> Result<Option<Snippet>> {
        match system {
            SecuritySystem::AppArmor
            | SecuritySystem::SecComp
            | SecuritySystem::DBus
            | SecuritySystem::UDev
            | SecuritySystem::Mount => Ok(None),
        }
    }

    fn connected_slot_snippet(
        &self,
        _plug: &Plug<'_>,
        _slot: &Slot<'_>,
        system: SecuritySystem,
    ) -> Result<Option<Snippet>> {
        match system {
            SecuritySystem::AppArmor
            | SecuritySystem::SecComp
            | SecuritySystem::DBus
            | SecuritySystem::UDev
            | SecuritySystem::Mount => Ok(None),
        }
    }

    fn auto_connect(&self) -> bool {
        self.auto_connect
    }
}
