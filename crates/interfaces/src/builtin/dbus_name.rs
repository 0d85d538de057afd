//! Ownership of a well-known name on the system bus.

use crate::interface::{assert_plug_interface, assert_slot_interface, reserved_for_os};
use crate::{Error, Interface, Plug, Result, SecuritySystem, Slot, Snippet, template};

const PERMANENT_PLUG_APPARMOR: &str = r#"
#include <abstractions/dbus-strict>

# Allow request/release a dbus name
dbus (send)
  bus=system
  path=/org/freedesktop/DBus
  interface=org.freedesktop.DBus
  member={Request,Release}Name
  peer=(name=org.freedesktop.DBus),
"#;

const CONNECTED_PLUG_APPARMOR: &str = r####"
# Allow binding the service to the requested connection name
dbus (bind)
  bus=system
  name="###PLUG_BUS_NAME###",
"####;

pub(crate) const CONNECTED_PLUG_SECCOMP: &str = r#"
# Description: Allow dbus service.

# Can communicate with DBus system service
connect
getsockname
recv
recvmsg
send
sendto
sendmsg
socket
"#;

const CONNECTED_PLUG_DBUS: &str = r####"
<policy user="root">
	<allow own="###PLUG_BUS_NAME###"/>
	<allow send_destination="###PLUG_BUS_NAME###"/>
</policy>
<policy context="default">
	<deny send_destination="###PLUG_BUS_NAME###"/>
</policy>
"####;

const MAX_NAME_LEN: usize = 255;

#[derive(Debug, Clone, Copy, Default)]
pub struct DBusNameInterface;

impl DBusNameInterface {
    fn bus_name<'a>(plug: &Plug<'a>) -> Result<&'a str> {
        plug.attrs()
            .get_non_empty_str("name")?
            .ok_or_else(|| Error::Validation("dbus-name must contain name attribute".into()))
    }

    fn render(template: &str, plug: &Plug<'_>) -> Result<Option<Snippet>> {
        let name = Self::bus_name(plug)?;
        let snippet = template::render(template, &[("PLUG_BUS_NAME", name)])?;
        Ok(Some(snippet.into_bytes()))
    }
}

/// Check a well-known bus name (`org.example.Service`).
pub(crate) fn validate_bus_name(name: &str) -> Result<()> {
    let invalid = |why: &str| Error::Validation(format!("invalid dbus name {name:?}: {why}"));

    if name.len() > MAX_NAME_LEN {
        return Err(invalid("too long"));
    }
    let elements: Vec<&str> = name.split('.').collect();
    if elements.len() < 2 {
        return Err(invalid("must have at least two elements"));
    }
    for element in elements {
        let mut chars = element.chars();
        let Some(first) = chars.next() else {
            return Err(invalid("empty element"));
        };
        if first.is_ascii_digit() {
            return Err(invalid("element must not start with a digit"));
        }
        let valid = |c: char| c.is_ascii_alphanumeric() || c == '_' || c == '-';
        if !valid(first) || !chars.all(valid) {
            return Err(invalid("only [A-Za-z0-9_-] allowed"));
        }
    }
    Ok(())
}

impl Interface for DBusNameInterface {
    fn name(&self) -> &'static str {
        "dbus-name"
    }

    fn sanitize_plug(&self, plug: &Plug<'_>) -> Result<()> {
        assert_plug_interface(self.name(), plug);
        validate_bus_name(Self::bus_name(plug)?)
    }

    fn sanitize_slot(&self, slot: &Slot<'_>) -> Result<()> {
        assert_slot_interface(self.name(), slot);
        reserved_for_os(self.name(), slot)
    }

    fn permanent_plug_snippet(&self, _plug: &Plug<'_>, system: SecuritySystem) -> Result<Option<Snippet>> {
        match system {
            SecuritySystem::AppArmor => Ok(Some(PERMANENT_PLUG_APPARMOR.as_bytes().to_vec())),
            SecuritySystem::SecComp | SecuritySystem::DBus | SecuritySystem::UDev | SecuritySystem::Mount => Ok(None),
        }
    }

    fn connected_plug_snippet(
        &self,
        plug: &Plug<'_>,
        _slot: &Slot<'_>,
        system: SecuritySystem,
    ) -> Result<Option<Snippet>> {
        match system {
            SecuritySystem::AppArmor => Self::render(CONNECTED_PLUG_APPARMOR, plug),
            SecuritySystem::DBus => Self::render(CONNECTED_PLUG_DBUS, plug),
            SecuritySystem::SecComp => Ok(Some(CONNECTED_PLUG_SECCOMP.as_bytes().to_vec())),
            SecuritySystem::UDev | SecuritySystem::Mount => Ok(None),
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
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Attrs, SnapInfo, SnapType};

    fn snaps() -> (SnapInfo, SnapInfo) {
        let mut core = SnapInfo::new("core", SnapType::Os).with_slot("dbus-name", "dbus-name", Attrs::new());
        core.bind().unwrap();
        let mut app = SnapInfo::new("svc", SnapType::App)
            .with_app("daemon", &[])
            .with_plug("bus", "dbus-name", Attrs::new().with("name", "org.example.Service"))
            .with_plug("unnamed", "dbus-name", Attrs::new())
            .with_plug("bogus", "dbus-name", Attrs::new().with("name", "###X###"))
            .with_slot("own", "dbus-name", Attrs::new());
        app.bind().unwrap();
        (core, app)
    }

    #[test]
    fn test_sanitize_plug() {
        let (_, app) = snaps();
        let iface = DBusNameInterface;
        assert!(iface.sanitize_plug(&app.plug("bus").unwrap()).is_ok());

        let err = iface.sanitize_plug(&app.plug("unnamed").unwrap()).unwrap_err();
        assert_eq!(err.to_string(), "dbus-name must contain name attribute");

        assert!(iface.sanitize_plug(&app.plug("bogus").unwrap()).is_err());
    }

    #[test]
    fn test_slot_reserved_for_os() {
        let (core, app) = snaps();
        let iface = DBusNameInterface;
        assert!(iface.sanitize_slot(&core.slot("dbus-name").unwrap()).is_ok());
        assert!(iface.sanitize_slot(&app.slot("own").unwrap()).is_err());
    }

    #[test]
    fn test_connected_plug_dbus_policy() {
        let (core, app) = snaps();
        let snippet = DBusNameInterface
            .connected_plug_snippet(&app.plug("bus").unwrap(), &core.slot("dbus-name").unwrap(), SecuritySystem::DBus)
            .unwrap()
            .unwrap();
        let text = String::from_utf8(snippet).unwrap();
        assert!(text.contains(r#"<allow own="org.example.Service"/>"#));
        assert!(text.contains(r#"<deny send_destination="org.example.Service"/>"#));
        assert!(!text.contains("###"));
    }

    #[test]
    fn test_connected_plug_apparmor_and_seccomp() {
        let (core, app) = snaps();
        let plug = app.plug("bus").unwrap();
        let slot = core.slot("dbus-name").unwrap();

        let apparmor = DBusNameInterface
            .connected_plug_snippet(&plug, &slot, SecuritySystem::AppArmor)
            .unwrap()
            .unwrap();
        assert!(String::from_utf8(apparmor).unwrap().contains(r#"name="org.example.Service","#));

        let seccomp = DBusNameInterface
            .connected_plug_snippet(&plug, &slot, SecuritySystem::SecComp)
            .unwrap()
            .unwrap();
        assert_eq!(seccomp, CONNECTED_PLUG_SECCOMP.as_bytes());

        assert!(DBusNameInterface
            .connected_plug_snippet(&plug, &slot, SecuritySystem::UDev)
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_templates_keep_quoted_tokens() {
        assert!(CONNECTED_PLUG_APPARMOR.ends_with("name=\"###PLUG_BUS_NAME###\",\n"));
        assert!(CONNECTED_PLUG_DBUS.contains("<allow own=\"###PLUG_BUS_NAME###\"/>"));
        assert!(CONNECTED_PLUG_DBUS.ends_with("</policy>\n"));
    }

    #[test]
    fn test_validate_bus_name() {
        assert!(validate_bus_name("org.freedesktop.DBus").is_ok());
        assert!(validate_bus_name("com.example.my-service_2").is_ok());
        assert!(validate_bus_name("single").is_err());
        assert!(validate_bus_name("org..example").is_err());
        assert!(validate_bus_name("org.1example").is_err());
        assert!(validate_bus_name("org.exa\"mple").is_err());
    }
}
