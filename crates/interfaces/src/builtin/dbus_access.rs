//! Access to one object path of a service from the same snap.

use super::dbus_name::CONNECTED_PLUG_SECCOMP;
use crate::interface::{assert_plug_interface, assert_slot_interface};
use crate::{Error, Interface, Plug, Result, SecuritySystem, Slot, Snippet, template};

const PERMANENT_SLOT_APPARMOR: &str = r#"
#include <abstractions/dbus-strict>

# Allow binding the service to the requested connection name
dbus (receive, send)
  bus=system
  path=###SLOT_PATH_NAME###
  peer=(label=###SLOT_SECURITY_TAGS###),
"#;

#[derive(Debug, Clone, Copy, Default)]
pub struct DBusAccessInterface;

impl DBusAccessInterface {
    fn object_path<'a>(slot: &Slot<'a>) -> Result<&'a str> {
        let path = slot
            .attrs()
            .get_non_empty_str("path")?
            .ok_or_else(|| Error::Validation("dbus-access slot must contain path attribute".into()))?;
        validate_object_path(path)?;
        Ok(path)
    }
}

/// Check a D-Bus object path (`/org/example/Thing`).
fn validate_object_path(path: &str) -> Result<()> {
    let invalid = || Error::Validation(format!("invalid dbus object path {path:?}"));
    if path == "/" {
        return Ok(());
    }
    let Some(rest) = path.strip_prefix('/') else {
        return Err(invalid());
    };
    for element in rest.split('/') {
        if element.is_empty() || !element.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_') {
            return Err(invalid());
        }
    }
    Ok(())
}

/// AppArmor label expression matching every app bound to the slot.
fn slot_app_label_expr(slot: &Slot<'_>) -> String {
    let snap = &slot.snap.name;
    let apps: Vec<&str> = slot.info.apps.iter().map(String::as_str).collect();
    match apps.as_slice() {
        [] => format!("snap.{snap}.*"),
        [app] => format!("snap.{snap}.{app}"),
        apps => format!("snap.{snap}.{{{}}}", apps.join(",")),
    }
}

impl Interface for DBusAccessInterface {
    fn name(&self) -> &'static str {
        "dbus-access"
    }

    fn sanitize_plug(&self, plug: &Plug<'_>) -> Result<()> {
        assert_plug_interface(self.name(), plug);
        Ok(())
    }

    fn sanitize_slot(&self, slot: &Slot<'_>) -> Result<()> {
        assert_slot_interface(self.name(), slot);
        Self::object_path(slot)?;
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
        plug: &Plug<'_>,
        slot: &Slot<'_>,
        system: SecuritySystem,
    ) -> Result<Option<Snippet>> {
        if plug.snap.name != slot.snap.name {
            return Err(Error::NotAllowed(format!(
                "dbus-access plug {}:{} cannot use a slot of snap {:?}",
                plug.snap.name, plug.name, slot.snap.name
            )));
        }
        match system {
            SecuritySystem::SecComp => Ok(Some(CONNECTED_PLUG_SECCOMP.as_bytes().to_vec())),
            SecuritySystem::AppArmor | SecuritySystem::DBus | SecuritySystem::UDev | SecuritySystem::Mount => Ok(None),
        }
    }

    fn permanent_slot_snippet(&self, slot: &Slot<'_>, system: SecuritySystem) -> Result<Option<Snippet>> {
        match system {
            SecuritySystem::AppArmor => {
                let path = Self::object_path(slot)?;
                let label = slot_app_label_expr(slot);
                let snippet = template::render(
                    PERMANENT_SLOT_APPARMOR,
                    &[("SLOT_PATH_NAME", path), ("SLOT_SECURITY_TAGS", &label)],
                )?;
                Ok(Some(snippet.into_bytes()))
            }
            SecuritySystem::SecComp | SecuritySystem::DBus | SecuritySystem::UDev | SecuritySystem::Mount => Ok(None),
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
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Attrs, SnapInfo, SnapType};

    fn service() -> SnapInfo {
        let mut snap = SnapInfo::new("svc", SnapType::App)
            .with_app("daemon", &[])
            .with_app("worker", &[])
            .with_plug("client", "dbus-access", Attrs::new())
            .with_slot("api", "dbus-access", Attrs::new().with("path", "/org/example/Api"))
            .with_slot("nopath", "dbus-access", Attrs::new());
        snap.bind().unwrap();
        snap
    }

    #[test]
    fn test_sanitize_slot_requires_path() {
        let snap = service();
        assert!(DBusAccessInterface.sanitize_slot(&snap.slot("api").unwrap()).is_ok());
        let err = DBusAccessInterface.sanitize_slot(&snap.slot("nopath").unwrap()).unwrap_err();
        assert_eq!(err.to_string(), "dbus-access slot must contain path attribute");
    }

    #[test]
    fn test_permanent_slot_apparmor_labels_all_apps() {
        let snap = service();
        let snippet = DBusAccessInterface
            .permanent_slot_snippet(&snap.slot("api").unwrap(), SecuritySystem::AppArmor)
            .unwrap()
            .unwrap();
        let text = String::from_utf8(snippet).unwrap();
        assert!(text.contains("path=/org/example/Api\n"));
        assert!(text.contains("peer=(label=snap.svc.{daemon,worker}),"));
    }

    #[test]
    fn test_connection_across_snaps_not_allowed() {
        let snap = service();
        let mut other = SnapInfo::new("other", SnapType::App)
            .with_app("cli", &[])
            .with_plug("client", "dbus-access", Attrs::new());
        other.bind().unwrap();

        let err = DBusAccessInterface
            .connected_plug_snippet(&other.plug("client").unwrap(), &snap.slot("api").unwrap(), SecuritySystem::SecComp)
            .unwrap_err();
        assert!(matches!(err, Error::NotAllowed(_)));

        let same = DBusAccessInterface
            .connected_plug_snippet(&snap.plug("client").unwrap(), &snap.slot("api").unwrap(), SecuritySystem::SecComp)
            .unwrap();
        assert!(same.is_some());
    }

    #[test]
    fn test_object_path_validation() {
        assert!(validate_object_path("/").is_ok());
        assert!(validate_object_path("/org/example_1").is_ok());
        assert!(validate_object_path("org/example").is_err());
        assert!(validate_object_path("/org//example").is_err());
        assert!(validate_object_path("/org/example/").is_err());
        assert!(validate_object_path("/org/###X###").is_err());
    }
}
