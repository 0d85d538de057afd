//! Access to a single GPIO pin exported through sysfs.

use crate::interface::{assert_plug_interface, assert_slot_interface};
use crate::{Error, HostFs, Interface, Plug, Result, SecuritySystem, Slot, Snippet};
use std::path::PathBuf;
use std::sync::Arc;

pub const DEFAULT_SYSFS_BASE: &str = "/sys/class/gpio";

#[derive(Debug, Clone)]
pub struct GpioInterface {
    fs: Arc<dyn HostFs>,
    sysfs_base: PathBuf,
}

impl GpioInterface {
    pub fn new(fs: Arc<dyn HostFs>, sysfs_base: impl Into<PathBuf>) -> Self {
        Self {
            fs,
            sysfs_base: sysfs_base.into(),
        }
    }

    fn pin_number(slot: &Slot<'_>) -> Result<i64> {
        match slot.attrs().get_int("number")? {
            Some(n) if n >= 0 => Ok(n),
            Some(_) => Err(Error::Validation("gpio slot number must not be negative".into())),
            None => Err(Error::Validation("gpio slot must have a number attribute".into())),
        }
    }
}

impl Interface for GpioInterface {
    fn name(&self) -> &'static str {
        "gpio"
    }

    fn sanitize_plug(&self, plug: &Plug<'_>) -> Result<()> {
        assert_plug_interface(self.name(), plug);
        Ok(())
    }

    fn sanitize_slot(&self, slot: &Slot<'_>) -> Result<()> {
        assert_slot_interface(self.name(), slot);
        Self::pin_number(slot)?;
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
        slot: &Slot<'_>,
        system: SecuritySystem,
    ) -> Result<Option<Snippet>> {
        match system {
            SecuritySystem::AppArmor => {
                // Per-pin sysfs entries are symlinks into the device tree and
                // AppArmor matches on the resolved path.
                let number = Self::pin_number(slot)?;
                let path = self.sysfs_base.join(format!("gpio{number}"));
                let resolved = self
                    .fs
                    .eval_symlinks(&path)
                    .map_err(|source| Error::HostState { path, source })?;
                Ok(Some(format!("{}/** rwk,\n", resolved.display()).into_bytes()))
            }
            SecuritySystem::SecComp
            | SecuritySystem::DBus
            | SecuritySystem::UDev
            | SecuritySystem::Mount => Ok(None),
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
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Attrs, MemFs, SnapInfo, SnapType};

    fn snaps() -> (SnapInfo, SnapInfo) {
        let mut core = SnapInfo::new("core", SnapType::Os)
            .with_slot("gpio-17", "gpio", Attrs::new().with("number", 17))
            .with_slot("gpio-99", "gpio", Attrs::new().with("number", 99))
            .with_slot("gpio-bad", "gpio", Attrs::new().with("number", "17"));
        core.bind().unwrap();
        let mut app = SnapInfo::new("blinker", SnapType::App)
            .with_app("blink", &[])
            .with_plug("led", "gpio", Attrs::new());
        app.bind().unwrap();
        (core, app)
    }

    fn iface() -> GpioInterface {
        let fs = MemFs::new()
            .with_file("/sys/devices/platform/soc/gpiochip0/gpio/gpio17/value", "0")
            .with_symlink(
                "/sys/class/gpio/gpio17",
                "/sys/devices/platform/soc/gpiochip0/gpio/gpio17",
            );
        GpioInterface::new(Arc::new(fs), DEFAULT_SYSFS_BASE)
    }

    #[test]
    fn test_sanitize_slot_requires_integer_number() {
        let (core, _) = snaps();
        let iface = iface();
        assert!(iface.sanitize_slot(&core.slot("gpio-17").unwrap()).is_ok());
        let err = iface.sanitize_slot(&core.slot("gpio-bad").unwrap()).unwrap_err();
        assert!(matches!(err, Error::InvalidAttribute { .. }));
    }

    #[test]
    fn test_connected_plug_apparmor_uses_resolved_path() {
        let (core, app) = snaps();
        let snippet = iface()
            .connected_plug_snippet(&app.plug("led").unwrap(), &core.slot("gpio-17").unwrap(), SecuritySystem::AppArmor)
            .unwrap()
            .unwrap();
        assert_eq!(
            snippet,
            b"/sys/devices/platform/soc/gpiochip0/gpio/gpio17/** rwk,\n".to_vec()
        );
    }

    #[test]
    fn test_unresolvable_pin_is_an_error_not_an_empty_snippet() {
        let (core, app) = snaps();
        let err = iface()
            .connected_plug_snippet(&app.plug("led").unwrap(), &core.slot("gpio-99").unwrap(), SecuritySystem::AppArmor)
            .unwrap_err();
        match err {
            Error::HostState { path, .. } => assert_eq!(path, PathBuf::from("/sys/class/gpio/gpio99")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_other_systems_have_no_snippet() {
        let (core, app) = snaps();
        let iface = iface();
        let plug = app.plug("led").unwrap();
        let slot = core.slot("gpio-99").unwrap();
        for system in [SecuritySystem::SecComp, SecuritySystem::DBus, SecuritySystem::UDev, SecuritySystem::Mount] {
            assert!(iface.connected_plug_snippet(&plug, &slot, system).unwrap().is_none());
        }
    }
}
