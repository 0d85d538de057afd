//! Serial access to USB zigbee dongles.

use crate::interface::{assert_plug_interface, assert_slot_interface};
use crate::{Error, HostFs, Interface, Plug, Result, SecuritySystem, Slot, Snippet};
use serde::{Deserialize, Serialize};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

const DEVICE_SYMLINK_DIR: &str = "/dev/zigbee";
const UDEV_HEADER: &str = r#"IMPORT{builtin}="usb_id""#;

/// A USB vendor/product pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsbId {
    pub vendor_id: String,
    pub product_id: String,
}

impl UsbId {
    pub fn new(vendor_id: impl Into<String>, product_id: impl Into<String>) -> Self {
        Self {
            vendor_id: vendor_id.into(),
            product_id: product_id.into(),
        }
    }

    /// Both ids must be four hexadecimal digits.
    pub fn validate(&self) -> Result<()> {
        validate_usb_id("id-vendor", &self.vendor_id)?;
        validate_usb_id("id-product", &self.product_id)
    }
}

/// Dongles matched when a plug names no specific device.
pub fn default_known_devices() -> Vec<UsbId> {
    vec![UsbId::new("10c4", "0003")]
}

#[derive(Debug, Clone)]
pub struct ZigbeeDongleInterface {
    fs: Arc<dyn HostFs>,
    known_devices: Arc<[UsbId]>,
}

impl ZigbeeDongleInterface {
    pub fn new(fs: Arc<dyn HostFs>, known_devices: Vec<UsbId>) -> Self {
        Self {
            fs,
            known_devices: known_devices.into(),
        }
    }

    /// The device the plug asks for, if it names one.
    fn requested_device(plug: &Plug<'_>) -> Result<Option<UsbId>> {
        let vendor = plug.attrs().get_non_empty_str("id-vendor")?;
        let product = plug.attrs().get_non_empty_str("id-product")?;
        match (vendor, product) {
            (Some(vendor), Some(product)) => Ok(Some(UsbId::new(vendor, product))),
            (Some(_), None) => Err(Error::Validation("id-vendor without id-product".into())),
            (None, Some(_)) => Err(Error::Validation("id-product without id-vendor".into())),
            (None, None) => Ok(None),
        }
    }

    fn udev_snippet(&self, plug: &Plug<'_>) -> Result<Snippet> {
        let devices = match Self::requested_device(plug)? {
            Some(device) => vec![device],
            None => self.known_devices.to_vec(),
        };

        let mut snippet = String::new();
        snippet.push_str(UDEV_HEADER);
        snippet.push('\n');
        for device in &devices {
            for tag in plug.security_tags() {
                snippet.push_str(&format!(
                    "SUBSYSTEM==\"tty\", SUBSYSTEMS==\"usb\", ATTRS{{idVendor}}==\"{}\", ATTRS{{idProduct}}==\"{}\", SYMLINK+=\"zigbee/$env{{ID_SERIAL}}\", TAG+=\"{}\"\n",
                    device.vendor_id,
                    device.product_id,
                    tag.replace('.', "_"),
                ));
            }
        }
        Ok(snippet.into_bytes())
    }

    /// Resolved device nodes behind the `/dev/zigbee` symlinks.
    fn device_paths(&self) -> Result<Vec<PathBuf>> {
        let dir = Path::new(DEVICE_SYMLINK_DIR);
        let entries = match self.fs.read_dir(dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => {
                return Err(Error::HostState {
                    path: dir.to_path_buf(),
                    source,
                });
            }
        };
        entries
            .into_iter()
            .map(|entry| {
                let path = dir.join(&entry.name);
                self.fs
                    .eval_symlinks(&path)
                    .map_err(|source| Error::HostState { path, source })
            })
            .collect()
    }
}

fn validate_usb_id(name: &str, value: &str) -> Result<()> {
    if value.len() != 4 || !value.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(Error::Validation(format!(
            "{name} must be a 4-digit hexadecimal number, got {value:?}"
        )));
    }
    Ok(())
}

impl Interface for ZigbeeDongleInterface {
    fn name(&self) -> &'static str {
        "zigbee-dongle"
    }

    fn sanitize_plug(&self, plug: &Plug<'_>) -> Result<()> {
        assert_plug_interface(self.name(), plug);
        if let Some(device) = Self::requested_device(plug)? {
            device.validate()?;
        }
        Ok(())
    }

    fn sanitize_slot(&self, slot: &Slot<'_>) -> Result<()> {
        assert_slot_interface(self.name(), slot);
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
        _slot: &Slot<'_>,
        system: SecuritySystem,
    ) -> Result<Option<Snippet>> {
        match system {
            SecuritySystem::AppArmor => {
                if Self::requested_device(plug)?.is_some() {
                    return Ok(Some(b"/dev/** rw,\n".to_vec()));
                }
                let paths = self.device_paths()?;
                if paths.is_empty() {
                    return Ok(None);
                }
                let mut snippet = String::new();
                for path in paths {
                    snippet.push_str(&format!("{} rwk,\n", path.display()));
                }
                Ok(Some(snippet.into_bytes()))
            }
            SecuritySystem::UDev => self.udev_snippet(plug).map(Some),
            SecuritySystem::SecComp | SecuritySystem::DBus | SecuritySystem::Mount => Ok(None),
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
