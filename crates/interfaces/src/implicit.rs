//! Implicit slots and hooks.
//!
//! OS snaps offer a fixed set of base-system slots plus one `gpio-<n>` slot
//! for each pin exposed by the hardware. Hooks may be present on disk without
//! being declared.

use crate::builtin::DEFAULT_SYSFS_BASE;
use crate::{Attrs, HookInfo, HostFs, SlotInfo, SnapInfo, SnapType};
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

const IMPLICIT_SLOTS: &[&str] = &[
    "firewall-control",
    "home",
    "hardware-observe",
    "locale-control",
    "log-observe",
    "mount-observe",
    "network",
    "network-bind",
    "network-control",
    "network-observe",
    "ppp",
    "snapd-control",
    "system-observe",
    "timeserver-control",
    "timezone-control",
];

const IMPLICIT_CLASSIC_SLOTS: &[&str] = &[
    "cups-control",
    "gsettings",
    "network-manager",
    "opengl",
    "pulseaudio",
    "unity7",
    "x11",
    "modem-manager",
    "optical-drive",
    "camera",
];

const GPIO_CHIP_PREFIX: &str = "gpiochip";
const MAX_CHIP_PINS: i64 = 4096;

/// Where implicit slots come from.
#[derive(Debug, Clone)]
pub struct ImplicitConfig {
    /// Running on a classic (non-core) system.
    pub classic: bool,

    pub gpio_sysfs_base: PathBuf,
}

impl Default for ImplicitConfig {
    fn default() -> Self {
        Self {
            classic: false,
            gpio_sysfs_base: PathBuf::from(DEFAULT_SYSFS_BASE),
        }
    }
}

/// Add implicitly defined slots to an OS snap.
///
/// Slots are named after their interface. Existing slots are never
/// replaced. Call [`SnapInfo::bind`] afterwards.
pub fn add_implicit_slots(snap: &mut SnapInfo, config: &ImplicitConfig, fs: &dyn HostFs) {
    if snap.snap_type != SnapType::Os {
        return;
    }
    for name in IMPLICIT_SLOTS {
        add_slot(snap, name, SlotInfo::new(*name, Attrs::new()));
    }

    for (n, slot) in gpio_slots(&config.gpio_sysfs_base, fs) {
        add_slot(snap, &format!("gpio-{n}"), slot);
    }

    if !config.classic {
        return;
    }
    for name in IMPLICIT_CLASSIC_SLOTS {
        add_slot(snap, name, SlotInfo::new(*name, Attrs::new()));
    }
}

fn add_slot(snap: &mut SnapInfo, name: &str, slot: SlotInfo) {
    snap.slots.entry(name.to_string()).or_insert(slot);
}

/// Discover one slot per pin of every GPIO chip under `base`.
///
/// Discovery problems are logged and skipped; a system without GPIO
/// support simply has no pins.
fn gpio_slots(base: &Path, fs: &dyn HostFs) -> Vec<(i64, SlotInfo)> {
    let entries = match fs.read_dir(base) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            debug!(path = %base.display(), "system without GPIO support");
            return Vec::new();
        }
        Err(e) => {
            warn!(path = %base.display(), error = %e, "failed to detect available GPIOs");
            return Vec::new();
        }
    };

    let mut slots = Vec::new();
    for entry in entries {
        if !entry.is_symlink || !entry.name.starts_with(GPIO_CHIP_PREFIX) {
            continue;
        }
        let chip = base.join(&entry.name);
        let (base_pin, ngpio) = match (read_number(fs, &chip.join("base")), read_number(fs, &chip.join("ngpio"))) {
            (Ok(base_pin), Ok(ngpio)) => (base_pin, ngpio),
            (Err(e), _) | (_, Err(e)) => {
                warn!(chip = %chip.display(), error = %e, "failed to read GPIO chip range");
                continue;
            }
        };
        let Some(end) = pin_range_end(base_pin, ngpio) else {
            warn!(chip = %chip.display(), base = base_pin, ngpio, "ignoring GPIO chip with invalid range");
            continue;
        };
        info!(chip = %chip.display(), base = base_pin, ngpio, "adding slots for GPIO chip");
        for n in base_pin..end {
            slots.push((n, SlotInfo::new("gpio", Attrs::new().with("number", n))));
        }
    }
    slots
}

/// End of a chip's pin range, if `base` and `ngpio` describe a plausible one.
fn pin_range_end(base: i64, ngpio: i64) -> Option<i64> {
    if base < 0 || !(0..=MAX_CHIP_PINS).contains(&ngpio) {
        return None;
    }
    base.checked_add(ngpio)
}

fn read_number(fs: &dyn HostFs, path: &Path) -> io::Result<i64> {
    fs.read_to_string(path)?
        .trim()
        .parse()
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, format!("{}: {e}", path.display())))
}

/// Add hooks found in `hooks_dir` that the snap does not declare.
///
/// A missing hooks directory means there are no implicit hooks.
pub fn add_implicit_hooks(snap: &mut SnapInfo, hooks_dir: &Path, fs: &dyn HostFs) -> io::Result<()> {
    let entries = match fs.read_dir(hooks_dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(e),
    };
    for entry in entries {
        snap.hooks.entry(entry.name).or_insert_with(HookInfo::default);
    }
    Ok(())
}
