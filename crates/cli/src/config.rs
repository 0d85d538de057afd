//! Configuration loading from sandboxctl.toml.

use interfaces::BuiltinConfig;
use interfaces::builtin::{DEFAULT_SYSFS_BASE, UsbId, default_known_devices};
use interfaces::implicit::ImplicitConfig;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Top-level configuration. Every key is optional.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Directory holding the generated udev rules.
    pub rules_dir: PathBuf,

    /// State document listing installed snaps and their connections.
    pub state: Option<PathBuf>,

    pub system: SystemConfig,
    pub gpio: GpioConfig,
    pub zigbee: ZigbeeConfig,
    pub reload: ReloadConfig,
    pub log: LogConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SystemConfig {
    /// Classic systems offer the desktop slots as well.
    pub classic: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GpioConfig {
    pub sysfs_base: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ZigbeeConfig {
    /// Dongles granted to plugs that do not name a device.
    pub known_devices: Vec<UsbId>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReloadConfig {
    /// Commands run in order after rules change.
    pub commands: Vec<Vec<String>>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LogConfig {
    /// `tracing` filter directive, overridden by `RUST_LOG`.
    pub filter: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            rules_dir: PathBuf::from(udev::DEFAULT_RULES_DIR),
            state: None,
            system: SystemConfig::default(),
            gpio: GpioConfig::default(),
            zigbee: ZigbeeConfig::default(),
            reload: ReloadConfig::default(),
            log: LogConfig::default(),
        }
    }
}

impl Default for GpioConfig {
    fn default() -> Self {
        Self {
            sysfs_base: PathBuf::from(DEFAULT_SYSFS_BASE),
        }
    }
}

impl Default for ZigbeeConfig {
    fn default() -> Self {
        Self {
            known_devices: default_known_devices(),
        }
    }
}

impl Default for ReloadConfig {
    fn default() -> Self {
        Self {
            commands: udev::default_reload_commands(),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::parse(&content)
    }

    /// Parse and validate configuration from a TOML string.
    pub fn parse(toml: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(toml).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        for device in &self.zigbee.known_devices {
            device
                .validate()
                .map_err(|e| ConfigError::Invalid(format!("zigbee.known_devices: {e}")))?;
        }
        if self.reload.commands.iter().any(Vec::is_empty) {
            return Err(ConfigError::Invalid("reload.commands: empty command".into()));
        }
        Ok(())
    }

    pub fn builtin_config(&self) -> BuiltinConfig {
        BuiltinConfig {
            gpio_sysfs_base: self.gpio.sysfs_base.clone(),
            zigbee_known_devices: self.zigbee.known_devices.clone(),
        }
    }

    pub fn implicit_config(&self) -> ImplicitConfig {
        ImplicitConfig {
            classic: self.system.classic,
            gpio_sysfs_base: self.gpio.sysfs_base.clone(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(String),

    #[error("invalid config: {0}")]
    Invalid(String),
}
