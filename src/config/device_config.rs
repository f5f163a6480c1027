use crate::errors::{ConfigError, ConfigResult};
use serde::Deserialize;
use std::fs;

/// Root configuration struct expecting `[[device]]` TOML array format
#[derive(Debug, Deserialize)]
pub struct DeviceConfig {
    #[serde(rename = "device", default)]
    pub devices: Vec<DeviceEntry>,
    #[serde(default)]
    pub policy: ProbePolicy,
}

/// One device entry, matching each `[[device]]` section
#[derive(Debug, Deserialize)]
pub struct DeviceEntry {
    pub id: String,
    pub driver: String,
    pub bus: String,
    pub address: u16,
    /// Polling rate in Hz
    pub frequency: Option<u32>,
}

/// How drivers treat failures the hardware tolerates in practice.
///
/// Both default to `false`: identity mismatches, registration failures and
/// failed bus reads are logged and the operation carries on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct ProbePolicy {
    /// Abort probe on a chip ID mismatch or a failed IIO registration
    #[serde(default)]
    pub strict_probe: bool,
    /// Report failed raw reads to the caller instead of returning success
    #[serde(default)]
    pub propagate_read_errors: bool,
}

pub fn parse_device_config(content: &str) -> ConfigResult<DeviceConfig> {
    let parsed: DeviceConfig = toml::from_str(content)?;
    for d in &parsed.devices {
        if d.address > 0x7f {
            return Err(ConfigError::InvalidValue {
                field: format!("{}.address", d.id),
                reason: format!("{:#x} is not a 7-bit address", d.address),
            });
        }
        if d.frequency == Some(0) {
            return Err(ConfigError::InvalidValue {
                field: format!("{}.frequency", d.id),
                reason: "must be greater than zero".to_string(),
            });
        }
    }
    Ok(parsed)
}

/// Loads config from TOML file
pub fn load_device_config(path: &str) -> ConfigResult<DeviceConfig> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::LoadError {
        path: path.to_string(),
        source,
    })?;
    parse_device_config(&content)
}
