use crate::errors::{ConfigError, ConfigResult};
use serde::Deserialize;
use std::fs;

/// Root structure for loading `[[bus]]` style TOML config
#[derive(Debug, Deserialize)]
pub struct BusConfig {
    #[serde(rename = "bus")]
    pub buses: Vec<BusEntry>,
}

/// One bus entry (e.g., I2C)
#[derive(Debug, Deserialize)]
pub struct BusEntry {
    pub id: String,
    #[serde(rename = "type")]
    pub r#type: String, // 'type' is a reserved word in Rust, use raw identifier
    /// Device node, e.g. `/dev/i2c-1`. Ignored for mock buses.
    #[serde(default)]
    pub path: String,
}

impl BusEntry {
    /// Adapter number: trailing digits of the path, else of the id
    pub fn adapter_nr(&self) -> Option<u32> {
        trailing_number(&self.path).or_else(|| trailing_number(&self.id))
    }
}

fn trailing_number(s: &str) -> Option<u32> {
    let digits = s.len() - s.trim_end_matches(|c: char| c.is_ascii_digit()).len();
    s[s.len() - digits..].parse().ok()
}

pub fn parse_bus_config(content: &str) -> ConfigResult<BusConfig> {
    Ok(toml::from_str(content)?)
}

/// Load bus config file
pub fn load_bus_config(path: &str) -> ConfigResult<BusConfig> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::LoadError {
        path: path.to_string(),
        source,
    })?;
    parse_bus_config(&content)
}
