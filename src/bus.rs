pub mod i2c;
pub mod i2c_core;
pub mod mock;

pub use i2c_core::{AttachState, BoardInfo, ClientId, I2cAdapter, I2cClient, I2cCore, I2cDeviceId, I2cDriver};

/// Bus type enum for different communication interfaces
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusType {
    I2C,
    /// In-memory bus with no devices attached; for dry runs without hardware
    Mock,
}

impl BusType {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "i2c" => Some(BusType::I2C),
            "mock" => Some(BusType::Mock),
            _ => None,
        }
    }
}
