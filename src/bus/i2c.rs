#[cfg(target_os = "linux")]
use i2cdev::linux::{LinuxI2CDevice, LinuxI2CError};
#[cfg(target_os = "linux")]
use i2cdev::core::I2CDevice;
use async_trait::async_trait;
use thiserror::Error;

/// SMBus caps block transfers at 32 bytes.
pub const I2C_SMBUS_BLOCK_MAX: usize = 32;

/// I2C bus error type
#[derive(Error, Debug)]
pub enum I2CError {
    #[cfg(target_os = "linux")]
    #[error("{0}")]
    Linux(#[from] LinuxI2CError),

    #[error("no ACK from device at {address:#04x}")]
    Nack { address: u16 },

    #[error("I2C not supported on this platform: {0}")]
    Unsupported(String),
}

/// Raw SMBus transfers against one adapter. Every call is a single
/// complete transaction; callers never hold the bus between calls.
#[async_trait]
pub trait I2CTransport: Send {
    /// SMBus block read. Returns the bytes the device reported, which may
    /// be empty.
    async fn read_block_data(&mut self, address: u16, reg: u8) -> Result<Vec<u8>, I2CError>;

    async fn read_byte_data(&mut self, address: u16, reg: u8) -> Result<u8, I2CError>;
}

/// I2C bus implementation
#[cfg(target_os = "linux")]
pub struct I2CBus {
    device: LinuxI2CDevice,
    path: String,
}

#[cfg(not(target_os = "linux"))]
pub struct I2CBus {
    path: String,
}

impl I2CBus {
    /// Device node path, e.g. `/dev/i2c-1`
    pub fn path(&self) -> &str {
        &self.path
    }
}

#[cfg(target_os = "linux")]
impl I2CBus {
    pub fn new(path: &str) -> Result<Self, I2CError> {
        let device = LinuxI2CDevice::new(path, 0)?;
        Ok(Self {
            device,
            path: path.to_string(),
        })
    }
}

#[cfg(target_os = "linux")]
#[async_trait]
impl I2CTransport for I2CBus {
    async fn read_block_data(&mut self, address: u16, reg: u8) -> Result<Vec<u8>, I2CError> {
        self.device.set_slave_address(address)?;
        let mut data = self.device.smbus_read_block_data(reg)?;
        data.truncate(I2C_SMBUS_BLOCK_MAX);
        Ok(data)
    }

    async fn read_byte_data(&mut self, address: u16, reg: u8) -> Result<u8, I2CError> {
        self.device.set_slave_address(address)?;
        Ok(self.device.smbus_read_byte_data(reg)?)
    }
}

#[cfg(not(target_os = "linux"))]
impl I2CBus {
    pub fn new(_path: &str) -> Result<Self, I2CError> {
        Err(I2CError::Unsupported(
            "I2C is only supported on Linux".to_string(),
        ))
    }
}

#[cfg(not(target_os = "linux"))]
#[async_trait]
impl I2CTransport for I2CBus {
    async fn read_block_data(&mut self, _address: u16, _reg: u8) -> Result<Vec<u8>, I2CError> {
        Err(I2CError::Unsupported(format!("{} is unavailable", self.path)))
    }

    async fn read_byte_data(&mut self, _address: u16, _reg: u8) -> Result<u8, I2CError> {
        Err(I2CError::Unsupported(format!("{} is unavailable", self.path)))
    }
}
