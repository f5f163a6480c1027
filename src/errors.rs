use thiserror::Error;
use crate::bus::i2c::I2CError;

pub const ENXIO: i32 = 6;
pub const EIO: i32 = 5;
pub const ENOMEM: i32 = 12;
pub const EBUSY: i32 = 16;
pub const ENODEV: i32 = 19;
pub const EINVAL: i32 = 22;
pub const ENOSPC: i32 = 28;

/// Errors raised by drivers and by the bus/IIO frameworks that host them
#[derive(Error, Debug)]
pub enum DriverError {
    #[error("I2C communication failed: {0}")]
    I2c(#[from] I2CError),

    #[error("device-managed allocation failed")]
    OutOfMemory,

    #[error("IIO device registration failed ({errno})")]
    Registration { errno: i32 },

    #[error("wrong chip ID: expected {expected:#04x}, got {actual:#04x}")]
    WrongChipId { expected: u8, actual: u8 },

    #[error("bus transaction failed: {reason}")]
    BusTransaction { reason: String },

    #[error("unsupported channel query")]
    UnsupportedQuery,

    #[error("register {reg:#04x} is not readable")]
    InvalidRegister { reg: u8 },

    #[error("no such device")]
    NoDevice,

    #[error("device or resource busy")]
    Busy,

    #[error("no space left in device table")]
    NoSpace,

    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

impl DriverError {
    /// Negative errno, as reported to framework callers and in logs
    pub fn errno(&self) -> i32 {
        match self {
            DriverError::I2c(I2CError::Nack { .. }) => -ENXIO,
            DriverError::I2c(I2CError::Unsupported(_)) => -ENODEV,
            #[cfg(target_os = "linux")]
            DriverError::I2c(I2CError::Linux(_)) => -EIO,
            DriverError::OutOfMemory => -ENOMEM,
            DriverError::Registration { errno } => *errno,
            DriverError::WrongChipId { .. } => -ENODEV,
            DriverError::BusTransaction { .. } => -EIO,
            DriverError::UnsupportedQuery => -EINVAL,
            DriverError::InvalidRegister { .. } => -EINVAL,
            DriverError::NoDevice => -ENODEV,
            DriverError::Busy => -EBUSY,
            DriverError::NoSpace => -ENOSPC,
            DriverError::InvalidArgument(_) => -EINVAL,
        }
    }
}

/// Configuration-related errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration from '{path}': {source}")]
    LoadError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid configuration format: {0}")]
    FormatError(#[from] toml::de::Error),

    #[error("Invalid configuration value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

/// Registry and initialization errors
#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("Configuration failed: {0}")]
    Config(#[from] ConfigError),

    #[error("Bus '{bus}' not found or unavailable")]
    BusNotFound { bus: String },

    #[error("Bus '{bus}' could not be opened: {source}")]
    BusOpen {
        bus: String,
        #[source]
        source: I2CError,
    },

    #[error("Bus '{bus}' wants adapter number {nr}, which is already in use")]
    DuplicateAdapter { bus: String, nr: u32 },

    #[error("Unsupported driver: '{driver}'")]
    UnsupportedDriver { driver: String },

    #[error("Device '{device}' failed to attach: {source}")]
    Attach {
        device: String,
        #[source]
        source: DriverError,
    },
}

/// Result type aliases for convenience
pub type DriverResult<T> = Result<T, DriverError>;
pub type ConfigResult<T> = Result<T, ConfigError>;
pub type RegistryResult<T> = Result<T, RegistryError>;
