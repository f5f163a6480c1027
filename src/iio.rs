//! Industrial-I/O style sensor framework: channel descriptions, device
//! registration, and the attribute interface consumers read through.

pub mod channel;
pub mod core;
pub mod device;

pub use self::channel::{ChanInfo, ChanSpec, ChanType, IioVal, InfoMask, Modifier};
pub use self::core::IioCore;
pub use self::device::{devm_iio_device_alloc, IioDev, IioDevId, IioInfo, IioModes};
