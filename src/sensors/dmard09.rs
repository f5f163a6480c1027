//! DMARD09 3-axis accelerometer.
//!
//! Publishes one IIO device with X/Y/Z acceleration channels. Every raw read
//! is a fresh SMBus block read of the status register; nothing is cached.

pub mod decode;
pub mod regs;

use self::decode::{decode, Axis};
use self::regs::*;
use crate::bus::{I2cClient, I2cDeviceId, I2cDriver};
use crate::config::ProbePolicy;
use crate::devm::Device;
use crate::errors::{DriverError, DriverResult};
use crate::iio::{
    devm_iio_device_alloc, ChanInfo, ChanSpec, ChanType, IioCore, IioDevId, IioInfo, IioModes,
    IioVal, InfoMask, Modifier,
};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

pub const DMARD09_DRV_NAME: &str = "dmard09";

pub static DMARD09_ID: [I2cDeviceId; 1] = [I2cDeviceId {
    name: DMARD09_DRV_NAME,
    driver_data: 0,
}];

const fn accel_channel(modifier: Modifier, axis: Axis) -> ChanSpec {
    ChanSpec {
        chan_type: ChanType::Accel,
        modified: true,
        channel2: modifier,
        address: axis as usize,
        info_mask_separate: InfoMask::bit(ChanInfo::Raw),
        info_mask_shared_by_type: InfoMask::bit(ChanInfo::Scale),
    }
}

pub static DMARD09_CHANNELS: [ChanSpec; 3] = [
    accel_channel(Modifier::X, Axis::X),
    accel_channel(Modifier::Y, Axis::Y),
    accel_channel(Modifier::Z, Axis::Z),
];

/// Per-sensor state, allocated at probe and released with the binding
pub struct Dmard09Data {
    client: Arc<I2cClient>,
    /// Used for log prefixes
    dev: Arc<Device>,
    policy: ProbePolicy,
}

impl Dmard09Data {
    /// Hand a failed read back to the caller only when the policy asks for it.
    fn read_failed(&self, reason: String) -> DriverResult<IioVal> {
        if self.policy.propagate_read_errors {
            return Err(DriverError::BusTransaction { reason });
        }
        Ok(IioVal::Int)
    }
}

#[async_trait]
impl IioInfo for Dmard09Data {
    async fn read_raw(
        &self,
        chan: &ChanSpec,
        val: &mut i32,
        _val2: &mut i32,
        mask: ChanInfo,
    ) -> DriverResult<IioVal> {
        debug!("[{}] dmard09 read_raw {:?}", self.dev.name(), mask);

        match mask {
            ChanInfo::Raw => {
                let axis = Axis::from_address(chan.address).ok_or_else(|| {
                    DriverError::InvalidArgument(format!("no axis at address {}", chan.address))
                })?;

                let mut buf = [0u8; BUF_DATA_LEN];
                match self.client.smbus_read_block_data(REG_STAT, &mut buf).await {
                    Ok(0) => {
                        warn!("[{}] cannot read accelerometer data", self.dev.name());
                        self.read_failed("zero-length block read".to_string())
                    }
                    Err(e) => {
                        warn!("[{}] error reading: {}", self.dev.name(), e);
                        self.read_failed(e.to_string())
                    }
                    Ok(_) => {
                        *val = i32::from(decode(&buf, axis));
                        Ok(IioVal::Int)
                    }
                }
            }
            _ => Err(DriverError::UnsupportedQuery),
        }
    }

    async fn debugfs_reg_access(&self, reg: u8) -> DriverResult<u8> {
        if !is_readable_reg(reg) {
            return Err(DriverError::InvalidRegister { reg });
        }
        Ok(self.client.smbus_read_byte_data(reg).await?)
    }
}

pub struct Dmard09Driver {
    iio: Arc<IioCore>,
    policy: ProbePolicy,
}

impl Dmard09Driver {
    pub fn new(iio: Arc<IioCore>) -> Self {
        Self::with_policy(iio, ProbePolicy::default())
    }

    pub fn with_policy(iio: Arc<IioCore>, policy: ProbePolicy) -> Self {
        Self { iio, policy }
    }

    /// Chip ID check. Logs the outcome; the error is only returned under
    /// `strict_probe`.
    async fn check_identity(&self, client: &I2cClient) -> DriverResult<()> {
        let dev = client.dev().name();
        match client.smbus_read_byte_data(REG_CHIPID).await {
            Ok(CHIPID_VALUE) => {
                info!("[{}] init ready", dev);
                Ok(())
            }
            Ok(actual) => {
                warn!(
                    "[{}] init failed: chip ID {:#04x}, expected {:#04x}",
                    dev, actual, CHIPID_VALUE
                );
                if self.policy.strict_probe {
                    return Err(DriverError::WrongChipId {
                        expected: CHIPID_VALUE,
                        actual,
                    });
                }
                Ok(())
            }
            Err(e) => {
                warn!("[{}] init failed: chip ID unreadable: {}", dev, e);
                if self.policy.strict_probe {
                    return Err(e.into());
                }
                Ok(())
            }
        }
    }
}

#[async_trait]
impl I2cDriver for Dmard09Driver {
    fn name(&self) -> &'static str {
        DMARD09_DRV_NAME
    }

    fn id_table(&self) -> &'static [I2cDeviceId] {
        &DMARD09_ID
    }

    async fn probe(&self, client: &Arc<I2cClient>, _id: &I2cDeviceId) -> DriverResult<()> {
        let dev = client.dev();
        info!("[{}] loading dmard09", dev.name());

        let data = Dmard09Data {
            client: client.clone(),
            dev: dev.clone(),
            policy: self.policy,
        };
        let mut indio_dev = devm_iio_device_alloc(dev, data).map_err(|e| {
            error!("[{}] iio allocation failed!", dev.name());
            e
        })?;
        client.set_clientdata(indio_dev.id());

        self.check_identity(client).await?;

        indio_dev.name = DMARD09_DRV_NAME.to_string();
        indio_dev.modes = IioModes::DIRECT;
        indio_dev.channels = &DMARD09_CHANNELS;

        if let Err(e) = self.iio.register(indio_dev) {
            error!("[{}] unable to register iio device {}", dev.name(), e.errno());
            if self.policy.strict_probe {
                return Err(DriverError::Registration { errno: e.errno() });
            }
        }

        Ok(())
    }

    async fn remove(&self, client: &Arc<I2cClient>) -> DriverResult<()> {
        info!("[{}] dmard09 remove()", client.dev().name());

        let id: IioDevId = client.clientdata().ok_or(DriverError::NoDevice)?;
        self.iio.unregister(id)?;
        Ok(())
    }
}
