use super::channel::{ChanInfo, ChanSpec, IioVal};
use super::device::{IioDev, IioDevId, IioModes};
use crate::errors::{DriverError, DriverResult};
use std::collections::BTreeMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, info};

pub const DEFAULT_MAX_DEVICES: usize = 64;

/// Registry of published IIO devices and the attribute interface consumers
/// read through.
pub struct IioCore {
    max_devices: usize,
    devices: RwLock<BTreeMap<IioDevId, Arc<IioDev>>>,
}

impl Default for IioCore {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_MAX_DEVICES)
    }
}

impl IioCore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(max_devices: usize) -> Self {
        Self {
            max_devices,
            devices: RwLock::new(BTreeMap::new()),
        }
    }

    fn devices(&self) -> RwLockReadGuard<'_, BTreeMap<IioDevId, Arc<IioDev>>> {
        self.devices
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn devices_mut(&self) -> RwLockWriteGuard<'_, BTreeMap<IioDevId, Arc<IioDev>>> {
        self.devices
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Publish `dev`. Fails if it is incomplete, already published, or the
    /// table is full.
    pub fn register(&self, dev: IioDev) -> DriverResult<IioDevId> {
        if dev.name.is_empty() {
            return Err(DriverError::InvalidArgument("device has no name".to_string()));
        }
        if dev.channels.is_empty() {
            return Err(DriverError::InvalidArgument("device has no channels".to_string()));
        }
        if !dev.modes.contains(IioModes::DIRECT) {
            return Err(DriverError::InvalidArgument(
                "no supported operating mode".to_string(),
            ));
        }

        let id = dev.id();
        let mut devices = self.devices_mut();
        if devices.contains_key(&id) {
            return Err(DriverError::Busy);
        }
        if devices.len() >= self.max_devices {
            return Err(DriverError::NoSpace);
        }

        info!(
            "[iio] registered {} ({}) on {} with {} channel(s)",
            id,
            dev.name,
            dev.parent().name(),
            dev.channels.len()
        );
        devices.insert(id, Arc::new(dev));
        Ok(id)
    }

    pub fn unregister(&self, id: IioDevId) -> DriverResult<Arc<IioDev>> {
        let dev = self.devices_mut().remove(&id).ok_or(DriverError::NoDevice)?;
        info!("[iio] unregistered {} ({})", id, dev.name);
        Ok(dev)
    }

    pub fn device(&self, id: IioDevId) -> Option<Arc<IioDev>> {
        self.devices().get(&id).cloned()
    }

    pub fn find_by_name(&self, name: &str) -> Vec<IioDevId> {
        self.devices()
            .values()
            .filter(|dev| dev.name == name)
            .map(|dev| dev.id())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.devices().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lookup(&self, id: IioDevId) -> DriverResult<Arc<IioDev>> {
        self.device(id).ok_or(DriverError::NoDevice)
    }

    /// Attribute names exposed for `id`, per-channel first, type-wide values
    /// once per channel type.
    pub fn attributes(&self, id: IioDevId) -> DriverResult<Vec<String>> {
        let dev = self.lookup(id)?;
        Ok(attribute_table(dev.channels)
            .into_iter()
            .map(|(name, _, _)| name)
            .collect())
    }

    /// Read a named attribute and format it the way sysfs would.
    pub async fn read_attr(&self, id: IioDevId, attr: &str) -> DriverResult<String> {
        let dev = self.lookup(id)?;
        let (chan, mask) = attribute_table(dev.channels)
            .into_iter()
            .find(|(name, _, _)| name == attr)
            .map(|(_, chan, mask)| (chan, mask))
            .ok_or_else(|| DriverError::InvalidArgument(format!("no attribute '{}'", attr)))?;

        let val = read_info(&dev, chan, mask).await?;
        Ok(val.to_string())
    }

    /// Raw value of the channel at `index`.
    pub async fn read_channel_raw(&self, id: IioDevId, index: usize) -> DriverResult<i32> {
        let dev = self.lookup(id)?;
        let chan = dev.channels.get(index).ok_or_else(|| {
            DriverError::InvalidArgument(format!("channel index {} out of range", index))
        })?;
        if !chan.info_mask_separate.contains(ChanInfo::Raw) {
            return Err(DriverError::UnsupportedQuery);
        }
        read_info(&dev, chan, ChanInfo::Raw).await
    }

    pub async fn debugfs_reg_read(&self, id: IioDevId, reg: u8) -> DriverResult<u8> {
        let dev = self.lookup(id)?;
        let _guard = dev.mlock.lock().await;
        dev.info().debugfs_reg_access(reg).await
    }
}

/// Consumers see 0 if a driver reports success without writing `val`.
async fn read_info(dev: &IioDev, chan: &ChanSpec, mask: ChanInfo) -> DriverResult<i32> {
    let _guard = dev.mlock.lock().await;
    let mut val = 0;
    let mut val2 = 0;
    match dev.info().read_raw(chan, &mut val, &mut val2, mask).await? {
        IioVal::Int => {
            debug!("[iio] {} {:?} {:?} -> {}", dev.id(), chan.channel2, mask, val);
            Ok(val)
        }
    }
}

fn attribute_table(channels: &'static [ChanSpec]) -> Vec<(String, &'static ChanSpec, ChanInfo)> {
    let mut table: Vec<(String, &'static ChanSpec, ChanInfo)> = Vec::new();
    for chan in channels {
        for info in ChanInfo::ALL {
            if chan.info_mask_separate.contains(info) {
                table.push((chan.attr_name(info, false), chan, info));
            }
        }
    }
    for chan in channels {
        for info in ChanInfo::ALL {
            if chan.info_mask_shared_by_type.contains(info) {
                let name = chan.attr_name(info, true);
                if !table.iter().any(|(existing, _, _)| *existing == name) {
                    table.push((name, chan, info));
                }
            }
        }
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::devm::Device;
    use crate::iio::channel::{ChanType, InfoMask, Modifier};
    use crate::iio::device::{devm_iio_device_alloc, IioInfo};
    use async_trait::async_trait;

    static CHANNELS: [ChanSpec; 2] = [
        ChanSpec {
            chan_type: ChanType::Accel,
            modified: true,
            channel2: Modifier::X,
            address: 0,
            info_mask_separate: InfoMask::bit(ChanInfo::Raw),
            info_mask_shared_by_type: InfoMask::bit(ChanInfo::Scale),
        },
        ChanSpec {
            chan_type: ChanType::Accel,
            modified: true,
            channel2: Modifier::Y,
            address: 1,
            info_mask_separate: InfoMask::bit(ChanInfo::Raw),
            info_mask_shared_by_type: InfoMask::bit(ChanInfo::Scale),
        },
    ];

    /// Reports `address * 100` for raw, leaves `val` alone for scale.
    struct Fixed;

    #[async_trait]
    impl IioInfo for Fixed {
        async fn read_raw(
            &self,
            chan: &ChanSpec,
            val: &mut i32,
            _val2: &mut i32,
            mask: ChanInfo,
        ) -> DriverResult<IioVal> {
            match mask {
                ChanInfo::Raw => {
                    *val = chan.address as i32 * 100;
                    Ok(IioVal::Int)
                }
                ChanInfo::Scale => Ok(IioVal::Int),
            }
        }
    }

    fn fixed_dev(parent: &Arc<Device>) -> IioDev {
        let mut dev = devm_iio_device_alloc(parent, Fixed).unwrap();
        dev.name = "fixed".to_string();
        dev.modes = IioModes::DIRECT;
        dev.channels = &CHANNELS;
        dev
    }

    #[tokio::test]
    async fn test_register_and_read() {
        let core = IioCore::new();
        let parent = Device::new("0-0010");
        let id = core.register(fixed_dev(&parent)).unwrap();

        assert_eq!(
            core.attributes(id).unwrap(),
            vec!["in_accel_x_raw", "in_accel_y_raw", "in_accel_scale"]
        );
        assert_eq!(core.read_attr(id, "in_accel_y_raw").await.unwrap(), "100");
        assert_eq!(core.read_channel_raw(id, 0).await.unwrap(), 0);
        // val is pre-initialised for callbacks that do not write it
        assert_eq!(core.read_attr(id, "in_accel_scale").await.unwrap(), "0");
        assert!(matches!(
            core.read_attr(id, "in_accel_z_raw").await,
            Err(DriverError::InvalidArgument(_))
        ));
        assert_eq!(core.find_by_name("fixed"), vec![id]);
    }

    #[tokio::test]
    async fn test_register_rejects_incomplete_device() {
        let core = IioCore::new();
        let parent = Device::new("0-0010");
        let mut dev = fixed_dev(&parent);
        dev.channels = &[];
        assert!(matches!(core.register(dev), Err(DriverError::InvalidArgument(_))));
        assert!(core.is_empty());
    }

    #[test]
    fn test_register_capacity() {
        let core = IioCore::with_capacity(1);
        let parent = Device::new("0-0010");
        core.register(fixed_dev(&parent)).unwrap();
        let err = core.register(fixed_dev(&parent)).unwrap_err();
        assert!(matches!(err, DriverError::NoSpace));
        assert!(err.errno() < 0);
    }

    #[tokio::test]
    async fn test_unregister() {
        let core = IioCore::new();
        let parent = Device::new("0-0010");
        let id = core.register(fixed_dev(&parent)).unwrap();

        core.unregister(id).unwrap();
        assert!(matches!(core.unregister(id), Err(DriverError::NoDevice)));
        assert!(matches!(core.read_channel_raw(id, 0).await, Err(DriverError::NoDevice)));
        // Default hook rejects register access
        let id = core.register(fixed_dev(&parent)).unwrap();
        assert!(core.debugfs_reg_read(id, 0x00).await.is_err());
    }
}
