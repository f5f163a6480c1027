use crate::bus::i2c::{I2CBus, I2CTransport};
use crate::bus::mock::MockI2CBus;
use crate::bus::{BoardInfo, BusType, ClientId, I2cCore};
use crate::config::{BusConfig, BusEntry, DeviceConfig};
use crate::errors::{RegistryError, RegistryResult};
use crate::iio::{IioCore, IioDevId};
use crate::sensors::create_sensor_driver;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tracing::{info, warn};

/// A configured device after attach
#[derive(Debug, Clone)]
pub struct AttachedDevice {
    pub id: String,
    pub client: ClientId,
    /// `None` when the driver bound but its IIO device is not published
    pub iio: Option<IioDevId>,
    pub frequency: Option<u32>,
}

/// Both frameworks plus everything instantiated from config
pub struct Hub {
    pub i2c: Arc<I2cCore>,
    pub iio: Arc<IioCore>,
    pub devices: Vec<AttachedDevice>,
}

impl Hub {
    /// Detach every device.
    pub async fn shutdown(&self) {
        self.i2c.shutdown().await;
        info!("[registry] all devices detached");
    }
}

/// Open the transport for a configured bus.
pub fn open_bus(entry: &BusEntry) -> RegistryResult<Box<dyn I2CTransport>> {
    match BusType::from_str(&entry.r#type) {
        Some(BusType::I2C) => {
            let bus = I2CBus::new(&entry.path).map_err(|source| RegistryError::BusOpen {
                bus: entry.id.clone(),
                source,
            })?;
            Ok(Box::new(bus))
        }
        Some(BusType::Mock) => Ok(Box::new(MockI2CBus::new())),
        None => Err(RegistryError::BusNotFound {
            bus: entry.id.clone(),
        }),
    }
}

pub async fn init_all(bus_cfg: &BusConfig, device_cfg: &DeviceConfig) -> RegistryResult<Hub> {
    init_all_with(bus_cfg, device_cfg, open_bus).await
}

/// Like [`init_all`], with `open` supplying each bus transport.
pub async fn init_all_with<F>(
    bus_cfg: &BusConfig,
    device_cfg: &DeviceConfig,
    open: F,
) -> RegistryResult<Hub>
where
    F: Fn(&BusEntry) -> RegistryResult<Box<dyn I2CTransport>>,
{
    let i2c = Arc::new(I2cCore::new());
    let iio = Arc::new(IioCore::new());

    let mut bus_map = HashMap::new();
    for (index, b) in bus_cfg.buses.iter().enumerate() {
        if BusType::from_str(&b.r#type).is_none() {
            warn!("[registry] skipping bus {} of unknown type '{}'", b.id, b.r#type);
            continue;
        }
        let nr = b.adapter_nr().unwrap_or(index as u32);
        let transport = open(b)?;
        i2c.add_adapter(nr, b.id.clone(), transport)
            .map_err(|_| RegistryError::DuplicateAdapter {
                bus: b.id.clone(),
                nr,
            })?;
        bus_map.insert(b.id.clone(), nr);
    }

    let driver_names: BTreeSet<&str> = device_cfg.devices.iter().map(|d| d.driver.as_str()).collect();
    for name in driver_names {
        let driver = create_sensor_driver(name, iio.clone(), device_cfg.policy)?;
        i2c.register_driver(driver).await;
    }

    let devices = match attach_devices(&i2c, &iio, device_cfg, &bus_map).await {
        Ok(devices) => devices,
        Err(e) => {
            warn!("[registry] initialization failed, detaching attached devices: {}", e);
            i2c.shutdown().await;
            return Err(e);
        }
    };

    Ok(Hub { i2c, iio, devices })
}

async fn attach_devices(
    i2c: &I2cCore,
    iio: &IioCore,
    device_cfg: &DeviceConfig,
    bus_map: &HashMap<String, u32>,
) -> RegistryResult<Vec<AttachedDevice>> {
    let mut devices = Vec::new();
    info!("[registry] initializing {} device(s)...", device_cfg.devices.len());
    for d in device_cfg.devices.iter() {
        let nr = *bus_map.get(&d.bus).ok_or_else(|| RegistryError::BusNotFound {
            bus: d.bus.clone(),
        })?;
        info!(
            "[registry] registering device: id={} driver={} bus={} address={:#04x}",
            d.id, d.driver, d.bus, d.address
        );

        let client = i2c
            .new_device(BoardInfo::new(d.driver.clone(), nr, d.address))
            .await
            .map_err(|source| RegistryError::Attach {
                device: d.id.clone(),
                source,
            })?;

        let published = client
            .clientdata::<IioDevId>()
            .filter(|iio_id| iio.device(*iio_id).is_some());
        if published.is_none() {
            warn!("[registry] {} attached without a published IIO device", d.id);
        }

        devices.push(AttachedDevice {
            id: d.id.clone(),
            client: client.id(),
            iio: published,
            frequency: d.frequency,
        });
    }

    Ok(devices)
}
