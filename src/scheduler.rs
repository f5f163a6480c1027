use crate::errors::{DriverError, DriverResult};
use crate::iio::{ChanInfo, IioCore, IioDevId, Modifier};
use crate::messages::{AccelRawMessage, Header};
use crate::registry::AttachedDevice;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::{sleep, Duration};
use tracing::{debug, info, warn};

pub const DEFAULT_FREQUENCY_HZ: u32 = 10;

/// Read every raw channel of `iio_id` once.
pub async fn poll_once(
    iio: &IioCore,
    sensor_id: &str,
    iio_id: IioDevId,
    seq: u64,
) -> DriverResult<AccelRawMessage> {
    let dev = iio.device(iio_id).ok_or(DriverError::NoDevice)?;
    let mut msg = AccelRawMessage {
        h: Header::new(sensor_id.to_string(), iio_id.to_string(), seq),
        x: None,
        y: None,
        z: None,
    };

    for (index, chan) in dev.channels.iter().enumerate() {
        if !chan.info_mask_separate.contains(ChanInfo::Raw) {
            continue;
        }
        let raw = iio.read_channel_raw(iio_id, index).await?;
        match chan.channel2 {
            Modifier::X => msg.x = Some(raw),
            Modifier::Y => msg.y = Some(raw),
            Modifier::Z => msg.z = Some(raw),
            Modifier::None => {}
        }
    }
    Ok(msg)
}

/// One polling task per published device. A task ends once its device is
/// unregistered.
pub fn spawn_sensor_tasks(iio: Arc<IioCore>, devices: &[AttachedDevice]) -> Vec<JoinHandle<()>> {
    let mut handles = Vec::new();

    for device in devices {
        let Some(iio_id) = device.iio else {
            warn!("[{}] no IIO device published, not polling", device.id);
            continue;
        };
        let sensor_id = device.id.clone();
        let frequency = device.frequency.unwrap_or(DEFAULT_FREQUENCY_HZ).max(1);
        let sleep_duration = Duration::from_millis((1000.0 / frequency as f32) as u64);
        let iio = iio.clone();

        handles.push(tokio::spawn(async move {
            info!("[{}] Starting sensor task at {}Hz on {}", sensor_id, frequency, iio_id);
            let mut seq = 0u64;

            loop {
                seq += 1;
                match poll_once(&iio, &sensor_id, iio_id, seq).await {
                    Ok(msg) => match msg.to_json() {
                        Ok(json) => debug!("[{}] {}", sensor_id, json),
                        Err(e) => warn!("[{}] Failed to serialize sample: {}", sensor_id, e),
                    },
                    Err(DriverError::NoDevice) => {
                        info!("[{}] {} is gone, stopping sensor task", sensor_id, iio_id);
                        break;
                    }
                    Err(e) => warn!("[{}] Sensor read error: {}", sensor_id, e),
                }

                sleep(sleep_duration).await;
            }
        }));
    }

    handles
}
