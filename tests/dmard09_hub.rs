#![cfg(feature = "dmard09")]

use dmard09::bus::i2c::I2CTransport;
use dmard09::bus::mock::MockI2CBus;
use dmard09::bus::AttachState;
use dmard09::config::bus_config::parse_bus_config;
use dmard09::config::device_config::parse_device_config;
use dmard09::errors::{RegistryError, RegistryResult};
use dmard09::registry::init_all_with;
use dmard09::scheduler::{poll_once, spawn_sensor_tasks};
use dmard09::sensors::dmard09::regs::{CHIPID_VALUE, REG_CHIPID, REG_STAT};
use std::io::Write;
use std::sync::{Arc, Mutex};
use std::time::Duration;

const BUSES: &str = r#"
[[bus]]
id = "i2c1"
type = "mock"
"#;

const DEVICES: &str = r#"
[[device]]
id = "accel0"
driver = "dmard09"
bus = "i2c1"
address = 0x1c
frequency = 200
"#;

fn opener(bus: &MockI2CBus) -> impl Fn(&dmard09::config::BusEntry) -> RegistryResult<Box<dyn I2CTransport>> {
    let bus = bus.clone();
    move |_entry: &dmard09::config::BusEntry| Ok(Box::new(bus.clone()) as Box<dyn I2CTransport>)
}

#[tokio::test]
async fn test_hub_attaches_and_polls() {
    let bus = MockI2CBus::new();
    bus.add_device(0x1c)
        .set_byte(0x1c, REG_CHIPID, CHIPID_VALUE)
        .set_block(0x1c, REG_STAT, &[0, 0, 0x34, 0x12, 0xFE, 0xFF, 0x10, 0x00]);

    let hub = init_all_with(
        &parse_bus_config(BUSES).unwrap(),
        &parse_device_config(DEVICES).unwrap(),
        opener(&bus),
    )
    .await
    .unwrap();

    assert_eq!(hub.devices.len(), 1);
    let device = &hub.devices[0];
    assert_eq!(hub.i2c.state(device.client), AttachState::Attached);
    let iio_id = device.iio.expect("IIO device published");

    let msg = poll_once(&hub.iio, &device.id, iio_id, 1).await.unwrap();
    assert_eq!((msg.x, msg.y, msg.z), (Some(4660), Some(-2), Some(16)));
    assert_eq!(msg.h.sensor_id, "accel0");
    assert_eq!(msg.h.iio_device, iio_id.to_string());

    hub.shutdown().await;
    assert!(hub.iio.is_empty());
    assert!(hub.i2c.clients().is_empty());
}

#[tokio::test]
async fn test_hub_tolerates_wrong_chip() {
    let bus = MockI2CBus::new();
    bus.add_device(0x1c).set_byte(0x1c, REG_CHIPID, 0x33);

    let hub = init_all_with(
        &parse_bus_config(BUSES).unwrap(),
        &parse_device_config(DEVICES).unwrap(),
        opener(&bus),
    )
    .await
    .unwrap();

    // Attach completes and the device is readable; the empty status block
    // leaves every sample at the default
    let iio_id = hub.devices[0].iio.unwrap();
    let msg = poll_once(&hub.iio, "accel0", iio_id, 1).await.unwrap();
    assert_eq!((msg.x, msg.y, msg.z), (Some(0), Some(0), Some(0)));
}

#[tokio::test]
async fn test_hub_strict_policy_fails_closed() {
    let bus = MockI2CBus::new();
    bus.add_device(0x1c).set_byte(0x1c, REG_CHIPID, 0x33);
    let devices = format!("{}\n[policy]\nstrict_probe = true\n", DEVICES);

    let result = init_all_with(
        &parse_bus_config(BUSES).unwrap(),
        &parse_device_config(&devices).unwrap(),
        opener(&bus),
    )
    .await;
    assert!(matches!(result, Err(RegistryError::Attach { .. })));
}

#[derive(Clone, Default)]
struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

#[tokio::test]
async fn test_hub_failed_init_detaches_earlier_devices() {
    let logs = LogBuffer::default();
    let writer = logs.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(move || writer.clone())
        .with_ansi(false)
        .finish();
    let _guard = tracing::subscriber::set_default(subscriber);

    let bus = MockI2CBus::new();
    bus.add_device(0x1c)
        .set_byte(0x1c, REG_CHIPID, CHIPID_VALUE)
        .add_device(0x1d)
        .set_byte(0x1d, REG_CHIPID, 0x33);
    let devices = format!(
        "{}\n[[device]]\nid = \"accel1\"\ndriver = \"dmard09\"\nbus = \"i2c1\"\naddress = 0x1d\n\n[policy]\nstrict_probe = true\n",
        DEVICES
    );

    let result = init_all_with(
        &parse_bus_config(BUSES).unwrap(),
        &parse_device_config(&devices).unwrap(),
        opener(&bus),
    )
    .await;
    match result {
        Err(RegistryError::Attach { device, .. }) => assert_eq!(device, "accel1"),
        other => panic!("expected accel1 to fail attach, got {:?}", other.map(|_| ())),
    }

    let output = String::from_utf8_lossy(&logs.0.lock().unwrap()).into_owned();
    assert!(output.contains("[1-001c] dmard09 remove()"), "{}", output);
    assert!(output.contains("removed device 1-001c"), "{}", output);
}

#[tokio::test]
async fn test_hub_config_errors() {
    let bus = MockI2CBus::new();
    let unknown_bus = DEVICES.replace("bus = \"i2c1\"", "bus = \"i2c9\"");
    assert!(matches!(
        init_all_with(
            &parse_bus_config(BUSES).unwrap(),
            &parse_device_config(&unknown_bus).unwrap(),
            opener(&bus),
        )
        .await,
        Err(RegistryError::BusNotFound { .. })
    ));

    let unknown_driver = DEVICES.replace("driver = \"dmard09\"", "driver = \"dmard06\"");
    assert!(matches!(
        init_all_with(
            &parse_bus_config(BUSES).unwrap(),
            &parse_device_config(&unknown_driver).unwrap(),
            opener(&bus),
        )
        .await,
        Err(RegistryError::UnsupportedDriver { .. })
    ));
}

#[tokio::test]
async fn test_sensor_tasks_stop_after_detach() {
    let bus = MockI2CBus::new();
    bus.add_device(0x1c).set_byte(0x1c, REG_CHIPID, CHIPID_VALUE);

    let hub = init_all_with(
        &parse_bus_config(BUSES).unwrap(),
        &parse_device_config(DEVICES).unwrap(),
        opener(&bus),
    )
    .await
    .unwrap();

    let tasks = spawn_sensor_tasks(hub.iio.clone(), &hub.devices);
    assert_eq!(tasks.len(), 1);
    tokio::time::sleep(Duration::from_millis(20)).await;

    hub.shutdown().await;
    for task in tasks {
        tokio::time::timeout(Duration::from_secs(2), task)
            .await
            .expect("task stops once its device is gone")
            .unwrap();
    }
}
