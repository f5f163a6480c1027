use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use std::time::Instant;

static MONO_START: OnceLock<Instant> = OnceLock::new();

/// Header metadata common to all sensor messages
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Header {
    /// Configured device identifier (e.g., "accel0")
    pub sensor_id: String,
    /// IIO device the sample came from (e.g., "iio:device0")
    pub iio_device: String,
    /// Sequence number for message ordering
    pub seq: u64,
    /// UTC timestamp in nanoseconds
    pub t_utc_ns: u64,
    /// Nanoseconds since the first header of this process
    pub t_mono_ns: u64,
    /// Message schema version for evolution
    pub schema_v: u16,
}

impl Header {
    /// Create a new header with current timestamps
    pub fn new(sensor_id: String, iio_device: String, seq: u64) -> Self {
        use std::time::{SystemTime, UNIX_EPOCH};

        let now_utc = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos() as u64;
        let t_mono_ns = MONO_START.get_or_init(Instant::now).elapsed().as_nanos() as u64;

        Self {
            sensor_id,
            iio_device,
            seq,
            t_utc_ns: now_utc,
            t_mono_ns,
            schema_v: 1,
        }
    }
}

/// Raw accelerometer counts, one per axis. No scale is applied.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct AccelRawMessage {
    pub h: Header,
    pub x: Option<i32>,
    pub y: Option<i32>,
    pub z: Option<i32>,
}

impl AccelRawMessage {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
