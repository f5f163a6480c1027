use super::channel::{ChanInfo, ChanSpec, IioVal};
use crate::devm::Device;
use crate::errors::{DriverError, DriverResult};
use async_trait::async_trait;
use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

static NEXT_IIO_ID: AtomicU32 = AtomicU32::new(0);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct IioDevId(pub u32);

impl fmt::Display for IioDevId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "iio:device{}", self.0)
    }
}

/// Operating modes an IIO device supports
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IioModes(u32);

impl IioModes {
    /// Single reads on demand through the attribute interface
    pub const DIRECT: IioModes = IioModes(1 << 0);

    pub fn contains(&self, other: IioModes) -> bool {
        self.0 & other.0 == other.0
    }
}

/// Driver callbacks invoked by the IIO core
#[async_trait]
pub trait IioInfo: Send + Sync {
    /// Fill `val`/`val2` for `mask` on `chan`. The core serializes calls per
    /// device.
    async fn read_raw(
        &self,
        chan: &ChanSpec,
        val: &mut i32,
        val2: &mut i32,
        mask: ChanInfo,
    ) -> DriverResult<IioVal>;

    /// Read a single hardware register for debugging.
    async fn debugfs_reg_access(&self, _reg: u8) -> DriverResult<u8> {
        Err(DriverError::InvalidArgument(
            "register access not supported".to_string(),
        ))
    }
}

/// One IIO device: the driver fills the public fields between allocation
/// and registration.
pub struct IioDev {
    id: IioDevId,
    parent: Arc<Device>,
    info: Arc<dyn IioInfo>,
    pub name: String,
    pub modes: IioModes,
    pub channels: &'static [ChanSpec],
    pub(crate) mlock: tokio::sync::Mutex<()>,
}

impl IioDev {
    pub fn id(&self) -> IioDevId {
        self.id
    }

    pub fn parent(&self) -> &Arc<Device> {
        &self.parent
    }

    pub fn info(&self) -> &Arc<dyn IioInfo> {
        &self.info
    }
}

impl fmt::Debug for IioDev {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IioDev")
            .field("id", &self.id)
            .field("parent", &self.parent.name())
            .field("name", &self.name)
            .field("modes", &self.modes)
            .field("channels", &self.channels.len())
            .finish()
    }
}

/// Allocate an IIO device whose driver-private state `private` is managed by
/// `parent`: it is released when the parent's binding goes away.
pub fn devm_iio_device_alloc<P>(parent: &Arc<Device>, private: P) -> DriverResult<IioDev>
where
    P: IioInfo + 'static,
{
    let info: Arc<dyn IioInfo> = parent.devm_alloc(private)?;
    Ok(IioDev {
        id: IioDevId(NEXT_IIO_ID.fetch_add(1, Ordering::Relaxed)),
        parent: parent.clone(),
        info,
        name: String::new(),
        modes: IioModes::default(),
        channels: &[],
        mlock: tokio::sync::Mutex::new(()),
    })
}
