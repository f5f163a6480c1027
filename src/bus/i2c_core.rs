//! I2C bus framework: adapters, clients, driver matching and the
//! probe/remove lifecycle.

use super::i2c::{I2CError, I2CTransport};
use crate::devm::Device;
use crate::errors::{DriverError, DriverResult};
use async_trait::async_trait;
use std::any::Any;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, error, info, warn};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Entry in a driver's match table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct I2cDeviceId {
    pub name: &'static str,
    pub driver_data: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClientId(pub u32);

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "client{}", self.0)
    }
}

/// Binding state of one client
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachState {
    Unattached,
    Attaching,
    Attached,
    Detaching,
}

/// A bus segment and the transport that drives it
pub struct I2cAdapter {
    nr: u32,
    name: String,
    bus: tokio::sync::Mutex<Box<dyn I2CTransport>>,
}

impl I2cAdapter {
    pub fn nr(&self) -> u32 {
        self.nr
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Per-client lookup values set by the bound driver. Entries are plain
/// handles (`Copy`), never owners of driver state.
#[derive(Default)]
pub struct ClientDataTable {
    entries: Mutex<HashMap<ClientId, Box<dyn Any + Send + Sync>>>,
}

impl ClientDataTable {
    fn set<T: Copy + Send + Sync + 'static>(&self, client: ClientId, value: T) {
        lock(&self.entries).insert(client, Box::new(value));
    }

    fn get<T: Copy + Send + Sync + 'static>(&self, client: ClientId) -> Option<T> {
        lock(&self.entries)
            .get(&client)
            .and_then(|value| value.downcast_ref::<T>())
            .copied()
    }

    fn clear(&self, client: ClientId) {
        lock(&self.entries).remove(&client);
    }
}

/// One device on an adapter
pub struct I2cClient {
    id: ClientId,
    name: String,
    address: u16,
    adapter: Arc<I2cAdapter>,
    dev: Arc<Device>,
    clientdata: Arc<ClientDataTable>,
}

impl I2cClient {
    pub fn id(&self) -> ClientId {
        self.id
    }

    /// Name the client was instantiated with; drivers match on it
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn address(&self) -> u16 {
        self.address
    }

    pub fn adapter(&self) -> &Arc<I2cAdapter> {
        &self.adapter
    }

    pub fn dev(&self) -> &Arc<Device> {
        &self.dev
    }

    pub fn set_clientdata<T: Copy + Send + Sync + 'static>(&self, value: T) {
        self.clientdata.set(self.id, value);
    }

    pub fn clientdata<T: Copy + Send + Sync + 'static>(&self) -> Option<T> {
        self.clientdata.get(self.id)
    }

    /// SMBus block read of `reg` into `values`. Returns the byte count the
    /// device reported; at most `values.len()` bytes are copied.
    pub async fn smbus_read_block_data(&self, reg: u8, values: &mut [u8]) -> Result<usize, I2CError> {
        let data = {
            let mut bus = self.adapter.bus.lock().await;
            bus.read_block_data(self.address, reg).await?
        };
        let n = data.len().min(values.len());
        values[..n].copy_from_slice(&data[..n]);
        Ok(data.len())
    }

    pub async fn smbus_read_byte_data(&self, reg: u8) -> Result<u8, I2CError> {
        let mut bus = self.adapter.bus.lock().await;
        bus.read_byte_data(self.address, reg).await
    }
}

impl fmt::Debug for I2cClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("I2cClient")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("address", &format_args!("{:#04x}", self.address))
            .field("adapter", &self.adapter.nr)
            .finish()
    }
}

/// A driver the bus framework can bind to matching clients
#[async_trait]
pub trait I2cDriver: Send + Sync {
    fn name(&self) -> &'static str;

    fn id_table(&self) -> &'static [I2cDeviceId];

    async fn probe(&self, client: &Arc<I2cClient>, id: &I2cDeviceId) -> DriverResult<()>;

    async fn remove(&self, client: &Arc<I2cClient>) -> DriverResult<()>;
}

/// Information needed to instantiate a client
#[derive(Debug, Clone)]
pub struct BoardInfo {
    pub name: String,
    pub address: u16,
    pub adapter: u32,
    /// Cap on device-managed allocations for the client; `None` is unbounded
    pub resource_limit: Option<usize>,
}

impl BoardInfo {
    pub fn new(name: impl Into<String>, adapter: u32, address: u16) -> Self {
        Self {
            name: name.into(),
            address,
            adapter,
            resource_limit: None,
        }
    }
}

struct ClientEntry {
    client: Arc<I2cClient>,
    driver: Option<Arc<dyn I2cDriver>>,
    state: AttachState,
}

#[derive(Default)]
pub struct I2cCore {
    adapters: Mutex<BTreeMap<u32, Arc<I2cAdapter>>>,
    drivers: Mutex<Vec<Arc<dyn I2cDriver>>>,
    clients: Mutex<BTreeMap<ClientId, ClientEntry>>,
    clientdata: Arc<ClientDataTable>,
    next_client: AtomicU32,
}

impl I2cCore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_adapter(
        &self,
        nr: u32,
        name: impl Into<String>,
        transport: Box<dyn I2CTransport>,
    ) -> DriverResult<Arc<I2cAdapter>> {
        let mut adapters = lock(&self.adapters);
        if adapters.contains_key(&nr) {
            return Err(DriverError::Busy);
        }
        let adapter = Arc::new(I2cAdapter {
            nr,
            name: name.into(),
            bus: tokio::sync::Mutex::new(transport),
        });
        info!("[i2c] adapter i2c-{} ({}) added", nr, adapter.name);
        adapters.insert(nr, adapter.clone());
        Ok(adapter)
    }

    pub fn adapter(&self, nr: u32) -> Option<Arc<I2cAdapter>> {
        lock(&self.adapters).get(&nr).cloned()
    }

    /// Register `driver` and bind it to every unbound client it matches.
    /// A client whose deferred probe fails is removed, as in [`Self::new_device`].
    pub async fn register_driver(&self, driver: Arc<dyn I2cDriver>) {
        info!("[i2c] registered driver {}", driver.name());
        lock(&self.drivers).push(driver.clone());

        let unbound: Vec<Arc<I2cClient>> = lock(&self.clients)
            .values()
            .filter(|entry| entry.state == AttachState::Unattached)
            .map(|entry| entry.client.clone())
            .collect();
        for client in unbound {
            if let Some(id) = match_id(driver.id_table(), client.name()) {
                if let Err(e) = self.bind(&client, driver.clone(), id).await {
                    warn!("[i2c] {}: deferred bind failed: {}", client.dev().name(), e);
                }
            }
        }
    }

    /// Instantiate a client and probe the first driver that matches it.
    ///
    /// A failed probe removes the client again and returns the probe error.
    /// A client no driver matches stays registered and unbound.
    pub async fn new_device(&self, info: BoardInfo) -> DriverResult<Arc<I2cClient>> {
        if info.address > 0x7f {
            return Err(DriverError::InvalidArgument(format!(
                "invalid 7-bit address {:#x}",
                info.address
            )));
        }
        let adapter = self.adapter(info.adapter).ok_or(DriverError::NoDevice)?;

        let client = {
            let mut clients = lock(&self.clients);
            if clients
                .values()
                .any(|e| e.client.adapter.nr == info.adapter && e.client.address == info.address)
            {
                return Err(DriverError::Busy);
            }
            let id = ClientId(self.next_client.fetch_add(1, Ordering::Relaxed));
            let dev_name = format!("{}-{:04x}", adapter.nr, info.address);
            let client = Arc::new(I2cClient {
                id,
                name: info.name.clone(),
                address: info.address,
                adapter,
                dev: Device::with_resource_limit(dev_name, info.resource_limit),
                clientdata: self.clientdata.clone(),
            });
            clients.insert(
                id,
                ClientEntry {
                    client: client.clone(),
                    driver: None,
                    state: AttachState::Unattached,
                },
            );
            client
        };
        info!(
            "[i2c] instantiated device {} at {:#04x} on i2c-{}",
            info.name, info.address, info.adapter
        );

        let matched = lock(&self.drivers)
            .iter()
            .find_map(|driver| match_id(driver.id_table(), &info.name).map(|id| (driver.clone(), id)));
        let Some((driver, id)) = matched else {
            debug!("[i2c] no driver for {} yet", info.name);
            return Ok(client);
        };

        self.bind(&client, driver, id).await?;
        Ok(client)
    }

    async fn bind(
        &self,
        client: &Arc<I2cClient>,
        driver: Arc<dyn I2cDriver>,
        id: &'static I2cDeviceId,
    ) -> DriverResult<()> {
        {
            let mut clients = lock(&self.clients);
            let entry = clients.get_mut(&client.id).ok_or(DriverError::NoDevice)?;
            if entry.state != AttachState::Unattached {
                return Err(DriverError::Busy);
            }
            entry.state = AttachState::Attaching;
        }

        match driver.probe(client, id).await {
            Ok(()) => {
                if let Some(entry) = lock(&self.clients).get_mut(&client.id) {
                    entry.driver = Some(driver.clone());
                    entry.state = AttachState::Attached;
                }
                info!("[i2c] {} bound to {}", client.dev().name(), driver.name());
                Ok(())
            }
            Err(e) => {
                error!(
                    "[i2c] {}: probe with driver {} failed with error {}",
                    client.dev().name(),
                    driver.name(),
                    e.errno()
                );
                client.dev().release_all();
                self.clientdata.clear(client.id);
                lock(&self.clients).remove(&client.id);
                Err(e)
            }
        }
    }

    /// Detach (if bound) and forget the client.
    ///
    /// Fails with `Busy` while a probe or another remove of the same client is
    /// in flight.
    pub async fn remove_device(&self, id: ClientId) -> DriverResult<()> {
        let (client, driver) = {
            let mut clients = lock(&self.clients);
            let entry = clients.get_mut(&id).ok_or(DriverError::NoDevice)?;
            if matches!(entry.state, AttachState::Attaching | AttachState::Detaching) {
                return Err(DriverError::Busy);
            }
            if entry.driver.is_some() {
                entry.state = AttachState::Detaching;
            }
            (entry.client.clone(), entry.driver.take())
        };

        if let Some(driver) = driver {
            if let Err(e) = driver.remove(&client).await {
                warn!(
                    "[i2c] {}: remove returned error {}",
                    client.dev().name(),
                    e.errno()
                );
            }
            client.dev().release_all();
            self.clientdata.clear(id);
        }

        lock(&self.clients).remove(&id);
        info!("[i2c] removed device {} ({})", client.dev().name(), client.name());
        Ok(())
    }

    /// Remove every client, newest first.
    pub async fn shutdown(&self) {
        let ids: Vec<ClientId> = lock(&self.clients).keys().rev().copied().collect();
        for id in ids {
            if let Err(e) = self.remove_device(id).await {
                warn!("[i2c] shutdown: {} already gone: {}", id, e);
            }
        }
    }

    /// Binding state; `Unattached` for clients that have been removed.
    pub fn state(&self, id: ClientId) -> AttachState {
        lock(&self.clients)
            .get(&id)
            .map(|entry| entry.state)
            .unwrap_or(AttachState::Unattached)
    }

    pub fn client(&self, id: ClientId) -> Option<Arc<I2cClient>> {
        lock(&self.clients).get(&id).map(|entry| entry.client.clone())
    }

    pub fn clients(&self) -> Vec<ClientId> {
        lock(&self.clients).keys().copied().collect()
    }
}

fn match_id(table: &'static [I2cDeviceId], name: &str) -> Option<&'static I2cDeviceId> {
    table.iter().find(|id| id.name == name)
}
