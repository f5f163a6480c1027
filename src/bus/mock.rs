//! In-memory I2C transport for tests and dry runs.
//!
//! Register contents are programmed per (address, register). Clones share
//! state, so a test can keep one handle while the adapter owns another.

use super::i2c::{I2CError, I2CTransport, I2C_SMBUS_BLOCK_MAX};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

/// Transaction record for test verification
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum I2cTransaction {
    BlockRead { address: u16, reg: u8 },
    ByteRead { address: u16, reg: u8 },
}

#[derive(Debug, Default)]
struct MockState {
    present: HashSet<u16>,
    blocks: HashMap<(u16, u8), Vec<u8>>,
    bytes: HashMap<(u16, u8), u8>,
    failing: HashSet<(u16, u8)>,
    transactions: Vec<I2cTransaction>,
}

#[derive(Debug, Clone, Default)]
pub struct MockI2CBus {
    state: Arc<Mutex<MockState>>,
}

impl MockI2CBus {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        // A panicking test thread must not hide the log from the others.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Make a device ACK at `address`. Unprogrammed registers read as an
    /// empty block / 0x00.
    pub fn add_device(&self, address: u16) -> &Self {
        self.state().present.insert(address);
        self
    }

    pub fn remove_device(&self, address: u16) -> &Self {
        self.state().present.remove(&address);
        self
    }

    /// Bytes returned by an SMBus block read of `reg`.
    pub fn set_block(&self, address: u16, reg: u8, data: &[u8]) -> &Self {
        let len = data.len().min(I2C_SMBUS_BLOCK_MAX);
        self.state().blocks.insert((address, reg), data[..len].to_vec());
        self
    }

    pub fn set_byte(&self, address: u16, reg: u8, value: u8) -> &Self {
        self.state().bytes.insert((address, reg), value);
        self
    }

    /// Every transaction touching `reg` NACKs until `clear_failure`.
    pub fn fail(&self, address: u16, reg: u8) -> &Self {
        self.state().failing.insert((address, reg));
        self
    }

    pub fn clear_failure(&self, address: u16, reg: u8) -> &Self {
        self.state().failing.remove(&(address, reg));
        self
    }

    pub fn transactions(&self) -> Vec<I2cTransaction> {
        self.state().transactions.clone()
    }

    pub fn clear_transactions(&self) {
        self.state().transactions.clear();
    }

    fn check(state: &MockState, address: u16, reg: u8) -> Result<(), I2CError> {
        if !state.present.contains(&address) || state.failing.contains(&(address, reg)) {
            return Err(I2CError::Nack { address });
        }
        Ok(())
    }
}

#[async_trait]
impl I2CTransport for MockI2CBus {
    async fn read_block_data(&mut self, address: u16, reg: u8) -> Result<Vec<u8>, I2CError> {
        let mut state = self.state();
        state
            .transactions
            .push(I2cTransaction::BlockRead { address, reg });
        Self::check(&state, address, reg)?;
        Ok(state.blocks.get(&(address, reg)).cloned().unwrap_or_default())
    }

    async fn read_byte_data(&mut self, address: u16, reg: u8) -> Result<u8, I2CError> {
        let mut state = self.state();
        state.transactions.push(I2cTransaction::ByteRead { address, reg });
        Self::check(&state, address, reg)?;
        Ok(state.bytes.get(&(address, reg)).copied().unwrap_or(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_block_read() {
        let handle = MockI2CBus::new();
        handle.add_device(0x1c).set_block(0x1c, 0x0a, &[1, 2, 3]);

        let mut bus = handle.clone();
        let data = bus.read_block_data(0x1c, 0x0a).await.unwrap();
        assert_eq!(data, vec![1, 2, 3]);
        assert_eq!(
            handle.transactions(),
            vec![I2cTransaction::BlockRead { address: 0x1c, reg: 0x0a }]
        );
    }

    #[tokio::test]
    async fn test_mock_unprogrammed_registers() {
        let mut bus = MockI2CBus::new();
        bus.add_device(0x1c);

        assert!(bus.read_block_data(0x1c, 0x0a).await.unwrap().is_empty());
        assert_eq!(bus.read_byte_data(0x1c, 0x18).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_mock_nack() {
        let mut bus = MockI2CBus::new();
        assert!(matches!(
            bus.read_byte_data(0x1c, 0x18).await,
            Err(I2CError::Nack { address: 0x1c })
        ));

        bus.add_device(0x1c).fail(0x1c, 0x0a);
        assert!(bus.read_block_data(0x1c, 0x0a).await.is_err());
        bus.clear_failure(0x1c, 0x0a);
        assert!(bus.read_block_data(0x1c, 0x0a).await.is_ok());
        // Failed transactions are still logged
        assert_eq!(bus.transactions().len(), 3);
    }
}
