//! Process-wide handle table (spec.md §4.7). Replaces module-level mutable
//! state with a single `DeviceRegistry` value threaded through whatever
//! external surface owns it (spec.md §9 design note) — a registry lock
//! guards only insert/remove/lookup, never I/O, so a slow device never
//! blocks unrelated `get(handle)` calls.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{info, instrument};

use crate::device::Device;
use crate::discovery;
use crate::error::{PhoenixError, Result};
use crate::identity::DeviceIdentity;
use crate::transport::{I2cTransport, Transport, TransportConfig, UartTransport};
use crate::transport::i2c::I2cAdapter;

struct Inner {
    devices: HashMap<u32, Arc<Device>>,
    next_handle: u32,
}

/// Owns every live [`Device`]. Handles are monotonically increasing and
/// never reused within a process lifetime (spec.md §3).
pub struct DeviceRegistry {
    inner: tokio::sync::Mutex<Inner>,
}

impl Default for DeviceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl DeviceRegistry {
    pub fn new() -> Self {
        Self {
            inner: tokio::sync::Mutex::new(Inner {
                devices: HashMap::new(),
                next_handle: 1,
            }),
        }
    }

    /// Opens a persistent I2C transport, probes the configured slave
    /// address, constructs a `Device`, allocates the next handle, and
    /// inserts it into the registry.
    #[instrument(skip(self, adapter))]
    pub async fn connect_i2c(
        &self,
        config: TransportConfig,
        adapter: Box<dyn I2cAdapter>,
    ) -> Result<u32> {
        config.validate()?;
        let slave_address = match &config {
            TransportConfig::I2c { slave_address, .. } => *slave_address,
            TransportConfig::Uart { .. } => {
                return Err(PhoenixError::InvalidArgument(
                    "connect_i2c requires an I2c TransportConfig".to_string(),
                ))
            }
        };
        let transport: Arc<dyn Transport> = Arc::new(I2cTransport::open(config, adapter)?);
        self.connect_with_transport(transport, slave_address).await
    }

    /// Opens a persistent UART transport and probes address `0` (UART
    /// carries no bus address; spec.md §3 documents `device_address = 0`
    /// for UART identities).
    #[instrument(skip(self))]
    pub async fn connect_uart(&self, config: TransportConfig) -> Result<u32> {
        config.validate()?;
        let transport: Arc<dyn Transport> = Arc::new(UartTransport::open(config)?);
        self.connect_with_transport(transport, 0).await
    }

    async fn connect_with_transport(&self, transport: Arc<dyn Transport>, slave_address: u8) -> Result<u32> {
        let mut identities = discovery::discover(&transport, &[slave_address]).await?;
        let identity = identities
            .pop()
            .ok_or(PhoenixError::DeviceNotFound(slave_address))?;

        let mut inner = self.inner.lock().await;
        let handle = inner.next_handle;
        inner.next_handle += 1;

        let identity = DeviceIdentity {
            product_handle: handle,
            ..identity
        };
        let device = Arc::new(Device::new(transport, slave_address, identity));
        inner.devices.insert(handle, device);
        info!(handle, slave_address, "device connected");
        Ok(handle)
    }

    /// Removes and closes the device's transport. No-op error if the handle
    /// is already gone (`UnknownHandle`).
    #[instrument(skip(self))]
    pub async fn disconnect(&self, handle: u32) -> Result<()> {
        let device = {
            let mut inner = self.inner.lock().await;
            inner.devices.remove(&handle).ok_or(PhoenixError::UnknownHandle(handle))?
        };
        device.transport_close().await
    }

    /// Fails with `UnknownHandle` if `handle` is absent.
    pub async fn get(&self, handle: u32) -> Result<Arc<Device>> {
        let inner = self.inner.lock().await;
        inner.devices.get(&handle).cloned().ok_or(PhoenixError::UnknownHandle(handle))
    }

    pub async fn list_handles(&self) -> Vec<u32> {
        let inner = self.inner.lock().await;
        let mut handles: Vec<u32> = inner.devices.keys().copied().collect();
        handles.sort_unstable();
        handles
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn get_unknown_handle_fails() {
        let registry = DeviceRegistry::new();
        let err = registry.get(99).await.unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::UnknownHandle);
    }

    #[tokio::test]
    async fn disconnect_unknown_handle_fails() {
        let registry = DeviceRegistry::new();
        let err = registry.disconnect(99).await.unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::UnknownHandle);
    }
}
