//! I2C/SMBus transport over a USB-to-I2C adapter (FT232H-class).
//!
//! This crate does not bundle a concrete adapter driver — vendor USB-to-I2C
//! SDKs are not part of the corpus this crate draws on, and a host-side
//! control plane should not hard-depend on one vendor's bridge chip. Instead
//! the hardware boundary is a small synchronous trait, [`I2cAdapter`], that
//! the caller supplies a concrete implementation for (open via FTDI
//! D2XX/MPSSE, `i2c-linux`, or a bench harness); this mirrors the
//! `I2cHardware` HIL-style abstraction used for the equivalent boundary in
//! Hubris's `drv-i2c-api`. Because adapter SDKs are typically
//! synchronous-only, each call is pushed onto a blocking worker via
//! `tokio::task::spawn_blocking`, keeping the async `Transport` contract
//! intact without ever blocking the runtime's reactor thread.

use std::io;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tracing::{debug, instrument};

use crate::error::{PhoenixError, Result, TransportErrorKind};

use super::{with_retry, RetryPolicy, Transport, TransportConfig};

/// Synchronous driver for the physical USB-to-I2C adapter. One instance
/// owns one physical bridge; `Transport` itself owns exactly one
/// `I2cAdapter`.
pub trait I2cAdapter: Send + 'static {
    /// Configures the bus clock (100/400/1000 kHz), enables internal
    /// pull-ups where available, and drains the bus.
    fn configure(&mut self, bus_speed_khz: u16) -> io::Result<()>;

    fn write(&mut self, slave_addr: u8, bytes: &[u8]) -> io::Result<()>;

    fn read(&mut self, slave_addr: u8, buf: &mut [u8]) -> io::Result<()>;

    /// START–W–repeated-START–R–STOP, atomic with respect to other bus
    /// traffic.
    fn write_read(&mut self, slave_addr: u8, write_bytes: &[u8], buf: &mut [u8]) -> io::Result<()>;

    fn close(&mut self) -> io::Result<()>;
}

fn map_io_error(context: &str, e: io::Error) -> PhoenixError {
    let kind = match e.kind() {
        io::ErrorKind::NotFound => TransportErrorKind::AdapterNotFound,
        io::ErrorKind::WouldBlock | io::ErrorKind::ResourceBusy => TransportErrorKind::AdapterBusy,
        io::ErrorKind::TimedOut => TransportErrorKind::BusError,
        io::ErrorKind::ConnectionReset | io::ErrorKind::BrokenPipe => TransportErrorKind::Nak,
        _ => TransportErrorKind::BusError,
    };
    PhoenixError::transport(kind, format!("{context}: {e}"))
}

pub struct I2cTransport {
    adapter: Arc<Mutex<Box<dyn I2cAdapter>>>,
    default_slave_address: u8,
    policy: RetryPolicy,
}

impl I2cTransport {
    /// Opens the transport against an already-constructed adapter driver,
    /// validates the config, and configures the bus clock.
    pub fn open(config: TransportConfig, adapter: Box<dyn I2cAdapter>) -> Result<Self> {
        config.validate()?;
        let TransportConfig::I2c {
            bus_speed_khz,
            slave_address,
            ..
        } = config
        else {
            return Err(PhoenixError::InvalidArgument(
                "I2cTransport::open requires a TransportConfig::I2c".into(),
            ));
        };

        let adapter = Arc::new(Mutex::new(adapter));
        {
            let mut guard = adapter.lock().expect("adapter mutex poisoned");
            guard
                .configure(bus_speed_khz)
                .map_err(|e| map_io_error("configuring I2C adapter", e))?;
        }

        Ok(Self {
            adapter,
            default_slave_address: slave_address,
            policy: RetryPolicy::default(),
        })
    }

    pub fn default_slave_address(&self) -> u8 {
        self.default_slave_address
    }
}

#[async_trait]
impl Transport for I2cTransport {
    #[instrument(skip(self))]
    async fn close(&self) -> Result<()> {
        let adapter = self.adapter.clone();
        tokio::task::spawn_blocking(move || {
            let mut guard = adapter.lock().expect("adapter mutex poisoned");
            guard.close()
        })
        .await
        .map_err(|e| PhoenixError::Transport {
            kind: TransportErrorKind::BusError,
            context: format!("adapter worker panicked: {e}"),
        })?
        .map_err(|e| map_io_error("closing I2C adapter", e))
    }

    #[instrument(skip(self, bytes))]
    async fn write(&self, slave_addr: u8, bytes: &[u8]) -> Result<()> {
        let owned = bytes.to_vec();
        with_retry("i2c_write", &self.policy, || {
            let adapter = self.adapter.clone();
            let owned = owned.clone();
            async move {
                tokio::task::spawn_blocking(move || {
                    let mut guard = adapter.lock().expect("adapter mutex poisoned");
                    guard.write(slave_addr, &owned)
                })
                .await
                .map_err(|e| PhoenixError::Transport {
                    kind: TransportErrorKind::BusError,
                    context: format!("adapter worker panicked: {e}"),
                })?
                .map_err(|e| map_io_error("I2C write", e))
            }
        })
        .await?;
        debug!(slave_addr, len = bytes.len(), "i2c write complete");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn read(&self, slave_addr: u8, n: usize) -> Result<Vec<u8>> {
        let out = with_retry("i2c_read", &self.policy, || {
            let adapter = self.adapter.clone();
            async move {
                tokio::task::spawn_blocking(move || {
                    let mut buf = vec![0u8; n];
                    let mut guard = adapter.lock().expect("adapter mutex poisoned");
                    guard.read(slave_addr, &mut buf).map(|_| buf)
                })
                .await
                .map_err(|e| PhoenixError::Transport {
                    kind: TransportErrorKind::BusError,
                    context: format!("adapter worker panicked: {e}"),
                })?
                .map_err(|e| map_io_error("I2C read", e))
            }
        })
        .await?;
        debug!(slave_addr, len = out.len(), "i2c read complete");
        Ok(out)
    }

    #[instrument(skip(self, write_bytes))]
    async fn write_read(
        &self,
        slave_addr: u8,
        write_bytes: &[u8],
        read_len: usize,
    ) -> Result<Vec<u8>> {
        let owned = write_bytes.to_vec();
        let out = with_retry("i2c_write_read", &self.policy, || {
            let adapter = self.adapter.clone();
            let owned = owned.clone();
            async move {
                tokio::task::spawn_blocking(move || {
                    let mut buf = vec![0u8; read_len];
                    let mut guard = adapter.lock().expect("adapter mutex poisoned");
                    guard.write_read(slave_addr, &owned, &mut buf).map(|_| buf)
                })
                .await
                .map_err(|e| PhoenixError::Transport {
                    kind: TransportErrorKind::BusError,
                    context: format!("adapter worker panicked: {e}"),
                })?
                .map_err(|e| map_io_error("I2C write_read", e))
            }
        })
        .await?;
        debug!(slave_addr, len = out.len(), "i2c write_read complete");
        Ok(out)
    }
}
