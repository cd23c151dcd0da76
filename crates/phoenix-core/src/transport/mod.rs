//! Byte-level duplex transport to one physical adapter. Two variants: I2C
//! (SMBus-style write/read with a 7-bit slave address) and UART
//! (length-framed packet exchange). Both are single-owner, concurrency-safe
//! wrappers around a hardware handle; retry/backoff policy lives here so
//! the framing layer above never has to reason about transience.

pub mod i2c;
pub mod uart;

use std::time::Duration;

use async_trait::async_trait;
use tracing::warn;

use crate::error::{PhoenixError, Result, TransportErrorKind};

pub use i2c::I2cTransport;
pub use uart::UartTransport;

/// How a [`Transport`] should be opened. The two variants are siblings of one
/// capability set (`open`/`close`/`write`/`read`/`write_read`); I2C and UART
/// are chosen by constructing the matching transport directly from the
/// matching config variant.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TransportConfig {
    I2c {
        adapter_port: u8,
        bus_speed_khz: u16,
        slave_address: u8,
    },
    Uart {
        port_name: String,
        baud_rate: u32,
    },
}

impl TransportConfig {
    /// Validates the config shape before any hardware I/O is attempted.
    /// Invalid values surface as `InvalidArgument` (spec.md §4.1's
    /// `InvalidConfig` folds into this taxonomy entry).
    pub fn validate(&self) -> Result<()> {
        match self {
            TransportConfig::I2c { bus_speed_khz, .. } => {
                if !matches!(bus_speed_khz, 100 | 400 | 1000) {
                    return Err(PhoenixError::InvalidArgument(format!(
                        "unsupported I2C bus speed {bus_speed_khz} kHz (must be 100, 400, or 1000)"
                    )));
                }
                Ok(())
            }
            TransportConfig::Uart { port_name, .. } => {
                if port_name.is_empty() {
                    return Err(PhoenixError::InvalidArgument(
                        "UART port_name must not be empty".into(),
                    ));
                }
                Ok(())
            }
        }
    }
}

/// Default operation timeout and retry policy, centralized so there is one
/// place to override the literals spec.md §4.1/§5 pins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub op_timeout: Duration,
    pub max_retries: u32,
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            op_timeout: Duration::from_millis(1000),
            max_retries: 2,
            backoff: Duration::from_millis(10),
        }
    }
}

/// The capability set every transport variant implements. Methods suspend
/// (spec.md §5) but never block an OS thread in the async implementations
/// here.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Idempotent; releases the underlying hardware handle.
    async fn close(&self) -> Result<()>;

    async fn write(&self, slave_addr: u8, bytes: &[u8]) -> Result<()>;

    async fn read(&self, slave_addr: u8, n: usize) -> Result<Vec<u8>>;

    /// Atomic on I2C (no STOP between W and repeated-START R). UART
    /// variants implement this as two correlated frames (see
    /// [`uart::UartTransport`]).
    async fn write_read(&self, slave_addr: u8, write_bytes: &[u8], read_len: usize)
        -> Result<Vec<u8>>;
}

/// Runs `op` under the default timeout, retrying transient transport errors
/// up to `policy.max_retries` times with `policy.backoff` between attempts.
/// NAK is never retried — it is returned to the caller immediately.
pub(crate) async fn with_retry<T, F, Fut>(
    op_name: &str,
    policy: &RetryPolicy,
    mut op: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T>>,
{
    let mut attempt = 0;
    loop {
        let result = tokio::time::timeout(policy.op_timeout, op())
            .await
            .map_err(|_| PhoenixError::Timeout(op_name.to_string()))?;

        match result {
            Ok(v) => return Ok(v),
            Err(PhoenixError::Transport { kind, context }) if kind.is_transient() => {
                if attempt >= policy.max_retries {
                    return Err(PhoenixError::transport(kind, context));
                }
                warn!(op = op_name, attempt, ?kind, "retrying transient transport error");
                attempt += 1;
                tokio::time::sleep(policy.backoff).await;
            }
            Err(e) => return Err(e),
        }
    }
}
