//! UART transport: a self-synchronizing packet protocol over a raw serial
//! line, used when no I2C/SMBus side-channel is wired out.
//!
//! Frame shape: `SYNC(0xA5) | LEN(u8) | SLAVE(u8) | PAYLOAD[LEN] | PEC(u8)`.
//! The PEC covers `LEN | SLAVE | PAYLOAD` (everything after the
//! synchronization byte, which is pure framing and carries no device data).
//! The receiver discards bytes until it sees `SYNC`, then reads `LEN`,
//! `SLAVE`, the payload, and the trailing PEC; a framing error (bad PEC,
//! short read, timeout) resyncs to the next `SYNC` rather than failing the
//! whole transport.
//!
//! UART does not carry a true multi-master bus, so `write_read` is modeled
//! as two consecutive frames correlated by a one-byte cookie the host
//! appends to the request payload; the device's response echoes that cookie
//! as its first payload byte.
//!
//! The underlying `serialport` crate is synchronous, so every call runs on
//! a blocking worker via `spawn_blocking`, matching the real hardware
//! adapter's I2C sibling.

use std::io::{Read, Write};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::error::{PhoenixError, Result, TransportErrorKind};
use crate::pec;

use super::{with_retry, RetryPolicy, Transport, TransportConfig};

const SYNC: u8 = 0xA5;
const MAX_PAYLOAD: usize = 255;

pub struct UartTransport {
    port: Arc<Mutex<Box<dyn serialport::SerialPort>>>,
    policy: RetryPolicy,
    next_cookie: AtomicU8,
}

impl UartTransport {
    pub fn open(config: TransportConfig) -> Result<Self> {
        config.validate()?;
        let TransportConfig::Uart {
            port_name,
            baud_rate,
        } = config
        else {
            return Err(PhoenixError::InvalidArgument(
                "UartTransport::open requires a TransportConfig::Uart".into(),
            ));
        };

        let port = serialport::new(&port_name, baud_rate)
            .timeout(Duration::from_millis(1000))
            .open()
            .map_err(|e| match e.kind {
                serialport::ErrorKind::NoDevice => {
                    PhoenixError::transport(TransportErrorKind::AdapterNotFound, e.description)
                }
                serialport::ErrorKind::Io(_) => {
                    PhoenixError::transport(TransportErrorKind::AdapterBusy, e.description)
                }
                _ => PhoenixError::transport(TransportErrorKind::BusError, e.description),
            })?;

        Ok(Self {
            port: Arc::new(Mutex::new(port)),
            policy: RetryPolicy::default(),
            next_cookie: AtomicU8::new(0),
        })
    }

    fn next_cookie(&self) -> u8 {
        self.next_cookie.fetch_add(1, Ordering::Relaxed)
    }
}

fn encode_frame(slave_addr: u8, payload: &[u8]) -> Result<Vec<u8>> {
    if payload.len() > MAX_PAYLOAD {
        return Err(PhoenixError::InvalidArgument(format!(
            "UART payload of {} bytes exceeds the {MAX_PAYLOAD}-byte frame limit",
            payload.len()
        )));
    }
    let mut body = Vec::with_capacity(2 + payload.len());
    body.push(payload.len() as u8);
    body.push(slave_addr);
    body.extend_from_slice(payload);
    let crc = pec::compute(&body);

    let mut frame = Vec::with_capacity(1 + body.len() + 1);
    frame.push(SYNC);
    frame.extend_from_slice(&body);
    frame.push(crc);
    Ok(frame)
}

/// Reads bytes from `port` until a framed, PEC-valid payload is found,
/// resyncing on any framing error. Blocking; runs inside `spawn_blocking`.
fn read_frame(port: &mut dyn serialport::SerialPort) -> std::io::Result<Vec<u8>> {
    loop {
        let mut b = [0u8; 1];
        port.read_exact(&mut b)?;
        if b[0] != SYNC {
            continue;
        }

        let mut len_slave = [0u8; 2];
        if port.read_exact(&mut len_slave).is_err() {
            continue;
        }
        let len = len_slave[0] as usize;

        let mut payload = vec![0u8; len];
        if !payload.is_empty() && port.read_exact(&mut payload).is_err() {
            continue;
        }

        let mut crc_byte = [0u8; 1];
        if port.read_exact(&mut crc_byte).is_err() {
            continue;
        }

        let mut body = Vec::with_capacity(2 + len);
        body.extend_from_slice(&len_slave);
        body.extend_from_slice(&payload);
        let computed = pec::compute(&body);
        if computed != crc_byte[0] {
            // Framing error: resync to the next SYNC rather than failing
            // the whole read.
            continue;
        }

        return Ok(payload);
    }
}

#[async_trait]
impl Transport for UartTransport {
    async fn close(&self) -> Result<()> {
        // serialport's handle is released on drop; nothing else to flush.
        Ok(())
    }

    async fn write(&self, slave_addr: u8, bytes: &[u8]) -> Result<()> {
        let frame = encode_frame(slave_addr, bytes)?;
        with_retry("uart_write", &self.policy, || {
            let port = self.port.clone();
            let frame = frame.clone();
            async move {
                tokio::task::spawn_blocking(move || {
                    let mut guard = port.lock().expect("serial port mutex poisoned");
                    guard.write_all(&frame)
                })
                .await
                .map_err(|e| PhoenixError::Transport {
                    kind: TransportErrorKind::BusError,
                    context: format!("serial worker panicked: {e}"),
                })?
                .map_err(|e| PhoenixError::transport(TransportErrorKind::BusError, e.to_string()))
            }
        })
        .await?;
        debug!(slave_addr, len = bytes.len(), "uart write complete");
        Ok(())
    }

    async fn read(&self, slave_addr: u8, n: usize) -> Result<Vec<u8>> {
        let out = with_retry("uart_read", &self.policy, || {
            let port = self.port.clone();
            async move {
                tokio::task::spawn_blocking(move || {
                    let mut guard = port.lock().expect("serial port mutex poisoned");
                    read_frame(&mut **guard)
                })
                .await
                .map_err(|e| PhoenixError::Transport {
                    kind: TransportErrorKind::BusError,
                    context: format!("serial worker panicked: {e}"),
                })?
                .map_err(|e| PhoenixError::transport(TransportErrorKind::FramingError, e.to_string()))
            }
        })
        .await?;

        if out.len() != n {
            warn!(expected = n, got = out.len(), "uart frame length mismatch");
            return Err(PhoenixError::transport(
                TransportErrorKind::FramingError,
                format!("expected {n}-byte payload, got {}", out.len()),
            ));
        }
        debug!(slave_addr, len = out.len(), "uart read complete");
        Ok(out)
    }

    async fn write_read(
        &self,
        slave_addr: u8,
        write_bytes: &[u8],
        read_len: usize,
    ) -> Result<Vec<u8>> {
        let cookie = self.next_cookie();
        let mut request = write_bytes.to_vec();
        request.push(cookie);
        self.write(slave_addr, &request).await?;

        let response = with_retry("uart_write_read_response", &self.policy, || {
            let port = self.port.clone();
            async move {
                tokio::task::spawn_blocking(move || {
                    let mut guard = port.lock().expect("serial port mutex poisoned");
                    read_frame(&mut **guard)
                })
                .await
                .map_err(|e| PhoenixError::Transport {
                    kind: TransportErrorKind::BusError,
                    context: format!("serial worker panicked: {e}"),
                })?
                .map_err(|e| PhoenixError::transport(TransportErrorKind::FramingError, e.to_string()))
            }
        })
        .await?;

        let (echoed_cookie, rest) = response.split_first().ok_or_else(|| {
            PhoenixError::transport(
                TransportErrorKind::FramingError,
                "write_read response carried no cookie byte".to_string(),
            )
        })?;
        if *echoed_cookie != cookie {
            return Err(PhoenixError::transport(
                TransportErrorKind::FramingError,
                format!("write_read response cookie {echoed_cookie:#04x} did not match request cookie {cookie:#04x}"),
            ));
        }
        if rest.len() != read_len {
            return Err(PhoenixError::transport(
                TransportErrorKind::FramingError,
                format!("expected {read_len}-byte payload after cookie, got {}", rest.len()),
            ));
        }
        debug!(slave_addr, len = rest.len(), "uart write_read complete");
        Ok(rest.to_vec())
    }
}
