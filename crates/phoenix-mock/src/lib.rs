//! Deterministic, in-memory register-backed [`Transport`] for exercising
//! `phoenix-core` without hardware, grounded on Hubris's
//! `MockI2cHardware` (`drv/i2c-types/src/mock.rs`): a register store plus
//! explicit error-injection knobs (NAK an address, corrupt the next PEC
//! byte) rather than a full wire-protocol simulator.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;

use phoenix_core::error::{PhoenixError, Result, TransportErrorKind};
use phoenix_core::framing::{REG_READ_16, REG_READ_32, REG_WRITE_16, REG_WRITE_32};
use phoenix_core::pec;
use phoenix_core::transport::Transport;

fn addressed_byte(slave_addr: u8, read: bool) -> u8 {
    (slave_addr << 1) | (read as u8)
}

#[derive(Debug, Default)]
struct MockState {
    registers: HashMap<(u8, u32), u32>,
    naks: HashSet<u8>,
    corrupt_next_pec: bool,
}

/// An in-memory stand-in for an I2C/SMBus-addressed retimer. Every register
/// is `(slave_addr, address) -> u32`, seeded by the test before exercising
/// `phoenix-core` through it.
#[derive(Debug, Default)]
pub struct MockTransport {
    state: Mutex<MockState>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed_u32(&self, slave_addr: u8, address: u32, value: u32) {
        self.state.lock().unwrap().registers.insert((slave_addr, address), value);
    }

    pub fn get_u32(&self, slave_addr: u8, address: u32) -> Option<u32> {
        self.state.lock().unwrap().registers.get(&(slave_addr, address)).copied()
    }

    /// Makes every operation addressed to `slave_addr` fail with `Nak`
    /// until cleared, simulating an unpopulated bus address.
    pub fn set_nak(&self, slave_addr: u8, nak: bool) {
        let mut state = self.state.lock().unwrap();
        if nak {
            state.naks.insert(slave_addr);
        } else {
            state.naks.remove(&slave_addr);
        }
    }

    /// Flips the low bit of the PEC byte on the next successful read
    /// response, simulating wire corruption (spec.md §8 scenario 6).
    pub fn inject_pec_corruption(&self) {
        self.state.lock().unwrap().corrupt_next_pec = true;
    }

    fn check_nak(&self, slave_addr: u8) -> Result<()> {
        if self.state.lock().unwrap().naks.contains(&slave_addr) {
            return Err(PhoenixError::transport(
                TransportErrorKind::Nak,
                format!("no responder at {slave_addr:#04x}"),
            ));
        }
        Ok(())
    }

    fn width_for(cmd: u8) -> Result<u8> {
        match cmd {
            REG_READ_16 | REG_WRITE_16 => Ok(2),
            REG_READ_32 | REG_WRITE_32 => Ok(4),
            other => Err(PhoenixError::InvalidArgument(format!(
                "MockTransport: unrecognized command byte {other:#04x}"
            ))),
        }
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn close(&self) -> Result<()> {
        Ok(())
    }

    async fn write(&self, slave_addr: u8, bytes: &[u8]) -> Result<()> {
        self.check_nak(slave_addr)?;
        // `bytes` is `[CMD, ADDR_B0..B3, DATA..., PEC]` (framing's `frame[1..]`).
        let cmd = bytes[0];
        let width = Self::width_for(cmd)?;
        let address = u32::from_le_bytes([bytes[1], bytes[2], bytes[3], bytes[4]]);
        let data = &bytes[5..5 + width as usize];
        let value = match width {
            2 => u16::from_le_bytes([data[0], data[1]]) as u32,
            4 => u32::from_le_bytes([data[0], data[1], data[2], data[3]]),
            _ => unreachable!("width_for only returns 2 or 4"),
        };
        self.state.lock().unwrap().registers.insert((slave_addr, address), value);
        Ok(())
    }

    async fn read(&self, _slave_addr: u8, _n: usize) -> Result<Vec<u8>> {
        Err(PhoenixError::UnsupportedOperation(
            "MockTransport only answers write_read-shaped register transactions".to_string(),
        ))
    }

    async fn write_read(
        &self,
        slave_addr: u8,
        write_bytes: &[u8],
        _read_len: usize,
    ) -> Result<Vec<u8>> {
        self.check_nak(slave_addr)?;
        // `write_bytes` is `[CMD, ADDR_B0..B3, PEC]` (framing's command_and_addr).
        let cmd = write_bytes[0];
        let width = Self::width_for(cmd)?;
        let address = u32::from_le_bytes([write_bytes[1], write_bytes[2], write_bytes[3], write_bytes[4]]);

        let value = self.state.lock().unwrap().registers.get(&(slave_addr, address)).copied().unwrap_or(0);
        let data = match width {
            2 => (value as u16).to_le_bytes().to_vec(),
            4 => value.to_le_bytes().to_vec(),
            _ => unreachable!("width_for only returns 2 or 4"),
        };

        let mut pec_input = Vec::with_capacity(1 + data.len());
        pec_input.push(addressed_byte(slave_addr, true));
        pec_input.extend_from_slice(&data);
        let mut response_pec = pec::compute(&pec_input);

        let mut corrupt = false;
        {
            let mut state = self.state.lock().unwrap();
            if state.corrupt_next_pec {
                corrupt = true;
                state.corrupt_next_pec = false;
            }
        }
        if corrupt {
            response_pec ^= 0x01;
        }

        let mut response = data;
        response.push(response_pec);
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use phoenix_core::regmap;
    use std::sync::Arc;

    #[tokio::test]
    async fn round_trips_a_written_register() {
        let mock = MockTransport::new();
        let transport: Arc<dyn Transport> = Arc::new(mock);
        phoenix_core::register_access::write_u32(&transport, 0x50, regmap::GLOBAL_PARAM0.address, 0x1122_3344)
            .await
            .unwrap();
        let read_back = phoenix_core::register_access::read_u32(&transport, 0x50, regmap::GLOBAL_PARAM0.address)
            .await
            .unwrap();
        assert_eq!(read_back, 0x1122_3344);
    }

    #[tokio::test]
    async fn naked_address_fails_with_nak() {
        let mock = MockTransport::new();
        mock.set_nak(0x51, true);
        let transport: Arc<dyn Transport> = Arc::new(mock);
        let err = phoenix_core::register_access::read_u32(&transport, 0x51, regmap::GLOBAL_PARAM1.address)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), phoenix_core::error::ErrorKind::Transport);
    }

    #[tokio::test]
    async fn injected_pec_corruption_is_detected() {
        let mock = MockTransport::new();
        mock.seed_u32(0x50, regmap::GLOBAL_PARAM0.address, 0xDEAD_BEEF);
        mock.inject_pec_corruption();
        let transport: Arc<dyn Transport> = Arc::new(mock);
        let err = phoenix_core::register_access::read_u32(&transport, 0x50, regmap::GLOBAL_PARAM0.address)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), phoenix_core::error::ErrorKind::Pec);
    }
}
