//! SMBus command/PEC framing layer. Translates `(command, register address,
//! width, [payload])` into wire bytes, computes/verifies the CRC-8 PEC, and
//! drives the underlying [`Transport`]. Frames are not retried here — the
//! transport layer owns retry; a PEC mismatch is handed back to the caller
//! (which may choose to retry the whole register operation).

use std::sync::Arc;

use crate::error::{PhoenixError, Result};
use crate::pec;
use crate::transport::Transport;

pub const REG_READ_16: u8 = 0x03;
pub const REG_READ_32: u8 = 0x05;
pub const REG_WRITE_16: u8 = 0x13;
pub const REG_WRITE_32: u8 = 0x15;

/// Assembles the SMBus-address byte (7-bit slave address shifted left one,
/// R/W bit in bit 0) that the PEC must cover alongside the payload.
fn addressed_byte(slave_addr: u8, read: bool) -> u8 {
    (slave_addr << 1) | (read as u8)
}

fn command_for(width_bytes: u8, is_write: bool) -> Result<u8> {
    match (width_bytes, is_write) {
        (2, false) => Ok(REG_READ_16),
        (4, false) => Ok(REG_READ_32),
        (2, true) => Ok(REG_WRITE_16),
        (4, true) => Ok(REG_WRITE_32),
        _ => Err(PhoenixError::InvalidArgument(format!(
            "unsupported register width {width_bytes} bytes (must be 2 or 4)"
        ))),
    }
}

/// Issues a register read: `[SLAVE_W, CMD, ADDR_B0..B3, PEC]` then repeated
/// START `[SLAVE_R, DATA_B0..B(width-1), PEC]`. Returns the little-endian
/// data bytes with the PEC verified and stripped.
pub async fn read_register(
    transport: &Arc<dyn Transport>,
    slave_addr: u8,
    address: u32,
    width_bytes: u8,
) -> Result<Vec<u8>> {
    let cmd = command_for(width_bytes, false)?;

    let mut write_frame = Vec::with_capacity(7);
    write_frame.push(addressed_byte(slave_addr, false));
    write_frame.push(cmd);
    write_frame.extend_from_slice(&address.to_le_bytes());
    let write_pec = pec::compute(&write_frame);
    write_frame.push(write_pec);

    // `write_frame[1..]` is `[CMD, ADDR_B0..B3, PEC]` — the slave address
    // itself is carried by `slave_addr` and assembled onto the wire by the
    // transport, which keeps the repeated-START read atomic with this write.
    let command_and_addr = &write_frame[1..];

    let response_len = width_bytes as usize + 1; // + PEC
    let response = transport
        .write_read(slave_addr, command_and_addr, response_len)
        .await?;

    let (data, pec_byte) = response.split_at(width_bytes as usize);
    let expected = pec_byte[0];

    // The read phase's PEC covers its own repeated-START address byte and
    // data, independent of the write phase's PEC. The exact cumulative vs.
    // per-phase PEC coverage is unverified against real hardware (spec §9
    // open question); this crate takes the per-phase reading, which matches
    // the documented frame layout literally.
    let mut pec_input = Vec::with_capacity(1 + data.len());
    pec_input.push(addressed_byte(slave_addr, true));
    pec_input.extend_from_slice(data);
    let computed = pec::compute(&pec_input);

    if computed != expected {
        return Err(PhoenixError::Pec { expected, computed });
    }

    Ok(data.to_vec())
}

/// Issues a register write: `[SLAVE_W, CMD, ADDR_B0..B3, DATA_B0..B(width-1), PEC]`.
pub async fn write_register(
    transport: &Arc<dyn Transport>,
    slave_addr: u8,
    address: u32,
    width_bytes: u8,
    data: &[u8],
) -> Result<()> {
    let cmd = command_for(width_bytes, true)?;
    if data.len() != width_bytes as usize {
        return Err(PhoenixError::InvalidArgument(format!(
            "write_register expected {width_bytes} data bytes, got {}",
            data.len()
        )));
    }

    let mut frame = Vec::with_capacity(2 + 4 + data.len() + 1);
    frame.push(addressed_byte(slave_addr, false));
    frame.push(cmd);
    frame.extend_from_slice(&address.to_le_bytes());
    frame.extend_from_slice(data);
    let crc = pec::compute(&frame);
    frame.push(crc);

    transport.write(slave_addr, &frame[1..]).await
}
