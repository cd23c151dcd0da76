//! Thin typed layer over [`framing`], exposing `read_u16`/`read_u32`/
//! `write_u16`/`write_u32`. All multi-byte values are little-endian on the
//! wire. Misaligned addresses are a programmer error and fail fast with
//! `InvalidArgument` before any I/O is attempted.

use std::sync::Arc;

use crate::error::{PhoenixError, Result};
use crate::framing;
use crate::transport::Transport;

fn check_alignment(addr: u32, width_bytes: u32) -> Result<()> {
    if addr % width_bytes != 0 {
        return Err(PhoenixError::InvalidArgument(format!(
            "register address {addr:#06x} is not {width_bytes}-byte aligned"
        )));
    }
    Ok(())
}

pub async fn read_u16(transport: &Arc<dyn Transport>, slave_addr: u8, addr: u32) -> Result<u16> {
    check_alignment(addr, 2)?;
    let data = framing::read_register(transport, slave_addr, addr, 2).await?;
    Ok(u16::from_le_bytes([data[0], data[1]]))
}

pub async fn read_u32(transport: &Arc<dyn Transport>, slave_addr: u8, addr: u32) -> Result<u32> {
    check_alignment(addr, 4)?;
    let data = framing::read_register(transport, slave_addr, addr, 4).await?;
    Ok(u32::from_le_bytes([data[0], data[1], data[2], data[3]]))
}

pub async fn write_u16(
    transport: &Arc<dyn Transport>,
    slave_addr: u8,
    addr: u32,
    value: u16,
) -> Result<()> {
    check_alignment(addr, 2)?;
    framing::write_register(transport, slave_addr, addr, 2, &value.to_le_bytes()).await
}

pub async fn write_u32(
    transport: &Arc<dyn Transport>,
    slave_addr: u8,
    addr: u32,
    value: u32,
) -> Result<()> {
    check_alignment(addr, 4)?;
    framing::write_register(transport, slave_addr, addr, 4, &value.to_le_bytes()).await
}
