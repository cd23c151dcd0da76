//! Probes a bus for responders (spec.md §4.6). Discovery reuses one already
//! open [`Transport`] across every candidate address — on I2C the slave
//! address is a per-call parameter, not a property of the transport, so
//! "opening a transient transport addressed to that slave" (spec.md §4.6)
//! reduces to issuing the probe read with that address and moving on; the
//! transport itself is what the caller opened once for the whole scan.

use std::sync::Arc;

use tracing::{debug, instrument};

use crate::error::{PhoenixError, Result};
use crate::identity::{DataRate, DeviceIdentity, VENDOR_ID_BROADCOM};
use crate::regmap;
use crate::register_access;
use crate::transport::Transport;

/// For each address in ascending order, reads `GLOBAL_PARAM1`; if the read
/// succeeds and `vendor_id == 0x14E4`, reads `XAGENT_INFO_0` and
/// `GLOBAL_PARAM0` and constructs a [`DeviceIdentity`]. A NAK or PEC error
/// skips the address silently; any other transport error aborts the scan.
#[instrument(skip(transport))]
pub async fn discover(transport: &Arc<dyn Transport>, addresses: &[u8]) -> Result<Vec<DeviceIdentity>> {
    let mut sorted: Vec<u8> = addresses.to_vec();
    sorted.sort_unstable();
    sorted.dedup();

    let mut found = Vec::new();
    for addr in sorted {
        match probe_one(transport, addr).await {
            Ok(Some(identity)) => found.push(identity),
            Ok(None) => debug!(address = addr, "no responder"),
            Err(e) => return Err(e),
        }
    }
    Ok(found)
}

async fn probe_one(transport: &Arc<dyn Transport>, addr: u8) -> Result<Option<DeviceIdentity>> {
    let param1 = match register_access::read_u32(transport, addr, regmap::GLOBAL_PARAM1.address).await {
        Ok(v) => v,
        Err(PhoenixError::Transport { kind, .. }) if kind == crate::error::TransportErrorKind::Nak => {
            return Ok(None)
        }
        Err(PhoenixError::Pec { .. }) => return Ok(None),
        Err(e) => return Err(e),
    };

    let desc = &regmap::GLOBAL_PARAM1;
    let raw = param1 as u64;
    let vendor_id = desc.field("VENDOR_ID").extract(raw) as u16;
    if vendor_id != VENDOR_ID_BROADCOM {
        return Ok(None);
    }
    let device_id = desc.field("DEVICE_ID").extract(raw) as u8;
    let revision_id = desc.field("REVISION_ID").extract(raw) as u8;

    let xagent = register_access::read_u32(transport, addr, regmap::XAGENT_INFO_0.address).await? as u64;
    let xagent_desc = &regmap::XAGENT_INFO_0;
    let firmware_major = xagent_desc.field("FW_MAJOR").extract(xagent) as u8;
    let firmware_minor = xagent_desc.field("FW_MINOR").extract(xagent) as u8;
    let product_id = xagent_desc.field("PRODUCT_ID").extract(xagent) as u16;

    let param0 = register_access::read_u32(transport, addr, regmap::GLOBAL_PARAM0.address).await? as u64;
    let max_speed = DataRate::try_from(regmap::GLOBAL_PARAM0.field("MAX_DATA_RATE").extract(param0) as u8)?;

    Ok(Some(DeviceIdentity {
        vendor_id,
        device_id,
        revision_id,
        firmware_major,
        firmware_minor,
        max_speed,
        product_id,
        product_handle: 0,
        device_address: addr,
    }))
}
