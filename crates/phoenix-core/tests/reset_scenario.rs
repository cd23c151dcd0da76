//! spec.md §8 scenario 4: `reset(SOFT)` tolerates a handful of NAKs on the
//! post-reset probe before XAGENT_INFO_0 comes back.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use async_trait::async_trait;

use phoenix_core::device::Device;
use phoenix_core::error::{PhoenixError, Result, TransportErrorKind};
use phoenix_core::identity::{DataRate, DeviceIdentity, ResetType};
use phoenix_core::regmap;
use phoenix_core::transport::Transport;
use phoenix_mock::MockTransport;

/// Wraps a [`MockTransport`], NAKing the first `n` reads of a given
/// register before delegating to the inner mock — models the device
/// dropping off the bus for a bounded window after a reset strobe.
struct FlakyProbeTransport {
    inner: MockTransport,
    probe_addr: u32,
    remaining_naks: AtomicU32,
}

#[async_trait]
impl Transport for FlakyProbeTransport {
    async fn close(&self) -> Result<()> {
        self.inner.close().await
    }

    async fn write(&self, slave_addr: u8, bytes: &[u8]) -> Result<()> {
        self.inner.write(slave_addr, bytes).await
    }

    async fn read(&self, slave_addr: u8, n: usize) -> Result<Vec<u8>> {
        self.inner.read(slave_addr, n).await
    }

    async fn write_read(&self, slave_addr: u8, write_bytes: &[u8], read_len: usize) -> Result<Vec<u8>> {
        let address = u32::from_le_bytes([write_bytes[1], write_bytes[2], write_bytes[3], write_bytes[4]]);
        if address == self.probe_addr {
            let remaining = self.remaining_naks.load(Ordering::SeqCst);
            if remaining > 0 {
                self.remaining_naks.fetch_sub(1, Ordering::SeqCst);
                return Err(PhoenixError::transport(TransportErrorKind::Nak, "post-reset NAK"));
            }
        }
        self.inner.write_read(slave_addr, write_bytes, read_len).await
    }
}

fn dummy_identity() -> DeviceIdentity {
    DeviceIdentity {
        vendor_id: 0x14E4,
        device_id: 0x02,
        revision_id: 0x01,
        firmware_major: 1,
        firmware_minor: 0,
        max_speed: DataRate::Gen6_64G,
        product_id: 0xABCD,
        product_handle: 1,
        device_address: 0x50,
    }
}

#[tokio::test]
async fn scenario_4_reset_tolerates_three_post_reset_naks() -> Result<()> {
    let inner = MockTransport::new();
    inner.seed_u32(0x50, regmap::XAGENT_INFO_0.address, 0xABCD_0123);

    let transport: Arc<dyn Transport> = Arc::new(FlakyProbeTransport {
        inner,
        probe_addr: regmap::XAGENT_INFO_0.address,
        remaining_naks: AtomicU32::new(3),
    });
    let device = Device::new(transport, 0x50, dummy_identity());

    device.reset(ResetType::Soft).await
}
