//! spec.md §8 scenario 1 and the discovery boundary behavior.

use std::sync::Arc;

use phoenix_core::identity::VENDOR_ID_BROADCOM;
use phoenix_core::regmap;
use phoenix_core::transport::Transport;
use phoenix_core::{discovery, Result};
use phoenix_mock::MockTransport;

#[tokio::test]
async fn scenario_1_discovers_one_responder_and_skips_a_nak() -> Result<()> {
    let mock = Arc::new(MockTransport::new());
    mock.seed_u32(0x50, regmap::GLOBAL_PARAM1.address, 0x14E4_02_01);
    mock.seed_u32(0x50, regmap::XAGENT_INFO_0.address, 0xABCD_0123);
    mock.seed_u32(0x50, regmap::GLOBAL_PARAM0.address, 0x0400_0000);
    mock.set_nak(0x51, true);

    let transport: Arc<dyn Transport> = mock;
    let found = discovery::discover(&transport, &[0x50, 0x51]).await?;

    assert_eq!(found.len(), 1, "0x51 NAKed and must not appear");
    let identity = &found[0];
    assert_eq!(identity.device_address, 0x50);
    assert_eq!(identity.vendor_id, VENDOR_ID_BROADCOM);
    assert_eq!(identity.device_id, 0x02);
    assert_eq!(identity.revision_id, 0x01);
    assert_eq!((identity.firmware_major, identity.firmware_minor), (1, 35));
    assert_eq!(identity.product_id, 0xABCD);
    Ok(())
}

#[tokio::test]
async fn boundary_nak_address_returns_no_entry_and_no_error() -> Result<()> {
    let mock = Arc::new(MockTransport::new());
    mock.set_nak(0x55, true);
    let transport: Arc<dyn Transport> = mock;

    let found = discovery::discover(&transport, &[0x55]).await?;
    assert!(found.is_empty());
    Ok(())
}
