//! spec.md §8 scenario 5 and the PRBS state-machine boundary behavior.

use std::sync::Arc;

use phoenix_core::device::Device;
use phoenix_core::error::ErrorKind;
use phoenix_core::identity::{DataRate, DeviceIdentity, PRBSPattern};
use phoenix_core::prbs::PRBSConfig;
use phoenix_core::regmap;
use phoenix_core::transport::Transport;
use phoenix_core::Result;
use phoenix_mock::MockTransport;

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
async fn scenario_5_reports_ber_for_error_free_and_errored_lanes() -> Result<()> {
    let mock = Arc::new(MockTransport::new());
    let transport: Arc<dyn Transport> = mock.clone();
    let device = Device::new(transport, 0x50, dummy_identity());

    device
        .start_prbs(PRBSConfig {
            lanes: vec![0, 1],
            pattern: PRBSPattern::Prbs31,
            sample_count: 0x0010_0000,
        })
        .await?;

    for (lane, bits, errors) in [(0u8, 1u32 << 20, 0u32), (1u8, 1u32 << 20, 1u32)] {
        let base = regmap::error_stats_base(lane);
        mock.seed_u32(0x50, base + regmap::ERROR_STATS_BIT_COUNT_LO_OFFSET, bits);
        mock.seed_u32(0x50, base + regmap::ERROR_STATS_BIT_COUNT_HI_OFFSET, 0);
        mock.seed_u32(0x50, base + regmap::ERROR_STATS_ERROR_COUNT_LO_OFFSET, errors);
        mock.seed_u32(0x50, base + regmap::ERROR_STATS_ERROR_COUNT_HI_OFFSET, 0);
    }

    let results = device.get_prbs_results().await?;
    assert_eq!(results.len(), 2);
    assert_eq!(results[0].ber, "< 1e-15");
    assert_eq!(results[1].ber, "9.54e-07");
    Ok(())
}

#[tokio::test]
async fn boundary_get_prbs_results_before_start_fails() {
    let mock = Arc::new(MockTransport::new());
    let transport: Arc<dyn Transport> = mock;
    let device = Device::new(transport, 0x50, dummy_identity());

    let err = device.get_prbs_results().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    assert!(err.message().contains("prbs not started"));
}
