//! spec.md §8 scenario 2 and the temperature-invalid boundary behavior.

use std::sync::Arc;

use phoenix_core::device::Device;
use phoenix_core::identity::{DataRate, DeviceIdentity, LtssmState};
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

fn seed_minimal_status(mock: &MockTransport) {
    // Every per-lane status register the façade reads must resolve, even
    // though this scenario only cares about temperature and PPA LTSSM.
    for lane in 0..regmap::LANE_COUNT {
        mock.seed_u32(0x50, regmap::lane_status_register(regmap::Port::A, lane).address, 0);
        mock.seed_u32(0x50, regmap::lane_status_register(regmap::Port::B, lane).address, 0);
    }
    mock.seed_u32(0x50, regmap::PPB_LTSSM_STATE.address, 0);
    for (_, addr) in regmap::VOLTAGE_RAILS {
        mock.seed_u32(0x50, *addr, 0);
    }
}

#[tokio::test]
async fn scenario_2_decodes_temperature_voltage_and_ppa_status() -> Result<()> {
    let mock = Arc::new(MockTransport::new());
    seed_minimal_status(&mock);
    mock.seed_u32(0x50, regmap::TEMPERATURE.address, 0x8000_002D);
    mock.seed_u32(0x50, regmap::VOLTAGE_RAILS[0].1, 0x0000_0334);
    mock.seed_u32(0x50, regmap::GLOBAL_INTR.address, 0);
    mock.seed_u32(0x50, regmap::PPA_LTSSM_STATE.address, 0x0001_0404);

    let transport: Arc<dyn Transport> = mock;
    let device = Device::new(transport, 0x50, dummy_identity());

    let status = device.get_status().await?;
    assert_eq!(status.temperature_c, 45);
    assert_eq!(status.dvdd1_mv, 820);
    assert!(status.is_healthy);
    assert_eq!(status.ppa_status.current_ltssm_state, LtssmState::FwdForwarding);
    assert_eq!(status.ppa_status.current_link_speed, DataRate::Gen5_32G);
    assert_eq!(status.ppa_status.current_link_width, 16);
    assert!(!status.ppa_status.forwarding_mode);
    Ok(())
}

#[tokio::test]
async fn boundary_temperature_invalid_bit_forces_zero_and_unhealthy() -> Result<()> {
    let mock = Arc::new(MockTransport::new());
    seed_minimal_status(&mock);
    mock.seed_u32(0x50, regmap::TEMPERATURE.address, 0x0000_0045); // VALID clear
    mock.seed_u32(0x50, regmap::GLOBAL_INTR.address, 0);
    mock.seed_u32(0x50, regmap::PPA_LTSSM_STATE.address, 0);

    let transport: Arc<dyn Transport> = mock;
    let device = Device::new(transport, 0x50, dummy_identity());

    let status = device.get_status().await?;
    assert_eq!(status.temperature_c, 0);
    assert!(!status.is_healthy);
    Ok(())
}
