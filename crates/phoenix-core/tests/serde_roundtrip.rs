//! Exercises the default-on `serde` feature: every public status/capture
//! type must survive a `serde_json` round trip unchanged, since external
//! surfaces (HTTP API, dashboard) depend on this for wire serialization.

use phoenix_core::eye::{EyeCapture, EyeMargins};
use phoenix_core::identity::{DataRate, LtssmState};
use phoenix_core::status::{DeviceStatus, InterruptStatus, LaneStatus, PortStatus};

fn margins(left: u16, right: u16, upper: u16, lower: u16) -> EyeMargins {
    EyeMargins {
        left_mui: left,
        right_mui: right,
        upper_mv: upper,
        lower_mv: lower,
    }
}

fn lane_status(lane: u8) -> LaneStatus {
    LaneStatus {
        lane_number: lane,
        rx_detect: true,
        tx_eq_done: true,
        rx_eq_done: false,
    }
}

#[test]
fn device_status_round_trips_through_json() {
    let status = DeviceStatus {
        temperature_c: 45,
        dvdd1_mv: 820,
        dvdd2_mv: 820,
        dvdd3_mv: 820,
        dvdd4_mv: 820,
        dvdd5_mv: 820,
        dvdd6_mv: 820,
        dvddio_mv: 1800,
        ppa_status: PortStatus {
            current_ltssm_state: LtssmState::FwdForwarding,
            current_link_speed: DataRate::Gen5_32G,
            current_link_width: 16,
            is_link_up: true,
            forwarding_mode: true,
            lane_status: (0..16).map(lane_status).collect(),
        },
        ppb_status: PortStatus {
            current_ltssm_state: LtssmState::Unknown(0xFE),
            current_link_speed: DataRate::Gen1_2P5G,
            current_link_width: 0,
            is_link_up: false,
            forwarding_mode: false,
            lane_status: Vec::new(),
        },
        interrupt_status: InterruptStatus {
            global: false,
            eq_phase_err: false,
            phy_phase_err: false,
            internal_err: false,
        },
        is_healthy: true,
    };

    let json = serde_json::to_string(&status).unwrap();
    let decoded: DeviceStatus = serde_json::from_str(&json).unwrap();

    assert_eq!(decoded.temperature_c, status.temperature_c);
    assert_eq!(decoded.dvdd1_mv, status.dvdd1_mv);
    assert_eq!(decoded.ppa_status.current_ltssm_state, status.ppa_status.current_ltssm_state);
    assert_eq!(decoded.ppa_status.lane_status.len(), 16);
    assert_eq!(decoded.ppb_status.current_ltssm_state, LtssmState::Unknown(0xFE));
    assert_eq!(decoded.is_healthy, status.is_healthy);
}

#[test]
fn eye_capture_round_trips_pam4_and_nrz_shapes() {
    let pam4 = EyeCapture {
        lane: 3,
        data_rate: DataRate::Gen6_64G,
        valid: true,
        middle: margins(100, 100, 80, 80),
        lower: Some(margins(90, 90, 40, 40)),
        upper: Some(margins(110, 110, 70, 70)),
    };
    let json = serde_json::to_string(&pam4).unwrap();
    let decoded: EyeCapture = serde_json::from_str(&json).unwrap();
    assert_eq!(decoded, pam4);

    let nrz = EyeCapture {
        lane: 0,
        data_rate: DataRate::Gen5_32G,
        valid: true,
        middle: margins(100, 100, 80, 80),
        lower: None,
        upper: None,
    };
    let json = serde_json::to_string(&nrz).unwrap();
    let decoded: EyeCapture = serde_json::from_str(&json).unwrap();
    assert_eq!(decoded, nrz);
    assert!(decoded.lower.is_none() && decoded.upper.is_none());
}
