//! Status snapshot types returned by [`crate::device::Device::get_status`].
//! These are plain data — constructing one never suspends; all suspension
//! happens in the register reads that feed it.

use crate::identity::{DataRate, LtssmState};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct InterruptStatus {
    pub global: bool,
    pub eq_phase_err: bool,
    pub phy_phase_err: bool,
    pub internal_err: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LaneStatus {
    pub lane_number: u8,
    pub rx_detect: bool,
    pub tx_eq_done: bool,
    pub rx_eq_done: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PortStatus {
    pub current_ltssm_state: LtssmState,
    pub current_link_speed: DataRate,
    pub current_link_width: u8,
    pub is_link_up: bool,
    pub forwarding_mode: bool,
    pub lane_status: Vec<LaneStatus>,
}

impl PortStatus {
    /// `is_link_up` is derived, never read directly off the wire:
    /// `forwarding_mode && ltssm == FWD_FORWARDING` (spec.md §3/§4.5).
    pub fn derive_is_link_up(forwarding_mode: bool, ltssm: LtssmState) -> bool {
        forwarding_mode && ltssm == LtssmState::FwdForwarding
    }
}

#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DeviceStatus {
    pub temperature_c: i16,
    pub dvdd1_mv: u16,
    pub dvdd2_mv: u16,
    pub dvdd3_mv: u16,
    pub dvdd4_mv: u16,
    pub dvdd5_mv: u16,
    pub dvdd6_mv: u16,
    pub dvddio_mv: u16,
    pub ppa_status: PortStatus,
    pub ppb_status: PortStatus,
    pub interrupt_status: InterruptStatus,
    pub is_healthy: bool,
}

impl DeviceStatus {
    /// `internal_err == false && temperature_c < 100` (spec.md §3).
    pub fn derive_is_healthy(interrupt_status: &InterruptStatus, temperature_c: i16) -> bool {
        !interrupt_status.internal_err && temperature_c < 100
    }
}
