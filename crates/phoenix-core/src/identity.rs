//! Device identity and the small, closed enumerations spec.md §6 pins
//! exact codes for. Where §6 leaves a table unspecified (the 33
//! `BifurcationMode` names, the full 35+ `LtssmState` table, `PRBSPattern`),
//! this module is explicit in its doc comments about what is pinned by the
//! spec versus this crate's own placeholder numbering — see `DESIGN.md`.

use crate::error::{PhoenixError, Result};

pub const VENDOR_ID_BROADCOM: u16 = 0x14E4;

/// `DataRate::GEN1_2P5G = 0 .. GEN6_64G = 5`, per spec.md §6.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum DataRate {
    Gen1_2P5G = 0,
    Gen2_5G = 1,
    Gen3_8G = 2,
    Gen4_16G = 3,
    Gen5_32G = 4,
    Gen6_64G = 5,
}

impl DataRate {
    pub const fn code(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for DataRate {
    type Error = PhoenixError;

    fn try_from(value: u8) -> Result<Self> {
        Ok(match value {
            0 => Self::Gen1_2P5G,
            1 => Self::Gen2_5G,
            2 => Self::Gen3_8G,
            3 => Self::Gen4_16G,
            4 => Self::Gen5_32G,
            5 => Self::Gen6_64G,
            other => {
                return Err(PhoenixError::InvalidArgument(format!(
                    "{other} is not a valid DataRate code (0..=5)"
                )))
            }
        })
    }
}

/// `ClockingMode`, codes 0..5 per spec.md §6.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum ClockingMode {
    CommonWoSsc = 0,
    CommonSsc = 1,
    SrnsWoSsc = 2,
    SrisSsc = 3,
    SrisWoSsc = 4,
    SrisWoSscLl = 5,
}

impl TryFrom<u8> for ClockingMode {
    type Error = PhoenixError;

    fn try_from(value: u8) -> Result<Self> {
        Ok(match value {
            0 => Self::CommonWoSsc,
            1 => Self::CommonSsc,
            2 => Self::SrnsWoSsc,
            3 => Self::SrisSsc,
            4 => Self::SrisWoSsc,
            5 => Self::SrisWoSscLl,
            other => {
                return Err(PhoenixError::InvalidArgument(format!(
                    "{other} is not a valid ClockingMode code (0..=5)"
                )))
            }
        })
    }
}

/// Lane bifurcation mode. spec.md §6 documents 33 variants "mapping 1:1 to
/// the documented table" but does not carry that table forward, so this is
/// a bounds-checked newtype (valid codes `0..=32`) rather than a 33-variant
/// enum with invented names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BifurcationMode(u8);

impl BifurcationMode {
    pub const MAX_CODE: u8 = 32;

    pub fn new(code: u8) -> Result<Self> {
        if code > Self::MAX_CODE {
            return Err(PhoenixError::InvalidArgument(format!(
                "bifurcation code {code} exceeds the documented range 0..=32"
            )));
        }
        Ok(Self(code))
    }

    pub const fn code(self) -> u8 {
        self.0
    }
}

/// PCIe Link Training and Status State Machine state. spec.md §6 pins only
/// `FWD_FORWARDING = 0x04`; the remaining named variants are this crate's
/// own assignment of well-known, architecturally standard PCIe LTSSM
/// states and must be verified against real firmware before being relied
/// on for anything beyond display. Any other code decodes to `Unknown(u8)`
/// so the status UI can still render it (spec.md §9 design note).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum LtssmState {
    Detect,
    Polling,
    Configuration,
    Recovery,
    /// Pinned: `FWD_FORWARDING = 0x04` (spec.md §4.5/§6).
    FwdForwarding,
    L0,
    L0s,
    L1,
    L2,
    Disabled,
    LoopBack,
    HotReset,
    Unknown(u8),
}

impl LtssmState {
    pub const FWD_FORWARDING_CODE: u8 = 0x04;

    pub fn from_code(code: u8) -> Self {
        match code {
            0x00 => Self::Detect,
            0x01 => Self::Polling,
            0x02 => Self::Configuration,
            0x03 => Self::Recovery,
            0x04 => Self::FwdForwarding,
            0x05 => Self::L0,
            0x06 => Self::L0s,
            0x07 => Self::L1,
            0x08 => Self::L2,
            0x09 => Self::Disabled,
            0x0A => Self::LoopBack,
            0x0B => Self::HotReset,
            other => Self::Unknown(other),
        }
    }

    pub fn code(self) -> u8 {
        match self {
            Self::Detect => 0x00,
            Self::Polling => 0x01,
            Self::Configuration => 0x02,
            Self::Recovery => 0x03,
            Self::FwdForwarding => 0x04,
            Self::L0 => 0x05,
            Self::L0s => 0x06,
            Self::L1 => 0x07,
            Self::L2 => 0x08,
            Self::Disabled => 0x09,
            Self::LoopBack => 0x0A,
            Self::HotReset => 0x0B,
            Self::Unknown(code) => code,
        }
    }
}

/// Reset strobe selection, one-hot against `RESET_CTRL` (spec.md §4.5/§6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ResetType {
    Hard,
    Soft,
    Mac,
    Perst,
    GlobalSwrst,
}

impl ResetType {
    pub const fn bit(self) -> u8 {
        match self {
            Self::Hard => 0,
            Self::Soft => 1,
            Self::Mac => 2,
            Self::Perst => 3,
            Self::GlobalSwrst => 4,
        }
    }

    /// `SOFT` and `GLOBAL_SWRST` preserve device configuration (spec.md
    /// §4.5); the façade relies on this to decide whether it must warn
    /// about lost configuration after a reset completes.
    pub const fn preserves_configuration(self) -> bool {
        matches!(self, Self::Soft | Self::GlobalSwrst)
    }
}

/// PRBS test pattern. spec.md §6 references "PRBSPattern as listed in the
/// reference tables" without carrying the table forward; this crate uses
/// the industry-standard PRBS polynomial names or the scientific literature
/// (PRBS7/9/15/23/31) with its own sequential code assignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum PRBSPattern {
    Prbs7 = 0,
    Prbs9 = 1,
    Prbs15 = 2,
    Prbs23 = 3,
    Prbs31 = 4,
}

/// Immutable device identity, fixed once at connect/probe time (spec.md
/// §3).
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DeviceIdentity {
    pub vendor_id: u16,
    pub device_id: u8,
    pub revision_id: u8,
    pub firmware_major: u8,
    pub firmware_minor: u8,
    pub max_speed: DataRate,
    /// Hardware-reported product identifier, `XAGENT_INFO_0.PRODUCT_ID`
    /// (spec.md §4.6) — distinct from `product_handle` below.
    pub product_id: u16,
    /// Assigned by [`crate::registry::DeviceRegistry`] at connect time; `0`
    /// for identities constructed directly by [`crate::discovery::discover`]
    /// before a handle has been allocated.
    pub product_handle: u32,
    /// I2C only; `0` for UART.
    pub device_address: u8,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_rate_round_trips_documented_codes() {
        for code in 0u8..=5 {
            let rate = DataRate::try_from(code).unwrap();
            assert_eq!(rate.code(), code);
        }
        assert!(DataRate::try_from(6).is_err());
    }

    #[test]
    fn ltssm_unknown_state_round_trips() {
        let s = LtssmState::from_code(0xFE);
        assert_eq!(s, LtssmState::Unknown(0xFE));
        assert_eq!(s.code(), 0xFE);
    }

    #[test]
    fn ltssm_fwd_forwarding_is_pinned_code() {
        assert_eq!(
            LtssmState::from_code(LtssmState::FWD_FORWARDING_CODE),
            LtssmState::FwdForwarding
        );
    }

    #[test]
    fn bifurcation_mode_bounds_checked() {
        assert!(BifurcationMode::new(32).is_ok());
        assert!(BifurcationMode::new(33).is_err());
    }

    #[test]
    fn reset_type_preserves_configuration_matches_spec() {
        assert!(ResetType::Soft.preserves_configuration());
        assert!(ResetType::GlobalSwrst.preserves_configuration());
        assert!(!ResetType::Hard.preserves_configuration());
        assert!(!ResetType::Mac.preserves_configuration());
        assert!(!ResetType::Perst.preserves_configuration());
    }
}
