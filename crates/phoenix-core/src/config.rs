//! Decoded configuration ([`Configuration`]) and the partial patch record
//! ([`ConfigurationUpdate`]) spec.md §9 calls for in place of a loose
//! keyword-style configuration object: every field is optional, and
//! "unspecified" is distinct from "set to default".

use crate::identity::{BifurcationMode, ClockingMode, DataRate};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct InterruptEnables {
    pub global: bool,
    pub eq_phase_err: bool,
    pub phy_phase_err: bool,
    pub internal_err: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Configuration {
    pub bifurcation_mode: BifurcationMode,
    pub max_data_rate: DataRate,
    pub clocking_mode: ClockingMode,
    pub port_orientation: bool,
    pub interrupt_enables: InterruptEnables,
}

/// A partial patch applied read-modify-write onto `GLOBAL_PARAM0` and
/// `GLOBAL_INTR`. Absent fields mean "unchanged" — distinct from setting a
/// field back to its power-on default.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ConfigurationUpdate {
    pub bifurcation_mode: Option<BifurcationMode>,
    pub max_data_rate: Option<DataRate>,
    pub clocking_mode: Option<ClockingMode>,
    pub port_orientation: Option<bool>,
    pub interrupt_enables: Option<InterruptEnables>,
}

impl ConfigurationUpdate {
    /// True if this update touches `GLOBAL_PARAM0` at all.
    pub fn touches_global_param0(&self) -> bool {
        self.bifurcation_mode.is_some()
            || self.max_data_rate.is_some()
            || self.clocking_mode.is_some()
            || self.port_orientation.is_some()
    }

    /// True if this update touches `GLOBAL_INTR`'s enable nibble.
    pub fn touches_global_intr(&self) -> bool {
        self.interrupt_enables.is_some()
    }
}
