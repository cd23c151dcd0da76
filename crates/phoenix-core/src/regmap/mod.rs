//! Static, read-only catalog of [`RegisterDescriptor`]s for the subset of
//! the retimer's register map documented in spec.md §6, plus the per-lane
//! extension blocks the device façade (§4.5) needs to implement PRBS,
//! per-lane link status, and eye-diagram capture. Those extension blocks
//! are not individually named in §6 (which documents TX-coefficient and
//! error-statistics base+stride addressing only); their exact offsets are
//! this crate's own addressing scheme, recorded in `DESIGN.md`, and are
//! internal to `phoenix-core` — no external consumer should depend on
//! their literal values.

pub mod fields;

pub use fields::FieldDescriptor;

use crate::identity::DataRate;

/// A named register: its address, wire width, and the bitfields within it.
/// Invariant: `fields` are sorted ascending by `lsb` and non-overlapping,
/// and every field's `msb < width_bytes * 8`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterDescriptor {
    pub name: &'static str,
    pub address: u32,
    pub width_bytes: u8,
    pub description: &'static str,
    pub fields: &'static [FieldDescriptor],
}

impl RegisterDescriptor {
    /// Looks up a field by name. Panics if `name` isn't in `fields` — that
    /// is a bug in this crate's static catalog, never reachable from
    /// external input, so the device façade calls this with literal names.
    pub fn field(&self, name: &str) -> &FieldDescriptor {
        self.fields
            .iter()
            .find(|f| f.name == name)
            .unwrap_or_else(|| panic!("{}: no such field {name}", self.name))
    }
}

macro_rules! fields {
    ($($name:expr, $lsb:expr, $msb:expr, $desc:expr);* $(;)?) => {
        &[$(FieldDescriptor::new($name, $lsb, $msb, $desc)),*]
    };
}

pub static GLOBAL_PARAM0: RegisterDescriptor = RegisterDescriptor {
    name: "GLOBAL_PARAM0",
    address: 0x0000,
    width_bytes: 4,
    description: "Profile, bifurcation, clocking, and link-behavior configuration",
    // ENH_LINK_BEHAV is documented in spec.md §6 as [20:18], which overlaps
    // CLK_MODE[18:16] by one bit. Treated as a transcription error in the
    // source documentation and corrected to [20:19] here so fields are
    // non-overlapping, per the RegisterDescriptor invariant in spec.md §3.
    fields: fields![
        "PROFILE", 0, 2, "Device operating profile";
        "BIFURCATION", 7, 12, "Lane bifurcation mode (BifurcationMode)";
        "EEPROM_DATA_VAL", 13, 14, "EEPROM data valid indicator";
        "AUTOINC", 15, 15, "Auto-increment register addressing";
        "CLK_MODE", 16, 18, "Reference clocking mode (ClockingMode)";
        "ENH_LINK_BEHAV", 19, 20, "Enhanced link behavior (corrected from documented [20:18])";
        "EEPROM_TIMEOUT", 21, 23, "EEPROM access timeout selector";
        "MAX_DATA_RATE", 24, 26, "Maximum negotiated data rate (DataRate)";
        "SRIS_PAYLOAD", 28, 30, "SRIS payload size selector";
        "PORT_ORIEN", 31, 31, "Port orientation (lane-flip)";
    ],
};

pub static GLOBAL_PARAM1: RegisterDescriptor = RegisterDescriptor {
    name: "GLOBAL_PARAM1",
    address: 0x0004,
    width_bytes: 4,
    description: "Device identification: revision, device, and vendor IDs",
    fields: fields![
        "REVISION_ID", 0, 7, "Silicon revision";
        "DEVICE_ID", 8, 15, "Device identifier";
        "VENDOR_ID", 16, 31, "JEDEC vendor identifier (Broadcom = 0x14E4)";
    ],
};

/// Per-struct-field bit ordering within `GLOBAL_INTR`'s status/enable
/// nibbles is not pinned by spec.md beyond "bits [3:0]" / "bits [19:16]"
/// collectively; this crate assigns them in the order
/// `DeviceStatus::interrupt_status`'s fields are declared
/// (global, eq_phase_err, phy_phase_err, internal_err), enable bits shifted
/// up by 16 in the same order.
pub static GLOBAL_INTR: RegisterDescriptor = RegisterDescriptor {
    name: "GLOBAL_INTR",
    address: 0x0008,
    width_bytes: 4,
    description: "Interrupt status (bits 3:0) and enable (bits 19:16)",
    fields: fields![
        "STATUS_GLOBAL", 0, 0, "Global interrupt status";
        "STATUS_EQ_PHASE_ERR", 1, 1, "Equalization phase error status";
        "STATUS_PHY_PHASE_ERR", 2, 2, "PHY phase error status";
        "STATUS_INTERNAL_ERR", 3, 3, "Internal error status";
        "ENABLE_GLOBAL", 16, 16, "Global interrupt enable";
        "ENABLE_EQ_PHASE_ERR", 17, 17, "Equalization phase error interrupt enable";
        "ENABLE_PHY_PHASE_ERR", 18, 18, "PHY phase error interrupt enable";
        "ENABLE_INTERNAL_ERR", 19, 19, "Internal error interrupt enable";
    ],
};

pub static RESET_CTRL: RegisterDescriptor = RegisterDescriptor {
    name: "RESET_CTRL",
    address: 0x0010,
    width_bytes: 4,
    description: "One-hot reset strobes",
    fields: fields![
        "HARD", 0, 0, "Hard reset";
        "SOFT", 1, 1, "Soft reset (preserves configuration)";
        "MAC", 2, 2, "MAC-layer reset";
        "PERST", 3, 3, "PCIe PERST# assertion";
        "GLOBAL_SWRST", 4, 4, "Global software reset (preserves configuration)";
    ],
};

pub static TEMPERATURE: RegisterDescriptor = RegisterDescriptor {
    name: "TEMPERATURE",
    address: 0x0100,
    width_bytes: 4,
    description: "Die temperature, signed degrees Celsius",
    fields: fields![
        "VALUE", 0, 15, "Signed temperature in degrees Celsius";
        "VALID", 31, 31, "Temperature reading valid";
    ],
};

/// `(name, address)` for the eight voltage-rail registers, `0x0104..=0x011C`.
pub static VOLTAGE_RAILS: &[(&str, u32)] = &[
    ("DVDD1", 0x0104),
    ("DVDD2", 0x0108),
    ("DVDD3", 0x010C),
    ("DVDD4", 0x0110),
    ("DVDD5", 0x0114),
    ("DVDD6", 0x0118),
    ("DVDDIO", 0x011C),
];

static VOLTAGE_VALUE_FIELD: &[FieldDescriptor] = fields!["VALUE", 0, 15, "Rail voltage in millivolts";];

/// Builds the descriptor for a voltage rail by name (`"DVDD1"`..`"DVDD6"`,
/// `"DVDDIO"`).
pub fn voltage_register(rail: &str) -> Option<RegisterDescriptor> {
    VOLTAGE_RAILS
        .iter()
        .find(|(name, _)| *name == rail)
        .map(|(name, address)| RegisterDescriptor {
            name,
            address: *address,
            width_bytes: 4,
            description: "Voltage rail, millivolts",
            fields: VOLTAGE_VALUE_FIELD,
        })
}

pub static XAGENT_INFO_0: RegisterDescriptor = RegisterDescriptor {
    name: "XAGENT_INFO_0",
    address: 0x4000,
    width_bytes: 4,
    description: "Firmware version and product identification",
    fields: fields![
        "FW_MINOR", 0, 7, "Firmware minor version";
        "FW_MAJOR", 8, 15, "Firmware major version";
        "PRODUCT_ID", 16, 31, "Product identifier";
    ],
};

static LTSSM_FIELDS: &[FieldDescriptor] = fields![
    "CURRENT_STATE", 0, 7, "Current LTSSM state";
    "LINK_SPEED", 8, 11, "Current link speed (DataRate)";
    "LINK_WIDTH", 12, 16, "Current link width in lanes";
    "FORWARDING_MODE", 17, 17, "Forwarding mode active";
];

pub static PPA_LTSSM_STATE: RegisterDescriptor = RegisterDescriptor {
    name: "PPA_LTSSM_STATE",
    address: 0x8000,
    width_bytes: 4,
    description: "Pseudo Port A link training state and status",
    fields: LTSSM_FIELDS,
};

pub static PPB_LTSSM_STATE: RegisterDescriptor = RegisterDescriptor {
    name: "PPB_LTSSM_STATE",
    address: 0xC000,
    width_bytes: 4,
    description: "Pseudo Port B link training state and status",
    fields: LTSSM_FIELDS,
};

/// Which pseudo port a per-lane register block belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Port {
    A,
    B,
}

/// Per-lane link status, one register per lane per port. Not individually
/// addressed in spec.md §6 (which only gives the port-level LTSSM
/// register); this crate's own addressing, base `0x8100` (PPA) / `0xC100`
/// (PPB), stride `0x04`.
pub const LANE_STATUS_STRIDE: u32 = 0x04;

static LANE_STATUS_FIELDS: &[FieldDescriptor] = fields![
    "RX_DETECT", 0, 0, "Receiver detect on this lane";
    "TX_EQ_DONE", 1, 1, "Transmitter equalization complete";
    "RX_EQ_DONE", 2, 2, "Receiver equalization complete";
];

pub fn lane_status_register(port: Port, lane: u8) -> RegisterDescriptor {
    let base = match port {
        Port::A => 0x8100,
        Port::B => 0xC100,
    };
    RegisterDescriptor {
        name: "LANE_STATUS",
        address: base + u32::from(lane) * LANE_STATUS_STRIDE,
        width_bytes: 4,
        description: "Per-lane receiver detect and equalization completion",
        fields: LANE_STATUS_FIELDS,
    }
}

pub const LANE_COUNT: u8 = 16;

/// Per-lane TX-coefficient base addresses by generation, per spec.md §6.
/// Stride between lanes within a generation is `0x10`.
pub fn tx_coefficient_base(gen: DataRate) -> Option<u32> {
    match gen {
        DataRate::Gen3_8G => Some(0x0200),
        DataRate::Gen4_16G => Some(0x0280),
        DataRate::Gen5_32G => Some(0x0300),
        DataRate::Gen6_64G => Some(0x0380),
        _ => None,
    }
}

pub fn tx_coefficient_address(gen: DataRate, lane: u8) -> Option<u32> {
    tx_coefficient_base(gen).map(|base| base + u32::from(lane) * 0x10)
}

/// Per-lane PRBS error-statistics block, base `0x0500`, stride `0x20`.
/// Layout (this crate's own addressing, not individually specified in
/// spec.md §6): `BIT_COUNT_LO/HI`, `ERROR_COUNT_LO/HI`, `PRBS_STATUS`.
pub const ERROR_STATS_BASE: u32 = 0x0500;
pub const ERROR_STATS_STRIDE: u32 = 0x20;

pub fn error_stats_base(lane: u8) -> u32 {
    ERROR_STATS_BASE + u32::from(lane) * ERROR_STATS_STRIDE
}

pub const ERROR_STATS_BIT_COUNT_LO_OFFSET: u32 = 0x00;
pub const ERROR_STATS_BIT_COUNT_HI_OFFSET: u32 = 0x04;
pub const ERROR_STATS_ERROR_COUNT_LO_OFFSET: u32 = 0x08;
pub const ERROR_STATS_ERROR_COUNT_HI_OFFSET: u32 = 0x0C;
pub const ERROR_STATS_STATUS_OFFSET: u32 = 0x10;

static PRBS_STATUS_FIELDS: &[FieldDescriptor] = fields![
    "SYNC_ACQUIRED", 0, 0, "PRBS checker has acquired bit sync";
    "TEST_COMPLETE", 1, 1, "PRBS test has completed its configured sample count";
];

pub fn prbs_status_register(lane: u8) -> RegisterDescriptor {
    RegisterDescriptor {
        name: "PRBS_STATUS",
        address: error_stats_base(lane) + ERROR_STATS_STATUS_OFFSET,
        width_bytes: 4,
        description: "Per-lane PRBS sync/completion status",
        fields: PRBS_STATUS_FIELDS,
    }
}

/// Per-lane PRBS control block, base `0x0600`, stride `0x10` (this crate's
/// own addressing). `PRBS_CTRL` holds generator enable and pattern select;
/// `SAMPLE_COUNT` holds the configured per-lane sample count.
pub const PRBS_CTRL_BASE: u32 = 0x0600;
pub const PRBS_CTRL_STRIDE: u32 = 0x10;

static PRBS_CTRL_FIELDS: &[FieldDescriptor] = fields![
    "GEN_ENABLE", 0, 0, "PRBS generator enable for this lane";
    "PATTERN_SEL", 1, 4, "PRBS pattern selector (PRBSPattern)";
];

pub fn prbs_ctrl_register(lane: u8) -> RegisterDescriptor {
    RegisterDescriptor {
        name: "PRBS_CTRL",
        address: PRBS_CTRL_BASE + u32::from(lane) * PRBS_CTRL_STRIDE,
        width_bytes: 4,
        description: "Per-lane PRBS generator enable and pattern select",
        fields: PRBS_CTRL_FIELDS,
    }
}

pub fn prbs_sample_count_address(lane: u8) -> u32 {
    PRBS_CTRL_BASE + u32::from(lane) * PRBS_CTRL_STRIDE + 0x04
}

/// Global PRBS start/stop strobe (this crate's own addressing).
pub static PRBS_GLOBAL_CTRL: RegisterDescriptor = RegisterDescriptor {
    name: "PRBS_GLOBAL_CTRL",
    address: 0x0020,
    width_bytes: 4,
    description: "Global PRBS start/stop strobe",
    fields: fields!["START", 0, 0, "Global PRBS start bit";],
};

/// Per-lane eye-diagram capture block, base `0x0700`, stride `0x20` (this
/// crate's own addressing). `CTRL` triggers a single-shot capture and
/// reports validity; the three eye regions each get a horizontal
/// (left/right, mUI) and vertical (upper/lower, mV) register.
pub const EYE_CAPTURE_BASE: u32 = 0x0700;
pub const EYE_CAPTURE_STRIDE: u32 = 0x20;

pub fn eye_capture_base(lane: u8) -> u32 {
    EYE_CAPTURE_BASE + u32::from(lane) * EYE_CAPTURE_STRIDE
}

pub const EYE_CTRL_OFFSET: u32 = 0x00;
pub const EYE_MIDDLE_HORIZ_OFFSET: u32 = 0x04;
pub const EYE_MIDDLE_VERT_OFFSET: u32 = 0x08;
pub const EYE_LOWER_HORIZ_OFFSET: u32 = 0x0C;
pub const EYE_LOWER_VERT_OFFSET: u32 = 0x10;
pub const EYE_UPPER_HORIZ_OFFSET: u32 = 0x14;
pub const EYE_UPPER_VERT_OFFSET: u32 = 0x18;

static EYE_CTRL_FIELDS: &[FieldDescriptor] = fields![
    "TRIGGER", 0, 0, "Single-shot capture trigger";
    "DATA_RATE_SEL", 1, 3, "Data rate to capture at (DataRate)";
    "CAPTURE_VALID", 4, 4, "Capture complete and valid";
];

pub fn eye_ctrl_register(lane: u8) -> RegisterDescriptor {
    RegisterDescriptor {
        name: "EYE_CTRL",
        address: eye_capture_base(lane) + EYE_CTRL_OFFSET,
        width_bytes: 4,
        description: "Per-lane eye-diagram capture trigger and validity",
        fields: EYE_CTRL_FIELDS,
    }
}

static EYE_HORIZ_FIELDS: &[FieldDescriptor] = fields![
    "LEFT_MUI", 0, 15, "Left horizontal margin, milli-UI";
    "RIGHT_MUI", 16, 31, "Right horizontal margin, milli-UI";
];

static EYE_VERT_FIELDS: &[FieldDescriptor] = fields![
    "UPPER_MV", 0, 15, "Upper vertical margin, millivolts";
    "LOWER_MV", 16, 31, "Lower vertical margin, millivolts";
];

pub fn eye_horiz_fields() -> &'static [FieldDescriptor] {
    EYE_HORIZ_FIELDS
}

pub fn eye_vert_fields() -> &'static [FieldDescriptor] {
    EYE_VERT_FIELDS
}

/// Every statically-defined register, for invariant checks (see tests).
fn static_catalog() -> Vec<&'static RegisterDescriptor> {
    vec![
        &GLOBAL_PARAM0,
        &GLOBAL_PARAM1,
        &GLOBAL_INTR,
        &RESET_CTRL,
        &TEMPERATURE,
        &XAGENT_INFO_0,
        &PPA_LTSSM_STATE,
        &PPB_LTSSM_STATE,
        &PRBS_GLOBAL_CTRL,
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn check_invariants(desc: &RegisterDescriptor) {
        let max_bit = desc.width_bytes * 8;
        let mut prev_msb: Option<u8> = None;
        for field in desc.fields {
            assert!(
                field.lsb <= field.msb,
                "{}.{}: lsb > msb",
                desc.name,
                field.name
            );
            assert!(
                field.msb < max_bit,
                "{}.{}: msb {} exceeds register width {}",
                desc.name,
                field.name,
                field.msb,
                max_bit
            );
            if let Some(prev) = prev_msb {
                assert!(
                    field.lsb > prev,
                    "{}.{}: overlaps or is out of order with the previous field",
                    desc.name,
                    field.name
                );
            }
            prev_msb = Some(field.msb);
        }
    }

    #[test]
    fn static_catalog_invariants_hold() {
        for desc in static_catalog() {
            check_invariants(desc);
        }
        for (rail, _) in VOLTAGE_RAILS {
            check_invariants(&voltage_register(rail).unwrap());
        }
    }

    #[test]
    fn voltage_register_addresses_match_documented_range() {
        assert_eq!(voltage_register("DVDD1").unwrap().address, 0x0104);
        assert_eq!(voltage_register("DVDDIO").unwrap().address, 0x011C);
        assert!(voltage_register("NOPE").is_none());
    }

    #[test]
    fn tx_coefficient_addressing_matches_documented_bases() {
        assert_eq!(tx_coefficient_address(DataRate::Gen3_8G, 0), Some(0x0200));
        assert_eq!(tx_coefficient_address(DataRate::Gen3_8G, 1), Some(0x0210));
        assert_eq!(tx_coefficient_address(DataRate::Gen6_64G, 15), Some(0x0380 + 15 * 0x10));
        assert_eq!(tx_coefficient_address(DataRate::Gen1_2P5G, 0), None);
    }

    #[test]
    fn error_stats_stride_is_applied_per_lane() {
        assert_eq!(error_stats_base(0), 0x0500);
        assert_eq!(error_stats_base(1), 0x0520);
        assert_eq!(error_stats_base(15), 0x0500 + 15 * 0x20);
    }
}
