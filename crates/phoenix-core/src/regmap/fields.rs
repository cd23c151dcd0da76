//! Pure bitfield extraction/insertion. No I/O, no suspension points — these
//! are plain computation over already-read register values.

/// One named, contiguous bit range within a register.
// Only `Serialize` is derived here (not `Deserialize`): the `&'static str`
// fields identify catalog entries, not external input, and `&'static str`
// has no general `Deserialize` impl.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct FieldDescriptor {
    pub name: &'static str,
    pub lsb: u8,
    pub msb: u8,
    pub description: &'static str,
}

impl FieldDescriptor {
    pub const fn new(name: &'static str, lsb: u8, msb: u8, description: &'static str) -> Self {
        Self {
            name,
            lsb,
            msb,
            description,
        }
    }

    pub const fn width(&self) -> u8 {
        self.msb - self.lsb + 1
    }

    fn mask(&self) -> u64 {
        if self.width() == 64 {
            u64::MAX
        } else {
            ((1u64 << self.width()) - 1) << self.lsb
        }
    }

    /// `(raw >> lsb) & ((1 << (msb - lsb + 1)) - 1)`
    pub fn extract(&self, raw: u64) -> u64 {
        (raw & self.mask()) >> self.lsb
    }

    /// `(raw & ~mask) | ((v << lsb) & mask)`, bounds-checking `v` against
    /// the field width first.
    pub fn insert(&self, raw: u64, v: u64) -> crate::error::Result<u64> {
        let max = if self.width() >= 64 {
            u64::MAX
        } else {
            (1u64 << self.width()) - 1
        };
        if v > max {
            return Err(crate::error::PhoenixError::InvalidArgument(format!(
                "value {v:#x} does not fit field {} ({} bits, max {max:#x})",
                self.name,
                self.width()
            )));
        }
        let mask = self.mask();
        Ok((raw & !mask) | ((v << self.lsb) & mask))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn extract_insert_single_bit() {
        let f = FieldDescriptor::new("BIT0", 0, 0, "");
        assert_eq!(f.extract(0b1), 1);
        assert_eq!(f.extract(0b0), 0);
        assert_eq!(f.insert(0, 1).unwrap(), 1);
    }

    #[test]
    fn extract_insert_mid_register_range() {
        // MAX_DATA_RATE[26:24] within GLOBAL_PARAM0.
        let f = FieldDescriptor::new("MAX_DATA_RATE", 24, 26, "");
        let raw = f.insert(0, 5).unwrap();
        assert_eq!(raw, 0x0500_0000);
        assert_eq!(f.extract(raw), 5);
    }

    #[test]
    fn insert_rejects_out_of_range_value() {
        let f = FieldDescriptor::new("MAX_DATA_RATE", 24, 26, "");
        assert!(f.insert(0, 8).is_err()); // 3 bits, max value 7
        assert!(f.insert(0, 7).is_ok());
    }

    #[test]
    fn insert_preserves_other_bits() {
        let f = FieldDescriptor::new("BIFURCATION", 7, 12, "");
        let raw = 0xFFFF_FFFFu64;
        let updated = f.insert(raw, 0).unwrap();
        assert_eq!(updated & !f.mask(), raw & !f.mask());
        assert_eq!(f.extract(updated), 0);
    }

    proptest! {
        #[test]
        fn round_trip_any_field_any_value(lsb in 0u8..60, width in 1u8..4) {
            let msb = (lsb + width - 1).min(63);
            let f = FieldDescriptor::new("F", lsb, msb, "");
            let max = (1u64 << f.width()) - 1;
            for v in 0..=max {
                let raw = f.insert(0, v).unwrap();
                prop_assert_eq!(f.extract(raw), v);
            }
        }
    }
}
