//! Eye-diagram capture results (spec.md §4.5). NRZ rates (Gen1-Gen5) expose
//! a single eye; Gen6 uses PAM4 signaling and so exposes three vertically
//! stacked eyes (lower, middle, upper) per lane.

use crate::identity::DataRate;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EyeMargins {
    pub left_mui: u16,
    pub right_mui: u16,
    pub upper_mv: u16,
    pub lower_mv: u16,
}

impl EyeMargins {
    /// Total horizontal eye opening, milli-UI.
    pub fn horizontal_opening(&self) -> u32 {
        u32::from(self.left_mui) + u32::from(self.right_mui)
    }

    /// Total vertical eye opening, millivolts.
    pub fn vertical_opening(&self) -> u32 {
        u32::from(self.upper_mv) + u32::from(self.lower_mv)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EyeCapture {
    pub lane: u8,
    pub data_rate: DataRate,
    pub valid: bool,
    pub middle: EyeMargins,
    /// `Some` only when `data_rate == Gen6_64G` (PAM4 lower eye).
    pub lower: Option<EyeMargins>,
    /// `Some` only when `data_rate == Gen6_64G` (PAM4 upper eye).
    pub upper: Option<EyeMargins>,
}

impl EyeCapture {
    /// PAM4 (Gen6) captures three eyes per lane; NRZ rates capture one.
    pub fn expects_pam4_eyes(data_rate: DataRate) -> bool {
        data_rate == DataRate::Gen6_64G
    }

    /// The narrowest vertical opening across all captured eyes, the
    /// figure of merit a link-margin dashboard would plot.
    pub fn worst_vertical_opening(&self) -> u32 {
        [Some(self.middle), self.lower, self.upper]
            .into_iter()
            .flatten()
            .map(|m| m.vertical_opening())
            .min()
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn margins(left: u16, right: u16, upper: u16, lower: u16) -> EyeMargins {
        EyeMargins {
            left_mui: left,
            right_mui: right,
            upper_mv: upper,
            lower_mv: lower,
        }
    }

    #[test]
    fn opening_sums_both_sides() {
        let m = margins(100, 120, 50, 60);
        assert_eq!(m.horizontal_opening(), 220);
        assert_eq!(m.vertical_opening(), 110);
    }

    #[test]
    fn only_gen6_expects_pam4_eyes() {
        assert!(EyeCapture::expects_pam4_eyes(DataRate::Gen6_64G));
        assert!(!EyeCapture::expects_pam4_eyes(DataRate::Gen5_32G));
    }

    #[test]
    fn worst_vertical_opening_considers_only_captured_eyes() {
        let nrz = EyeCapture {
            lane: 0,
            data_rate: DataRate::Gen5_32G,
            valid: true,
            middle: margins(100, 100, 80, 80),
            lower: None,
            upper: None,
        };
        assert_eq!(nrz.worst_vertical_opening(), 160);

        let pam4 = EyeCapture {
            lane: 0,
            data_rate: DataRate::Gen6_64G,
            valid: true,
            middle: margins(100, 100, 80, 80),
            lower: Some(margins(90, 90, 40, 40)),
            upper: Some(margins(110, 110, 70, 70)),
        };
        assert_eq!(pam4.worst_vertical_opening(), 80);
    }
}
