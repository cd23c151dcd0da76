//! PRBS (pseudo-random bit sequence) built-in self test state machine and
//! result types (spec.md §4.5). The state machine is `Idle -> Configured ->
//! Running -> Stopped`; `stop` may be called from `Running` only, and a new
//! `configure` from any state re-enters `Configured` and discards prior
//! results.

use crate::error::{PhoenixError, Result};
use crate::identity::PRBSPattern;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PRBSState {
    Idle,
    Configured,
    Running,
    Stopped,
}

impl PRBSState {
    /// Valid next states reachable by `configure`, `start`, `stop`.
    fn can_configure(self) -> bool {
        true
    }

    fn can_start(self) -> bool {
        matches!(self, Self::Configured | Self::Stopped)
    }

    fn can_stop(self) -> bool {
        matches!(self, Self::Running)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PRBSConfig {
    pub lanes: Vec<u8>,
    pub pattern: PRBSPattern,
    /// Target sample count before `TEST_COMPLETE` latches; `0` runs until
    /// explicitly stopped.
    pub sample_count: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PRBSLaneCounters {
    pub lane: u8,
    pub bit_count: u64,
    pub error_count: u64,
    pub sync_acquired: bool,
    pub test_complete: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PRBSLaneResult {
    pub lane: u8,
    pub bit_count: u64,
    pub error_count: u64,
    pub sync_acquired: bool,
    /// Bit error rate, formatted to 3 significant figures in scientific
    /// notation, or `"< 1e-15"` when no errors were observed (spec.md
    /// §4.5 scenario 5).
    pub ber: String,
}

impl From<PRBSLaneCounters> for PRBSLaneResult {
    fn from(c: PRBSLaneCounters) -> Self {
        Self {
            lane: c.lane,
            bit_count: c.bit_count,
            error_count: c.error_count,
            sync_acquired: c.sync_acquired,
            ber: format_ber(c.bit_count, c.error_count),
        }
    }
}

/// `"< 1e-15"` if `error_count == 0`, else `error_count / bit_count`
/// rendered in scientific notation to 3 significant figures.
pub fn format_ber(bit_count: u64, error_count: u64) -> String {
    if error_count == 0 {
        return "< 1e-15".to_string();
    }
    if bit_count == 0 {
        return "undefined".to_string();
    }
    let ber = error_count as f64 / bit_count as f64;
    let exponent = ber.log10().floor() as i32;
    let mantissa = ber / 10f64.powi(exponent);
    // Two-digit, signed exponent (spec.md §8 scenario 5: "9.54e-07"), not
    // Rust's default unpadded `{e}` formatting.
    let sign = if exponent < 0 { '-' } else { '+' };
    format!("{mantissa:.2}e{sign}{:02}", exponent.unsigned_abs())
}

#[derive(Debug, Clone)]
pub struct PRBSSession {
    state: PRBSState,
    config: Option<PRBSConfig>,
}

impl Default for PRBSSession {
    fn default() -> Self {
        Self {
            state: PRBSState::Idle,
            config: None,
        }
    }
}

impl PRBSSession {
    pub fn state(&self) -> PRBSState {
        self.state
    }

    pub fn config(&self) -> Option<&PRBSConfig> {
        self.config.as_ref()
    }

    pub fn configure(&mut self, config: PRBSConfig) -> Result<()> {
        if !self.state.can_configure() {
            return Err(PhoenixError::UnsupportedOperation(format!(
                "cannot configure PRBS from state {:?}",
                self.state
            )));
        }
        if config.lanes.is_empty() {
            return Err(PhoenixError::InvalidArgument(
                "PRBSConfig.lanes must name at least one lane".to_string(),
            ));
        }
        self.config = Some(config);
        self.state = PRBSState::Configured;
        Ok(())
    }

    pub fn start(&mut self) -> Result<()> {
        if !self.state.can_start() {
            return Err(PhoenixError::UnsupportedOperation(format!(
                "cannot start PRBS from state {:?}, call configure first",
                self.state
            )));
        }
        self.state = PRBSState::Running;
        Ok(())
    }

    pub fn stop(&mut self) -> Result<()> {
        if !self.state.can_stop() {
            return Err(PhoenixError::UnsupportedOperation(format!(
                "cannot stop PRBS from state {:?}",
                self.state
            )));
        }
        self.state = PRBSState::Stopped;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ber_zero_errors_reports_floor_string() {
        assert_eq!(format_ber(1_000_000, 0), "< 1e-15");
    }

    #[test]
    fn ber_nonzero_errors_scientific_notation() {
        // 3 errors in 1e12 bits -> 3.00e-12
        assert_eq!(format_ber(1_000_000_000_000, 3), "3.00e-12");
    }

    #[test]
    fn ber_single_digit_exponent_is_zero_padded() {
        // 1 error in 2^20 bits -> 9.54e-07, not 9.54e-7.
        assert_eq!(format_ber(1 << 20, 1), "9.54e-07");
    }

    #[test]
    fn session_rejects_start_before_configure() {
        let mut session = PRBSSession::default();
        assert!(session.start().is_err());
    }

    #[test]
    fn session_happy_path_transitions() {
        let mut session = PRBSSession::default();
        session
            .configure(PRBSConfig {
                lanes: vec![0, 1],
                pattern: PRBSPattern::Prbs31,
                sample_count: 1_000_000,
            })
            .unwrap();
        assert_eq!(session.state(), PRBSState::Configured);
        session.start().unwrap();
        assert_eq!(session.state(), PRBSState::Running);
        session.stop().unwrap();
        assert_eq!(session.state(), PRBSState::Stopped);
        // Restarting after stop is allowed without reconfiguring.
        session.start().unwrap();
        assert_eq!(session.state(), PRBSState::Running);
    }

    #[test]
    fn configure_rejects_empty_lane_list() {
        let mut session = PRBSSession::default();
        let err = session
            .configure(PRBSConfig {
                lanes: vec![],
                pattern: PRBSPattern::Prbs7,
                sample_count: 0,
            })
            .unwrap_err();
        assert!(matches!(err, PhoenixError::InvalidArgument(_)));
    }
}
