//! The device façade: orchestrates multi-register operations (status
//! aggregation, configuration RMW, reset sequencing, PRBS lifecycle,
//! eye-diagram capture) over one [`Transport`]. A single per-device lock
//! serializes every operation that touches the wire — spec.md §5 forbids
//! finer-grained locking here because it would break the atomicity
//! guarantee multi-register reads depend on.

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, instrument};

use crate::config::{Configuration, ConfigurationUpdate, InterruptEnables};
use crate::error::{PhoenixError, Result};
use crate::eye::{EyeCapture, EyeMargins};
use crate::identity::{ClockingMode, DataRate, DeviceIdentity, LtssmState, ResetType};
use crate::prbs::{format_ber, PRBSConfig, PRBSLaneResult, PRBSSession, PRBSState};
use crate::regmap;
use crate::register_access;
use crate::status::{DeviceStatus, InterruptStatus, LaneStatus, PortStatus};
use crate::transport::Transport;

const RESET_NAK_GRACE: Duration = Duration::from_millis(200);
const RESET_POLL_INTERVAL: Duration = Duration::from_millis(50);
const RESET_TOTAL_BUDGET: Duration = Duration::from_secs(5);
const EYE_POLL_INTERVAL: Duration = Duration::from_millis(100);
const EYE_CAPTURE_BUDGET: Duration = Duration::from_secs(10);

/// Mutable device state guarded by the per-device lock, distinct from the
/// immutable `transport`/`slave_address`/`identity` fields above it.
#[derive(Debug, Default)]
struct DeviceState {
    prbs: PRBSSession,
}

/// A live handle to one retimer: transport, addressing, identity, and the
/// lock that makes every façade operation appear atomic to concurrent
/// callers on the same device (spec.md §4.5/§5).
pub struct Device {
    transport: Arc<dyn Transport>,
    slave_address: u8,
    identity: DeviceIdentity,
    state: tokio::sync::Mutex<DeviceState>,
}

impl Device {
    /// Wraps an already-open transport as a live device handle. Most
    /// callers should go through [`crate::registry::DeviceRegistry`]
    /// instead, which also runs the connect-time probe; this constructor is
    /// exposed directly for callers (and tests) that already know the
    /// device's identity, e.g. from a prior discovery scan.
    pub fn new(transport: Arc<dyn Transport>, slave_address: u8, identity: DeviceIdentity) -> Self {
        Self {
            transport,
            slave_address,
            identity,
            state: tokio::sync::Mutex::new(DeviceState::default()),
        }
    }

    pub fn identity(&self) -> &DeviceIdentity {
        &self.identity
    }

    /// Releases the underlying transport. Called by
    /// [`crate::registry::DeviceRegistry::disconnect`]; idempotent because
    /// `Transport::close` is.
    pub(crate) async fn transport_close(&self) -> Result<()> {
        self.transport.close().await
    }

    async fn read_u32(&self, addr: u32) -> Result<u32> {
        register_access::read_u32(&self.transport, self.slave_address, addr).await
    }

    async fn write_u32(&self, addr: u32, value: u32) -> Result<()> {
        register_access::write_u32(&self.transport, self.slave_address, addr, value).await
    }

    async fn read_port_status(&self, descriptor: &regmap::RegisterDescriptor, port: regmap::Port) -> Result<PortStatus> {
        let raw = self.read_u32(descriptor.address).await? as u64;
        let ltssm = LtssmState::from_code(descriptor.field("CURRENT_STATE").extract(raw) as u8);
        let link_speed = DataRate::try_from(descriptor.field("LINK_SPEED").extract(raw) as u8)?;
        let link_width = descriptor.field("LINK_WIDTH").extract(raw) as u8;
        let forwarding_mode = descriptor.field("FORWARDING_MODE").extract(raw) != 0;
        let is_link_up = PortStatus::derive_is_link_up(forwarding_mode, ltssm);

        let mut lane_status = Vec::with_capacity(regmap::LANE_COUNT as usize);
        for lane in 0..regmap::LANE_COUNT {
            let lane_reg = regmap::lane_status_register(port, lane);
            let lane_raw = self.read_u32(lane_reg.address).await? as u64;
            lane_status.push(LaneStatus {
                lane_number: lane,
                rx_detect: lane_reg.field("RX_DETECT").extract(lane_raw) != 0,
                tx_eq_done: lane_reg.field("TX_EQ_DONE").extract(lane_raw) != 0,
                rx_eq_done: lane_reg.field("RX_EQ_DONE").extract(lane_raw) != 0,
            });
        }

        Ok(PortStatus {
            current_ltssm_state: ltssm,
            current_link_speed: link_speed,
            current_link_width: link_width,
            is_link_up,
            forwarding_mode,
            lane_status,
        })
    }

    /// Reads `TEMPERATURE, VOLTAGE_DVDD1..DVDDIO, GLOBAL_INTR,
    /// PPA_LTSSM_STATE, PPB_LTSSM_STATE`, then per-lane status, all under
    /// the device lock (spec.md §4.5).
    #[instrument(skip(self), fields(slave_address = self.slave_address))]
    pub async fn get_status(&self) -> Result<DeviceStatus> {
        let _guard = self.state.lock().await;

        let temp_raw = self.read_u32(regmap::TEMPERATURE.address).await? as u64;
        let valid = regmap::TEMPERATURE.field("VALID").extract(temp_raw) != 0;
        let temperature_c = if valid {
            regmap::TEMPERATURE.field("VALUE").extract(temp_raw) as u16 as i16
        } else {
            0
        };

        let mut rail_mv = [0u16; 7];
        for (i, &(name, _)) in regmap::VOLTAGE_RAILS.iter().enumerate() {
            let desc = regmap::voltage_register(name).expect("VOLTAGE_RAILS name must resolve");
            let raw = self.read_u32(desc.address).await? as u64;
            rail_mv[i] = desc.field("VALUE").extract(raw) as u16;
        }

        let intr_raw = self.read_u32(regmap::GLOBAL_INTR.address).await? as u64;
        let interrupt_status = InterruptStatus {
            global: regmap::GLOBAL_INTR.field("STATUS_GLOBAL").extract(intr_raw) != 0,
            eq_phase_err: regmap::GLOBAL_INTR.field("STATUS_EQ_PHASE_ERR").extract(intr_raw) != 0,
            phy_phase_err: regmap::GLOBAL_INTR.field("STATUS_PHY_PHASE_ERR").extract(intr_raw) != 0,
            internal_err: regmap::GLOBAL_INTR.field("STATUS_INTERNAL_ERR").extract(intr_raw) != 0,
        };

        let ppa_status = self.read_port_status(&regmap::PPA_LTSSM_STATE, regmap::Port::A).await?;
        let ppb_status = self.read_port_status(&regmap::PPB_LTSSM_STATE, regmap::Port::B).await?;

        let is_healthy = if !valid {
            false
        } else {
            DeviceStatus::derive_is_healthy(&interrupt_status, temperature_c)
        };

        Ok(DeviceStatus {
            temperature_c,
            dvdd1_mv: rail_mv[0],
            dvdd2_mv: rail_mv[1],
            dvdd3_mv: rail_mv[2],
            dvdd4_mv: rail_mv[3],
            dvdd5_mv: rail_mv[4],
            dvdd6_mv: rail_mv[5],
            dvddio_mv: rail_mv[6],
            ppa_status,
            ppb_status,
            interrupt_status,
            is_healthy,
        })
    }

    /// Reads `GLOBAL_PARAM0` and decodes all fields, plus `GLOBAL_INTR`'s
    /// enable nibble for `interrupt_enables` (spec.md §4.5).
    #[instrument(skip(self))]
    pub async fn get_configuration(&self) -> Result<Configuration> {
        let _guard = self.state.lock().await;
        let param0_raw = self.read_u32(regmap::GLOBAL_PARAM0.address).await? as u64;
        let intr_raw = self.read_u32(regmap::GLOBAL_INTR.address).await? as u64;

        let desc = &regmap::GLOBAL_PARAM0;
        let intr = &regmap::GLOBAL_INTR;
        Ok(Configuration {
            bifurcation_mode: crate::identity::BifurcationMode::new(
                desc.field("BIFURCATION").extract(param0_raw) as u8,
            )?,
            max_data_rate: DataRate::try_from(desc.field("MAX_DATA_RATE").extract(param0_raw) as u8)?,
            clocking_mode: ClockingMode::try_from(desc.field("CLK_MODE").extract(param0_raw) as u8)?,
            port_orientation: desc.field("PORT_ORIEN").extract(param0_raw) != 0,
            interrupt_enables: InterruptEnables {
                global: intr.field("ENABLE_GLOBAL").extract(intr_raw) != 0,
                eq_phase_err: intr.field("ENABLE_EQ_PHASE_ERR").extract(intr_raw) != 0,
                phy_phase_err: intr.field("ENABLE_PHY_PHASE_ERR").extract(intr_raw) != 0,
                internal_err: intr.field("ENABLE_INTERNAL_ERR").extract(intr_raw) != 0,
            },
        })
    }

    /// Reads `GLOBAL_PARAM0` (for bifurcation/clocking/data-rate/
    /// orientation) and `GLOBAL_INTR` (for interrupt enables in bits
    /// [19:16]) as a single register write per register touched. On any
    /// failure between the read and the write, fails with `PartialWrite`
    /// (spec.md §4.5) rather than retrying.
    #[instrument(skip(self, update))]
    pub async fn set_configuration(&self, update: ConfigurationUpdate) -> Result<()> {
        let _guard = self.state.lock().await;

        if update.touches_global_param0() {
            self.apply_global_param0(&update).await?;
        }
        if update.touches_global_intr() {
            self.apply_global_intr(&update).await?;
        }
        Ok(())
    }

    async fn apply_global_param0(&self, update: &ConfigurationUpdate) -> Result<()> {
        let addr = regmap::GLOBAL_PARAM0.address;
        let raw = self.read_u32(addr).await?;
        let mut raw = raw as u64;
        let desc = &regmap::GLOBAL_PARAM0;

        if let Some(mode) = update.bifurcation_mode {
            raw = desc.field("BIFURCATION").insert(raw, mode.code() as u64)?;
        }
        if let Some(rate) = update.max_data_rate {
            raw = desc.field("MAX_DATA_RATE").insert(raw, rate.code() as u64)?;
        }
        if let Some(mode) = update.clocking_mode {
            raw = desc.field("CLK_MODE").insert(raw, mode as u64)?;
        }
        if let Some(orientation) = update.port_orientation {
            raw = desc.field("PORT_ORIEN").insert(raw, orientation as u64)?;
        }

        self.write_u32(addr, raw as u32)
            .await
            .map_err(|_| PhoenixError::PartialWrite(addr))
    }

    async fn apply_global_intr(&self, update: &ConfigurationUpdate) -> Result<()> {
        let addr = regmap::GLOBAL_INTR.address;
        let raw = self.read_u32(addr).await?;
        let mut raw = raw as u64;
        let desc = &regmap::GLOBAL_INTR;

        if let Some(enables) = update.interrupt_enables {
            raw = desc.field("ENABLE_GLOBAL").insert(raw, enables.global as u64)?;
            raw = desc
                .field("ENABLE_EQ_PHASE_ERR")
                .insert(raw, enables.eq_phase_err as u64)?;
            raw = desc
                .field("ENABLE_PHY_PHASE_ERR")
                .insert(raw, enables.phy_phase_err as u64)?;
            raw = desc
                .field("ENABLE_INTERNAL_ERR")
                .insert(raw, enables.internal_err as u64)?;
        }

        self.write_u32(addr, raw as u32)
            .await
            .map_err(|_| PhoenixError::PartialWrite(addr))
    }

    /// Writes `RESET_CTRL` with exactly one strobe bit set, then waits
    /// `200 ms` for the device's post-reset NAK window before polling
    /// `XAGENT_INFO_0` every `50 ms` until a valid read succeeds or the
    /// `5 s` budget elapses (spec.md §4.5).
    #[instrument(skip(self))]
    pub async fn reset(&self, kind: ResetType) -> Result<()> {
        let _guard = self.state.lock().await;
        let addr = regmap::RESET_CTRL.address;
        self.write_u32(addr, 1u32 << kind.bit()).await?;

        let probe_addr = regmap::XAGENT_INFO_0.address;
        let transport = &self.transport;
        let slave_address = self.slave_address;

        let poll = async move {
            tokio::time::sleep(RESET_NAK_GRACE).await;
            loop {
                match register_access::read_u32(transport, slave_address, probe_addr).await {
                    Ok(_) => return,
                    Err(_) => tokio::time::sleep(RESET_POLL_INTERVAL).await,
                }
            }
        };

        tokio::time::timeout(RESET_TOTAL_BUDGET, poll)
            .await
            .map_err(|_| PhoenixError::Timeout("reset".to_string()))?;

        info!(?kind, preserves_configuration = kind.preserves_configuration(), "reset complete");
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn read_register(&self, addr: u32, width_bytes: u8) -> Result<u32> {
        let _guard = self.state.lock().await;
        match width_bytes {
            2 => Ok(register_access::read_u16(&self.transport, self.slave_address, addr).await? as u32),
            4 => register_access::read_u32(&self.transport, self.slave_address, addr).await,
            other => Err(PhoenixError::InvalidArgument(format!(
                "unsupported register width {other} bytes (must be 2 or 4)"
            ))),
        }
    }

    #[instrument(skip(self))]
    pub async fn write_register(&self, addr: u32, value: u32, width_bytes: u8) -> Result<()> {
        let _guard = self.state.lock().await;
        match width_bytes {
            2 => {
                if value > u16::MAX as u32 {
                    return Err(PhoenixError::InvalidArgument(format!(
                        "value {value:#x} does not fit a 16-bit register"
                    )));
                }
                register_access::write_u16(&self.transport, self.slave_address, addr, value as u16).await
            }
            4 => register_access::write_u32(&self.transport, self.slave_address, addr, value).await,
            other => Err(PhoenixError::InvalidArgument(format!(
                "unsupported register width {other} bytes (must be 2 or 4)"
            ))),
        }
    }

    /// `Idle|Stopped -> Configured -> Running`. Writes per-lane generator
    /// enable, pattern select, and sample count, then asserts the global
    /// start bit (spec.md §4.5).
    #[instrument(skip(self, config))]
    pub async fn start_prbs(&self, config: PRBSConfig) -> Result<()> {
        let mut guard = self.state.lock().await;
        guard.prbs.configure(config.clone())?;

        for &lane in &config.lanes {
            let ctrl = regmap::prbs_ctrl_register(lane);
            let mut raw = 0u64;
            raw = ctrl.field("GEN_ENABLE").insert(raw, 1)?;
            raw = ctrl.field("PATTERN_SEL").insert(raw, config.pattern as u64)?;
            self.write_u32(ctrl.address, raw as u32).await?;

            let sample_addr = regmap::prbs_sample_count_address(lane);
            let sample_count = u32::try_from(config.sample_count).map_err(|_| {
                PhoenixError::InvalidArgument(format!(
                    "sample_count {} exceeds the 32-bit sample-count register",
                    config.sample_count
                ))
            })?;
            self.write_u32(sample_addr, sample_count).await?;
        }

        let global = &regmap::PRBS_GLOBAL_CTRL;
        let raw = global.field("START").insert(0, 1)?;
        self.write_u32(global.address, raw as u32).await?;

        guard.prbs.start()
    }

    /// Allowed in any state; reports current state and per-lane
    /// `{sync_acquired, test_complete}` for the lanes named in the current
    /// configuration (spec.md §4.5).
    #[instrument(skip(self))]
    pub async fn get_prbs_status(&self) -> Result<(PRBSState, Vec<(u8, bool, bool)>)> {
        let guard = self.state.lock().await;
        let state = guard.prbs.state();
        let lanes = guard.prbs.config().map(|c| c.lanes.clone()).unwrap_or_default();
        drop(guard);

        let mut per_lane = Vec::with_capacity(lanes.len());
        for lane in lanes {
            let desc = regmap::prbs_status_register(lane);
            let raw = self.read_u32(desc.address).await? as u64;
            let sync_acquired = desc.field("SYNC_ACQUIRED").extract(raw) != 0;
            let test_complete = desc.field("TEST_COMPLETE").extract(raw) != 0;
            per_lane.push((lane, sync_acquired, test_complete));
        }
        Ok((state, per_lane))
    }

    /// `Running|Stopped` only. Reads per-lane `bit_count`/`error_count` and
    /// formats `ber_string` (spec.md §4.5).
    #[instrument(skip(self))]
    pub async fn get_prbs_results(&self) -> Result<Vec<PRBSLaneResult>> {
        let guard = self.state.lock().await;
        let state = guard.prbs.state();
        if !matches!(state, PRBSState::Running | PRBSState::Stopped) {
            return Err(PhoenixError::InvalidArgument("prbs not started".to_string()));
        }
        let lanes = guard.prbs.config().map(|c| c.lanes.clone()).unwrap_or_default();
        drop(guard);

        let mut results = Vec::with_capacity(lanes.len());
        for lane in lanes {
            let base = regmap::error_stats_base(lane);
            let bit_lo = self.read_u32(base + regmap::ERROR_STATS_BIT_COUNT_LO_OFFSET).await?;
            let bit_hi = self.read_u32(base + regmap::ERROR_STATS_BIT_COUNT_HI_OFFSET).await?;
            let err_lo = self.read_u32(base + regmap::ERROR_STATS_ERROR_COUNT_LO_OFFSET).await?;
            let err_hi = self.read_u32(base + regmap::ERROR_STATS_ERROR_COUNT_HI_OFFSET).await?;
            let status_desc = regmap::prbs_status_register(lane);
            let status_raw = self.read_u32(status_desc.address).await? as u64;

            let bit_count = (u64::from(bit_hi) << 32) | u64::from(bit_lo);
            let error_count = (u64::from(err_hi) << 32) | u64::from(err_lo);
            let sync_acquired = status_desc.field("SYNC_ACQUIRED").extract(status_raw) != 0;

            results.push(PRBSLaneResult {
                lane,
                bit_count,
                error_count,
                sync_acquired,
                ber: format_ber(bit_count, error_count),
            });
        }
        Ok(results)
    }

    /// `Running -> Stopped`. Clears the global start bit.
    #[instrument(skip(self))]
    pub async fn stop_prbs(&self) -> Result<()> {
        let mut guard = self.state.lock().await;
        let global = &regmap::PRBS_GLOBAL_CTRL;
        self.write_u32(global.address, 0).await?;
        guard.prbs.stop()
    }

    /// Triggers a single-shot capture on `lane` at `data_rate`, blocking up
    /// to `10 s` for `capture_valid`. Lower/upper eyes are present only at
    /// `Gen6_64G` (PAM4 has three eyes, NRZ rates have one).
    #[instrument(skip(self))]
    pub async fn eye_diagram(&self, lane: u8, data_rate: DataRate) -> Result<EyeCapture> {
        let _guard = self.state.lock().await;
        let ctrl = regmap::eye_ctrl_register(lane);

        let mut raw = 0u64;
        raw = ctrl.field("TRIGGER").insert(raw, 1)?;
        raw = ctrl.field("DATA_RATE_SEL").insert(raw, data_rate.code() as u64)?;
        self.write_u32(ctrl.address, raw as u32).await?;

        let transport = &self.transport;
        let slave_address = self.slave_address;
        let ctrl_addr = ctrl.address;
        let valid_field = ctrl.field("CAPTURE_VALID").clone();

        let poll = async move {
            loop {
                let raw = register_access::read_u32(transport, slave_address, ctrl_addr)
                    .await
                    .unwrap_or(0) as u64;
                if valid_field.extract(raw) != 0 {
                    return;
                }
                tokio::time::sleep(EYE_POLL_INTERVAL).await;
            }
        };

        tokio::time::timeout(EYE_CAPTURE_BUDGET, poll)
            .await
            .map_err(|_| PhoenixError::Timeout("eye_diagram".to_string()))?;

        let base = regmap::eye_capture_base(lane);
        let middle = self
            .read_eye_margins(base + regmap::EYE_MIDDLE_HORIZ_OFFSET, base + regmap::EYE_MIDDLE_VERT_OFFSET)
            .await?;

        let (lower, upper) = if EyeCapture::expects_pam4_eyes(data_rate) {
            let lower = self
                .read_eye_margins(base + regmap::EYE_LOWER_HORIZ_OFFSET, base + regmap::EYE_LOWER_VERT_OFFSET)
                .await?;
            let upper = self
                .read_eye_margins(base + regmap::EYE_UPPER_HORIZ_OFFSET, base + regmap::EYE_UPPER_VERT_OFFSET)
                .await?;
            (Some(lower), Some(upper))
        } else {
            (None, None)
        };

        Ok(EyeCapture {
            lane,
            data_rate,
            valid: true,
            middle,
            lower,
            upper,
        })
    }

    async fn read_eye_margins(&self, horiz_addr: u32, vert_addr: u32) -> Result<EyeMargins> {
        let horiz_raw = self.read_u32(horiz_addr).await? as u64;
        let vert_raw = self.read_u32(vert_addr).await? as u64;
        let horiz_fields = regmap::eye_horiz_fields();
        let vert_fields = regmap::eye_vert_fields();
        Ok(EyeMargins {
            left_mui: horiz_fields[0].extract(horiz_raw) as u16,
            right_mui: horiz_fields[1].extract(horiz_raw) as u16,
            upper_mv: vert_fields[0].extract(vert_raw) as u16,
            lower_mv: vert_fields[1].extract(vert_raw) as u16,
        })
    }
}
