use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::mutex::Mutex;
use log::{debug, error, info, warn};

use crate::cable::CableType;
use crate::config::ChargerConfig;
use crate::dispatch::{AiclIrq, InterruptLines};
use crate::encoding::float_voltage_to_code;
use crate::error::Error;
use crate::host::{PowerSupplyHost, WakeHolds, WakeSource};
use crate::interface::RegisterAccess;
use crate::profile::ChargeProfile;
use crate::registers::{bits, field, Details00, Details01, Interrupts, Mode, Reg};
use crate::schedule::{Scheduler, Work};
use crate::state::{ChargeMode, ChargerState, ChargingStatus, Health};
use crate::time::Timebase;

/// First and last register in a diagnostic dump.
const DUMP_FIRST: Reg = Reg::CHG_INT_MASK;
const DUMP_LEN: usize = (Reg::CHG_CNFG_12.0 - Reg::CHG_INT_MASK.0) as usize + 1;

/// Top-off timer used with second-stage full check by the charger.
const TOPOFF_TIMER_SECS: u32 = 70 * 60;
/// Current removed from the dock profile when an OTG accessory shares the dock.
const SMART_OTG_REDUCTION_MA: u32 = 500;

/// A MAX77843 charge controller.
///
/// Owns the charger state and all deferred work. The register bus is shared through a
/// mutex which serves as the regulation lock: it is held for register sequences and never
/// across a sleep.
pub struct Charger<'a, M: RawMutex, R, T, H> {
    pub(crate) regs: &'a Mutex<M, R>,
    pub(crate) time: T,
    pub(crate) host: H,
    pub(crate) config: ChargerConfig,
    pub(crate) state: ChargerState,
    pub(crate) work: Scheduler,
    pub(crate) wake: WakeHolds,
    pub(crate) lines: InterruptLines,
    pub(crate) aicl_irq: AiclIrq,
    pub(crate) chgin_irq_enabled: bool,
    pub(crate) revision: u8,
    pub(crate) saved_int_mask: Option<u8>,
}

pub(crate) fn report<E: core::fmt::Debug>(what: &str, result: Result<(), E>) {
    if let Err(e) = result {
        warn!("{} failed: {:?}", what, e);
    }
}

impl<'a, M, R, T, H> Charger<'a, M, R, T, H>
where
    M: RawMutex,
    R: RegisterAccess,
    T: Timebase,
    H: PowerSupplyHost,
{
    /// Create a controller. Nothing touches the hardware until [`Charger::init`].
    pub fn new(regs: &'a Mutex<M, R>, time: T, host: H, config: ChargerConfig) -> Self {
        let state = ChargerState::new(config.float_voltage, config.wireless_ramp_start);
        Charger {
            regs,
            time,
            host,
            config,
            state,
            work: Scheduler::default(),
            wake: WakeHolds::default(),
            lines: InterruptLines::none(),
            aicl_irq: AiclIrq::Unavailable,
            chgin_irq_enabled: false,
            revision: 0,
            saved_int_mask: None,
        }
    }

    /// Published charger state.
    pub fn state(&self) -> &ChargerState {
        &self.state
    }

    /// Static configuration.
    pub fn config(&self) -> &ChargerConfig {
        &self.config
    }

    /// The host the controller reports to.
    pub fn host(&self) -> &H {
        &self.host
    }

    /// Mutable access to the host.
    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    /// PMIC revision read during [`Charger::init`].
    pub fn revision(&self) -> u8 {
        self.revision
    }

    /// Whether `work` is scheduled.
    pub fn is_pending(&self, work: Work) -> bool {
        self.work.is_pending(work)
    }

    /// Bring the charger up: read the chip revision, program the register baseline and
    /// unmask the interrupt sources in `lines`.
    ///
    /// Sources missing from `lines` stay disabled for the session.
    pub async fn init(&mut self, lines: InterruptLines) -> Result<(), Error<R::Error>> {
        let revision = self.read(Reg::PMIC_REVISION).await.map_err(|e| {
            error!("PMIC revision read failed: {:?}", e);
            Error::DeviceNotFound
        })?;
        self.revision = revision & 0x07;
        info!("MAX77843 charger, PMIC revision {}", self.revision);

        self.initialize_registers().await.map_err(Error::Bus)?;

        let int_ok = Interrupts::from_bits(self.read_or(Reg::CHG_INT_OK, 0).await);
        self.state.wireless_online = int_ok.wcin();

        self.lines = lines;
        self.aicl_irq = if lines.aicl {
            AiclIrq::Enabled
        } else {
            warn!("AICL interrupt unavailable");
            AiclIrq::Unavailable
        };
        let unmask = Interrupts::new()
            .with_chg(lines.charger)
            .with_byp(lines.bypass)
            .with_batp(lines.battery_presence)
            .with_wcin(lines.wireless_pad)
            .with_aicl(lines.aicl);
        self.update(Reg::CHG_INT_MASK, 0, unmask.bits())
            .await
            .map_err(Error::Bus)?;

        if lines.chgin {
            self.schedule_in(Work::EnableChgInIrq, self.config.chgin_irq_enable_delay_ms);
        } else {
            warn!("CHGIN interrupt unavailable, VBUS debounce disabled");
        }

        self.kick_watchdog().await;
        self.schedule_in(Work::Watchdog, self.config.watchdog_interval_ms);
        Ok(())
    }

    /// Leave the charger in a safe configuration: buck only, 500mA input limits.
    pub async fn shutdown(&mut self) -> Result<(), Error<R::Error>> {
        self.work.cancel_all();
        self.wake.release_all(&mut self.host);

        let mut bus = self.regs.lock().await;
        bus.write(Reg::CHG_CNFG_00, Mode::Buck as u8)
            .await
            .map_err(Error::Bus)?;
        bus.write(Reg::CHG_CNFG_09, bits::CHGIN_ILIM_SHUTDOWN)
            .await
            .map_err(Error::Bus)?;
        bus.write(Reg::CHG_CNFG_10, bits::WCIN_ILIM_DEFAULT)
            .await
            .map_err(Error::Bus)?;
        bus.write(Reg::CHG_CNFG_12, bits::CNFG_12_SHUTDOWN)
            .await
            .map_err(Error::Bus)?;
        info!("charger shut down");
        Ok(())
    }

    /// Program the register baseline.
    pub(crate) async fn initialize_registers(&mut self) -> Result<(), R::Error> {
        let float_code = float_voltage_to_code(self.state.float_voltage);
        {
            let mut bus = self.regs.lock().await;
            bus.write_field(field::CHGPROT, bits::CHGPROT_UNLOCKED).await?;
            bus.write(Reg::CHG_CNFG_01, bits::CNFG_01_DEFAULT).await?;
            bus.update(Reg::CHG_CNFG_02, bits::OTG_ILIM_1200, bits::OTG_ILIM_1200)
                .await?;
            bus.write(Reg::CHG_CNFG_03, bits::CNFG_03_DEFAULT).await?;
            bus.write_field(field::CHG_CV_PRM, float_code).await?;
            bus.update(Reg::CHG_CNFG_00, bits::WDTEN, bits::WDTEN).await?;
        }
        debug!(
            "register baseline programmed, float voltage {} mV ({:#04x})",
            self.state.float_voltage, float_code
        );
        self.log_registers().await;
        Ok(())
    }

    /// Make sure the configuration registers are writable.
    ///
    /// Returns `true` when the charger was found locked, in which case the baseline must
    /// be reprogrammed.
    pub(crate) async fn unlock(&mut self) -> bool {
        let retries = self.config.unlock_retries;
        let delay = self.config.unlock_retry_delay_ms;
        let mut need_init = false;

        for attempt in 1..=retries {
            let chgprot = match self.read(Reg::CHG_CNFG_06).await {
                Ok(raw) => field::CHGPROT.extract(raw),
                Err(e) => {
                    warn!("CNFG_06 read failed: {:?}", e);
                    0
                }
            };
            if chgprot == bits::CHGPROT_UNLOCKED {
                return need_init;
            }
            warn!("charger locked (chgprot {:#x}), attempt {}", chgprot, attempt);
            let result = self
                .regs
                .lock()
                .await
                .write_field(field::CHGPROT, bits::CHGPROT_UNLOCKED)
                .await;
            report("unlock write", result);
            need_init = true;
            self.time.delay_ms(delay).await;
        }

        error!("charger still locked after {} attempts", retries);
        need_init
    }

    /// Unlock, reprogramming the baseline if the charger had been locked.
    pub(crate) async fn ensure_unlocked(&mut self) {
        if self.unlock().await {
            warn!("charger configuration was locked, reinitializing");
            let result = self.initialize_registers().await;
            report("reinitialize", result);
        }
    }

    /// Clear the charger watchdog.
    pub(crate) async fn kick_watchdog(&mut self) {
        let result = self
            .regs
            .lock()
            .await
            .write_field(field::WDTCLR, bits::WDTCLR)
            .await;
        report("watchdog kick", result);
    }

    /// Set or clear the charger enable bit.
    pub(crate) async fn set_charger_state(&mut self, enable: bool) -> Result<(), R::Error> {
        let (value, mask) = match (enable, self.state.cable_type) {
            (true, CableType::LanHub) => (bits::CHG, bits::CHG | bits::OTG_CTRL),
            (true, _) => (bits::CHG, bits::CHG),
            (false, _) => (0, bits::CHG),
        };
        debug!("charger {}", if enable { "enabled" } else { "disabled" });
        self.update(Reg::CHG_CNFG_00, value, mask).await
    }

    /// Profile applying to `cable`, with the USB high-current override.
    pub(crate) fn profile(&self, cable: CableType) -> ChargeProfile {
        let profiles = &self.config.profiles;
        if cable == CableType::Usb && self.state.usb_hc {
            let mains = profiles.get(CableType::Mains);
            return ChargeProfile {
                input_current_limit: mains.input_current_limit,
                fast_charging_current: mains.fast_charging_current,
                ..*profiles.get(CableType::Usb)
            };
        }
        *profiles.get(cable)
    }

    /// Attach a new cable and regulate for it.
    ///
    /// Work left over from the previous cable is cancelled first.
    pub async fn set_online(&mut self, cable: CableType) -> Result<(), Error<R::Error>> {
        self.ensure_unlocked().await;

        if cable == CableType::PowerSharing {
            let sharing = self.host.power_sharing_active();
            let value = if sharing { bits::OTG_CTRL } else { 0 };
            self.update(Reg::CHG_CNFG_00, value, bits::OTG_CTRL)
                .await
                .map_err(Error::Bus)?;
            info!("power sharing {}", if sharing { "on" } else { "off" });
            return Ok(());
        }

        let previous = self.state.cable_type;
        info!("cable {:?} -> {:?}", previous, cable);
        let was_ramping = self.work.is_pending(Work::WirelessRamp);
        self.cancel_work(Work::Aicl);
        self.cancel_work(Work::WirelessRamp);
        self.state.cable_type = cable;
        self.state.fault_suspended = false;

        if cable == CableType::Battery {
            self.set_aicl_irq(true).await;
        } else if matches!(
            cable,
            CableType::HvMains | CableType::HvErr | CableType::HvMainsChgLimit
        ) {
            self.set_aicl_irq(false).await;
        }

        if !cable.is_wireless() && (previous.is_wireless() || was_ramping) {
            self.reset_wireless_ramp().await;
        }

        self.function_control().await.map_err(Error::Bus)?;
        self.set_current().await.map_err(Error::Bus)
    }

    /// Classify the attached cable into charger mode, currents and termination settings.
    pub(crate) async fn function_control(&mut self) -> Result<(), R::Error> {
        let cable = self.state.cable_type;
        let battery_health = self.host.battery_health();
        let usb_input = self.profile(CableType::Usb).input_current_limit;

        if cable.is_unpowered() {
            self.state.is_charging = false;
            self.state.vbus_negotiated_voltage = 0;
            self.state.afc_detect = false;
            self.state.aicl_active = false;
            self.state.mdock = false;
            self.state.requested_charging_current = 0;
            self.cancel_work(Work::AfcDetect);

            let blocked = matches!(
                battery_health,
                Health::UnspecifiedFailure | Health::OverheatLimit
            );
            if self.state.status == ChargingStatus::Discharging || blocked {
                self.state.charging_current_max = if blocked { 0 } else { usb_input };
            }

            if cable == CableType::Otg {
                self.update(
                    Reg::CHG_CNFG_00,
                    bits::OTG_CTRL,
                    bits::OTG_CTRL | bits::BUCK,
                )
                .await?;
            } else {
                self.update(Reg::CHG_CNFG_00, 0, bits::CHG | bits::OTG_CTRL)
                    .await?;
            }
        } else {
            self.state.is_charging = cable != CableType::HmtConnected;
            self.state.afc_detect = false;

            let profile = self.profile(cable);
            self.state.charging_current_max = profile.input_current_limit;
            self.state.requested_charging_current = profile.fast_charging_current;

            if self.state.mdock {
                let dock = self.profile(CableType::MdockTa);
                match cable {
                    CableType::SmartNotg => {
                        self.state.charging_current_max = dock.input_current_limit;
                        self.state.requested_charging_current = dock.fast_charging_current;
                    }
                    CableType::SmartOtg => {
                        self.state.charging_current_max =
                            dock.input_current_limit.saturating_sub(SMART_OTG_REDUCTION_MA);
                        self.state.requested_charging_current =
                            dock.fast_charging_current.saturating_sub(SMART_OTG_REDUCTION_MA);
                    }
                    _ => {}
                }
            } else if cable == CableType::MdockTa {
                self.state.mdock = true;
            }

            if cable == CableType::Mains {
                self.state.afc_detect = true;
                self.state.charging_current_max = self.config.input_current_ta;
                self.schedule_in(Work::AfcDetect, self.config.afc_detect_delay_ms);
                self.wake.hold(&mut self.host, WakeSource::Afc);
            } else if (self.state.vbus_negotiated_voltage == 5
                && cable == CableType::HvMainsChgLimit)
                || (self.state.vbus_negotiated_voltage == 9 && cable.is_hv_wire())
            {
                self.state.vbus_negotiated_voltage = 0;
            }
        }

        let profile = self.profile(cable);
        if self.config.full_check_by_charger {
            let second_stage = self.host.charge_mode() == ChargeMode::SecondStage
                || self.host.swelling_active();
            if second_stage {
                self.set_charger_state(false).await?;
                self.set_topoff_current(profile.full_check_current_2nd, TOPOFF_TIMER_SECS)
                    .await?;
            } else {
                self.set_topoff_current(profile.full_check_current_1st, TOPOFF_TIMER_SECS)
                    .await?;
            }
        } else {
            // Without charger-side second stage the 2nd value is the top-off timer.
            self.set_topoff_current(
                profile.full_check_current_1st,
                profile.full_check_current_2nd,
            )
            .await?;
        }

        self.set_charger_state(self.state.is_charging).await?;

        let fast_switching = !self.config.fixed_switching_frequency
            && matches!(cable, CableType::HvMains | CableType::HvErr);
        let value = if fast_switching { bits::FQ_2MHZ } else { 0 };
        self.update(Reg::CHG_CNFG_01, value, bits::FQ_2MHZ).await?;

        info!(
            "{:?}: charging {}, max {} mA, current {} mA",
            cable,
            self.state.is_charging,
            self.state.charging_current_max,
            self.state.requested_charging_current
        );
        Ok(())
    }

    /// Switch OTG output on or off.
    pub async fn set_otg(&mut self, enable: bool) -> Result<(), Error<R::Error>> {
        self.host.wireless_otg_control(enable);
        let regs = self.regs;

        if enable {
            let mut bus = regs.lock().await;
            let mask = bus.read(Reg::CHG_INT_MASK).await.map_err(Error::Bus)?;
            self.saved_int_mask = Some(mask);
            let masked = Interrupts::new().with_chg(true).with_chgin(true).bits();
            let touched = masked | Interrupts::new().with_byp(true).bits();
            bus.update(Reg::CHG_INT_MASK, masked, touched)
                .await
                .map_err(Error::Bus)?;
            bus.update(Reg::CHG_CNFG_00, bits::OTG_CTRL, bits::OTG_CTRL)
                .await
                .map_err(Error::Bus)?;
            bus.write(Reg::CHG_CNFG_11, bits::VBYPSET_OTG)
                .await
                .map_err(Error::Bus)?;
        } else {
            let buck = if self.host.slate_mode() { 0 } else { bits::BUCK };
            {
                let mut bus = regs.lock().await;
                bus.update(Reg::CHG_CNFG_00, buck, bits::BUCK | bits::OTG_CTRL)
                    .await
                    .map_err(Error::Bus)?;
                bus.write(Reg::CHG_CNFG_11, 0).await.map_err(Error::Bus)?;
            }
            self.time.delay_ms(50).await;
            if let Some(mask) = self.saved_int_mask.take() {
                self.write(Reg::CHG_INT_MASK, mask)
                    .await
                    .map_err(Error::Bus)?;
            }
        }
        info!("OTG {}", if enable { "on" } else { "off" });
        Ok(())
    }

    /// Whether OTG output is switched on. Needs both the OTG and boost bits.
    pub async fn otg_enabled(&mut self) -> Result<bool, Error<R::Error>> {
        let cnfg = self.read(Reg::CHG_CNFG_00).await.map_err(Error::Bus)?;
        Ok(cnfg & bits::OTG_CTRL == bits::OTG_CTRL)
    }

    /// Source currently powering the charger, from the live interrupt status.
    pub async fn online_source(&mut self) -> CableType {
        match self.read(Reg::CHG_INT_OK).await {
            Ok(raw) => {
                let ok = Interrupts::from_bits(raw);
                if ok.wcin() {
                    self.state.wireless_online = true;
                    CableType::Wireless
                } else if ok.chgin() {
                    CableType::Mains
                } else {
                    CableType::Battery
                }
            }
            Err(e) => {
                warn!("online read failed: {:?}", e);
                CableType::Battery
            }
        }
    }

    /// Whether a battery is attached.
    pub async fn battery_present(&mut self) -> bool {
        let ok = Interrupts::from_bits(self.read_or(Reg::CHG_INT_OK, 0).await);
        let details = Details00::from_bits(self.read_or(Reg::CHG_DETAILS_00, 0).await);
        ok.batp() || !details.batp_dtls()
    }

    /// Charging status from the charge detail code.
    pub async fn charging_status(&mut self) -> ChargingStatus {
        match self.read(Reg::CHG_DETAILS_01).await {
            Ok(raw) => Details01::from_bits(raw).charger().status(),
            Err(e) => {
                warn!("charge detail read failed: {:?}", e);
                ChargingStatus::Unknown
            }
        }
    }

    /// Charge phase as text: "CC Mode", "CV Mode", "EOC", "DONE" or "NONE".
    pub async fn charge_now(&mut self) -> &'static str {
        match self.read(Reg::CHG_DETAILS_01).await {
            Ok(raw) => Details01::from_bits(raw).charger().phase_name(),
            Err(_) => "NONE",
        }
    }

    /// Cancel `work` and drop the wake hold tied to it. No-op when nothing is pending.
    pub fn cancel_work(&mut self, work: Work) {
        if self.work.cancel(work) {
            debug!("cancelled {:?}", work);
        }
        if let Some(source) = wake_source(work) {
            self.wake.release(&mut self.host, source);
        }
    }

    pub(crate) fn schedule_in(&mut self, work: Work, delay_ms: u32) {
        let at = self.time.now_ms() + u64::from(delay_ms);
        self.work.schedule(work, at);
    }

    pub(crate) fn schedule_in_if_idle(&mut self, work: Work, delay_ms: u32) -> bool {
        let at = self.time.now_ms() + u64::from(delay_ms);
        self.work.schedule_if_idle(work, at)
    }

    pub(crate) async fn set_aicl_irq(&mut self, enable: bool) {
        let next = match (self.aicl_irq, enable) {
            (AiclIrq::Unavailable, _) => return,
            (_, true) => AiclIrq::Enabled,
            (_, false) => AiclIrq::Disabled,
        };
        if next == self.aicl_irq {
            return;
        }
        let bit = Interrupts::new().with_aicl(true).bits();
        let value = if enable { 0 } else { bit };
        let result = self.update(Reg::CHG_INT_MASK, value, bit).await;
        report("AICL interrupt mask", result);
        if !enable {
            self.cancel_work(Work::Aicl);
        }
        self.aicl_irq = next;
    }

    pub(crate) async fn read(&self, reg: Reg) -> Result<u8, R::Error> {
        self.regs.lock().await.read(reg).await
    }

    pub(crate) async fn read_or(&self, reg: Reg, fallback: u8) -> u8 {
        match self.read(reg).await {
            Ok(value) => value,
            Err(e) => {
                warn!("read {:?} failed: {:?}", reg, e);
                fallback
            }
        }
    }

    pub(crate) async fn write(&self, reg: Reg, value: u8) -> Result<(), R::Error> {
        self.regs.lock().await.write(reg, value).await
    }

    pub(crate) async fn update(&self, reg: Reg, value: u8, mask: u8) -> Result<(), R::Error> {
        self.regs.lock().await.update(reg, value, mask).await
    }

    /// Dump the charger registers at trace level.
    pub(crate) async fn log_registers(&self) {
        if !log::log_enabled!(log::Level::Trace) {
            return;
        }
        let mut buf = [0u8; DUMP_LEN];
        match self.regs.lock().await.read_block(DUMP_FIRST, &mut buf).await {
            Ok(()) => log::trace!("registers {:#04x}..: {:02x?}", DUMP_FIRST.0, buf),
            Err(e) => warn!("register dump failed: {:?}", e),
        }
    }
}

fn wake_source(work: Work) -> Option<WakeSource> {
    match work {
        Work::Aicl => Some(WakeSource::Aicl),
        Work::WirelessRamp => Some(WakeSource::WirelessRamp),
        Work::AfcDetect => Some(WakeSource::Afc),
        Work::WirelessPadDetect => Some(WakeSource::WirelessPad),
        Work::ChgInDebounce => Some(WakeSource::ChgIn),
        Work::ChargerIrq | Work::EnableChgInIrq | Work::Watchdog => None,
    }
}
