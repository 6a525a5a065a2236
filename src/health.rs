//! Input and battery health classification, CHGIN debounce and the fault safe state.

use embassy_sync::blocking_mutex::raw::RawMutex;
use log::{debug, info, warn};

use crate::cable::CableType;
use crate::charger::{report, Charger};
use crate::host::{PowerSupplyHost, WakeSource};
use crate::interface::RegisterAccess;
use crate::registers::{bits, ChargeDetail, Details00, Details01, Interrupts, Reg, VbusDetail};
use crate::state::Health;
use crate::time::Timebase;

/// One CHGIN debounce sample.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
struct InputSample {
    chgin: VbusDetail,
    charger: ChargeDetail,
    cnfg_00: u8,
}

impl InputSample {
    /// Buck and charger are both enabled.
    fn buck_and_charger(&self) -> bool {
        let both = bits::BUCK | bits::CHG;
        self.cnfg_00 & both == both
    }
}

impl<'a, M, R, T, H> Charger<'a, M, R, T, H>
where
    M: RawMutex,
    R: RegisterAccess,
    T: Timebase,
    H: PowerSupplyHost,
{
    /// Classify charging health and kick the watchdog.
    ///
    /// An input fault found while charging enters the safe state before returning, and a
    /// good reading after one resumes charging.
    ///
    /// A good battery detail can still be overridden by the input rail: overvoltage wins,
    /// and undervoltage applies on wired cables while the charger has stopped with buck and
    /// charger enabled. A previously reported undervoltage holds while VBUS stays low.
    pub async fn charging_health(&mut self) -> Health {
        self.kick_watchdog().await;

        let details = match self.read(Reg::CHG_DETAILS_01).await {
            Ok(raw) => Details01::from_bits(raw),
            Err(e) => {
                warn!("battery detail read failed: {:?}", e);
                self.state.health = Health::Unknown;
                return Health::Unknown;
            }
        };
        let mut health = details.battery().health();
        debug!("battery detail {:?} -> {:?}", details.battery(), health);

        if health == Health::Good {
            let reported = self.host.battery_health();
            let wireless = self.state.cable_type.is_wireless();
            let vbus = self.vbus_detail().await;
            let charger = details.charger();
            let cnfg_00 = self.read_or(Reg::CHG_CNFG_00, 0).await;

            self.recover_terminal_charge(charger).await;

            let both = bits::BUCK | bits::CHG;
            if vbus == Some(VbusDetail::Overvoltage) {
                health = if wireless && !self.wireless_overvoltage_confirmed().await {
                    Health::Good
                } else {
                    info!("VBUS overvoltage");
                    Health::Overvoltage
                };
            } else if !wireless && vbus.is_some_and(VbusDetail::is_low) {
                if charger.is_off_or_fault() && cnfg_00 & both == both {
                    info!("VBUS undervoltage");
                    health = Health::Undervoltage;
                } else if reported == Health::Undervoltage {
                    debug!("VBUS still low, keeping undervoltage");
                    health = Health::Undervoltage;
                }
            }
        }

        self.state.health = health;
        if health.is_input_fault() && self.state.is_charging {
            self.input_fault(health).await;
        } else if health == Health::Good && self.state.fault_suspended {
            info!("input back to normal");
            self.host.report_health(Health::Good);
            self.resume_after_fault().await;
        }
        health
    }

    /// VBUS detail of the input path the host considers online.
    pub(crate) async fn vbus_detail(&self) -> Option<VbusDetail> {
        match self.read(Reg::CHG_DETAILS_00).await {
            Ok(raw) => {
                let details = Details00::from_bits(raw);
                Some(if self.host.battery_online().is_wireless() {
                    details.wcin()
                } else {
                    details.chgin()
                })
            }
            Err(e) => {
                warn!("VBUS detail read failed: {:?}", e);
                None
            }
        }
    }

    /// Re-read VBUS after a wireless overvoltage reading.
    ///
    /// Confirmed only if every re-read still shows overvoltage.
    async fn wireless_overvoltage_confirmed(&mut self) -> bool {
        for attempt in 1..=self.config.vbus_ovp_rereads {
            self.time.delay_ms(self.config.vbus_ovp_reread_delay_ms).await;
            let vbus = self.vbus_detail().await;
            if vbus != Some(VbusDetail::Overvoltage) {
                debug!("wireless overvoltage cleared on re-read {}", attempt);
                return false;
            }
        }
        true
    }

    /// Cycle the charger off and on when it has stopped while it should be charging.
    pub(crate) async fn recover_terminal_charge(&mut self, charger: ChargeDetail) {
        if !self.state.is_charging || !charger.is_off_or_fault() {
            return;
        }
        warn!("charger stopped ({:?}) while charging, restarting", charger);
        self.log_registers().await;
        let result = self.set_charger_state(false).await;
        report("charger off", result);
        let result = self.set_charger_state(true).await;
        report("charger on", result);
    }

    async fn input_sample(&self) -> Result<InputSample, R::Error> {
        let regs = self.regs;
        let mut bus = regs.lock().await;
        let chgin = Details00::from_bits(bus.read(Reg::CHG_DETAILS_00).await?).chgin();
        let charger = Details01::from_bits(bus.read(Reg::CHG_DETAILS_01).await?).charger();
        let cnfg_00 = bus.read(Reg::CHG_CNFG_00).await?;
        Ok(InputSample { chgin, charger, cnfg_00 })
    }

    /// Wait for the CHGIN detail to hold still, then act on it.
    ///
    /// Gives up after `chgin_max_polls` reads without a stable run.
    pub(crate) async fn chgin_debounce(&mut self) {
        self.wake.hold(&mut self.host, WakeSource::ChgIn);
        let chgin_bit = Interrupts::new().with_chgin(true).bits();
        let result = self.update(Reg::CHG_INT_MASK, chgin_bit, chgin_bit).await;
        report("CHGIN interrupt mask", result);

        let mut previous = None;
        let mut stable = 0u8;
        let mut settled = None;
        for _ in 0..self.config.chgin_max_polls {
            match self.input_sample().await {
                Ok(sample) => {
                    if previous == Some(sample.chgin) {
                        stable = stable.saturating_add(1);
                    } else {
                        stable = 0;
                    }
                    previous = Some(sample.chgin);
                    if stable >= self.config.chgin_stable_reads {
                        settled = Some(sample);
                        break;
                    }
                }
                Err(e) => {
                    warn!("CHGIN sample failed: {:?}", e);
                    previous = None;
                    stable = 0;
                }
            }
            self.time.delay_ms(self.config.chgin_poll_ms).await;
        }

        match settled {
            Some(sample) => self.apply_input_sample(sample).await,
            None => warn!("CHGIN did not settle after {} reads", self.config.chgin_max_polls),
        }

        if self.chgin_irq_enabled {
            let result = self.update(Reg::CHG_INT_MASK, 0, chgin_bit).await;
            report("CHGIN interrupt unmask", result);
        }
        self.wake.release(&mut self.host, WakeSource::ChgIn);
    }

    async fn apply_input_sample(&mut self, sample: InputSample) {
        let reported = self.host.battery_health();
        let wired = !self.state.cable_type.is_wireless();
        debug!("CHGIN settled: {:?}, charger {:?}", sample.chgin, sample.charger);

        if self.state.is_charging {
            if sample.chgin == VbusDetail::Overvoltage && reported != Health::Overvoltage {
                info!("charger input overvoltage");
                self.input_fault(Health::Overvoltage).await;
            } else if sample.chgin.is_low()
                && sample.charger.is_off_or_fault()
                && sample.buck_and_charger()
                && reported != Health::Undervoltage
                && wired
            {
                info!("charger input undervoltage");
                self.input_fault(Health::Undervoltage).await;
            }
        } else if (reported == Health::Overvoltage && sample.chgin != VbusDetail::Overvoltage)
            || (reported == Health::Undervoltage && !sample.chgin.is_low())
        {
            info!("charger input back to normal from {:?}", reported);
            self.state.health = Health::Good;
            self.host.report_health(Health::Good);
            self.resume_after_fault().await;
        }
    }

    /// Report an input fault and stop charging.
    pub(crate) async fn input_fault(&mut self, health: Health) {
        self.state.health = health;
        self.host.report_health(health);
        self.enter_safe_state().await;
    }

    /// Clear the charger bit and suspend charging bookkeeping until the input recovers.
    pub(crate) async fn enter_safe_state(&mut self) {
        if !self.state.is_charging {
            return;
        }
        warn!("input fault, charging suspended");
        self.state.is_charging = false;
        self.state.fault_suspended = true;
        let result = self.set_charger_state(false).await;
        report("charger off", result);
    }

    /// Undo [`Charger::enter_safe_state`] and regulate again.
    pub(crate) async fn resume_after_fault(&mut self) {
        if !self.state.fault_suspended {
            let max = self.state.charging_current_max;
            let result = self.set_input_current(max).await;
            report("input current", result);
            return;
        }
        let cable = self.state.cable_type;
        self.state.fault_suspended = false;
        self.state.is_charging = !cable.is_unpowered() && cable != CableType::HmtConnected;
        info!("charging resumed on {:?}", cable);

        let result = self.set_charger_state(self.state.is_charging).await;
        report("charger state", result);
        let result = self.set_current().await;
        report("regulation", result);
    }
}
