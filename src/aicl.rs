//! Adaptive input current limiting: back the input limit off while the source sags.

use embassy_sync::blocking_mutex::raw::RawMutex;
use log::{debug, info, warn};

use crate::cable::CableType;
use crate::charger::Charger;
use crate::encoding::{chgin_ilim_to_code, chgin_ilim_to_ma};
use crate::host::{PowerSupplyHost, WakeSource};
use crate::interface::RegisterAccess;
use crate::registers::{field, Interrupts, Reg};
use crate::time::Timebase;

/// Input current covered by one CHGIN code.
const CHGIN_CODE_MA: u32 = 33;

impl<'a, M, R, T, H> Charger<'a, M, R, T, H>
where
    M: RawMutex,
    R: RegisterAccess,
    T: Timebase,
    H: PowerSupplyHost,
{
    /// The input cannot sustain the programmed limit.
    ///
    /// Never true while an adapter voltage is being negotiated, since the rail is expected
    /// to move.
    pub(crate) async fn aicl_starving(&self) -> bool {
        if self.state.vbus_negotiated_voltage != 0 {
            return false;
        }
        match self.read(Reg::CHG_INT_OK).await {
            Ok(raw) => !Interrupts::from_bits(raw).aicl(),
            Err(e) => {
                warn!("AICL status read failed: {:?}", e);
                false
            }
        }
    }

    /// Lower the CHGIN limit by `step` mA, never below the configured minimum.
    ///
    /// Returns `false` when the limit was already at the floor.
    pub(crate) async fn reduce_input_current(&mut self, step: u32) -> Result<bool, R::Error> {
        let step_code = (step / CHGIN_CODE_MA).max(1) as u8;
        let floor = chgin_ilim_to_code(self.config.minimum_input_current);

        let regs = self.regs;
        let mut bus = regs.lock().await;
        let code = field::CHGIN_ILIM.extract(bus.read(Reg::CHG_CNFG_09).await?);
        if code <= floor {
            return Ok(false);
        }
        let next = code.saturating_sub(step_code).max(floor);
        bus.write_field(field::CHGIN_ILIM, next).await?;
        drop(bus);

        self.state.charging_current_max = chgin_ilim_to_ma(next);
        debug!(
            "AICL: input {:#04x} -> {:#04x} ({} mA)",
            code, next, self.state.charging_current_max
        );
        Ok(true)
    }

    /// Back the input limit off one step at a time while the source is starving.
    ///
    /// Bounded by `current_max / step` reductions. The limit is never raised again here.
    pub(crate) async fn run_aicl(&mut self) {
        self.state.afc_detect = false;
        if !self.state.is_charging || self.state.cable_type.is_wireless() {
            return;
        }
        self.wake.hold(&mut self.host, WakeSource::Aicl);
        self.ensure_unlocked().await;

        let step = self.config.aicl_step.max(1);
        let max_reductions = self.state.charging_current_max / step;
        let previous = self.state.charging_current_max;
        let mut reductions = 0;

        while reductions < max_reductions
            && self.state.is_charging
            && !self.state.cable_type.is_wireless()
            && self.aicl_starving().await
        {
            reductions += 1;
            match self.reduce_input_current(step).await {
                Ok(true) => {}
                Ok(false) => break,
                Err(e) => {
                    warn!("AICL reduction failed: {:?}", e);
                    break;
                }
            }
            self.time.delay_ms(self.config.aicl_settle_ms).await;
        }
        info!(
            "AICL: input {} -> {} mA after {} steps",
            previous, self.state.charging_current_max, reductions
        );

        if self.state.charging_current_max < previous {
            self.check_slow_charging();
        }
        self.wake.release(&mut self.host, WakeSource::Aicl);
    }

    fn check_slow_charging(&mut self) {
        let slow = self.state.cable_type != CableType::Battery
            && self.state.charging_current_max <= self.config.slow_charging_threshold;
        if slow && !self.state.aicl_active {
            info!("slow charging at {} mA", self.state.charging_current_max);
            self.host.report_slow_charging();
        }
        self.state.aicl_active = slow;
    }
}
