//! Current regulation: turns current targets into register codes.

use embassy_sync::blocking_mutex::raw::RawMutex;
use log::{debug, info};

use crate::cable::CableType;
use crate::charger::{report, Charger};
use crate::encoding::{
    chgin_ilim_to_code, chgin_ilim_to_ma, fast_charge_to_code, fast_charge_to_ma,
    float_voltage_to_code, float_voltage_to_mv, topoff_to_code, wcin_ilim_to_code,
    wcin_ilim_to_ma, FLOAT_VOLTAGE_MAX_MV, FLOAT_VOLTAGE_MIN_MV,
};
use crate::error::Error;
use crate::host::{PowerSupplyHost, WakeSource};
use crate::interface::RegisterAccess;
use crate::registers::{bits, field, ChargeDetail, Details01, Reg};
use crate::schedule::Work;
use crate::state::ChargingStatus;
use crate::time::Timebase;

/// Capacity at which the wireless input is trimmed to the measured draw.
const WIRELESS_TRIM_CAPACITY: u8 = 95;

async fn set_buck<R: RegisterAccess>(bus: &mut R, enable: bool, slate: bool) -> Result<(), R::Error> {
    let value = if enable && !slate { bits::BUCK } else { 0 };
    bus.update(Reg::CHG_CNFG_00, value, bits::BUCK).await
}

async fn select_charge_path<R: RegisterAccess>(bus: &mut R, wireless: bool) -> Result<(), R::Error> {
    bus.write_field(field::CHGINSEL, u8::from(!wireless)).await
}

impl<'a, M, R, T, H> Charger<'a, M, R, T, H>
where
    M: RawMutex,
    R: RegisterAccess,
    T: Timebase,
    H: PowerSupplyHost,
{
    /// Full regulation pass: derive effective currents from the targets and program them.
    pub(crate) async fn set_current(&mut self) -> Result<(), R::Error> {
        let cfg = &self.config;
        let siop = u32::from(self.state.siop_level);
        let wireless = self.state.cable_type.is_wireless();
        let usb_floor = self.profile(CableType::Usb).fast_charging_current;
        let mut current_now = self.state.requested_charging_current;
        let mut current_max = self.state.charging_current_max;

        if self.state.is_charging {
            let scaled = u64::from(current_now) * u64::from(siop) / 100;
            current_now = u32::try_from(scaled).unwrap_or(u32::MAX);
            if current_now > 0 && current_now < usb_floor {
                current_now = usb_floor;
            }
            if siop < 100 {
                if wireless {
                    current_now = if self.state.siop_level == cfg.siop_wireless_stop_level {
                        0
                    } else {
                        current_now.min(cfg.siop_wireless_charging_limit)
                    };
                } else {
                    current_max = current_max.min(cfg.siop_input_limit);
                    current_now = current_now.min(cfg.siop_charging_limit);
                }
            }
        }

        if wireless {
            current_max = self.calc_wc_current(self.state.charging_current_max).await;
        }
        current_now = current_now.min(current_max);

        info!(
            "regulate {:?}: siop {}%, input {} mA, charge {} mA",
            self.state.cable_type, self.state.siop_level, current_max, current_now
        );

        let applied = self.set_charge_current(current_now).await?;
        self.state.charging_current = applied;

        if wireless {
            let from = match self.input_current().await {
                Ok(ma) => ma,
                Err(_) => self.config.wireless_ramp_start,
            };
            self.start_wireless_ramp(from, current_max);
        } else {
            self.set_input_current(current_max).await?;
        }
        self.log_registers().await;
        Ok(())
    }

    /// Program the input current limit of the active path.
    ///
    /// Zero turns the buck off instead of programming a zero-current code.
    pub(crate) async fn set_input_current(&mut self, input: u32) -> Result<(), R::Error> {
        let cable = self.state.cable_type;
        let input = if self.state.store_mode
            && matches!(cable, CableType::HvUnknown | CableType::HvMains | CableType::HvErr)
        {
            self.config.store_mode_input_current
        } else {
            input
        };
        let wireless = cable.is_wireless();
        let slate = self.host.slate_mode();
        let limit = if wireless { field::WCIN_ILIM } else { field::CHGIN_ILIM };
        let code = match input {
            0 => 0,
            ma if wireless => wcin_ilim_to_code(ma),
            ma => chgin_ilim_to_code(ma.min(self.state.charging_current_max)),
        };
        let discharging_on_battery =
            cable == CableType::Battery && self.state.status == ChargingStatus::Discharging;
        let usb_wireless_code = wcin_ilim_to_code(self.profile(CableType::Usb).input_current_limit);

        let regs = self.regs;
        let mut bus = regs.lock().await;
        if input == 0 {
            set_buck(&mut *bus, false, slate).await?;
        } else {
            select_charge_path(&mut *bus, wireless).await?;
            set_buck(&mut *bus, true, slate).await?;
        }
        bus.write_field(limit, code).await?;
        if discharging_on_battery {
            bus.write_field(field::WCIN_ILIM, usb_wireless_code).await?;
        }
        drop(bus);

        debug!("input current {} mA: {:?} = {:#04x}", input, limit.reg, code);
        Ok(())
    }

    /// Program the fast charge current, returning the value actually applied.
    pub(crate) async fn set_charge_current(&mut self, current: u32) -> Result<u32, R::Error> {
        let mut current = current;
        if self.config.swelling && self.state.is_charging && self.host.swelling_active() {
            let cap = if self.state.cable_type.is_wireless() {
                self.config.swelling_wireless_charging_current
            } else {
                self.config.swelling_charging_current
            };
            current = current.min(cap);
        }
        let code = fast_charge_to_code(current);
        self.regs
            .lock()
            .await
            .write_field(field::CHG_CC, code)
            .await?;
        debug!("charge current {} mA = {:#04x}", current, code);
        Ok(current)
    }

    /// Wireless input limit for a requested ceiling, trimmed by throttling and by the
    /// measured draw once the battery is nearly full.
    pub(crate) async fn calc_wc_current(&mut self, requested: u32) -> u32 {
        let cfg = &self.config;
        let mut input = requested;
        if !self.state.cable_type.is_wireless() {
            return input;
        }

        if self.state.siop_level < 100 {
            input = if self.state.siop_level == cfg.siop_wireless_stop_level {
                cfg.siop_wireless_stop_input
            } else {
                cfg.siop_wireless_input_limit
            };
        }

        let detail = Details01::from_bits(self.read_or(Reg::CHG_DETAILS_01, 0).await).charger();
        let capacity = self.host.battery_capacity();
        let topping_off = matches!(
            detail,
            ChargeDetail::ConstantVoltage | ChargeDetail::TopOff | ChargeDetail::Done | ChargeDetail::Off
        );

        if !self.state.lcd_on && !self.state.call_on && (topping_off || capacity >= WIRELESS_TRIM_CAPACITY) {
            let cfg = &self.config;
            let ceiling = i64::from(self.host.average_current_ma()) + i64::from(cfg.wireless_offset_current);
            if i64::from(input) > ceiling {
                input = u32::try_from(ceiling.max(0)).unwrap_or(0);
            }
            input = input.max(cfg.wireless_minimum_input_current);
            input = input.min(self.profile(self.state.cable_type).input_current_limit);
            input -= input % 20;
            debug!("wireless input trimmed to {} mA (capacity {}%)", input, capacity);
        }
        input
    }

    /// Point the wireless ramp at `target`.
    ///
    /// A ramp already in flight keeps its position; otherwise it starts from `from`.
    pub(crate) fn start_wireless_ramp(&mut self, from: u32, target: u32) {
        if self.work.is_pending(Work::WirelessRamp) {
            self.state.ramp.retarget(target);
        } else {
            self.state.ramp.restart(from, target);
        }
        debug!("wireless ramp {} -> {} mA", self.state.ramp.current(), target);
        self.wake.hold(&mut self.host, WakeSource::WirelessRamp);
        self.schedule_in(Work::WirelessRamp, 0);
    }

    /// One ramp tick.
    pub(crate) async fn wireless_ramp_tick(&mut self) {
        if !self.state.cable_type.is_wireless() {
            self.reset_wireless_ramp().await;
            return;
        }

        if let Some(next) = self.state.ramp.advance(self.config.wireless_ramp_step) {
            let result = self.set_input_current(next).await;
            report("wireless input current", result);
        }

        if self.state.ramp.is_settled() {
            debug!("wireless ramp settled at {} mA", self.state.ramp.current());
            self.wake.release(&mut self.host, WakeSource::WirelessRamp);
        } else {
            self.schedule_in(Work::WirelessRamp, self.config.wireless_ramp_interval_ms);
        }
    }

    /// Park the ramp at its start current and leave the wireless limit at its default.
    pub(crate) async fn reset_wireless_ramp(&mut self) {
        let start = self.config.wireless_ramp_start;
        self.state.ramp.reset(start);
        let result = self
            .regs
            .lock()
            .await
            .write_field(field::WCIN_ILIM, wcin_ilim_to_code(start))
            .await;
        report("wireless limit reset", result);
        self.wake.release(&mut self.host, WakeSource::WirelessRamp);
    }

    /// Program top-off current and timer.
    pub(crate) async fn set_topoff_current(&mut self, current: u32, timer_secs: u32) -> Result<(), R::Error> {
        let code = topoff_to_code(current, timer_secs, self.revision);
        debug!("top-off {} mA / {} s = {:#04x}", current, timer_secs, code);
        self.write(Reg::CHG_CNFG_03, code).await
    }

    /// Input current limit programmed for the active path, in mA.
    pub async fn input_current(&mut self) -> Result<u32, Error<R::Error>> {
        if self.state.cable_type.is_wireless() {
            let code = self.read(Reg::CHG_CNFG_10).await.map_err(Error::Bus)?;
            Ok(wcin_ilim_to_ma(field::WCIN_ILIM.extract(code)))
        } else {
            let code = self.read(Reg::CHG_CNFG_09).await.map_err(Error::Bus)?;
            Ok(chgin_ilim_to_ma(field::CHGIN_ILIM.extract(code)))
        }
    }

    /// Fast charge current programmed, in mA.
    pub async fn charge_current(&mut self) -> Result<u32, Error<R::Error>> {
        let code = self.read(Reg::CHG_CNFG_02).await.map_err(Error::Bus)?;
        Ok(fast_charge_to_ma(field::CHG_CC.extract(code)))
    }

    /// Float voltage programmed, in mV.
    pub async fn float_voltage(&mut self) -> Result<u32, Error<R::Error>> {
        let code = self.read(Reg::CHG_CNFG_04).await.map_err(Error::Bus)?;
        Ok(float_voltage_to_mv(field::CHG_CV_PRM.extract(code)))
    }

    /// Change the float voltage.
    pub async fn set_float_voltage(&mut self, millivolts: u32) -> Result<(), Error<R::Error>> {
        if !(FLOAT_VOLTAGE_MIN_MV..=FLOAT_VOLTAGE_MAX_MV).contains(&millivolts) {
            return Err(Error::InvalidValue);
        }
        let code = float_voltage_to_code(millivolts);
        self.regs
            .lock()
            .await
            .write_field(field::CHG_CV_PRM, code)
            .await
            .map_err(Error::Bus)?;
        self.state.float_voltage = millivolts;
        info!("float voltage {} mV = {:#04x}", millivolts, code);
        Ok(())
    }

    /// Set the input current ceiling and regulate.
    pub async fn set_current_max(&mut self, milliamps: u32) -> Result<(), Error<R::Error>> {
        let cable = self.state.cable_type;
        let limit = self.profile(cable).input_current_limit;
        self.state.charging_current_max = milliamps.min(limit);

        if cable.is_wireless()
            && self.state.siop_level < 100
            && self.config.wpc_delayed_current == Some(milliamps)
        {
            debug!("delayed wireless current {} mA, regulation skipped", milliamps);
            return Ok(());
        }
        self.set_current().await.map_err(Error::Bus)
    }

    /// Set the requested fast charge current and regulate.
    ///
    /// While swelling protection is configured, requests above the cable profile are
    /// ignored.
    pub async fn set_charging_current(&mut self, milliamps: u32) -> Result<(), Error<R::Error>> {
        let fast = self.profile(self.state.cable_type).fast_charging_current;
        if self.config.swelling && milliamps > fast {
            debug!("charging current {} mA above profile {} mA, ignored", milliamps, fast);
            return Ok(());
        }
        self.state.requested_charging_current = milliamps;
        self.set_current().await.map_err(Error::Bus)
    }

    /// Program charge and input current directly, bypassing throttling.
    pub async fn set_current_now(&mut self, milliamps: u32) -> Result<(), Error<R::Error>> {
        let charge = milliamps.min(self.state.charging_current_max);
        let applied = self.set_charge_current(charge).await.map_err(Error::Bus)?;
        self.state.charging_current = applied;

        if self.state.cable_type.is_wireless() {
            let from = self.input_current().await?;
            let target = self.calc_wc_current(milliamps).await;
            self.start_wireless_ramp(from, target);
            Ok(())
        } else {
            self.set_input_current(milliamps).await.map_err(Error::Bus)
        }
    }

    /// Apply a thermal/UI throttling percentage and regulate.
    pub async fn set_siop_level(&mut self, level: u8) -> Result<(), Error<R::Error>> {
        if level > 100 {
            return Err(Error::InvalidValue);
        }
        self.state.siop_level = level;
        self.set_current().await.map_err(Error::Bus)
    }

    /// Enter or leave store mode.
    pub async fn set_store_mode(&mut self, enable: bool) -> Result<(), Error<R::Error>> {
        self.state.store_mode = enable;
        info!("store mode {}", if enable { "on" } else { "off" });
        let max = self.state.charging_current_max;
        self.set_input_current(max).await.map_err(Error::Bus)
    }

    /// Let USB ports draw the mains profile.
    pub async fn set_usb_hc(&mut self, enable: bool) -> Result<(), Error<R::Error>> {
        self.state.usb_hc = enable;
        Ok(())
    }

    /// Ask the adapter for `volts` (5 or 9) and hold the input at the TA ceiling until the
    /// AFC timer expires.
    pub async fn set_negotiated_voltage(&mut self, volts: u8) -> Result<(), Error<R::Error>> {
        if volts != 5 && volts != 9 {
            return Err(Error::InvalidValue);
        }
        let ta = self.config.input_current_ta;
        let input = self.input_current().await?;
        self.state.vbus_negotiated_voltage = volts;
        if input > ta {
            self.set_input_current(ta).await.map_err(Error::Bus)?;
        }
        info!("requesting {} V from adapter", volts);
        self.host.request_afc_voltage(volts);
        self.state.charging_current_max = ta;

        self.cancel_work(Work::AfcDetect);
        self.schedule_in(Work::AfcDetect, self.config.afc_detect_delay_ms);
        self.wake.hold(&mut self.host, WakeSource::Afc);
        Ok(())
    }

    /// AFC timer expiry: lift the TA ceiling once the adapter has settled.
    pub(crate) async fn afc_detect_expired(&mut self) {
        let ta = self.config.input_current_ta;
        let cable = self.state.cable_type;

        if cable == CableType::Mains && self.state.is_charging && self.state.afc_detect {
            self.state.afc_detect = false;
            if self.state.charging_current_max >= ta {
                self.state.charging_current_max = self.profile(cable).input_current_limit;
            }
            info!("plain mains adapter, input ceiling {} mA", self.state.charging_current_max);
            let result = self.set_current().await;
            report("regulation", result);
        } else if (cable == CableType::HvMainsChgLimit || cable.is_hv_wire())
            && self.state.is_charging
            && self.state.vbus_negotiated_voltage != 0
        {
            self.state.vbus_negotiated_voltage = 0;
            if self.state.charging_current_max >= ta {
                self.state.charging_current_max = self.profile(cable).input_current_limit;
            }
            info!("adapter voltage settled, input ceiling {} mA", self.state.charging_current_max);
            let result = self.set_current().await;
            report("regulation", result);
        }
        self.wake.release(&mut self.host, WakeSource::Afc);
    }
}
