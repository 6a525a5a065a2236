use crate::cable::CableType;
use crate::ramp::WirelessRamp;

/// Health classification of the battery and its input.
#[derive(Default, Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub enum Health {
    /// Not yet known, or an unrecognised detail code.
    #[default]
    Unknown,
    /// Normal.
    Good,
    /// Input or battery overvoltage.
    Overvoltage,
    /// Input undervoltage.
    Undervoltage,
    /// Battery failed to qualify within the charge timer.
    Dead,
    /// No battery, or charging suspended for an unspecified reason.
    UnspecifiedFailure,
    /// Battery too hot to charge. Reported by the host only.
    Overheat,
    /// Battery too cold to charge. Reported by the host only.
    Cold,
    /// Battery overheated past the hard limit. Reported by the host only.
    OverheatLimit,
}

impl Health {
    /// An input-side fault that requires charging to stop.
    pub fn is_input_fault(self) -> bool {
        matches!(self, Health::Overvoltage | Health::Undervoltage)
    }
}

/// Charging status as seen by the battery framework.
#[derive(Default, Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub enum ChargingStatus {
    /// Unknown.
    #[default]
    Unknown,
    /// Charging.
    Charging,
    /// Running from the battery.
    Discharging,
    /// Input present but not charging.
    NotCharging,
    /// Charge complete.
    Full,
}

/// Charge rate classification.
#[derive(Default, Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub enum ChargeType {
    /// Not charging.
    #[default]
    None,
    /// Charging with the input limit backed off by AICL.
    Slow,
    /// Charging normally.
    Fast,
}

/// Full-charge stage tracked by the battery framework.
#[derive(Default, Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub enum ChargeMode {
    /// Not charging.
    #[default]
    None,
    /// Charging towards the first termination current.
    FirstStage,
    /// Charging towards the second termination current.
    SecondStage,
}

/// The controller's published view of the charger.
///
/// Owned and mutated only by [`crate::Charger`]. Callers get a shared reference.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub struct ChargerState {
    /// Active cable.
    pub cable_type: CableType,
    /// Battery status last pushed by the framework.
    pub status: ChargingStatus,
    /// Whether the charger bit should be enabled for the cable.
    pub is_charging: bool,
    /// Fast charge current programmed by the last regulation pass, in mA.
    pub charging_current: u32,
    /// Input current ceiling in mA.
    pub charging_current_max: u32,
    /// Last health classification.
    pub health: Health,
    /// AICL backed the input limit off below the slow charging threshold.
    pub aicl_active: bool,
    /// Negotiated adapter voltage: 0, 5 or 9 volts.
    pub vbus_negotiated_voltage: u8,
    /// Waiting for the AFC detect timer to confirm a plain mains adapter.
    pub afc_detect: bool,
    /// Thermal/UI throttling percent.
    pub siop_level: u8,
    /// Retail demo mode.
    pub store_mode: bool,
    /// Display on.
    pub lcd_on: bool,
    /// Voice call in progress.
    pub call_on: bool,
    /// USB ports are allowed to draw the mains profile.
    pub usb_hc: bool,
    /// Attached through a multimedia dock.
    pub mdock: bool,
    /// Wireless input present, as last confirmed by the pad detect.
    pub wireless_online: bool,
    /// Float voltage in mV.
    pub float_voltage: u32,
    /// Charging is suspended because of an input fault.
    pub fault_suspended: bool,
    pub(crate) requested_charging_current: u32,
    pub(crate) ramp: WirelessRamp,
}

impl ChargerState {
    pub(crate) fn new(float_voltage: u32, ramp_start: u32) -> Self {
        ChargerState {
            cable_type: CableType::Battery,
            status: ChargingStatus::Discharging,
            is_charging: false,
            charging_current: 0,
            charging_current_max: 500,
            health: Health::Unknown,
            aicl_active: false,
            vbus_negotiated_voltage: 0,
            afc_detect: false,
            siop_level: 100,
            store_mode: false,
            lcd_on: false,
            call_on: false,
            usb_hc: false,
            mdock: false,
            wireless_online: false,
            float_voltage,
            fault_suspended: false,
            requested_charging_current: 0,
            ramp: WirelessRamp::new(ramp_start),
        }
    }

    /// Wireless input current the ramp is heading for, in mA.
    pub fn wireless_ramp_target(&self) -> u32 {
        self.ramp.target()
    }

    /// Wireless input current most recently programmed by the ramp, in mA.
    pub fn wireless_ramp_current(&self) -> u32 {
        self.ramp.current()
    }

    /// Charge type derived from the charging and AICL flags.
    pub fn charge_type(&self) -> ChargeType {
        if !self.is_charging {
            ChargeType::None
        } else if self.aicl_active {
            ChargeType::Slow
        } else {
            ChargeType::Fast
        }
    }
}
