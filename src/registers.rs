//! MAX77843 charger register map and bit layouts.

use modular_bitfield::specifiers::{B1, B2, B4};
use modular_bitfield::{bitfield, BitfieldSpecifier};

use crate::state::{ChargingStatus, Health};

/// A register address in the PMIC address space.
///
/// Addresses at or above [`Reg::CHG_INT`] belong to the charger block, the rest to the
/// PMIC top level.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub struct Reg(pub u8);

#[allow(missing_docs)]
impl Reg {
    pub const PMIC_ID: Reg = Reg(0x00);
    pub const PMIC_REVISION: Reg = Reg(0x01);

    pub const CHG_INT: Reg = Reg(0xb0);
    pub const CHG_INT_MASK: Reg = Reg(0xb1);
    pub const CHG_INT_OK: Reg = Reg(0xb2);
    pub const CHG_DETAILS_00: Reg = Reg(0xb3);
    pub const CHG_DETAILS_01: Reg = Reg(0xb4);
    pub const CHG_DETAILS_02: Reg = Reg(0xb5);
    pub const CHG_CNFG_00: Reg = Reg(0xb7);
    pub const CHG_CNFG_01: Reg = Reg(0xb8);
    pub const CHG_CNFG_02: Reg = Reg(0xb9);
    pub const CHG_CNFG_03: Reg = Reg(0xba);
    pub const CHG_CNFG_04: Reg = Reg(0xbb);
    pub const CHG_CNFG_06: Reg = Reg(0xbd);
    pub const CHG_CNFG_07: Reg = Reg(0xbe);
    pub const CHG_CNFG_09: Reg = Reg(0xc0);
    pub const CHG_CNFG_10: Reg = Reg(0xc1);
    pub const CHG_CNFG_11: Reg = Reg(0xc2);
    pub const CHG_CNFG_12: Reg = Reg(0xc3);

    pub const fn new(val: u8) -> Self {
        Reg(val)
    }

    pub const fn to_u8(self) -> u8 {
        self.0
    }

    /// Whether the register lives in the charger block.
    pub const fn is_charger(self) -> bool {
        self.0 >= Self::CHG_INT.0
    }
}

/// A named bit field inside a register.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub struct Field {
    /// Register holding the field.
    pub reg: Reg,
    /// Position of the least significant bit.
    pub shift: u8,
    /// Width in bits.
    pub width: u8,
}

impl Field {
    /// Describe `width` bits of `reg` starting at bit `shift`.
    pub const fn new(reg: Reg, shift: u8, width: u8) -> Self {
        Field { reg, shift, width }
    }

    /// Largest value the field can hold.
    pub const fn max(self) -> u8 {
        ((1u16 << self.width) - 1) as u8
    }

    /// In-register mask covering the field.
    pub const fn mask(self) -> u8 {
        self.max() << self.shift
    }

    /// Shift `value` into position, dropping bits that do not fit.
    pub const fn place(self, value: u8) -> u8 {
        (value & self.max()) << self.shift
    }

    /// Pull the field out of a raw register value.
    pub const fn extract(self, raw: u8) -> u8 {
        (raw & self.mask()) >> self.shift
    }
}

/// Field descriptors used by the controller.
#[allow(missing_docs)]
pub mod field {
    use super::{Field, Reg};

    pub const MODE: Field = Field::new(Reg::CHG_CNFG_00, 0, 4);
    pub const CHG_CC: Field = Field::new(Reg::CHG_CNFG_02, 0, 6);
    pub const TO_ITH: Field = Field::new(Reg::CHG_CNFG_03, 0, 3);
    pub const TO_TIME: Field = Field::new(Reg::CHG_CNFG_03, 3, 3);
    pub const CHG_CV_PRM: Field = Field::new(Reg::CHG_CNFG_04, 0, 6);
    pub const WDTCLR: Field = Field::new(Reg::CHG_CNFG_06, 0, 2);
    pub const CHGPROT: Field = Field::new(Reg::CHG_CNFG_06, 2, 2);
    pub const CHGIN_ILIM: Field = Field::new(Reg::CHG_CNFG_09, 0, 7);
    pub const WCIN_ILIM: Field = Field::new(Reg::CHG_CNFG_10, 0, 6);
    pub const CHGINSEL: Field = Field::new(Reg::CHG_CNFG_12, 5, 1);
}

/// Single-bit constants for registers read and written as a whole.
#[allow(missing_docs)]
pub mod bits {
    /// CNFG_00 mode bits.
    pub const CHG: u8 = 1 << 0;
    pub const OTG: u8 = 1 << 1;
    pub const BUCK: u8 = 1 << 2;
    pub const BOOST: u8 = 1 << 3;
    pub const WDTEN: u8 = 1 << 4;
    pub const OTG_CTRL: u8 = OTG | BOOST;

    /// CNFG_01 switching frequency select.
    pub const FQ_2MHZ: u8 = 1 << 3;
    /// CNFG_02 OTG current limit 1200mA.
    pub const OTG_ILIM_1200: u8 = 1 << 7;
    /// CNFG_06 watchdog clear pattern.
    pub const WDTCLR: u8 = 0x01;
    /// CNFG_06 protection field value that opens the configuration registers.
    pub const CHGPROT_UNLOCKED: u8 = 0x03;

    /// CNFG_01: charge timer and restart threshold disabled.
    pub const CNFG_01_DEFAULT: u8 = 0x30;
    /// CNFG_03: top-off 70 minutes, lowest termination current.
    pub const CNFG_03_DEFAULT: u8 = 0x38;
    /// CNFG_11: 5.0V bypass regulation while sourcing OTG.
    pub const VBYPSET_OTG: u8 = 0x50;
    /// CNFG_09 code left behind on shutdown (500mA).
    pub const CHGIN_ILIM_SHUTDOWN: u8 = 0x0f;
    /// CNFG_10 code left behind on shutdown and wireless detach (500mA).
    pub const WCIN_ILIM_DEFAULT: u8 = 0x19;
    /// CNFG_12 value left behind on shutdown.
    pub const CNFG_12_SHUTDOWN: u8 = 0x67;
}

/// Charger mode as programmed into the low nibble of CNFG_00.
#[derive(Default, Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
#[repr(u8)]
pub enum Mode {
    #[default]
    /// Charger, OTG, buck and boost all off. The battery supports the system.
    Off = 0x0,
    /// Buck on, charger off. The system runs from a valid input without charging.
    Buck = 0x4,
    /// Buck and charger on.
    Charge = 0x5,
    /// OTG and boost on. The chip sources current out of CHGIN.
    Otg = 0xa,
}

#[bitfield(bits = 8)]
#[derive(Default, Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
/// Charger interrupt bits.
///
/// The same layout is shared by CHG_INT (latched), CHG_INT_MASK (set = masked) and
/// CHG_INT_OK (live status).
pub struct Interrupts {
    /// Bypass node.
    pub byp: bool,
    #[skip]
    __: B1,
    /// Battery presence.
    pub batp: bool,
    /// Battery.
    pub bat: bool,
    /// Charger.
    pub chg: bool,
    /// Wireless charger input.
    pub wcin: bool,
    /// Wired charger input.
    pub chgin: bool,
    /// Adaptive input current loop. Status bit set means the input is not starving.
    pub aicl: bool,
}

impl Interrupts {
    /// Raw register byte.
    pub fn bits(self) -> u8 {
        self.into_bytes()[0]
    }

    /// Decode a raw register byte.
    pub fn from_bits(raw: u8) -> Self {
        Self::from_bytes([raw])
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, BitfieldSpecifier)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
#[bits = 2]
/// CHGIN or WCIN input status
pub enum VbusDetail {
    /// Input is invalid, below the undervoltage lockout.
    Undervoltage,
    /// Input is invalid, above UVLO but below the battery voltage.
    BelowBattery,
    /// Input is invalid, above the overvoltage lockout.
    Overvoltage,
    /// Input is valid.
    Valid,
}

impl VbusDetail {
    /// Below UVLO or below the battery.
    pub fn is_low(self) -> bool {
        matches!(self, VbusDetail::Undervoltage | VbusDetail::BelowBattery)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, BitfieldSpecifier)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
#[bits = 3]
/// Battery status
pub enum BatteryDetail {
    /// No battery, or charging suspended.
    NoBattery,
    /// Battery voltage below the prequalification threshold.
    Prequalification,
    /// Battery has taken longer than expected to charge. Charging suspended.
    Dead,
    /// Battery voltage between minimum system regulation and overvoltage.
    Okay,
    /// Battery voltage between prequalification and minimum system regulation.
    LowVoltage,
    /// Battery voltage above the overvoltage threshold for the last 30ms.
    Overvoltage,
    /// Battery overcurrent.
    Overcurrent,
    /// No valid input. Battery monitoring unavailable.
    NoInput,
}

impl BatteryDetail {
    /// Health classification for the battery detail code.
    pub fn health(self) -> Health {
        match self {
            BatteryDetail::NoBattery => Health::UnspecifiedFailure,
            BatteryDetail::Prequalification | BatteryDetail::Okay | BatteryDetail::LowVoltage => Health::Good,
            BatteryDetail::Dead => Health::Dead,
            BatteryDetail::Overvoltage => Health::Overvoltage,
            BatteryDetail::Overcurrent | BatteryDetail::NoInput => Health::Unknown,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, BitfieldSpecifier)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
#[bits = 4]
/// Charger status
pub enum ChargeDetail {
    /// Dead-battery or low-battery prequalification.
    Prequalification,
    /// Fast-charge constant current.
    ConstantCurrent,
    /// Fast-charge constant voltage.
    ConstantVoltage,
    /// Top-off.
    TopOff,
    /// Done.
    Done,
    #[doc(hidden)]
    Reserved05,
    /// Charge timer fault.
    TimerFault = 6,
    /// Suspended by the thermistor.
    ThermistorSuspend,
    /// Off: input invalid or charger disabled.
    Off,
    #[doc(hidden)]
    Reserved09,
    /// Off: junction temperature above the shutdown threshold.
    HighTemperature = 0x0a,
    /// Off: watchdog timer expired.
    WatchdogTimer,
    #[doc(hidden)]
    Reserved0C,
    #[doc(hidden)]
    Reserved0D,
    #[doc(hidden)]
    Reserved0E,
    #[doc(hidden)]
    Reserved0F,
}

impl ChargeDetail {
    /// Raw detail code.
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Codes 0x08 and above: the charger is off or faulted.
    pub fn is_off_or_fault(self) -> bool {
        self.code() & 0x08 != 0
    }

    /// Charging status reported for the detail code.
    pub fn status(self) -> ChargingStatus {
        match self.code() {
            0x00..=0x02 => ChargingStatus::Charging,
            0x03 | 0x04 => ChargingStatus::Full,
            0x05..=0x07 => ChargingStatus::NotCharging,
            0x08 | 0x0a | 0x0b => ChargingStatus::Discharging,
            _ => ChargingStatus::Unknown,
        }
    }

    /// Charge phase as text.
    pub fn phase_name(self) -> &'static str {
        match self {
            ChargeDetail::ConstantCurrent => "CC Mode",
            ChargeDetail::ConstantVoltage => "CV Mode",
            ChargeDetail::TopOff => "EOC",
            ChargeDetail::Done => "DONE",
            _ => "NONE",
        }
    }
}

#[bitfield(bits = 8)]
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
/// CHG_DETAILS_00
pub struct Details00 {
    /// Set when no battery is detected.
    pub batp_dtls: bool,
    #[skip]
    __: B2,
    #[bits = 2]
    pub wcin: VbusDetail,
    #[bits = 2]
    pub chgin: VbusDetail,
    #[skip]
    __: B1,
}

impl Details00 {
    /// Decode a raw register byte.
    pub fn from_bits(raw: u8) -> Self {
        Self::from_bytes([raw])
    }
}

#[bitfield(bits = 8)]
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
/// CHG_DETAILS_01
pub struct Details01 {
    #[bits = 4]
    pub charger: ChargeDetail,
    #[bits = 3]
    pub battery: BatteryDetail,
    #[skip]
    __: B1,
}

impl Details01 {
    /// Decode a raw register byte.
    pub fn from_bits(raw: u8) -> Self {
        Self::from_bytes([raw])
    }
}

#[bitfield(bits = 4)]
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, BitfieldSpecifier)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
/// Bypass node status
pub struct BypassDetail {
    pub otg_current_limit: bool,
    pub boost_current_limit: bool,
    pub buck_negative_current_limit: bool,
    #[skip]
    __: B1,
}

#[bitfield(bits = 8)]
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
/// CHG_DETAILS_02
pub struct Details02 {
    #[bits = 4]
    pub bypass: BypassDetail,
    #[skip]
    __: B4,
}

impl Details02 {
    /// Decode a raw register byte.
    pub fn from_bits(raw: u8) -> Self {
        Self::from_bytes([raw])
    }
}
