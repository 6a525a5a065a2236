//! Current and voltage register codes.
//!
//! Every function here is pure: the same target always yields the same code for a given
//! chip revision.

/// Largest CHGIN input current code (4000mA).
pub const CHGIN_ILIM_MAX_CODE: u8 = 0x78;
/// Input current represented by codes 0..=3.
pub const CHGIN_ILIM_MIN_MA: u32 = 100;
/// Input current represented by [`CHGIN_ILIM_MAX_CODE`] and above.
pub const CHGIN_ILIM_MAX_MA: u32 = 4000;

/// Wireless input current step.
pub const WCIN_ILIM_STEP_MA: u32 = 20;
/// Input current represented by wireless codes 0..=3.
pub const WCIN_ILIM_MIN_MA: u32 = 60;
/// Wireless input ceiling.
pub const WCIN_ILIM_MAX_MA: u32 = 1000;

/// Fast charge current step.
pub const CHG_CC_STEP_MA: u32 = 50;
const CHG_CC_MAX_CODE: u8 = 0x3f;

/// Lowest programmable float voltage.
pub const FLOAT_VOLTAGE_MIN_MV: u32 = 3650;
/// Highest programmable float voltage.
pub const FLOAT_VOLTAGE_MAX_MV: u32 = 4700;
const FLOAT_VOLTAGE_STEP_MV: u32 = 25;
const FLOAT_VOLTAGE_4340_CODE: u8 = 0x1c;

/// CHGIN input current limit code.
///
/// Each 100mA band holds three codes at 0, 33 and 67mA.
pub fn chgin_ilim_to_code(milliamps: u32) -> u8 {
    let milliamps = milliamps.min(CHGIN_ILIM_MAX_MA);
    let quotient = milliamps / 100;
    let tertile = match milliamps % 100 {
        0..=32 => 0,
        33..=66 => 1,
        _ => 2,
    };
    (quotient * 3 + tertile) as u8
}

/// Input current programmed by a CHGIN code.
pub fn chgin_ilim_to_ma(code: u8) -> u32 {
    let code = code & 0x7f;
    if code <= 3 {
        return CHGIN_ILIM_MIN_MA;
    }
    if code >= CHGIN_ILIM_MAX_CODE {
        return CHGIN_ILIM_MAX_MA;
    }
    let quotient = u32::from(code / 3);
    let extra = match code % 3 {
        0 => 0,
        1 => 33,
        _ => 67,
    };
    quotient * 100 + extra
}

/// WCIN input current limit code, clamped to 1A.
pub fn wcin_ilim_to_code(milliamps: u32) -> u8 {
    let milliamps = milliamps.min(WCIN_ILIM_MAX_MA);
    if milliamps <= WCIN_ILIM_MIN_MA {
        0x03
    } else {
        (milliamps / WCIN_ILIM_STEP_MA) as u8
    }
}

/// Input current programmed by a WCIN code.
pub fn wcin_ilim_to_ma(code: u8) -> u32 {
    let code = code & 0x3f;
    if code <= 3 {
        WCIN_ILIM_MIN_MA
    } else {
        u32::from(code) * WCIN_ILIM_STEP_MA
    }
}

/// Fast charge current code.
pub fn fast_charge_to_code(milliamps: u32) -> u8 {
    (milliamps / CHG_CC_STEP_MA).min(u32::from(CHG_CC_MAX_CODE)) as u8
}

/// Fast charge current programmed by a CHG_CC code.
pub fn fast_charge_to_ma(code: u8) -> u32 {
    let code = code & CHG_CC_MAX_CODE;
    if code <= 2 {
        100
    } else {
        u32::from(code) * CHG_CC_STEP_MA
    }
}

/// Float voltage code.
///
/// Linear from 3650mV in 25mV steps, except that 0x1C is 4340mV and 0x1D is 4350mV.
/// Targets between steps round up.
pub fn float_voltage_to_code(millivolts: u32) -> u8 {
    let millivolts = millivolts.clamp(FLOAT_VOLTAGE_MIN_MV, FLOAT_VOLTAGE_MAX_MV);
    let index = (millivolts - FLOAT_VOLTAGE_MIN_MV).div_ceil(FLOAT_VOLTAGE_STEP_MV) as u8;
    if millivolts <= 4340 {
        index
    } else {
        index + 1
    }
}

/// Float voltage programmed by a CHG_CV_PRM code.
pub fn float_voltage_to_mv(code: u8) -> u32 {
    let code = code & 0x3f;
    match code {
        c if c < FLOAT_VOLTAGE_4340_CODE => FLOAT_VOLTAGE_MIN_MV + u32::from(c) * FLOAT_VOLTAGE_STEP_MV,
        FLOAT_VOLTAGE_4340_CODE => 4340,
        c => 4350 + u32::from(c - FLOAT_VOLTAGE_4340_CODE - 1) * FLOAT_VOLTAGE_STEP_MV,
    }
}

/// Top-off termination current range for a chip revision.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub struct TopOffRange {
    /// Current at code 0.
    pub base_ma: u32,
    /// Current per code.
    pub step_ma: u32,
    /// Highest programmable current.
    pub max_ma: u32,
}

impl TopOffRange {
    /// Range used by the given PMIC revision.
    pub fn for_revision(revision: u8) -> Self {
        if revision >= 2 {
            TopOffRange { base_ma: 125, step_ma: 75, max_ma: 650 }
        } else {
            TopOffRange { base_ma: 100, step_ma: 50, max_ma: 450 }
        }
    }
}

/// CNFG_03 value for a top-off current and top-off timer.
///
/// The timer is programmed in 10 minute units, saturating at 70 minutes.
pub fn topoff_to_code(milliamps: u32, timer_secs: u32, revision: u8) -> u8 {
    let range = TopOffRange::for_revision(revision);
    let milliamps = milliamps.clamp(range.base_ma, range.max_ma);
    let current = ((milliamps - range.base_ma) / range.step_ma) as u8;
    let timer = (timer_secs / 60 / 10).min(7) as u8;
    current | (timer << 3)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chgin_tertiles() {
        assert_eq!(chgin_ilim_to_code(1000), 30);
        assert_eq!(chgin_ilim_to_code(1033), 31);
        assert_eq!(chgin_ilim_to_code(1067), 32);
        assert_eq!(chgin_ilim_to_code(1099), 32);
        assert_eq!(chgin_ilim_to_ma(30), 1000);
        assert_eq!(chgin_ilim_to_ma(31), 1033);
        assert_eq!(chgin_ilim_to_ma(32), 1067);
    }

    #[test]
    fn chgin_limits() {
        assert_eq!(chgin_ilim_to_ma(0), 100);
        assert_eq!(chgin_ilim_to_ma(3), 100);
        assert_eq!(chgin_ilim_to_ma(0x78), 4000);
        assert_eq!(chgin_ilim_to_ma(0x7f), 4000);
        assert_eq!(chgin_ilim_to_code(9000), 0x78);
    }

    #[test]
    fn chgin_round_trip_within_one_step() {
        let mut last = 0;
        for ma in 0..=4000u32 {
            let code = chgin_ilim_to_code(ma);
            assert!(code >= last, "encode not monotonic at {ma}");
            last = code;
            let back = chgin_ilim_to_ma(code);
            let expected = ma.max(CHGIN_ILIM_MIN_MA);
            assert!(back.abs_diff(expected) <= 34, "{ma} -> {code:#x} -> {back}");
        }
    }

    #[test]
    fn wcin_round_trip_within_one_step() {
        for ma in 0..=1000u32 {
            let back = wcin_ilim_to_ma(wcin_ilim_to_code(ma));
            let expected = ma.max(WCIN_ILIM_MIN_MA);
            assert!(back.abs_diff(expected) < WCIN_ILIM_STEP_MA, "{ma} -> {back}");
        }
        assert_eq!(wcin_ilim_to_code(1500), wcin_ilim_to_code(1000));
        assert_eq!(wcin_ilim_to_code(500), 0x19);
    }

    #[test]
    fn fast_charge_codes() {
        assert_eq!(fast_charge_to_code(2100), 42);
        assert_eq!(fast_charge_to_code(10_000), 0x3f);
        assert_eq!(fast_charge_to_ma(42), 2100);
        assert_eq!(fast_charge_to_ma(1), 100);
    }

    #[test]
    fn float_voltage_boundary() {
        assert_eq!(float_voltage_to_code(3650), 0x00);
        assert_eq!(float_voltage_to_code(4325), 0x1b);
        assert_eq!(float_voltage_to_code(4330), 0x1c);
        assert_eq!(float_voltage_to_code(4340), 0x1c);
        assert_eq!(float_voltage_to_code(4350), 0x1d);
        assert_eq!(float_voltage_to_code(4375), 0x1e);
        assert_eq!(float_voltage_to_code(4400), 0x1f);
        assert_eq!(float_voltage_to_mv(0x1b), 4325);
        assert_eq!(float_voltage_to_mv(0x1c), 4340);
        assert_eq!(float_voltage_to_mv(0x1d), 4350);
        assert_eq!(float_voltage_to_mv(0x1f), 4400);
    }

    #[test]
    fn float_voltage_steps_round_trip() {
        for code in 0..=0x2bu8 {
            assert_eq!(float_voltage_to_code(float_voltage_to_mv(code)), code);
        }
    }

    #[test]
    fn topoff_by_revision() {
        assert_eq!(topoff_to_code(275, 70 * 60, 3), 0x02 | 0x38);
        assert_eq!(topoff_to_code(200, 70 * 60, 1), 0x02 | 0x38);
        assert_eq!(topoff_to_code(0, 0, 3), 0x00);
        assert_eq!(topoff_to_code(5000, 24 * 3600, 1), 0x07 | 0x38);
    }
}
