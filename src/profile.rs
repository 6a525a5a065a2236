use crate::cable::CableType;

/// Static charging parameters for one cable type.
#[derive(Default, Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub struct ChargeProfile {
    /// Input current limit in mA.
    pub input_current_limit: u32,
    /// Fast charge current in mA.
    pub fast_charging_current: u32,
    /// First-stage termination current in mA.
    pub full_check_current_1st: u32,
    /// Second-stage termination current in mA.
    ///
    /// When second-stage full check is not done by the charger, this holds the top-off
    /// timer in seconds instead.
    pub full_check_current_2nd: u32,
}

impl ChargeProfile {
    /// A profile that draws nothing.
    pub const NONE: ChargeProfile = ChargeProfile::new(0, 0, 0, 0);

    /// Build a profile from its four parameters.
    pub const fn new(input: u32, fast: u32, full_1st: u32, full_2nd: u32) -> Self {
        ChargeProfile {
            input_current_limit: input,
            fast_charging_current: fast,
            full_check_current_1st: full_1st,
            full_check_current_2nd: full_2nd,
        }
    }
}

/// Charge profiles indexed by [`CableType`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub struct ProfileTable {
    profiles: [ChargeProfile; CableType::COUNT],
}

impl ProfileTable {
    /// A table where every cable draws nothing.
    pub const fn empty() -> Self {
        ProfileTable {
            profiles: [ChargeProfile::NONE; CableType::COUNT],
        }
    }

    /// Replace the profile for `cable`.
    pub fn with(mut self, cable: CableType, profile: ChargeProfile) -> Self {
        self.profiles[cable.index()] = profile;
        self
    }

    /// Profile for `cable`.
    pub fn get(&self, cable: CableType) -> &ChargeProfile {
        &self.profiles[cable.index()]
    }
}

impl Default for ProfileTable {
    fn default() -> Self {
        use CableType::*;

        ProfileTable::empty()
            .with(Unknown, ChargeProfile::new(500, 500, 275, 150))
            .with(Battery, ChargeProfile::new(500, 500, 275, 150))
            .with(Ups, ChargeProfile::new(1000, 1000, 275, 150))
            .with(Mains, ChargeProfile::new(1800, 2100, 275, 150))
            .with(Usb, ChargeProfile::new(500, 500, 275, 150))
            .with(UsbDcp, ChargeProfile::new(500, 500, 275, 150))
            .with(UsbCdp, ChargeProfile::new(1000, 1000, 275, 150))
            .with(UsbAca, ChargeProfile::new(500, 500, 275, 150))
            .with(Otg, ChargeProfile::NONE)
            .with(Dock, ChargeProfile::new(1000, 1000, 275, 150))
            .with(LanHub, ChargeProfile::new(500, 500, 275, 150))
            .with(MdockTa, ChargeProfile::new(1700, 1700, 275, 150))
            .with(SmartOtg, ChargeProfile::new(1000, 1000, 275, 150))
            .with(SmartNotg, ChargeProfile::new(1700, 1700, 275, 150))
            .with(Wireless, ChargeProfile::new(900, 1200, 275, 150))
            .with(HvWireless, ChargeProfile::new(1000, 1200, 275, 150))
            .with(PmaWireless, ChargeProfile::new(900, 1200, 275, 150))
            .with(PowerSharing, ChargeProfile::new(500, 500, 275, 150))
            .with(HvMains, ChargeProfile::new(1650, 2800, 275, 150))
            .with(HvErr, ChargeProfile::new(1000, 2100, 275, 150))
            .with(HvUnknown, ChargeProfile::new(1650, 2800, 275, 150))
            .with(HvMainsChgLimit, ChargeProfile::new(1800, 2100, 275, 150))
            .with(HmtConnected, ChargeProfile::new(1000, 450, 275, 150))
    }
}
