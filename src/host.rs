//! Seam toward the battery management framework.

use crate::cable::CableType;
use crate::state::{ChargeMode, Health};

/// Reason a wake hold is taken.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub enum WakeSource {
    /// CHGIN debounce in progress.
    ChgIn,
    /// Wireless pad detect in progress.
    WirelessPad,
    /// AFC detect timer armed.
    Afc,
    /// AICL backoff in progress.
    Aicl,
    /// Wireless current ramp in progress.
    WirelessRamp,
}

impl WakeSource {
    const fn bit(self) -> u8 {
        1 << (self as u8)
    }
}

/// The battery framework the controller is driven by and reports to.
///
/// Queries have conservative defaults so a host only implements what it tracks.
pub trait PowerSupplyHost {
    /// Battery health as tracked by the framework.
    fn battery_health(&self) -> Health {
        Health::Good
    }

    /// Cable type the framework considers online. Selects whether VBUS health is read
    /// from the wireless or the wired input.
    fn battery_online(&self) -> CableType {
        CableType::Battery
    }

    /// State of charge in percent.
    fn battery_capacity(&self) -> u8 {
        0
    }

    /// Average battery current from the fuel gauge, in mA. Positive while charging.
    fn average_current_ma(&self) -> i32 {
        0
    }

    /// The battery is in the swelling temperature band.
    fn swelling_active(&self) -> bool {
        false
    }

    /// Full-charge stage.
    fn charge_mode(&self) -> ChargeMode {
        ChargeMode::None
    }

    /// The buck must stay off regardless of the cable.
    fn slate_mode(&self) -> bool {
        false
    }

    /// Another device is drawing power through power sharing.
    fn power_sharing_active(&self) -> bool {
        false
    }

    /// Charger derived health change.
    fn report_health(&mut self, _health: Health) {}

    /// Charger reached termination.
    fn report_full(&mut self) {}

    /// AICL backed the input limit off below the slow charging threshold.
    fn report_slow_charging(&mut self) {}

    /// Battery presence was lost.
    fn report_battery_removed(&mut self) {}

    /// Wireless pad presence changed.
    fn set_wireless_online(&mut self, _online: bool) {}

    /// OTG output tripped its current limit.
    fn report_otg_overcurrent(&mut self) {}

    /// Ask the adapter to switch to `volts`.
    fn request_afc_voltage(&mut self, _volts: u8) {}

    /// OTG is being switched on or off. Lets the wireless receiver follow.
    fn wireless_otg_control(&mut self, _enable: bool) {}

    /// Keep the system out of suspend.
    fn wake_acquire(&mut self, _source: WakeSource) {}

    /// Allow suspend again.
    fn wake_release(&mut self, _source: WakeSource) {}
}

/// Tracks which wake holds are outstanding so each is released exactly once.
#[derive(Default, Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub struct WakeHolds {
    held: u8,
}

impl WakeHolds {
    /// Acquire `source` unless it is already held.
    pub fn hold<H: PowerSupplyHost>(&mut self, host: &mut H, source: WakeSource) {
        if self.held & source.bit() == 0 {
            self.held |= source.bit();
            host.wake_acquire(source);
        }
    }

    /// Release `source` if it is held.
    pub fn release<H: PowerSupplyHost>(&mut self, host: &mut H, source: WakeSource) {
        if self.held & source.bit() != 0 {
            self.held &= !source.bit();
            host.wake_release(source);
        }
    }

    /// Whether `source` is held.
    pub fn is_held(&self, source: WakeSource) -> bool {
        self.held & source.bit() != 0
    }

    /// Release everything still held.
    pub fn release_all<H: PowerSupplyHost>(&mut self, host: &mut H) {
        for source in [
            WakeSource::ChgIn,
            WakeSource::WirelessPad,
            WakeSource::Afc,
            WakeSource::Aicl,
            WakeSource::WirelessRamp,
        ] {
            self.release(host, source);
        }
    }
}
