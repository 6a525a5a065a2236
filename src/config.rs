use crate::profile::ProfileTable;

/// Default wireless ramp step.
#[cfg(not(feature = "factory"))]
pub const WIRELESS_RAMP_STEP_MA: u32 = 1000;
/// Default wireless ramp step.
#[cfg(feature = "factory")]
pub const WIRELESS_RAMP_STEP_MA: u32 = 250;

/// Static controller configuration, loaded once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub struct ChargerConfig {
    /// Per-cable charge profiles.
    pub profiles: ProfileTable,
    /// Float voltage in mV.
    pub float_voltage: u32,

    /// Input ceiling while a mains adapter may still turn out to be AFC capable, in mA.
    pub input_current_ta: u32,
    /// How long a mains adapter stays at the TA ceiling before the full profile applies.
    pub afc_detect_delay_ms: u32,

    /// AICL reduction per iteration, in mA.
    pub aicl_step: u32,
    /// AICL never goes below this input limit, in mA.
    pub minimum_input_current: u32,
    /// Input limits at or below this are reported as slow charging, in mA.
    pub slow_charging_threshold: u32,
    /// Delay between the AICL interrupt and the backoff loop.
    pub aicl_irq_delay_ms: u32,
    /// Settle time between AICL reductions.
    pub aicl_settle_ms: u32,

    /// Wired input ceiling while throttled, in mA.
    pub siop_input_limit: u32,
    /// Wired charge ceiling while throttled, in mA.
    pub siop_charging_limit: u32,
    /// Wireless input ceiling while throttled, in mA.
    pub siop_wireless_input_limit: u32,
    /// Wireless charge ceiling while throttled, in mA.
    pub siop_wireless_charging_limit: u32,
    /// Throttling level that stops wireless charging entirely.
    pub siop_wireless_stop_level: u8,
    /// Wireless input limit at [`ChargerConfig::siop_wireless_stop_level`], in mA.
    pub siop_wireless_stop_input: u32,

    /// Wireless input limit right after a wireless detach, in mA.
    pub wireless_ramp_start: u32,
    /// Largest wireless input change per ramp tick, in mA.
    pub wireless_ramp_step: u32,
    /// Period of the wireless ramp.
    pub wireless_ramp_interval_ms: u32,
    /// Headroom over the measured average current once the battery is nearly full, in mA.
    pub wireless_offset_current: u32,
    /// Floor for the reduced wireless input limit, in mA.
    pub wireless_minimum_input_current: u32,
    /// Throttled wireless input current that must not trigger regulation, in mA.
    pub wpc_delayed_current: Option<u32>,

    /// Input current for high voltage adapters in store mode, in mA.
    pub store_mode_input_current: u32,

    /// Clamp charge current while the battery is swelling.
    pub swelling: bool,
    /// Wired charge current while swelling, in mA.
    pub swelling_charging_current: u32,
    /// Wireless charge current while swelling, in mA.
    pub swelling_wireless_charging_current: u32,

    /// Second-stage full check is done by the charger termination current.
    pub full_check_by_charger: bool,
    /// Report a full battery from the charger interrupt.
    pub full_check_on_interrupt: bool,
    /// Report input overvoltage and undervoltage from the charger interrupt.
    pub ovp_uvlo_on_interrupt: bool,
    /// Keep the switching frequency fixed regardless of the adapter.
    pub fixed_switching_frequency: bool,

    /// Unlock attempts before reinitializing.
    pub unlock_retries: u8,
    /// Delay between unlock attempts.
    pub unlock_retry_delay_ms: u32,
    /// Watchdog kick period.
    pub watchdog_interval_ms: u32,
    /// Delay from init until the CHGIN interrupt is unmasked.
    pub chgin_irq_enable_delay_ms: u32,

    /// Extra VBUS reads confirming a wireless overvoltage.
    pub vbus_ovp_rereads: u8,
    /// Delay between VBUS overvoltage re-reads.
    pub vbus_ovp_reread_delay_ms: u32,
    /// Consecutive unchanged CHGIN reads needed before acting.
    pub chgin_stable_reads: u8,
    /// Delay between CHGIN debounce reads.
    pub chgin_poll_ms: u32,
    /// CHGIN debounce gives up after this many reads.
    pub chgin_max_polls: u16,

    /// Wireless pad detect retries while WCIN reads absent.
    pub wpc_detect_retries: u8,
    /// Delay between wireless pad detect reads.
    pub wpc_detect_delay_ms: u32,
    /// Delay before re-checking a pad that reads absent.
    pub wpc_recheck_delay_ms: u32,
}

impl Default for ChargerConfig {
    fn default() -> Self {
        ChargerConfig {
            profiles: ProfileTable::default(),
            float_voltage: 4350,

            input_current_ta: 1000,
            afc_detect_delay_ms: 2000,

            aicl_step: 100,
            minimum_input_current: 300,
            slow_charging_threshold: 400,
            aicl_irq_delay_ms: 50,
            aicl_settle_ms: 50,

            siop_input_limit: 1200,
            siop_charging_limit: 1000,
            siop_wireless_input_limit: 660,
            siop_wireless_charging_limit: 780,
            siop_wireless_stop_level: 7,
            siop_wireless_stop_input: 200,

            wireless_ramp_start: 500,
            wireless_ramp_step: WIRELESS_RAMP_STEP_MA,
            wireless_ramp_interval_ms: 1000,
            wireless_offset_current: 150,
            wireless_minimum_input_current: 250,
            wpc_delayed_current: None,

            store_mode_input_current: 440,

            swelling: false,
            swelling_charging_current: 1000,
            swelling_wireless_charging_current: 600,

            full_check_by_charger: false,
            full_check_on_interrupt: true,
            ovp_uvlo_on_interrupt: true,
            fixed_switching_frequency: false,

            unlock_retries: 10,
            unlock_retry_delay_ms: 20,
            watchdog_interval_ms: 30_000,
            chgin_irq_enable_delay_ms: 3000,

            vbus_ovp_rereads: 3,
            vbus_ovp_reread_delay_ms: 50,
            chgin_stable_reads: 10,
            chgin_poll_ms: 100,
            chgin_max_polls: 200,

            wpc_detect_retries: 2,
            wpc_detect_delay_ms: 50,
            wpc_recheck_delay_ms: 500,
        }
    }
}
