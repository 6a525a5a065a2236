#![cfg_attr(not(test), no_std)]
#![warn(missing_docs)]
#![allow(async_fn_in_trait)]

//! An embedded async charge controller for the MAX77843 PMIC battery charger: cable
//! classification, input and charge current regulation, AICL backoff, wireless current
//! ramping and input fault monitoring.
//!
//! ```ignore
//! let bus = Mutex::<NoopRawMutex, _>::new(I2cRegisters::new(i2c));
//! let events = EventQueue::<NoopRawMutex, 8>::new();
//! let mut charger = Charger::new(&bus, delay, host, ChargerConfig::default());
//! charger.init(InterruptLines::all()).await?;
//! charger.set_online(CableType::Mains).await?;
//! charger.run(events.receiver()).await;
//! ```

mod aicl;
mod cable;
mod charger;
mod config;
mod dispatch;
mod encoding;
mod error;
mod health;
mod host;
mod interface;
mod profile;
mod property;
mod ramp;
mod registers;
mod regulator;
mod schedule;
mod state;
mod time;

pub use cable::CableType;
pub use charger::Charger;
pub use config::{ChargerConfig, WIRELESS_RAMP_STEP_MA};
pub use dispatch::{AiclIrq, Event, EventQueue, InterruptLines, IrqHandle};
pub use encoding::{
    chgin_ilim_to_code, chgin_ilim_to_ma, fast_charge_to_code, fast_charge_to_ma,
    float_voltage_to_code, float_voltage_to_mv, topoff_to_code, wcin_ilim_to_code,
    wcin_ilim_to_ma, TopOffRange,
};
pub use error::Error;
pub use host::{PowerSupplyHost, WakeHolds, WakeSource};
pub use interface::{I2cRegisters, RegisterAccess, CHARGER_ADDR, PMIC_ADDR};
pub use profile::{ChargeProfile, ProfileTable};
pub use property::{Property, PropertyValue};
pub use ramp::WirelessRamp;
pub use registers::{
    bits, field, BatteryDetail, BypassDetail, ChargeDetail, Details00, Details01, Details02,
    Field, Interrupts, Mode, Reg, VbusDetail,
};
pub use schedule::{Scheduler, Work};
pub use state::{ChargeMode, ChargeType, ChargerState, ChargingStatus, Health};
pub use time::Timebase;
