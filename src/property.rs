//! Named property surface for the battery framework.

use embassy_sync::blocking_mutex::raw::RawMutex;
use log::{debug, info};

use crate::cable::CableType;
use crate::charger::Charger;
use crate::error::Error;
use crate::host::PowerSupplyHost;
use crate::interface::RegisterAccess;
use crate::state::{ChargeType, ChargingStatus, Health};
use crate::time::Timebase;

/// Properties the framework can read or write.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub enum Property {
    /// Powered source. Writing attaches a cable.
    Online,
    /// Battery presence. Read only.
    Present,
    /// Charging status. Written by the framework, read from the charger.
    Status,
    /// None, slow or fast. Read only.
    ChargeType,
    /// Charging health. Read only.
    Health,
    /// Input current ceiling in mA.
    CurrentMax,
    /// Requested fast charge current in mA. Reads back the input current.
    CurrentAvg,
    /// Direct charge current in mA. Reads back the input current.
    CurrentNow,
    /// Programmed fast charge current in mA.
    ConstantChargeCurrent,
    /// Throttling percent.
    SiopLevel,
    /// Float voltage in mV.
    VoltageMax,
    /// OTG output.
    OtgControl,
    /// USB high-current mode. Write only.
    UsbHc,
    /// Charge phase text. Read only.
    ChargeNow,
    /// Store mode.
    StoreMode,
    /// Display on. Write only.
    LcdOn,
    /// Voice call in progress. Write only.
    CallOn,
    /// Adapter voltage being negotiated: 0, 5 or 9.
    NegotiatedVoltage,
}

/// Property payload.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub enum PropertyValue {
    /// Integer quantity: mA, mV, percent or volts.
    Int(i32),
    /// Flag.
    Bool(bool),
    /// Cable type.
    Cable(CableType),
    /// Health.
    Health(Health),
    /// Charging status.
    Status(ChargingStatus),
    /// Charge type.
    ChargeType(ChargeType),
    /// Fixed text.
    Text(&'static str),
}

impl PropertyValue {
    fn int<E>(self) -> Result<i32, Error<E>> {
        match self {
            PropertyValue::Int(v) => Ok(v),
            _ => Err(Error::InvalidValue),
        }
    }

    fn unsigned<E>(self) -> Result<u32, Error<E>> {
        u32::try_from(self.int()?).map_err(|_| Error::InvalidValue)
    }

    fn flag<E>(self) -> Result<bool, Error<E>> {
        match self {
            PropertyValue::Bool(v) => Ok(v),
            PropertyValue::Int(v) => Ok(v != 0),
            _ => Err(Error::InvalidValue),
        }
    }
}

fn int_of(value: u32) -> PropertyValue {
    PropertyValue::Int(i32::try_from(value).unwrap_or(i32::MAX))
}

impl<'a, M, R, T, H> Charger<'a, M, R, T, H>
where
    M: RawMutex,
    R: RegisterAccess,
    T: Timebase,
    H: PowerSupplyHost,
{
    /// Read a property.
    pub async fn get_property(&mut self, property: Property) -> Result<PropertyValue, Error<R::Error>> {
        let value = match property {
            Property::Online => PropertyValue::Cable(self.online_source().await),
            Property::Present => PropertyValue::Bool(self.battery_present().await),
            Property::Status => PropertyValue::Status(self.charging_status().await),
            Property::ChargeType => PropertyValue::ChargeType(self.state.charge_type()),
            Property::Health => PropertyValue::Health(self.charging_health().await),
            Property::CurrentMax => int_of(self.state.charging_current_max),
            Property::CurrentAvg | Property::CurrentNow => int_of(self.input_current().await?),
            Property::ConstantChargeCurrent => int_of(self.charge_current().await?),
            Property::SiopLevel => PropertyValue::Int(i32::from(self.state.siop_level)),
            Property::VoltageMax => int_of(self.float_voltage().await?),
            Property::OtgControl => PropertyValue::Bool(self.otg_enabled().await?),
            Property::ChargeNow => PropertyValue::Text(self.charge_now().await),
            Property::StoreMode => PropertyValue::Bool(self.state.store_mode),
            Property::NegotiatedVoltage => {
                PropertyValue::Int(i32::from(self.state.vbus_negotiated_voltage))
            }
            Property::UsbHc | Property::LcdOn | Property::CallOn => {
                return Err(Error::NotSupported)
            }
        };
        Ok(value)
    }

    /// Write a property.
    ///
    /// Values of the wrong kind or out of range are rejected with
    /// [`Error::InvalidValue`] and change nothing.
    pub async fn set_property(
        &mut self,
        property: Property,
        value: PropertyValue,
    ) -> Result<(), Error<R::Error>> {
        debug!("set {:?} = {:?}", property, value);
        match property {
            Property::Online => match value {
                PropertyValue::Cable(cable) => self.set_online(cable).await,
                _ => Err(Error::InvalidValue),
            },
            Property::Status => match value {
                PropertyValue::Status(status) => {
                    self.set_status(status);
                    Ok(())
                }
                _ => Err(Error::InvalidValue),
            },
            Property::CurrentMax => self.set_current_max(value.unsigned()?).await,
            Property::CurrentAvg => self.set_charging_current(value.unsigned()?).await,
            Property::CurrentNow => self.set_current_now(value.unsigned()?).await,
            Property::SiopLevel => {
                let level = u8::try_from(value.int()?).map_err(|_| Error::InvalidValue)?;
                self.set_siop_level(level).await
            }
            Property::VoltageMax => self.set_float_voltage(value.unsigned()?).await,
            Property::OtgControl => self.set_otg(value.flag()?).await,
            Property::UsbHc => self.set_usb_hc(value.flag()?).await,
            Property::StoreMode => self.set_store_mode(value.flag()?).await,
            Property::LcdOn => {
                self.set_lcd_on(value.flag()?);
                Ok(())
            }
            Property::CallOn => {
                self.set_call_on(value.flag()?);
                Ok(())
            }
            Property::NegotiatedVoltage => {
                let volts = u8::try_from(value.int()?).map_err(|_| Error::InvalidValue)?;
                self.set_negotiated_voltage(volts).await
            }
            Property::ConstantChargeCurrent | Property::ChargeNow => {
                value.int()?;
                Ok(())
            }
            Property::Present | Property::ChargeType | Property::Health => Err(Error::NotSupported),
        }
    }

    /// Record the battery status pushed by the framework.
    pub fn set_status(&mut self, status: ChargingStatus) {
        self.state.status = status;
    }

    /// Record whether the display is on.
    pub fn set_lcd_on(&mut self, on: bool) {
        info!("LCD {}", if on { "on" } else { "off" });
        self.state.lcd_on = on;
    }

    /// Record whether a voice call is in progress.
    pub fn set_call_on(&mut self, on: bool) {
        info!("call {}", if on { "on" } else { "off" });
        self.state.call_on = on;
    }
}
