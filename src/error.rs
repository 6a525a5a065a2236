/// Errors returned by the public controller operations.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub enum Error<E> {
    /// Register transport failure.
    Bus(E),
    /// The property cannot be read or written on this charger.
    NotSupported,
    /// The value is out of range or of the wrong kind for the property.
    InvalidValue,
    /// The PMIC did not answer during initialization.
    DeviceNotFound,
}

impl<E: core::fmt::Debug> core::fmt::Display for Error<E> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Error::Bus(e) => write!(f, "register access failed: {:?}", e),
            Error::NotSupported => write!(f, "property not supported"),
            Error::InvalidValue => write!(f, "invalid property value"),
            Error::DeviceNotFound => write!(f, "charger not found"),
        }
    }
}
