//! Register transport.

use embedded_hal_async::i2c::I2c;

use crate::registers::{Field, Reg};

/// I2C address of the PMIC top-level block.
pub const PMIC_ADDR: u8 = 0x66;
/// I2C address of the charger block.
pub const CHARGER_ADDR: u8 = 0x69;

/// Byte-addressed access to the charger register map.
///
/// Everything in this crate talks to the hardware through these operations.
#[allow(async_fn_in_trait)]
pub trait RegisterAccess {
    /// Transport error.
    type Error: core::fmt::Debug;

    /// Read a single register.
    async fn read(&mut self, reg: Reg) -> Result<u8, Self::Error>;

    /// Write a single register.
    async fn write(&mut self, reg: Reg, value: u8) -> Result<(), Self::Error>;

    /// Read-modify-write restricted to the bits in `mask`.
    async fn update(&mut self, reg: Reg, value: u8, mask: u8) -> Result<(), Self::Error> {
        let old = self.read(reg).await?;
        self.write(reg, (old & !mask) | (value & mask)).await
    }

    /// Read consecutive registers starting at `base`.
    async fn read_block(&mut self, base: Reg, buf: &mut [u8]) -> Result<(), Self::Error> {
        for (offset, byte) in buf.iter_mut().enumerate() {
            *byte = self.read(Reg(base.0.wrapping_add(offset as u8))).await?;
        }
        Ok(())
    }

    /// Read a field, shifted down to bit 0.
    async fn read_field(&mut self, field: Field) -> Result<u8, Self::Error> {
        self.read(field.reg).await.map(|raw| field.extract(raw))
    }

    /// Write a field, leaving the rest of its register untouched.
    async fn write_field(&mut self, field: Field, value: u8) -> Result<(), Self::Error> {
        self.update(field.reg, field.place(value), field.mask()).await
    }
}

/// [`RegisterAccess`] over an async I2C bus.
///
/// Charger registers are addressed at [`CHARGER_ADDR`], everything below them at
/// [`PMIC_ADDR`].
pub struct I2cRegisters<D> {
    i2c_dev: D,
}

impl<D: I2c> I2cRegisters<D> {
    /// Wrap an I2C device.
    pub fn new(i2c_dev: D) -> Self {
        I2cRegisters { i2c_dev }
    }

    /// Give the bus back.
    pub fn release(self) -> D {
        self.i2c_dev
    }

    fn addr(reg: Reg) -> u8 {
        if reg.is_charger() {
            CHARGER_ADDR
        } else {
            PMIC_ADDR
        }
    }
}

impl<D: I2c> RegisterAccess for I2cRegisters<D> {
    type Error = D::Error;

    async fn read(&mut self, reg: Reg) -> Result<u8, D::Error> {
        let mut val = 0u8;
        self.i2c_dev
            .write_read(
                Self::addr(reg),
                core::slice::from_ref(&reg.to_u8()),
                core::slice::from_mut(&mut val),
            )
            .await?;
        Ok(val)
    }

    async fn write(&mut self, reg: Reg, value: u8) -> Result<(), D::Error> {
        let buf = [reg.to_u8(), value];
        self.i2c_dev.write(Self::addr(reg), &buf).await
    }

    async fn read_block(&mut self, base: Reg, buf: &mut [u8]) -> Result<(), D::Error> {
        self.i2c_dev
            .write_read(Self::addr(base), core::slice::from_ref(&base.to_u8()), buf)
            .await
    }
}
