//! # PWM LED adapter
//!
//! Drives LEDs from 8 or 12 bit brightness values, using the full on/off overrides at the ends of
//! the range so that "off" and "fully lit" are exact.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::fmt::Debug;

use embedded_hal::blocking::{
    delay::DelayUs,
    i2c::{Write, WriteRead},
};
use log::debug;

use crate::{driver::MAX_12BIT, driver::MAX_8BIT, error::Error, Pca9685};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Refresh frequency used for LEDs, high enough to avoid visible flicker.
pub const PWM_LED_DEFAULT_FREQUENCY: u16 = 120;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A PCA9685 used to dim LEDs.
pub struct PwmLed<I2C, D> {
    driver: Pca9685<I2C, D>,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl<I2C, D, E> PwmLed<I2C, D>
where
    I2C: Write<Error = E> + WriteRead<Error = E>,
    D: DelayUs<u32>,
    E: Debug,
{
    /// Take over an initialised driver and set it to [`PWM_LED_DEFAULT_FREQUENCY`].
    pub fn new(mut driver: Pca9685<I2C, D>) -> Result<Self, Error<E>> {
        driver.set_frequency(PWM_LED_DEFAULT_FREQUENCY)?;

        debug!("PCA9685 at {:#04x} configured for LEDs", driver.address());

        Ok(Self { driver })
    }

    /// Set a 12 bit brightness.
    ///
    /// `0` is fully off and anything from `0xFFF` up is fully on.
    pub fn set(&mut self, channel: u8, value: u16) -> Result<(), Error<E>> {
        set_12bit(&mut self.driver, channel, value)
    }

    /// Set an 8 bit brightness, scaled to 12 bits.
    ///
    /// `0` is fully off and `0xFF` is fully on.
    pub fn set_u8(&mut self, channel: u8, value: u8) -> Result<(), Error<E>> {
        set_8bit(&mut self.driver, channel, value)
    }

    /// The underlying register driver.
    pub fn driver(&self) -> &Pca9685<I2C, D> {
        &self.driver
    }

    /// Mutable access to the underlying register driver.
    pub fn driver_mut(&mut self) -> &mut Pca9685<I2C, D> {
        &mut self.driver
    }

    /// Give back the underlying register driver.
    pub fn into_inner(self) -> Pca9685<I2C, D> {
        self.driver
    }
}

// ------------------------------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Expand an 8 bit value to 12 bits by repeating its high nibble in the low bits.
///
/// This spreads 1-254 over the whole 12 bit range instead of leaving the low 4 bits always zero.
pub fn expand_8bit(value: u8) -> u16 {
    let value = u16::from(value);
    (value << 4) | (value >> 4)
}

/// Write a 12 bit brightness using the full on/off overrides at the ends of the range.
pub(crate) fn set_12bit<I2C, D, E>(
    driver: &mut Pca9685<I2C, D>,
    channel: u8,
    value: u16,
) -> Result<(), Error<E>>
where
    I2C: Write<Error = E> + WriteRead<Error = E>,
    D: DelayUs<u32>,
    E: Debug,
{
    if value >= MAX_12BIT {
        driver.set_full_on(channel, true)
    }
    else if value == 0 {
        driver.set_full_off(channel, true)
    }
    else {
        driver.write_off(channel, value)
    }
}

/// Write an 8 bit brightness using the full on/off overrides at the ends of the range.
pub(crate) fn set_8bit<I2C, D, E>(
    driver: &mut Pca9685<I2C, D>,
    channel: u8,
    value: u8,
) -> Result<(), Error<E>>
where
    I2C: Write<Error = E> + WriteRead<Error = E>,
    D: DelayUs<u32>,
    E: Debug,
{
    if value == MAX_8BIT {
        driver.set_full_on(channel, true)
    }
    else if value == 0 {
        driver.set_full_off(channel, true)
    }
    else {
        driver.write_off(channel, expand_8bit(value))
    }
}
