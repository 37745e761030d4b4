//! # PCA9685 Driver
//!
//! Driver for the NXP PCA9685 16 channel, 12 bit PWM controller on an I2C bus, as used on the
//! Adafruit 16 channel servo/PWM boards.
//!
//! The crate is layered:
//! - [`Pca9685`] is the register level driver (frequency, mode bits, raw channel counts),
//! - [`PwmLed`] drives LEDs from 8 or 12 bit brightness values,
//! - [`Servo`] drives hobby servos from calibrated pulse widths and 0-255 angles.
//!
//! Both adapters own a [`Pca9685`] and give access to it, so any register level operation is
//! still available.
//!
//! The bus is anything implementing the `embedded-hal` blocking I2C `Write` and `WriteRead`
//! traits, and the delay anything implementing `DelayUs<u32>`. On a Raspberry Pi these are
//! `rppal::i2c::I2c` and `rppal::hal::Delay`; [`sim`] provides a software chip for everywhere
//! else.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

mod driver;
mod dump;
mod error;
pub mod pwm_led;
pub mod registers;
pub mod servo;
pub mod sim;

// ------------------------------------------------------------------------------------------------
// EXPORTS
// ------------------------------------------------------------------------------------------------

pub use driver::*;
pub use dump::Dump;
pub use error::Error;
pub use pwm_led::PwmLed;
pub use servo::Servo;
