//! # Servo adapter
//!
//! Maps hobby servo pulse widths and 0-255 angles onto PWM counts. The pulse width calibration is
//! shared by every channel of the controller.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::{convert::TryFrom, fmt::Debug};

use embedded_hal::blocking::{
    delay::DelayUs,
    i2c::{Write, WriteRead},
};
use log::debug;
use util::maths::lin_map;

use crate::{
    driver::{MAX_12BIT, MAX_8BIT, PWM_PERIOD_TICKS},
    error::Error,
    pwm_led::{set_12bit, set_8bit},
    Pca9685,
};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Default pulse width for angle 0.
pub const SERVO_LEFT_DEFAULT_US: u16 = 1000;

/// Pulse width half way between the default left and right pulse widths.
pub const SERVO_CENTER_DEFAULT_US: u16 = 1500;

/// Default pulse width for angle 255.
pub const SERVO_RIGHT_DEFAULT_US: u16 = 2000;

/// Standard hobby servo refresh frequency.
pub const SERVO_DEFAULT_FREQUENCY: u16 = 50;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A PCA9685 used to drive servos.
pub struct Servo<I2C, D> {
    driver: Pca9685<I2C, D>,

    left_us: u16,
    right_us: u16,

    /// Counts for the pulse widths at the chip's current frequency
    left_count: u16,
    right_count: u16,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl<I2C, D, E> Servo<I2C, D>
where
    I2C: Write<Error = E> + WriteRead<Error = E>,
    D: DelayUs<u32>,
    E: Debug,
{
    /// Take over an initialised driver and configure it for servos.
    ///
    /// The outputs are set to non-inverted totem pole, the frequency to
    /// [`SERVO_DEFAULT_FREQUENCY`] and the pulse widths to their defaults.
    pub fn new(mut driver: Pca9685<I2C, D>) -> Result<Self, Error<E>> {
        driver.set_invert(false)?;
        driver.set_out_driver(true)?;
        driver.set_frequency(SERVO_DEFAULT_FREQUENCY)?;

        let mut servo = Self {
            driver,
            left_us: SERVO_LEFT_DEFAULT_US,
            right_us: SERVO_RIGHT_DEFAULT_US,
            left_count: 0,
            right_count: 0,
        };
        servo.calc_counts()?;

        debug!(
            "PCA9685 at {:#04x} configured for servos ({} - {} counts)",
            servo.driver.address(),
            servo.left_count,
            servo.right_count
        );

        Ok(servo)
    }

    /// Set the pulse width for angle 0.
    pub fn set_left_us(&mut self, left_us: u16) -> Result<(), Error<E>> {
        self.left_us = left_us;
        self.left_count = count_for_us(left_us, self.driver.frequency()?);
        Ok(())
    }

    /// Pulse width for angle 0.
    pub fn left_us(&self) -> u16 {
        self.left_us
    }

    /// Set the pulse width for angle 255.
    ///
    /// This may be lower than the left pulse width, which reverses the direction of
    /// [`Servo::set_angle`].
    pub fn set_right_us(&mut self, right_us: u16) -> Result<(), Error<E>> {
        self.right_us = right_us;
        self.right_count = count_for_us(right_us, self.driver.frequency()?);
        Ok(())
    }

    /// Pulse width for angle 255.
    pub fn right_us(&self) -> u16 {
        self.right_us
    }

    /// Count written for angle 0 at the current frequency.
    pub fn left_count(&self) -> u16 {
        self.left_count
    }

    /// Count written for angle 255 at the current frequency.
    pub fn right_count(&self) -> u16 {
        self.right_count
    }

    /// Change the PWM frequency and recalculate the pulse width counts.
    ///
    /// Counts written to channels before the change are not updated.
    pub fn set_frequency(&mut self, freq_hz: u16) -> Result<(), Error<E>> {
        self.driver.set_frequency(freq_hz)?;
        self.calc_counts()
    }

    /// Write a raw 12 bit count, with `0` fully off and anything from `0xFFF` fully on.
    pub fn set(&mut self, channel: u8, value: u16) -> Result<(), Error<E>> {
        set_12bit(&mut self.driver, channel, value)
    }

    /// Write a raw 8 bit value scaled to 12 bits, with `0` fully off and `0xFF` fully on.
    pub fn set_u8(&mut self, channel: u8, value: u8) -> Result<(), Error<E>> {
        set_8bit(&mut self.driver, channel, value)
    }

    /// Move a servo to an angle, where 0 is the left pulse width and 255 the right one.
    pub fn set_angle(&mut self, channel: u8, angle: u8) -> Result<(), Error<E>> {
        let count = lin_map(
            (0.0, f64::from(MAX_8BIT)),
            (f64::from(self.left_count), f64::from(self.right_count)),
            f64::from(angle),
        )
        .round();

        // Both ends are already within 0..=4096, the clamp only guards the float conversion
        let count = count.max(0.0).min(f64::from(MAX_12BIT)) as u16;

        self.driver.write_off(channel, count)
    }

    /// The underlying register driver.
    pub fn driver(&self) -> &Pca9685<I2C, D> {
        &self.driver
    }

    /// Mutable access to the underlying register driver.
    ///
    /// Changing the frequency through this bypasses the count recalculation done by
    /// [`Servo::set_frequency`].
    pub fn driver_mut(&mut self) -> &mut Pca9685<I2C, D> {
        &mut self.driver
    }

    /// Give back the underlying register driver.
    pub fn into_inner(self) -> Pca9685<I2C, D> {
        self.driver
    }

    fn calc_counts(&mut self) -> Result<(), Error<E>> {
        let freq_hz = self.driver.frequency()?;

        self.left_count = count_for_us(self.left_us, freq_hz);
        self.right_count = count_for_us(self.right_us, freq_hz);

        Ok(())
    }
}

// ------------------------------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Convert a pulse width to a PWM count at the given frequency.
///
/// `count = round(us * freq * 4096 / 1e6)`, saturating at one full period.
pub fn count_for_us(us: u16, freq_hz: u16) -> u16 {
    let ticks = u64::from(us) * u64::from(freq_hz) * u64::from(PWM_PERIOD_TICKS);
    let count = (ticks + 500_000) / 1_000_000;

    u16::try_from(count.min(u64::from(PWM_PERIOD_TICKS))).unwrap_or(PWM_PERIOD_TICKS)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{sim::SimChip, PwmSlot, ALL_CHANNELS, DEFAULT_ADDRESS};

    fn new_servo(chip: &SimChip) -> Servo<crate::sim::SimBus, crate::sim::SimDelay> {
        let driver = Pca9685::new(chip.bus(), chip.delay(), DEFAULT_ADDRESS).unwrap();
        Servo::new(driver).unwrap()
    }

    #[test]
    fn test_count_for_us() {
        assert_eq!(count_for_us(1000, 50), 205);
        assert_eq!(count_for_us(SERVO_CENTER_DEFAULT_US, SERVO_DEFAULT_FREQUENCY), 307);
        assert_eq!(count_for_us(2000, 50), 410);
        assert_eq!(count_for_us(0, 50), 0);
        assert_eq!(count_for_us(u16::MAX, 1526), PWM_PERIOD_TICKS);
    }

    #[test]
    fn test_new() {
        let chip = SimChip::new(DEFAULT_ADDRESS);
        let mut servo = new_servo(&chip);

        assert_eq!(servo.left_us(), SERVO_LEFT_DEFAULT_US);
        assert_eq!(servo.right_us(), SERVO_RIGHT_DEFAULT_US);
        assert_eq!(servo.left_count(), 205);
        assert_eq!(servo.right_count(), 410);

        let driver = servo.driver_mut();
        assert_eq!(driver.frequency().unwrap(), SERVO_DEFAULT_FREQUENCY);
        assert!(!driver.invert().unwrap());
        assert!(driver.out_driver().unwrap());
    }

    #[test]
    fn test_set_angle() {
        let chip = SimChip::new(DEFAULT_ADDRESS);
        let mut servo = new_servo(&chip);

        servo.set_angle(0, 0).unwrap();
        assert_eq!(servo.driver_mut().read(0).unwrap(), PwmSlot { on: 0, off: 205 });

        servo.set_angle(0, 255).unwrap();
        assert_eq!(servo.driver_mut().read(0).unwrap(), PwmSlot { on: 0, off: 410 });

        // The middle angle lands on the centre pulse width
        servo.set_angle(0, 128).unwrap();
        let off = servo.driver_mut().read(0).unwrap().off;
        let center = count_for_us(SERVO_CENTER_DEFAULT_US, SERVO_DEFAULT_FREQUENCY);
        assert!((i32::from(off) - i32::from(center)).abs() <= 1);

        // Monotonic across the whole range
        let mut last = 0;
        for angle in 0..=u8::MAX {
            servo.set_angle(1, angle).unwrap();
            let off = servo.driver_mut().read(1).unwrap().off;
            assert!(off >= last);
            last = off;
        }
    }

    #[test]
    fn test_reversed_calibration() {
        let chip = SimChip::new(DEFAULT_ADDRESS);
        let mut servo = new_servo(&chip);

        servo.set_left_us(2000).unwrap();
        servo.set_right_us(1000).unwrap();
        assert_eq!(servo.left_count(), 410);
        assert_eq!(servo.right_count(), 205);

        servo.set_angle(ALL_CHANNELS, 0).unwrap();
        assert_eq!(servo.driver_mut().read(3).unwrap().off, 410);

        servo.set_angle(ALL_CHANNELS, 255).unwrap();
        assert_eq!(servo.driver_mut().read(3).unwrap().off, 205);
    }

    #[test]
    fn test_set_frequency_recalculates() {
        let chip = SimChip::new(DEFAULT_ADDRESS);
        let mut servo = new_servo(&chip);

        servo.set_frequency(100).unwrap();
        let freq = servo.driver_mut().frequency().unwrap();

        assert_eq!(servo.left_count(), count_for_us(SERVO_LEFT_DEFAULT_US, freq));
        assert_eq!(servo.right_count(), count_for_us(SERVO_RIGHT_DEFAULT_US, freq));
        assert!(servo.left_count() > 205);
    }

    #[test]
    fn test_raw_set() {
        let chip = SimChip::new(DEFAULT_ADDRESS);
        let mut servo = new_servo(&chip);

        servo.set(2, 300).unwrap();
        assert_eq!(servo.driver_mut().read(2).unwrap(), PwmSlot { on: 0, off: 300 });

        servo.set(2, 0).unwrap();
        assert!(servo.driver_mut().read(2).unwrap().is_full_off());

        servo.set_u8(2, MAX_8BIT).unwrap();
        assert!(servo.driver_mut().read(2).unwrap().is_full_on());

        servo.set_u8(2, 0x20).unwrap();
        assert_eq!(servo.driver_mut().read(2).unwrap(), PwmSlot { on: 0, off: 0x202 });
    }
}
