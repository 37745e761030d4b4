//! # Demonstration loops
//!
//! Blinks an LED or sweeps a servo on one channel of the board, on whatever bus the caller opened.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::{fmt::Debug, thread, time::Duration};

use color_eyre::{eyre::WrapErr, Result};
use embedded_hal::blocking::{
    delay::DelayUs,
    i2c::{Write, WriteRead},
};
use log::{debug, info};
use pca9685::{Pca9685, PwmLed, Servo, FULL_OFF, MAX_12BIT};

use crate::params::{DemoMode, PwmExecParams};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Angles visited by one servo sweep cycle.
const SWEEP_ANGLES: [u8; 4] = [0, 128, 255, 128];

// ------------------------------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Initialise the board and run the demo selected in the parameters.
///
/// If `dump` is set the register dump is logged once the board is configured. When a finite
/// number of cycles is requested every output is switched off at the end.
pub fn run<I2C, D, E>(params: &PwmExecParams, i2c: I2C, delay: D, dump: bool) -> Result<()>
where
    I2C: Write<Error = E> + WriteRead<Error = E>,
    D: DelayUs<u32>,
    E: Debug + Send + Sync + 'static,
{
    let driver = Pca9685::new(i2c, delay, params.i2c_address)
        .wrap_err("Failed to initialise the PCA9685")?;

    let mut driver = match params.mode {
        DemoMode::Led => blink(params, driver, dump)?,
        DemoMode::Servo => sweep(params, driver, dump)?,
    };

    driver
        .write_all_off(FULL_OFF)
        .wrap_err("Failed to switch the outputs off")?;
    info!("All outputs off");

    Ok(())
}

// ------------------------------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ------------------------------------------------------------------------------------------------

fn blink<I2C, D, E>(
    params: &PwmExecParams,
    driver: Pca9685<I2C, D>,
    dump: bool,
) -> Result<Pca9685<I2C, D>>
where
    I2C: Write<Error = E> + WriteRead<Error = E>,
    D: DelayUs<u32>,
    E: Debug + Send + Sync + 'static,
{
    let mut led = PwmLed::new(driver).wrap_err("Failed to configure the board for LEDs")?;

    configure(led.driver_mut(), params.frequency_hz, dump)?;

    info!("Blinking channel {}", params.channel);

    let mut cycle = 0;
    while params.cycles.map_or(true, |n| cycle < n) {
        led.set(params.channel, MAX_12BIT)
            .wrap_err("Failed to turn the LED on")?;
        info!("LED turned on >>>");
        wait(params);

        led.set(params.channel, 0)
            .wrap_err("Failed to turn the LED off")?;
        info!("LED turned off <<<");
        wait(params);

        cycle += 1;
    }

    Ok(led.into_inner())
}

fn sweep<I2C, D, E>(
    params: &PwmExecParams,
    driver: Pca9685<I2C, D>,
    dump: bool,
) -> Result<Pca9685<I2C, D>>
where
    I2C: Write<Error = E> + WriteRead<Error = E>,
    D: DelayUs<u32>,
    E: Debug + Send + Sync + 'static,
{
    let mut servo = Servo::new(driver).wrap_err("Failed to configure the board for servos")?;

    if let Some(freq_hz) = params.frequency_hz {
        servo
            .set_frequency(freq_hz)
            .wrap_err("Failed to set the PWM frequency")?;
    }
    servo
        .set_left_us(params.servo.left_us)
        .wrap_err("Failed to set the left pulse width")?;
    servo
        .set_right_us(params.servo.right_us)
        .wrap_err("Failed to set the right pulse width")?;

    // Frequency already applied through the servo so the counts follow it
    configure(servo.driver_mut(), None, dump)?;

    info!(
        "Sweeping channel {} between {} us ({} counts) and {} us ({} counts)",
        params.channel,
        servo.left_us(),
        servo.left_count(),
        servo.right_us(),
        servo.right_count()
    );

    let mut cycle = 0;
    while params.cycles.map_or(true, |n| cycle < n) {
        for &angle in SWEEP_ANGLES.iter() {
            servo
                .set_angle(params.channel, angle)
                .wrap_err("Failed to set the servo angle")?;
            debug!("Servo angle {}", angle);
            wait(params);
        }

        cycle += 1;
    }

    Ok(servo.into_inner())
}

/// Apply a frequency override and log the register dump if requested.
fn configure<I2C, D, E>(
    driver: &mut Pca9685<I2C, D>,
    freq_hz: Option<u16>,
    dump: bool,
) -> Result<()>
where
    I2C: Write<Error = E> + WriteRead<Error = E>,
    D: DelayUs<u32>,
    E: Debug + Send + Sync + 'static,
{
    if let Some(freq_hz) = freq_hz {
        driver
            .set_frequency(freq_hz)
            .wrap_err("Failed to set the PWM frequency")?;
    }

    info!(
        "PWM frequency: {} Hz",
        driver.frequency().wrap_err("Failed to read the PWM frequency")?
    );

    if dump {
        let dump = driver.dump().wrap_err("Failed to dump the registers")?;
        info!("Register dump:\n{}", dump);
    }

    Ok(())
}

fn wait(params: &PwmExecParams) {
    thread::sleep(Duration::from_millis(params.period_ms));
}
