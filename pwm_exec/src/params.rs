//! # PWM Executable Parameters

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use pca9685::{
    servo::{SERVO_LEFT_DEFAULT_US, SERVO_RIGHT_DEFAULT_US},
    DEFAULT_ADDRESS,
};
use serde::Deserialize;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

#[derive(Deserialize, Debug)]
pub struct PwmExecParams {

    /// Number of the I2C bus the board is on (`/dev/i2c-N`)
    #[serde(default = "default_i2c_bus")]
    pub i2c_bus: u8,

    /// 7 bit I2C address of the PCA9685
    #[serde(default = "default_i2c_address")]
    pub i2c_address: u8,

    /// What to drive from the board
    pub mode: DemoMode,

    /// PWM frequency override, if not set the adapter's default frequency is used
    pub frequency_hz: Option<u16>,

    /// Channel to blink or sweep, 16 drives every channel
    pub channel: u8,

    /// Time between steps of the demo
    pub period_ms: u64,

    /// Number of demo cycles to run, runs forever if not set
    pub cycles: Option<u32>,

    /// Servo pulse width calibration
    #[serde(default)]
    pub servo: ServoParams,
}

#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServoParams {
    /// Pulse width for angle 0
    pub left_us: u16,

    /// Pulse width for angle 255
    pub right_us: u16,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DemoMode {
    /// Blink an LED fully on and off
    Led,

    /// Sweep a servo between its left and right pulse widths
    Servo,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Default for ServoParams {
    fn default() -> Self {
        Self {
            left_us: SERVO_LEFT_DEFAULT_US,
            right_us: SERVO_RIGHT_DEFAULT_US,
        }
    }
}

// ------------------------------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ------------------------------------------------------------------------------------------------

fn default_i2c_bus() -> u8 {
    1
}

fn default_i2c_address() -> u8 {
    DEFAULT_ADDRESS
}
