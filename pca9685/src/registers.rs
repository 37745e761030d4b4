//! # PCA9685 register map
//!
//! Register addresses and bit masks from the PCA9685 datasheet (section 7.3). All values are the
//! exact hardware positions and must not be changed.

// ------------------------------------------------------------------------------------------------
// REGISTER ADDRESSES
// ------------------------------------------------------------------------------------------------

/// Mode register 1
pub const MODE1: u8 = 0x00;

/// Mode register 2
pub const MODE2: u8 = 0x01;

/// LED All Call I2C-bus address
pub const ALLCALLADR: u8 = 0x05;

/// First byte of the channel 0 register block.
pub const LED0_ON_L: u8 = 0x06;

/// High byte of the channel 0 ON count.
pub const LED0_ON_H: u8 = 0x07;

/// Low byte of the channel 0 OFF count.
pub const LED0_OFF_L: u8 = 0x08;

/// High byte of the channel 0 OFF count.
pub const LED0_OFF_H: u8 = 0x09;

/// First byte of the broadcast ("all LEDs") register block.
pub const ALL_LED_ON_L: u8 = 0xFA;

/// High byte of the broadcast ON count.
pub const ALL_LED_ON_H: u8 = 0xFB;

/// Low byte of the broadcast OFF count.
pub const ALL_LED_OFF_L: u8 = 0xFC;

/// High byte of the broadcast OFF count.
pub const ALL_LED_OFF_H: u8 = 0xFD;

/// Prescaler for the PWM output frequency
pub const PRE_SCALE: u8 = 0xFE;

/// Number of bytes in a channel register block (ON_L, ON_H, OFF_L, OFF_H).
pub const LED_BLOCK_LEN: u8 = 4;

// ------------------------------------------------------------------------------------------------
// MODE1 BITS
// ------------------------------------------------------------------------------------------------

/// Respond to the LED All Call address.
pub const MODE1_ALLCALL: u8 = 1 << 0;

/// Respond to I2C-bus subaddress 3.
pub const MODE1_SUB3: u8 = 1 << 1;

/// Respond to I2C-bus subaddress 2.
pub const MODE1_SUB2: u8 = 1 << 2;

/// Respond to I2C-bus subaddress 1.
pub const MODE1_SUB1: u8 = 1 << 3;

/// Low power mode, oscillator off.
pub const MODE1_SLEEP: u8 = 1 << 4;

/// Register auto-increment.
pub const MODE1_AI: u8 = 1 << 5;

/// Use the EXTCLK pin clock.
pub const MODE1_EXTCLK: u8 = 1 << 6;

/// Restart pending. Writing a 1 clears it and resumes the PWM channels.
pub const MODE1_RESTART: u8 = 1 << 7;

// ------------------------------------------------------------------------------------------------
// MODE2 BITS
// ------------------------------------------------------------------------------------------------

/// Output enable behaviour (OUTNE, two bits).
pub const MODE2_OUTNE: u8 = 0b11;

/// Totem pole (1) or open-drain (0) output structure.
pub const MODE2_OUTDRV: u8 = 1 << 2;

/// Outputs change on ACK (1) or on STOP (0).
pub const MODE2_OCH: u8 = 1 << 3;

/// Invert output logic state.
pub const MODE2_INVRT: u8 = 1 << 4;

// ------------------------------------------------------------------------------------------------
// LEDn_ON_H / LEDn_OFF_H BITS
// ------------------------------------------------------------------------------------------------

/// Full on (in an ON_H byte) or full off (in an OFF_H byte).
pub const LED_FULL: u8 = 1 << 4;

/// The same bit seen in a 16 bit ON/OFF register image.
pub const LED_FULL_16: u16 = 1 << 12;

/// Bits of a 16 bit ON/OFF image which are backed by hardware (count + full bit).
pub const LED_IMAGE_MASK: u16 = 0x1FFF;

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Get the first register (ON_L) of the block for the given channel.
///
/// Any channel above 15 addresses the broadcast block.
pub fn led_base(channel: u8) -> u8 {
    if channel <= 15 {
        LED0_ON_L + channel * LED_BLOCK_LEN
    }
    else {
        ALL_LED_ON_L
    }
}
