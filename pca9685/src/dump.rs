//! Human readable register dump.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::fmt;

use crate::{driver::PwmSlot, registers::*};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A snapshot of the chip's registers, produced by [`crate::Pca9685::dump`].
///
/// The `Display` implementation describes every mode bit in the datasheet's terms.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dump {
    pub mode1: u8,
    pub mode2: u8,
    pub prescale: u8,

    /// Representative frequency for `prescale`.
    pub frequency_hz: u16,

    pub channels: [PwmSlot; 16],

    /// The broadcast block.
    pub all: PwmSlot,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl fmt::Display for Dump {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let m1 = self.mode1;
        let responds = |mask: u8| if m1 & mask != 0 { "responds" } else { "does not respond" };

        writeln!(f, "MODE1 - Mode register 1 (address 00h) : {:02X}h", m1)?;
        writeln!(
            f,
            "\tbit 7 - RESTART : Restart {}",
            enabled(m1 & MODE1_RESTART != 0)
        )?;
        writeln!(
            f,
            "\tbit 6 - EXTCLK  : {}",
            if m1 & MODE1_EXTCLK != 0 { "Use EXTCLK pin clock" } else { "Use internal clock" }
        )?;
        writeln!(
            f,
            "\tbit 5 - AI      : Register Auto-Increment {}",
            enabled(m1 & MODE1_AI != 0)
        )?;
        writeln!(
            f,
            "\tbit 4 - SLEEP   : {}",
            if m1 & MODE1_SLEEP != 0 { "Low power mode. Oscillator off" } else { "Normal mode" }
        )?;
        writeln!(f, "\tbit 3 - SUB1    : {} to I2C-bus subaddress 1", responds(MODE1_SUB1))?;
        writeln!(f, "\tbit 2 - SUB2    : {} to I2C-bus subaddress 2", responds(MODE1_SUB2))?;
        writeln!(f, "\tbit 1 - SUB3    : {} to I2C-bus subaddress 3", responds(MODE1_SUB3))?;
        writeln!(
            f,
            "\tbit 0 - ALLCALL : {} to LED All Call I2C-bus address",
            responds(MODE1_ALLCALL)
        )?;

        let m2 = self.mode2;

        writeln!(f)?;
        writeln!(f, "MODE2 - Mode register 2 (address 01h) : {:02X}h", m2)?;
        writeln!(f, "\tbit 7 to 5      : Reserved")?;
        writeln!(
            f,
            "\tbit 4 - INVRT   : Output logic state {}inverted",
            if m2 & MODE2_INVRT != 0 { "" } else { "not " }
        )?;
        writeln!(
            f,
            "\tbit 3 - OCH     : Outputs change on {}",
            if m2 & MODE2_OCH != 0 { "ACK" } else { "STOP command" }
        )?;
        writeln!(
            f,
            "\tbit 2 - OUTDRV  : Outputs are configured with {} structure",
            if m2 & MODE2_OUTDRV != 0 { "a totem pole" } else { "an open-drain" }
        )?;
        writeln!(f, "\tbit 1-0 - OUTNE : {:01x}", m2 & MODE2_OUTNE)?;

        writeln!(f)?;
        writeln!(f, "PRE_SCALE register (address FEh) : {:02X}h", self.prescale)?;
        writeln!(f, "\tFrequency : {} Hz", self.frequency_hz)?;
        writeln!(f)?;

        for (channel, slot) in self.channels.iter().enumerate() {
            writeln!(f, "LED{}_ON  : {:04x}", channel, slot.on)?;
            writeln!(f, "LED{}_OFF : {:04x}", channel, slot.off)?;
        }

        writeln!(f)?;
        writeln!(f, "ALL_LED_ON  : {:04x}", self.all.on)?;
        write!(f, "ALL_LED_OFF : {:04x}", self.all.off)
    }
}

// ------------------------------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ------------------------------------------------------------------------------------------------

fn enabled(bit: bool) -> &'static str {
    if bit {
        "enabled"
    }
    else {
        "disabled"
    }
}

#[cfg(test)]
mod test {
    use crate::{sim::SimChip, Pca9685, DEFAULT_ADDRESS, FULL_OFF};

    #[test]
    fn test_dump() {
        let chip = SimChip::new(DEFAULT_ADDRESS);
        let mut dev = Pca9685::new(chip.bus(), chip.delay(), DEFAULT_ADDRESS).unwrap();
        dev.set_frequency(50).unwrap();
        dev.write(2, 0, 0x0123).unwrap();

        let frames_before = chip.frames().iter().filter(|f| f.is_write()).count();
        let dump = dev.dump().unwrap();
        let frames_after = chip.frames().iter().filter(|f| f.is_write()).count();

        // Dumping never writes to the chip
        assert_eq!(frames_before, frames_after);

        assert_eq!(dump.prescale, 122);
        assert_eq!(dump.frequency_hz, 50);
        assert_eq!(dump.channels[0].off, FULL_OFF);
        assert_eq!(dump.channels[2].off, 0x0123);

        let text = dump.to_string();
        assert!(text.contains("MODE1 - Mode register 1 (address 00h) : 21h"));
        assert!(text.contains("bit 4 - SLEEP   : Normal mode"));
        assert!(text.contains("bit 2 - OUTDRV  : Outputs are configured with a totem pole"));
        assert!(text.contains("PRE_SCALE register (address FEh) : 7Ah"));
        assert!(text.contains("Frequency : 50 Hz"));
        assert!(text.contains("LED2_OFF : 0123"));
        assert!(text.contains("LED15_OFF : 1000"));
    }
}
