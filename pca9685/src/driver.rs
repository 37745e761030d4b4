//! # Register driver
//!
//! [`Pca9685`] translates the chip's operations (frequency, mode bits, channel ON/OFF counts) into
//! register transactions on an `embedded-hal` I2C bus.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::{convert::TryFrom, fmt::Debug};

use embedded_hal::blocking::{
    delay::DelayUs,
    i2c::{Write, WriteRead},
};
use log::{debug, info, trace};

use crate::{
    dump::Dump,
    error::Error,
    registers::*,
};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Default I2C address of the PCA9685 (all address pins low).
pub const DEFAULT_ADDRESS: u8 = 0x40;

/// The LED All Call address, which every PCA9685 on the bus answers to at power-on.
pub const FIXED_ADDRESS: u8 = 0x70;

/// Number of PWM outputs on the chip.
pub const PWM_CHANNELS: u8 = 16;

/// Channel number which addresses the broadcast (all LEDs) register block.
pub const ALL_CHANNELS: u8 = 16;

/// Largest 12 bit count.
pub const MAX_12BIT: u16 = 0xFFF;

/// Largest 8 bit value.
pub const MAX_8BIT: u8 = 0xFF;

/// Number of ticks in one PWM period.
pub const PWM_PERIOD_TICKS: u16 = 4096;

/// OFF register image which forces a channel fully off.
pub const FULL_OFF: u16 = LED_FULL_16;

/// Lowest PWM frequency the prescaler can produce.
pub const FREQUENCY_MIN: u16 = 24;

/// Highest PWM frequency the prescaler can produce.
pub const FREQUENCY_MAX: u16 = 1526;

/// Smallest value the hardware accepts in PRE_SCALE.
pub const PRE_SCALE_MIN: u8 = 0x03;

/// Largest prescale value.
pub const PRE_SCALE_MAX: u8 = 0xFF;

/// Internal oscillator frequency.
pub const OSC_FREQ_HZ: u32 = 25_000_000;

/// Time the oscillator needs to stabilise after leaving sleep mode.
pub const WAKE_DELAY_US: u32 = 500;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A PCA9685 16 channel, 12 bit PWM controller.
///
/// The driver owns the bus and delay handles it was given. Only one driver should address a given
/// chip at a time, since every operation assumes it is the only writer of the registers.
pub struct Pca9685<I2C, D> {
    i2c: I2C,
    delay: D,
    address: u8,
}

/// The ON and OFF register images of one channel.
///
/// Bits 0-11 are the tick at which the output turns on/off, bit 12 is the full on (in `on`) or
/// full off (in `off`) override.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PwmSlot {
    pub on: u16,
    pub off: u16,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// When the outputs latch new ON/OFF values (MODE2 OCH bit).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputChange {
    /// Outputs change on the I2C STOP condition (power-on default).
    Stop,

    /// Outputs change on the ACK of the last byte of a channel block.
    Ack,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl PwmSlot {
    /// Whether the full on override is set.
    pub fn is_full_on(&self) -> bool {
        self.on & LED_FULL_16 != 0
    }

    /// Whether the full off override is set. Full off takes priority over full on.
    pub fn is_full_off(&self) -> bool {
        self.off & LED_FULL_16 != 0
    }
}

impl<I2C, D, E> Pca9685<I2C, D>
where
    I2C: Write<Error = E> + WriteRead<Error = E>,
    D: DelayUs<u32>,
    E: Debug,
{
    /// Create a new driver for the chip at `address`.
    ///
    /// Enables register auto-increment, forces every channel fully off and then wakes the
    /// oscillator, so a freshly constructed driver drives no output.
    pub fn new(i2c: I2C, delay: D, address: u8) -> Result<Self, Error<E>> {
        let mut dev = Self {
            i2c,
            delay,
            address,
        };

        dev.set_auto_increment(true)?;

        for channel in 0..PWM_CHANNELS {
            dev.write(channel, 0, FULL_OFF)?;
        }

        dev.set_sleep(false)?;

        info!("PCA9685 at {:#04x} initialised", address);

        Ok(dev)
    }

    /// The I2C address of the chip.
    pub fn address(&self) -> u8 {
        self.address
    }

    /// Destroy the driver, returning the bus and delay handles.
    pub fn release(self) -> (I2C, D) {
        (self.i2c, self.delay)
    }

    // ---- FREQUENCY ----

    /// Set the PRE_SCALE register.
    ///
    /// Values below [`PRE_SCALE_MIN`] are raised to it. The oscillator is put to sleep while the
    /// register is written, since the chip ignores PRE_SCALE writes while running.
    pub fn set_prescale(&mut self, prescale: u8) -> Result<(), Error<E>> {
        let prescale = prescale.max(PRE_SCALE_MIN);

        debug!("PCA9685 at {:#04x}: prescale = {:#04x}", self.address, prescale);

        self.set_sleep(true)?;
        self.write_reg(PRE_SCALE, prescale)?;
        self.set_sleep(false)
    }

    /// Read the PRE_SCALE register.
    pub fn prescale(&mut self) -> Result<u8, Error<E>> {
        self.read_reg(PRE_SCALE)
    }

    /// Set the PWM frequency in Hz, clamped to [`FREQUENCY_MIN`, `FREQUENCY_MAX`].
    pub fn set_frequency(&mut self, freq_hz: u16) -> Result<(), Error<E>> {
        self.set_prescale(prescale_for_frequency(freq_hz))
    }

    /// Get the PWM frequency in Hz represented by the current prescale.
    pub fn frequency(&mut self) -> Result<u16, Error<E>> {
        Ok(frequency_for_prescale(self.prescale()?))
    }

    // ---- MODE BITS ----

    /// Enter (`true`) or leave (`false`) low power mode.
    ///
    /// Leaving sleep always waits [`WAKE_DELAY_US`] for the oscillator, then restarts the PWM
    /// channels if the chip reports a pending restart.
    pub fn set_sleep(&mut self, sleep: bool) -> Result<(), Error<E>> {
        let mode1 = self.read_reg(MODE1)?;

        if sleep {
            // A 0 written to RESTART has no effect, so it is always masked out here
            self.write_reg(MODE1, (mode1 | MODE1_SLEEP) & !MODE1_RESTART)
        }
        else {
            self.write_reg(MODE1, mode1 & !(MODE1_SLEEP | MODE1_RESTART))?;
            self.delay.delay_us(WAKE_DELAY_US);

            if mode1 & MODE1_RESTART != 0 {
                trace!("PCA9685 at {:#04x}: restarting PWM channels", self.address);
                self.write_reg(MODE1, (mode1 & !MODE1_SLEEP) | MODE1_RESTART)?;
            }

            Ok(())
        }
    }

    /// Whether the oscillator is in low power mode.
    pub fn sleep(&mut self) -> Result<bool, Error<E>> {
        self.bit_is_set(MODE1, MODE1_SLEEP)
    }

    /// Enable or disable register auto-increment.
    ///
    /// The driver's 16 bit reads and channel writes rely on auto-increment, which is enabled on
    /// construction. Disabling it is only useful to callers talking to the chip byte by byte.
    pub fn set_auto_increment(&mut self, enabled: bool) -> Result<(), Error<E>> {
        self.update_bits(MODE1, MODE1_AI, enabled)
    }

    /// Whether register auto-increment is enabled.
    pub fn auto_increment(&mut self) -> Result<bool, Error<E>> {
        self.bit_is_set(MODE1, MODE1_AI)
    }

    /// Select when the outputs change.
    pub fn set_och(&mut self, och: OutputChange) -> Result<(), Error<E>> {
        self.update_bits(MODE2, MODE2_OCH, och == OutputChange::Ack)
    }

    /// Get when the outputs change.
    pub fn och(&mut self) -> Result<OutputChange, Error<E>> {
        match self.bit_is_set(MODE2, MODE2_OCH)? {
            true => Ok(OutputChange::Ack),
            false => Ok(OutputChange::Stop),
        }
    }

    /// Invert the output logic state.
    pub fn set_invert(&mut self, invert: bool) -> Result<(), Error<E>> {
        self.update_bits(MODE2, MODE2_INVRT, invert)
    }

    /// Whether the output logic state is inverted.
    pub fn invert(&mut self) -> Result<bool, Error<E>> {
        self.bit_is_set(MODE2, MODE2_INVRT)
    }

    /// Configure the outputs as totem pole (`true`) or open-drain (`false`).
    pub fn set_out_driver(&mut self, totem_pole: bool) -> Result<(), Error<E>> {
        self.update_bits(MODE2, MODE2_OUTDRV, totem_pole)
    }

    /// Whether the outputs are configured as totem pole.
    pub fn out_driver(&mut self) -> Result<bool, Error<E>> {
        self.bit_is_set(MODE2, MODE2_OUTDRV)
    }

    // ---- CHANNELS ----

    /// Write the ON and OFF register images of a channel.
    ///
    /// `channel` values above 15 address the broadcast block, which sets all channels at once.
    /// Counts are 0-4095 and bit 12 is the full on/off override. Values using any of bits 13-15
    /// (reserved on the chip) saturate to the override with the low 12 bits kept, so they never
    /// wrap to a smaller count.
    pub fn write(&mut self, channel: u8, on: u16, off: u16) -> Result<(), Error<E>> {
        let on = register_image(on).to_le_bytes();
        let off = register_image(off).to_le_bytes();

        self.write_bytes(&[led_base(channel), on[0], on[1], off[0], off[1]])
    }

    /// Write the OFF count of a channel with the ON count at tick 0.
    pub fn write_off(&mut self, channel: u8, off: u16) -> Result<(), Error<E>> {
        self.write(channel, 0, off)
    }

    /// Write the ON and OFF register images of all channels.
    pub fn write_all(&mut self, on: u16, off: u16) -> Result<(), Error<E>> {
        self.write(ALL_CHANNELS, on, off)
    }

    /// Write the OFF count of all channels with the ON count at tick 0.
    pub fn write_all_off(&mut self, off: u16) -> Result<(), Error<E>> {
        self.write(ALL_CHANNELS, 0, off)
    }

    /// Read back the ON and OFF register images of a channel (or the broadcast block).
    pub fn read(&mut self, channel: u8) -> Result<PwmSlot, Error<E>> {
        let base = led_base(channel);

        Ok(PwmSlot {
            on: self.read_reg16(base)?,
            off: self.read_reg16(base + 2)?,
        })
    }

    /// Read back the broadcast block.
    pub fn read_all(&mut self) -> Result<PwmSlot, Error<E>> {
        self.read(ALL_CHANNELS)
    }

    /// Set or clear the full on override of a channel, leaving the ON count untouched.
    ///
    /// Setting full on also clears full off, since full off would otherwise win.
    pub fn set_full_on(&mut self, channel: u8, enabled: bool) -> Result<(), Error<E>> {
        self.update_bits(led_base(channel) + 1, LED_FULL, enabled)?;

        if enabled {
            self.set_full_off(channel, false)?;
        }

        Ok(())
    }

    /// Set or clear the full off override of a channel, leaving the OFF count untouched.
    pub fn set_full_off(&mut self, channel: u8, enabled: bool) -> Result<(), Error<E>> {
        self.update_bits(led_base(channel) + 3, LED_FULL, enabled)
    }

    // ---- DIAGNOSTICS ----

    /// Read every mode bit, the prescale and all channel registers into a [`Dump`].
    ///
    /// This only reads from the chip.
    pub fn dump(&mut self) -> Result<Dump, Error<E>> {
        let mode1 = self.read_reg(MODE1)?;
        let mode2 = self.read_reg(MODE2)?;
        let prescale = self.read_reg(PRE_SCALE)?;

        let mut channels = [PwmSlot::default(); PWM_CHANNELS as usize];
        for (channel, slot) in (0..PWM_CHANNELS).zip(channels.iter_mut()) {
            *slot = self.read(channel)?;
        }

        Ok(Dump {
            mode1,
            mode2,
            prescale,
            frequency_hz: frequency_for_prescale(prescale),
            channels,
            all: self.read_all()?,
        })
    }

    // ---- REGISTER ACCESS ----

    fn update_bits(&mut self, reg: u8, mask: u8, set: bool) -> Result<(), Error<E>> {
        let mut data = self.read_reg(reg)? & !mask;

        // Writing back a pending RESTART would clear it, only set_sleep may do that
        if reg == MODE1 {
            data &= !MODE1_RESTART;
        }

        if set {
            data |= mask;
        }

        self.write_reg(reg, data)
    }

    fn bit_is_set(&mut self, reg: u8, mask: u8) -> Result<bool, Error<E>> {
        Ok(self.read_reg(reg)? & mask == mask)
    }

    fn write_reg(&mut self, reg: u8, data: u8) -> Result<(), Error<E>> {
        self.write_bytes(&[reg, data])
    }

    fn read_reg(&mut self, reg: u8) -> Result<u8, Error<E>> {
        let mut buf = [0u8; 1];
        self.read_bytes(reg, &mut buf)?;
        Ok(buf[0])
    }

    fn read_reg16(&mut self, reg: u8) -> Result<u16, Error<E>> {
        let mut buf = [0u8; 2];
        self.read_bytes(reg, &mut buf)?;
        Ok(u16::from_le_bytes(buf))
    }

    fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), Error<E>> {
        trace!("PCA9685 at {:#04x}: write {:02x?}", self.address, bytes);

        self.i2c.write(self.address, bytes).map_err(Error::I2c)
    }

    fn read_bytes(&mut self, reg: u8, buf: &mut [u8]) -> Result<(), Error<E>> {
        self.i2c
            .write_read(self.address, &[reg], buf)
            .map_err(Error::I2c)?;

        trace!("PCA9685 at {:#04x}: read {:#04x} -> {:02x?}", self.address, reg, buf);

        Ok(())
    }
}

// ------------------------------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Calculate the prescale for a frequency in Hz.
///
/// `prescale = ceil(osc / 4096 / freq) - 1`, with `freq` clamped to [`FREQUENCY_MIN`,
/// `FREQUENCY_MAX`] first.
pub fn prescale_for_frequency(freq_hz: u16) -> u8 {
    let freq_hz = u32::from(freq_hz.clamp(FREQUENCY_MIN, FREQUENCY_MAX));

    let divisor = div_round_up(OSC_FREQ_HZ, u32::from(PWM_PERIOD_TICKS) * freq_hz);

    u8::try_from(divisor - 1).unwrap_or(PRE_SCALE_MAX)
}

/// Calculate a representative frequency in Hz for a prescale.
///
/// Many frequencies share one prescale, so this walks outwards from the nominal frequency until
/// the prescale changes on each side and returns the middle of that span.
pub fn frequency_for_prescale(prescale: u8) -> u16 {
    let nominal = div_round_up(
        OSC_FREQ_HZ,
        u32::from(PWM_PERIOD_TICKS) * (u32::from(prescale) + 1),
    );
    let nominal = u16::try_from(nominal).unwrap_or(u16::MAX);

    let mut f_min = nominal;
    while f_min > FREQUENCY_MIN && prescale_for_frequency(f_min) == prescale {
        f_min -= 1;
    }

    let mut f_max = nominal;
    while f_max < FREQUENCY_MAX && prescale_for_frequency(f_max) == prescale {
        f_max += 1;
    }

    ((u32::from(f_min) + u32::from(f_max)) / 2) as u16
}

// ------------------------------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ------------------------------------------------------------------------------------------------

fn div_round_up(n: u32, d: u32) -> u32 {
    (n + d - 1) / d
}

/// Clip an ON/OFF value to the 13 bits the chip stores.
fn register_image(value: u16) -> u16 {
    if value > LED_IMAGE_MASK {
        LED_FULL_16 | (value & MAX_12BIT)
    }
    else {
        value
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use crate::sim::{Frame, SimChip};

    fn new_dev(chip: &SimChip) -> Pca9685<crate::sim::SimBus, crate::sim::SimDelay> {
        Pca9685::new(chip.bus(), chip.delay(), DEFAULT_ADDRESS).unwrap()
    }

    #[test]
    fn test_prescale_for_frequency() {
        assert_eq!(prescale_for_frequency(50), 122);
        assert_eq!(prescale_for_frequency(200), 30);
        assert_eq!(prescale_for_frequency(FREQUENCY_MIN), 254);
        assert_eq!(prescale_for_frequency(FREQUENCY_MAX), PRE_SCALE_MIN);

        // Out of range frequencies are clamped, not rejected
        assert_eq!(prescale_for_frequency(0), prescale_for_frequency(FREQUENCY_MIN));
        assert_eq!(prescale_for_frequency(10_000), prescale_for_frequency(FREQUENCY_MAX));
    }

    #[test]
    fn test_frequency_for_prescale() {
        assert_eq!(frequency_for_prescale(122), 50);
        assert_eq!(frequency_for_prescale(254), 24);
        assert_eq!(frequency_for_prescale(PRE_SCALE_MIN), 1525);
    }

    #[test]
    fn test_frequency_round_trip() {
        for f in FREQUENCY_MIN..=FREQUENCY_MAX {
            let prescale = prescale_for_frequency(f);
            let back = frequency_for_prescale(prescale);

            // The reported frequency lands in the same prescale bucket, except at the top of the
            // range where the span is cut off by FREQUENCY_MAX
            if f < FREQUENCY_MAX {
                assert_eq!(prescale_for_frequency(back), prescale, "f = {}", f);
            }

            // Below ~110 Hz the buckets are at most two integers wide
            if f <= 110 {
                assert!((i32::from(back) - i32::from(f)).abs() <= 1, "f = {}, got {}", f, back);
            }
        }
    }

    #[test]
    fn test_new_leaves_channels_off() {
        let chip = SimChip::new(DEFAULT_ADDRESS);
        let mut dev = new_dev(&chip);

        for channel in 0..PWM_CHANNELS {
            assert_eq!(dev.read(channel).unwrap(), PwmSlot { on: 0, off: FULL_OFF });
        }

        assert!(!dev.sleep().unwrap());
        assert!(dev.auto_increment().unwrap());
        assert!(chip.total_delay_us() >= u64::from(WAKE_DELAY_US));
    }

    #[test]
    fn test_frame_shapes() {
        let chip = SimChip::new(DEFAULT_ADDRESS);
        let mut dev = new_dev(&chip);

        dev.set_frequency(60).unwrap();
        dev.write(3, 0x123, 0x456).unwrap();
        dev.set_full_on(3, true).unwrap();
        dev.read(3).unwrap();

        for frame in chip.frames() {
            match frame {
                Frame::Write(bytes) => assert!(bytes.len() == 2 || bytes.len() == 5),
                Frame::WriteRead { out, .. } => assert_eq!(out.len(), 1),
            }
        }

        chip.clear_frames();
        dev.write(3, 0x123, 0x456).unwrap();
        assert_eq!(
            chip.frames(),
            vec![Frame::Write(vec![0x12, 0x23, 0x01, 0x56, 0x04])]
        );
    }

    #[test]
    fn test_set_frequency() {
        let chip = SimChip::new(DEFAULT_ADDRESS);
        let mut dev = new_dev(&chip);

        dev.set_frequency(50).unwrap();
        assert_eq!(dev.prescale().unwrap(), 122);
        assert_eq!(dev.frequency().unwrap(), 50);

        // The chip must be awake again afterwards
        assert!(!dev.sleep().unwrap());
    }

    #[test]
    fn test_set_prescale_clamps_and_waits() {
        let chip = SimChip::new(DEFAULT_ADDRESS);
        let mut dev = new_dev(&chip);

        let before = chip.total_delay_us();
        dev.set_prescale(0).unwrap();

        assert_eq!(dev.prescale().unwrap(), PRE_SCALE_MIN);
        assert!(chip.total_delay_us() - before >= u64::from(WAKE_DELAY_US));

        // Sleeping with the oscillator running leaves a restart pending, which waking clears
        assert_eq!(chip.register(MODE1) & MODE1_RESTART, 0);
    }

    #[test]
    fn test_mode_bits_preserve_each_other() {
        let chip = SimChip::new(DEFAULT_ADDRESS);
        let mut dev = new_dev(&chip);

        for &och in &[OutputChange::Stop, OutputChange::Ack] {
            for &invert in &[false, true] {
                dev.set_och(och).unwrap();
                dev.set_invert(invert).unwrap();
                assert_eq!(dev.och().unwrap(), och);
                assert_eq!(dev.invert().unwrap(), invert);

                dev.set_invert(!invert).unwrap();
                assert_eq!(dev.och().unwrap(), och);

                dev.set_och(OutputChange::Ack).unwrap();
                dev.set_och(och).unwrap();
                assert_eq!(dev.invert().unwrap(), !invert);
            }
        }

        // Power-on default totem pole output survives the toggling
        assert!(dev.out_driver().unwrap());
        dev.set_out_driver(false).unwrap();
        assert!(!dev.out_driver().unwrap());
        assert_eq!(dev.och().unwrap(), OutputChange::Ack);
        assert!(!dev.invert().unwrap());
    }

    #[test]
    fn test_mode1_setters_preserve_other_bits() {
        let chip = SimChip::new(DEFAULT_ADDRESS);
        let mut dev = new_dev(&chip);

        let before = chip.register(MODE1);
        assert_ne!(before & MODE1_ALLCALL, 0);

        dev.set_auto_increment(false).unwrap();
        assert_eq!(chip.register(MODE1), before & !MODE1_AI);

        dev.set_auto_increment(true).unwrap();
        dev.set_sleep(true).unwrap();
        assert!(dev.sleep().unwrap());
        assert_eq!(chip.register(MODE1) & !MODE1_RESTART, before | MODE1_SLEEP);

        dev.set_sleep(false).unwrap();
        assert_eq!(chip.register(MODE1), before);
    }

    #[test]
    fn test_mode1_update_keeps_pending_restart() {
        let chip = SimChip::new(DEFAULT_ADDRESS);
        let mut dev = new_dev(&chip);

        dev.set_sleep(true).unwrap();
        assert_ne!(chip.register(MODE1) & MODE1_RESTART, 0);

        chip.clear_frames();
        dev.set_auto_increment(true).unwrap();

        // The byte written back must not carry RESTART while the chip sleeps
        let written: Vec<_> = chip
            .frames()
            .into_iter()
            .filter_map(|f| match f {
                Frame::Write(bytes) => Some(bytes),
                _ => None,
            })
            .collect();
        assert_eq!(written.len(), 1);
        assert_eq!(written[0][0], MODE1);
        assert_eq!(written[0][1] & MODE1_RESTART, 0);
        assert_ne!(written[0][1] & MODE1_SLEEP, 0);

        assert_ne!(chip.register(MODE1) & MODE1_RESTART, 0);

        // Waking still restarts the channels
        dev.set_sleep(false).unwrap();
        assert_eq!(chip.register(MODE1) & (MODE1_RESTART | MODE1_SLEEP), 0);
    }

    #[test]
    fn test_full_on_clears_full_off() {
        let chip = SimChip::new(DEFAULT_ADDRESS);
        let mut dev = new_dev(&chip);

        for channel in 0..=ALL_CHANNELS {
            dev.write(channel, 0x0AB, 0x0CD).unwrap();
            dev.set_full_off(channel, true).unwrap();
            dev.set_full_on(channel, true).unwrap();

            let slot = dev.read(channel).unwrap();
            assert!(slot.is_full_on(), "channel {}", channel);
            assert!(!slot.is_full_off(), "channel {}", channel);

            // The counts are untouched by the overrides
            assert_eq!(slot.on & MAX_12BIT, 0x0AB);
            assert_eq!(slot.off & MAX_12BIT, 0x0CD);

            dev.set_full_on(channel, false).unwrap();
            assert_eq!(dev.read(channel).unwrap(), PwmSlot { on: 0x0AB, off: 0x0CD });
        }
    }

    #[test]
    fn test_broadcast_channels() {
        let chip = SimChip::new(DEFAULT_ADDRESS);
        let mut dev = new_dev(&chip);

        dev.write_all_off(0x800).unwrap();
        assert_eq!(dev.read_all().unwrap(), PwmSlot { on: 0, off: 0x800 });
        for channel in 0..PWM_CHANNELS {
            assert_eq!(dev.read(channel).unwrap(), PwmSlot { on: 0, off: 0x800 });
        }

        // Anything above 15 is the broadcast block too
        dev.write(200, 0x10, 0x20).unwrap();
        assert_eq!(dev.read(ALL_CHANNELS).unwrap(), PwmSlot { on: 0x10, off: 0x20 });
        assert_eq!(dev.read(7).unwrap(), PwmSlot { on: 0x10, off: 0x20 });

        dev.write_off(5, 0x300).unwrap();
        assert_eq!(dev.read(5).unwrap(), PwmSlot { on: 0, off: 0x300 });
        assert_eq!(dev.read(6).unwrap(), PwmSlot { on: 0x10, off: 0x20 });
    }

    #[test]
    fn test_write_saturates_reserved_bits() {
        let chip = SimChip::new(DEFAULT_ADDRESS);
        let mut dev = new_dev(&chip);

        dev.write(0, 0xF000, 0xFFFF).unwrap();
        assert_eq!(dev.read(0).unwrap(), PwmSlot { on: 0x1000, off: 0x1FFF });

        // Bit 12 clear but a reserved bit set must not wrap down to 0x800
        dev.write(0, 0, 0x2800).unwrap();
        let slot = dev.read(0).unwrap();
        assert_eq!(slot, PwmSlot { on: 0, off: 0x1800 });
        assert!(slot.is_full_off());

        dev.write(1, 0x4123, 0x0456).unwrap();
        let slot = dev.read(1).unwrap();
        assert!(slot.is_full_on());
        assert_eq!(slot, PwmSlot { on: 0x1123, off: 0x0456 });

        // In range images are written unchanged
        dev.write(2, 0x1000, 0x0FFF).unwrap();
        assert_eq!(dev.read(2).unwrap(), PwmSlot { on: 0x1000, off: 0x0FFF });
    }

    #[test]
    fn test_bus_errors_propagate() {
        let chip = SimChip::new(DEFAULT_ADDRESS);

        // Nothing answers at the wrong address
        assert!(matches!(
            Pca9685::new(chip.bus(), chip.delay(), 0x41),
            Err(Error::I2c(_))
        ));

        let mut dev = new_dev(&chip);
        chip.set_absent(true);
        assert!(matches!(dev.write(0, 0, 100), Err(Error::I2c(_))));
        assert!(matches!(dev.frequency(), Err(Error::I2c(_))));

        chip.set_absent(false);
        assert!(dev.frequency().is_ok());
    }

    #[test]
    fn test_release() {
        let chip = SimChip::new(FIXED_ADDRESS);
        let dev = Pca9685::new(chip.bus(), chip.delay(), FIXED_ADDRESS).unwrap();
        assert_eq!(dev.address(), FIXED_ADDRESS);

        let (bus, delay) = dev.release();
        assert!(Pca9685::new(bus, delay, FIXED_ADDRESS).is_ok());
    }
}
