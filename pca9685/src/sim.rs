//! # Simulated PCA9685
//!
//! A software model of the chip's register file which implements the same `embedded-hal` traits as
//! a real I2C bus. It is used by the test suites and by executables running on hosts without an
//! I2C bus.
//!
//! The model covers the parts of the datasheet the driver depends on:
//! - power-on register defaults,
//! - the register pointer and auto-increment,
//! - PRE_SCALE writes being ignored unless the oscillator is asleep,
//! - the RESTART bit (set by sleeping a running oscillator, cleared by writing a 1),
//! - broadcast writes being copied into every channel.
//!
//! Unlike the real chip the broadcast registers read back what was last written to them.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::{
    collections::VecDeque,
    sync::{Arc, Mutex, MutexGuard},
};

use embedded_hal::blocking::{
    delay::DelayUs,
    i2c::{Write, WriteRead},
};
use log::trace;

use crate::registers::*;

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Number of most recent transactions kept by a [`SimChip`].
pub const FRAME_LOG_LEN: usize = 4096;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A simulated chip. Cloning gives another handle to the same registers.
#[derive(Clone)]
pub struct SimChip {
    state: Arc<Mutex<SimState>>,
}

/// The I2C bus side of a [`SimChip`].
#[derive(Clone)]
pub struct SimBus {
    state: Arc<Mutex<SimState>>,
}

/// A delay which records the requested time instead of sleeping.
#[derive(Clone)]
pub struct SimDelay {
    state: Arc<Mutex<SimState>>,
}

struct SimState {
    address: u8,
    regs: [u8; 256],
    pointer: u8,
    absent: bool,
    frames: VecDeque<Frame>,
    frame_count: u64,
    delay_us: u64,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// One bus transaction seen by the simulator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// Plain write of the given bytes.
    Write(Vec<u8>),

    /// Write of `out` followed by a read of `len` bytes.
    WriteRead { out: Vec<u8>, len: usize },
}

/// Errors raised by the simulated bus.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimError {
    #[error("No device acknowledged address {0:#04x}")]
    Nack(u8),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl SimChip {
    /// Create a chip at the given address with power-on register values.
    pub fn new(address: u8) -> Self {
        let mut regs = [0u8; 256];
        regs[MODE1 as usize] = MODE1_SLEEP | MODE1_ALLCALL;
        regs[MODE2 as usize] = MODE2_OUTDRV;
        regs[ALLCALLADR as usize] = 0xE0;
        regs[PRE_SCALE as usize] = 0x1E;

        for channel in 0..16u8 {
            regs[(led_base(channel) + 3) as usize] = LED_FULL;
        }
        regs[ALL_LED_OFF_H as usize] = LED_FULL;

        Self {
            state: Arc::new(Mutex::new(SimState {
                address,
                regs,
                pointer: 0,
                absent: false,
                frames: VecDeque::with_capacity(FRAME_LOG_LEN),
                frame_count: 0,
                delay_us: 0,
            })),
        }
    }

    /// Get a bus handle connected to this chip.
    pub fn bus(&self) -> SimBus {
        SimBus {
            state: self.state.clone(),
        }
    }

    /// Get a delay handle which records into this chip.
    pub fn delay(&self) -> SimDelay {
        SimDelay {
            state: self.state.clone(),
        }
    }

    /// Read a register directly, bypassing the bus.
    pub fn register(&self, reg: u8) -> u8 {
        lock(&self.state).regs[reg as usize]
    }

    /// Make every following transaction fail as if the chip were unplugged.
    pub fn set_absent(&self, absent: bool) {
        lock(&self.state).absent = absent;
    }

    /// The last [`FRAME_LOG_LEN`] transactions, oldest first.
    pub fn frames(&self) -> Vec<Frame> {
        lock(&self.state).frames.iter().cloned().collect()
    }

    /// Number of transactions seen since the chip was created, including those dropped from the
    /// log.
    pub fn frame_count(&self) -> u64 {
        lock(&self.state).frame_count
    }

    /// Forget all recorded transactions.
    pub fn clear_frames(&self) {
        lock(&self.state).frames.clear();
    }

    /// Total time requested from the [`SimDelay`] handles.
    pub fn total_delay_us(&self) -> u64 {
        lock(&self.state).delay_us
    }
}

impl Frame {
    /// Whether this frame was a plain write.
    pub fn is_write(&self) -> bool {
        matches!(self, Frame::Write(_))
    }
}

impl SimState {
    fn record(&mut self, frame: Frame) {
        if self.frames.len() == FRAME_LOG_LEN {
            self.frames.pop_front();
        }
        self.frames.push_back(frame);
        self.frame_count += 1;
    }

    fn check_address(&self, address: u8) -> Result<(), SimError> {
        if self.absent || address != self.address {
            Err(SimError::Nack(address))
        }
        else {
            Ok(())
        }
    }

    /// Handle the bytes of a write: the first sets the pointer, the rest are data.
    fn write(&mut self, bytes: &[u8]) {
        let (pointer, data) = match bytes.split_first() {
            Some(s) => s,
            None => return,
        };

        self.pointer = *pointer;

        for &byte in data {
            self.store(self.pointer, byte);
            self.advance();
        }
    }

    fn read(&mut self, buffer: &mut [u8]) {
        for byte in buffer.iter_mut() {
            *byte = self.regs[self.pointer as usize];
            self.advance();
        }
    }

    fn advance(&mut self) {
        if self.regs[MODE1 as usize] & MODE1_AI != 0 {
            self.pointer = self.pointer.wrapping_add(1);
        }
    }

    fn store(&mut self, reg: u8, value: u8) {
        trace!("sim: {:#04x} = {:#04x}", reg, value);

        match reg {
            MODE1 => {
                let old = self.regs[MODE1 as usize];
                let mut restart = old & MODE1_RESTART;

                if value & MODE1_RESTART != 0 {
                    restart = 0;
                }
                if old & MODE1_SLEEP == 0 && value & MODE1_SLEEP != 0 {
                    restart = MODE1_RESTART;
                }

                self.regs[MODE1 as usize] = (value & !MODE1_RESTART) | restart;
            }
            PRE_SCALE => {
                if self.regs[MODE1 as usize] & MODE1_SLEEP != 0 {
                    self.regs[PRE_SCALE as usize] = value;
                }
            }
            ALL_LED_ON_L..=ALL_LED_OFF_H => {
                self.regs[reg as usize] = value;

                let offset = reg - ALL_LED_ON_L;
                for channel in 0..16u8 {
                    self.regs[(led_base(channel) + offset) as usize] = value;
                }
            }
            _ => self.regs[reg as usize] = value,
        }
    }
}

impl Write for SimBus {
    type Error = SimError;

    fn write(&mut self, address: u8, bytes: &[u8]) -> Result<(), Self::Error> {
        let mut state = lock(&self.state);
        state.check_address(address)?;

        state.record(Frame::Write(bytes.to_vec()));
        state.write(bytes);

        Ok(())
    }
}

impl WriteRead for SimBus {
    type Error = SimError;

    fn write_read(
        &mut self,
        address: u8,
        bytes: &[u8],
        buffer: &mut [u8],
    ) -> Result<(), Self::Error> {
        let mut state = lock(&self.state);
        state.check_address(address)?;

        state.record(Frame::WriteRead {
            out: bytes.to_vec(),
            len: buffer.len(),
        });
        state.write(bytes);
        state.read(buffer);

        Ok(())
    }
}

impl DelayUs<u32> for SimDelay {
    fn delay_us(&mut self, us: u32) {
        lock(&self.state).delay_us += u64::from(us);
    }
}

// ------------------------------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ------------------------------------------------------------------------------------------------

fn lock(state: &Arc<Mutex<SimState>>) -> MutexGuard<'_, SimState> {
    match state.lock() {
        Ok(s) => s,
        Err(poisoned) => poisoned.into_inner(),
    }
}
