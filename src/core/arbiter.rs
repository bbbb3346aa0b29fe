// megadrive-core/src/core/arbiter.rs

//! Z80 bus arbitration.
//!
//! Tracks the BUSREQ and RESET lines the 68000 drives through $A11100 and
//! $A11200, keeps both CPU cycle odometers and converts between the two
//! clock domains (M68K = master / 7, Z80 = master / 15).

use bitflags::bitflags;
use bytemuck::{Pod, Zeroable};
use log::debug;

bitflags! {
    /// Z80 line state
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Z80State: u8 {
        /// A Z80 exists on this system
        const ENABLED = 0x01;
        /// The 68000 holds the Z80 bus
        const BUSREQ  = 0x02;
        /// The Z80 is held in reset
        const RESET   = 0x04;
    }
}

/// Entries in the precomputed M68K to Z80 cycle table
pub const Z80_TABLE_LEN: usize = 0x40000;

/// Master cycles before a BUSREQ change shows up in the status bit
pub const BUSREQ_DELAY_MASTER: u32 = 16;

/// Master clock divider of the 68000
pub const M68K_CLOCK_DIVIDER: u32 = 7;

/// Upper bits of the BUSREQ status byte
const BUSREQ_STATUS_BASE: u8 = 0x80;

#[inline]
fn m68k_to_z80(cycles: u32) -> u32 {
    ((cycles as u64 * 14 + 15) / 30) as u32
}

/// M68K cycle count to Z80 cycle count, `round(k * 7 / 15)`
#[derive(Debug, Clone)]
pub struct Z80CycleTable {
    table: Box<[u32]>,
}

impl Z80CycleTable {
    pub fn new() -> Self {
        let table = (0..Z80_TABLE_LEN as u32).map(m68k_to_z80).collect();
        Self { table }
    }

    /// Converts an M68K cycle count. Counts past the table use the same formula.
    #[inline]
    pub fn convert(&self, m68k_cycles: u32) -> u32 {
        match self.table.get(m68k_cycles as usize) {
            Some(&z80) => z80,
            None => m68k_to_z80(m68k_cycles),
        }
    }
}

impl Default for Z80CycleTable {
    fn default() -> Self {
        Self::new()
    }
}

/// Work requested by an arbitration write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use]
pub enum ArbiterAction {
    None,
    /// Run the Z80 up to this odometer value before it stalls
    CatchUpZ80(u32),
    /// Soft-reset the Z80 and the YM2612
    ResetZ80,
}

/// Savestate image of the arbiter
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Pod, Zeroable)]
pub struct ArbiterBlock {
    pub state: u32,
    pub prev_bus_bit: u32,
    pub last_busreq_cycle: u32,
    pub z80_bank: u32,
    pub m68k_odometer: u32,
    pub z80_odometer: u32,
}

/// Bus arbiter
#[derive(Debug, Clone)]
pub struct BusArbiter {
    state: Z80State,
    m68k_odometer: u32,
    z80_odometer: u32,
    last_busreq_cycle: u32,
    prev_bus_bit: u8,
    z80_bank: u16,
    table: Z80CycleTable,
}

impl BusArbiter {
    pub fn new() -> Self {
        Self {
            state: Z80State::ENABLED | Z80State::RESET,
            m68k_odometer: 0,
            z80_odometer: 0,
            last_busreq_cycle: 0,
            prev_bus_bit: 1,
            z80_bank: 0,
            table: Z80CycleTable::new(),
        }
    }

    /// Power-on state: Z80 present (unless `has_z80` is false) and held in reset.
    pub fn reset(&mut self, has_z80: bool) {
        self.state = if has_z80 {
            Z80State::ENABLED | Z80State::RESET
        } else {
            Z80State::empty()
        };
        self.m68k_odometer = 0;
        self.z80_odometer = 0;
        self.last_busreq_cycle = 0;
        self.prev_bus_bit = 1;
        self.z80_bank = 0;
    }

    /// Clears both odometers at the start of a frame.
    pub fn begin_frame(&mut self) {
        self.m68k_odometer = 0;
        self.z80_odometer = 0;
        self.last_busreq_cycle = 0;
    }

    pub fn state(&self) -> Z80State {
        self.state
    }

    pub fn has_z80(&self) -> bool {
        self.state.contains(Z80State::ENABLED)
    }

    /// The Z80 executes only when present, not stalled and not in reset.
    pub fn z80_can_run(&self) -> bool {
        self.state == Z80State::ENABLED
    }

    /// The 68000 may touch Z80 RAM when it holds the bus or the Z80 is in reset.
    pub fn m68k_has_z80_bus(&self) -> bool {
        self.state.intersects(Z80State::BUSREQ | Z80State::RESET)
    }

    #[inline]
    pub fn m68k_odometer(&self) -> u32 {
        self.m68k_odometer
    }

    #[inline]
    pub fn add_m68k_cycles(&mut self, cycles: u32) {
        self.m68k_odometer = self.m68k_odometer.wrapping_add(cycles);
    }

    #[inline]
    pub fn z80_odometer(&self) -> u32 {
        self.z80_odometer
    }

    #[inline]
    pub fn add_z80_cycles(&mut self, cycles: u32) {
        self.z80_odometer = self.z80_odometer.wrapping_add(cycles);
    }

    pub fn set_z80_odometer(&mut self, cycles: u32) {
        self.z80_odometer = cycles;
    }

    /// Z80 cycles equivalent to an M68K cycle count
    pub fn z80_cycles_for(&self, m68k_cycles: u32) -> u32 {
        self.table.convert(m68k_cycles)
    }

    fn current_bus_bit(&self) -> u8 {
        if self.state.contains(Z80State::BUSREQ) {
            0
        } else {
            1
        }
    }

    /// Write to $A11100.
    pub fn write_busreq(&mut self, assert: bool) -> ArbiterAction {
        if !self.has_z80() {
            return ArbiterAction::None;
        }

        let requested = self.state.contains(Z80State::BUSREQ);
        if assert == requested {
            return ArbiterAction::None;
        }

        self.prev_bus_bit = self.current_bus_bit();
        self.last_busreq_cycle = self.m68k_odometer;

        if assert {
            let was_running = self.z80_can_run();
            self.state.insert(Z80State::BUSREQ);
            debug!("Z80 BUSREQ asserted at M68K cycle {}", self.m68k_odometer);

            if was_running {
                return ArbiterAction::CatchUpZ80(self.table.convert(self.m68k_odometer));
            }
        } else {
            self.state.remove(Z80State::BUSREQ);
            self.z80_odometer = self.table.convert(self.m68k_odometer);
            debug!(
                "Z80 BUSREQ released at M68K cycle {} (Z80 odometer {})",
                self.m68k_odometer, self.z80_odometer
            );
        }

        ArbiterAction::None
    }

    /// Write to $A11200. `assert` is true when the RESET line is driven low.
    pub fn write_reset(&mut self, assert: bool) -> ArbiterAction {
        if !self.has_z80() {
            return ArbiterAction::None;
        }

        if assert {
            let was_reset = self.state.contains(Z80State::RESET);
            self.state.insert(Z80State::RESET);
            if !was_reset {
                debug!("Z80 held in reset");
            }
            // The line is level-triggered: every write with the bit clear resets again.
            ArbiterAction::ResetZ80
        } else {
            if self.state.contains(Z80State::RESET) {
                self.state.remove(Z80State::RESET);
                self.z80_odometer = self.table.convert(self.m68k_odometer);
                debug!("Z80 reset released");
            }
            ArbiterAction::None
        }
    }

    /// Reads the BUSREQ status bit (0 = bus granted to the 68000).
    ///
    /// A change becomes visible only after [`BUSREQ_DELAY_MASTER`] master
    /// cycles; before that the previous value is returned.
    pub fn read_busreq(&self) -> u8 {
        let elapsed = self.m68k_odometer.wrapping_sub(self.last_busreq_cycle);
        let bit = if elapsed.saturating_mul(M68K_CLOCK_DIVIDER) < BUSREQ_DELAY_MASTER {
            self.prev_bus_bit
        } else {
            self.current_bus_bit()
        };
        BUSREQ_STATUS_BASE | bit
    }

    /// Current 9-bit Z80 bank register
    pub fn z80_bank(&self) -> u16 {
        self.z80_bank
    }

    /// Shifts bit 0 of `value` into the bank register (LSB first, 9 writes).
    pub fn write_bank_bit(&mut self, value: u8) {
        self.z80_bank = ((self.z80_bank >> 1) | (((value & 1) as u16) << 8)) & 0x1FF;
    }

    /// M68K address of a Z80 access through the $8000-$FFFF window
    pub fn bank_address(&self, z80_addr: u16) -> u32 {
        ((self.z80_bank as u32) << 15) | (z80_addr as u32 & 0x7FFF)
    }

    pub fn to_block(&self) -> ArbiterBlock {
        ArbiterBlock {
            state: self.state.bits() as u32,
            prev_bus_bit: self.prev_bus_bit as u32,
            last_busreq_cycle: self.last_busreq_cycle,
            z80_bank: self.z80_bank as u32,
            m68k_odometer: self.m68k_odometer,
            z80_odometer: self.z80_odometer,
        }
    }

    pub fn load_block(&mut self, block: &ArbiterBlock) {
        self.state = Z80State::from_bits_truncate(block.state as u8);
        self.prev_bus_bit = (block.prev_bus_bit & 1) as u8;
        self.last_busreq_cycle = block.last_busreq_cycle;
        self.z80_bank = (block.z80_bank & 0x1FF) as u16;
        self.m68k_odometer = block.m68k_odometer;
        self.z80_odometer = block.z80_odometer;
    }
}

impl Default for BusArbiter {
    fn default() -> Self {
        Self::new()
    }
}
