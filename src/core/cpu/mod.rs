// megadrive-core/src/core/cpu/mod.rs

//! CPU seams.
//!
//! Instruction-level emulation of the 68000 and Z80 is provided by the
//! caller through [`M68kCore`] and [`Z80Core`]. The core only drives them:
//! it runs whole instructions until a cycle target is reached and keeps the
//! cycle odometers in the bus arbiter.

use crate::core::system::Hardware;
use log::debug;

/// Bus seen by the 68000
pub trait M68kBus {
    fn read_byte(&mut self, addr: u32) -> u8;
    fn read_word(&mut self, addr: u32) -> u16;
    fn write_byte(&mut self, addr: u32, value: u8);
    fn write_word(&mut self, addr: u32, value: u16);

    fn read_long(&mut self, addr: u32) -> u32 {
        let high = self.read_word(addr) as u32;
        let low = self.read_word(addr.wrapping_add(2)) as u32;
        (high << 16) | low
    }

    fn write_long(&mut self, addr: u32, value: u32) {
        self.write_word(addr, (value >> 16) as u16);
        self.write_word(addr.wrapping_add(2), value as u16);
    }

    /// Interrupt acknowledge cycle, returns the autovector override if any.
    fn acknowledge_interrupt(&mut self, level: u8) -> Option<u32>;
}

/// Bus seen by the Z80
pub trait Z80Bus {
    fn read_byte(&mut self, addr: u16) -> u8;
    fn write_byte(&mut self, addr: u16, value: u8);

    /// I/O ports are not connected on the Mega Drive.
    fn read_port(&mut self, _port: u16) -> u8 {
        0xFF
    }
    fn write_port(&mut self, _port: u16, _value: u8) {}
}

/// 68000 instruction core
pub trait M68kCore {
    fn reset(&mut self, bus: &mut dyn M68kBus);
    /// Executes one instruction and returns the cycles it took.
    fn step(&mut self, bus: &mut dyn M68kBus) -> u32;
    fn set_irq_level(&mut self, level: u8);
    fn save_registers(&self) -> Vec<u8>;
    fn load_registers(&mut self, data: &[u8]) -> bool;
}

/// Z80 instruction core
pub trait Z80Core {
    fn reset(&mut self);
    /// Executes one instruction and returns the cycles it took.
    fn step(&mut self, bus: &mut dyn Z80Bus) -> u32;
    /// Asserts the /INT line with the given data bus value.
    fn interrupt(&mut self, vector: u8);
    fn clear_interrupt(&mut self);
    fn save_registers(&self) -> Vec<u8>;
    fn load_registers(&mut self, data: &[u8]) -> bool;
}

/// Main CPU driver
pub struct M68k {
    core: Box<dyn M68kCore>,
}

impl M68k {
    pub fn new(core: Box<dyn M68kCore>) -> Self {
        Self { core }
    }

    pub fn reset(&mut self, hw: &mut Hardware) {
        debug!("M68K reset");
        self.core.reset(hw);
    }

    /// Runs instructions until the odometer reaches `target`.
    ///
    /// An instruction that crosses the target completes, so the odometer may
    /// end past it.
    pub fn exec(&mut self, hw: &mut Hardware, target: u32) {
        while hw.bus.arbiter.m68k_odometer() < target {
            let cycles = self.core.step(hw);
            hw.bus.arbiter.add_m68k_cycles(cycles.max(1));
        }
    }

    /// Updates the interrupt level from the VDP.
    pub fn update_irq(&mut self, hw: &Hardware) {
        self.core.set_irq_level(hw.bus.vdp.irq_level());
    }

    pub fn save_registers(&self) -> Vec<u8> {
        self.core.save_registers()
    }

    pub fn load_registers(&mut self, data: &[u8]) -> bool {
        self.core.load_registers(data)
    }
}
