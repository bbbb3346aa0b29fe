// megadrive-core/src/core/system.rs

//! Hardware owned by the scheduler: the bus and everything behind it plus
//! the Z80. The 68000 core lives outside so it can borrow this mutably
//! while it executes.

use crate::core::arbiter::ArbiterAction;
use crate::core::cpu::{M68kBus, Z80Bus, Z80Core};
use crate::core::memory::MdBus;
use log::debug;

pub struct Hardware {
    pub bus: MdBus,
    pub z80: Box<dyn Z80Core>,
}

impl Hardware {
    pub fn new(bus: MdBus, z80: Box<dyn Z80Core>) -> Self {
        Self { bus, z80 }
    }

    /// Carries out the side effect of an arbitration register write.
    pub fn apply(&mut self, action: ArbiterAction) {
        match action {
            ArbiterAction::None => {}
            ArbiterAction::CatchUpZ80(target) => self.step_z80(target),
            ArbiterAction::ResetZ80 => self.reset_z80(),
        }
    }

    /// Soft reset of the Z80 and the YM2612 (shared reset line).
    pub fn reset_z80(&mut self) {
        debug!("Z80 + YM2612 reset");
        self.z80.reset();
        if let Some(ym) = self.bus.ym2612.as_mut() {
            ym.reset();
        }
    }

    /// Runs the Z80 up to `target` when it may run; otherwise its odometer
    /// simply follows the target.
    pub fn run_z80(&mut self, target: u32) {
        if self.bus.arbiter.z80_can_run() {
            self.step_z80(target);
        } else {
            self.bus.arbiter.set_z80_odometer(target);
        }
    }

    fn step_z80(&mut self, target: u32) {
        let Self { bus, z80 } = self;
        while bus.arbiter.z80_odometer() < target {
            let cycles = z80.step(&mut Z80View { bus: &mut *bus });
            bus.arbiter.add_z80_cycles(cycles.max(1));
        }
    }

    pub fn z80_interrupt(&mut self, vector: u8) {
        if self.bus.arbiter.has_z80() {
            self.z80.interrupt(vector);
        }
    }

    pub fn z80_clear_interrupt(&mut self) {
        if self.bus.arbiter.has_z80() {
            self.z80.clear_interrupt();
        }
    }
}

impl M68kBus for Hardware {
    fn read_byte(&mut self, addr: u32) -> u8 {
        self.bus.read_byte(addr)
    }

    fn read_word(&mut self, addr: u32) -> u16 {
        self.bus.read_word(addr)
    }

    fn write_byte(&mut self, addr: u32, value: u8) {
        let action = self.bus.write_byte(addr, value);
        self.apply(action);
    }

    fn write_word(&mut self, addr: u32, value: u16) {
        let action = self.bus.write_word(addr, value);
        self.apply(action);
    }

    fn acknowledge_interrupt(&mut self, level: u8) -> Option<u32> {
        self.bus.vdp.acknowledge_interrupt(level)
    }
}

/// Bus handed to the Z80 core while it steps
struct Z80View<'a> {
    bus: &'a mut MdBus,
}

impl Z80Bus for Z80View<'_> {
    fn read_byte(&mut self, addr: u16) -> u8 {
        self.bus.z80_read_byte(addr)
    }

    fn write_byte(&mut self, addr: u16, value: u8) {
        self.bus.z80_write_byte(addr, value);
    }
}
