// megadrive-core/src/core/memory/z80_bus.rs

//! Z80 address space.
//!
//! | Range          | Target                                   |
//! |----------------|------------------------------------------|
//! | $0000-$3FFF    | 8 KB Z80 RAM (mirrored)                  |
//! | $4000-$5FFF    | YM2612 (`addr & 3`)                      |
//! | $6000-$60FF    | bank register (write bit 0)              |
//! | $7F00-$7F1F    | VDP ports, PSG at $7F11                  |
//! | $8000-$FFFF    | 32 KB window into the 68000 address space |

use crate::core::memory::bus::MdBus;
use log::trace;

/// Z80 cycles lost on every access to the 68000 window
pub const M68K_WINDOW_PENALTY: u32 = 3;

/// BUSREQ and RESET registers, out of reach of the Z80
const ARBITRATION_REGISTERS: std::ops::RangeInclusive<u32> = 0xA11100..=0xA112FF;

/// Z80 memory region (8 KB windows)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Z80Region {
    Ram,
    Ym2612,
    Control,
    M68kWindow,
}

/// Region of each 8 KB window, indexed by `addr >> 13`
pub const Z80_REGIONS: [Z80Region; 8] = [
    Z80Region::Ram,
    Z80Region::Ram,
    Z80Region::Ym2612,
    Z80Region::Control,
    Z80Region::M68kWindow,
    Z80Region::M68kWindow,
    Z80Region::M68kWindow,
    Z80Region::M68kWindow,
];

impl MdBus {
    pub fn z80_read_byte(&mut self, addr: u16) -> u8 {
        match Z80_REGIONS[(addr >> 13) as usize] {
            Z80Region::Ram => self.z80_ram.read(addr as u32),
            Z80Region::Ym2612 => match self.ym2612.as_mut() {
                Some(ym) => ym.read((addr & 3) as u8),
                None => 0xFF,
            },
            Z80Region::Control => self.z80_read_control(addr),
            Z80Region::M68kWindow => {
                self.arbiter.add_z80_cycles(M68K_WINDOW_PENALTY);
                let target = self.arbiter.bank_address(addr);
                self.read_byte(target)
            }
        }
    }

    pub fn z80_write_byte(&mut self, addr: u16, value: u8) {
        match Z80_REGIONS[(addr >> 13) as usize] {
            Z80Region::Ram => self.z80_ram.write(addr as u32, value),
            Z80Region::Ym2612 => {
                if let Some(ym) = self.ym2612.as_mut() {
                    ym.write((addr & 3) as u8, value);
                }
            }
            Z80Region::Control => self.z80_write_control(addr, value),
            Z80Region::M68kWindow => {
                self.arbiter.add_z80_cycles(M68K_WINDOW_PENALTY);
                let target = self.arbiter.bank_address(addr);
                if ARBITRATION_REGISTERS.contains(&target) {
                    trace!("Z80 write to arbitration register ${:06X} ignored", target);
                    return;
                }
                let _ = self.write_byte(target, value);
            }
        }
    }

    fn z80_read_control(&mut self, addr: u16) -> u8 {
        match addr {
            0x7F00..=0x7F0F => self.read_byte(0xC00000 | (addr as u32 & 0x1F)),
            0x7F10..=0x7F1F => 0,
            _ => {
                trace!("Z80 read from unmapped ${:04X}", addr);
                0xFF
            }
        }
    }

    fn z80_write_control(&mut self, addr: u16, value: u8) {
        match addr {
            0x6000..=0x60FF => self.arbiter.write_bank_bit(value),
            0x7F11 => self.psg.write(0, value),
            0x7F00..=0x7F0F => {
                let _ = self.write_byte(0xC00000 | (addr as u32 & 0x1F), value);
            }
            _ => trace!("Z80 write to unmapped ${:04X} = ${:02X}", addr, value),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_region_table_covers_address_space() {
        let region = |addr: u16| Z80_REGIONS[(addr >> 13) as usize];
        assert_eq!(region(0x0000), Z80Region::Ram);
        assert_eq!(region(0x3FFF), Z80Region::Ram);
        assert_eq!(region(0x4000), Z80Region::Ym2612);
        assert_eq!(region(0x5FFF), Z80Region::Ym2612);
        assert_eq!(region(0x6000), Z80Region::Control);
        assert_eq!(region(0x7F11), Z80Region::Control);
        assert_eq!(region(0x8000), Z80Region::M68kWindow);
        assert_eq!(region(0xFFFF), Z80Region::M68kWindow);
    }
}
