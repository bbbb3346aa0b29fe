// megadrive-core/src/core/cartridge/mapper/mod.rs

//! Cartridge mapper module
//!
//! The cartridge area ($000000-$9FFFFF) is divided into twenty 512 KB
//! windows. Each window carries exactly one [`BankType`] tag that tells the
//! dispatcher where an access goes: a virtual ROM bank, an SSF2-selected
//! bank, the fixed protection registers, or nothing.

pub mod mapper_common;
pub mod mapper_database;

// Re-export types and functions
pub use mapper_common::{FixedRegister, MapperConfig, MapperType, SramOverride, MAX_FIXED_REGISTERS};
pub use mapper_database::{FixupEntry, FixupTable, RomIdentity};

use crate::core::memory::map::WINDOW_SHIFT;
use log::debug;

/// Number of cartridge windows ($000000-$9FFFFF)
pub const BANK_WINDOWS: usize = 20;

/// Windows reachable through the SSF2 bank registers
pub const SSF2_WINDOWS: usize = 8;

/// SSF2 register value meaning "identity mapping"
pub const SSF2_UNSET: u8 = 0xFF;

/// First window handled by the fixed protection registers ($400000)
pub const FIXED_REGISTER_WINDOW: usize = 8;

/// 32X: ROM window at $880000 and the switchable 1 MB window at $900000
const MARS_FIXED_WINDOW: usize = 0x11;
const MARS_BANKED_WINDOW: usize = 0x12;

/// What a cartridge window is connected to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BankType {
    /// Virtual ROM bank
    Cartridge(u8),
    /// Virtual ROM bank selected through the SSF2 registers
    Ssf2(u8),
    /// Read-only protection registers
    FixedRegisters,
    #[default]
    Unused,
}

/// Window-to-bank mapping of the cartridge area
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BankTable {
    windows: [BankType; BANK_WINDOWS],
    ssf2_regs: [u8; SSF2_WINDOWS],
    mapper: MapperType,
    mars: bool,
    mars_bank: u8,
}

impl BankTable {
    pub fn new() -> Self {
        Self {
            windows: [BankType::Unused; BANK_WINDOWS],
            ssf2_regs: [SSF2_UNSET; SSF2_WINDOWS],
            mapper: MapperType::Flat,
            mars: false,
            mars_bank: 0,
        }
    }

    /// Builds the power-on table for a mapper and an image of `bank_count` banks.
    pub fn init(&mut self, mapper: MapperType, bank_count: usize, mars: bool) {
        self.mapper = mapper;
        self.mars = mars;
        self.mars_bank = 0;
        self.ssf2_regs = [SSF2_UNSET; SSF2_WINDOWS];

        match mapper {
            MapperType::Flat => self.init_flat(bank_count),
            MapperType::Ssf2 => self.init_ssf2(),
            MapperType::FixedRegisters => self.init_fixed_regs(bank_count),
        }

        if mars {
            self.apply_mars_windows();
        }
        debug!("Bank table initialised: {} mapper, {} banks", mapper, bank_count);
    }

    fn init_flat(&mut self, bank_count: usize) {
        for (window, slot) in self.windows.iter_mut().enumerate() {
            *slot = if window < bank_count {
                BankType::Cartridge(window as u8)
            } else {
                BankType::Unused
            };
        }
    }

    fn init_ssf2(&mut self) {
        for (window, slot) in self.windows.iter_mut().enumerate() {
            *slot = if window < SSF2_WINDOWS {
                BankType::Ssf2(window as u8)
            } else {
                BankType::Unused
            };
        }
    }

    fn init_fixed_regs(&mut self, bank_count: usize) {
        self.init_flat(bank_count.min(FIXED_REGISTER_WINDOW));
        for slot in &mut self.windows[FIXED_REGISTER_WINDOW..] {
            *slot = BankType::FixedRegisters;
        }
    }

    fn apply_mars_windows(&mut self) {
        let bank = self.mars_bank.wrapping_mul(2);
        self.windows[MARS_FIXED_WINDOW] = BankType::Cartridge(0);
        self.windows[MARS_BANKED_WINDOW] = BankType::Cartridge(bank);
        self.windows[MARS_BANKED_WINDOW + 1] = BankType::Cartridge(bank + 1);
    }

    pub fn mapper(&self) -> MapperType {
        self.mapper
    }

    /// Tag of the window containing `addr`
    #[inline]
    pub fn resolve(&self, addr: u32) -> BankType {
        self.windows
            .get((addr >> WINDOW_SHIFT) as usize)
            .copied()
            .unwrap_or(BankType::Unused)
    }

    pub fn window(&self, window: usize) -> BankType {
        self.windows.get(window).copied().unwrap_or(BankType::Unused)
    }

    pub fn ssf2_registers(&self) -> [u8; SSF2_WINDOWS] {
        self.ssf2_regs
    }

    /// SSF2 bank select for `window` (1-7).
    ///
    /// A bank past the end of the image falls back to the identity mapping and
    /// records [`SSF2_UNSET`]. Selecting the same bank twice is a no-op.
    pub fn ssf2_select(&mut self, window: usize, value: u8, bank_count: usize) {
        if self.mapper != MapperType::Ssf2 || window == 0 || window >= SSF2_WINDOWS {
            return;
        }

        let (tag, reg) = if (value as usize) < bank_count {
            (BankType::Ssf2(value), value)
        } else {
            (BankType::Ssf2(window as u8), SSF2_UNSET)
        };

        if self.windows[window] != tag || self.ssf2_regs[window] != reg {
            self.windows[window] = tag;
            self.ssf2_regs[window] = reg;
            debug!("SSF2: window {} -> {:?}", window, tag);
        }
    }

    /// 32X bank register: selects the 1 MB block visible at $900000.
    pub fn set_mars_bank(&mut self, bank: u8) {
        if !self.mars {
            return;
        }
        self.mars_bank = bank & 3;
        self.apply_mars_windows();
    }

    /// Restores SSF2 banks to identity (hard reset).
    pub fn reset_banks(&mut self) {
        if self.mapper == MapperType::Ssf2 {
            self.init_ssf2();
            self.ssf2_regs = [SSF2_UNSET; SSF2_WINDOWS];
        }
        if self.mars {
            self.mars_bank = 0;
            self.apply_mars_windows();
        }
    }

    pub fn save_state(&self) -> Vec<u8> {
        let mut state = Vec::with_capacity(SSF2_WINDOWS + 1);
        state.extend_from_slice(&self.ssf2_regs);
        state.push(self.mars_bank);
        state
    }

    pub fn load_state(&mut self, data: &[u8]) -> bool {
        if data.len() < SSF2_WINDOWS + 1 {
            return false;
        }

        if self.mapper == MapperType::Ssf2 {
            self.init_ssf2();
            for window in 1..SSF2_WINDOWS {
                let reg = data[window];
                self.ssf2_regs[window] = reg;
                if reg != SSF2_UNSET {
                    self.windows[window] = BankType::Ssf2(reg);
                }
            }
        }
        if self.mars {
            self.mars_bank = data[SSF2_WINDOWS] & 3;
            self.apply_mars_windows();
        }
        true
    }
}

impl Default for BankTable {
    fn default() -> Self {
        Self::new()
    }
}
