// megadrive-core/src/core/tmss.rs

//! TMSS boot ROM mapper.
//!
//! With a boot ROM loaded the console starts with the boot ROM mirrored over
//! $000000-$0FFFFF. The boot code writes "SEGA" to $A14000 and then sets bit 0
//! of $A14101, which swaps the cartridge back in.

use crate::core::error::BootRomError;
use crate::core::memory::{self, BusWidth};
use bytemuck::{Pod, Zeroable};
use log::{debug, info, warn};
use std::fs;
use std::path::Path;

/// Largest accepted boot ROM
pub const BOOT_ROM_MAX: usize = 512 * 1024;

/// Smallest accepted boot ROM file
pub const BOOT_ROM_MIN_FILE: usize = 1024;

/// Smallest boot ROM buffer (power of two)
pub const BOOT_ROM_MIN_BUFFER: usize = 4096;

/// Mapping state of the boot mapper
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TmssMode {
    /// No boot ROM: the cartridge is always mapped
    Disabled,
    /// Boot ROM visible at $000000
    BootMapped,
    /// Boot ROM loaded but the cartridge has been enabled
    CartridgeMapped,
}

impl std::fmt::Display for TmssMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TmssMode::Disabled => write!(f, "Disabled"),
            TmssMode::BootMapped => write!(f, "Boot ROM mapped"),
            TmssMode::CartridgeMapped => write!(f, "Cartridge mapped"),
        }
    }
}

/// Savestate image of the TMSS registers
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Pod, Zeroable)]
pub struct TmssBlock {
    pub cart_enabled: u32,
    pub sega_reg: [u8; 4],
}

#[derive(Debug, Clone, Default)]
pub struct Tmss {
    boot_rom: Option<Vec<u8>>,
    cart_enabled: bool,
    sega_reg: [u8; 4],
}

impl Tmss {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads the boot ROM if TMSS is enabled and a path is configured.
    ///
    /// On any error TMSS ends up [`TmssMode::Disabled`].
    pub fn load_boot_rom(&mut self, enabled: bool, path: Option<&Path>) -> Result<usize, BootRomError> {
        self.boot_rom = None;
        self.cart_enabled = false;

        if !enabled {
            return Err(BootRomError::NotEnabled);
        }
        let path = path.ok_or(BootRomError::NoPath)?;
        let data = fs::read(path)?;

        let size = self.install_boot_rom(&data)?;
        info!("TMSS boot ROM loaded: {} ({} bytes)", path.display(), data.len());
        Ok(size)
    }

    /// Installs boot ROM bytes (big-endian, as stored in the file).
    pub fn install_boot_rom(&mut self, data: &[u8]) -> Result<usize, BootRomError> {
        self.boot_rom = None;
        self.cart_enabled = false;

        if data.len() > BOOT_ROM_MAX {
            warn!("Boot ROM too large: {} bytes", data.len());
            return Err(BootRomError::TooLarge(data.len()));
        }
        if data.len() < BOOT_ROM_MIN_FILE {
            warn!("Boot ROM too small: {} bytes", data.len());
            return Err(BootRomError::TooSmall(data.len()));
        }

        let size = data.len().next_power_of_two().max(BOOT_ROM_MIN_BUFFER);
        let mut rom = vec![0u8; size];
        rom[..data.len()].copy_from_slice(data);
        memory::to_host_order(&mut rom);

        self.boot_rom = Some(rom);
        Ok(size)
    }

    pub fn unload(&mut self) {
        self.boot_rom = None;
        self.cart_enabled = false;
    }

    pub fn mode(&self) -> TmssMode {
        match (&self.boot_rom, self.cart_enabled) {
            (None, _) => TmssMode::Disabled,
            (Some(_), false) => TmssMode::BootMapped,
            (Some(_), true) => TmssMode::CartridgeMapped,
        }
    }

    pub fn is_present(&self) -> bool {
        self.boot_rom.is_some()
    }

    /// Hard reset: boot ROM mapped again, "SEGA" register cleared.
    pub fn reset(&mut self) {
        self.cart_enabled = false;
        self.sega_reg = [0; 4];
    }

    /// Write to $A14101. Returns true when the mapping changed.
    pub fn write_enable(&mut self, value: u8) -> bool {
        if self.boot_rom.is_none() {
            return false;
        }
        let enable = value & 1 != 0;
        if enable == self.cart_enabled {
            return false;
        }
        self.cart_enabled = enable;
        debug!("TMSS: {}", self.mode());
        true
    }

    pub fn read_sega_reg(&self, offset: u32) -> u8 {
        self.sega_reg[(offset & 3) as usize]
    }

    pub fn write_sega_reg(&mut self, offset: u32, value: u8) {
        self.sega_reg[(offset & 3) as usize] = value;
    }

    /// Reads the boot ROM, mirrored by its size.
    #[inline]
    pub fn read_rom<W: BusWidth>(&self, addr: u32) -> W {
        match &self.boot_rom {
            Some(rom) => W::read_host(rom, addr as usize & (rom.len() - 1)),
            None => W::fill(),
        }
    }

    pub fn to_block(&self) -> TmssBlock {
        TmssBlock {
            cart_enabled: self.cart_enabled as u32,
            sega_reg: self.sega_reg,
        }
    }

    pub fn load_block(&mut self, block: &TmssBlock) {
        self.cart_enabled = self.boot_rom.is_some() && block.cart_enabled != 0;
        self.sega_reg = block.sega_reg;
    }
}
