//! Region tables for the M68K address space.
//! The 16 MB space is split into 32 windows of 512 KB; each window resolves
//! to exactly one [`MemRegion`] through a single array lookup.

use crate::core::memory::ADDRESS_MASK;

/// Shift converting an M68K address into a 512 KB window index
pub const WINDOW_SHIFT: u32 = 19;

/// Number of 512 KB windows in the 24-bit address space
pub const WINDOW_COUNT: usize = 32;

/// Memory region handled by the M68K dispatcher
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum MemRegion {
    Cartridge, // Cartridge ROM / save memory / mapper registers
    MdIo,      // Z80 area, I/O, arbitration, !TIME, TMSS
    Vdp,       // VDP and PSG ports
    Ram,       // 64 KB work RAM (mirrored)
    TmssRom,   // Boot ROM while TMSS is boot-mapped
    PicoIo,    // Pico I/O registers
    #[default]
    Unused,    // Nothing mapped
}

/// Region lookup table (indexed by 512 KB window)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegionTable {
    regions: [MemRegion; WINDOW_COUNT],
}

impl RegionTable {
    /// Creates an empty table with every window unused
    pub fn new() -> Self {
        Self {
            regions: [MemRegion::Unused; WINDOW_COUNT],
        }
    }

    /// Standard Mega Drive layout
    pub fn mega_drive() -> Self {
        let mut table = Self::new();
        table.map_region(0x000000, 0x9FFFFF, MemRegion::Cartridge);
        table.map_region(0xA00000, 0xBFFFFF, MemRegion::MdIo);
        table.map_region(0xC00000, 0xDFFFFF, MemRegion::Vdp);
        table.map_region(0xE00000, 0xFFFFFF, MemRegion::Ram);
        table
    }

    /// Sega Pico layout: no Z80 area, I/O at $800000
    pub fn pico() -> Self {
        let mut table = Self::new();
        table.map_region(0x000000, 0x7FFFFF, MemRegion::Cartridge);
        table.map_region(0x800000, 0x8FFFFF, MemRegion::PicoIo);
        table.map_region(0xC00000, 0xDFFFFF, MemRegion::Vdp);
        table.map_region(0xE00000, 0xFFFFFF, MemRegion::Ram);
        table
    }

    /// Maps an address range to a region (512 KB granularity)
    pub fn map_region(&mut self, start: u32, end: u32, region: MemRegion) {
        let first = ((start & ADDRESS_MASK) >> WINDOW_SHIFT) as usize;
        let last = ((end & ADDRESS_MASK) >> WINDOW_SHIFT) as usize;

        for window in first..=last {
            self.regions[window] = region;
        }
    }

    /// Sets a single window
    pub fn set_window(&mut self, window: usize, region: MemRegion) {
        if let Some(slot) = self.regions.get_mut(window) {
            *slot = region;
        }
    }

    /// MemRegion of a single window
    pub fn window(&self, window: usize) -> MemRegion {
        self.regions.get(window).copied().unwrap_or_default()
    }

    /// MemRegion handling an address
    #[inline]
    pub fn region(&self, addr: u32) -> MemRegion {
        self.regions[((addr & ADDRESS_MASK) >> WINDOW_SHIFT) as usize]
    }
}

impl Default for RegionTable {
    fn default() -> Self {
        Self::new()
    }
}
