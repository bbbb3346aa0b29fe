// megadrive-core/src/core/memory/bus.rs

//! Main memory bus - M68K READ/WRITE functions.
//! Every access is masked to 24 bits, resolved to a [`MemRegion`] through the
//! region table and handed to exactly one handler. Invalid accesses return
//! the fill value (0xFF / 0xFFFF) and invalid writes are dropped.

use crate::core::arbiter::{ArbiterAction, BusArbiter};
use crate::core::cartridge::Cartridge;
use crate::core::config::{Region, SystemKind};
use crate::core::devices::{DmaSource, IoManager, SoundChip, VdpDevice};
use crate::core::memory::map::{MemRegion, RegionTable};
use crate::core::memory::ram::{WorkRam, Z80Ram};
use crate::core::memory::{BusWidth, ADDRESS_MASK};
use crate::core::tmss::{Tmss, TmssMode};
use log::{debug, trace};

/// "No expansion unit" bit of the version register
const VERSION_NO_EXPANSION: u8 = 0x20;

/// Memory that the VDP can DMA from: cartridge, work RAM and boot ROM
pub struct MainMemory {
    pub cart: Option<Cartridge>,
    pub ram: WorkRam,
    pub tmss: Tmss,
    pub regions: RegionTable,
}

impl MainMemory {
    pub fn new() -> Self {
        Self {
            cart: None,
            ram: WorkRam::new(),
            tmss: Tmss::new(),
            regions: RegionTable::mega_drive(),
        }
    }

    /// Reads ROM, RAM or boot ROM. `None` for port regions.
    #[inline]
    fn read<W: BusWidth>(&self, addr: u32) -> Option<W> {
        let value = match self.regions.region(addr) {
            MemRegion::Cartridge => match (&self.cart, W::BYTES) {
                (Some(cart), 2) => W::from(cart.read_word(addr)).unwrap_or_else(W::fill),
                (Some(cart), _) => W::from(cart.read_byte(addr)).unwrap_or_else(W::fill),
                (None, _) => W::fill(),
            },
            MemRegion::Ram => self.ram.read::<W>(addr),
            MemRegion::TmssRom => self.tmss.read_rom::<W>(addr),
            _ => return None,
        };
        Some(value)
    }
}

impl Default for MainMemory {
    fn default() -> Self {
        Self::new()
    }
}

impl DmaSource for MainMemory {
    fn dma_read_word(&self, addr: u32) -> u16 {
        let addr = addr & ADDRESS_MASK & !1;
        self.read::<u16>(addr).unwrap_or(0xFFFF)
    }
}

/// M68K bus: memory, Z80 side, arbitration and device ports
pub struct MdBus {
    pub mem: MainMemory,
    pub z80_ram: Z80Ram,
    pub arbiter: BusArbiter,
    pub vdp: Box<dyn VdpDevice>,
    pub io: Box<dyn IoManager>,
    pub psg: Box<dyn SoundChip>,
    pub ym2612: Option<Box<dyn SoundChip>>,
    region: Region,
    system: SystemKind,
}

impl MdBus {
    pub fn new(
        vdp: Box<dyn VdpDevice>,
        io: Box<dyn IoManager>,
        psg: Box<dyn SoundChip>,
        ym2612: Option<Box<dyn SoundChip>>,
    ) -> Self {
        Self {
            mem: MainMemory::new(),
            z80_ram: Z80Ram::new(),
            arbiter: BusArbiter::new(),
            vdp,
            io,
            psg,
            ym2612,
            region: Region::default(),
            system: SystemKind::MegaDrive,
        }
    }

    pub fn region(&self) -> Region {
        self.region
    }

    pub fn set_region(&mut self, region: Region) {
        self.region = region;
    }

    pub fn system(&self) -> SystemKind {
        self.system
    }

    /// Switches the address-space layout.
    pub fn set_system(&mut self, system: SystemKind) {
        self.system = system;
        self.rebuild_regions();
    }

    /// Rebuilds the region table for the current system and TMSS state.
    pub fn rebuild_regions(&mut self) {
        self.mem.regions = match self.system {
            SystemKind::Pico => RegionTable::pico(),
            SystemKind::MegaDrive | SystemKind::Mars32X => RegionTable::mega_drive(),
        };
        self.update_tmss_mapping();
    }

    /// Remaps windows 0-1 after a TMSS cartridge-enable change.
    pub fn update_tmss_mapping(&mut self) {
        let region = match self.mem.tmss.mode() {
            TmssMode::BootMapped => MemRegion::TmssRom,
            TmssMode::Disabled | TmssMode::CartridgeMapped => MemRegion::Cartridge,
        };
        self.mem.regions.set_window(0, region);
        self.mem.regions.set_window(1, region);
    }

    /// Runs a pending 68K-to-VDP DMA and returns the M68K cycles it stole.
    pub fn run_dma(&mut self) -> u32 {
        if !self.vdp.dma_pending() {
            return 0;
        }
        self.vdp.run_dma(&self.mem)
    }

    // --- Main access functions (called by the CPUs) ---

    pub fn read_byte(&mut self, addr: u32) -> u8 {
        let addr = addr & ADDRESS_MASK;
        if let Some(value) = self.mem.read::<u8>(addr) {
            return value;
        }
        match self.mem.regions.region(addr) {
            MemRegion::MdIo => self.read_md_io_byte(addr),
            MemRegion::Vdp => self.read_vdp_byte(addr),
            MemRegion::PicoIo => self.read_pico_io(addr),
            _ => {
                trace!("Read from unmapped address ${:06X}", addr);
                0xFF
            }
        }
    }

    pub fn read_word(&mut self, addr: u32) -> u16 {
        let addr = addr & ADDRESS_MASK & !1;
        if let Some(value) = self.mem.read::<u16>(addr) {
            return value;
        }
        match self.mem.regions.region(addr) {
            MemRegion::MdIo => self.read_md_io_word(addr),
            MemRegion::Vdp => self.read_vdp_word(addr),
            MemRegion::PicoIo => {
                let value = self.read_pico_io(addr);
                u16::from_be_bytes([value, value])
            }
            _ => {
                trace!("Word read from unmapped address ${:06X}", addr);
                0xFFFF
            }
        }
    }

    pub fn write_byte(&mut self, addr: u32, value: u8) -> ArbiterAction {
        let addr = addr & ADDRESS_MASK;
        match self.mem.regions.region(addr) {
            MemRegion::Cartridge => {
                if let Some(cart) = self.mem.cart.as_mut() {
                    cart.write_byte(addr, value);
                }
            }
            MemRegion::Ram => self.mem.ram.write::<u8>(addr, value),
            MemRegion::MdIo => return self.write_md_io_byte(addr, value),
            MemRegion::Vdp => self.write_vdp_byte(addr, value),
            MemRegion::PicoIo => self.write_pico_io(addr, value),
            MemRegion::TmssRom | MemRegion::Unused => {
                trace!("Write ignored: ${:06X} = ${:02X}", addr, value);
            }
        }
        ArbiterAction::None
    }

    pub fn write_word(&mut self, addr: u32, value: u16) -> ArbiterAction {
        let addr = addr & ADDRESS_MASK & !1;
        match self.mem.regions.region(addr) {
            MemRegion::Cartridge => {
                if let Some(cart) = self.mem.cart.as_mut() {
                    cart.write_word(addr, value);
                }
            }
            MemRegion::Ram => self.mem.ram.write::<u16>(addr, value),
            MemRegion::MdIo => return self.write_md_io_word(addr, value),
            MemRegion::Vdp => self.write_vdp_word(addr, value),
            MemRegion::PicoIo => self.write_pico_io(addr, value as u8),
            MemRegion::TmssRom | MemRegion::Unused => {
                trace!("Word write ignored: ${:06X} = ${:04X}", addr, value);
            }
        }
        ArbiterAction::None
    }

    // --- $A00000-$BFFFFF ---

    fn version_register(&self) -> u8 {
        self.region.version_bits() | VERSION_NO_EXPANSION | self.mem.tmss.is_present() as u8
    }

    fn read_md_io_byte(&mut self, addr: u32) -> u8 {
        match addr {
            0xA00000..=0xA0FFFF => self.read_z80_area(addr),
            0xA10000..=0xA1001F => self.read_io_register(addr),
            0xA11100..=0xA111FF if addr & 1 == 0 => self.arbiter.read_busreq(),
            0xA14000..=0xA14003 => self.mem.tmss.read_sega_reg(addr),
            _ => {
                trace!("Read from unmapped I/O ${:06X}", addr);
                0xFF
            }
        }
    }

    fn read_md_io_word(&mut self, addr: u32) -> u16 {
        match addr {
            0xA00000..=0xA0FFFF | 0xA10000..=0xA1001F => {
                let value = self.read_md_io_byte(addr);
                u16::from_be_bytes([value, value])
            }
            0xA11100..=0xA111FF => (self.arbiter.read_busreq() as u16) << 8,
            0xA14000..=0xA14003 => u16::from_be_bytes([
                self.mem.tmss.read_sega_reg(addr),
                self.mem.tmss.read_sega_reg(addr + 1),
            ]),
            _ => {
                trace!("Word read from unmapped I/O ${:06X}", addr);
                0xFFFF
            }
        }
    }

    fn write_md_io_byte(&mut self, addr: u32, value: u8) -> ArbiterAction {
        match addr {
            0xA00000..=0xA0FFFF => self.write_z80_area(addr, value),
            0xA10000..=0xA1001F => self.write_io_register(addr, value),
            0xA11000..=0xA110FF => {}
            0xA11100..=0xA111FF if addr & 1 == 0 => return self.arbiter.write_busreq(value & 1 != 0),
            0xA11200..=0xA112FF if addr & 1 == 0 => return self.arbiter.write_reset(value & 1 == 0),
            0xA13000..=0xA130FF => self.write_time(addr, value),
            0xA14000..=0xA14003 => self.mem.tmss.write_sega_reg(addr, value),
            0xA14101 => self.write_tmss_enable(value),
            0xA15105 if self.system == SystemKind::Mars32X => self.write_mars_bank(value),
            _ => trace!("Write to unmapped I/O ${:06X} = ${:02X}", addr, value),
        }
        ArbiterAction::None
    }

    fn write_md_io_word(&mut self, addr: u32, value: u16) -> ArbiterAction {
        let [high, low] = value.to_be_bytes();
        match addr {
            0xA00000..=0xA0FFFF => self.write_z80_area(addr, high),
            0xA10000..=0xA1001F => self.write_io_register(addr, low),
            0xA11000..=0xA110FF => {}
            0xA11100..=0xA111FF => return self.arbiter.write_busreq(value & 0x100 != 0),
            0xA11200..=0xA112FF => return self.arbiter.write_reset(value & 0x100 == 0),
            0xA13000..=0xA130FF => self.write_time(addr | 1, low),
            0xA14000..=0xA14003 => {
                self.mem.tmss.write_sega_reg(addr, high);
                self.mem.tmss.write_sega_reg(addr + 1, low);
            }
            0xA14100 => self.write_tmss_enable(low),
            0xA15104 if self.system == SystemKind::Mars32X => self.write_mars_bank(low),
            _ => trace!("Word write to unmapped I/O ${:06X} = ${:04X}", addr, value),
        }
        ArbiterAction::None
    }

    fn write_time(&mut self, addr: u32, value: u8) {
        if let Some(cart) = self.mem.cart.as_mut() {
            cart.write_time_register(addr, value);
        }
    }

    fn write_tmss_enable(&mut self, value: u8) {
        if self.mem.tmss.write_enable(value) {
            self.update_tmss_mapping();
        }
    }

    fn write_mars_bank(&mut self, value: u8) {
        if let Some(cart) = self.mem.cart.as_mut() {
            debug!("32X ROM bank {}", value & 3);
            cart.set_mars_bank(value & 3);
        }
    }

    /// Z80 RAM, YM2612, bank register and PSG as seen from the 68000
    fn read_z80_area(&mut self, addr: u32) -> u8 {
        if !self.arbiter.m68k_has_z80_bus() {
            trace!("Z80 area read without the bus: ${:06X}", addr);
            return 0xFF;
        }
        match addr & 0xFFFF {
            off @ 0x0000..=0x3FFF => self.z80_ram.read(off),
            off @ 0x4000..=0x5FFF => match self.ym2612.as_mut() {
                Some(ym) => ym.read((off & 3) as u8),
                None => 0xFF,
            },
            _ => 0xFF,
        }
    }

    fn write_z80_area(&mut self, addr: u32, value: u8) {
        if !self.arbiter.m68k_has_z80_bus() {
            trace!("Z80 area write without the bus: ${:06X} = ${:02X}", addr, value);
            return;
        }
        match addr & 0xFFFF {
            off @ 0x0000..=0x3FFF => self.z80_ram.write(off, value),
            off @ 0x4000..=0x5FFF => {
                if let Some(ym) = self.ym2612.as_mut() {
                    ym.write((off & 3) as u8, value);
                }
            }
            0x6000..=0x60FF => self.arbiter.write_bank_bit(value),
            0x7F10 | 0x7F11 => self.psg.write(0, value),
            _ => {}
        }
    }

    fn read_io_register(&mut self, addr: u32) -> u8 {
        match ((addr >> 1) & 0x0F) as u8 {
            0 => self.version_register(),
            reg => self.io.read_port(reg),
        }
    }

    fn write_io_register(&mut self, addr: u32, value: u8) {
        match ((addr >> 1) & 0x0F) as u8 {
            0 => {}
            reg => self.io.write_port(reg, value),
        }
    }

    // --- $C00000-$DFFFFF ---

    fn read_vdp_word(&mut self, addr: u32) -> u16 {
        if addr & 0xE700E0 != 0xC00000 {
            trace!("Invalid VDP read ${:06X}", addr);
            return 0xFFFF;
        }
        match addr & 0x1F {
            0x00..=0x03 => self.vdp.read_data(),
            0x04..=0x07 => self.vdp.read_control(),
            0x08..=0x0F => self.vdp.read_hv_counter(),
            // unused but valid
            _ => 0,
        }
    }

    fn read_vdp_byte(&mut self, addr: u32) -> u8 {
        if addr & 0xE700E0 != 0xC00000 {
            trace!("Invalid VDP byte read ${:06X}", addr);
            return 0xFF;
        }
        let [high, low] = self.read_vdp_word(addr & !1).to_be_bytes();
        if addr & 1 == 0 {
            high
        } else {
            low
        }
    }

    fn write_vdp_word(&mut self, addr: u32, value: u16) {
        if addr & 0xE700E0 != 0xC00000 {
            trace!("Invalid VDP write ${:06X} = ${:04X}", addr, value);
            return;
        }
        match addr & 0x1F {
            0x00..=0x03 => self.vdp.write_data(value),
            0x04..=0x07 => self.vdp.write_control(value),
            0x10..=0x17 => self.psg.write(0, value as u8),
            _ => {}
        }
    }

    fn write_vdp_byte(&mut self, addr: u32, value: u8) {
        if addr & 0xE700E0 != 0xC00000 {
            trace!("Invalid VDP byte write ${:06X} = ${:02X}", addr, value);
            return;
        }
        match addr & 0x1F {
            0x00..=0x03 => self.vdp.write_data(u16::from_be_bytes([value, value])),
            0x04..=0x07 => self.vdp.write_control(u16::from_be_bytes([value, value])),
            0x10..=0x17 if addr & 1 != 0 => self.psg.write(0, value),
            _ => {}
        }
    }

    // --- Pico $800000-$8FFFFF ---

    fn read_pico_io(&mut self, addr: u32) -> u8 {
        match ((addr >> 1) & 0x0F) as u8 {
            0 => self.region.version_bits(),
            reg => self.io.read_port(reg),
        }
    }

    fn write_pico_io(&mut self, addr: u32, value: u8) {
        match ((addr >> 1) & 0x0F) as u8 {
            0 => {}
            reg => self.io.write_port(reg, value),
        }
    }
}
