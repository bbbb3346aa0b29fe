// megadrive-core/src/core/context.rs

//! Emulation context: owns one complete machine.
//!
//! Everything that used to be process-wide state (cartridge, settings, CPU
//! cores) lives here, so several machines can coexist.

use crate::core::arbiter::ArbiterBlock;
use crate::core::cartridge::{Cartridge, FixupTable, MapperType, RomImageLoader};
use crate::core::config::{EmuConfig, Region, SystemKind};
use crate::core::cpu::{M68k, M68kCore, Z80Core};
use crate::core::devices::{IoManager, SoundChip, VdpDevice};
use crate::core::error::{BootRomError, LoadError, SavestateError};
use crate::core::memory::MdBus;
use crate::core::memory::ram::{WORK_RAM_SIZE, Z80_RAM_SIZE};
use crate::core::savestate::{self, MemoryContainer, SavestateContainer};
use crate::core::scheduler::{FrameScheduler, FrameTimingState};
use crate::core::system::Hardware;
use crate::core::tmss::{TmssBlock, TmssMode};
use log::{debug, info, warn};
use std::io;
use std::path::PathBuf;

/// Chip implementations plugged into the core
pub struct Devices {
    pub m68k: Box<dyn M68kCore>,
    pub z80: Box<dyn Z80Core>,
    pub vdp: Box<dyn VdpDevice>,
    pub io: Box<dyn IoManager>,
    pub psg: Box<dyn SoundChip>,
    /// Absent on the Pico
    pub ym2612: Option<Box<dyn SoundChip>>,
}

/// Summary of a successful ROM load
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadInfo {
    pub size: usize,
    pub crc32: u32,
    pub system: SystemKind,
    pub mapper: MapperType,
    pub save_memory: String,
    pub save_bytes_loaded: usize,
    pub checksum_fixed: bool,
    pub tmss: TmssMode,
}

/// Blobs of one savestate, checked before any of them is applied
struct StateBlobs<'a> {
    m68k_regs: &'a [u8],
    z80_regs: &'a [u8],
    ram: &'a [u8],
    z80_ram: &'a [u8],
    vdp: &'a [u8],
    psg: &'a [u8],
    ym2612: Option<&'a [u8]>,
    cartridge: &'a [u8],
    arbiter: ArbiterBlock,
    tmss: TmssBlock,
    io: Option<&'a [u8]>,
    timing: Option<&'a [u8]>,
}

impl<'a> StateBlobs<'a> {
    fn read(container: &'a dyn SavestateContainer, has_ym: bool) -> Result<Self, SavestateError> {
        let arbiter = savestate::load_pod(container, savestate::BUS_ARBITRATION)?;
        let tmss = savestate::load_pod(container, savestate::TMSS)?;
        let timing = container.load_blob(savestate::FRAME_TIMING);
        if timing.is_some() {
            savestate::load_pod::<FrameTimingState>(container, savestate::FRAME_TIMING)?;
        }

        let ram = savestate::require(container, savestate::M68K_RAM)?;
        savestate::accepted(ram.len() == WORK_RAM_SIZE, savestate::M68K_RAM)?;
        let z80_ram = savestate::require(container, savestate::Z80_RAM)?;
        savestate::accepted(z80_ram.len() == Z80_RAM_SIZE, savestate::Z80_RAM)?;

        let ym2612 = if has_ym {
            Some(savestate::require(container, savestate::YM2612)?)
        } else {
            None
        };

        Ok(Self {
            m68k_regs: savestate::require(container, savestate::M68K_REGISTERS)?,
            z80_regs: savestate::require(container, savestate::Z80_REGISTERS)?,
            ram,
            z80_ram,
            vdp: savestate::require(container, savestate::VDP)?,
            psg: savestate::require(container, savestate::PSG)?,
            ym2612,
            cartridge: savestate::require(container, savestate::CARTRIDGE)?,
            arbiter,
            tmss,
            io: container.load_blob(savestate::IO),
            timing,
        })
    }
}

pub struct EmulationContext {
    config: EmuConfig,
    m68k: M68k,
    hw: Hardware,
    scheduler: FrameScheduler,
    fixups: FixupTable,
    audio_out: Vec<i16>,
}

impl EmulationContext {
    pub fn new(config: EmuConfig, devices: Devices) -> Self {
        let Devices {
            m68k,
            z80,
            vdp,
            io,
            psg,
            ym2612,
        } = devices;

        let mut bus = MdBus::new(vdp, io, psg, ym2612);
        bus.set_region(config.region);
        bus.set_system(config.system);
        bus.arbiter.reset(config.system != SystemKind::Pico);

        Self {
            scheduler: FrameScheduler::new(config.region, config.sample_rate),
            m68k: M68k::new(m68k),
            hw: Hardware::new(bus, z80),
            fixups: FixupTable::builtin(),
            audio_out: Vec::new(),
            config,
        }
    }

    /// Replaces the built-in fixup table (applies to the next load).
    pub fn set_fixups(&mut self, fixups: FixupTable) {
        self.fixups = fixups;
    }

    /// Loads a cartridge, its save memory and the boot ROM, then hard-resets.
    pub fn load_rom(&mut self, loader: &mut dyn RomImageLoader) -> Result<LoadInfo, LoadError> {
        let mut cart = Cartridge::load_image(loader, self.config.system, &self.fixups)?;

        let checksum_fixed = self.config.auto_fix_checksum && cart.checksum_fix();
        if checksum_fixed {
            debug!("Header checksum patched to ${:04X}", cart.checksum_in_image());
        }
        let save_bytes_loaded = cart.init_sram(self.config.sram_path.as_deref());
        if save_bytes_loaded > 0 {
            info!("Save memory loaded: {} bytes", save_bytes_loaded);
        }

        let system = cart.system();
        let info = LoadInfo {
            size: cart.image().size(),
            crc32: cart.crc32(),
            system,
            mapper: cart.mapper(),
            save_memory: cart.save_memory().to_string(),
            save_bytes_loaded,
            checksum_fixed,
            tmss: TmssMode::Disabled,
        };

        let bus = &mut self.hw.bus;
        bus.mem.cart = Some(cart);

        let tmss = &mut bus.mem.tmss;
        if system == SystemKind::Pico {
            tmss.unload();
        } else {
            match tmss.load_boot_rom(self.config.tmss_enabled, self.config.tmss_rom_path.as_deref()) {
                Ok(_) | Err(BootRomError::NotEnabled) => {}
                Err(err) => warn!("TMSS disabled: {}", err),
            }
        }
        bus.set_system(system);

        self.hard_reset();
        Ok(LoadInfo {
            tmss: self.hw.bus.mem.tmss.mode(),
            ..info
        })
    }

    /// Writes the save file and removes the cartridge.
    pub fn unload_rom(&mut self) {
        if let Err(err) = self.save_sram() {
            warn!("Could not write save file: {}", err);
        }
        self.hw.bus.mem.cart = None;
        self.hw.bus.mem.tmss.unload();
        self.hw.bus.rebuild_regions();
    }

    pub fn exec_frame(&mut self) {
        self.scheduler.run_frame(&mut self.m68k, &mut self.hw, true);
        self.scheduler.write_audio(&mut self.audio_out, self.config.stereo);
    }

    /// Same timing as [`exec_frame`](Self::exec_frame) without rendering.
    pub fn exec_frame_fast(&mut self) {
        self.scheduler.run_frame(&mut self.m68k, &mut self.hw, false);
        self.scheduler.write_audio(&mut self.audio_out, self.config.stereo);
    }

    /// Reset button: CPUs and YM2612 restart, memory is kept.
    pub fn soft_reset(&mut self) {
        info!("Soft reset");
        let has_z80 = self.hw.bus.system() != SystemKind::Pico;
        self.hw.bus.arbiter.reset(has_z80);
        self.hw.reset_z80();
        self.m68k.reset(&mut self.hw);
    }

    /// Power cycle.
    pub fn hard_reset(&mut self) {
        info!("Hard reset");
        let bus = &mut self.hw.bus;
        let has_z80 = bus.system() != SystemKind::Pico;

        bus.mem.ram.clear();
        bus.z80_ram.clear();
        bus.arbiter.reset(has_z80);
        if let Some(cart) = bus.mem.cart.as_mut() {
            cart.reset();
        }
        bus.mem.tmss.reset();
        bus.rebuild_regions();

        bus.vdp.reset();
        bus.psg.reset();
        if let Some(ym) = bus.ym2612.as_mut() {
            ym.reset();
        }
        bus.io.reset();

        self.scheduler.reset();
        self.hw.z80.reset();
        self.m68k.reset(&mut self.hw);
    }

    /// Captures the machine state into `container`.
    pub fn zomg_save(&self, container: &mut dyn SavestateContainer) -> Result<(), SavestateError> {
        let bus = &self.hw.bus;
        let cart = bus.mem.cart.as_ref().ok_or(SavestateError::NoCartridge)?;

        container.save_blob(savestate::M68K_REGISTERS, &self.m68k.save_registers());
        container.save_blob(savestate::Z80_REGISTERS, &self.hw.z80.save_registers());
        container.save_blob(savestate::M68K_RAM, &bus.mem.ram.to_bytes());
        container.save_blob(savestate::Z80_RAM, bus.z80_ram.as_bytes());
        container.save_blob(savestate::VDP, &bus.vdp.save_state());
        container.save_blob(savestate::PSG, &bus.psg.save_state());
        if let Some(ym) = bus.ym2612.as_ref() {
            container.save_blob(savestate::YM2612, &ym.save_state());
        }
        savestate::save_pod(container, savestate::BUS_ARBITRATION, &bus.arbiter.to_block());
        container.save_blob(savestate::CARTRIDGE, &cart.save_state());
        savestate::save_pod(container, savestate::TMSS, &bus.mem.tmss.to_block());
        container.save_blob(savestate::IO, &bus.io.save_state());
        container.save_blob(savestate::FRAME_TIMING, &self.scheduler.save_state());

        debug!("Savestate captured");
        Ok(())
    }

    /// Restores a state captured by [`zomg_save`](Self::zomg_save).
    ///
    /// Nothing changes on error: every blob is looked up and size-checked
    /// first, and a device that rejects its blob rolls the machine back.
    pub fn zomg_load(&mut self, container: &dyn SavestateContainer) -> Result<(), SavestateError> {
        if self.hw.bus.mem.cart.is_none() {
            return Err(SavestateError::NoCartridge);
        }
        let has_ym = self.hw.bus.ym2612.is_some();
        let blobs = StateBlobs::read(container, has_ym)?;

        let mut previous = MemoryContainer::new();
        self.zomg_save(&mut previous)?;

        if let Err(err) = self.apply_state(&blobs) {
            warn!("Savestate rejected: {}", err);
            let restored = StateBlobs::read(&previous, has_ym).and_then(|blobs| self.apply_state(&blobs));
            if let Err(rollback) = restored {
                warn!("Previous state could not be restored: {}", rollback);
            }
            return Err(err);
        }

        debug!("Savestate restored");
        Ok(())
    }

    fn apply_state(&mut self, blobs: &StateBlobs) -> Result<(), SavestateError> {
        let bus = &mut self.hw.bus;
        savestate::accepted(bus.mem.ram.load_bytes(blobs.ram), savestate::M68K_RAM)?;
        savestate::accepted(bus.z80_ram.load_bytes(blobs.z80_ram), savestate::Z80_RAM)?;

        if let Some(cart) = bus.mem.cart.as_mut() {
            savestate::accepted(cart.load_state(blobs.cartridge), savestate::CARTRIDGE)?;
        }
        bus.mem.tmss.load_block(&blobs.tmss);
        bus.rebuild_regions();
        bus.arbiter.load_block(&blobs.arbiter);

        savestate::accepted(bus.vdp.load_state(blobs.vdp), savestate::VDP)?;
        savestate::accepted(bus.psg.load_state(blobs.psg), savestate::PSG)?;
        if let (Some(ym), Some(data)) = (bus.ym2612.as_mut(), blobs.ym2612) {
            savestate::accepted(ym.load_state(data), savestate::YM2612)?;
        }
        match blobs.io {
            Some(data) => savestate::accepted(bus.io.load_state(data), savestate::IO)?,
            None => warn!("Savestate has no I/O block, controller state kept"),
        }

        savestate::accepted(self.hw.z80.load_registers(blobs.z80_regs), savestate::Z80_REGISTERS)?;
        savestate::accepted(self.m68k.load_registers(blobs.m68k_regs), savestate::M68K_REGISTERS)?;

        match blobs.timing {
            Some(data) => savestate::accepted(self.scheduler.load_state(data), savestate::FRAME_TIMING)?,
            None => warn!("Savestate has no frame timing block"),
        }
        Ok(())
    }

    /// Writes the save memory to the configured save file if it changed.
    pub fn save_sram(&mut self) -> io::Result<usize> {
        match (self.hw.bus.mem.cart.as_mut(), self.config.sram_path.as_deref()) {
            (Some(cart), Some(path)) => cart.save_sram(path),
            _ => Ok(0),
        }
    }

    /// Samples of the last frame (interleaved L/R when stereo)
    pub fn audio_output(&self) -> &[i16] {
        &self.audio_out
    }

    // --- Settings ---

    pub fn set_region(&mut self, region: Region) {
        self.config.region = region;
        self.hw.bus.set_region(region);
        self.scheduler.set_region(region);
    }

    /// Takes effect on the next ROM load.
    pub fn set_tmss_enabled(&mut self, enabled: bool) {
        self.config.tmss_enabled = enabled;
    }

    pub fn set_tmss_rom_path(&mut self, path: Option<PathBuf>) {
        self.config.tmss_rom_path = path;
    }

    /// Takes effect on the next ROM load.
    pub fn set_auto_fix_checksum(&mut self, enabled: bool) {
        self.config.auto_fix_checksum = enabled;
    }

    pub fn set_sram_path(&mut self, path: Option<PathBuf>) {
        self.config.sram_path = path;
    }

    pub fn set_sample_rate(&mut self, sample_rate: u32) {
        self.config.sample_rate = sample_rate;
        self.scheduler.set_sample_rate(sample_rate);
    }

    pub fn set_stereo(&mut self, stereo: bool) {
        self.config.stereo = stereo;
    }

    // --- Accessors ---

    pub fn config(&self) -> &EmuConfig {
        &self.config
    }

    pub fn hardware(&self) -> &Hardware {
        &self.hw
    }

    pub fn hardware_mut(&mut self) -> &mut Hardware {
        &mut self.hw
    }

    pub fn bus(&self) -> &MdBus {
        &self.hw.bus
    }

    pub fn scheduler(&self) -> &FrameScheduler {
        &self.scheduler
    }

    pub fn cartridge(&self) -> Option<&Cartridge> {
        self.hw.bus.mem.cart.as_ref()
    }

    pub fn cartridge_mut(&mut self) -> Option<&mut Cartridge> {
        self.hw.bus.mem.cart.as_mut()
    }
}
