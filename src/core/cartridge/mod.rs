// megadrive-core/src/core/cartridge/mod.rs

//! Cartridge: ROM image, mapper bank table, save memory and header checksum.

pub mod eeprom;
pub mod image;
pub mod loader;
pub mod mapper;
pub mod sram;

pub use eeprom::{CartEeprom, EepromI2c, I2cChip};
pub use image::{CartridgeImage, RomHeader, BANK_SIZE, MAX_ROM_SIZE};
pub use loader::{FlatImageLoader, RomFormat, RomImageLoader};
pub use mapper::{BankTable, BankType, FixupTable, MapperConfig, MapperType, RomIdentity, SramOverride};
pub use sram::Sram;

use crate::core::config::SystemKind;
use crate::core::error::LoadError;
use crate::core::memory::{BusWidth, ADDRESS_MASK};
use log::{info, trace, warn};
use mapper::FixedRegister;
use sram::{SRAM_DEFAULT_END, SRAM_DEFAULT_START};
use std::io;
use std::path::Path;

/// Offset of the header checksum word
pub const CHECKSUM_OFFSET: usize = 0x18E;

/// First byte covered by the header checksum
pub const CHECKSUM_START: usize = 0x200;

/// Sega additive checksum over the image from $200
fn image_checksum(image: &CartridgeImage) -> u16 {
    (CHECKSUM_START..image.size())
        .step_by(2)
        .fold(0u16, |sum, offset| sum.wrapping_add(image.word(offset)))
}

/// Save memory fitted to the cartridge (never both kinds)
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveMemory {
    None,
    Sram(Sram),
    Eeprom(CartEeprom),
}

impl SaveMemory {
    fn tag(&self) -> u8 {
        match self {
            SaveMemory::None => 0,
            SaveMemory::Sram(_) => 1,
            SaveMemory::Eeprom(_) => 2,
        }
    }
}

impl std::fmt::Display for SaveMemory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SaveMemory::None => write!(f, "none"),
            SaveMemory::Sram(s) if s.is_disabled() => write!(f, "SRAM (forced off)"),
            SaveMemory::Sram(s) => write!(f, "SRAM ${:06X}-${:06X}", s.start(), s.end()),
            SaveMemory::Eeprom(e) => write!(f, "EEPROM {}", e.chip.chip()),
        }
    }
}

/// Loaded cartridge
#[derive(Debug, Clone)]
pub struct Cartridge {
    image: CartridgeImage,
    header: RomHeader,
    crc32: u32,
    system: SystemKind,
    fixup: MapperConfig,
    banks: BankTable,
    save: SaveMemory,
    original_checksum: u16,
}

impl Cartridge {
    /// Loads an image and resolves mapper and save memory for it.
    pub fn load_image(
        loader: &mut dyn RomImageLoader,
        system: SystemKind,
        fixups: &FixupTable,
    ) -> Result<Self, LoadError> {
        let format = loader.format();
        if format != RomFormat::Binary {
            return Err(LoadError::UnsupportedFormat(format));
        }

        let size = loader.rom_size();
        if size == 0 {
            return Err(LoadError::Empty);
        }
        if size > MAX_ROM_SIZE {
            return Err(LoadError::RomTooLarge { size, max: MAX_ROM_SIZE });
        }

        let mut image = CartridgeImage::with_size(size);
        let actual = loader.load_into(image.bytes_mut(), size)?;
        if actual != size {
            return Err(LoadError::SizeMismatch { expected: size, actual });
        }
        image.convert_to_host();

        Ok(Self::from_image(image, system, fixups))
    }

    /// Builds a cartridge around an already converted image.
    pub fn from_image(image: CartridgeImage, system: SystemKind, fixups: &FixupTable) -> Self {
        let header = RomHeader::parse(&image);
        let crc32 = image.crc32();
        let system = header.system_kind(system);
        let rom = RomIdentity {
            serial: &header.serial,
            checksum: header.checksum,
            computed_checksum: image_checksum(&image),
            crc32,
        };
        let fixup = fixups.lookup(&rom).map(|e| e.config.clone()).unwrap_or_default();

        let mut cart = Self {
            original_checksum: header.checksum,
            image,
            header,
            crc32,
            system,
            fixup,
            banks: BankTable::new(),
            save: SaveMemory::None,
        };
        cart.init_mapper();
        cart.init_save_memory();

        info!(
            "ROM loaded: {} bytes, CRC32 {:08X}, {} mapper, save memory: {}",
            cart.image.size(),
            cart.crc32,
            cart.banks.mapper(),
            cart.save
        );
        cart
    }

    fn resolve_mapper(&self) -> MapperType {
        if let Some(mapper) = self.fixup.mapper {
            mapper
        } else if self.header.console.starts_with("SEGA SSF") {
            MapperType::Ssf2
        } else if !self.fixup.registers.is_empty() {
            MapperType::FixedRegisters
        } else {
            MapperType::Flat
        }
    }

    /// Rebuilds the bank table from scratch.
    pub fn init_mapper(&mut self) {
        let mapper = self.resolve_mapper();
        self.banks
            .init(mapper, self.image.bank_count(), self.system == SystemKind::Mars32X);
    }

    /// Chooses between EEPROM, SRAM or nothing.
    pub fn init_save_memory(&mut self) {
        self.save = if self.system == SystemKind::Pico {
            SaveMemory::None
        } else if let Some(entry) = eeprom::detect_eeprom(&self.header.serial, self.header.checksum) {
            SaveMemory::Eeprom(CartEeprom::new(entry))
        } else {
            SaveMemory::Sram(self.build_sram())
        };
    }

    fn build_sram(&self) -> Sram {
        let (start, end) = match self.fixup.sram {
            Some(SramOverride::ForceOff) => return Sram::disabled(),
            Some(SramOverride::Range { start, end }) => (start, end),
            None => match self.header.sram {
                Some(info) if info.start <= ADDRESS_MASK && info.end <= ADDRESS_MASK => (info.start, info.end),
                _ => (SRAM_DEFAULT_START, SRAM_DEFAULT_END),
            },
        };
        // Mapped in from power-on only when it does not overlap the ROM
        let on = self.image.size() <= (start & !1) as usize;
        Sram::new(start, end, on)
    }

    /// Loads the save file for the active save memory. Returns bytes loaded.
    pub fn init_sram(&mut self, path: Option<&Path>) -> usize {
        let Some(path) = path else {
            return 0;
        };

        let result = match &mut self.save {
            SaveMemory::None => return 0,
            SaveMemory::Sram(sram) if sram.is_disabled() => return 0,
            SaveMemory::Sram(sram) => sram.load_from_file(path),
            SaveMemory::Eeprom(eeprom) => std::fs::read(path).map(|data| eeprom.chip.load_memory(&data)),
        };

        match result {
            Ok(count) => count,
            Err(err) if err.kind() == io::ErrorKind::NotFound => 0,
            Err(err) => {
                warn!("Could not read save file {}: {}", path.display(), err);
                0
            }
        }
    }

    /// Writes the save file if the save memory changed. Returns bytes written.
    pub fn save_sram(&mut self, path: &Path) -> io::Result<usize> {
        match &mut self.save {
            SaveMemory::Sram(sram) if sram.is_dirty() => sram.save_to_file(path),
            SaveMemory::Eeprom(eeprom) if eeprom.chip.is_dirty() => {
                std::fs::write(path, eeprom.chip.memory())?;
                eeprom.chip.clear_dirty();
                info!("EEPROM written: {} bytes", eeprom.chip.memory().len());
                Ok(eeprom.chip.memory().len())
            }
            _ => Ok(0),
        }
    }

    pub fn is_save_dirty(&self) -> bool {
        match &self.save {
            SaveMemory::Sram(sram) => sram.is_dirty(),
            SaveMemory::Eeprom(eeprom) => eeprom.chip.is_dirty(),
            SaveMemory::None => false,
        }
    }

    /// Sega additive checksum over $200 to the end of the image
    pub fn checksum_compute(&self) -> u16 {
        image_checksum(&self.image)
    }

    /// Header checksum word as currently stored in the image
    pub fn checksum_in_image(&self) -> u16 {
        self.image.word(CHECKSUM_OFFSET)
    }

    /// Writes the computed checksum into the header. Returns false when the
    /// fixup table forbids patching.
    pub fn checksum_fix(&mut self) -> bool {
        if self.fixup.no_checksum || self.image.size() < CHECKSUM_OFFSET + 2 {
            return false;
        }
        let sum = self.checksum_compute();
        self.image.write_word(CHECKSUM_OFFSET, sum);
        true
    }

    /// Puts back the checksum found at load time.
    pub fn checksum_restore(&mut self) {
        if self.image.size() >= CHECKSUM_OFFSET + 2 {
            self.image.write_word(CHECKSUM_OFFSET, self.original_checksum);
        }
    }

    #[inline]
    fn read_rom<W: BusWidth>(&self, addr: u32) -> W {
        match self.banks.resolve(addr) {
            BankType::Cartridge(bank) | BankType::Ssf2(bank) => {
                let bank = bank as usize;
                if bank >= self.image.bank_count() {
                    W::fill()
                } else {
                    self.image.read::<W>(bank * BANK_SIZE + (addr as usize & (BANK_SIZE - 1)))
                }
            }
            BankType::FixedRegisters => self.read_register::<W>(addr),
            BankType::Unused => {
                trace!("Read from unmapped cartridge window ${:06X}", addr);
                W::fill()
            }
        }
    }

    fn read_register<W: BusWidth>(&self, addr: u32) -> W {
        let word_addr = addr & !1;
        let Some(reg) = self.fixup.registers.iter().find(|r: &&FixedRegister| r.matches(word_addr)) else {
            return W::fill();
        };
        let value = match W::BYTES {
            2 => reg.value,
            _ if addr & 1 != 0 => reg.value & 0xFF,
            _ => reg.value >> 8,
        };
        W::from(value).unwrap_or_else(W::fill)
    }

    pub fn read_byte(&self, addr: u32) -> u8 {
        let addr = addr & ADDRESS_MASK;
        match &self.save {
            SaveMemory::Sram(sram) if sram.contains(addr) => sram.read_byte(addr),
            SaveMemory::Eeprom(eeprom) if eeprom.handles_read(addr) => eeprom.read_byte(addr),
            _ => self.read_rom::<u8>(addr),
        }
    }

    pub fn read_word(&self, addr: u32) -> u16 {
        let addr = addr & ADDRESS_MASK & !1;
        match &self.save {
            SaveMemory::Sram(sram) if sram.contains(addr) => sram.read_word(addr),
            SaveMemory::Eeprom(eeprom) if eeprom.handles_read_word(addr) => eeprom.read_word(addr),
            _ => self.read_rom::<u16>(addr),
        }
    }

    pub fn write_byte(&mut self, addr: u32, value: u8) {
        let addr = addr & ADDRESS_MASK;
        match &mut self.save {
            SaveMemory::Sram(sram) if sram.contains(addr) => sram.write_byte(addr, value),
            SaveMemory::Eeprom(eeprom) if eeprom.handles_write(addr) => eeprom.write_byte(addr, value),
            _ => trace!("Cartridge write ignored: ${:06X} = ${:02X}", addr, value),
        }
    }

    pub fn write_word(&mut self, addr: u32, value: u16) {
        let addr = addr & ADDRESS_MASK & !1;
        match &mut self.save {
            SaveMemory::Sram(sram) if sram.contains(addr) => sram.write_word(addr, value),
            SaveMemory::Eeprom(eeprom) if eeprom.handles_write_word(addr) => eeprom.write_word(addr, value),
            _ => trace!("Cartridge write ignored: ${:06X} = ${:04X}", addr, value),
        }
    }

    /// Mapper registers at $A130F1-$A130FF (odd bytes)
    pub fn write_time_register(&mut self, addr: u32, value: u8) {
        match addr & 0xFF {
            0xF1 => {
                if let SaveMemory::Sram(sram) = &mut self.save {
                    sram.write_control(value);
                }
            }
            reg @ 0xF3..=0xFF if reg & 1 != 0 => {
                let window = ((reg & 0x0F) >> 1) as usize;
                self.banks.ssf2_select(window, value, self.image.bank_count());
            }
            _ => trace!("Ignored /TIME write ${:06X} = ${:02X}", addr, value),
        }
    }

    /// 32X ROM bank register
    pub fn set_mars_bank(&mut self, bank: u8) {
        self.banks.set_mars_bank(bank);
    }

    /// Hard reset: identity banks, EEPROM lines idle, SRAM control back to power-on.
    pub fn reset(&mut self) {
        self.banks.reset_banks();
        match &mut self.save {
            SaveMemory::Eeprom(eeprom) => eeprom.chip.reset(),
            SaveMemory::Sram(sram) if !sram.is_disabled() => {
                let on = self.image.size() <= sram.start() as usize;
                sram.write_control(on as u8);
            }
            _ => {}
        }
    }

    pub fn image(&self) -> &CartridgeImage {
        &self.image
    }

    pub fn header(&self) -> &RomHeader {
        &self.header
    }

    pub fn crc32(&self) -> u32 {
        self.crc32
    }

    pub fn system(&self) -> SystemKind {
        self.system
    }

    pub fn mapper(&self) -> MapperType {
        self.banks.mapper()
    }

    pub fn bank_table(&self) -> &BankTable {
        &self.banks
    }

    pub fn save_memory(&self) -> &SaveMemory {
        &self.save
    }

    pub fn fixup(&self) -> &MapperConfig {
        &self.fixup
    }

    pub fn save_state(&self) -> Vec<u8> {
        let banks = self.banks.save_state();
        let mut state = Vec::with_capacity(banks.len() + 1);
        state.push(banks.len() as u8);
        state.extend_from_slice(&banks);
        state.push(self.save.tag());
        match &self.save {
            SaveMemory::Sram(sram) => state.extend_from_slice(&sram.save_state()),
            SaveMemory::Eeprom(eeprom) => state.extend_from_slice(&eeprom.chip.save_state()),
            SaveMemory::None => {}
        }
        state
    }

    pub fn load_state(&mut self, data: &[u8]) -> bool {
        let Some((&bank_len, rest)) = data.split_first() else {
            return false;
        };
        let bank_len = bank_len as usize;
        if rest.len() < bank_len + 1 {
            return false;
        }
        let (banks, rest) = rest.split_at(bank_len);
        let (&tag, save) = match rest.split_first() {
            Some(split) => split,
            None => return false,
        };
        if tag != self.save.tag() || !self.banks.load_state(banks) {
            return false;
        }

        match &mut self.save {
            SaveMemory::Sram(sram) => sram.load_state(save),
            SaveMemory::Eeprom(eeprom) => eeprom.chip.load_state(save),
            SaveMemory::None => true,
        }
    }
}
