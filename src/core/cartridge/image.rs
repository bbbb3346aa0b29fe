// megadrive-core/src/core/cartridge/image.rs

//! Cartridge image storage and header parsing.

use crate::core::config::SystemKind;
use crate::core::memory::{self, BusWidth};
use bytemuck::{Pod, Zeroable};

/// Size of one mapper bank (and the image size granularity)
pub const BANK_SIZE: usize = 0x80000;

/// Largest image the core accepts
pub const MAX_ROM_SIZE: usize = 32 * 1024 * 1024;

/// 16-byte aligned storage unit for ROM data
#[repr(C, align(16))]
#[derive(Clone, Copy, Pod, Zeroable)]
pub struct AlignedBlock(pub [u8; 16]);

const BLOCK_SIZE: usize = std::mem::size_of::<AlignedBlock>();

/// ROM image in host order, padded to a whole number of banks
#[derive(Clone)]
pub struct CartridgeImage {
    blocks: Vec<AlignedBlock>,
    size: usize,
}

impl CartridgeImage {
    /// Zeroed image holding `size` logical bytes.
    pub fn with_size(size: usize) -> Self {
        let padded = size.max(1).div_ceil(BANK_SIZE) * BANK_SIZE;
        Self {
            blocks: vec![AlignedBlock::zeroed(); padded / BLOCK_SIZE],
            size,
        }
    }

    /// Builds an image from big-endian ROM bytes.
    pub fn from_bytes(data: &[u8]) -> Self {
        let mut image = Self::with_size(data.len());
        image.bytes_mut()[..data.len()].copy_from_slice(data);
        image.convert_to_host();
        image
    }

    /// Logical size (bytes delivered by the loader)
    pub fn size(&self) -> usize {
        self.size
    }

    /// Allocated size, a multiple of [`BANK_SIZE`]
    pub fn padded_size(&self) -> usize {
        self.blocks.len() * BLOCK_SIZE
    }

    pub fn bank_count(&self) -> usize {
        self.padded_size() / BANK_SIZE
    }

    pub fn bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.blocks)
    }

    pub fn bytes_mut(&mut self) -> &mut [u8] {
        bytemuck::cast_slice_mut(&mut self.blocks)
    }

    /// Converts freshly loaded big-endian data to host order.
    pub(crate) fn convert_to_host(&mut self) {
        memory::to_host_order(self.bytes_mut());
    }

    /// Reads at a linear image offset; outside the padded image returns fill.
    #[inline]
    pub fn read<W: BusWidth>(&self, offset: usize) -> W {
        if offset + W::BYTES <= self.padded_size() {
            W::read_host(self.bytes(), offset)
        } else {
            W::fill()
        }
    }

    /// Big-endian word at an even offset
    pub fn word(&self, offset: usize) -> u16 {
        self.read::<u16>(offset)
    }

    pub fn write_word(&mut self, offset: usize, value: u16) {
        if offset + 2 <= self.padded_size() {
            u16::write_host(self.bytes_mut(), offset, value);
        }
    }

    /// Big-endian long at an even offset
    pub fn long(&self, offset: usize) -> u32 {
        ((self.word(offset) as u32) << 16) | self.word(offset + 2) as u32
    }

    /// Copies `len` bytes starting at `offset` into big-endian order.
    pub fn read_bytes(&self, offset: usize, len: usize) -> Vec<u8> {
        (offset..offset + len).map(|a| self.read::<u8>(a)).collect()
    }

    /// CRC32 of the logical image in big-endian byte order
    pub fn crc32(&self) -> u32 {
        let mut hasher = crc32fast::Hasher::new();
        let mut chunk = [0u8; BLOCK_SIZE];
        for (i, block) in self.blocks.iter().enumerate() {
            let start = i * BLOCK_SIZE;
            if start >= self.size {
                break;
            }
            chunk.copy_from_slice(&block.0);
            memory::from_host_order(&mut chunk);
            let len = (self.size - start).min(BLOCK_SIZE);
            hasher.update(&chunk[..len]);
        }
        hasher.finalize()
    }
}

impl std::fmt::Debug for CartridgeImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CartridgeImage")
            .field("size", &self.size)
            .field("padded_size", &self.padded_size())
            .finish()
    }
}

/// Battery RAM descriptor found at $1B0
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SramInfo {
    pub flags: u16,
    pub start: u32,
    pub end: u32,
}

/// Parsed cartridge header ($100-$1FF)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RomHeader {
    pub console: String,
    pub copyright: String,
    pub title_domestic: String,
    pub title_overseas: String,
    pub serial: String,
    pub checksum: u16,
    pub io_support: String,
    pub rom_start: u32,
    pub rom_end: u32,
    pub sram: Option<SramInfo>,
    pub region_codes: String,
}

fn header_text(image: &CartridgeImage, offset: usize, len: usize) -> String {
    image
        .read_bytes(offset, len)
        .iter()
        .map(|&b| if b.is_ascii_graphic() || b == b' ' { b as char } else { ' ' })
        .collect::<String>()
        .trim_end()
        .to_string()
}

impl RomHeader {
    pub fn parse(image: &CartridgeImage) -> Self {
        let sram = if image.read_bytes(0x1B0, 2) == b"RA" {
            Some(SramInfo {
                flags: image.word(0x1B2),
                start: image.long(0x1B4),
                end: image.long(0x1B8),
            })
        } else {
            None
        };

        Self {
            console: header_text(image, 0x100, 16),
            copyright: header_text(image, 0x110, 16),
            title_domestic: header_text(image, 0x120, 48),
            title_overseas: header_text(image, 0x150, 48),
            // Raw serial keeps its padding: fixup serials are compared by prefix.
            serial: image.read_bytes(0x180, 14).iter().map(|&b| b as char).collect(),
            checksum: image.word(0x18E),
            io_support: header_text(image, 0x190, 16),
            rom_start: image.long(0x1A0),
            rom_end: image.long(0x1A4),
            sram,
            region_codes: header_text(image, 0x1F0, 3),
        }
    }

    /// Refines the configured system from the console name.
    pub fn system_kind(&self, configured: SystemKind) -> SystemKind {
        if self.console.starts_with("SEGA PICO") {
            SystemKind::Pico
        } else if self.console.contains("32X") {
            SystemKind::Mars32X
        } else {
            configured
        }
    }
}
