//! Battery-backed save RAM.
//! Mapped over a cartridge address range, 64 KB at most, enabled through
//! bit 0 of $A130F1 and write-protected through bit 1.

use crate::core::memory::ADDRESS_MASK;
use log::{debug, info};
use std::fs;
use std::io;
use std::path::Path;

/// Largest SRAM window
pub const SRAM_SIZE: usize = 0x10000;

/// Range used when the header has no "RA" block
pub const SRAM_DEFAULT_START: u32 = 0x200000;
pub const SRAM_DEFAULT_END: u32 = 0x20FFFF;

/// Save RAM
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sram {
    data: Vec<u8>,
    start: u32,
    end: u32,
    on: bool,
    write_enabled: bool,
    dirty: bool,
}

impl Sram {
    /// SRAM over `start..=end`, widened to whole words and clamped to 64 KB
    /// inside the 24-bit address space.
    pub fn new(start: u32, end: u32, on: bool) -> Self {
        let (start, end) = (start & ADDRESS_MASK, end & ADDRESS_MASK);
        let (start, end) = if start > end { (end, start) } else { (start, end) };
        let start = start & !1;
        let end = (end | 1).min(start.saturating_add(SRAM_SIZE as u32 - 1));

        Self {
            data: vec![0xFF; SRAM_SIZE],
            start,
            end,
            on,
            write_enabled: true,
            dirty: false,
        }
    }

    /// Forced-off SRAM: the empty range start=1, end=0.
    pub fn disabled() -> Self {
        Self {
            data: Vec::new(),
            start: 1,
            end: 0,
            on: false,
            write_enabled: false,
            dirty: false,
        }
    }

    pub fn is_disabled(&self) -> bool {
        self.start > self.end
    }

    pub fn start(&self) -> u32 {
        self.start
    }

    pub fn end(&self) -> u32 {
        self.end
    }

    pub fn is_on(&self) -> bool {
        self.on
    }

    pub fn is_write_enabled(&self) -> bool {
        self.write_enabled
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// True when `addr` currently hits the SRAM
    #[inline]
    pub fn contains(&self, addr: u32) -> bool {
        self.on && addr >= self.start && addr <= self.end
    }

    #[inline]
    fn offset(&self, addr: u32) -> usize {
        (addr.wrapping_sub(self.start) as usize) & (SRAM_SIZE - 1)
    }

    pub fn read_byte(&self, addr: u32) -> u8 {
        self.data.get(self.offset(addr)).copied().unwrap_or(0xFF)
    }

    pub fn read_word(&self, addr: u32) -> u16 {
        let addr = addr & !1;
        ((self.read_byte(addr) as u16) << 8) | self.read_byte(addr + 1) as u16
    }

    pub fn write_byte(&mut self, addr: u32, value: u8) {
        if !self.write_enabled {
            return;
        }
        let offset = self.offset(addr);
        if let Some(byte) = self.data.get_mut(offset) {
            if *byte != value {
                *byte = value;
                self.dirty = true;
            }
        }
    }

    pub fn write_word(&mut self, addr: u32, value: u16) {
        let addr = addr & !1;
        self.write_byte(addr, (value >> 8) as u8);
        self.write_byte(addr + 1, value as u8);
    }

    /// $A130F1: bit 0 maps SRAM in, bit 1 write-protects it.
    pub fn write_control(&mut self, value: u8) {
        if self.is_disabled() {
            return;
        }
        self.on = value & 1 != 0;
        self.write_enabled = value & 2 == 0;
        debug!("SRAM control: on={} write={}", self.on, self.write_enabled);
    }

    /// Bytes that make up a save file
    pub fn contents(&self) -> &[u8] {
        let len = if self.is_disabled() {
            0
        } else {
            (self.end - self.start + 1) as usize
        };
        &self.data[..len.min(self.data.len())]
    }

    /// Loads a save file, returns the bytes read.
    pub fn load_from_file<P: AsRef<Path>>(&mut self, path: P) -> io::Result<usize> {
        if self.is_disabled() {
            return Ok(0);
        }
        let bytes = fs::read(path.as_ref())?;
        let count = bytes.len().min(self.data.len());
        self.data[..count].copy_from_slice(&bytes[..count]);
        self.dirty = false;
        info!("Save RAM loaded: {} bytes", count);
        Ok(count)
    }

    /// Writes the save file
    pub fn save_to_file<P: AsRef<Path>>(&mut self, path: P) -> io::Result<usize> {
        let contents = self.contents();
        let count = contents.len();
        fs::write(path.as_ref(), contents)?;
        self.dirty = false;
        info!("Save RAM written: {} bytes", count);
        Ok(count)
    }

    pub fn save_state(&self) -> Vec<u8> {
        let mut state = Vec::with_capacity(2 + self.data.len());
        state.push(self.on as u8);
        state.push(self.write_enabled as u8);
        state.extend_from_slice(&self.data);
        state
    }

    pub fn load_state(&mut self, data: &[u8]) -> bool {
        if data.len() != 2 + self.data.len() {
            return false;
        }
        self.on = data[0] != 0;
        self.write_enabled = data[1] != 0;
        self.data.copy_from_slice(&data[2..]);
        true
    }
}
