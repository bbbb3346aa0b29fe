// megadrive-core/src/core/cartridge/loader.rs

//! ROM image sources.
//!
//! The core only accepts plain binary images. Interleaved SMD/MGD dumps and
//! compressed archives are recognised so they can be rejected with a clear
//! error; converting them is the frontend's job.

use crate::core::error::LoadError;
use std::fs;
use std::path::Path;

/// Detected on-disk format of a ROM image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RomFormat {
    Binary,
    Smd,
    Mgd,
    Archive,
}

impl std::fmt::Display for RomFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RomFormat::Binary => write!(f, "BIN"),
            RomFormat::Smd => write!(f, "SMD"),
            RomFormat::Mgd => write!(f, "MGD"),
            RomFormat::Archive => write!(f, "archive"),
        }
    }
}

/// Source of cartridge bytes
pub trait RomImageLoader {
    fn format(&self) -> RomFormat;

    /// Size in bytes of the image as it will be delivered
    fn rom_size(&self) -> usize;

    /// Copies the image into `buf` (at most `max` bytes) and returns the count.
    fn load_into(&mut self, buf: &mut [u8], max: usize) -> Result<usize, LoadError>;
}

/// In-memory image with format sniffing
#[derive(Debug, Clone)]
pub struct FlatImageLoader {
    data: Vec<u8>,
    format: RomFormat,
}

impl FlatImageLoader {
    pub fn new(data: Vec<u8>) -> Self {
        let format = detect_format(&data);
        Self { data, format }
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, LoadError> {
        Ok(Self::new(fs::read(path)?))
    }
}

impl RomImageLoader for FlatImageLoader {
    fn format(&self) -> RomFormat {
        self.format
    }

    fn rom_size(&self) -> usize {
        self.data.len()
    }

    fn load_into(&mut self, buf: &mut [u8], max: usize) -> Result<usize, LoadError> {
        let count = self.data.len().min(max).min(buf.len());
        buf[..count].copy_from_slice(&self.data[..count]);
        Ok(count)
    }
}

fn detect_format(data: &[u8]) -> RomFormat {
    if data.starts_with(b"PK\x03\x04") || data.starts_with(&[0x1F, 0x8B]) || data.starts_with(b"7z\xBC\xAF") {
        return RomFormat::Archive;
    }

    // A plain image carries "SEGA" at $100; do not second-guess it.
    if data.len() >= 0x104 && &data[0x100..0x104] == b"SEGA" {
        return RomFormat::Binary;
    }

    // SMD: 512-byte header, 16 KB interleaved blocks, $AA $BB signature.
    if data.len() > 512 && data.len() % 16384 == 512 && data[8] == 0xAA && data[9] == 0xBB {
        return RomFormat::Smd;
    }

    // MGD: odd bytes first, "EA" from "SEGA" lands at the middle of the file.
    let half = data.len() / 2;
    if data.len() >= 0x200 && data.len() % 2 == 0 && data.get(half + 0x80..half + 0x82) == Some(b"EA".as_slice()) {
        return RomFormat::Mgd;
    }

    RomFormat::Binary
}
