// megadrive-core/src/core/config.rs

//! Emulator configuration.
//!
//! Everything that used to be process-wide state (region, TMSS switch,
//! checksum auto-fix, sample rate) lives here and is handed to the
//! [`EmulationContext`](crate::core::context::EmulationContext).

use crate::core::error::ConfigError;
use log::info;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Console region
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Region {
    NtscJapan,
    #[default]
    NtscUsa,
    PalEurope,
    PalJapan,
}

impl Region {
    pub fn is_pal(self) -> bool {
        matches!(self, Region::PalEurope | Region::PalJapan)
    }

    /// Bits 7 (overseas) and 6 (PAL) of the version register
    pub fn version_bits(self) -> u8 {
        match self {
            Region::NtscJapan => 0x00,
            Region::NtscUsa => 0x80,
            Region::PalEurope => 0xC0,
            Region::PalJapan => 0x40,
        }
    }
}

impl std::fmt::Display for Region {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Region::NtscJapan => write!(f, "NTSC-J"),
            Region::NtscUsa => write!(f, "NTSC-U"),
            Region::PalEurope => write!(f, "PAL-E"),
            Region::PalJapan => write!(f, "PAL-J"),
        }
    }
}

/// Hardware variant the cartridge runs on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum SystemKind {
    #[default]
    MegaDrive,
    Pico,
    Mars32X,
}

impl std::fmt::Display for SystemKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SystemKind::MegaDrive => write!(f, "Mega Drive"),
            SystemKind::Pico => write!(f, "Pico"),
            SystemKind::Mars32X => write!(f, "32X"),
        }
    }
}

/// Emulator configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmuConfig {
    pub region: Region,
    pub system: SystemKind,
    pub tmss_enabled: bool,
    pub tmss_rom_path: Option<PathBuf>,
    pub sram_path: Option<PathBuf>,
    pub auto_fix_checksum: bool,
    pub sample_rate: u32,
    pub stereo: bool,
}

impl EmuConfig {
    pub fn new() -> Self {
        Self {
            region: Region::NtscUsa,
            system: SystemKind::MegaDrive,
            tmss_enabled: false,
            tmss_rom_path: None,
            sram_path: None,
            auto_fix_checksum: false,
            sample_rate: 44100,
            stereo: true,
        }
    }

    /// Reads a JSON configuration file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path.as_ref())?;
        let config = serde_json::from_str(&text)?;
        info!("Configuration loaded from {}", path.as_ref().display());
        Ok(config)
    }

    /// Writes the configuration as pretty-printed JSON
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let text = serde_json::to_string_pretty(self)?;
        fs::write(path.as_ref(), text)?;
        Ok(())
    }
}

impl Default for EmuConfig {
    fn default() -> Self {
        Self::new()
    }
}
