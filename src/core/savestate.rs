// megadrive-core/src/core/savestate.rs

//! Savestate contract.
//!
//! The core only knows which blobs make up the machine state and what goes
//! into them. How they are stored (ZIP, single file, memory) belongs to the
//! [`SavestateContainer`] implementation.

use crate::core::error::SavestateError;
use bytemuck::Pod;
use std::collections::BTreeMap;

pub const M68K_REGISTERS: &str = "M68K registers";
pub const Z80_REGISTERS: &str = "Z80 registers";
pub const M68K_RAM: &str = "M68K RAM";
pub const Z80_RAM: &str = "Z80 RAM";
pub const VDP: &str = "VDP";
pub const PSG: &str = "PSG";
pub const YM2612: &str = "YM2612";
pub const BUS_ARBITRATION: &str = "Bus arbitration";
pub const CARTRIDGE: &str = "Cartridge";
pub const TMSS: &str = "TMSS";
pub const IO: &str = "I/O";
pub const FRAME_TIMING: &str = "Frame timing";

/// Named-blob storage
pub trait SavestateContainer {
    fn save_blob(&mut self, name: &str, data: &[u8]);
    fn load_blob(&self, name: &str) -> Option<&[u8]>;
}

/// In-memory container
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryContainer {
    blobs: BTreeMap<String, Vec<u8>>,
}

impl MemoryContainer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.blobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blobs.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.blobs.keys().map(String::as_str)
    }

    pub fn remove(&mut self, name: &str) -> Option<Vec<u8>> {
        self.blobs.remove(name)
    }
}

impl SavestateContainer for MemoryContainer {
    fn save_blob(&mut self, name: &str, data: &[u8]) {
        self.blobs.insert(name.to_owned(), data.to_vec());
    }

    fn load_blob(&self, name: &str) -> Option<&[u8]> {
        self.blobs.get(name).map(Vec::as_slice)
    }
}

/// Fetches a blob that must exist.
pub fn require<'a>(container: &'a dyn SavestateContainer, name: &'static str) -> Result<&'a [u8], SavestateError> {
    container.load_blob(name).ok_or(SavestateError::MissingBlob(name))
}

/// Stores a fixed-layout block.
pub fn save_pod<T: Pod>(container: &mut dyn SavestateContainer, name: &str, block: &T) {
    container.save_blob(name, bytemuck::bytes_of(block));
}

/// Reads a fixed-layout block.
pub fn load_pod<T: Pod>(container: &dyn SavestateContainer, name: &'static str) -> Result<T, SavestateError> {
    let data = require(container, name)?;
    bytemuck::try_pod_read_unaligned(data).map_err(|_| SavestateError::Truncated { name })
}

/// Maps a device `load_state` result to an error.
pub fn accepted(ok: bool, name: &'static str) -> Result<(), SavestateError> {
    if ok {
        Ok(())
    } else {
        Err(SavestateError::Rejected { name })
    }
}
