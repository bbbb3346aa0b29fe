//! Work RAM of both CPUs.

use crate::core::memory::{self, BusWidth};

/// 68000 work RAM size
pub const WORK_RAM_SIZE: usize = 0x10000;

/// Z80 RAM size
pub const Z80_RAM_SIZE: usize = 0x2000;

/// 64 KB 68000 RAM, host order, mirrored over $E00000-$FFFFFF
#[derive(Clone, PartialEq, Eq)]
pub struct WorkRam {
    data: Box<[u8]>,
}

impl WorkRam {
    pub fn new() -> Self {
        Self {
            data: vec![0; WORK_RAM_SIZE].into_boxed_slice(),
        }
    }

    #[inline]
    pub fn read<W: BusWidth>(&self, addr: u32) -> W {
        W::read_host(&self.data, addr as usize & (WORK_RAM_SIZE - 1))
    }

    #[inline]
    pub fn write<W: BusWidth>(&mut self, addr: u32, value: W) {
        W::write_host(&mut self.data, addr as usize & (WORK_RAM_SIZE - 1), value);
    }

    pub fn clear(&mut self) {
        self.data.fill(0);
    }

    /// Contents in big-endian byte order
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = self.data.to_vec();
        memory::from_host_order(&mut bytes);
        bytes
    }

    pub fn load_bytes(&mut self, bytes: &[u8]) -> bool {
        if bytes.len() != WORK_RAM_SIZE {
            return false;
        }
        self.data.copy_from_slice(bytes);
        memory::to_host_order(&mut self.data);
        true
    }
}

impl Default for WorkRam {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for WorkRam {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkRam").finish_non_exhaustive()
    }
}

/// 8 KB Z80 RAM (byte wide)
#[derive(Clone, PartialEq, Eq)]
pub struct Z80Ram {
    data: Box<[u8]>,
}

impl Z80Ram {
    pub fn new() -> Self {
        Self {
            data: vec![0; Z80_RAM_SIZE].into_boxed_slice(),
        }
    }

    #[inline]
    pub fn read(&self, addr: u32) -> u8 {
        self.data[addr as usize & (Z80_RAM_SIZE - 1)]
    }

    #[inline]
    pub fn write(&mut self, addr: u32, value: u8) {
        self.data[addr as usize & (Z80_RAM_SIZE - 1)] = value;
    }

    pub fn clear(&mut self) {
        self.data.fill(0);
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn load_bytes(&mut self, bytes: &[u8]) -> bool {
        if bytes.len() != Z80_RAM_SIZE {
            return false;
        }
        self.data.copy_from_slice(bytes);
        true
    }
}

impl Default for Z80Ram {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Z80Ram {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Z80Ram").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_work_ram_mirroring() {
        let mut ram = WorkRam::new();
        ram.write::<u16>(0xFF0000, 0x1234);
        assert_eq!(ram.read::<u16>(0xE00000), 0x1234);
        assert_eq!(ram.read::<u8>(0xFF0001), 0x34);
    }

    #[test]
    fn test_work_ram_bytes_are_big_endian() {
        let mut ram = WorkRam::new();
        ram.write::<u16>(0, 0xABCD);
        let bytes = ram.to_bytes();
        assert_eq!(&bytes[..2], &[0xAB, 0xCD]);

        let mut other = WorkRam::new();
        assert!(other.load_bytes(&bytes));
        assert_eq!(other.read::<u16>(0), 0xABCD);
    }

    #[test]
    fn test_z80_ram_mirror() {
        let mut ram = Z80Ram::new();
        ram.write(0x2005, 0x42);
        assert_eq!(ram.read(0x0005), 0x42);
        assert_eq!(ram.read(0x3FFF), ram.read(0x1FFF));
    }
}
