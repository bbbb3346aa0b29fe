//! Mega Drive memory system.
//! Routes the 24-bit M68K bus and the 16-bit Z80 bus to cartridge, RAM,
//! VDP ports, I/O registers and sound chips.

pub mod bus;
pub mod map;
pub mod ram;
pub mod z80_bus;

// Re-exports
pub use bus::{MainMemory, MdBus};
pub use map::{MemRegion, RegionTable};
pub use ram::{WorkRam, Z80Ram};
pub use z80_bus::{Z80Region, Z80_REGIONS};

use cfg_if::cfg_if;
use num_traits::{Bounded, PrimInt};

/// Valid address mask for the M68K bus (24-bit = 16 MB)
pub const ADDRESS_MASK: u32 = 0x00FF_FFFF;

/// Valid address mask for the Z80 bus
pub const Z80_ADDRESS_MASK: u32 = 0xFFFF;

cfg_if! {
    if #[cfg(target_endian = "little")] {
        /// XOR applied to byte addresses of host-order 16-bit memory.
        pub const BYTE_SWAP: usize = 1;
    } else {
        pub const BYTE_SWAP: usize = 0;
    }
}

/// Access width of a bus cycle. Implemented for `u8` and `u16`.
///
/// Memory that is 16-bit native (ROM, work RAM, boot ROM) is stored in host
/// order: each big-endian word is kept as a native `u16`, so byte accesses
/// need the [`BYTE_SWAP`] adjustment while word accesses read directly.
pub trait BusWidth: PrimInt + Bounded {
    const BYTES: usize;

    /// Reads from host-order storage at logical (big-endian) address `addr`.
    fn read_host(buf: &[u8], addr: usize) -> Self;

    /// Writes into host-order storage at logical address `addr`.
    fn write_host(buf: &mut [u8], addr: usize, value: Self);

    /// Value returned by unmapped or invalid accesses (0xFF / 0xFFFF).
    #[inline]
    fn fill() -> Self {
        Self::max_value()
    }
}

impl BusWidth for u8 {
    const BYTES: usize = 1;

    #[inline]
    fn read_host(buf: &[u8], addr: usize) -> Self {
        buf[addr ^ BYTE_SWAP]
    }

    #[inline]
    fn write_host(buf: &mut [u8], addr: usize, value: Self) {
        buf[addr ^ BYTE_SWAP] = value;
    }
}

impl BusWidth for u16 {
    const BYTES: usize = 2;

    #[inline]
    fn read_host(buf: &[u8], addr: usize) -> Self {
        let a = addr & !1;
        u16::from_ne_bytes([buf[a], buf[a + 1]])
    }

    #[inline]
    fn write_host(buf: &mut [u8], addr: usize, value: Self) {
        let a = addr & !1;
        buf[a..a + 2].copy_from_slice(&value.to_ne_bytes());
    }
}

/// Converts big-endian 16-bit data (as found in ROM files) to host order in place.
pub fn to_host_order(buf: &mut [u8]) {
    cfg_if! {
        if #[cfg(target_endian = "little")] {
            for pair in buf.chunks_exact_mut(2) {
                pair.swap(0, 1);
            }
        } else {
            let _ = buf;
        }
    }
}

/// Converts host-order 16-bit data back to big-endian byte order (same swap).
#[inline]
pub fn from_host_order(buf: &mut [u8]) {
    to_host_order(buf);
}
