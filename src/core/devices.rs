// megadrive-core/src/core/devices.rs

//! Interfaces of the chips the core schedules but does not emulate itself:
//! the VDP, the controller I/O manager and the two sound chips.

use bitflags::bitflags;

bitflags! {
    /// VDP status register bits the scheduler drives
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct VdpStatus: u16 {
        const PAL          = 0x0001;
        const DMA          = 0x0002;
        const HBLANK       = 0x0004;
        const VBLANK       = 0x0008;
        const ODD_FRAME    = 0x0010;
        /// Frame-complete (vertical interrupt pending) flag
        const VINT_PENDING = 0x0080;
    }
}

/// Interrupt sources raised through the VDP
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VdpInterrupt {
    HBlank,
    VBlank,
}

/// Video display processor
pub trait VdpDevice {
    fn reset(&mut self);

    fn read_data(&mut self) -> u16;
    fn write_data(&mut self, value: u16);
    fn read_control(&mut self) -> u16;
    fn write_control(&mut self, value: u16);
    fn read_hv_counter(&mut self) -> u16;

    /// Sets or clears status bits.
    fn set_status(&mut self, bits: VdpStatus, on: bool);
    fn status(&self) -> VdpStatus;

    /// Marks an interrupt pending.
    fn raise_interrupt(&mut self, irq: VdpInterrupt);
    /// M68K interrupt level currently requested (0 = none).
    fn irq_level(&self) -> u8;
    /// Called on the M68K interrupt acknowledge cycle. Returns the vector.
    fn acknowledge_interrupt(&mut self, level: u8) -> Option<u32>;

    /// H-interrupt counter reload value (register 10).
    fn hint_reload(&self) -> u8;
    /// Active display height in lines (224 or 240).
    fn visible_lines(&self) -> u32;

    fn dma_pending(&self) -> bool;
    /// Runs the pending transfer and returns the M68K cycles it stole.
    fn run_dma(&mut self, source: &dyn DmaSource) -> u32;

    fn render_line(&mut self, line: u32);

    fn save_state(&self) -> Vec<u8>;
    fn load_state(&mut self, data: &[u8]) -> bool;
}

/// Read access to M68K memory for 68K-to-VDP DMA
pub trait DmaSource {
    fn dma_read_word(&self, addr: u32) -> u16;
}

/// Controller ports and expansion registers ($A10002-$A1001F)
pub trait IoManager {
    fn reset(&mut self) {}

    /// `reg` is `(addr >> 1) & 0x0F`, register 0 is never forwarded.
    fn read_port(&mut self, reg: u8) -> u8;
    fn write_port(&mut self, reg: u8, value: u8);

    /// Called once at the start of every scanline.
    fn notify_scanline(&mut self) {}

    fn save_state(&self) -> Vec<u8>;
    fn load_state(&mut self, data: &[u8]) -> bool;
}

/// YM2612 or PSG
pub trait SoundChip {
    fn reset(&mut self);

    /// `port` is 0-3 for the YM2612 and always 0 for the PSG.
    fn write(&mut self, port: u8, value: u8);
    fn read(&mut self, port: u8) -> u8;

    /// Renders `count` samples, accumulating into the buffers.
    fn update_for_samples(&mut self, left: &mut [i32], right: &mut [i32], count: usize);
    /// Reports how many samples the current line covers.
    fn add_write_len(&mut self, count: usize);

    fn save_state(&self) -> Vec<u8>;
    fn load_state(&mut self, data: &[u8]) -> bool;
}
