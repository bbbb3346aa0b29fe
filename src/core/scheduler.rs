// megadrive-core/src/core/scheduler.rs

//! Scanline scheduler.
//!
//! A frame is `lines` scanlines: the active display (224 or 240 lines), one
//! VBlank line and the border lines up to 262 (NTSC) or 312 (PAL). Each line
//! renders its audio share first, then runs the CPUs in bursts around the
//! HBlank/VBlank status changes and interrupts, then catches both CPUs up to
//! the end of the line.

use crate::core::config::Region;
use crate::core::cpu::M68k;
use crate::core::devices::{VdpInterrupt, VdpStatus};
use crate::core::sound::{self, AudioSegment, ExtrapolationTable};
use crate::core::system::Hardware;
use bytemuck::{Pod, Zeroable};
use log::debug;

/// M68K cycle, counted back from the end of an active line, where HBlank ends
pub const ACTIVE_HBLANK_OFFSET: u32 = 404;

/// M68K cycle, counted back from the end of the VBlank line, of the VInt
pub const VBLANK_LINE_OFFSET: u32 = 360;

/// Z80 cycle, counted back from the end of the VBlank line, of the Z80 INT
pub const Z80_VBLANK_OFFSET: u32 = 168;

/// NTSC master clock (Hz)
pub const CLOCK_NTSC: u32 = 53_693_175;

/// PAL master clock (Hz)
pub const CLOCK_PAL: u32 = 53_203_424;

const fn cycles_per_line(clock: u32, divider: u32, fps: u32, lines: u32) -> u32 {
    let d = divider * fps * lines;
    (clock + d / 2) / d
}

/// Region-dependent frame timing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimingConstants {
    pub master_clock: u32,
    pub fps: u32,
    pub lines: u32,
    pub m68k_per_line: u32,
    pub z80_per_line: u32,
}

impl TimingConstants {
    pub const NTSC: Self = Self {
        master_clock: CLOCK_NTSC,
        fps: 60,
        lines: 262,
        m68k_per_line: cycles_per_line(CLOCK_NTSC, 7, 60, 262),
        z80_per_line: cycles_per_line(CLOCK_NTSC, 15, 60, 262),
    };

    pub const PAL: Self = Self {
        master_clock: CLOCK_PAL,
        fps: 50,
        lines: 312,
        m68k_per_line: cycles_per_line(CLOCK_PAL, 7, 50, 312),
        z80_per_line: cycles_per_line(CLOCK_PAL, 15, 50, 312),
    };

    pub fn for_region(region: Region) -> Self {
        if region.is_pal() {
            Self::PAL
        } else {
            Self::NTSC
        }
    }
}

/// Kind of scanline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    Active,
    VBlank,
    Border,
}

/// Per-frame counters
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct FrameTimingState {
    pub current_line: u32,
    pub display_total: u32,
    pub visible_total: u32,
    pub hint_counter: i32,
    /// NTSC 240-line VBlank toggle
    pub vblank_div: u32,
    pub m68k_target: u32,
    pub z80_target: u32,
}

impl FrameTimingState {
    pub fn line_kind(&self, line: u32) -> LineKind {
        if line < self.visible_total {
            LineKind::Active
        } else if line == self.visible_total {
            LineKind::VBlank
        } else {
            LineKind::Border
        }
    }
}

pub struct FrameScheduler {
    region: Region,
    constants: TimingConstants,
    sample_rate: u32,
    timing: FrameTimingState,
    suppress_vblank: bool,
    extrapolation: ExtrapolationTable,
    segment: AudioSegment,
    table_dirty: bool,
}

impl FrameScheduler {
    pub fn new(region: Region, sample_rate: u32) -> Self {
        let constants = TimingConstants::for_region(region);
        let extrapolation = ExtrapolationTable::new(sample_rate, constants.fps, constants.lines);
        let segment = AudioSegment::new(extrapolation.segment_length());
        Self {
            region,
            constants,
            sample_rate,
            timing: FrameTimingState {
                display_total: constants.lines,
                ..Default::default()
            },
            suppress_vblank: false,
            extrapolation,
            segment,
            table_dirty: false,
        }
    }

    pub fn set_region(&mut self, region: Region) {
        if region != self.region {
            self.region = region;
            self.constants = TimingConstants::for_region(region);
            self.table_dirty = true;
        }
    }

    pub fn set_sample_rate(&mut self, sample_rate: u32) {
        if sample_rate != self.sample_rate {
            self.sample_rate = sample_rate;
            self.table_dirty = true;
        }
    }

    pub fn constants(&self) -> &TimingConstants {
        &self.constants
    }

    pub fn timing(&self) -> &FrameTimingState {
        &self.timing
    }

    pub fn is_table_dirty(&self) -> bool {
        self.table_dirty
    }

    /// Samples per frame for the current rate and region
    pub fn segment_length(&self) -> usize {
        self.extrapolation.segment_length()
    }

    /// Power-on: frame counters and the VBlank toggle cleared.
    pub fn reset(&mut self) {
        self.timing = FrameTimingState {
            display_total: self.constants.lines,
            ..Default::default()
        };
        self.suppress_vblank = false;
        self.segment.clear();
    }

    /// Per-frame setup.
    pub fn begin_frame(&mut self, hw: &mut Hardware) {
        hw.bus.arbiter.begin_frame();

        if self.table_dirty {
            self.extrapolation = ExtrapolationTable::new(self.sample_rate, self.constants.fps, self.constants.lines);
            self.segment.resize(self.extrapolation.segment_length());
            self.table_dirty = false;
            debug!(
                "Audio extrapolation: {} samples over {} lines",
                self.extrapolation.segment_length(),
                self.constants.lines
            );
        }
        self.segment.clear();

        let vdp = &mut hw.bus.vdp;
        vdp.set_status(VdpStatus::VBLANK, false);
        vdp.set_status(VdpStatus::PAL, self.region.is_pal());

        let timing = &mut self.timing;
        timing.current_line = 0;
        timing.display_total = self.constants.lines;
        timing.visible_total = vdp.visible_lines().min(self.constants.lines - 1);
        timing.hint_counter = vdp.hint_reload() as i32;
        timing.m68k_target = 0;
        timing.z80_target = 0;

        // NTSC 240-line mode: VBlank every other frame
        self.suppress_vblank = if !self.region.is_pal() && timing.visible_total == 240 {
            timing.vblank_div ^= 1;
            timing.vblank_div == 0
        } else {
            timing.vblank_div = 0;
            false
        };
    }

    /// Runs one frame. `render` selects full mode over fast mode.
    pub fn run_frame(&mut self, m68k: &mut M68k, hw: &mut Hardware, render: bool) {
        self.begin_frame(hw);
        for line in 0..self.timing.display_total {
            self.timing.current_line = line;
            self.run_line(m68k, hw, line, render);
        }
        self.timing.current_line = self.timing.display_total;
    }

    fn run_line(&mut self, m68k: &mut M68k, hw: &mut Hardware, line: u32, render: bool) {
        // 1. Audio for this line, before the CPUs touch the chips
        let (pos, len) = self.extrapolation.line(line as usize);
        let (left, right) = self.segment.window(pos, len);
        let count = left.len();
        hw.bus.psg.update_for_samples(left, right, count);
        hw.bus.psg.add_write_len(count);
        if let Some(ym) = hw.bus.ym2612.as_mut() {
            ym.update_for_samples(left, right, count);
            ym.add_write_len(count);
        }

        // 2.
        hw.bus.io.notify_scanline();

        // 3.
        self.timing.m68k_target += self.constants.m68k_per_line;
        self.timing.z80_target += self.constants.z80_per_line;

        // 4.
        let dma = hw.bus.run_dma();
        if dma > 0 {
            hw.bus.arbiter.add_m68k_cycles(dma);
        }

        // 5.
        let kind = self.timing.line_kind(line);
        match kind {
            LineKind::Active => {
                hw.bus.vdp.set_status(VdpStatus::HBLANK, true);
                m68k.exec(hw, self.timing.m68k_target.saturating_sub(ACTIVE_HBLANK_OFFSET));
                hw.bus.vdp.set_status(VdpStatus::HBLANK, false);

                self.timing.hint_counter -= 1;
                if self.timing.hint_counter < 0 {
                    hw.bus.vdp.raise_interrupt(VdpInterrupt::HBlank);
                    self.timing.hint_counter = hw.bus.vdp.hint_reload() as i32;
                }
                m68k.update_irq(hw);
            }
            LineKind::VBlank => {
                self.timing.hint_counter -= 1;
                if self.timing.hint_counter < 0 {
                    hw.bus.vdp.raise_interrupt(VdpInterrupt::HBlank);
                    m68k.update_irq(hw);
                }

                hw.bus.vdp.set_status(VdpStatus::HBLANK | VdpStatus::VBLANK, true);
                m68k.exec(hw, self.timing.m68k_target.saturating_sub(VBLANK_LINE_OFFSET));
                hw.run_z80(self.timing.z80_target.saturating_sub(Z80_VBLANK_OFFSET));
                hw.bus.vdp.set_status(VdpStatus::HBLANK, false);

                if !self.suppress_vblank {
                    hw.bus.vdp.set_status(VdpStatus::VINT_PENDING, true);
                    hw.bus.vdp.raise_interrupt(VdpInterrupt::VBlank);
                    m68k.update_irq(hw);
                    hw.z80_interrupt(0xFF);
                }
            }
            LineKind::Border => {
                self.timing.hint_counter = hw.bus.vdp.hint_reload() as i32;
            }
        }

        // 6.
        if render && kind == LineKind::Active {
            hw.bus.vdp.render_line(line);
        }

        // 7. Catch-up
        m68k.exec(hw, self.timing.m68k_target);
        hw.run_z80(self.timing.z80_target);
        if kind == LineKind::VBlank {
            hw.z80_clear_interrupt();
        }
    }

    /// Writes the frame's samples into `out` (interleaved when `stereo`).
    pub fn write_audio(&mut self, out: &mut Vec<i16>, stereo: bool) -> usize {
        let frames = self.segment.len();
        let AudioSegment { left, right } = &mut self.segment;
        if stereo {
            out.resize(frames * 2, 0);
            sound::write_stereo(out, left, right)
        } else {
            out.resize(frames, 0);
            sound::write_mono(out, left, right)
        }
    }

    pub fn save_state(&self) -> Vec<u8> {
        bytemuck::bytes_of(&self.timing).to_vec()
    }

    pub fn load_state(&mut self, data: &[u8]) -> bool {
        match bytemuck::try_pod_read_unaligned::<FrameTimingState>(data) {
            Ok(timing) => {
                self.timing = timing;
                true
            }
            Err(_) => false,
        }
    }
}
