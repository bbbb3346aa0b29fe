//! Shared helpers for the integration tests: scripted chip implementations
//! whose state is visible to the test through shared handles, and ROM builders.

#![allow(dead_code)]

use megadrive_core::core::context::{Devices, EmulationContext, LoadInfo};
use megadrive_core::core::cpu::{M68kBus, M68kCore, Z80Bus, Z80Core};
use megadrive_core::core::devices::{DmaSource, IoManager, SoundChip, VdpDevice, VdpInterrupt, VdpStatus};
use megadrive_core::core::savestate::MemoryContainer;
use megadrive_core::{EmuConfig, FlatImageLoader, SystemKind};
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::path::PathBuf;
use std::rc::Rc;

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn to_state<T: Serialize>(value: &T) -> Vec<u8> {
    serde_json::to_vec(value).unwrap_or_default()
}

fn from_state<T: for<'de> Deserialize<'de>>(target: &RefCell<T>, data: &[u8]) -> bool {
    match serde_json::from_slice(data) {
        Ok(value) => {
            *target.borrow_mut() = value;
            true
        }
        Err(_) => false,
    }
}

// --- 68000 ---

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct M68kRegs {
    pub pc: u32,
    pub acc: u32,
    pub irq_level: u8,
    pub interrupts: u32,
    pub steps: u64,
}

/// Fetches a word at PC, folds it into an accumulator and stores the result
/// in work RAM. Takes interrupts as soon as the level is non-zero.
pub struct ScriptedM68k(Rc<RefCell<M68kRegs>>);

impl M68kCore for ScriptedM68k {
    fn reset(&mut self, bus: &mut dyn M68kBus) {
        let mut regs = self.0.borrow_mut();
        regs.pc = bus.read_long(4) & 0x00FF_FFFE;
        regs.acc = 0;
        regs.irq_level = 0;
    }

    fn step(&mut self, bus: &mut dyn M68kBus) -> u32 {
        let mut regs = self.0.borrow_mut();
        regs.steps += 1;

        if regs.irq_level > 0 {
            let level = regs.irq_level;
            bus.acknowledge_interrupt(level);
            regs.irq_level = 0;
            regs.interrupts += 1;
            return 44;
        }

        let op = bus.read_word(regs.pc);
        regs.acc = regs.acc.rotate_left(3) ^ op as u32;
        bus.write_word(0xFF0000 | (regs.pc & 0xFFFE), regs.acc as u16);
        regs.pc = regs.pc.wrapping_add(2) & 0x3FFFE;
        4 + (op as u32 & 7) * 2
    }

    fn set_irq_level(&mut self, level: u8) {
        self.0.borrow_mut().irq_level = level;
    }

    fn save_registers(&self) -> Vec<u8> {
        to_state(&*self.0.borrow())
    }

    fn load_registers(&mut self, data: &[u8]) -> bool {
        from_state(&self.0, data)
    }
}

// --- Z80 ---

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Z80Regs {
    pub pc: u16,
    pub acc: u8,
    pub steps: u64,
    pub resets: u32,
    pub interrupts: u32,
    pub int_line: bool,
}

/// Sums its own RAM into an accumulator, peeking into the 68000 window
/// every 64 instructions.
pub struct ScriptedZ80(Rc<RefCell<Z80Regs>>);

impl Z80Core for ScriptedZ80 {
    fn reset(&mut self) {
        let mut regs = self.0.borrow_mut();
        regs.pc = 0;
        regs.acc = 0;
        regs.int_line = false;
        regs.resets += 1;
    }

    fn step(&mut self, bus: &mut dyn Z80Bus) -> u32 {
        let mut regs = self.0.borrow_mut();
        regs.steps += 1;

        let op = bus.read_byte(regs.pc);
        regs.acc = regs.acc.wrapping_add(op).wrapping_add(1);
        bus.write_byte(0x1000 | (regs.pc & 0x0FFF), regs.acc);
        if regs.steps % 64 == 0 {
            let peek = bus.read_byte(0x8000 | regs.pc);
            regs.acc ^= peek;
        }
        regs.pc = (regs.pc + 1) & 0x0FFF;
        4 + (op as u32 & 3)
    }

    fn interrupt(&mut self, _vector: u8) {
        let mut regs = self.0.borrow_mut();
        if !regs.int_line {
            regs.int_line = true;
            regs.interrupts += 1;
        }
    }

    fn clear_interrupt(&mut self) {
        self.0.borrow_mut().int_line = false;
    }

    fn save_registers(&self) -> Vec<u8> {
        to_state(&*self.0.borrow())
    }

    fn load_registers(&mut self, data: &[u8]) -> bool {
        from_state(&self.0, data)
    }
}

// --- VDP ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VdpState {
    pub status: u16,
    pub vint_pending: bool,
    pub hint_pending: bool,
    pub hint_reload: u8,
    pub visible_lines: u32,
    pub data_sum: u32,
    pub control_writes: u32,
    pub vint_sets: u32,
    pub hints_raised: u32,
    pub vints_raised: u32,
    pub acks: u32,
    pub lines_rendered: u32,
    pub dma_cycles: u32,
    pub dma_sum: u32,
}

impl Default for VdpState {
    fn default() -> Self {
        Self {
            status: 0,
            vint_pending: false,
            hint_pending: false,
            hint_reload: 0xFF,
            visible_lines: 224,
            data_sum: 0,
            control_writes: 0,
            vint_sets: 0,
            hints_raised: 0,
            vints_raised: 0,
            acks: 0,
            lines_rendered: 0,
            dma_cycles: 0,
            dma_sum: 0,
        }
    }
}

pub struct TestVdp(Rc<RefCell<VdpState>>);

impl VdpDevice for TestVdp {
    fn reset(&mut self) {
        let mut vdp = self.0.borrow_mut();
        vdp.status = 0;
        vdp.vint_pending = false;
        vdp.hint_pending = false;
    }

    fn read_data(&mut self) -> u16 {
        0
    }

    fn write_data(&mut self, value: u16) {
        let mut vdp = self.0.borrow_mut();
        vdp.data_sum = vdp.data_sum.wrapping_add(value as u32);
    }

    fn read_control(&mut self) -> u16 {
        self.0.borrow().status
    }

    fn write_control(&mut self, _value: u16) {
        self.0.borrow_mut().control_writes += 1;
    }

    fn read_hv_counter(&mut self) -> u16 {
        0
    }

    fn set_status(&mut self, bits: VdpStatus, on: bool) {
        let mut vdp = self.0.borrow_mut();
        if on {
            vdp.status |= bits.bits();
            if bits.contains(VdpStatus::VINT_PENDING) {
                vdp.vint_sets += 1;
            }
        } else {
            vdp.status &= !bits.bits();
        }
    }

    fn status(&self) -> VdpStatus {
        VdpStatus::from_bits_truncate(self.0.borrow().status)
    }

    fn raise_interrupt(&mut self, irq: VdpInterrupt) {
        let mut vdp = self.0.borrow_mut();
        match irq {
            VdpInterrupt::HBlank => {
                vdp.hint_pending = true;
                vdp.hints_raised += 1;
            }
            VdpInterrupt::VBlank => {
                vdp.vint_pending = true;
                vdp.vints_raised += 1;
            }
        }
    }

    fn irq_level(&self) -> u8 {
        let vdp = self.0.borrow();
        if vdp.vint_pending {
            6
        } else if vdp.hint_pending {
            4
        } else {
            0
        }
    }

    fn acknowledge_interrupt(&mut self, level: u8) -> Option<u32> {
        let mut vdp = self.0.borrow_mut();
        vdp.acks += 1;
        match level {
            6 => vdp.vint_pending = false,
            4 => vdp.hint_pending = false,
            _ => {}
        }
        None
    }

    fn hint_reload(&self) -> u8 {
        self.0.borrow().hint_reload
    }

    fn visible_lines(&self) -> u32 {
        self.0.borrow().visible_lines
    }

    fn dma_pending(&self) -> bool {
        self.0.borrow().dma_cycles > 0
    }

    fn run_dma(&mut self, source: &dyn DmaSource) -> u32 {
        let mut vdp = self.0.borrow_mut();
        vdp.dma_sum = (0..8).fold(0u32, |sum, i| sum.wrapping_add(source.dma_read_word(0xFF0000 + i * 2) as u32));
        std::mem::take(&mut vdp.dma_cycles)
    }

    fn render_line(&mut self, _line: u32) {
        self.0.borrow_mut().lines_rendered += 1;
    }

    fn save_state(&self) -> Vec<u8> {
        to_state(&*self.0.borrow())
    }

    fn load_state(&mut self, data: &[u8]) -> bool {
        from_state(&self.0, data)
    }
}

// --- I/O ---

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IoState {
    pub scanlines: u32,
    pub writes: Vec<(u8, u8)>,
}

pub struct TestIo(Rc<RefCell<IoState>>);

impl IoManager for TestIo {
    fn reset(&mut self) {
        self.0.borrow_mut().writes.clear();
    }

    fn read_port(&mut self, reg: u8) -> u8 {
        0x7F ^ reg
    }

    fn write_port(&mut self, reg: u8, value: u8) {
        self.0.borrow_mut().writes.push((reg, value));
    }

    fn notify_scanline(&mut self) {
        self.0.borrow_mut().scanlines += 1;
    }

    fn save_state(&self) -> Vec<u8> {
        to_state(&*self.0.borrow())
    }

    fn load_state(&mut self, data: &[u8]) -> bool {
        from_state(&self.0, data)
    }
}

// --- Sound ---

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SoundState {
    pub phase: i32,
    pub last: u8,
    pub writes: u32,
    pub resets: u32,
    pub samples: u64,
    pub write_len: u64,
}

/// Emits a sawtooth whose slope depends on the last register write
pub struct SawChip(Rc<RefCell<SoundState>>);

impl SoundChip for SawChip {
    fn reset(&mut self) {
        let mut chip = self.0.borrow_mut();
        chip.phase = 0;
        chip.last = 0;
        chip.resets += 1;
    }

    fn write(&mut self, _port: u8, value: u8) {
        let mut chip = self.0.borrow_mut();
        chip.last = value;
        chip.writes += 1;
    }

    fn read(&mut self, _port: u8) -> u8 {
        0
    }

    fn update_for_samples(&mut self, left: &mut [i32], right: &mut [i32], count: usize) {
        let mut chip = self.0.borrow_mut();
        for (l, r) in left.iter_mut().zip(right.iter_mut()).take(count) {
            chip.phase = (chip.phase + 97 + chip.last as i32) % 2000;
            *l += chip.phase - 1000;
            *r += 1000 - chip.phase;
        }
        chip.samples += count as u64;
    }

    fn add_write_len(&mut self, count: usize) {
        self.0.borrow_mut().write_len += count as u64;
    }

    fn save_state(&self) -> Vec<u8> {
        to_state(&*self.0.borrow())
    }

    fn load_state(&mut self, data: &[u8]) -> bool {
        from_state(&self.0, data)
    }
}

// --- Machine ---

/// Handles on the state of every plugged-in chip
#[derive(Clone, Default)]
pub struct Chips {
    pub m68k: Rc<RefCell<M68kRegs>>,
    pub z80: Rc<RefCell<Z80Regs>>,
    pub vdp: Rc<RefCell<VdpState>>,
    pub io: Rc<RefCell<IoState>>,
    pub psg: Rc<RefCell<SoundState>>,
    pub ym: Rc<RefCell<SoundState>>,
}

pub fn devices(with_ym: bool) -> (Devices, Chips) {
    let chips = Chips::default();
    let ym: Option<Box<dyn SoundChip>> = if with_ym {
        Some(Box::new(SawChip(chips.ym.clone())))
    } else {
        None
    };
    let devices = Devices {
        m68k: Box::new(ScriptedM68k(chips.m68k.clone())),
        z80: Box::new(ScriptedZ80(chips.z80.clone())),
        vdp: Box::new(TestVdp(chips.vdp.clone())),
        io: Box::new(TestIo(chips.io.clone())),
        psg: Box::new(SawChip(chips.psg.clone())),
        ym2612: ym,
    };
    (devices, chips)
}

pub fn context(config: EmuConfig) -> (EmulationContext, Chips) {
    init_logger();
    let (devices, chips) = devices(config.system != SystemKind::Pico);
    (EmulationContext::new(config, devices), chips)
}

/// Mega Drive image with a standard header, a valid checksum and
/// pseudo-random program bytes after $200.
pub fn build_rom(size: usize, serial: &str) -> Vec<u8> {
    build_rom_with_console(size, serial, "SEGA MEGA DRIVE ")
}

pub fn build_rom_with_console(size: usize, serial: &str, console: &str) -> Vec<u8> {
    let mut rom: Vec<u8> = (0..size)
        .map(|i| ((i as u32).wrapping_mul(2_654_435_761) >> 24) as u8)
        .collect();

    rom[0..8].copy_from_slice(&[0x00, 0xFF, 0xFE, 0x00, 0x00, 0x00, 0x02, 0x00]);
    write_field(&mut rom, 0x100, 16, console);
    write_field(&mut rom, 0x110, 16, "(C)SEGA 1994.JAN");
    write_field(&mut rom, 0x120, 48, "TEST CARTRIDGE");
    write_field(&mut rom, 0x150, 48, "TEST CARTRIDGE");
    write_field(&mut rom, 0x180, 14, serial);
    write_field(&mut rom, 0x190, 16, "J");
    rom[0x1A0..0x1A8].copy_from_slice(&[0, 0, 0, 0, 0, 0x0F, 0xFF, 0xFF]);
    rom[0x1A8..0x1B0].copy_from_slice(&[0, 0xFF, 0, 0, 0, 0xFF, 0xFF, 0xFF]);
    write_field(&mut rom, 0x1B0, 12, "");
    write_field(&mut rom, 0x1F0, 16, "JUE");

    let sum = checksum(&rom);
    rom[0x18E..0x190].copy_from_slice(&sum.to_be_bytes());
    rom
}

fn write_field(rom: &mut [u8], offset: usize, len: usize, text: &str) {
    let field = &mut rom[offset..offset + len];
    field.fill(b' ');
    let bytes = text.as_bytes();
    let n = bytes.len().min(len);
    field[..n].copy_from_slice(&bytes[..n]);
}

/// Sega additive checksum of a big-endian image
pub fn checksum(rom: &[u8]) -> u16 {
    rom[0x200..]
        .chunks(2)
        .map(|pair| u16::from_be_bytes([pair[0], *pair.get(1).unwrap_or(&0)]))
        .fold(0u16, u16::wrapping_add)
}

pub fn load(ctx: &mut EmulationContext, rom: Vec<u8>) -> LoadInfo {
    let mut loader = FlatImageLoader::new(rom);
    ctx.load_rom(&mut loader).expect("ROM load")
}

pub fn snapshot(ctx: &EmulationContext) -> MemoryContainer {
    let mut container = MemoryContainer::new();
    ctx.zomg_save(&mut container).expect("savestate");
    container
}

/// Per-process scratch file path
pub fn temp_path(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("megadrive-core-{}-{}", std::process::id(), name))
}
