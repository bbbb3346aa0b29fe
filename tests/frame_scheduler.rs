//! Frame-level timing through the public context API.

mod common;

use common::{build_rom, build_rom_with_console, context, load, snapshot};
use megadrive_core::core::cartridge::BankType;
use megadrive_core::core::cpu::M68kBus;
use megadrive_core::core::memory::MemRegion;
use megadrive_core::core::savestate;
use megadrive_core::{EmuConfig, Region, SystemKind};

const ONE_MEGABYTE: usize = 0x100000;

fn pal_config() -> EmuConfig {
    EmuConfig {
        region: Region::PalEurope,
        ..EmuConfig::default()
    }
}

#[test]
fn test_fast_frame_on_flat_rom() {
    let (mut ctx, chips) = context(EmuConfig::default());
    let info = load(&mut ctx, build_rom(ONE_MEGABYTE, "GM 00001009-00"));
    assert_eq!(info.size, ONE_MEGABYTE);

    let cart = ctx.cartridge().expect("cartridge");
    assert_eq!(cart.bank_table().window(0), BankType::Cartridge(0));
    assert_eq!(cart.bank_table().window(1), BankType::Cartridge(1));
    assert!((2..20).all(|w| cart.bank_table().window(w) == BankType::Unused));
    assert_eq!(ctx.bus().mem.regions.window(0), MemRegion::Cartridge);

    ctx.exec_frame_fast();

    assert_eq!(ctx.scheduler().timing().current_line, 262);
    let vdp = chips.vdp.borrow();
    assert_eq!(vdp.vint_sets, 1);
    assert_eq!(vdp.lines_rendered, 0);
    assert_eq!(chips.io.borrow().scanlines, 262);
    assert!(chips.m68k.borrow().steps > 0);
}

#[test]
fn test_fast_frames_match_full_frames() {
    let (mut full, full_chips) = context(EmuConfig::default());
    let (mut fast, fast_chips) = context(EmuConfig::default());
    for ctx in [&mut full, &mut fast] {
        load(ctx, build_rom(ONE_MEGABYTE, "GM 00001009-00"));
        ctx.hardware_mut().write_word(0xA11200, 0x0100);
    }
    for chips in [&full_chips, &fast_chips] {
        chips.vdp.borrow_mut().hint_reload = 15;
    }

    for frame in 0..6 {
        if frame == 3 {
            full_chips.vdp.borrow_mut().visible_lines = 240;
            fast_chips.vdp.borrow_mut().visible_lines = 240;
        }
        full.exec_frame();
        fast.exec_frame_fast();
        assert_eq!(full.audio_output(), fast.audio_output(), "frame {}", frame);
    }

    // only the rendered line count may differ
    let mut full_state = snapshot(&full);
    let mut fast_state = snapshot(&fast);
    full_state.remove(savestate::VDP);
    fast_state.remove(savestate::VDP);
    assert_eq!(full_state, fast_state);

    let mut vdp = full_chips.vdp.borrow().clone();
    assert_eq!(vdp.lines_rendered, 3 * 224 + 3 * 240);
    assert_eq!(fast_chips.vdp.borrow().lines_rendered, 0);
    vdp.lines_rendered = 0;
    assert_eq!(vdp, *fast_chips.vdp.borrow());
}

#[test]
fn test_pal_frame_has_312_lines() {
    let (mut ctx, chips) = context(pal_config());
    load(&mut ctx, build_rom(ONE_MEGABYTE, "GM 00001009-00"));

    ctx.exec_frame_fast();

    assert_eq!(ctx.scheduler().timing().current_line, 312);
    assert_eq!(chips.io.borrow().scanlines, 312);
    assert_eq!(chips.vdp.borrow().vint_sets, 1);
}

#[test]
fn test_full_frame_renders_active_lines() {
    let (mut ctx, chips) = context(EmuConfig::default());
    load(&mut ctx, build_rom(ONE_MEGABYTE, "GM 00001009-00"));

    ctx.exec_frame();
    assert_eq!(chips.vdp.borrow().lines_rendered, 224);

    chips.vdp.borrow_mut().visible_lines = 240;
    ctx.exec_frame();
    assert_eq!(chips.vdp.borrow().lines_rendered, 224 + 240);
}

#[test]
fn test_ntsc_240_line_mode_halves_vblank() {
    let (mut ctx, chips) = context(EmuConfig::default());
    load(&mut ctx, build_rom(ONE_MEGABYTE, "GM 00001009-00"));
    chips.vdp.borrow_mut().visible_lines = 240;

    for _ in 0..4 {
        ctx.exec_frame_fast();
    }
    assert_eq!(chips.vdp.borrow().vint_sets, 2);

    // back to 224 lines: every frame again
    chips.vdp.borrow_mut().visible_lines = 224;
    for _ in 0..3 {
        ctx.exec_frame_fast();
    }
    assert_eq!(chips.vdp.borrow().vint_sets, 5);
}

#[test]
fn test_pal_240_line_mode_keeps_vblank() {
    let (mut ctx, chips) = context(pal_config());
    load(&mut ctx, build_rom(ONE_MEGABYTE, "GM 00001009-00"));
    chips.vdp.borrow_mut().visible_lines = 240;

    for _ in 0..4 {
        ctx.exec_frame_fast();
    }
    assert_eq!(chips.vdp.borrow().vint_sets, 4);
}

#[test]
fn test_hint_counter() {
    let (mut ctx, chips) = context(EmuConfig::default());
    load(&mut ctx, build_rom(ONE_MEGABYTE, "GM 00001009-00"));

    // reload 0: every active line plus the VBlank line
    chips.vdp.borrow_mut().hint_reload = 0;
    ctx.exec_frame_fast();
    assert_eq!(chips.vdp.borrow().hints_raised, 225);

    // reload 9: every tenth active line
    chips.vdp.borrow_mut().hint_reload = 9;
    chips.vdp.borrow_mut().hints_raised = 0;
    ctx.exec_frame_fast();
    assert_eq!(chips.vdp.borrow().hints_raised, 22);

    // the 68000 took them all
    let m68k = chips.m68k.borrow();
    assert!(m68k.interrupts >= 22);
}

#[test]
fn test_audio_segment_length() {
    let (mut ctx, chips) = context(EmuConfig::default());
    load(&mut ctx, build_rom(ONE_MEGABYTE, "GM 00001009-00"));

    ctx.exec_frame_fast();
    assert_eq!(ctx.audio_output().len(), 735 * 2);
    assert_eq!(chips.psg.borrow().samples, 735);
    assert_eq!(chips.psg.borrow().write_len, 735);
    assert_eq!(chips.ym.borrow().samples, 735);
    assert!(ctx.audio_output().iter().any(|&s| s != 0));

    ctx.set_stereo(false);
    ctx.set_sample_rate(48000);
    ctx.exec_frame_fast();
    assert_eq!(ctx.audio_output().len(), 800);
}

#[test]
fn test_pal_audio_segment_length() {
    let (mut ctx, _chips) = context(pal_config());
    load(&mut ctx, build_rom(ONE_MEGABYTE, "GM 00001009-00"));

    ctx.exec_frame_fast();
    assert_eq!(ctx.audio_output().len(), 882 * 2);
}

#[test]
fn test_z80_runs_after_reset_release() {
    let (mut ctx, chips) = context(EmuConfig::default());
    load(&mut ctx, build_rom(ONE_MEGABYTE, "GM 00001009-00"));

    ctx.exec_frame_fast();
    assert_eq!(chips.z80.borrow().steps, 0);
    let interrupts = chips.z80.borrow().interrupts;

    ctx.hardware_mut().write_word(0xA11200, 0x0100);
    ctx.exec_frame_fast();

    let z80 = chips.z80.borrow();
    assert!(z80.steps > 0);
    assert_eq!(z80.interrupts, interrupts + 1);
    assert!(!z80.int_line);
    // the Z80 program stores its accumulator in its own RAM
    assert!(ctx.bus().z80_ram.as_bytes()[0x1000..0x2000].iter().any(|&b| b != 0));
}

#[test]
fn test_busreq_stalls_z80() {
    let (mut ctx, chips) = context(EmuConfig::default());
    load(&mut ctx, build_rom(ONE_MEGABYTE, "GM 00001009-00"));

    ctx.hardware_mut().write_word(0xA11200, 0x0100);
    ctx.hardware_mut().write_word(0xA11100, 0x0100);
    ctx.exec_frame_fast();
    assert_eq!(chips.z80.borrow().steps, 0);

    ctx.hardware_mut().write_word(0xA11100, 0x0000);
    ctx.exec_frame_fast();
    assert!(chips.z80.borrow().steps > 0);
}

#[test]
fn test_pico_has_no_z80() {
    let config = EmuConfig {
        system: SystemKind::Pico,
        ..EmuConfig::default()
    };
    let (mut ctx, chips) = context(config);
    let info = load(&mut ctx, build_rom_with_console(ONE_MEGABYTE, "MK-49000", "SEGA PICO"));
    assert_eq!(info.system, SystemKind::Pico);
    assert_eq!(info.save_memory, "none");

    ctx.hardware_mut().write_word(0xA11200, 0x0100);
    ctx.exec_frame_fast();

    let z80 = chips.z80.borrow();
    assert_eq!(z80.steps, 0);
    assert_eq!(z80.interrupts, 0);
    assert!(!ctx.bus().arbiter.has_z80());
    assert_eq!(ctx.audio_output().len(), 735 * 2);
}
