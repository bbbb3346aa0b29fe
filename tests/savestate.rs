//! Savestate capture and restore across whole machines.

mod common;

use common::{build_rom, context, load, snapshot};
use megadrive_core::core::cpu::M68kBus;
use megadrive_core::core::savestate;
use megadrive_core::{EmuConfig, MemoryContainer, SavestateContainer, SavestateError};

const ROM_SIZE: usize = 0x100000;

fn running_context() -> (megadrive_core::EmulationContext, common::Chips) {
    let (mut ctx, chips) = context(EmuConfig::default());
    load(&mut ctx, build_rom(ROM_SIZE, "GM 00001009-00"));
    // let the Z80 run so its side of the machine is part of the state
    ctx.hardware_mut().write_word(0xA11200, 0x0100);
    (ctx, chips)
}

#[test]
fn test_identical_machines_stay_identical() {
    let (mut a, _) = running_context();
    let (mut b, _) = running_context();

    for _ in 0..5 {
        a.exec_frame_fast();
        b.exec_frame_fast();
        assert_eq!(a.audio_output(), b.audio_output());
    }
    assert_eq!(snapshot(&a), snapshot(&b));
}

#[test]
fn test_restore_replays_the_same_frames() {
    let (mut ctx, chips) = running_context();
    chips.vdp.borrow_mut().visible_lines = 240;
    for _ in 0..3 {
        ctx.exec_frame_fast();
    }

    let saved = snapshot(&ctx);
    ctx.exec_frame_fast();
    let first_audio = ctx.audio_output().to_vec();
    let first_state = snapshot(&ctx);

    ctx.exec_frame_fast();
    ctx.exec_frame_fast();

    ctx.zomg_load(&saved).expect("restore");
    ctx.exec_frame_fast();

    assert_eq!(ctx.audio_output(), &first_audio[..]);
    assert_eq!(snapshot(&ctx), first_state);
}

#[test]
fn test_state_moves_between_machines() {
    let (mut a, _) = running_context();
    for _ in 0..2 {
        a.exec_frame_fast();
    }
    // bank register writes need the Z80 bus
    a.hardware_mut().write_word(0xA11100, 0x0100);
    for _ in 0..9 {
        a.hardware_mut().write_byte(0xA06000, 1);
    }
    a.hardware_mut().write_word(0xA11100, 0x0000);
    assert_eq!(a.bus().arbiter.z80_bank(), 0x1FF);

    let (mut b, _) = context(EmuConfig::default());
    load(&mut b, build_rom(ROM_SIZE, "GM 00001009-00"));
    b.zomg_load(&snapshot(&a)).expect("restore");

    assert_eq!(b.bus().arbiter.z80_bank(), a.bus().arbiter.z80_bank());
    assert_eq!(b.bus().mem.ram.to_bytes(), a.bus().mem.ram.to_bytes());

    a.exec_frame_fast();
    b.exec_frame_fast();
    assert_eq!(a.audio_output(), b.audio_output());
    assert_eq!(snapshot(&a), snapshot(&b));
}

#[test]
fn test_blob_names() {
    let (ctx, _) = running_context();
    let container = snapshot(&ctx);

    for name in [
        savestate::M68K_REGISTERS,
        savestate::Z80_REGISTERS,
        savestate::M68K_RAM,
        savestate::Z80_RAM,
        savestate::VDP,
        savestate::PSG,
        savestate::YM2612,
        savestate::BUS_ARBITRATION,
        savestate::CARTRIDGE,
        savestate::TMSS,
        savestate::IO,
        savestate::FRAME_TIMING,
    ] {
        assert!(container.load_blob(name).is_some(), "missing {}", name);
    }
    assert_eq!(container.load_blob(savestate::M68K_RAM).map(<[u8]>::len), Some(0x10000));
    assert_eq!(container.load_blob(savestate::Z80_RAM).map(<[u8]>::len), Some(0x2000));
}

#[test]
fn test_no_cartridge() {
    let (mut ctx, _) = context(EmuConfig::default());
    let mut container = MemoryContainer::new();

    assert!(matches!(ctx.zomg_save(&mut container), Err(SavestateError::NoCartridge)));
    assert!(container.is_empty());
    assert!(matches!(ctx.zomg_load(&container), Err(SavestateError::NoCartridge)));
}

#[test]
fn test_missing_blob() {
    let (mut ctx, _) = running_context();
    ctx.exec_frame_fast();

    let mut container = snapshot(&ctx);
    container.remove(savestate::BUS_ARBITRATION);
    assert!(matches!(
        ctx.zomg_load(&container),
        Err(SavestateError::MissingBlob(name)) if name == savestate::BUS_ARBITRATION
    ));

    ctx.hardware_mut().write_word(0xFF0000, 0x1111);
    let mut container = snapshot(&ctx);
    container.remove(savestate::VDP);
    ctx.hardware_mut().write_word(0xFF0000, 0x2222);
    let before = snapshot(&ctx);

    assert!(matches!(ctx.zomg_load(&container), Err(SavestateError::MissingBlob(_))));
    assert_eq!(ctx.hardware_mut().read_word(0xFF0000), 0x2222);
    assert_eq!(snapshot(&ctx), before);
}

#[test]
fn test_rejected_blob_rolls_back() {
    let (mut ctx, chips) = running_context();
    ctx.exec_frame_fast();

    ctx.hardware_mut().write_word(0xFF0000, 0x1111);
    let mut container = snapshot(&ctx);
    // present, but not valid VDP state
    container.save_blob(savestate::VDP, b"not a vdp");

    ctx.hardware_mut().write_word(0xFF0000, 0x2222);
    ctx.exec_frame_fast();
    let before = snapshot(&ctx);
    let steps = chips.m68k.borrow().steps;

    assert!(matches!(
        ctx.zomg_load(&container),
        Err(SavestateError::Rejected { name }) if name == savestate::VDP
    ));
    assert_eq!(snapshot(&ctx), before);
    assert_eq!(chips.m68k.borrow().steps, steps);
}

#[test]
fn test_wrong_ram_size_changes_nothing() {
    let (mut ctx, _) = running_context();
    let mut container = snapshot(&ctx);
    container.save_blob(savestate::Z80_RAM, &[0; 0x1000]);
    container.save_blob(savestate::M68K_RAM, &[0x55; 0x10000]);

    ctx.hardware_mut().write_word(0xFF0000, 0x2222);
    assert!(matches!(ctx.zomg_load(&container), Err(SavestateError::Rejected { .. })));
    assert_eq!(ctx.hardware_mut().read_word(0xFF0000), 0x2222);
}

#[test]
fn test_optional_blobs() {
    let (mut ctx, chips) = running_context();
    ctx.exec_frame_fast();

    let mut container = snapshot(&ctx);
    container.remove(savestate::IO);
    container.remove(savestate::FRAME_TIMING);

    chips.io.borrow_mut().scanlines = 12345;
    ctx.zomg_load(&container).expect("restore without optional blocks");
    // I/O state is left as it was
    assert_eq!(chips.io.borrow().scanlines, 12345);
}

#[test]
fn test_truncated_block() {
    let (mut ctx, _) = running_context();
    let mut container = snapshot(&ctx);
    container.save_blob(savestate::TMSS, &[0; 3]);

    assert!(matches!(ctx.zomg_load(&container), Err(SavestateError::Truncated { .. })));
}
