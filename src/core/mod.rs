// megadrive-core/src/core/mod.rs

//! Emulation core: buses, cartridge, arbitration and frame scheduling.

pub mod arbiter;
pub mod cartridge;
pub mod config;
pub mod context;
pub mod cpu;
pub mod devices;
pub mod error;
pub mod memory;
pub mod savestate;
pub mod scheduler;
pub mod sound;
pub mod system;
pub mod tmss;
