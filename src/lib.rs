// Main entry point of the library.
// The chips the core schedules (68000/Z80 instruction cores, VDP, sound
// chips, controller I/O) are supplied by the caller through the traits in
// `core::cpu` and `core::devices`.

// Main modules of the project.
pub mod core;

// Re-exports for convenience.
pub use crate::core::cartridge::{Cartridge, FlatImageLoader, RomImageLoader};
pub use crate::core::config::{EmuConfig, Region, SystemKind};
pub use crate::core::context::{Devices, EmulationContext, LoadInfo};
pub use crate::core::error::{BootRomError, ConfigError, LoadError, SavestateError};
pub use crate::core::savestate::{MemoryContainer, SavestateContainer};

/// Emulator version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Convenience function creating a machine with the default configuration.
pub fn create_system(devices: Devices) -> EmulationContext {
    EmulationContext::new(EmuConfig::default(), devices)
}
