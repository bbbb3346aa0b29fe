// megadrive-core/src/core/cartridge/mapper/mapper_common.rs

/// Cartridge mapper type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MapperType {
    /// Linear ROM, no bank switching
    #[default]
    Flat,
    /// Super Street Fighter II bank switching ($A130F3-$A130FF)
    Ssf2,
    /// Read-only protection registers above $400000
    FixedRegisters,
}

impl MapperType {
    /// Parses the `mapper=` fixup option value.
    pub fn from_fixup_name(name: &str) -> Option<Self> {
        match name {
            "flat" => Some(MapperType::Flat),
            "ssf2" => Some(MapperType::Ssf2),
            "regs" => Some(MapperType::FixedRegisters),
            _ => None,
        }
    }
}

impl std::fmt::Display for MapperType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MapperType::Flat => write!(f, "Flat"),
            MapperType::Ssf2 => write!(f, "SSF2"),
            MapperType::FixedRegisters => write!(f, "Fixed registers"),
        }
    }
}

/// Maximum number of fixed protection registers per cartridge
pub const MAX_FIXED_REGISTERS: usize = 4;

/// Read-only register: a read of `addr` (after `mask`) returns `value`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedRegister {
    pub mask: u32,
    pub addr: u32,
    pub value: u16,
}

impl FixedRegister {
    #[inline]
    pub fn matches(&self, addr: u32) -> bool {
        (addr & self.mask) == self.addr
    }
}

/// SRAM override from the fixup table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SramOverride {
    Range { start: u32, end: u32 },
    ForceOff,
}

/// Per-title adjustments resolved from the fixup table
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MapperConfig {
    pub mapper: Option<MapperType>,
    pub sram: Option<SramOverride>,
    pub no_checksum: bool,
    pub registers: Vec<FixedRegister>,
}
