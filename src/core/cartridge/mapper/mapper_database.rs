// megadrive-core/src/core/cartridge/mapper/mapper_database.rs

//! Data-driven per-title fixups.
//!
//! The built-in table is compiled in from `fixups.dat`; frontends can parse
//! their own with [`FixupTable::parse`].

use super::mapper_common::{FixedRegister, MapperConfig, MapperType, SramOverride, MAX_FIXED_REGISTERS};
use crate::core::error::FixupError;
use crate::core::memory::ADDRESS_MASK;
use log::warn;

const BUILTIN_FIXUPS: &str = include_str!("fixups.dat");

/// Serial prefix length used for matching
pub const SERIAL_MATCH_LEN: usize = 11;

/// What the fixup table knows about a loaded image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RomIdentity<'a> {
    pub serial: &'a str,
    /// Header checksum at $18E
    pub checksum: u16,
    /// Checksum computed over the image
    pub computed_checksum: u16,
    pub crc32: u32,
}

/// One line of the fixup table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixupEntry {
    pub serial: Option<String>,
    pub checksum: Option<u16>,
    pub computed_checksum: Option<u16>,
    pub crc32: Option<u32>,
    pub config: MapperConfig,
}

fn pad_serial(serial: &str) -> String {
    let mut padded: String = serial.chars().take(SERIAL_MATCH_LEN).collect();
    while padded.chars().count() < SERIAL_MATCH_LEN {
        padded.push(' ');
    }
    padded
}

impl FixupEntry {
    pub fn matches(&self, rom: &RomIdentity) -> bool {
        if let Some(expected) = &self.serial {
            if *expected != pad_serial(rom.serial) {
                return false;
            }
        }
        self.checksum.map_or(true, |c| c == rom.checksum)
            && self.computed_checksum.map_or(true, |c| c == rom.computed_checksum)
            && self.crc32.map_or(true, |c| c == rom.crc32)
    }
}

/// Ordered fixup table
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FixupTable {
    entries: Vec<FixupEntry>,
}

fn parse_hex<T: num_traits::Num>(text: &str, line: usize) -> Result<T, FixupError> {
    let digits = text.trim_start_matches("0x").trim_start_matches("0X");
    T::from_str_radix(digits, 16).map_err(|_| FixupError::new(line, format!("bad hex value \"{}\"", text)))
}

fn parse_option(option: &str, line: usize, config: &mut MapperConfig) -> Result<(), FixupError> {
    let (key, value) = option
        .split_once('=')
        .ok_or_else(|| FixupError::new(line, format!("option \"{}\" has no value", option)))?;

    match (key, value) {
        ("checksum", "none") => config.no_checksum = true,
        ("mapper", name) => {
            let mapper = MapperType::from_fixup_name(name)
                .ok_or_else(|| FixupError::new(line, format!("unknown mapper \"{}\"", name)))?;
            config.mapper = Some(mapper);
        }
        ("sram", "off") => config.sram = Some(SramOverride::ForceOff),
        ("sram", range) => {
            let (start, end) = range
                .split_once('-')
                .ok_or_else(|| FixupError::new(line, format!("bad SRAM range \"{}\"", range)))?;
            let (start, end): (u32, u32) = (parse_hex(start, line)?, parse_hex(end, line)?);
            if start > ADDRESS_MASK || end > ADDRESS_MASK {
                let message = format!("SRAM range \"{}\" outside the 24-bit bus", range);
                return Err(FixupError::new(line, message));
            }
            config.sram = Some(SramOverride::Range { start, end });
        }
        ("reg", fields) => {
            let parts: Vec<&str> = fields.split(':').collect();
            if parts.len() != 3 {
                return Err(FixupError::new(line, format!("bad register \"{}\"", fields)));
            }
            if config.registers.len() >= MAX_FIXED_REGISTERS {
                return Err(FixupError::new(line, "too many fixed registers"));
            }
            config.registers.push(FixedRegister {
                mask: parse_hex(parts[0], line)?,
                addr: parse_hex(parts[1], line)?,
                value: parse_hex(parts[2], line)?,
            });
        }
        _ => return Err(FixupError::new(line, format!("unknown option \"{}\"", option))),
    }
    Ok(())
}

fn parse_line(text: &str, line: usize) -> Result<FixupEntry, FixupError> {
    let fields: Vec<&str> = text.split('|').collect();
    if fields.len() != 4 {
        return Err(FixupError::new(line, "expected 4 fields"));
    }

    let serial = fields[0].trim();
    let checksum = fields[1].trim();
    let crc32 = fields[2].trim();

    let mut config = MapperConfig::default();
    for option in fields[3].split_whitespace() {
        parse_option(option, line, &mut config)?;
    }

    // "HHHH", "HHHH/CCCC" or "/CCCC": header and computed checksum
    let (checksum, computed) = checksum.split_once('/').unwrap_or((checksum, ""));

    Ok(FixupEntry {
        serial: (!serial.is_empty()).then(|| pad_serial(serial)),
        checksum: optional_hex(checksum, line)?,
        computed_checksum: optional_hex(computed, line)?,
        crc32: optional_hex(crc32, line)?,
        config,
    })
}

fn optional_hex<T: num_traits::Num>(text: &str, line: usize) -> Result<Option<T>, FixupError> {
    let text = text.trim();
    if text.is_empty() {
        Ok(None)
    } else {
        parse_hex(text, line).map(Some)
    }
}

impl FixupTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Table compiled into the crate
    pub fn builtin() -> Self {
        Self::parse(BUILTIN_FIXUPS).unwrap_or_else(|err| {
            warn!("Built-in fixup table rejected: {}", err);
            Self::default()
        })
    }

    /// Parses the `serial|checksum|crc32|options` text format.
    pub fn parse(text: &str) -> Result<Self, FixupError> {
        let mut entries = Vec::new();
        for (index, raw) in text.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            entries.push(parse_line(line, index + 1)?);
        }
        Ok(Self { entries })
    }

    pub fn push(&mut self, entry: FixupEntry) {
        self.entries.push(entry);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// First entry matching the image identity
    pub fn lookup(&self, rom: &RomIdentity) -> Option<&FixupEntry> {
        self.entries.iter().find(|e| e.matches(rom))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rom(serial: &str, checksum: u16, computed_checksum: u16, crc32: u32) -> RomIdentity<'_> {
        RomIdentity {
            serial,
            checksum,
            computed_checksum,
            crc32,
        }
    }

    #[test]
    fn test_builtin_table_parses() {
        let table = FixupTable::builtin();
        assert_eq!(table.len(), 16);

        let ssf2 = table.lookup(&rom("GM T-12056 -00", 0x1234, 0, 0)).unwrap();
        assert_eq!(ssf2.config.mapper, Some(MapperType::Ssf2));

        let puggsy = table.lookup(&rom("GM T-113016-00", 0, 0, 0)).unwrap();
        assert_eq!(puggsy.config.sram, Some(SramOverride::ForceOff));

        assert!(table.lookup(&rom("GM 00001009-00", 0, 0, 0)).is_none());
    }

    #[test]
    fn test_builtin_protection_entries() {
        let table = FixupTable::builtin();

        let elf_wor = table.lookup(&rom("GM 00000000-00", 0x0080, 0x3DBA, 0)).unwrap();
        let values: Vec<u16> = elf_wor.config.registers.iter().map(|r| r.value).collect();
        assert_eq!(values, vec![0x5500, 0x0F00, 0xC900, 0x1800]);
        assert!(elf_wor.config.registers.iter().all(|r| r.mask == 0xFFFFFF));

        // both checksums must agree
        assert!(table.lookup(&rom("GM 00000000-00", 0x3DBA, 0x3DBA, 0)).is_none());
        assert!(table.lookup(&rom("GM 00000000-00", 0x0080, 0x0080, 0)).is_none());

        let xin_qigai = table.lookup(&rom("", 0x8104, 0x8DBA, 0)).unwrap();
        assert_eq!(xin_qigai.config.sram, Some(SramOverride::Range { start: 0x400001, end: 0x40FFFF }));
        assert!(xin_qigai.config.registers.is_empty());
    }

    #[test]
    fn test_wildcards_and_order() {
        let table = FixupTable::parse(
            "|ABCD||checksum=none\n\
             ||DEADBEEF|mapper=regs reg=FFFFFF:400000:5A5A\n\
             |/BEEF||mapper=flat\n\
             GM X|||sram=200001-203FFF\n",
        )
        .unwrap();

        let entry = table.lookup(&rom("GM X-00000-00", 0xABCD, 0, 0)).unwrap();
        assert!(entry.config.no_checksum);

        let entry = table.lookup(&rom("anything", 0, 0, 0xDEADBEEF)).unwrap();
        assert_eq!(entry.config.mapper, Some(MapperType::FixedRegisters));
        assert_eq!(
            entry.config.registers,
            vec![FixedRegister { mask: 0xFFFFFF, addr: 0x400000, value: 0x5A5A }]
        );

        // computed checksum only, any header checksum
        let entry = table.lookup(&rom("anything", 0x1111, 0xBEEF, 0)).unwrap();
        assert_eq!(entry.config.mapper, Some(MapperType::Flat));
        assert_eq!(entry.checksum, None);

        // "GM X" is padded to 11 characters, so it only matches "GM X" + spaces
        assert!(table.lookup(&rom("GM X-00000-00", 0, 0, 0)).is_none());
        let entry = table.lookup(&rom("GM X          ", 0, 0, 0)).unwrap();
        assert_eq!(entry.config.sram, Some(SramOverride::Range { start: 0x200001, end: 0x203FFF }));
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(FixupTable::parse("a|b").unwrap_err().line, 1);
        let err = FixupTable::parse("# comment\n|||mapper=svp").unwrap_err();
        assert_eq!(err.line, 2);
        assert!(FixupTable::parse("|||reg=1:2").is_err());
        assert!(FixupTable::parse("|||reg=1:2:3 reg=1:2:3 reg=1:2:3 reg=1:2:3 reg=1:2:3").is_err());
        assert!(FixupTable::parse("|0000/XYZ||checksum=none").is_err());
        let err = FixupTable::parse("GM 00001009|||sram=FFFFFFF0-FFFFFFFF").unwrap_err();
        assert_eq!(err.line, 1);
        assert!(FixupTable::parse("|||sram=1000000-100FFFF").is_err());
    }
}
