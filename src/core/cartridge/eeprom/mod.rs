// megadrive-core/src/core/cartridge/eeprom/mod.rs

//! EEPROM save memory
//!
//! A handful of cartridges store saves in a serial EEPROM instead of battery
//! RAM. The EEPROM lines are wired to cartridge addresses that differ per
//! publisher, so titles are identified through a serial/checksum database.

pub mod eeprom_i2c;

// Re-export types
pub use eeprom_i2c::{EepromI2c, I2cChip, I2cPhase};

use log::info;

/// Address and bit wiring of the SDA/SCL lines
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EepromPorts {
    pub sda_in_addr: u32,
    pub sda_out_addr: u32,
    pub scl_addr: u32,
    pub sda_in_bit: u8,
    pub sda_out_bit: u8,
    pub scl_bit: u8,
}

const ACCLAIM_OLD: EepromPorts = EepromPorts {
    sda_in_addr: 0x200001,
    sda_out_addr: 0x200001,
    scl_addr: 0x200000,
    sda_in_bit: 0,
    sda_out_bit: 1,
    scl_bit: 0,
};

const ACCLAIM: EepromPorts = EepromPorts {
    sda_in_addr: 0x200001,
    sda_out_addr: 0x200001,
    scl_addr: 0x200000,
    sda_in_bit: 0,
    sda_out_bit: 0,
    scl_bit: 0,
};

const ELECTRONIC_ARTS: EepromPorts = EepromPorts {
    sda_in_addr: 0x200000,
    sda_out_addr: 0x200000,
    scl_addr: 0x200000,
    sda_in_bit: 7,
    sda_out_bit: 7,
    scl_bit: 6,
};

const SEGA: EepromPorts = EepromPorts {
    sda_in_addr: 0x200001,
    sda_out_addr: 0x200001,
    scl_addr: 0x200001,
    sda_in_bit: 0,
    sda_out_bit: 0,
    scl_bit: 1,
};

const CODEMASTERS: EepromPorts = EepromPorts {
    sda_in_addr: 0x300000,
    sda_out_addr: 0x380001,
    scl_addr: 0x300000,
    sda_in_bit: 0,
    sda_out_bit: 7,
    scl_bit: 1,
};

/// EEPROM database entry
#[derive(Debug, Clone, Copy)]
pub struct EepromEntry {
    pub product: &'static str,
    /// 0 matches any checksum
    pub checksum: u16,
    pub chip: I2cChip,
    pub ports: EepromPorts,
}

const fn entry(product: &'static str, chip: I2cChip, ports: EepromPorts) -> EepromEntry {
    EepromEntry {
        product,
        checksum: 0,
        chip,
        ports,
    }
}

static EEPROM_DATABASE: &[EepromEntry] = &[
    // Acclaim
    entry("T-081326", I2cChip::X24C02, ACCLAIM_OLD), // NBA Jam (UE)
    entry("T-81033", I2cChip::X24C02, ACCLAIM_OLD),  // NBA Jam (J)
    entry("T-81406", I2cChip::C24C02, ACCLAIM),      // NBA Jam TE
    entry("T-081276", I2cChip::C24C02, ACCLAIM),     // NFL Quarterback Club
    entry("T-81586", I2cChip::C24C04, ACCLAIM),      // NFL Quarterback Club 96
    entry("T-81576", I2cChip::C24C16, ACCLAIM),      // College Slam
    entry("T-81476", I2cChip::C24C16, ACCLAIM),      // Frank Thomas Big Hurt Baseball
    // Electronic Arts
    entry("T-50176", I2cChip::X24C01, ELECTRONIC_ARTS), // Rings of Power
    entry("T-50396", I2cChip::X24C01, ELECTRONIC_ARTS), // NHLPA Hockey 93
    entry("T-50446", I2cChip::X24C01, ELECTRONIC_ARTS), // John Madden Football 93
    entry("T-50516", I2cChip::X24C01, ELECTRONIC_ARTS), // John Madden Football 93 (Championship Ed.)
    entry("T-50606", I2cChip::X24C01, ELECTRONIC_ARTS), // Bill Walsh College Football
    // Sega
    entry("T-12046", I2cChip::X24C01, SEGA),  // Megaman - The Wily Wars
    entry("T-12053", I2cChip::X24C01, SEGA),  // Rockman Mega World
    entry("MK-1215", I2cChip::X24C01, SEGA),  // Evander Holyfield's Boxing
    entry("MK-1228", I2cChip::X24C01, SEGA),  // Greatest Heavyweights of the Ring
    entry("G-5538", I2cChip::X24C01, SEGA),   // Greatest Heavyweights of the Ring (J)
    entry("PR-1993", I2cChip::X24C01, SEGA),  // Greatest Heavyweights of the Ring (Prototype)
    entry("G-4060", I2cChip::X24C01, SEGA),   // Wonder Boy in Monster World
    entry("00001211", I2cChip::X24C01, SEGA), // Sports Talk Baseball
    entry("00004076", I2cChip::X24C01, SEGA), // Honoo no Toukyuuji Dodge Danpei
    entry("G-4524", I2cChip::X24C01, SEGA),   // Ninja Burai Densetsu
    entry("00054503", I2cChip::X24C01, SEGA), // Game Toshokan
    // Codemasters
    entry("T-120106", I2cChip::C24C08, CODEMASTERS), // Brian Lara Cricket
    entry("T-120096", I2cChip::C24C16, CODEMASTERS), // Micro Machines 2
    entry("T-120146", I2cChip::C24C65, CODEMASTERS), // Brian Lara Cricket 96
];

/// Looks up the EEPROM wiring for a header serial and checksum.
pub fn detect_eeprom(serial: &str, checksum: u16) -> Option<&'static EepromEntry> {
    let found = EEPROM_DATABASE
        .iter()
        .find(|e| serial.contains(e.product) && (e.checksum == 0 || e.checksum == checksum));
    if let Some(e) = found {
        info!("EEPROM detected: {} ({})", e.chip, e.product);
    }
    found
}

/// EEPROM plus its cartridge wiring
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartEeprom {
    pub chip: EepromI2c,
    pub ports: EepromPorts,
}

impl CartEeprom {
    pub fn new(entry: &EepromEntry) -> Self {
        Self {
            chip: EepromI2c::new(entry.chip),
            ports: entry.ports,
        }
    }

    pub fn handles_read(&self, addr: u32) -> bool {
        addr == self.ports.sda_out_addr
    }

    pub fn handles_read_word(&self, addr: u32) -> bool {
        addr & !1 == self.ports.sda_out_addr & !1
    }

    pub fn handles_write(&self, addr: u32) -> bool {
        addr == self.ports.sda_in_addr || addr == self.ports.scl_addr
    }

    pub fn handles_write_word(&self, addr: u32) -> bool {
        let addr = addr & !1;
        addr == self.ports.sda_in_addr & !1 || addr == self.ports.scl_addr & !1
    }

    pub fn read_byte(&self, _addr: u32) -> u8 {
        self.chip.read_sda() << self.ports.sda_out_bit
    }

    pub fn read_word(&self, _addr: u32) -> u16 {
        let lane = if self.ports.sda_out_addr & 1 != 0 { 0 } else { 8 };
        (self.chip.read_sda() as u16) << (self.ports.sda_out_bit + lane)
    }

    pub fn write_byte(&mut self, addr: u32, value: u8) {
        let mut sda = self.current_sda();
        let mut scl = self.current_scl();
        if addr == self.ports.scl_addr {
            scl = (value >> self.ports.scl_bit) & 1;
        }
        if addr == self.ports.sda_in_addr {
            sda = (value >> self.ports.sda_in_bit) & 1;
        }
        self.chip.write_lines(sda, scl);
    }

    pub fn write_word(&mut self, addr: u32, value: u16) {
        let addr = addr & !1;
        let lane = |port: u32| if port & 1 != 0 { value as u8 } else { (value >> 8) as u8 };

        let mut sda = self.current_sda();
        let mut scl = self.current_scl();
        if self.ports.scl_addr & !1 == addr {
            scl = (lane(self.ports.scl_addr) >> self.ports.scl_bit) & 1;
        }
        if self.ports.sda_in_addr & !1 == addr {
            sda = (lane(self.ports.sda_in_addr) >> self.ports.sda_in_bit) & 1;
        }
        self.chip.write_lines(sda, scl);
    }

    fn current_sda(&self) -> u8 {
        self.chip.line_sda()
    }

    fn current_scl(&self) -> u8 {
        self.chip.line_scl()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_by_serial() {
        let found = detect_eeprom("GM T-50396 -00", 0x1234).unwrap();
        assert_eq!(found.chip, I2cChip::X24C01);
        assert_eq!(found.ports, ELECTRONIC_ARTS);

        let found = detect_eeprom("GM T-120146-00", 0).unwrap();
        assert_eq!(found.chip, I2cChip::C24C65);

        assert!(detect_eeprom("GM 00001009-00", 0).is_none());
    }

    #[test]
    fn test_port_decode() {
        let eeprom = CartEeprom::new(detect_eeprom("GM T-120106-00", 0).unwrap());
        assert!(eeprom.handles_write(0x300000));
        assert!(!eeprom.handles_write(0x300002));
        assert!(eeprom.handles_read(0x380001));
        assert!(eeprom.handles_read_word(0x380000));
        assert!(!eeprom.handles_read(0x300000));
    }

    #[test]
    fn test_idle_line_reads_high() {
        let eeprom = CartEeprom::new(detect_eeprom("GM T-50176 -00", 0).unwrap());
        // EA wiring: SDA out on bit 7 of the even byte
        assert_eq!(eeprom.read_byte(0x200000), 0x80);
        assert_eq!(eeprom.read_word(0x200000), 0x8000);
    }

    #[test]
    fn test_start_condition_through_ports() {
        let mut eeprom = CartEeprom::new(detect_eeprom("GM T-12046 -00", 0).unwrap());
        // Sega wiring: SDA bit 0, SCL bit 1 of $200001
        eeprom.write_byte(0x200001, 0x03);
        eeprom.write_byte(0x200001, 0x02);
        assert_eq!(eeprom.chip.phase(), I2cPhase::WordAddress7Bits);
    }
}
