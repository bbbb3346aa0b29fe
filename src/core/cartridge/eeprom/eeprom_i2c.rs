// megadrive-core/src/core/cartridge/eeprom/eeprom_i2c.rs

//! Serial EEPROM (24Cxx family) driven through two wires: SCL (clock) and
//! SDA (data). Transfers are framed by START (SDA falling while SCL is high)
//! and STOP (SDA rising while SCL is high) conditions.

use log::debug;

/// Bus protocol phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum I2cPhase {
    StandBy,
    WaitStop,
    DeviceAddress,
    WordAddress7Bits,
    WordAddressHigh,
    WordAddressLow,
    WriteData,
    ReadData,
}

impl I2cPhase {
    fn from_u8(value: u8) -> Option<Self> {
        Some(match value {
            0 => I2cPhase::StandBy,
            1 => I2cPhase::WaitStop,
            2 => I2cPhase::DeviceAddress,
            3 => I2cPhase::WordAddress7Bits,
            4 => I2cPhase::WordAddressHigh,
            5 => I2cPhase::WordAddressLow,
            6 => I2cPhase::WriteData,
            7 => I2cPhase::ReadData,
            _ => return None,
        })
    }
}

/// EEPROM chip
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum I2cChip {
    X24C01,
    X24C02,
    C24C02,
    C24C04,
    C24C08,
    C24C16,
    C24C65,
}

impl I2cChip {
    /// (address bits, size mask, page write mask)
    fn geometry(self) -> (u8, u16, u16) {
        match self {
            I2cChip::X24C01 => (7, 0x7F, 0x03),
            I2cChip::X24C02 => (8, 0xFF, 0x03),
            I2cChip::C24C02 => (8, 0xFF, 0x07),
            I2cChip::C24C04 => (8, 0x1FF, 0x0F),
            I2cChip::C24C08 => (8, 0x3FF, 0x0F),
            I2cChip::C24C16 => (8, 0x7FF, 0x0F),
            I2cChip::C24C65 => (16, 0x1FFF, 0x3F),
        }
    }

    pub fn size(self) -> usize {
        self.geometry().1 as usize + 1
    }
}

impl std::fmt::Display for I2cChip {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            I2cChip::X24C01 => "X24C01",
            I2cChip::X24C02 => "X24C02",
            I2cChip::C24C02 => "24C02",
            I2cChip::C24C04 => "24C04",
            I2cChip::C24C08 => "24C08",
            I2cChip::C24C16 => "24C16",
            I2cChip::C24C65 => "24C65",
        };
        write!(f, "{}", name)
    }
}

/// Size of the serialised line/protocol state
const STATE_LEN: usize = 12;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EepromI2c {
    chip: I2cChip,
    address_bits: u8,
    size_mask: u16,
    page_mask: u16,

    sda: u8,
    scl: u8,
    old_sda: u8,
    old_scl: u8,
    cycles: u8,
    read_mode: bool,
    device_address: u16,
    word_address: u16,
    buffer: u8,
    phase: I2cPhase,

    memory: Vec<u8>,
    dirty: bool,
}

impl EepromI2c {
    pub fn new(chip: I2cChip) -> Self {
        let (address_bits, size_mask, page_mask) = chip.geometry();
        Self {
            chip,
            address_bits,
            size_mask,
            page_mask,
            sda: 1,
            scl: 1,
            old_sda: 1,
            old_scl: 1,
            cycles: 0,
            read_mode: false,
            device_address: 0,
            word_address: 0,
            buffer: 0,
            phase: I2cPhase::StandBy,
            memory: vec![0xFF; chip.size()],
            dirty: false,
        }
    }

    pub fn chip(&self) -> I2cChip {
        self.chip
    }

    pub fn phase(&self) -> I2cPhase {
        self.phase
    }

    pub fn memory(&self) -> &[u8] {
        &self.memory
    }

    /// Last level driven on SDA by the host
    pub fn line_sda(&self) -> u8 {
        self.sda
    }

    /// Last level driven on SCL by the host
    pub fn line_scl(&self) -> u8 {
        self.scl
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn clear_dirty(&mut self) {
        self.dirty = false;
    }

    /// Replaces the array contents (save file), returns the bytes used.
    pub fn load_memory(&mut self, data: &[u8]) -> usize {
        let count = data.len().min(self.memory.len());
        self.memory[..count].copy_from_slice(&data[..count]);
        self.dirty = false;
        count
    }

    /// Returns the lines to idle, keeping the array contents.
    pub fn reset(&mut self) {
        self.sda = 1;
        self.scl = 1;
        self.old_sda = 1;
        self.old_scl = 1;
        self.cycles = 0;
        self.read_mode = false;
        self.device_address = 0;
        self.word_address = 0;
        self.buffer = 0;
        self.phase = I2cPhase::StandBy;
    }

    #[inline]
    fn scl_rising(&self) -> bool {
        self.old_scl == 0 && self.scl != 0
    }

    #[inline]
    fn scl_falling(&self) -> bool {
        self.old_scl != 0 && self.scl == 0
    }

    #[inline]
    fn array_address(&self) -> usize {
        ((self.device_address | self.word_address) & self.size_mask) as usize
    }

    fn detect_start(&mut self) {
        if self.old_scl != 0 && self.scl != 0 && self.old_sda != 0 && self.sda == 0 {
            self.cycles = 0;
            if self.address_bits == 7 {
                self.word_address = 0;
                self.phase = I2cPhase::WordAddress7Bits;
            } else {
                self.device_address = 0;
                self.phase = I2cPhase::DeviceAddress;
            }
        }
    }

    fn detect_stop(&mut self) {
        if self.old_scl != 0 && self.scl != 0 && self.old_sda == 0 && self.sda != 0 {
            self.phase = I2cPhase::StandBy;
        }
    }

    /// Counts clock pulses; returns true when the ninth (ACK) pulse ends.
    fn clock_byte(&mut self) -> bool {
        if self.cycles < 9 {
            self.cycles += 1;
            false
        } else {
            self.cycles = 1;
            true
        }
    }

    /// Drives both lines. Values are 0 or 1.
    pub fn write_lines(&mut self, sda: u8, scl: u8) {
        self.sda = sda & 1;
        self.scl = scl & 1;

        if self.phase == I2cPhase::StandBy {
            self.detect_start();
        } else if self.phase == I2cPhase::WaitStop {
            self.detect_stop();
        } else {
            self.detect_start();
            self.detect_stop();
            self.clock();
        }

        self.old_scl = self.scl;
        self.old_sda = self.sda;
    }

    fn clock(&mut self) {
        match self.phase {
            I2cPhase::WordAddress7Bits => {
                if self.scl_falling() {
                    if self.clock_byte() {
                        self.phase = if self.read_mode { I2cPhase::ReadData } else { I2cPhase::WriteData };
                        self.buffer = 0;
                    }
                } else if self.scl_rising() {
                    if self.cycles < 8 {
                        self.word_address |= (self.sda as u16) << (7 - self.cycles);
                    } else if self.cycles == 8 {
                        self.read_mode = self.sda != 0;
                    }
                }
            }

            I2cPhase::DeviceAddress => {
                if self.scl_falling() {
                    if self.clock_byte() {
                        self.device_address = ((self.device_address as u32) << self.address_bits) as u16;
                        if self.read_mode {
                            self.phase = I2cPhase::ReadData;
                        } else {
                            self.word_address = 0;
                            self.phase = if self.address_bits == 16 {
                                I2cPhase::WordAddressHigh
                            } else {
                                I2cPhase::WordAddressLow
                            };
                        }
                    }
                } else if self.scl_rising() {
                    if self.cycles > 4 && self.cycles < 8 {
                        self.device_address |= (self.sda as u16) << (7 - self.cycles);
                    } else if self.cycles == 8 {
                        self.read_mode = self.sda != 0;
                    }
                }
            }

            I2cPhase::WordAddressHigh => {
                if self.scl_falling() {
                    if self.clock_byte() {
                        self.phase = I2cPhase::WordAddressLow;
                    }
                } else if self.scl_rising() && self.cycles < 9 {
                    if (self.size_mask as u32) < (1u32 << (16 - self.cycles)) {
                        self.device_address >>= 1;
                    } else {
                        self.word_address |= (self.sda as u16) << (16 - self.cycles);
                    }
                }
            }

            I2cPhase::WordAddressLow => {
                if self.scl_falling() {
                    if self.clock_byte() {
                        self.phase = I2cPhase::WriteData;
                        self.buffer = 0;
                    }
                } else if self.scl_rising() && self.cycles < 9 {
                    if (self.size_mask as u32) < (1u32 << (8 - self.cycles)) {
                        self.device_address >>= 1;
                    } else {
                        self.word_address |= (self.sda as u16) << (8 - self.cycles);
                    }
                }
            }

            I2cPhase::ReadData => {
                if self.scl_falling() {
                    let _ = self.clock_byte();
                } else if self.scl_rising() && self.cycles == 9 {
                    if self.sda != 0 {
                        // No ACK from the master: transfer over
                        self.phase = I2cPhase::WaitStop;
                    } else {
                        self.word_address = (self.word_address + 1) & self.size_mask;
                    }
                }
            }

            I2cPhase::WriteData => {
                if self.scl_falling() {
                    let _ = self.clock_byte();
                } else if self.scl_rising() {
                    if self.cycles < 9 {
                        self.buffer |= self.sda << (8 - self.cycles);
                    } else {
                        let address = self.array_address();
                        if self.memory[address] != self.buffer {
                            self.memory[address] = self.buffer;
                            self.dirty = true;
                        }
                        self.buffer = 0;
                        // Address wraps inside the current page
                        self.word_address = (self.word_address & !self.page_mask)
                            | (self.word_address.wrapping_add(1) & self.page_mask);
                    }
                }
            }

            I2cPhase::StandBy | I2cPhase::WaitStop => {}
        }
    }

    /// Level of the SDA output line
    pub fn read_sda(&self) -> u8 {
        if self.phase == I2cPhase::ReadData {
            if self.cycles < 9 {
                return (self.memory[self.array_address()] >> (8 - self.cycles)) & 1;
            }
        } else if self.cycles == 9 {
            // ACK
            return 0;
        }
        self.sda
    }

    pub fn save_state(&self) -> Vec<u8> {
        let mut state = Vec::with_capacity(STATE_LEN + self.memory.len());
        state.push(self.sda);
        state.push(self.scl);
        state.push(self.old_sda);
        state.push(self.old_scl);
        state.push(self.cycles);
        state.push(self.read_mode as u8);
        state.extend_from_slice(&self.device_address.to_le_bytes());
        state.extend_from_slice(&self.word_address.to_le_bytes());
        state.push(self.buffer);
        state.push(self.phase as u8);
        state.extend_from_slice(&self.memory);
        state
    }

    pub fn load_state(&mut self, data: &[u8]) -> bool {
        if data.len() != STATE_LEN + self.memory.len() {
            return false;
        }
        let Some(phase) = I2cPhase::from_u8(data[11]) else {
            return false;
        };

        self.sda = data[0];
        self.scl = data[1];
        self.old_sda = data[2];
        self.old_scl = data[3];
        self.cycles = data[4];
        self.read_mode = data[5] != 0;
        self.device_address = u16::from_le_bytes([data[6], data[7]]);
        self.word_address = u16::from_le_bytes([data[8], data[9]]);
        self.buffer = data[10];
        self.phase = phase;
        self.memory.copy_from_slice(&data[STATE_LEN..]);
        debug!("{} EEPROM state restored", self.chip);
        true
    }
}
