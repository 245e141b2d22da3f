//! Radio Data System decoding
//!
//! RDS data arrives as groups of four 16-bit blocks. The tuner corrects and
//! latches one group at a time into RDSA..RDSD and raises RDSR. Which fields a
//! group carries depends on its type code (block B bits 15:12) and version
//! (block B bit 11):
//!
//! - [`ProgramServiceName`]: 8-character station name, groups 0A/0B
//! - [`RadioText`]: up to 64 characters of free text, groups 2A/2B
//! - [`AlternateFrequencies`]: list of frequencies carrying the same
//!   programme, group 0A block C
//! - [`ClockTime`]: UTC date/time and local offset, group 4A
//!
//! Program identification, program type and the traffic programme flag sit in
//! blocks A/B of every group. Reference: US RBDS Standard, April 1998
//! (NRSC-4), which follows EN 50067.
//!
//! [`RdsDecoder`] combines all of the above and tracks how fresh each field is.

mod af;
mod clock;
mod decoder;
mod text;

pub use af::*;
pub use clock::*;
pub use decoder::*;
pub use text::*;

use crate::registers::{BlockErrors, ReadChannel, RegisterAddress, RegisterFile, StatusRssi};

/// Group version, block B bit 11.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum GroupVersion {
    /// Block C carries group-specific data
    A,
    /// Block C repeats the program identification
    B,
}

/// One RDS group as latched in RDSA..RDSD.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RdsGroup {
    pub blocks: [u16; 4],
}

impl RdsGroup {
    pub const fn new(a: u16, b: u16, c: u16, d: u16) -> Self {
        Self {
            blocks: [a, b, c, d],
        }
    }

    /// Extracts the latched group from a register snapshot.
    pub fn from_registers(registers: &RegisterFile) -> Self {
        Self::new(
            registers.word(RegisterAddress::RdsA),
            registers.word(RegisterAddress::RdsB),
            registers.word(RegisterAddress::RdsC),
            registers.word(RegisterAddress::RdsD),
        )
    }

    /// Returns the latched group if RDSR is set and every block was
    /// received or corrected.
    pub fn latched(registers: &RegisterFile) -> Option<Self> {
        let status = registers.get::<StatusRssi>();
        if !status.contains(StatusRssi::RDSR) {
            return None;
        }
        let readchan = registers.get::<ReadChannel>();
        let errors = [
            status.block_a_errors(),
            readchan.block_b_errors(),
            readchan.block_c_errors(),
            readchan.block_d_errors(),
        ];
        if errors.contains(&BlockErrors::Uncorrectable) {
            return None;
        }
        Some(Self::from_registers(registers))
    }

    pub const fn a(&self) -> u16 {
        self.blocks[0]
    }

    pub const fn b(&self) -> u16 {
        self.blocks[1]
    }

    pub const fn c(&self) -> u16 {
        self.blocks[2]
    }

    pub const fn d(&self) -> u16 {
        self.blocks[3]
    }

    /// Group type code, 0..=15.
    pub const fn group_type(&self) -> u8 {
        (self.b() >> 12) as u8
    }

    pub const fn version(&self) -> GroupVersion {
        if self.b() & 0x0800 != 0 {
            GroupVersion::B
        } else {
            GroupVersion::A
        }
    }

    /// Program identification code, block A.
    pub const fn program_id(&self) -> u16 {
        self.a()
    }

    /// Program type code, block B bits 9:5.
    pub const fn program_type(&self) -> u8 {
        ((self.b() >> 5) & 0x1F) as u8
    }

    /// Traffic programme flag, block B bit 10.
    pub const fn traffic_program(&self) -> bool {
        self.b() & 0x0400 != 0
    }
}

/// Splits a block into its two characters, high byte first.
pub(crate) const fn block_chars(block: u16) -> [u8; 2] {
    block.to_be_bytes()
}

/// Maps an RDS character code to a displayable character.
///
/// The RDS basic character set matches ASCII over the printable range; codes
/// outside it are shown as spaces.
pub(crate) fn display_char(code: u8) -> char {
    match code {
        0x20..=0x7E => code as char,
        _ => ' ',
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn group_header_fields() {
        // 2B, TP set, PTY 10, A/B flag set, segment 5
        let group = RdsGroup::new(0x54A8, 0x2000 | 0x0800 | 0x0400 | (10 << 5) | 0x0015, 0, 0);
        assert_eq!(group.group_type(), 2);
        assert_eq!(group.version(), GroupVersion::B);
        assert_eq!(group.program_id(), 0x54A8);
        assert_eq!(group.program_type(), 10);
        assert!(group.traffic_program());
    }

    fn registers(status: u16, readchan: u16) -> RegisterFile {
        let mut words = [0u16; 16];
        words[RegisterAddress::StatusRssi.index()] = status;
        words[RegisterAddress::ReadChannel.index()] = readchan;
        words[RegisterAddress::RdsA.index()] = 0xC201;
        words[RegisterAddress::RdsB.index()] = 0x0402;
        RegisterFile::from_words(words)
    }

    #[test]
    fn latched_group_requires_ready_flag() {
        assert_eq!(RdsGroup::latched(&registers(0x0000, 0x0000)), None);
        let group = RdsGroup::latched(&registers(0x8000, 0x0000)).unwrap();
        assert_eq!(group.blocks, [0xC201, 0x0402, 0, 0]);
    }

    #[test]
    fn latched_group_rejects_uncorrectable_blocks() {
        // BLERA = 3
        assert_eq!(RdsGroup::latched(&registers(0x8600, 0x0000)), None);
        // BLERD = 3
        assert_eq!(RdsGroup::latched(&registers(0x8000, 0x0C00)), None);
        // Corrected errors are accepted
        assert!(RdsGroup::latched(&registers(0x8200, 0x5400)).is_some());
    }
}
