//! Status and identification registers
//!
//! This module contains the read-only registers:
//! - Device and chip identification (0x00, 0x01)
//! - Seek/tune status, RDS ready and signal strength (0x0A)
//! - Current channel and RDS block error rates (0x0B)
//!
//! The RDS block registers (0x0C..=0x0F) carry raw group data and are decoded
//! by [`crate::rds::RdsGroup`].

use bitflags::bitflags;

use core::convert::Infallible;

use regiface::{register, FromByteArray, ReadableRegister};

use super::{flags_register, RegisterAddress};
use crate::band::MAX_CHANNEL;

/// Manufacturer ID reported by Silicon Labs parts.
pub const SILICON_LABS_MFGID: u16 = 0x242;

/// Error count bucket reported for one RDS block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BlockErrors {
    /// No errors
    None,
    /// 1-2 corrected errors
    OneToTwo,
    /// 3-5 corrected errors
    ThreeToFive,
    /// 6 or more errors, block uncorrectable
    Uncorrectable,
}

impl BlockErrors {
    fn from_bits(bits: u16) -> Self {
        match bits & 0b11 {
            0b00 => Self::None,
            0b01 => Self::OneToTwo,
            0b10 => Self::ThreeToFive,
            _ => Self::Uncorrectable,
        }
    }
}

bitflags! {
    /// Status and RSSI register (address: 0x0A)
    ///
    /// # Important Notes
    /// - STC stays set until the host clears SEEK/TUNE
    /// - SF/BL is only meaningful while STC is set
    /// - RDSR is held for about 40 ms after a group arrives
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct StatusRssi: u16 {
        /// RDS group ready
        const RDSR = 1 << 15;
        /// Seek/tune complete
        const STC = 1 << 14;
        /// Seek fail / band limit
        const SFBL = 1 << 13;
        /// AFC railed
        const AFCRL = 1 << 12;
        /// RDS decoder synchronized
        const RDSS = 1 << 11;
        /// Block A error field
        const BLERA = 0b11 << 9;
        /// Stereo indicator
        const STEREO = 1 << 8;
        /// RSSI field, dBµV
        const RSSI = 0xFF;
    }
}

flags_register!(StatusRssi, RegisterAddress::StatusRssi);

impl StatusRssi {
    /// Received signal strength in dBµV.
    pub fn rssi(self) -> u8 {
        (self.bits() & Self::RSSI.bits()) as u8
    }

    pub fn block_a_errors(self) -> BlockErrors {
        BlockErrors::from_bits(self.bits() >> 9)
    }
}

bitflags! {
    /// Read channel register (address: 0x0B)
    ///
    /// Bits 9:0 report the channel the tuner is on, which after a seek
    /// differs from the CHANNEL register.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ReadChannel: u16 {
        /// Block B error field
        const BLERB = 0b11 << 14;
        /// Block C error field
        const BLERC = 0b11 << 12;
        /// Block D error field
        const BLERD = 0b11 << 10;
        /// Current channel field
        const READCHAN = MAX_CHANNEL;
    }
}

flags_register!(ReadChannel, RegisterAddress::ReadChannel);

impl ReadChannel {
    pub fn channel(self) -> u16 {
        self.bits() & MAX_CHANNEL
    }

    pub fn block_b_errors(self) -> BlockErrors {
        BlockErrors::from_bits(self.bits() >> 14)
    }

    pub fn block_c_errors(self) -> BlockErrors {
        BlockErrors::from_bits(self.bits() >> 12)
    }

    pub fn block_d_errors(self) -> BlockErrors {
        BlockErrors::from_bits(self.bits() >> 10)
    }
}

/// Device ID register (address: 0x00)
#[register(0x00u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, ReadableRegister)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DeviceId {
    /// Part number, bits 15:12 (0x1 for the Si4700/01/02/03 family)
    pub part_number: u8,
    /// Manufacturer ID, bits 11:0
    pub manufacturer: u16,
}

impl FromByteArray for DeviceId {
    type Error = Infallible;
    type Array = [u8; 2];

    fn from_bytes(bytes: Self::Array) -> Result<Self, Self::Error> {
        let word = u16::from_be_bytes(bytes);
        Ok(Self {
            part_number: (word >> 12) as u8,
            manufacturer: word & 0x0FFF,
        })
    }
}

impl DeviceId {
    pub fn is_silicon_labs(&self) -> bool {
        self.manufacturer == SILICON_LABS_MFGID
    }
}

/// Device model decoded from CHIPID bits 9:6.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DeviceModel {
    /// Si4700, also reported by an Si4702/03 before power-up
    Si4700,
    Si4701,
    Si4702,
    Si4703,
    Unknown(u8),
}

/// Chip ID register (address: 0x01)
#[register(0x01u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, ReadableRegister)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ChipId {
    /// Chip revision, bits 15:10 (0x04 on C19 silicon)
    pub revision: u8,
    /// Device, bits 9:6
    pub device: DeviceModel,
    /// Firmware version, bits 5:0 (0 before power-up)
    pub firmware: u8,
}

impl FromByteArray for ChipId {
    type Error = Infallible;
    type Array = [u8; 2];

    fn from_bytes(bytes: Self::Array) -> Result<Self, Self::Error> {
        let word = u16::from_be_bytes(bytes);
        let device = match ((word >> 6) & 0x0F) as u8 {
            0b0000 => DeviceModel::Si4700,
            0b0001 => DeviceModel::Si4702,
            0b1000 => DeviceModel::Si4701,
            0b1001 => DeviceModel::Si4703,
            other => DeviceModel::Unknown(other),
        };
        Ok(Self {
            revision: (word >> 10) as u8,
            device,
            firmware: (word & 0x3F) as u8,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_fields_decode() {
        let status = StatusRssi::from_bits_retain(0xC000 | 0x0400 | 0x0100 | 0x002A);
        assert!(status.contains(StatusRssi::RDSR));
        assert!(status.contains(StatusRssi::STC));
        assert!(!status.contains(StatusRssi::SFBL));
        assert!(status.contains(StatusRssi::STEREO));
        assert_eq!(status.rssi(), 42);
        assert_eq!(status.block_a_errors(), BlockErrors::ThreeToFive);
    }

    #[test]
    fn read_channel_decodes_errors_and_channel() {
        let reg = ReadChannel::from_bits_retain(0b01_10_11_00_0110_0100);
        assert_eq!(reg.channel(), 100);
        assert_eq!(reg.block_b_errors(), BlockErrors::OneToTwo);
        assert_eq!(reg.block_c_errors(), BlockErrors::ThreeToFive);
        assert_eq!(reg.block_d_errors(), BlockErrors::Uncorrectable);
    }

    #[test]
    fn identification_registers_decode() {
        let id = DeviceId::from_bytes([0x12, 0x42]).unwrap();
        assert_eq!(id.part_number, 1);
        assert!(id.is_silicon_labs());

        let chip = ChipId::from_bytes([0x12, 0x53]).unwrap();
        assert_eq!(chip.revision, 4);
        assert_eq!(chip.device, DeviceModel::Si4703);
        assert_eq!(chip.firmware, 0x13);
    }
}
