//! Control registers
//!
//! This module contains the registers inside the bulk write window
//! (0x02..=0x07):
//! - Power, mute and seek control
//! - Channel selection and tune start
//! - RDS enable and de-emphasis
//! - Band, spacing and volume
//!
//! These are the only registers the driver ever writes. The datasheet asks
//! that they are never written without first reading the current contents.

use bitflags::bitflags;

use super::{flags_register, RegisterAddress};
use crate::band::{Band, ChannelSpacing, DeEmphasis, MAX_CHANNEL};

bitflags! {
    /// Power configuration register (address: 0x02)
    ///
    /// # Important Notes
    /// - Setting ENABLE together with DISABLE starts the power-down sequence
    /// - SEEK stays set until cleared by the host after STC goes high
    /// - SKMODE clear wraps the seek at the band edges
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct PowerConfig: u16 {
        /// Softmute disable
        const DSMUTE = 1 << 15;
        /// Mute disable (set = audio on)
        const DMUTE = 1 << 14;
        /// Force mono
        const MONO = 1 << 13;
        /// RDS verbose mode
        const RDSM = 1 << 11;
        /// Stop seeking at the band limit instead of wrapping
        const SKMODE = 1 << 10;
        /// Seek up (clear = seek down)
        const SEEKUP = 1 << 9;
        /// Start seek
        const SEEK = 1 << 8;
        /// Power-down request
        const DISABLE = 1 << 6;
        /// Power-up enable
        const ENABLE = 1;
    }
}

flags_register!(PowerConfig, RegisterAddress::PowerConfig, writable);

bitflags! {
    /// Channel register (address: 0x03)
    ///
    /// The channel index occupies bits 9:0. Setting TUNE starts a tune to
    /// that channel; the host must clear it after STC is reported.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Channel: u16 {
        /// Start tune
        const TUNE = 1 << 15;
        /// Channel select field
        const CHAN = MAX_CHANNEL;
    }
}

flags_register!(Channel, RegisterAddress::Channel, writable);

impl Channel {
    /// Selected channel index.
    pub fn channel(self) -> u16 {
        self.bits() & MAX_CHANNEL
    }

    /// Replaces the channel index, keeping every other bit.
    pub fn with_channel(self, channel: u16) -> Self {
        Self::from_bits_retain((self.bits() & !MAX_CHANNEL) | (channel & MAX_CHANNEL))
    }
}

bitflags! {
    /// System configuration 1 register (address: 0x04)
    ///
    /// # Important Notes
    /// - RDS must be set for RDSR to ever be reported
    /// - DE selects 50 µs de-emphasis when set, 75 µs when clear
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct SysConfig1: u16 {
        /// RDS interrupt enable
        const RDSIEN = 1 << 15;
        /// Seek/tune complete interrupt enable
        const STCIEN = 1 << 14;
        /// RDS enable
        const RDS = 1 << 12;
        /// De-emphasis 50 µs
        const DE = 1 << 11;
        /// AGC disable
        const AGCD = 1 << 10;
    }
}

flags_register!(SysConfig1, RegisterAddress::SysConfig1, writable);

impl SysConfig1 {
    pub fn with_de_emphasis(self, de_emphasis: DeEmphasis) -> Self {
        match de_emphasis {
            DeEmphasis::Us75 => self - Self::DE,
            DeEmphasis::Europe50 => self | Self::DE,
        }
    }
}

bitflags! {
    /// System configuration 2 register (address: 0x05)
    ///
    /// Holds multi-bit fields only: seek RSSI threshold (15:8), band (7:6),
    /// channel spacing (5:4) and volume (3:0). Use the accessor methods.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct SysConfig2: u16 {
        /// Seek RSSI threshold field
        const SEEKTH = 0xFF << 8;
        /// Band select field
        const BAND = 0b11 << 6;
        /// Channel spacing field
        const SPACE = 0b11 << 4;
        /// Volume field
        const VOLUME = 0x0F;
    }
}

flags_register!(SysConfig2, RegisterAddress::SysConfig2, writable);

impl SysConfig2 {
    /// Highest volume step.
    pub const MAX_VOLUME: u8 = 15;

    pub fn volume(self) -> u8 {
        (self.bits() & Self::VOLUME.bits()) as u8
    }

    /// Replaces the volume field. Values above 15 are clamped.
    pub fn with_volume(self, volume: u8) -> Self {
        let volume = u16::from(volume.min(Self::MAX_VOLUME));
        Self::from_bits_retain((self.bits() & !Self::VOLUME.bits()) | volume)
    }

    pub fn band(self) -> Option<Band> {
        Band::from_bits((self.bits() & Self::BAND.bits()) >> 6)
    }

    pub fn with_band(self, band: Band) -> Self {
        Self::from_bits_retain((self.bits() & !Self::BAND.bits()) | (band.bits() << 6))
    }

    pub fn spacing(self) -> Option<ChannelSpacing> {
        ChannelSpacing::from_bits((self.bits() & Self::SPACE.bits()) >> 4)
    }

    pub fn with_spacing(self, spacing: ChannelSpacing) -> Self {
        Self::from_bits_retain((self.bits() & !Self::SPACE.bits()) | (spacing.bits() << 4))
    }

    pub fn seek_threshold(self) -> u8 {
        (self.bits() >> 8) as u8
    }
}

bitflags! {
    /// System configuration 3 register (address: 0x06)
    ///
    /// Softmute attack/attenuation and seek SNR/impulse thresholds. The
    /// driver leaves these at their reset values.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct SysConfig3: u16 {
        /// Softmute attack/recover rate field
        const SMUTER = 0b11 << 14;
        /// Softmute attenuation field
        const SMUTEA = 0b11 << 12;
        /// Extended volume range
        const VOLEXT = 1 << 8;
        /// Seek SNR threshold field
        const SKSNR = 0x0F << 4;
        /// Seek impulse detection threshold field
        const SKCNT = 0x0F;
    }
}

flags_register!(SysConfig3, RegisterAddress::SysConfig3, writable);

bitflags! {
    /// Test 1 register (address: 0x07)
    ///
    /// # Important Notes
    /// - AN230 rev 0.61 requires writing 0x8100 here before power-up to start
    ///   the crystal oscillator; the value from rev 0.5 (0xBC04) does not work
    /// - The oscillator needs 500 ms to settle afterwards
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Test1: u16 {
        /// Crystal oscillator enable
        const XOSCEN = 1 << 15;
        /// Audio high-Z enable
        const AHIZEN = 1 << 14;
    }
}

flags_register!(Test1, RegisterAddress::Test1, writable);

impl Test1 {
    /// Value that enables the crystal oscillator.
    pub const OSCILLATOR_ENABLE: Self = Self::from_bits_retain(0x8100);
}
