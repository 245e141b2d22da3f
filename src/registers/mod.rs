//! Register definitions for the Si4702/03
//! Generated from the Si4702-03-C19 datasheet and AN230 programming guide
//!
//! The chip exposes sixteen 16-bit registers. They cannot be addressed
//! individually over the two-wire bus: a read always starts at 0x0A and wraps
//! through 0x0F back to 0x09, a write always starts at 0x02. The driver
//! therefore keeps a [`RegisterFile`] mirror and every typed register below is
//! a view over one of its words.
//!
//! Register identity and the word codec come from `regiface`: each type
//! reports its address through [`regiface::Register::id`] and converts to and
//! from a big-endian `[u8; 2]`.

use core::convert::Infallible;

use regiface::{ReadableRegister, WritableRegister};

mod control;
mod status;

pub use control::*;
pub use status::*;

/// Number of registers on the chip.
pub const REGISTER_COUNT: usize = 16;

/// Bytes returned by one bulk read (registers 0x0A..=0x0F, 0x00..=0x09).
pub const READ_LEN: usize = REGISTER_COUNT * 2;

/// First register covered by a bulk write.
pub const FIRST_CONTROL: usize = 0x02;

/// Number of registers covered by a bulk write (0x02..=0x07).
pub const CONTROL_COUNT: usize = 6;

/// Bytes sent by one bulk write.
pub const WRITE_LEN: usize = CONTROL_COUNT * 2;

/// Register the chip starts reading from.
const READ_START: usize = 0x0A;

/// Register addresses, named after the datasheet register map (section 6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum RegisterAddress {
    DeviceId = 0x00,
    ChipId = 0x01,
    PowerConfig = 0x02,
    Channel = 0x03,
    SysConfig1 = 0x04,
    SysConfig2 = 0x05,
    SysConfig3 = 0x06,
    Test1 = 0x07,
    Test2 = 0x08,
    BootConfig = 0x09,
    StatusRssi = 0x0A,
    ReadChannel = 0x0B,
    RdsA = 0x0C,
    RdsB = 0x0D,
    RdsC = 0x0E,
    RdsD = 0x0F,
}

impl RegisterAddress {
    /// All registers in index order.
    pub const ALL: [Self; REGISTER_COUNT] = [
        Self::DeviceId,
        Self::ChipId,
        Self::PowerConfig,
        Self::Channel,
        Self::SysConfig1,
        Self::SysConfig2,
        Self::SysConfig3,
        Self::Test1,
        Self::Test2,
        Self::BootConfig,
        Self::StatusRssi,
        Self::ReadChannel,
        Self::RdsA,
        Self::RdsB,
        Self::RdsC,
        Self::RdsD,
    ];

    /// Index of the register in the register file.
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Datasheet name of the register.
    pub const fn name(self) -> &'static str {
        match self {
            Self::DeviceId => "DEVICEID",
            Self::ChipId => "CHIPID",
            Self::PowerConfig => "POWERCFG",
            Self::Channel => "CHANNEL",
            Self::SysConfig1 => "SYSCONFIG1",
            Self::SysConfig2 => "SYSCONFIG2",
            Self::SysConfig3 => "SYSCONFIG3",
            Self::Test1 => "TEST1",
            Self::Test2 => "TEST2",
            Self::BootConfig => "BOOTCONFIG",
            Self::StatusRssi => "STATUSRSSI",
            Self::ReadChannel => "READCHAN",
            Self::RdsA => "RDSA",
            Self::RdsB => "RDSB",
            Self::RdsC => "RDSC",
            Self::RdsD => "RDSD",
        }
    }

    /// Whether the register is part of the bulk write window.
    pub const fn is_control(self) -> bool {
        let index = self.index();
        index >= FIRST_CONTROL && index < FIRST_CONTROL + CONTROL_COUNT
    }
}

/// In-memory copy of all sixteen registers, stored in host byte order.
#[derive(Clone, Copy, PartialEq, Eq, Default)]
pub struct RegisterFile {
    words: [u16; REGISTER_COUNT],
}

impl RegisterFile {
    /// Builds a register file from raw words in index order.
    pub const fn from_words(words: [u16; REGISTER_COUNT]) -> Self {
        Self { words }
    }

    /// Raw words in index order.
    pub const fn words(&self) -> &[u16; REGISTER_COUNT] {
        &self.words
    }

    /// Raw value of a single register.
    pub const fn word(&self, address: RegisterAddress) -> u16 {
        self.words[address.index()]
    }

    /// Decodes a typed register.
    pub fn get<R>(&self) -> R
    where
        R: ReadableRegister<IdType = u8, Array = [u8; 2], Error = Infallible>,
    {
        match R::from_bytes(self.words[usize::from(R::readable_id())].to_be_bytes()) {
            Ok(register) => register,
            Err(never) => match never {},
        }
    }

    /// Stores a typed register.
    pub fn set<R>(&mut self, register: R)
    where
        R: WritableRegister<IdType = u8, Array = [u8; 2], Error = Infallible>,
    {
        let bytes = match register.to_bytes() {
            Ok(bytes) => bytes,
            Err(never) => match never {},
        };
        self.words[usize::from(R::writeable_id())] = u16::from_be_bytes(bytes);
    }

    /// Applies `f` to a typed register and stores the result.
    pub fn update<R, F>(&mut self, f: F)
    where
        R: ReadableRegister<IdType = u8, Array = [u8; 2], Error = Infallible>
            + WritableRegister<IdType = u8, Array = [u8; 2], Error = Infallible>,
        F: FnOnce(R) -> R,
    {
        let value = f(self.get::<R>());
        self.set(value);
    }

    /// Reassembles the register file from one bulk read.
    ///
    /// The chip sends big-endian words starting at 0x0A, wrapping from 0x0F
    /// to 0x00 and stopping after 0x09.
    pub fn from_read_buffer(bytes: &[u8; READ_LEN]) -> Self {
        let mut words = [0u16; REGISTER_COUNT];
        for (i, pair) in bytes.chunks_exact(2).enumerate() {
            let index = (READ_START + i) % REGISTER_COUNT;
            words[index] = u16::from_be_bytes([pair[0], pair[1]]);
        }
        Self { words }
    }

    /// Serializes the control window (0x02..=0x07) for one bulk write.
    pub fn to_write_buffer(&self) -> [u8; WRITE_LEN] {
        let mut bytes = [0u8; WRITE_LEN];
        let control = &self.words[FIRST_CONTROL..FIRST_CONTROL + CONTROL_COUNT];
        for (chunk, word) in bytes.chunks_exact_mut(2).zip(control) {
            chunk.copy_from_slice(&word.to_be_bytes());
        }
        bytes
    }
}

impl core::fmt::Debug for RegisterFile {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let mut map = f.debug_map();
        for address in RegisterAddress::ALL {
            map.entry(&address.name(), &format_args!("{:#06x}", self.word(address)));
        }
        map.finish()
    }
}

/// Implements the `regiface` register traits for a `bitflags` register type.
///
/// Types declared through `bitflags!` get their identity here instead of
/// through `#[register]`.
macro_rules! flags_register {
    ($ty:ty, $address:expr) => {
        impl regiface::Register for $ty {
            type IdType = u8;

            fn id() -> Self::IdType {
                $address as u8
            }
        }

        impl regiface::FromByteArray for $ty {
            type Error = core::convert::Infallible;
            type Array = [u8; 2];

            fn from_bytes(bytes: Self::Array) -> Result<Self, Self::Error> {
                Ok(Self::from_bits_retain(u16::from_be_bytes(bytes)))
            }
        }

        impl regiface::ReadableRegister for $ty {}
    };
    ($ty:ty, $address:expr, writable) => {
        $crate::registers::flags_register!($ty, $address);

        impl regiface::ToByteArray for $ty {
            type Error = core::convert::Infallible;
            type Array = [u8; 2];

            fn to_bytes(self) -> Result<Self::Array, Self::Error> {
                Ok(self.bits().to_be_bytes())
            }
        }

        impl regiface::WritableRegister for $ty {}
    };
}

pub(crate) use flags_register;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_buffer_wraps_from_status_register() {
        let mut bytes = [0u8; READ_LEN];
        // First word on the wire is 0x0A, the seventh is 0x00.
        bytes[0..2].copy_from_slice(&0xC0DEu16.to_be_bytes());
        bytes[12..14].copy_from_slice(&0x1242u16.to_be_bytes());
        bytes[30..32].copy_from_slice(&0xBEEFu16.to_be_bytes());

        let file = RegisterFile::from_read_buffer(&bytes);
        assert_eq!(file.word(RegisterAddress::StatusRssi), 0xC0DE);
        assert_eq!(file.word(RegisterAddress::DeviceId), 0x1242);
        assert_eq!(file.word(RegisterAddress::BootConfig), 0xBEEF);
    }

    #[test]
    fn write_buffer_covers_control_registers_only() {
        let mut words = [0xFFFFu16; REGISTER_COUNT];
        for (i, word) in words.iter_mut().enumerate().skip(2).take(6) {
            *word = 0x0100 * i as u16 + i as u16;
        }
        let bytes = RegisterFile::from_words(words).to_write_buffer();
        assert_eq!(
            bytes,
            [0x02, 0x02, 0x03, 0x03, 0x04, 0x04, 0x05, 0x05, 0x06, 0x06, 0x07, 0x07]
        );
    }

    #[test]
    fn only_control_window_is_writable() {
        let writable: Vec<_> = RegisterAddress::ALL
            .iter()
            .filter(|a| a.is_control())
            .map(|a| a.index())
            .collect();
        assert_eq!(writable, vec![2, 3, 4, 5, 6, 7]);
    }

    #[test]
    fn register_ids_match_address_map() {
        use regiface::Register;

        assert_eq!(PowerConfig::id(), RegisterAddress::PowerConfig as u8);
        assert_eq!(Test1::id(), RegisterAddress::Test1 as u8);
        assert_eq!(StatusRssi::id(), RegisterAddress::StatusRssi as u8);
        assert_eq!(DeviceId::id(), RegisterAddress::DeviceId as u8);
        assert_eq!(ChipId::id(), RegisterAddress::ChipId as u8);
    }

    #[test]
    fn typed_access_uses_big_endian_words() {
        let mut words = [0u16; REGISTER_COUNT];
        words[RegisterAddress::DeviceId.index()] = 0x1242;
        words[RegisterAddress::SysConfig2.index()] = 0x1915;
        let mut file = RegisterFile::from_words(words);

        assert!(file.get::<DeviceId>().is_silicon_labs());
        assert_eq!(file.get::<SysConfig2>().volume(), 5);

        file.set(Channel::empty().with_channel(0x0123) | Channel::TUNE);
        assert_eq!(file.word(RegisterAddress::Channel), 0x8123);
    }

    #[test]
    fn update_modifies_single_register() {
        let mut file = RegisterFile::default();
        file.update::<PowerConfig, _>(|p| p | PowerConfig::ENABLE | PowerConfig::DMUTE);
        assert_eq!(file.word(RegisterAddress::PowerConfig), 0x4001);
        assert_eq!(file.word(RegisterAddress::Channel), 0);
    }
}
