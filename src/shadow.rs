//! Register shadow
//!
//! The Si4703 only supports two bus transactions: a 32-byte read of every
//! register starting at 0x0A, and a 12-byte write of the control registers
//! starting at 0x02. [`RegisterShadow`] owns the bus together with a
//! [`RegisterFile`] mirror and is the single place either transaction happens.
//!
//! The bus and the mirror sit behind one mutex, so the tuning code on the
//! caller thread and the RDS worker can share a shadow. A read-modify-write
//! ([`RegisterShadow::modify`]) holds the lock for the whole sequence.

use std::sync::{Mutex, MutexGuard, PoisonError};

use embedded_hal::i2c::I2c;

use crate::registers::{RegisterFile, READ_LEN};
use crate::Error;

/// Default 7-bit bus address of the Si4702/03.
pub const DEFAULT_ADDRESS: u8 = 0x10;

struct Inner<I2C> {
    i2c: I2C,
    registers: RegisterFile,
}

impl<I2C: I2c> Inner<I2C> {
    fn read_all(&mut self, address: u8) -> Result<(), Error<I2C::Error>> {
        let mut buffer = [0u8; READ_LEN];
        self.i2c.read(address, &mut buffer).map_err(Error::Bus)?;
        self.registers = RegisterFile::from_read_buffer(&buffer);
        Ok(())
    }

    fn write_control(&mut self, address: u8) -> Result<(), Error<I2C::Error>> {
        let buffer = self.registers.to_write_buffer();
        self.i2c.write(address, &buffer).map_err(Error::Bus)
    }
}

/// Bus owner and in-memory mirror of the chip registers.
pub struct RegisterShadow<I2C> {
    address: u8,
    inner: Mutex<Inner<I2C>>,
}

impl<I2C> RegisterShadow<I2C> {
    /// Wraps a bus. The mirror starts zeroed until the first read.
    pub fn new(i2c: I2C, address: u8) -> Self {
        Self {
            address,
            inner: Mutex::new(Inner {
                i2c,
                registers: RegisterFile::default(),
            }),
        }
    }

    /// Bus address the shadow talks to.
    pub fn address(&self) -> u8 {
        self.address
    }

    /// Copy of the mirror as of the last transaction. No bus traffic.
    pub fn snapshot(&self) -> RegisterFile {
        self.lock().registers
    }

    /// Releases the underlying bus.
    pub fn release(self) -> I2C {
        self.inner
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner)
            .i2c
    }

    fn lock(&self) -> MutexGuard<'_, Inner<I2C>> {
        // A panic while holding the lock cannot leave the mirror half
        // written: it is only ever replaced whole.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<I2C> RegisterShadow<I2C>
where
    I2C: I2c,
{
    /// Reads every register from the chip and replaces the mirror.
    ///
    /// On error the mirror keeps its previous contents.
    ///
    /// # Errors
    /// * `Error::Bus` - the read failed
    pub fn read_all(&self) -> Result<RegisterFile, Error<I2C::Error>> {
        let mut inner = self.lock();
        inner.read_all(self.address)?;
        Ok(inner.registers)
    }

    /// Writes the control registers (0x02..=0x07) from the mirror.
    ///
    /// # Errors
    /// * `Error::Bus` - the write failed or was not fully acknowledged
    pub fn write_control(&self) -> Result<(), Error<I2C::Error>> {
        self.lock().write_control(self.address)
    }

    /// Reads the chip, applies `f` to the mirror and writes the control
    /// registers back, without releasing the bus in between.
    ///
    /// Returns the mirror as written.
    ///
    /// # Errors
    /// * `Error::Bus` - the read or the write failed; if the read fails
    ///   nothing is written
    pub fn modify<F>(&self, f: F) -> Result<RegisterFile, Error<I2C::Error>>
    where
        F: FnOnce(&mut RegisterFile),
    {
        let mut inner = self.lock();
        inner.read_all(self.address)?;
        f(&mut inner.registers);
        inner.write_control(self.address)?;
        Ok(inner.registers)
    }
}

#[cfg(test)]
mod tests {
    use embedded_hal::i2c::ErrorKind;
    use embedded_hal_mock::eh1::i2c::{Mock as I2cMock, Transaction as I2cTransaction};

    use super::*;
    use crate::registers::{Channel, RegisterAddress, REGISTER_COUNT};

    /// Bytes the chip would send for the given register values.
    fn wire_image(words: [u16; REGISTER_COUNT]) -> Vec<u8> {
        (0..REGISTER_COUNT)
            .map(|i| words[(0x0A + i) % REGISTER_COUNT])
            .flat_map(u16::to_be_bytes)
            .collect()
    }

    fn sample_words() -> [u16; REGISTER_COUNT] {
        let mut words = [0u16; REGISTER_COUNT];
        for (i, word) in words.iter_mut().enumerate() {
            *word = 0x1100 * i as u16 + 0x0001;
        }
        words
    }

    #[test]
    fn read_all_reorders_wrapped_registers() {
        let words = sample_words();
        let expectations = [I2cTransaction::read(DEFAULT_ADDRESS, wire_image(words))];
        let mut i2c = I2cMock::new(&expectations);

        let shadow = RegisterShadow::new(i2c.clone(), DEFAULT_ADDRESS);
        let file = shadow.read_all().unwrap();
        assert_eq!(file.words(), &words);
        assert_eq!(shadow.snapshot(), file);

        i2c.done();
    }

    #[test]
    fn write_control_sends_registers_two_to_seven_big_endian() {
        let words = sample_words();
        let expected: Vec<u8> = words[2..8].iter().flat_map(|w| w.to_be_bytes()).collect();
        let expectations = [
            I2cTransaction::read(DEFAULT_ADDRESS, wire_image(words)),
            I2cTransaction::write(DEFAULT_ADDRESS, expected),
        ];
        let mut i2c = I2cMock::new(&expectations);

        let shadow = RegisterShadow::new(i2c.clone(), DEFAULT_ADDRESS);
        shadow.read_all().unwrap();
        shadow.write_control().unwrap();

        i2c.done();
    }

    #[test]
    fn modify_reads_before_writing() {
        let mut words = [0u16; REGISTER_COUNT];
        words[RegisterAddress::Channel.index()] = 0x0010;
        let mut written = [0u8; 12];
        written[2..4].copy_from_slice(&0x8020u16.to_be_bytes());
        let expectations = [
            I2cTransaction::read(DEFAULT_ADDRESS, wire_image(words)),
            I2cTransaction::write(DEFAULT_ADDRESS, written.to_vec()),
        ];
        let mut i2c = I2cMock::new(&expectations);

        let shadow = RegisterShadow::new(i2c.clone(), DEFAULT_ADDRESS);
        let file = shadow
            .modify(|regs| regs.update::<Channel, _>(|c| c.with_channel(0x20) | Channel::TUNE))
            .unwrap();
        assert_eq!(file.word(RegisterAddress::Channel), 0x8020);

        i2c.done();
    }

    #[test]
    fn failed_read_keeps_mirror_and_skips_write() {
        let words = sample_words();
        let expectations = [
            I2cTransaction::read(DEFAULT_ADDRESS, wire_image(words)),
            I2cTransaction::read(DEFAULT_ADDRESS, vec![0; READ_LEN]).with_error(ErrorKind::Other),
        ];
        let mut i2c = I2cMock::new(&expectations);

        let shadow = RegisterShadow::new(i2c.clone(), DEFAULT_ADDRESS);
        let before = shadow.read_all().unwrap();
        let result = shadow.modify(|regs| regs.update::<Channel, _>(|c| c | Channel::TUNE));
        assert!(matches!(result, Err(Error::Bus(ErrorKind::Other))));
        assert_eq!(shadow.snapshot(), before);

        i2c.done();
    }
}
