//! Tune and seek state machine
//!
//! Both operations follow the same handshake (AN230 section 3.7):
//!
//! 1. Set TUNE (or SEEK) and write the control registers
//! 2. Poll until STC is set
//! 3. Clear TUNE (or SEEK) and write again
//! 4. Poll until STC is cleared
//!
//! The chip never times out on its own, so every poll has a deadline. If it
//! passes, TUNE and SEEK are cleared on a best-effort basis and the operation
//! fails with [`Error::TuningTimeout`].

use core::time::Duration;
use std::time::Instant;

use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::I2c;
use log::{debug, trace, warn};

use crate::band::BandPlan;
use crate::config::Config;
use crate::registers::{BlockErrors, Channel, PowerConfig, ReadChannel, RegisterFile, StatusRssi};
use crate::shadow::RegisterShadow;
use crate::Error;

/// Where the tuner is in the tune/seek handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TuneState {
    #[default]
    Idle,
    /// TUNE set, waiting for STC
    Tuning,
    /// SEEK set, waiting for STC
    Seeking,
    /// TUNE/SEEK cleared, waiting for STC to drop
    AwaitingClear,
    /// The last operation timed out, hit the band limit or lost the bus
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SeekDirection {
    Up,
    Down,
}

/// Outcome of a seek.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SeekResult {
    /// A station was found at this frequency (MHz)
    Found(f32),
    /// No station above the seek threshold, or the band limit was reached
    NotFound,
}

impl SeekResult {
    pub fn frequency(self) -> Option<f32> {
        match self {
            Self::Found(frequency) => Some(frequency),
            Self::NotFound => None,
        }
    }
}

/// Signal and handshake flags decoded from STATUSRSSI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TuningStatus {
    /// Received signal strength in dBµV
    pub rssi: u8,
    pub stereo: bool,
    pub tune_complete: bool,
    pub seek_failed: bool,
    pub afc_railed: bool,
    pub rds_ready: bool,
    pub rds_synchronized: bool,
    /// Error bucket of the RDS block A currently latched
    pub block_a_errors: BlockErrors,
}

impl From<StatusRssi> for TuningStatus {
    fn from(status: StatusRssi) -> Self {
        Self {
            rssi: status.rssi(),
            stereo: status.contains(StatusRssi::STEREO),
            tune_complete: status.contains(StatusRssi::STC),
            seek_failed: status.contains(StatusRssi::SFBL),
            afc_railed: status.contains(StatusRssi::AFCRL),
            rds_ready: status.contains(StatusRssi::RDSR),
            rds_synchronized: status.contains(StatusRssi::RDSS),
            block_a_errors: status.block_a_errors(),
        }
    }
}

/// Runs tune and seek handshakes against a [`RegisterShadow`].
#[derive(Debug, Clone)]
pub struct Tuner {
    state: TuneState,
    band_plan: BandPlan,
    tune_timeout: Duration,
    seek_timeout: Duration,
    poll_interval: Duration,
    seek_wrap: bool,
}

impl Tuner {
    pub fn new(config: &Config) -> Self {
        Self {
            state: TuneState::Idle,
            band_plan: config.band_plan,
            tune_timeout: config.tune_timeout,
            seek_timeout: config.seek_timeout,
            poll_interval: config.poll_interval,
            seek_wrap: config.seek_wrap,
        }
    }

    pub fn state(&self) -> TuneState {
        self.state
    }

    pub fn band_plan(&self) -> &BandPlan {
        &self.band_plan
    }

    /// Tunes to a channel index.
    ///
    /// # Arguments
    /// * `channel` - Channel index within the band plan
    ///
    /// # Errors
    /// * `Error::InvalidChannel` - `channel` lies outside the band; nothing is
    ///   written
    /// * `Error::TuningTimeout` - STC did not change before the tune timeout
    /// * `Error::Bus` - a bus transaction failed
    pub fn tune<I2C, D>(
        &mut self,
        shadow: &RegisterShadow<I2C>,
        delay: &mut D,
        channel: u16,
    ) -> Result<(), Error<I2C::Error>>
    where
        I2C: I2c,
        D: DelayNs,
    {
        if channel > self.band_plan.max_channel() {
            return Err(Error::InvalidChannel(channel));
        }
        debug!(
            "tuning to channel {channel} ({} MHz)",
            self.band_plan.channel_to_frequency(channel)
        );

        let start = |registers: &mut RegisterFile| {
            registers.update::<Channel, _>(|c| c.with_channel(channel) | Channel::TUNE);
        };
        let clear = |registers: &mut RegisterFile| {
            registers.update::<Channel, _>(|c| c - Channel::TUNE);
        };

        self.state = TuneState::Tuning;
        let timeout = self.tune_timeout;
        let result = self.handshake(shadow, delay, timeout, start, clear);
        self.finish(result.map(|_| ()))
    }

    /// Seeks to the next station in `direction`.
    ///
    /// Returns [`SeekResult::NotFound`] when the chip reports a failed seek or
    /// reached the band limit; the tuner state is then
    /// [`TuneState::Failed`] but no error is raised.
    ///
    /// # Errors
    /// * `Error::TuningTimeout` - STC did not change before the seek timeout
    /// * `Error::Bus` - a bus transaction failed
    pub fn seek<I2C, D>(
        &mut self,
        shadow: &RegisterShadow<I2C>,
        delay: &mut D,
        direction: SeekDirection,
    ) -> Result<SeekResult, Error<I2C::Error>>
    where
        I2C: I2c,
        D: DelayNs,
    {
        debug!("seeking {direction:?}");
        let wrap = self.seek_wrap;
        let start = |registers: &mut RegisterFile| {
            registers.update::<PowerConfig, _>(|mut p| {
                p.set(PowerConfig::SKMODE, !wrap);
                p.set(PowerConfig::SEEKUP, direction == SeekDirection::Up);
                p | PowerConfig::SEEK
            });
        };
        let clear = |registers: &mut RegisterFile| {
            registers.update::<PowerConfig, _>(|p| p - PowerConfig::SEEK);
        };

        self.state = TuneState::Seeking;
        let timeout = self.seek_timeout;
        let result = self.handshake(shadow, delay, timeout, start, clear);
        let status = self.finish(result)?;

        if status.contains(StatusRssi::SFBL) {
            debug!("seek {direction:?} found nothing");
            self.state = TuneState::Failed;
            return Ok(SeekResult::NotFound);
        }
        let channel = shadow.snapshot().get::<ReadChannel>().channel();
        let frequency = self.band_plan.channel_to_frequency(channel);
        debug!("seek {direction:?} stopped at {frequency} MHz");
        Ok(SeekResult::Found(frequency))
    }

    /// Runs both STC edges. Returns the status seen when STC was set.
    fn handshake<I2C, D, S, C>(
        &mut self,
        shadow: &RegisterShadow<I2C>,
        delay: &mut D,
        timeout: Duration,
        start: S,
        clear: C,
    ) -> Result<StatusRssi, Error<I2C::Error>>
    where
        I2C: I2c,
        D: DelayNs,
        S: FnOnce(&mut RegisterFile),
        C: FnOnce(&mut RegisterFile),
    {
        shadow.modify(start)?;
        let complete = match self.wait_for_stc(shadow, delay, true, timeout) {
            Ok(status) => status,
            Err(error) => return Err(self.abort(shadow, error)),
        };

        self.state = TuneState::AwaitingClear;
        if let Err(error) = shadow.modify(clear) {
            return Err(self.abort(shadow, error));
        }
        if let Err(error) = self.wait_for_stc(shadow, delay, false, timeout) {
            return Err(self.abort(shadow, error));
        }
        Ok(complete)
    }

    fn wait_for_stc<I2C, D>(
        &self,
        shadow: &RegisterShadow<I2C>,
        delay: &mut D,
        set: bool,
        timeout: Duration,
    ) -> Result<StatusRssi, Error<I2C::Error>>
    where
        I2C: I2c,
        D: DelayNs,
    {
        let deadline = Instant::now() + timeout;
        let interval_us = u32::try_from(self.poll_interval.as_micros()).unwrap_or(u32::MAX);
        loop {
            let status = shadow.read_all()?.get::<StatusRssi>();
            if status.contains(StatusRssi::STC) == set {
                trace!("STC {} (rssi {})", if set { "set" } else { "cleared" }, status.rssi());
                return Ok(status);
            }
            if Instant::now() >= deadline {
                return Err(Error::TuningTimeout(timeout));
            }
            delay.delay_us(interval_us);
        }
    }

    /// Clears TUNE and SEEK after a failed poll and passes the error on.
    fn abort<I2C: I2c>(
        &self,
        shadow: &RegisterShadow<I2C>,
        error: Error<I2C::Error>,
    ) -> Error<I2C::Error> {
        warn!("{:?} aborted: {error}", self.state);
        let cleared = shadow.modify(|registers| {
            registers.update::<Channel, _>(|c| c - Channel::TUNE);
            registers.update::<PowerConfig, _>(|p| p - PowerConfig::SEEK);
        });
        if let Err(clear_error) = cleared {
            warn!("could not clear TUNE/SEEK: {clear_error}");
        }
        error
    }

    fn finish<T, E>(&mut self, result: Result<T, Error<E>>) -> Result<T, Error<E>> {
        self.state = if result.is_ok() {
            TuneState::Idle
        } else {
            TuneState::Failed
        };
        result
    }
}

#[cfg(test)]
mod tests {
    use embedded_hal::i2c::ErrorKind;
    use embedded_hal_mock::eh1::delay::NoopDelay;
    use embedded_hal_mock::eh1::i2c::{Mock as I2cMock, Transaction as I2cTransaction};

    use super::*;
    use crate::registers::{RegisterAddress, REGISTER_COUNT};
    use crate::shadow::DEFAULT_ADDRESS;

    /// Bytes the chip sends for a register file holding `channel` and `status`.
    fn wire_image(channel: u16, status: u16) -> Vec<u8> {
        let mut words = [0u16; REGISTER_COUNT];
        words[RegisterAddress::Channel.index()] = channel;
        words[RegisterAddress::StatusRssi.index()] = status;
        (0..REGISTER_COUNT)
            .map(|i| words[(0x0A + i) % REGISTER_COUNT])
            .flat_map(u16::to_be_bytes)
            .collect()
    }

    /// Control window as written with only CHANNEL set.
    fn control_write(channel: u16) -> Vec<u8> {
        let mut bytes = vec![0u8; 12];
        bytes[2..4].copy_from_slice(&channel.to_be_bytes());
        bytes
    }

    #[test]
    fn status_flags_are_decoded() {
        let status = TuningStatus::from(StatusRssi::from_bits_retain(0xCD2D));
        assert!(status.rds_ready);
        assert!(status.tune_complete);
        assert!(!status.seek_failed);
        assert!(status.rds_synchronized);
        assert!(status.stereo);
        assert_eq!(status.rssi, 0x2D);
        assert_eq!(status.block_a_errors, BlockErrors::ThreeToFive);
    }

    #[test]
    fn failed_clear_write_still_attempts_abort() {
        let expectations = [
            // set TUNE
            I2cTransaction::read(DEFAULT_ADDRESS, wire_image(0x0000, 0x0000)),
            I2cTransaction::write(DEFAULT_ADDRESS, control_write(0x8020)),
            // STC set
            I2cTransaction::read(DEFAULT_ADDRESS, wire_image(0x8020, 0x4000)),
            // clearing TUNE fails
            I2cTransaction::read(DEFAULT_ADDRESS, wire_image(0x8020, 0x4000)),
            I2cTransaction::write(DEFAULT_ADDRESS, control_write(0x0020))
                .with_error(ErrorKind::Other),
            // best-effort abort
            I2cTransaction::read(DEFAULT_ADDRESS, wire_image(0x8020, 0x4000)),
            I2cTransaction::write(DEFAULT_ADDRESS, control_write(0x0020)),
        ];
        let mut i2c = I2cMock::new(&expectations);
        let shadow = RegisterShadow::new(i2c.clone(), DEFAULT_ADDRESS);
        let mut tuner = Tuner::new(&Config::default());

        let result = tuner.tune(&shadow, &mut NoopDelay::new(), 0x20);
        assert!(matches!(result, Err(Error::Bus(ErrorKind::Other))));
        assert_eq!(tuner.state(), TuneState::Failed);

        i2c.done();
    }

    #[test]
    fn tuner_starts_idle() {
        let tuner = Tuner::new(&Config::default());
        assert_eq!(tuner.state(), TuneState::Idle);
        assert_eq!(SeekResult::Found(101.1).frequency(), Some(101.1));
        assert_eq!(SeekResult::NotFound.frequency(), None);
    }
}
