//! Si4703 Tuner Device Interface
//!
//! This module provides the high-level interface for an Si4702/03 FM tuner
//! attached over I2C. [`Si4703`] ties together:
//! - the [`RegisterShadow`] that owns the bus
//! - the [`Tuner`] state machine for tune and seek
//! - the RDS worker thread and the [`RdsExchange`] it publishes to
//!
//! # Example
//! ```no_run
//! use std::time::Duration;
//! use embedded_hal::{delay::DelayNs, i2c::I2c};
//! use si4703::{Config, Error, Region, SeekDirection, Si4703};
//!
//! fn listen<I2C, D>(i2c: I2C, delay: D) -> Result<(), Error<I2C::Error>>
//! where
//!     I2C: I2c + Send + 'static,
//!     D: DelayNs,
//! {
//!     let mut radio = Si4703::with_config(i2c, delay, Config::for_region(Region::Europe));
//!     radio.power_on()?;
//!     radio.set_frequency(98.5)?;
//!     radio.set_volume(8)?;
//!
//!     if let Some(name) = radio.read_station_name(Duration::from_secs(5)) {
//!         println!("tuned to {name}");
//!     }
//!     radio.seek(SeekDirection::Up)?;
//!     radio.power_off()
//! }
//! ```

use core::time::Duration;
use std::sync::Arc;
use std::time::Instant;

use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::I2c;
use log::{debug, info, warn};

use crate::band::BandPlan;
use crate::config::Config;
use crate::exchange::RdsExchange;
use crate::rds::{RdsData, StationName};
use crate::registers::{
    ChipId, DeviceId, PowerConfig, ReadChannel, RegisterFile, StatusRssi, SysConfig1, SysConfig2,
    Test1,
};
use crate::shadow::RegisterShadow;
use crate::tuning::{SeekDirection, SeekResult, TuneState, Tuner, TuningStatus};
use crate::worker::RdsWorker;
use crate::Error;

/// Crystal oscillator settling time after TEST1 is written.
const OSCILLATOR_SETTLE_MS: u32 = 500;

/// Power-up time before the first tune.
const POWER_UP_MS: u32 = 110;

/// Identification registers read from the chip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DeviceInfo {
    pub device_id: DeviceId,
    pub chip_id: ChipId,
}

/// Main interface for an Si4702/03 tuner.
///
/// Dropping the device stops the RDS worker. It does not power the chip
/// down; call [`Si4703::power_off`] first for that.
pub struct Si4703<I2C, D> {
    shadow: Arc<RegisterShadow<I2C>>,
    exchange: Arc<RdsExchange>,
    worker: Option<RdsWorker>,
    delay: D,
    tuner: Tuner,
    config: Config,
    powered: bool,
}

impl<I2C, D> Si4703<I2C, D> {
    /// Creates a driver with the default (US) configuration.
    ///
    /// # Arguments
    /// * `i2c` - Bus the chip is attached to; it must already be in 2-wire
    ///   mode (see [`crate::bus_mode_reset`])
    /// * `delay` - Delay provider used for power-up and STC polling
    pub fn new(i2c: I2C, delay: D) -> Self {
        Self::with_config(i2c, delay, Config::default())
    }

    /// Creates a driver with an explicit configuration.
    pub fn with_config(i2c: I2C, delay: D, config: Config) -> Self {
        Self {
            shadow: Arc::new(RegisterShadow::new(i2c, config.address)),
            exchange: Arc::new(RdsExchange::new(config.freshness)),
            worker: None,
            delay,
            tuner: Tuner::new(&config),
            config,
            powered: false,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn band_plan(&self) -> &BandPlan {
        &self.config.band_plan
    }

    pub fn is_powered(&self) -> bool {
        self.powered
    }

    /// State of the tune/seek handshake.
    pub fn tune_state(&self) -> TuneState {
        self.tuner.state()
    }

    /// Register mirror as of the last bus transaction.
    pub fn cached_registers(&self) -> RegisterFile {
        self.shadow.snapshot()
    }

    /// Whether the RDS worker thread is running.
    pub fn rds_running(&self) -> bool {
        self.worker.as_ref().is_some_and(|worker| !worker.is_finished())
    }

    /// Station name as currently assembled. Segments that were never
    /// received, or went stale, are spaces.
    pub fn station_name(&self) -> StationName {
        self.exchange.station_name()
    }

    /// Waits until a full station name has been received.
    ///
    /// Returns `None` if `timeout` elapses first or RDS is not running.
    pub fn read_station_name(&self, timeout: Duration) -> Option<StationName> {
        self.exchange
            .read_station_name(timeout, self.config.rds_timing.read_cadence)
    }

    /// Every decoded RDS field that is currently valid.
    pub fn rds_data(&self) -> RdsData {
        self.exchange.rds_data(Instant::now())
    }

    /// Change counter of the decoded RDS state.
    pub fn rds_generation(&self) -> u64 {
        self.exchange.generation()
    }

    /// Blocks until the decoded RDS state changes after generation `since`.
    ///
    /// Returns the new generation, or `None` on timeout or if RDS is stopped.
    pub fn wait_for_rds(&self, since: u64, timeout: Duration) -> Option<u64> {
        self.exchange.wait_for_update(since, timeout)
    }

    /// Discards all decoded RDS data.
    pub fn clear_rds(&self) {
        self.exchange.clear();
    }

    /// Stops the RDS worker and returns the bus and delay.
    ///
    /// The chip is left in whatever power state it is in.
    pub fn release(self) -> (I2C, D) {
        let Self {
            shadow,
            worker,
            delay,
            ..
        } = self;
        drop(worker);
        match Arc::try_unwrap(shadow) {
            Ok(shadow) => (shadow.release(), delay),
            // The worker held the only other reference and has been joined.
            Err(_) => unreachable!("register shadow still shared after worker stopped"),
        }
    }
}

impl<I2C, D> Si4703<I2C, D>
where
    I2C: I2c + Send + 'static,
    D: DelayNs,
{
    /// Powers the chip up and starts the RDS worker.
    ///
    /// Follows the AN230 sequence: enable the crystal oscillator, wait for
    /// it to settle, set ENABLE together with band, spacing, de-emphasis and
    /// volume, then wait for power-up to finish. Does nothing if the device
    /// is already powered.
    ///
    /// # Errors
    /// * `Error::Bus` - a bus transaction failed
    /// * `Error::WorkerSpawn` - the RDS thread could not be started; the chip
    ///   is left powered with RDS idle
    pub fn power_on(&mut self) -> Result<(), Error<I2C::Error>> {
        if self.powered {
            return Ok(());
        }
        let volume = self.config.initial_volume;

        self.shadow
            .modify(|registers| registers.set(Test1::OSCILLATOR_ENABLE))?;
        self.delay.delay_ms(OSCILLATOR_SETTLE_MS);

        let plan = self.config.band_plan;
        let rds = self.config.rds;
        let registers = self.shadow.modify(|registers| {
            registers.set(PowerConfig::DMUTE | PowerConfig::ENABLE);
            registers.update::<SysConfig1, _>(|mut s| {
                s.set(SysConfig1::RDS, rds);
                s.with_de_emphasis(plan.de_emphasis)
            });
            registers.update::<SysConfig2, _>(|s| {
                s.with_band(plan.band)
                    .with_spacing(plan.spacing)
                    .with_volume(volume)
            });
        })?;
        self.delay.delay_ms(POWER_UP_MS);
        self.powered = true;

        let chip = registers.get::<ChipId>();
        info!(
            "powered up {:?} rev {} firmware {}",
            chip.device, chip.revision, chip.firmware
        );

        if rds {
            self.exchange.clear();
            let worker = RdsWorker::spawn(
                Arc::clone(&self.shadow),
                Arc::clone(&self.exchange),
                self.config.rds_timing,
            )?;
            self.worker = Some(worker);
        }
        Ok(())
    }

    /// Stops the RDS worker and powers the chip down.
    ///
    /// Decoded RDS data is cleared. Calling this on an unpowered device only
    /// stops the worker.
    ///
    /// # Errors
    /// * `Error::Bus` - the power-down write failed; the device is still
    ///   considered powered
    pub fn power_off(&mut self) -> Result<(), Error<I2C::Error>> {
        if let Some(worker) = self.worker.take() {
            worker.stop();
        }
        self.exchange.clear();
        if !self.powered {
            return Ok(());
        }

        self.shadow.modify(|registers| {
            registers.update::<SysConfig1, _>(|s| s - SysConfig1::RDS);
            registers.set(PowerConfig::ENABLE | PowerConfig::DISABLE);
        })?;
        self.powered = false;
        info!("powered down");
        Ok(())
    }

    /// Tunes to a frequency in MHz.
    ///
    /// The frequency must lie on the channel grid of the band plan. Nothing
    /// is written to the chip for an off-grid value.
    ///
    /// # Errors
    /// * `Error::InvalidFrequency` - `frequency` is not a channel of the band
    /// * `Error::NotPowered` - the chip is powered down
    /// * `Error::TuningTimeout` - the tune did not complete
    /// * `Error::Bus` - a bus transaction failed
    pub fn set_frequency(&mut self, frequency: f32) -> Result<(), Error<I2C::Error>> {
        let channel = self
            .config
            .band_plan
            .frequency_to_channel(frequency)
            .ok_or(Error::InvalidFrequency(frequency))?;
        self.set_channel(channel)
    }

    /// Tunes to a channel index of the band plan.
    ///
    /// # Errors
    /// * `Error::InvalidChannel` - `channel` is outside the band
    /// * `Error::NotPowered` - the chip is powered down
    /// * `Error::TuningTimeout` - the tune did not complete
    /// * `Error::Bus` - a bus transaction failed
    pub fn set_channel(&mut self, channel: u16) -> Result<(), Error<I2C::Error>> {
        if channel > self.config.band_plan.max_channel() {
            return Err(Error::InvalidChannel(channel));
        }
        self.ensure_powered()?;
        // Groups latched during the tune may still belong to the old station.
        self.exchange.clear();
        let result = self.tuner.tune(&*self.shadow, &mut self.delay, channel);
        self.exchange.clear();
        result
    }

    /// Seeks to the next station.
    ///
    /// # Errors
    /// * `Error::NotPowered` - the chip is powered down
    /// * `Error::TuningTimeout` - the seek did not complete
    /// * `Error::Bus` - a bus transaction failed
    pub fn seek(&mut self, direction: SeekDirection) -> Result<SeekResult, Error<I2C::Error>> {
        self.ensure_powered()?;
        self.exchange.clear();
        let result = self.tuner.seek(&*self.shadow, &mut self.delay, direction);
        self.exchange.clear();
        result
    }

    /// Frequency the tuner is on, in MHz.
    ///
    /// # Errors
    /// * `Error::Bus` - the read failed
    pub fn frequency(&self) -> Result<f32, Error<I2C::Error>> {
        let channel = self.channel()?;
        Ok(self.config.band_plan.channel_to_frequency(channel))
    }

    /// Channel index the tuner is on, from READCHAN.
    ///
    /// # Errors
    /// * `Error::Bus` - the read failed
    pub fn channel(&self) -> Result<u16, Error<I2C::Error>> {
        Ok(self.shadow.read_all()?.get::<ReadChannel>().channel())
    }

    /// Sets the volume, 0 (muted) to 15. Larger values are clamped to 15.
    ///
    /// # Errors
    /// * `Error::NotPowered` - the chip is powered down
    /// * `Error::Bus` - a bus transaction failed
    pub fn set_volume(&mut self, volume: u8) -> Result<(), Error<I2C::Error>> {
        self.ensure_powered()?;
        let registers = self
            .shadow
            .modify(|registers| registers.update::<SysConfig2, _>(|s| s.with_volume(volume)))?;
        debug!("volume {}", registers.get::<SysConfig2>().volume());
        Ok(())
    }

    /// Current volume setting.
    ///
    /// # Errors
    /// * `Error::Bus` - the read failed
    pub fn volume(&self) -> Result<u8, Error<I2C::Error>> {
        Ok(self.shadow.read_all()?.get::<SysConfig2>().volume())
    }

    /// Mutes or unmutes the audio output.
    ///
    /// # Errors
    /// * `Error::NotPowered` - the chip is powered down
    /// * `Error::Bus` - a bus transaction failed
    pub fn set_mute(&mut self, mute: bool) -> Result<(), Error<I2C::Error>> {
        self.ensure_powered()?;
        self.shadow.modify(|registers| {
            registers.update::<PowerConfig, _>(|mut p| {
                p.set(PowerConfig::DMUTE, !mute);
                p
            })
        })?;
        Ok(())
    }

    /// Forces mono output, or returns to automatic stereo.
    ///
    /// # Errors
    /// * `Error::NotPowered` - the chip is powered down
    /// * `Error::Bus` - a bus transaction failed
    pub fn set_mono(&mut self, mono: bool) -> Result<(), Error<I2C::Error>> {
        self.ensure_powered()?;
        self.shadow.modify(|registers| {
            registers.update::<PowerConfig, _>(|mut p| {
                p.set(PowerConfig::MONO, mono);
                p
            })
        })?;
        Ok(())
    }

    /// Reads STATUSRSSI.
    ///
    /// # Errors
    /// * `Error::Bus` - the read failed
    pub fn status(&self) -> Result<TuningStatus, Error<I2C::Error>> {
        Ok(self.shadow.read_all()?.get::<StatusRssi>().into())
    }

    /// Received signal strength in dBµV.
    ///
    /// # Errors
    /// * `Error::Bus` - the read failed
    pub fn signal_strength(&self) -> Result<u8, Error<I2C::Error>> {
        Ok(self.status()?.rssi)
    }

    /// Reads every register from the chip, for dumps and diagnostics.
    ///
    /// # Errors
    /// * `Error::Bus` - the read failed
    pub fn registers(&self) -> Result<RegisterFile, Error<I2C::Error>> {
        self.shadow.read_all()
    }

    /// Reads the identification registers.
    ///
    /// # Errors
    /// * `Error::Bus` - the read failed
    pub fn device_info(&self) -> Result<DeviceInfo, Error<I2C::Error>> {
        let registers = self.shadow.read_all()?;
        let info = DeviceInfo {
            device_id: registers.get(),
            chip_id: registers.get(),
        };
        if !info.device_id.is_silicon_labs() {
            warn!(
                "unexpected manufacturer id {:#05x}",
                info.device_id.manufacturer
            );
        }
        Ok(info)
    }

    fn ensure_powered(&self) -> Result<(), Error<I2C::Error>> {
        if self.powered {
            Ok(())
        } else {
            Err(Error::NotPowered)
        }
    }
}
