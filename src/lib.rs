//! Si4703 FM Tuner Driver
//!
//! This crate drives the Silicon Labs Si4702/03 FM broadcast radio receivers
//! over I2C, including tuning, seeking, volume control and a background Radio
//! Data System (RDS) decoder.
//!
//! # Features
//! - Bands: 87.5-108 MHz (US/Europe), 76-108 MHz, 76-90 MHz (Japan)
//! - Channel spacing: 200, 100 and 50 kHz
//! - Tune and seek with bounded completion polling
//! - RDS: station name, radio text, program identification and type,
//!   traffic flags, alternate frequencies and clock time
//!
//! # Architecture
//! The driver is organized into several modules:
//!
//! - [`registers`]: Register definitions and the [`RegisterFile`] mirror
//!   - The chip only supports whole-file reads and control-window writes
//!   - Typed registers implement the `regiface` register traits
//! - [`shadow`]: Owns the bus and the mirror behind one lock
//! - [`tuning`]: Tune/seek handshake state machine
//! - [`rds`]: Group decoding and field assembly
//! - [`exchange`]: Decoded RDS state shared with callers, with change
//!   notification
//! - [`worker`]: Background thread polling for RDS groups
//! - [`device`]: The [`Si4703`] facade tying the above together
//!
//! # Usage
//! The main entry point is [`Si4703`], which wraps an
//! [`embedded_hal::i2c::I2c`] bus and an [`embedded_hal::delay::DelayNs`]
//! provider. Bring-up follows a fixed sequence:
//!
//! 1. Put the chip in 2-wire mode with [`bus_mode_reset`] (or board wiring)
//! 2. Create the driver with a [`Config`] for your region
//! 3. [`Si4703::power_on`] enables the oscillator, powers up and starts RDS
//! 4. Tune with [`Si4703::set_frequency`] or [`Si4703::seek`]
//! 5. Read RDS through [`Si4703::read_station_name`] or [`Si4703::rds_data`]
//!
//! # Important Notes
//! - Registers are never written without being read first
//! - The RDS worker and the caller share the bus; each transaction is atomic
//! - Decoded fields expire when they are not refreshed
//!
//! # Example
//! ```no_run
//! use embedded_hal::{delay::DelayNs, i2c::I2c};
//! use si4703::{Config, Error, Region, Si4703};
//!
//! fn start_radio<I2C, D>(i2c: I2C, delay: D) -> Result<Si4703<I2C, D>, Error<I2C::Error>>
//! where
//!     I2C: I2c + Send + 'static,
//!     D: DelayNs,
//! {
//!     let mut radio = Si4703::with_config(i2c, delay, Config::for_region(Region::Us));
//!     radio.power_on()?;
//!     radio.set_frequency(101.1)?;
//!     Ok(radio)
//! }
//! ```

pub mod band;
pub mod config;
pub mod device;
pub mod error;
pub mod exchange;
pub mod rds;
pub mod registers;
pub mod reset;
pub mod shadow;
pub mod tuning;
pub mod worker;

pub use band::{Band, BandPlan, ChannelSpacing, DeEmphasis, Region};
pub use config::{Config, Freshness, RdsTiming};
pub use device::{DeviceInfo, Si4703};
pub use error::Error;
pub use rds::{ClockTime, RdsData, StationName};
pub use registers::RegisterFile;
pub use reset::{bus_mode_reset, ResetError};
pub use tuning::{SeekDirection, SeekResult, TuneState, TuningStatus};
