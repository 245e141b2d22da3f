//! Driver configuration
//!
//! Everything here has a default that matches the datasheet and AN230
//! recommendations. Adjust with the `with_*` builder methods.

use core::time::Duration;

use crate::band::{BandPlan, Region};
use crate::shadow::DEFAULT_ADDRESS;

/// How long decoded RDS fields stay valid without being refreshed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Freshness {
    /// One two-character slot of the station name
    pub name_slot: Duration,
    /// Program identification, program type and traffic flags
    pub program: Duration,
    /// Radio text
    pub radio_text: Duration,
    /// Alternate frequency list
    pub alternate_frequencies: Duration,
    /// Clock time; broadcast once per minute
    pub clock: Duration,
}

impl Default for Freshness {
    fn default() -> Self {
        Self {
            name_slot: Duration::from_millis(500),
            program: Duration::from_secs(2),
            radio_text: Duration::from_secs(20),
            alternate_frequencies: Duration::from_secs(20),
            clock: Duration::from_secs(70),
        }
    }
}

/// Polling cadence of the RDS worker (AN230 polling method).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RdsTiming {
    /// Wait after consuming a group, long enough for RDSR to drop
    pub after_group: Duration,
    /// Wait before checking RDSR again when no group was ready
    pub idle: Duration,
    /// Check interval used by blocking station name reads
    pub read_cadence: Duration,
}

impl Default for RdsTiming {
    fn default() -> Self {
        Self {
            after_group: Duration::from_millis(40),
            idle: Duration::from_millis(30),
            read_cadence: Duration::from_millis(40),
        }
    }
}

/// Device configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Config {
    /// 7-bit bus address
    pub address: u8,
    /// Band, spacing and de-emphasis
    pub band_plan: BandPlan,
    /// Volume applied at power-up (0..=15, larger values are clamped)
    pub initial_volume: u8,
    /// Enable the RDS decoder and its worker thread
    pub rds: bool,
    /// Upper bound for each STC edge while tuning
    pub tune_timeout: Duration,
    /// Upper bound for each STC edge while seeking
    pub seek_timeout: Duration,
    /// Wait between status reads while polling STC
    pub poll_interval: Duration,
    /// Seek continues from the opposite band edge instead of stopping
    pub seek_wrap: bool,
    pub rds_timing: RdsTiming,
    pub freshness: Freshness,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            address: DEFAULT_ADDRESS,
            band_plan: BandPlan::default(),
            initial_volume: 1,
            rds: true,
            tune_timeout: Duration::from_secs(2),
            seek_timeout: Duration::from_secs(10),
            poll_interval: Duration::from_millis(5),
            seek_wrap: true,
            rds_timing: RdsTiming::default(),
            freshness: Freshness::default(),
        }
    }
}

impl Config {
    /// Default configuration for a broadcast region.
    pub fn for_region(region: Region) -> Self {
        Self::default().with_band_plan(region.into())
    }

    pub fn with_address(mut self, address: u8) -> Self {
        self.address = address;
        self
    }

    pub fn with_band_plan(mut self, band_plan: BandPlan) -> Self {
        self.band_plan = band_plan;
        self
    }

    pub fn with_initial_volume(mut self, volume: u8) -> Self {
        self.initial_volume = volume;
        self
    }

    pub fn with_rds(mut self, enabled: bool) -> Self {
        self.rds = enabled;
        self
    }

    pub fn with_tune_timeout(mut self, timeout: Duration) -> Self {
        self.tune_timeout = timeout;
        self
    }

    pub fn with_seek_timeout(mut self, timeout: Duration) -> Self {
        self.seek_timeout = timeout;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_seek_wrap(mut self, wrap: bool) -> Self {
        self.seek_wrap = wrap;
        self
    }

    pub fn with_rds_timing(mut self, timing: RdsTiming) -> Self {
        self.rds_timing = timing;
        self
    }

    pub fn with_freshness(mut self, freshness: Freshness) -> Self {
        self.freshness = freshness;
        self
    }
}
