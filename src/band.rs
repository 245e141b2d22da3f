//! Band plans and channel arithmetic
//!
//! The tuner addresses stations by channel index. The frequency of a channel
//! is `min_frequency + channel * spacing` (AN230 section 3.7.1), where the
//! band fixes the lower edge and the spacing is a per-region choice.

/// Channel field width in the CHANNEL and READCHAN registers.
pub const MAX_CHANNEL: u16 = 0x03FF;

/// Largest distance, in channels, between a requested frequency and the
/// nearest grid point for the request to be accepted.
const CHANNEL_EPSILON: f64 = 0.001;

/// Broadcast region, selecting a complete [`BandPlan`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Region {
    /// 87.5-108 MHz, 200 kHz spacing, 75 µs de-emphasis
    #[default]
    Us,
    /// 87.5-108 MHz, 100 kHz spacing, 50 µs de-emphasis
    Europe,
    /// 76-108 MHz, 100 kHz spacing, 50 µs de-emphasis
    Japan,
}

/// Band select, SYSCONFIG2 bits 7:6.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Band {
    /// 87.5-108 MHz (reset default)
    UsEurope = 0b00,
    /// 76-108 MHz
    JapanWide = 0b01,
    /// 76-90 MHz
    Japan = 0b10,
}

impl Band {
    /// Lower band edge in kHz.
    pub const fn min_khz(self) -> u32 {
        match self {
            Self::UsEurope => 87_500,
            Self::JapanWide | Self::Japan => 76_000,
        }
    }

    /// Upper band edge in kHz.
    pub const fn max_khz(self) -> u32 {
        match self {
            Self::UsEurope | Self::JapanWide => 108_000,
            Self::Japan => 90_000,
        }
    }

    pub(crate) const fn bits(self) -> u16 {
        self as u16
    }

    pub(crate) const fn from_bits(bits: u16) -> Option<Self> {
        match bits {
            0b00 => Some(Self::UsEurope),
            0b01 => Some(Self::JapanWide),
            0b10 => Some(Self::Japan),
            _ => None,
        }
    }
}

/// Channel spacing, SYSCONFIG2 bits 5:4.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ChannelSpacing {
    /// 200 kHz (USA, Australia; reset default)
    Khz200 = 0b00,
    /// 100 kHz (Europe, Japan)
    Khz100 = 0b01,
    /// 50 kHz
    Khz50 = 0b10,
}

impl ChannelSpacing {
    pub const fn khz(self) -> u32 {
        match self {
            Self::Khz200 => 200,
            Self::Khz100 => 100,
            Self::Khz50 => 50,
        }
    }

    pub(crate) const fn bits(self) -> u16 {
        self as u16
    }

    pub(crate) const fn from_bits(bits: u16) -> Option<Self> {
        match bits {
            0b00 => Some(Self::Khz200),
            0b01 => Some(Self::Khz100),
            0b10 => Some(Self::Khz50),
            _ => None,
        }
    }
}

/// FM de-emphasis time constant, SYSCONFIG1 bit 11.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DeEmphasis {
    /// 75 µs (USA)
    Us75,
    /// 50 µs (Europe, Australia, Japan)
    Europe50,
}

/// Band, spacing and de-emphasis used for one device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BandPlan {
    pub band: Band,
    pub spacing: ChannelSpacing,
    pub de_emphasis: DeEmphasis,
}

impl Default for BandPlan {
    fn default() -> Self {
        Self::for_region(Region::default())
    }
}

impl From<Region> for BandPlan {
    fn from(region: Region) -> Self {
        Self::for_region(region)
    }
}

impl BandPlan {
    pub const fn for_region(region: Region) -> Self {
        match region {
            Region::Us => Self {
                band: Band::UsEurope,
                spacing: ChannelSpacing::Khz200,
                de_emphasis: DeEmphasis::Us75,
            },
            Region::Europe => Self {
                band: Band::UsEurope,
                spacing: ChannelSpacing::Khz100,
                de_emphasis: DeEmphasis::Europe50,
            },
            Region::Japan => Self {
                band: Band::JapanWide,
                spacing: ChannelSpacing::Khz100,
                de_emphasis: DeEmphasis::Europe50,
            },
        }
    }

    /// Lowest tunable frequency in MHz.
    pub fn min_frequency(&self) -> f32 {
        khz_to_mhz(self.band.min_khz())
    }

    /// Highest tunable frequency in MHz.
    pub fn max_frequency(&self) -> f32 {
        khz_to_mhz(self.band.max_khz())
    }

    /// Distance between adjacent channels in MHz.
    pub fn channel_spacing(&self) -> f32 {
        khz_to_mhz(self.spacing.khz())
    }

    /// Highest channel index inside the band.
    pub fn max_channel(&self) -> u16 {
        let span = (self.band.max_khz() - self.band.min_khz()) / self.spacing.khz();
        span.min(MAX_CHANNEL as u32) as u16
    }

    /// Frequency in MHz of a channel index.
    pub fn channel_to_frequency(&self, channel: u16) -> f32 {
        khz_to_mhz(self.channel_to_khz(channel))
    }

    /// Frequency in kHz of a channel index.
    pub fn channel_to_khz(&self, channel: u16) -> u32 {
        self.band.min_khz() + u32::from(channel) * self.spacing.khz()
    }

    /// Channel index of a frequency in MHz.
    ///
    /// Returns `None` unless the frequency lies on the channel grid, within
    /// a thousandth of a channel, and inside the band.
    pub fn frequency_to_channel(&self, frequency: f32) -> Option<u16> {
        if !frequency.is_finite() {
            return None;
        }
        let min = f64::from(self.band.min_khz()) / 1000.0;
        let spacing = f64::from(self.spacing.khz()) / 1000.0;
        let fractional = (f64::from(frequency) - min) / spacing;
        let nearest = fractional.round();
        if (fractional - nearest).abs() > CHANNEL_EPSILON || nearest < 0.0 {
            return None;
        }
        let channel = nearest as u32;
        if channel > u32::from(self.max_channel()) {
            return None;
        }
        Some(channel as u16)
    }
}

fn khz_to_mhz(khz: u32) -> f32 {
    (f64::from(khz) / 1000.0) as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    const PLANS: [BandPlan; 4] = [
        BandPlan::for_region(Region::Us),
        BandPlan::for_region(Region::Europe),
        BandPlan::for_region(Region::Japan),
        BandPlan {
            band: Band::Japan,
            spacing: ChannelSpacing::Khz50,
            de_emphasis: DeEmphasis::Europe50,
        },
    ];

    #[test]
    fn every_grid_frequency_round_trips() {
        for plan in PLANS {
            for channel in 0..=plan.max_channel() {
                let frequency = plan.channel_to_frequency(channel);
                assert_eq!(plan.frequency_to_channel(frequency), Some(channel));
                let back = plan.channel_to_frequency(channel);
                assert!((back - frequency).abs() < 0.001 * plan.channel_spacing());
            }
        }
    }

    #[test]
    fn off_grid_frequency_is_rejected() {
        let us = BandPlan::for_region(Region::Us);
        assert_eq!(us.frequency_to_channel(100.05), None);
        assert_eq!(us.frequency_to_channel(100.2), None);
        assert_eq!(us.frequency_to_channel(100.1), Some(63));
    }

    #[test]
    fn out_of_band_frequency_is_rejected() {
        let europe = BandPlan::for_region(Region::Europe);
        assert_eq!(europe.frequency_to_channel(87.4), None);
        assert_eq!(europe.frequency_to_channel(108.1), None);
        assert_eq!(europe.frequency_to_channel(f32::NAN), None);
        assert_eq!(europe.frequency_to_channel(108.0), Some(205));
    }

    #[test]
    fn region_plans_match_datasheet() {
        let us = BandPlan::for_region(Region::Us);
        assert_eq!(us.min_frequency(), 87.5);
        assert_eq!(us.channel_spacing(), 0.2);
        assert_eq!(us.max_channel(), 102);

        let japan = BandPlan::for_region(Region::Japan);
        assert_eq!(japan.min_frequency(), 76.0);
        assert_eq!(japan.channel_to_frequency(10), 77.0);
    }
}
