//! Clock-time group (4A) decoding

use core::fmt;

use super::RdsGroup;

/// First MJD the conversion is defined for (1900-03-01).
pub const MIN_MJD: u32 = 15_079;

/// Last MJD the conversion is defined for (2100-02-28).
pub const MAX_MJD: u32 = 88_127;

const MINUTES_PER_DAY: i32 = 24 * 60;

/// A Gregorian calendar date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CalendarDate {
    pub year: u16,
    pub month: u8,
    pub day: u8,
}

impl CalendarDate {
    /// Converts a Modified Julian Day using the RBDS annex formula.
    ///
    /// Returns `None` outside `MIN_MJD..=MAX_MJD`, where the formula stops
    /// producing valid dates.
    pub fn from_mjd(mjd: u32) -> Option<Self> {
        if !(MIN_MJD..=MAX_MJD).contains(&mjd) {
            return None;
        }
        let mjd = f64::from(mjd);
        let y = ((mjd - 15_078.2) / 365.25).trunc();
        let y_days = (y * 365.25).trunc();
        let m = ((mjd - 14_956.1 - y_days) / 30.6001).trunc();
        let day = mjd - 14_956.0 - y_days - (m * 30.6001).trunc();
        let k = if m == 14.0 || m == 15.0 { 1.0 } else { 0.0 };
        let year = 1900.0 + y + k;
        let month = m - 1.0 - 12.0 * k;

        Some(Self {
            year: year as u16,
            month: month as u8,
            day: day as u8,
        })
    }
}

impl fmt::Display for CalendarDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}-{:02}", self.year, self.month, self.day)
    }
}

/// Broadcast clock time from a 4A group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ClockTime {
    pub date: CalendarDate,
    pub utc_hour: u8,
    pub utc_minute: u8,
    /// Local offset from UTC in half hours, signed.
    pub offset_half_hours: i8,
}

impl ClockTime {
    /// Decodes blocks B-D of a 4A group. Returns `None` when the date or
    /// time fields are out of range.
    pub fn from_group(group: &RdsGroup) -> Option<Self> {
        let (b, c, d) = (group.b(), group.c(), group.d());
        let mjd = (u32::from(b & 0x0003) << 15) | u32::from(c >> 1);
        let utc_hour = (((c & 0x0001) << 4) | (d >> 12)) as u8;
        let utc_minute = ((d >> 6) & 0x003F) as u8;
        let magnitude = (d & 0x001F) as i8;
        let offset_half_hours = if d & 0x0020 != 0 { -magnitude } else { magnitude };

        if utc_hour > 23 || utc_minute > 59 {
            return None;
        }
        Some(Self {
            date: CalendarDate::from_mjd(mjd)?,
            utc_hour,
            utc_minute,
            offset_half_hours,
        })
    }

    /// Local wall-clock time as `(hour, minute)`.
    ///
    /// Half-hour offsets carry into the minute; the result wraps at midnight.
    pub fn local_time(&self) -> (u8, u8) {
        let utc = i32::from(self.utc_hour) * 60 + i32::from(self.utc_minute);
        let local = (utc + i32::from(self.offset_half_hours) * 30).rem_euclid(MINUTES_PER_DAY);
        ((local / 60) as u8, (local % 60) as u8)
    }
}

impl fmt::Display for ClockTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.offset_half_hours < 0 { '-' } else { '+' };
        let offset = self.offset_half_hours.unsigned_abs();
        write!(
            f,
            "{}T{:02}:{:02}Z{}{:02}:{:02}",
            self.date,
            self.utc_hour,
            self.utc_minute,
            sign,
            offset / 2,
            (offset % 2) * 30
        )
    }
}
