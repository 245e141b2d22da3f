//! Station name and radio text assembly

use core::fmt;
use std::time::{Duration, Instant};

use super::{display_char, GroupVersion};

/// Characters in a program service name.
pub const STATION_NAME_LEN: usize = 8;

/// Two-character segments making up a program service name.
pub const NAME_SEGMENTS: usize = 4;

/// Characters in a full 2A radio text.
pub const RADIO_TEXT_LEN: usize = 64;

/// Segments in a radio text (four characters each in 2A, two in 2B).
pub const TEXT_SEGMENTS: usize = 16;

const BLANK: u8 = b' ';
const END_OF_TEXT: u8 = 0x0D;

/// An 8-character program service name. Unknown positions are spaces.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct StationName([u8; STATION_NAME_LEN]);

impl StationName {
    pub const BLANK: Self = Self([BLANK; STATION_NAME_LEN]);

    pub const fn from_bytes(bytes: [u8; STATION_NAME_LEN]) -> Self {
        Self(bytes)
    }

    /// Raw RDS character codes.
    pub const fn as_bytes(&self) -> &[u8; STATION_NAME_LEN] {
        &self.0
    }

    pub fn is_blank(&self) -> bool {
        self.0.iter().all(|&c| c == BLANK)
    }
}

impl Default for StationName {
    fn default() -> Self {
        Self::BLANK
    }
}

impl fmt::Display for StationName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.iter().try_for_each(|&c| write!(f, "{}", display_char(c)))
    }
}

impl fmt::Debug for StationName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StationName(\"{self}\")")
    }
}

/// Assembles the program service name from 0A/0B groups.
///
/// Each segment carries two characters at `2 * index`. A segment that has
/// not been refreshed within its lifetime is blanked rather than left
/// showing characters that may belong to a previous station.
#[derive(Debug, Clone)]
pub struct ProgramServiceName {
    chars: [u8; STATION_NAME_LEN],
    refreshed: [Option<Instant>; NAME_SEGMENTS],
    seen: u8,
}

impl Default for ProgramServiceName {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgramServiceName {
    pub fn new() -> Self {
        Self {
            chars: [BLANK; STATION_NAME_LEN],
            refreshed: [None; NAME_SEGMENTS],
            seen: 0,
        }
    }

    /// Stores one segment. `index` is taken modulo 4.
    pub fn apply(&mut self, index: u8, chars: [u8; 2], now: Instant) {
        let index = usize::from(index) % NAME_SEGMENTS;
        self.chars[index * 2..index * 2 + 2].copy_from_slice(&chars);
        self.refreshed[index] = Some(now);
        self.seen |= 1 << index;
    }

    /// Blanks every segment older than `lifetime`. Returns true if any
    /// segment was blanked.
    pub fn expire(&mut self, now: Instant, lifetime: Duration) -> bool {
        let mut blanked = false;
        for (index, refreshed) in self.refreshed.iter_mut().enumerate() {
            let stale = refreshed.is_some_and(|at| now.saturating_duration_since(at) > lifetime);
            if stale {
                self.chars[index * 2..index * 2 + 2].fill(BLANK);
                *refreshed = None;
                blanked = true;
            }
        }
        blanked
    }

    /// Current name, stale segments shown as spaces.
    pub fn name(&self) -> StationName {
        StationName(self.chars)
    }

    /// True once every segment has been received since the last clear.
    pub fn is_complete(&self) -> bool {
        self.seen == (1 << NAME_SEGMENTS) - 1
    }

    /// Time of the most recent segment still considered live.
    pub fn last_refresh(&self) -> Option<Instant> {
        self.refreshed.iter().flatten().max().copied()
    }

    pub fn clear(&mut self) {
        *self = Self::new();
    }
}

/// Assembles radio text from 2A/2B groups.
///
/// 2A groups carry four characters per segment (blocks C and D), 2B groups
/// two (block D). The first copy of each segment wins; repeats are ignored
/// until the text is reset, either explicitly or by the broadcaster toggling
/// the text A/B flag.
#[derive(Debug, Clone)]
pub struct RadioText {
    chars: [u8; RADIO_TEXT_LEN],
    filled: u16,
    version: Option<GroupVersion>,
    ab_flag: Option<bool>,
    updated: Option<Instant>,
}

impl Default for RadioText {
    fn default() -> Self {
        Self::new()
    }
}

impl RadioText {
    pub fn new() -> Self {
        Self {
            chars: [BLANK; RADIO_TEXT_LEN],
            filled: 0,
            version: None,
            ab_flag: None,
            updated: None,
        }
    }

    /// Stores a segment. `chars` holds 4 characters for 2A and 2 for 2B.
    ///
    /// Returns true if the segment was new.
    pub fn apply(
        &mut self,
        version: GroupVersion,
        index: u8,
        ab_flag: bool,
        chars: &[u8],
        now: Instant,
    ) -> bool {
        if self.ab_flag.is_some_and(|flag| flag != ab_flag)
            || self.version.is_some_and(|v| v != version)
        {
            self.clear();
        }
        self.ab_flag = Some(ab_flag);
        self.version = Some(version);

        let index = usize::from(index) % TEXT_SEGMENTS;
        if self.filled & (1 << index) != 0 {
            return false;
        }
        let width = segment_width(version);
        let start = index * width;
        let len = chars.len().min(width);
        self.chars[start..start + len].copy_from_slice(&chars[..len]);
        self.filled |= 1 << index;
        self.updated = Some(now);
        true
    }

    /// Text received so far, up to the end-of-text marker. Segments not yet
    /// received are spaces; trailing spaces are removed.
    pub fn text(&self) -> String {
        let text: String = self.visible().iter().map(|&c| display_char(c)).collect();
        text.trim_end().to_owned()
    }

    /// True once every segment up to the end of the text has arrived.
    pub fn is_complete(&self) -> bool {
        let Some(version) = self.version else {
            return false;
        };
        let segments = self.visible().len().div_ceil(segment_width(version));
        (0..segments).all(|i| self.filled & (1 << i) != 0)
    }

    pub fn is_empty(&self) -> bool {
        self.filled == 0
    }

    pub fn updated(&self) -> Option<Instant> {
        self.updated
    }

    pub fn clear(&mut self) {
        *self = Self::new();
    }

    fn visible(&self) -> &[u8] {
        let len = match self.version {
            Some(version) => segment_width(version) * TEXT_SEGMENTS,
            None => 0,
        };
        let chars = &self.chars[..len];
        match chars.iter().position(|&c| c == END_OF_TEXT) {
            Some(end) => &chars[..end],
            None => chars,
        }
    }
}

const fn segment_width(version: GroupVersion) -> usize {
    match version {
        GroupVersion::A => 4,
        GroupVersion::B => 2,
    }
}
