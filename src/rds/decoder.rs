//! Group demultiplexer and freshness tracking

use std::time::{Duration, Instant};

use bitflags::bitflags;
use log::trace;

use super::{
    block_chars, AlternateFrequencies, ClockTime, GroupVersion, ProgramServiceName, RadioText,
    RdsGroup, StationName,
};
use crate::config::Freshness;

bitflags! {
    /// Fields touched by a decoder call.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Updated: u16 {
        const STATION_NAME = 1 << 0;
        const PROGRAM_ID = 1 << 1;
        const PROGRAM_TYPE = 1 << 2;
        const TRAFFIC_PROGRAM = 1 << 3;
        const TRAFFIC_ANNOUNCEMENT = 1 << 4;
        const RADIO_TEXT = 1 << 5;
        const ALTERNATE_FREQUENCIES = 1 << 6;
        const CLOCK = 1 << 7;
    }
}

#[derive(Debug, Clone, Copy)]
struct Timestamped<T> {
    value: T,
    at: Instant,
}

impl<T: Copy> Timestamped<T> {
    fn fresh(this: &Option<Self>, now: Instant, lifetime: Duration) -> Option<T> {
        this.filter(|t| now.saturating_duration_since(t.at) <= lifetime)
            .map(|t| t.value)
    }

    /// Drops the value once it is older than `lifetime`.
    fn expire(this: &mut Option<Self>, now: Instant, lifetime: Duration) -> bool {
        let stale = this.is_some_and(|t| now.saturating_duration_since(t.at) > lifetime);
        if stale {
            *this = None;
        }
        stale
    }
}

/// Decoded RDS fields that are currently valid.
///
/// Fields that were never received, or have not been refreshed within their
/// freshness window, are `None`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RdsData {
    pub station_name: Option<StationName>,
    pub program_id: Option<u16>,
    pub program_type: Option<u8>,
    pub traffic_program: Option<bool>,
    pub traffic_announcement: Option<bool>,
    pub radio_text: Option<String>,
    /// Alternate frequencies in MHz; the tuned frequency comes first
    pub alternate_frequencies: Vec<f32>,
    pub clock: Option<ClockTime>,
}

/// Assembles RDS fields from a stream of groups.
///
/// Groups may arrive in any order, repeated or with gaps; every field is
/// assembled independently and remembers when it was last refreshed.
#[derive(Debug, Clone)]
pub struct RdsDecoder {
    freshness: Freshness,
    station_name: ProgramServiceName,
    radio_text: RadioText,
    alternates: AlternateFrequencies,
    program_id: Option<Timestamped<u16>>,
    program_type: Option<Timestamped<u8>>,
    traffic_program: Option<Timestamped<bool>>,
    traffic_announcement: Option<Timestamped<bool>>,
    clock: Option<Timestamped<ClockTime>>,
    groups: u32,
}

impl Default for RdsDecoder {
    fn default() -> Self {
        Self::new(Freshness::default())
    }
}

impl RdsDecoder {
    pub fn new(freshness: Freshness) -> Self {
        Self {
            freshness,
            station_name: ProgramServiceName::new(),
            radio_text: RadioText::new(),
            alternates: AlternateFrequencies::new(),
            program_id: None,
            program_type: None,
            traffic_program: None,
            traffic_announcement: None,
            clock: None,
            groups: 0,
        }
    }

    pub fn freshness(&self) -> &Freshness {
        &self.freshness
    }

    /// Groups processed since the last clear.
    pub fn groups(&self) -> u32 {
        self.groups
    }

    /// Decodes one group received at `now`.
    pub fn process(&mut self, group: &RdsGroup, now: Instant) -> Updated {
        self.groups = self.groups.wrapping_add(1);
        let mut updated =
            Updated::PROGRAM_ID | Updated::PROGRAM_TYPE | Updated::TRAFFIC_PROGRAM;
        self.program_id = Some(Timestamped { value: group.program_id(), at: now });
        self.program_type = Some(Timestamped { value: group.program_type(), at: now });
        self.traffic_program = Some(Timestamped { value: group.traffic_program(), at: now });

        let b = group.b();
        match (group.group_type(), group.version()) {
            (0, version) => {
                let ta = b & 0x0010 != 0;
                self.traffic_announcement = Some(Timestamped { value: ta, at: now });
                updated |= Updated::TRAFFIC_ANNOUNCEMENT;

                let index = (b & 0x0003) as u8;
                self.station_name.apply(index, block_chars(group.d()), now);
                updated |= Updated::STATION_NAME;
                trace!("PS segment {index}: {}", self.station_name.name());

                if version == GroupVersion::A && self.alternates.apply_block(group.c(), now) {
                    updated |= Updated::ALTERNATE_FREQUENCIES;
                }
            }
            (2, version) => {
                let index = (b & 0x000F) as u8;
                let ab_flag = b & 0x0010 != 0;
                let [c0, c1] = block_chars(group.c());
                let [d0, d1] = block_chars(group.d());
                let segment = [c0, c1, d0, d1];
                let chars = match version {
                    GroupVersion::A => &segment[..],
                    GroupVersion::B => &segment[2..],
                };
                if self.radio_text.apply(version, index, ab_flag, chars, now) {
                    updated |= Updated::RADIO_TEXT;
                    trace!("RT segment {index}");
                }
            }
            (4, GroupVersion::A) => match ClockTime::from_group(group) {
                Some(clock) => {
                    trace!("CT {clock}");
                    self.clock = Some(Timestamped { value: clock, at: now });
                    updated |= Updated::CLOCK;
                }
                None => trace!("CT out of range: {:04x?}", group.blocks),
            },
            (kind, version) => trace!("ignoring group {kind}{version:?}"),
        }
        updated
    }

    /// Blanks or drops fields whose freshness window has passed.
    pub fn expire(&mut self, now: Instant) -> Updated {
        let f = self.freshness;
        let mut expired = Updated::empty();
        if self.station_name.expire(now, f.name_slot) {
            expired |= Updated::STATION_NAME;
        }
        if Timestamped::expire(&mut self.program_id, now, f.program) {
            expired |= Updated::PROGRAM_ID;
        }
        if Timestamped::expire(&mut self.program_type, now, f.program) {
            expired |= Updated::PROGRAM_TYPE;
        }
        if Timestamped::expire(&mut self.traffic_program, now, f.program) {
            expired |= Updated::TRAFFIC_PROGRAM;
        }
        if Timestamped::expire(&mut self.traffic_announcement, now, f.program) {
            expired |= Updated::TRAFFIC_ANNOUNCEMENT;
        }
        if is_stale(self.radio_text.updated(), now, f.radio_text) {
            self.radio_text.clear();
            expired |= Updated::RADIO_TEXT;
        }
        if is_stale(self.alternates.updated(), now, f.alternate_frequencies) {
            self.alternates.clear();
            expired |= Updated::ALTERNATE_FREQUENCIES;
        }
        if Timestamped::expire(&mut self.clock, now, f.clock) {
            expired |= Updated::CLOCK;
        }
        expired
    }

    /// Resets every field to its empty state.
    pub fn clear(&mut self) {
        *self = Self::new(self.freshness);
    }

    /// Station name as currently assembled; stale segments are spaces.
    pub fn station_name(&self) -> StationName {
        self.station_name.name()
    }

    /// True once all four name segments have been received since the last
    /// clear.
    pub fn station_name_complete(&self) -> bool {
        self.station_name.is_complete()
    }

    pub fn radio_text(&self) -> &RadioText {
        &self.radio_text
    }

    pub fn alternate_frequencies(&self) -> &AlternateFrequencies {
        &self.alternates
    }

    /// Copies out every field that is valid at `now`.
    pub fn snapshot(&self, now: Instant) -> RdsData {
        let f = &self.freshness;
        let name = self.station_name.name();
        let text = (!is_stale(self.radio_text.updated(), now, f.radio_text)
            && !self.radio_text.is_empty())
        .then(|| self.radio_text.text());
        let alternates_stale = is_stale(self.alternates.updated(), now, f.alternate_frequencies);
        let alternate_frequencies = if alternates_stale {
            Vec::new()
        } else {
            self.alternates.frequencies()
        };

        RdsData {
            station_name: (!name.is_blank()).then_some(name),
            program_id: Timestamped::fresh(&self.program_id, now, f.program),
            program_type: Timestamped::fresh(&self.program_type, now, f.program),
            traffic_program: Timestamped::fresh(&self.traffic_program, now, f.program),
            traffic_announcement: Timestamped::fresh(&self.traffic_announcement, now, f.program),
            radio_text: text,
            alternate_frequencies,
            clock: Timestamped::fresh(&self.clock, now, f.clock),
        }
    }
}

fn is_stale(updated: Option<Instant>, now: Instant, lifetime: Duration) -> bool {
    updated.is_some_and(|at| now.saturating_duration_since(at) > lifetime)
}
