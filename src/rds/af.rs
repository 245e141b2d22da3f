//! Alternate frequency list (method A)

use std::time::Instant;

use heapless::Vec as BoundedVec;

/// Largest list method A can announce.
pub const MAX_ALTERNATES: usize = 25;

const FIRST_FREQUENCY: u8 = 1;
const LAST_FREQUENCY: u8 = 204;
const FILLER: u8 = 205;
const COUNT_BASE: u8 = 224;
const LF_MF_FOLLOWS: u8 = 250;

/// Converts an AF code (1..=204) to MHz.
pub fn code_to_mhz(code: u8) -> f32 {
    (875.0 + f32::from(code)) / 10.0
}

/// Collects alternate frequencies from block C of 0A groups.
///
/// A header code `224 + n` announces `n` frequencies; its companion byte is
/// the tuned frequency and is listed first. Pairs that arrive before any
/// header are dropped since their list cannot be bounded.
#[derive(Debug, Clone, Default)]
pub struct AlternateFrequencies {
    codes: BoundedVec<u8, MAX_ALTERNATES>,
    expected: Option<u8>,
    header: Option<(u8, u8)>,
    updated: Option<Instant>,
}

impl AlternateFrequencies {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds one block C. Returns true if the list changed.
    pub fn apply_block(&mut self, block: u16, now: Instant) -> bool {
        let [first, second] = block.to_be_bytes();

        if (COUNT_BASE..=COUNT_BASE + MAX_ALTERNATES as u8).contains(&first) {
            return self.apply_header(first - COUNT_BASE, second, now);
        }

        let Some(expected) = self.expected else {
            return false;
        };

        let mut changed = false;
        let mut skip_next = false;
        for code in [first, second] {
            if skip_next {
                skip_next = false;
                continue;
            }
            match code {
                LF_MF_FOLLOWS => skip_next = true,
                FIRST_FREQUENCY..=LAST_FREQUENCY => {
                    if self.codes.len() < usize::from(expected) && !self.codes.contains(&code) {
                        // Capacity is bounded by `expected`, which never exceeds it.
                        changed |= self.codes.push(code).is_ok();
                    }
                }
                // Filler and unassigned codes carry no frequency.
                _ => {}
            }
        }
        if changed {
            self.updated = Some(now);
        }
        changed
    }

    fn apply_header(&mut self, count: u8, tuned: u8, now: Instant) -> bool {
        if self.header == Some((count, tuned)) {
            return false;
        }
        self.clear();
        if count == 0 {
            return false;
        }
        self.header = Some((count, tuned));
        self.expected = Some(count);
        if (FIRST_FREQUENCY..=LAST_FREQUENCY).contains(&tuned) {
            // Cannot fail: the list was just cleared.
            let _ = self.codes.push(tuned);
        }
        self.updated = Some(now);
        true
    }

    /// Frequencies in MHz, in order of arrival.
    pub fn frequencies(&self) -> Vec<f32> {
        self.codes.iter().copied().map(code_to_mhz).collect()
    }

    pub fn codes(&self) -> &[u8] {
        &self.codes
    }

    /// Number of frequencies announced by the last header.
    pub fn expected(&self) -> Option<u8> {
        self.expected
    }

    pub fn is_complete(&self) -> bool {
        self.expected
            .is_some_and(|n| self.codes.len() == usize::from(n))
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }

    pub fn updated(&self) -> Option<Instant> {
        self.updated
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}
