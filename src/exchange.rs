//! Decoded RDS state shared between the worker and callers
//!
//! The worker is the only writer. Callers get copies, never references into
//! the live state, and can block until the worker reports new data.
//! Every call that changes the decoded state bumps a generation counter and
//! wakes all waiters; stopping the exchange wakes them too so nobody is left
//! waiting on a worker that has exited.

use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use crate::config::Freshness;
use crate::rds::{RdsData, RdsDecoder, RdsGroup, StationName, Updated};

#[derive(Debug, Default)]
struct Signal {
    generation: u64,
    running: bool,
}

/// Shared decoder state plus change notification.
#[derive(Debug)]
pub struct RdsExchange {
    decoder: Mutex<RdsDecoder>,
    signal: Mutex<Signal>,
    changed: Condvar,
}

impl RdsExchange {
    pub fn new(freshness: Freshness) -> Self {
        Self {
            decoder: Mutex::new(RdsDecoder::new(freshness)),
            signal: Mutex::new(Signal::default()),
            changed: Condvar::new(),
        }
    }

    /// Marks the producer as running. Waiters block only while it runs.
    pub fn start(&self) {
        self.signal().running = true;
    }

    /// Marks the producer as stopped and wakes every waiter.
    pub fn stop(&self) {
        self.signal().running = false;
        self.changed.notify_all();
    }

    pub fn is_running(&self) -> bool {
        self.signal().running
    }

    /// Decodes a group and notifies waiters.
    pub fn process(&self, group: &RdsGroup, now: Instant) -> Updated {
        let updated = self.decoder().process(group, now);
        if !updated.is_empty() {
            self.notify();
        }
        updated
    }

    /// Expires stale fields and notifies waiters if anything changed.
    pub fn expire(&self, now: Instant) -> Updated {
        let expired = self.decoder().expire(now);
        if !expired.is_empty() {
            self.notify();
        }
        expired
    }

    /// Resets all decoded fields.
    pub fn clear(&self) {
        self.decoder().clear();
        self.notify();
    }

    /// Copy of the station name as currently assembled.
    pub fn station_name(&self) -> StationName {
        self.decoder().station_name()
    }

    /// Copy of every field valid at `now`.
    pub fn rds_data(&self, now: Instant) -> RdsData {
        self.decoder().snapshot(now)
    }

    /// Copy of the whole decoder.
    pub fn decoder_snapshot(&self) -> RdsDecoder {
        self.decoder().clone()
    }

    /// Number of changes published so far.
    pub fn generation(&self) -> u64 {
        self.signal().generation
    }

    /// Blocks until the generation moves past `since`, the producer stops or
    /// `timeout` elapses.
    ///
    /// Returns the new generation, or `None` on timeout or when stopped.
    pub fn wait_for_update(&self, since: u64, timeout: Duration) -> Option<u64> {
        let deadline = Instant::now() + timeout;
        let mut signal = self.signal();
        loop {
            if signal.generation != since {
                return Some(signal.generation);
            }
            if !signal.running {
                return None;
            }
            let remaining = deadline.checked_duration_since(Instant::now())?;
            signal = self
                .changed
                .wait_timeout(signal, remaining)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
    }

    /// Waits until every station name segment has arrived at least once.
    ///
    /// Checks at least every `cadence`. Returns `None` when `timeout` elapses
    /// first or the producer stops, never a partially assembled name.
    pub fn read_station_name(&self, timeout: Duration, cadence: Duration) -> Option<StationName> {
        let deadline = Instant::now() + timeout;
        loop {
            // Generation first, so a change between the check and the wait
            // is not missed.
            let generation = self.generation();
            {
                let decoder = self.decoder();
                if decoder.station_name_complete() {
                    return Some(decoder.station_name());
                }
            }
            let remaining = deadline.checked_duration_since(Instant::now())?;
            if remaining.is_zero() {
                return None;
            }
            if !self.is_running() {
                return None;
            }
            self.wait_for_update(generation, remaining.min(cadence));
        }
    }

    fn notify(&self) {
        let mut signal = self.signal();
        signal.generation = signal.generation.wrapping_add(1);
        drop(signal);
        self.changed.notify_all();
    }

    fn decoder(&self) -> MutexGuard<'_, RdsDecoder> {
        self.decoder.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn signal(&self) -> MutexGuard<'_, Signal> {
        self.signal.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for RdsExchange {
    fn default() -> Self {
        Self::new(Freshness::default())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use super::*;

    fn ps_group(index: u16, chars: &[u8; 2]) -> RdsGroup {
        RdsGroup::new(0xC201, index, 0, u16::from_be_bytes(*chars))
    }

    #[test]
    fn process_bumps_generation() {
        let exchange = RdsExchange::default();
        let before = exchange.generation();
        exchange.process(&ps_group(0, b"AB"), Instant::now());
        assert_eq!(exchange.generation(), before + 1);
        assert_eq!(exchange.station_name().as_bytes(), b"AB      ");
    }

    #[test]
    fn wait_returns_immediately_when_stopped() {
        let exchange = RdsExchange::default();
        let started = Instant::now();
        assert_eq!(exchange.wait_for_update(0, Duration::from_secs(5)), None);
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn stop_wakes_waiters() {
        let exchange = Arc::new(RdsExchange::default());
        exchange.start();
        let waiter = {
            let exchange = Arc::clone(&exchange);
            thread::spawn(move || exchange.wait_for_update(0, Duration::from_secs(10)))
        };
        thread::sleep(Duration::from_millis(20));
        exchange.stop();
        assert_eq!(waiter.join().unwrap(), None);
    }

    #[test]
    fn read_station_name_waits_for_all_segments() {
        let exchange = Arc::new(RdsExchange::default());
        exchange.start();
        let producer = {
            let exchange = Arc::clone(&exchange);
            thread::spawn(move || {
                for (index, chars) in [(0, b"WX"), (1, b"YZ"), (2, b"-F"), (3, b"M ")] {
                    thread::sleep(Duration::from_millis(5));
                    exchange.process(&ps_group(index, chars), Instant::now());
                }
            })
        };
        let name = exchange.read_station_name(Duration::from_secs(5), Duration::from_millis(40));
        producer.join().unwrap();
        assert_eq!(name.map(|n| n.to_string()), Some("WXYZ-FM ".to_owned()));
    }

    #[test]
    fn read_station_name_times_out_without_partial_data() {
        let exchange = RdsExchange::default();
        exchange.start();
        exchange.process(&ps_group(0, b"AB"), Instant::now());
        let name = exchange.read_station_name(Duration::from_millis(50), Duration::from_millis(10));
        assert_eq!(name, None);
    }

    #[test]
    fn clear_resets_state() {
        let exchange = RdsExchange::default();
        exchange.process(&ps_group(0, b"AB"), Instant::now());
        exchange.clear();
        assert!(exchange.station_name().is_blank());
        assert_eq!(exchange.rds_data(Instant::now()), RdsData::default());
    }
}
