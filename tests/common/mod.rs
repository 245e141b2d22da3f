//! Simulated Si4703 on an I2C bus
//!
//! Models the two bus transactions, the STC handshake for tune and seek, and
//! a queue of RDS groups latched one per read.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

use embedded_hal::i2c::{ErrorKind, ErrorType, I2c, Operation};

pub const ADDRESS: u8 = 0x10;

pub const POWERCFG: usize = 0x02;
pub const CHANNEL: usize = 0x03;
pub const SYSCONFIG1: usize = 0x04;
pub const SYSCONFIG2: usize = 0x05;
pub const TEST1: usize = 0x07;
pub const STATUSRSSI: usize = 0x0A;
pub const READCHAN: usize = 0x0B;

const TUNE: u16 = 1 << 15;
const SEEK: u16 = 1 << 8;
const SEEKUP: u16 = 1 << 9;
const STC: u16 = 1 << 14;
const SFBL: u16 = 1 << 13;
const RDSR: u16 = 1 << 15;
const RDS: u16 = 1 << 12;

/// How the simulated chip answers tune and seek requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    /// STC rises after `reads` status reads
    After { reads: u32 },
    /// STC never rises
    Never,
}

/// What a seek finds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeekOutcome {
    /// Stops on this channel index
    Station(u16),
    /// Reaches the band limit
    BandLimit,
}

#[derive(Debug)]
pub struct ChipState {
    pub registers: [u16; 16],
    /// Control window of every write, registers 0x02..=0x07
    pub writes: Vec<[u16; 6]>,
    pub reads: usize,
    pub completion: Completion,
    pub seek_up: SeekOutcome,
    pub seek_down: SeekOutcome,
    pub rds_groups: VecDeque<[u16; 4]>,
    pub fail_reads: usize,
    pub fail_writes: usize,
    stc_countdown: Option<u32>,
    pending_channel: Option<u16>,
    pending_band_limit: bool,
}

impl ChipState {
    fn new() -> Self {
        let mut registers = [0u16; 16];
        registers[0x00] = 0x1242;
        registers[0x01] = 0x1253;
        registers[SYSCONFIG2] = 0x1900;
        Self {
            registers,
            writes: Vec::new(),
            reads: 0,
            completion: Completion::After { reads: 2 },
            seek_up: SeekOutcome::Station(68),
            seek_down: SeekOutcome::BandLimit,
            rds_groups: VecDeque::new(),
            fail_reads: 0,
            fail_writes: 0,
            stc_countdown: None,
            pending_channel: None,
            pending_band_limit: false,
        }
    }

    pub fn last_write(&self) -> Option<[u16; 6]> {
        self.writes.last().copied()
    }

    /// Word of `register` in the last write.
    pub fn written(&self, register: usize) -> Option<u16> {
        self.last_write().map(|w| w[register - POWERCFG])
    }

    fn on_write(&mut self, bytes: &[u8]) {
        let mut window = [0u16; 6];
        for (i, pair) in bytes.chunks_exact(2).take(6).enumerate() {
            window[i] = u16::from_be_bytes([pair[0], pair[1]]);
            self.registers[POWERCFG + i] = window[i];
        }
        self.writes.push(window);

        let tune = window[CHANNEL - POWERCFG] & TUNE != 0;
        let seek = window[POWERCFG - POWERCFG] & SEEK != 0;
        let stc = self.registers[STATUSRSSI] & STC != 0;

        if (tune || seek) && !stc && self.stc_countdown.is_none() {
            if let Completion::After { reads } = self.completion {
                self.stc_countdown = Some(reads);
            }
            if tune {
                self.pending_channel = Some(window[CHANNEL - POWERCFG] & 0x03FF);
                self.pending_band_limit = false;
            } else {
                let up = window[POWERCFG - POWERCFG] & SEEKUP != 0;
                let outcome = if up { self.seek_up } else { self.seek_down };
                match outcome {
                    SeekOutcome::Station(channel) => {
                        self.pending_channel = Some(channel);
                        self.pending_band_limit = false;
                    }
                    SeekOutcome::BandLimit => {
                        self.pending_channel = None;
                        self.pending_band_limit = true;
                    }
                }
            }
        }

        if !tune && !seek {
            self.stc_countdown = None;
            self.registers[STATUSRSSI] &= !(STC | SFBL);
        }
    }

    fn on_read(&mut self, buffer: &mut [u8]) {
        self.reads += 1;

        if let Some(countdown) = self.stc_countdown {
            if countdown == 0 {
                self.stc_countdown = None;
                self.registers[STATUSRSSI] |= STC;
                if self.pending_band_limit {
                    self.registers[STATUSRSSI] |= SFBL;
                }
                if let Some(channel) = self.pending_channel.take() {
                    self.registers[READCHAN] = (self.registers[READCHAN] & !0x03FF) | channel;
                }
            } else {
                self.stc_countdown = Some(countdown - 1);
            }
        }

        let rds_on = self.registers[SYSCONFIG1] & RDS != 0;
        match self.rds_groups.pop_front().filter(|_| rds_on) {
            Some(group) => {
                self.registers[0x0C..0x10].copy_from_slice(&group);
                self.registers[STATUSRSSI] |= RDSR;
            }
            None => self.registers[STATUSRSSI] &= !RDSR,
        }

        for (i, chunk) in buffer.chunks_exact_mut(2).enumerate() {
            let word = self.registers[(0x0A + i) % 16];
            chunk.copy_from_slice(&word.to_be_bytes());
        }
    }
}

/// Cloneable handle to a simulated chip. Clones share state.
#[derive(Debug, Clone)]
pub struct FakeSi4703 {
    state: Arc<Mutex<ChipState>>,
}

impl FakeSi4703 {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(ChipState::new())),
        }
    }

    pub fn state(&self) -> MutexGuard<'_, ChipState> {
        self.state.lock().unwrap()
    }

    pub fn set_register(&self, register: usize, value: u16) {
        self.state().registers[register] = value;
    }

    pub fn queue_group(&self, group: [u16; 4]) {
        self.state().rds_groups.push_back(group);
    }

    pub fn write_count(&self) -> usize {
        self.state().writes.len()
    }
}

impl ErrorType for FakeSi4703 {
    type Error = ErrorKind;
}

impl I2c for FakeSi4703 {
    fn transaction(
        &mut self,
        address: u8,
        operations: &mut [Operation<'_>],
    ) -> Result<(), Self::Error> {
        if address != ADDRESS {
            return Err(ErrorKind::NoAcknowledge(
                embedded_hal::i2c::NoAcknowledgeSource::Address,
            ));
        }
        let mut state = self.state();
        for operation in operations {
            match operation {
                Operation::Read(buffer) => {
                    if state.fail_reads > 0 {
                        state.fail_reads -= 1;
                        return Err(ErrorKind::Bus);
                    }
                    state.on_read(buffer);
                }
                Operation::Write(bytes) => {
                    if state.fail_writes > 0 {
                        state.fail_writes -= 1;
                        return Err(ErrorKind::Bus);
                    }
                    state.on_write(bytes);
                }
            }
        }
        Ok(())
    }
}
