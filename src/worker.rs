//! Background RDS polling thread
//!
//! Follows the AN230 polling method: read the registers, and if RDSR is set
//! decode RDSA..RDSD, then sleep long enough for RDSR to drop again.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;

use embedded_hal::i2c::I2c;
use log::{debug, info, warn};

use crate::config::RdsTiming;
use crate::exchange::RdsExchange;
use crate::rds::RdsGroup;
use crate::shadow::RegisterShadow;
use crate::Error;

const THREAD_NAME: &str = "si4703-rds";

/// Handle to the running decoder thread.
pub struct RdsWorker {
    stop: Arc<AtomicBool>,
    exchange: Arc<RdsExchange>,
    handle: Option<JoinHandle<()>>,
}

impl RdsWorker {
    /// Starts polling `shadow` and feeding `exchange`.
    ///
    /// # Errors
    /// * `Error::WorkerSpawn` - the thread could not be created
    pub fn spawn<I2C>(
        shadow: Arc<RegisterShadow<I2C>>,
        exchange: Arc<RdsExchange>,
        timing: RdsTiming,
    ) -> Result<Self, Error<I2C::Error>>
    where
        I2C: I2c + Send + 'static,
    {
        let stop = Arc::new(AtomicBool::new(false));
        exchange.start();

        let handle = {
            let stop = Arc::clone(&stop);
            let exchange = Arc::clone(&exchange);
            thread::Builder::new()
                .name(THREAD_NAME.into())
                .spawn(move || run(&*shadow, &exchange, &stop, timing))
        };
        let handle = match handle {
            Ok(handle) => handle,
            Err(error) => {
                exchange.stop();
                return Err(Error::WorkerSpawn(error));
            }
        };
        info!("RDS worker started");

        Ok(Self {
            stop,
            exchange,
            handle: Some(handle),
        })
    }

    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().map_or(true, JoinHandle::is_finished)
    }

    /// Stops the thread, waits for it to exit and clears the decoded state.
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        let Some(handle) = self.handle.take() else {
            return;
        };
        self.stop.store(true, Ordering::Release);
        handle.thread().unpark();
        self.exchange.stop();
        if handle.join().is_err() {
            warn!("RDS worker panicked");
        }
        self.exchange.clear();
        info!("RDS worker stopped");
    }
}

impl Drop for RdsWorker {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn run<I2C: I2c>(
    shadow: &RegisterShadow<I2C>,
    exchange: &RdsExchange,
    stop: &AtomicBool,
    timing: RdsTiming,
) {
    let mut failing = false;
    while !stop.load(Ordering::Acquire) {
        let wait = match shadow.read_all() {
            Ok(registers) => {
                if failing {
                    debug!("RDS worker bus recovered");
                    failing = false;
                }
                let now = Instant::now();
                let group = RdsGroup::latched(&registers);
                if let Some(group) = &group {
                    exchange.process(group, now);
                }
                exchange.expire(now);
                if group.is_some() {
                    timing.after_group
                } else {
                    timing.idle
                }
            }
            Err(error) => {
                // Logged once per outage, retried at the idle rate.
                if !failing {
                    warn!("RDS worker read failed: {error}");
                    failing = true;
                }
                timing.idle
            }
        };
        thread::park_timeout(wait);
    }
}
