//! Driver error type

use core::time::Duration;

/// Errors returned by the driver.
///
/// `E` is the error type of the underlying I2C bus.
#[derive(Debug, thiserror::Error)]
pub enum Error<E> {
    /// The bus transaction failed or the chip did not acknowledge it
    #[error("bus transaction failed: {0:?}")]
    Bus(E),
    /// Requested frequency is not on the channel grid of the band plan
    #[error("{0} MHz is not a channel of the configured band")]
    InvalidFrequency(f32),
    /// Requested channel index lies outside the band
    #[error("channel {0} is outside the configured band")]
    InvalidChannel(u16),
    /// STC did not reach the expected level before the deadline
    #[error("seek/tune did not complete within {0:?}")]
    TuningTimeout(Duration),
    /// The operation requires a powered-up chip
    #[error("device is not powered on")]
    NotPowered,
    /// The RDS worker thread could not be started
    #[error("failed to start RDS worker")]
    WorkerSpawn(#[source] std::io::Error),
}

impl<E> Error<E> {
    pub fn is_bus(&self) -> bool {
        matches!(self, Self::Bus(_))
    }
}
