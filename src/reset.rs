//! Two-wire bus mode selection
//!
//! The Si4703 samples SDIO on the rising edge of RST to pick its bus mode.
//! Holding SDIO low through that edge selects 2-wire (I2C) mode. SEN must be
//! high, which most breakout boards already arrange with a pull-up.
//!
//! On hosts where SDIO is also the I2C data line, the pin has to be taken
//! back from the I2C peripheral afterwards; how that is done is up to the HAL.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;
use log::debug;

/// Pin error raised during [`bus_mode_reset`].
#[derive(Debug, thiserror::Error)]
pub enum ResetError<R, S> {
    #[error("failed to drive RST: {0:?}")]
    Reset(R),
    #[error("failed to drive SDIO: {0:?}")]
    Sdio(S),
}

/// Resets the chip into 2-wire mode.
///
/// Drives SDIO and RST low, waits 1 ms, releases RST and waits another
/// 1 ms before the bus is used.
///
/// # Errors
/// * `ResetError::Sdio` - SDIO could not be driven low
/// * `ResetError::Reset` - RST could not be toggled
pub fn bus_mode_reset<RST, SDIO, D>(
    reset: &mut RST,
    sdio: &mut SDIO,
    delay: &mut D,
) -> Result<(), ResetError<RST::Error, SDIO::Error>>
where
    RST: OutputPin,
    SDIO: OutputPin,
    D: DelayNs,
{
    sdio.set_low().map_err(ResetError::Sdio)?;
    reset.set_low().map_err(ResetError::Reset)?;
    delay.delay_ms(1);
    reset.set_high().map_err(ResetError::Reset)?;
    delay.delay_ms(1);
    debug!("bus mode reset done");
    Ok(())
}

#[cfg(test)]
mod tests {
    use embedded_hal_mock::eh1::delay::{CheckedDelay, Transaction as DelayTransaction};
    use embedded_hal_mock::eh1::digital::{Mock as PinMock, State, Transaction as PinTransaction};
    use embedded_hal_mock::eh1::MockError;

    use super::*;

    #[test]
    fn sdio_held_low_across_reset_edge() {
        let mut reset = PinMock::new(&[
            PinTransaction::set(State::Low),
            PinTransaction::set(State::High),
        ]);
        let mut sdio = PinMock::new(&[PinTransaction::set(State::Low)]);
        let mut delay = CheckedDelay::new(&[
            DelayTransaction::delay_ms(1),
            DelayTransaction::delay_ms(1),
        ]);

        bus_mode_reset(&mut reset, &mut sdio, &mut delay).unwrap();

        reset.done();
        sdio.done();
        delay.done();
    }

    #[test]
    fn sdio_failure_stops_before_reset() {
        let mut reset = PinMock::new(&[]);
        let mut sdio = PinMock::new(&[PinTransaction::set(State::Low)
            .with_error(MockError::Io(std::io::ErrorKind::Other))]);
        let mut delay = CheckedDelay::new(&[]);

        let result = bus_mode_reset(&mut reset, &mut sdio, &mut delay);
        assert!(matches!(result, Err(ResetError::Sdio(_))));

        reset.done();
        sdio.done();
        delay.done();
    }
}
