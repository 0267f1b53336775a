//! Error types for the ranging library.
//!
//! This module defines the errors that can occur while configuring the
//! sensor pins or timing an echo pulse.

use thiserror::Error;

/// A failure reported by a [`GpioBus`](crate::gpio::GpioBus) implementation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("GPIO error on pin {pin}: {message}")]
pub struct GpioError {
    /// BCM number of the pin involved.
    pub pin: u8,
    /// Backend supplied description.
    pub message: String,
}

impl GpioError {
    /// Build an error for `pin` from any displayable backend error.
    pub fn new(pin: u8, message: impl ToString) -> Self {
        GpioError {
            pin,
            message: message.to_string(),
        }
    }
}

/// Errors that can occur while taking a measurement.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MeasureError {
    /// The echo line never rose within the timeout.
    /// Usually means no object is in range or the sensor is disconnected.
    #[error("echo start timeout: no echo received within {0:?}")]
    EchoStartTimeout(std::time::Duration),
    /// The echo line stayed high for longer than the timeout.
    #[error("echo end timeout: echo stayed high for more than {0:?}")]
    EchoEndTimeout(std::time::Duration),
    /// The GPIO backend failed while driving or sampling a pin.
    #[error(transparent)]
    Gpio(#[from] GpioError),
    /// The sensor configuration cannot work.
    #[error("invalid sensor configuration: {0}")]
    InvalidConfig(&'static str),
}

impl MeasureError {
    /// Whether this failure is one of the echo timeouts.
    ///
    /// Timeouts are routine (nothing in front of the sensor) and the caller
    /// is expected to simply try again on the next cycle.
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            MeasureError::EchoStartTimeout(_) | MeasureError::EchoEndTimeout(_)
        )
    }
}
