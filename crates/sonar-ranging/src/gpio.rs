//! The GPIO and timing boundary the sensor is written against.

use core::fmt;
use std::time::{Duration, Instant};

use crate::error::GpioError;

/// Logic level of a digital pin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    /// Pin reads or drives 0 V.
    Low,
    /// Pin reads or drives the supply voltage.
    High,
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Level::Low => write!(f, "low"),
            Level::High => write!(f, "high"),
        }
    }
}

/// Direction of a digital pin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinMode {
    /// Pin is sampled.
    Input,
    /// Pin is driven.
    Output,
}

/// Capability to configure, drive, sample and release digital pins.
///
/// Pins are addressed by their BCM number. Implementations own whatever
/// handles they acquire and must hand them back in [`GpioBus::release`].
pub trait GpioBus {
    /// Set the direction of `pin`, acquiring it if needed.
    fn set_mode(&mut self, pin: u8, mode: PinMode) -> Result<(), GpioError>;

    /// Drive an output pin.
    fn write(&mut self, pin: u8, level: Level) -> Result<(), GpioError>;

    /// Sample an input pin.
    fn read(&mut self, pin: u8) -> Result<Level, GpioError>;

    /// Return every pin configured through this bus to a neutral state.
    fn release(&mut self);
}

/// Monotonic time source used for pulse timing.
pub trait Clock {
    /// Time elapsed since an arbitrary fixed origin.
    fn now(&self) -> Duration;

    /// Block for `duration`.
    fn pause(&mut self, duration: Duration);
}

/// [`Clock`] backed by [`Instant`], with spin-assisted sleeps so a 10 µs
/// trigger pulse is not stretched to the scheduler's granularity.
pub struct SystemClock {
    origin: Instant,
    sleeper: spin_sleep::SpinSleeper,
}

impl SystemClock {
    /// Create a clock whose origin is now.
    pub fn new() -> Self {
        SystemClock {
            origin: Instant::now(),
            sleeper: spin_sleep::SpinSleeper::default(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }

    fn pause(&mut self, duration: Duration) {
        self.sleeper.sleep(duration);
    }
}
