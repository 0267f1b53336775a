#![warn(missing_docs)]
#![doc = "Ultrasonic ranging for HC-SR04 style sensors."]
#![doc = ""]
#![doc = "This crate drives the trigger pin, times the echo pulse by polling with a"]
#![doc = "timeout, and converts the pulse width into a distance using a fixed speed of sound."]

use core::fmt;
use core::str::FromStr;
use std::time::Duration;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

pub mod error;
pub mod gpio;
#[cfg(any(test, feature = "mock"))]
pub mod mock;
#[cfg(feature = "rppal")]
pub mod rpi;

pub use error::{GpioError, MeasureError};
pub use gpio::{Clock, GpioBus, Level, PinMode, SystemClock};

/// Speed of sound in dry air at roughly 20 °C (cm/s). Not temperature compensated.
pub const SPEED_OF_SOUND_CM_PER_S: f64 = 34_320.0;

/// Width of the trigger pulse that starts a measurement.
pub const TRIGGER_PULSE: Duration = Duration::from_micros(10);

/// Unit a [`Distance`] is reported in.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DistanceUnit {
    /// Centimeters, rounded to two decimals.
    #[default]
    #[cfg_attr(feature = "serde", serde(rename = "cm"))]
    Centimeters,
    /// Meters, unrounded.
    #[cfg_attr(feature = "serde", serde(rename = "m"))]
    Meters,
}

impl DistanceUnit {
    /// Short symbol used when printing distances.
    pub fn symbol(&self) -> &'static str {
        match self {
            DistanceUnit::Centimeters => "cm",
            DistanceUnit::Meters => "m",
        }
    }
}

impl FromStr for DistanceUnit {
    type Err = MeasureError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "cm" => Ok(DistanceUnit::Centimeters),
            "m" => Ok(DistanceUnit::Meters),
            _ => Err(MeasureError::InvalidConfig("unit must be 'cm' or 'm'")),
        }
    }
}

/// A single distance reading.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Distance {
    value: f64,
    unit: DistanceUnit,
}

impl Distance {
    /// Convert a raw centimeter distance into `unit`.
    ///
    /// Centimeters are rounded to two decimals; meters are a plain ratio.
    /// Negative inputs are clamped to zero.
    pub fn from_centimeters(cm: f64, unit: DistanceUnit) -> Self {
        let cm = cm.max(0.0);
        let value = match unit {
            DistanceUnit::Centimeters => (cm * 100.0).round() / 100.0,
            DistanceUnit::Meters => cm / 100.0,
        };
        Distance { value, unit }
    }

    /// Distance covered by sound in `round_trip`, halved for the return leg.
    pub fn from_echo(round_trip: Duration, unit: DistanceUnit) -> Self {
        let cm = round_trip.as_secs_f64() * SPEED_OF_SOUND_CM_PER_S / 2.0;
        Self::from_centimeters(cm, unit)
    }

    /// Magnitude in [`Distance::unit`].
    pub fn value(&self) -> f64 {
        self.value
    }

    /// Unit of [`Distance::value`].
    pub fn unit(&self) -> DistanceUnit {
        self.unit
    }

    /// Magnitude in centimeters regardless of the reporting unit.
    pub fn as_centimeters(&self) -> f64 {
        match self.unit {
            DistanceUnit::Centimeters => self.value,
            DistanceUnit::Meters => self.value * 100.0,
        }
    }
}

impl fmt::Display for Distance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.unit {
            DistanceUnit::Centimeters => write!(f, "{:.2} cm", self.value),
            DistanceUnit::Meters => write!(f, "{:.4} m", self.value),
        }
    }
}

/// Pin assignment and timing parameters of one sensor.
#[derive(Debug, Clone, PartialEq)]
pub struct SensorConfig {
    /// BCM number of the TRIG pin.
    pub trigger_pin: u8,
    /// BCM number of the ECHO pin.
    pub echo_pin: u8,
    /// Unit readings are reported in.
    pub unit: DistanceUnit,
    /// Maximum time to wait for each edge of the echo pulse.
    pub timeout: Duration,
    /// Time the trigger is held low after setup so the sensor can settle.
    pub settle: Duration,
}

impl SensorConfig {
    /// Configuration for the given pins with default unit and timings.
    pub fn new(trigger_pin: u8, echo_pin: u8) -> Self {
        SensorConfig {
            trigger_pin,
            echo_pin,
            unit: DistanceUnit::Centimeters,
            timeout: Duration::from_secs(1),
            settle: Duration::from_millis(500),
        }
    }

    /// Report readings in `unit`.
    pub fn with_unit(mut self, unit: DistanceUnit) -> Self {
        self.unit = unit;
        self
    }

    /// Wait at most `timeout` for each echo edge.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Hold the trigger low for `settle` after setup.
    pub fn with_settle(mut self, settle: Duration) -> Self {
        self.settle = settle;
        self
    }
}

/// An HC-SR04 style rangefinder on a trigger/echo pin pair.
///
/// The sensor owns its bus. Pins are handed back exactly once, either by an
/// explicit [`UltrasonicSensor::release`] or when the sensor is dropped.
pub struct UltrasonicSensor<B: GpioBus, C: Clock> {
    bus: B,
    clock: C,
    config: SensorConfig,
    released: bool,
}

impl<B: GpioBus, C: Clock> UltrasonicSensor<B, C> {
    /// Configure the pins and let the sensor settle.
    ///
    /// # Errors
    ///
    /// Returns [`MeasureError::InvalidConfig`] if both roles share one pin,
    /// or [`MeasureError::Gpio`] if the bus rejects the setup. If setup fails
    /// part-way the bus is released before returning.
    pub fn new(bus: B, clock: C, config: SensorConfig) -> Result<Self, MeasureError> {
        if config.trigger_pin == config.echo_pin {
            return Err(MeasureError::InvalidConfig(
                "trigger and echo must be different pins",
            ));
        }
        if config.timeout.is_zero() {
            return Err(MeasureError::InvalidConfig("timeout must be positive"));
        }

        let mut sensor = UltrasonicSensor {
            bus,
            clock,
            config,
            released: false,
        };
        sensor.setup()?;
        info!(
            trigger = sensor.config.trigger_pin,
            echo = sensor.config.echo_pin,
            unit = sensor.config.unit.symbol(),
            "Ultrasonic sensor initialized"
        );
        Ok(sensor)
    }

    fn setup(&mut self) -> Result<(), MeasureError> {
        let SensorConfig {
            trigger_pin,
            echo_pin,
            settle,
            ..
        } = self.config;
        self.bus.set_mode(trigger_pin, PinMode::Output)?;
        self.bus.set_mode(echo_pin, PinMode::Input)?;
        self.bus.write(trigger_pin, Level::Low)?;
        self.clock.pause(settle);
        Ok(())
    }

    /// The configuration this sensor was built with.
    pub fn config(&self) -> &SensorConfig {
        &self.config
    }

    /// Whether [`UltrasonicSensor::release`] has already run.
    pub fn is_released(&self) -> bool {
        self.released
    }

    /// Take one measurement.
    ///
    /// # Errors
    ///
    /// [`MeasureError::EchoStartTimeout`] or [`MeasureError::EchoEndTimeout`]
    /// when an echo edge does not arrive in time, [`MeasureError::Gpio`] when
    /// the bus fails mid-measurement.
    pub fn measure(&mut self) -> Result<Distance, MeasureError> {
        if self.released {
            return Err(MeasureError::InvalidConfig("sensor pins were released"));
        }
        let round_trip = self.time_echo()?;
        let distance = Distance::from_echo(round_trip, self.config.unit);
        debug!(?round_trip, %distance, "Echo timed");
        Ok(distance)
    }

    /// Take one measurement, logging and discarding any failure.
    pub fn read_distance(&mut self) -> Option<Distance> {
        match self.measure() {
            Ok(distance) => Some(distance),
            Err(e) if e.is_timeout() => {
                warn!("Sensor error: {}", e);
                None
            }
            Err(e) => {
                warn!("Unexpected sensor failure: {}", e);
                None
            }
        }
    }

    /// Width of the echo pulse following one trigger pulse.
    fn time_echo(&mut self) -> Result<Duration, MeasureError> {
        let SensorConfig {
            trigger_pin,
            echo_pin,
            timeout,
            ..
        } = self.config;

        self.bus.write(trigger_pin, Level::High)?;
        self.clock.pause(TRIGGER_PULSE);
        self.bus.write(trigger_pin, Level::Low)?;

        // Start is the last instant the line was still low.
        let wait_start = self.clock.now();
        let mut pulse_start = wait_start;
        while self.bus.read(echo_pin)? == Level::Low {
            pulse_start = self.clock.now();
            if pulse_start.saturating_sub(wait_start) > timeout {
                return Err(MeasureError::EchoStartTimeout(timeout));
            }
        }

        // End is the last instant the line was still high.
        let wait_start = self.clock.now();
        let mut pulse_end = wait_start;
        while self.bus.read(echo_pin)? == Level::High {
            pulse_end = self.clock.now();
            if pulse_end.saturating_sub(wait_start) > timeout {
                return Err(MeasureError::EchoEndTimeout(timeout));
            }
        }

        Ok(pulse_end.saturating_sub(pulse_start))
    }

    /// Hand the pins back to the bus. Safe to call more than once.
    pub fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        info!(
            trigger = self.config.trigger_pin,
            echo = self.config.echo_pin,
            "Cleaning up GPIO for sensor"
        );
        self.bus.release();
    }
}

impl<B: GpioBus, C: Clock> Drop for UltrasonicSensor<B, C> {
    fn drop(&mut self) {
        self.release();
    }
}
