//! Raspberry Pi GPIO backend built on `rppal`.

use std::collections::HashMap;

use rppal::gpio::{Gpio, IoPin, Mode};
use tracing::debug;

use crate::error::GpioError;
use crate::gpio::{GpioBus, Level, PinMode};

/// [`GpioBus`] over the Raspberry Pi's GPIO peripheral, BCM numbering.
///
/// Only pins acquired through this bus are touched on [`GpioBus::release`];
/// rppal restores each pin's original mode when its handle is dropped.
pub struct RppalGpio {
    gpio: Gpio,
    pins: HashMap<u8, IoPin>,
}

impl RppalGpio {
    /// Open the GPIO peripheral.
    pub fn new() -> Result<Self, rppal::gpio::Error> {
        Ok(RppalGpio {
            gpio: Gpio::new()?,
            pins: HashMap::new(),
        })
    }

    fn pin_mut(&mut self, pin: u8) -> Result<&mut IoPin, GpioError> {
        self.pins
            .get_mut(&pin)
            .ok_or_else(|| GpioError::new(pin, "pin used before its mode was set"))
    }
}

fn to_rppal_mode(mode: PinMode) -> Mode {
    match mode {
        PinMode::Input => Mode::Input,
        PinMode::Output => Mode::Output,
    }
}

impl GpioBus for RppalGpio {
    fn set_mode(&mut self, pin: u8, mode: PinMode) -> Result<(), GpioError> {
        let mode = to_rppal_mode(mode);
        if let Some(io) = self.pins.get_mut(&pin) {
            io.set_mode(mode);
            return Ok(());
        }
        let io = self
            .gpio
            .get(pin)
            .map_err(|e| GpioError::new(pin, e))?
            .into_io(mode);
        debug!(pin, ?mode, "Acquired GPIO pin");
        self.pins.insert(pin, io);
        Ok(())
    }

    fn write(&mut self, pin: u8, level: Level) -> Result<(), GpioError> {
        let io = self.pin_mut(pin)?;
        match level {
            Level::High => io.set_high(),
            Level::Low => io.set_low(),
        }
        Ok(())
    }

    fn read(&mut self, pin: u8) -> Result<Level, GpioError> {
        let io = self.pin_mut(pin)?;
        Ok(if io.is_high() { Level::High } else { Level::Low })
    }

    fn release(&mut self) {
        let released: Vec<u8> = self.pins.keys().copied().collect();
        self.pins.clear();
        debug!(?released, "Released GPIO pins");
    }
}
