//! In-memory GPIO bus and clock for exercising the sensor without hardware.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::error::GpioError;
use crate::gpio::{Clock, GpioBus, Level, PinMode};

/// Clock that advances by a fixed tick every time it is read.
#[derive(Debug, Clone)]
pub struct MockClock {
    nanos: Arc<AtomicU64>,
    tick: Duration,
}

impl MockClock {
    /// Create a clock at zero that advances `tick` per [`Clock::now`] call.
    pub fn new(tick: Duration) -> Self {
        MockClock {
            nanos: Arc::new(AtomicU64::new(0)),
            tick,
        }
    }

    /// Current time without advancing.
    pub fn peek(&self) -> Duration {
        Duration::from_nanos(self.nanos.load(Ordering::SeqCst))
    }

    fn advance(&self, by: Duration) {
        self.nanos.fetch_add(by.as_nanos() as u64, Ordering::SeqCst);
    }
}

impl Clock for MockClock {
    fn now(&self) -> Duration {
        let now = self.peek();
        self.advance(self.tick);
        now
    }

    fn pause(&mut self, duration: Duration) {
        self.advance(duration);
    }
}

/// How the simulated echo line responds to a trigger pulse.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Echo {
    /// The echo line never rises.
    Silent,
    /// The echo line rises and never falls.
    Stuck,
    /// The echo line rises `delay` after the trigger falls and stays high for `width`.
    Pulse {
        /// Time between the trigger's falling edge and the echo's rising edge.
        delay: Duration,
        /// How long the echo stays high.
        width: Duration,
    },
}

impl Echo {
    /// A pulse whose width corresponds to an object `cm` centimeters away.
    pub fn for_distance_cm(cm: f64) -> Self {
        let seconds = cm * 2.0 / crate::SPEED_OF_SOUND_CM_PER_S;
        Echo::Pulse {
            delay: Duration::from_micros(50),
            width: Duration::from_secs_f64(seconds),
        }
    }
}

/// Everything the mock bus observed, shared with the test through [`MockGpio::log`].
#[derive(Debug, Default)]
pub struct GpioLog {
    /// Mode changes, in call order.
    pub modes: Vec<(u8, PinMode)>,
    /// Output writes, in call order.
    pub writes: Vec<(u8, Level)>,
    /// Number of reads performed.
    pub reads: usize,
    /// Number of times [`GpioBus::release`] was called.
    pub releases: usize,
}

/// [`GpioBus`] that simulates one trigger/echo pair against a [`MockClock`].
#[derive(Debug)]
pub struct MockGpio {
    clock: MockClock,
    trigger_pin: u8,
    echo_pin: u8,
    echo: Echo,
    levels: HashMap<u8, Level>,
    trigger_fell_at: Option<Duration>,
    fail_reads: bool,
    log: Arc<Mutex<GpioLog>>,
}

impl MockGpio {
    /// Create a bus simulating `echo` on `echo_pin` after pulses on `trigger_pin`.
    pub fn new(clock: MockClock, trigger_pin: u8, echo_pin: u8, echo: Echo) -> Self {
        MockGpio {
            clock,
            trigger_pin,
            echo_pin,
            echo,
            levels: HashMap::new(),
            trigger_fell_at: None,
            fail_reads: false,
            log: Arc::new(Mutex::new(GpioLog::default())),
        }
    }

    /// Make every subsequent read fail.
    pub fn failing_reads(mut self) -> Self {
        self.fail_reads = true;
        self
    }

    /// Change the simulated echo for later measurements.
    pub fn set_echo(&mut self, echo: Echo) {
        self.echo = echo;
    }

    /// Handle onto the observation log; stays valid after the bus is moved or dropped.
    pub fn log(&self) -> Arc<Mutex<GpioLog>> {
        Arc::clone(&self.log)
    }

    fn echo_level(&self) -> Level {
        let Some(fell_at) = self.trigger_fell_at else {
            return Level::Low;
        };
        let since = self.clock.peek().saturating_sub(fell_at);
        match self.echo {
            Echo::Silent => Level::Low,
            Echo::Stuck => Level::High,
            Echo::Pulse { delay, width } => {
                if since >= delay && since < delay + width {
                    Level::High
                } else {
                    Level::Low
                }
            }
        }
    }
}

impl GpioBus for MockGpio {
    fn set_mode(&mut self, pin: u8, mode: PinMode) -> Result<(), GpioError> {
        self.log.lock().unwrap().modes.push((pin, mode));
        self.levels.entry(pin).or_insert(Level::Low);
        Ok(())
    }

    fn write(&mut self, pin: u8, level: Level) -> Result<(), GpioError> {
        self.log.lock().unwrap().writes.push((pin, level));
        let previous = self.levels.insert(pin, level);
        if pin == self.trigger_pin && previous == Some(Level::High) && level == Level::Low {
            self.trigger_fell_at = Some(self.clock.peek());
        }
        Ok(())
    }

    fn read(&mut self, pin: u8) -> Result<Level, GpioError> {
        self.log.lock().unwrap().reads += 1;
        if self.fail_reads {
            return Err(GpioError::new(pin, "simulated read failure"));
        }
        if pin == self.echo_pin {
            Ok(self.echo_level())
        } else {
            Ok(self.levels.get(&pin).copied().unwrap_or(Level::Low))
        }
    }

    fn release(&mut self) {
        self.log.lock().unwrap().releases += 1;
        self.levels.clear();
    }
}
