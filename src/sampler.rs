//! The sampling loop: distance in, MIDI out.

use sonar_midi_out::{MidiSender, MidiTransport};
use sonar_ranging::{Clock, Distance, GpioBus, UltrasonicSensor};
use spin_sleep::SpinSleeper;
use std::{
    sync::atomic::{AtomicBool, Ordering},
    time::{Duration, Instant},
};
use tracing::{debug, info, warn};

use crate::blackboard::{self, Blackboard};
use crate::mapping::DistanceMapping;
use crate::settings::{EventKind, MidiSettings, Settings};

/// Longest single sleep between checks of the stop flag.
const STOP_POLL: Duration = Duration::from_millis(50);

/// Outcome of one sampling cycle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Cycle {
    NoReading,
    OutOfRange(Distance),
    Sent { distance: Distance, value: u8 },
    SendFailed { distance: Distance, value: u8 },
}

pub struct Sampler {
    midi: MidiSettings,
    mapping: DistanceMapping,
    interval: Duration,
    sounding: Option<u8>,
}

impl Sampler {
    pub fn new(settings: &Settings) -> Self {
        Sampler {
            midi: settings.midi.clone(),
            mapping: settings.mapping,
            interval: settings.sampler.interval(),
            sounding: None,
        }
    }

    /// Read once, map, and emit the configured event if the reading is usable.
    pub fn sample_once<B, C, T>(
        &mut self,
        sensor: &mut UltrasonicSensor<B, C>,
        sender: &mut MidiSender<T>,
        bb: &Blackboard,
    ) -> Cycle
    where
        B: GpioBus,
        C: Clock,
        T: MidiTransport,
    {
        let reading = sensor.read_distance();
        blackboard::record_reading(bb, reading);
        let Some(distance) = reading else {
            return Cycle::NoReading;
        };

        let value = self.mapping.map_distance(&distance);
        blackboard::record_value(bb, value);
        let Some(value) = value else {
            debug!(%distance, "Distance outside mapping window");
            return Cycle::OutOfRange(distance);
        };

        let sent = self.emit(sender, value);
        blackboard::record_send(bb, sent);
        if sent {
            info!(%distance, value, "Sent");
            Cycle::Sent { distance, value }
        } else {
            Cycle::SendFailed { distance, value }
        }
    }

    fn emit<T: MidiTransport>(&mut self, sender: &mut MidiSender<T>, value: u8) -> bool {
        let channel = self.midi.channel;
        match self.midi.event {
            EventKind::NoteOn => {
                if self.midi.release_previous {
                    if let Some(previous) = self.sounding.take() {
                        sender.release_note(channel, previous);
                    }
                }
                let sent = sender.note_on(channel, value, self.midi.velocity);
                if sent {
                    self.sounding = Some(value);
                }
                sent
            }
            EventKind::ControlChange => sender.control_change(channel, self.midi.controller, value),
        }
    }

    /// Silence the channel before the port goes away.
    pub fn finish<T: MidiTransport>(&mut self, sender: &mut MidiSender<T>) {
        self.sounding = None;
        if sender.is_ready() && !sender.all_notes_off(self.midi.channel) {
            warn!("Could not send all-notes-off on channel {}", self.midi.channel);
        }
    }
}

/// Sample until `stop` is set, then silence the channel.
///
/// Returns the number of completed cycles.
pub fn run<B, C, T>(
    sensor: &mut UltrasonicSensor<B, C>,
    sender: &mut MidiSender<T>,
    settings: &Settings,
    stop: &AtomicBool,
    bb: &Blackboard,
) -> u64
where
    B: GpioBus,
    C: Clock,
    T: MidiTransport,
{
    let mut sampler = Sampler::new(settings);
    let sleeper = SpinSleeper::default();

    if !sender.is_ready() {
        warn!("MIDI output unavailable; readings will be logged but not sent");
        blackboard::raise_fault(bb, "MIDI port unavailable");
    }
    info!(interval = ?sampler.interval, "Sampling started");

    let mut cycles = 0;
    while !stop.load(Ordering::Relaxed) {
        sampler.sample_once(sensor, sender, bb);
        cycles += 1;
        pause(&sleeper, sampler.interval, stop);
    }

    sampler.finish(sender);
    info!(cycles, "Sampling stopped");
    cycles
}

/// Sleep for `interval`, waking early once `stop` is set.
fn pause(sleeper: &SpinSleeper, interval: Duration, stop: &AtomicBool) {
    let deadline = Instant::now() + interval;
    loop {
        if stop.load(Ordering::Relaxed) {
            return;
        }
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return;
        }
        sleeper.sleep(remaining.min(STOP_POLL));
    }
}
