//! A MIDI sender bound to a single output port.
//!
//! Sends never fail loudly: a closed port, an out-of-range argument or a
//! transport error is logged and reported as `false`, and the caller moves on.

use tracing::{debug, info, trace, warn};

use crate::error::{MidiError, Result};
use crate::message::MidiMessage;
use crate::transport::MidiTransport;

/// How [`MidiSender::open`] picks its port.
pub enum PortSelection<'a> {
    /// Port at this index of the enumerated list.
    Index(usize),
    /// First port whose name contains this text, ignoring case.
    Name(String),
    /// Ask a collaborator, typically an interactive prompt, given the port names.
    Prompt(&'a mut dyn FnMut(&[String]) -> Option<usize>),
}

/// Resolve `selection` against the enumerated `names`.
pub fn resolve_port(names: &[String], selection: PortSelection<'_>) -> Result<usize> {
    if names.is_empty() {
        return Err(MidiError::NoPorts);
    }
    let index = match selection {
        PortSelection::Index(index) => index,
        PortSelection::Name(wanted) => {
            let wanted = wanted.to_lowercase();
            return names
                .iter()
                .position(|name| name.to_lowercase().contains(&wanted))
                .ok_or(MidiError::NoNameMatch(wanted));
        }
        PortSelection::Prompt(prompt) => prompt(names).ok_or(MidiError::PromptDeclined)?,
    };
    if index < names.len() {
        Ok(index)
    } else {
        Err(MidiError::IndexOutOfRange {
            index,
            available: names.len(),
        })
    }
}

#[derive(Debug, Clone)]
struct OpenPort {
    index: usize,
    name: String,
}

/// Typed channel-voice sender over one [`MidiTransport`].
///
/// The port is closed exactly once: by [`MidiSender::close`] or on drop.
pub struct MidiSender<T: MidiTransport> {
    transport: T,
    port: Option<OpenPort>,
}

impl<T: MidiTransport> MidiSender<T> {
    /// Enumerate ports once, resolve `selection` and open it.
    ///
    /// Never fails: if no port can be opened the reason is logged and the
    /// returned sender is not ready, so every send on it returns `false`.
    pub fn open(transport: T, selection: PortSelection<'_>) -> Self {
        let mut sender = Self {
            transport,
            port: None,
        };
        if let Err(e) = sender.connect(selection) {
            warn!("MIDI sender not ready: {}", e);
        }
        sender
    }

    /// Like [`MidiSender::open`] but returns the reason a port could not be opened.
    pub fn try_open(transport: T, selection: PortSelection<'_>) -> Result<Self> {
        let mut sender = Self {
            transport,
            port: None,
        };
        sender.connect(selection)?;
        Ok(sender)
    }

    fn connect(&mut self, selection: PortSelection<'_>) -> Result<()> {
        let names = self.transport.port_names()?;
        let index = match resolve_port(&names, selection) {
            Ok(index) => index,
            Err(e) => {
                if !names.is_empty() {
                    info!("Available MIDI output ports:");
                    for (i, name) in names.iter().enumerate() {
                        info!("  [{}]: {}", i, name);
                    }
                }
                return Err(e);
            }
        };

        self.transport.open(index)?;
        let name = names[index].clone();
        info!("MIDI sender connected to port: {} (index {})", name, index);
        self.port = Some(OpenPort { index, name });
        Ok(())
    }

    /// True iff a port was opened and is still open.
    pub fn is_ready(&self) -> bool {
        self.port.is_some() && self.transport.is_open()
    }

    /// Name of the opened port.
    pub fn port_name(&self) -> Option<&str> {
        self.port.as_ref().map(|port| port.name.as_str())
    }

    /// Index of the opened port in the enumeration made at construction.
    pub fn port_index(&self) -> Option<usize> {
        self.port.as_ref().map(|port| port.index)
    }

    /// Send an already encoded message.
    pub fn send(&mut self, message: &MidiMessage) -> bool {
        self.dispatch(Ok(message.clone()))
    }

    pub fn note_on(&mut self, channel: u8, note: u8, velocity: u8) -> bool {
        self.dispatch(MidiMessage::note_on(channel, note, velocity))
    }

    pub fn note_off(&mut self, channel: u8, note: u8, velocity: u8) -> bool {
        self.dispatch(MidiMessage::note_off(channel, note, velocity))
    }

    /// Note off with velocity 0.
    pub fn release_note(&mut self, channel: u8, note: u8) -> bool {
        self.note_off(channel, note, 0)
    }

    pub fn control_change(&mut self, channel: u8, controller: u8, value: u8) -> bool {
        self.dispatch(MidiMessage::control_change(channel, controller, value))
    }

    pub fn program_change(&mut self, channel: u8, program: u8) -> bool {
        self.dispatch(MidiMessage::program_change(channel, program))
    }

    pub fn pitch_bend(&mut self, channel: u8, bend: i16) -> bool {
        self.dispatch(MidiMessage::pitch_bend(channel, bend))
    }

    pub fn all_notes_off(&mut self, channel: u8) -> bool {
        self.dispatch(MidiMessage::all_notes_off(channel))
    }

    pub fn raw_message(&mut self, bytes: &[u8]) -> bool {
        self.dispatch(MidiMessage::raw(bytes))
    }

    fn dispatch(&mut self, message: Result<MidiMessage>) -> bool {
        if !self.is_ready() {
            warn!("MIDI port is not open");
            return false;
        }
        let message = match message {
            Ok(message) => message,
            Err(e) => {
                warn!("Rejected MIDI message: {}", e);
                return false;
            }
        };
        match self.transport.send(message.as_bytes()) {
            Ok(()) => {
                trace!(%message, "Sent");
                true
            }
            Err(e) => {
                warn!("Error sending MIDI message {}: {}", message, e);
                false
            }
        }
    }

    /// Close the port if it is open. Safe to call more than once.
    pub fn close(&mut self) {
        let Some(port) = self.port.take() else {
            return;
        };
        if self.transport.is_open() {
            self.transport.close();
            info!("MIDI port {} closed", port.name);
        } else {
            debug!("MIDI port {} was already closed", port.name);
        }
    }
}

impl<T: MidiTransport> Drop for MidiSender<T> {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::RecordingTransport;

    fn ports() -> RecordingTransport {
        RecordingTransport::new(["Midi Through Port-0", "UM-ONE MIDI 1", "Midi Gadget"])
    }

    #[test]
    fn test_open_by_index() {
        let sender = MidiSender::open(ports(), PortSelection::Index(1));
        assert!(sender.is_ready());
        assert_eq!(sender.port_index(), Some(1));
        assert_eq!(sender.port_name(), Some("UM-ONE MIDI 1"));
    }

    #[test]
    fn test_open_by_name_is_case_insensitive_first_match() {
        let sender = MidiSender::open(ports(), PortSelection::Name("midi".into()));
        assert_eq!(sender.port_index(), Some(0));

        let sender = MidiSender::open(ports(), PortSelection::Name("GADGET".into()));
        assert_eq!(sender.port_name(), Some("Midi Gadget"));
    }

    #[test]
    fn test_open_with_prompt() {
        let mut seen = Vec::new();
        let mut prompt = |names: &[String]| {
            seen = names.to_vec();
            Some(2)
        };
        let sender = MidiSender::open(ports(), PortSelection::Prompt(&mut prompt));
        assert_eq!(sender.port_index(), Some(2));
        assert_eq!(seen.len(), 3);
    }

    #[test]
    fn test_port_unavailable_reasons() {
        let empty = RecordingTransport::new(Vec::<String>::new());
        assert!(matches!(
            MidiSender::try_open(empty, PortSelection::Index(0)),
            Err(MidiError::NoPorts)
        ));
        assert!(matches!(
            MidiSender::try_open(ports(), PortSelection::Index(3)),
            Err(MidiError::IndexOutOfRange { index: 3, available: 3 })
        ));
        assert!(matches!(
            MidiSender::try_open(ports(), PortSelection::Name("IAC Driver".into())),
            Err(MidiError::NoNameMatch(_))
        ));
        let mut decline = |_: &[String]| -> Option<usize> { None };
        let err = MidiSender::try_open(ports(), PortSelection::Prompt(&mut decline))
            .err()
            .unwrap();
        assert_eq!(err, MidiError::PromptDeclined);
        assert!(err.is_port_unavailable());
    }

    #[test]
    fn test_index_out_of_range_sender_sends_nothing() {
        let transport = ports();
        let log = transport.log();
        let mut sender = MidiSender::open(transport, PortSelection::Index(7));

        assert!(!sender.is_ready());
        assert!(!sender.note_on(0, 60, 100));
        assert!(!sender.note_off(0, 60, 0));
        assert!(!sender.control_change(0, 7, 100));
        assert!(!sender.program_change(0, 1));
        assert!(!sender.pitch_bend(0, 0));
        assert!(!sender.raw_message(&[0xFE]));

        let log = log.lock().unwrap();
        assert!(log.opened.is_empty());
        assert!(log.sent.is_empty());
    }

    #[test]
    fn test_transport_open_failure_leaves_sender_not_ready() {
        let sender = MidiSender::open(ports().failing_open(), PortSelection::Index(0));
        assert!(!sender.is_ready());
        assert_eq!(sender.port_name(), None);
    }

    #[test]
    fn test_sends_reach_transport_in_order() {
        let transport = ports();
        let log = transport.log();
        let mut sender = MidiSender::open(transport, PortSelection::Index(0));

        assert!(sender.note_on(0, 60, 100));
        assert!(sender.release_note(0, 60));
        assert!(sender.control_change(1, 1, 64));
        assert!(sender.program_change(0, 25));
        assert!(sender.pitch_bend(0, -8192));
        assert!(sender.all_notes_off(0));
        assert!(sender.raw_message(&[0xF8]));

        let log = log.lock().unwrap();
        assert_eq!(
            log.sent,
            vec![
                vec![0x90, 60, 100],
                vec![0x80, 60, 0],
                vec![0xB1, 1, 64],
                vec![0xC0, 25],
                vec![0xE0, 0, 0],
                vec![0xB0, 123, 0],
                vec![0xF8],
            ]
        );
    }

    #[test]
    fn test_invalid_parameters_never_reach_transport() {
        let transport = ports();
        let log = transport.log();
        let mut sender = MidiSender::open(transport, PortSelection::Index(0));

        assert!(!sender.note_on(16, 60, 100));
        assert!(!sender.note_on(0, 128, 100));
        assert!(!sender.note_off(0, 60, 128));
        assert!(!sender.control_change(0, 200, 0));
        assert!(!sender.program_change(0, 255));
        assert!(!sender.pitch_bend(0, 8192));
        assert!(!sender.raw_message(&[]));

        assert!(log.lock().unwrap().sent.is_empty());
        assert!(sender.is_ready());
    }

    #[test]
    fn test_transport_failure_is_reported_as_false() {
        let mut sender = MidiSender::open(ports().failing_send(), PortSelection::Index(0));
        assert!(sender.is_ready());
        assert!(!sender.note_on(0, 60, 100));
    }

    #[test]
    fn test_close_is_idempotent_and_runs_on_drop() {
        let transport = ports();
        let log = transport.log();
        let mut sender = MidiSender::open(transport, PortSelection::Index(0));

        sender.close();
        sender.close();
        assert!(!sender.is_ready());
        assert!(!sender.note_on(0, 60, 100));
        drop(sender);

        assert_eq!(log.lock().unwrap().closes, 1);
    }

    #[test]
    fn test_drop_closes_port() {
        let transport = ports();
        let log = transport.log();
        {
            let _sender = MidiSender::open(transport, PortSelection::Index(2));
        }
        assert_eq!(log.lock().unwrap().closes, 1);
    }

    #[test]
    fn test_ports_enumerated_once() {
        let transport = ports();
        let log = transport.log();
        let _sender = MidiSender::open(transport, PortSelection::Name("gadget".into()));
        assert_eq!(log.lock().unwrap().enumerations, 1);
    }
}
