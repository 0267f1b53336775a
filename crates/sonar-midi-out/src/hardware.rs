//! Hardware MIDI output through `midir`.

use midir::{MidiOutput, MidiOutputConnection};
use tracing::debug;

use crate::error::{MidiError, Result};
use crate::transport::MidiTransport;

enum Connection {
    Idle(MidiOutput),
    Open(MidiOutputConnection),
    /// Only observed transiently while switching states.
    Gone,
}

/// [`MidiTransport`] over the platform MIDI API (ALSA, CoreMIDI, WinMM).
pub struct MidirTransport {
    client_name: String,
    state: Connection,
}

impl MidirTransport {
    /// Create a MIDI client named `client_name`. Ports are enumerated on demand.
    pub fn new(client_name: impl Into<String>) -> Result<Self> {
        let client_name = client_name.into();
        let output = MidiOutput::new(&client_name)?;
        Ok(Self {
            client_name,
            state: Connection::Idle(output),
        })
    }
}

impl MidiTransport for MidirTransport {
    fn port_names(&mut self) -> Result<Vec<String>> {
        match &self.state {
            Connection::Idle(output) => output
                .ports()
                .iter()
                .map(|port| output.port_name(port).map_err(MidiError::from))
                .collect(),
            Connection::Open(_) => Err(MidiError::Transport(
                "cannot enumerate ports while connected".to_string(),
            )),
            Connection::Gone => Err(MidiError::Transport("MIDI client unavailable".to_string())),
        }
    }

    fn open(&mut self, index: usize) -> Result<()> {
        let output = match std::mem::replace(&mut self.state, Connection::Gone) {
            Connection::Idle(output) => output,
            other => {
                self.state = other;
                return Err(MidiError::Transport("a port is already open".to_string()));
            }
        };

        let ports = output.ports();
        let Some(port) = ports.get(index) else {
            let available = ports.len();
            self.state = Connection::Idle(output);
            return Err(MidiError::IndexOutOfRange { index, available });
        };

        match output.connect(port, &self.client_name) {
            Ok(connection) => {
                debug!("Connected MIDI output port {}", index);
                self.state = Connection::Open(connection);
                Ok(())
            }
            Err(e) => {
                let message = e.to_string();
                self.state = Connection::Idle(e.into_inner());
                Err(MidiError::Transport(message))
            }
        }
    }

    fn send(&mut self, bytes: &[u8]) -> Result<()> {
        match &mut self.state {
            Connection::Open(connection) => Ok(connection.send(bytes)?),
            _ => Err(MidiError::NotReady),
        }
    }

    fn close(&mut self) {
        if !self.is_open() {
            return;
        }
        if let Connection::Open(connection) =
            std::mem::replace(&mut self.state, Connection::Gone)
        {
            self.state = Connection::Idle(connection.close());
            debug!("Disconnected MIDI output port");
        }
    }

    fn is_open(&self) -> bool {
        matches!(self.state, Connection::Open(_))
    }
}
