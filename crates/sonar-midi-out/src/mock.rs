//! Recording transport for exercising the sender without MIDI hardware.

use std::sync::{Arc, Mutex};

use crate::error::{MidiError, Result};
use crate::transport::MidiTransport;

/// What a [`RecordingTransport`] was asked to do.
#[derive(Debug, Default)]
pub struct TransportLog {
    /// Every message handed to [`MidiTransport::send`], in order.
    pub sent: Vec<Vec<u8>>,
    /// Port indices passed to [`MidiTransport::open`].
    pub opened: Vec<usize>,
    /// Number of [`MidiTransport::close`] calls that closed a port.
    pub closes: usize,
    /// Number of [`MidiTransport::port_names`] calls.
    pub enumerations: usize,
}

/// In-memory [`MidiTransport`] with a fixed port list.
#[derive(Debug)]
pub struct RecordingTransport {
    ports: Vec<String>,
    open: Option<usize>,
    fail_open: bool,
    fail_send: bool,
    log: Arc<Mutex<TransportLog>>,
}

impl RecordingTransport {
    pub fn new<S: Into<String>>(ports: impl IntoIterator<Item = S>) -> Self {
        Self {
            ports: ports.into_iter().map(Into::into).collect(),
            open: None,
            fail_open: false,
            fail_send: false,
            log: Arc::new(Mutex::new(TransportLog::default())),
        }
    }

    /// Make [`MidiTransport::open`] fail as a driver error would.
    pub fn failing_open(mut self) -> Self {
        self.fail_open = true;
        self
    }

    /// Make [`MidiTransport::send`] fail as a driver error would.
    pub fn failing_send(mut self) -> Self {
        self.fail_send = true;
        self
    }

    /// Handle onto the log; stays valid after the transport is moved.
    pub fn log(&self) -> Arc<Mutex<TransportLog>> {
        Arc::clone(&self.log)
    }
}

impl MidiTransport for RecordingTransport {
    fn port_names(&mut self) -> Result<Vec<String>> {
        self.log.lock().unwrap().enumerations += 1;
        Ok(self.ports.clone())
    }

    fn open(&mut self, index: usize) -> Result<()> {
        if index >= self.ports.len() {
            return Err(MidiError::IndexOutOfRange {
                index,
                available: self.ports.len(),
            });
        }
        if self.fail_open {
            return Err(MidiError::Transport("simulated open failure".to_string()));
        }
        self.log.lock().unwrap().opened.push(index);
        self.open = Some(index);
        Ok(())
    }

    fn send(&mut self, bytes: &[u8]) -> Result<()> {
        if self.open.is_none() {
            return Err(MidiError::NotReady);
        }
        if self.fail_send {
            return Err(MidiError::Transport("simulated send failure".to_string()));
        }
        self.log.lock().unwrap().sent.push(bytes.to_vec());
        Ok(())
    }

    fn close(&mut self) {
        if self.open.take().is_some() {
            self.log.lock().unwrap().closes += 1;
        }
    }

    fn is_open(&self) -> bool {
        self.open.is_some()
    }
}
