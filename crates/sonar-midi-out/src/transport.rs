//! The boundary between the sender and a concrete MIDI output backend.

use crate::error::Result;

/// Capability to enumerate, open, write to and close one MIDI output port.
///
/// Implementations report their own failures as
/// [`MidiError::Transport`](crate::MidiError::Transport); the sender turns
/// those into a failed send instead of propagating them.
pub trait MidiTransport {
    /// Names of the output ports currently available, in index order.
    fn port_names(&mut self) -> Result<Vec<String>>;

    /// Connect to the port at `index` of [`MidiTransport::port_names`].
    fn open(&mut self, index: usize) -> Result<()>;

    /// Write one complete message to the open port.
    fn send(&mut self, bytes: &[u8]) -> Result<()>;

    /// Disconnect from the open port, if any.
    fn close(&mut self);

    /// Whether a port is currently connected.
    fn is_open(&self) -> bool;
}
