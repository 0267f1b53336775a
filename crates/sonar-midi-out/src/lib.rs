//! Validated MIDI channel-voice output to a single local port.
//!
//! [`MidiMessage`] encodes note on/off, control change, program change and
//! pitch bend messages; [`MidiSender`] owns one open port behind a
//! [`MidiTransport`] and reports every send as a plain success flag.

pub mod error;
pub mod message;
#[cfg(any(test, feature = "mock"))]
pub mod mock;
#[cfg(feature = "midir")]
pub mod hardware;
pub mod sender;
pub mod transport;

pub use error::{MidiError, Result};
pub use message::MidiMessage;
pub use sender::{resolve_port, MidiSender, PortSelection};
pub use transport::MidiTransport;

#[cfg(feature = "midir")]
pub use hardware::MidirTransport;
