//! Error types for the MIDI output library.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MidiError {
    #[error("No MIDI output ports found")]
    NoPorts,

    #[error("Invalid port index {index} ({available} ports available)")]
    IndexOutOfRange { index: usize, available: usize },

    #[error("No MIDI port found with a name containing '{0}'")]
    NoNameMatch(String),

    #[error("No MIDI port was chosen")]
    PromptDeclined,

    #[error("Invalid {what}: {value} (expected {min}..={max})")]
    InvalidParameter {
        what: &'static str,
        value: i32,
        min: i32,
        max: i32,
    },

    #[error("MIDI message is empty")]
    EmptyMessage,

    #[error("MIDI port is not open")]
    NotReady,

    #[error("MIDI transport error: {0}")]
    Transport(String),
}

impl MidiError {
    /// True for the failures that leave a sender without a usable port.
    pub fn is_port_unavailable(&self) -> bool {
        matches!(
            self,
            MidiError::NoPorts
                | MidiError::IndexOutOfRange { .. }
                | MidiError::NoNameMatch(_)
                | MidiError::PromptDeclined
        )
    }
}

#[cfg(feature = "midir")]
impl From<midir::InitError> for MidiError {
    fn from(e: midir::InitError) -> Self {
        MidiError::Transport(e.to_string())
    }
}

#[cfg(feature = "midir")]
impl From<midir::PortInfoError> for MidiError {
    fn from(e: midir::PortInfoError) -> Self {
        MidiError::Transport(e.to_string())
    }
}

#[cfg(feature = "midir")]
impl From<midir::SendError> for MidiError {
    fn from(e: midir::SendError) -> Self {
        MidiError::Transport(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, MidiError>;
