//! Channel-voice message encoding.
//!
//! Every constructor validates its arguments before any bytes are produced,
//! so an invalid call can never reach a transport.

use core::fmt;

use crate::error::{MidiError, Result};

pub const NOTE_OFF: u8 = 0x80;
pub const NOTE_ON: u8 = 0x90;
pub const CONTROL_CHANGE: u8 = 0xB0;
pub const PROGRAM_CHANGE: u8 = 0xC0;
pub const PITCH_BEND: u8 = 0xE0;

/// Controller number of the "All Notes Off" channel-mode message.
pub const ALL_NOTES_OFF_CC: u8 = 123;

pub const PITCH_BEND_MIN: i16 = -8192;
pub const PITCH_BEND_MAX: i16 = 8191;
/// Offset between the signed bend value and the transmitted 14-bit value.
pub const PITCH_BEND_CENTER: u16 = 8192;

/// One encoded MIDI message, ready for a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MidiMessage {
    bytes: Vec<u8>,
}

fn check(what: &'static str, value: i32, min: i32, max: i32) -> Result<()> {
    if (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(MidiError::InvalidParameter {
            what,
            value,
            min,
            max,
        })
    }
}

fn check_channel(channel: u8) -> Result<()> {
    check("channel", channel as i32, 0, 15)
}

fn check_data(what: &'static str, value: u8) -> Result<()> {
    check(what, value as i32, 0, 127)
}

impl MidiMessage {
    fn channel_voice(status: u8, channel: u8, data: &[u8]) -> Self {
        let mut bytes = Vec::with_capacity(1 + data.len());
        bytes.push(status | channel);
        bytes.extend_from_slice(data);
        Self { bytes }
    }

    pub fn note_on(channel: u8, note: u8, velocity: u8) -> Result<Self> {
        check_channel(channel)?;
        check_data("note", note)?;
        check_data("velocity", velocity)?;
        Ok(Self::channel_voice(NOTE_ON, channel, &[note, velocity]))
    }

    /// A velocity of 0 is the conventional "released" value.
    pub fn note_off(channel: u8, note: u8, velocity: u8) -> Result<Self> {
        check_channel(channel)?;
        check_data("note", note)?;
        check_data("velocity", velocity)?;
        Ok(Self::channel_voice(NOTE_OFF, channel, &[note, velocity]))
    }

    pub fn control_change(channel: u8, controller: u8, value: u8) -> Result<Self> {
        check_channel(channel)?;
        check_data("controller", controller)?;
        check_data("value", value)?;
        Ok(Self::channel_voice(CONTROL_CHANGE, channel, &[controller, value]))
    }

    pub fn program_change(channel: u8, program: u8) -> Result<Self> {
        check_channel(channel)?;
        check_data("program", program)?;
        Ok(Self::channel_voice(PROGRAM_CHANGE, channel, &[program]))
    }

    /// `bend`: signed 14-bit (-8192 to 8191), 0 is centered.
    pub fn pitch_bend(channel: u8, bend: i16) -> Result<Self> {
        check_channel(channel)?;
        check(
            "pitch bend",
            bend as i32,
            PITCH_BEND_MIN as i32,
            PITCH_BEND_MAX as i32,
        )?;
        let value = (bend as i32 + PITCH_BEND_CENTER as i32) as u16;
        let lsb = (value & 0x7F) as u8;
        let msb = ((value >> 7) & 0x7F) as u8;
        Ok(Self::channel_voice(PITCH_BEND, channel, &[lsb, msb]))
    }

    pub fn all_notes_off(channel: u8) -> Result<Self> {
        Self::control_change(channel, ALL_NOTES_OFF_CC, 0)
    }

    /// Unchecked pass-through. Any byte value is accepted; only an empty
    /// message is rejected.
    pub fn raw(bytes: &[u8]) -> Result<Self> {
        if bytes.is_empty() {
            return Err(MidiError::EmptyMessage);
        }
        Ok(Self {
            bytes: bytes.to_vec(),
        })
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn status(&self) -> u8 {
        self.bytes[0]
    }

    /// Low nibble of the status byte, for channel-voice messages.
    pub fn channel(&self) -> Option<u8> {
        (0x80..0xF0)
            .contains(&self.status())
            .then_some(self.status() & 0x0F)
    }
}

impl AsRef<[u8]> for MidiMessage {
    fn as_ref(&self) -> &[u8] {
        &self.bytes
    }
}

impl fmt::Display for MidiMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, byte) in self.bytes.iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            write!(f, "{:02X}", byte)?;
        }
        write!(f, "]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode_bend(bytes: &[u8]) -> i32 {
        (((bytes[2] as i32) << 7) | bytes[1] as i32) - PITCH_BEND_CENTER as i32
    }

    #[test]
    fn test_note_on_bytes() {
        let msg = MidiMessage::note_on(0, 60, 100).unwrap();
        assert_eq!(msg.as_bytes(), &[0x90, 60, 100]);
        assert_eq!(msg.channel(), Some(0));
    }

    #[test]
    fn test_note_off_bytes() {
        let msg = MidiMessage::note_off(9, 38, 0).unwrap();
        assert_eq!(msg.as_bytes(), &[0x89, 38, 0]);
    }

    #[test]
    fn test_program_change_is_two_bytes() {
        let msg = MidiMessage::program_change(0, 25).unwrap();
        assert_eq!(msg.as_bytes(), &[0xC0, 25]);
    }

    #[test]
    fn test_control_change_nibbles_for_all_valid_inputs() {
        for channel in 0..=15u8 {
            for controller in 0..=127u8 {
                for value in 0..=127u8 {
                    let msg = MidiMessage::control_change(channel, controller, value).unwrap();
                    let bytes = msg.as_bytes();
                    assert_eq!(bytes.len(), 3);
                    assert_eq!(bytes[0] >> 4, 0xB);
                    assert_eq!(bytes[0] & 0x0F, channel);
                    assert_eq!(bytes[1], controller);
                    assert_eq!(bytes[2], value);
                }
            }
        }
    }

    #[test]
    fn test_pitch_bend_decodes_back_for_full_range() {
        for bend in PITCH_BEND_MIN..=PITCH_BEND_MAX {
            let msg = MidiMessage::pitch_bend(3, bend).unwrap();
            let bytes = msg.as_bytes();
            assert_eq!(bytes[0], 0xE3);
            assert!(bytes[1] <= 0x7F && bytes[2] <= 0x7F);
            assert_eq!(decode_bend(bytes), bend as i32);
        }
    }

    #[test]
    fn test_pitch_bend_center_and_extremes() {
        assert_eq!(MidiMessage::pitch_bend(0, 0).unwrap().as_bytes(), &[0xE0, 0x00, 0x40]);
        assert_eq!(MidiMessage::pitch_bend(0, -8192).unwrap().as_bytes(), &[0xE0, 0x00, 0x00]);
        assert_eq!(MidiMessage::pitch_bend(0, 8191).unwrap().as_bytes(), &[0xE0, 0x7F, 0x7F]);
    }

    #[test]
    fn test_out_of_range_parameters_rejected() {
        assert!(matches!(
            MidiMessage::note_on(16, 60, 100),
            Err(MidiError::InvalidParameter { what: "channel", value: 16, .. })
        ));
        assert!(MidiMessage::note_on(0, 128, 100).is_err());
        assert!(MidiMessage::note_on(0, 60, 200).is_err());
        assert!(MidiMessage::note_off(0, 255, 0).is_err());
        assert!(MidiMessage::control_change(0, 128, 0).is_err());
        assert!(MidiMessage::control_change(0, 1, 128).is_err());
        assert!(MidiMessage::program_change(0, 128).is_err());
        assert!(MidiMessage::pitch_bend(0, 8192).is_err());
        assert!(MidiMessage::pitch_bend(0, -8193).is_err());
        assert!(MidiMessage::pitch_bend(17, 0).is_err());
    }

    #[test]
    fn test_all_notes_off() {
        let msg = MidiMessage::all_notes_off(2).unwrap();
        assert_eq!(msg.as_bytes(), &[0xB2, 123, 0]);
    }

    #[test]
    fn test_raw_passthrough() {
        let msg = MidiMessage::raw(&[0xF0, 0x7E, 0xFF, 0xF7]).unwrap();
        assert_eq!(msg.as_bytes(), &[0xF0, 0x7E, 0xFF, 0xF7]);
        assert_eq!(msg.channel(), None);
        assert_eq!(MidiMessage::raw(&[]), Err(MidiError::EmptyMessage));
    }

    #[test]
    fn test_display_hex() {
        let msg = MidiMessage::note_on(1, 64, 10).unwrap();
        assert_eq!(msg.to_string(), "[91 40 0A]");
    }
}
