/// MIDI wire handling - the 3-byte message parser and the midir-backed
/// input/output devices.
///
/// The input connection is the interrupt-equivalent context: its callback
/// parses raw bytes and feeds captured events straight into the shared
/// sequencer, holding the engine lock only for the single append.
use std::sync::{Arc, Mutex};

use midir::{MidiInput, MidiInputConnection, MidiOutput, MidiOutputConnection};
use thiserror::Error;

use crate::sequencer::{Command, Event, Sequencer};

/// Redundant passes for the all-notes-off sweep; MIDI has no delivery
/// acknowledgment.
const ALL_NOTES_OFF_PASSES: usize = 3;

#[derive(Debug, Error)]
pub enum MidiError {
    #[error("failed to open MIDI backend: {0}")]
    Init(String),
    #[error("MIDI port index out of range")]
    UnknownPort,
    #[error("failed to connect to MIDI port: {0}")]
    Connect(String),
    #[error("failed to send MIDI message: {0}")]
    Send(String),
}

/// Incremental parser for 3-byte note messages (status, note, velocity).
///
/// Only the NoteOn/NoteOff status families are accepted; running status and
/// variable-length messages are not supported. Any malformed byte discards
/// the partially-built message, and a new status byte re-syncs the stream.
#[derive(Debug, Default)]
pub struct MidiParser {
    command: Option<Command>,
    note: Option<u8>,
}

impl MidiParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one byte; returns a complete event when the third valid byte
    /// of a note message arrives.
    pub fn feed(&mut self, byte: u8) -> Option<Event> {
        if byte & 0x80 != 0 {
            // Status byte: starts a message or aborts a partial one.
            self.note = None;
            self.command = match byte & 0xF0 {
                0x90 => Some(Command::NoteOn),
                0x80 => Some(Command::NoteOff),
                _ => {
                    log::debug!("ignoring unsupported status byte {:#04x}", byte);
                    None
                }
            };
            return None;
        }

        // 7-bit data byte.
        let command = self.command?;
        match self.note {
            None => {
                self.note = Some(byte);
                None
            }
            Some(note) => {
                self.command = None;
                self.note = None;
                Some(Event::new(command, note, byte))
            }
        }
    }
}

/// MIDI input using midir; parsed note events go to the capture path.
pub struct MidiInputDevice {
    connection: Option<MidiInputConnection<()>>,
}

impl MidiInputDevice {
    pub fn new() -> Self {
        Self { connection: None }
    }

    pub fn available_ports() -> Vec<String> {
        if let Ok(midi_in) = MidiInput::new("Steploop MIDI Input") {
            midi_in
                .ports()
                .iter()
                .filter_map(|p| midi_in.port_name(p).ok())
                .collect()
        } else {
            vec![]
        }
    }

    /// Connect a port and route its bytes into the sequencer's capture
    /// path. The callback runs on midir's receive thread.
    pub fn connect(
        &mut self,
        port_index: usize,
        sequencer: Arc<Mutex<Sequencer>>,
    ) -> Result<(), MidiError> {
        let midi_in =
            MidiInput::new("Steploop MIDI Input").map_err(|e| MidiError::Init(e.to_string()))?;

        let ports = midi_in.ports();
        let port = ports.get(port_index).ok_or(MidiError::UnknownPort)?;

        let mut parser = MidiParser::new();
        let connection = midi_in
            .connect(
                port,
                "steploop-in",
                move |_timestamp, bytes, _| {
                    for &byte in bytes {
                        if let Some(event) = parser.feed(byte) {
                            sequencer.lock().unwrap().capture(event);
                        }
                    }
                },
                (),
            )
            .map_err(|e| MidiError::Connect(e.to_string()))?;

        log::info!("MIDI input connected to port {}", port_index);
        self.connection = Some(connection);
        Ok(())
    }

    pub fn is_connected(&self) -> bool {
        self.connection.is_some()
    }

    pub fn disconnect(&mut self) {
        self.connection = None;
    }
}

impl Default for MidiInputDevice {
    fn default() -> Self {
        Self::new()
    }
}

/// MIDI output using midir.
pub struct MidiOutputDevice {
    connection: Option<MidiOutputConnection>,
}

impl MidiOutputDevice {
    pub fn new() -> Self {
        Self { connection: None }
    }

    pub fn available_ports() -> Vec<String> {
        if let Ok(midi_out) = MidiOutput::new("Steploop MIDI Output") {
            midi_out
                .ports()
                .iter()
                .filter_map(|p| midi_out.port_name(p).ok())
                .collect()
        } else {
            vec![]
        }
    }

    pub fn connect(&mut self, port_index: usize) -> Result<(), MidiError> {
        let midi_out =
            MidiOutput::new("Steploop MIDI Output").map_err(|e| MidiError::Init(e.to_string()))?;

        let ports = midi_out.ports();
        let port = ports.get(port_index).ok_or(MidiError::UnknownPort)?;

        let connection = midi_out
            .connect(port, "steploop-out")
            .map_err(|e| MidiError::Connect(e.to_string()))?;

        log::info!("MIDI output connected to port {}", port_index);
        self.connection = Some(connection);
        Ok(())
    }

    pub fn is_connected(&self) -> bool {
        self.connection.is_some()
    }

    /// Transmit one stored event.
    pub fn send(&mut self, event: Event) -> Result<(), MidiError> {
        if let Some(ref mut conn) = self.connection {
            conn.send(&event.to_bytes())
                .map_err(|e| MidiError::Send(e.to_string()))?;
        }
        Ok(())
    }

    /// Safety sweep: NoteOff for every note, several passes. Used on pause,
    /// clear, and transpose to prevent stuck notes downstream.
    pub fn all_notes_off(&mut self) -> Result<(), MidiError> {
        if self.connection.is_none() {
            return Ok(());
        }
        for _ in 0..ALL_NOTES_OFF_PASSES {
            for note in 0..=127u8 {
                self.send(Event::new(Command::NoteOff, note, 0))?;
            }
        }
        Ok(())
    }

    pub fn disconnect(&mut self) {
        self.connection = None;
    }
}

impl Default for MidiOutputDevice {
    fn default() -> Self {
        Self::new()
    }
}

pub fn midi_note_name(note: u8) -> String {
    let note_names = [
        "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
    ];
    let octave = (note / 12) as i32 - 1;
    let note_index = (note % 12) as usize;
    format!("{}{}", note_names[note_index], octave)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_note_on_message() {
        let mut parser = MidiParser::new();
        assert!(parser.feed(0x90).is_none());
        assert!(parser.feed(64).is_none());
        let event = parser.feed(100).expect("complete message");
        assert_eq!(event.command, Command::NoteOn);
        assert_eq!(event.note, 64);
        assert_eq!(event.velocity, 100);
        assert!(event.enabled);
    }

    #[test]
    fn parses_note_off_on_any_channel() {
        let mut parser = MidiParser::new();
        parser.feed(0x83);
        parser.feed(60);
        let event = parser.feed(0).expect("complete message");
        assert_eq!(event.command, Command::NoteOff);
    }

    #[test]
    fn running_status_is_not_supported() {
        let mut parser = MidiParser::new();
        parser.feed(0x90);
        parser.feed(64);
        assert!(parser.feed(100).is_some());
        // Two more data bytes without a fresh status byte go nowhere.
        assert!(parser.feed(65).is_none());
        assert!(parser.feed(100).is_none());
    }

    #[test]
    fn unsupported_status_discards_partial_message() {
        let mut parser = MidiParser::new();
        parser.feed(0x90);
        parser.feed(64);
        // Control change aborts the half-built note message.
        assert!(parser.feed(0xB0).is_none());
        assert!(parser.feed(7).is_none());
        assert!(parser.feed(100).is_none());
    }

    #[test]
    fn status_byte_resyncs_mid_message() {
        let mut parser = MidiParser::new();
        parser.feed(0x90);
        assert!(parser.feed(0x80).is_none());
        parser.feed(60);
        let event = parser.feed(0).expect("resynced message");
        assert_eq!(event.command, Command::NoteOff);
        assert_eq!(event.note, 60);
    }

    #[test]
    fn stray_data_bytes_are_ignored() {
        let mut parser = MidiParser::new();
        assert!(parser.feed(64).is_none());
        assert!(parser.feed(100).is_none());
        parser.feed(0x90);
        parser.feed(64);
        assert!(parser.feed(100).is_some());
    }

    #[test]
    fn event_wire_format() {
        let on = Event::new(Command::NoteOn, 64, 100);
        assert_eq!(on.to_bytes(), [0x90, 64, 100]);
        let off = Event::new(Command::NoteOff, 64, 0);
        assert_eq!(off.to_bytes(), [0x80, 64, 0]);
    }

    #[test]
    fn note_names() {
        assert_eq!(midi_note_name(60), "C4");
        assert_eq!(midi_note_name(69), "A4");
        assert_eq!(midi_note_name(0), "C-1");
    }
}
