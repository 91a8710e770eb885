/// Steploop - a real-time MIDI step-sequencer/looper
///
/// This library provides the core components:
/// - Grid-based capture and playback with half-beat quantization
/// - Bounded undo history and live edit operations (transpose, clear)
/// - MIDI input/output wiring for capture and playback
/// - Clock thread driving the step scheduler
/// - Front-panel collaborator traits (display, switches, tempo pot)

pub mod audio;
pub mod midi;
pub mod panel;
pub mod sequencer;

// Re-export commonly used types
pub use audio::Metronome;
pub use midi::{midi_note_name, MidiError, MidiInputDevice, MidiOutputDevice, MidiParser};
pub use panel::{Controls, PanelDisplay, PanelDriver, PanelEffects, TempoPot};
pub use sequencer::playback::{PlaybackEngine, PlaybackEvent};
pub use sequencer::{Command, Event, Grid, Sequencer, StepOutput};
