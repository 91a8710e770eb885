/// Front panel collaborators - the display, the switch/button inputs, and
/// the tempo pot are external hardware on the original device; here they
/// are traits the host implements (the GUI binary, or a fake in tests).
///
/// The `PanelDriver` is polled once per control-loop iteration. It
/// edge-detects buttons against the previous poll, applies switch state and
/// edits to the sequencer, and reports back whether the caller must issue
/// an all-notes-off sweep.
use crate::sequencer::Sequencer;

/// Play/stop transport switch.
pub const SW_PLAY: u8 = 0x01;
/// Record arm switch.
pub const SW_RECORD: u8 = 0x02;
/// Metronome click switch.
pub const SW_METRONOME: u8 = 0x04;

/// Step back one undo snapshot.
pub const BTN_UNDO: u8 = 0x01;
/// Transpose everything up a semitone.
pub const BTN_TRANSPOSE_UP: u8 = 0x02;
/// Transpose everything down a semitone.
pub const BTN_TRANSPOSE_DOWN: u8 = 0x04;
/// Erase the whole loop.
pub const BTN_CLEAR: u8 = 0x08;

/// Character display: rows of text, updated then refreshed in one go.
pub trait PanelDisplay {
    fn show_text(&mut self, row: usize, text: &str);
    fn show_int(&mut self, row: usize, column: usize, value: i32);
    fn refresh(&mut self);
}

/// Debounced switch and button state, polled as bitmasks.
pub trait Controls {
    fn read_switches(&mut self) -> u8;
    fn read_buttons(&mut self) -> u8;
}

/// Already-converted tempo pot sample, 0..=1023.
pub trait TempoPot {
    fn read_raw(&mut self) -> u32;
}

/// Side effects the caller owes after a service pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PanelEffects {
    pub all_notes_off: bool,
}

pub struct PanelDriver {
    prev_switches: u8,
    prev_buttons: u8,
}

impl PanelDriver {
    pub fn new() -> Self {
        Self {
            prev_switches: 0,
            prev_buttons: 0,
        }
    }

    /// One control-loop pass: poll inputs, apply them to the sequencer,
    /// update the display.
    pub fn service<P>(&mut self, seq: &mut Sequencer, panel: &mut P) -> PanelEffects
    where
        P: Controls + TempoPot + PanelDisplay,
    {
        let mut effects = PanelEffects::default();

        let switches = panel.read_switches();
        let buttons = panel.read_buttons();
        let pressed = buttons & !self.prev_buttons;
        let released_switches = self.prev_switches & !switches;

        seq.set_playing(switches & SW_PLAY != 0);
        seq.set_metronome(switches & SW_METRONOME != 0);
        seq.set_recording(switches & SW_RECORD != 0);

        if released_switches & SW_PLAY != 0 {
            // Pause: sweep so nothing keeps sounding.
            effects.all_notes_off = true;
        }
        if released_switches & SW_RECORD != 0 {
            seq.commit();
        }

        if pressed & BTN_UNDO != 0 {
            seq.undo();
        }
        if pressed & BTN_TRANSPOSE_UP != 0 && seq.transpose(1) {
            effects.all_notes_off = true;
        }
        if pressed & BTN_TRANSPOSE_DOWN != 0 && seq.transpose(-1) {
            effects.all_notes_off = true;
        }
        if pressed & BTN_CLEAR != 0 {
            seq.clear();
            effects.all_notes_off = true;
        }

        if seq.tempo_due() {
            seq.set_tempo_raw(panel.read_raw());
        }

        let state = match (seq.is_playing(), seq.is_recording()) {
            (true, true) => "PLAY REC",
            (true, false) => "PLAY",
            (false, true) => "STOP REC",
            (false, false) => "STOP",
        };
        panel.show_text(0, state);
        panel.show_text(1, "Tempo");
        panel.show_int(1, 7, seq.beat_length() as i32);
        panel.show_text(2, "Undo");
        panel.show_int(2, 7, seq.undo_index() as i32);
        panel.refresh();

        self.prev_switches = switches;
        self.prev_buttons = buttons;
        effects
    }
}

impl Default for PanelDriver {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sequencer::{Command, Event};

    struct FakePanel {
        switches: u8,
        buttons: u8,
        tempo: u32,
        rows: Vec<String>,
        refreshes: usize,
    }

    impl FakePanel {
        fn new() -> Self {
            Self {
                switches: 0,
                buttons: 0,
                tempo: 512,
                rows: vec![String::new(); 4],
                refreshes: 0,
            }
        }
    }

    impl Controls for FakePanel {
        fn read_switches(&mut self) -> u8 {
            self.switches
        }
        fn read_buttons(&mut self) -> u8 {
            self.buttons
        }
    }

    impl TempoPot for FakePanel {
        fn read_raw(&mut self) -> u32 {
            self.tempo
        }
    }

    impl PanelDisplay for FakePanel {
        fn show_text(&mut self, row: usize, text: &str) {
            self.rows[row] = text.to_string();
        }
        fn show_int(&mut self, row: usize, _column: usize, value: i32) {
            let row = &mut self.rows[row];
            row.push(' ');
            row.push_str(&value.to_string());
        }
        fn refresh(&mut self) {
            self.refreshes += 1;
        }
    }

    fn record_one_note(seq: &mut Sequencer) {
        seq.capture(Event::new(Command::NoteOn, 60, 100));
    }

    #[test]
    fn switches_drive_transport_flags() {
        let mut seq = Sequencer::new(4, 4);
        let mut panel = FakePanel::new();
        let mut driver = PanelDriver::new();

        panel.switches = SW_PLAY | SW_RECORD;
        driver.service(&mut seq, &mut panel);
        assert!(seq.is_playing());
        assert!(seq.is_recording());
        assert_eq!(panel.rows[0], "PLAY REC");

        panel.switches = 0;
        let effects = driver.service(&mut seq, &mut panel);
        assert!(!seq.is_playing());
        // Pausing sweeps held notes.
        assert!(effects.all_notes_off);
        assert_eq!(panel.rows[0], "STOP");
    }

    #[test]
    fn record_switch_release_commits() {
        let mut seq = Sequencer::new(4, 4);
        let mut panel = FakePanel::new();
        let mut driver = PanelDriver::new();

        panel.switches = SW_PLAY | SW_RECORD;
        driver.service(&mut seq, &mut panel);
        record_one_note(&mut seq);

        panel.switches = SW_PLAY;
        driver.service(&mut seq, &mut panel);
        assert_eq!(seq.undo_index(), 1);
    }

    #[test]
    fn buttons_are_edge_detected() {
        let mut seq = Sequencer::new(4, 4);
        let mut panel = FakePanel::new();
        let mut driver = PanelDriver::new();

        panel.switches = SW_PLAY | SW_RECORD;
        driver.service(&mut seq, &mut panel);
        record_one_note(&mut seq);

        panel.buttons = BTN_TRANSPOSE_UP;
        let effects = driver.service(&mut seq, &mut panel);
        assert!(effects.all_notes_off);
        assert_eq!(seq.grid().event(0, 0).note, 61);

        // Held button does not retrigger.
        let effects = driver.service(&mut seq, &mut panel);
        assert!(!effects.all_notes_off);
        assert_eq!(seq.grid().event(0, 0).note, 61);

        // Release and press again: fires once more.
        panel.buttons = 0;
        driver.service(&mut seq, &mut panel);
        panel.buttons = BTN_TRANSPOSE_UP;
        driver.service(&mut seq, &mut panel);
        assert_eq!(seq.grid().event(0, 0).note, 62);
    }

    #[test]
    fn clear_button_wipes_and_sweeps() {
        let mut seq = Sequencer::new(4, 4);
        let mut panel = FakePanel::new();
        let mut driver = PanelDriver::new();

        panel.switches = SW_PLAY | SW_RECORD;
        driver.service(&mut seq, &mut panel);
        record_one_note(&mut seq);

        panel.buttons = BTN_CLEAR;
        let effects = driver.service(&mut seq, &mut panel);
        assert!(effects.all_notes_off);
        assert!(seq.grid().is_empty());
    }

    #[test]
    fn refused_transpose_needs_no_sweep() {
        let mut seq = Sequencer::new(4, 4);
        let mut panel = FakePanel::new();
        let mut driver = PanelDriver::new();

        // Empty grid: transpose refuses, nothing to silence.
        panel.buttons = BTN_TRANSPOSE_UP;
        let effects = driver.service(&mut seq, &mut panel);
        assert!(!effects.all_notes_off);
    }

    #[test]
    fn tempo_applies_on_refresh_interval() {
        let mut seq = Sequencer::new(4, 4);
        let mut panel = FakePanel::new();
        let mut driver = PanelDriver::new();
        panel.tempo = 1000;

        driver.service(&mut seq, &mut panel);
        assert_ne!(seq.beat_length(), 24);

        for _ in 0..26 {
            seq.tick();
        }
        driver.service(&mut seq, &mut panel);
        assert_eq!(seq.beat_length(), 24);
    }

    #[test]
    fn display_reports_state_tempo_and_undo_slot() {
        let mut seq = Sequencer::new(4, 4);
        let mut panel = FakePanel::new();
        let mut driver = PanelDriver::new();

        driver.service(&mut seq, &mut panel);
        assert_eq!(panel.rows[1], format!("Tempo {}", seq.beat_length()));
        assert_eq!(panel.rows[2], "Undo 0");
        assert_eq!(panel.refreshes, 1);
    }
}
