#[cfg(feature = "gui")]
use eframe::egui;

#[cfg(feature = "gui")]
use std::sync::{Arc, Mutex};

#[cfg(feature = "gui")]
use steploop::{
    midi_note_name,
    panel::{
        BTN_CLEAR, BTN_TRANSPOSE_DOWN, BTN_TRANSPOSE_UP, BTN_UNDO, SW_METRONOME, SW_PLAY,
        SW_RECORD,
    },
    sequencer::TEMPO_RAW_MAX,
    Controls, Metronome, MidiInputDevice, MidiOutputDevice, PanelDisplay, PanelDriver,
    PlaybackEngine, PlaybackEvent, Sequencer, TempoPot,
};

#[cfg(feature = "gui")]
fn main() -> Result<(), eframe::Error> {
    env_logger::init();

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([900.0, 600.0])
            .with_title("Steploop - MIDI Looper"),
        ..Default::default()
    };

    eframe::run_native(
        "Steploop",
        options,
        Box::new(|_cc| Ok(Box::new(LooperApp::new()))),
    )
}

#[cfg(not(feature = "gui"))]
fn main() {
    eprintln!("This binary requires the 'gui' feature to be enabled");
    std::process::exit(1);
}

/// On-screen stand-in for the original front panel: toggles are the
/// switches, click-buttons are the pushbuttons, a slider is the tempo pot,
/// and four text rows are the character display.
#[cfg(feature = "gui")]
struct UiPanel {
    switches: u8,
    buttons: u8,
    tempo_raw: u32,
    rows: [String; 4],
}

#[cfg(feature = "gui")]
impl UiPanel {
    fn new() -> Self {
        Self {
            switches: 0,
            buttons: 0,
            tempo_raw: TEMPO_RAW_MAX / 2,
            rows: Default::default(),
        }
    }
}

#[cfg(feature = "gui")]
impl Controls for UiPanel {
    fn read_switches(&mut self) -> u8 {
        self.switches
    }

    fn read_buttons(&mut self) -> u8 {
        // Clicks are one-shot; consuming the poll releases them.
        std::mem::take(&mut self.buttons)
    }
}

#[cfg(feature = "gui")]
impl TempoPot for UiPanel {
    fn read_raw(&mut self) -> u32 {
        self.tempo_raw
    }
}

#[cfg(feature = "gui")]
impl PanelDisplay for UiPanel {
    fn show_text(&mut self, row: usize, text: &str) {
        if let Some(slot) = self.rows.get_mut(row) {
            *slot = text.to_string();
        }
    }

    fn show_int(&mut self, row: usize, column: usize, value: i32) {
        if let Some(slot) = self.rows.get_mut(row) {
            while slot.len() < column {
                slot.push(' ');
            }
            slot.truncate(column);
            slot.push_str(&value.to_string());
        }
    }

    fn refresh(&mut self) {}
}

#[cfg(feature = "gui")]
struct LooperApp {
    sequencer: Arc<Mutex<Sequencer>>,
    playback_engine: PlaybackEngine,
    midi_input: MidiInputDevice,
    midi_output: MidiOutputDevice,
    metronome: Metronome,
    panel: UiPanel,
    panel_driver: PanelDriver,

    // UI state
    available_in_ports: Vec<String>,
    available_out_ports: Vec<String>,
    selected_in_port: Option<usize>,
    selected_out_port: Option<usize>,
    current_visual_step: usize,
}

#[cfg(feature = "gui")]
impl LooperApp {
    fn new() -> Self {
        let sequencer = Arc::new(Mutex::new(Sequencer::default()));
        let mut playback_engine = PlaybackEngine::new();
        playback_engine.start(Arc::clone(&sequencer));

        Self {
            sequencer,
            playback_engine,
            midi_input: MidiInputDevice::new(),
            midi_output: MidiOutputDevice::new(),
            metronome: Metronome::default(),
            panel: UiPanel::new(),
            panel_driver: PanelDriver::new(),
            available_in_ports: MidiInputDevice::available_ports(),
            available_out_ports: MidiOutputDevice::available_ports(),
            selected_in_port: None,
            selected_out_port: None,
            current_visual_step: 0,
        }
    }

    fn handle_playback_events(&mut self) {
        for event in self.playback_engine.poll_events() {
            match event {
                PlaybackEvent::StepAdvanced(step) => {
                    self.current_visual_step = step;
                }
                PlaybackEvent::Message(message) => {
                    if let Err(err) = self.midi_output.send(message) {
                        log::warn!("{}", err);
                    }
                }
                PlaybackEvent::Metronome => {
                    self.metronome.click();
                }
            }
        }
    }

    fn service_panel(&mut self) {
        let effects = {
            let mut seq = self.sequencer.lock().unwrap();
            self.panel_driver.service(&mut seq, &mut self.panel)
        };
        if effects.all_notes_off {
            if let Err(err) = self.midi_output.all_notes_off() {
                log::warn!("{}", err);
            }
        }
    }

    fn port_selector(
        ui: &mut egui::Ui,
        label: &str,
        ports: &[String],
        selected: Option<usize>,
    ) -> Option<usize> {
        let mut changed = None;
        ui.horizontal(|ui| {
            ui.label(label);
            if ports.is_empty() {
                ui.label("No MIDI ports available");
            } else {
                egui::ComboBox::from_id_source(label)
                    .selected_text(
                        selected
                            .map(|i| ports[i].as_str())
                            .unwrap_or("Select port..."),
                    )
                    .show_ui(ui, |ui| {
                        for (i, port_name) in ports.iter().enumerate() {
                            if ui.selectable_label(selected == Some(i), port_name).clicked() {
                                changed = Some(i);
                            }
                        }
                    });
            }
        });
        changed
    }
}

#[cfg(feature = "gui")]
impl eframe::App for LooperApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        ctx.request_repaint();

        self.handle_playback_events();

        egui::CentralPanel::default().show(ctx, |ui| {
            ui.heading("Steploop - MIDI Looper");
            ui.add_space(10.0);

            // MIDI port selection
            if let Some(port_idx) = Self::port_selector(
                ui,
                "MIDI Input:",
                &self.available_in_ports,
                self.selected_in_port,
            ) {
                match self
                    .midi_input
                    .connect(port_idx, Arc::clone(&self.sequencer))
                {
                    Ok(()) => self.selected_in_port = Some(port_idx),
                    Err(err) => log::warn!("{}", err),
                }
            }

            if let Some(port_idx) = Self::port_selector(
                ui,
                "MIDI Output:",
                &self.available_out_ports,
                self.selected_out_port,
            ) {
                match self.midi_output.connect(port_idx) {
                    Ok(()) => self.selected_out_port = Some(port_idx),
                    Err(err) => log::warn!("{}", err),
                }
            }

            ui.add_space(10.0);

            // Switches and tempo pot
            ui.horizontal(|ui| {
                let mut play = self.panel.switches & SW_PLAY != 0;
                let mut record = self.panel.switches & SW_RECORD != 0;
                let mut click = self.panel.switches & SW_METRONOME != 0;

                ui.toggle_value(&mut play, "▶ Play");
                ui.toggle_value(&mut record, "● Record");
                ui.toggle_value(&mut click, "Click");

                self.panel.switches = (play as u8 * SW_PLAY)
                    | (record as u8 * SW_RECORD)
                    | (click as u8 * SW_METRONOME);

                ui.add_space(20.0);

                ui.label("Tempo:");
                ui.add(egui::Slider::new(&mut self.panel.tempo_raw, 0..=TEMPO_RAW_MAX));
            });

            ui.add_space(10.0);

            // Edit buttons
            ui.horizontal(|ui| {
                if ui.button("Undo").clicked() {
                    self.panel.buttons |= BTN_UNDO;
                }
                if ui.button("Transpose +").clicked() {
                    self.panel.buttons |= BTN_TRANSPOSE_UP;
                }
                if ui.button("Transpose −").clicked() {
                    self.panel.buttons |= BTN_TRANSPOSE_DOWN;
                }
                if ui.button("Clear").clicked() {
                    self.panel.buttons |= BTN_CLEAR;
                }
            });

            self.service_panel();

            ui.add_space(10.0);

            // Character display
            ui.group(|ui| {
                for row in &self.panel.rows {
                    ui.monospace(if row.is_empty() { " " } else { row.as_str() });
                }
            });

            ui.add_space(20.0);

            // Step grid: one column per step with its captured notes
            ui.label("Loop:");
            ui.add_space(5.0);

            let seq = self.sequencer.lock().unwrap();
            let playing = seq.is_playing();
            ui.horizontal(|ui| {
                for column in 0..seq.grid().steps() {
                    let is_current = playing && self.current_visual_step == column;
                    ui.vertical(|ui| {
                        let marker = if is_current { "●" } else { " " };
                        ui.monospace(format!("{}{:2}", marker, column));
                        for event in seq.grid().column(column) {
                            ui.monospace(midi_note_name(event.note));
                        }
                    });
                }
            });
            drop(seq);

            // Info
            ui.separator();
            ui.label("Arm Record and Play, then feed MIDI notes to capture a loop");
            if !self.midi_output.is_connected() {
                ui.colored_label(
                    egui::Color32::YELLOW,
                    "⚠ No MIDI output connected - nothing will sound",
                );
            }
        });
    }
}
