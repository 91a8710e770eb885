/// Core sequencer logic - the event grid, capture quantization, the
/// step scheduler, and the bounded editing operations (undo, transpose,
/// clear). Grid dimensions are chosen at construction.
///
/// The engine is a plain state machine: the clock thread calls `tick` and
/// `poll_step`, the MIDI receive callback calls `capture`, and the control
/// loop calls the edit operations. Callers share it behind one
/// `Arc<Mutex<Sequencer>>`; no locking happens in here.
pub mod grid;
pub mod playback;
pub mod undo;

pub use grid::{Command, Event, Grid};
use undo::UndoHistory;

/// Steps in the loop.
pub const DEFAULT_STEPS: usize = 16;
/// Maximum simultaneous events per step.
pub const DEFAULT_POLYPHONY: usize = 8;
/// Undo snapshots kept.
const UNDO_DEPTH: usize = 8;

/// Clock period driving `tick`, in milliseconds.
pub const TICK_MS: u64 = 10;
/// Tempo pot raw range is 0..=1023; beat length is its inversion in ticks.
pub const TEMPO_RAW_MAX: u32 = 1023;
/// Ticks between tempo pot refreshes.
const TEMPO_REFRESH_TICKS: u32 = 25;
/// Metronome clicks every Nth column.
const METRONOME_DIVISION: usize = 4;

/// What one scheduler step produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepOutput {
    pub column: usize,
    pub metronome: bool,
    pub messages: Vec<Event>,
}

pub struct Sequencer {
    grid: Grid,
    undo: UndoHistory,
    current_column: usize,
    time_counter: u32,
    tempo_timer: u32,
    beat_length: u32,
    play: bool,
    record: bool,
    metronome: bool,
    // Note bounds over all visible events, used to clamp transpose.
    // lowest > highest is the empty sentinel.
    lowest_note: u8,
    highest_note: u8,
}

impl Sequencer {
    pub fn new(steps: usize, polyphony: usize) -> Self {
        Self {
            grid: Grid::new(steps, polyphony),
            undo: UndoHistory::new(steps, UNDO_DEPTH),
            current_column: 0,
            time_counter: 0,
            tempo_timer: 0,
            beat_length: 50,
            play: false,
            record: false,
            metronome: false,
            lowest_note: 127,
            highest_note: 0,
        }
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn current_column(&self) -> usize {
        self.current_column
    }

    pub fn beat_length(&self) -> u32 {
        self.beat_length
    }

    /// Map a raw tempo pot sample to the beat length: turning the pot up
    /// shortens the step.
    pub fn set_tempo_raw(&mut self, raw: u32) {
        self.beat_length = TEMPO_RAW_MAX + 1 - raw.min(TEMPO_RAW_MAX);
    }

    pub fn is_playing(&self) -> bool {
        self.play
    }

    pub fn set_playing(&mut self, play: bool) {
        self.play = play;
    }

    pub fn is_recording(&self) -> bool {
        self.record
    }

    pub fn set_recording(&mut self, record: bool) {
        self.record = record;
    }

    pub fn set_metronome(&mut self, on: bool) {
        self.metronome = on;
    }

    pub fn undo_index(&self) -> usize {
        self.undo.index()
    }

    /// Advance the clock counters. This is the whole of the timer handler;
    /// it never touches the grid.
    pub fn tick(&mut self) {
        self.time_counter += 1;
        self.tempo_timer += 1;
    }

    /// True once per tempo refresh interval; resets the interval timer.
    pub fn tempo_due(&mut self) -> bool {
        if self.tempo_timer > TEMPO_REFRESH_TICKS {
            self.tempo_timer = 0;
            true
        } else {
            false
        }
    }

    /// Capture path: store an incoming note event, quantized to the grid.
    /// Runs in the MIDI receive context; does nothing unless both playing
    /// and recording.
    ///
    /// An event arriving past the half-beat boundary belongs to the next
    /// step. The scheduler will visit that column before a full loop has
    /// passed, so the event is stored disabled and fires on the second
    /// visit instead of double-triggering on the first.
    pub fn capture(&mut self, mut event: Event) {
        if !(self.record && self.play) {
            return;
        }
        let mut save_column = self.current_column;
        if self.time_counter > self.beat_length / 2 {
            save_column = (save_column + 1) % self.grid.steps();
            event.enabled = false;
        } else {
            event.enabled = true;
        }
        if self.grid.push(save_column, event) {
            self.lowest_note = self.lowest_note.min(event.note);
            self.highest_note = self.highest_note.max(event.note);
        }
    }

    /// Run the scheduler once. Returns the step output when a beat has
    /// elapsed, `None` otherwise. Call once per control-loop iteration.
    pub fn poll_step(&mut self) -> Option<StepOutput> {
        if !self.play || self.time_counter <= self.beat_length {
            return None;
        }
        self.time_counter = 0;
        let steps = self.grid.steps();
        self.current_column = (self.current_column + 1) % steps;
        let column = self.current_column;

        let mut messages = Vec::with_capacity(self.grid.len(column));
        for index in 0..self.grid.len(column) {
            let event = self.grid.event_mut(column, index);
            if event.enabled {
                messages.push(*event);
            } else {
                // First visit to a forward-quantized event: arm it, skip it.
                event.enabled = true;
            }
        }

        // The column the write head left two steps ago can no longer
        // receive quantized writes; reconcile it now.
        self.grid.settle((column + steps - 2) % steps);

        Some(StepOutput {
            column,
            metronome: self.metronome && column % METRONOME_DIVISION == 0,
            messages,
        })
    }

    /// Commit the current grid lengths to the undo history. Called when the
    /// record switch goes off.
    pub fn commit(&mut self) {
        self.undo.commit(&self.grid.lengths());
    }

    /// Step the grid back to the previous committed snapshot. Only the
    /// column lengths are restored; see `UndoHistory`.
    pub fn undo(&mut self) {
        let live = self.grid.lengths();
        let restored = self.undo.step_back(&live).to_vec();
        self.grid.restore_lengths(&restored);
        self.recompute_note_bounds();
    }

    /// Forget everything: lengths to zero, undo history reset, bounds
    /// cleared. The caller must follow up with all-notes-off.
    pub fn clear(&mut self) {
        self.grid.clear();
        self.undo.reset();
        self.lowest_note = 127;
        self.highest_note = 0;
    }

    /// Shift every visible note by one semitone. Refused (returns `false`)
    /// when the grid is empty or the shift would leave the 0..=127 range.
    /// On success the caller must follow up with all-notes-off, or a held
    /// note keeps sounding at the old pitch.
    pub fn transpose(&mut self, delta: i8) -> bool {
        debug_assert!(delta == 1 || delta == -1);
        if self.lowest_note > self.highest_note {
            return false;
        }
        if delta > 0 && self.highest_note == 127 {
            return false;
        }
        if delta < 0 && self.lowest_note == 0 {
            return false;
        }
        self.grid.transpose(delta);
        self.lowest_note = (self.lowest_note as i16 + delta as i16) as u8;
        self.highest_note = (self.highest_note as i16 + delta as i16) as u8;
        true
    }

    fn recompute_note_bounds(&mut self) {
        self.lowest_note = 127;
        self.highest_note = 0;
        for event in self.grid.events() {
            self.lowest_note = self.lowest_note.min(event.note);
            self.highest_note = self.highest_note.max(event.note);
        }
    }
}

impl Default for Sequencer {
    fn default() -> Self {
        Self::new(DEFAULT_STEPS, DEFAULT_POLYPHONY)
    }
}
