/// Playback engine - the periodic tick source and the event channel
///
/// A spawned clock thread stands in for the original timer interrupt: every
/// tick it locks the shared engine, bumps the counters, and runs the step
/// scheduler. Step output is forwarded over an mpsc channel so the control
/// loop can transmit MIDI and render without holding the lock.
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use super::{Event, Sequencer, TICK_MS};

#[derive(Debug, Clone)]
pub enum PlaybackEvent {
    StepAdvanced(usize),
    Message(Event),
    Metronome,
}

pub struct PlaybackEngine {
    sender: Sender<PlaybackEvent>,
    receiver: Receiver<PlaybackEvent>,
    is_running: Arc<Mutex<bool>>,
}

impl PlaybackEngine {
    pub fn new() -> Self {
        let (sender, receiver) = channel();

        Self {
            sender,
            receiver,
            is_running: Arc::new(Mutex::new(false)),
        }
    }

    pub fn start(&mut self, sequencer: Arc<Mutex<Sequencer>>) {
        if *self.is_running.lock().unwrap() {
            return;
        }

        *self.is_running.lock().unwrap() = true;

        let is_running = Arc::clone(&self.is_running);
        let sender = self.sender.clone();

        thread::spawn(move || {
            let tick_period = Duration::from_millis(TICK_MS);
            let mut last_tick = Instant::now();
            log::info!("clock thread started ({} ms tick)", TICK_MS);

            while *is_running.lock().unwrap() {
                let now = Instant::now();

                if now.duration_since(last_tick) >= tick_period {
                    let step = {
                        let mut seq = sequencer.lock().unwrap();
                        seq.tick();
                        seq.poll_step()
                    };

                    if let Some(step) = step {
                        let _ = sender.send(PlaybackEvent::StepAdvanced(step.column));
                        if step.metronome {
                            let _ = sender.send(PlaybackEvent::Metronome);
                        }
                        for message in step.messages {
                            let _ = sender.send(PlaybackEvent::Message(message));
                        }
                    }

                    last_tick = now;
                }

                thread::sleep(Duration::from_millis(1));
            }
            log::info!("clock thread stopped");
        });
    }

    pub fn stop(&mut self) {
        *self.is_running.lock().unwrap() = false;
    }

    pub fn is_running(&self) -> bool {
        *self.is_running.lock().unwrap()
    }

    /// Drain pending events without blocking.
    pub fn poll_events(&self) -> Vec<PlaybackEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.receiver.try_recv() {
            events.push(event);
        }
        events
    }
}

impl Default for PlaybackEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sequencer::{Command, DEFAULT_POLYPHONY};

    #[test]
    fn clock_drives_shared_sequencer() {
        let sequencer = Arc::new(Mutex::new(Sequencer::new(4, DEFAULT_POLYPHONY)));
        {
            let mut seq = sequencer.lock().unwrap();
            seq.set_tempo_raw(1023); // beat_length = 1, fastest setting
            seq.set_playing(true);
            seq.set_recording(true);
            seq.capture(Event::new(Command::NoteOn, 64, 100));
        }

        let mut engine = PlaybackEngine::new();
        engine.start(Arc::clone(&sequencer));
        thread::sleep(Duration::from_millis(200));
        engine.stop();

        let events = engine.poll_events();
        let steps = events
            .iter()
            .filter(|e| matches!(e, PlaybackEvent::StepAdvanced(_)))
            .count();
        assert!(steps > 1, "expected several steps, saw {}", steps);
        assert!(events
            .iter()
            .any(|e| matches!(e, PlaybackEvent::Message(ev) if ev.note == 64)));
    }
}
