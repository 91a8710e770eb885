/// Metronome click output using cpal
///
/// The sequencer itself never synthesizes audio; this is only the beat
/// click. Each `click()` re-arms a short decaying sine burst that the
/// stream callback renders.
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use std::sync::{Arc, Mutex};

const CLICK_FREQUENCY: f32 = 2000.0;
const CLICK_DECAY: f32 = 0.9995;
const CLICK_GAIN: f32 = 0.25;

pub struct Metronome {
    _stream: Option<cpal::Stream>,
    energy: Arc<Mutex<f32>>,
}

impl Metronome {
    pub fn new() -> Option<Self> {
        let energy = Arc::new(Mutex::new(0.0));

        let stream = Self::setup_audio_stream(Arc::clone(&energy))?;

        Some(Self {
            _stream: Some(stream),
            energy,
        })
    }

    fn setup_audio_stream(energy: Arc<Mutex<f32>>) -> Option<cpal::Stream> {
        let host = cpal::default_host();
        let device = host.default_output_device()?;
        let config = device.default_output_config().ok()?;

        let sample_rate = config.sample_rate().0 as f32;
        let phase_increment = CLICK_FREQUENCY / sample_rate;
        let mut phase = 0.0f32;

        let stream = match config.sample_format() {
            cpal::SampleFormat::F32 => device.build_output_stream(
                &config.into(),
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    let mut energy_lock = energy.lock().unwrap();

                    for sample in data.iter_mut() {
                        if *energy_lock > 0.001 {
                            *sample = (phase * 2.0 * std::f32::consts::PI).sin()
                                * *energy_lock
                                * CLICK_GAIN;
                            phase += phase_increment;
                            if phase >= 1.0 {
                                phase -= 1.0;
                            }
                            *energy_lock *= CLICK_DECAY;
                        } else {
                            *sample = 0.0;
                            phase = 0.0;
                            *energy_lock = 0.0;
                        }
                    }
                },
                |err| log::warn!("audio stream error: {}", err),
                None,
            ),
            _ => return None,
        };

        if let Ok(stream) = stream {
            let _ = stream.play();
            Some(stream)
        } else {
            None
        }
    }

    /// Re-arm the click burst.
    pub fn click(&mut self) {
        *self.energy.lock().unwrap() = 1.0;
    }
}

impl Default for Metronome {
    fn default() -> Self {
        Self::new().unwrap_or_else(|| {
            log::warn!("no audio output device, metronome disabled");
            Self {
                _stream: None,
                energy: Arc::new(Mutex::new(0.0)),
            }
        })
    }
}
