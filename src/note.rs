use crate::adsr::AdsrState;
use crate::articulation::{Articulation, SweepCurve};
use crate::brightness::Brightness;
use crate::buffers::{AdvControls, Dimension, NUM_DIMENSIONS};
use crate::envelope::{Envelope, EnvelopeParams};
use crate::filter::Coefficients;
use crate::freq_mod::FmSettings;
use crate::spectrum::Spectrum;

pub const FFT_SIZE: usize = 1024;
pub const FFT_HOP: usize = 4096;
pub const SPECTRUM_FFT_FREQUENCY: f32 = 440.0;

/// `[note, velocity]` as shown by the panel; zeros when no key is held.
pub type MidiReport = [f32; 2];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NoteEvent {
    On { note: u8, velocity: u8 },
    Off { note: u8 },
}

pub fn midi_to_frequency(note: u8) -> f32 {
    440.0 * 2f32.powf((note as f32 - 69.0) / 12.0)
}

/// Harder key presses give a more resonant brightness filter.
pub fn velocity_to_q(velocity: u8) -> f32 {
    let v = velocity as f32;
    match velocity {
        0..=40 => 0.707,
        41..=80 => 0.707 + (v - 40.0) * 0.007325,
        _ => 1.0 + (v - 80.0) * 0.0375,
    }
}

/// Circular capture buffer that hands out an ordered frame every hop.
pub struct CaptureBuffer {
    data: Vec<f32>,
    write: usize,
    counter: usize,
    hop: usize,
    ready: bool,
}

impl CaptureBuffer {
    pub fn new(size: usize, hop: usize) -> Self {
        Self {
            data: vec![0.0; size.max(1)],
            write: 0,
            counter: 0,
            hop: hop.max(1),
            ready: false,
        }
    }

    pub fn push(&mut self, sample: f32) {
        self.data[self.write] = sample;
        self.write = (self.write + 1) % self.data.len();
        self.counter += 1;
        if self.counter >= self.hop {
            self.counter = 0;
            self.ready = true;
        }
    }

    /// Oldest sample first.
    pub fn take_frame(&mut self) -> Option<Vec<f32>> {
        if !self.ready {
            return None;
        }
        self.ready = false;
        let mut frame = Vec::with_capacity(self.data.len());
        frame.extend_from_slice(&self.data[self.write..]);
        frame.extend_from_slice(&self.data[..self.write]);
        Some(frame)
    }
}

/// Monophonic voice: spectrum, brightness, articulation and envelope in series.
pub struct Note {
    frequency: f32,
    q_factor: f32,
    spectrum: Spectrum,
    brightness: Brightness,
    articulation: Articulation,
    envelope: Envelope,
    fft_spectrum: Spectrum,
    adv_mode: bool,
    held_note: Option<u8>,
    gate: bool,
    sounding: bool,
    output_capture: CaptureBuffer,
    spectrum_capture: CaptureBuffer,
}

impl Note {
    pub fn new(sample_rate: f32) -> Self {
        let frequency = SPECTRUM_FFT_FREQUENCY;
        let mut note = Self {
            frequency,
            q_factor: 1.0,
            spectrum: Spectrum::new(sample_rate, frequency),
            brightness: Brightness::new(sample_rate, frequency),
            articulation: Articulation::new(sample_rate),
            envelope: Envelope::new(sample_rate),
            fft_spectrum: Spectrum::new(sample_rate, SPECTRUM_FFT_FREQUENCY),
            adv_mode: false,
            held_note: None,
            gate: false,
            sounding: false,
            output_capture: CaptureBuffer::new(FFT_SIZE, FFT_HOP),
            spectrum_capture: CaptureBuffer::new(FFT_SIZE, FFT_HOP),
        };
        note.articulation.set_frequency(frequency);
        let initial = (crate::spectrum::MAX_SPECTRUM / 2 - 1) as u8;
        for dimension in Dimension::ALL {
            note.force_timbre(dimension, initial);
        }
        note
    }

    pub fn set_sample_rate(&mut self, rate: f32) {
        self.spectrum.set_sample_rate(rate);
        self.brightness.set_sample_rate(rate);
        self.articulation.set_sample_rate(rate);
        self.envelope.set_sample_rate(rate);
        self.fft_spectrum.set_sample_rate(rate);
    }

    pub fn timbre(&self) -> [u8; NUM_DIMENSIONS] {
        [
            self.spectrum.value(),
            self.brightness.value(),
            self.articulation.value(),
            self.envelope.value(),
        ]
    }

    pub fn set_timbre(&mut self, dimension: Dimension, value: u8) {
        match dimension {
            Dimension::Spectrum => {
                self.spectrum.update(value);
                self.fft_spectrum.update(value);
            }
            Dimension::Brightness => self.brightness.update(value),
            Dimension::Articulation => self.articulation.update(value),
            Dimension::Envelope => self.envelope.update(value),
        }
    }

    /// Applies a value even when it equals the current one.
    pub fn force_timbre(&mut self, dimension: Dimension, value: u8) {
        match dimension {
            Dimension::Spectrum => {
                self.spectrum.force_update(value);
                self.fft_spectrum.force_update(value);
            }
            Dimension::Brightness => self.brightness.force_update(value),
            Dimension::Articulation => self.articulation.force_update(value),
            Dimension::Envelope => self.envelope.force_update(value),
        }
    }

    pub fn is_adv_mode(&self) -> bool {
        self.adv_mode
    }

    pub fn set_adv_mode(&mut self, adv_mode: bool) {
        if self.adv_mode == adv_mode {
            return;
        }
        self.adv_mode = adv_mode;
        self.spectrum.set_adv_mode(adv_mode);
        self.fft_spectrum.set_adv_mode(adv_mode);
        self.brightness.set_adv_mode(adv_mode);
        self.articulation.set_adv_mode(adv_mode);
        self.envelope.set_adv_mode(adv_mode);
    }

    pub fn set_adv_controls(&mut self, controls: &AdvControls) {
        if !self.adv_mode {
            return;
        }
        self.brightness
            .set_adv_controls(controls.midi_link, controls.brightness_q);
        self.articulation.set_adv_controls(controls.articulation_q);
        self.envelope
            .set_adv_controls(controls.decay, controls.sustain, controls.release);
    }

    pub fn update_adv_spectrum(&mut self, settings: &FmSettings) {
        if !self.adv_mode {
            return;
        }
        self.spectrum.update_adv_spectrum(settings);
        self.fft_spectrum.update_adv_spectrum(settings);
    }

    fn set_midi_in(&mut self, frequency: f32, q_factor: f32) {
        if self.frequency == frequency && self.q_factor == q_factor {
            return;
        }
        self.frequency = frequency;
        self.q_factor = q_factor;
        self.spectrum.set_frequency(frequency);
        self.brightness.set_midi_in(frequency, q_factor);
        self.articulation.set_frequency(frequency);
    }

    /// Applies a key event. Returns the MIDI readout when it changed.
    pub fn handle_event(&mut self, event: NoteEvent) -> Option<MidiReport> {
        match event {
            NoteEvent::On { note, velocity: 0 } => self.release(note),
            NoteEvent::On { note, velocity } => {
                let note = note.min(127);
                self.set_midi_in(midi_to_frequency(note), velocity_to_q(velocity.min(127)));
                if self.envelope.state() != AdsrState::Off {
                    self.envelope.retrigger();
                    self.restart_filters();
                } else {
                    self.spectrum.reset();
                }
                self.gate = true;
                self.held_note = Some(note);
                Some([note as f32, velocity as f32])
            }
            NoteEvent::Off { note } => self.release(note),
        }
    }

    fn release(&mut self, note: u8) -> Option<MidiReport> {
        if self.held_note != Some(note) {
            return None;
        }
        self.held_note = None;
        self.gate = false;
        Some([0.0, 0.0])
    }

    fn restart_filters(&mut self) {
        self.brightness.reset();
        self.articulation.reset();
    }

    pub fn held_note(&self) -> Option<u8> {
        self.held_note
    }

    pub fn is_sounding(&self) -> bool {
        self.sounding
    }

    pub fn process(&mut self) -> f32 {
        let amplitude = self.envelope.process(self.gate);
        if !self.sounding && self.envelope.is_note_on() {
            self.restart_filters();
        }
        self.sounding = self.envelope.is_note_on();

        let mut out = 0.0;
        if self.sounding {
            out = self.spectrum.process();
            out = self.brightness.process(out);
            out = self.articulation.process(out);
            out *= amplitude;
        }

        self.output_capture.push(out);
        let reference = self.fft_spectrum.process();
        self.spectrum_capture.push(reference);
        out
    }

    pub fn envelope_params(&self) -> EnvelopeParams {
        self.envelope.params()
    }

    pub fn fm_settings(&self) -> FmSettings {
        self.spectrum.settings()
    }

    pub fn brightness_response(&self) -> Option<Coefficients> {
        self.brightness.response_coefficients()
    }

    pub fn articulation_curve(&self) -> Option<SweepCurve> {
        self.articulation.curve()
    }

    pub fn take_output_frame(&mut self) -> Option<Vec<f32>> {
        self.output_capture.take_frame()
    }

    pub fn take_spectrum_frame(&mut self) -> Option<Vec<f32>> {
        self.spectrum_capture.take_frame()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::freq_mod::Algorithm;
    use approx::assert_abs_diff_eq;

    fn render(note: &mut Note, frames: usize) -> f32 {
        (0..frames).map(|_| note.process().abs()).fold(0.0, f32::max)
    }

    #[test]
    fn lookup_tables() {
        assert_abs_diff_eq!(midi_to_frequency(69), 440.0, epsilon = 1e-3);
        assert_abs_diff_eq!(midi_to_frequency(81), 880.0, epsilon = 1e-2);
        assert_abs_diff_eq!(midi_to_frequency(60), 261.626, epsilon = 1e-2);
        assert_eq!(velocity_to_q(0), 0.707);
        assert_eq!(velocity_to_q(40), 0.707);
        assert_abs_diff_eq!(velocity_to_q(80), 1.0, epsilon = 1e-3);
        assert_abs_diff_eq!(velocity_to_q(127), 2.7625, epsilon = 1e-4);
    }

    #[test]
    fn starts_in_the_middle_of_every_dimension() {
        let note = Note::new(44_100.0);
        assert_eq!(note.timbre(), [127; 4]);
    }

    #[test]
    fn silent_until_a_key_is_pressed() {
        let mut note = Note::new(44_100.0);
        assert_eq!(render(&mut note, 1_000), 0.0);
        assert!(!note.is_sounding());

        let report = note.handle_event(NoteEvent::On { note: 60, velocity: 100 });
        assert_eq!(report, Some([60.0, 100.0]));
        assert!(render(&mut note, 2_000) > 0.01);
        assert!(note.is_sounding());
    }

    #[test]
    fn only_the_held_note_releases() {
        let mut note = Note::new(44_100.0);
        note.handle_event(NoteEvent::On { note: 60, velocity: 90 });
        assert_eq!(note.handle_event(NoteEvent::Off { note: 62 }), None);
        assert_eq!(note.held_note(), Some(60));
        assert_eq!(
            note.handle_event(NoteEvent::On { note: 60, velocity: 0 }),
            Some([0.0, 0.0])
        );
        assert_eq!(note.held_note(), None);
    }

    #[test]
    fn new_key_retriggers_a_finished_percussive_note() {
        let mut note = Note::new(1_000.0);
        note.set_timbre(Dimension::Envelope, 10);
        note.handle_event(NoteEvent::On { note: 60, velocity: 90 });
        render(&mut note, 1_000);
        assert!(!note.is_sounding());

        note.handle_event(NoteEvent::On { note: 64, velocity: 90 });
        note.process();
        assert!(note.is_sounding());
        assert_eq!(note.held_note(), Some(64));
    }

    #[test]
    fn capture_frames_arrive_every_hop() {
        let mut note = Note::new(44_100.0);
        for _ in 0..FFT_HOP - 1 {
            note.process();
        }
        assert!(note.take_spectrum_frame().is_none());
        note.process();
        let frame = note.take_spectrum_frame().unwrap();
        assert_eq!(frame.len(), FFT_SIZE);
        assert!(frame.iter().any(|v| *v != 0.0));
        assert!(note.take_spectrum_frame().is_none());
        assert!(note.take_output_frame().is_some());
    }

    #[test]
    fn capture_frame_is_ordered_oldest_first() {
        let mut capture = CaptureBuffer::new(4, 6);
        for sample in 1..=6 {
            capture.push(sample as f32);
        }
        assert_eq!(capture.take_frame(), Some(vec![3.0, 4.0, 5.0, 6.0]));
    }

    #[test]
    fn advanced_updates_need_advanced_mode() {
        let mut note = Note::new(44_100.0);
        let settings = FmSettings {
            algorithm: Algorithm::DoubleStack22,
            ..FmSettings::default()
        };
        note.update_adv_spectrum(&settings);
        assert_eq!(note.fm_settings().algorithm, Algorithm::Additive);

        note.set_adv_mode(true);
        note.update_adv_spectrum(&settings);
        assert_eq!(note.fm_settings(), settings);

        note.set_adv_controls(&AdvControls {
            adv_mode: true,
            decay: 0.4,
            sustain: 0.2,
            release: 0.3,
            ..AdvControls::default()
        });
        let params = note.envelope_params();
        assert_eq!(params.decay, 0.4);
        assert!(!params.constant_duration);

        note.set_adv_mode(false);
        assert_eq!(note.fm_settings(), crate::spectrum::preset_for(127));
    }
}
