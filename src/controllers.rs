use macroquad::prelude::*;

use crate::note::NoteEvent;

const MIDI_MAX: i32 = 127;
const VELOCITY_STEP: u8 = 8;
const NOTE_NAMES: [&str; 12] = ["C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B"];

#[derive(Clone, Copy)]
pub struct KeyBinding {
    pub keycode: KeyCode,
    pub semitone: i32,
}

const BINDINGS: [KeyBinding; 17] = [
    KeyBinding { keycode: KeyCode::Z, semitone: 0 },
    KeyBinding { keycode: KeyCode::S, semitone: 1 },
    KeyBinding { keycode: KeyCode::X, semitone: 2 },
    KeyBinding { keycode: KeyCode::D, semitone: 3 },
    KeyBinding { keycode: KeyCode::C, semitone: 4 },
    KeyBinding { keycode: KeyCode::V, semitone: 5 },
    KeyBinding { keycode: KeyCode::G, semitone: 6 },
    KeyBinding { keycode: KeyCode::B, semitone: 7 },
    KeyBinding { keycode: KeyCode::H, semitone: 8 },
    KeyBinding { keycode: KeyCode::N, semitone: 9 },
    KeyBinding { keycode: KeyCode::J, semitone: 10 },
    KeyBinding { keycode: KeyCode::M, semitone: 11 },
    KeyBinding { keycode: KeyCode::Comma, semitone: 12 },
    KeyBinding { keycode: KeyCode::L, semitone: 13 },
    KeyBinding { keycode: KeyCode::Period, semitone: 14 },
    KeyBinding { keycode: KeyCode::Semicolon, semitone: 15 },
    KeyBinding { keycode: KeyCode::Slash, semitone: 16 },
];

pub fn note_name(note: u8) -> String {
    let octave = note as i32 / 12 - 1;
    format!("{}{}", NOTE_NAMES[note as usize % 12], octave)
}

/// Computer keyboard as a monophonic note source with last-note priority.
pub struct KeyboardController {
    base_note: i32,
    velocity: u8,
    pressed: Vec<KeyCode>,
    sounding: Option<(KeyCode, u8)>,
    octave_shift: i32,
    min_shift: i32,
    max_shift: i32,
}

impl KeyboardController {
    pub fn new(base_note: u8, velocity: u8) -> Self {
        let base_note = base_note.min(MIDI_MAX as u8) as i32;
        let top = BINDINGS.iter().map(|b| b.semitone).max().unwrap_or(0);
        let min_shift = (-base_note as f32 / 12.0).ceil() as i32;
        let max_shift = ((MIDI_MAX - base_note - top) as f32 / 12.0).floor() as i32;

        Self {
            base_note,
            velocity: velocity.clamp(1, MIDI_MAX as u8),
            pressed: Vec::new(),
            sounding: None,
            octave_shift: 0,
            min_shift,
            max_shift: max_shift.max(min_shift),
        }
    }

    /// Reads macroquad's key state for this frame.
    pub fn poll(&mut self) -> Vec<NoteEvent> {
        if is_key_pressed(KeyCode::Minus) {
            self.adjust_octave(-1);
        }
        if is_key_pressed(KeyCode::Equal) {
            self.adjust_octave(1);
        }
        if is_key_pressed(KeyCode::Up) {
            self.adjust_velocity(true);
        }
        if is_key_pressed(KeyCode::Down) {
            self.adjust_velocity(false);
        }

        let mut events = Vec::new();
        for binding in &BINDINGS {
            if is_key_pressed(binding.keycode) {
                events.extend(self.press(binding.keycode));
            }
            if is_key_released(binding.keycode) {
                events.extend(self.release(binding.keycode));
            }
        }
        events
    }

    pub fn press(&mut self, keycode: KeyCode) -> Option<NoteEvent> {
        if self.pressed.contains(&keycode) {
            return None;
        }
        let note = self.note_for(keycode)?;
        self.pressed.push(keycode);
        self.sounding = Some((keycode, note));
        Some(NoteEvent::On {
            note,
            velocity: self.velocity,
        })
    }

    /// Releasing the sounding key falls back to the most recent key still held.
    pub fn release(&mut self, keycode: KeyCode) -> Option<NoteEvent> {
        let index = self.pressed.iter().position(|code| *code == keycode)?;
        self.pressed.remove(index);
        let (sounding_key, sounding_note) = self.sounding?;
        if sounding_key != keycode {
            return None;
        }
        match self.pressed.last().copied() {
            Some(previous) => {
                let note = self.note_for(previous)?;
                self.sounding = Some((previous, note));
                Some(NoteEvent::On {
                    note,
                    velocity: self.velocity,
                })
            }
            None => {
                self.sounding = None;
                Some(NoteEvent::Off {
                    note: sounding_note,
                })
            }
        }
    }

    fn note_for(&self, keycode: KeyCode) -> Option<u8> {
        let binding = BINDINGS.iter().find(|b| b.keycode == keycode)?;
        let note = self.base_note + self.octave_shift * 12 + binding.semitone;
        Some(note.clamp(0, MIDI_MAX) as u8)
    }

    pub fn adjust_octave(&mut self, delta: i32) {
        self.octave_shift = (self.octave_shift + delta).clamp(self.min_shift, self.max_shift);
    }

    pub fn adjust_velocity(&mut self, up: bool) {
        self.velocity = if up {
            self.velocity.saturating_add(VELOCITY_STEP).min(MIDI_MAX as u8)
        } else {
            self.velocity.saturating_sub(VELOCITY_STEP).max(1)
        };
    }

    pub fn octave_shift(&self) -> i32 {
        self.octave_shift
    }

    pub fn velocity(&self) -> u8 {
        self.velocity
    }

    pub fn status(&self) -> String {
        let note = match self.sounding {
            Some((_, note)) => note_name(note),
            None => "--".to_string(),
        };
        format!(
            "OCT {:+}  VEL {}  KEY {}",
            self.octave_shift, self.velocity, note
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_map_to_semitones_above_the_base() {
        let mut keys = KeyboardController::new(60, 100);
        assert_eq!(
            keys.press(KeyCode::Z),
            Some(NoteEvent::On { note: 60, velocity: 100 })
        );
        assert_eq!(
            keys.press(KeyCode::Slash),
            Some(NoteEvent::On { note: 76, velocity: 100 })
        );
        assert_eq!(keys.press(KeyCode::Q), None);
    }

    #[test]
    fn last_note_priority() {
        let mut keys = KeyboardController::new(60, 100);
        keys.press(KeyCode::Z);
        keys.press(KeyCode::C);
        // Releasing the sounding key returns to the held one.
        assert_eq!(
            keys.release(KeyCode::C),
            Some(NoteEvent::On { note: 60, velocity: 100 })
        );
        keys.press(KeyCode::V);
        // Releasing a key that is not sounding changes nothing.
        assert_eq!(keys.release(KeyCode::Z), None);
        assert_eq!(keys.release(KeyCode::V), Some(NoteEvent::Off { note: 65 }));
        assert_eq!(keys.release(KeyCode::V), None);
    }

    #[test]
    fn octave_shift_is_bounded() {
        let mut keys = KeyboardController::new(60, 100);
        keys.adjust_octave(1);
        assert_eq!(
            keys.press(KeyCode::Z),
            Some(NoteEvent::On { note: 72, velocity: 100 })
        );
        // The released note is the one that sounded, not the shifted one.
        keys.adjust_octave(-2);
        assert_eq!(keys.release(KeyCode::Z), Some(NoteEvent::Off { note: 72 }));

        for _ in 0..20 {
            keys.adjust_octave(1);
        }
        assert_eq!(keys.octave_shift(), 4);
        for _ in 0..20 {
            keys.adjust_octave(-1);
        }
        assert_eq!(keys.octave_shift(), -5);
    }

    #[test]
    fn velocity_steps_stay_in_midi_range() {
        let mut keys = KeyboardController::new(60, 120);
        keys.adjust_velocity(true);
        assert_eq!(keys.velocity(), 127);
        for _ in 0..30 {
            keys.adjust_velocity(false);
        }
        assert_eq!(keys.velocity(), 1);
    }

    #[test]
    fn status_names_the_sounding_note() {
        let mut keys = KeyboardController::new(60, 100);
        assert_eq!(keys.status(), "OCT +0  VEL 100  KEY --");
        keys.press(KeyCode::N);
        assert_eq!(keys.status(), "OCT +0  VEL 100  KEY A4");
        assert_eq!(note_name(0), "C-1");
    }
}
