use crate::freq_mod::{Algorithm, FmSettings, FreqMod};
use crate::operator::Waveshape;

pub const MAX_SPECTRUM: usize = 256;

/// Operator preset for a spectrum dimension value.
pub fn preset_for(value: u8) -> FmSettings {
    use Waveshape::{Saw, Sine, Square, Triangle};

    let s = value as f32;
    let (amps, ratios, shapes) = match value {
        200.. => {
            let inharmonicity = 1.0 + (s - 200.0) * 0.0002;
            ([4.0, 0.0, 0.0, 0.0], [inharmonicity; 4], [Saw, Saw, Saw, Sine])
        }
        100..=199 => {
            let even = (s - 100.0) * 0.04;
            ([even, 4.0 - even, 0.0, 0.0], [1.0; 4], [Saw, Square, Sine, Sine])
        }
        50..=99 => {
            let even = (s - 50.0) * 0.08;
            ([4.0 - even, even, 0.0, 0.0], [1.0; 4], [Triangle, Square, Sine, Sine])
        }
        40..=49 => {
            let even = (s - 40.0) * 0.4;
            ([even, 4.0 - even, 0.0, 0.0], [1.0; 4], [Triangle, Sine, Sine, Sine])
        }
        // timpani
        30..=39 => ([1.0, 0.8, 0.6, 0.4], [1.0, 1.5, 1.98, 2.44], [Sine; 4]),
        // marimba
        20..=29 => ([1.0, 0.8, 0.8, 0.0], [1.0, 4.0, 9.2, 1.0], [Sine; 4]),
        // xylophone
        10..=19 => ([1.0, 0.8, 0.0, 0.0], [1.0, 3.0, 1.0, 1.0], [Sine; 4]),
        _ => ([4.0, 0.0, 0.0, 0.0], [1.0; 4], [Sine; 4]),
    };
    FmSettings {
        algorithm: Algorithm::Additive,
        ratios,
        amps,
        shapes,
    }
}

/// Spectrum dimension: picks the operator set of the voice.
pub struct Spectrum {
    fm: FreqMod,
    value: u8,
    adv_mode: bool,
}

impl Spectrum {
    pub fn new(sample_rate: f32, frequency: f32) -> Self {
        let value = (MAX_SPECTRUM / 2) as u8;
        let mut fm = FreqMod::new(sample_rate, frequency);
        fm.apply(&preset_for(value));
        Self {
            fm,
            value,
            adv_mode: false,
        }
    }

    pub fn set_sample_rate(&mut self, rate: f32) {
        self.fm.set_sample_rate(rate);
    }

    /// Restarts every operator at phase zero.
    pub fn reset(&mut self) {
        self.fm.reset();
    }

    pub fn value(&self) -> u8 {
        self.value
    }

    pub fn settings(&self) -> FmSettings {
        self.fm.settings()
    }

    /// In advanced mode the editor owns the operators; the value is only
    /// tracked. Leaving advanced mode restores the preset.
    pub fn set_adv_mode(&mut self, adv_mode: bool) {
        if self.adv_mode == adv_mode {
            return;
        }
        self.adv_mode = adv_mode;
        if !adv_mode {
            self.fm.apply(&preset_for(self.value));
        }
    }

    pub fn update_adv_spectrum(&mut self, settings: &FmSettings) {
        if self.adv_mode {
            self.fm.apply(settings);
        }
    }

    pub fn update(&mut self, value: u8) {
        if value == self.value {
            return;
        }
        self.force_update(value);
    }

    /// Applies `value` even when it matches the current one.
    pub fn force_update(&mut self, value: u8) {
        self.value = value;
        if !self.adv_mode {
            self.fm.apply(&preset_for(value));
        }
    }

    pub fn set_frequency(&mut self, frequency: f32) {
        if frequency != self.fm.frequency() {
            self.fm.set_frequency(frequency);
        }
    }

    pub fn process(&mut self) -> f32 {
        self.fm.process()
    }
}
