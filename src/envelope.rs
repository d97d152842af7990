use crate::adsr::{Adsr, AdsrState};

pub const MAX_ENVELOPE: usize = 256;

const MIN_STAGE_MS: f32 = 5.0;
const MAX_STAGE_MS: f32 = 291.0;
const SUSTAIN_THRESHOLD_RATIO: f32 = 0.4;
const SUSTAIN_LEVEL: f32 = 0.9;
const DEFAULT_RELEASE: f32 = 0.01;

/// ADSR parameters as published to the envelope graph.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EnvelopeParams {
    pub attack: f32,
    pub decay: f32,
    pub sustain: f32,
    pub release: f32,
    pub constant_duration: bool,
}

impl EnvelopeParams {
    pub const BUFFER_LEN: usize = 5;

    pub fn to_buffer(&self) -> [f32; Self::BUFFER_LEN] {
        [
            self.attack,
            self.decay,
            self.sustain,
            self.release,
            if self.constant_duration { 1.0 } else { 0.0 },
        ]
    }

    pub fn from_buffer(data: &[f32]) -> Option<Self> {
        let [attack, decay, sustain, release, constant] = *data else {
            return None;
        };
        if !data.iter().all(|v| v.is_finite()) {
            return None;
        }
        Some(Self {
            attack: attack.max(0.0),
            decay: decay.max(0.0),
            sustain: sustain.clamp(0.0, 1.0),
            release: release.max(0.0),
            constant_duration: constant != 0.0,
        })
    }
}

pub fn attack_time(value: u8) -> f32 {
    (MIN_STAGE_MS + (MAX_STAGE_MS - MIN_STAGE_MS).powf(value as f32 / MAX_ENVELOPE as f32)) * 0.001
}

pub fn decay_time(value: u8) -> f32 {
    (MAX_STAGE_MS - (MAX_STAGE_MS - MIN_STAGE_MS).powf(value as f32 / MAX_ENVELOPE as f32)) * 0.001
}

/// Envelope dimension: maps one value onto attack, decay and sustain.
///
/// Low values give percussive envelopes with a fast attack and long decay,
/// high values give sustaining ones with a slow attack.
pub struct Envelope {
    adsr: Adsr,
    value: u8,
    sustain_threshold: u8,
    adv_mode: bool,
    note_on: bool,
}

impl Envelope {
    pub fn new(sample_rate: f32) -> Self {
        let mut envelope = Self {
            adsr: Adsr::new(sample_rate),
            value: (MAX_ENVELOPE / 2) as u8,
            sustain_threshold: (SUSTAIN_THRESHOLD_RATIO * MAX_ENVELOPE as f32) as u8,
            adv_mode: false,
            note_on: false,
        };
        envelope.force_update(envelope.value);
        envelope
    }

    pub fn set_sample_rate(&mut self, rate: f32) {
        self.adsr.set_sample_rate(rate);
    }

    pub fn value(&self) -> u8 {
        self.value
    }

    pub fn attack_time(&self) -> f32 {
        attack_time(self.value)
    }

    pub fn decay_time(&self) -> f32 {
        decay_time(self.value)
    }

    pub fn state(&self) -> AdsrState {
        self.adsr.state()
    }

    pub fn params(&self) -> EnvelopeParams {
        EnvelopeParams {
            attack: self.adsr.attack(),
            decay: self.adsr.decay(),
            sustain: self.adsr.sustain(),
            release: self.adsr.release(),
            constant_duration: self.adsr.is_percussive(),
        }
    }

    pub fn update(&mut self, value: u8) {
        if value == self.value {
            return;
        }
        self.force_update(value);
    }

    /// In advanced mode only the attack follows the value.
    pub fn force_update(&mut self, value: u8) {
        self.value = value;
        self.adsr.set_attack(attack_time(value));
        if self.adv_mode {
            return;
        }
        self.adsr.set_decay(decay_time(value));
        self.adsr.set_release(DEFAULT_RELEASE);
        if value >= self.sustain_threshold {
            self.adsr.set_duration(0.0);
            self.adsr.set_sustain(SUSTAIN_LEVEL);
        } else {
            self.adsr.set_duration(1.0);
        }
    }

    pub fn set_adv_mode(&mut self, adv_mode: bool) {
        if self.adv_mode == adv_mode {
            return;
        }
        self.adv_mode = adv_mode;
        if !adv_mode {
            self.force_update(self.value);
        }
    }

    /// Advanced envelopes always sustain, at the given level.
    pub fn set_adv_controls(&mut self, decay: f32, sustain: f32, release: f32) {
        if !self.adv_mode {
            return;
        }
        self.adsr.set_duration(0.0);
        self.adsr.set_decay(decay);
        self.adsr.set_sustain(sustain);
        self.adsr.set_release(release);
    }

    pub fn retrigger(&mut self) {
        self.adsr.retrigger();
    }

    /// True while the envelope is audible or about to be.
    pub fn is_note_on(&self) -> bool {
        self.note_on
    }

    pub fn process(&mut self, gate: bool) -> f32 {
        let amplitude = self.adsr.process(gate);
        self.note_on = !matches!(
            self.adsr.state(),
            AdsrState::Off | AdsrState::OffDebounce | AdsrState::ButtonHeldOff
        );
        amplitude
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn stage_tables() {
        assert_abs_diff_eq!(attack_time(0), 0.006, epsilon = 1e-6);
        assert_abs_diff_eq!(decay_time(0), 0.290, epsilon = 1e-6);
        assert!(attack_time(255) > 0.28 && attack_time(255) < 0.291);
        assert!(decay_time(255) < 0.012);
        for value in 1..=255u8 {
            assert!(attack_time(value) >= attack_time(value - 1));
        }
    }

    #[test]
    fn threshold_switches_between_percussive_and_sustaining() {
        let mut envelope = Envelope::new(44_100.0);
        envelope.update(101);
        assert!(envelope.params().constant_duration);
        assert_eq!(envelope.params().sustain, 0.0);

        envelope.update(102);
        let params = envelope.params();
        assert!(!params.constant_duration);
        assert_eq!(params.sustain, SUSTAIN_LEVEL);
    }

    #[test]
    fn advanced_controls_override_decay_and_release() {
        let mut envelope = Envelope::new(44_100.0);
        envelope.update(20);
        envelope.set_adv_controls(0.5, 0.3, 1.0);
        assert!(envelope.params().constant_duration, "ignored outside advanced mode");

        envelope.set_adv_mode(true);
        envelope.set_adv_controls(0.5, 0.3, 1.0);
        envelope.update(30);
        let params = envelope.params();
        assert_eq!(params.decay, 0.5);
        assert_eq!(params.sustain, 0.3);
        assert_eq!(params.release, 1.0);
        assert_eq!(params.attack, attack_time(30));

        envelope.set_adv_mode(false);
        let params = envelope.params();
        assert_eq!(params.decay, decay_time(30));
        assert_eq!(params.release, DEFAULT_RELEASE);
        assert!(params.constant_duration);
    }

    #[test]
    fn note_on_tracks_audible_states() {
        let mut envelope = Envelope::new(1_000.0);
        envelope.update(10);
        assert!(!envelope.is_note_on());
        envelope.process(true);
        assert!(envelope.is_note_on());
        for _ in 0..1_000 {
            envelope.process(true);
        }
        assert_eq!(envelope.state(), AdsrState::ButtonHeldOff);
        assert!(!envelope.is_note_on());
    }

    #[test]
    fn params_buffer_layout() {
        let params = EnvelopeParams {
            attack: 0.1,
            decay: 0.2,
            sustain: 0.9,
            release: 0.01,
            constant_duration: false,
        };
        assert_eq!(params.to_buffer(), [0.1, 0.2, 0.9, 0.01, 0.0]);
        assert_eq!(EnvelopeParams::from_buffer(&params.to_buffer()), Some(params));
        assert_eq!(EnvelopeParams::from_buffer(&[0.1, 0.2]), None);
        assert_eq!(EnvelopeParams::from_buffer(&[f32::NAN, 0.0, 0.0, 0.0, 0.0]), None);
    }
}
