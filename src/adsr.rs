const DEBOUNCE_MS: f32 = 20.0;
const MIN_STAGE_TIME: f32 = 0.0001;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AdsrState {
    Off,
    Attack,
    Decay,
    Sustain,
    ReleaseDebounce,
    Release,
    ButtonHeldOff,
    OffDebounce,
}

/// Linear ADSR driven by a gate, with debounced release.
///
/// A fixed duration makes the envelope percussive: sustain is forced to 0
/// and the gate only decides when the next note may start.
pub struct Adsr {
    state: AdsrState,
    level: f32,
    increment: f32,
    sample_rate: f32,
    debounce_counter: u32,
    debounce_interval: u32,
    attack: f32,
    decay: f32,
    sustain: f32,
    release: f32,
    duration: f32,
}

impl Adsr {
    pub fn new(sample_rate: f32) -> Self {
        let sample_rate = sample_rate.max(1.0);
        Self {
            state: AdsrState::Off,
            level: 0.0,
            increment: 0.0,
            sample_rate,
            debounce_counter: 0,
            debounce_interval: debounce_frames(sample_rate),
            attack: 0.01,
            decay: 0.01,
            sustain: 0.5,
            release: 0.01,
            duration: 0.0,
        }
    }

    pub fn set_sample_rate(&mut self, rate: f32) {
        self.sample_rate = rate.max(1.0);
        self.debounce_interval = debounce_frames(self.sample_rate);
    }

    pub fn set_attack(&mut self, seconds: f32) {
        self.attack = seconds.max(MIN_STAGE_TIME);
    }

    pub fn set_decay(&mut self, seconds: f32) {
        self.decay = seconds.max(MIN_STAGE_TIME);
    }

    pub fn set_sustain(&mut self, level: f32) {
        self.sustain = level.clamp(0.0, 1.0);
    }

    pub fn set_release(&mut self, seconds: f32) {
        self.release = seconds.max(MIN_STAGE_TIME);
    }

    /// Non-zero durations are percussive.
    pub fn set_duration(&mut self, duration: f32) {
        self.duration = duration;
        if duration != 0.0 {
            self.sustain = 0.0;
        }
    }

    pub fn state(&self) -> AdsrState {
        self.state
    }

    pub fn level(&self) -> f32 {
        self.level
    }

    pub fn attack(&self) -> f32 {
        self.attack
    }

    pub fn decay(&self) -> f32 {
        self.decay
    }

    pub fn sustain(&self) -> f32 {
        self.sustain
    }

    pub fn release(&self) -> f32 {
        self.release
    }

    pub fn is_percussive(&self) -> bool {
        self.duration != 0.0
    }

    fn frames(&self, seconds: f32) -> f32 {
        seconds * self.sample_rate
    }

    fn start_attack(&mut self) {
        self.state = AdsrState::Attack;
        self.increment = (1.0 - self.level) / self.frames(self.attack);
    }

    /// Restarts the attack from the current level.
    pub fn retrigger(&mut self) {
        self.start_attack();
    }

    pub fn process(&mut self, note_on: bool) -> f32 {
        match self.state {
            AdsrState::Off => {
                if note_on {
                    self.start_attack();
                }
            }
            AdsrState::Attack => {
                if self.level >= 1.0 {
                    self.level = 1.0;
                    self.state = AdsrState::Decay;
                    self.increment = (self.sustain - 1.0) / self.frames(self.decay);
                }
                self.level += self.increment;
            }
            AdsrState::Decay => {
                if self.level <= self.sustain {
                    self.level = self.sustain;
                    self.state = match (self.is_percussive(), note_on) {
                        (true, true) => AdsrState::ButtonHeldOff,
                        (true, false) => {
                            self.debounce_counter = 0;
                            AdsrState::OffDebounce
                        }
                        (false, _) => AdsrState::Sustain,
                    };
                } else {
                    self.level += self.increment;
                }
            }
            AdsrState::Sustain => {
                if !note_on {
                    self.state = AdsrState::ReleaseDebounce;
                    self.debounce_counter = 0;
                    self.increment = -self.level / self.frames(self.release);
                }
            }
            AdsrState::ReleaseDebounce => {
                if self.debounce_counter > self.debounce_interval {
                    self.state = AdsrState::Release;
                }
                self.step_release();
                self.debounce_counter += 1;
            }
            AdsrState::Release => {
                if note_on {
                    self.start_attack();
                    self.level += self.increment;
                } else {
                    self.step_release();
                }
            }
            AdsrState::ButtonHeldOff => {
                if !note_on {
                    self.state = AdsrState::OffDebounce;
                    self.debounce_counter = 0;
                }
            }
            AdsrState::OffDebounce => {
                if self.debounce_counter > self.debounce_interval {
                    self.state = AdsrState::Off;
                }
                self.debounce_counter += 1;
            }
        }
        self.level
    }

    fn step_release(&mut self) {
        self.level += self.increment;
        if self.level <= 0.0 {
            self.level = 0.0;
            self.state = AdsrState::Off;
        }
    }
}

fn debounce_frames(sample_rate: f32) -> u32 {
    (DEBOUNCE_MS * sample_rate / 1000.0) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(adsr: &mut Adsr, note_on: bool, frames: usize) -> f32 {
        let mut level = adsr.level();
        for _ in 0..frames {
            level = adsr.process(note_on);
        }
        level
    }

    #[test]
    fn sustaining_envelope_walks_through_states() {
        let mut adsr = Adsr::new(1_000.0);
        adsr.set_attack(0.01);
        adsr.set_decay(0.01);
        adsr.set_sustain(0.5);
        adsr.set_release(0.05);

        adsr.process(true);
        assert_eq!(adsr.state(), AdsrState::Attack);
        run(&mut adsr, true, 14);
        assert_eq!(adsr.state(), AdsrState::Decay);
        let level = run(&mut adsr, true, 20);
        assert_eq!(adsr.state(), AdsrState::Sustain);
        assert!((level - 0.5).abs() < 1e-6);

        adsr.process(false);
        assert_eq!(adsr.state(), AdsrState::ReleaseDebounce);
        run(&mut adsr, false, 22);
        assert_eq!(adsr.state(), AdsrState::Release);
        let level = run(&mut adsr, false, 40);
        assert_eq!(level, 0.0);
        assert_eq!(adsr.state(), AdsrState::Off);
    }

    #[test]
    fn percussive_envelope_holds_until_key_release() {
        let mut adsr = Adsr::new(1_000.0);
        adsr.set_sustain(0.7);
        adsr.set_duration(1.0);
        assert_eq!(adsr.sustain(), 0.0);

        run(&mut adsr, true, 100);
        assert_eq!(adsr.state(), AdsrState::ButtonHeldOff);
        assert_eq!(adsr.level(), 0.0);

        adsr.process(false);
        assert_eq!(adsr.state(), AdsrState::OffDebounce);
        run(&mut adsr, false, 25);
        assert_eq!(adsr.state(), AdsrState::Off);
    }

    #[test]
    fn release_ignores_gate_while_debouncing() {
        let mut adsr = Adsr::new(1_000.0);
        adsr.set_release(1.0);
        run(&mut adsr, true, 50);
        assert_eq!(adsr.state(), AdsrState::Sustain);
        run(&mut adsr, false, 5);
        run(&mut adsr, true, 5);
        assert_eq!(adsr.state(), AdsrState::ReleaseDebounce);
        run(&mut adsr, true, 20);
        assert_eq!(adsr.state(), AdsrState::Attack);
    }

    #[test]
    fn retrigger_restarts_attack_from_current_level() {
        let mut adsr = Adsr::new(1_000.0);
        adsr.set_duration(1.0);
        run(&mut adsr, true, 100);
        assert_eq!(adsr.state(), AdsrState::ButtonHeldOff);
        adsr.retrigger();
        assert_eq!(adsr.state(), AdsrState::Attack);
        let level = run(&mut adsr, true, 5);
        assert!(level > 0.0);
    }

    #[test]
    fn stage_times_have_a_floor() {
        let mut adsr = Adsr::new(48_000.0);
        adsr.set_attack(0.0);
        adsr.set_release(-1.0);
        assert!(adsr.attack() > 0.0);
        assert!(adsr.release() > 0.0);
        assert!(run(&mut adsr, true, 10).is_finite());
    }
}
