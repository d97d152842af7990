use crate::filter::{Coefficients, Filter, FilterKind};

pub const MAX_BRIGHTNESS: usize = 256;

const ALL_PASS_ZONE: f32 = 0.05;
const MIN_LP_FC: f32 = 50.0;
const MAX_LP_FC: f32 = 20_000.0;
const MIN_HP_FC: f32 = 0.0;
const MAX_HP_FC: f32 = 15_000.0;
const HP_TRANSITION_STEPS: u8 = 10;

/// Low/high-pass thresholds around the all-pass middle of a 0..=255 range.
pub fn all_pass_thresholds(max: usize) -> (u8, u8) {
    let lp = (max as f32 * (0.5 - ALL_PASS_ZONE)) as u8;
    let hp = (max as f32 * (0.5 + ALL_PASS_ZONE)) as u8;
    (lp, hp)
}

fn cutoff_table(threshold_lp: u8, threshold_hp: u8) -> Vec<f32> {
    (0..MAX_BRIGHTNESS)
        .map(|b| {
            let b = b as f32;
            let (lp, hp) = (threshold_lp as f32, threshold_hp as f32);
            if b <= lp {
                MIN_LP_FC + (MAX_LP_FC - MIN_LP_FC).powf(b / lp)
            } else if b >= hp {
                MIN_HP_FC + (MAX_HP_FC - MIN_HP_FC).powf((b - hp) / (MAX_BRIGHTNESS as f32 - hp))
            } else {
                0.0
            }
        })
        .collect()
}

/// Brightness dimension: a pitch-relative low- or high-pass filter.
pub struct Brightness {
    filter: Filter,
    table: Vec<f32>,
    value: u8,
    threshold_lp: u8,
    threshold_hp: u8,
    kind: FilterKind,
    all_pass: bool,
    adv_mode: bool,
    midi_link: bool,
    frequency: f32,
    velocity_q: f32,
    filter_q: f32,
    filter_fc: f32,
}

impl Brightness {
    pub fn new(sample_rate: f32, frequency: f32) -> Self {
        let (threshold_lp, threshold_hp) = all_pass_thresholds(MAX_BRIGHTNESS);
        Self {
            filter: Filter::new(sample_rate),
            table: cutoff_table(threshold_lp, threshold_hp),
            value: (MAX_BRIGHTNESS / 2) as u8,
            threshold_lp,
            threshold_hp,
            kind: FilterKind::LowPass,
            all_pass: true,
            adv_mode: false,
            midi_link: true,
            frequency,
            velocity_q: 1.0,
            filter_q: 1.0,
            filter_fc: 0.0,
        }
    }

    pub fn set_sample_rate(&mut self, rate: f32) {
        self.filter.set_sample_rate(rate);
    }

    pub fn reset(&mut self) {
        self.filter.reset();
    }

    pub fn value(&self) -> u8 {
        self.value
    }

    /// Cutoff for the current value, relative to the note when linked.
    fn target_cutoff(&self) -> f32 {
        let mut fc = self.table[self.value as usize];
        if self.midi_link {
            fc += self.frequency;
        }
        let hp = self.threshold_hp;
        if self.value >= hp && self.value < hp.saturating_add(HP_TRANSITION_STEPS) {
            fc *= 0.1 * (self.value - hp) as f32;
        }
        fc
    }

    fn apply_filter(&mut self) {
        if !self.all_pass {
            self.filter
                .set_params(self.filter_fc, self.filter_q, self.kind);
        }
    }

    pub fn set_midi_in(&mut self, frequency: f32, q: f32) {
        if self.frequency == frequency && self.velocity_q == q {
            return;
        }
        self.frequency = frequency;
        self.velocity_q = q;
        if !self.midi_link {
            return;
        }
        self.filter_q = q;
        self.filter_fc = self.target_cutoff();
        self.apply_filter();
    }

    pub fn update(&mut self, value: u8) {
        if value == self.value {
            return;
        }
        self.force_update(value);
    }

    pub fn force_update(&mut self, value: u8) {
        self.value = value;
        if value <= self.threshold_lp {
            self.kind = FilterKind::LowPass;
            self.all_pass = false;
        } else if value >= self.threshold_hp {
            self.kind = FilterKind::HighPass;
            self.all_pass = false;
        } else {
            self.all_pass = true;
        }
        self.filter_fc = self.target_cutoff();
        self.apply_filter();
    }

    /// Leaving advanced mode relinks the cutoff to the note and velocity.
    pub fn set_adv_mode(&mut self, adv_mode: bool) {
        self.adv_mode = adv_mode;
        if !adv_mode && !self.midi_link {
            self.relink();
        }
    }

    fn relink(&mut self) {
        self.midi_link = true;
        self.filter_q = self.velocity_q;
        self.filter_fc = self.target_cutoff();
        self.apply_filter();
    }

    pub fn set_adv_controls(&mut self, midi_link: bool, q: f32) {
        if !self.adv_mode {
            return;
        }
        if midi_link {
            if !self.midi_link {
                self.relink();
            }
            return;
        }

        let mut changed = false;
        if self.midi_link {
            self.midi_link = false;
            self.filter_fc = self.target_cutoff();
            changed = true;
        }
        let q = q.max(0.01);
        if self.filter_q != q {
            self.filter_q = q;
            changed = true;
        }
        if changed {
            self.apply_filter();
        }
    }

    /// Coefficients for the response graph, or `None` while all-pass.
    pub fn response_coefficients(&self) -> Option<Coefficients> {
        if self.all_pass {
            return None;
        }
        self.filter.coefficients()
    }

    pub fn process(&mut self, input: f32) -> f32 {
        if self.all_pass {
            return input;
        }
        self.filter.process(input)
    }
}
