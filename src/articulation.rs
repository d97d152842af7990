use crate::brightness::all_pass_thresholds;
use crate::filter::{Filter, FilterKind};

pub const MAX_ARTICULATION: usize = 256;
pub const ARTICULATION_GRAPH_POINTS: usize = 60;

const MIN_TIME_MS: f32 = 5.0;
const MAX_TIME_MS: f32 = 600.0;
const MIN_FC: f32 = 50.0;
const MAX_FC: f32 = 20_000.0;

/// Snapshot of a sweep, enough to draw its cutoff trajectory off the audio thread.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SweepCurve {
    pub kind: FilterKind,
    pub base: f32,
    pub sample_rate: f32,
}

impl SweepCurve {
    /// Normalised cutoff over the longest sweep time.
    pub fn points(&self, count: usize) -> Vec<f32> {
        let base = self.base as f64;
        (0..count)
            .map(|i| {
                let frames = (i as f64 / count as f64) * MAX_TIME_MS as f64 * 0.001
                    * self.sample_rate as f64;
                let fc = base.powf(frames);
                match self.kind {
                    FilterKind::HighPass => fc.clamp(0.0, 1.0) as f32,
                    _ => (fc / MAX_FC as f64).min(1.0) as f32,
                }
            })
            .collect()
    }
}

fn base_table(sample_rate: f32, threshold_lp: u8, threshold_hp: u8) -> Vec<f32> {
    let span = (MAX_FC - MIN_FC) as f64;
    let sweep_base = |distance: f32| {
        let seconds = (MIN_TIME_MS + (MAX_TIME_MS - MIN_TIME_MS) * distance) * 0.001;
        span.powf(1.0 / (sample_rate as f64 * seconds as f64))
    };
    (0..MAX_ARTICULATION)
        .map(|a| {
            let (lp, hp) = (threshold_lp as f32, threshold_hp as f32);
            let a = a as f32;
            if a <= lp {
                sweep_base((lp - a) / lp) as f32
            } else if a >= hp {
                (1.0 / sweep_base((a - hp) / (MAX_ARTICULATION as f32 - hp))) as f32
            } else {
                0.0
            }
        })
        .collect()
}

/// Articulation dimension: a filter whose cutoff sweeps after each note-on.
pub struct Articulation {
    filter: Filter,
    table: Vec<f32>,
    value: u8,
    threshold_lp: u8,
    threshold_hp: u8,
    kind: FilterKind,
    all_pass: bool,
    adv_mode: bool,
    sample_rate: f32,
    frequency: f32,
    base: f32,
    delta: f32,
    filter_fc: f32,
    filter_q: f32,
}

impl Articulation {
    pub fn new(sample_rate: f32) -> Self {
        let (threshold_lp, threshold_hp) = all_pass_thresholds(MAX_ARTICULATION);
        let sample_rate = sample_rate.max(1.0);
        Self {
            filter: Filter::new(sample_rate),
            table: base_table(sample_rate, threshold_lp, threshold_hp),
            value: (MAX_ARTICULATION / 2) as u8,
            threshold_lp,
            threshold_hp,
            kind: FilterKind::LowPass,
            all_pass: true,
            adv_mode: false,
            sample_rate,
            frequency: 0.0,
            base: 0.0,
            delta: 0.0,
            filter_fc: MIN_FC,
            filter_q: 1.0,
        }
    }

    /// Rebuilds the sweep table, which depends on the frame rate.
    pub fn set_sample_rate(&mut self, rate: f32) {
        self.sample_rate = rate.max(1.0);
        self.filter.set_sample_rate(self.sample_rate);
        self.table = base_table(self.sample_rate, self.threshold_lp, self.threshold_hp);
        self.base = self.table[self.value as usize];
    }

    pub fn set_frequency(&mut self, frequency: f32) {
        self.frequency = frequency;
    }

    pub fn value(&self) -> u8 {
        self.value
    }

    /// Restarts the sweep from its initial cutoff.
    pub fn reset(&mut self) {
        self.filter.reset();
        match self.kind {
            FilterKind::HighPass => {
                self.delta = MAX_FC - MIN_FC;
                self.filter_fc = MAX_FC;
            }
            _ => {
                self.delta = 1.0;
                self.filter_fc = 0.0;
            }
        }
    }

    pub fn set_adv_mode(&mut self, adv_mode: bool) {
        self.adv_mode = adv_mode;
        if !adv_mode {
            self.filter_q = 1.0;
        }
    }

    pub fn set_adv_controls(&mut self, q: f32) {
        if self.adv_mode {
            self.filter_q = q.max(0.01);
        }
    }

    pub fn update(&mut self, value: u8) {
        if value == self.value {
            return;
        }
        self.force_update(value);
    }

    pub fn force_update(&mut self, value: u8) {
        self.value = value;
        self.base = self.table[value as usize];
        if value <= self.threshold_lp {
            self.kind = FilterKind::LowPass;
            self.all_pass = false;
        } else if value >= self.threshold_hp {
            self.kind = FilterKind::HighPass;
            self.all_pass = false;
        } else {
            self.all_pass = true;
        }
    }

    fn sweep_finished(&self) -> bool {
        match self.kind {
            FilterKind::HighPass => self.filter_fc <= MIN_FC + 1.0,
            _ => self.filter_fc >= MAX_FC,
        }
    }

    pub fn curve(&self) -> Option<SweepCurve> {
        if self.all_pass {
            return None;
        }
        Some(SweepCurve {
            kind: self.kind,
            base: self.base,
            sample_rate: self.sample_rate,
        })
    }

    pub fn process(&mut self, input: f32) -> f32 {
        if self.all_pass || self.sweep_finished() {
            return input;
        }
        self.delta *= self.base;
        self.filter_fc = self.frequency + MIN_FC + self.delta;
        self.filter.set_params(self.filter_fc, self.filter_q, self.kind);
        self.filter.process(input)
    }
}
