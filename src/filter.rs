use std::f32::consts::{PI, TAU};

use rustfft::num_complex::Complex;

pub const FRF_POINTS: usize = 60;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum FilterKind {
    #[default]
    LowPass,
    HighPass,
    BandPass,
}

/// Biquad coefficients, already divided by the leading denominator term.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Coefficients {
    pub a0: f32,
    pub a1: f32,
    pub a2: f32,
    pub b1: f32,
    pub b2: f32,
}

impl Coefficients {
    fn compute(kind: FilterKind, frequency: f32, q: f32, period: f32) -> Self {
        let w0 = TAU * frequency;
        let q_t2_w2 = q * period * period * w0 * w0;
        let inv_b0 = 1.0 / (4.0 * q + 2.0 * w0 * period + q_t2_w2);
        let b1 = (2.0 * q_t2_w2 - 8.0 * q) * inv_b0;
        let b2 = (4.0 * q + q_t2_w2 - 2.0 * w0 * period) * inv_b0;

        let (a0, a1, a2) = match kind {
            FilterKind::LowPass => {
                let a0 = q_t2_w2 * inv_b0;
                (a0, 2.0 * a0, a0)
            }
            FilterKind::HighPass => {
                let a0 = 4.0 * q * inv_b0;
                (a0, -2.0 * a0, a0)
            }
            FilterKind::BandPass => {
                let a0 = 2.0 * q * period * w0 * inv_b0;
                (a0, 0.0, -a0)
            }
        };
        Self { a0, a1, a2, b1, b2 }
    }

    /// Linear magnitude at `points` frequencies spread evenly over 0..=pi.
    pub fn response(&self, points: usize) -> Vec<f32> {
        let last = points.saturating_sub(1).max(1) as f32;
        (0..points)
            .map(|i| {
                let w = PI * i as f32 / last;
                let z1 = Complex::from_polar(1.0, -w);
                let z2 = Complex::from_polar(1.0, -2.0 * w);
                let numerator = Complex::new(self.a0, 0.0) + z1 * self.a1 + z2 * self.a2;
                let denominator = Complex::new(1.0, 0.0) + z1 * self.b1 + z2 * self.b2;
                numerator.norm() / denominator.norm()
            })
            .collect()
    }
}

/// Second-order IIR filter with a variable cutoff and Q.
pub struct Filter {
    kind: FilterKind,
    period: f32,
    frequency: f32,
    q: f32,
    coefficients: Option<Coefficients>,
    last_x: [f32; 2],
    last_y: [f32; 2],
}

impl Filter {
    pub fn new(sample_rate: f32) -> Self {
        Self {
            kind: FilterKind::LowPass,
            period: 1.0 / sample_rate.max(1.0),
            frequency: 1000.0,
            q: 0.707,
            coefficients: None,
            last_x: [0.0; 2],
            last_y: [0.0; 2],
        }
    }

    pub fn set_sample_rate(&mut self, rate: f32) {
        self.period = 1.0 / rate.max(1.0);
        if self.coefficients.is_some() {
            self.recalculate();
        }
    }

    pub fn set_params(&mut self, frequency: f32, q: f32, kind: FilterKind) {
        self.frequency = frequency.max(0.0);
        self.q = q.max(0.01);
        self.kind = kind;
        self.recalculate();
    }

    pub fn coefficients(&self) -> Option<Coefficients> {
        self.coefficients
    }

    fn recalculate(&mut self) {
        self.coefficients = Some(Coefficients::compute(
            self.kind,
            self.frequency,
            self.q,
            self.period,
        ));
    }

    pub fn reset(&mut self) {
        self.last_x = [0.0; 2];
        self.last_y = [0.0; 2];
    }

    pub fn process(&mut self, input: f32) -> f32 {
        let Some(c) = self.coefficients else {
            return input;
        };
        let out = input * c.a0 + self.last_x[0] * c.a1 + self.last_x[1] * c.a2
            - self.last_y[0] * c.b1
            - self.last_y[1] * c.b2;

        self.last_x = [input, self.last_x[0]];
        self.last_y = [out, self.last_y[0]];
        out
    }
}

/// One-pole low-pass used for control-rate smoothing.
pub struct OnePole {
    b0: f32,
    a1: f32,
    state: f32,
}

impl OnePole {
    pub fn new(cutoff: f32, rate: f32) -> Self {
        let mut pole = Self {
            b0: 1.0,
            a1: 0.0,
            state: 0.0,
        };
        pole.set_cutoff(cutoff, rate);
        pole
    }

    pub fn set_cutoff(&mut self, cutoff: f32, rate: f32) {
        self.a1 = (-TAU * cutoff / rate.max(f32::EPSILON)).exp();
        self.b0 = 1.0 - self.a1;
    }

    pub fn reset(&mut self, value: f32) {
        self.state = value;
    }

    pub fn value(&self) -> f32 {
        self.state
    }

    pub fn process(&mut self, input: f32) -> f32 {
        self.state = self.b0 * input + self.a1 * self.state;
        self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn sine_gain(filter: &mut Filter, frequency: f32, sample_rate: f32) -> f32 {
        let frames = (sample_rate * 0.2) as usize;
        let mut peak: f32 = 0.0;
        for n in 0..frames {
            let x = (TAU * frequency * n as f32 / sample_rate).sin();
            let y = filter.process(x);
            if n > frames / 2 {
                peak = peak.max(y.abs());
            }
        }
        peak
    }

    #[test]
    fn unconfigured_filter_passes_input() {
        let mut filter = Filter::new(44_100.0);
        assert_eq!(filter.process(0.3), 0.3);
        assert!(filter.coefficients().is_none());
    }

    #[test]
    fn low_pass_attenuates_above_cutoff() {
        let sample_rate = 44_100.0;
        let mut filter = Filter::new(sample_rate);
        filter.set_params(500.0, 0.707, FilterKind::LowPass);
        let pass = sine_gain(&mut filter, 100.0, sample_rate);
        filter.reset();
        let stop = sine_gain(&mut filter, 8_000.0, sample_rate);
        assert!(pass > 0.9, "pass {pass}");
        assert!(stop < 0.05, "stop {stop}");
    }

    #[test]
    fn high_pass_attenuates_below_cutoff() {
        let sample_rate = 44_100.0;
        let mut filter = Filter::new(sample_rate);
        filter.set_params(2_000.0, 0.707, FilterKind::HighPass);
        let stop = sine_gain(&mut filter, 100.0, sample_rate);
        filter.reset();
        let pass = sine_gain(&mut filter, 10_000.0, sample_rate);
        assert!(stop < 0.05, "stop {stop}");
        assert!(pass > 0.8, "pass {pass}");
    }

    #[test]
    fn response_matches_filter_shape() {
        let mut filter = Filter::new(44_100.0);
        filter.set_params(1_000.0, 0.707, FilterKind::LowPass);
        let response = filter.coefficients().unwrap().response(FRF_POINTS);
        assert_eq!(response.len(), FRF_POINTS);
        assert_abs_diff_eq!(response[0], 1.0, epsilon = 1e-3);
        assert!(response[FRF_POINTS - 1] < 1e-3);

        filter.set_params(1_000.0, 0.707, FilterKind::BandPass);
        let response = filter.coefficients().unwrap().response(FRF_POINTS);
        assert!(response[0] < 1e-3);
        assert!(response.iter().cloned().fold(0.0, f32::max) > 0.5);
    }

    #[test]
    fn one_pole_converges_to_input() {
        let mut pole = OnePole::new(10.0, 1_000.0);
        for _ in 0..1_000 {
            pole.process(1.0);
        }
        assert_abs_diff_eq!(pole.value(), 1.0, epsilon = 1e-4);
        pole.reset(0.0);
        let first = pole.process(1.0);
        assert!(first > 0.0 && first < 0.1);
    }
}
