use std::f32::consts::TAU;
use std::sync::Arc;

pub const WAVETABLE_SIZE: usize = 512;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Waveshape {
    #[default]
    Sine,
    Triangle,
    Square,
    Saw,
}

impl Waveshape {
    pub const VALUES: [Waveshape; 4] = [
        Waveshape::Sine,
        Waveshape::Triangle,
        Waveshape::Square,
        Waveshape::Saw,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Waveshape::Sine => "SIN",
            Waveshape::Triangle => "TRI",
            Waveshape::Square => "SQR",
            Waveshape::Saw => "SAW",
        }
    }

    pub fn index(self) -> usize {
        match self {
            Waveshape::Sine => 0,
            Waveshape::Triangle => 1,
            Waveshape::Square => 2,
            Waveshape::Saw => 3,
        }
    }

    /// Decodes a shape index carried in a float buffer slot.
    pub fn from_raw(raw: f32) -> Option<Self> {
        if !raw.is_finite() || raw < 0.0 {
            return None;
        }
        Self::VALUES.get(raw.round() as usize).copied()
    }

    fn table_value(self, index: usize) -> f32 {
        let size = WAVETABLE_SIZE as f32;
        let position = index as f32;
        match self {
            Waveshape::Sine => (TAU * position / size).sin(),
            Waveshape::Triangle => {
                if index < WAVETABLE_SIZE / 2 {
                    4.0 * position / size - 1.0
                } else {
                    3.0 - 4.0 * position / size
                }
            }
            Waveshape::Square => {
                if index < WAVETABLE_SIZE / 2 {
                    1.0
                } else {
                    -1.0
                }
            }
            Waveshape::Saw => 2.0 * (size - position) / size - 1.0,
        }
    }
}

/// One cycle of every waveshape, shared by all operators of a voice.
pub struct Wavetables {
    tables: [Vec<f32>; 4],
}

impl Wavetables {
    pub fn new() -> Self {
        let tables = Waveshape::VALUES.map(|shape| {
            (0..WAVETABLE_SIZE)
                .map(|index| shape.table_value(index))
                .collect()
        });
        Self { tables }
    }

    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    pub fn table(&self, shape: Waveshape) -> &[f32] {
        &self.tables[shape.index()]
    }
}

/// Wavetable oscillator usable both as a carrier and as a phase modulator.
///
/// Phase is kept in table samples, so a modulation input is an offset in
/// samples rather than radians.
pub struct Operator {
    tables: Arc<Wavetables>,
    shape: Waveshape,
    sample_rate: f32,
    amplitude: f32,
    frequency: f32,
    phase: f32,
    phase_increment: f32,
    mod_amplitude: f32,
    last_output: f32,
}

impl Operator {
    pub fn new(sample_rate: f32, tables: Arc<Wavetables>) -> Self {
        let mut operator = Self {
            tables,
            shape: Waveshape::Sine,
            sample_rate: sample_rate.max(1.0),
            amplitude: 1.0,
            frequency: 440.0,
            phase: 0.0,
            phase_increment: 0.0,
            mod_amplitude: 0.0,
            last_output: 0.0,
        };
        operator.recalculate();
        operator
    }

    pub fn set_sample_rate(&mut self, rate: f32) {
        self.sample_rate = rate.max(1.0);
        self.recalculate();
    }

    /// Restarts the cycle from the top of the table.
    pub fn reset(&mut self) {
        self.phase = 0.0;
        self.last_output = 0.0;
    }

    pub fn set_amplitude(&mut self, amplitude: f32) {
        self.amplitude = amplitude;
        self.recalculate();
    }

    pub fn set_frequency(&mut self, frequency: f32) {
        self.frequency = frequency;
        self.recalculate();
    }

    pub fn set_shape(&mut self, shape: Waveshape) {
        self.shape = shape;
    }

    pub fn amplitude(&self) -> f32 {
        self.amplitude
    }

    #[cfg(test)]
    pub(crate) fn frequency(&self) -> f32 {
        self.frequency
    }

    fn recalculate(&mut self) {
        let length = WAVETABLE_SIZE as f32;
        self.phase_increment = self.frequency * length / self.sample_rate;
        self.mod_amplitude = self.amplitude * length / TAU;
    }

    /// Next sample, with `modulation` added to the phase increment.
    pub fn process(&mut self, modulation: f32) -> f32 {
        if self.amplitude == 0.0 {
            return 0.0;
        }
        let length = WAVETABLE_SIZE as f32;
        self.phase = (self.phase + self.phase_increment + modulation).rem_euclid(length);
        if !self.phase.is_finite() || self.phase >= length {
            self.phase = 0.0;
        }

        let table = self.tables.table(self.shape);
        let below = self.phase.floor() as usize % WAVETABLE_SIZE;
        let above = (below + 1) % WAVETABLE_SIZE;
        let fraction = self.phase - self.phase.floor();
        (1.0 - fraction) * table[below] + fraction * table[above]
    }

    /// Phase offset this operator contributes when it modulates another one.
    pub fn modulation_phase(&mut self, modulation: f32) -> f32 {
        let value = self.process(modulation);
        let delta = value - self.last_output;
        self.last_output = value;
        self.mod_amplitude * delta
    }
}
