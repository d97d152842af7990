use std::sync::Arc;

use crate::operator::{Operator, Waveshape, Wavetables};

pub const NUM_OPERATORS: usize = 4;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Algorithm {
    #[default]
    Additive,
    DoubleStack22,
    DoubleStack31,
    DoubleStack33,
    TripleStack1,
    TripleStack2,
    FourStack,
}

/// Static routing of one algorithm.
///
/// `edges` are `(modulator, target)` pairs and always point from a higher
/// operator index to a lower one. `positions` are `(column, row)` cells with
/// the carriers on row 0.
#[derive(Debug)]
pub struct Topology {
    pub carriers: &'static [usize],
    pub edges: &'static [(usize, usize)],
    pub positions: [(f32, f32); NUM_OPERATORS],
}

static TOPOLOGIES: [Topology; 7] = [
    Topology {
        carriers: &[0, 1, 2, 3],
        edges: &[],
        positions: [(0.0, 0.0), (1.0, 0.0), (2.0, 0.0), (3.0, 0.0)],
    },
    Topology {
        carriers: &[0, 2],
        edges: &[(1, 0), (3, 2)],
        positions: [(0.0, 0.0), (0.0, 1.0), (1.0, 0.0), (1.0, 1.0)],
    },
    Topology {
        carriers: &[0, 1, 2],
        edges: &[(3, 2)],
        positions: [(0.0, 0.0), (1.0, 0.0), (2.0, 0.0), (2.0, 1.0)],
    },
    Topology {
        carriers: &[0, 1, 2],
        edges: &[(3, 0), (3, 1), (3, 2)],
        positions: [(0.0, 0.0), (1.0, 0.0), (2.0, 0.0), (1.0, 1.0)],
    },
    Topology {
        carriers: &[0],
        edges: &[(3, 0), (2, 1), (1, 0)],
        positions: [(0.5, 0.0), (0.0, 1.0), (0.0, 2.0), (1.0, 1.0)],
    },
    Topology {
        carriers: &[0],
        edges: &[(2, 1), (3, 1), (1, 0)],
        positions: [(0.5, 0.0), (0.5, 1.0), (0.0, 2.0), (1.0, 2.0)],
    },
    Topology {
        carriers: &[0],
        edges: &[(3, 2), (2, 1), (1, 0)],
        positions: [(0.0, 0.0), (0.0, 1.0), (0.0, 2.0), (0.0, 3.0)],
    },
];

impl Algorithm {
    pub const VALUES: [Algorithm; 7] = [
        Algorithm::Additive,
        Algorithm::DoubleStack22,
        Algorithm::DoubleStack31,
        Algorithm::DoubleStack33,
        Algorithm::TripleStack1,
        Algorithm::TripleStack2,
        Algorithm::FourStack,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Algorithm::Additive => "ADD",
            Algorithm::DoubleStack22 => "2x2",
            Algorithm::DoubleStack31 => "3+1",
            Algorithm::DoubleStack33 => "3/1",
            Algorithm::TripleStack1 => "T1",
            Algorithm::TripleStack2 => "T2",
            Algorithm::FourStack => "4ST",
        }
    }

    pub fn index(self) -> usize {
        Self::VALUES
            .iter()
            .position(|alg| *alg == self)
            .unwrap_or(0)
    }

    pub fn from_raw(raw: f32) -> Option<Self> {
        if !raw.is_finite() || raw < 0.0 {
            return None;
        }
        Self::VALUES.get(raw.round() as usize).copied()
    }

    pub fn topology(self) -> &'static Topology {
        &TOPOLOGIES[self.index()]
    }

    fn output_scale(self) -> f32 {
        1.0 / self.topology().carriers.len() as f32
    }
}

/// Everything needed to reproduce a `FreqMod` voice.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FmSettings {
    pub algorithm: Algorithm,
    pub ratios: [f32; NUM_OPERATORS],
    pub amps: [f32; NUM_OPERATORS],
    pub shapes: [Waveshape; NUM_OPERATORS],
}

impl Default for FmSettings {
    fn default() -> Self {
        Self {
            algorithm: Algorithm::Additive,
            ratios: [1.0; NUM_OPERATORS],
            amps: [4.0, 0.0, 0.0, 0.0],
            shapes: [Waveshape::Sine; NUM_OPERATORS],
        }
    }
}

impl FmSettings {
    pub const BUFFER_LEN: usize = 2 + 3 * NUM_OPERATORS;

    /// Layout `[flag, algorithm, ratio x4, amp x4, shape x4]`.
    pub fn to_buffer(&self, flag: bool) -> [f32; Self::BUFFER_LEN] {
        let mut data = [0.0; Self::BUFFER_LEN];
        data[0] = if flag { 1.0 } else { 0.0 };
        data[1] = self.algorithm.index() as f32;
        for op in 0..NUM_OPERATORS {
            data[2 + op] = self.ratios[op];
            data[2 + NUM_OPERATORS + op] = self.amps[op];
            data[2 + 2 * NUM_OPERATORS + op] = self.shapes[op].index() as f32;
        }
        data
    }

    /// Ignores the flag slot. Non-finite ratios and amplitudes become 0.
    pub fn from_buffer(data: &[f32]) -> Option<Self> {
        if data.len() != Self::BUFFER_LEN {
            return None;
        }
        let algorithm = Algorithm::from_raw(data[1])?;
        let mut settings = Self {
            algorithm,
            ..Self::default()
        };
        for op in 0..NUM_OPERATORS {
            settings.ratios[op] = finite_or_zero(data[2 + op]);
            settings.amps[op] = finite_or_zero(data[2 + NUM_OPERATORS + op]);
            settings.shapes[op] = Waveshape::from_raw(data[2 + 2 * NUM_OPERATORS + op])?;
        }
        Some(settings)
    }
}

fn finite_or_zero(value: f32) -> f32 {
    if value.is_finite() { value } else { 0.0 }
}

/// Four-operator phase-modulation voice.
pub struct FreqMod {
    operators: Vec<Operator>,
    settings: FmSettings,
    frequency: f32,
    modulation: [f32; NUM_OPERATORS],
}

impl FreqMod {
    pub fn new(sample_rate: f32, frequency: f32) -> Self {
        let tables: Arc<Wavetables> = Wavetables::shared();
        let operators = (0..NUM_OPERATORS)
            .map(|_| Operator::new(sample_rate, Arc::clone(&tables)))
            .collect();
        let mut fm = Self {
            operators,
            settings: FmSettings::default(),
            frequency,
            modulation: [0.0; NUM_OPERATORS],
        };
        fm.apply(&FmSettings::default());
        fm
    }

    pub fn set_sample_rate(&mut self, rate: f32) {
        for op in &mut self.operators {
            op.set_sample_rate(rate);
        }
    }

    pub fn set_frequency(&mut self, frequency: f32) {
        self.frequency = frequency;
        for (op, ratio) in self.operators.iter_mut().zip(self.settings.ratios) {
            op.set_frequency(ratio * frequency);
        }
    }

    pub fn reset(&mut self) {
        for op in &mut self.operators {
            op.reset();
        }
    }

    pub fn set_ratios(&mut self, ratios: [f32; NUM_OPERATORS]) {
        self.settings.ratios = ratios;
        self.set_frequency(self.frequency);
    }

    pub fn set_amplitudes(&mut self, amps: [f32; NUM_OPERATORS]) {
        self.settings.amps = amps;
        for (op, amp) in self.operators.iter_mut().zip(amps) {
            op.set_amplitude(amp);
        }
    }

    pub fn set_shapes(&mut self, shapes: [Waveshape; NUM_OPERATORS]) {
        self.settings.shapes = shapes;
        for (op, shape) in self.operators.iter_mut().zip(shapes) {
            op.set_shape(shape);
        }
    }

    pub fn set_spectrum(
        &mut self,
        amps: [f32; NUM_OPERATORS],
        ratios: [f32; NUM_OPERATORS],
        shapes: [Waveshape; NUM_OPERATORS],
    ) {
        self.set_amplitudes(amps);
        self.set_shapes(shapes);
        self.set_ratios(ratios);
    }

    pub fn set_algorithm(&mut self, algorithm: Algorithm) {
        self.settings.algorithm = algorithm;
    }

    pub fn apply(&mut self, settings: &FmSettings) {
        self.set_spectrum(settings.amps, settings.ratios, settings.shapes);
        self.set_algorithm(settings.algorithm);
    }

    pub fn settings(&self) -> FmSettings {
        self.settings
    }

    pub fn frequency(&self) -> f32 {
        self.frequency
    }

    pub fn process(&mut self) -> f32 {
        let algorithm = self.settings.algorithm;
        let topology = algorithm.topology();
        self.modulation = [0.0; NUM_OPERATORS];

        let mut output = 0.0;
        // Modulators always carry a higher index than their targets.
        for index in (0..NUM_OPERATORS).rev() {
            let input: f32 = topology
                .edges
                .iter()
                .filter(|(_, target)| *target == index)
                .map(|(source, _)| self.modulation[*source])
                .sum();
            let op = &mut self.operators[index];
            if topology.carriers.contains(&index) {
                // Every carrier is scaled by its amplitude, the stacked algorithms included.
                output += op.amplitude() * op.process(input);
            } else {
                self.modulation[index] = op.modulation_phase(input);
            }
        }
        output * algorithm.output_scale()
    }
}
