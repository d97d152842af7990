use std::f32::consts::TAU;
use std::sync::{Arc, mpsc};

use log::{debug, warn};
use rustfft::num_complex::Complex;
use rustfft::{Fft, FftPlanner};
use tokio::runtime::Runtime;

use crate::articulation::{ARTICULATION_GRAPH_POINTS, SweepCurve};
use crate::buffers::{EngineToGui, SharedBuffers};
use crate::filter::{Coefficients, FRF_POINTS};

const DB_FLOOR: f32 = -60.0;
const DB_SPAN: f32 = 80.0;
const MAGNITUDE_FLOOR: f32 = 0.001;

/// Graph value drawn while brightness is all-pass (0 dB).
pub const FLAT_RESPONSE: f32 = 0.75;
/// Graph value drawn while articulation is all-pass.
pub const FLAT_SWEEP: f32 = 1.0;

/// Work handed from the audio callback to the analysis worker.
pub enum AnalysisJob {
    OutputFft(Vec<f32>),
    SpectrumFft(Vec<f32>),
    BrightnessResponse(Option<Coefficients>),
    ArticulationCurve(Option<SweepCurve>),
}

pub type AnalysisHandle = mpsc::Sender<AnalysisJob>;

/// Maps a linear magnitude onto the panel's `[-60, 20] dB -> [0, 1]` scale.
pub fn normalized_db(magnitude: f32) -> f32 {
    let db = if magnitude > MAGNITUDE_FLOOR {
        20.0 * magnitude.log10()
    } else {
        DB_FLOOR
    };
    (db - DB_FLOOR) / DB_SPAN
}

pub fn hann_window(size: usize) -> Vec<f32> {
    let last = size.saturating_sub(1).max(1) as f32;
    (0..size)
        .map(|n| 0.5 * (1.0 - (TAU * n as f32 / last).cos()))
        .collect()
}

/// Windowed magnitude spectrum of fixed-size frames.
pub struct SpectrumAnalyzer {
    fft: Arc<dyn Fft<f32>>,
    window: Vec<f32>,
    buffer: Vec<Complex<f32>>,
}

impl SpectrumAnalyzer {
    pub fn new(size: usize) -> Self {
        let mut planner = FftPlanner::<f32>::new();
        Self {
            fft: planner.plan_fft_forward(size),
            window: hann_window(size),
            buffer: vec![Complex::new(0.0, 0.0); size],
        }
    }

    pub fn size(&self) -> usize {
        self.window.len()
    }

    /// Returns `size / 2` normalised bins. Short frames are zero padded.
    pub fn analyze(&mut self, samples: &[f32]) -> Vec<f32> {
        let size = self.size();
        for (idx, slot) in self.buffer.iter_mut().enumerate() {
            let sample = samples.get(idx).copied().unwrap_or(0.0);
            *slot = Complex::new(sample * self.window[idx], 0.0);
        }
        self.fft.process(&mut self.buffer);
        let scale = 4.0 / size as f32;
        self.buffer[..size / 2]
            .iter()
            .map(|c| normalized_db(c.norm() * scale))
            .collect()
    }
}

/// Computes the buffer a job produces.
pub fn run_job(analyzer: &mut SpectrumAnalyzer, job: AnalysisJob) -> (EngineToGui, Vec<f32>) {
    match job {
        AnalysisJob::OutputFft(frame) => (EngineToGui::OutputFft, analyzer.analyze(&frame)),
        AnalysisJob::SpectrumFft(frame) => (EngineToGui::SpectrumFft, analyzer.analyze(&frame)),
        AnalysisJob::BrightnessResponse(coefficients) => {
            let data = match coefficients {
                Some(c) => c.response(FRF_POINTS).into_iter().map(normalized_db).collect(),
                None => vec![FLAT_RESPONSE],
            };
            (EngineToGui::BrightnessFrf, data)
        }
        AnalysisJob::ArticulationCurve(curve) => {
            let data = match curve {
                Some(curve) => curve.points(ARTICULATION_GRAPH_POINTS),
                None => vec![FLAT_SWEEP],
            };
            (EngineToGui::Articulation, data)
        }
    }
}

/// Starts the worker that turns analysis jobs into engine-to-panel buffers.
pub fn spawn_analysis(runtime: &Runtime, buffers: SharedBuffers, fft_size: usize) -> AnalysisHandle {
    let (tx, rx) = mpsc::channel::<AnalysisJob>();

    runtime.spawn_blocking(move || {
        let mut analyzer = SpectrumAnalyzer::new(fft_size);
        while let Ok(job) = rx.recv() {
            let (id, data) = run_job(&mut analyzer, job);
            let Ok(mut bank) = buffers.lock() else {
                warn!("buffer bank poisoned, stopping analysis worker");
                break;
            };
            if let Err(err) = bank.write(id, &data) {
                warn!("dropping analysis result: {err}");
            }
        }
        debug!("analysis worker finished");
    });

    tx
}
