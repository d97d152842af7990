use std::sync::{Arc, Mutex, mpsc};

use anyhow::{Result, anyhow};
use cpal::{
    SampleFormat, SizedSample, Stream,
    traits::{DeviceTrait, HostTrait, StreamTrait},
};
use log::{error, info, warn};

use crate::analysis::{AnalysisHandle, AnalysisJob};
use crate::buffers::{
    AdvControls, BufferBank, BufferId, Dimension, Direction, EngineToGui, GuiToEngine,
    NUM_DIMENSIONS, SharedBuffers,
};
use crate::config::AudioConfig;
use crate::note::{Note, NoteEvent};
use crate::touch::{TouchFrame, TouchProcessor};

pub type SharedPipeline = Arc<Mutex<SynthPipeline>>;

const DEFAULT_SAMPLE_RATE: f32 = 44_100.0;

/// Audio-side state: the voice plus its link to the panel's buffers.
pub struct SynthPipeline {
    note: Note,
    buffers: SharedBuffers,
    events: mpsc::Receiver<NoteEvent>,
    analysis: Option<AnalysisHandle>,
    touch: TouchProcessor,
    sample_rate: f32,
    gui_period: f32,
    frames_until_publish: usize,
    pending_sync: [Option<u8>; NUM_DIMENSIONS],
}

impl SynthPipeline {
    pub fn new(
        buffers: SharedBuffers,
        events: mpsc::Receiver<NoteEvent>,
        analysis: Option<AnalysisHandle>,
        config: &AudioConfig,
    ) -> Self {
        let note = Note::new(DEFAULT_SAMPLE_RATE);
        let pending_sync = note.timbre().map(Some);
        Self {
            note,
            buffers,
            events,
            analysis,
            touch: TouchProcessor::new(config.smoothing_cutoff_hz, config.touch_threshold),
            sample_rate: DEFAULT_SAMPLE_RATE,
            gui_period: config.gui_period_s,
            frames_until_publish: 0,
            pending_sync,
        }
    }

    pub fn set_sample_rate(&mut self, rate: f32) {
        self.sample_rate = rate.max(1.0);
        self.note.set_sample_rate(self.sample_rate);
    }

    /// Pulls panel input into the voice. Called once per audio callback.
    pub fn begin_block(&mut self, frames: usize) {
        let block_rate = self.sample_rate / frames.max(1) as f32;
        let buffers = Arc::clone(&self.buffers);
        let Ok(mut bank) = buffers.lock() else {
            return;
        };

        let taken = bank.take_timbre(Direction::ToEngine);
        for dimension in Dimension::ALL {
            if let Some(value) = taken[dimension.index()] {
                self.note.set_timbre(dimension, value);
            }
        }

        if let Some(controls) = AdvControls::from_buffer(bank.read(GuiToEngine::AdvControls)) {
            self.note.set_adv_mode(controls.adv_mode);
            self.note.set_adv_controls(&controls);
        }
        if let Some(settings) = bank.take_adv_spectrum() {
            self.note.update_adv_spectrum(&settings);
        }

        if let Some(frame) = TouchFrame::from_buffer(bank.read(GuiToEngine::Touch)) {
            let update = self.touch.process(&frame, block_rate);
            if let Some((spectrum, brightness)) = update.spectrum {
                self.apply_touch(Dimension::Spectrum, spectrum);
                self.apply_touch(Dimension::Brightness, brightness);
            }
            if let Some((articulation, envelope)) = update.dynamics {
                self.apply_touch(Dimension::Articulation, articulation);
                self.apply_touch(Dimension::Envelope, envelope);
            }
        }

        while let Ok(event) = self.events.try_recv() {
            if let Some(report) = self.note.handle_event(event) {
                write_or_warn(&mut bank, EngineToGui::Midi, &report);
            }
        }
    }

    fn apply_touch(&mut self, dimension: Dimension, value: u8) {
        self.note.set_timbre(dimension, value);
        self.pending_sync[dimension.index()] = Some(value);
    }

    fn publish_interval(&self) -> usize {
        ((self.gui_period * self.sample_rate).round() as usize).max(1)
    }

    pub fn next_sample(&mut self) -> f32 {
        if self.frames_until_publish == 0 {
            self.publish();
            self.frames_until_publish = self.publish_interval();
        }
        self.frames_until_publish -= 1;
        self.note.process()
    }

    /// Sends display state to the panel and schedules graph and FFT jobs.
    fn publish(&mut self) {
        {
            let Ok(mut bank) = self.buffers.lock() else {
                return;
            };
            for dimension in Dimension::ALL {
                if let Some(value) = self.pending_sync[dimension.index()].take() {
                    bank.set_timbre(Direction::ToGui, dimension, value);
                }
            }
            write_or_warn(
                &mut bank,
                EngineToGui::Envelope,
                &self.note.envelope_params().to_buffer(),
            );
            let fm = self.note.fm_settings();
            let shapes = fm.shapes.map(|shape| shape.index() as f32);
            write_or_warn(&mut bank, EngineToGui::FmAlgorithm, &[fm.algorithm.index() as f32]);
            write_or_warn(&mut bank, EngineToGui::FmRatios, &fm.ratios);
            write_or_warn(&mut bank, EngineToGui::FmAmps, &fm.amps);
            write_or_warn(&mut bank, EngineToGui::FmShapes, &shapes);
        }

        let mut jobs = vec![
            AnalysisJob::BrightnessResponse(self.note.brightness_response()),
            AnalysisJob::ArticulationCurve(self.note.articulation_curve()),
        ];
        if let Some(frame) = self.note.take_output_frame() {
            jobs.push(AnalysisJob::OutputFft(frame));
        }
        if let Some(frame) = self.note.take_spectrum_frame() {
            jobs.push(AnalysisJob::SpectrumFft(frame));
        }
        if let Some(handle) = &self.analysis {
            if jobs.into_iter().any(|job| handle.send(job).is_err()) {
                warn!("analysis worker stopped, graphs will no longer update");
                self.analysis = None;
            }
        }
    }
}

fn write_or_warn(bank: &mut BufferBank, id: impl Into<BufferId>, data: &[f32]) {
    if let Err(err) = bank.write(id, data) {
        warn!("{err}");
    }
}

pub struct AudioEngine {
    _stream: Stream,
    sample_rate: f32,
}

impl AudioEngine {
    pub fn start(pipeline: SharedPipeline) -> Result<Self> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| anyhow!("No default audio output"))?;
        let supported = device.default_output_config()?;
        let config = supported.config();
        let sample_rate = config.sample_rate.0 as f32;
        info!(
            "audio output: {} at {} Hz, {} channels, {:?}",
            device.name().unwrap_or_else(|_| "unknown device".to_string()),
            config.sample_rate.0,
            config.channels,
            supported.sample_format()
        );
        pipeline
            .lock()
            .map_err(|_| anyhow!("pipeline lock poisoned"))?
            .set_sample_rate(sample_rate);

        let stream = match supported.sample_format() {
            SampleFormat::I16 => build_stream(&device, &config, pipeline, to_i16)?,
            SampleFormat::U16 => build_stream(&device, &config, pipeline, to_u16)?,
            _ => build_stream(&device, &config, pipeline, to_f32)?,
        };
        stream.play()?;
        Ok(Self {
            _stream: stream,
            sample_rate,
        })
    }

    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }
}

fn to_f32(sample: f32) -> f32 {
    sample
}

fn to_i16(sample: f32) -> i16 {
    (sample * i16::MAX as f32) as i16
}

fn to_u16(sample: f32) -> u16 {
    let scaled = (sample * 0.5 + 0.5).clamp(0.0, 1.0);
    (scaled * u16::MAX as f32) as u16
}

fn build_stream<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    pipeline: SharedPipeline,
    convert: fn(f32) -> T,
) -> Result<Stream>
where
    T: SizedSample + Send + 'static,
{
    let channels = config.channels as usize;
    let stream = device.build_output_stream(
        config,
        move |output: &mut [T], _| {
            fill_output_buffer(output, channels, &pipeline, convert);
        },
        move |err| error!("audio stream error: {err}"),
        None,
    )?;
    Ok(stream)
}

fn fill_output_buffer<T>(
    output: &mut [T],
    channels: usize,
    pipeline: &SharedPipeline,
    convert: fn(f32) -> T,
) where
    T: Copy,
{
    let channels = channels.max(1);
    let Ok(mut pipe) = pipeline.lock() else {
        output.fill(convert(0.0));
        return;
    };
    pipe.begin_block(output.len() / channels);
    for frame in output.chunks_mut(channels) {
        let value = convert(pipe.next_sample().clamp(-0.98, 0.98));
        frame.fill(value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::touch::TouchPoint;

    fn pipeline() -> (SynthPipeline, SharedBuffers, mpsc::Sender<NoteEvent>) {
        let buffers = BufferBank::shared();
        let (tx, rx) = mpsc::channel();
        let mut pipeline = SynthPipeline::new(buffers.clone(), rx, None, &AudioConfig::default());
        pipeline.set_sample_rate(10_000.0);
        (pipeline, buffers, tx)
    }

    fn render(pipeline: &mut SynthPipeline, frames: usize) {
        pipeline.begin_block(frames);
        for _ in 0..frames {
            pipeline.next_sample();
        }
    }

    #[test]
    fn first_publish_syncs_initial_timbre() {
        let (mut pipeline, buffers, _tx) = pipeline();
        render(&mut pipeline, 1);
        let mut bank = buffers.lock().unwrap();
        assert_eq!(bank.take_timbre(Direction::ToGui), [Some(127); 4]);
        assert_eq!(bank.read(EngineToGui::FmAlgorithm), &[0.0]);
        assert_eq!(bank.read(EngineToGui::Envelope)[4], 0.0);
    }

    #[test]
    fn panel_values_reach_the_voice() {
        let (mut pipeline, buffers, _tx) = pipeline();
        buffers
            .lock()
            .unwrap()
            .set_timbre(Direction::ToEngine, Dimension::Envelope, 10);
        render(&mut pipeline, 64);
        assert_eq!(pipeline.note.timbre()[3], 10);
        assert_eq!(
            buffers.lock().unwrap().read(GuiToEngine::TimbreParams)[6],
            0.0,
            "flag cleared by the engine"
        );
    }

    #[test]
    fn note_events_update_the_midi_readout() {
        let (mut pipeline, buffers, tx) = pipeline();
        tx.send(NoteEvent::On { note: 64, velocity: 77 }).unwrap();
        render(&mut pipeline, 64);
        assert_eq!(buffers.lock().unwrap().read(EngineToGui::Midi), &[64.0, 77.0]);
        tx.send(NoteEvent::Off { note: 64 }).unwrap();
        render(&mut pipeline, 64);
        assert_eq!(buffers.lock().unwrap().read(EngineToGui::Midi), &[0.0, 0.0]);
    }

    #[test]
    fn touch_moves_dimensions_and_flags_the_panel() {
        let (mut pipeline, buffers, _tx) = pipeline();
        let frame = TouchFrame {
            dynamics: TouchPoint {
                x: 1.0,
                y: 0.0,
                size: 1.0,
            },
            ..TouchFrame::default()
        };
        buffers
            .lock()
            .unwrap()
            .write(GuiToEngine::Touch, &frame.to_buffer())
            .unwrap();
        // Enough blocks for the size smoother to cross the threshold,
        // and a publish period afterwards.
        for _ in 0..200 {
            render(&mut pipeline, 100);
        }
        assert_eq!(pipeline.note.timbre()[2], 0);
        assert_eq!(pipeline.note.timbre()[3], 255);
        let synced = buffers.lock().unwrap().take_timbre(Direction::ToGui);
        assert_eq!(synced[2], Some(0));
        assert_eq!(synced[3], Some(255));
    }

    #[test]
    fn advanced_mode_follows_the_controls_buffer() {
        let (mut pipeline, buffers, _tx) = pipeline();
        let controls = AdvControls {
            adv_mode: true,
            ..AdvControls::default()
        };
        buffers
            .lock()
            .unwrap()
            .write(GuiToEngine::AdvControls, &controls.to_buffer())
            .unwrap();
        render(&mut pipeline, 16);
        assert!(pipeline.note.is_adv_mode());
    }

    #[test]
    fn sample_conversion() {
        assert_eq!(to_i16(0.0), 0);
        assert_eq!(to_u16(-1.0), 0);
        assert_eq!(to_u16(1.0), u16::MAX);
        assert_eq!(to_f32(0.5), 0.5);
    }
}
