use std::sync::{Arc, Mutex};

use thiserror::Error;

use crate::freq_mod::FmSettings;

pub const NUM_DIMENSIONS: usize = 4;
pub const FFT_BINS: usize = 512;
pub const GRAPH_POINTS: usize = 60;

/// One axis of the timbre space.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Dimension {
    Spectrum,
    Brightness,
    Articulation,
    Envelope,
}

impl Dimension {
    pub const ALL: [Dimension; NUM_DIMENSIONS] = [
        Dimension::Spectrum,
        Dimension::Brightness,
        Dimension::Articulation,
        Dimension::Envelope,
    ];

    pub fn index(self) -> usize {
        match self {
            Dimension::Spectrum => 0,
            Dimension::Brightness => 1,
            Dimension::Articulation => 2,
            Dimension::Envelope => 3,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Dimension::Spectrum => "Spectrum",
            Dimension::Brightness => "Brightness",
            Dimension::Articulation => "Articulation",
            Dimension::Envelope => "Envelope",
        }
    }
}

/// Buffers written by the panel and read by the engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum GuiToEngine {
    TimbreParams,
    AdvControls,
    AdvSpectrum,
    Touch,
}

impl GuiToEngine {
    pub const ALL: [GuiToEngine; 4] = [
        GuiToEngine::TimbreParams,
        GuiToEngine::AdvControls,
        GuiToEngine::AdvSpectrum,
        GuiToEngine::Touch,
    ];

    pub fn len(self) -> usize {
        match self {
            GuiToEngine::TimbreParams => 2 * NUM_DIMENSIONS,
            GuiToEngine::AdvControls => AdvControls::BUFFER_LEN,
            GuiToEngine::AdvSpectrum => FmSettings::BUFFER_LEN,
            GuiToEngine::Touch => 6,
        }
    }
}

/// Buffers written by the engine and read by the panel.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EngineToGui {
    TimbreParams,
    Midi,
    SpectrumFft,
    BrightnessFrf,
    Articulation,
    Envelope,
    OutputFft,
    FmAlgorithm,
    FmRatios,
    FmAmps,
    FmShapes,
}

impl EngineToGui {
    pub const ALL: [EngineToGui; 11] = [
        EngineToGui::TimbreParams,
        EngineToGui::Midi,
        EngineToGui::SpectrumFft,
        EngineToGui::BrightnessFrf,
        EngineToGui::Articulation,
        EngineToGui::Envelope,
        EngineToGui::OutputFft,
        EngineToGui::FmAlgorithm,
        EngineToGui::FmRatios,
        EngineToGui::FmAmps,
        EngineToGui::FmShapes,
    ];

    pub fn max_len(self) -> usize {
        match self {
            EngineToGui::TimbreParams => 2 * NUM_DIMENSIONS,
            EngineToGui::Midi => 2,
            EngineToGui::SpectrumFft | EngineToGui::OutputFft => FFT_BINS,
            EngineToGui::BrightnessFrf | EngineToGui::Articulation => GRAPH_POINTS,
            EngineToGui::Envelope => 5,
            EngineToGui::FmAlgorithm => 1,
            EngineToGui::FmRatios | EngineToGui::FmAmps | EngineToGui::FmShapes => 4,
        }
    }

    /// Graph slots shrink to one value when the curve is flat.
    pub fn is_variable(self) -> bool {
        matches!(self, EngineToGui::BrightnessFrf | EngineToGui::Articulation)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BufferId {
    ToEngine(GuiToEngine),
    ToGui(EngineToGui),
}

impl BufferId {
    pub fn name(self) -> String {
        match self {
            BufferId::ToEngine(id) => format!("to-engine {id:?}"),
            BufferId::ToGui(id) => format!("to-gui {id:?}"),
        }
    }
}

impl From<GuiToEngine> for BufferId {
    fn from(id: GuiToEngine) -> Self {
        BufferId::ToEngine(id)
    }
}

impl From<EngineToGui> for BufferId {
    fn from(id: EngineToGui) -> Self {
        BufferId::ToGui(id)
    }
}

/// Direction of a flagged timbre buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    ToEngine,
    ToGui,
}

impl Direction {
    fn timbre_buffer(self) -> BufferId {
        match self {
            Direction::ToEngine => GuiToEngine::TimbreParams.into(),
            Direction::ToGui => EngineToGui::TimbreParams.into(),
        }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum BufferError {
    /// A fixed-size buffer was written with the wrong number of values
    #[error("{name} expects {expected} values, got {actual}")]
    LengthMismatch {
        name: String,
        expected: usize,
        actual: usize,
    },

    /// A graph buffer was written with zero or too many values
    #[error("{name} accepts 1 to {max} values, got {actual}")]
    OutOfRange {
        name: String,
        max: usize,
        actual: usize,
    },
}

/// Settings of the advanced editor that are not part of the FM voice.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AdvControls {
    pub adv_mode: bool,
    pub midi_link: bool,
    pub brightness_q: f32,
    pub articulation_q: f32,
    pub decay: f32,
    pub sustain: f32,
    pub release: f32,
}

impl Default for AdvControls {
    fn default() -> Self {
        Self {
            adv_mode: false,
            midi_link: true,
            brightness_q: 1.0,
            articulation_q: 1.0,
            decay: 0.1,
            sustain: 0.9,
            release: 0.2,
        }
    }
}

impl AdvControls {
    pub const BUFFER_LEN: usize = 7;

    pub fn to_buffer(&self) -> [f32; Self::BUFFER_LEN] {
        [
            flag(self.adv_mode),
            flag(self.midi_link),
            self.brightness_q,
            self.articulation_q,
            self.decay,
            self.sustain,
            self.release,
        ]
    }

    /// Non-finite values keep their defaults.
    pub fn from_buffer(data: &[f32]) -> Option<Self> {
        let [adv_mode, midi_link, brightness_q, articulation_q, decay, sustain, release] = *data
        else {
            return None;
        };
        let defaults = Self::default();
        let pick = |value: f32, fallback: f32| if value.is_finite() { value } else { fallback };
        Some(Self {
            adv_mode: adv_mode == 1.0,
            midi_link: midi_link == 1.0,
            brightness_q: pick(brightness_q, defaults.brightness_q),
            articulation_q: pick(articulation_q, defaults.articulation_q),
            decay: pick(decay, defaults.decay),
            sustain: pick(sustain, defaults.sustain),
            release: pick(release, defaults.release),
        })
    }
}

fn flag(on: bool) -> f32 {
    if on { 1.0 } else { 0.0 }
}

/// Converts a buffer value to a dimension, truncating like the sensor mapping.
pub fn dimension_value(raw: f32) -> Option<u8> {
    if !raw.is_finite() {
        return None;
    }
    Some(raw.clamp(0.0, 255.0) as u8)
}

/// Every buffer exchanged between the panel and the engine.
pub struct BufferBank {
    to_engine: Vec<Vec<f32>>,
    to_gui: Vec<Vec<f32>>,
}

pub type SharedBuffers = Arc<Mutex<BufferBank>>;

impl Default for BufferBank {
    fn default() -> Self {
        Self::new()
    }
}

impl BufferBank {
    pub fn new() -> Self {
        Self {
            to_engine: GuiToEngine::ALL.iter().map(|id| vec![0.0; id.len()]).collect(),
            to_gui: EngineToGui::ALL.iter().map(|id| vec![0.0; id.max_len()]).collect(),
        }
    }

    pub fn shared() -> SharedBuffers {
        Arc::new(Mutex::new(Self::new()))
    }

    fn slot_mut(&mut self, id: BufferId) -> &mut Vec<f32> {
        match id {
            BufferId::ToEngine(id) => &mut self.to_engine[id as usize],
            BufferId::ToGui(id) => &mut self.to_gui[id as usize],
        }
    }

    pub fn read(&self, id: impl Into<BufferId>) -> &[f32] {
        match id.into() {
            BufferId::ToEngine(id) => &self.to_engine[id as usize],
            BufferId::ToGui(id) => &self.to_gui[id as usize],
        }
    }

    pub fn write(&mut self, id: impl Into<BufferId>, data: &[f32]) -> Result<(), BufferError> {
        let id = id.into();
        match id {
            BufferId::ToGui(gui) if gui.is_variable() => {
                if data.is_empty() || data.len() > gui.max_len() {
                    return Err(BufferError::OutOfRange {
                        name: id.name(),
                        max: gui.max_len(),
                        actual: data.len(),
                    });
                }
            }
            _ => {
                let expected = self.read(id).len();
                if data.len() != expected {
                    return Err(BufferError::LengthMismatch {
                        name: id.name(),
                        expected,
                        actual: data.len(),
                    });
                }
            }
        }
        let slot = self.slot_mut(id);
        slot.clear();
        slot.extend_from_slice(data);
        Ok(())
    }

    /// Stores a timbre value and raises its flag.
    pub fn set_timbre(&mut self, direction: Direction, dimension: Dimension, value: u8) {
        let slot = self.slot_mut(direction.timbre_buffer());
        let offset = 2 * dimension.index();
        slot[offset] = 1.0;
        slot[offset + 1] = value as f32;
    }

    /// Takes every flagged timbre value and clears the flags.
    pub fn take_timbre(&mut self, direction: Direction) -> [Option<u8>; NUM_DIMENSIONS] {
        let slot = self.slot_mut(direction.timbre_buffer());
        let mut taken = [None; NUM_DIMENSIONS];
        for dimension in Dimension::ALL {
            let offset = 2 * dimension.index();
            if slot[offset] == 1.0 {
                slot[offset] = 0.0;
                taken[dimension.index()] = dimension_value(slot[offset + 1]);
            }
        }
        taken
    }

    pub fn set_adv_spectrum(&mut self, settings: &FmSettings) {
        let slot = self.slot_mut(GuiToEngine::AdvSpectrum.into());
        slot.copy_from_slice(&settings.to_buffer(true));
    }

    /// Takes the editor's FM settings if they changed since the last take.
    pub fn take_adv_spectrum(&mut self) -> Option<FmSettings> {
        let slot = self.slot_mut(GuiToEngine::AdvSpectrum.into());
        if slot[0] != 1.0 {
            return None;
        }
        slot[0] = 0.0;
        FmSettings::from_buffer(slot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::freq_mod::Algorithm;

    #[test]
    fn new_bank_has_declared_lengths() {
        let bank = BufferBank::new();
        assert_eq!(bank.read(GuiToEngine::TimbreParams).len(), 8);
        assert_eq!(bank.read(GuiToEngine::AdvControls).len(), 7);
        assert_eq!(bank.read(GuiToEngine::AdvSpectrum).len(), 14);
        assert_eq!(bank.read(GuiToEngine::Touch).len(), 6);
        assert_eq!(bank.read(EngineToGui::SpectrumFft).len(), 512);
        assert_eq!(bank.read(EngineToGui::BrightnessFrf).len(), 60);
        assert!(bank.read(EngineToGui::Envelope).iter().all(|v| *v == 0.0));
    }

    #[test]
    fn writes_must_match_length() {
        let mut bank = BufferBank::new();
        assert!(bank.write(GuiToEngine::Touch, &[0.0; 6]).is_ok());
        let err = bank.write(GuiToEngine::Touch, &[0.0; 5]).unwrap_err();
        assert_eq!(
            err,
            BufferError::LengthMismatch {
                name: "to-engine Touch".to_string(),
                expected: 6,
                actual: 5,
            }
        );
    }

    #[test]
    fn graph_slots_accept_a_single_value() {
        let mut bank = BufferBank::new();
        bank.write(EngineToGui::BrightnessFrf, &[0.75]).unwrap();
        assert_eq!(bank.read(EngineToGui::BrightnessFrf), &[0.75]);
        bank.write(EngineToGui::BrightnessFrf, &[0.5; 60]).unwrap();
        assert_eq!(bank.read(EngineToGui::BrightnessFrf).len(), 60);
        assert!(bank.write(EngineToGui::Articulation, &[]).is_err());
        assert!(bank.write(EngineToGui::Articulation, &[1.0; 61]).is_err());
        assert!(bank.write(EngineToGui::Midi, &[60.0]).is_err());
    }

    #[test]
    fn reader_clears_flags() {
        let mut bank = BufferBank::new();
        bank.set_timbre(Direction::ToEngine, Dimension::Brightness, 200);
        bank.set_timbre(Direction::ToEngine, Dimension::Envelope, 3);
        assert_eq!(
            bank.read(GuiToEngine::TimbreParams),
            &[0.0, 0.0, 1.0, 200.0, 0.0, 0.0, 1.0, 3.0]
        );

        let taken = bank.take_timbre(Direction::ToEngine);
        assert_eq!(taken, [None, Some(200), None, Some(3)]);
        assert_eq!(bank.take_timbre(Direction::ToEngine), [None; 4]);
        assert_eq!(bank.take_timbre(Direction::ToGui), [None; 4]);
    }

    #[test]
    fn flagged_values_are_clamped() {
        let mut bank = BufferBank::new();
        bank.write(
            GuiToEngine::TimbreParams,
            &[1.0, 300.0, 1.0, -4.0, 1.0, f32::NAN, 0.0, 9.0],
        )
        .unwrap();
        assert_eq!(
            bank.take_timbre(Direction::ToEngine),
            [Some(255), Some(0), None, None]
        );
    }

    #[test]
    fn adv_spectrum_is_taken_once() {
        let mut bank = BufferBank::new();
        assert_eq!(bank.take_adv_spectrum(), None);
        let settings = FmSettings {
            algorithm: Algorithm::DoubleStack31,
            ..FmSettings::default()
        };
        bank.set_adv_spectrum(&settings);
        assert_eq!(bank.take_adv_spectrum(), Some(settings));
        assert_eq!(bank.take_adv_spectrum(), None);
    }

    #[test]
    fn adv_controls_buffer_layout() {
        let controls = AdvControls {
            adv_mode: true,
            midi_link: false,
            ..AdvControls::default()
        };
        let data = controls.to_buffer();
        assert_eq!(data, [1.0, 0.0, 1.0, 1.0, 0.1, 0.9, 0.2]);
        assert_eq!(AdvControls::from_buffer(&data), Some(controls));
        assert_eq!(AdvControls::from_buffer(&data[..3]), None);
    }
}
