use log::{debug, warn};
use macroquad::prelude::*;

use crate::adv_controls::{self, AdvChanges, AdvControlsLayout, AdvControlsView};
use crate::buffers::{BufferBank, BufferId, Dimension, Direction, EngineToGui, GuiToEngine};
use crate::config::Preset;
use crate::envelope::EnvelopeParams;
use crate::fft_display::draw_fft_display;
use crate::freq_mod::{FmSettings, NUM_OPERATORS};
use crate::graph::{draw_curve_graph, draw_envelope_graph};
use crate::layout::PanelLayout;
use crate::other_controls::{self, OtherControls, OtherControlsLayout};
use crate::space::Space;
use crate::touch::TouchFrame;
use crate::widgets::{AMBER_DIM, BACKGROUND, Pointer, draw_label, font_size};

/// Engine buffers copied out of the bank once per frame.
#[derive(Default)]
struct EngineView {
    midi: Vec<f32>,
    spectrum_fft: Vec<f32>,
    output_fft: Vec<f32>,
    brightness: Vec<f32>,
    articulation: Vec<f32>,
    envelope: Option<EnvelopeParams>,
    fm: Option<FmSettings>,
}

fn copy_into(target: &mut Vec<f32>, bank: &BufferBank, id: impl Into<BufferId>) {
    target.clear();
    target.extend_from_slice(bank.read(id));
}

/// Reassembles the engine's FM buffers into one setting. `None` until the
/// engine has published, while the buffers are still zero-filled.
pub fn engine_fm_settings(bank: &BufferBank) -> Option<FmSettings> {
    let mut data = vec![0.0];
    data.extend_from_slice(bank.read(EngineToGui::FmAlgorithm));
    data.extend_from_slice(bank.read(EngineToGui::FmRatios));
    data.extend_from_slice(bank.read(EngineToGui::FmAmps));
    data.extend_from_slice(bank.read(EngineToGui::FmShapes));
    if data.len() != 2 + 3 * NUM_OPERATORS {
        return None;
    }
    FmSettings::from_buffer(&data).filter(|fm| fm.ratios.iter().any(|ratio| *ratio != 0.0))
}

/// All views of the window and their exchange with the buffer bank.
pub struct Panel {
    layout: PanelLayout,
    other_layout: OtherControlsLayout,
    adv_layout: AdvControlsLayout,
    spectrum_space: Space,
    dynamics_space: Space,
    other: OtherControls,
    adv: AdvControlsView,
    engine: EngineView,
    sample_rate: f32,
    touch: TouchFrame,
    pending: Vec<(Dimension, u8)>,
    adv_changes: AdvChanges,
    controls_dirty: bool,
}

impl Panel {
    pub fn new(width: f32, height: f32, presets: Vec<Preset>, sample_rate: f32) -> Self {
        let layout = PanelLayout::compute(width, height);
        let other_layout = other_controls::layout(layout.lower_right, presets.len());
        let adv_layout = adv_controls::layout(layout.lower_left);
        Self {
            layout,
            other_layout,
            adv_layout,
            spectrum_space: Space::new("SPECTRUM SPACE", "SPECTRUM", "BRIGHTNESS"),
            dynamics_space: Space::new("DYNAMICS SPACE", "ARTICULATION", "ENVELOPE"),
            other: OtherControls::new(presets),
            adv: AdvControlsView::new(),
            engine: EngineView::default(),
            sample_rate,
            touch: TouchFrame::default(),
            pending: Vec::new(),
            adv_changes: AdvChanges::default(),
            controls_dirty: true,
        }
    }

    pub fn resize(&mut self, width: f32, height: f32) {
        if self.layout.width == width && self.layout.height == height {
            return;
        }
        debug!("layout for {width}x{height}");
        self.layout = PanelLayout::compute(width, height);
        self.other_layout = other_controls::layout(self.layout.lower_right, self.other.presets().len());
        self.adv_layout = adv_controls::layout(self.layout.lower_left);
    }

    pub fn is_typing(&self) -> bool {
        self.other.show_advanced() && self.adv.is_typing()
    }

    pub fn values(&self) -> [u8; 4] {
        self.other.values()
    }

    /// Reads everything the engine published since the last frame.
    pub fn pull(&mut self, bank: &mut BufferBank) {
        let synced = bank.take_timbre(Direction::ToGui);
        for dimension in Dimension::ALL {
            if let Some(value) = synced[dimension.index()] {
                self.other.sync(dimension, value);
            }
        }

        copy_into(&mut self.engine.midi, bank, EngineToGui::Midi);
        copy_into(&mut self.engine.spectrum_fft, bank, EngineToGui::SpectrumFft);
        copy_into(&mut self.engine.output_fft, bank, EngineToGui::OutputFft);
        copy_into(&mut self.engine.brightness, bank, EngineToGui::BrightnessFrf);
        copy_into(&mut self.engine.articulation, bank, EngineToGui::Articulation);
        self.engine.envelope = EnvelopeParams::from_buffer(bank.read(EngineToGui::Envelope));
        self.engine.fm = engine_fm_settings(bank);

        if !self.other.show_advanced() {
            if let Some(fm) = self.engine.fm {
                self.adv.mirror(&fm, self.engine.envelope.as_ref());
            }
        }
    }

    pub fn update(&mut self, pointer: &Pointer) {
        self.pending = self.other.update(pointer, &self.other_layout);
        self.touch = TouchFrame {
            spectrum: self.spectrum_space.update(pointer, self.layout.spectrum_pad),
            dynamics: self.dynamics_space.update(pointer, self.layout.dynamics_pad),
        };
        let show_advanced = self.other.show_advanced();
        if show_advanced != self.adv.controls().adv_mode {
            debug!("advanced mode {}", if show_advanced { "on" } else { "off" });
            self.adv.set_adv_mode(show_advanced);
            self.controls_dirty = true;
        }
        self.adv_changes = if show_advanced {
            self.adv.update(pointer, &self.adv_layout)
        } else {
            AdvChanges::default()
        };
        self.controls_dirty |= self.adv_changes.controls;
    }

    /// Writes this frame's user input for the engine.
    pub fn push(&mut self, bank: &mut BufferBank) {
        for (dimension, value) in self.pending.drain(..) {
            bank.set_timbre(Direction::ToEngine, dimension, value);
        }
        if let Err(err) = bank.write(GuiToEngine::Touch, &self.touch.to_buffer()) {
            warn!("{err}");
        }
        if self.controls_dirty {
            match bank.write(GuiToEngine::AdvControls, &self.adv.controls().to_buffer()) {
                Ok(()) => self.controls_dirty = false,
                Err(err) => warn!("{err}"),
            }
        }
        if self.adv_changes.spectrum {
            bank.set_adv_spectrum(&self.adv.fm_settings());
        }
    }

    pub fn draw(&self, status: &str) {
        clear_background(BACKGROUND);
        let layout = &self.layout;
        let scale = layout.scale;
        let values = self.other.values();

        self.spectrum_space.draw(
            layout.spectrum_pad,
            values[Dimension::Spectrum.index()],
            values[Dimension::Brightness.index()],
            scale,
        );
        self.dynamics_space.draw(
            layout.dynamics_pad,
            values[Dimension::Articulation.index()],
            values[Dimension::Envelope.index()],
            scale,
        );

        draw_fft_display(
            layout.graphs[0],
            "SPECTRUM",
            &self.engine.spectrum_fft,
            self.sample_rate,
            scale,
        );
        draw_curve_graph(layout.graphs[1], "BRIGHTNESS", &self.engine.brightness, scale);
        draw_curve_graph(layout.graphs[2], "ARTICULATION", &self.engine.articulation, scale);
        match &self.engine.envelope {
            Some(params) => draw_envelope_graph(layout.graphs[3], "ENVELOPE", params, scale),
            None => draw_curve_graph(layout.graphs[3], "ENVELOPE", &[], scale),
        }

        if self.other.show_advanced() {
            self.adv.draw(layout.lower_left, &self.adv_layout, scale);
        } else {
            draw_fft_display(
                layout.lower_left,
                "OUTPUT",
                &self.engine.output_fft,
                self.sample_rate,
                scale,
            );
        }
        self.other
            .draw(layout.lower_right, &self.other_layout, &self.engine.midi, scale);

        let size = font_size(14.0, scale);
        draw_label(
            status,
            layout.status.x,
            layout.status.y + layout.status.h * 0.5 + size as f32 * 0.3,
            size,
            AMBER_DIM,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffers::AdvControls;
    use crate::config::Config;
    use crate::freq_mod::Algorithm;

    fn panel() -> (Panel, BufferBank) {
        (
            Panel::new(1280.0, 800.0, Config::default().presets, 44_100.0),
            BufferBank::new(),
        )
    }

    fn click(pos: Vec2) -> Pointer {
        Pointer {
            pos,
            pressed: true,
            down: true,
            released: false,
        }
    }

    #[test]
    fn engine_sync_moves_the_sliders_once() {
        let (mut panel, mut bank) = panel();
        bank.set_timbre(Direction::ToGui, Dimension::Brightness, 30);
        panel.pull(&mut bank);
        assert_eq!(panel.values()[1], 30);
        assert_eq!(bank.take_timbre(Direction::ToGui), [None; 4]);
    }

    #[test]
    fn slider_drag_reaches_the_engine_buffer() {
        let (mut panel, mut bank) = panel();
        let slider = panel.other_layout.sliders[0];
        panel.update(&click(vec2(slider.right(), slider.center().y)));
        panel.push(&mut bank);
        let taken = bank.take_timbre(Direction::ToEngine);
        assert_eq!(taken[0], Some(255));
        assert_eq!(taken[1], None);
    }

    #[test]
    fn pad_drag_writes_touch_buffer() {
        let (mut panel, mut bank) = panel();
        let pad = panel.layout.dynamics_pad;
        panel.update(&click(pad.center()));
        panel.push(&mut bank);
        let frame = TouchFrame::from_buffer(bank.read(GuiToEngine::Touch)).unwrap();
        assert_eq!(frame.dynamics.size, 1.0);
        assert_eq!(frame.spectrum.size, 0.0);
    }

    #[test]
    fn advanced_toggle_sets_adv_mode() {
        let (mut panel, mut bank) = panel();
        panel.update(&click(panel.other_layout.adv_toggle.center()));
        panel.push(&mut bank);
        assert_eq!(bank.read(GuiToEngine::AdvControls)[0], 1.0);

        let algorithm = panel.adv_layout.algorithms[4];
        panel.update(&click(algorithm.center()));
        panel.push(&mut bank);
        let settings = bank.take_adv_spectrum().unwrap();
        assert_eq!(settings.algorithm, Algorithm::TripleStack1);
    }

    #[test]
    fn editor_mirrors_engine_while_hidden() {
        let (mut panel, mut bank) = panel();
        bank.write(EngineToGui::FmAlgorithm, &[3.0]).unwrap();
        bank.write(EngineToGui::FmRatios, &[1.0, 2.0, 3.0, 4.0]).unwrap();
        bank.write(EngineToGui::FmAmps, &[1.0, 0.5, 0.25, 0.0]).unwrap();
        bank.write(EngineToGui::FmShapes, &[0.0, 1.0, 2.0, 3.0]).unwrap();
        panel.pull(&mut bank);
        let fm = panel.adv.fm_settings();
        assert_eq!(fm.algorithm, Algorithm::DoubleStack33);
        assert_eq!(fm.ratios, [1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn editor_keeps_defaults_until_the_engine_publishes() {
        let (mut panel, mut bank) = panel();
        let before = (panel.adv.fm_settings(), panel.adv.controls());
        panel.pull(&mut bank);
        assert_eq!(engine_fm_settings(&bank), None);
        assert_eq!((panel.adv.fm_settings(), panel.adv.controls()), before);

        // Opening the editor without audio hands the defaults to the engine.
        panel.update(&click(panel.other_layout.adv_toggle.center()));
        panel.push(&mut bank);
        let controls = AdvControls::from_buffer(bank.read(GuiToEngine::AdvControls)).unwrap();
        assert!(controls.adv_mode);
        assert_eq!(controls.decay, before.1.decay);
        assert_eq!(controls.sustain, before.1.sustain);
        assert_eq!(controls.release, before.1.release);
    }

    #[test]
    fn mirrored_envelope_reaches_the_engine_when_advanced_opens() {
        let (mut panel, mut bank) = panel();
        bank.write(EngineToGui::FmAlgorithm, &[0.0]).unwrap();
        bank.write(EngineToGui::FmRatios, &[1.0, 2.0, 3.0, 4.0]).unwrap();
        bank.write(EngineToGui::FmAmps, &[4.0, 0.0, 0.0, 0.0]).unwrap();
        bank.write(EngineToGui::FmShapes, &[0.0; 4]).unwrap();
        let envelope = EnvelopeParams {
            attack: 0.01,
            decay: 0.8,
            sustain: 0.4,
            release: 0.3,
            constant_duration: false,
        };
        bank.write(EngineToGui::Envelope, &envelope.to_buffer()).unwrap();
        panel.pull(&mut bank);

        panel.update(&click(panel.other_layout.adv_toggle.center()));
        panel.push(&mut bank);
        let controls = AdvControls::from_buffer(bank.read(GuiToEngine::AdvControls)).unwrap();
        assert!(controls.adv_mode);
        assert_eq!(controls.decay, 0.8);
        assert_eq!(controls.sustain, 0.4);
        assert_eq!(controls.release, 0.3);
    }

    #[test]
    fn controls_buffer_is_written_only_on_change() {
        let (mut panel, mut bank) = panel();
        let idle = Pointer::default();
        panel.update(&idle);
        panel.push(&mut bank);
        bank.write(GuiToEngine::AdvControls, &[9.0; AdvControls::BUFFER_LEN]).unwrap();
        panel.update(&idle);
        panel.push(&mut bank);
        assert_eq!(bank.read(GuiToEngine::AdvControls)[0], 9.0);
    }

    #[test]
    fn resize_recomputes_views() {
        let (mut panel, _) = panel();
        let before = panel.other_layout.clone();
        panel.resize(1920.0, 1200.0);
        assert_ne!(panel.other_layout, before);
        assert_eq!(panel.layout, PanelLayout::compute(1920.0, 1200.0));
    }
}
