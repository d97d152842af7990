use log::debug;
use macroquad::prelude::*;

use crate::block_diagram::draw_block_diagram;
use crate::buffers::AdvControls;
use crate::envelope::EnvelopeParams;
use crate::freq_mod::{Algorithm, FmSettings, NUM_OPERATORS};
use crate::layout::{columns, inset, rows};
use crate::operator::Waveshape;
use crate::widgets::{
    AMBER, Pointer, TextField, draw_button, draw_label, draw_section, draw_toggle_switch, font_size,
};

const CONTROL_FIELDS: usize = 5;
const FIELD_LABELS: [&str; CONTROL_FIELDS] = ["BRIGHT Q", "ARTIC Q", "DECAY s", "SUSTAIN", "RELEASE s"];
const FIELD_RANGES: [(f32, f32); CONTROL_FIELDS] =
    [(0.1, 20.0), (0.1, 20.0), (0.0, 10.0), (0.0, 1.0), (0.0, 10.0)];
const RATIO_RANGE: (f32, f32) = (0.0, 32.0);
const AMP_RANGE: (f32, f32) = (0.0, 10.0);
const NUM_SHAPES: usize = Waveshape::VALUES.len();
const NUM_ALGORITHMS: usize = Algorithm::VALUES.len();

#[derive(Clone, Debug, PartialEq)]
pub struct OperatorRow {
    pub label: Rect,
    pub ratio: Rect,
    pub amp: Rect,
    pub shapes: [Rect; NUM_SHAPES],
}

#[derive(Clone, Debug, PartialEq)]
pub struct AdvControlsLayout {
    pub link_toggle: Rect,
    pub fields: [Rect; CONTROL_FIELDS],
    pub operators: [OperatorRow; NUM_OPERATORS],
    pub algorithms: [Rect; NUM_ALGORITHMS],
    pub diagram: Rect,
}

fn field_in(cell: Rect) -> Rect {
    let h = (cell.h * 0.6).min(28.0);
    Rect::new(cell.x, cell.bottom() - h, cell.w, h)
}

pub fn layout(bounds: Rect) -> AdvControlsLayout {
    let inner = inset(bounds, bounds.w.min(bounds.h) * 0.05);
    let halves = columns(inner, 2, inner.w * 0.04);
    let (left, right) = (halves[0], halves[1]);

    let cells: Vec<Rect> = rows(left, 3, left.h * 0.04)
        .into_iter()
        .flat_map(|row| columns(row, 2, row.w * 0.06))
        .collect();
    let toggle_h = (cells[0].h * 0.4).min(24.0);
    let link_toggle = Rect::new(
        cells[0].x,
        cells[0].y + (cells[0].h - toggle_h) * 0.5,
        cells[0].w,
        toggle_h,
    );
    let fields = std::array::from_fn(|i| field_in(cells[i + 1]));

    let bands = rows(right, 2, right.h * 0.05);
    let op_rows = rows(bands[0], NUM_OPERATORS, bands[0].h * 0.06);
    let operators = std::array::from_fn(|i| {
        let row = op_rows[i];
        let gap = row.w * 0.02;
        let label = Rect::new(row.x, row.y, row.w * 0.12, row.h);
        let ratio = Rect::new(label.right() + gap, row.y, row.w * 0.18, row.h);
        let amp = Rect::new(ratio.right() + gap, row.y, row.w * 0.18, row.h);
        let shape_area = Rect::new(amp.right() + gap, row.y, row.right() - amp.right() - gap, row.h);
        let shapes = columns(shape_area, NUM_SHAPES, gap * 0.5);
        OperatorRow {
            label,
            ratio,
            amp,
            shapes: std::array::from_fn(|s| shapes[s]),
        }
    });

    let alg_band = bands[1];
    let button_h = alg_band.h * 0.2;
    let buttons = columns(
        Rect::new(alg_band.x, alg_band.y, alg_band.w, button_h),
        NUM_ALGORITHMS,
        alg_band.w * 0.01,
    );
    let diagram = Rect::new(
        alg_band.x,
        alg_band.y + button_h * 1.3,
        alg_band.w,
        alg_band.h - button_h * 1.3,
    );

    AdvControlsLayout {
        link_toggle,
        fields,
        operators,
        algorithms: std::array::from_fn(|i| buttons[i]),
        diagram,
    }
}

/// What an update changed, so the panel knows which buffers to write.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct AdvChanges {
    pub controls: bool,
    pub spectrum: bool,
}

/// Editor for the FM voice and the manual filter and envelope settings.
pub struct AdvControlsView {
    controls: AdvControls,
    fm: FmSettings,
    fields: [TextField; CONTROL_FIELDS],
    ratios: [TextField; NUM_OPERATORS],
    amps: [TextField; NUM_OPERATORS],
}

impl AdvControlsView {
    pub fn new() -> Self {
        let controls = AdvControls::default();
        let fm = FmSettings::default();
        let values = control_values(&controls);
        Self {
            controls,
            fm,
            fields: std::array::from_fn(|i| {
                TextField::new(values[i], FIELD_RANGES[i].0, FIELD_RANGES[i].1)
            }),
            ratios: std::array::from_fn(|i| TextField::new(fm.ratios[i], RATIO_RANGE.0, RATIO_RANGE.1)),
            amps: std::array::from_fn(|i| TextField::new(fm.amps[i], AMP_RANGE.0, AMP_RANGE.1)),
        }
    }

    pub fn controls(&self) -> AdvControls {
        self.controls
    }

    pub fn fm_settings(&self) -> FmSettings {
        self.fm
    }

    pub fn set_adv_mode(&mut self, on: bool) {
        self.controls.adv_mode = on;
    }

    pub fn is_typing(&self) -> bool {
        self.fields
            .iter()
            .chain(&self.ratios)
            .chain(&self.amps)
            .any(TextField::is_focused)
    }

    /// Follows the engine while advanced mode is off.
    pub fn mirror(&mut self, fm: &FmSettings, envelope: Option<&EnvelopeParams>) {
        self.fm = *fm;
        for op in 0..NUM_OPERATORS {
            self.ratios[op].set_value(fm.ratios[op]);
            self.amps[op].set_value(fm.amps[op]);
        }
        if let Some(envelope) = envelope {
            self.controls.decay = envelope.decay;
            self.controls.sustain = envelope.sustain;
            self.controls.release = envelope.release;
            self.fields[2].set_value(envelope.decay);
            self.fields[3].set_value(envelope.sustain);
            self.fields[4].set_value(envelope.release);
        }
    }

    fn set_control(&mut self, index: usize, value: f32) {
        let slot = match index {
            0 => &mut self.controls.brightness_q,
            1 => &mut self.controls.articulation_q,
            2 => &mut self.controls.decay,
            3 => &mut self.controls.sustain,
            _ => &mut self.controls.release,
        };
        *slot = value;
    }

    pub fn update(&mut self, pointer: &Pointer, layout: &AdvControlsLayout) -> AdvChanges {
        let mut changes = AdvChanges::default();

        if pointer.clicked(layout.link_toggle) {
            self.controls.midi_link = !self.controls.midi_link;
            changes.controls = true;
        }
        for index in 0..CONTROL_FIELDS {
            if let Some(value) = self.fields[index].update(pointer, layout.fields[index]) {
                self.set_control(index, value);
                changes.controls = true;
            }
        }

        for (op, row) in layout.operators.iter().enumerate() {
            if let Some(ratio) = self.ratios[op].update(pointer, row.ratio) {
                self.fm.ratios[op] = ratio;
                changes.spectrum = true;
            }
            if let Some(amp) = self.amps[op].update(pointer, row.amp) {
                self.fm.amps[op] = amp;
                changes.spectrum = true;
            }
            if let Some(shape) = row.shapes.iter().position(|rect| pointer.clicked(*rect)) {
                self.fm.shapes[op] = Waveshape::VALUES[shape];
                changes.spectrum = true;
            }
        }

        if let Some(index) = layout.algorithms.iter().position(|rect| pointer.clicked(*rect)) {
            self.fm.algorithm = Algorithm::VALUES[index];
            debug!("algorithm {}", self.fm.algorithm.label());
            changes.spectrum = true;
        }
        changes
    }

    pub fn draw(&self, bounds: Rect, layout: &AdvControlsLayout, scale: f32) {
        draw_section(&bounds, "ADVANCED", scale);
        draw_toggle_switch(layout.link_toggle, self.controls.midi_link, "MIDI LINK", scale);
        for (index, field) in self.fields.iter().enumerate() {
            field.draw(layout.fields[index], FIELD_LABELS[index], scale);
        }

        let size = font_size(14.0, scale);
        for (op, row) in layout.operators.iter().enumerate() {
            draw_label(
                &format!("OP{}", op + 1),
                row.label.x,
                row.label.y + row.label.h * 0.5 + size as f32 * 0.3,
                size,
                AMBER,
            );
            self.ratios[op].draw(row.ratio, if op == 0 { "RATIO" } else { "" }, scale);
            self.amps[op].draw(row.amp, if op == 0 { "AMP" } else { "" }, scale);
            for (shape, rect) in Waveshape::VALUES.iter().zip(&row.shapes) {
                draw_button(*rect, shape.label(), self.fm.shapes[op] == *shape, scale);
            }
        }

        for (algorithm, rect) in Algorithm::VALUES.iter().zip(&layout.algorithms) {
            draw_button(*rect, algorithm.label(), self.fm.algorithm == *algorithm, scale);
        }
        draw_block_diagram(self.fm.algorithm, layout.diagram, scale);
    }
}

impl Default for AdvControlsView {
    fn default() -> Self {
        Self::new()
    }
}

fn control_values(controls: &AdvControls) -> [f32; CONTROL_FIELDS] {
    [
        controls.brightness_q,
        controls.articulation_q,
        controls.decay,
        controls.sustain,
        controls.release,
    ]
}
