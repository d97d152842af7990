use log::debug;
use macroquad::prelude::*;

use crate::buffers::{Dimension, NUM_DIMENSIONS};
use crate::config::Preset;
use crate::controllers::note_name;
use crate::layout::{columns, inset, rows};
use crate::widgets::{
    AMBER, Pointer, draw_button, draw_label, draw_section, draw_slider, draw_toggle_switch,
    font_size, slider_value,
};

const PRESET_COLUMNS: usize = 4;

#[derive(Clone, Debug, PartialEq)]
pub struct OtherControlsLayout {
    pub sliders: [Rect; NUM_DIMENSIONS],
    pub presets: Vec<Rect>,
    pub adv_toggle: Rect,
    pub midi: Rect,
}

pub fn layout(bounds: Rect, preset_count: usize) -> OtherControlsLayout {
    let inner = inset(bounds, bounds.w.min(bounds.h) * 0.05);
    let bands = rows(inner, 3, inner.h * 0.04);
    let (slider_band, preset_band, footer) = (bands[0], bands[1], bands[2]);

    let slider_rows = rows(slider_band, NUM_DIMENSIONS, slider_band.h * 0.12);
    let sliders = std::array::from_fn(|i| {
        let row = slider_rows[i];
        // Leave the upper part of each row for the label.
        Rect::new(row.x, row.y + row.h * 0.45, row.w, row.h * 0.55)
    });

    let preset_rows = preset_count.div_ceil(PRESET_COLUMNS);
    let presets = rows(preset_band, preset_rows, preset_band.h * 0.08)
        .into_iter()
        .flat_map(|row| columns(row, PRESET_COLUMNS, row.w * 0.02))
        .take(preset_count)
        .collect();

    let footer_cols = columns(footer, 2, footer.w * 0.04);
    let toggle_h = (footer.h * 0.35).min(28.0);
    let adv_toggle = Rect::new(
        footer_cols[0].x,
        footer_cols[0].y + (footer.h - toggle_h) * 0.5,
        footer_cols[0].w,
        toggle_h,
    );

    OtherControlsLayout {
        sliders,
        presets,
        adv_toggle,
        midi: footer_cols[1],
    }
}

/// Dimension sliders, presets, the advanced toggle and the MIDI readout.
pub struct OtherControls {
    values: [u8; NUM_DIMENSIONS],
    dragging: Option<usize>,
    show_advanced: bool,
    presets: Vec<Preset>,
    selected_preset: Option<usize>,
}

impl OtherControls {
    pub fn new(presets: Vec<Preset>) -> Self {
        Self {
            values: [127; NUM_DIMENSIONS],
            dragging: None,
            show_advanced: false,
            presets,
            selected_preset: None,
        }
    }

    pub fn values(&self) -> [u8; NUM_DIMENSIONS] {
        self.values
    }

    pub fn value(&self, dimension: Dimension) -> u8 {
        self.values[dimension.index()]
    }

    pub fn presets(&self) -> &[Preset] {
        &self.presets
    }

    pub fn show_advanced(&self) -> bool {
        self.show_advanced
    }

    /// Takes a value synced from the engine. A slider being dragged keeps
    /// the user's value.
    pub fn sync(&mut self, dimension: Dimension, value: u8) {
        let index = dimension.index();
        if self.dragging != Some(index) {
            self.values[index] = value;
        }
    }

    /// Returns the dimension values the user changed this frame.
    pub fn update(&mut self, pointer: &Pointer, layout: &OtherControlsLayout) -> Vec<(Dimension, u8)> {
        let mut changes = Vec::new();

        if pointer.pressed {
            self.dragging = layout
                .sliders
                .iter()
                .position(|rect| grab_area(*rect).contains(pointer.pos));
        }
        if !pointer.down {
            self.dragging = None;
        }
        if let Some(index) = self.dragging {
            let value = slider_value(layout.sliders[index], pointer.pos.x);
            if value != self.values[index] {
                self.values[index] = value;
                self.selected_preset = None;
                changes.push((Dimension::ALL[index], value));
            }
        }

        if pointer.pressed {
            if let Some(index) = layout.presets.iter().position(|rect| rect.contains(pointer.pos)) {
                if let Some(preset) = self.presets.get(index) {
                    debug!("preset '{}' selected", preset.name);
                    self.values = preset.values();
                    self.selected_preset = Some(index);
                    changes.extend(Dimension::ALL.into_iter().zip(self.values));
                }
            }
            if pointer.clicked(layout.adv_toggle) {
                self.show_advanced = !self.show_advanced;
                debug!("advanced controls {}", if self.show_advanced { "shown" } else { "hidden" });
            }
        }
        changes
    }

    pub fn draw(&self, bounds: Rect, layout: &OtherControlsLayout, midi: &[f32], scale: f32) {
        draw_section(&bounds, "TIMBRE", scale);
        for (index, rect) in layout.sliders.iter().enumerate() {
            draw_slider(*rect, self.values[index], Dimension::ALL[index].label(), scale);
        }
        for (index, (rect, preset)) in layout.presets.iter().zip(&self.presets).enumerate() {
            draw_button(*rect, &preset.name, self.selected_preset == Some(index), scale);
        }
        draw_toggle_switch(layout.adv_toggle, self.show_advanced, "ADVANCED", scale);
        let size = font_size(16.0, scale);
        draw_label(
            &midi_readout(midi),
            layout.midi.x,
            layout.midi.y + layout.midi.h * 0.5 + size as f32 * 0.3,
            size,
            AMBER,
        );
    }
}

fn grab_area(rect: Rect) -> Rect {
    Rect::new(rect.x - 6.0, rect.y - 4.0, rect.w + 12.0, rect.h + 8.0)
}

/// Text for the `[note, velocity]` buffer. Zeros mean no key is held.
pub fn midi_readout(midi: &[f32]) -> String {
    match midi {
        [note, velocity] if *velocity > 0.0 && note.is_finite() => {
            let note = note.clamp(0.0, 127.0) as u8;
            format!("NOTE {} ({note})  VEL {velocity:.0}", note_name(note))
        }
        _ => "NOTE --  VEL --".to_string(),
    }
}
