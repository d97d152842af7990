use macroquad::prelude::*;

use crate::graph::{draw_polyline, plot_area};
use crate::widgets::{AMBER, AMBER_DIM, GRID, draw_label, draw_section, font_size};

pub const MIN_DISPLAY_FREQ: f32 = 20.0;
const GRID_DB: [f32; 5] = [-60.0, -40.0, -20.0, 0.0, 20.0];
const MIN_DB: f32 = -60.0;
const MAX_DB: f32 = 20.0;
const FREQ_LABELS: [(f32, &str); 4] = [(100.0, "100"), (1_000.0, "1k"), (5_000.0, "5k"), (10_000.0, "10k")];

/// X position of `freq` on a log axis from 20 Hz to Nyquist.
pub fn frequency_x(freq: f32, nyquist: f32, rect: Rect) -> f32 {
    let span = (nyquist / MIN_DISPLAY_FREQ).ln();
    if span <= 0.0 || freq <= 0.0 {
        return rect.x;
    }
    let t = ((freq / MIN_DISPLAY_FREQ).ln() / span).clamp(0.0, 1.0);
    rect.x + rect.w * t
}

pub fn db_y(db: f32, rect: Rect) -> f32 {
    let t = ((db - MIN_DB) / (MAX_DB - MIN_DB)).clamp(0.0, 1.0);
    rect.y + rect.h * (1.0 - t)
}

/// Points for normalised bins covering 0 Hz to Nyquist. Bins below 20 Hz are skipped.
pub fn spectrum_points(bins: &[f32], sample_rate: f32, rect: Rect) -> Vec<Vec2> {
    let nyquist = sample_rate * 0.5;
    if bins.is_empty() || nyquist <= MIN_DISPLAY_FREQ {
        return Vec::new();
    }
    let bin_width = nyquist / bins.len() as f32;
    bins.iter()
        .enumerate()
        .filter_map(|(i, value)| {
            let freq = i as f32 * bin_width;
            if freq < MIN_DISPLAY_FREQ {
                return None;
            }
            let value = if value.is_finite() { value.clamp(0.0, 1.0) } else { 0.0 };
            Some(vec2(
                frequency_x(freq, nyquist, rect),
                rect.y + rect.h * (1.0 - value),
            ))
        })
        .collect()
}

pub fn draw_fft_display(rect: Rect, label: &str, bins: &[f32], sample_rate: f32, scale: f32) {
    draw_section(&rect, label, scale);
    let area = plot_area(rect);
    let nyquist = sample_rate * 0.5;
    let size = font_size(12.0, scale);

    for db in GRID_DB {
        let y = db_y(db, area);
        draw_line(area.x, y, area.right(), y, 0.5, GRID);
        draw_label(&format!("{db:.0}"), area.x + 2.0, y - 2.0, size, AMBER_DIM);
    }
    for (freq, text) in FREQ_LABELS {
        if freq >= nyquist {
            continue;
        }
        let x = frequency_x(freq, nyquist, area);
        draw_line(x, area.y, x, area.bottom(), 0.5, GRID);
        draw_label(text, x + 2.0, area.bottom() - 2.0, size, AMBER_DIM);
    }

    draw_polyline(&spectrum_points(bins, sample_rate, area), 1.5, AMBER);
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    const AREA: Rect = Rect {
        x: 0.0,
        y: 0.0,
        w: 300.0,
        h: 80.0,
    };

    #[test]
    fn log_axis_endpoints() {
        assert_eq!(frequency_x(20.0, 20_000.0, AREA), 0.0);
        assert_abs_diff_eq!(frequency_x(20_000.0, 20_000.0, AREA), 300.0, epsilon = 1e-3);
        // Three decades, one per third of the width.
        assert_abs_diff_eq!(frequency_x(200.0, 20_000.0, AREA), 100.0, epsilon = 1e-3);
        assert_eq!(frequency_x(5.0, 20_000.0, AREA), 0.0);
    }

    #[test]
    fn db_grid_maps_onto_height() {
        assert_eq!(db_y(20.0, AREA), 0.0);
        assert_eq!(db_y(-60.0, AREA), 80.0);
        assert_eq!(db_y(0.0, AREA), 20.0);
    }

    #[test]
    fn low_bins_are_skipped() {
        // 512 bins at 44.1 kHz are about 43 Hz wide, so only bin 0 is below 20 Hz.
        let bins = vec![0.5; 512];
        let points = spectrum_points(&bins, 44_100.0, AREA);
        assert_eq!(points.len(), 511);
        assert!(points.iter().all(|p| p.x >= 0.0 && p.x <= 300.0));
        assert!(points.windows(2).all(|w| w[0].x < w[1].x));
        assert_eq!(points[0].y, 40.0);
    }

    #[test]
    fn nothing_to_draw_without_bins() {
        assert!(spectrum_points(&[], 44_100.0, AREA).is_empty());
        assert!(spectrum_points(&[1.0; 8], 0.0, AREA).is_empty());
    }
}
