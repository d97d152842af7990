use macroquad::prelude::*;

use crate::envelope::EnvelopeParams;
use crate::widgets::{AMBER, GRID, draw_section};

/// Share of the envelope plot given to the sustain plateau.
const SUSTAIN_SHARE: f32 = 0.25;

/// Maps `data` onto the plot area, one point per value, evenly spaced.
///
/// Values are clamped to `[0, 1]`. A single value is drawn as a flat line.
pub fn curve_points(data: &[f32], rect: Rect) -> Vec<Vec2> {
    let to_y = |v: f32| {
        let v = if v.is_finite() { v.clamp(0.0, 1.0) } else { 0.0 };
        rect.y + rect.h * (1.0 - v)
    };
    match data {
        [] => Vec::new(),
        [value] => vec![vec2(rect.x, to_y(*value)), vec2(rect.right(), to_y(*value))],
        _ => {
            let step = rect.w / (data.len() - 1) as f32;
            data.iter()
                .enumerate()
                .map(|(i, v)| vec2(rect.x + i as f32 * step, to_y(*v)))
                .collect()
        }
    }
}

/// Polyline of an ADSR shape, scaled so the whole envelope fills the width.
///
/// Percussive envelopes end after the decay; sustaining ones hold the
/// sustain level for a fixed share of the plot before the release.
pub fn envelope_points(params: &EnvelopeParams, rect: Rect) -> Vec<Vec2> {
    let attack = params.attack.max(0.0);
    let decay = params.decay.max(0.0);
    let release = params.release.max(0.0);
    let sustain = params.sustain.clamp(0.0, 1.0);

    let shape: Vec<(f32, f32)> = if params.constant_duration {
        vec![(0.0, 0.0), (attack, 1.0), (attack + decay, 0.0)]
    } else {
        let timed = attack + decay + release;
        let hold = timed * SUSTAIN_SHARE / (1.0 - SUSTAIN_SHARE);
        vec![
            (0.0, 0.0),
            (attack, 1.0),
            (attack + decay, sustain),
            (attack + decay + hold, sustain),
            (attack + decay + hold + release, 0.0),
        ]
    };

    let total = shape.last().map(|(t, _)| *t).unwrap_or(0.0);
    if total <= 0.0 {
        return curve_points(&[0.0], rect);
    }
    shape
        .into_iter()
        .map(|(t, level)| vec2(rect.x + rect.w * t / total, rect.y + rect.h * (1.0 - level)))
        .collect()
}

pub fn plot_area(rect: Rect) -> Rect {
    let pad = (rect.h * 0.08).min(8.0);
    Rect::new(rect.x + pad, rect.y + pad, rect.w - pad * 2.0, rect.h - pad * 2.0)
}

pub fn draw_polyline(points: &[Vec2], thickness: f32, color: Color) {
    for pair in points.windows(2) {
        draw_line(pair[0].x, pair[0].y, pair[1].x, pair[1].y, thickness, color);
    }
}

fn draw_frame(rect: Rect, label: &str, scale: f32) -> Rect {
    draw_section(&rect, label, scale);
    let area = plot_area(rect);
    for fraction in [0.25, 0.5, 0.75] {
        let y = area.y + area.h * fraction;
        draw_line(area.x, y, area.right(), y, 0.5, GRID);
    }
    area
}

pub fn draw_curve_graph(rect: Rect, label: &str, data: &[f32], scale: f32) {
    let area = draw_frame(rect, label, scale);
    draw_polyline(&curve_points(data, area), 2.0, AMBER);
}

pub fn draw_envelope_graph(rect: Rect, label: &str, params: &EnvelopeParams, scale: f32) {
    let area = draw_frame(rect, label, scale);
    draw_polyline(&envelope_points(params, area), 2.0, AMBER);
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    const AREA: Rect = Rect {
        x: 10.0,
        y: 20.0,
        w: 100.0,
        h: 50.0,
    };

    #[test]
    fn empty_data_draws_nothing() {
        assert!(curve_points(&[], AREA).is_empty());
    }

    #[test]
    fn single_value_is_a_flat_line() {
        let points = curve_points(&[0.75], AREA);
        assert_eq!(points, vec![vec2(10.0, 32.5), vec2(110.0, 32.5)]);
    }

    #[test]
    fn values_are_clamped_and_spread() {
        let points = curve_points(&[-1.0, 0.5, 2.0, f32::NAN, 1.0], AREA);
        assert_eq!(points.len(), 5);
        assert_eq!(points[0], vec2(10.0, 70.0));
        assert_eq!(points[1], vec2(35.0, 45.0));
        assert_eq!(points[2].y, 20.0);
        assert_eq!(points[3].y, 70.0);
        assert_eq!(points[4].x, 110.0);
    }

    #[test]
    fn sustaining_envelope_shape() {
        let params = EnvelopeParams {
            attack: 0.1,
            decay: 0.2,
            sustain: 0.5,
            release: 0.3,
            constant_duration: false,
        };
        let points = envelope_points(&params, AREA);
        assert_eq!(points.len(), 5);
        // 0.6 s of timed stages plus a 0.2 s plateau.
        assert_abs_diff_eq!(points[1].x, 10.0 + 100.0 * 0.1 / 0.8, epsilon = 1e-3);
        assert_eq!(points[1].y, 20.0);
        assert_eq!(points[2].y, 45.0);
        assert_eq!(points[3].y, 45.0);
        assert_abs_diff_eq!(points[3].x - points[2].x, 25.0, epsilon = 1e-3);
        assert_eq!(points[4], vec2(110.0, 70.0));
    }

    #[test]
    fn percussive_envelope_ends_after_decay() {
        let params = EnvelopeParams {
            attack: 0.01,
            decay: 0.03,
            sustain: 0.9,
            release: 0.5,
            constant_duration: true,
        };
        let points = envelope_points(&params, AREA);
        assert_eq!(points.len(), 3);
        assert_abs_diff_eq!(points[1].x, 35.0, epsilon = 1e-3);
        assert_eq!(points[2], vec2(110.0, 70.0));
    }

    #[test]
    fn zero_length_envelope_is_flat() {
        let params = EnvelopeParams {
            attack: 0.0,
            decay: 0.0,
            sustain: 0.0,
            release: 0.0,
            constant_duration: true,
        };
        assert_eq!(envelope_points(&params, AREA).len(), 2);
    }
}
