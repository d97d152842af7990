use macroquad::prelude::*;

use crate::freq_mod::{Algorithm, NUM_OPERATORS};
use crate::widgets::{AMBER, AMBER_DIM, BACKGROUND, draw_centered_text, font_size};

const OUT_BAR_SHARE: f32 = 0.12;
const BOX_FILL: f32 = 0.6;

#[derive(Clone, Debug, PartialEq)]
pub struct DiagramLayout {
    pub boxes: [Rect; NUM_OPERATORS],
    pub out_bar: Rect,
    /// Modulator bottom to target top.
    pub arrows: Vec<(Vec2, Vec2)>,
    /// Carrier bottom to the OUT bar.
    pub carrier_lines: Vec<(Vec2, Vec2)>,
}

/// Places the operators of `algorithm` inside `bounds`, carriers on the
/// lowest row and modulators stacked above their targets.
pub fn layout(algorithm: Algorithm, bounds: Rect) -> DiagramLayout {
    let topology = algorithm.topology();
    let out_h = bounds.h * OUT_BAR_SHARE;
    let out_bar = Rect::new(bounds.x, bounds.bottom() - out_h, bounds.w, out_h);
    let area = Rect::new(bounds.x, bounds.y, bounds.w, bounds.h - out_h * 2.0);

    let columns = topology
        .positions
        .iter()
        .map(|(col, _)| *col)
        .fold(0.0f32, f32::max)
        + 1.0;
    let rows = topology
        .positions
        .iter()
        .map(|(_, row)| *row)
        .fold(0.0f32, f32::max)
        + 1.0;
    let cell_w = area.w / columns;
    let cell_h = area.h / rows;
    let size = cell_w.min(cell_h) * BOX_FILL;

    let boxes = topology.positions.map(|(col, row)| {
        let cx = area.x + (col + 0.5) * cell_w;
        let cy = area.bottom() - (row + 0.5) * cell_h;
        Rect::new(cx - size * 0.5, cy - size * 0.5, size, size)
    });

    let bottom_center = |r: &Rect| vec2(r.x + r.w * 0.5, r.bottom());
    let top_center = |r: &Rect| vec2(r.x + r.w * 0.5, r.y);
    let arrows = topology
        .edges
        .iter()
        .map(|&(modulator, target)| (bottom_center(&boxes[modulator]), top_center(&boxes[target])))
        .collect();
    let carrier_lines = topology
        .carriers
        .iter()
        .map(|&carrier| {
            let start = bottom_center(&boxes[carrier]);
            (start, vec2(start.x, out_bar.y))
        })
        .collect();

    DiagramLayout {
        boxes,
        out_bar,
        arrows,
        carrier_lines,
    }
}

fn draw_arrow(from: Vec2, to: Vec2, color: Color) {
    draw_line(from.x, from.y, to.x, to.y, 1.5, color);
    let dir = (to - from).normalize_or_zero();
    let side = vec2(-dir.y, dir.x);
    let head = 6.0;
    let left = to - dir * head + side * head * 0.5;
    let right = to - dir * head - side * head * 0.5;
    draw_triangle(to, left, right, color);
}

pub fn draw_block_diagram(algorithm: Algorithm, bounds: Rect, scale: f32) {
    let diagram = layout(algorithm, bounds);
    for (from, to) in &diagram.carrier_lines {
        draw_line(from.x, from.y, to.x, to.y, 1.5, AMBER_DIM);
    }
    for (from, to) in &diagram.arrows {
        draw_arrow(*from, *to, AMBER);
    }
    for (index, rect) in diagram.boxes.iter().enumerate() {
        draw_rectangle(rect.x, rect.y, rect.w, rect.h, BACKGROUND);
        draw_rectangle_lines(rect.x, rect.y, rect.w, rect.h, 1.0, AMBER);
        draw_centered_text(&(index + 1).to_string(), *rect, font_size(14.0, scale));
    }
    let bar = diagram.out_bar;
    draw_rectangle(bar.x, bar.y, bar.w, bar.h, AMBER_DIM);
    draw_centered_text("OUT", bar, font_size(12.0, scale));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::contains_rect;

    const BOUNDS: Rect = Rect {
        x: 0.0,
        y: 0.0,
        w: 200.0,
        h: 160.0,
    };

    #[test]
    fn additive_sits_in_one_row() {
        let diagram = layout(Algorithm::Additive, BOUNDS);
        assert!(diagram.arrows.is_empty());
        assert_eq!(diagram.carrier_lines.len(), 4);
        let y = diagram.boxes[0].y;
        assert!(diagram.boxes.iter().all(|b| b.y == y));
        assert!(diagram.boxes.windows(2).all(|w| w[0].x < w[1].x));
    }

    #[test]
    fn four_stack_is_a_column() {
        let diagram = layout(Algorithm::FourStack, BOUNDS);
        assert_eq!(diagram.arrows.len(), 3);
        assert_eq!(diagram.carrier_lines.len(), 1);
        // Operator 4 is on top, the carrier at the bottom.
        assert!(diagram.boxes.windows(2).all(|w| w[0].y > w[1].y));
        for (from, to) in &diagram.arrows {
            assert!(from.y < to.y);
        }
    }

    #[test]
    fn everything_stays_inside_the_bounds() {
        for algorithm in Algorithm::VALUES {
            let diagram = layout(algorithm, BOUNDS);
            assert!(contains_rect(BOUNDS, diagram.out_bar));
            for rect in diagram.boxes {
                assert!(contains_rect(BOUNDS, rect), "{algorithm:?}");
                assert!(rect.bottom() < diagram.out_bar.y);
            }
            for (_, end) in &diagram.carrier_lines {
                assert_eq!(end.y, diagram.out_bar.y);
            }
        }
    }

    #[test]
    fn boxes_do_not_overlap() {
        for algorithm in Algorithm::VALUES {
            let boxes = layout(algorithm, BOUNDS).boxes;
            for i in 0..NUM_OPERATORS {
                for j in i + 1..NUM_OPERATORS {
                    assert!(!boxes[i].overlaps(&boxes[j]), "{algorithm:?} {i} {j}");
                }
            }
        }
    }
}
