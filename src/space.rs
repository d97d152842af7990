use macroquad::prelude::*;

use crate::touch::TouchPoint;
use crate::widgets::{AMBER, AMBER_DIM, GRID, Pointer, draw_label, draw_section, font_size};

/// Maps a window position onto pad coordinates, `y = 1` at the top edge.
pub fn pointer_to_pad(rect: Rect, pos: Vec2) -> (f32, f32) {
    if rect.w <= 0.0 || rect.h <= 0.0 {
        return (0.0, 0.0);
    }
    let x = ((pos.x - rect.x) / rect.w).clamp(0.0, 1.0);
    let y = (1.0 - (pos.y - rect.y) / rect.h).clamp(0.0, 1.0);
    (x, y)
}

pub fn pad_to_window(rect: Rect, x: f32, y: f32) -> Vec2 {
    vec2(rect.x + x * rect.w, rect.y + (1.0 - y) * rect.h)
}

/// Mouse-driven touch pad. The vertical axis drives one dimension and the
/// horizontal axis another.
pub struct Space {
    title: &'static str,
    vertical: &'static str,
    horizontal: &'static str,
    touch: TouchPoint,
    dragging: bool,
}

impl Space {
    pub fn new(title: &'static str, vertical: &'static str, horizontal: &'static str) -> Self {
        Self {
            title,
            vertical,
            horizontal,
            touch: TouchPoint::default(),
            dragging: false,
        }
    }

    pub fn is_dragging(&self) -> bool {
        self.dragging
    }

    /// Turns this frame's mouse state into a touch. Size is 1 while dragging.
    pub fn update(&mut self, pointer: &Pointer, rect: Rect) -> TouchPoint {
        if pointer.pressed && rect.contains(pointer.pos) {
            self.dragging = true;
        }
        if self.dragging && (!pointer.down || pointer.released) {
            self.dragging = false;
        }
        if self.dragging {
            let (x, y) = pointer_to_pad(rect, pointer.pos);
            self.touch = TouchPoint { x, y, size: 1.0 };
        } else {
            self.touch.size = 0.0;
        }
        self.touch
    }

    /// Marker position in pad coordinates. Follows the mouse while dragging,
    /// otherwise the engine's values for the two dimensions.
    pub fn marker(&self, vertical: u8, horizontal: u8) -> (f32, f32) {
        if self.dragging {
            (self.touch.x, self.touch.y)
        } else {
            (horizontal as f32 / 255.0, vertical as f32 / 255.0)
        }
    }

    pub fn draw(&self, rect: Rect, vertical: u8, horizontal: u8, scale: f32) {
        draw_section(&rect, self.title, scale);
        for fraction in [0.25, 0.5, 0.75] {
            let x = rect.x + rect.w * fraction;
            let y = rect.y + rect.h * fraction;
            draw_line(x, rect.y, x, rect.bottom(), 0.5, GRID);
            draw_line(rect.x, y, rect.right(), y, 0.5, GRID);
        }

        let size = font_size(14.0, scale);
        draw_label(
            &format!("{} {}", self.horizontal, horizontal),
            rect.x + 6.0,
            rect.bottom() - 6.0,
            size,
            AMBER_DIM,
        );
        draw_label(
            &format!("{} {}", self.vertical, vertical),
            rect.x + 6.0,
            rect.y + size as f32 + 4.0,
            size,
            AMBER_DIM,
        );

        let (x, y) = self.marker(vertical, horizontal);
        let center = pad_to_window(rect, x, y);
        let radius = rect.w * 0.04;
        if self.dragging {
            draw_circle(center.x, center.y, radius, AMBER);
        }
        draw_circle_lines(center.x, center.y, radius * 1.6, 1.5, AMBER);
    }
}
