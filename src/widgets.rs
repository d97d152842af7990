use macroquad::{prelude::*, text::measure_text};

pub const AMBER: Color = Color {
    r: 0.98,
    g: 0.66,
    b: 0.12,
    a: 1.0,
};
pub const AMBER_DIM: Color = Color {
    r: 0.78,
    g: 0.52,
    b: 0.08,
    a: 0.4,
};
pub const BACKGROUND: Color = Color {
    r: 0.02,
    g: 0.02,
    b: 0.02,
    a: 1.0,
};
pub const PANEL_FILL: Color = Color {
    r: 0.05,
    g: 0.03,
    b: 0.02,
    a: 0.65,
};
pub const GRID: Color = Color {
    r: 0.2,
    g: 0.1,
    b: 0.03,
    a: 0.5,
};

/// Mouse state for one frame.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Pointer {
    pub pos: Vec2,
    pub pressed: bool,
    pub down: bool,
    pub released: bool,
}

impl Pointer {
    pub fn poll() -> Self {
        let (x, y) = mouse_position();
        Self {
            pos: vec2(x, y),
            pressed: is_mouse_button_pressed(MouseButton::Left),
            down: is_mouse_button_down(MouseButton::Left),
            released: is_mouse_button_released(MouseButton::Left),
        }
    }

    pub fn clicked(&self, rect: Rect) -> bool {
        self.pressed && rect.contains(self.pos)
    }
}

pub fn font_size(base: f32, scale: f32) -> u16 {
    (base * scale).round().max(6.0) as u16
}

pub fn draw_section(rect: &Rect, label: &str, scale: f32) {
    draw_rectangle(rect.x, rect.y, rect.w, rect.h, PANEL_FILL);
    draw_rectangle_lines(rect.x, rect.y, rect.w, rect.h, 1.0, AMBER);
    draw_text_ex(
        label,
        rect.x + 6.0,
        rect.y - 6.0,
        TextParams {
            font_size: font_size(18.0, scale),
            color: AMBER,
            ..Default::default()
        },
    );
}

pub fn draw_label(text: &str, x: f32, y: f32, size: u16, color: Color) {
    draw_text_ex(
        text,
        x,
        y,
        TextParams {
            font_size: size,
            color,
            ..Default::default()
        },
    );
}

pub fn draw_centered_text(text: &str, rect: Rect, size: u16) {
    let measure = measure_text(text, None, size, 1.0);
    let x = rect.x + rect.w * 0.5 - measure.width * 0.5;
    let y = rect.y + rect.h * 0.5 + measure.height * 0.5;
    draw_label(text, x, y, size, AMBER);
}

pub fn draw_toggle_switch(rect: Rect, on: bool, label: &str, scale: f32) {
    let fill = if on {
        AMBER
    } else {
        Color::new(0.1, 0.08, 0.05, 1.0)
    };
    draw_rectangle(rect.x, rect.y, rect.h, rect.h, BACKGROUND);
    draw_rectangle_lines(rect.x, rect.y, rect.h, rect.h, 1.0, AMBER);
    draw_rectangle(rect.x + 3.0, rect.y + 3.0, rect.h - 6.0, rect.h - 6.0, fill);
    let size = font_size(14.0, scale);
    draw_label(
        label,
        rect.x + rect.h + 8.0,
        rect.y + rect.h * 0.5 + size as f32 * 0.3,
        size,
        AMBER,
    );
}

pub fn draw_button(rect: Rect, label: &str, active: bool, scale: f32) {
    let fill = if active {
        Color::new(0.35, 0.22, 0.04, 1.0)
    } else {
        Color::new(0.05, 0.03, 0.02, 1.0)
    };
    draw_rectangle(rect.x, rect.y, rect.w, rect.h, fill);
    draw_rectangle_lines(rect.x, rect.y, rect.w, rect.h, 1.0, AMBER);
    draw_centered_text(label, rect, font_size(14.0, scale));
}

/// Maps a pointer x position onto a 0-255 slider.
pub fn slider_value(rect: Rect, x: f32) -> u8 {
    if rect.w <= 0.0 {
        return 0;
    }
    let t = ((x - rect.x) / rect.w).clamp(0.0, 1.0);
    (t * 255.0).round() as u8
}

pub fn slider_handle_x(rect: Rect, value: u8) -> f32 {
    rect.x + rect.w * value as f32 / 255.0
}

pub fn draw_slider(rect: Rect, value: u8, label: &str, scale: f32) {
    let mid = rect.y + rect.h * 0.5;
    draw_line(rect.x, mid, rect.x + rect.w, mid, 2.0, AMBER_DIM);
    let handle = slider_handle_x(rect, value);
    draw_line(rect.x, mid, handle, mid, 3.0, AMBER);
    draw_rectangle(handle - 4.0, rect.y, 8.0, rect.h, AMBER);
    let size = font_size(14.0, scale);
    draw_label(label, rect.x, rect.y - 4.0, size, AMBER);
    let readout = value.to_string();
    let width = measure_text(&readout, None, size, 1.0).width;
    draw_label(&readout, rect.x + rect.w - width, rect.y - 4.0, size, AMBER);
}

/// Parses text typed into a numeric field.
pub fn parse_field(text: &str) -> Option<f32> {
    let value = text.trim().parse::<f32>().ok()?;
    value.is_finite().then_some(value)
}

pub fn format_value(value: f32) -> String {
    let text = format!("{value:.3}");
    let text = text.trim_end_matches('0').trim_end_matches('.');
    if text.is_empty() || text == "-0" {
        "0".to_string()
    } else {
        text.to_string()
    }
}

/// Single-line numeric entry.
#[derive(Clone, Debug)]
pub struct TextField {
    text: String,
    value: f32,
    min: f32,
    max: f32,
    focused: bool,
}

impl TextField {
    pub fn new(value: f32, min: f32, max: f32) -> Self {
        let value = value.clamp(min, max);
        Self {
            text: format_value(value),
            value,
            min,
            max,
            focused: false,
        }
    }

    pub fn value(&self) -> f32 {
        self.value
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn is_focused(&self) -> bool {
        self.focused
    }

    /// Mirrors an external value unless the user is editing.
    pub fn set_value(&mut self, value: f32) {
        if self.focused {
            return;
        }
        self.value = value.clamp(self.min, self.max);
        self.text = format_value(self.value);
    }

    pub fn focus(&mut self) {
        self.focused = true;
    }

    pub fn push_char(&mut self, ch: char) {
        if self.focused && (ch.is_ascii_digit() || matches!(ch, '.' | '-' | 'e' | 'E' | '+')) {
            self.text.push(ch);
        }
    }

    pub fn backspace(&mut self) {
        if self.focused {
            self.text.pop();
        }
    }

    pub fn cancel(&mut self) {
        self.focused = false;
        self.text = format_value(self.value);
    }

    /// Ends editing. Returns the value to send, or `None` when the text was
    /// not a number; the field then reads 0 and nothing is sent.
    pub fn commit(&mut self) -> Option<f32> {
        self.focused = false;
        match parse_field(&self.text) {
            Some(value) => {
                self.value = value.clamp(self.min, self.max);
                self.text = format_value(self.value);
                Some(self.value)
            }
            None => {
                self.value = 0.0;
                self.text = format_value(0.0);
                None
            }
        }
    }

    /// Handles focus changes and typing. Returns a committed value.
    pub fn update(&mut self, pointer: &Pointer, rect: Rect) -> Option<f32> {
        if pointer.pressed {
            if rect.contains(pointer.pos) {
                self.focus();
                return None;
            }
            if self.focused {
                return self.commit();
            }
        }
        if !self.focused {
            return None;
        }
        while let Some(ch) = get_char_pressed() {
            self.push_char(ch);
        }
        if is_key_pressed(KeyCode::Backspace) {
            self.backspace();
        }
        if is_key_pressed(KeyCode::Escape) {
            self.cancel();
            return None;
        }
        if is_key_pressed(KeyCode::Enter) || is_key_pressed(KeyCode::KpEnter) {
            return self.commit();
        }
        None
    }

    pub fn draw(&self, rect: Rect, label: &str, scale: f32) {
        let border = if self.focused { AMBER } else { AMBER_DIM };
        draw_rectangle(rect.x, rect.y, rect.w, rect.h, BACKGROUND);
        draw_rectangle_lines(rect.x, rect.y, rect.w, rect.h, 1.0, border);
        let size = font_size(14.0, scale);
        let text = if self.focused {
            format!("{}_", self.text)
        } else {
            self.text.clone()
        };
        draw_label(
            &text,
            rect.x + 4.0,
            rect.y + rect.h * 0.5 + size as f32 * 0.3,
            size,
            AMBER,
        );
        if !label.is_empty() {
            draw_label(label, rect.x, rect.y - 3.0, font_size(12.0, scale), AMBER_DIM);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_field_rejects_non_numbers() {
        assert_eq!(parse_field(" 1.5 "), Some(1.5));
        assert_eq!(parse_field("-2"), Some(-2.0));
        assert_eq!(parse_field(""), None);
        assert_eq!(parse_field("abc"), None);
        assert_eq!(parse_field("inf"), None);
        assert_eq!(parse_field("NaN"), None);
    }

    #[test]
    fn invalid_commit_reads_zero_and_sends_nothing() {
        let mut field = TextField::new(0.5, 0.0, 10.0);
        field.focus();
        field.backspace();
        field.backspace();
        field.backspace();
        assert_eq!(field.text(), "");
        assert_eq!(field.commit(), None);
        assert_eq!(field.value(), 0.0);
        assert_eq!(field.text(), "0");
        assert!(!field.is_focused());
    }

    #[test]
    fn valid_commit_is_clamped() {
        let mut field = TextField::new(1.0, 0.0, 4.0);
        field.focus();
        field.push_char('2');
        field.push_char('x');
        assert_eq!(field.text(), "12");
        assert_eq!(field.commit(), Some(4.0));
        assert_eq!(field.text(), "4");
    }

    #[test]
    fn external_values_do_not_interrupt_editing() {
        let mut field = TextField::new(1.0, 0.0, 4.0);
        field.set_value(2.0);
        assert_eq!(field.text(), "2");
        field.focus();
        field.push_char('5');
        field.set_value(3.0);
        assert_eq!(field.text(), "25");
        field.cancel();
        assert_eq!(field.text(), "2");
    }

    #[test]
    fn clicking_elsewhere_commits() {
        let rect = Rect::new(10.0, 10.0, 50.0, 20.0);
        let mut field = TextField::new(1.0, 0.0, 4.0);
        let inside = Pointer {
            pos: vec2(20.0, 15.0),
            pressed: true,
            down: true,
            released: false,
        };
        assert_eq!(field.update(&inside, rect), None);
        assert!(field.is_focused());
        let outside = Pointer {
            pos: vec2(200.0, 200.0),
            ..inside
        };
        assert_eq!(field.update(&outside, rect), Some(1.0));
        assert!(!field.is_focused());
    }

    #[test]
    fn slider_maps_across_its_width() {
        let rect = Rect::new(100.0, 0.0, 255.0, 10.0);
        assert_eq!(slider_value(rect, 50.0), 0);
        assert_eq!(slider_value(rect, 100.0), 0);
        assert_eq!(slider_value(rect, 227.5), 128);
        assert_eq!(slider_value(rect, 400.0), 255);
        assert_eq!(slider_handle_x(rect, 255), 355.0);
    }

    #[test]
    fn values_format_compactly() {
        assert_eq!(format_value(0.25), "0.25");
        assert_eq!(format_value(2.0), "2");
        assert_eq!(format_value(0.0), "0");
        assert_eq!(format_value(-0.0001), "0");
    }
}
