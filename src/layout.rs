use macroquad::prelude::Rect;

/// Window positions of every panel view, proportional to the window size.
#[derive(Clone, Debug, PartialEq)]
pub struct PanelLayout {
    pub width: f32,
    pub height: f32,
    pub scale: f32,
    pub spectrum_pad: Rect,
    pub dynamics_pad: Rect,
    /// Spectrum FFT, brightness response, articulation sweep, envelope.
    pub graphs: [Rect; 4],
    /// Output FFT, or the advanced controls when they are shown.
    pub lower_left: Rect,
    pub lower_right: Rect,
    pub status: Rect,
}

impl PanelLayout {
    pub fn compute(width: f32, height: f32) -> Self {
        let width = width.max(1.0);
        let height = height.max(1.0);
        let margin_x = width * 0.02;
        let margin_y = height * 0.04;
        let gap_x = width * 0.015;
        let gap_y = height * 0.05;
        let pad = (width * 0.22).min(height * 0.42);
        let top = margin_y;

        let spectrum_pad = Rect::new(margin_x, top, pad, pad);
        let dynamics_pad = Rect::new(width - margin_x - pad, top, pad, pad);

        let grid_x = spectrum_pad.right() + gap_x;
        let grid_w = (dynamics_pad.x - gap_x - grid_x).max(0.0);
        let cell_w = ((grid_w - gap_x) * 0.5).max(0.0);
        let cell_h = ((pad - gap_y) * 0.5).max(0.0);
        let graphs = [
            Rect::new(grid_x, top, cell_w, cell_h),
            Rect::new(grid_x + cell_w + gap_x, top, cell_w, cell_h),
            Rect::new(grid_x, top + cell_h + gap_y, cell_w, cell_h),
            Rect::new(grid_x + cell_w + gap_x, top + cell_h + gap_y, cell_w, cell_h),
        ];

        let status_h = height * 0.04;
        let status = Rect::new(
            margin_x,
            height - margin_y * 0.5 - status_h,
            width - margin_x * 2.0,
            status_h,
        );
        let lower_top = top + pad + gap_y * 1.4;
        let lower_h = (status.y - gap_y * 0.5 - lower_top).max(0.0);
        let usable_w = width - margin_x * 2.0 - gap_x;
        let lower_left = Rect::new(margin_x, lower_top, usable_w * 0.6, lower_h);
        let lower_right = Rect::new(
            lower_left.right() + gap_x,
            lower_top,
            usable_w * 0.4,
            lower_h,
        );

        Self {
            width,
            height,
            scale: (height / 800.0).clamp(0.6, 2.0),
            spectrum_pad,
            dynamics_pad,
            graphs,
            lower_left,
            lower_right,
            status,
        }
    }

    pub fn rects(&self) -> Vec<Rect> {
        let mut rects = vec![self.spectrum_pad, self.dynamics_pad];
        rects.extend(self.graphs);
        rects.extend([self.lower_left, self.lower_right, self.status]);
        rects
    }
}

/// Splits `rect` into `count` equal rows separated by `gap`.
pub fn rows(rect: Rect, count: usize, gap: f32) -> Vec<Rect> {
    if count == 0 {
        return Vec::new();
    }
    let h = ((rect.h - gap * (count - 1) as f32) / count as f32).max(0.0);
    (0..count)
        .map(|i| Rect::new(rect.x, rect.y + i as f32 * (h + gap), rect.w, h))
        .collect()
}

/// Splits `rect` into `count` equal columns separated by `gap`.
pub fn columns(rect: Rect, count: usize, gap: f32) -> Vec<Rect> {
    if count == 0 {
        return Vec::new();
    }
    let w = ((rect.w - gap * (count - 1) as f32) / count as f32).max(0.0);
    (0..count)
        .map(|i| Rect::new(rect.x + i as f32 * (w + gap), rect.y, w, rect.h))
        .collect()
}

pub fn inset(rect: Rect, amount: f32) -> Rect {
    let dx = amount.min(rect.w * 0.5);
    let dy = amount.min(rect.h * 0.5);
    Rect::new(rect.x + dx, rect.y + dy, rect.w - dx * 2.0, rect.h - dy * 2.0)
}

#[cfg(test)]
pub(crate) fn contains_rect(outer: Rect, inner: Rect) -> bool {
    const EPS: f32 = 1e-3;
    inner.x >= outer.x - EPS
        && inner.y >= outer.y - EPS
        && inner.right() <= outer.right() + EPS
        && inner.bottom() <= outer.bottom() + EPS
}
