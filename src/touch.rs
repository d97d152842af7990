use crate::filter::OnePole;

#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub struct TouchPoint {
    pub x: f32,
    pub y: f32,
    pub size: f32,
}

/// Both pads as carried by the touch buffer.
#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub struct TouchFrame {
    pub spectrum: TouchPoint,
    pub dynamics: TouchPoint,
}

impl TouchFrame {
    pub const BUFFER_LEN: usize = 6;

    pub fn to_buffer(&self) -> [f32; Self::BUFFER_LEN] {
        let (s, d) = (self.spectrum, self.dynamics);
        [s.x, s.y, s.size, d.x, d.y, d.size]
    }

    pub fn from_buffer(data: &[f32]) -> Option<Self> {
        let [sx, sy, ss, dx, dy, ds] = *data else {
            return None;
        };
        let clean = |v: f32| if v.is_finite() { v.clamp(0.0, 1.0) } else { 0.0 };
        Some(Self {
            spectrum: TouchPoint {
                x: clean(sx),
                y: clean(sy),
                size: clean(ss),
            },
            dynamics: TouchPoint {
                x: clean(dx),
                y: clean(dy),
                size: clean(ds),
            },
        })
    }
}

/// Pair of dimension values produced by one pad: `(vertical, horizontal)`.
pub type PadValues = (u8, u8);

#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub struct TouchUpdate {
    pub spectrum: Option<PadValues>,
    pub dynamics: Option<PadValues>,
}

pub fn position_to_dimension(position: f32) -> u8 {
    (position.clamp(0.0, 1.0) * 255.0) as u8
}

struct PadSmoother {
    size: OnePole,
    x: OnePole,
    y: OnePole,
    touching: bool,
}

impl PadSmoother {
    fn new(cutoff: f32, rate: f32) -> Self {
        Self {
            size: OnePole::new(cutoff, rate),
            x: OnePole::new(cutoff, rate),
            y: OnePole::new(cutoff, rate),
            touching: false,
        }
    }

    fn set_rate(&mut self, cutoff: f32, rate: f32) {
        self.size.set_cutoff(cutoff, rate);
        self.x.set_cutoff(cutoff, rate);
        self.y.set_cutoff(cutoff, rate);
    }

    fn process(&mut self, point: &TouchPoint, threshold: f32) -> Option<PadValues> {
        let size = self.size.process(point.size);
        if size <= threshold || point.size <= 0.0 {
            self.touching = false;
            return None;
        }
        // Start from the contact point instead of gliding in from the last one.
        if !self.touching {
            self.touching = true;
            self.x.reset(point.x);
            self.y.reset(point.y);
        }
        let x = self.x.process(point.x);
        let y = self.y.process(point.y);
        Some((position_to_dimension(y), position_to_dimension(x)))
    }
}

/// Smooths raw pad contacts into timbre dimension values.
pub struct TouchProcessor {
    spectrum: PadSmoother,
    dynamics: PadSmoother,
    cutoff: f32,
    threshold: f32,
}

impl TouchProcessor {
    pub fn new(cutoff: f32, threshold: f32) -> Self {
        // Rate is replaced on the first block.
        let rate = 100.0;
        Self {
            spectrum: PadSmoother::new(cutoff, rate),
            dynamics: PadSmoother::new(cutoff, rate),
            cutoff,
            threshold,
        }
    }

    /// `block_rate` is how many times per second `process` is called.
    pub fn process(&mut self, frame: &TouchFrame, block_rate: f32) -> TouchUpdate {
        self.spectrum.set_rate(self.cutoff, block_rate);
        self.dynamics.set_rate(self.cutoff, block_rate);
        TouchUpdate {
            spectrum: self.spectrum.process(&frame.spectrum, self.threshold),
            dynamics: self.dynamics.process(&frame.dynamics, self.threshold),
        }
    }
}
