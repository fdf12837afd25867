//! Drawing surface abstraction.
//!
//! Controls draw through [`Surface`] in pixel coordinates with the origin at
//! the top-left corner. [`RecordingSurface`] keeps the shapes of the last
//! frame, which is all a headless operator console or a test needs.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SurfaceSize {
    pub width: u32,
    pub height: u32,
}

impl SurfaceSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    Circle {
        x: f64,
        y: f64,
        r: f64,
        style: String,
        line_width: f64,
        filled: bool,
    },
    /// Clockwise arc from `start` to `end`, in radians.
    Arc {
        x: f64,
        y: f64,
        r: f64,
        start: f64,
        end: f64,
        style: String,
        line_width: f64,
    },
    Line {
        from: (f64, f64),
        to: (f64, f64),
        style: String,
        line_width: f64,
    },
    Label {
        x: f64,
        y: f64,
        text: String,
        style: String,
    },
}

pub trait Surface {
    fn size(&self) -> SurfaceSize;

    /// On-screen position of the surface's top-left corner, subtracted from
    /// raw client coordinates.
    fn offset(&self) -> (f64, f64) {
        (0.0, 0.0)
    }

    fn clear(&mut self);

    fn draw(&mut self, shape: Shape);
}

#[derive(Debug, Clone, Default)]
pub struct RecordingSurface {
    size: SurfaceSize,
    offset: (f64, f64),
    shapes: Vec<Shape>,
    frames: usize,
}

impl RecordingSurface {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            size: SurfaceSize::new(width, height),
            ..Self::default()
        }
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.size = SurfaceSize::new(width, height);
    }

    pub fn set_offset(&mut self, left: f64, top: f64) {
        self.offset = (left, top);
    }

    /// Shapes drawn since the last clear.
    pub fn shapes(&self) -> &[Shape] {
        &self.shapes
    }

    /// Number of clears so far, i.e. frames started.
    pub fn frames(&self) -> usize {
        self.frames
    }

    pub fn labels(&self) -> Vec<&str> {
        self.shapes
            .iter()
            .filter_map(|shape| match shape {
                Shape::Label { text, .. } => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }
}

impl Surface for RecordingSurface {
    fn size(&self) -> SurfaceSize {
        self.size
    }

    fn offset(&self) -> (f64, f64) {
        self.offset
    }

    fn clear(&mut self) {
        self.shapes.clear();
        self.frames += 1;
    }

    fn draw(&mut self, shape: Shape) {
        self.shapes.push(shape);
    }
}
