use crate::control::PixelGeometry;
use crate::surface::{Shape, Surface};

/// How a [`Button`] reacts to touches.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ButtonMode {
    /// Pressed exactly while touched.
    #[default]
    Momentary,
    /// Each new touch flips `pressed`.
    Toggle,
    /// Radio behaviour: a new touch presses this button and releases every
    /// other button of the same group.
    Grouped(String),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Button {
    pub mode: ButtonMode,
    pressed: bool,
}

impl Button {
    pub fn pressed(&self) -> bool {
        self.pressed
    }

    pub fn set_pressed(&mut self, pressed: bool) {
        self.pressed = pressed;
    }

    pub fn group(&self) -> Option<&str> {
        match &self.mode {
            ButtonMode::Grouped(group) => Some(group),
            _ => None,
        }
    }

    /// Returns the group whose other members must be released.
    pub(crate) fn track(&mut self, was_touched: bool, touched: bool) -> Option<String> {
        let touch_start = touched && !was_touched;
        match &self.mode {
            ButtonMode::Momentary => {
                self.pressed = touched;
                None
            }
            ButtonMode::Toggle => {
                if touch_start {
                    self.pressed = !self.pressed;
                }
                None
            }
            ButtonMode::Grouped(group) => {
                if touch_start && !self.pressed {
                    self.pressed = true;
                    Some(group.clone())
                } else {
                    None
                }
            }
        }
    }

    pub(crate) fn draw<S: Surface + ?Sized>(
        &self,
        surface: &mut S,
        name: &str,
        px: &PixelGeometry,
        style: &str,
    ) {
        let (x, y, r) = (f64::from(px.x), f64::from(px.y), f64::from(px.r));
        surface.draw(Shape::Circle {
            x,
            y,
            r,
            style: style.to_string(),
            line_width: 6.0,
            filled: self.pressed,
        });
        surface.draw(Shape::Label {
            x: x - 50.0,
            y: y + r + 15.0,
            text: format!("{name}, pressed: {}", self.pressed),
            style: "white".to_string(),
        });
    }
}
