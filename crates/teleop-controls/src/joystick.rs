use std::f64::consts::TAU;

use crate::control::{PixelGeometry, Touch};
use crate::surface::{Shape, Surface};

/// Two-axis output in `[-1, 1]`.
///
/// `x` grows to the right of the center and `y` grows upwards, one radius
/// away being full deflection. Releasing the touch springs back to `(0, 0)`
/// unless the joystick is sticky.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Joystick {
    pub sticky: bool,
    x: f64,
    y: f64,
}

impl Joystick {
    pub fn x(&self) -> f64 {
        self.x
    }

    pub fn y(&self) -> f64 {
        self.y
    }

    pub(crate) fn track(&mut self, px: &PixelGeometry, touch: Option<&Touch>) {
        match touch {
            Some(touch) => {
                let r = f64::from(px.r.max(1));
                self.x = (f64::from(touch.x - px.x) / r).clamp(-1.0, 1.0);
                self.y = (f64::from(px.y - touch.y) / r).clamp(-1.0, 1.0);
            }
            None if !self.sticky => {
                self.x = 0.0;
                self.y = 0.0;
            }
            None => {}
        }
    }

    pub(crate) fn draw<S: Surface + ?Sized>(
        &self,
        surface: &mut S,
        name: &str,
        px: &PixelGeometry,
        style: &str,
        frame_style: &str,
    ) {
        let (cx, cy, r) = (f64::from(px.x), f64::from(px.y), f64::from(px.r));
        let inner = (r / 3.0).round();

        surface.draw(Shape::Circle {
            x: cx,
            y: cy,
            r: inner,
            style: frame_style.to_string(),
            line_width: 5.0,
            filled: false,
        });
        surface.draw(Shape::Arc {
            x: cx,
            y: cy,
            r,
            start: 0.0,
            end: TAU,
            style: frame_style.to_string(),
            line_width: 2.0,
        });
        surface.draw(Shape::Circle {
            x: cx + self.x * r,
            y: cy - self.y * r,
            r: inner,
            style: style.to_string(),
            line_width: 2.0,
            filled: false,
        });
        surface.draw(Shape::Label {
            x: cx - 50.0,
            y: cy + r + 15.0,
            text: format!("{name}, x: {:.3}, y: {:.3}", self.x, self.y),
            style: "white".to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use teleop_types::TouchId;

    fn px() -> PixelGeometry {
        PixelGeometry { x: 200, y: 400, r: 150, l: 0 }
    }

    fn at(x: i32, y: i32) -> Touch {
        Touch::new(TouchId::Mouse, x, y)
    }

    #[test]
    fn one_radius_above_center_is_full_up() {
        let mut stick = Joystick::default();
        stick.track(&px(), Some(&at(200, 250)));
        assert_eq!((stick.x(), stick.y()), (0.0, 1.0));
    }

    #[test]
    fn right_and_down_are_positive_x_and_negative_y() {
        let mut stick = Joystick::default();
        stick.track(&px(), Some(&at(275, 475)));
        assert_eq!((stick.x(), stick.y()), (0.5, -0.5));
    }

    #[test]
    fn outputs_clamp_per_axis() {
        let mut stick = Joystick::default();
        stick.track(&px(), Some(&at(-1000, 2000)));
        assert_eq!((stick.x(), stick.y()), (-1.0, -1.0));
    }

    #[test]
    fn release_springs_back_unless_sticky() {
        let mut stick = Joystick::default();
        stick.track(&px(), Some(&at(275, 400)));
        stick.track(&px(), None);
        assert_eq!((stick.x(), stick.y()), (0.0, 0.0));

        let mut sticky = Joystick { sticky: true, ..Joystick::default() };
        sticky.track(&px(), Some(&at(275, 400)));
        sticky.track(&px(), None);
        assert_eq!((sticky.x(), sticky.y()), (0.5, 0.0));
    }
}
