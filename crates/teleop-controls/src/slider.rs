use std::f64::consts::{FRAC_PI_2, PI};

use crate::control::{PixelGeometry, Touch};
use crate::surface::{Shape, Surface};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Orientation {
    Horizontal,
    #[default]
    Vertical,
}

/// Single-axis output in `[0, 1]` along a capsule.
///
/// The capsule starts at the declared position and runs `length` pixels to
/// the right (horizontal) or downwards (vertical), with a half circle of the
/// declared radius at each end. Horizontal sliders read 0 at the left end;
/// vertical sliders read 0 at the bottom end and 1 at the top.
#[derive(Debug, Clone, PartialEq)]
pub struct Slider {
    pub orientation: Orientation,
    pub sticky: bool,
    value: f64,
}

impl Default for Slider {
    fn default() -> Self {
        Self {
            orientation: Orientation::Vertical,
            sticky: true,
            value: 0.0,
        }
    }
}

/// Far end of the capsule plus its straight section.
struct Capsule {
    end: (i32, i32),
    x1: i32,
    x2: i32,
    y1: i32,
    y2: i32,
}

fn within(cx: i32, cy: i32, r: i32, touch: &Touch) -> bool {
    let dx = f64::from(cx - touch.x);
    let dy = f64::from(cy - touch.y);
    dx.hypot(dy) <= f64::from(r)
}

impl Slider {
    pub fn value(&self) -> f64 {
        self.value
    }

    fn capsule(&self, px: &PixelGeometry) -> Capsule {
        let PixelGeometry { x, y, r, l } = *px;
        match self.orientation {
            Orientation::Horizontal => Capsule {
                end: (x + l, y),
                x1: x,
                x2: x + l,
                y1: y - r,
                y2: y + r,
            },
            Orientation::Vertical => Capsule {
                end: (x, y + l),
                x1: x - r,
                x2: x + r,
                y1: y,
                y2: y + l,
            },
        }
    }

    pub(crate) fn contains(&self, px: &PixelGeometry, touch: &Touch) -> bool {
        let capsule = self.capsule(px);
        within(px.x, px.y, px.r, touch)
            || within(capsule.end.0, capsule.end.1, px.r, touch)
            || (touch.x >= capsule.x1
                && touch.x <= capsule.x2
                && touch.y >= capsule.y1
                && touch.y <= capsule.y2)
    }

    pub(crate) fn track(&mut self, px: &PixelGeometry, touch: Option<&Touch>) {
        match touch {
            Some(touch) => {
                if px.l <= 0 {
                    self.value = 0.0;
                    return;
                }
                let along = match self.orientation {
                    Orientation::Horizontal => touch.x - px.x,
                    Orientation::Vertical => px.y + px.l - touch.y,
                };
                self.value = (f64::from(along) / f64::from(px.l)).clamp(0.0, 1.0);
            }
            None if !self.sticky => self.value = 0.0,
            None => {}
        }
    }

    pub(crate) fn draw<S: Surface + ?Sized>(
        &self,
        surface: &mut S,
        name: &str,
        px: &PixelGeometry,
        style: &str,
    ) {
        let capsule = self.capsule(px);
        let (x, y, r, l) = (
            f64::from(px.x),
            f64::from(px.y),
            f64::from(px.r),
            f64::from(px.l),
        );
        let (x1, x2, y1, y2) = (
            f64::from(capsule.x1),
            f64::from(capsule.x2),
            f64::from(capsule.y1),
            f64::from(capsule.y2),
        );
        let (ex, ey) = (f64::from(capsule.end.0), f64::from(capsule.end.1));
        let line = |from, to| Shape::Line {
            from,
            to,
            style: style.to_string(),
            line_width: 2.0,
        };
        let arc = |cx, cy, start, end| Shape::Arc {
            x: cx,
            y: cy,
            r,
            start,
            end,
            style: style.to_string(),
            line_width: 2.0,
        };

        let knob = match self.orientation {
            Orientation::Horizontal => {
                surface.draw(line((x1, y1), (x2, y1)));
                surface.draw(arc(ex, ey, 3.0 * FRAC_PI_2, FRAC_PI_2));
                surface.draw(line((x2, y2), (x1, y2)));
                surface.draw(arc(x, y, FRAC_PI_2, 3.0 * FRAC_PI_2));
                (x + self.value * l, y)
            }
            Orientation::Vertical => {
                surface.draw(arc(x, y, PI, 2.0 * PI));
                surface.draw(line((x2, y1), (x2, y2)));
                surface.draw(arc(ex, ey, 0.0, PI));
                surface.draw(line((x1, y2), (x1, y1)));
                (x, y + l - self.value * l)
            }
        };

        surface.draw(Shape::Circle {
            x: knob.0,
            y: knob.1,
            r: (r - 4.0).max(1.0),
            style: style.to_string(),
            line_width: 2.0,
            filled: false,
        });
        let (label_x, label_y) = match self.orientation {
            Orientation::Horizontal => (x - 50.0, y + r + 15.0),
            Orientation::Vertical => (x - 50.0, y + l + r + 15.0),
        };
        surface.draw(Shape::Label {
            x: label_x,
            y: label_y,
            text: format!("{name}, value: {:.3}", self.value),
            style: "white".to_string(),
        });
    }
}
