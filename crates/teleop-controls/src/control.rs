//! A named, geometry-bound input affordance.
//!
//! Every [`Control`] shares the same capability surface (hit test, touch
//! tracking, pixel geometry, drawing) and carries its variant-specific state
//! in a closed [`ControlKind`].
//!
//! A control is either free or owned by exactly one touch. Ownership is
//! assigned by the [`ControlManager`](crate::ControlManager); the control
//! only remembers the touch it was last given.

use teleop_types::TouchId;

use crate::button::{Button, ButtonMode};
use crate::dimension::{Dimension, Reference};
use crate::joystick::Joystick;
use crate::slider::{Orientation, Slider};
use crate::surface::{Surface, SurfaceSize};

/// A pointer position in surface pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Touch {
    pub id: TouchId,
    pub x: i32,
    pub y: i32,
    pub force: Option<f64>,
}

impl Touch {
    pub fn new(id: TouchId, x: i32, y: i32) -> Self {
        Self {
            id,
            x,
            y,
            force: None,
        }
    }
}

/// Declared geometry, in flexible units.
#[derive(Debug, Clone, PartialEq)]
pub struct Geometry {
    pub x: Dimension,
    pub y: Dimension,
    pub radius: Dimension,
    pub length: Dimension,
}

impl Default for Geometry {
    fn default() -> Self {
        Self {
            x: Dimension::Percent(0.0),
            y: Dimension::Percent(0.0),
            radius: Dimension::Percent(10.0),
            length: Dimension::Percent(30.0),
        }
    }
}

impl Geometry {
    pub fn resolve(&self, size: SurfaceSize) -> PixelGeometry {
        PixelGeometry {
            x: self.x.resolve_on(size, Reference::Width),
            y: self.y.resolve_on(size, Reference::Height),
            r: self.radius.resolve_on(size, Reference::Width),
            l: self.length.resolve_on(size, Reference::Width),
        }
    }
}

/// Geometry resolved against one surface size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelGeometry {
    pub x: i32,
    pub y: i32,
    pub r: i32,
    pub l: i32,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ControlKind {
    Joystick(Joystick),
    Button(Button),
    Slider(Slider),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Control {
    name: String,
    geometry: Geometry,
    style: String,
    touched_style: Option<String>,
    touch: Option<Touch>,
    cache: Option<PixelGeometry>,
    kind: ControlKind,
}

impl Control {
    pub fn new(name: impl Into<String>, kind: ControlKind) -> Self {
        Self {
            name: name.into(),
            geometry: Geometry::default(),
            style: "white".to_string(),
            touched_style: None,
            touch: None,
            cache: None,
            kind,
        }
    }

    pub fn joystick(name: impl Into<String>) -> Self {
        Self::new(name, ControlKind::Joystick(Joystick::default()))
    }

    pub fn button(name: impl Into<String>) -> Self {
        Self::new(name, ControlKind::Button(Button::default()))
    }

    pub fn slider(name: impl Into<String>) -> Self {
        Self::new(name, ControlKind::Slider(Slider::default()))
    }

    // ------------------------------------------------------------------
    // Builder
    // ------------------------------------------------------------------

    pub fn at(mut self, x: impl Into<Dimension>, y: impl Into<Dimension>) -> Self {
        self.geometry.x = x.into();
        self.geometry.y = y.into();
        self.cache = None;
        self
    }

    pub fn radius(mut self, radius: impl Into<Dimension>) -> Self {
        self.geometry.radius = radius.into();
        self.cache = None;
        self
    }

    /// Capsule length. Only sliders use it.
    pub fn length(mut self, length: impl Into<Dimension>) -> Self {
        self.geometry.length = length.into();
        self.cache = None;
        self
    }

    pub fn style(mut self, style: impl Into<String>) -> Self {
        self.style = style.into();
        self
    }

    pub fn touched_style(mut self, style: impl Into<String>) -> Self {
        self.touched_style = Some(style.into());
        self
    }

    /// Joysticks and sliders keep their last value on release; ungrouped
    /// buttons become toggles. Grouped buttons ignore it.
    pub fn sticky(mut self, sticky: bool) -> Self {
        match &mut self.kind {
            ControlKind::Joystick(j) => j.sticky = sticky,
            ControlKind::Slider(s) => s.sticky = sticky,
            ControlKind::Button(b) => {
                if b.group().is_none() {
                    b.mode = if sticky {
                        ButtonMode::Toggle
                    } else {
                        ButtonMode::Momentary
                    };
                }
            }
        }
        self
    }

    /// Put a button into a mutually exclusive group.
    pub fn group(mut self, group: impl Into<String>) -> Self {
        if let ControlKind::Button(b) = &mut self.kind {
            b.mode = ButtonMode::Grouped(group.into());
        }
        self
    }

    /// Initial pressed state of a button.
    pub fn pressed(mut self, pressed: bool) -> Self {
        if let ControlKind::Button(b) = &mut self.kind {
            b.set_pressed(pressed);
        }
        self
    }

    pub fn orientation(mut self, orientation: Orientation) -> Self {
        if let ControlKind::Slider(s) = &mut self.kind {
            s.orientation = orientation;
        }
        self
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    pub fn kind(&self) -> &ControlKind {
        &self.kind
    }

    pub fn kind_mut(&mut self) -> &mut ControlKind {
        &mut self.kind
    }

    pub fn touch(&self) -> Option<&Touch> {
        self.touch.as_ref()
    }

    pub fn is_owned(&self) -> bool {
        self.touch.is_some()
    }

    pub fn as_joystick(&self) -> Option<&Joystick> {
        match &self.kind {
            ControlKind::Joystick(j) => Some(j),
            _ => None,
        }
    }

    pub fn as_button(&self) -> Option<&Button> {
        match &self.kind {
            ControlKind::Button(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_button_mut(&mut self) -> Option<&mut Button> {
        match &mut self.kind {
            ControlKind::Button(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_slider(&self) -> Option<&Slider> {
        match &self.kind {
            ControlKind::Slider(s) => Some(s),
            _ => None,
        }
    }

    // ------------------------------------------------------------------
    // Capabilities
    // ------------------------------------------------------------------

    /// Resolved geometry, computed on first use after an invalidation.
    pub fn pixels(&mut self, size: SurfaceSize) -> PixelGeometry {
        match self.cache {
            Some(px) => px,
            None => {
                let px = self.geometry.resolve(size);
                self.cache = Some(px);
                px
            }
        }
    }

    pub fn invalidate(&mut self) {
        self.cache = None;
    }

    pub fn matches_touch(&mut self, touch: &Touch, size: SurfaceSize) -> bool {
        let px = self.pixels(size);
        match &self.kind {
            ControlKind::Slider(s) => s.contains(&px, touch),
            ControlKind::Joystick(_) | ControlKind::Button(_) => {
                let dx = f64::from(px.x - touch.x);
                let dy = f64::from(px.y - touch.y);
                dx.hypot(dy) <= f64::from(px.r)
            }
        }
    }

    /// Track `touch`, or release with `None`, and recompute the output.
    ///
    /// Returns the group whose other buttons must be released when a grouped
    /// button was just pressed.
    pub fn set_touch(&mut self, touch: Option<Touch>, size: SurfaceSize) -> Option<String> {
        let was_touched = self.touch.is_some();
        self.touch = touch;
        let px = self.pixels(size);
        match &mut self.kind {
            ControlKind::Joystick(j) => {
                j.track(&px, touch.as_ref());
                None
            }
            ControlKind::Slider(s) => {
                s.track(&px, touch.as_ref());
                None
            }
            ControlKind::Button(b) => b.track(was_touched, touch.is_some()),
        }
    }

    /// Release a grouped button because another member of `group` was
    /// pressed.
    pub(crate) fn release_in_group(&mut self, group: &str) {
        if let ControlKind::Button(b) = &mut self.kind
            && b.group() == Some(group)
        {
            b.set_pressed(false);
        }
    }

    pub fn draw<S: Surface + ?Sized>(&mut self, surface: &mut S, size: SurfaceSize) {
        let px = self.pixels(size);
        let frame_style = match (&self.touch, &self.touched_style) {
            (Some(_), Some(touched)) => touched.as_str(),
            _ => self.style.as_str(),
        };
        match &self.kind {
            ControlKind::Joystick(j) => j.draw(surface, &self.name, &px, &self.style, frame_style),
            ControlKind::Button(b) => b.draw(surface, &self.name, &px, frame_style),
            ControlKind::Slider(s) => s.draw(surface, &self.name, &px, frame_style),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::RecordingSurface;

    fn size() -> SurfaceSize {
        SurfaceSize::new(400, 800)
    }

    #[test]
    fn touch_at_center_always_matches() {
        let mut stick = Control::joystick("drive").at(50, 50).radius(Dimension::px(0));
        assert!(stick.matches_touch(&Touch::new(TouchId::Mouse, 200, 400), size()));
    }

    #[test]
    fn touch_beyond_radius_never_matches() {
        let mut button = Control::button("fire").at(50, 50).radius(Dimension::px(30));
        assert!(button.matches_touch(&Touch::new(TouchId::Mouse, 230, 400), size()));
        assert!(!button.matches_touch(&Touch::new(TouchId::Mouse, 231, 400), size()));
        assert!(!button.matches_touch(&Touch::new(TouchId::Mouse, 222, 422), size()));
    }

    #[test]
    fn pixels_are_cached_until_invalidated() {
        let mut stick = Control::joystick("drive").at(0.5, 0.5);
        assert_eq!(stick.pixels(size()).x, 200);
        assert_eq!(stick.pixels(SurfaceSize::new(1000, 1000)).x, 200);
        stick.invalidate();
        assert_eq!(stick.pixels(SurfaceSize::new(1000, 1000)).x, 500);
    }

    #[test]
    fn sticky_turns_plain_button_into_toggle_but_not_grouped() {
        let toggle = Control::button("lights").sticky(true);
        assert_eq!(toggle.as_button().unwrap().mode, ButtonMode::Toggle);

        let grouped = Control::button("fwd").group("gear").sticky(true);
        assert_eq!(
            grouped.as_button().unwrap().mode,
            ButtonMode::Grouped("gear".to_string())
        );
    }

    #[test]
    fn touched_style_applies_only_while_owned() {
        let mut button = Control::button("fire")
            .at(50, 50)
            .radius(Dimension::px(30))
            .style("white")
            .touched_style("red");
        let mut surface = RecordingSurface::new(400, 800);

        button.draw(&mut surface, size());
        assert!(matches!(&surface.shapes()[0], crate::Shape::Circle { style, .. } if style == "white"));

        surface.clear();
        button.set_touch(Some(Touch::new(TouchId::Mouse, 200, 400)), size());
        button.draw(&mut surface, size());
        assert!(matches!(&surface.shapes()[0], crate::Shape::Circle { style, filled: true, .. } if style == "red"));
    }
}
