//! [`ControlManager`] – control registry, touch ownership and redraw loop.
//!
//! The manager is bound to one [`Surface`] and owns every registered
//! [`Control`], in registration order. It turns raw pointer events into
//! control updates:
//!
//! | Event | Effect |
//! |---|---|
//! | touch start / mouse down | first free control (in registration order) whose hit test matches captures the touch |
//! | touch move / mouse move | forwarded to the owning control, ignored when unowned |
//! | touch end / mouse up | owning control is released and the ownership entry removed |
//!
//! Redraws run on a fixed-period tick independent of input. On the first
//! tick after the surface changes size every control's pixel cache is
//! recomputed before anything is drawn.

use std::collections::HashMap;
use std::time::Duration;

use teleop_types::{TeleopError, TouchId};
use tokio::time::{Interval, MissedTickBehavior};
use tracing::{debug, trace};

use crate::button::Button;
use crate::control::{Control, Touch};
use crate::joystick::Joystick;
use crate::slider::Slider;
use crate::surface::{Surface, SurfaceSize};

/// Default redraw rate, frames per second.
pub const DEFAULT_FRAME_RATE: u32 = 30;

/// One changed touch point, in client (screen) coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawTouch {
    pub identifier: i64,
    pub client_x: f64,
    pub client_y: f64,
    pub force: Option<f64>,
}

impl RawTouch {
    pub fn new(identifier: i64, client_x: f64, client_y: f64) -> Self {
        Self {
            identifier,
            client_x,
            client_y,
            force: None,
        }
    }
}

/// Raw input as delivered by the windowing layer.
#[derive(Debug, Clone, PartialEq)]
pub enum PointerEvent {
    MouseDown { client_x: f64, client_y: f64 },
    MouseMove { client_x: f64, client_y: f64 },
    MouseUp { client_x: f64, client_y: f64 },
    TouchStart(Vec<RawTouch>),
    TouchMove(Vec<RawTouch>),
    TouchEnd(Vec<RawTouch>),
}

#[derive(Debug, Clone, Copy)]
enum Phase {
    Start,
    Move,
    End,
}

pub struct ControlManager<S: Surface> {
    surface: S,
    controls: Vec<Control>,
    index: HashMap<String, usize>,
    owners: HashMap<TouchId, usize>,
    last_size: Option<SurfaceSize>,
    frame_interval: Duration,
    ticker: Option<Interval>,
}

impl<S: Surface> ControlManager<S> {
    pub fn new(surface: S) -> Self {
        Self::with_frame_rate(surface, DEFAULT_FRAME_RATE)
    }

    pub fn with_frame_rate(surface: S, frame_rate: u32) -> Self {
        Self {
            surface,
            controls: Vec::new(),
            index: HashMap::new(),
            owners: HashMap::new(),
            last_size: None,
            frame_interval: Duration::from_secs_f64(1.0 / f64::from(frame_rate.max(1))),
            ticker: None,
        }
    }

    /// Add `control` after every control registered so far.
    ///
    /// # Errors
    ///
    /// Returns [`TeleopError::DuplicateControl`] when the name is taken.
    pub fn register(&mut self, control: Control) -> Result<(), TeleopError> {
        if self.index.contains_key(control.name()) {
            return Err(TeleopError::DuplicateControl(control.name().to_string()));
        }
        self.index
            .insert(control.name().to_string(), self.controls.len());
        self.controls.push(control);
        Ok(())
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    pub fn frame_interval(&self) -> Duration {
        self.frame_interval
    }

    pub fn controls(&self) -> &[Control] {
        &self.controls
    }

    pub fn get(&self, name: &str) -> Option<&Control> {
        self.index.get(name).map(|&i| &self.controls[i])
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Control> {
        self.index.get(name).map(|&i| &mut self.controls[i])
    }

    pub fn joystick(&self, name: &str) -> Option<&Joystick> {
        self.get(name).and_then(Control::as_joystick)
    }

    pub fn button(&self, name: &str) -> Option<&Button> {
        self.get(name).and_then(Control::as_button)
    }

    pub fn slider(&self, name: &str) -> Option<&Slider> {
        self.get(name).and_then(Control::as_slider)
    }

    /// Name of the control currently owning `id`.
    pub fn owner_of(&self, id: TouchId) -> Option<&str> {
        self.owners.get(&id).map(|&i| self.controls[i].name())
    }

    // ------------------------------------------------------------------
    // Input
    // ------------------------------------------------------------------

    /// Route one raw event. Returns `true` when any control was updated.
    pub fn handle_pointer(&mut self, event: PointerEvent) -> bool {
        match event {
            PointerEvent::MouseDown { client_x, client_y } => {
                self.dispatch(Phase::Start, TouchId::Mouse, client_x, client_y, None)
            }
            PointerEvent::MouseMove { client_x, client_y } => {
                self.dispatch(Phase::Move, TouchId::Mouse, client_x, client_y, None)
            }
            PointerEvent::MouseUp { client_x, client_y } => {
                self.dispatch(Phase::End, TouchId::Mouse, client_x, client_y, None)
            }
            PointerEvent::TouchStart(touches) => self.dispatch_all(Phase::Start, &touches),
            PointerEvent::TouchMove(touches) => self.dispatch_all(Phase::Move, &touches),
            PointerEvent::TouchEnd(touches) => self.dispatch_all(Phase::End, &touches),
        }
    }

    fn dispatch_all(&mut self, phase: Phase, touches: &[RawTouch]) -> bool {
        let mut updated = false;
        for raw in touches {
            updated |= self.dispatch(
                phase,
                TouchId::Finger(raw.identifier),
                raw.client_x,
                raw.client_y,
                raw.force,
            );
        }
        updated
    }

    fn dispatch(
        &mut self,
        phase: Phase,
        id: TouchId,
        client_x: f64,
        client_y: f64,
        force: Option<f64>,
    ) -> bool {
        let (left, top) = self.surface.offset();
        let touch = Touch {
            id,
            x: (client_x - left).round() as i32,
            y: (client_y - top).round() as i32,
            force,
        };
        match phase {
            Phase::Start => self.capture(touch),
            Phase::Move => self.track(touch),
            Phase::End => self.release(id),
        }
    }

    fn capture(&mut self, touch: Touch) -> bool {
        if self.owners.contains_key(&touch.id) {
            return self.track(touch);
        }
        let size = self.surface.size();
        let found = self
            .controls
            .iter_mut()
            .position(|c| !c.is_owned() && c.matches_touch(&touch, size));
        let Some(index) = found else {
            trace!(touch = %touch.id, x = touch.x, y = touch.y, "touch missed every control");
            return false;
        };
        debug!(touch = %touch.id, control = self.controls[index].name(), "touch captured");
        self.owners.insert(touch.id, index);
        self.apply(index, Some(touch));
        true
    }

    fn track(&mut self, touch: Touch) -> bool {
        let Some(&index) = self.owners.get(&touch.id) else {
            return false;
        };
        self.apply(index, Some(touch));
        true
    }

    fn release(&mut self, id: TouchId) -> bool {
        let Some(index) = self.owners.remove(&id) else {
            return false;
        };
        debug!(touch = %id, control = self.controls[index].name(), "touch released");
        self.apply(index, None);
        true
    }

    fn apply(&mut self, index: usize, touch: Option<Touch>) {
        let size = self.surface.size();
        if let Some(group) = self.controls[index].set_touch(touch, size) {
            for (i, control) in self.controls.iter_mut().enumerate() {
                if i != index {
                    control.release_in_group(&group);
                }
            }
        }
    }

    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    /// Press the first-registered button of every group that has nothing
    /// pressed yet.
    pub fn apply_group_defaults(&mut self) {
        let mut groups: Vec<(String, Vec<usize>)> = Vec::new();
        for (i, control) in self.controls.iter().enumerate() {
            let Some(group) = control.as_button().and_then(Button::group) else {
                continue;
            };
            match groups.iter_mut().find(|(name, _)| name == group) {
                Some((_, members)) => members.push(i),
                None => groups.push((group.to_string(), vec![i])),
            }
        }
        for (group, members) in groups {
            let any_pressed = members
                .iter()
                .any(|&i| self.controls[i].as_button().is_some_and(Button::pressed));
            if any_pressed {
                continue;
            }
            let first = &mut self.controls[members[0]];
            debug!(group = %group, button = first.name(), "group default");
            if let Some(button) = first.as_button_mut() {
                button.set_pressed(true);
            }
        }
    }

    /// Apply group defaults and start the redraw tick. Needs a tokio runtime.
    pub fn start(&mut self) {
        self.apply_group_defaults();
        let mut ticker = tokio::time::interval(self.frame_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        self.ticker = Some(ticker);
    }

    pub fn stop(&mut self) {
        self.ticker = None;
    }

    pub fn is_running(&self) -> bool {
        self.ticker.is_some()
    }

    /// Wait for the next redraw tick. Never resolves while stopped. Cancel
    /// safe.
    pub async fn next_frame(&mut self) {
        match self.ticker.as_mut() {
            Some(ticker) => {
                ticker.tick().await;
            }
            None => std::future::pending().await,
        }
    }

    /// Push the next redraw tick one full period into the future.
    pub fn skip_next_frame(&mut self) {
        if let Some(ticker) = self.ticker.as_mut() {
            ticker.reset();
        }
    }

    /// Clear the surface and draw every control in registration order.
    pub fn redraw(&mut self) {
        let size = self.surface.size();
        if self.last_size != Some(size) {
            debug!(width = size.width, height = size.height, "surface resized");
            self.last_size = Some(size);
            for control in &mut self.controls {
                control.invalidate();
            }
        }
        self.surface.clear();
        for control in &mut self.controls {
            control.draw(&mut self.surface, size);
        }
    }
}

impl<S: Surface> std::fmt::Debug for ControlManager<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ControlManager")
            .field("controls", &self.controls.len())
            .field("owned_touches", &self.owners.len())
            .field("running", &self.ticker.is_some())
            .finish()
    }
}
