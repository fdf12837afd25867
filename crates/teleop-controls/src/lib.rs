//! Touch controls for the operator surface.
//!
//! | Type | Output |
//! |---|---|
//! | [`Joystick`] | `(x, y)` in `[-1, 1]²`, right and up positive |
//! | [`Slider`] | `value` in `[0, 1]` along a capsule |
//! | [`Button`] | `pressed`, momentary, toggle or grouped |
//!
//! Controls are registered with a [`ControlManager`], which owns the touch
//! ownership map and the redraw tick.

pub mod button;
pub mod control;
pub mod dimension;
pub mod joystick;
pub mod manager;
pub mod slider;
pub mod surface;

pub use button::{Button, ButtonMode};
pub use control::{Control, ControlKind, Geometry, PixelGeometry, Touch};
pub use dimension::{Dimension, Reference};
pub use joystick::Joystick;
pub use manager::{ControlManager, DEFAULT_FRAME_RATE, PointerEvent, RawTouch};
pub use slider::{Orientation, Slider};
pub use surface::{RecordingSurface, Shape, Surface, SurfaceSize};
