//! Built-in operator layout for a two-wheel robot with one weapon motor.
//!
//! | Control | Kind | Position | Drives |
//! |---|---|---|---|
//! | `drive` | joystick | left, centre | `leftMotor`, `rightMotor` (arcade) |
//! | `weapon` | vertical slider | right, upper | `weaponMotor` power |
//! | `forward` / `reverse` | grouped buttons | right, lower | `weaponMotor` direction |

use teleop_controls::{Button, Control, Orientation, Slider, Surface};
use teleop_hal::drive::{LEFT_MOTOR, RIGHT_MOTOR};
use teleop_hal::{Device, TwoWheelDrive};
use teleop_runtime::Session;
use teleop_types::TeleopError;

pub const DRIVE: &str = "drive";
pub const WEAPON: &str = "weapon";
pub const FORWARD: &str = "forward";
pub const REVERSE: &str = "reverse";
pub const WEAPON_MOTOR: &str = "weaponMotor";

const DIRECTION_GROUP: &str = "direction";

/// Bind the controls, devices and operator loop of the default layout.
///
/// # Errors
///
/// Returns a duplicate-name error if the session already holds any of the
/// layout's controls or devices.
pub fn install<S: Surface>(session: &mut Session<S>) -> Result<(), TeleopError> {
    session.bind_control(
        Control::joystick(DRIVE)
            .at(20.0, 50.0)
            .radius(15.0)
            .touched_style("lime"),
    )?;
    session.bind_control(
        Control::slider(WEAPON)
            .orientation(Orientation::Vertical)
            .at(85.0, 20.0)
            .radius(5.0)
            .length(30.0)
            .touched_style("orange"),
    )?;
    session.bind_control(
        Control::button(FORWARD)
            .group(DIRECTION_GROUP)
            .at(75.0, 80.0)
            .radius(5.0),
    )?;
    session.bind_control(
        Control::button(REVERSE)
            .group(DIRECTION_GROUP)
            .at(90.0, 80.0)
            .radius(5.0),
    )?;

    let drive = TwoWheelDrive::install(session.devices_mut(), LEFT_MOTOR, RIGHT_MOTOR)?;
    session.bind_device(Device::motor(WEAPON_MOTOR))?;

    session.set_operator(move |controls, devices| {
        let (x, y) = controls
            .joystick(DRIVE)
            .map_or((0.0, 0.0), |j| (j.x(), j.y()));
        drive.arcade(devices, y, -x)?;

        let power = controls.slider(WEAPON).map_or(0.0, Slider::value);
        let reverse = controls.button(REVERSE).is_some_and(Button::pressed);
        devices.set(WEAPON_MOTOR, if reverse { -power } else { power })
    });
    Ok(())
}
