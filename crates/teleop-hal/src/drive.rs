//! Two-wheel differential drive on top of a [`DeviceRegistry`].
//!
//! | Mode | Inputs | Mixing |
//! |---|---|---|
//! | tank | left, right | passed through, clamped |
//! | arcade | speed, rotation | FIRST-style max/sum mix |

use teleop_types::TeleopError;

use crate::device::Device;
use crate::registry::DeviceRegistry;

pub const LEFT_MOTOR: &str = "leftMotor";
pub const RIGHT_MOTOR: &str = "rightMotor";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TwoWheelDrive {
    left: String,
    right: String,
    /// Exchange the left and right motors without rewiring.
    pub swap_motors: bool,
}

impl Default for TwoWheelDrive {
    fn default() -> Self {
        Self::new(LEFT_MOTOR, RIGHT_MOTOR)
    }
}

impl TwoWheelDrive {
    pub fn new(left: impl Into<String>, right: impl Into<String>) -> Self {
        Self {
            left: left.into(),
            right: right.into(),
            swap_motors: false,
        }
    }

    /// Register both motors and return a drive bound to them.
    ///
    /// # Errors
    ///
    /// Returns [`TeleopError::DuplicateDevice`] if either name is taken.
    pub fn install(
        registry: &mut DeviceRegistry,
        left: impl Into<String>,
        right: impl Into<String>,
    ) -> Result<Self, TeleopError> {
        let drive = Self::new(left, right);
        registry.register(Device::motor(drive.left.clone()))?;
        registry.register(Device::motor(drive.right.clone()))?;
        Ok(drive)
    }

    pub fn left_motor(&self) -> &str {
        if self.swap_motors { &self.right } else { &self.left }
    }

    pub fn right_motor(&self) -> &str {
        if self.swap_motors { &self.left } else { &self.right }
    }

    /// # Errors
    ///
    /// Returns [`TeleopError::UnknownDevice`] when a motor is not registered.
    pub fn set_motor_powers(
        &self,
        registry: &mut DeviceRegistry,
        left: f64,
        right: f64,
    ) -> Result<(), TeleopError> {
        registry.set(self.left_motor(), left.clamp(-1.0, 1.0))?;
        registry.set(self.right_motor(), right.clamp(-1.0, 1.0))
    }

    /// # Errors
    ///
    /// See [`TwoWheelDrive::set_motor_powers`].
    pub fn tank(&self, registry: &mut DeviceRegistry, left: f64, right: f64) -> Result<(), TeleopError> {
        self.set_motor_powers(registry, left, right)
    }

    /// Drive with separate `speed` (forward positive) and `rotation`.
    ///
    /// # Errors
    ///
    /// See [`TwoWheelDrive::set_motor_powers`].
    pub fn arcade(
        &self,
        registry: &mut DeviceRegistry,
        speed: f64,
        rotation: f64,
    ) -> Result<(), TeleopError> {
        let (left, right) = arcade_mix(speed, rotation);
        self.set_motor_powers(registry, left, right)
    }

    /// # Errors
    ///
    /// See [`TwoWheelDrive::set_motor_powers`].
    pub fn stop(&self, registry: &mut DeviceRegistry) -> Result<(), TeleopError> {
        self.set_motor_powers(registry, 0.0, 0.0)
    }
}

/// Mix `speed` and `rotation` (each clamped to `[-1, 1]`) into
/// `(left, right)` wheel powers.
pub fn arcade_mix(speed: f64, rotation: f64) -> (f64, f64) {
    let speed = speed.clamp(-1.0, 1.0);
    let rotation = rotation.clamp(-1.0, 1.0);
    if speed > 0.0 {
        if rotation > 0.0 {
            (speed - rotation, speed.max(rotation))
        } else {
            (speed.max(-rotation), speed + rotation)
        }
    } else if rotation > 0.0 {
        (-(-speed).max(rotation), speed + rotation)
    } else {
        (speed - rotation, -(-speed).max(-rotation))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry_with_drive() -> (DeviceRegistry, TwoWheelDrive) {
        let mut reg = DeviceRegistry::new();
        let drive = TwoWheelDrive::install(&mut reg, LEFT_MOTOR, RIGHT_MOTOR).unwrap();
        (reg, drive)
    }

    #[test]
    fn arcade_mix_quadrants() {
        assert_eq!(arcade_mix(1.0, 0.0), (1.0, 1.0));
        assert_eq!(arcade_mix(-1.0, 0.0), (-1.0, -1.0));
        assert_eq!(arcade_mix(0.5, 0.5), (0.0, 0.5));
        assert_eq!(arcade_mix(0.5, -0.5), (0.5, 0.0));
        assert_eq!(arcade_mix(0.0, 1.0), (-1.0, 1.0));
        assert_eq!(arcade_mix(-0.5, -0.5), (0.0, -0.5));
    }

    #[test]
    fn arcade_inputs_are_clamped() {
        assert_eq!(arcade_mix(4.0, 0.0), (1.0, 1.0));
    }

    #[test]
    fn tank_sets_both_motors() {
        let (mut reg, drive) = registry_with_drive();
        drive.tank(&mut reg, 0.25, -2.0).unwrap();
        assert_eq!(reg.value(LEFT_MOTOR), Some(0.25));
        assert_eq!(reg.value(RIGHT_MOTOR), Some(-1.0));
    }

    #[test]
    fn swap_exchanges_motors() {
        let (mut reg, mut drive) = registry_with_drive();
        drive.swap_motors = true;
        drive.tank(&mut reg, 1.0, 0.0).unwrap();
        assert_eq!(reg.value(LEFT_MOTOR), Some(0.0));
        assert_eq!(reg.value(RIGHT_MOTOR), Some(1.0));
    }

    #[test]
    fn stop_zeroes_motors() {
        let (mut reg, drive) = registry_with_drive();
        drive.arcade(&mut reg, 1.0, 0.0).unwrap();
        drive.stop(&mut reg).unwrap();
        assert_eq!(reg.value(LEFT_MOTOR), Some(0.0));
        assert_eq!(reg.value(RIGHT_MOTOR), Some(0.0));
    }

    #[test]
    fn install_twice_is_duplicate() {
        let (mut reg, _) = registry_with_drive();
        assert!(matches!(
            TwoWheelDrive::install(&mut reg, LEFT_MOTOR, "other"),
            Err(TeleopError::DuplicateDevice(_))
        ));
    }

    #[test]
    fn unbound_drive_reports_unknown_device() {
        let mut reg = DeviceRegistry::new();
        let drive = TwoWheelDrive::default();
        assert_eq!(
            drive.stop(&mut reg),
            Err(TeleopError::UnknownDevice(LEFT_MOTOR.to_string()))
        );
    }
}
