//! Logical devices: named value sinks (and sources) on the robot.
//!
//! | Kind | Operator value | Wire output | Drivers |
//! |---|---|---|---|
//! | [`Motor`] | `[-1, 1]` | integer `[-1023, 1023]` | `PWM_HBRIDGE`, `PWM` |
//! | [`Servo`] | `[0, 1]` | integer `[0, 1023]` | `PWM` |
//! | [`DigitalOutput`] | `bool` | `"1"` / `"0"` | `DIGITAL_OUT` |
//! | [`DigitalInput`] | read-only `bool` | none | `DIGITAL_IN` |
//!
//! Driver names are compared case-insensitively.

use serde_json::Value;

const FULL_SCALE: f64 = 1023.0;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Motor {
    pub reversed: bool,
    value: f64,
}

impl Motor {
    pub fn set(&mut self, value: f64) {
        let value = if self.reversed { -value } else { value };
        self.value = value.clamp(-1.0, 1.0);
    }

    pub fn get(&self) -> f64 {
        self.value
    }
}

/// Position servo. `0` commands `min_output`, `1` commands `max_output`
/// (swapped when reversed).
#[derive(Debug, Clone, PartialEq)]
pub struct Servo {
    pub min_output: f64,
    pub max_output: f64,
    pub reversed: bool,
    value: f64,
}

impl Default for Servo {
    fn default() -> Self {
        Self {
            min_output: 0.0,
            max_output: 1.0,
            reversed: false,
            value: 0.5,
        }
    }
}

impl Servo {
    pub fn set(&mut self, value: f64) {
        let value = value.clamp(0.0, 1.0);
        let (from, to) = if self.reversed {
            (self.max_output, self.min_output)
        } else {
            (self.min_output, self.max_output)
        };
        self.value = from + value * (to - from);
    }

    /// Commanded output position.
    pub fn get(&self) -> f64 {
        self.value
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DigitalOutput {
    pub inverted: bool,
    value: bool,
}

impl DigitalOutput {
    pub fn set(&mut self, on: bool) {
        self.value = on != self.inverted;
    }

    pub fn get(&self) -> bool {
        self.value
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DigitalInput {
    value: bool,
}

impl DigitalInput {
    pub fn get(&self) -> bool {
        self.value
    }

    /// JavaScript-style truthiness of the inbound value.
    pub fn set_input(&mut self, value: &Value) {
        self.value = match value {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
            Value::String(s) => !s.is_empty(),
            Value::Array(_) | Value::Object(_) => true,
        };
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DeviceKind {
    Motor(Motor),
    Servo(Servo),
    DigitalOutput(DigitalOutput),
    DigitalInput(DigitalInput),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Device {
    name: String,
    kind: DeviceKind,
}

impl Device {
    pub fn new(name: impl Into<String>, kind: DeviceKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }

    pub fn motor(name: impl Into<String>) -> Self {
        Self::new(name, DeviceKind::Motor(Motor::default()))
    }

    pub fn servo(name: impl Into<String>) -> Self {
        Self::new(name, DeviceKind::Servo(Servo::default()))
    }

    pub fn digital_output(name: impl Into<String>) -> Self {
        Self::new(name, DeviceKind::DigitalOutput(DigitalOutput::default()))
    }

    pub fn digital_input(name: impl Into<String>) -> Self {
        Self::new(name, DeviceKind::DigitalInput(DigitalInput::default()))
    }

    /// Reverse a motor or servo, or invert a digital output.
    pub fn reversed(mut self, reversed: bool) -> Self {
        match &mut self.kind {
            DeviceKind::Motor(m) => m.reversed = reversed,
            DeviceKind::Servo(s) => s.reversed = reversed,
            DeviceKind::DigitalOutput(d) => d.inverted = reversed,
            DeviceKind::DigitalInput(_) => {}
        }
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &DeviceKind {
        &self.kind
    }

    pub fn kind_mut(&mut self) -> &mut DeviceKind {
        &mut self.kind
    }

    /// Set the operator value. Digital outputs treat anything non-zero as on.
    /// Inputs ignore it.
    pub fn set(&mut self, value: f64) {
        match &mut self.kind {
            DeviceKind::Motor(m) => m.set(value),
            DeviceKind::Servo(s) => s.set(value),
            DeviceKind::DigitalOutput(d) => d.set(value != 0.0),
            DeviceKind::DigitalInput(_) => {}
        }
    }

    /// Current value as a number (`1.0`/`0.0` for digital devices).
    pub fn value(&self) -> f64 {
        match &self.kind {
            DeviceKind::Motor(m) => m.get(),
            DeviceKind::Servo(s) => s.get(),
            DeviceKind::DigitalOutput(d) => f64::from(u8::from(d.get())),
            DeviceKind::DigitalInput(d) => f64::from(u8::from(d.get())),
        }
    }

    /// Wire representation, `None` for input-only devices.
    pub fn output(&self) -> Option<String> {
        match &self.kind {
            DeviceKind::Motor(m) => Some(((m.get() * FULL_SCALE).round() as i64).to_string()),
            DeviceKind::Servo(s) => Some(((s.get() * FULL_SCALE).round() as i64).to_string()),
            DeviceKind::DigitalOutput(d) => Some(if d.get() { "1" } else { "0" }.to_string()),
            DeviceKind::DigitalInput(_) => None,
        }
    }

    pub fn set_input(&mut self, value: &Value) -> bool {
        match &mut self.kind {
            DeviceKind::DigitalInput(d) => {
                d.set_input(value);
                true
            }
            _ => false,
        }
    }

    pub fn supports_driver(&self, driver: &str) -> bool {
        let supported: &[&str] = match self.kind {
            DeviceKind::Motor(_) => &["PWM_HBRIDGE", "PWM"],
            DeviceKind::Servo(_) => &["PWM"],
            DeviceKind::DigitalOutput(_) => &["DIGITAL_OUT"],
            DeviceKind::DigitalInput(_) => &["DIGITAL_IN"],
        };
        supported.iter().any(|d| d.eq_ignore_ascii_case(driver))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn motor_output_is_scaled_and_clamped() {
        let mut motor = Device::motor("leftMotor");
        assert_eq!(motor.output().as_deref(), Some("0"));
        motor.set(0.5);
        assert_eq!(motor.output().as_deref(), Some("512"));
        motor.set(-3.0);
        assert_eq!(motor.output().as_deref(), Some("-1023"));
    }

    #[test]
    fn reversed_motor_flips_sign() {
        let mut motor = Device::motor("rightMotor").reversed(true);
        motor.set(1.0);
        assert_eq!(motor.output().as_deref(), Some("-1023"));
    }

    #[test]
    fn servo_starts_centered_and_maps_range() {
        let mut servo = Device::servo("pan");
        assert_eq!(servo.output().as_deref(), Some("512"));
        servo.set(1.0);
        assert_eq!(servo.output().as_deref(), Some("1023"));

        let mut reversed = Device::servo("tilt").reversed(true);
        reversed.set(1.0);
        assert_eq!(reversed.output().as_deref(), Some("0"));
    }

    #[test]
    fn digital_output_honours_inversion() {
        let mut lamp = Device::digital_output("lamp");
        lamp.set(1.0);
        assert_eq!(lamp.output().as_deref(), Some("1"));
        let mut inverted = Device::digital_output("relay").reversed(true);
        inverted.set(1.0);
        assert_eq!(inverted.output().as_deref(), Some("0"));
    }

    #[test]
    fn digital_input_reads_truthiness_and_has_no_output() {
        let mut bumper = Device::digital_input("bumper");
        assert_eq!(bumper.output(), None);
        assert!(bumper.set_input(&json!(1)));
        assert_eq!(bumper.value(), 1.0);
        bumper.set_input(&json!(""));
        assert_eq!(bumper.value(), 0.0);
        bumper.set_input(&json!("yes"));
        assert_eq!(bumper.value(), 1.0);
        assert!(!Device::motor("m").set_input(&json!(1)));
    }

    #[test]
    fn driver_support_is_case_insensitive() {
        let motor = Device::motor("m");
        assert!(motor.supports_driver("PWM_HBridge"));
        assert!(motor.supports_driver("pwm"));
        assert!(!motor.supports_driver("DIGITAL_OUT"));
        assert!(Device::servo("s").supports_driver("PWM"));
        assert!(!Device::servo("s").supports_driver("PWM_HBRIDGE"));
    }
}
