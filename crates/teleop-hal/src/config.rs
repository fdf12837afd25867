//! Robot-side hardware configuration.
//!
//! Loaded once at startup from JSON shaped like:
//!
//! ```json
//! { "devices": {
//!     "leftMotor":   { "driver": "PWM_HBRIDGE", "pwmPin": 2, "dirPin": 4 },
//!     "weaponMotor": { "driver": "PWM", "pwmPin": 6, "minMicroseconds": 900 }
//! } }
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use teleop_types::TeleopError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceConfig {
    pub driver: String,
    /// Driver options such as pin numbers and pulse widths.
    #[serde(flatten)]
    pub options: BTreeMap<String, i64>,
}

impl DeviceConfig {
    pub fn new(driver: impl Into<String>) -> Self {
        Self {
            driver: driver.into(),
            options: BTreeMap::new(),
        }
    }

    pub fn with_option(mut self, key: impl Into<String>, value: i64) -> Self {
        self.options.insert(key.into(), value);
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HardwareConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub devices: Option<BTreeMap<String, DeviceConfig>>,
}

impl HardwareConfig {
    pub fn with_device(mut self, name: impl Into<String>, config: DeviceConfig) -> Self {
        self.devices
            .get_or_insert_with(BTreeMap::new)
            .insert(name.into(), config);
        self
    }

    pub fn device(&self, name: &str) -> Option<&DeviceConfig> {
        self.devices.as_ref().and_then(|d| d.get(name))
    }

    /// # Errors
    ///
    /// Returns [`TeleopError::Config`] when the JSON is malformed.
    pub fn from_json(text: &str) -> Result<Self, TeleopError> {
        serde_json::from_str(text)
            .map_err(|e| TeleopError::Config(format!("invalid hardware configuration: {e}")))
    }

    /// # Errors
    ///
    /// Returns [`TeleopError::Config`] when the file cannot be read or parsed.
    pub fn load_from(path: &Path) -> Result<Self, TeleopError> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            TeleopError::Config(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_json(&text)
    }
}
