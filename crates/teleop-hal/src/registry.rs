//! [`DeviceRegistry`] – named logical devices and their configuration.
//!
//! The registry keeps devices in registration order, validates them against
//! the robot's [`HardwareConfig`], collects outputs into packets and feeds
//! inbound values to input devices.
//!
//! # Validation
//!
//! Problems are collected, never raised:
//!
//! | Condition | Issue message |
//! |---|---|
//! | no configuration at all | `Hardware configuration not set` |
//! | configuration without `devices` | `Hardware configuration is missing devices` |
//! | device missing from `devices` | `Device has no configuration: <name>` |
//! | unsupported driver | `Device <name> has invalid driver: <driver>` |

use std::collections::HashMap;

use serde_json::{Map, Value};
use teleop_types::{Issue, TeleopError};
use tracing::{debug, trace};

use crate::config::HardwareConfig;
use crate::device::Device;
use crate::packet::{Packet, PacketFormat};

#[derive(Debug, Default)]
pub struct DeviceRegistry {
    devices: Vec<Device>,
    index: HashMap<String, usize>,
    config: Option<HardwareConfig>,
}

impl DeviceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// # Errors
    ///
    /// Returns [`TeleopError::DuplicateDevice`] when the name is taken.
    pub fn register(&mut self, device: Device) -> Result<(), TeleopError> {
        if self.index.contains_key(device.name()) {
            return Err(TeleopError::DuplicateDevice(device.name().to_string()));
        }
        debug!(device = device.name(), "device registered");
        self.index.insert(device.name().to_string(), self.devices.len());
        self.devices.push(device);
        Ok(())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&Device> {
        self.index.get(name).map(|&i| &self.devices[i])
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Device> {
        self.index.get(name).map(|&i| &mut self.devices[i])
    }

    pub fn devices(&self) -> &[Device] {
        &self.devices
    }

    /// Set the operator value of `name`.
    ///
    /// # Errors
    ///
    /// Returns [`TeleopError::UnknownDevice`] when nothing is registered
    /// under `name`.
    pub fn set(&mut self, name: &str, value: f64) -> Result<(), TeleopError> {
        let device = self
            .get_mut(name)
            .ok_or_else(|| TeleopError::UnknownDevice(name.to_string()))?;
        device.set(value);
        Ok(())
    }

    /// Current value of `name`, `None` when unknown.
    pub fn value(&self, name: &str) -> Option<f64> {
        self.get(name).map(Device::value)
    }

    pub fn set_config(&mut self, config: HardwareConfig) {
        self.config = Some(config);
    }

    pub fn config(&self) -> Option<&HardwareConfig> {
        self.config.as_ref()
    }

    pub fn validate(&self) -> Vec<Issue> {
        let Some(config) = &self.config else {
            return vec![Issue::setup("Hardware configuration not set")];
        };
        let Some(configured) = &config.devices else {
            return vec![Issue::setup("Hardware configuration is missing devices")];
        };

        let mut issues = Vec::new();
        for device in &self.devices {
            match configured.get(device.name()) {
                Some(entry) if !device.supports_driver(&entry.driver) => {
                    issues.push(Issue::setup(format!(
                        "Device {} has invalid driver: {}",
                        device.name(),
                        entry.driver
                    )));
                }
                Some(_) => {}
                None => issues.push(Issue::setup(format!(
                    "Device has no configuration: {}",
                    device.name()
                ))),
            }
        }
        issues
    }

    /// `(name, output)` of every output device, in registration order.
    pub fn outputs(&self) -> Vec<(&str, String)> {
        self.devices
            .iter()
            .filter_map(|d| d.output().map(|out| (d.name(), out)))
            .collect()
    }

    /// Feed inbound values to matching input devices. Unknown names and
    /// output devices are skipped. Returns how many inputs were updated.
    pub fn set_inputs(&mut self, values: &Map<String, Value>) -> usize {
        let mut updated = 0;
        for (name, value) in values {
            if let Some(device) = self.get_mut(name)
                && device.set_input(value)
            {
                trace!(device = %name, value = %value, "input updated");
                updated += 1;
            }
        }
        updated
    }

    pub fn packet(&self, format: &PacketFormat) -> Packet {
        match format {
            PacketFormat::Json => Packet::Json(
                self.outputs()
                    .into_iter()
                    .map(|(name, out)| (name.to_string(), Value::String(out)))
                    .collect(),
            ),
            PacketFormat::Legacy { channels } => {
                let fields: Vec<String> = channels
                    .iter()
                    .map(|name| {
                        self.get(name)
                            .and_then(Device::output)
                            .unwrap_or_else(|| "0".to_string())
                    })
                    .collect();
                Packet::Text(fields.join(":"))
            }
        }
    }
}
