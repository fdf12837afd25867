//! `teleop-hal` – Logical devices on the robot
//!
//! The operator loop writes plain numbers into named devices; this crate
//! turns them into wire values and packets.
//!
//! # Modules
//!
//! - [`device`] – [`Device`] and its closed set of kinds
//!   ([`Motor`], [`Servo`], [`DigitalOutput`], [`DigitalInput`]).
//! - [`registry`] – [`DeviceRegistry`]: registration, configuration
//!   validation, output collection and inbound input routing.
//! - [`config`] – [`HardwareConfig`] loaded from the robot's
//!   `hardware.json`.
//! - [`packet`] – [`PacketFormat`] (JSON object or legacy colon-delimited)
//!   and the assembled [`Packet`].
//! - [`drive`] – [`TwoWheelDrive`] tank and arcade mixing.

pub mod config;
pub mod device;
pub mod drive;
pub mod packet;
pub mod registry;

pub use config::{DeviceConfig, HardwareConfig};
pub use device::{Device, DeviceKind, DigitalInput, DigitalOutput, Motor, Servo};
pub use drive::{TwoWheelDrive, arcade_mix};
pub use packet::{Packet, PacketFormat};
pub use registry::DeviceRegistry;
