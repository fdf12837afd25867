//! `teleop-runtime` – The operator session
//!
//! Wires the control surface, the device layer and the robot link into one
//! cooperative event loop.
//!
//! # Modules
//!
//! - [`session`] – [`Session`][session::Session]: the context object that
//!   owns controls, devices, the [`Connection`][teleop_link::Connection] and
//!   the issue list, with an explicit create/bind/start/stop/dispose
//!   lifecycle. [`Session::run`][session::Session::run] multiplexes pointer
//!   input, link events and the redraw tick on a single task.
//! - [`issues`] – [`IssueLog`][issues::IssueLog]: deduplicated
//!   `SETUP`/`LINK`/`DATA`/`LOOP` problems for display.
//! - [`telemetry`] – [`init_tracing`][telemetry::init_tracing]: console
//!   logging plus optional OTLP span export.

pub mod issues;
pub mod session;
pub mod telemetry;

pub use issues::IssueLog;
pub use session::{OperatorLoop, Session, SessionConfig, SessionStatus};
pub use telemetry::{TelemetryGuard, init_tracing};
