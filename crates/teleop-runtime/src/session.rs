//! [`Session`] – one operator console talking to one robot.
//!
//! The session owns every piece of mutable state: the control surface, the
//! device registry, the connection and the issue list. Nothing is global.
//!
//! # Lifecycle
//!
//! | Step | Call |
//! |---|---|
//! | create | [`Session::new`] with a surface, a [`Connection`] and a [`SessionConfig`] |
//! | bind | [`Session::bind_control`], [`Session::bind_device`], [`Session::set_hardware_config`], [`Session::set_operator`] |
//! | start | [`Session::start`] validates devices and starts the redraw tick and the link |
//! | run | [`Session::run`] drives pointer input, link events and redraws on one task |
//! | stop | [`Session::stop`] halts the tick and disconnects |
//! | dispose | [`Session::dispose`] stops and drops everything |
//!
//! # Update cycle
//!
//! Every pointer event that reaches a control runs the operator loop, which
//! reads controls and writes devices, and then hands a fresh packet to the
//! connection. Inbound JSON objects from the robot are routed to input
//! devices.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use teleop_controls::{Control, ControlManager, DEFAULT_FRAME_RATE, PointerEvent, Surface};
use teleop_hal::{Device, DeviceRegistry, HardwareConfig, Packet, PacketFormat};
use teleop_link::observer::Observers;
use teleop_link::{Connection, LinkEvent, SubscriptionId, TransportKind};
use teleop_types::{Issue, IssueKind, LinkError, LinkState, TeleopError};
use tokio::sync::mpsc::{self, UnboundedReceiver};
use tokio::sync::watch;
use tracing::{debug, info, instrument, trace};

use crate::issues::IssueLog;

// ─────────────────────────────────────────────────────────────────────────────
// Configuration
// ─────────────────────────────────────────────────────────────────────────────

fn default_frame_rate() -> u32 {
    DEFAULT_FRAME_RATE
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Redraws per second.
    #[serde(default = "default_frame_rate")]
    pub frame_rate: u32,
    /// Delay the next redraw when a poll times out.
    #[serde(default)]
    pub skip_frame_on_timeout: bool,
    #[serde(default)]
    pub packet_format: PacketFormat,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            frame_rate: default_frame_rate(),
            skip_frame_on_timeout: false,
            packet_format: PacketFormat::default(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Status
// ─────────────────────────────────────────────────────────────────────────────

/// Snapshot for a status indicator.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionStatus {
    pub transport: TransportKind,
    pub state: LinkState,
    pub ping: Option<Duration>,
    pub last_error: Option<LinkError>,
    pub issues: Vec<Issue>,
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.state)?;
        if let Some(ping) = self.ping {
            write!(f, " ({} ms)", ping.as_millis())?;
        }
        if let Some(error) = &self.last_error
            && self.state == LinkState::Error
        {
            write!(f, ": {error}")?;
        }
        if !self.issues.is_empty() {
            write!(f, " [{} issue(s)]", self.issues.len())?;
        }
        Ok(())
    }
}

pub type StatusObserver = dyn FnMut(&SessionStatus) + Send;

/// Reads controls and writes devices. Errors become `LOOP` issues.
pub type OperatorLoop<S> =
    Box<dyn FnMut(&ControlManager<S>, &mut DeviceRegistry) -> Result<(), TeleopError> + Send>;

/// Link notifications, queued by the connection's observers and applied by
/// the session right after the call that produced them.
enum LinkNotice {
    State { new: LinkState, old: LinkState },
    Failure(LinkError),
    Response(Option<String>),
}

// ─────────────────────────────────────────────────────────────────────────────
// Session
// ─────────────────────────────────────────────────────────────────────────────

pub struct Session<S: Surface> {
    config: SessionConfig,
    controls: ControlManager<S>,
    devices: DeviceRegistry,
    connection: Connection,
    issues: IssueLog,
    operator: Option<OperatorLoop<S>>,
    status_observers: Observers<StatusObserver>,
    notices: UnboundedReceiver<LinkNotice>,
    running: bool,
}

impl<S: Surface> Session<S> {
    pub fn new(surface: S, mut connection: Connection, config: SessionConfig) -> Self {
        let (tx, notices) = mpsc::unbounded_channel();
        let state_tx = tx.clone();
        connection.on_state_change(move |new, old| {
            let _ = state_tx.send(LinkNotice::State { new, old });
        });
        let error_tx = tx.clone();
        connection.on_link_error(move |error| {
            let _ = error_tx.send(LinkNotice::Failure(error.clone()));
        });
        connection.on_response_data(move |data| {
            let _ = tx.send(LinkNotice::Response(data.map(str::to_string)));
        });

        Self {
            controls: ControlManager::with_frame_rate(surface, config.frame_rate),
            config,
            devices: DeviceRegistry::new(),
            connection,
            issues: IssueLog::new(),
            operator: None,
            status_observers: Observers::new(),
            notices,
            running: false,
        }
    }

    // -------------------------------------------------------------------------
    // Binding
    // -------------------------------------------------------------------------

    /// # Errors
    ///
    /// Returns [`TeleopError::DuplicateControl`] when the name is taken.
    pub fn bind_control(&mut self, control: Control) -> Result<(), TeleopError> {
        self.controls.register(control)
    }

    /// # Errors
    ///
    /// Returns [`TeleopError::DuplicateDevice`] when the name is taken.
    pub fn bind_device(&mut self, device: Device) -> Result<(), TeleopError> {
        self.devices.register(device)
    }

    pub fn set_hardware_config(&mut self, config: HardwareConfig) {
        self.devices.set_config(config);
    }

    pub fn set_operator<F>(&mut self, operator: F)
    where
        F: FnMut(&ControlManager<S>, &mut DeviceRegistry) -> Result<(), TeleopError>
            + Send
            + 'static,
    {
        self.operator = Some(Box::new(operator));
    }

    pub fn on_status_change<F>(&mut self, observer: F) -> SubscriptionId
    where
        F: FnMut(&SessionStatus) + Send + 'static,
    {
        self.status_observers.subscribe(Box::new(observer))
    }

    pub fn unsubscribe_status(&mut self, id: SubscriptionId) -> bool {
        self.status_observers.unsubscribe(id)
    }

    // -------------------------------------------------------------------------
    // Accessors
    // -------------------------------------------------------------------------

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn controls(&self) -> &ControlManager<S> {
        &self.controls
    }

    pub fn controls_mut(&mut self) -> &mut ControlManager<S> {
        &mut self.controls
    }

    pub fn devices(&self) -> &DeviceRegistry {
        &self.devices
    }

    pub fn devices_mut(&mut self) -> &mut DeviceRegistry {
        &mut self.devices
    }

    pub fn connection(&self) -> &Connection {
        &self.connection
    }

    pub fn issues(&self) -> &IssueLog {
        &self.issues
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn status(&self) -> SessionStatus {
        SessionStatus {
            transport: self.connection.transport(),
            state: self.connection.state(),
            ping: self.connection.ping(),
            last_error: self.connection.last_error().cloned(),
            issues: self.issues.entries().to_vec(),
        }
    }

    // -------------------------------------------------------------------------
    // Lifecycle
    // -------------------------------------------------------------------------

    /// Validate the device configuration, start redrawing and connect.
    ///
    /// Validation problems are listed as `SETUP` issues; they do not prevent
    /// the session from running. No-op while running.
    #[instrument(skip_all)]
    pub fn start(&mut self) {
        if self.running {
            return;
        }
        self.running = true;
        let added = self.issues.extend(self.devices.validate());
        info!(
            transport = ?self.connection.transport(),
            setup_issues = added,
            "session starting"
        );
        self.controls.start();
        self.update();
        self.connection.start();
        self.drain_notices();
    }

    /// Stop redrawing and disconnect. Idempotent.
    #[instrument(skip_all)]
    pub fn stop(&mut self) {
        if self.running {
            info!("session stopping");
        }
        self.running = false;
        self.controls.stop();
        self.connection.stop();
        self.drain_notices();
    }

    pub fn dispose(mut self) {
        self.stop();
        debug!("session disposed");
    }

    /// Drive the session until `shutdown` turns `true` or its sender goes
    /// away, then stop. Starts the session first if needed.
    ///
    /// Dropping the returned future part-way is safe: every pending timer and
    /// request stays inside the session.
    pub async fn run(
        &mut self,
        inputs: &mut mpsc::Receiver<PointerEvent>,
        shutdown: &mut watch::Receiver<bool>,
    ) {
        self.start();
        loop {
            if *shutdown.borrow() {
                break;
            }
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
                Some(event) = inputs.recv() => {
                    self.handle_pointer(event);
                }
                event = self.connection.next_event() => {
                    self.handle_link_event(event);
                }
                () = self.controls.next_frame() => {
                    self.controls.redraw();
                }
            }
        }
        self.stop();
    }

    // -------------------------------------------------------------------------
    // Event handling
    // -------------------------------------------------------------------------

    /// Route pointer input to the controls. Returns `true` when a control
    /// changed, in which case the operator loop ran and a packet was queued.
    pub fn handle_pointer(&mut self, event: PointerEvent) -> bool {
        let updated = self.controls.handle_pointer(event);
        if updated {
            self.update();
        }
        updated
    }

    pub fn handle_link_event(&mut self, event: LinkEvent) {
        self.connection.handle_event(event);
        self.drain_notices();
    }

    /// Run the operator loop and hand the resulting packet to the link.
    pub fn update(&mut self) {
        if let Some(operator) = self.operator.as_mut()
            && let Err(e) = operator(&self.controls, &mut self.devices)
        {
            self.issues.push(Issue::new(IssueKind::Loop, e.to_string()));
        }
        match self.devices.packet(&self.config.packet_format) {
            Packet::Json(map) => self.connection.set_robot_data_json(&map),
            Packet::Text(text) => self.connection.set_robot_data(text),
        }
        self.drain_notices();
    }

    fn drain_notices(&mut self) {
        while let Ok(notice) = self.notices.try_recv() {
            match notice {
                LinkNotice::State { new, old } => self.on_link_state(new, old),
                LinkNotice::Failure(error) => self.on_link_failure(&error),
                LinkNotice::Response(Some(data)) => self.on_response(&data),
                LinkNotice::Response(None) => {}
            }
        }
    }

    fn on_link_state(&mut self, new: LinkState, old: LinkState) {
        info!(state = %new, previous = %old, "link state changed");
        // The failure notice that follows publishes the `Error` status.
        if new == LinkState::Error {
            return;
        }
        if old == LinkState::Error {
            self.issues.clear_kind(IssueKind::Link);
        }
        self.publish_status();
    }

    /// Runs on every contained failure, so repeated timeouts while already
    /// in `Error` each skip a frame and refresh the `LINK` issue.
    fn on_link_failure(&mut self, error: &LinkError) {
        self.issues.clear_kind(IssueKind::Link);
        self.issues.push(Issue::new(IssueKind::Link, error.to_string()));
        if self.config.skip_frame_on_timeout && matches!(error, LinkError::Timeout(_)) {
            debug!("poll timed out, skipping next frame");
            self.controls.skip_next_frame();
        }
        self.publish_status();
    }

    fn publish_status(&mut self) {
        let status = self.status();
        for observer in self.status_observers.iter_mut() {
            observer(&status);
        }
    }

    fn on_response(&mut self, data: &str) {
        if !data.trim_start().starts_with('{') {
            trace!(response = data, "plain response ignored");
            return;
        }
        match serde_json::from_str::<Map<String, Value>>(data) {
            Ok(values) => {
                let updated = self.devices.set_inputs(&values);
                trace!(updated, "inputs updated from response");
            }
            Err(e) => {
                self.issues
                    .push(Issue::new(IssueKind::Data, format!("Malformed response: {e}")));
            }
        }
    }
}

impl<S: Surface> std::fmt::Debug for Session<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("running", &self.running)
            .field("state", &self.connection.state())
            .field("controls", &self.controls.controls().len())
            .field("devices", &self.devices.devices().len())
            .field("issues", &self.issues.len())
            .finish()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};
    use teleop_controls::{Dimension, RecordingSurface};
    use teleop_hal::{DeviceConfig, TwoWheelDrive};
    use teleop_link::transport::RequestTransport;
    use teleop_link::{PollSchedule, PollingConnection};

    /// Answers from a script, then `"ok"`. Each answer takes `delay`.
    #[derive(Default)]
    struct ScriptedRobot {
        replies: Mutex<VecDeque<Result<String, LinkError>>>,
        bodies: Mutex<Vec<String>>,
        delay: Duration,
    }

    impl ScriptedRobot {
        fn new(replies: Vec<Result<String, LinkError>>) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(replies.into()),
                ..Self::default()
            })
        }

        fn slow(delay: Duration) -> Arc<Self> {
            Arc::new(Self {
                delay,
                ..Self::default()
            })
        }

        fn bodies(&self) -> Vec<String> {
            self.bodies.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl RequestTransport for ScriptedRobot {
        async fn put(&self, body: String) -> Result<String, LinkError> {
            self.bodies.lock().unwrap().push(body);
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            let reply = self.replies.lock().unwrap().pop_front();
            reply.unwrap_or_else(|| Ok("ok".to_string()))
        }
    }

    fn session(robot: Arc<ScriptedRobot>, config: SessionConfig) -> Session<RecordingSurface> {
        let connection = Connection::Polling(PollingConnection::new(robot, PollSchedule::default()));
        Session::new(RecordingSurface::new(400, 800), connection, config)
    }

    fn drive_session(robot: Arc<ScriptedRobot>) -> Session<RecordingSurface> {
        let mut s = session(robot, SessionConfig::default());
        s.bind_control(
            Control::joystick("drive")
                .at(50.0, 50.0)
                .radius(Dimension::px(150)),
        )
        .unwrap();
        let drive = TwoWheelDrive::install(s.devices_mut(), "leftMotor", "rightMotor").unwrap();
        s.bind_device(Device::digital_input("bumper")).unwrap();
        s.set_hardware_config(
            HardwareConfig::default()
                .with_device("leftMotor", DeviceConfig::new("PWM_HBRIDGE"))
                .with_device("rightMotor", DeviceConfig::new("PWM_HBRIDGE"))
                .with_device("bumper", DeviceConfig::new("DIGITAL_IN")),
        );
        s.set_operator(move |controls, devices| {
            let (x, y) = controls
                .joystick("drive")
                .map_or((0.0, 0.0), |j| (j.x(), j.y()));
            drive.arcade(devices, y, -x)
        });
        s
    }

    async fn run_for(session: &mut Session<RecordingSurface>, duration: Duration) {
        let (_tx, mut inputs) = mpsc::channel(8);
        let (_stop, mut shutdown) = watch::channel(false);
        let _ = tokio::time::timeout(duration, session.run(&mut inputs, &mut shutdown)).await;
    }

    fn packet(session: &Session<RecordingSurface>) -> Value {
        serde_json::from_str(session.connection().data_packet()).unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn start_lists_setup_issues_and_connects() {
        let mut s = session(ScriptedRobot::new(vec![]), SessionConfig::default());
        s.bind_device(Device::motor("leftMotor")).unwrap();
        s.start();
        assert!(s.is_running());
        assert_eq!(s.connection().state(), LinkState::Connecting);
        let messages: Vec<String> = s.issues().entries().iter().map(ToString::to_string).collect();
        assert_eq!(messages, vec!["[SETUP] Hardware configuration not set"]);
    }

    #[tokio::test(start_paused = true)]
    async fn duplicate_bindings_are_rejected() {
        let mut s = drive_session(ScriptedRobot::new(vec![]));
        assert_eq!(
            s.bind_control(Control::button("drive")),
            Err(TeleopError::DuplicateControl("drive".to_string()))
        );
        assert_eq!(
            s.bind_device(Device::motor("leftMotor")),
            Err(TeleopError::DuplicateDevice("leftMotor".to_string()))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn pointer_input_runs_operator_and_queues_packet() {
        let mut s = drive_session(ScriptedRobot::new(vec![]));
        s.start();
        assert!(s.issues().is_empty());
        assert_eq!(packet(&s), serde_json::json!({"leftMotor": "0", "rightMotor": "0"}));

        assert!(s.handle_pointer(PointerEvent::MouseDown {
            client_x: 200.0,
            client_y: 250.0,
        }));
        assert_eq!(packet(&s), serde_json::json!({"leftMotor": "1023", "rightMotor": "1023"}));

        s.handle_pointer(PointerEvent::MouseUp {
            client_x: 200.0,
            client_y: 250.0,
        });
        assert_eq!(packet(&s), serde_json::json!({"leftMotor": "0", "rightMotor": "0"}));
    }

    #[tokio::test(start_paused = true)]
    async fn missed_pointer_does_not_update() {
        let mut s = drive_session(ScriptedRobot::new(vec![]));
        s.start();
        assert!(!s.handle_pointer(PointerEvent::MouseDown {
            client_x: 5.0,
            client_y: 5.0,
        }));
    }

    #[tokio::test(start_paused = true)]
    async fn legacy_packets_follow_channel_order() {
        let config = SessionConfig {
            packet_format: PacketFormat::Legacy {
                channels: vec!["rightMotor".into(), "leftMotor".into(), "weaponMotor".into()],
            },
            ..SessionConfig::default()
        };
        let mut s = session(ScriptedRobot::new(vec![]), config);
        TwoWheelDrive::install(s.devices_mut(), "leftMotor", "rightMotor").unwrap();
        s.devices_mut().set("rightMotor", -1.0).unwrap();
        s.update();
        assert_eq!(s.connection().data_packet(), "-1023:0:0");
    }

    #[tokio::test(start_paused = true)]
    async fn polled_packets_reach_the_robot() {
        let robot = ScriptedRobot::new(vec![]);
        let mut s = drive_session(Arc::clone(&robot));
        run_for(&mut s, Duration::from_millis(10)).await;
        assert_eq!(s.connection().state(), LinkState::Connected);
        let bodies = robot.bodies();
        assert!(!bodies.is_empty());
        assert!(bodies[0].contains("\"leftMotor\":\"0\""));
    }

    #[tokio::test(start_paused = true)]
    async fn json_response_feeds_input_devices() {
        let mut s = drive_session(ScriptedRobot::new(vec![Ok(r#"{"bumper": 1}"#.to_string())]));
        run_for(&mut s, Duration::from_millis(10)).await;
        assert_eq!(s.devices().value("bumper"), Some(1.0));
        assert!(s.issues().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn malformed_json_response_is_a_data_issue() {
        let mut s = drive_session(ScriptedRobot::new(vec![Ok("{bumper".to_string())]));
        run_for(&mut s, Duration::from_millis(10)).await;
        let data: Vec<&Issue> = s.issues().of_kind(IssueKind::Data).collect();
        assert_eq!(data.len(), 1);
        assert!(data[0].message.starts_with("Malformed response"));
    }

    #[tokio::test(start_paused = true)]
    async fn link_issue_is_cleared_after_recovery() {
        let mut s = drive_session(ScriptedRobot::new(vec![Err(LinkError::Transport(
            "connection refused".to_string(),
        ))]));
        let states = Arc::new(Mutex::new(Vec::new()));
        let seen = Arc::clone(&states);
        s.on_status_change(move |status| seen.lock().unwrap().push(status.state));

        run_for(&mut s, Duration::from_millis(10)).await;
        assert_eq!(s.status().state, LinkState::Error);
        let link: Vec<String> = s
            .issues()
            .of_kind(IssueKind::Link)
            .map(|i| i.message.clone())
            .collect();
        assert_eq!(link, vec!["Transport failure: connection refused"]);

        run_for(&mut s, Duration::from_millis(1100)).await;
        assert_eq!(s.status().state, LinkState::Connected);
        assert_eq!(s.issues().of_kind(IssueKind::Link).count(), 0);
        assert_eq!(
            *states.lock().unwrap(),
            vec![LinkState::Connecting, LinkState::Error, LinkState::Connected]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn operator_errors_become_loop_issues() {
        let mut s = session(ScriptedRobot::new(vec![]), SessionConfig::default());
        s.set_operator(|_, devices| devices.set("weaponMotor", 1.0));
        s.update();
        s.update();
        let messages: Vec<String> = s.issues().entries().iter().map(ToString::to_string).collect();
        assert_eq!(messages, vec!["[LOOP] Unknown device: weaponMotor"]);
    }

    #[tokio::test(start_paused = true)]
    async fn poll_timeout_skips_a_frame_when_configured() {
        let frames_with = |skip: bool| async move {
            let config = SessionConfig {
                frame_rate: 1,
                skip_frame_on_timeout: skip,
                ..SessionConfig::default()
            };
            let mut s = session(ScriptedRobot::slow(Duration::from_secs(10)), config);
            run_for(&mut s, Duration::from_millis(1200)).await;
            assert!(matches!(
                s.connection().last_error(),
                Some(LinkError::Timeout(_))
            ));
            s.controls().surface().frames()
        };
        assert_eq!(frames_with(false).await, 2);
        assert_eq!(frames_with(true).await, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn every_poll_timeout_skips_a_frame_while_in_error() {
        // Timeouts land at 0.5 s, then every 1.5 s (500 ms wait plus 1 s
        // backoff): seven of them before 10.2 s.
        let frames_with = |skip: bool| async move {
            let config = SessionConfig {
                frame_rate: 1,
                skip_frame_on_timeout: skip,
                ..SessionConfig::default()
            };
            let mut s = session(ScriptedRobot::slow(Duration::from_secs(60)), config);
            run_for(&mut s, Duration::from_millis(10_200)).await;
            assert_eq!(s.connection().state(), LinkState::Error);
            s.controls().surface().frames()
        };
        assert_eq!(frames_with(false).await, 11);
        // Each timeout pushes the next tick a full period out, so frames
        // fall at 0, 1.5, 3, 4.5, 6, 7.5 and 9 s.
        assert_eq!(frames_with(true).await, 7);
    }

    #[tokio::test(start_paused = true)]
    async fn link_issue_follows_the_latest_failure() {
        let timeout = LinkError::Timeout(Duration::from_millis(500));
        let mut s = drive_session(ScriptedRobot::new(vec![
            Err(LinkError::Transport("connection refused".to_string())),
            Err(timeout.clone()),
        ]));
        let published = Arc::new(Mutex::new(Vec::new()));
        let seen = Arc::clone(&published);
        s.on_status_change(move |status| seen.lock().unwrap().push(status.last_error.clone()));

        let link_messages = |s: &Session<RecordingSurface>| -> Vec<String> {
            s.issues()
                .of_kind(IssueKind::Link)
                .map(|i| i.message.clone())
                .collect()
        };

        run_for(&mut s, Duration::from_millis(10)).await;
        assert_eq!(link_messages(&s), vec!["Transport failure: connection refused"]);

        run_for(&mut s, Duration::from_millis(1000)).await;
        assert_eq!(s.status().state, LinkState::Error);
        assert_eq!(link_messages(&s), vec!["Request timed out after 500ms"]);
        assert_eq!(
            published.lock().unwrap().last().cloned().flatten(),
            Some(timeout)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_stops_the_session() {
        let mut s = drive_session(ScriptedRobot::new(vec![]));
        let (_tx, mut inputs) = mpsc::channel(8);
        let (stop, mut shutdown) = watch::channel(false);
        stop.send_replace(true);
        s.run(&mut inputs, &mut shutdown).await;
        assert!(!s.is_running());
        assert_eq!(s.connection().state(), LinkState::Disconnected);
    }

    #[tokio::test(start_paused = true)]
    async fn pointer_events_flow_through_run() {
        let mut s = drive_session(ScriptedRobot::new(vec![]));
        let (tx, mut inputs) = mpsc::channel(8);
        let (_stop, mut shutdown) = watch::channel(false);
        tx.send(PointerEvent::MouseDown {
            client_x: 200.0,
            client_y: 250.0,
        })
        .await
        .unwrap();
        let _ = tokio::time::timeout(
            Duration::from_millis(5),
            s.run(&mut inputs, &mut shutdown),
        )
        .await;
        assert_eq!(s.devices().value("leftMotor"), Some(1.0));
        assert_eq!(s.controls().owner_of(teleop_types::TouchId::Mouse), Some("drive"));
    }

    #[test]
    fn status_line_mentions_error_and_issue_count() {
        let status = SessionStatus {
            transport: TransportKind::Polling,
            state: LinkState::Error,
            ping: Some(Duration::from_millis(12)),
            last_error: Some(LinkError::ConnectionLost),
            issues: vec![Issue::setup("Hardware configuration not set")],
        };
        assert_eq!(status.to_string(), "Error (12 ms): Connection lost [1 issue(s)]");
    }

    #[test]
    fn session_config_defaults_from_empty_json() {
        let config: SessionConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, SessionConfig::default());
        assert_eq!(config.frame_rate, 30);
    }
}
