//! Repeated-request link.
//!
//! Each attempt carries the current packet and is bounded by one timeout.
//! When it completes, the next attempt is scheduled after the short poll
//! interval, or after the backoff interval while the link is in `Error`.
//! There is no retry ceiling.
//!
//! `stop()` does not abort an attempt in flight. Its result is dropped when it
//! lands, because the link is `Disconnected` by then, and nothing is
//! rescheduled.

use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use futures_util::future::BoxFuture;
use teleop_types::{LinkError, LinkState};
use tokio::time::{Instant, Sleep};
use tracing::trace;

use crate::connection::LinkEvent;
use crate::state::LinkCore;
use crate::transport::RequestTransport;

/// Timing of the polling loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSchedule {
    /// Upper bound for one attempt.
    pub timeout: Duration,
    /// Delay between attempts while the link is healthy.
    pub interval: Duration,
    /// Delay between attempts while the link is in `Error`.
    pub backoff: Duration,
}

impl Default for PollSchedule {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(500),
            interval: Duration::from_millis(50),
            backoff: Duration::from_millis(1000),
        }
    }
}

/// One attempt the caller should perform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollRequest {
    pub body: String,
    pub timeout: Duration,
}

/// The polling state machine without any I/O.
#[derive(Debug, Default)]
pub struct PollingLink {
    core: LinkCore,
    schedule: PollSchedule,
    issued_at: Option<Instant>,
}

impl PollingLink {
    pub fn new(schedule: PollSchedule) -> Self {
        Self {
            core: LinkCore::new(),
            schedule,
            issued_at: None,
        }
    }

    pub fn core(&self) -> &LinkCore {
        &self.core
    }

    pub fn core_mut(&mut self) -> &mut LinkCore {
        &mut self.core
    }

    pub fn schedule(&self) -> PollSchedule {
        self.schedule
    }

    /// Enter `Connecting` and hand out the first attempt. `None` when already
    /// running.
    pub fn start(&mut self, now: Instant) -> Option<PollRequest> {
        if self.core.is_enabled() {
            return None;
        }
        self.core.set_enabled(true);
        self.core.set_state(LinkState::Connecting);
        Some(self.issue(now))
    }

    /// The scheduled delay elapsed: hand out the next attempt.
    pub fn poll_due(&mut self, now: Instant) -> Option<PollRequest> {
        if !self.core.is_enabled() {
            return None;
        }
        Some(self.issue(now))
    }

    /// Apply the outcome of an attempt and return the delay before the next
    /// one, or `None` when the link was stopped in the meantime.
    pub fn complete(
        &mut self,
        outcome: Result<String, LinkError>,
        now: Instant,
    ) -> Option<Duration> {
        let issued_at = self.issued_at.take();
        if self.core.state() == LinkState::Disconnected || !self.core.is_enabled() {
            trace!("dropping poll result after stop");
            return None;
        }

        match outcome {
            Ok(body) => {
                self.core.set_state(LinkState::Connected);
                if let Some(issued_at) = issued_at {
                    self.core.record_ping(now.saturating_duration_since(issued_at));
                }
                self.core.set_response_data(Some(body));
            }
            Err(e) => self.core.fail(e),
        }

        Some(self.delay())
    }

    pub fn stop(&mut self) {
        self.core.set_enabled(false);
        self.core.set_state(LinkState::Disconnected);
        self.core.set_response_data(None);
    }

    fn delay(&self) -> Duration {
        if self.core.state() == LinkState::Error {
            self.schedule.backoff
        } else {
            self.schedule.interval
        }
    }

    fn issue(&mut self, now: Instant) -> PollRequest {
        self.issued_at = Some(now);
        PollRequest {
            body: self.core.data_packet().to_string(),
            timeout: self.schedule.timeout,
        }
    }
}

enum Pending {
    Idle,
    Waiting(Pin<Box<Sleep>>),
    InFlight(BoxFuture<'static, Result<String, LinkError>>),
}

/// [`PollingLink`] driven by a [`RequestTransport`] and the tokio timer.
pub struct PollingConnection {
    link: PollingLink,
    transport: Arc<dyn RequestTransport>,
    pending: Pending,
}

impl PollingConnection {
    pub fn new(transport: Arc<dyn RequestTransport>, schedule: PollSchedule) -> Self {
        Self {
            link: PollingLink::new(schedule),
            transport,
            pending: Pending::Idle,
        }
    }

    pub fn core(&self) -> &LinkCore {
        self.link.core()
    }

    pub fn core_mut(&mut self) -> &mut LinkCore {
        self.link.core_mut()
    }

    pub fn start(&mut self) {
        if let Some(request) = self.link.start(Instant::now()) {
            self.dispatch(request);
        }
    }

    pub fn stop(&mut self) {
        self.link.stop();
        if matches!(self.pending, Pending::Waiting(_)) {
            self.pending = Pending::Idle;
        }
    }

    /// Buffer `packet` for the next attempt.
    pub fn set_robot_data(&mut self, packet: String) {
        self.link.core_mut().store_packet(packet);
    }

    pub fn fail(&mut self, error: LinkError) {
        self.link.core_mut().fail(error);
    }

    pub fn is_in_flight(&self) -> bool {
        matches!(self.pending, Pending::InFlight(_))
    }

    /// Wait for the current attempt or delay to finish. Cancel safe.
    pub async fn next_event(&mut self) -> LinkEvent {
        match &mut self.pending {
            Pending::Idle => std::future::pending().await,
            Pending::Waiting(sleep) => {
                sleep.as_mut().await;
                self.pending = Pending::Idle;
                LinkEvent::PollDue
            }
            Pending::InFlight(request) => {
                let outcome = request.as_mut().await;
                self.pending = Pending::Idle;
                LinkEvent::PollCompleted(outcome)
            }
        }
    }

    pub fn handle_event(&mut self, event: LinkEvent) {
        match event {
            LinkEvent::PollDue => {
                if let Some(request) = self.link.poll_due(Instant::now()) {
                    self.dispatch(request);
                }
            }
            LinkEvent::PollCompleted(outcome) => {
                if let Some(delay) = self.link.complete(outcome, Instant::now()) {
                    self.pending = Pending::Waiting(Box::pin(tokio::time::sleep(delay)));
                }
            }
            LinkEvent::Socket(_) | LinkEvent::TimerElapsed(_) => {}
        }
    }

    fn dispatch(&mut self, request: PollRequest) {
        let transport = Arc::clone(&self.transport);
        let PollRequest { body, timeout } = request;
        self.pending = Pending::InFlight(Box::pin(async move {
            match tokio::time::timeout(timeout, transport.put(body)).await {
                Ok(outcome) => outcome,
                Err(_) => Err(LinkError::Timeout(timeout)),
            }
        }));
    }
}
