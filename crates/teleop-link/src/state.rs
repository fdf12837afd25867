//! Transport-independent link state.
//!
//! [`LinkCore`] is the single owner of the link state, the buffered outbound
//! packet, and the last inbound payload. Both transports embed one and go
//! through [`LinkCore::set_state`] for every transition.

use std::time::Duration;

use teleop_types::{LinkError, LinkState};
use tracing::{debug, warn};

use crate::observer::{ErrorObserver, Observers, ResponseObserver, StateObserver, SubscriptionId};

#[derive(Debug, Default)]
pub struct LinkCore {
    state: LinkState,
    enabled: bool,
    last_error: Option<LinkError>,
    data_packet: String,
    response_data: Option<String>,
    ping: Option<Duration>,
    state_observers: Observers<StateObserver>,
    response_observers: Observers<ResponseObserver>,
    error_observers: Observers<ErrorObserver>,
}

impl LinkCore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> LinkState {
        self.state
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn last_error(&self) -> Option<&LinkError> {
        self.last_error.as_ref()
    }

    /// The packet that the next (or current) outbound exchange will carry.
    pub fn data_packet(&self) -> &str {
        &self.data_packet
    }

    pub fn response_data(&self) -> Option<&str> {
        self.response_data.as_deref()
    }

    /// Round trip of the last successful exchange.
    pub fn ping(&self) -> Option<Duration> {
        self.ping
    }

    /// Move to `new`, notifying state observers with `(new, old)`.
    ///
    /// Returns `false` (and notifies nobody) when the state is unchanged.
    pub fn set_state(&mut self, new: LinkState) -> bool {
        let old = self.state;
        if old == new {
            return false;
        }
        self.state = new;
        debug!(state = %new, previous = %old, "link state changed");
        for observer in self.state_observers.iter_mut() {
            observer(new, old);
        }
        true
    }

    pub fn set_response_data(&mut self, data: Option<String>) {
        if data.is_none() && self.response_data.is_none() {
            return;
        }
        self.response_data = data;
        let current = self.response_data.as_deref();
        for observer in self.response_observers.iter_mut() {
            observer(current);
        }
    }

    /// Record a contained transport failure: `Error` state, `last_error`
    /// set and the response cleared.
    ///
    /// Error observers run after the state observers, on every call.
    pub fn fail(&mut self, error: LinkError) {
        warn!(error = %error, "link failure");
        self.last_error = Some(error.clone());
        self.set_state(LinkState::Error);
        self.set_response_data(None);
        for observer in self.error_observers.iter_mut() {
            observer(&error);
        }
    }

    pub fn store_packet(&mut self, packet: String) {
        self.data_packet = packet;
    }

    pub fn record_ping(&mut self, ping: Duration) {
        self.ping = Some(ping);
    }

    pub fn on_state_change(&mut self, observer: Box<StateObserver>) -> SubscriptionId {
        self.state_observers.subscribe(observer)
    }

    pub fn on_response_data(&mut self, observer: Box<ResponseObserver>) -> SubscriptionId {
        self.response_observers.subscribe(observer)
    }

    pub fn on_error(&mut self, observer: Box<ErrorObserver>) -> SubscriptionId {
        self.error_observers.subscribe(observer)
    }

    pub fn unsubscribe_state(&mut self, id: SubscriptionId) -> bool {
        self.state_observers.unsubscribe(id)
    }

    pub fn unsubscribe_response(&mut self, id: SubscriptionId) -> bool {
        self.response_observers.unsubscribe(id)
    }

    pub fn unsubscribe_error(&mut self, id: SubscriptionId) -> bool {
        self.error_observers.unsubscribe(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    fn recording_core() -> (LinkCore, Arc<Mutex<Vec<(LinkState, LinkState)>>>) {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let mut core = LinkCore::new();
        let sink = Arc::clone(&calls);
        core.on_state_change(Box::new(move |new, old| sink.lock().unwrap().push((new, old))));
        (core, calls)
    }

    #[test]
    fn observer_fires_only_on_real_transitions() {
        let (mut core, calls) = recording_core();
        let sequence = [
            LinkState::Connecting,
            LinkState::Connecting,
            LinkState::Connected,
            LinkState::Connected,
            LinkState::Error,
            LinkState::Connected,
        ];
        for state in sequence {
            core.set_state(state);
        }
        assert_eq!(
            *calls.lock().unwrap(),
            vec![
                (LinkState::Connecting, LinkState::Disconnected),
                (LinkState::Connected, LinkState::Connecting),
                (LinkState::Error, LinkState::Connected),
                (LinkState::Connected, LinkState::Error),
            ]
        );
    }

    #[test]
    fn observer_sees_new_state_already_applied() {
        let mut core = LinkCore::new();
        let mut hits = 0;
        core.set_state(LinkState::Connecting);
        let seen = Arc::new(Mutex::new(None));
        let sink = Arc::clone(&seen);
        core.on_state_change(Box::new(move |new, old| *sink.lock().unwrap() = Some((new, old))));
        if core.set_state(LinkState::Error) {
            hits += 1;
        }
        assert_eq!(hits, 1);
        assert_eq!(
            *seen.lock().unwrap(),
            Some((LinkState::Error, LinkState::Connecting))
        );
    }

    #[test]
    fn fail_sets_error_and_clears_response() {
        let mut core = LinkCore::new();
        core.set_response_data(Some("ok".to_string()));
        core.fail(LinkError::ConnectionLost);
        assert_eq!(core.state(), LinkState::Error);
        assert_eq!(core.response_data(), None);
        assert_eq!(core.last_error(), Some(&LinkError::ConnectionLost));
    }

    #[test]
    fn error_observer_fires_on_every_failure() {
        let (mut core, calls) = recording_core();
        let errors = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&errors);
        core.on_error(Box::new(move |e| sink.lock().unwrap().push(e.clone())));

        let timeout = LinkError::Timeout(Duration::from_millis(500));
        core.fail(LinkError::Transport("connection refused".to_string()));
        core.fail(timeout.clone());
        core.fail(timeout.clone());

        assert_eq!(calls.lock().unwrap().len(), 1);
        assert_eq!(
            *errors.lock().unwrap(),
            vec![
                LinkError::Transport("connection refused".to_string()),
                timeout.clone(),
                timeout,
            ]
        );
    }

    #[test]
    fn response_observer_sees_set_and_clear() {
        let mut core = LinkCore::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        core.on_response_data(Box::new(move |data| {
            sink.lock().unwrap().push(data.map(str::to_string))
        }));
        core.set_response_data(None);
        core.set_response_data(Some("a".to_string()));
        core.set_response_data(None);
        assert_eq!(*seen.lock().unwrap(), vec![Some("a".to_string()), None]);
    }

    #[test]
    fn unsubscribed_observer_is_silent() {
        let (mut core, calls) = recording_core();
        let extra = Arc::new(Mutex::new(0));
        let sink = Arc::clone(&extra);
        let id = core.on_state_change(Box::new(move |_, _| *sink.lock().unwrap() += 1));
        assert!(core.unsubscribe_state(id));
        core.set_state(LinkState::Connecting);
        assert_eq!(*extra.lock().unwrap(), 0);
        assert_eq!(calls.lock().unwrap().len(), 1);
    }
}
