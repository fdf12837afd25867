//! Explicit observer registration for link notifications.
//!
//! Observers are plain boxed closures invoked synchronously, in subscription
//! order, from inside the state mutator that triggered them. There is no
//! queue: an observer runs to completion before the mutator returns.

use teleop_types::{LinkError, LinkState};

/// Called with `(new, old)` on every real state transition.
pub type StateObserver = dyn FnMut(LinkState, LinkState) + Send;

/// Called with the latest inbound payload, or `None` when it is cleared.
pub type ResponseObserver = dyn FnMut(Option<&str>) + Send;

/// Called on every contained failure, including repeats while already in
/// `Error`.
pub type ErrorObserver = dyn FnMut(&LinkError) + Send;

/// Handle returned by `subscribe`, used to unsubscribe later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Ordered list of boxed observers of one kind.
pub struct Observers<F: ?Sized> {
    next_id: u64,
    entries: Vec<(SubscriptionId, Box<F>)>,
}

impl<F: ?Sized> Observers<F> {
    pub fn new() -> Self {
        Self {
            next_id: 0,
            entries: Vec::new(),
        }
    }

    pub fn subscribe(&mut self, observer: Box<F>) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.entries.push((id, observer));
        id
    }

    /// Returns `false` when `id` was never registered or was already removed.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(entry, _)| *entry != id);
        self.entries.len() != before
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Box<F>> {
        self.entries.iter_mut().map(|(_, observer)| observer)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<F: ?Sized> Default for Observers<F> {
    fn default() -> Self {
        Self::new()
    }
}

impl<F: ?Sized> std::fmt::Debug for Observers<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Observers")
            .field("count", &self.entries.len())
            .finish()
    }
}
