//! Change-notification subscriptions
//!
//! Collaborators (settings store, monitor topology) keep a `Subscribers`
//! list and push `HostEvent`s into the subscribers' channels. The event
//! loop drains that channel one event at a time, so handlers never run
//! re-entrantly from inside a `set_value`.

use std::sync::mpsc::Sender;
use tracing::debug;

use crate::event_handler::HostEvent;

/// Token returned by `subscribe`, handed back to `unsubscribe`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

/// Subscriber list filtered by topic `T`
pub struct Subscribers<T> {
    next_id: u64,
    entries: Vec<(SubscriptionId, T, Sender<HostEvent>)>,
}

impl<T> Default for Subscribers<T> {
    fn default() -> Self {
        Self {
            next_id: 0,
            entries: Vec::new(),
        }
    }
}

impl<T: PartialEq> Subscribers<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, topic: T, sender: Sender<HostEvent>) -> SubscriptionId {
        self.next_id += 1;
        let id = SubscriptionId(self.next_id);
        self.entries.push((id, topic, sender));
        debug!(subscription = ?id, subscribers = self.len(), "Subscribed");
        id
    }

    /// Returns false if the id was unknown (already unsubscribed)
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(entry_id, _, _)| *entry_id != id);
        self.entries.len() != before
    }

    /// Send `event` to every subscriber of `topic`.
    /// Subscribers whose receiver is gone are dropped.
    pub fn notify(&mut self, topic: &T, event: HostEvent) {
        self.entries.retain(|(id, entry_topic, sender)| {
            if entry_topic != topic {
                return true;
            }
            match sender.send(event.clone()) {
                Ok(()) => true,
                Err(_) => {
                    debug!(subscription = ?id, "Dropping subscriber with closed channel");
                    false
                }
            }
        });
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}
