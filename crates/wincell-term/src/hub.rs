// SPDX-License-Identifier: MIT
//
// Event fan-out.
//
// One writer (the input thread or the resize poller) publishes; any number
// of subscribers each get their own channel and see every event published
// after they subscribed, in publish order. A subscriber that drops its
// receiver is pruned on the next publish.

use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::input::Event;

/// A cloneable subscriber list.
#[derive(Clone, Default)]
pub struct EventHub {
    subscribers: Arc<Mutex<Vec<Sender<Event>>>>,
}

impl EventHub {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn subscribers(&self) -> MutexGuard<'_, Vec<Sender<Event>>> {
        self.subscribers
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// A new receiver for all subsequently published events.
    #[must_use]
    pub fn subscribe(&self) -> Receiver<Event> {
        let (tx, rx) = mpsc::channel();
        self.subscribers().push(tx);
        rx
    }

    /// Deliver `event` to every live subscriber.
    pub fn publish(&self, event: Event) {
        let mut subs = self.subscribers();
        let before = subs.len();
        subs.retain(|tx| tx.send(event).is_ok());
        if subs.len() < before {
            tracing::trace!(dropped = before - subs.len(), "pruned closed subscribers");
        }
    }

    /// Publish each event in order.
    pub fn publish_all(&self, events: impl IntoIterator<Item = Event>) {
        for event in events {
            self.publish(event);
        }
    }

    /// Number of live subscribers as of the last publish.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.subscribers().len()
    }
}

impl std::fmt::Debug for EventHub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventHub")
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
