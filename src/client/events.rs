//! Event fan-out: message subscribers and the raw line log.

use std::collections::VecDeque;
use std::pin::Pin;
use std::task::{Context, Poll};

use chrono::{DateTime, Utc};
use futures_util::Stream;
use tokio::sync::mpsc;

/// Number of raw lines kept in the rolling log.
pub const RAW_LOG_CAPACITY: usize = 200;

/// Receiving end of an event subscription.
///
/// Yields events in arrival order. Dropping it (or calling
/// [`unsubscribe`](Subscription::unsubscribe)) stops delivery.
#[derive(Debug)]
pub struct Subscription<T> {
    rx: mpsc::UnboundedReceiver<T>,
}

impl<T> Subscription<T> {
    /// Next event. `None` once the subscription has been cut off.
    pub async fn recv(&mut self) -> Option<T> {
        self.rx.recv().await
    }

    /// An already delivered event, without waiting.
    pub fn try_recv(&mut self) -> Option<T> {
        self.rx.try_recv().ok()
    }

    pub fn unsubscribe(self) {}
}

impl<T> Stream for Subscription<T> {
    type Item = T;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<T>> {
        self.rx.poll_recv(cx)
    }
}

struct Subscriber<T> {
    tx: mpsc::UnboundedSender<T>,
    transient: bool,
}

/// Fan-out to any number of subscribers.
///
/// Transient subscribers belong to a single connection and are cut off when
/// it closes; the others live as long as the client.
pub(crate) struct EventHub<T> {
    subscribers: Vec<Subscriber<T>>,
}

impl<T: Clone> EventHub<T> {
    pub(crate) fn new() -> Self {
        Self {
            subscribers: Vec::new(),
        }
    }

    pub(crate) fn subscribe(&mut self) -> Subscription<T> {
        self.add(false)
    }

    pub(crate) fn subscribe_transient(&mut self) -> Subscription<T> {
        self.add(true)
    }

    fn add(&mut self, transient: bool) -> Subscription<T> {
        self.subscribers.retain(|s| !s.tx.is_closed());
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers.push(Subscriber { tx, transient });
        Subscription { rx }
    }

    pub(crate) fn publish(&mut self, event: &T) {
        self.subscribers
            .retain(|s| s.tx.send(event.clone()).is_ok());
    }

    pub(crate) fn drop_transient(&mut self) {
        self.subscribers.retain(|s| !s.transient);
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.subscribers.len()
    }
}

/// Direction of a logged line.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Direction {
    In,
    Out,
}

/// One entry of the raw line log.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RawLogEntry {
    pub direction: Direction,
    pub line: String,
    pub time: DateTime<Utc>,
}

/// Rolling window of the most recent raw lines, with live subscribers.
pub(crate) struct RawLog {
    entries: VecDeque<RawLogEntry>,
    capacity: usize,
    hub: EventHub<RawLogEntry>,
}

impl RawLog {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
            hub: EventHub::new(),
        }
    }

    pub(crate) fn record(&mut self, direction: Direction, line: &str) {
        let entry = RawLogEntry {
            direction,
            line: line.to_string(),
            time: Utc::now(),
        };
        self.hub.publish(&entry);
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(entry);
    }

    pub(crate) fn snapshot(&self) -> Vec<RawLogEntry> {
        self.entries.iter().cloned().collect()
    }

    pub(crate) fn subscribe(&mut self) -> Subscription<RawLogEntry> {
        self.hub.subscribe()
    }
}
