//! Correlation of requests with the server lines that answer them.
//!
//! A waiter is a matcher registered before its request is sent. Every
//! inbound line is offered to the pending waiters in registration order; the
//! first matcher to produce a value resolves its waiter, which is then
//! removed. The line is not offered further.
//!
//! Matchers run with the client lock held and may update the [`Session`]
//! (a history waiter claims its batch this way). They must not block.

use std::sync::Weak;
use std::time::Duration;

use tokio::sync::oneshot;
use tokio::time::{timeout_at, Instant};

use super::Shared;
use crate::error::WaitError;
use crate::message::ParsedLine;
use crate::state::Session;

type Outcome<T> = Result<T, WaitError>;

trait Pending: Send {
    /// Offer `line`. Returns `true` when the waiter resolved.
    fn offer(&mut self, line: &ParsedLine, session: &mut Session) -> bool;
    fn deadline(&self) -> Instant;
    fn reject(self: Box<Self>, err: WaitError);
    fn timeout(&self) -> Duration;
}

struct Waiter<T, F> {
    matcher: F,
    tx: Option<oneshot::Sender<Outcome<T>>>,
    deadline: Instant,
    timeout: Duration,
}

impl<T, F> Pending for Waiter<T, F>
where
    T: Send,
    F: FnMut(&ParsedLine, &mut Session) -> Option<T> + Send,
{
    fn offer(&mut self, line: &ParsedLine, session: &mut Session) -> bool {
        match &self.tx {
            Some(tx) if !tx.is_closed() => {}
            _ => return false,
        }
        match (self.matcher)(line, session) {
            Some(value) => {
                if let Some(tx) = self.tx.take() {
                    let _ = tx.send(Ok(value));
                }
                true
            }
            None => false,
        }
    }

    fn deadline(&self) -> Instant {
        self.deadline
    }

    fn reject(self: Box<Self>, err: WaitError) {
        if let Some(tx) = self.tx {
            let _ = tx.send(Err(err));
        }
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }
}

/// Handle to a registered waiter, returned to the caller.
pub(crate) struct Ticket<T> {
    id: u64,
    rx: oneshot::Receiver<Outcome<T>>,
    deadline: Instant,
    timeout: Duration,
}

impl<T> Ticket<T> {
    pub(crate) fn id(&self) -> u64 {
        self.id
    }

    pub(crate) fn into_waiting(self, owner: Weak<Shared>) -> Waiting<T> {
        Waiting {
            id: self.id,
            rx: self.rx,
            deadline: self.deadline,
            timeout: self.timeout,
            owner,
        }
    }
}

/// Ordered set of pending waiters.
#[derive(Default)]
pub(crate) struct WaiterRegistry {
    next_id: u64,
    waiters: Vec<(u64, Box<dyn Pending>)>,
}

impl WaiterRegistry {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Register `matcher`, due at `timeout` from now.
    pub(crate) fn register<T, F>(&mut self, timeout: Duration, matcher: F) -> Ticket<T>
    where
        T: Send + 'static,
        F: FnMut(&ParsedLine, &mut Session) -> Option<T> + Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        let deadline = Instant::now() + timeout;
        self.next_id += 1;
        let id = self.next_id;
        self.waiters.push((
            id,
            Box::new(Waiter {
                matcher,
                tx: Some(tx),
                deadline,
                timeout,
            }),
        ));
        Ticket {
            id,
            rx,
            deadline,
            timeout,
        }
    }

    /// Offer `line` to each waiter in order; the first match is removed.
    pub(crate) fn dispatch(&mut self, line: &ParsedLine, session: &mut Session) -> bool {
        let hit = self
            .waiters
            .iter_mut()
            .position(|(_, waiter)| waiter.offer(line, session));
        match hit {
            Some(index) => {
                self.waiters.remove(index);
                true
            }
            None => false,
        }
    }

    /// Reject every waiter whose deadline has passed.
    pub(crate) fn expire(&mut self, now: Instant) {
        let mut index = 0;
        while index < self.waiters.len() {
            if self.waiters[index].1.deadline() <= now {
                let (_, waiter) = self.waiters.remove(index);
                let timeout = waiter.timeout();
                waiter.reject(WaitError::Timeout(timeout));
            } else {
                index += 1;
            }
        }
    }

    pub(crate) fn remove(&mut self, id: u64) {
        self.waiters.retain(|(waiter_id, _)| *waiter_id != id);
    }

    /// Reject and drop every pending waiter.
    pub(crate) fn reject_all(&mut self, err: WaitError) {
        for (_, waiter) in self.waiters.drain(..) {
            waiter.reject(err.clone());
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.waiters.len()
    }
}

/// A pending request/response exchange.
///
/// Resolves with the matched value, or fails at the deadline fixed when the
/// waiter was registered. Dropping the handle cancels the waiter.
#[must_use = "dropping a waiter cancels it"]
pub struct Waiting<T> {
    id: u64,
    rx: oneshot::Receiver<Outcome<T>>,
    deadline: Instant,
    timeout: Duration,
    owner: Weak<Shared>,
}

impl<T> Waiting<T> {
    /// Wait for the match.
    pub async fn wait(mut self) -> Result<T, WaitError> {
        match timeout_at(self.deadline, &mut self.rx).await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(_)) => Err(WaitError::Closed),
            Err(_) => match self.rx.try_recv() {
                Ok(outcome) => outcome,
                Err(_) => Err(WaitError::Timeout(self.timeout)),
            },
        }
    }

    /// Wait for the match, substituting `fallback` for any failure.
    pub async fn wait_or(self, fallback: T) -> T {
        self.wait().await.unwrap_or(fallback)
    }

    /// When this waiter times out.
    pub fn deadline(&self) -> Instant {
        self.deadline
    }
}

impl<T> Drop for Waiting<T> {
    fn drop(&mut self) {
        if let Some(shared) = self.owner.upgrade() {
            shared.state.lock().waiters.remove(self.id);
        }
    }
}

impl<T> std::fmt::Debug for Waiting<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Waiting")
            .field("id", &self.id)
            .field("deadline", &self.deadline)
            .finish()
    }
}
