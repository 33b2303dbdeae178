//! Strict FIFO request queue
//!
//! At most one load runs at a time. A [`Ticket`] is taken synchronously when
//! a load is requested, so dispatch order is call order no matter how the
//! resulting futures are polled.

use futures::channel::oneshot;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;

/// Current phase of the queue
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueState {
    /// Nothing queued or running
    Idle,
    /// One ticket holds the slot; `waiting` more are queued behind it
    Running { waiting: usize },
}

#[derive(Debug, Default)]
struct Inner {
    next_id: u64,
    active: Option<u64>,
    waiting: VecDeque<(u64, oneshot::Sender<()>)>,
    /// Tickets finished since the queue was last idle
    processed: usize,
}

impl Inner {
    /// Hand the slot to the next live ticket
    fn advance(&mut self) {
        self.active = None;
        self.processed += 1;
        while let Some((id, turn)) = self.waiting.pop_front() {
            if turn.send(()).is_ok() {
                log::debug!("Queue granted ticket {id}");
                self.active = Some(id);
                return;
            }
        }
        // drained
        self.processed = 0;
    }
}

/// FIFO queue serializing loads
///
/// Clones share the same queue.
#[derive(Debug, Clone, Default)]
pub struct RequestQueue {
    inner: Arc<Mutex<Inner>>,
}

impl RequestQueue {
    /// Create an idle queue
    pub fn new() -> Self {
        Self::default()
    }

    /// Take a place at the back of the queue
    ///
    /// The first ticket on an idle queue holds the slot immediately.
    pub fn enqueue(&self) -> Ticket {
        let mut inner = self.inner.lock();
        let id = inner.next_id;
        inner.next_id += 1;

        let turn = if inner.active.is_none() && inner.waiting.is_empty() {
            inner.active = Some(id);
            None
        } else {
            let (sender, receiver) = oneshot::channel();
            inner.waiting.push_back((id, sender));
            Some(receiver)
        };

        Ticket {
            queue: self.clone(),
            id,
            turn,
            armed: true,
        }
    }

    /// Number of tickets running or waiting
    pub fn len(&self) -> usize {
        let inner = self.inner.lock();
        inner.waiting.len() + usize::from(inner.active.is_some())
    }

    /// Whether nothing is queued or running
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether nothing is queued or running
    pub fn is_idle(&self) -> bool {
        self.state() == QueueState::Idle
    }

    /// Current phase
    pub fn state(&self) -> QueueState {
        let inner = self.inner.lock();
        match inner.active {
            None if inner.waiting.is_empty() => QueueState::Idle,
            _ => QueueState::Running {
                waiting: inner.waiting.len(),
            },
        }
    }

    /// Tickets finished since the queue was last idle
    pub fn processed(&self) -> usize {
        self.inner.lock().processed
    }

    fn release(&self, id: u64) {
        let mut inner = self.inner.lock();
        if inner.active == Some(id) {
            inner.advance();
        } else {
            inner.waiting.retain(|(waiting, _)| *waiting != id);
        }
    }
}

/// A place in the queue
///
/// Dropping a ticket gives up its place, or the slot if it already holds it.
#[derive(Debug)]
pub struct Ticket {
    queue: RequestQueue,
    id: u64,
    turn: Option<oneshot::Receiver<()>>,
    armed: bool,
}

impl Ticket {
    /// Wait for this ticket's turn
    pub async fn acquire(mut self) -> QueueSlot {
        if let Some(turn) = self.turn.take() {
            // the sender is only dropped once the grant has been sent
            let _ = turn.await;
        }
        self.armed = false;
        QueueSlot {
            queue: self.queue.clone(),
            id: self.id,
        }
    }

    /// Sequence number, in enqueue order
    pub fn id(&self) -> u64 {
        self.id
    }
}

impl Drop for Ticket {
    fn drop(&mut self) {
        if self.armed {
            self.queue.release(self.id);
        }
    }
}

/// Exclusive hold of the queue; the next ticket is granted on drop
#[derive(Debug)]
pub struct QueueSlot {
    queue: RequestQueue,
    id: u64,
}

impl Drop for QueueSlot {
    fn drop(&mut self) {
        self.queue.release(self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::executor::block_on;
    use futures::FutureExt;

    #[test]
    fn test_first_ticket_granted_immediately() {
        let queue = RequestQueue::new();
        assert!(queue.is_idle());

        let ticket = queue.enqueue();
        let slot = ticket.acquire().now_or_never();
        assert!(slot.is_some());
        assert_eq!(queue.state(), QueueState::Running { waiting: 0 });

        drop(slot);
        assert!(queue.is_idle());
        assert!(queue.is_empty());
    }

    #[test]
    fn test_fifo_grants() {
        let queue = RequestQueue::new();
        let a = block_on(queue.enqueue().acquire());
        let b = queue.enqueue();
        let c = queue.enqueue();
        assert_eq!(queue.len(), 3);

        let mut c_turn = Box::pin(c.acquire());
        assert!((&mut c_turn).now_or_never().is_none());
        let mut b_turn = Box::pin(b.acquire());
        assert!((&mut b_turn).now_or_never().is_none());

        drop(a);
        let b = (&mut b_turn).now_or_never().expect("b is next");
        assert!((&mut c_turn).now_or_never().is_none());
        assert_eq!(queue.processed(), 1);

        drop(b);
        assert!((&mut c_turn).now_or_never().is_some());
    }

    #[test]
    fn test_dropped_waiting_ticket_is_skipped() {
        let queue = RequestQueue::new();
        let a = block_on(queue.enqueue().acquire());
        let b = queue.enqueue();
        let c = queue.enqueue();

        drop(b);
        assert_eq!(queue.len(), 2);
        drop(a);
        assert!(c.acquire().now_or_never().is_some());
    }

    #[test]
    fn test_unacquired_granted_ticket_releases() {
        let queue = RequestQueue::new();
        let a = queue.enqueue();
        let b = queue.enqueue();

        // a holds the slot without ever acquiring it
        drop(a);
        assert!(b.acquire().now_or_never().is_some());
    }

    #[test]
    fn test_drain_resets_progress() {
        let queue = RequestQueue::new();
        let a = block_on(queue.enqueue().acquire());
        let b = queue.enqueue();
        drop(a);
        let b = block_on(b.acquire());
        assert_eq!(queue.processed(), 1);
        drop(b);
        assert_eq!(queue.processed(), 0);
        assert!(queue.is_idle());
    }
}
