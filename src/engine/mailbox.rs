//! The repository mailbox.
//!
//! A multi-producer, single-consumer queue of framed messages. Producers
//! append under a short-lived lock and signal the consumer; the consumer
//! swaps the entire pending batch out in O(1) and processes it without
//! holding the lock, so producers are never blocked while the engine
//! digests a batch. Messages are delivered strictly in append order
//! across all producers.

use parking_lot::{Condvar, Mutex};

use super::message::Message;

#[derive(Default)]
struct State {
    queue: Vec<Message>,
    closed: bool,
}

/// Append-only message queue feeding one processing loop.
#[derive(Default)]
pub struct Mailbox {
    state: Mutex<State>,
    wake: Condvar,
}

impl Mailbox {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one message. Ignored after [`close`](Self::close).
    pub fn push(&self, message: Message) {
        let mut state = self.state.lock();
        if state.closed {
            return;
        }
        state.queue.push(message);
        self.wake.notify_one();
    }

    /// Append several messages as one atomic unit: no other producer's
    /// messages can interleave within the batch.
    pub fn push_batch(&self, messages: Vec<Message>) {
        if messages.is_empty() {
            return;
        }
        let mut state = self.state.lock();
        if state.closed {
            return;
        }
        state.queue.extend(messages);
        self.wake.notify_one();
    }

    /// Block until messages are available, then take all of them.
    ///
    /// Returns `None` once the mailbox is closed and drained.
    pub fn drain(&self) -> Option<Vec<Message>> {
        let mut state = self.state.lock();
        loop {
            if !state.queue.is_empty() {
                return Some(std::mem::take(&mut state.queue));
            }
            if state.closed {
                return None;
            }
            self.wake.wait(&mut state);
        }
    }

    /// Close the mailbox and wake the consumer. Queued messages are still
    /// delivered; later pushes are dropped.
    pub fn close(&self) {
        let mut state = self.state.lock();
        state.closed = true;
        self.wake.notify_all();
    }
}
