//! Thread-safe FIFO used for tile submission and completion.

use crossbeam_channel::{unbounded, Receiver, Sender, TryRecvError};

/// Multi-producer, multi-consumer FIFO queue.
///
/// Cloning yields another handle to the same queue. A push wakes exactly one
/// blocked consumer.
#[derive(Debug)]
pub struct WorkQueue<T> {
    tx: Sender<T>,
    rx: Receiver<T>,
}

impl<T> Clone for WorkQueue<T> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
            rx: self.rx.clone(),
        }
    }
}

impl<T> Default for WorkQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> WorkQueue<T> {
    pub fn new() -> Self {
        let (tx, rx) = unbounded();
        Self { tx, rx }
    }

    /// Append a value.
    pub fn push(&self, value: T) {
        // Cannot fail: this handle keeps the receiving side alive
        let _ = self.tx.send(value);
    }

    /// Take the front value without blocking.
    pub fn try_pop(&self) -> Option<T> {
        match self.rx.try_recv() {
            Ok(value) => Some(value),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
        }
    }

    /// Block until a value is available and take it.
    pub fn wait_and_pop(&self) -> Option<T> {
        self.rx.recv().ok()
    }

    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }
}
