//! The matchmaking queue: connections that finished the handshake, waiting
//! to be paired.
//!
//! Many handshake tasks push into the queue while a single pairing task
//! takes entries out two at a time. The queue is strictly first-in,
//! first-out: the two longest-waiting entries are always paired together.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::sync::Notify;

/// Why a [`MatchQueue::push`] was refused. The entry is handed back so the
/// caller can still talk to it (for example to send a "queue full" error).
#[derive(Debug, thiserror::Error)]
pub enum PushError<T> {
    #[error("matchmaking queue is full")]
    Full(T),

    #[error("matchmaking queue is closed")]
    Closed(T),
}

impl<T> PushError<T> {
    /// Takes back the rejected entry.
    pub fn into_inner(self) -> T {
        match self {
            Self::Full(entry) | Self::Closed(entry) => entry,
        }
    }
}

struct Inner<T> {
    entries: VecDeque<T>,
    closed: bool,
}

/// A bounded FIFO queue shared between handshake tasks and the pairing task.
///
/// The lock is a `std::sync::Mutex`: it is never held across an `.await`,
/// and every critical section is a handful of `VecDeque` operations.
/// Waiters are woken through a [`Notify`].
pub struct MatchQueue<T> {
    inner: Mutex<Inner<T>>,
    notify: Notify,
    capacity: usize,
}

impl<T> MatchQueue<T> {
    /// Creates an empty queue that holds at most `capacity` entries.
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(Inner {
                entries: VecDeque::with_capacity(capacity),
                closed: false,
            }),
            notify: Notify::new(),
            capacity,
        }
    }

    // A panic while holding the lock cannot leave the deque half-updated,
    // so a poisoned lock is still safe to use.
    fn lock(&self) -> MutexGuard<'_, Inner<T>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Appends an entry at the back of the queue.
    ///
    /// # Errors
    /// - [`PushError::Full`] when the queue already holds `capacity` entries
    /// - [`PushError::Closed`] after [`close`](Self::close)
    pub fn push(&self, entry: T) -> Result<(), PushError<T>> {
        {
            let mut inner = self.lock();
            if inner.closed {
                return Err(PushError::Closed(entry));
            }
            if inner.entries.len() >= self.capacity {
                return Err(PushError::Full(entry));
            }
            inner.entries.push_back(entry);
        }
        self.notify.notify_waiters();
        Ok(())
    }

    /// Puts an entry back at the head of the queue, ahead of everyone else.
    ///
    /// Meant for an entry that was already dequeued and keeps its place,
    /// so the capacity is not checked.
    ///
    /// # Errors
    /// - [`PushError::Closed`] after [`close`](Self::close)
    pub fn push_front(&self, entry: T) -> Result<(), PushError<T>> {
        {
            let mut inner = self.lock();
            if inner.closed {
                return Err(PushError::Closed(entry));
            }
            inner.entries.push_front(entry);
        }
        self.notify.notify_waiters();
        Ok(())
    }

    /// Removes the longest-waiting entry.
    pub fn pop_front(&self) -> Option<T> {
        self.lock().entries.pop_front()
    }

    /// Removes the two longest-waiting entries, oldest first, but only if
    /// both are present. With fewer than two entries nothing is removed.
    pub fn pop_pair(&self) -> Option<(T, T)> {
        Self::take_pair(&mut self.lock())
    }

    fn take_pair(inner: &mut Inner<T>) -> Option<(T, T)> {
        if inner.entries.len() < 2 {
            return None;
        }
        let first = inner.entries.pop_front()?;
        let second = inner.entries.pop_front()?;
        Some((first, second))
    }

    /// Waits until two entries are queued and removes them as a pair.
    ///
    /// Returns `None` once the queue is closed.
    pub async fn wait_for_pair(&self) -> Option<(T, T)> {
        loop {
            // Register interest before checking, so a push between the
            // check and the await still wakes us.
            let notified = self.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            {
                let mut inner = self.lock();
                if inner.closed {
                    return None;
                }
                if let Some(pair) = Self::take_pair(&mut inner) {
                    return Some(pair);
                }
            }

            notified.await;
        }
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Refuses further pushes and wakes every waiter. Entries already
    /// queued stay until [`drain`](Self::drain)ed.
    pub fn close(&self) {
        self.lock().closed = true;
        self.notify.notify_waiters();
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    /// Removes and returns every queued entry in FIFO order.
    pub fn drain(&self) -> Vec<T> {
        self.lock().entries.drain(..).collect()
    }
}
