//! Single-slot queue with overwrite semantics.
//!
//! A push always succeeds. If the slot is occupied the old item is handed
//! back to the pusher, who drops it outside the queue lock. Receivers only
//! ever see the most recent item.
//!
//! Two receive paths share the slot. [`FrameSlot::recv_priority`] registers
//! itself before waiting; while any priority receiver is registered, plain
//! [`FrameSlot::recv`] leaves the slot alone.

use parking_lot::{Condvar, Mutex};
use std::time::{Duration, Instant};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RecvError {
    #[error("no item within timeout")]
    Timeout,
    #[error("queue closed")]
    Closed,
}

#[derive(Debug)]
struct Slot<T> {
    item: Option<T>,
    closed: bool,
    priority_waiters: usize,
    overwritten: u64,
}

#[derive(Debug)]
pub struct FrameSlot<T> {
    slot: Mutex<Slot<T>>,
    changed: Condvar,
}

impl<T> Default for FrameSlot<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> FrameSlot<T> {
    pub fn new() -> Self {
        Self {
            slot: Mutex::new(Slot {
                item: None,
                closed: false,
                priority_waiters: 0,
                overwritten: 0,
            }),
            changed: Condvar::new(),
        }
    }

    /// Store `item`, returning the unconsumed item it displaced.
    ///
    /// After `close()` the item is handed straight back.
    #[must_use = "a displaced item must be disposed of by the caller"]
    pub fn push(&self, item: T) -> Option<T> {
        let mut slot = self.slot.lock();
        if slot.closed {
            return Some(item);
        }
        let displaced = slot.item.replace(item);
        if displaced.is_some() {
            slot.overwritten += 1;
        }
        self.changed.notify_all();
        displaced
    }

    /// Take the next item. `None` waits without a deadline.
    pub fn recv(&self, timeout: Option<Duration>) -> Result<T, RecvError> {
        let deadline = timeout.and_then(|t| Instant::now().checked_add(t));
        let mut slot = self.slot.lock();
        loop {
            if slot.closed {
                return Err(RecvError::Closed);
            }
            if slot.priority_waiters == 0 {
                if let Some(item) = slot.item.take() {
                    return Ok(item);
                }
            }
            if !self.wait(&mut slot, deadline) {
                return Err(RecvError::Timeout);
            }
        }
    }

    /// Take the next item ahead of any plain receiver.
    pub fn recv_priority(&self, timeout: Duration) -> Result<T, RecvError> {
        let deadline = Instant::now().checked_add(timeout);
        let mut slot = self.slot.lock();
        slot.priority_waiters += 1;
        let result = loop {
            if slot.closed {
                break Err(RecvError::Closed);
            }
            if let Some(item) = slot.item.take() {
                break Ok(item);
            }
            if !self.wait(&mut slot, deadline) {
                break Err(RecvError::Timeout);
            }
        };
        slot.priority_waiters -= 1;
        // Plain receivers may have skipped an item while we were registered.
        self.changed.notify_all();
        result
    }

    /// Remove the pending item, if any.
    pub fn drain(&self) -> Option<T> {
        self.slot.lock().item.take()
    }

    /// Refuse further pushes and wake every receiver with `Closed`.
    pub fn close(&self) {
        let mut slot = self.slot.lock();
        slot.closed = true;
        self.changed.notify_all();
    }

    pub fn is_closed(&self) -> bool {
        self.slot.lock().closed
    }

    /// Items replaced before anyone consumed them.
    pub fn overwritten(&self) -> u64 {
        self.slot.lock().overwritten
    }

    /// Returns `false` once `deadline` has passed.
    fn wait(&self, slot: &mut parking_lot::MutexGuard<'_, Slot<T>>, deadline: Option<Instant>) -> bool {
        match deadline {
            None => {
                self.changed.wait(slot);
                true
            }
            Some(deadline) => {
                if Instant::now() >= deadline {
                    return false;
                }
                let _ = self.changed.wait_until(slot, deadline);
                true
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_push_overwrites_unconsumed() {
        let q = FrameSlot::new();
        assert_eq!(q.push('A'), None);
        assert_eq!(q.push('B'), Some('A'));
        assert_eq!(q.recv(Some(Duration::ZERO)), Ok('B'));
        assert_eq!(q.recv(Some(Duration::ZERO)), Err(RecvError::Timeout));
        assert_eq!(q.overwritten(), 1);
    }

    #[test]
    fn test_consumer_sees_only_latest() {
        let q = FrameSlot::new();
        let mut displaced = Vec::new();
        for i in 0..10 {
            displaced.extend(q.push(i));
        }
        assert_eq!(q.recv(None), Ok(9));
        assert_eq!(displaced, (0..9).collect::<Vec<_>>());
    }

    #[test]
    fn test_blocking_recv_wakes_on_push() {
        let q = Arc::new(FrameSlot::new());
        let rx = Arc::clone(&q);
        let h = thread::spawn(move || rx.recv(Some(Duration::from_secs(5))));
        thread::sleep(Duration::from_millis(20));
        assert!(q.push(7u32).is_none());
        assert_eq!(h.join().unwrap(), Ok(7));
    }

    #[test]
    fn test_close_wakes_receivers_and_rejects_push() {
        let q = Arc::new(FrameSlot::<u32>::new());
        let rx = Arc::clone(&q);
        let h = thread::spawn(move || rx.recv(None));
        thread::sleep(Duration::from_millis(20));
        q.close();
        assert_eq!(h.join().unwrap(), Err(RecvError::Closed));
        assert_eq!(q.push(1), Some(1));
    }

    #[test]
    fn test_priority_receiver_wins() {
        let q = Arc::new(FrameSlot::new());

        let snap = Arc::clone(&q);
        let snapshot = thread::spawn(move || snap.recv_priority(Duration::from_secs(5)));
        // Wait until the snapshot is registered.
        while q.slot.lock().priority_waiters == 0 {
            thread::yield_now();
        }

        let plain = Arc::clone(&q);
        let consumer = thread::spawn(move || plain.recv(Some(Duration::from_secs(5))));
        thread::sleep(Duration::from_millis(20));

        assert!(q.push(1).is_none());
        assert_eq!(snapshot.join().unwrap(), Ok(1));

        assert!(q.push(2).is_none());
        assert_eq!(consumer.join().unwrap(), Ok(2));
    }

    #[test]
    fn test_priority_timeout_unblocks_plain_receiver() {
        let q = FrameSlot::new();
        assert_eq!(
            q.recv_priority(Duration::from_millis(10)),
            Err(RecvError::Timeout)
        );
        assert!(q.push(3).is_none());
        assert_eq!(q.recv(Some(Duration::ZERO)), Ok(3));
    }
}
