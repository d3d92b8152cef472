// src/mailbox.rs - Single-slot, latest-wins command handoff
use std::sync::{Arc, Mutex, MutexGuard};

/// Single pending value shared between any number of writers and one reader.
///
/// `post` overwrites whatever is pending and `take` empties the slot, so a
/// reader that drains once per tick only ever sees the freshest value. This
/// is deliberately not a queue: a value overwritten before it was taken has
/// no effect at all.
#[derive(Debug)]
pub struct Mailbox<T> {
    slot: Arc<Mutex<Option<T>>>,
}

impl<T> Clone for Mailbox<T> {
    fn clone(&self) -> Self {
        Self {
            slot: Arc::clone(&self.slot),
        }
    }
}

impl<T> Default for Mailbox<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Mailbox<T> {
    pub fn new() -> Self {
        Self {
            slot: Arc::new(Mutex::new(None)),
        }
    }

    // A panic while holding the lock cannot leave the slot half-written.
    fn lock(&self) -> MutexGuard<'_, Option<T>> {
        self.slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Store `value`, returning the unconsumed value it displaced, if any.
    pub fn post(&self, value: T) -> Option<T> {
        self.lock().replace(value)
    }

    /// Remove and return the pending value.
    pub fn take(&self) -> Option<T> {
        self.lock().take()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn take_empties_the_slot() {
        let mailbox = Mailbox::new();
        assert!(mailbox.is_empty());
        assert_eq!(mailbox.post(1), None);
        assert_eq!(mailbox.take(), Some(1));
        assert_eq!(mailbox.take(), None);
    }

    #[test]
    fn newer_values_overwrite_older_ones() {
        let mailbox = Mailbox::new();
        mailbox.post("first");
        assert_eq!(mailbox.post("second"), Some("first"));
        assert_eq!(mailbox.take(), Some("second"));
        assert!(mailbox.is_empty());
    }

    #[test]
    fn clones_share_the_slot() {
        let writer = Mailbox::new();
        let reader = writer.clone();
        writer.post(42);
        assert_eq!(reader.take(), Some(42));
    }

    #[test]
    fn concurrent_writers_leave_exactly_one_value() {
        let mailbox = Mailbox::new();
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let mb = mailbox.clone();
                std::thread::spawn(move || {
                    for j in 0..100 {
                        mb.post(i * 100 + j);
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert!(mailbox.take().is_some());
        assert!(mailbox.take().is_none());
    }
}
