//! Defines [`Slot`], a cooperative storage cell for at most one value.
//!
//! A slot always holds a [`Weak`] pointer internally; callers own the
//! [`Arc`] that keeps the contained value alive. When the last external
//! `Arc` is dropped the slot's own weak pointer simply stops upgrading
//! — there is no separate "free the cell" step, unlike the handwritten
//! custom-deleter trick this component is traditionally built with in
//! languages without a weak/strong split baked into the smart pointer.

use std::cell::UnsafeCell;
use std::sync::{Arc, Weak};

use crate::guard::Guard;

/// A storage cell for at most one value of type `T`.
///
/// Reads ([`Slot::lock`], [`Slot::weak`]) briefly hold the guard open
/// to clone the internal weak pointer; a write ([`Slot::try_emplace`])
/// is attempted only when no reader currently holds the guard.
pub struct Slot<T> {
    guard: Guard,
    value: UnsafeCell<Weak<T>>,
}

// SAFETY: access to `value` is always performed while holding the
// guard (either a visit/enter for reads, or the exclusive lock for the
// one write path), so concurrent access to the `UnsafeCell` never
// overlaps a mutation.
unsafe impl<T: Send + Sync> Sync for Slot<T> {}

impl<T> Slot<T> {
    /// Creates a new, empty slot.
    pub fn new() -> Self {
        Slot { guard: Guard::new_open(), value: UnsafeCell::new(Weak::new()) }
    }

    /// Returns a strong reference to the contained value, or `None` if
    /// the slot is empty or momentarily contended by a writer.
    pub fn lock(&self) -> Option<Arc<T>> {
        if !self.guard.visit() {
            return None;
        }
        // SAFETY: a live visit excludes any concurrent `try_emplace` lock.
        let weak = unsafe { (*self.value.get()).clone() };
        self.guard.leave();
        weak.upgrade()
    }

    /// Returns a weak reference to the contained value. Always
    /// succeeds, even if the slot is empty (the returned weak pointer
    /// then simply never upgrades).
    pub fn weak(&self) -> Weak<T> {
        if !self.guard.enter() {
            return Weak::new();
        }
        // SAFETY: see `lock`.
        let weak = unsafe { (*self.value.get()).clone() };
        self.guard.leave();
        weak
    }

    /// Constructs a value in place via `ctor`, returning a strong
    /// reference to it.
    ///
    /// Fails (returning `None`) if the slot already holds a live value,
    /// or if a reader currently holds the guard open — callers may
    /// retry or treat the latter as benign contention.
    pub fn try_emplace(&self, ctor: impl FnOnce() -> T) -> Option<Arc<T>> {
        let token = self.guard.try_lock()?;
        // SAFETY: the lock token proves exclusive access to `value`.
        let occupied = unsafe { (*self.value.get()).upgrade() }.is_some();
        if occupied {
            return None;
        }
        let arc = Arc::new(ctor());
        unsafe {
            *self.value.get() = Arc::downgrade(&arc);
        }
        drop(token);
        Some(arc)
    }

    /// Returns `true` if the slot currently holds no live value.
    pub fn is_empty(&self) -> bool {
        self.lock().is_none()
    }
}

impl<T> Default for Slot<T> {
    fn default() -> Self {
        Slot::new()
    }
}

impl<T> Drop for Slot<T> {
    fn drop(&mut self) {
        // SAFETY: `&mut self` proves no other access is in flight.
        let alive = unsafe { (*self.value.get()).upgrade() }.is_some();
        assert!(!alive, "Slot dropped while still holding a live value");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn emplace_then_lock_observes_value() {
        let slot: Slot<u32> = Slot::new();
        let held = slot.try_emplace(|| 42).expect("empty slot emplaces");
        assert_eq!(*held, 42);
        assert_eq!(*slot.lock().unwrap(), 42);
    }

    #[test]
    fn second_emplace_fails_while_first_lives() {
        let slot: Slot<u32> = Slot::new();
        let first = slot.try_emplace(|| 1).unwrap();
        assert!(slot.try_emplace(|| 2).is_none());
        drop(first);
        assert!(slot.try_emplace(|| 2).is_some());
    }

    #[test]
    fn weak_upgrades_while_strong_ref_lives_and_dies_after() {
        let slot: Slot<u32> = Slot::new();
        let weak = slot.weak();
        assert!(weak.upgrade().is_none());
        let held = slot.try_emplace(|| 7).unwrap();
        let weak = slot.weak();
        assert_eq!(*weak.upgrade().unwrap(), 7);
        drop(held);
        assert!(weak.upgrade().is_none());
    }

    #[test]
    fn lock_returns_none_once_value_dropped() {
        let slot: Slot<u32> = Slot::new();
        let held = slot.try_emplace(|| 9).unwrap();
        drop(held);
        assert!(slot.lock().is_none());
    }

    #[test]
    #[should_panic(expected = "still holding a live value")]
    fn drop_panics_if_value_still_alive() {
        let slot: Slot<u32> = Slot::new();
        let held = slot.try_emplace(|| 1).unwrap();
        drop(slot);
        drop(held);
    }

    #[test]
    fn concurrent_emplace_attempts_yield_one_winner() {
        let slot = Arc::new(Slot::<u32>::new());
        let mut handles = Vec::new();
        for i in 0..8 {
            let slot = Arc::clone(&slot);
            handles.push(thread::spawn(move || slot.try_emplace(move || i).is_some()));
        }
        let wins: usize = handles.into_iter().filter(|h| h.join().unwrap()).count();
        assert_eq!(wins, 1);
    }
}
