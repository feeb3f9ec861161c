//! Defines [`Guard`], the atomic access token that arbitrates readers,
//! writers, and rare structural locks for a [`crate::slot::Slot`].
//!
//! A single [`AtomicU32`] packs three pieces of state: whether the
//! guard is open for visits, whether it is exclusively locked, and how
//! many visitors currently hold it open. No other synchronization
//! primitive backs a guard — every operation below is a handful of
//! compare-and-swap retries.

use std::sync::atomic::{AtomicU32, Ordering};

const OPEN_BIT: u32 = 1 << 31;
const LOCKED_BIT: u32 = 1 << 30;
const VISITOR_MASK: u32 = !(OPEN_BIT | LOCKED_BIT);
const MAX_VISITORS: u32 = VISITOR_MASK;

/// Atomic open/closed/locked token with a visitor count, used by
/// [`crate::slot::Slot`] to serialize content replacement against
/// concurrent weak-ptr observers.
///
/// Invariants: at most one locker exists at a time; a locker never
/// coexists with visitors; [`Guard::leave`] always decrements
/// regardless of how the visit was obtained.
pub struct Guard(AtomicU32);

/// RAII token returned by [`Guard::try_lock`]. Dropping it clears the
/// locked bit, reopening the guard to visitors and other lockers.
pub struct LockToken<'a> {
    guard: &'a Guard,
}

impl Guard {
    /// Creates a new guard in the open, unlocked, zero-visitor state.
    pub fn new_open() -> Self {
        Guard(AtomicU32::new(OPEN_BIT))
    }

    /// Creates a new guard in the closed, unlocked, zero-visitor state.
    pub fn new_closed() -> Self {
        Guard(AtomicU32::new(0))
    }

    /// Succeeds if the guard is currently open and unlocked, and
    /// increments the visitor count. Pair with [`Guard::leave`].
    pub fn visit(&self) -> bool {
        self.acquire(|state| state & OPEN_BIT != 0 && state & LOCKED_BIT == 0)
    }

    /// Succeeds if the guard is not locked (open or closed), and
    /// increments the visitor count. Used by non-blocking readers that
    /// must observe the current value even while the guard is closed.
    pub fn enter(&self) -> bool {
        self.acquire(|state| state & LOCKED_BIT == 0)
    }

    /// Releases a visit acquired via [`Guard::visit`] or
    /// [`Guard::enter`]. Idempotent with respect to counter direction:
    /// always decrements by one.
    pub fn leave(&self) {
        let prev = self.0.fetch_sub(1, Ordering::Release);
        debug_assert!(prev & VISITOR_MASK != 0, "leave() without a matching visit");
    }

    /// Attempts to establish exclusive access for content replacement.
    /// Succeeds only if the guard currently has no visitors and is not
    /// already locked (regardless of open/closed). On success, returns
    /// a [`LockToken`] that releases the lock when dropped.
    pub fn try_lock(&self) -> Option<LockToken<'_>> {
        let mut state = self.0.load(Ordering::Acquire);
        loop {
            if state & LOCKED_BIT != 0 || state & VISITOR_MASK != 0 {
                return None;
            }
            match self.0.compare_exchange_weak(
                state,
                state | LOCKED_BIT,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return Some(LockToken { guard: self }),
                Err(observed) => state = observed,
            }
        }
    }

    /// Closes the guard to future [`Guard::visit`] calls (administrative
    /// toggle; [`Guard::enter`] is unaffected).
    pub fn close(&self) {
        self.0.fetch_and(!OPEN_BIT, Ordering::AcqRel);
    }

    /// Reopens the guard to [`Guard::visit`] calls.
    pub fn reopen(&self) {
        self.0.fetch_or(OPEN_BIT, Ordering::AcqRel);
    }

    /// Returns whether the guard is currently open.
    pub fn is_open(&self) -> bool {
        self.0.load(Ordering::Acquire) & OPEN_BIT != 0
    }

    /// Returns whether the guard is currently locked.
    pub fn is_locked(&self) -> bool {
        self.0.load(Ordering::Acquire) & LOCKED_BIT != 0
    }

    fn acquire(&self, admits: impl Fn(u32) -> bool) -> bool {
        let mut state = self.0.load(Ordering::Acquire);
        loop {
            if !admits(state) {
                return false;
            }
            let visitors = state & VISITOR_MASK;
            if visitors == MAX_VISITORS {
                // Astronomically unlikely with real workloads, but
                // refuse rather than wrap the counter into the flag bits.
                return false;
            }
            match self.0.compare_exchange_weak(
                state,
                state + 1,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return true,
                Err(observed) => state = observed,
            }
        }
    }
}

impl Drop for LockToken<'_> {
    fn drop(&mut self) {
        self.guard.0.fetch_and(!LOCKED_BIT, Ordering::AcqRel);
    }
}

impl Default for Guard {
    fn default() -> Self {
        Guard::new_open()
    }
}
