//! Defines [`Pool`], a growing chain of fixed-size [`Slot`] buffers with
//! wait-free iteration, used to back an unbounded subscription set.
//!
//! Capacity doubles with each additional link in the chain, echoing the
//! shape of the teacher's `allocator::chain::Chain` intrusive buffer
//! list (a linked chain of fixed-size buffers, grown rather than
//! reallocated), built from [`Slot`]s instead of raw bytes and appended
//! rather than consumed. The teacher's chain itself is `&mut self` and
//! single-owner; the lock-free `AtomicPtr` append below is its own
//! addition, needed here so concurrent writers can extend the chain
//! without a lock.

use std::ptr;
use std::sync::atomic::{AtomicPtr, Ordering};
use std::sync::Arc;

use crate::slot::Slot;

const INITIAL_CAPACITY: usize = 4;

struct Segment<T> {
    slots: Box<[Slot<T>]>,
    next: AtomicPtr<Segment<T>>,
}

impl<T> Segment<T> {
    fn with_capacity(capacity: usize) -> Box<Self> {
        let slots = (0..capacity).map(|_| Slot::new()).collect::<Vec<_>>().into_boxed_slice();
        Box::new(Segment { slots, next: AtomicPtr::new(ptr::null_mut()) })
    }
}

/// A chain of fixed-size [`Slot`] arrays. New links are appended, never
/// removed; existing links are never reallocated, so raw pointers into
/// the chain (held by concurrent iterators) stay valid for the life of
/// the pool.
pub struct Pool<T> {
    head: Box<Segment<T>>,
}

impl<T> Pool<T> {
    /// Creates a new, empty pool.
    pub fn new() -> Self {
        Pool { head: Segment::with_capacity(INITIAL_CAPACITY) }
    }

    /// Constructs a new element via `ctor`, returning a strong
    /// reference to it. Scans existing slots across the chain for a
    /// free one; extends the chain with a doubled-capacity link if all
    /// existing slots are occupied or momentarily contended.
    pub fn emplace(&self, ctor: impl Fn() -> T) -> Arc<T> {
        let mut segment: &Segment<T> = &self.head;
        let mut capacity = self.head.slots.len();
        loop {
            for slot in segment.slots.iter() {
                if let Some(arc) = slot.try_emplace(&ctor) {
                    return arc;
                }
            }

            let next_ptr = segment.next.load(Ordering::Acquire);
            if !next_ptr.is_null() {
                // SAFETY: segments are never freed or moved once
                // published; `next_ptr` was published by a successful
                // compare_exchange below.
                segment = unsafe { &*next_ptr };
                continue;
            }

            capacity *= 2;
            let mut new_segment = Segment::with_capacity(capacity);
            let new_ptr = Box::into_raw(new_segment);
            match segment.next.compare_exchange(
                ptr::null_mut(),
                new_ptr,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => {
                    // SAFETY: we just published `new_ptr`; it is valid
                    // and nothing else can have freed it yet.
                    segment = unsafe { &*new_ptr };
                }
                Err(published) => {
                    // Someone else won the append race; free our
                    // unpublished buffer and continue from theirs.
                    new_segment = unsafe { Box::from_raw(new_ptr) };
                    drop(new_segment);
                    // SAFETY: `published` was set by the winning CAS
                    // and is a live segment pointer.
                    segment = unsafe { &*published };
                }
            }
        }
    }

    /// Returns an iterator that walks every slot across the chain,
    /// yielding a strong reference to each one whose [`Slot::lock`]
    /// succeeds. Safe against concurrent removal elsewhere: each
    /// yielded element is pinned by the `Arc` returned to the caller.
    pub fn iter(&self) -> Iter<'_, T> {
        Iter { segment: &self.head, index: 0 }
    }
}

impl<T> Default for Pool<T> {
    fn default() -> Self {
        Pool::new()
    }
}

impl<T> Drop for Pool<T> {
    fn drop(&mut self) {
        let mut next = self.head.next.load(Ordering::Acquire);
        while !next.is_null() {
            // SAFETY: every non-null `next` pointer in the chain was
            // produced by `Box::into_raw` and is owned exactly once by
            // the chain (append-only, never shared elsewhere).
            let boxed = unsafe { Box::from_raw(next) };
            next = boxed.next.load(Ordering::Acquire);
        }
    }
}

/// Iterator over the live elements of a [`Pool`].
pub struct Iter<'a, T> {
    segment: &'a Segment<T>,
    index: usize,
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = Arc<T>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            while self.index < self.segment.slots.len() {
                let slot = &self.segment.slots[self.index];
                self.index += 1;
                if let Some(arc) = slot.lock() {
                    return Some(arc);
                }
            }

            let next_ptr = self.segment.next.load(Ordering::Acquire);
            if next_ptr.is_null() {
                return None;
            }
            // SAFETY: see `Pool::emplace`.
            self.segment = unsafe { &*next_ptr };
            self.index = 0;
        }
    }
}

// SAFETY: a `Pool<T>` only exposes `T` behind `Arc<T>` handed out under
// the same discipline as `Slot<T>`.
unsafe impl<T: Send + Sync> Sync for Pool<T> {}
