#![forbid(unsafe_code)]

//! Sequence-mutation interception.
//!
//! Per-key cells cannot see a sequence growing, shrinking, or reordering,
//! so the mutating operations themselves are the interception point: each
//! performs the native mutation, observes newly inserted elements, and
//! notifies the sequence's own-identity subscriber list.
//!
//! Non-mutating accessors (`get`, `len`, `to_vec`, ..) live in
//! [`crate::value`] and are untouched.
//!
//! # Invariants
//!
//! 1. Inserted elements are observed before the notification fires, so a
//!    re-running computation already sees them instrumented.
//! 2. An unobserved sequence mutates plainly: no observation of inserted
//!    elements, no notification.
//! 3. `splice` clamps its range to the current length and returns the
//!    removed items.

use std::cmp::Ordering;

use crate::observe::observe;
use crate::value::{SeqRef, Value};

impl SeqRef {
    /// Append a value.
    pub fn push(&self, value: impl Into<Value>) {
        let value = value.into();
        self.inner.borrow_mut().items.push(value.clone());
        self.after_mutation(&[value]);
    }

    /// Remove and return the last value.
    pub fn pop(&self) -> Option<Value> {
        let removed = self.inner.borrow_mut().items.pop();
        self.after_mutation(&[]);
        removed
    }

    /// Remove and return the first value.
    pub fn shift(&self) -> Option<Value> {
        let removed = {
            let mut data = self.inner.borrow_mut();
            if data.items.is_empty() {
                None
            } else {
                Some(data.items.remove(0))
            }
        };
        self.after_mutation(&[]);
        removed
    }

    /// Insert a value at the front.
    pub fn unshift(&self, value: impl Into<Value>) {
        let value = value.into();
        self.inner.borrow_mut().items.insert(0, value.clone());
        self.after_mutation(&[value]);
    }

    /// Remove `delete_count` items starting at `start` (both clamped to
    /// the current length) and insert `items` in their place. Returns the
    /// removed items.
    pub fn splice(&self, start: usize, delete_count: usize, items: Vec<Value>) -> Vec<Value> {
        let removed: Vec<Value> = {
            let mut data = self.inner.borrow_mut();
            let len = data.items.len();
            let start = start.min(len);
            let end = start.saturating_add(delete_count).min(len);
            data.items.splice(start..end, items.iter().cloned()).collect()
        };
        self.after_mutation(&items);
        removed
    }

    /// Reorder in place with a comparator.
    ///
    /// The comparator runs against a detached snapshot, so it may read the
    /// sequence without aliasing a live borrow.
    pub fn sort_by(&self, compare: impl FnMut(&Value, &Value) -> Ordering) {
        let mut detached = std::mem::take(&mut self.inner.borrow_mut().items);
        detached.sort_by(compare);
        self.inner.borrow_mut().items = detached;
        self.after_mutation(&[]);
    }

    /// Reverse in place.
    pub fn reverse(&self) {
        self.inner.borrow_mut().items.reverse();
        self.after_mutation(&[]);
    }

    /// Shared tail of every mutating operation: observe what was inserted
    /// and notify the own-identity subscriber list. Plain mutation when
    /// the sequence is unobserved.
    fn after_mutation(&self, inserted: &[Value]) {
        let Some(observer) = self.observer() else {
            return;
        };
        for item in inserted {
            observe(item, None);
        }
        observer.dep().notify();
    }
}
