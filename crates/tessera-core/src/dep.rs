#![forbid(unsafe_code)]

//! Subscriber list: the leaf primitive of the dependency graph.
//!
//! Every reactive property and every observed container owns one [`Dep`].
//! [`depend()`](Dep::depend) records the currently capturing computation
//! (if any); [`notify()`](Dep::notify) fans a change out to every recorded
//! computation.
//!
//! # Invariants
//!
//! 1. A subscriber id appears at most once per list; re-registering is a
//!    no-op.
//! 2. `notify()` runs synchronously to completion, in registration order.
//! 3. A panicking subscriber does not stop the fan-out: the panic is
//!    caught, reported through `tracing::error!`, and the remaining
//!    subscribers are still notified.
//!
//! # Failure Modes
//!
//! - Subscriber panic during `update()`: isolated per subscriber (see
//!   invariant 3). The panic payload is not re-thrown.

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::rc::Rc;

use crate::subscriber::{Subscriber, current};

thread_local! {
    static NEXT_DEP_ID: Cell<u64> = const { Cell::new(0) };
}

/// An unordered-set-with-stable-order registry of computations interested
/// in one value.
pub struct Dep {
    id: u64,
    subs: RefCell<Vec<Rc<dyn Subscriber>>>,
}

impl Dep {
    /// Create an empty subscriber list with a fresh id.
    #[must_use]
    pub fn new() -> Self {
        let id = NEXT_DEP_ID.with(|next| {
            let id = next.get();
            next.set(id + 1);
            id
        });
        Self {
            id,
            subs: RefCell::new(Vec::new()),
        }
    }

    /// Identity of this list, unique per thread.
    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Record the currently capturing computation, if any.
    ///
    /// Idempotent: a computation already present is not added twice. Also
    /// hands the dep back to the computation via
    /// [`Subscriber::on_tracked`] so it can maintain its own dependency
    /// set.
    pub fn depend(self: &Rc<Self>) {
        if let Some(sub) = current() {
            self.add_sub(Rc::clone(&sub));
            sub.on_tracked(self);
        }
    }

    /// Register `sub` directly. No-op when a subscriber with the same id
    /// is already registered.
    pub fn add_sub(&self, sub: Rc<dyn Subscriber>) {
        let mut subs = self.subs.borrow_mut();
        if subs.iter().any(|existing| existing.id() == sub.id()) {
            return;
        }
        subs.push(sub);
    }

    /// Remove the subscriber with the given id, if registered.
    pub fn remove_sub(&self, id: u64) {
        self.subs.borrow_mut().retain(|sub| sub.id() != id);
    }

    /// Synchronously invoke `update()` on every registered subscriber, in
    /// registration order.
    ///
    /// The list is snapshotted first, so subscribers that register or
    /// unregister during the fan-out take effect on the next `notify()`.
    pub fn notify(&self) {
        let snapshot: Vec<Rc<dyn Subscriber>> = self.subs.borrow().clone();
        for sub in snapshot {
            if let Err(payload) = catch_unwind(AssertUnwindSafe(|| sub.update())) {
                tracing::error!(
                    dep = self.id,
                    subscriber = sub.id(),
                    panic = panic_message(payload.as_ref()),
                    "subscriber panicked during notify; continuing fan-out"
                );
            }
        }
    }

    /// Number of registered subscribers.
    #[must_use]
    pub fn sub_count(&self) -> usize {
        self.subs.borrow().len()
    }
}

impl Default for Dep {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Dep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dep")
            .field("id", &self.id)
            .field("subs", &self.sub_count())
            .finish()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.as_str()
    } else {
        "non-string panic payload"
    }
}
