#![forbid(unsafe_code)]

//! Subscriber contract and the current-computation capture stack.
//!
//! A computation that wants its reads recorded implements [`Subscriber`]
//! and evaluates inside a [`CaptureGuard`] scope. While the scope is
//! alive, every reactive read registers the computation into the touched
//! value's [`Dep`](crate::dep::Dep); a later write to any of those values
//! re-invokes [`Subscriber::update`].
//!
//! # Invariants
//!
//! 1. At most one computation is current at a time; nested scopes restore
//!    the outer computation when the inner scope ends.
//! 2. The stack is restored on every exit path, including panics
//!    (restoration lives in `Drop`).
//! 3. `next_subscriber_id()` never hands out the same id twice on one
//!    thread.

use std::cell::{Cell, RefCell};
use std::marker::PhantomData;
use std::rc::Rc;

use crate::dep::Dep;

/// The minimal contract a computation must satisfy to participate in
/// dependency tracking.
pub trait Subscriber {
    /// Stable identity used to de-duplicate registrations within a [`Dep`].
    fn id(&self) -> u64;

    /// Re-evaluation entry point, invoked synchronously by
    /// [`Dep::notify`](crate::dep::Dep::notify).
    fn update(&self);

    /// Invoked when this computation is recorded into `dep`, so it can
    /// keep its own view of the dependency set (e.g. to release stale
    /// subscriptions after a re-run). The default implementation ignores
    /// the callback.
    fn on_tracked(&self, dep: &Rc<Dep>) {
        let _ = dep;
    }
}

thread_local! {
    static CAPTURE_STACK: RefCell<Vec<Rc<dyn Subscriber>>> = const { RefCell::new(Vec::new()) };
    static NEXT_SUBSCRIBER_ID: Cell<u64> = const { Cell::new(0) };
}

/// Hand out a fresh subscriber id. Monotonic per thread.
#[must_use]
pub fn next_subscriber_id() -> u64 {
    NEXT_SUBSCRIBER_ID.with(|next| {
        let id = next.get();
        next.set(id + 1);
        id
    })
}

/// The computation currently eligible to be recorded, if any.
#[must_use]
pub fn current() -> Option<Rc<dyn Subscriber>> {
    CAPTURE_STACK.with(|stack| stack.borrow().last().cloned())
}

/// Whether any computation is currently capturing reads.
#[must_use]
pub fn is_capturing() -> bool {
    CAPTURE_STACK.with(|stack| !stack.borrow().is_empty())
}

/// RAII scope marking a computation as current for the duration of its
/// evaluation. Dropping the guard restores the previously current
/// computation, so nested evaluations nest stack-like.
pub struct CaptureGuard {
    // Keep the guard single-threaded; the stack it pops is thread-local.
    _not_send: PhantomData<Rc<()>>,
}

impl CaptureGuard {
    /// Push `sub` onto the capture stack until the guard drops.
    #[must_use = "the computation stays current only while the guard is alive"]
    pub fn enter(sub: Rc<dyn Subscriber>) -> Self {
        CAPTURE_STACK.with(|stack| stack.borrow_mut().push(sub));
        Self {
            _not_send: PhantomData,
        }
    }
}

impl Drop for CaptureGuard {
    fn drop(&mut self) {
        CAPTURE_STACK.with(|stack| {
            stack.borrow_mut().pop();
        });
    }
}

impl std::fmt::Debug for CaptureGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CaptureGuard").finish()
    }
}
