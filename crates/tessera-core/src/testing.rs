#![forbid(unsafe_code)]

//! Subscriber doubles for test suites.
//!
//! Enabled with the `test-helpers` feature so downstream crates can
//! exercise dependency capture without implementing a full computation
//! type of their own.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use crate::dep::Dep;
use crate::subscriber::{CaptureGuard, Subscriber, next_subscriber_id};

/// Counts `update()` invocations and does nothing else.
pub struct CountingSubscriber {
    id: u64,
    updates: Cell<usize>,
}

impl CountingSubscriber {
    #[must_use]
    pub fn new() -> Rc<Self> {
        Rc::new(Self {
            id: next_subscriber_id(),
            updates: Cell::new(0),
        })
    }

    /// Number of times `update()` has fired.
    #[must_use]
    pub fn updates(&self) -> usize {
        self.updates.get()
    }
}

impl Subscriber for CountingSubscriber {
    fn id(&self) -> u64 {
        self.id
    }

    fn update(&self) {
        self.updates.set(self.updates.get() + 1);
    }
}

/// Closure-driven computation double.
///
/// Each [`run()`](ProbeSubscriber::run) evaluates the read body under a
/// capture scope and then releases subscriptions to deps the body no
/// longer touched, the same shape a real view computation takes: the
/// dependency set always shrinks to the actual reads of the latest run.
pub struct ProbeSubscriber {
    id: u64,
    weak_self: Weak<ProbeSubscriber>,
    read: Box<dyn Fn()>,
    evaluations: Cell<usize>,
    updates: Cell<usize>,
    deps: RefCell<Vec<Rc<Dep>>>,
    new_deps: RefCell<Vec<Rc<Dep>>>,
}

impl ProbeSubscriber {
    pub fn new(read: impl Fn() + 'static) -> Rc<Self> {
        Rc::new_cyclic(|weak| Self {
            id: next_subscriber_id(),
            weak_self: weak.clone(),
            read: Box::new(read),
            evaluations: Cell::new(0),
            updates: Cell::new(0),
            deps: RefCell::new(Vec::new()),
            new_deps: RefCell::new(Vec::new()),
        })
    }

    /// Evaluate the read body under a capture scope, then drop
    /// subscriptions to deps that were not touched this time.
    pub fn run(self: &Rc<Self>) {
        self.evaluations.set(self.evaluations.get() + 1);
        self.new_deps.borrow_mut().clear();
        {
            let _scope = CaptureGuard::enter(Rc::clone(self) as Rc<dyn Subscriber>);
            (self.read)();
        }
        let fresh: Vec<Rc<Dep>> = std::mem::take(&mut *self.new_deps.borrow_mut());
        for stale in self.deps.borrow().iter() {
            if !fresh.iter().any(|dep| dep.id() == stale.id()) {
                stale.remove_sub(self.id);
            }
        }
        *self.deps.borrow_mut() = fresh;
    }

    /// Total evaluations: the initial `run()` plus every notified re-run.
    #[must_use]
    pub fn evaluations(&self) -> usize {
        self.evaluations.get()
    }

    /// Number of times `update()` has fired.
    #[must_use]
    pub fn updates(&self) -> usize {
        self.updates.get()
    }

    /// Size of the dependency set as of the latest run.
    #[must_use]
    pub fn dep_count(&self) -> usize {
        self.deps.borrow().len()
    }
}

impl Subscriber for ProbeSubscriber {
    fn id(&self) -> u64 {
        self.id
    }

    fn update(&self) {
        self.updates.set(self.updates.get() + 1);
        if let Some(me) = self.weak_self.upgrade() {
            me.run();
        }
    }

    fn on_tracked(&self, dep: &Rc<Dep>) {
        let mut fresh = self.new_deps.borrow_mut();
        if !fresh.iter().any(|existing| existing.id() == dep.id()) {
            fresh.push(Rc::clone(dep));
        }
    }
}
