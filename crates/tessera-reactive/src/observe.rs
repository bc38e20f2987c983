#![forbid(unsafe_code)]

//! Observer attachment: converting a plain container into an observed one.
//!
//! [`observe`] is the single entry point. For a mapping it installs a
//! reactive cell per key; for a sequence it recursively observes each
//! element (structural sequence changes are intercepted at the operation
//! level, see [`crate::seq`]). The attached [`Observer`] carries the
//! container's own-identity subscriber list, notified when the container
//! is structurally changed rather than when one key's value changes.
//!
//! # Invariants
//!
//! 1. Observation is idempotent: a second `observe` of the same container
//!    returns the already-attached observer without re-instrumenting.
//! 2. Non-extensible containers and root component instances are never
//!    observed.
//! 3. The observer holds only weak references outward (observed container,
//!    owners); the data graph never keeps an owner alive.

use std::cell::RefCell;
use std::rc::Rc;

use tessera_core::Dep;

use crate::prop::define_reactive;
use crate::value::{MapRef, SeqRef, Value, WeakMapRef, WeakSeqRef};

enum ObservedRef {
    Map(WeakMapRef),
    Seq(WeakSeqRef),
}

/// Attached to each observed container. Owns the container's own-identity
/// subscriber list and the set of owner instances sharing the container as
/// their root data store.
pub struct Observer {
    value: ObservedRef,
    dep: Rc<Dep>,
    owners: RefCell<Vec<WeakMapRef>>,
}

impl Observer {
    /// The container's own-identity subscriber list: notified on
    /// structural change (key added/removed, sequence resized), not on
    /// single-key writes.
    #[must_use]
    pub fn dep(&self) -> &Rc<Dep> {
        &self.dep
    }

    /// Register an owner instance sharing this container as its root data
    /// store. Held weakly; multiple simultaneous owners are supported.
    pub fn add_owner(&self, owner: &MapRef) {
        let mut owners = self.owners.borrow_mut();
        if owners
            .iter()
            .filter_map(WeakMapRef::upgrade)
            .any(|existing| existing.ptr_eq(owner))
        {
            return;
        }
        owners.push(owner.downgrade());
    }

    /// Unregister an owner instance (called when the container is swapped
    /// out as that owner's data store).
    pub fn remove_owner(&self, owner: &MapRef) {
        self.owners.borrow_mut().retain(|weak| {
            weak.upgrade()
                .is_some_and(|existing| !existing.ptr_eq(owner))
        });
    }

    /// Live owners, pruning entries whose instance has been dropped.
    #[must_use]
    pub fn owners(&self) -> Vec<MapRef> {
        let mut owners = self.owners.borrow_mut();
        owners.retain(|weak| weak.upgrade().is_some());
        owners.iter().filter_map(WeakMapRef::upgrade).collect()
    }

    /// Install a reactive cell for one key on the observed mapping. Used
    /// by the dynamic mutation API when a key appears after initial
    /// observation.
    pub fn convert(&self, key: &str, value: Value) {
        if let ObservedRef::Map(weak) = &self.value
            && let Some(map) = weak.upgrade()
        {
            define_reactive(&map, key, value);
        }
    }
}

impl std::fmt::Debug for Observer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = match &self.value {
            ObservedRef::Map(_) => "map",
            ObservedRef::Seq(_) => "seq",
        };
        f.debug_struct("Observer")
            .field("kind", &kind)
            .field("dep", &self.dep.id())
            .field("owners", &self.owners.borrow().len())
            .finish()
    }
}

/// Observe a value, optionally registering `owner` as an owning instance.
///
/// Returns the attached observer, or `None` when the value is not
/// observable: primitives, non-extensible containers, and root component
/// instances are left untouched.
pub fn observe(value: &Value, owner: Option<&MapRef>) -> Option<Rc<Observer>> {
    let observer = match value {
        Value::Map(map) => observe_map(map),
        Value::Seq(seq) => observe_seq(seq),
        _ => None,
    };
    if let (Some(observer), Some(owner)) = (&observer, owner) {
        observer.add_owner(owner);
    }
    observer
}

fn observe_map(map: &MapRef) -> Option<Rc<Observer>> {
    if let Some(existing) = map.observer() {
        return Some(existing);
    }
    if !map.is_extensible() || map.is_instance_root() {
        return None;
    }

    let observer = Rc::new(Observer {
        value: ObservedRef::Map(map.downgrade()),
        dep: Rc::new(Dep::new()),
        owners: RefCell::new(Vec::new()),
    });
    map.set_observer(Rc::clone(&observer));
    tracing::debug!(keys = map.len(), "observing map");

    walk(map);
    Some(observer)
}

fn observe_seq(seq: &SeqRef) -> Option<Rc<Observer>> {
    if let Some(existing) = seq.observer() {
        return Some(existing);
    }
    if !seq.is_extensible() {
        return None;
    }

    let observer = Rc::new(Observer {
        value: ObservedRef::Seq(seq.downgrade()),
        dep: Rc::new(Dep::new()),
        owners: RefCell::new(Vec::new()),
    });
    seq.set_observer(Rc::clone(&observer));
    tracing::debug!(len = seq.len(), "observing seq");

    for item in seq.to_vec() {
        observe(&item, None);
    }
    Some(observer)
}

/// Walk every own key and install a reactive cell for it.
fn walk(map: &MapRef) {
    for key in map.keys() {
        let initial = map.get(&key).unwrap_or(Value::Null);
        define_reactive(map, &key, initial);
    }
}
