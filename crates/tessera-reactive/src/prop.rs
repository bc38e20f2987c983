#![forbid(unsafe_code)]

//! Reactive cells: per-key dependency recording and change dispatch.
//!
//! [`define_reactive`] rewrites one mapping key into a [`ReactiveProp`]
//! cell. Reads through the cell record the current computation into the
//! key's private subscriber list; writes suppress identical values and
//! notify otherwise. A pre-existing getter/setter pair is preserved and
//! wrapped transparently.
//!
//! # Invariants
//!
//! 1. A non-configurable descriptor is never instrumented; the key stays
//!    plain (best-effort policy, no error).
//! 2. Reads inside a capture scope register three levels: the key's own
//!    dep, the child container's own-identity dep, and — for sequence
//!    values — every contained element's own-identity dep.
//! 3. A write of an identical value (`Value::identical`) performs no
//!    mutation and no notification. `NaN` is not identical to `NaN`, so
//!    repeated `NaN` writes do notify.
//! 4. The child observer reference is refreshed on every effective write,
//!    so newly assigned containers are immediately tracked.

use std::cell::RefCell;
use std::rc::Rc;

use tessera_core::{Dep, is_capturing};

use crate::observe::{Observer, observe};
use crate::value::{Getter, MapRef, Property, SeqRef, Setter, Value};

/// Installed reactive cell for one (container, key) pair.
pub struct ReactiveProp {
    dep: Rc<Dep>,
    /// Closed-over value slot, the source of truth when no getter was
    /// preserved. With a preserved setter, writes go to the setter and
    /// this slot is left behind, matching the transparent-wrapper rule.
    value: RefCell<Value>,
    wrapped_get: Option<Getter>,
    wrapped_set: Option<Setter>,
    child: RefCell<Option<Rc<Observer>>>,
}

impl ReactiveProp {
    /// The key's private subscriber list.
    #[must_use]
    pub fn dep(&self) -> &Rc<Dep> {
        &self.dep
    }

    fn current_value(&self) -> Value {
        match &self.wrapped_get {
            Some(get) => get(),
            None => self.value.borrow().clone(),
        }
    }

    /// Resolve the current value, recording the capturing computation.
    pub(crate) fn read(&self) -> Value {
        let value = self.current_value();
        if is_capturing() {
            self.dep.depend();
            if let Some(child) = self.child.borrow().as_ref() {
                child.dep().depend();
            }
            if let Value::Seq(seq) = &value {
                depend_elements(seq);
            }
        }
        value
    }

    /// Write a new value: suppress identical writes, re-observe the new
    /// value, notify the key's subscribers.
    pub(crate) fn write(&self, new: Value) {
        let current = self.current_value();
        if new.identical(&current) {
            return;
        }
        match &self.wrapped_set {
            Some(set) => set(new.clone()),
            None => *self.value.borrow_mut() = new.clone(),
        }
        *self.child.borrow_mut() = observe(&new, None);
        self.dep.notify();
    }
}

impl std::fmt::Debug for ReactiveProp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReactiveProp")
            .field("dep", &self.dep.id())
            .field("wrapped", &self.wrapped_get.is_some())
            .field("child", &self.child.borrow().is_some())
            .finish()
    }
}

/// Record the capturing computation in every observed element of `seq`.
/// Element-level structural changes then notify readers of the parent
/// sequence value as well.
fn depend_elements(seq: &SeqRef) {
    for item in seq.to_vec() {
        if let Some(observer) = item.observer() {
            observer.dep().depend();
        }
    }
}

/// Install a reactive cell for `key` on `map` with `initial` as its
/// starting value.
///
/// Leaves the key untouched when its descriptor is non-configurable or
/// already reactive. A pre-existing accessor pair is preserved inside the
/// cell.
pub fn define_reactive(map: &MapRef, key: &str, initial: Value) {
    let (wrapped_get, wrapped_set) = match map.slot(key).as_deref() {
        Some(Property::Data {
            configurable: false,
            ..
        })
        | Some(Property::Accessor {
            configurable: false,
            ..
        }) => return,
        Some(Property::Reactive(_)) => return,
        Some(Property::Accessor { get, set, .. }) => (Some(get.clone()), set.clone()),
        Some(Property::Data { .. }) | None => (None, None),
    };

    let child = observe(&initial, None);
    map.replace_slot(
        key,
        Property::Reactive(ReactiveProp {
            dep: Rc::new(Dep::new()),
            value: RefCell::new(initial),
            wrapped_get,
            wrapped_set,
            child: RefCell::new(child),
        }),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use tessera_core::testing::ProbeSubscriber;

    fn reactive_map(key: &str, value: impl Into<Value>) -> MapRef {
        let map = MapRef::new();
        map.insert(key, value);
        observe(&Value::Map(map.clone()), None).unwrap();
        map
    }

    #[test]
    fn read_records_capturing_computation() {
        let map = reactive_map("n", 1);

        let read_map = map.clone();
        let probe = ProbeSubscriber::new(move || {
            let _ = read_map.get("n");
        });
        probe.run();

        map.assign("n", 2);
        assert_eq!(probe.updates(), 1);
        assert_eq!(map.get("n").unwrap().as_number(), Some(2.0));
    }

    #[test]
    fn read_outside_capture_records_nothing() {
        let map = reactive_map("n", 1);
        let _ = map.get("n");
        map.assign("n", 2);
        // Nothing to assert beyond "no panic": no computation was current,
        // so the dep stayed empty and notify() had no one to call.
        assert_eq!(map.get("n").unwrap().as_number(), Some(2.0));
    }

    #[test]
    fn identical_write_is_suppressed() {
        let map = reactive_map("n", 5);
        let read_map = map.clone();
        let probe = ProbeSubscriber::new(move || {
            let _ = read_map.get("n");
        });
        probe.run();

        map.assign("n", 5);
        assert_eq!(probe.updates(), 0);
    }

    #[test]
    fn nan_write_notifies() {
        let map = reactive_map("n", f64::NAN);
        let read_map = map.clone();
        let probe = ProbeSubscriber::new(move || {
            let _ = read_map.get("n");
        });
        probe.run();

        map.assign("n", f64::NAN);
        assert_eq!(probe.updates(), 1, "NaN is never identical to NaN");
    }

    #[test]
    fn new_container_value_is_reobserved() {
        let map = reactive_map("child", MapRef::new());

        let replacement = MapRef::new();
        replacement.insert("leaf", 1);
        map.assign("child", replacement.clone());

        assert!(replacement.observer().is_some(), "new child observed on write");
    }

    #[test]
    fn child_identity_dep_notifies_parent_readers() {
        let child = MapRef::new();
        child.insert("leaf", 1);
        let map = MapRef::new();
        map.insert("child", child.clone());
        observe(&Value::Map(map.clone()), None).unwrap();

        let read_map = map.clone();
        let probe = ProbeSubscriber::new(move || {
            let _ = read_map.get("child");
        });
        probe.run();

        // A structural notification on the child's own-identity dep
        // reaches readers of the parent key.
        child.observer().unwrap().dep().notify();
        assert_eq!(probe.updates(), 1);
    }

    #[test]
    fn seq_element_identity_dep_notifies_seq_readers() {
        let element = MapRef::new();
        element.insert("leaf", 1);
        let seq = SeqRef::from_values(vec![Value::Map(element.clone())]);
        let map = MapRef::new();
        map.insert("items", seq);
        observe(&Value::Map(map.clone()), None).unwrap();

        let read_map = map.clone();
        let probe = ProbeSubscriber::new(move || {
            let _ = read_map.get("items");
        });
        probe.run();

        element.observer().unwrap().dep().notify();
        assert_eq!(probe.updates(), 1);
    }

    #[test]
    fn preserved_accessor_is_wrapped_transparently() {
        let backing = Rc::new(RefCell::new(1.0));
        let map = MapRef::new();

        let read_backing = Rc::clone(&backing);
        let write_backing = Rc::clone(&backing);
        map.define_accessor(
            "level",
            Rc::new(move || Value::Number(*read_backing.borrow())),
            Some(Rc::new(move |value| {
                if let Some(n) = value.as_number() {
                    *write_backing.borrow_mut() = n;
                }
            })),
        );
        observe(&Value::Map(map.clone()), None).unwrap();

        let read_map = map.clone();
        let probe = ProbeSubscriber::new(move || {
            let _ = read_map.get("level");
        });
        probe.run();

        map.assign("level", 2);
        assert_eq!(*backing.borrow(), 2.0, "write routed through preserved setter");
        assert_eq!(probe.updates(), 1, "wrapped accessor still notifies");
    }

    #[test]
    fn sealed_key_is_left_plain() {
        let map = MapRef::new();
        map.insert_sealed("frozen", 1);
        map.insert("open", 2);
        observe(&Value::Map(map.clone()), None).unwrap();

        assert!(matches!(
            map.slot("frozen").as_deref(),
            Some(Property::Data { .. })
        ));
        assert!(matches!(
            map.slot("open").as_deref(),
            Some(Property::Reactive(_))
        ));
    }

    #[test]
    fn define_reactive_twice_keeps_first_cell() {
        let map = reactive_map("n", 1);
        let first = map.slot("n").unwrap();
        define_reactive(&map, "n", Value::from(2));
        let second = map.slot("n").unwrap();
        assert!(Rc::ptr_eq(&first, &second));
    }
}
