#![forbid(unsafe_code)]

//! Dynamic mutation: adding and removing reactive keys after observation.
//!
//! Per-key cells are installed when a container is first observed; keys
//! that appear or disappear later must go through [`set`] and [`del`] so
//! the accessor graph stays consistent — a bare `assign` on a fresh key
//! creates an untracked plain slot.
//!
//! # Failure Modes
//!
//! - `set`/`del` on a primitive value is out of contract: no-op plus a
//!   `tracing::warn!` diagnostic, never a panic.
//! - `set` with a name key on a sequence is likewise a diagnosed no-op.

use crate::proxy::{proxy, unproxy};
use crate::value::{MapRef, Value};

/// Key addressing either a mapping slot or a sequence position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key<'a> {
    Name(&'a str),
    Index(usize),
}

impl<'a> From<&'a str> for Key<'a> {
    fn from(key: &'a str) -> Self {
        Key::Name(key)
    }
}

impl From<usize> for Key<'_> {
    fn from(index: usize) -> Self {
        Key::Index(index)
    }
}

/// Set a key on a container, making it reactive when the container is
/// observed. Returns the assigned value.
///
/// - sequence target: splice-style replacement at the index (observes the
///   new element and notifies through the interceptor);
/// - existing key: routed write (the installed cell handles
///   notification);
/// - root component instance: redirected into its backing data store;
/// - unobserved map: plain assignment, nothing to notify;
/// - observed map, new key: install a reactive cell, notify the
///   container's own-identity list, and expose the key on every owner.
pub fn set<'a>(target: &Value, key: impl Into<Key<'a>>, value: impl Into<Value>) -> Value {
    set_value(target, key.into(), value.into())
}

fn set_value(target: &Value, key: Key<'_>, value: Value) -> Value {
    match target {
        Value::Seq(seq) => {
            let Key::Index(index) = key else {
                tracing::warn!(?key, "set with a name key on a sequence ignored");
                return value;
            };
            seq.splice(index, 1, vec![value.clone()]);
            value
        }
        Value::Map(map) => {
            let name = key_name(key);
            set_map(map, &name, value)
        }
        _ => {
            tracing::warn!(?key, "set on a primitive value ignored");
            value
        }
    }
}

fn set_map(map: &MapRef, name: &str, value: Value) -> Value {
    if map.has(name) {
        map.assign(name, value.clone());
        return value;
    }
    if let Some(store) = map.instance_data() {
        return set_map(&store, name, value);
    }
    let Some(observer) = map.observer() else {
        map.assign(name, value.clone());
        return value;
    };

    observer.convert(name, value.clone());
    observer.dep().notify();
    for owner in observer.owners() {
        proxy(&owner, name, Some(map));
    }
    value
}

/// Delete a key from a mapping and notify if it was tracked.
///
/// No-op when the key is absent. On an unobserved root component
/// instance, the deletion is forwarded into its backing data store.
pub fn del(target: &Value, key: &str) {
    let Value::Map(map) = target else {
        tracing::warn!(key, "del on a non-mapping value ignored");
        return;
    };
    if !map.has(key) {
        return;
    }
    map.remove_slot(key);

    let Some(observer) = map.observer() else {
        if let Some(store) = map.instance_data() {
            store.remove_slot(key);
        }
        return;
    };
    observer.dep().notify();
    for owner in observer.owners() {
        unproxy(&owner, key);
    }
}

fn key_name(key: Key<'_>) -> String {
    match key {
        Key::Name(name) => name.to_string(),
        Key::Index(index) => index.to_string(),
    }
}
