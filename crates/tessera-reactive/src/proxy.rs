#![forbid(unsafe_code)]

//! Owner proxying: exposing backing-store keys on an instance.
//!
//! A component instance keeps its state in a shared backing store but
//! reads and writes it as if the keys were its own. [`proxy`] installs an
//! accessor slot on the owner that delegates to the store; [`unproxy`]
//! removes it. The store stays shared, so several owners can expose the
//! same key and every mutation is visible to all of them.
//!
//! Reserved names — the `$`/`_` private-convention prefixes of the owning
//! layer — are excluded so proxying cannot mask framework internals. The
//! loop/event scope identifiers in [`SCOPE_KEYS`] are the deliberate
//! exception.

use std::rc::Rc;

use crate::value::{MapRef, Value};

/// Loop and event scope identifiers that pass the reserved-name filter.
pub const SCOPE_KEYS: [&str; 4] = ["$idx", "$value", "$event", "$item"];

/// Whether `key` belongs to the owning layer's private namespace.
#[must_use]
pub fn is_reserved(key: &str) -> bool {
    matches!(key.as_bytes().first(), Some(b'$' | b'_'))
}

/// Expose `store[key]` as an own property of `owner`.
///
/// Defaults to the owner's backing data store when `store` is `None`.
/// Reads route through the store's reactive slots, so they are tracked
/// like direct store reads. Reserved keys outside [`SCOPE_KEYS`] are
/// skipped.
pub fn proxy(owner: &MapRef, key: &str, store: Option<&MapRef>) {
    let Some(store) = store.cloned().or_else(|| owner.instance_data()) else {
        tracing::debug!(key, "proxy skipped: owner has no backing store");
        return;
    };
    if !SCOPE_KEYS.contains(&key) && is_reserved(key) {
        return;
    }

    let read_store = store.clone();
    let read_key = key.to_string();
    let write_key = key.to_string();
    owner.define_accessor(
        key,
        Rc::new(move || read_store.get(&read_key).unwrap_or(Value::Null)),
        Some(Rc::new(move |value| store.assign(&write_key, value))),
    );
}

/// Remove the exposed accessor for `key` from `owner`, unless the key is
/// reserved.
pub fn unproxy(owner: &MapRef, key: &str) {
    if is_reserved(key) {
        return;
    }
    owner.remove_slot(key);
}
