#![forbid(unsafe_code)]

//! Dynamic plain-data tree: the values the reactivity engine observes.
//!
//! [`Value`] models the host data a view layer binds to: primitives plus
//! shared mapping ([`MapRef`]) and sequence ([`SeqRef`]) containers.
//! Containers are `Rc<RefCell<..>>` handles, so cloning a `Value` clones
//! the handle, never the tree — two clones of a `Map` alias the same
//! slots, the same attached observer, the same subscriber lists.
//!
//! Map keys are descriptor slots ([`Property`]): plain data, a preserved
//! getter/setter pair, or an installed reactive cell. The reactive cell
//! type itself lives in [`crate::prop`]; this module only stores and
//! routes to it.
//!
//! # Invariants
//!
//! 1. At most one observer is ever attached to a container; attachment is
//!    permanent for the container's lifetime.
//! 2. Slot order is insertion order (`IndexMap`), so instrumentation and
//!    notification walk keys deterministically.
//! 3. A `configurable: false` slot is never replaced by instrumentation
//!    and never removed.
//! 4. Container borrows are released before any foreign code (preserved
//!    accessors, subscriber updates) runs, so re-entrant reads and writes
//!    do not alias a live borrow.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use ahash::RandomState;
use indexmap::IndexMap;

use crate::observe::Observer;
use crate::prop::ReactiveProp;

/// Preserved getter: produces the current value of an accessor slot.
pub type Getter = Rc<dyn Fn() -> Value>;
/// Preserved setter: consumes the incoming value of an accessor slot.
pub type Setter = Rc<dyn Fn(Value)>;

type SlotTable = IndexMap<String, Rc<Property>, RandomState>;

/// A plain-data value: primitive, mapping, or sequence.
#[derive(Clone)]
pub enum Value {
    Null,
    Bool(bool),
    /// Single numeric lane. Change suppression compares with `f64 ==`, so
    /// `NaN` is never identical to `NaN` and repeated `NaN` writes notify.
    Number(f64),
    Str(Rc<str>),
    Map(MapRef),
    Seq(SeqRef),
}

impl Value {
    /// Strict-identity comparison used for change suppression: primitives
    /// by content (`Number` via `f64 ==`), containers by handle identity.
    #[must_use]
    pub fn identical(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Map(a), Value::Map(b)) => a.ptr_eq(b),
            (Value::Seq(a), Value::Seq(b)) => a.ptr_eq(b),
            _ => false,
        }
    }

    /// Whether this value is a mapping or sequence.
    #[must_use]
    pub fn is_container(&self) -> bool {
        matches!(self, Value::Map(_) | Value::Seq(_))
    }

    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// The observer attached to this value's container, if any.
    #[must_use]
    pub fn observer(&self) -> Option<Rc<Observer>> {
        match self {
            Value::Map(map) => map.observer(),
            Value::Seq(seq) => seq.observer(),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_map(&self) -> Option<&MapRef> {
        match self {
            Value::Map(map) => Some(map),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_seq(&self) -> Option<&SeqRef> {
        match self {
            Value::Seq(seq) => Some(seq),
            _ => None,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Number(n) => write!(f, "{n}"),
            Value::Str(s) => write!(f, "{s:?}"),
            Value::Map(map) => map.fmt(f),
            Value::Seq(seq) => seq.fmt(f),
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Number(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Number(f64::from(value))
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Str(Rc::from(value))
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Str(Rc::from(value.as_str()))
    }
}

impl From<MapRef> for Value {
    fn from(value: MapRef) -> Self {
        Value::Map(value)
    }
}

impl From<SeqRef> for Value {
    fn from(value: SeqRef) -> Self {
        Value::Seq(value)
    }
}

/// One key's descriptor on a mapping.
pub enum Property {
    /// Plain data slot. `configurable: false` marks a sealed key that
    /// instrumentation must leave untouched.
    Data { value: Value, configurable: bool },
    /// Pre-existing getter/setter pair, preserved verbatim until (and
    /// wrapped transparently after) instrumentation.
    Accessor {
        get: Getter,
        set: Option<Setter>,
        configurable: bool,
    },
    /// Installed reactive cell.
    Reactive(ReactiveProp),
}

impl Property {
    fn configurable(&self) -> bool {
        match self {
            Property::Data { configurable, .. } | Property::Accessor { configurable, .. } => {
                *configurable
            }
            Property::Reactive(_) => true,
        }
    }
}

pub(crate) struct MapData {
    slots: SlotTable,
    observer: Option<Rc<Observer>>,
    extensible: bool,
    /// When set, this map is the root of a component instance and the
    /// referenced map is its backing data store. Root instances are never
    /// observed themselves.
    instance_data: Option<MapRef>,
}

/// Shared handle to a mapping container.
#[derive(Clone)]
pub struct MapRef {
    inner: Rc<RefCell<MapData>>,
}

impl MapRef {
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Rc::new(RefCell::new(MapData {
                slots: SlotTable::default(),
                observer: None,
                extensible: true,
                instance_data: None,
            })),
        }
    }

    /// Handle identity: do both refs alias the same container?
    #[must_use]
    pub fn ptr_eq(&self, other: &MapRef) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    #[must_use]
    pub fn downgrade(&self) -> WeakMapRef {
        WeakMapRef {
            inner: Rc::downgrade(&self.inner),
        }
    }

    /// Define a plain data slot, replacing any existing configurable slot.
    pub fn insert(&self, key: impl Into<String>, value: impl Into<Value>) {
        self.replace_slot(
            &key.into(),
            Property::Data {
                value: value.into(),
                configurable: true,
            },
        );
    }

    /// Define a sealed (non-configurable) data slot. Instrumentation and
    /// deletion skip it.
    pub fn insert_sealed(&self, key: impl Into<String>, value: impl Into<Value>) {
        self.replace_slot(
            &key.into(),
            Property::Data {
                value: value.into(),
                configurable: false,
            },
        );
    }

    /// Define an accessor slot with a getter and optional setter.
    pub fn define_accessor(&self, key: &str, get: Getter, set: Option<Setter>) {
        self.replace_slot(
            key,
            Property::Accessor {
                get,
                set,
                configurable: true,
            },
        );
    }

    /// Install or replace a descriptor. Refuses (silently, with a trace
    /// diagnostic) to touch a non-configurable slot.
    pub(crate) fn replace_slot(&self, key: &str, property: Property) {
        let mut data = self.inner.borrow_mut();
        if let Some(existing) = data.slots.get(key)
            && !existing.configurable()
        {
            tracing::trace!(key, "slot is non-configurable; left untouched");
            return;
        }
        data.slots.insert(key.to_string(), Rc::new(property));
    }

    pub(crate) fn slot(&self, key: &str) -> Option<Rc<Property>> {
        self.inner.borrow().slots.get(key).cloned()
    }

    /// Raw slot removal. Non-configurable slots survive; returns whether
    /// the key was removed.
    pub fn remove_slot(&self, key: &str) -> bool {
        let mut data = self.inner.borrow_mut();
        match data.slots.get(key) {
            Some(existing) if !existing.configurable() => false,
            Some(_) => data.slots.shift_remove(key).is_some(),
            None => false,
        }
    }

    #[must_use]
    pub fn has(&self, key: &str) -> bool {
        self.inner.borrow().slots.contains_key(key)
    }

    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        self.inner.borrow().slots.keys().cloned().collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.borrow().slots.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.borrow().slots.is_empty()
    }

    /// Read a key, routing through its descriptor. Reads of a reactive
    /// slot record the current computation; plain and accessor slots do
    /// not.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<Value> {
        let property = self.slot(key)?;
        match &*property {
            Property::Data { value, .. } => Some(value.clone()),
            Property::Accessor { get, .. } => Some(get()),
            Property::Reactive(cell) => Some(cell.read()),
        }
    }

    /// Write a key, routing through its descriptor:
    /// - reactive slot: change-suppressed write plus notification;
    /// - accessor slot: preserved setter, or silently dropped without one;
    /// - data slot: replaced in place, no notification;
    /// - absent key: created as a plain data slot, no tracking.
    pub fn assign(&self, key: &str, value: impl Into<Value>) {
        let value = value.into();
        let property = self.slot(key);
        match property.as_deref() {
            Some(Property::Reactive(cell)) => cell.write(value),
            Some(Property::Accessor { set, .. }) => match set {
                Some(set) => set(value),
                None => tracing::trace!(key, "write through getter-only slot dropped"),
            },
            Some(Property::Data { configurable, .. }) => {
                let configurable = *configurable;
                self.inner.borrow_mut().slots.insert(
                    key.to_string(),
                    Rc::new(Property::Data {
                        value,
                        configurable,
                    }),
                );
            }
            None => {
                self.inner
                    .borrow_mut()
                    .slots
                    .insert(key.to_string(), Rc::new(Property::Data {
                        value,
                        configurable: true,
                    }));
            }
        }
    }

    #[must_use]
    pub fn observer(&self) -> Option<Rc<Observer>> {
        self.inner.borrow().observer.clone()
    }

    pub(crate) fn set_observer(&self, observer: Rc<Observer>) {
        let mut data = self.inner.borrow_mut();
        debug_assert!(data.observer.is_none(), "container observed twice");
        data.observer = Some(observer);
    }

    #[must_use]
    pub fn is_extensible(&self) -> bool {
        self.inner.borrow().extensible
    }

    /// Forbid future observation of this container.
    pub fn prevent_extensions(&self) {
        self.inner.borrow_mut().extensible = false;
    }

    /// Mark this map as the root of a component instance backed by
    /// `store`. Root instances are skipped by observation and redirect
    /// dynamic mutation into their store.
    pub fn bind_instance_data(&self, store: &MapRef) {
        self.inner.borrow_mut().instance_data = Some(store.clone());
    }

    #[must_use]
    pub fn instance_data(&self) -> Option<MapRef> {
        self.inner.borrow().instance_data.clone()
    }

    #[must_use]
    pub fn is_instance_root(&self) -> bool {
        self.inner.borrow().instance_data.is_some()
    }
}

impl Default for MapRef {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for MapRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let data = self.inner.borrow();
        f.debug_struct("MapRef")
            .field("keys", &data.slots.keys().collect::<Vec<_>>())
            .field("observed", &data.observer.is_some())
            .finish()
    }
}

/// Weak counterpart of [`MapRef`]; relation, never ownership.
#[derive(Clone)]
pub struct WeakMapRef {
    inner: Weak<RefCell<MapData>>,
}

impl WeakMapRef {
    #[must_use]
    pub fn upgrade(&self) -> Option<MapRef> {
        self.inner.upgrade().map(|inner| MapRef { inner })
    }
}

pub(crate) struct SeqData {
    pub(crate) items: Vec<Value>,
    observer: Option<Rc<Observer>>,
    extensible: bool,
}

/// Shared handle to a sequence container.
#[derive(Clone)]
pub struct SeqRef {
    pub(crate) inner: Rc<RefCell<SeqData>>,
}

impl SeqRef {
    #[must_use]
    pub fn new() -> Self {
        Self::from_values(Vec::new())
    }

    #[must_use]
    pub fn from_values(items: Vec<Value>) -> Self {
        Self {
            inner: Rc::new(RefCell::new(SeqData {
                items,
                observer: None,
                extensible: true,
            })),
        }
    }

    #[must_use]
    pub fn ptr_eq(&self, other: &SeqRef) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    #[must_use]
    pub fn downgrade(&self) -> WeakSeqRef {
        WeakSeqRef {
            inner: Rc::downgrade(&self.inner),
        }
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<Value> {
        self.inner.borrow().items.get(index).cloned()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.borrow().items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.borrow().items.is_empty()
    }

    /// Snapshot of the current items.
    #[must_use]
    pub fn to_vec(&self) -> Vec<Value> {
        self.inner.borrow().items.clone()
    }

    #[must_use]
    pub fn observer(&self) -> Option<Rc<Observer>> {
        self.inner.borrow().observer.clone()
    }

    pub(crate) fn set_observer(&self, observer: Rc<Observer>) {
        let mut data = self.inner.borrow_mut();
        debug_assert!(data.observer.is_none(), "container observed twice");
        data.observer = Some(observer);
    }

    #[must_use]
    pub fn is_extensible(&self) -> bool {
        self.inner.borrow().extensible
    }

    pub fn prevent_extensions(&self) {
        self.inner.borrow_mut().extensible = false;
    }
}

impl Default for SeqRef {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for SeqRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let data = self.inner.borrow();
        f.debug_struct("SeqRef")
            .field("len", &data.items.len())
            .field("observed", &data.observer.is_some())
            .finish()
    }
}

/// Weak counterpart of [`SeqRef`].
#[derive(Clone)]
pub struct WeakSeqRef {
    inner: Weak<RefCell<SeqData>>,
}

impl WeakSeqRef {
    #[must_use]
    pub fn upgrade(&self) -> Option<SeqRef> {
        self.inner.upgrade().map(|inner| SeqRef { inner })
    }
}
